use std::borrow::Cow;

use serde_json::Value;

use super::Allowlist;
use crate::{
    error::{self, ValidationError},
    jwt::ParsedJwt,
    verifier::Validator,
};

/// Checks a single string claim against an allowlist
#[derive(Debug, Clone)]
struct StringClaim {
    claim: &'static str,
    allowlist: Allowlist,
    claim_required: bool,
    name: Cow<'static, str>,
}

impl StringClaim {
    fn new(claim: &'static str, name: &'static str, allowlist: Allowlist) -> Self {
        Self {
            claim,
            allowlist,
            claim_required: true,
            name: Cow::Borrowed(name),
        }
    }

    fn validate(&self, token: &ParsedJwt) -> Result<(), ValidationError> {
        match token.payload().get(self.claim) {
            None | Some(Value::Null) if !self.claim_required => Ok(()),
            Some(Value::String(value)) if self.allowlist.matches(value) => Ok(()),
            _ => Err(error::invalid_payload_claim(self.claim).into()),
        }
    }
}

macro_rules! string_claim_validator {
    ($(#[$meta:meta])* $ty:ident, $claim:literal, $name:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        #[must_use]
        pub struct $ty(StringClaim);

        impl $ty {
            #[doc = concat!("Accepts a `", $claim, "` claim matching any allowlist entry")]
            pub fn new(allowlist: impl Into<Allowlist>) -> Self {
                Self(StringClaim::new($claim, $name, allowlist.into()))
            }

            #[doc = concat!("Sets whether a token without `", $claim, "` is rejected")]
            ///
            /// Defaults to `true`.
            pub fn with_claim_required(mut self, required: bool) -> Self {
                self.0.claim_required = required;
                self
            }

            #[doc = concat!("Overrides the default name, `", $name, "`")]
            pub fn with_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
                self.0.name = name.into();
                self
            }

            #[doc = concat!("Whether a token without `", $claim, "` is rejected")]
            #[must_use]
            pub fn claim_required(&self) -> bool {
                self.0.claim_required
            }
        }

        impl Validator for $ty {
            fn name(&self) -> &str {
                &self.0.name
            }

            fn validate(&self, token: &ParsedJwt) -> Result<(), ValidationError> {
                self.0.validate(token)
            }
        }
    };
}

string_claim_validator!(
    /// Checks the `iss` claim
    ///
    /// A missing, non-string, or unlisted issuer is reported as an
    /// invalid payload claim.
    IssuerValidator,
    "iss",
    "JwtIssuerValidator"
);

string_claim_validator!(
    /// Checks the `sub` claim
    ///
    /// A missing, non-string, or unlisted subject is reported as an
    /// invalid payload claim.
    SubjectValidator,
    "sub",
    "JwtSubjectValidator"
);
