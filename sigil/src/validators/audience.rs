use std::borrow::Cow;

use serde_json::Value;

use super::Allowlist;
use crate::{
    error::{self, ValidationError},
    jwt::ParsedJwt,
    verifier::Validator,
};

/// Checks the `aud` claim
///
/// The claim may be a single string or an array of strings. The token is
/// accepted if any of its audiences matches any allowlist entry.
#[derive(Debug, Clone)]
#[must_use]
pub struct AudienceValidator {
    allowlist: Allowlist,
    claim_required: bool,
    name: Cow<'static, str>,
}

impl AudienceValidator {
    /// Accepts tokens with an audience matching any allowlist entry
    pub fn new(allowlist: impl Into<Allowlist>) -> Self {
        Self {
            allowlist: allowlist.into(),
            claim_required: true,
            name: Cow::Borrowed("JwtAudienceValidator"),
        }
    }

    /// Sets whether a token without `aud` is rejected
    ///
    /// Defaults to `true`.
    pub fn with_claim_required(self, required: bool) -> Self {
        Self {
            claim_required: required,
            ..self
        }
    }

    /// Overrides the default name, `JwtAudienceValidator`
    pub fn with_name(self, name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    /// Whether a token without `aud` is rejected
    #[must_use]
    pub fn claim_required(&self) -> bool {
        self.claim_required
    }
}

/// Normalizes `aud` to a list; `None` if any member is not a string
fn audiences(value: &Value) -> Option<Vec<&str>> {
    match value {
        Value::String(aud) => Some(vec![aud.as_str()]),
        Value::Array(values) => values.iter().map(Value::as_str).collect(),
        _ => None,
    }
}

impl Validator for AudienceValidator {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self, token: &ParsedJwt) -> Result<(), ValidationError> {
        let value = match token.payload().get("aud") {
            None | Some(Value::Null) if !self.claim_required => return Ok(()),
            None | Some(Value::Null) => return Err(error::invalid_payload_claim("aud").into()),
            Some(value) => value,
        };

        let allowed = audiences(value)
            .map_or(false, |auds| auds.iter().any(|aud| self.allowlist.matches(aud)));

        if allowed {
            Ok(())
        } else {
            Err(error::invalid_payload_claim("aud").into())
        }
    }
}
