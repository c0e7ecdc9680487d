//! Implementations of the JSON Web Signature (JWS) standard
//!
//! The specifications for this standard can be found in [RFC7515][].
//!
//! Every algorithm family provides one [`Signer`] and one [`Verifier`].
//! Both bind their key material, algorithm, and digest once, at
//! construction time.
//!
//! [RFC7515]: https://tools.ietf.org/html/rfc7515

use std::{
    borrow::Cow,
    fmt,
    sync::atomic::{AtomicBool, Ordering},
};

use aliri_braid::braid;

use crate::{
    error,
    jwa::{Algorithm, DigestType, Family},
    jwt::ParsedJwt,
};

/// An identifier for a signing key, written to the `kid` header
#[braid(serde, ref_doc = "A borrowed reference to a key identifier ([`KeyId`])")]
pub struct KeyId;

/// A JWS signer
pub trait Signer: fmt::Debug + Send + Sync {
    /// The algorithm family of the bound key
    fn family(&self) -> Family;

    /// The JWA identifier written to the `alg` header
    fn algorithm(&self) -> Algorithm;

    /// The digest used when signing
    fn digest_type(&self) -> DigestType;

    /// The identifier of the bound key, if one was given
    fn key_id(&self) -> Option<&KeyIdRef>;

    /// Signs the data with the bound key
    ///
    /// # Errors
    ///
    /// The cryptographic provider refused to produce a signature.
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, error::SigningError>;
}

/// A JWS verifier
pub trait Verifier: fmt::Debug + Send + Sync {
    /// The algorithm family of the bound key
    fn family(&self) -> Family;

    /// The JWA identifier this verifier accepts
    fn algorithm(&self) -> Algorithm;

    /// The digest used when verifying
    fn digest_type(&self) -> DigestType;

    /// The name reported when this verifier rejects a token
    fn name(&self) -> &str;

    /// Whether a present `alg` header must match [`algorithm`][Self::algorithm]
    fn check_alg_claim(&self) -> bool;

    /// Enables or disables the `alg` header check
    fn set_check_alg_claim(&self, check: bool);

    /// Checks the signature over `data`
    ///
    /// Malformed signatures and provider errors report `false`.
    fn verify_signature(&self, data: &[u8], signature: &[u8]) -> bool;

    /// Verifies a parsed token
    ///
    /// When the `alg` check is enabled and the header names a different
    /// algorithm, the token is rejected before any signature check.
    /// An absent `alg` header skips the check.
    ///
    /// # Errors
    ///
    /// * [`SignatureAlgMismatch`][error::VerifyErrorKind::SignatureAlgMismatch]
    ///   if the `alg` header names another algorithm
    /// * [`SignatureVerifyFailed`][error::VerifyErrorKind::SignatureVerifyFailed]
    ///   if the signature does not verify
    fn verify(&self, token: &ParsedJwt) -> Result<(), error::VerifyError> {
        if self.check_alg_claim() {
            if let Some(alg) = token.header().get("alg") {
                if alg.as_str() != Some(self.algorithm().as_str()) {
                    return Err(error::signature_alg_mismatch());
                }
            }
        }

        if self.verify_signature(token.signed_content().as_bytes(), token.signature()) {
            Ok(())
        } else {
            Err(error::signature_verify_failed())
        }
    }
}

/// Name and `alg` check shared by every verifier
pub(crate) struct VerifierSettings {
    name: Cow<'static, str>,
    check_alg_claim: AtomicBool,
}

impl VerifierSettings {
    pub(crate) fn new(default_name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(default_name),
            check_alg_claim: AtomicBool::new(true),
        }
    }

    pub(crate) fn set_name(&mut self, name: impl Into<Cow<'static, str>>) {
        self.name = name.into();
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn check_alg_claim(&self) -> bool {
        self.check_alg_claim.load(Ordering::Relaxed)
    }

    pub(crate) fn set_check_alg_claim(&self, check: bool) {
        self.check_alg_claim.store(check, Ordering::Relaxed);
    }
}

impl fmt::Debug for VerifierSettings {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("VerifierSettings")
            .field("name", &self.name)
            .field("check_alg_claim", &self.check_alg_claim())
            .finish()
    }
}

/// Implements the settings accessors of [`Verifier`] and makes the
/// verifier usable as a pipeline validator.
macro_rules! verifier_settings {
    ($ty:ty) => {
        impl $ty {
            /// Overrides the name reported when this verifier rejects a token
            pub fn with_name(mut self, name: impl Into<std::borrow::Cow<'static, str>>) -> Self {
                self.settings.set_name(name);
                self
            }

            /// Sets whether a present `alg` header must match this verifier
            pub fn with_check_alg_claim(self, check: bool) -> Self {
                self.settings.set_check_alg_claim(check);
                self
            }
        }

        impl crate::verifier::Validator for $ty {
            fn name(&self) -> &str {
                self.settings.name()
            }

            fn validate(
                &self,
                token: &crate::jwt::ParsedJwt,
            ) -> Result<(), crate::error::ValidationError> {
                crate::jws::Verifier::verify(self, token).map_err(Into::into)
            }
        }
    };
}

pub(crate) use verifier_settings;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_default_to_checking_alg() {
        let settings = VerifierSettings::new("HmacJwaVerifier");
        assert!(settings.check_alg_claim());
        assert_eq!(settings.name(), "HmacJwaVerifier");

        settings.set_check_alg_claim(false);
        assert!(!settings.check_alg_claim());
    }

    #[test]
    fn settings_accept_owned_names() {
        let mut settings = VerifierSettings::new("EcdsaJwaVerifier");
        settings.set_name(format!("tenant-{}", 7));
        assert_eq!(settings.name(), "tenant-7");
    }
}
