//! HMAC JSON Web Algorithm implementations

use std::fmt;

use subtle::ConstantTimeEq;

use crate::{
    error,
    jwa::{Algorithm, DigestType, Family},
    jws::{self, KeyId, KeyIdRef, VerifierSettings},
};

fn algorithm_for(digest: DigestType) -> Result<(Algorithm, ring::hmac::Algorithm), error::InvalidSettings> {
    match digest {
        DigestType::Sha256 => Ok((Algorithm::HS256, ring::hmac::HMAC_SHA256)),
        DigestType::Sha384 => Ok((Algorithm::HS384, ring::hmac::HMAC_SHA384)),
        DigestType::Sha512 => Ok((Algorithm::HS512, ring::hmac::HMAC_SHA512)),
        DigestType::Shake256 | DigestType::Auto => {
            Err(error::unsupported_digest(digest, Family::Hmac))
        }
    }
}

struct Secret {
    key: ring::hmac::Key,
    digest: DigestType,
    alg: Algorithm,
}

impl Secret {
    fn new(secret: &[u8], digest: DigestType) -> Result<Self, error::InvalidSettings> {
        let (alg, ring_alg) = algorithm_for(digest)?;

        #[cfg(feature = "tracing")]
        tracing::trace!(%alg, "bound HMAC secret");

        Ok(Self {
            key: ring::hmac::Key::new(ring_alg, secret),
            digest,
            alg,
        })
    }

    fn tag(&self, data: &[u8]) -> ring::hmac::Tag {
        ring::hmac::sign(&self.key, data)
    }
}

/// Signs tokens with a shared HMAC secret
///
/// Any byte string is accepted as the secret.
#[must_use]
pub struct HmacSigner {
    secret: Secret,
    key_id: Option<KeyId>,
}

impl HmacSigner {
    /// Binds a secret to the HMAC algorithm matching `digest`
    ///
    /// # Errors
    ///
    /// The digest is not one of SHA-256, SHA-384, or SHA-512.
    pub fn new(secret: impl AsRef<[u8]>, digest: DigestType) -> Result<Self, error::InvalidSettings> {
        Ok(Self {
            secret: Secret::new(secret.as_ref(), digest)?,
            key_id: None,
        })
    }

    /// Sets the key identifier
    pub fn with_key_id(self, kid: KeyId) -> Self {
        Self {
            key_id: Some(kid),
            ..self
        }
    }
}

impl jws::Signer for HmacSigner {
    fn family(&self) -> Family {
        Family::Hmac
    }

    fn algorithm(&self) -> Algorithm {
        self.secret.alg
    }

    fn digest_type(&self) -> DigestType {
        self.secret.digest
    }

    fn key_id(&self) -> Option<&KeyIdRef> {
        self.key_id.as_deref()
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, error::SigningError> {
        Ok(self.secret.tag(data).as_ref().to_vec())
    }
}

impl fmt::Debug for HmacSigner {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("HmacSigner")
            .field("alg", &self.secret.alg)
            .field("key_id", &self.key_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Verifies tokens signed with a shared HMAC secret
///
/// The computed tag is compared with the token's signature in constant
/// time. Signatures of the wrong length are treated as a mismatch.
#[must_use]
pub struct HmacVerifier {
    secret: Secret,
    settings: VerifierSettings,
}

impl HmacVerifier {
    /// Binds a secret to the HMAC algorithm matching `digest`
    ///
    /// # Errors
    ///
    /// The digest is not one of SHA-256, SHA-384, or SHA-512.
    pub fn new(secret: impl AsRef<[u8]>, digest: DigestType) -> Result<Self, error::InvalidSettings> {
        Ok(Self {
            secret: Secret::new(secret.as_ref(), digest)?,
            settings: VerifierSettings::new("HmacJwaVerifier"),
        })
    }
}

jws::verifier_settings!(HmacVerifier);

impl jws::Verifier for HmacVerifier {
    fn family(&self) -> Family {
        Family::Hmac
    }

    fn algorithm(&self) -> Algorithm {
        self.secret.alg
    }

    fn digest_type(&self) -> DigestType {
        self.secret.digest
    }

    fn name(&self) -> &str {
        self.settings.name()
    }

    fn check_alg_claim(&self) -> bool {
        self.settings.check_alg_claim()
    }

    fn set_check_alg_claim(&self, check: bool) {
        self.settings.set_check_alg_claim(check)
    }

    fn verify_signature(&self, data: &[u8], signature: &[u8]) -> bool {
        let expected = self.secret.tag(data);
        expected.as_ref().ct_eq(signature).into()
    }
}

impl fmt::Debug for HmacVerifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("HmacVerifier")
            .field("alg", &self.secret.alg)
            .field("settings", &self.settings)
            .field("secret", &"<redacted>")
            .finish()
    }
}
