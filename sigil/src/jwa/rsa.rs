//! RSA JSON Web Algorithm implementations
//!
//! Both RSASSA-PKCS1-v1_5 (`RS*`) and RSASSA-PSS (`PS*`) are supported.
//! PSS signatures use MGF1 with the message digest and a salt as long as
//! the digest, as required by RFC 7518.

use std::fmt;

use openssl::{
    hash::MessageDigest,
    pkey::{PKey, Private},
    rsa::Padding,
    sign::RsaPssSaltlen,
};

use crate::{
    error::{self, KeyRejectedReason},
    jwa::{Algorithm, DigestType, Family},
    jws::{self, KeyId, KeyIdRef, VerifierSettings},
    key::{KeyKind, KeyMaterial, KeyUsage, OpensslKey},
};

/// The smallest modulus accepted for signing, in bits
pub const MIN_SIGNING_MODULUS_BITS: u32 = 2048;

/// Padding selection for RSA keys
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RsaPadding {
    /// PSS for RSA-PSS keys, PKCS#1 v1.5 otherwise
    Unspecified,
    /// Always use PSS
    Pss,
    /// Use PKCS#1 v1.5; an error for RSA-PSS keys
    Pkcs1v15,
}

impl Default for RsaPadding {
    fn default() -> Self {
        Self::Unspecified
    }
}

#[derive(Copy, Clone)]
struct Binding {
    alg: Algorithm,
    digest: DigestType,
    md: MessageDigest,
    pss: bool,
}

/// Resolves the JWA identifier for an RSA key
///
/// The key kind is checked first, then usage, then (for signing) the
/// modulus length, and finally the padding and digest.
fn identify(
    key: &KeyMaterial,
    usage: KeyUsage,
    digest: DigestType,
    padding: RsaPadding,
) -> Result<Binding, error::InvalidSettings> {
    let is_pss_key = match key.kind() {
        KeyKind::Rsa => false,
        KeyKind::RsaPss => true,
        _ => return Err(error::key_rejected(KeyRejectedReason::AlgorithmMismatch).into()),
    };

    key.require(usage)?;

    let bits = key.modulus_bits().unwrap_or_default();
    if bits < MIN_SIGNING_MODULUS_BITS {
        if usage == KeyUsage::Private {
            return Err(error::key_rejected(KeyRejectedReason::KeyTooSmall).into());
        }

        #[cfg(feature = "tracing")]
        tracing::warn!(bits, "verifying with an RSA key below the signing minimum");
    }

    let md = digest
        .message_digest()
        .ok_or_else(|| error::unsupported_digest(digest, Family::Rsa))?;

    let pss = match (is_pss_key, padding) {
        (true, RsaPadding::Pkcs1v15) => {
            return Err(error::key_rejected(KeyRejectedReason::PaddingMismatch).into())
        }
        (true, _) | (false, RsaPadding::Pss) => true,
        (false, _) => false,
    };

    if !key.permits_pss_digest(digest) {
        return Err(error::key_rejected(KeyRejectedReason::DigestMismatch).into());
    }

    let alg = match (pss, digest) {
        (false, DigestType::Sha256) => Algorithm::RS256,
        (false, DigestType::Sha384) => Algorithm::RS384,
        (false, DigestType::Sha512) => Algorithm::RS512,
        (true, DigestType::Sha256) => Algorithm::PS256,
        (true, DigestType::Sha384) => Algorithm::PS384,
        (true, DigestType::Sha512) => Algorithm::PS512,
        _ => return Err(error::unsupported_digest(digest, Family::Rsa)),
    };

    #[cfg(feature = "tracing")]
    tracing::trace!(%alg, bits, %usage, "bound RSA key");

    Ok(Binding {
        alg,
        digest,
        md,
        pss,
    })
}

/// Signs tokens with an RSA private key
#[must_use]
pub struct RsaSigner {
    key: PKey<Private>,
    binding: Binding,
    key_id: Option<KeyId>,
}

impl RsaSigner {
    /// Binds an RSA private key of at least 2048 bits
    ///
    /// # Errors
    ///
    /// * The key is not an RSA private key
    /// * The modulus is shorter than 2048 bits
    /// * The digest is not SHA-256, SHA-384, or SHA-512
    /// * PKCS#1 v1.5 was requested for an RSA-PSS key
    /// * The key is restricted to a different digest
    pub fn new(
        key: &KeyMaterial,
        digest: DigestType,
        padding: RsaPadding,
    ) -> Result<Self, error::InvalidSettings> {
        let binding = identify(key, KeyUsage::Private, digest, padding)?;

        match key.openssl() {
            Some(OpensslKey::Private(pkey)) => Ok(Self {
                key: pkey.clone(),
                binding,
                key_id: None,
            }),
            _ => Err(error::key_rejected(KeyRejectedReason::UsageMismatch).into()),
        }
    }

    /// Sets the key identifier
    pub fn with_key_id(self, kid: KeyId) -> Self {
        Self {
            key_id: Some(kid),
            ..self
        }
    }

    fn sign_inner(&self, data: &[u8]) -> Result<Vec<u8>, openssl::error::ErrorStack> {
        let mut signer = openssl::sign::Signer::new(self.binding.md, &self.key)?;

        if self.binding.pss {
            signer.set_rsa_padding(Padding::PKCS1_PSS)?;
            signer.set_rsa_pss_saltlen(RsaPssSaltlen::DIGEST_LENGTH)?;
            signer.set_rsa_mgf1_md(self.binding.md)?;
        } else {
            signer.set_rsa_padding(Padding::PKCS1)?;
        }

        signer.update(data)?;
        signer.sign_to_vec()
    }
}

impl jws::Signer for RsaSigner {
    fn family(&self) -> Family {
        Family::Rsa
    }

    fn algorithm(&self) -> Algorithm {
        self.binding.alg
    }

    fn digest_type(&self) -> DigestType {
        self.binding.digest
    }

    fn key_id(&self) -> Option<&KeyIdRef> {
        self.key_id.as_deref()
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, error::SigningError> {
        self.sign_inner(data).map_err(error::sign_failed)
    }
}

impl fmt::Debug for RsaSigner {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RsaSigner")
            .field("alg", &self.binding.alg)
            .field("key_id", &self.key_id)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Verifies tokens signed with an RSA key
///
/// Either half of the key pair may be used. Keys below 2048 bits are
/// accepted for verification.
#[must_use]
pub struct RsaVerifier {
    key: OpensslKey,
    binding: Binding,
    settings: VerifierSettings,
}

impl RsaVerifier {
    /// Binds an RSA public or private key
    ///
    /// # Errors
    ///
    /// * The key is not an RSA key
    /// * The digest is not SHA-256, SHA-384, or SHA-512
    /// * PKCS#1 v1.5 was requested for an RSA-PSS key
    /// * The key is restricted to a different digest
    pub fn new(
        key: &KeyMaterial,
        digest: DigestType,
        padding: RsaPadding,
    ) -> Result<Self, error::InvalidSettings> {
        let binding = identify(key, KeyUsage::Public, digest, padding)?;
        let key = key
            .openssl()
            .cloned()
            .ok_or_else(|| error::key_rejected(KeyRejectedReason::AlgorithmMismatch))?;

        Ok(Self {
            key,
            binding,
            settings: VerifierSettings::new("RsaJwaVerifier"),
        })
    }

    fn verify_inner(&self, data: &[u8], signature: &[u8]) -> Result<bool, openssl::error::ErrorStack> {
        let mut verifier = self.key.verifier(Some(self.binding.md))?;

        if self.binding.pss {
            verifier.set_rsa_padding(Padding::PKCS1_PSS)?;
            verifier.set_rsa_pss_saltlen(RsaPssSaltlen::DIGEST_LENGTH)?;
            verifier.set_rsa_mgf1_md(self.binding.md)?;
        } else {
            verifier.set_rsa_padding(Padding::PKCS1)?;
        }

        verifier.update(data)?;
        verifier.verify(signature)
    }
}

jws::verifier_settings!(RsaVerifier);

impl jws::Verifier for RsaVerifier {
    fn family(&self) -> Family {
        Family::Rsa
    }

    fn algorithm(&self) -> Algorithm {
        self.binding.alg
    }

    fn digest_type(&self) -> DigestType {
        self.binding.digest
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
        self.verify_inner(data, signature).unwrap_or(false)
    }
}

impl fmt::Debug for RsaVerifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RsaVerifier")
            .field("alg", &self.binding.alg)
            .field("settings", &self.settings)
            .finish()
    }
}
