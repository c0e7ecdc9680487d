//! Edwards-curve JSON Web Algorithm implementations (RFC 8037)
//!
//! Ed25519 and Ed448 both sign as `EdDSA`. Their digests are fixed by
//! the curve and reported for information only.

use std::fmt;

use openssl::{
    error::ErrorStack,
    pkey::{PKey, Private},
};

use crate::{
    error::{self, KeyRejectedReason},
    jwa::{Algorithm, DigestType, Family},
    jws::{self, KeyId, KeyIdRef, VerifierSettings},
    key::{KeyKind, KeyMaterial, KeyUsage, OpensslKey},
};

/// An Edwards curve
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum EdCurve {
    /// Ed25519
    Ed25519,
    /// Ed448
    Ed448,
}

impl EdCurve {
    /// The digest intrinsic to the curve
    #[must_use]
    pub const fn digest(self) -> DigestType {
        match self {
            Self::Ed25519 => DigestType::Sha512,
            Self::Ed448 => DigestType::Shake256,
        }
    }
}

fn identify(key: &KeyMaterial, usage: KeyUsage) -> Result<EdCurve, error::InvalidSettings> {
    let curve = match key.kind() {
        KeyKind::Ed25519 => EdCurve::Ed25519,
        KeyKind::Ed448 => EdCurve::Ed448,
        _ => return Err(error::key_rejected(KeyRejectedReason::AlgorithmMismatch).into()),
    };

    key.require(usage)?;

    #[cfg(feature = "tracing")]
    tracing::trace!(?curve, %usage, "bound EdDSA key");

    Ok(curve)
}

/// Signs tokens with an Ed25519 or Ed448 private key
#[must_use]
pub struct EddsaSigner {
    key: PKey<Private>,
    curve: EdCurve,
    key_id: Option<KeyId>,
}

impl EddsaSigner {
    /// Binds an Edwards-curve private key
    ///
    /// # Errors
    ///
    /// The key is not an Ed25519 or Ed448 private key.
    pub fn new(key: &KeyMaterial) -> Result<Self, error::InvalidSettings> {
        let curve = identify(key, KeyUsage::Private)?;

        match key.openssl() {
            Some(OpensslKey::Private(pkey)) => Ok(Self {
                key: pkey.clone(),
                curve,
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

    /// The curve of the bound key
    pub fn curve(&self) -> EdCurve {
        self.curve
    }

    fn sign_inner(&self, data: &[u8]) -> Result<Vec<u8>, ErrorStack> {
        let mut signer = openssl::sign::Signer::new_without_digest(&self.key)?;
        signer.sign_oneshot_to_vec(data)
    }
}

impl jws::Signer for EddsaSigner {
    fn family(&self) -> Family {
        Family::EdDsa
    }

    fn algorithm(&self) -> Algorithm {
        Algorithm::EdDSA
    }

    fn digest_type(&self) -> DigestType {
        self.curve.digest()
    }

    fn key_id(&self) -> Option<&KeyIdRef> {
        self.key_id.as_deref()
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, error::SigningError> {
        self.sign_inner(data).map_err(error::sign_failed)
    }
}

impl fmt::Debug for EddsaSigner {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("EddsaSigner")
            .field("curve", &self.curve)
            .field("key_id", &self.key_id)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Verifies tokens signed with an Ed25519 or Ed448 key
#[must_use]
pub struct EddsaVerifier {
    key: OpensslKey,
    curve: EdCurve,
    settings: VerifierSettings,
}

impl EddsaVerifier {
    /// Binds an Edwards-curve public or private key
    ///
    /// # Errors
    ///
    /// The key is not an Ed25519 or Ed448 key.
    pub fn new(key: &KeyMaterial) -> Result<Self, error::InvalidSettings> {
        let curve = identify(key, KeyUsage::Public)?;
        let key = key
            .openssl()
            .cloned()
            .ok_or_else(|| error::key_rejected(KeyRejectedReason::AlgorithmMismatch))?;

        Ok(Self {
            key,
            curve,
            settings: VerifierSettings::new("EddsaJwaVerifier"),
        })
    }

    /// The curve of the bound key
    pub fn curve(&self) -> EdCurve {
        self.curve
    }

    fn verify_inner(&self, data: &[u8], signature: &[u8]) -> Result<bool, ErrorStack> {
        let mut verifier = self.key.verifier(None)?;
        verifier.verify_oneshot(signature, data)
    }
}

jws::verifier_settings!(EddsaVerifier);

impl jws::Verifier for EddsaVerifier {
    fn family(&self) -> Family {
        Family::EdDsa
    }

    fn algorithm(&self) -> Algorithm {
        Algorithm::EdDSA
    }

    fn digest_type(&self) -> DigestType {
        self.curve.digest()
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

impl fmt::Debug for EddsaVerifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("EddsaVerifier")
            .field("curve", &self.curve)
            .field("settings", &self.settings)
            .finish()
    }
}
