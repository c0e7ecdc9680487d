//! Elliptic curve JSON Web Algorithm implementations
//!
//! Signatures are written in the fixed-width `r || s` form used by JWS,
//! not the DER form produced by most ECDSA tooling.

use std::{convert::TryFrom, fmt};

use openssl::{
    bn::BigNum,
    ecdsa::EcdsaSig,
    error::ErrorStack,
    hash::MessageDigest,
    pkey::{PKey, Private},
};

use crate::{
    error::{self, KeyRejectedReason},
    jwa::{Algorithm, DigestType, Family},
    jws::{self, KeyId, KeyIdRef, VerifierSettings},
    key::{KeyKind, KeyMaterial, KeyUsage, OpensslKey},
};

/// A supported elliptic curve
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum Curve {
    /// P-256 (`prime256v1`)
    P256,
    /// P-384 (`secp384r1`)
    P384,
    /// P-521 (`secp521r1`)
    P521,
    /// secp256k1
    Secp256k1,
}

impl Curve {
    /// The JWA identifier for signatures over this curve
    #[must_use]
    pub const fn algorithm(self) -> Algorithm {
        match self {
            Self::P256 => Algorithm::ES256,
            Self::P384 => Algorithm::ES384,
            Self::P521 => Algorithm::ES512,
            Self::Secp256k1 => Algorithm::ES256K,
        }
    }

    /// The digest paired with this curve
    #[must_use]
    pub const fn digest(self) -> DigestType {
        match self {
            Self::P256 | Self::Secp256k1 => DigestType::Sha256,
            Self::P384 => DigestType::Sha384,
            Self::P521 => DigestType::Sha512,
        }
    }

    /// The width of each of `r` and `s` in a signature, in bytes
    #[must_use]
    pub const fn coordinate_size(self) -> usize {
        match self {
            Self::P256 | Self::Secp256k1 => 32,
            Self::P384 => 48,
            Self::P521 => 66,
        }
    }

    fn message_digest(self) -> MessageDigest {
        match self {
            Self::P256 | Self::Secp256k1 => MessageDigest::sha256(),
            Self::P384 => MessageDigest::sha384(),
            Self::P521 => MessageDigest::sha512(),
        }
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::P256 => "prime256v1",
            Self::P384 => "secp384r1",
            Self::P521 => "secp521r1",
            Self::Secp256k1 => "secp256k1",
        })
    }
}

fn identify(key: &KeyMaterial, usage: KeyUsage) -> Result<Curve, error::InvalidSettings> {
    let curve = match key.kind() {
        KeyKind::Ec(Some(curve)) => curve,
        KeyKind::Ec(None) => {
            return Err(error::key_rejected(KeyRejectedReason::UnsupportedCurve).into())
        }
        _ => return Err(error::key_rejected(KeyRejectedReason::AlgorithmMismatch).into()),
    };

    key.require(usage)?;

    #[cfg(feature = "tracing")]
    tracing::trace!(alg = %curve.algorithm(), %curve, %usage, "bound EC key");

    Ok(curve)
}

/// Converts a DER signature to fixed-width `r || s`
fn der_to_fixed(der: &[u8], curve: Curve) -> Result<Vec<u8>, ErrorStack> {
    let sig = EcdsaSig::from_der(der)?;
    let width = i32::try_from(curve.coordinate_size()).unwrap_or(i32::MAX);

    let mut fixed = sig.r().to_vec_padded(width)?;
    fixed.extend(sig.s().to_vec_padded(width)?);
    Ok(fixed)
}

/// Converts a fixed-width `r || s` signature to DER
///
/// Returns `None` if the signature has the wrong length for the curve.
fn fixed_to_der(fixed: &[u8], curve: Curve) -> Option<Vec<u8>> {
    let width = curve.coordinate_size();
    if fixed.len() != width * 2 {
        return None;
    }

    let (r, s) = fixed.split_at(width);
    let r = BigNum::from_slice(r).ok()?;
    let s = BigNum::from_slice(s).ok()?;
    EcdsaSig::from_private_components(r, s).ok()?.to_der().ok()
}

/// Signs tokens with an elliptic curve private key
#[must_use]
pub struct EcdsaSigner {
    key: PKey<Private>,
    curve: Curve,
    key_id: Option<KeyId>,
}

impl EcdsaSigner {
    /// Binds an EC private key; the curve selects the algorithm
    ///
    /// # Errors
    ///
    /// * The key is not an EC private key
    /// * The key's curve is not supported
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
    pub fn curve(&self) -> Curve {
        self.curve
    }

    fn sign_inner(&self, data: &[u8]) -> Result<Vec<u8>, ErrorStack> {
        let mut signer = openssl::sign::Signer::new(self.curve.message_digest(), &self.key)?;
        signer.update(data)?;
        der_to_fixed(&signer.sign_to_vec()?, self.curve)
    }
}

impl jws::Signer for EcdsaSigner {
    fn family(&self) -> Family {
        Family::Ecdsa
    }

    fn algorithm(&self) -> Algorithm {
        self.curve.algorithm()
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

impl fmt::Debug for EcdsaSigner {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("EcdsaSigner")
            .field("curve", &self.curve)
            .field("key_id", &self.key_id)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Verifies tokens signed with an elliptic curve key
#[must_use]
pub struct EcdsaVerifier {
    key: OpensslKey,
    curve: Curve,
    settings: VerifierSettings,
}

impl EcdsaVerifier {
    /// Binds an EC public or private key; the curve selects the algorithm
    ///
    /// # Errors
    ///
    /// * The key is not an EC key
    /// * The key's curve is not supported
    pub fn new(key: &KeyMaterial) -> Result<Self, error::InvalidSettings> {
        let curve = identify(key, KeyUsage::Public)?;
        let key = key
            .openssl()
            .cloned()
            .ok_or_else(|| error::key_rejected(KeyRejectedReason::AlgorithmMismatch))?;

        Ok(Self {
            key,
            curve,
            settings: VerifierSettings::new("EcdsaJwaVerifier"),
        })
    }

    /// The curve of the bound key
    pub fn curve(&self) -> Curve {
        self.curve
    }

    fn verify_inner(&self, data: &[u8], der: &[u8]) -> Result<bool, ErrorStack> {
        let mut verifier = self.key.verifier(Some(self.curve.message_digest()))?;
        verifier.update(data)?;
        verifier.verify(der)
    }
}

jws::verifier_settings!(EcdsaVerifier);

impl jws::Verifier for EcdsaVerifier {
    fn family(&self) -> Family {
        Family::Ecdsa
    }

    fn algorithm(&self) -> Algorithm {
        self.curve.algorithm()
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
        match fixed_to_der(signature, self.curve) {
            Some(der) => self.verify_inner(data, &der).unwrap_or(false),
            None => false,
        }
    }
}

impl fmt::Debug for EcdsaVerifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("EcdsaVerifier")
            .field("curve", &self.curve)
            .field("settings", &self.settings)
            .finish()
    }
}
