//! ML-DSA (FIPS 204) signature implementations
//!
//! ML-DSA has no externally selectable digest; signers and verifiers
//! report [`DigestType::Auto`].

use std::fmt;

use der::{
    asn1::{ObjectIdentifier, OctetStringRef},
    Decode, Sequence,
};
use pqcrypto_traits::sign::{DetachedSignature as _, PublicKey as _, SecretKey as _};

use crate::{
    error::{self, KeyRejected, KeyRejectedReason},
    jwa::{Algorithm, DigestType, Family},
    jws::{self, KeyId, KeyIdRef, VerifierSettings},
    key::{KeyKind, KeyMaterial, KeyUsage},
};

/// Runs `$body` with `$m` bound to the pqcrypto module for `$params`
macro_rules! with_params {
    ($params:expr, $m:ident => $body:expr) => {
        match $params {
            ParameterSet::MlDsa44 => {
                use pqcrypto_mldsa::mldsa44 as $m;
                $body
            }
            ParameterSet::MlDsa65 => {
                use pqcrypto_mldsa::mldsa65 as $m;
                $body
            }
            ParameterSet::MlDsa87 => {
                use pqcrypto_mldsa::mldsa87 as $m;
                $body
            }
        }
    };
}

/// An ML-DSA parameter set
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum ParameterSet {
    /// ML-DSA-44
    MlDsa44,
    /// ML-DSA-65
    MlDsa65,
    /// ML-DSA-87
    MlDsa87,
}

impl ParameterSet {
    /// The JWA identifier for this parameter set
    #[must_use]
    pub const fn algorithm(self) -> Algorithm {
        match self {
            Self::MlDsa44 => Algorithm::MlDsa44,
            Self::MlDsa65 => Algorithm::MlDsa65,
            Self::MlDsa87 => Algorithm::MlDsa87,
        }
    }

    /// The algorithm identifier used in PKCS#8 and SPKI
    #[must_use]
    pub const fn oid(self) -> ObjectIdentifier {
        match self {
            Self::MlDsa44 => ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.3.17"),
            Self::MlDsa65 => ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.3.18"),
            Self::MlDsa87 => ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.3.19"),
        }
    }

    /// Recognizes an ML-DSA algorithm identifier
    #[must_use]
    pub fn from_oid(oid: ObjectIdentifier) -> Option<Self> {
        [Self::MlDsa44, Self::MlDsa65, Self::MlDsa87]
            .iter()
            .copied()
            .find(|p| p.oid() == oid)
    }

    /// Length of an encoded public key
    #[must_use]
    pub fn public_key_len(self) -> usize {
        with_params!(self, m => m::public_key_bytes())
    }

    /// Length of an encoded (expanded) secret key
    #[must_use]
    pub fn secret_key_len(self) -> usize {
        with_params!(self, m => m::secret_key_bytes())
    }

    /// Length of a signature
    #[must_use]
    pub fn signature_len(self) -> usize {
        with_params!(self, m => m::signature_bytes())
    }
}

impl fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.algorithm().as_str())
    }
}

/// Raw ML-DSA key encodings
#[derive(Clone)]
pub(crate) struct RawKey {
    params: ParameterSet,
    public: Option<Vec<u8>>,
    secret: Option<Vec<u8>>,
}

impl RawKey {
    pub(crate) fn new(
        params: ParameterSet,
        public: Option<&[u8]>,
        secret: Option<&[u8]>,
    ) -> Result<Self, KeyRejected> {
        if let Some(public) = public {
            if public.len() != params.public_key_len() {
                return Err(error::malformed_key(format!(
                    "{} public key must be {} bytes",
                    params,
                    params.public_key_len()
                )));
            }
        }

        if let Some(secret) = secret {
            if secret.len() != params.secret_key_len() {
                return Err(error::malformed_key(format!(
                    "{} secret key must be {} bytes",
                    params,
                    params.secret_key_len()
                )));
            }
        }

        Ok(Self {
            params,
            public: public.map(<[u8]>::to_vec),
            secret: secret.map(<[u8]>::to_vec),
        })
    }

    pub(crate) fn params(&self) -> ParameterSet {
        self.params
    }

    pub(crate) fn public(&self) -> Option<&[u8]> {
        self.public.as_deref()
    }

    pub(crate) fn secret(&self) -> Option<&[u8]> {
        self.secret.as_deref()
    }
}

/// The `both` form of an ML-DSA private key
#[derive(Sequence)]
struct SeedAndExpandedKey<'a> {
    #[allow(dead_code)]
    seed: OctetStringRef<'a>,
    expanded_key: OctetStringRef<'a>,
}

/// Extracts the expanded secret key from a PKCS#8 `privateKey` field
///
/// The expanded-key and seed-and-expanded-key forms are accepted, as is
/// a bare expanded key. Seed-only keys cannot be expanded here.
pub(crate) fn decode_private_key(
    params: ParameterSet,
    private_key: &[u8],
) -> Result<Vec<u8>, KeyRejected> {
    if private_key.len() == params.secret_key_len() {
        return Ok(private_key.to_vec());
    }

    match private_key.first() {
        Some(0x04) => OctetStringRef::from_der(private_key)
            .map(|k| k.as_bytes().to_vec())
            .map_err(error::malformed_key),
        Some(0x30) => SeedAndExpandedKey::from_der(private_key)
            .map(|k| k.expanded_key.as_bytes().to_vec())
            .map_err(error::malformed_key),
        Some(0x80) => Err(error::malformed_key(
            "seed-only ML-DSA private keys are not supported",
        )),
        _ => Err(error::malformed_key("unrecognized ML-DSA private key encoding")),
    }
}

fn identify(key: &KeyMaterial, usage: KeyUsage) -> Result<ParameterSet, error::InvalidSettings> {
    let params = match key.kind() {
        KeyKind::MlDsa(params) => params,
        _ => return Err(error::key_rejected(KeyRejectedReason::AlgorithmMismatch).into()),
    };

    key.require(usage)?;

    #[cfg(feature = "tracing")]
    tracing::trace!(%params, %usage, "bound ML-DSA key");

    Ok(params)
}

/// Signs tokens with an ML-DSA private key
#[must_use]
pub struct MlDsaSigner {
    params: ParameterSet,
    secret: Vec<u8>,
    key_id: Option<KeyId>,
}

impl MlDsaSigner {
    /// Binds an ML-DSA private key; the parameter set selects the algorithm
    ///
    /// # Errors
    ///
    /// The key is not an ML-DSA private key.
    pub fn new(key: &KeyMaterial) -> Result<Self, error::InvalidSettings> {
        let params = identify(key, KeyUsage::Private)?;
        let secret = key
            .ml_dsa()
            .and_then(RawKey::secret)
            .ok_or_else(|| error::key_rejected(KeyRejectedReason::UsageMismatch))?;

        Ok(Self {
            params,
            secret: secret.to_vec(),
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

    /// The parameter set of the bound key
    pub fn parameter_set(&self) -> ParameterSet {
        self.params
    }
}

impl jws::Signer for MlDsaSigner {
    fn family(&self) -> Family {
        Family::MlDsa
    }

    fn algorithm(&self) -> Algorithm {
        self.params.algorithm()
    }

    fn digest_type(&self) -> DigestType {
        DigestType::Auto
    }

    fn key_id(&self) -> Option<&KeyIdRef> {
        self.key_id.as_deref()
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, error::SigningError> {
        with_params!(self.params, m => {
            let sk = m::SecretKey::from_bytes(&self.secret).map_err(error::sign_failed)?;
            Ok(m::detached_sign(data, &sk).as_bytes().to_vec())
        })
    }
}

impl fmt::Debug for MlDsaSigner {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("MlDsaSigner")
            .field("params", &self.params)
            .field("key_id", &self.key_id)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Verifies tokens signed with an ML-DSA key
#[must_use]
pub struct MlDsaVerifier {
    params: ParameterSet,
    public: Vec<u8>,
    settings: VerifierSettings,
}

impl MlDsaVerifier {
    /// Binds an ML-DSA public key, or a private key carrying its public key
    ///
    /// # Errors
    ///
    /// * The key is not an ML-DSA key
    /// * The key is private and its public key is not available
    pub fn new(key: &KeyMaterial) -> Result<Self, error::InvalidSettings> {
        let params = identify(key, KeyUsage::Public)?;
        let public = key
            .ml_dsa()
            .and_then(RawKey::public)
            .ok_or_else(|| error::key_rejected(KeyRejectedReason::PublicKeyUnavailable))?;

        Ok(Self {
            params,
            public: public.to_vec(),
            settings: VerifierSettings::new("MldsaJwaVerifier"),
        })
    }

    /// The parameter set of the bound key
    pub fn parameter_set(&self) -> ParameterSet {
        self.params
    }
}

jws::verifier_settings!(MlDsaVerifier);

impl jws::Verifier for MlDsaVerifier {
    fn family(&self) -> Family {
        Family::MlDsa
    }

    fn algorithm(&self) -> Algorithm {
        self.params.algorithm()
    }

    fn digest_type(&self) -> DigestType {
        DigestType::Auto
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
        with_params!(self.params, m => {
            let pk = match m::PublicKey::from_bytes(&self.public) {
                Ok(pk) => pk,
                Err(_) => return false,
            };
            let sig = match m::DetachedSignature::from_bytes(signature) {
                Ok(sig) => sig,
                Err(_) => return false,
            };
            m::verify_detached_signature(&sig, data, &pk).is_ok()
        })
    }
}

impl fmt::Debug for MlDsaVerifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("MlDsaVerifier")
            .field("params", &self.params)
            .field("settings", &self.settings)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use der::Encode;

    use super::*;
    use crate::{
        jws::{Signer, Verifier},
        test,
    };

    #[test]
    fn parameter_sets_round_trip() -> color_eyre::Result<()> {
        let cases = [
            (&*test::ml_dsa::ML_DSA_44, Algorithm::MlDsa44),
            (&*test::ml_dsa::ML_DSA_65, Algorithm::MlDsa65),
            (&*test::ml_dsa::ML_DSA_87, Algorithm::MlDsa87),
        ];

        for (pair, alg) in cases.iter() {
            let signer = MlDsaSigner::new(&KeyMaterial::from_pem(&pair.private_pem)?)?;
            let verifier = MlDsaVerifier::new(&KeyMaterial::from_pem(&pair.public_pem)?)?;

            assert_eq!(signer.algorithm(), *alg);
            assert_eq!(signer.digest_type(), DigestType::Auto);
            assert_eq!(verifier.name(), "MldsaJwaVerifier");

            let sig = signer.sign(b"content")?;
            assert_eq!(sig.len(), signer.parameter_set().signature_len());
            assert!(verifier.verify_signature(b"content", &sig));
            assert!(!verifier.verify_signature(b"tampered", &sig));
            assert!(!verifier.verify_signature(b"content", &sig[..sig.len() - 1]));
        }
        Ok(())
    }

    #[test]
    fn raw_keys_load() -> color_eyre::Result<()> {
        let pair = &*test::ml_dsa::ML_DSA_44;
        let private =
            KeyMaterial::ml_dsa_private(ParameterSet::MlDsa44, &pair.secret, Some(&pair.public))?;
        let public = KeyMaterial::ml_dsa_public(ParameterSet::MlDsa44, &pair.public)?;

        let sig = MlDsaSigner::new(&private)?.sign(b"content")?;
        assert!(MlDsaVerifier::new(&public)?.verify_signature(b"content", &sig));
        assert!(MlDsaVerifier::new(&private)?.verify_signature(b"content", &sig));
        Ok(())
    }

    #[test]
    fn wrong_lengths_are_rejected() {
        let err = KeyMaterial::ml_dsa_public(ParameterSet::MlDsa65, &[0; 10]).unwrap_err();
        assert_eq!(err.reason(), KeyRejectedReason::MalformedKey);

        let pair = &*test::ml_dsa::ML_DSA_44;
        let err = KeyMaterial::ml_dsa_public(ParameterSet::MlDsa87, &pair.public).unwrap_err();
        assert_eq!(err.reason(), KeyRejectedReason::MalformedKey);
    }

    #[test]
    fn private_key_forms() -> color_eyre::Result<()> {
        let pair = &*test::ml_dsa::ML_DSA_44;
        let params = ParameterSet::MlDsa44;

        let expanded = OctetStringRef::new(&pair.secret)?.to_der()?;
        assert_eq!(decode_private_key(params, &expanded)?, pair.secret);

        let both = SeedAndExpandedKey {
            seed: OctetStringRef::new(&[7; 32])?,
            expanded_key: OctetStringRef::new(&pair.secret)?,
        }
        .to_der()?;
        assert_eq!(decode_private_key(params, &both)?, pair.secret);

        assert_eq!(decode_private_key(params, &pair.secret)?, pair.secret);

        let mut seed_only = vec![0x80, 32];
        seed_only.extend_from_slice(&[7; 32]);
        let err = decode_private_key(params, &seed_only).unwrap_err();
        assert_eq!(err.reason(), KeyRejectedReason::MalformedKey);
        Ok(())
    }

    #[test]
    fn verifier_needs_public_key() -> color_eyre::Result<()> {
        let pair = &*test::ml_dsa::ML_DSA_65;
        let key = KeyMaterial::ml_dsa_private(ParameterSet::MlDsa65, &pair.secret, None)?;

        let _signer = MlDsaSigner::new(&key)?;
        let err = MlDsaVerifier::new(&key).unwrap_err();
        assert_eq!(err.key_rejected_reason(), Some(KeyRejectedReason::PublicKeyUnavailable));
        Ok(())
    }

    #[test]
    fn public_key_cannot_sign() -> color_eyre::Result<()> {
        let key = KeyMaterial::from_pem(&test::ml_dsa::ML_DSA_87.public_pem)?;
        let err = MlDsaSigner::new(&key).unwrap_err();
        assert_eq!(err.key_rejected_reason(), Some(KeyRejectedReason::UsageMismatch));
        Ok(())
    }

    #[test]
    fn classical_keys_are_rejected() -> color_eyre::Result<()> {
        let key = KeyMaterial::from_pem(&test::eddsa::ED25519.public_pem)?;
        let err = MlDsaVerifier::new(&key).unwrap_err();
        assert_eq!(err.key_rejected_reason(), Some(KeyRejectedReason::AlgorithmMismatch));
        Ok(())
    }
}
