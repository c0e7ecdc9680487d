use std::{convert::TryFrom, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// A JSON Web Algorithm identifier, as placed in the `alg` header
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum Algorithm {
    /// HMAC using SHA-256
    HS256,
    /// HMAC using SHA-384
    HS384,
    /// HMAC using SHA-512
    HS512,
    /// RSASSA-PKCS1-v1_5 using SHA-256
    RS256,
    /// RSASSA-PKCS1-v1_5 using SHA-384
    RS384,
    /// RSASSA-PKCS1-v1_5 using SHA-512
    RS512,
    /// RSASSA-PSS using SHA-256 and MGF1 with SHA-256
    PS256,
    /// RSASSA-PSS using SHA-384 and MGF1 with SHA-384
    PS384,
    /// RSASSA-PSS using SHA-512 and MGF1 with SHA-512
    PS512,
    /// ECDSA using P-256 and SHA-256
    ES256,
    /// ECDSA using P-384 and SHA-384
    ES384,
    /// ECDSA using P-521 and SHA-512
    ES512,
    /// ECDSA using secp256k1 and SHA-256
    ES256K,
    /// Edwards-curve signatures (Ed25519 or Ed448)
    EdDSA,
    /// ML-DSA-44
    #[serde(rename = "ML-DSA-44")]
    MlDsa44,
    /// ML-DSA-65
    #[serde(rename = "ML-DSA-65")]
    MlDsa65,
    /// ML-DSA-87
    #[serde(rename = "ML-DSA-87")]
    MlDsa87,
}

impl Algorithm {
    /// Every supported algorithm
    pub const ALL: [Algorithm; 17] = [
        Self::HS256,
        Self::HS384,
        Self::HS512,
        Self::RS256,
        Self::RS384,
        Self::RS512,
        Self::PS256,
        Self::PS384,
        Self::PS512,
        Self::ES256,
        Self::ES384,
        Self::ES512,
        Self::ES256K,
        Self::EdDSA,
        Self::MlDsa44,
        Self::MlDsa65,
        Self::MlDsa87,
    ];

    /// The identifier as it appears in a JWT header
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HS256 => "HS256",
            Self::HS384 => "HS384",
            Self::HS512 => "HS512",
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::RS512 => "RS512",
            Self::PS256 => "PS256",
            Self::PS384 => "PS384",
            Self::PS512 => "PS512",
            Self::ES256 => "ES256",
            Self::ES384 => "ES384",
            Self::ES512 => "ES512",
            Self::ES256K => "ES256K",
            Self::EdDSA => "EdDSA",
            Self::MlDsa44 => "ML-DSA-44",
            Self::MlDsa65 => "ML-DSA-65",
            Self::MlDsa87 => "ML-DSA-87",
        }
    }

    /// The family that implements this algorithm
    #[must_use]
    pub const fn family(self) -> Family {
        match self {
            Self::HS256 | Self::HS384 | Self::HS512 => Family::Hmac,
            Self::RS256
            | Self::RS384
            | Self::RS512
            | Self::PS256
            | Self::PS384
            | Self::PS512 => Family::Rsa,
            Self::ES256 | Self::ES384 | Self::ES512 | Self::ES256K => Family::Ecdsa,
            Self::EdDSA => Family::EdDsa,
            Self::MlDsa44 | Self::MlDsa65 | Self::MlDsa87 => Family::MlDsa,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The provided name is not a supported algorithm
#[derive(Debug, thiserror::Error)]
#[error("'{alg}' does not match supported algorithms")]
pub struct UnknownAlgorithm {
    alg: String,
}

impl TryFrom<&'_ str> for Algorithm {
    type Error = UnknownAlgorithm;

    #[inline]
    fn try_from(value: &'_ str) -> Result<Self, Self::Error> {
        Self::ALL
            .iter()
            .copied()
            .find(|alg| alg.as_str() == value)
            .ok_or_else(|| UnknownAlgorithm {
                alg: value.to_string(),
            })
    }
}

impl FromStr for Algorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s)
    }
}

/// The digest used by an algorithm
///
/// For EdDSA the digest is intrinsic to the curve and informational only.
/// ML-DSA has no externally selectable digest and reports [`Auto`][Self::Auto].
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestType {
    /// SHA-256
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
    /// SHAKE256
    Shake256,
    /// Determined by the algorithm itself
    Auto,
}

impl DigestType {
    /// The digest name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
            Self::Shake256 => "shake256",
            Self::Auto => "auto",
        }
    }

    pub(crate) fn message_digest(self) -> Option<openssl::hash::MessageDigest> {
        use openssl::hash::MessageDigest;

        match self {
            Self::Sha256 => Some(MessageDigest::sha256()),
            Self::Sha384 => Some(MessageDigest::sha384()),
            Self::Sha512 => Some(MessageDigest::sha512()),
            Self::Shake256 | Self::Auto => None,
        }
    }
}

impl fmt::Display for DigestType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A family of signing algorithms
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum Family {
    /// HMAC with a shared secret
    Hmac,
    /// RSASSA-PKCS1-v1_5 and RSASSA-PSS
    Rsa,
    /// ECDSA over the NIST curves and secp256k1
    Ecdsa,
    /// Ed25519 and Ed448
    EdDsa,
    /// Module-lattice signatures (FIPS 204)
    MlDsa,
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Hmac => "HMAC",
            Self::Rsa => "RSA",
            Self::Ecdsa => "ECDSA",
            Self::EdDsa => "EdDSA",
            Self::MlDsa => "ML-DSA",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_round_trip_through_from_str() -> color_eyre::Result<()> {
        for alg in Algorithm::ALL.iter().copied() {
            assert_eq!(alg.as_str().parse::<Algorithm>()?, alg);
        }
        Ok(())
    }

    #[test]
    fn identifiers_are_case_sensitive() {
        assert!("hs256".parse::<Algorithm>().is_err());
        assert!("none".parse::<Algorithm>().is_err());
        assert!("ml-dsa-44".parse::<Algorithm>().is_err());
    }

    #[test]
    fn serde_uses_header_identifiers() -> color_eyre::Result<()> {
        assert_eq!(serde_json::to_string(&Algorithm::MlDsa65)?, "\"ML-DSA-65\"");
        assert_eq!(
            serde_json::from_str::<Algorithm>("\"ES256K\"")?,
            Algorithm::ES256K
        );
        assert_eq!(serde_json::to_string(&DigestType::Shake256)?, "\"shake256\"");
        Ok(())
    }
}
