//! Implementations of the JSON Web Algorithms (JWA) standard
//!
//! The specifications for these algorithms can be found in [RFC7518][],
//! with EdDSA from [RFC8037][]. ML-DSA follows FIPS 204.
//!
//! Each family module provides a signer and a verifier. The JWA
//! identifier and digest are derived from the key and options when the
//! signer or verifier is constructed, and never change afterwards.
//!
//! [RFC7518]: https://tools.ietf.org/html/rfc7518
//! [RFC8037]: https://tools.ietf.org/html/rfc8037

pub mod ec;
pub mod eddsa;
pub mod hmac;
pub mod ml_dsa;
pub mod rsa;

mod algorithm;

pub use algorithm::{Algorithm, DigestType, Family, UnknownAlgorithm};
#[doc(inline)]
pub use ec::{EcdsaSigner, EcdsaVerifier};
#[doc(inline)]
pub use eddsa::{EddsaSigner, EddsaVerifier};
#[doc(inline)]
pub use hmac::{HmacSigner, HmacVerifier};
#[doc(inline)]
pub use ml_dsa::{MlDsaSigner, MlDsaVerifier};
#[doc(inline)]
pub use rsa::{RsaPadding, RsaSigner, RsaVerifier};
