//! This crate signs and verifies JSON Web Tokens using the JSON Web
//! Signature (JWS) compact serialization, including:
//!
//! * JSON Web Signature (JWS): [RFC7515][]
//! * JSON Web Algorithms (JWA): [RFC7518][], with EdDSA from [RFC8037][]
//! * JSON Web Token (JWT): [RFC7519][]
//! * ML-DSA signatures from FIPS 204
//!
//! Signers and verifiers bind their key material once, at construction.
//! Misconfiguration (a public key where a private key is needed, a key
//! from another family, an RSA key that is too small) is reported then,
//! never while a token is being processed.
//!
//! [RFC7515]: https://tools.ietf.org/html/rfc7515
//! [RFC7518]: https://tools.ietf.org/html/rfc7518
//! [RFC7519]: https://tools.ietf.org/html/rfc7519
//! [RFC8037]: https://tools.ietf.org/html/rfc8037
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use sigil::{
//!     jwa::{EcdsaSigner, EcdsaVerifier},
//!     jwt::builder::JwtBuilder,
//!     validators::{AudienceValidator, IssuerValidator},
//!     verifier::{JwtVerifier, Validator},
//!     KeyMaterial,
//! };
//! # use openssl::{ec::{EcGroup, EcKey}, nid::Nid, pkey::PKey};
//! # let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
//! # let ec = PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap();
//! # let private_pem = String::from_utf8(ec.private_key_to_pem_pkcs8().unwrap()).unwrap();
//! # let public_pem = String::from_utf8(ec.public_key_to_pem().unwrap()).unwrap();
//!
//! let signer = EcdsaSigner::new(&KeyMaterial::from_pem(&private_pem).unwrap()).unwrap();
//! let token = JwtBuilder::new(&signer)
//!     .issuer("authority").unwrap()
//!     .audience("my_api").unwrap()
//!     .build()
//!     .unwrap();
//!
//! let validators: Vec<Arc<dyn Validator>> = vec![
//!     Arc::new(EcdsaVerifier::new(&KeyMaterial::from_pem(&public_pem).unwrap()).unwrap()),
//!     Arc::new(IssuerValidator::new(vec!["authority"])),
//!     Arc::new(AudienceValidator::new(vec!["my_api"])),
//! ];
//! let verifier = JwtVerifier::new(validators).unwrap();
//!
//! let parsed = verifier.verify(token.as_str()).expect("JWT was invalid");
//! assert_eq!(parsed.header()["alg"], "ES256");
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

pub mod error;
pub mod jwa;
pub mod jws;
pub mod jwt;
pub mod key;
pub mod validators;
pub mod verifier;

#[cfg(test)]
pub(crate) mod test;

#[doc(inline)]
pub use jwt::{Jwt, JwtRef, ParsedJwt};
#[doc(inline)]
pub use key::KeyMaterial;
