//! Claims validators
//!
//! Each validator checks one aspect of a token's payload and can be
//! placed in a [`JwtVerifier`][crate::verifier::JwtVerifier] or
//! [`JwtAsyncVerifier`][crate::verifier::JwtAsyncVerifier] pipeline.
//! None of them check the signature; list a verifier ahead of them.

mod allowlist;
mod audience;
mod issuer;
mod time;

pub use allowlist::{Allowlist, AllowlistEntry};
pub use audience::AudienceValidator;
pub use issuer::{IssuerValidator, SubjectValidator};
pub use time::{ClaimCheck, OnMissing, TimeValidityValidator};
