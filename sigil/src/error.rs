//! Common errors
//!
//! Construction-time problems surface as [`InvalidSettings`] (wrapping
//! [`KeyRejected`] for key material), signing problems as [`SigningError`],
//! and every per-token failure as a [`VerifyError`] carrying a
//! [`VerifyErrorKind`].

#![allow(missing_copy_implementations)]

use std::{error::Error as StdError, fmt};

use thiserror::Error;

use crate::{
    jwa::{DigestType, Family},
    jwt::{Header, ParsedJwt, Payload},
};

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// The reason key material was rejected
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum KeyRejectedReason {
    /// The key encoding could not be parsed
    MalformedKey,
    /// The key belongs to a different algorithm family
    AlgorithmMismatch,
    /// A public key was supplied where a private key is required
    UsageMismatch,
    /// The key's curve or parameter set is not supported
    UnsupportedCurve,
    /// The RSA modulus is below the signing minimum
    KeyTooSmall,
    /// The key is restricted to a different digest
    DigestMismatch,
    /// The key requires RSA-PSS padding but PKCS#1 v1.5 was requested
    PaddingMismatch,
    /// The public half of the key is not available
    PublicKeyUnavailable,
}

impl fmt::Display for KeyRejectedReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::MalformedKey => "malformed key",
            Self::AlgorithmMismatch => "key algorithm does not match",
            Self::UsageMismatch => "key usage does not match",
            Self::UnsupportedCurve => "unsupported curve or parameter set",
            Self::KeyTooSmall => "key is too small",
            Self::DigestMismatch => "key is restricted to a different digest",
            Self::PaddingMismatch => "key requires RSA-PSS padding",
            Self::PublicKeyUnavailable => "public key is not available",
        })
    }
}

/// The key was rejected
#[derive(Debug, Error)]
#[error("key rejected: {reason}")]
pub struct KeyRejected {
    reason: KeyRejectedReason,
    #[source]
    source: Option<BoxError>,
}

impl KeyRejected {
    /// Why the key was rejected
    #[must_use]
    pub fn reason(&self) -> KeyRejectedReason {
        self.reason
    }
}

#[inline]
pub(crate) fn key_rejected(reason: KeyRejectedReason) -> KeyRejected {
    KeyRejected {
        reason,
        source: None,
    }
}

#[inline]
pub(crate) fn malformed_key(source: impl Into<BoxError>) -> KeyRejected {
    KeyRejected {
        reason: KeyRejectedReason::MalformedKey,
        source: Some(source.into()),
    }
}

/// A signer, verifier, or pipeline could not be constructed
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InvalidSettings {
    /// The digest cannot be used by this algorithm family
    #[error("digest '{digest}' is not supported for {family}")]
    UnsupportedDigest {
        /// The digest requested
        digest: DigestType,
        /// The family that rejected it
        family: Family,
    },

    /// The key material was rejected
    #[error(transparent)]
    KeyRejected(#[from] KeyRejected),

    /// A pipeline was given no validators
    #[error("at least one validator is required")]
    EmptyValidatorList,

    /// Two validators in a pipeline share a name
    #[error("duplicate validator name '{0}'")]
    DuplicateValidatorName(String),
}

impl InvalidSettings {
    /// Whether the error is due to the key material
    #[must_use]
    pub fn is_key_rejected(&self) -> bool {
        matches!(self, Self::KeyRejected(_))
    }

    /// The reason the key was rejected, if that is why construction failed
    #[must_use]
    pub fn key_rejected_reason(&self) -> Option<KeyRejectedReason> {
        match self {
            Self::KeyRejected(k) => Some(k.reason()),
            _ => None,
        }
    }
}

#[inline]
pub(crate) const fn unsupported_digest(digest: DigestType, family: Family) -> InvalidSettings {
    InvalidSettings::UnsupportedDigest { digest, family }
}

/// An error occurred while signing
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SigningError {
    /// The header or payload could not be serialized as a JSON object
    #[error("JWT content could not be serialized")]
    InvalidContent(#[source] BoxError),

    /// The cryptographic provider refused to sign
    #[error("signing failed")]
    Failed(#[source] BoxError),
}

#[inline]
pub(crate) fn invalid_content(source: impl Into<BoxError>) -> SigningError {
    SigningError::InvalidContent(source.into())
}

#[inline]
pub(crate) fn sign_failed(source: impl Into<BoxError>) -> SigningError {
    SigningError::Failed(source.into())
}

/// A builder claim failed its type check
#[derive(Debug, Error)]
#[error("invalid value for claim '{name}': {expected}")]
pub struct InvalidClaim {
    name: String,
    expected: &'static str,
}

impl InvalidClaim {
    /// The offending claim name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[inline]
pub(crate) fn invalid_claim(name: impl Into<String>, expected: &'static str) -> InvalidClaim {
    InvalidClaim {
        name: name.into(),
        expected,
    }
}

/// Fine-grained reason a token failed verification
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum VerifyErrorKind {
    /// The token is not three base64url-encoded segments of JSON objects
    InvalidFormat,
    /// The `typ` header is present but is not `JWT`
    InvalidTypHeader,
    /// The `alg` header is present but is not a supported algorithm
    InvalidAlgHeader,
    /// The `alg` header names a different algorithm than the verifier
    SignatureAlgMismatch,
    /// The signature did not verify
    SignatureVerifyFailed,
    /// A required claim is absent
    MissingPayloadClaim,
    /// A claim has the wrong type or was not allowed
    InvalidPayloadClaim,
    /// The token has expired
    Expired,
    /// The token is not valid yet
    NotValidYet,
    /// A validator failed with an error outside this taxonomy
    UnknownError,
}

impl VerifyErrorKind {
    /// A stable machine-readable code for the kind
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidFormat => "invalid_format",
            Self::InvalidTypHeader => "invalid_typ_header",
            Self::InvalidAlgHeader => "invalid_alg_header",
            Self::SignatureAlgMismatch => "signature_alg_mismatch",
            Self::SignatureVerifyFailed => "signature_verify_failed",
            Self::MissingPayloadClaim => "missing_payload_claim",
            Self::InvalidPayloadClaim => "invalid_payload_claim",
            Self::Expired => "expired",
            Self::NotValidYet => "not_valid_yet",
            Self::UnknownError => "unknown_error",
        }
    }
}

impl fmt::Display for VerifyErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::InvalidFormat => "invalid JWT format",
            Self::InvalidTypHeader => "invalid typ header",
            Self::InvalidAlgHeader => "invalid alg header",
            Self::SignatureAlgMismatch => "signature algorithm mismatch",
            Self::SignatureVerifyFailed => "signature verification failed",
            Self::MissingPayloadClaim => "missing payload claim",
            Self::InvalidPayloadClaim => "invalid payload claim",
            Self::Expired => "token expired",
            Self::NotValidYet => "token not valid yet",
            Self::UnknownError => "unknown error",
        })
    }
}

/// The token failed verification
///
/// The pipelines decorate this error with the name of the failing
/// validator and the decoded token. Parse failures carry an empty
/// validator name and no token.
#[derive(Error)]
pub struct VerifyError {
    kind: VerifyErrorKind,
    claim: Option<String>,
    validator: Option<String>,
    token: Option<Box<ParsedJwt>>,
    #[source]
    source: Option<BoxError>,
}

impl VerifyError {
    /// Creates an error of the given kind
    #[must_use]
    pub fn new(kind: VerifyErrorKind) -> Self {
        Self {
            kind,
            claim: None,
            validator: None,
            token: None,
            source: None,
        }
    }

    /// Wraps an error from outside this taxonomy
    #[must_use]
    pub fn unknown(source: impl Into<BoxError>) -> Self {
        Self::new(VerifyErrorKind::UnknownError).with_source(source)
    }

    /// Names the claim responsible for the failure
    #[must_use]
    pub fn with_claim(self, claim: impl Into<String>) -> Self {
        Self {
            claim: Some(claim.into()),
            ..self
        }
    }

    /// Attaches an underlying cause
    #[must_use]
    pub fn with_source(self, source: impl Into<BoxError>) -> Self {
        Self {
            source: Some(source.into()),
            ..self
        }
    }

    pub(crate) fn with_validator(self, validator: impl Into<String>) -> Self {
        Self {
            validator: Some(validator.into()),
            ..self
        }
    }

    pub(crate) fn with_token(self, token: ParsedJwt) -> Self {
        Self {
            token: Some(Box::new(token)),
            ..self
        }
    }

    /// The reason verification failed
    #[must_use]
    pub fn kind(&self) -> VerifyErrorKind {
        self.kind
    }

    /// The claim responsible for the failure, if any
    #[must_use]
    pub fn claim(&self) -> Option<&str> {
        self.claim.as_deref()
    }

    /// The name of the validator that rejected the token
    ///
    /// Empty when the token could not be parsed.
    #[must_use]
    pub fn validator(&self) -> Option<&str> {
        self.validator.as_deref()
    }

    /// The decoded token header
    #[must_use]
    pub fn header(&self) -> Option<&Header> {
        self.token.as_deref().map(ParsedJwt::header)
    }

    /// The decoded token payload
    #[must_use]
    pub fn payload(&self) -> Option<&Payload> {
        self.token.as_deref().map(ParsedJwt::payload)
    }

    /// The exact content that was signed
    #[must_use]
    pub fn signed_content(&self) -> Option<&str> {
        self.token.as_deref().map(ParsedJwt::signed_content)
    }

    /// The raw signature bytes
    #[must_use]
    pub fn signature(&self) -> Option<&[u8]> {
        self.token.as_deref().map(ParsedJwt::signature)
    }

    /// Whether the token failed because it has expired
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.kind == VerifyErrorKind::Expired
    }

    /// Whether the signature itself was rejected
    #[must_use]
    pub fn is_signature_failure(&self) -> bool {
        matches!(
            self.kind,
            VerifyErrorKind::SignatureVerifyFailed | VerifyErrorKind::SignatureAlgMismatch
        )
    }
}

impl From<VerifyErrorKind> for VerifyError {
    #[inline]
    fn from(kind: VerifyErrorKind) -> Self {
        Self::new(kind)
    }
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.kind, f)?;
        if let Some(claim) = &self.claim {
            write!(f, " ('{}')", claim)?;
        }
        match self.validator.as_deref() {
            Some("") => f.write_str(" while parsing"),
            Some(v) => write!(f, " in validator '{}'", v),
            None => Ok(()),
        }
    }
}

/// Token contents are withheld; only their presence is shown.
impl fmt::Debug for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("VerifyError")
            .field("kind", &self.kind)
            .field("claim", &self.claim)
            .field("validator", &self.validator)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("source", &self.source)
            .finish()
    }
}

#[inline]
pub(crate) fn invalid_format(source: impl Into<BoxError>) -> VerifyError {
    VerifyError::new(VerifyErrorKind::InvalidFormat).with_source(source)
}

#[inline]
pub(crate) fn signature_verify_failed() -> VerifyError {
    VerifyError::new(VerifyErrorKind::SignatureVerifyFailed)
}

#[inline]
pub(crate) fn signature_alg_mismatch() -> VerifyError {
    VerifyError::new(VerifyErrorKind::SignatureAlgMismatch).with_claim("alg")
}

#[inline]
pub(crate) fn invalid_payload_claim(claim: &str) -> VerifyError {
    VerifyError::new(VerifyErrorKind::InvalidPayloadClaim).with_claim(claim)
}

#[inline]
pub(crate) fn missing_payload_claim(claim: &str) -> VerifyError {
    VerifyError::new(VerifyErrorKind::MissingPayloadClaim).with_claim(claim)
}

/// An error raised by a claims validator
///
/// Validators return [`VerifyError`] for failures in the documented
/// taxonomy. Any other error is carried as [`Custom`][Self::Custom] and
/// reported by the pipelines as [`VerifyErrorKind::UnknownError`].
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A failure within the documented taxonomy
    #[error(transparent)]
    Rejected(#[from] VerifyError),

    /// Any other failure
    #[error(transparent)]
    Custom(BoxError),
}

impl ValidationError {
    /// Wraps an arbitrary error
    pub fn custom(source: impl Into<BoxError>) -> Self {
        Self::Custom(source.into())
    }

    pub(crate) fn into_verify_error(self) -> VerifyError {
        match self {
            Self::Rejected(e) => e,
            Self::Custom(e) => VerifyError::unknown(e),
        }
    }
}

impl From<VerifyErrorKind> for ValidationError {
    #[inline]
    fn from(kind: VerifyErrorKind) -> Self {
        Self::Rejected(VerifyError::new(kind))
    }
}
