//! Verification pipelines
//!
//! A pipeline parses a token and then runs an ordered list of named
//! validators against it, stopping at the first failure. Signature
//! verifiers are validators too, so a typical pipeline lists a verifier
//! first and the claims validators after it.
//!
//! ```
//! use std::sync::Arc;
//!
//! use sigil::{
//!     jwa::{DigestType, HmacSigner, HmacVerifier},
//!     jwt::{self, Header},
//!     validators::{IssuerValidator, TimeValidityValidator},
//!     verifier::{JwtVerifier, Validator},
//! };
//!
//! let signer = HmacSigner::new("secret", DigestType::Sha256).unwrap();
//! let token = jwt::stringify(
//!     &Header::new(),
//!     &serde_json::json!({ "iss": "authority", "exp": 4_000_000_000_u64 }),
//!     &signer,
//! )
//! .unwrap();
//!
//! let validators: Vec<Arc<dyn Validator>> = vec![
//!     Arc::new(HmacVerifier::new("secret", DigestType::Sha256).unwrap()),
//!     Arc::new(IssuerValidator::new(vec!["authority"])),
//!     Arc::new(TimeValidityValidator::new()),
//! ];
//! let verifier = JwtVerifier::new(validators).unwrap();
//!
//! let parsed = verifier.verify(token.as_str()).unwrap();
//! assert_eq!(parsed.payload()["iss"], "authority");
//! ```

use std::{collections::HashSet, fmt, sync::Arc};

use async_trait::async_trait;

use crate::{
    error::{InvalidSettings, ValidationError, VerifyError},
    jwt::{self, ParsedJwt},
};

/// A named check run against a parsed token
pub trait Validator: Send + Sync {
    /// The name reported when this validator rejects a token
    ///
    /// Names must be unique within a pipeline.
    fn name(&self) -> &str;

    /// Checks the token
    ///
    /// # Errors
    ///
    /// The token is rejected.
    fn validate(&self, token: &ParsedJwt) -> Result<(), ValidationError>;
}

/// A named check that may suspend, such as a revocation lookup
#[async_trait]
pub trait AsyncValidator: Send + Sync {
    /// The name reported when this validator rejects a token
    ///
    /// Names must be unique within a pipeline.
    fn name(&self) -> &str;

    /// Checks the token
    ///
    /// # Errors
    ///
    /// The token is rejected.
    async fn validate(&self, token: &ParsedJwt) -> Result<(), ValidationError>;
}

/// A validator in an asynchronous pipeline
#[derive(Clone)]
pub enum ValidatorEntry {
    /// A validator that completes without suspending
    Immediate(Arc<dyn Validator>),
    /// A validator that is awaited
    Deferred(Arc<dyn AsyncValidator>),
}

impl ValidatorEntry {
    /// Wraps a synchronous validator
    pub fn immediate<V: Validator + 'static>(validator: V) -> Self {
        Self::Immediate(Arc::new(validator))
    }

    /// Wraps an asynchronous validator
    pub fn deferred<V: AsyncValidator + 'static>(validator: V) -> Self {
        Self::Deferred(Arc::new(validator))
    }

    /// The validator's name
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Immediate(v) => v.name(),
            Self::Deferred(v) => v.name(),
        }
    }
}

impl From<Arc<dyn Validator>> for ValidatorEntry {
    fn from(validator: Arc<dyn Validator>) -> Self {
        Self::Immediate(validator)
    }
}

impl From<Arc<dyn AsyncValidator>> for ValidatorEntry {
    fn from(validator: Arc<dyn AsyncValidator>) -> Self {
        Self::Deferred(validator)
    }
}

impl fmt::Debug for ValidatorEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Immediate(v) => f.debug_tuple("Immediate").field(&v.name()).finish(),
            Self::Deferred(v) => f.debug_tuple("Deferred").field(&v.name()).finish(),
        }
    }
}

fn check_names<'a>(names: impl Iterator<Item = &'a str>) -> Result<(), InvalidSettings> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(InvalidSettings::DuplicateValidatorName(name.to_owned()));
        }
    }

    if seen.is_empty() {
        Err(InvalidSettings::EmptyValidatorList)
    } else {
        Ok(())
    }
}

fn parse(token: &str) -> Result<ParsedJwt, VerifyError> {
    jwt::parse(token).map_err(|err| {
        #[cfg(feature = "tracing")]
        tracing::debug!(kind = err.kind().code(), "token could not be parsed");

        err.with_validator("")
    })
}

fn reject(name: &str, err: ValidationError, token: ParsedJwt) -> VerifyError {
    let err = err.into_verify_error().with_validator(name);

    #[cfg(feature = "tracing")]
    tracing::debug!(
        validator = name,
        kind = err.kind().code(),
        claim = err.claim().unwrap_or_default(),
        "token rejected"
    );

    err.with_token(token)
}

/// A synchronous verification pipeline
pub struct JwtVerifier {
    validators: Vec<Arc<dyn Validator>>,
}

impl JwtVerifier {
    /// Builds a pipeline that runs the validators in order
    ///
    /// # Errors
    ///
    /// * [`InvalidSettings::EmptyValidatorList`] if no validators are given
    /// * [`InvalidSettings::DuplicateValidatorName`] if two validators share
    ///   a name
    pub fn new(validators: Vec<Arc<dyn Validator>>) -> Result<Self, InvalidSettings> {
        check_names(validators.iter().map(|v| v.name()))?;
        Ok(Self { validators })
    }

    /// The names of the validators, in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.validators.iter().map(|v| v.name())
    }

    /// Parses the token and runs every validator against it
    ///
    /// # Errors
    ///
    /// The token could not be parsed, or a validator rejected it. A
    /// parse failure reports an empty validator name. A rejection
    /// reports the validator's name and carries the decoded token.
    pub fn verify(&self, token: &str) -> Result<ParsedJwt, VerifyError> {
        let parsed = parse(token)?;

        for validator in &self.validators {
            if let Err(err) = validator.validate(&parsed) {
                return Err(reject(validator.name(), err, parsed));
            }
        }

        Ok(parsed)
    }
}

impl fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("JwtVerifier")
            .field("validators", &self.names().collect::<Vec<_>>())
            .finish()
    }
}

/// An asynchronous verification pipeline
///
/// Validators run one at a time, in order. Deferred validators are
/// awaited before the next validator starts.
#[derive(Debug)]
pub struct JwtAsyncVerifier {
    validators: Vec<ValidatorEntry>,
}

impl JwtAsyncVerifier {
    /// Builds a pipeline that runs the validators in order
    ///
    /// # Errors
    ///
    /// * [`InvalidSettings::EmptyValidatorList`] if no validators are given
    /// * [`InvalidSettings::DuplicateValidatorName`] if two validators share
    ///   a name
    pub fn new(validators: Vec<ValidatorEntry>) -> Result<Self, InvalidSettings> {
        check_names(validators.iter().map(ValidatorEntry::name))?;
        Ok(Self { validators })
    }

    /// The names of the validators, in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.validators.iter().map(ValidatorEntry::name)
    }

    /// Parses the token and runs every validator against it
    ///
    /// # Errors
    ///
    /// See [`JwtVerifier::verify`].
    pub async fn verify(&self, token: &str) -> Result<ParsedJwt, VerifyError> {
        let parsed = parse(token)?;

        for entry in &self.validators {
            let result = match entry {
                ValidatorEntry::Immediate(v) => v.validate(&parsed),
                ValidatorEntry::Deferred(v) => v.validate(&parsed).await,
            };

            if let Err(err) = result {
                return Err(reject(entry.name(), err, parsed));
            }
        }

        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    use serde_json::json;
    #[cfg(feature = "tracing")]
    use tracing_test::traced_test;

    use super::*;
    use crate::{
        error::VerifyErrorKind,
        jwa::{DigestType, HmacSigner, HmacVerifier},
        jws::Verifier as _,
        jwt::Header,
        validators::IssuerValidator,
    };

    struct Counting {
        name: &'static str,
        calls: AtomicUsize,
        outcome: Option<VerifyErrorKind>,
    }

    impl Counting {
        fn new(name: &'static str, outcome: Option<VerifyErrorKind>) -> Arc<Self> {
            Arc::new(Self {
                name,
                calls: AtomicUsize::new(0),
                outcome,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Validator for Counting {
        fn name(&self) -> &str {
            self.name
        }

        fn validate(&self, _: &ParsedJwt) -> Result<(), ValidationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.outcome {
                Some(kind) => Err(kind.into()),
                None => Ok(()),
            }
        }
    }

    struct Revocation {
        revoked: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl AsyncValidator for Revocation {
        fn name(&self) -> &str {
            "RevocationList"
        }

        async fn validate(&self, token: &ParsedJwt) -> Result<(), ValidationError> {
            tokio::task::yield_now().await;
            self.log.lock().unwrap().push("revocation");

            if token.payload().get("jti").and_then(|v| v.as_str()) == Some(self.revoked) {
                Err(ValidationError::custom("token has been revoked"))
            } else {
                Ok(())
            }
        }
    }

    struct Logged {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Validator for Logged {
        fn name(&self) -> &str {
            self.name
        }

        fn validate(&self, _: &ParsedJwt) -> Result<(), ValidationError> {
            self.log.lock().unwrap().push(self.name);
            Ok(())
        }
    }

    fn token(payload: serde_json::Value) -> String {
        let signer = HmacSigner::new("k", DigestType::Sha256).unwrap();
        jwt::stringify(&Header::new(), &payload, &signer)
            .unwrap()
            .as_str()
            .to_owned()
    }

    fn hmac() -> Arc<dyn Validator> {
        Arc::new(HmacVerifier::new("k", DigestType::Sha256).unwrap())
    }

    #[test]
    fn empty_and_duplicate_lists_are_rejected() {
        let err = JwtVerifier::new(Vec::new()).unwrap_err();
        assert!(matches!(err, InvalidSettings::EmptyValidatorList));

        let a = Counting::new("A", None);
        let b = Counting::new("A", None);
        let err = JwtVerifier::new(vec![a, b]).unwrap_err();
        assert!(matches!(err, InvalidSettings::DuplicateValidatorName(ref n) if n == "A"));

        let err = JwtAsyncVerifier::new(Vec::new()).unwrap_err();
        assert!(matches!(err, InvalidSettings::EmptyValidatorList));

        let err = JwtAsyncVerifier::new(vec![
            ValidatorEntry::Immediate(hmac()),
            ValidatorEntry::immediate(HmacVerifier::new("k", DigestType::Sha256).unwrap()),
        ])
        .unwrap_err();
        assert!(matches!(err, InvalidSettings::DuplicateValidatorName(ref n) if n == "HmacJwaVerifier"));
    }

    #[test]
    fn first_failure_short_circuits() -> color_eyre::Result<()> {
        let a = Counting::new("A", Some(VerifyErrorKind::Expired));
        let b = Counting::new("B", Some(VerifyErrorKind::NotValidYet));
        let verifier = JwtVerifier::new(vec![a.clone(), b.clone()])?;

        let err = verifier.verify(&token(json!({ "sub": "alice" }))).unwrap_err();
        assert_eq!(err.kind(), VerifyErrorKind::Expired);
        assert_eq!(err.validator(), Some("A"));
        assert_eq!(err.payload().and_then(|p| p.get("sub")), Some(&json!("alice")));
        assert!(err.signed_content().is_some());
        assert!(err.signature().is_some());
        assert_eq!(err.header().and_then(|h| h.get("alg")), Some(&json!("HS256")));

        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 0);
        Ok(())
    }

    #[test]
    fn parse_failures_name_no_validator() -> color_eyre::Result<()> {
        let a = Counting::new("A", None);
        let verifier = JwtVerifier::new(vec![a.clone()])?;

        let err = verifier.verify("not-a-token").unwrap_err();
        assert_eq!(err.kind(), VerifyErrorKind::InvalidFormat);
        assert_eq!(err.validator(), Some(""));
        assert!(err.payload().is_none());
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(a.calls(), 0);
        Ok(())
    }

    #[test]
    fn passing_tokens_are_returned() -> color_eyre::Result<()> {
        let verifier = JwtVerifier::new(vec![
            hmac(),
            Arc::new(IssuerValidator::new(vec!["authority"])),
        ])?;

        let parsed = verifier.verify(&token(json!({ "iss": "authority" })))?;
        assert_eq!(parsed.payload().get("iss"), Some(&json!("authority")));

        let err = verifier.verify(&token(json!({ "iss": "intruder" }))).unwrap_err();
        assert_eq!(err.kind(), VerifyErrorKind::InvalidPayloadClaim);
        assert_eq!(err.validator(), Some("JwtIssuerValidator"));
        Ok(())
    }

    #[test]
    fn signature_failures_are_attributed() -> color_eyre::Result<()> {
        let verifier = JwtVerifier::new(vec![hmac()])?;
        let mut forged = token(json!({}));
        forged.push('A');

        let err = verifier.verify(&forged).unwrap_err();
        assert_eq!(err.kind(), VerifyErrorKind::SignatureVerifyFailed);
        assert_eq!(err.validator(), Some("HmacJwaVerifier"));
        Ok(())
    }

    #[test]
    fn alg_check_can_be_disabled_at_runtime() -> color_eyre::Result<()> {
        let hs256 = Arc::new(HmacVerifier::new("k", DigestType::Sha256)?);
        let verifier = JwtVerifier::new(vec![hs256.clone()])?;

        let signer = HmacSigner::new("k", DigestType::Sha512)?;
        let hs512 = jwt::stringify(&Header::new(), &json!({}), &signer)?;

        let err = verifier.verify(hs512.as_str()).unwrap_err();
        assert_eq!(err.kind(), VerifyErrorKind::SignatureAlgMismatch);

        hs256.set_check_alg_claim(false);
        let err = verifier.verify(hs512.as_str()).unwrap_err();
        assert_eq!(err.kind(), VerifyErrorKind::SignatureVerifyFailed);
        Ok(())
    }

    #[tokio::test]
    async fn async_pipeline_runs_in_order() -> color_eyre::Result<()> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let verifier = JwtAsyncVerifier::new(vec![
            ValidatorEntry::immediate(Logged {
                name: "first",
                log: log.clone(),
            }),
            ValidatorEntry::deferred(Revocation {
                revoked: "stolen",
                log: log.clone(),
            }),
            ValidatorEntry::immediate(Logged {
                name: "last",
                log: log.clone(),
            }),
        ])?;

        let _parsed = verifier.verify(&token(json!({ "jti": "fine" }))).await?;
        assert_eq!(*log.lock().unwrap(), ["first", "revocation", "last"]);

        log.lock().unwrap().clear();
        let err = verifier
            .verify(&token(json!({ "jti": "stolen" })))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), VerifyErrorKind::UnknownError);
        assert_eq!(err.validator(), Some("RevocationList"));
        assert_eq!(
            std::error::Error::source(&err).map(ToString::to_string).as_deref(),
            Some("token has been revoked")
        );
        assert_eq!(*log.lock().unwrap(), ["first", "revocation"]);
        Ok(())
    }

    #[tokio::test]
    async fn async_pipeline_reports_parse_failures() -> color_eyre::Result<()> {
        let verifier = JwtAsyncVerifier::new(vec![ValidatorEntry::Immediate(hmac())])?;
        let err = verifier.verify("a.b").await.unwrap_err();
        assert_eq!(err.kind(), VerifyErrorKind::InvalidFormat);
        assert_eq!(err.validator(), Some(""));
        Ok(())
    }

    #[test]
    #[cfg_attr(feature = "tracing", traced_test)]
    fn rejections_are_logged() -> color_eyre::Result<()> {
        let verifier = JwtVerifier::new(vec![Counting::new("Strict", Some(VerifyErrorKind::Expired))])?;
        let _ = verifier.verify(&token(json!({})));

        #[cfg(feature = "tracing")]
        assert!(logs_contain("token rejected"));
        Ok(())
    }
}
