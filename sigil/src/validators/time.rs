use std::borrow::Cow;

use serde_json::Value;
use sigil_clock::{Clock, System};

use crate::{
    error::{self, ValidationError, VerifyError, VerifyErrorKind},
    jwt::{self, ParsedJwt, Payload},
    verifier::Validator,
};

/// What to do when a checked time claim is absent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OnMissing {
    /// Reject the token
    Reject,
    /// Accept the token
    Skip,
}

/// How one time claim is checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClaimCheck {
    /// Whether the claim is checked at all
    pub check: bool,
    /// What to do when the claim is absent
    pub on_missing: OnMissing,
}

impl ClaimCheck {
    /// Checks the claim and rejects tokens without it
    pub const REQUIRED: Self = Self {
        check: true,
        on_missing: OnMissing::Reject,
    };

    /// Checks the claim when it is present
    pub const OPTIONAL: Self = Self {
        check: true,
        on_missing: OnMissing::Skip,
    };

    /// Ignores the claim
    pub const IGNORED: Self = Self {
        check: false,
        on_missing: OnMissing::Skip,
    };
}

/// Checks the `exp` and `nbf` claims against a clock
///
/// By default `exp` is required and `nbf` is checked only when present.
/// A token expires at the start of the `exp` second and becomes valid at
/// the start of the `nbf` second. Comparisons are made in milliseconds.
#[derive(Debug, Clone)]
#[must_use]
pub struct TimeValidityValidator<C = System> {
    clock: C,
    exp: ClaimCheck,
    nbf: ClaimCheck,
    name: Cow<'static, str>,
}

impl TimeValidityValidator {
    /// Checks against the system clock
    pub fn new() -> Self {
        Self::with_clock(System)
    }
}

impl Default for TimeValidityValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> TimeValidityValidator<C> {
    /// Checks against the given clock
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            exp: ClaimCheck::REQUIRED,
            nbf: ClaimCheck::OPTIONAL,
            name: Cow::Borrowed("JwtTimeValidityValidator"),
        }
    }

    /// Sets how `exp` is checked
    pub fn with_expiration(self, exp: ClaimCheck) -> Self {
        Self { exp, ..self }
    }

    /// Sets how `nbf` is checked
    pub fn with_not_before(self, nbf: ClaimCheck) -> Self {
        Self { nbf, ..self }
    }

    /// Overrides the default name, `JwtTimeValidityValidator`
    pub fn with_name(self, name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    /// The clock checked against
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// The clock checked against
    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// How `exp` is checked
    #[must_use]
    pub fn expiration(&self) -> ClaimCheck {
        self.exp
    }

    /// How `nbf` is checked
    #[must_use]
    pub fn not_before(&self) -> ClaimCheck {
        self.nbf
    }
}

/// Reads a checked time claim as milliseconds since the epoch
fn read_millis(
    payload: &Payload,
    claim: &'static str,
    check: ClaimCheck,
) -> Result<Option<i128>, VerifyError> {
    match payload.get(claim) {
        None | Some(Value::Null) => match check.on_missing {
            OnMissing::Reject => Err(error::missing_payload_claim(claim)),
            OnMissing::Skip => Ok(None),
        },
        Some(value) => jwt::safe_integer(value)
            .map(|secs| Some(i128::from(secs) * 1000))
            .ok_or_else(|| error::invalid_payload_claim(claim)),
    }
}

impl<C: Clock + Send + Sync> Validator for TimeValidityValidator<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self, token: &ParsedJwt) -> Result<(), ValidationError> {
        let now = i128::from(self.clock.now_millis().0);

        if self.exp.check {
            if let Some(exp) = read_millis(token.payload(), "exp", self.exp)? {
                if now >= exp {
                    return Err(VerifyError::new(VerifyErrorKind::Expired)
                        .with_claim("exp")
                        .into());
                }
            }
        }

        if self.nbf.check {
            if let Some(nbf) = read_millis(token.payload(), "nbf", self.nbf)? {
                if now < nbf {
                    return Err(VerifyError::new(VerifyErrorKind::NotValidYet)
                        .with_claim("nbf")
                        .into());
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use sigil_clock::{TestClock, UnixMillis, UnixTime};

    use super::*;

    fn token(payload: Value) -> ParsedJwt {
        let payload = match payload {
            Value::Object(map) => map,
            _ => Payload::new(),
        };
        ParsedJwt::new(Default::default(), payload, "e30.e30", Vec::new())
    }

    fn kind(result: Result<(), ValidationError>) -> Option<VerifyErrorKind> {
        result.err().map(|e| e.into_verify_error().kind())
    }

    fn at(secs: u64) -> TimeValidityValidator<TestClock> {
        TimeValidityValidator::with_clock(TestClock::new(UnixTime(secs)))
    }

    #[test]
    fn expiration_is_exclusive_of_now() {
        let v = at(1_000);
        assert_eq!(v.name(), "JwtTimeValidityValidator");

        assert!(v.validate(&token(json!({ "exp": 1_001 }))).is_ok());
        assert_eq!(
            kind(v.validate(&token(json!({ "exp": 1_000 })))),
            Some(VerifyErrorKind::Expired)
        );
        assert_eq!(
            kind(v.validate(&token(json!({ "exp": 999 })))),
            Some(VerifyErrorKind::Expired)
        );
    }

    #[test]
    fn not_before_is_inclusive_of_now() {
        let v = at(1_000).with_expiration(ClaimCheck::IGNORED);

        assert!(v.validate(&token(json!({ "nbf": 1_000 }))).is_ok());
        assert!(v.validate(&token(json!({ "nbf": 999 }))).is_ok());
        assert_eq!(
            kind(v.validate(&token(json!({ "nbf": 1_001 })))),
            Some(VerifyErrorKind::NotValidYet)
        );
    }

    #[test]
    fn comparisons_use_milliseconds() {
        let mut v = TimeValidityValidator::with_clock(TestClock::with_millis(UnixMillis(999_999)));
        assert!(v.validate(&token(json!({ "exp": 1_000, "nbf": 999 }))).is_ok());

        v.clock_mut().inc_millis(1);
        assert_eq!(
            kind(v.validate(&token(json!({ "exp": 1_000 })))),
            Some(VerifyErrorKind::Expired)
        );

        let v = TimeValidityValidator::with_clock(TestClock::with_millis(UnixMillis(999_999)))
            .with_expiration(ClaimCheck::IGNORED);
        assert_eq!(
            kind(v.validate(&token(json!({ "nbf": 1_000 })))),
            Some(VerifyErrorKind::NotValidYet)
        );
    }

    #[test]
    fn missing_claims_follow_policy() {
        let v = at(1_000);
        let err = v.validate(&token(json!({}))).unwrap_err().into_verify_error();
        assert_eq!(err.kind(), VerifyErrorKind::MissingPayloadClaim);
        assert_eq!(err.claim(), Some("exp"));

        assert!(v.validate(&token(json!({ "exp": null }))).is_err());

        let v = at(1_000).with_expiration(ClaimCheck::OPTIONAL);
        assert!(v.validate(&token(json!({}))).is_ok());

        let v = at(1_000)
            .with_expiration(ClaimCheck::OPTIONAL)
            .with_not_before(ClaimCheck::REQUIRED);
        assert_eq!(
            kind(v.validate(&token(json!({})))),
            Some(VerifyErrorKind::MissingPayloadClaim)
        );
    }

    #[test]
    fn ignored_claims_are_not_read() {
        let v = at(1_000)
            .with_expiration(ClaimCheck::IGNORED)
            .with_not_before(ClaimCheck::IGNORED);
        assert!(v
            .validate(&token(json!({ "exp": "soon", "nbf": 5_000 })))
            .is_ok());
    }

    #[test]
    fn time_claims_must_be_safe_integers() {
        let v = at(1_000);
        for exp in vec![
            json!("2000"),
            json!(2000.5),
            json!(9_007_199_254_740_992_u64),
            json!(true),
        ] {
            assert_eq!(
                kind(v.validate(&token(json!({ "exp": exp })))),
                Some(VerifyErrorKind::InvalidPayloadClaim)
            );
        }

        assert!(v.validate(&token(json!({ "exp": 2000.0 }))).is_ok());
        assert!(v.validate(&token(json!({ "exp": 9_007_199_254_740_991_u64 }))).is_ok());
    }

    #[test]
    fn negative_times_are_compared() {
        let v = at(0).with_expiration(ClaimCheck::IGNORED);
        assert!(v.validate(&token(json!({ "nbf": -5 }))).is_ok());

        let v = at(0);
        assert_eq!(
            kind(v.validate(&token(json!({ "exp": -5 })))),
            Some(VerifyErrorKind::Expired)
        );
    }

    #[test]
    fn system_clock_by_default() {
        let v = TimeValidityValidator::default();
        assert_eq!(v.expiration(), ClaimCheck::REQUIRED);
        assert_eq!(v.not_before(), ClaimCheck::OPTIONAL);
        assert!(v.validate(&token(json!({ "exp": 4_000_000_000_u64 }))).is_ok());
        assert!(v.validate(&token(json!({ "exp": 1 }))).is_err());
    }
}
