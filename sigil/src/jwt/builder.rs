//! Fluent assembly of signed tokens
//!
//! ```
//! use sigil::{jwa::{DigestType, HmacSigner}, jwt::builder::JwtBuilder};
//! use sigil_clock::UnixTime;
//!
//! let signer = HmacSigner::new("secret", DigestType::Sha256).unwrap();
//! let token = JwtBuilder::new(&signer)
//!     .issuer("authority").unwrap()
//!     .subject("alice").unwrap()
//!     .audience("my_api").unwrap()
//!     .expiration(UnixTime(1_900_000_000)).unwrap()
//!     .build()
//!     .unwrap();
//! # let _ = token;
//! ```

use serde_json::{Map, Value};
use sigil_clock::UnixTime;

use crate::{
    error::{self, InvalidClaim, SigningError},
    jws::{KeyIdRef, Signer},
    jwt::{self, Header, Jwt, Payload},
};

/// Header names registered by RFC 7515
const REGISTERED_HEADERS: &[&str] = &[
    "alg", "jku", "jwk", "kid", "x5u", "x5c", "x5t", "x5t#S256", "typ", "cty", "crit",
];

/// Options for [`JwtBuilder::set_header_claim`]
#[derive(Clone, Copy, Debug, Default)]
pub struct HeaderClaimOptions {
    /// Lists the claim in the `crit` header
    pub critical: bool,
    /// Skips the type check for registered header names
    pub skip_validation: bool,
}

/// Options for [`JwtBuilder::set_payload_claim`]
#[derive(Clone, Copy, Debug, Default)]
pub struct PayloadClaimOptions {
    /// Skips the type check for registered claim names
    pub skip_validation: bool,
}

/// Builds and signs a token
///
/// `alg` and `typ` are always written by the signer and cannot be set.
#[derive(Debug)]
#[must_use]
pub struct JwtBuilder<'s> {
    signer: &'s dyn Signer,
    header: Header,
    payload: Payload,
}

fn non_empty_str(value: &Value) -> bool {
    value.as_str().map_or(false, |s| !s.is_empty())
}

fn non_empty_str_array(value: &Value) -> bool {
    value
        .as_array()
        .map_or(false, |a| !a.is_empty() && a.iter().all(non_empty_str))
}

fn check_header(name: &str, value: &Value) -> Result<(), InvalidClaim> {
    let (ok, expected) = match name {
        "cty" | "kid" | "jku" | "x5u" | "x5t" | "x5t#S256" => {
            (non_empty_str(value), "a non-empty string")
        }
        "jwk" => (value.is_object(), "a JSON object"),
        "x5c" => (
            non_empty_str_array(value),
            "a non-empty array of non-empty strings",
        ),
        _ => return Ok(()),
    };

    if ok {
        Ok(())
    } else {
        Err(error::invalid_claim(name, expected))
    }
}

fn check_payload(name: &str, value: &Value) -> Result<(), InvalidClaim> {
    let (ok, expected) = match name {
        "exp" | "nbf" | "iat" => (jwt::safe_integer(value).is_some(), "a safe integer"),
        "iss" | "sub" | "jti" => (non_empty_str(value), "a non-empty string"),
        "aud" => (
            non_empty_str(value) || non_empty_str_array(value),
            "a non-empty string or a non-empty array of non-empty strings",
        ),
        _ => return Ok(()),
    };

    if ok {
        Ok(())
    } else {
        Err(error::invalid_claim(name, expected))
    }
}

impl<'s> JwtBuilder<'s> {
    /// Starts a token with an empty header and payload
    pub fn new(signer: &'s dyn Signer) -> Self {
        Self {
            signer,
            header: Header::new(),
            payload: Payload::new(),
        }
    }

    /// Sets a header claim
    ///
    /// `alg` and `typ` are ignored. A critical claim is appended to
    /// `crit`, unless it is a registered header name; those are set but
    /// never listed.
    ///
    /// # Errors
    ///
    /// * The claim is `crit`
    /// * A registered header has the wrong type
    pub fn set_header_claim(
        mut self,
        name: &str,
        value: impl Into<Value>,
        options: HeaderClaimOptions,
    ) -> Result<Self, InvalidClaim> {
        match name {
            "alg" | "typ" => return Ok(self),
            "crit" => return Err(error::invalid_claim(name, "set by marking claims critical")),
            _ => {}
        }

        let value = value.into();
        if !options.skip_validation {
            check_header(name, &value)?;
        }

        self.header.insert(name.to_owned(), value);

        if options.critical && !REGISTERED_HEADERS.contains(&name) {
            let crit = self
                .header
                .entry("crit")
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(names) = crit {
                if !names.iter().any(|n| n.as_str() == Some(name)) {
                    names.push(Value::from(name));
                }
            }
        }

        Ok(self)
    }

    /// Sets a payload claim
    ///
    /// # Errors
    ///
    /// A registered claim has the wrong type.
    pub fn set_payload_claim(
        mut self,
        name: &str,
        value: impl Into<Value>,
        options: PayloadClaimOptions,
    ) -> Result<Self, InvalidClaim> {
        let value = value.into();
        if !options.skip_validation {
            check_payload(name, &value)?;
        }

        self.payload.insert(name.to_owned(), value);
        Ok(self)
    }

    fn header_claim(self, name: &str, value: impl Into<Value>) -> Result<Self, InvalidClaim> {
        self.set_header_claim(name, value, HeaderClaimOptions::default())
    }

    fn payload_claim(self, name: &str, value: impl Into<Value>) -> Result<Self, InvalidClaim> {
        self.set_payload_claim(name, value, PayloadClaimOptions::default())
    }

    /// Sets `kid`
    ///
    /// # Errors
    ///
    /// The key ID is empty.
    pub fn key_id(self, kid: &KeyIdRef) -> Result<Self, InvalidClaim> {
        self.header_claim("kid", kid.as_str())
    }

    /// Sets `cty`
    ///
    /// # Errors
    ///
    /// The content type is empty.
    pub fn content_type(self, cty: &str) -> Result<Self, InvalidClaim> {
        self.header_claim("cty", cty)
    }

    /// Sets `x5c` from base64-encoded DER certificates
    ///
    /// # Errors
    ///
    /// The chain or one of its certificates is empty.
    pub fn x509_cert_chain<I, S>(self, chain: I) -> Result<Self, InvalidClaim>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let chain: Vec<Value> = chain.into_iter().map(|c| Value::String(c.into())).collect();
        self.header_claim("x5c", chain)
    }

    /// Sets `x5t`
    ///
    /// # Errors
    ///
    /// The thumbprint is empty.
    pub fn x509_thumbprint_sha1(self, thumbprint: &str) -> Result<Self, InvalidClaim> {
        self.header_claim("x5t", thumbprint)
    }

    /// Sets `x5t#S256`
    ///
    /// # Errors
    ///
    /// The thumbprint is empty.
    pub fn x509_thumbprint_sha256(self, thumbprint: &str) -> Result<Self, InvalidClaim> {
        self.header_claim("x5t#S256", thumbprint)
    }

    /// Sets `jku`
    ///
    /// # Errors
    ///
    /// The URL is empty.
    pub fn jwk_set_url(self, url: &str) -> Result<Self, InvalidClaim> {
        self.header_claim("jku", url)
    }

    /// Sets `jwk`
    ///
    /// # Errors
    ///
    /// Never fails for an object; kept fallible for symmetry with the
    /// other setters.
    pub fn jwk(self, jwk: Map<String, Value>) -> Result<Self, InvalidClaim> {
        self.header_claim("jwk", Value::Object(jwk))
    }

    /// Sets `x5u`
    ///
    /// # Errors
    ///
    /// The URL is empty.
    pub fn x509_url(self, url: &str) -> Result<Self, InvalidClaim> {
        self.header_claim("x5u", url)
    }

    /// Sets `exp`
    ///
    /// # Errors
    ///
    /// The time is beyond the safe integer range.
    pub fn expiration(self, time: UnixTime) -> Result<Self, InvalidClaim> {
        self.payload_claim("exp", time.0)
    }

    /// Sets `nbf`
    ///
    /// # Errors
    ///
    /// The time is beyond the safe integer range.
    pub fn not_before(self, time: UnixTime) -> Result<Self, InvalidClaim> {
        self.payload_claim("nbf", time.0)
    }

    /// Sets `iat`
    ///
    /// # Errors
    ///
    /// The time is beyond the safe integer range.
    pub fn issued_at(self, time: UnixTime) -> Result<Self, InvalidClaim> {
        self.payload_claim("iat", time.0)
    }

    /// Sets `jti`
    ///
    /// # Errors
    ///
    /// The ID is empty.
    pub fn jwt_id(self, jti: &str) -> Result<Self, InvalidClaim> {
        self.payload_claim("jti", jti)
    }

    /// Sets `iss`
    ///
    /// # Errors
    ///
    /// The issuer is empty.
    pub fn issuer(self, iss: &str) -> Result<Self, InvalidClaim> {
        self.payload_claim("iss", iss)
    }

    /// Sets `sub`
    ///
    /// # Errors
    ///
    /// The subject is empty.
    pub fn subject(self, sub: &str) -> Result<Self, InvalidClaim> {
        self.payload_claim("sub", sub)
    }

    /// Sets `aud` to a single audience or an array of audiences
    ///
    /// # Errors
    ///
    /// The audience, or one of the audiences, is empty.
    pub fn audience(self, aud: impl Into<Value>) -> Result<Self, InvalidClaim> {
        self.payload_claim("aud", aud)
    }

    /// The header assembled so far, without `alg` and `typ`
    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// The payload assembled so far
    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Signs the token
    ///
    /// # Errors
    ///
    /// See [`stringify`][jwt::stringify].
    pub fn build(&self) -> Result<Jwt, SigningError> {
        jwt::stringify(&self.header, &self.payload, self.signer)
    }
}
