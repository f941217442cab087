// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2022-2024 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Typed access to the claims of a JWT payload.
//!
//! A payload is handled as a `HashMap<String, serde_json::Value>`. Each known
//! claim is a [`Claim`] constant which knows how to extract, deserialize and
//! validate itself, removing the entry from the map on the way.

use std::{collections::HashMap, marker::PhantomData, ops::Deref};

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sha2::{Digest, Sha256, Sha384, Sha512};
use thiserror::Error;

use crate::jwa::JsonWebSignatureAlg;

#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("missing claim {0:?}")]
    MissingClaim(&'static str),

    #[error("invalid claim {0:?}")]
    InvalidClaim(&'static str),

    #[error("could not validate claim {claim:?}")]
    ValidationError {
        claim: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

pub trait Validator<T> {
    type Error;

    /// Validate a claim value
    ///
    /// # Errors
    ///
    /// Returns an error if the value is invalid.
    fn validate(&self, value: &T) -> Result<(), Self::Error>;
}

impl<T> Validator<T> for () {
    type Error = std::convert::Infallible;

    fn validate(&self, _value: &T) -> Result<(), Self::Error> {
        Ok(())
    }
}

pub struct Claim<T> {
    claim: &'static str,
    t: PhantomData<T>,
}

impl<T> Claim<T>
where
    T: Serialize + DeserializeOwned,
{
    #[must_use]
    pub const fn new(claim: &'static str) -> Self {
        Self {
            claim,
            t: PhantomData,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.claim
    }

    /// Insert a claim into the given claims map.
    ///
    /// # Errors
    ///
    /// Returns an error if the value failed to serialize.
    pub fn insert<I>(
        &self,
        claims: &mut HashMap<String, serde_json::Value>,
        value: I,
    ) -> Result<(), ClaimError>
    where
        I: Into<T>,
    {
        let value = value.into();
        let value: serde_json::Value =
            serde_json::to_value(&value).map_err(|_| ClaimError::InvalidClaim(self.claim))?;
        claims.insert(self.claim.to_owned(), value);

        Ok(())
    }

    /// Extract a claim from the given claims map.
    ///
    /// # Errors
    ///
    /// Returns an error if the claim is missing or failed to deserialize.
    pub fn extract_required(
        &self,
        claims: &mut HashMap<String, serde_json::Value>,
    ) -> Result<T, ClaimError> {
        self.extract_required_with_options(claims, ())
    }

    /// Extract a claim from the given claims map, with the given validator.
    ///
    /// # Errors
    ///
    /// Returns an error if the claim is missing, failed to deserialize or was
    /// rejected by the validator.
    pub fn extract_required_with_options<V>(
        &self,
        claims: &mut HashMap<String, serde_json::Value>,
        validator: V,
    ) -> Result<T, ClaimError>
    where
        V: Validator<T>,
        V::Error: std::error::Error + Send + Sync + 'static,
    {
        let claim = claims
            .remove(self.claim)
            .ok_or(ClaimError::MissingClaim(self.claim))?;

        let res =
            serde_json::from_value(claim).map_err(|_| ClaimError::InvalidClaim(self.claim))?;
        validator
            .validate(&res)
            .map_err(|source| ClaimError::ValidationError {
                claim: self.claim,
                source: Box::new(source),
            })?;
        Ok(res)
    }

    /// Extract a claim from the given claims map, if it is present.
    ///
    /// # Errors
    ///
    /// Returns an error if the claim failed to deserialize.
    pub fn extract_optional(
        &self,
        claims: &mut HashMap<String, serde_json::Value>,
    ) -> Result<Option<T>, ClaimError> {
        self.extract_optional_with_options(claims, ())
    }

    /// Extract a claim from the given claims map, if it is present, with the
    /// given validator.
    ///
    /// # Errors
    ///
    /// Returns an error if the claim failed to deserialize or was rejected by
    /// the validator.
    pub fn extract_optional_with_options<V>(
        &self,
        claims: &mut HashMap<String, serde_json::Value>,
        validator: V,
    ) -> Result<Option<T>, ClaimError>
    where
        V: Validator<T>,
        V::Error: std::error::Error + Send + Sync + 'static,
    {
        match self.extract_required_with_options(claims, validator) {
            Ok(v) => Ok(Some(v)),
            Err(ClaimError::MissingClaim(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TimeOptions {
    when: DateTime<Utc>,
    leeway: Duration,
}

impl TimeOptions {
    #[must_use]
    pub fn new(when: DateTime<Utc>) -> Self {
        Self {
            when,
            leeway: Duration::minutes(5),
        }
    }

    #[must_use]
    pub fn leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }
}

#[derive(Debug, Clone, Copy, Error)]
#[error("Current time is too far away")]
pub struct TimeTooFarError;

/// Checks that the claim time is after the current time, with some leeway.
#[derive(Debug, Clone, Copy)]
pub struct TimeNotAfter(TimeOptions);

impl Validator<Timestamp> for TimeNotAfter {
    type Error = TimeTooFarError;
    fn validate(&self, value: &Timestamp) -> Result<(), Self::Error> {
        if self.0.when <= value.0 + self.0.leeway {
            Ok(())
        } else {
            Err(TimeTooFarError)
        }
    }
}

impl From<TimeOptions> for TimeNotAfter {
    fn from(opt: TimeOptions) -> Self {
        Self(opt)
    }
}

impl From<&TimeOptions> for TimeNotAfter {
    fn from(opt: &TimeOptions) -> Self {
        Self(*opt)
    }
}

/// Checks that the claim time is before the current time, with some leeway.
#[derive(Debug, Clone, Copy)]
pub struct TimeNotBefore(TimeOptions);

impl Validator<Timestamp> for TimeNotBefore {
    type Error = TimeTooFarError;

    fn validate(&self, value: &Timestamp) -> Result<(), Self::Error> {
        if self.0.when >= value.0 - self.0.leeway {
            Ok(())
        } else {
            Err(TimeTooFarError)
        }
    }
}

impl From<TimeOptions> for TimeNotBefore {
    fn from(opt: TimeOptions) -> Self {
        Self(opt)
    }
}

impl From<&TimeOptions> for TimeNotBefore {
    fn from(opt: &TimeOptions) -> Self {
        Self(*opt)
    }
}

/// Hash a token the way `at_hash` and `c_hash` are computed: the left-most
/// half of the hash of the ASCII token, base64url-encoded without padding.
///
/// # Errors
///
/// Returns an error if the algorithm is not supported.
pub fn hash_token(alg: &JsonWebSignatureAlg, token: &str) -> Result<String, TokenHashError> {
    let bits = match alg {
        JsonWebSignatureAlg::Hs256
        | JsonWebSignatureAlg::Rs256
        | JsonWebSignatureAlg::Es256
        | JsonWebSignatureAlg::Ps256
        | JsonWebSignatureAlg::Es256K => {
            let hash = Sha256::digest(token);
            hash[..16].to_vec()
        }
        JsonWebSignatureAlg::Hs384
        | JsonWebSignatureAlg::Rs384
        | JsonWebSignatureAlg::Es384
        | JsonWebSignatureAlg::Ps384 => {
            let hash = Sha384::digest(token);
            hash[..24].to_vec()
        }
        JsonWebSignatureAlg::Hs512
        | JsonWebSignatureAlg::Rs512
        | JsonWebSignatureAlg::Es512
        | JsonWebSignatureAlg::Ps512 => {
            let hash = Sha512::digest(token);
            hash[..32].to_vec()
        }
        JsonWebSignatureAlg::EdDsa | JsonWebSignatureAlg::Unknown(_) => {
            return Err(TokenHashError::UnsupportedAlgorithm(alg.clone()));
        }
    };

    Ok(Base64UrlUnpadded::encode_string(&bits))
}

#[derive(Debug, Clone, Error)]
pub enum TokenHashError {
    #[error("Hashes don't match")]
    HashMismatch,

    #[error("Unsupported algorithm {0} for hashing")]
    UnsupportedAlgorithm(JsonWebSignatureAlg),
}

/// Checks that a `at_hash` or `c_hash` claim matches the given token.
#[derive(Debug, Clone, Copy)]
pub struct TokenHash<'a> {
    alg: &'a JsonWebSignatureAlg,
    token: &'a str,
}

impl<'a> TokenHash<'a> {
    /// Creates a new `TokenHash` validator for the given algorithm and token.
    #[must_use]
    pub fn new(alg: &'a JsonWebSignatureAlg, token: &'a str) -> Self {
        Self { alg, token }
    }
}

impl Validator<String> for TokenHash<'_> {
    type Error = TokenHashError;
    fn validate(&self, value: &String) -> Result<(), Self::Error> {
        if hash_token(self.alg, self.token)? == *value {
            Ok(())
        } else {
            Err(TokenHashError::HashMismatch)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Values don't match")]
pub struct EqualityError;

/// Checks that a string claim is equal to the given value.
impl Validator<String> for &str {
    type Error = EqualityError;

    fn validate(&self, value: &String) -> Result<(), Self::Error> {
        if *self == value {
            Ok(())
        } else {
            Err(EqualityError)
        }
    }
}

/// Checks that a one-or-many claim contains the given value.
impl Validator<OneOrMany<String>> for &str {
    type Error = EqualityError;

    fn validate(&self, value: &OneOrMany<String>) -> Result<(), Self::Error> {
        if value.iter().any(|v| v == self) {
            Ok(())
        } else {
            Err(EqualityError)
        }
    }
}

/// A claim which can hold either a single value or a list of values, like
/// `aud`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> Deref for OneOrMany<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        match self {
            Self::One(v) => std::slice::from_ref(v),
            Self::Many(v) => v,
        }
    }
}

impl<T> From<T> for OneOrMany<T> {
    fn from(value: T) -> Self {
        Self::One(value)
    }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(value: Vec<T>) -> Self {
        Self::Many(value)
    }
}

/// A `NumericDate`, serialized as seconds since the epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(#[serde(with = "chrono::serde::ts_seconds")] DateTime<Utc>);

impl Deref for Timestamp {
    type Target = DateTime<Utc>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Timestamp(value)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(value: Timestamp) -> Self {
        value.0
    }
}

pub const ISS: Claim<String> = Claim::new("iss");
pub const SUB: Claim<String> = Claim::new("sub");
pub const AUD: Claim<OneOrMany<String>> = Claim::new("aud");
pub const NBF: Claim<Timestamp> = Claim::new("nbf");
pub const EXP: Claim<Timestamp> = Claim::new("exp");
pub const IAT: Claim<Timestamp> = Claim::new("iat");
pub const JTI: Claim<String> = Claim::new("jti");

pub const AUTH_TIME: Claim<Timestamp> = Claim::new("auth_time");
pub const NONCE: Claim<String> = Claim::new("nonce");
pub const AT_HASH: Claim<String> = Claim::new("at_hash");
pub const C_HASH: Claim<String> = Claim::new("c_hash");
