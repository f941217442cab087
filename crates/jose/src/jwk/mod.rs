// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2022-2024 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Ref: <https://www.rfc-editor.org/rfc/rfc7517.html>

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;

use crate::jwa::JsonWebSignatureAlg;

mod public_parameters;

pub use self::public_parameters::{
    EcPublicParameters, JsonWebKeyPublicParameters, OkpPublicParameters, RsaPublicParameters,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JsonWebKeyType {
    #[serde(rename = "RSA")]
    Rsa,

    #[serde(rename = "EC")]
    Ec,

    #[serde(rename = "OKP")]
    Okp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JsonWebKeyEcEllipticCurve {
    #[serde(rename = "P-256")]
    P256,

    #[serde(rename = "P-384")]
    P384,

    #[serde(rename = "P-521")]
    P521,

    #[serde(rename = "secp256k1")]
    Secp256K1,
}

impl fmt::Display for JsonWebKeyEcEllipticCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::P256 => "P-256",
            Self::P384 => "P-384",
            Self::P521 => "P-521",
            Self::Secp256K1 => "secp256k1",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JsonWebKeyOkpEllipticCurve {
    Ed25519,
    Ed448,
    X25519,
    X448,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JsonWebKeyUse {
    #[serde(rename = "sig")]
    Sig,

    #[serde(rename = "enc")]
    Enc,
}

pub trait ParametersInfo {
    fn kty(&self) -> JsonWebKeyType;
    fn possible_algs(&self) -> &[JsonWebSignatureAlg];
}

pub(crate) trait JwkEcCurve {
    const CRV: JsonWebKeyEcEllipticCurve;
}

impl JwkEcCurve for p256::NistP256 {
    const CRV: JsonWebKeyEcEllipticCurve = JsonWebKeyEcEllipticCurve::P256;
}

impl JwkEcCurve for p384::NistP384 {
    const CRV: JsonWebKeyEcEllipticCurve = JsonWebKeyEcEllipticCurve::P384;
}

/// A public JSON Web Key.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicJsonWebKey {
    #[serde(flatten)]
    parameters: JsonWebKeyPublicParameters,

    #[serde(default, rename = "use")]
    r#use: Option<JsonWebKeyUse>,

    #[serde(default)]
    kid: Option<String>,

    #[serde(default)]
    alg: Option<JsonWebSignatureAlg>,
}

impl PublicJsonWebKey {
    #[must_use]
    pub const fn new(parameters: JsonWebKeyPublicParameters) -> Self {
        Self {
            parameters,
            r#use: None,
            kid: None,
            alg: None,
        }
    }

    #[must_use]
    pub fn with_kid(mut self, kid: impl Into<String>) -> Self {
        self.kid = Some(kid.into());
        self
    }

    #[must_use]
    pub fn with_alg(mut self, alg: JsonWebSignatureAlg) -> Self {
        self.alg = Some(alg);
        self
    }

    #[must_use]
    pub fn with_use(mut self, value: JsonWebKeyUse) -> Self {
        self.r#use = Some(value);
        self
    }

    #[must_use]
    pub fn kid(&self) -> Option<&str> {
        self.kid.as_deref()
    }

    #[must_use]
    pub const fn alg(&self) -> Option<&JsonWebSignatureAlg> {
        self.alg.as_ref()
    }

    #[must_use]
    pub const fn key_use(&self) -> Option<JsonWebKeyUse> {
        self.r#use
    }

    #[must_use]
    pub const fn params(&self) -> &JsonWebKeyPublicParameters {
        &self.parameters
    }
}

/// A set of public JSON Web Keys, as published on a `jwks_uri`.
///
/// Keys which can't be parsed (unknown key type, unknown algorithm, ...) are
/// skipped when deserializing, so that a single exotic key doesn't make the
/// whole set unusable.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PublicJsonWebKeySet {
    keys: Vec<PublicJsonWebKey>,
}

impl<'de> Deserialize<'de> for PublicJsonWebKeySet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawSet {
            keys: Vec<Value>,
        }

        let RawSet { keys } = RawSet::deserialize(deserializer)?;
        let keys = keys
            .into_iter()
            .filter_map(|key| serde_json::from_value(key).ok())
            .collect();

        Ok(Self { keys })
    }
}

impl PublicJsonWebKeySet {
    #[must_use]
    pub const fn new(keys: Vec<PublicJsonWebKey>) -> Self {
        Self { keys }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PublicJsonWebKey> {
        self.keys.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Find the keys with the given key ID.
    pub fn find_by_kid<'a>(&'a self, kid: &'a str) -> impl Iterator<Item = &'a PublicJsonWebKey> {
        self.keys.iter().filter(move |key| key.kid() == Some(kid))
    }
}

impl<'a> IntoIterator for &'a PublicJsonWebKeySet {
    type Item = &'a PublicJsonWebKey;
    type IntoIter = std::slice::Iter<'a, PublicJsonWebKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter()
    }
}
