// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2021-2024 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Types to interact with the [OpenID Connect] specification.
//!
//! [OpenID Connect]: https://openid.net/connect/

use std::ops::Deref;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use social_jose::jwa::JsonWebSignatureAlg;
use thiserror::Error;
use url::Url;

use crate::{pkce::PkceCodeChallengeMethod, requests::ResponseMode};

/// Authorization server metadata, as described by the [OpenID Connect
/// Discovery Spec].
///
/// Only the members relevant to a relying party doing the authorization code
/// flow are modelled.
///
/// [OpenID Connect Discovery Spec]: https://openid.net/specs/openid-connect-discovery-1_0.html#ProviderMetadata
#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ProviderMetadata {
    /// Authorization server's issuer identifier URL.
    ///
    /// This field is required. It must match the URL used to fetch the
    /// metadata.
    pub issuer: Option<String>,

    /// URL of the authorization server's [authorization endpoint].
    ///
    /// [authorization endpoint]: https://www.rfc-editor.org/rfc/rfc6749.html#section-3.1
    pub authorization_endpoint: Option<Url>,

    /// URL of the authorization server's [token endpoint].
    ///
    /// [token endpoint]: https://www.rfc-editor.org/rfc/rfc6749.html#section-3.2
    pub token_endpoint: Option<Url>,

    /// URL of the authorization server's [JWK] Set document.
    ///
    /// This field is required.
    ///
    /// [JWK]: https://www.rfc-editor.org/rfc/rfc7517.html
    pub jwks_uri: Option<Url>,

    /// URL of the authorization server's [`UserInfo` Endpoint].
    ///
    /// [`UserInfo` Endpoint]: https://openid.net/specs/openid-connect-core-1_0.html#UserInfo
    pub userinfo_endpoint: Option<Url>,

    /// JSON array containing a list of the OAuth 2.0 `scope` values that this
    /// authorization server supports.
    pub scopes_supported: Option<Vec<String>>,

    /// JSON array containing a list of the OAuth 2.0 `response_type` values
    /// that this authorization server supports.
    pub response_types_supported: Option<Vec<String>>,

    /// JSON array containing a list of the OAuth 2.0 `response_mode` values
    /// that this authorization server supports.
    pub response_modes_supported: Option<Vec<ResponseMode>>,

    /// JSON array containing a list of the OAuth 2.0 `grant_type` values that
    /// this authorization server supports.
    pub grant_types_supported: Option<Vec<String>>,

    /// JSON array containing a list of client authentication methods
    /// supported by this token endpoint.
    pub token_endpoint_auth_methods_supported: Option<Vec<String>>,

    /// JSON array containing a list of the JWS signing algorithms supported by
    /// the authorization server for the ID Token.
    pub id_token_signing_alg_values_supported: Option<Vec<JsonWebSignatureAlg>>,

    /// PKCE code challenge methods supported by this authorization server.
    pub code_challenge_methods_supported: Option<Vec<PkceCodeChallengeMethod>>,

    /// JSON array containing a list of the Claim Names of the Claims that the
    /// OpenID Provider may be able to supply values for.
    pub claims_supported: Option<Vec<String>>,
}

impl ProviderMetadata {
    /// Validate this `ProviderMetadata` according to the [OpenID Connect
    /// Discovery Spec 1.0].
    ///
    /// # Parameters
    ///
    /// - `issuer`: The issuer that was discovered to get this
    ///   `ProviderMetadata`.
    ///
    /// # Errors
    ///
    /// Will return `Err` if validation fails.
    ///
    /// [OpenID Connect Discovery Spec 1.0]: https://openid.net/specs/openid-connect-discovery-1_0.html
    pub fn validate(
        self,
        issuer: &str,
    ) -> Result<VerifiedProviderMetadata, ProviderMetadataVerificationError> {
        let metadata = self.require_fields()?;

        if metadata.issuer() != issuer {
            return Err(ProviderMetadataVerificationError::IssuerUrlsDontMatch {
                expected: issuer.to_owned(),
                actual: metadata.issuer().to_owned(),
            });
        }

        let supports_code = metadata
            .response_types_supported
            .as_deref()
            .is_none_or(|response_types| response_types.iter().any(|t| t == "code"));
        if !supports_code {
            return Err(ProviderMetadataVerificationError::CodeFlowNotSupported);
        }

        Ok(metadata)
    }

    /// Check that the fields required by the authorization code flow are
    /// present.
    fn require_fields(
        self,
    ) -> Result<VerifiedProviderMetadata, ProviderMetadataVerificationError> {
        let issuer = self
            .issuer
            .clone()
            .ok_or(ProviderMetadataVerificationError::MissingIssuer)?;

        let authorization_endpoint = self
            .authorization_endpoint
            .clone()
            .ok_or(ProviderMetadataVerificationError::MissingAuthorizationEndpoint)?;

        let token_endpoint = self
            .token_endpoint
            .clone()
            .ok_or(ProviderMetadataVerificationError::MissingTokenEndpoint)?;

        let jwks_uri = self
            .jwks_uri
            .clone()
            .ok_or(ProviderMetadataVerificationError::MissingJwksUri)?;

        Ok(VerifiedProviderMetadata {
            inner: self,
            issuer,
            authorization_endpoint,
            token_endpoint,
            jwks_uri,
        })
    }
}

/// The verified authorization server metadata.
///
/// All the fields required by the [OpenID Connect Discovery Spec 1.0] or
/// by this library are present.
///
/// To access other fields, use this type's `Deref` implementation.
///
/// [OpenID Connect Discovery Spec 1.0]: https://openid.net/specs/openid-connect-discovery-1_0.html
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedProviderMetadata {
    inner: ProviderMetadata,
    issuer: String,
    authorization_endpoint: Url,
    token_endpoint: Url,
    jwks_uri: Url,
}

impl VerifiedProviderMetadata {
    /// Authorization server's issuer identifier URL.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// URL of the authorization server's authorization endpoint.
    #[must_use]
    pub fn authorization_endpoint(&self) -> &Url {
        &self.authorization_endpoint
    }

    /// URL of the authorization server's token endpoint.
    #[must_use]
    pub fn token_endpoint(&self) -> &Url {
        &self.token_endpoint
    }

    /// URL of the authorization server's JWK Set document.
    #[must_use]
    pub fn jwks_uri(&self) -> &Url {
        &self.jwks_uri
    }

    /// Whether the authorization server supports PKCE with the `S256`
    /// method.
    #[must_use]
    pub fn supports_pkce_s256(&self) -> bool {
        self.code_challenge_methods_supported
            .as_deref()
            .is_some_and(|methods| methods.contains(&PkceCodeChallengeMethod::S256))
    }
}

impl Deref for VerifiedProviderMetadata {
    type Target = ProviderMetadata;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// All errors that can happen when verifying [`ProviderMetadata`]
#[derive(Debug, Error)]
pub enum ProviderMetadataVerificationError {
    /// The issuer is missing.
    #[error("issuer is missing")]
    MissingIssuer,

    /// The authorization endpoint is missing.
    #[error("authorization endpoint is missing")]
    MissingAuthorizationEndpoint,

    /// The token endpoint is missing.
    #[error("token endpoint is missing")]
    MissingTokenEndpoint,

    /// The JWK Set URL is missing.
    #[error("JWK Set URL is missing")]
    MissingJwksUri,

    /// The issuer URL doesn't match the one that was discovered.
    #[error("issuer URLs don't match: expected {expected:?}, got {actual:?}")]
    IssuerUrlsDontMatch {
        /// The expected issuer URL.
        expected: String,
        /// The issuer URL that was discovered.
        actual: String,
    },

    /// The `code` response type is not supported.
    #[error("the authorization code flow is not supported")]
    CodeFlowNotSupported,
}
