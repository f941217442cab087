// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2022-2024 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use http::StatusCode;
use social_oidc_client::error::{
    AuthorizationError, DiscoveryError, IdTokenError, JwksError, TokenAuthorizationCodeError,
    TokenRefreshError, UserInfoError,
};
use thiserror::Error;

/// Errors returned by the providers
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The session has no access token, [`crate::Provider::authorize`] must be
    /// called first
    #[error("{provider} cannot get user information without an access token")]
    MissingAccessToken {
        /// The name of the provider
        provider: String,
    },

    /// The callback did not carry an authorization code
    #[error("missing authorization code in the callback")]
    MissingCode,

    /// The `state` of the callback does not match the one of the session
    #[error("state mismatch")]
    StateMismatch,

    /// The provider redirected back with an error
    #[error("the provider returned an error: {error}")]
    Callback {
        /// The error code
        error: String,
        /// The description of the error, if any
        error_description: Option<String>,
    },

    /// An API call answered with an error envelope
    #[error("{provider} API returned an error: {error}")]
    Api {
        /// The name of the provider
        provider: String,
        /// The error message of the envelope
        error: String,
    },

    /// An API call answered with an unexpected status
    #[error("{provider} API responded with a {status} status")]
    Status {
        /// The name of the provider
        provider: String,
        /// The status of the response
        status: StatusCode,
    },

    /// The provider's response did not carry the expected data
    #[error("invalid response from {provider}: {message}")]
    InvalidResponse {
        /// The name of the provider
        provider: String,
        /// What was wrong
        message: String,
    },

    /// The provider cannot refresh access tokens
    #[error("{provider} does not support refreshing access tokens")]
    RefreshUnsupported {
        /// The name of the provider
        provider: String,
    },

    /// The callback HMAC does not match the expected one
    #[error("the callback HMAC is missing or invalid")]
    HmacMismatch,

    /// The callback did not say which shop it came from
    #[error("missing shop in the callback")]
    MissingShop,

    /// The shop of the callback is not the configured one, or is not a
    /// `myshopify.com` domain
    #[error("invalid shop {shop:?}")]
    InvalidShop {
        /// The shop from the callback
        shop: String,
    },

    /// No provider is registered under this name
    #[error("no provider named {name:?}")]
    UnknownProvider {
        /// The requested name
        name: String,
    },

    /// A session could not be serialized or deserialized
    #[error("invalid session")]
    Session(#[source] serde_json::Error),

    /// The response could not be parsed
    #[error("failed to decode the response")]
    Json(#[from] serde_json::Error),

    /// The HTTP client returned an error
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// An error occurred building the authorization URL
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    /// An error occurred exchanging the authorization code
    #[error(transparent)]
    TokenAuthorizationCode(#[from] TokenAuthorizationCodeError),

    /// An error occurred refreshing the access token
    #[error(transparent)]
    TokenRefresh(#[from] TokenRefreshError),

    /// An error occurred verifying an ID token
    #[error(transparent)]
    IdToken(#[from] IdTokenError),

    /// An error occurred fetching a JWKS
    #[error(transparent)]
    Jwks(#[from] JwksError),

    /// An error occurred fetching the user info
    #[error(transparent)]
    UserInfo(#[from] UserInfoError),

    /// An error occurred discovering the issuer
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
}

impl ProviderError {
    pub(crate) fn invalid_response(provider: &str, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider: provider.to_owned(),
            message: message.into(),
        }
    }
}
