// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2022-2024 Kévin Commaille.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! The error types used in this crate.

use http::StatusCode;
use social_jose::{
    claims::ClaimError,
    jwt::{JwtDecodeError, JwtSignatureError, NoKeyWorked},
};
use social_oauth2_types::{
    errors::{ClientError, ClientErrorCode},
    oidc::ProviderMetadataVerificationError,
    pkce::CodeChallengeError,
};
use thiserror::Error;

/// All possible errors when using this crate.
#[derive(Debug, Error)]
#[error(transparent)]
pub enum Error {
    /// An error occurred fetching provider metadata.
    Discovery(#[from] DiscoveryError),

    /// An error occurred fetching the provider JWKS.
    Jwks(#[from] JwksError),

    /// An error occurred building the authorization URL.
    Authorization(#[from] AuthorizationError),

    /// An error occurred exchanging an authorization code for an access token.
    TokenAuthorizationCode(#[from] TokenAuthorizationCodeError),

    /// An error occurred refreshing an access token.
    TokenRefresh(#[from] TokenRefreshError),

    /// An error occurred requesting user info.
    UserInfo(#[from] UserInfoError),
}

/// All possible errors when fetching provider metadata.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// An error occurred building the request's URL.
    #[error(transparent)]
    IntoUrl(#[from] url::ParseError),

    /// The server returned an HTTP error status code.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// An error occurred validating the metadata.
    #[error(transparent)]
    Validation(#[from] ProviderMetadataVerificationError),
}

/// All possible errors when authorizing the client.
#[derive(Debug, Error)]
pub enum AuthorizationError {
    /// An error occurred constructing the PKCE code challenge.
    #[error(transparent)]
    Pkce(#[from] CodeChallengeError),
}

/// An error response from an OAuth 2.0 endpoint.
#[derive(Debug, Error)]
pub enum ResponseError {
    /// The HTTP client returned an error.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// The server answered with an OAuth 2.0 error body.
    #[error("the server returned an error: {error}")]
    OAuth2 {
        /// The error code.
        error: ClientErrorCode,
        /// The description of the error, if any.
        error_description: Option<String>,
    },

    /// The server answered with an error status and no usable body.
    #[error("the server returned an unexpected status {status}")]
    Status {
        /// The status code of the response.
        status: StatusCode,
    },
}

impl From<ClientError> for ResponseError {
    fn from(value: ClientError) -> Self {
        Self::OAuth2 {
            error: value.error,
            error_description: value.error_description,
        }
    }
}

/// All possible errors when requesting an access token.
#[derive(Debug, Error)]
pub enum TokenRequestError {
    /// The HTTP client returned an error.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Error while injecting the client credentials into the request.
    #[error(transparent)]
    Credentials(#[from] CredentialsError),

    /// The token endpoint returned an OAuth 2.0 error.
    ///
    /// This is also returned when the error comes with a `200 OK` status, as
    /// some providers do.
    #[error("the token endpoint returned an error: {error}")]
    OAuth2 {
        /// The error code.
        error: ClientErrorCode,
        /// The description of the error, if any.
        error_description: Option<String>,
    },

    /// The token endpoint answered with an error status and no usable body.
    #[error("the token endpoint returned an unexpected status {status}")]
    Status {
        /// The status code of the response.
        status: StatusCode,
    },

    /// The response could not be parsed.
    #[error("invalid token response")]
    InvalidResponse(#[from] serde_json::Error),
}

impl From<ResponseError> for TokenRequestError {
    fn from(value: ResponseError) -> Self {
        match value {
            ResponseError::Http(e) => Self::Http(e),
            ResponseError::OAuth2 {
                error,
                error_description,
            } => Self::OAuth2 {
                error,
                error_description,
            },
            ResponseError::Status { status } => Self::Status { status },
        }
    }
}

/// All possible errors when exchanging a code for an access token.
#[derive(Debug, Error)]
pub enum TokenAuthorizationCodeError {
    /// An error occurred requesting the access token.
    #[error(transparent)]
    Token(#[from] TokenRequestError),

    /// An error occurred validating the ID Token.
    #[error(transparent)]
    IdToken(#[from] IdTokenError),
}

/// All possible errors when refreshing an access token.
#[derive(Debug, Error)]
pub enum TokenRefreshError {
    /// An error occurred requesting the access token.
    #[error(transparent)]
    Token(#[from] TokenRequestError),

    /// An error occurred validating the ID Token.
    #[error(transparent)]
    IdToken(#[from] IdTokenError),
}

/// All possible errors when requesting user info.
#[derive(Debug, Error)]
pub enum UserInfoError {
    /// The content-type header is missing from the response.
    #[error("missing response content-type")]
    MissingResponseContentType,

    /// The content-type is not valid.
    #[error("invalid response content-type")]
    InvalidResponseContentTypeValue,

    /// The content-type is not the one that was expected.
    #[error("unexpected response content-type {got:?}, expected {expected:?}")]
    UnexpectedResponseContentType {
        /// The expected content-type.
        expected: String,
        /// The returned content-type.
        got: String,
    },

    /// The claims are about another end-user than the one of the ID token.
    #[error("userinfo subject {got:?} does not match the expected subject {expected:?}")]
    WrongSubject {
        /// The subject of the ID token.
        expected: String,
        /// The subject of the userinfo response, if it had one.
        got: Option<String>,
    },

    /// The response is not a JSON object with a `sub` claim.
    #[error("invalid userinfo response")]
    InvalidResponse(#[source] serde_json::Error),

    /// The endpoint returned an error.
    #[error(transparent)]
    Response(#[from] ResponseError),

    /// An error occurred sending the request.
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// All possible errors when requesting a JWKS.
#[derive(Debug, Error)]
#[error("Failed to fetch JWKS")]
pub enum JwksError {
    /// An error occurred sending the request.
    Http(#[from] reqwest::Error),
}

/// All possible errors when verifying a JWT.
#[derive(Debug, Error)]
pub enum JwtVerificationError {
    /// An error occured decoding the JWT.
    #[error(transparent)]
    JwtDecode(#[from] JwtDecodeError),

    /// No key worked for verifying the JWT's signature.
    #[error(transparent)]
    JwtSignature(#[from] NoKeyWorked),

    /// An error occurred extracting a claim.
    #[error(transparent)]
    Claim(#[from] ClaimError),

    /// The algorithm used for signing the JWT is not one of the accepted
    /// ones.
    #[error("wrong signature alg")]
    WrongSignatureAlg,
}

/// All possible errors when verifying an ID token.
#[derive(Debug, Error)]
pub enum IdTokenError {
    /// No ID Token was found in the response although one was expected.
    #[error("ID token is missing")]
    MissingIdToken,

    /// An error occurred validating the ID Token's signature and basic claims.
    #[error(transparent)]
    Jwt(#[from] JwtVerificationError),

    /// An error occurred extracting a claim.
    #[error(transparent)]
    Claim(#[from] ClaimError),
}

/// All errors that can occur when adding client credentials to the request.
#[derive(Debug, Error)]
pub enum CredentialsError {
    /// An error occurred when building the claims of the JWT.
    #[error(transparent)]
    JwtClaims(#[from] ClaimError),

    /// An error occurred when signing the JWT.
    #[error(transparent)]
    JwtSignature(#[from] JwtSignatureError),

    /// The requested lifetime of a client secret is out of bounds.
    #[error("client secret lifetime must be positive and at most {max_days} days")]
    InvalidLifetime {
        /// The maximum lifetime, in days.
        max_days: i64,
    },
}

/// Extension to turn error responses of OAuth 2.0 endpoints into errors.
pub(crate) trait ResponseExt: Sized {
    /// Turn a response with an error status into a [`ResponseError`], parsing
    /// the OAuth 2.0 error body if there is one.
    async fn error_from_oauth2_error_response(self) -> Result<Self, ResponseError>;
}

impl ResponseExt for reqwest::Response {
    async fn error_from_oauth2_error_response(self) -> Result<Self, ResponseError> {
        let status = self.status();
        if status.is_success() {
            return Ok(self);
        }

        let body = self.bytes().await?;
        match serde_json::from_slice::<ClientError>(&body) {
            Ok(error) => Err(error.into()),
            Err(_) => {
                tracing::warn!(%status, "Endpoint returned an error without an OAuth 2.0 error body");
                Err(ResponseError::Status { status })
            }
        }
    }
}
