// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2022-2024 Kévin Commaille.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Requests for using [Refresh Tokens].
//!
//! [Refresh Tokens]: https://openid.net/specs/openid-connect-core-1_0.html#RefreshTokens

use chrono::{DateTime, Utc};
use social_jose::claims::{self, TokenHash};
use social_oauth2_types::{
    requests::{AccessTokenRequest, AccessTokenResponse, RefreshTokenGrant},
    scope::Scope,
};
use url::Url;

use super::jose::JwtVerificationData;
use crate::{
    error::{IdTokenError, TokenRefreshError},
    requests::{jose::verify_id_token, token::request_access_token},
    types::{IdToken, client_credentials::ClientCredentials},
};

/// Exchange a refresh token for a new access token.
///
/// Providers may send a new ID token along with the refreshed access token.
/// It is optional in the response, but when `id_token_verification_data` is
/// given and one is present, it is verified like the one of the
/// authorization, and its `at_hash` must match the new access token.
///
/// # Arguments
///
/// * `scope` - The scope of the access token. If omitted, the provider keeps
///   the scope originally granted.
///
/// * `now` - The current time.
///
/// # Errors
///
/// Returns an error if the request fails, the response is invalid or the
/// verification of the ID Token fails.
#[tracing::instrument(skip_all, fields(token_endpoint = %token_endpoint))]
pub async fn refresh_access_token(
    http_client: &reqwest::Client,
    client_credentials: &ClientCredentials,
    token_endpoint: &Url,
    refresh_token: String,
    scope: Option<Scope>,
    id_token_verification_data: Option<JwtVerificationData<'_>>,
    now: DateTime<Utc>,
) -> Result<(AccessTokenResponse, Option<IdToken<'static>>), TokenRefreshError> {
    tracing::debug!("Refreshing access token...");

    let token_response = request_access_token(
        http_client,
        client_credentials,
        token_endpoint,
        AccessTokenRequest::RefreshToken(RefreshTokenGrant {
            refresh_token,
            scope,
        }),
        now,
    )
    .await?;

    let Some((verification_data, id_token)) =
        id_token_verification_data.zip(token_response.id_token.as_deref())
    else {
        return Ok((token_response, None));
    };

    let id_token = verify_id_token(id_token, verification_data, now)?;

    let mut claims = id_token.payload().clone();
    claims::AT_HASH
        .extract_optional_with_options(
            &mut claims,
            TokenHash::new(id_token.header().alg(), &token_response.access_token),
        )
        .map_err(IdTokenError::from)?;

    tracing::debug!("Verified the refreshed ID token");

    let id_token = id_token.into_owned();
    Ok((token_response, Some(id_token)))
}
