// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2022-2024 Kévin Commaille.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Requests for the Token endpoint.

use chrono::{DateTime, Utc};
use serde_json::Value;
use social_http::RequestBuilderExt;
use social_oauth2_types::{
    errors::ClientErrorCode,
    requests::{AccessTokenRequest, AccessTokenResponse},
};
use url::Url;

use crate::{
    error::{ResponseExt, TokenRequestError},
    types::client_credentials::ClientCredentials,
};

/// Request an access token.
///
/// # Arguments
///
/// * `http_client` - The reqwest client to use for making HTTP requests.
///
/// * `client_credentials` - The credentials obtained when registering the
///   client.
///
/// * `token_endpoint` - The URL of the issuer's Token endpoint.
///
/// * `request` - The request to make at the Token endpoint.
///
/// * `now` - The current time, used to mint client secrets that expire.
///
/// # Errors
///
/// Returns an error if the request fails or the response is invalid.
///
/// Some providers answer errors with a `200 OK` status. A successful response
/// with an `error` member and no `access_token` is reported as
/// [`TokenRequestError::OAuth2`] too.
#[tracing::instrument(skip_all, fields(token_endpoint, grant_type))]
pub async fn request_access_token(
    http_client: &reqwest::Client,
    client_credentials: &ClientCredentials,
    token_endpoint: &Url,
    request: AccessTokenRequest,
    now: DateTime<Utc>,
) -> Result<AccessTokenResponse, TokenRequestError> {
    tracing::Span::current().record("token_endpoint", token_endpoint.as_str());
    tracing::Span::current().record("grant_type", tracing::field::debug(request.grant_type()));
    tracing::debug!(?request, "Requesting access token...");

    let token_request = http_client
        .post(token_endpoint.as_str())
        .header(http::header::ACCEPT, mime::APPLICATION_JSON.as_ref());

    let token_request = client_credentials.authenticated_form(token_request, &request, now)?;

    let body = token_request
        .send_traced()
        .await?
        .error_from_oauth2_error_response()
        .await?
        .bytes()
        .await?;

    let body: Value = serde_json::from_slice(&body)?;

    if let Some(error) = error_in_successful_response(&body) {
        return Err(error);
    }

    let token_response = serde_json::from_value(body)?;

    Ok(token_response)
}

/// Detect an error disguised as a successful response.
fn error_in_successful_response(body: &Value) -> Option<TokenRequestError> {
    if body.get("access_token").is_some() {
        return None;
    }

    let error = body.get("error")?.as_str()?;
    tracing::warn!(error, "Token endpoint returned an error with a success status");

    let error_description = body
        .get("error_description")
        .and_then(Value::as_str)
        .map(ToOwned::to_owned);

    Some(TokenRequestError::OAuth2 {
        error: ClientErrorCode::from(error),
        error_description,
    })
}
