// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2022-2024 Kévin Commaille.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Requests for obtaining [Claims] about an end-user.
//!
//! [Claims]: https://openid.net/specs/openid-connect-core-1_0.html#Claims

use std::collections::HashMap;

use headers::{ContentType, HeaderMapExt};
use http::header::ACCEPT;
use mime::Mime;
use serde_json::Value;
use social_http::RequestBuilderExt;
use url::Url;

use crate::error::{ResponseExt, UserInfoError};

/// Obtain the claims about the end-user an access token was issued for.
///
/// Only plain JSON responses are supported. Social providers don't sign
/// their userinfo responses.
///
/// If `expected_subject` is given, usually the `sub` of the verified ID
/// token, the `sub` claim of the response must be equal to it.
///
/// # Errors
///
/// Returns an error if the request fails, if the response is not a JSON
/// object, or if it is about another subject.
#[tracing::instrument(skip_all, fields(userinfo_endpoint = %userinfo_endpoint))]
pub async fn fetch_userinfo(
    http_client: &reqwest::Client,
    userinfo_endpoint: &Url,
    access_token: &str,
    expected_subject: Option<&str>,
) -> Result<HashMap<String, Value>, UserInfoError> {
    tracing::debug!("Obtaining user info...");

    let response = http_client
        .get(userinfo_endpoint.as_str())
        .bearer_auth(access_token)
        .header(ACCEPT, mime::APPLICATION_JSON.as_ref())
        .send_traced()
        .await?
        .error_from_oauth2_error_response()
        .await?;

    let content_type: Mime = response
        .headers()
        .typed_try_get::<ContentType>()
        .map_err(|_| UserInfoError::InvalidResponseContentTypeValue)?
        .ok_or(UserInfoError::MissingResponseContentType)?
        .into();

    // Parameters like `charset` are fine
    if content_type.essence_str() != mime::APPLICATION_JSON.essence_str() {
        return Err(UserInfoError::UnexpectedResponseContentType {
            expected: mime::APPLICATION_JSON.to_string(),
            got: content_type.to_string(),
        });
    }

    let body = response.bytes().await?;
    let claims: HashMap<String, Value> =
        serde_json::from_slice(&body).map_err(UserInfoError::InvalidResponse)?;

    if let Some(expected) = expected_subject {
        let got = claims.get("sub").and_then(Value::as_str);
        if got != Some(expected) {
            tracing::warn!(expected, got, "Userinfo is about another subject");
            return Err(UserInfoError::WrongSubject {
                expected: expected.to_owned(),
                got: got.map(ToOwned::to_owned),
            });
        }
    }

    Ok(claims)
}
