// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2022-2024 Kévin Commaille.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::collections::HashMap;

use assert_matches::assert_matches;
use base64ct::Encoding;
use chrono::Duration;
use http::{StatusCode, header::AUTHORIZATION};
use serde_json::json;
use social_oidc_client::{
    error::TokenRequestError,
    requests::token::request_access_token,
    types::{
        errors::ClientErrorCode,
        requests::{AccessTokenRequest, AuthorizationCodeGrant, OAuthAccessTokenType},
    },
};
use wiremock::{
    Mock, Request, ResponseTemplate,
    matchers::{header, method, path},
};

use crate::{
    ACCESS_TOKEN, AUTHORIZATION_CODE, AuthMethod, CLIENT_ID, CLIENT_SECRET, client_credentials,
    init_test, now,
};

fn code_request() -> AccessTokenRequest {
    AccessTokenRequest::AuthorizationCode(AuthorizationCodeGrant {
        code: AUTHORIZATION_CODE.to_owned(),
        redirect_uri: None,
        code_verifier: None,
    })
}

#[tokio::test]
async fn pass_client_secret_basic() {
    let (http_client, mock_server, issuer) = init_test().await;
    let client_credentials = client_credentials(AuthMethod::ClientSecretBasic);
    let token_endpoint = issuer.join("token").unwrap();

    let username = form_urlencoded::byte_serialize(CLIENT_ID.as_bytes()).collect::<String>();
    let password = form_urlencoded::byte_serialize(CLIENT_SECRET.as_bytes()).collect::<String>();
    let enc_user_pass =
        base64ct::Base64::encode_string(format!("{username}:{password}").as_bytes());
    let authorization_header = format!("Basic {enc_user_pass}");

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(header(AUTHORIZATION, authorization_header.as_str()))
        .and(|req: &Request| {
            let body = form_urlencoded::parse(&req.body).collect::<HashMap<_, _>>();
            // The credentials must not leak into the body
            !body.contains_key("client_id") && !body.contains_key("client_secret")
        })
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": ACCESS_TOKEN,
            "token_type": "bearer",
            "expires_in": 3600,
        })))
        .mount(&mock_server)
        .await;

    let response = request_access_token(
        &http_client,
        &client_credentials,
        &token_endpoint,
        code_request(),
        now(),
    )
    .await
    .unwrap();

    assert_eq!(response.access_token, ACCESS_TOKEN);
    assert_eq!(response.token_type, Some(OAuthAccessTokenType::Bearer));
    assert_eq!(response.expires_in(), Some(Duration::hours(1)));
}

#[tokio::test]
async fn pass_client_secret_post() {
    let (http_client, mock_server, issuer) = init_test().await;
    let client_credentials = client_credentials(AuthMethod::ClientSecretPost);
    let token_endpoint = issuer.join("token").unwrap();

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(|req: &Request| {
            let body = form_urlencoded::parse(&req.body).collect::<HashMap<_, _>>();

            if body.get("client_id").filter(|s| *s == CLIENT_ID).is_none() {
                println!("Wrong or missing client ID");
                return false;
            }
            if body
                .get("client_secret")
                .filter(|s| *s == CLIENT_SECRET)
                .is_none()
            {
                println!("Wrong or missing client secret");
                return false;
            }
            if body
                .get("grant_type")
                .filter(|s| *s == "authorization_code")
                .is_none()
            {
                println!("Wrong or missing grant type");
                return false;
            }

            true
        })
        // Azure v1 sends `expires_in` as a string
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": ACCESS_TOKEN,
            "token_type": "Bearer",
            "expires_in": "3599",
            "ext_expires_in": "3599",
        })))
        .mount(&mock_server)
        .await;

    let response = request_access_token(
        &http_client,
        &client_credentials,
        &token_endpoint,
        code_request(),
        now(),
    )
    .await
    .unwrap();

    assert_eq!(response.expires_in, Some(3599));
    assert_eq!(response.extra.get("ext_expires_in"), Some(&json!("3599")));
}

#[tokio::test]
async fn pass_client_key_post() {
    let (http_client, mock_server, issuer) = init_test().await;
    let client_credentials = client_credentials(AuthMethod::ClientKeyPost);
    let token_endpoint = issuer.join("token").unwrap();

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(|req: &Request| {
            let body = form_urlencoded::parse(&req.body).collect::<HashMap<_, _>>();
            body.get("client_key").is_some_and(|s| s == CLIENT_ID)
                && body.get("client_secret").is_some_and(|s| s == CLIENT_SECRET)
                && !body.contains_key("client_id")
        })
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": ACCESS_TOKEN,
            "open_id": "some-open-id",
            "scope": "user.info.basic,video.list",
        })))
        .mount(&mock_server)
        .await;

    let response = request_access_token(
        &http_client,
        &client_credentials,
        &token_endpoint,
        code_request(),
        now(),
    )
    .await
    .unwrap();

    assert_eq!(response.token_type, None);
    assert_eq!(response.extra.get("open_id"), Some(&json!("some-open-id")));
    let scope = response.scope.unwrap();
    assert!(scope.contains("video.list"));
    assert!(scope.contains("user.info.basic"));
}

#[tokio::test]
async fn fail_oauth2_error() {
    let (http_client, mock_server, issuer) = init_test().await;
    let client_credentials = client_credentials(AuthMethod::None);
    let token_endpoint = issuer.join("token").unwrap();

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "The code has expired",
        })))
        .mount(&mock_server)
        .await;

    let error = request_access_token(
        &http_client,
        &client_credentials,
        &token_endpoint,
        code_request(),
        now(),
    )
    .await
    .unwrap_err();

    assert_matches!(
        error,
        TokenRequestError::OAuth2 {
            error: ClientErrorCode::InvalidGrant,
            error_description: Some(description),
        } if description == "The code has expired"
    );
}

#[tokio::test]
async fn fail_error_with_success_status() {
    let (http_client, mock_server, issuer) = init_test().await;
    let client_credentials = client_credentials(AuthMethod::ClientSecretPost);
    let token_endpoint = issuer.join("token").unwrap();

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": false,
            "error": "invalid_code",
        })))
        .mount(&mock_server)
        .await;

    let error = request_access_token(
        &http_client,
        &client_credentials,
        &token_endpoint,
        code_request(),
        now(),
    )
    .await
    .unwrap_err();

    assert_matches!(
        error,
        TokenRequestError::OAuth2 {
            error: ClientErrorCode::Unknown(code),
            error_description: None,
        } if code == "invalid_code"
    );
}

#[tokio::test]
async fn fail_status_without_body() {
    let (http_client, mock_server, issuer) = init_test().await;
    let client_credentials = client_credentials(AuthMethod::None);
    let token_endpoint = issuer.join("token").unwrap();

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&mock_server)
        .await;

    let error = request_access_token(
        &http_client,
        &client_credentials,
        &token_endpoint,
        code_request(),
        now(),
    )
    .await
    .unwrap_err();

    assert_matches!(
        error,
        TokenRequestError::Status {
            status: StatusCode::BAD_GATEWAY
        }
    );
}

#[tokio::test]
async fn fail_invalid_response() {
    let (http_client, mock_server, issuer) = init_test().await;
    let client_credentials = client_credentials(AuthMethod::None);
    let token_endpoint = issuer.join("token").unwrap();

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "bearer",
        })))
        .mount(&mock_server)
        .await;

    let error = request_access_token(
        &http_client,
        &client_credentials,
        &token_endpoint,
        code_request(),
        now(),
    )
    .await
    .unwrap_err();

    assert_matches!(error, TokenRequestError::InvalidResponse(_));
}
