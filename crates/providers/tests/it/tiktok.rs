// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2023, 2024 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::collections::HashMap;

use assert_matches::assert_matches;
use serde_json::json;
use social_oauth2_types::scope::Scope;
use social_providers::{Provider, ProviderError, providers::TikTok};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_string_contains, method, path, query_param},
};

use crate::{
    AUTHORIZATION_CODE, REFRESH_TOKEN, STATE, callback_params, init_test, mock_url, redirect_uri,
    token_response,
};

const CLIENT_KEY: &str = "awxyz0123";
const CLIENT_SECRET: &str = "tiktoksecret";

fn tiktok(http_client: reqwest::Client, mock_server: &MockServer) -> TikTok {
    TikTok::new(
        http_client,
        CLIENT_KEY.to_owned(),
        CLIENT_SECRET.to_owned(),
        redirect_uri(),
    )
    .unwrap()
    .with_endpoints(
        mock_url(mock_server, "/v2/auth/authorize/"),
        mock_url(mock_server, "/token"),
    )
    .with_user_info_endpoint(mock_url(mock_server, "/v2/user/info/"))
}

async fn mount_token_endpoint(mock_server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains(format!("client_key={CLIENT_KEY}")))
        .and(body_string_contains(format!("client_secret={CLIENT_SECRET}")))
        .and(body_string_contains(format!("code={AUTHORIZATION_CODE}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response()))
        .expect(1)
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn pass_begin_auth() {
    let (http_client, mock_server) = init_test().await;
    let scope: Scope = "user.info.basic video.list".parse().unwrap();
    let tiktok = tiktok(http_client, &mock_server).with_scope(scope);

    let session = tiktok.begin_auth(STATE).await.unwrap();
    let query: HashMap<_, _> = session.auth_url.query_pairs().into_owned().collect();

    assert_eq!(query.get("client_key").unwrap(), CLIENT_KEY);
    assert!(!query.contains_key("client_id"));
    assert_eq!(query.get("scope").unwrap(), "user.info.basic,video.list");
    assert_eq!(query.get("state").unwrap(), STATE);
}

#[tokio::test]
async fn pass_fetch_user() {
    let (http_client, mock_server) = init_test().await;
    let tiktok = tiktok(http_client, &mock_server);

    mount_token_endpoint(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/v2/user/info/"))
        .and(query_param(
            "fields",
            "open_id,union_id,avatar_url,display_name,username",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "user": {
                    "open_id": "723f24d7-e717-40f8-a2b6-cb8464cd23b4",
                    "union_id": "c9c60f44-a68e-4f5d-84dd-ce22faeb0ba1",
                    "avatar_url": "https://p19-sign.tiktokcdn-us.com/tos-useast5-avt-0068-tx/b17f0e4b3a4f4a50993cf72cda8b88b8~c5_168x168.jpeg",
                    "display_name": "Tik Toker",
                    "username": "tiktoker",
                },
            },
            "error": {
                "code": "ok",
                "message": "",
                "log_id": "20220829194722CBE87ED59D524E727021",
            },
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut session = tiktok.begin_auth(STATE).await.unwrap();
    tiktok
        .authorize(&mut session, &callback_params())
        .await
        .unwrap();

    let user = tiktok.fetch_user(&session).await.unwrap();
    assert_eq!(user.provider, "tiktok");
    assert_eq!(user.user_id, "723f24d7-e717-40f8-a2b6-cb8464cd23b4");
    assert_eq!(user.name.as_deref(), Some("Tik Toker"));
    assert_eq!(user.nick_name.as_deref(), Some("tiktoker"));
    assert!(user.avatar_url.is_some());
    assert_eq!(
        user.raw_data.get("union_id"),
        Some(&json!("c9c60f44-a68e-4f5d-84dd-ce22faeb0ba1"))
    );
}

#[tokio::test]
async fn fail_api_error() {
    let (http_client, mock_server) = init_test().await;
    let tiktok = tiktok(http_client, &mock_server);

    mount_token_endpoint(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/v2/user/info/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {},
            "error": {
                "code": "access_token_invalid",
                "message": "The access token is invalid or not found in the request.",
                "log_id": "20220829194722CBE87ED59D524E727021",
            },
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut session = tiktok.begin_auth(STATE).await.unwrap();
    tiktok
        .authorize(&mut session, &callback_params())
        .await
        .unwrap();

    let error = tiktok.fetch_user(&session).await.unwrap_err();
    assert_matches!(
        error,
        ProviderError::Api { provider, error }
            if provider == "tiktok" && error.starts_with("access_token_invalid: ")
    );
}

#[tokio::test]
async fn pass_refresh_token() {
    let (http_client, mock_server) = init_test().await;
    let tiktok = tiktok(http_client, &mock_server);

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains(format!("client_key={CLIENT_KEY}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "AccessToken2",
            "token_type": "Bearer",
            "expires_in": "86400",
            "refresh_token": REFRESH_TOKEN,
            "open_id": "723f24d7-e717-40f8-a2b6-cb8464cd23b4",
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = tiktok.refresh_token(REFRESH_TOKEN).await.unwrap();
    assert_eq!(response.access_token, "AccessToken2");
    assert_eq!(response.expires_in, Some(86400));
}
