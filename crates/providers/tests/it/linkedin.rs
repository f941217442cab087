// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2023, 2024 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use assert_matches::assert_matches;
use serde_json::json;
use social_providers::{Provider, ProviderError, providers::LinkedIn};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path},
};

use crate::{
    ACCESS_TOKEN, CLIENT_ID, CLIENT_SECRET, REFRESH_TOKEN, STATE, callback_params, init_test,
    mock_token_endpoint, mock_url, redirect_uri, token_response,
};

fn linkedin(http_client: reqwest::Client, mock_server: &MockServer) -> LinkedIn {
    LinkedIn::new(
        http_client,
        CLIENT_ID.to_owned(),
        CLIENT_SECRET.to_owned(),
        redirect_uri(),
    )
    .unwrap()
    .with_endpoints(
        mock_url(mock_server, "/authorization"),
        mock_url(mock_server, "/token"),
    )
    .with_userinfo_endpoint(mock_url(mock_server, "/v2/userinfo"))
}

#[tokio::test]
async fn pass_fetch_user() {
    let (http_client, mock_server) = init_test().await;
    let linkedin = linkedin(http_client, &mock_server);

    mock_token_endpoint(&mock_server, token_response()).await;

    Mock::given(method("GET"))
        .and(path("/v2/userinfo"))
        .and(header("authorization", format!("Bearer {ACCESS_TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sub": "782bbtaQ",
            "name": "John Doe",
            "given_name": "John",
            "family_name": "Doe",
            "picture": "https://media.licdn-ei.com/dms/image/C5F03AQHqK8v7tB1HCQ/profile-displayphoto-shrink_100_100/0/",
            "locale": "en-US",
            "email": "doe@email.com",
            "email_verified": true,
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut session = linkedin.begin_auth(STATE).await.unwrap();
    linkedin
        .authorize(&mut session, &callback_params())
        .await
        .unwrap();

    let user = linkedin.fetch_user(&session).await.unwrap();
    assert_eq!(user.provider, "linkedin");
    assert_eq!(user.user_id, "782bbtaQ");
    assert_eq!(user.name.as_deref(), Some("John Doe"));
    assert_eq!(user.first_name.as_deref(), Some("John"));
    assert_eq!(user.last_name.as_deref(), Some("Doe"));
    assert_eq!(user.email.as_deref(), Some("doe@email.com"));
    assert!(user.avatar_url.unwrap().starts_with("https://media.licdn-ei.com/"));
    assert_eq!(user.raw_data.get("locale"), Some(&json!("en-US")));
}

#[tokio::test]
async fn fail_refresh_unsupported() {
    let (http_client, mock_server) = init_test().await;
    let linkedin = linkedin(http_client, &mock_server);

    assert!(!linkedin.refresh_token_available());
    let error = linkedin.refresh_token(REFRESH_TOKEN).await.unwrap_err();
    assert_matches!(error, ProviderError::RefreshUnsupported { provider } if provider == "linkedin");
}
