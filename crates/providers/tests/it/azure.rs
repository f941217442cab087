// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2023, 2024 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::collections::HashMap;

use chrono::Duration;
use serde_json::json;
use social_providers::{Clock, Provider, providers::Azure};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_string_contains, header, method, path},
};

use crate::{
    ACCESS_TOKEN, CLIENT_ID, CLIENT_SECRET, REFRESH_TOKEN, STATE, callback_params, clock,
    init_test, mock_token_endpoint, mock_url, redirect_uri, token_response,
};

fn azure(http_client: reqwest::Client, mock_server: &MockServer) -> Azure {
    Azure::new(
        http_client,
        CLIENT_ID.to_owned(),
        CLIENT_SECRET.to_owned(),
        "common",
        redirect_uri(),
    )
    .unwrap()
    .with_endpoints(
        mock_url(mock_server, "/authorize"),
        mock_url(mock_server, "/token"),
    )
    .with_graph_endpoint(mock_url(mock_server, "/v1.0/me"))
}

#[tokio::test]
async fn pass_tenant_endpoints() {
    let (http_client, _mock_server) = init_test().await;

    let azure = Azure::new(
        http_client,
        CLIENT_ID.to_owned(),
        CLIENT_SECRET.to_owned(),
        "contoso.onmicrosoft.com",
        redirect_uri(),
    )
    .unwrap();

    let session = azure.begin_auth(STATE).await.unwrap();
    let url = &session.auth_url;
    assert_eq!(url.host_str(), Some("login.microsoftonline.com"));
    assert_eq!(url.path(), "/contoso.onmicrosoft.com/oauth2/v2.0/authorize");

    let query: HashMap<_, _> = url.query_pairs().into_owned().collect();
    assert_eq!(
        query.get("scope").unwrap(),
        "User.Read email offline_access openid profile"
    );
    assert_eq!(query.get("redirect_uri").unwrap(), crate::REDIRECT_URI);
    assert!(query.contains_key("nonce"));
}

#[tokio::test]
async fn pass_fetch_user() {
    let (http_client, mock_server) = init_test().await;
    let (mock_clock, clock) = clock();
    let azure = azure(http_client, &mock_server).with_clock(clock);

    mock_token_endpoint(&mock_server, token_response()).await;

    Mock::given(method("GET"))
        .and(path("/v1.0/me"))
        .and(header("authorization", format!("Bearer {ACCESS_TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "87d349ed-44d7-43e1-9a83-5f2406dee5bd",
            "displayName": "Megan Bowen",
            "givenName": "Megan",
            "surname": "Bowen",
            "mail": null,
            "userPrincipalName": "MeganB@contoso.onmicrosoft.com",
            "officeLocation": "12/1110",
            "jobTitle": "Auditor",
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut session = azure.begin_auth(STATE).await.unwrap();
    azure
        .authorize(&mut session, &callback_params())
        .await
        .unwrap();

    let user = azure.fetch_user(&session).await.unwrap();
    assert_eq!(user.provider, "azure");
    assert_eq!(user.user_id, "87d349ed-44d7-43e1-9a83-5f2406dee5bd");
    assert_eq!(user.name.as_deref(), Some("Megan Bowen"));
    assert_eq!(user.first_name.as_deref(), Some("Megan"));
    assert_eq!(user.last_name.as_deref(), Some("Bowen"));
    // No mailbox, falls back to the principal name
    assert_eq!(
        user.email.as_deref(),
        Some("MeganB@contoso.onmicrosoft.com")
    );
    assert_eq!(user.location.as_deref(), Some("12/1110"));
    assert_eq!(user.description.as_deref(), Some("Auditor"));
    assert_eq!(user.refresh_token.as_deref(), Some(REFRESH_TOKEN));
    assert_eq!(
        user.expires_at,
        Some(mock_clock.now() + Duration::seconds(3600))
    );
    assert_eq!(user.raw_data.get("jobTitle"), Some(&json!("Auditor")));
}

#[tokio::test]
async fn pass_refresh_token() {
    let (http_client, mock_server) = init_test().await;
    let azure = azure(http_client, &mock_server);

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains(format!("refresh_token={REFRESH_TOKEN}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "AccessToken2",
            "token_type": "Bearer",
            "expires_in": 3600,
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    assert!(azure.refresh_token_available());
    let response = azure.refresh_token(REFRESH_TOKEN).await.unwrap();
    assert_eq!(response.access_token, "AccessToken2");
    assert_eq!(response.refresh_token, None);
}
