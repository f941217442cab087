// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2022-2024 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use assert_matches::assert_matches;
use serde_json::json;
use social_providers::{
    OAuth2Session, ProviderError, Providers,
    providers::{Reddit, Slack},
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

use crate::{
    ACCESS_TOKEN, CLIENT_ID, CLIENT_SECRET, REFRESH_TOKEN, STATE, callback_params, init_test,
    mock_token_endpoint, mock_url, redirect_uri, token_response,
};

fn reddit(http_client: reqwest::Client, mock_server: &MockServer) -> Reddit {
    Reddit::new(
        http_client,
        CLIENT_ID.to_owned(),
        CLIENT_SECRET.to_owned(),
        redirect_uri(),
    )
    .unwrap()
    .with_endpoints(
        mock_url(mock_server, "/authorize"),
        mock_url(mock_server, "/token"),
    )
    .with_me_endpoint(mock_url(mock_server, "/me"))
}

fn slack(http_client: reqwest::Client) -> Slack {
    Slack::new(
        http_client,
        CLIENT_ID.to_owned(),
        CLIENT_SECRET.to_owned(),
        redirect_uri(),
    )
    .unwrap()
}

#[tokio::test]
async fn pass_complete_auth_with_marshaled_session() {
    let (http_client, mock_server) = init_test().await;

    let mut providers = Providers::new();
    providers.use_provider(reddit(http_client, &mock_server));
    let provider = providers.get("reddit").unwrap();

    let (url, session) = provider.begin_auth(STATE).await.unwrap();
    assert_eq!(provider.unmarshal_session(&session).unwrap(), url);

    // The session is plain JSON, to be stored between the two requests
    let stored: OAuth2Session = serde_json::from_str(&session).unwrap();
    assert_eq!(stored.auth_url, url);
    assert_eq!(stored.access_token, None);

    mock_token_endpoint(&mock_server, token_response()).await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "abc123",
            "name": "spez",
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (user, session) = provider
        .complete_auth(&session, &callback_params())
        .await
        .unwrap();
    assert_eq!(user.provider, "reddit");
    assert_eq!(user.user_id, "abc123");
    assert_eq!(user.access_token, ACCESS_TOKEN);

    let stored: OAuth2Session = serde_json::from_str(&session).unwrap();
    assert_eq!(stored.access_token.as_deref(), Some(ACCESS_TOKEN));
    assert_eq!(stored.refresh_token.as_deref(), Some(REFRESH_TOKEN));
}

#[tokio::test]
async fn fail_invalid_session() {
    let (http_client, mock_server) = init_test().await;

    let mut providers = Providers::new();
    providers.use_provider(reddit(http_client, &mock_server));
    let provider = providers.get("reddit").unwrap();

    assert_matches!(
        provider.unmarshal_session("{\"not\": \"a session\"}"),
        Err(ProviderError::Session(_))
    );
    assert_matches!(
        provider
            .complete_auth("not json", &callback_params())
            .await,
        Err(ProviderError::Session(_))
    );
}

#[tokio::test]
async fn registry_lookup() {
    let (http_client, mock_server) = init_test().await;

    let mut providers = Providers::new();
    assert!(providers.is_empty());

    providers.use_provider(slack(http_client.clone()));
    providers.use_provider(reddit(http_client.clone(), &mock_server));
    providers.use_provider(reddit(http_client.clone(), &mock_server).with_name("reddit-eu"));
    assert_eq!(
        providers.names().collect::<Vec<_>>(),
        ["reddit", "reddit-eu", "slack"]
    );

    // Registering under the same name replaces the provider
    providers.use_provider(slack(http_client).with_name("reddit"));
    assert_eq!(providers.len(), 3);
    let replaced = providers.get("reddit").unwrap();
    assert!(!replaced.refresh_token_available());
    let (url, _) = replaced.begin_auth(STATE).await.unwrap();
    assert_eq!(url.host_str(), Some("slack.com"));

    assert_matches!(
        providers.get("github"),
        Err(ProviderError::UnknownProvider { name }) if name == "github"
    );

    providers.clear();
    assert!(providers.is_empty());
    assert!(providers.get("slack").is_err());
}
