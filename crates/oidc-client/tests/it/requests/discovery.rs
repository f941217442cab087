// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2022-2024 Kévin Commaille.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use assert_matches::assert_matches;
use social_jose::jwa::{JsonWebSignatureAlg, SUPPORTED_SIGNING_ALGORITHMS};
use social_oidc_client::{
    error::DiscoveryError,
    requests::discovery::{discover, well_known_url},
    types::{
        oidc::{ProviderMetadata, ProviderMetadataVerificationError},
        pkce::PkceCodeChallengeMethod,
    },
};
use url::Url;
use wiremock::{
    Mock, ResponseTemplate,
    matchers::{method, path},
};

use crate::init_test;

fn provider_metadata(issuer: &Url) -> ProviderMetadata {
    ProviderMetadata {
        issuer: Some(issuer.as_str().to_owned()),
        authorization_endpoint: issuer.join("authorize").ok(),
        token_endpoint: issuer.join("token").ok(),
        jwks_uri: issuer.join("jwks").ok(),
        response_types_supported: Some(vec!["code".to_owned()]),
        id_token_signing_alg_values_supported: Some(SUPPORTED_SIGNING_ALGORITHMS.into()),
        code_challenge_methods_supported: Some(vec![PkceCodeChallengeMethod::S256]),
        ..Default::default()
    }
}

#[tokio::test]
async fn pass_discover() {
    let (http_client, mock_server, issuer) = init_test().await;

    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(provider_metadata(&issuer)))
        .mount(&mock_server)
        .await;

    let provider_metadata = discover(&http_client, issuer.as_str()).await.unwrap();

    assert_eq!(provider_metadata.issuer(), issuer.as_str());
    assert_eq!(
        provider_metadata.token_endpoint(),
        &issuer.join("token").unwrap()
    );
    assert!(provider_metadata.supports_pkce_s256());
}

#[tokio::test]
async fn pass_discover_issuer_without_trailing_slash() {
    let (http_client, mock_server, issuer) = init_test().await;

    // `http://127.0.0.1:PORT`, without the slash `Url` adds
    let bare_issuer = mock_server.uri();
    let mut metadata = provider_metadata(&issuer);
    metadata.issuer = Some(bare_issuer.clone());

    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(metadata))
        .mount(&mock_server)
        .await;

    let provider_metadata = discover(&http_client, &bare_issuer).await.unwrap();
    assert_eq!(provider_metadata.issuer(), bare_issuer);

    // The same metadata doesn't match the issuer with a trailing slash
    let error = discover(&http_client, issuer.as_str()).await.unwrap_err();
    assert_matches!(
        error,
        DiscoveryError::Validation(ProviderMetadataVerificationError::IssuerUrlsDontMatch { .. })
    );
}

#[tokio::test]
async fn pass_discover_unknown_algorithms() {
    let (http_client, mock_server, issuer) = init_test().await;

    let mut metadata = serde_json::to_value(provider_metadata(&issuer)).unwrap();
    metadata["id_token_signing_alg_values_supported"] = serde_json::json!(["RS256", "none"]);
    metadata["code_challenge_methods_supported"] = serde_json::json!(["S256", "S3-256"]);

    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(metadata))
        .mount(&mock_server)
        .await;

    let provider_metadata = discover(&http_client, issuer.as_str()).await.unwrap();

    assert!(provider_metadata.supports_pkce_s256());
    assert_eq!(
        provider_metadata.id_token_signing_alg_values_supported,
        Some(vec![
            JsonWebSignatureAlg::Rs256,
            JsonWebSignatureAlg::Unknown("none".to_owned())
        ])
    );
}

#[test]
fn well_known_url_keeps_issuer_path() {
    assert_eq!(
        well_known_url("https://sso.example.com/realms/main").unwrap().as_str(),
        "https://sso.example.com/realms/main/.well-known/openid-configuration"
    );
    assert_eq!(
        well_known_url("https://sso.example.com/realms/main/").unwrap().as_str(),
        "https://sso.example.com/realms/main/.well-known/openid-configuration"
    );
    assert_eq!(
        well_known_url("https://accounts.example.com").unwrap().as_str(),
        "https://accounts.example.com/.well-known/openid-configuration"
    );
    assert_matches!(well_known_url("not a url"), Err(DiscoveryError::IntoUrl(_)));
}

#[tokio::test]
async fn fail_discover_issuer_mismatch() {
    let (http_client, mock_server, issuer) = init_test().await;

    let mut metadata = provider_metadata(&issuer);
    metadata.issuer = Some("https://login.example.com/".to_owned());

    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(metadata))
        .mount(&mock_server)
        .await;

    let error = discover(&http_client, issuer.as_str()).await.unwrap_err();

    assert_matches!(
        error,
        DiscoveryError::Validation(ProviderMetadataVerificationError::IssuerUrlsDontMatch { .. })
    );
}

#[tokio::test]
async fn fail_discover_404() {
    let (http_client, _mock_server, issuer) = init_test().await;

    let error = discover(&http_client, issuer.as_str()).await.unwrap_err();

    assert_matches!(error, DiscoveryError::Http(_));
}

#[tokio::test]
async fn fail_discover_not_json() {
    let (http_client, mock_server, issuer) = init_test().await;

    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let error = discover(&http_client, issuer.as_str()).await.unwrap_err();

    assert_matches!(error, DiscoveryError::Http(_));
}

#[tokio::test]
async fn fail_discover_invalid_metadata() {
    let (http_client, mock_server, issuer) = init_test().await;

    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ProviderMetadata::default()))
        .mount(&mock_server)
        .await;

    let error = discover(&http_client, issuer.as_str()).await.unwrap_err();

    assert_matches!(error, DiscoveryError::Validation(_));
}
