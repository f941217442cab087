// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2022-2024 Kévin Commaille.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::collections::HashMap;

use assert_matches::assert_matches;
use social_jose::{
    claims::{self, ClaimError, hash_token},
    jwa::JsonWebSignatureAlg,
};
use social_oidc_client::{
    error::{IdTokenError, TokenRefreshError},
    requests::{jose::JwtVerificationData, refresh_token::refresh_access_token},
    types::requests::AccessTokenResponse,
};
use wiremock::{
    Mock, Request, ResponseTemplate,
    matchers::{method, path},
};

use crate::{
    ACCESS_TOKEN, AuthMethod, CLIENT_ID, ID_TOKEN_SIGNING_ALGS, REFRESH_TOKEN, client_credentials,
    id_token, id_token_claims, init_test, now, sign_id_token,
};

#[tokio::test]
async fn pass_refresh_access_token() {
    let (http_client, mock_server, issuer) = init_test().await;
    let client_credentials = client_credentials(AuthMethod::None);
    let token_endpoint = issuer.join("token").unwrap();

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(|req: &Request| {
            let query_pairs = form_urlencoded::parse(&req.body).collect::<HashMap<_, _>>();

            if query_pairs
                .get("grant_type")
                .filter(|s| *s == "refresh_token")
                .is_none()
            {
                println!("Wrong or missing grant type");
                return false;
            }
            if query_pairs
                .get("refresh_token")
                .filter(|s| *s == REFRESH_TOKEN)
                .is_none()
            {
                println!("Wrong or missing refresh token");
                return false;
            }
            if query_pairs
                .get("client_id")
                .filter(|s| *s == CLIENT_ID)
                .is_none()
            {
                println!("Wrong or missing client ID");
                return false;
            }

            true
        })
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(AccessTokenResponse::new(ACCESS_TOKEN.to_owned())),
        )
        .mount(&mock_server)
        .await;

    let (response, response_id_token) = refresh_access_token(
        &http_client,
        &client_credentials,
        &token_endpoint,
        REFRESH_TOKEN.to_owned(),
        None,
        None,
        now(),
    )
    .await
    .unwrap();

    assert_eq!(response.access_token, ACCESS_TOKEN);
    assert_eq!(response.refresh_token, None);
    assert_matches!(response_id_token, None);
}

#[tokio::test]
async fn fail_refresh_access_token_wrong_at_hash() {
    let (http_client, mock_server, issuer) = init_test().await;
    let client_credentials = client_credentials(AuthMethod::None);
    let token_endpoint = issuer.join("token").unwrap();

    // The ID token was issued along with another access token
    let mut claims = id_token_claims(issuer.as_str());
    claims::AT_HASH
        .insert(
            &mut claims,
            hash_token(&JsonWebSignatureAlg::Rs256, "AnotherAccessToken").unwrap(),
        )
        .unwrap();
    let (id_token, jwks) = sign_id_token(claims);
    let verification_data = JwtVerificationData {
        issuer: Some(issuer.as_str()),
        jwks: &jwks,
        client_id: CLIENT_ID,
        signing_algorithms: ID_TOKEN_SIGNING_ALGS,
    };

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(
                AccessTokenResponse::new(ACCESS_TOKEN.to_owned())
                    .with_id_token(id_token.into_string()),
            ),
        )
        .mount(&mock_server)
        .await;

    let error = refresh_access_token(
        &http_client,
        &client_credentials,
        &token_endpoint,
        REFRESH_TOKEN.to_owned(),
        None,
        Some(verification_data),
        now(),
    )
    .await
    .unwrap_err();

    assert_matches!(
        error,
        TokenRefreshError::IdToken(IdTokenError::Claim(ClaimError::ValidationError {
            claim: "at_hash",
            ..
        }))
    );
}

#[tokio::test]
async fn fail_refresh_access_token_wrong_issuer() {
    let (http_client, mock_server, issuer) = init_test().await;
    let client_credentials = client_credentials(AuthMethod::None);
    let token_endpoint = issuer.join("token").unwrap();

    let (id_token, jwks) = id_token("https://login.example.com/");
    let verification_data = JwtVerificationData {
        issuer: Some(issuer.as_str()),
        jwks: &jwks,
        client_id: CLIENT_ID,
        signing_algorithms: ID_TOKEN_SIGNING_ALGS,
    };

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(
                AccessTokenResponse::new(ACCESS_TOKEN.to_owned())
                    .with_id_token(id_token.into_string()),
            ),
        )
        .mount(&mock_server)
        .await;

    let error = refresh_access_token(
        &http_client,
        &client_credentials,
        &token_endpoint,
        REFRESH_TOKEN.to_owned(),
        None,
        Some(verification_data),
        now(),
    )
    .await
    .unwrap_err();

    assert_matches!(error, TokenRefreshError::IdToken(IdTokenError::Jwt(_)));
}

#[tokio::test]
async fn pass_refresh_access_token_with_id_token() {
    let (http_client, mock_server, issuer) = init_test().await;
    let client_credentials = client_credentials(AuthMethod::None);
    let token_endpoint = issuer.join("token").unwrap();

    let (id_token, jwks) = id_token(issuer.as_str());
    let verification_data = JwtVerificationData {
        issuer: Some(issuer.as_str()),
        jwks: &jwks,
        client_id: CLIENT_ID,
        signing_algorithms: ID_TOKEN_SIGNING_ALGS,
    };

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(
                AccessTokenResponse::new(ACCESS_TOKEN.to_owned())
                    .with_refresh_token(REFRESH_TOKEN.to_owned())
                    .with_id_token(id_token.to_string()),
            ),
        )
        .mount(&mock_server)
        .await;

    let (response, response_id_token) = refresh_access_token(
        &http_client,
        &client_credentials,
        &token_endpoint,
        REFRESH_TOKEN.to_owned(),
        None,
        Some(verification_data),
        now(),
    )
    .await
    .unwrap();

    assert_eq!(response.refresh_token.as_deref(), Some(REFRESH_TOKEN));
    assert_eq!(response_id_token.unwrap().as_str(), id_token.as_str());
}
