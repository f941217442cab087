// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2022-2024 Kévin Commaille.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::collections::HashMap;

use assert_matches::assert_matches;
use chrono::Duration;
use rand::SeedableRng;
use serde_json::Value;
use social_jose::{
    claims::{self, OneOrMany, TimeNotAfter, TimeOptions},
    jwa::{AsymmetricSigningKey, JsonWebSignatureAlg},
    jwk::{PublicJsonWebKey, PublicJsonWebKeySet},
    jwt::Jwt,
};
use social_oidc_client::{
    error::CredentialsError,
    requests::token::request_access_token,
    types::{
        client_credentials::{ClientCredentials, make_apple_client_secret},
        requests::{AccessTokenRequest, AccessTokenResponse, RefreshTokenGrant},
    },
};
use wiremock::{
    Mock, Request, ResponseTemplate,
    matchers::{method, path},
};

use crate::{ACCESS_TOKEN, CLIENT_ID, REFRESH_TOKEN, init_test, now};

const TEAM_ID: &str = "TEAM123456";
const KEY_ID: &str = "KEY7890ABC";

fn apple_key() -> elliptic_curve::SecretKey<p256::NistP256> {
    let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(42);
    elliptic_curve::SecretKey::random(&mut rng)
}

fn apple_jwks(key: &elliptic_curve::SecretKey<p256::NistP256>) -> PublicJsonWebKeySet {
    let signer = AsymmetricSigningKey::es256(key.clone());
    PublicJsonWebKeySet::new(vec![
        PublicJsonWebKey::new(signer.public_parameters()).with_kid(KEY_ID),
    ])
}

/// Check the client secret minted for Sign in with Apple.
fn assert_apple_client_secret(
    client_secret: &str,
    key: &elliptic_curve::SecretKey<p256::NistP256>,
    lifetime: Duration,
) {
    let jwt: Jwt<'_, HashMap<String, Value>> = Jwt::try_from(client_secret).unwrap();
    jwt.verify_with_jwks(&apple_jwks(key)).unwrap();

    assert_eq!(jwt.header().alg(), &JsonWebSignatureAlg::Es256);
    assert_eq!(jwt.header().kid(), Some(KEY_ID));

    let mut claims = jwt.payload().clone();
    assert_eq!(claims::ISS.extract_required(&mut claims).unwrap(), TEAM_ID);
    assert_eq!(claims::SUB.extract_required(&mut claims).unwrap(), CLIENT_ID);
    assert_eq!(
        claims::AUD.extract_required(&mut claims).unwrap(),
        OneOrMany::from("https://appleid.apple.com".to_owned())
    );

    let iat = claims::IAT.extract_required(&mut claims).unwrap();
    let exp = claims::EXP
        .extract_required_with_options(&mut claims, TimeNotAfter::from(TimeOptions::new(now())))
        .unwrap();
    assert_eq!(*exp - *iat, lifetime);
}

#[test]
fn pass_make_apple_client_secret() {
    let key = apple_key();
    let lifetime = Duration::days(180);

    let client_secret =
        make_apple_client_secret(CLIENT_ID, TEAM_ID, KEY_ID, &key, now(), lifetime).unwrap();

    assert_apple_client_secret(&client_secret, &key, lifetime);
}

#[test]
fn fail_make_apple_client_secret_lifetime() {
    let key = apple_key();

    let error = make_apple_client_secret(
        CLIENT_ID,
        TEAM_ID,
        KEY_ID,
        &key,
        now(),
        Duration::days(183),
    )
    .unwrap_err();
    assert_matches!(error, CredentialsError::InvalidLifetime { max_days: 182 });

    let error =
        make_apple_client_secret(CLIENT_ID, TEAM_ID, KEY_ID, &key, now(), Duration::zero())
            .unwrap_err();
    assert_matches!(error, CredentialsError::InvalidLifetime { .. });
}

#[tokio::test]
async fn pass_sign_in_with_apple() {
    let (http_client, mock_server, issuer) = init_test().await;
    let token_endpoint = issuer.join("token").unwrap();

    let key = apple_key();
    let client_credentials = ClientCredentials::SignInWithApple {
        client_id: CLIENT_ID.to_owned(),
        key: key.clone(),
        key_id: KEY_ID.to_owned(),
        team_id: TEAM_ID.to_owned(),
    };

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(move |req: &Request| {
            let body = form_urlencoded::parse(&req.body).collect::<HashMap<_, _>>();

            if body.get("client_id").filter(|s| *s == CLIENT_ID).is_none() {
                println!("Wrong or missing client ID");
                return false;
            }

            let Some(client_secret) = body.get("client_secret") else {
                println!("Missing client secret");
                return false;
            };

            assert_apple_client_secret(client_secret, &key, Duration::seconds(60));
            true
        })
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(AccessTokenResponse::new(ACCESS_TOKEN.to_owned())),
        )
        .mount(&mock_server)
        .await;

    request_access_token(
        &http_client,
        &client_credentials,
        &token_endpoint,
        AccessTokenRequest::RefreshToken(RefreshTokenGrant {
            refresh_token: REFRESH_TOKEN.to_owned(),
            scope: None,
        }),
        now(),
    )
    .await
    .unwrap();
}

#[test]
fn debug_redacts_secrets() {
    let client_credentials = ClientCredentials::ClientSecretPost {
        client_id: CLIENT_ID.to_owned(),
        client_secret: "very-secret".to_owned(),
    };

    let debug = format!("{client_credentials:?}");
    assert!(debug.contains(CLIENT_ID));
    assert!(!debug.contains("very-secret"));
    assert_eq!(client_credentials.client_secret(), Some("very-secret"));
}
