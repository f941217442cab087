// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2022-2024 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::sync::Arc;

use rand::{
    SeedableRng,
    distributions::{Alphanumeric, DistString},
};
use serde_json::{Value, json};
use social_jose::{
    jwa::{AsymmetricSigningKey, JsonWebSignatureAlg},
    jwk::{PublicJsonWebKey, PublicJsonWebKeySet},
};
use social_providers::{CallbackParams, Clock, MockClock};
use url::Url;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_string_contains, method, path},
};

mod azure;
mod linkedin;
mod registry;
mod tiktok;

const REDIRECT_URI: &str = "http://localhost/callback";
const CLIENT_ID: &str = "client!+ID";
const CLIENT_SECRET: &str = "SECRET?%Gclient";
const STATE: &str = "st4te";
const AUTHORIZATION_CODE: &str = "authC0D3";
const ACCESS_TOKEN: &str = "AccessToken1";
const REFRESH_TOKEN: &str = "RefreshToken1";

async fn init_test() -> (reqwest::Client, MockServer) {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("social_providers=debug,social_oidc_client=debug")
        .try_init();

    let client = social_http::reqwest_client().unwrap();
    let mock_server = MockServer::start().await;

    (client, mock_server)
}

fn redirect_uri() -> Url {
    Url::parse(REDIRECT_URI).unwrap()
}

/// A URL on the mock server.
fn mock_url(mock_server: &MockServer, path: &str) -> Url {
    Url::parse(&mock_server.uri()).unwrap().join(path).unwrap()
}

/// A clock frozen in time, shared between the provider and the test.
fn clock() -> (Arc<MockClock>, Arc<dyn Clock>) {
    let clock = Arc::new(MockClock::default());
    (clock.clone(), clock)
}

/// The parameters of a successful callback.
fn callback_params() -> CallbackParams {
    [("state", STATE), ("code", AUTHORIZATION_CODE)]
        .into_iter()
        .collect()
}

/// A successful token response.
fn token_response() -> Value {
    json!({
        "access_token": ACCESS_TOKEN,
        "token_type": "Bearer",
        "expires_in": 3600,
        "refresh_token": REFRESH_TOKEN,
    })
}

/// Mount a token endpoint answering the authorization code with `response`.
async fn mock_token_endpoint(mock_server: &MockServer, response: Value) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains(format!("code={AUTHORIZATION_CODE}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(response))
        .expect(1)
        .mount(mock_server)
        .await;
}

/// Generate a signing key for the given algorithm, and its key ID.
fn signing_key(alg: &JsonWebSignatureAlg) -> (AsymmetricSigningKey, String) {
    let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(42);

    let key = match alg {
        JsonWebSignatureAlg::Rs256 => {
            AsymmetricSigningKey::rs256(rsa::RsaPrivateKey::new(&mut rng, 2048).unwrap())
        }
        JsonWebSignatureAlg::Es256 => {
            AsymmetricSigningKey::es256(elliptic_curve::SecretKey::random(&mut rng))
        }
        _ => unimplemented!(),
    };

    let kid = Alphanumeric.sample_string(&mut rng, 10);

    (key, kid)
}

/// The public JWKS matching a signing key.
fn public_jwks(key: &AsymmetricSigningKey, kid: &str) -> PublicJsonWebKeySet {
    PublicJsonWebKeySet::new(vec![
        PublicJsonWebKey::new(key.public_parameters())
            .with_kid(kid)
            .with_alg(key.alg()),
    ])
}
