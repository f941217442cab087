// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2022-2024 Kévin Commaille.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rand::{
    SeedableRng,
    distributions::{Alphanumeric, DistString},
};
use social_jose::{
    claims::{self, hash_token},
    jwa::{AsymmetricSigningKey, JsonWebSignatureAlg},
    jwk::{PublicJsonWebKey, PublicJsonWebKeySet},
    jwt::{JsonWebSignatureHeader, Jwt},
};
use social_oidc_client::types::{IdToken, client_credentials::ClientCredentials};
use url::Url;
use wiremock::MockServer;

mod requests;
mod types;

const REDIRECT_URI: &str = "http://localhost/";
const CLIENT_ID: &str = "client!+ID";
const CLIENT_SECRET: &str = "SECRET?%Gclient";
const AUTHORIZATION_CODE: &str = "authC0D3";
const CODE_VERIFIER: &str = "cODEv3R1f1ER";
const NONCE: &str = "No0o0o0once";
const ACCESS_TOKEN: &str = "AccessToken1";
const REFRESH_TOKEN: &str = "RefreshToken1";
const SUBJECT_IDENTIFIER: &str = "SubjectID";
const ID_TOKEN_SIGNING_ALGS: &[JsonWebSignatureAlg] = &[JsonWebSignatureAlg::Rs256];

/// The ways a client can authenticate in these tests.
#[derive(Debug, Clone, Copy)]
enum AuthMethod {
    None,
    ClientSecretBasic,
    ClientSecretPost,
    ClientKeyPost,
}

fn now() -> DateTime<Utc> {
    #[allow(clippy::disallowed_methods)]
    Utc::now()
}

async fn init_test() -> (reqwest::Client, MockServer, Url) {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("social_oidc_client=debug")
        .try_init();

    let client = social_http::reqwest_client().unwrap();
    let mock_server = MockServer::start().await;
    let issuer = Url::parse(&mock_server.uri()).expect("Couldn't parse URL");

    (client, mock_server, issuer)
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

/// The claims of a valid ID token.
fn id_token_claims(issuer: &str) -> HashMap<String, serde_json::Value> {
    let signing_alg = JsonWebSignatureAlg::Rs256;
    let mut claims = HashMap::new();
    let now = now();

    claims::ISS.insert(&mut claims, issuer.to_owned()).unwrap();
    claims::SUB
        .insert(&mut claims, SUBJECT_IDENTIFIER.to_owned())
        .unwrap();
    claims::AUD
        .insert(&mut claims, CLIENT_ID.to_owned())
        .unwrap();
    claims::NONCE.insert(&mut claims, NONCE.to_owned()).unwrap();

    claims::IAT.insert(&mut claims, now).unwrap();
    claims::EXP
        .insert(&mut claims, now + Duration::hours(1))
        .unwrap();

    claims::AT_HASH
        .insert(&mut claims, hash_token(&signing_alg, ACCESS_TOKEN).unwrap())
        .unwrap();
    claims::C_HASH
        .insert(
            &mut claims,
            hash_token(&signing_alg, AUTHORIZATION_CODE).unwrap(),
        )
        .unwrap();

    claims
}

/// Sign the given claims as an ID token.
fn sign_id_token(
    claims: HashMap<String, serde_json::Value>,
) -> (IdToken<'static>, PublicJsonWebKeySet) {
    let (key, kid) = signing_key(&JsonWebSignatureAlg::Rs256);
    let header = JsonWebSignatureHeader::new(JsonWebSignatureAlg::Rs256).with_kid(kid.clone());
    let id_token = Jwt::sign(header, claims, &key).unwrap();

    (id_token, public_jwks(&key, &kid))
}

/// Generate an ID token.
fn id_token(issuer: &str) -> (IdToken<'static>, PublicJsonWebKeySet) {
    sign_id_token(id_token_claims(issuer))
}

/// Generate client credentials for the given authentication method.
fn client_credentials(auth_method: AuthMethod) -> ClientCredentials {
    match auth_method {
        AuthMethod::None => ClientCredentials::None {
            client_id: CLIENT_ID.to_owned(),
        },
        AuthMethod::ClientSecretPost => ClientCredentials::ClientSecretPost {
            client_id: CLIENT_ID.to_owned(),
            client_secret: CLIENT_SECRET.to_owned(),
        },
        AuthMethod::ClientSecretBasic => ClientCredentials::ClientSecretBasic {
            client_id: CLIENT_ID.to_owned(),
            client_secret: CLIENT_SECRET.to_owned(),
        },
        AuthMethod::ClientKeyPost => ClientCredentials::ClientKeyPost {
            client_key: CLIENT_ID.to_owned(),
            client_secret: CLIENT_SECRET.to_owned(),
        },
    }
}
