// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2022-2024 Kévin Commaille.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use assert_matches::assert_matches;
use chrono::Duration;
use serde_json::json;
use social_jose::{
    claims::{self, ClaimError},
    jwa::JsonWebSignatureAlg,
    jwt::{JsonWebSignatureHeader, Jwt},
};
use social_oidc_client::{
    error::{IdTokenError, JwksError, JwtVerificationError},
    requests::jose::{JwtVerificationData, fetch_jwks, verify_id_token},
};
use wiremock::{
    Mock, ResponseTemplate,
    matchers::{method, path},
};

use crate::{
    CLIENT_ID, ID_TOKEN_SIGNING_ALGS, SUBJECT_IDENTIFIER, id_token, id_token_claims, init_test,
    now, public_jwks, sign_id_token, signing_key,
};

#[tokio::test]
async fn pass_fetch_jwks() {
    let (http_client, mock_server, issuer) = init_test().await;
    let jwks_uri = issuer.join("jwks").unwrap();
    let (_, jwks) = id_token(issuer.as_str());

    Mock::given(method("GET"))
        .and(path("/jwks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&jwks))
        .mount(&mock_server)
        .await;

    let fetched = fetch_jwks(&http_client, &jwks_uri).await.unwrap();

    assert_eq!(fetched, jwks);
}

#[tokio::test]
async fn pass_fetch_jwks_skips_unknown_keys() {
    let (http_client, mock_server, issuer) = init_test().await;
    let jwks_uri = issuer.join("jwks").unwrap();

    Mock::given(method("GET"))
        .and(path("/jwks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "keys": [
                {"kty": "oct", "k": "c2VjcmV0", "kid": "symmetric"},
                {
                    "kty": "EC",
                    "crv": "P-256",
                    "x": "MKBCTNIcKUSDii11ySs3526iDZ8AiTo7Tu6KPAqv7D4",
                    "y": "4Etl6SRW2YiLUrN5vfvVHuhp7x8PxltmWWlbbM4IFyM",
                    "kid": "ec",
                },
            ],
        })))
        .mount(&mock_server)
        .await;

    let fetched = fetch_jwks(&http_client, &jwks_uri).await.unwrap();

    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched.iter().next().unwrap().kid(), Some("ec"));
}

#[tokio::test]
async fn fail_fetch_jwks_not_found() {
    let (http_client, _mock_server, issuer) = init_test().await;
    let jwks_uri = issuer.join("jwks").unwrap();

    let error = fetch_jwks(&http_client, &jwks_uri).await.unwrap_err();

    assert_matches!(error, JwksError::Http(_));
}

#[test]
fn pass_verify_id_token() {
    let issuer = "https://example.com/";
    let (id_token, jwks) = id_token(issuer);

    let verification_data = JwtVerificationData {
        issuer: Some(issuer),
        jwks: &jwks,
        client_id: CLIENT_ID,
        signing_algorithms: ID_TOKEN_SIGNING_ALGS,
    };

    let verified = verify_id_token(id_token.as_str(), verification_data, now()).unwrap();

    let mut claims = verified.payload().clone();
    assert_eq!(
        claims::SUB.extract_required(&mut claims).unwrap(),
        SUBJECT_IDENTIFIER
    );
}

#[test]
fn pass_verify_id_token_es256() {
    let issuer = "https://appleid.apple.com";
    let (key, kid) = signing_key(&JsonWebSignatureAlg::Es256);
    let header = JsonWebSignatureHeader::new(JsonWebSignatureAlg::Es256).with_kid(kid.clone());
    let id_token = Jwt::sign(header, id_token_claims(issuer), &key).unwrap();

    let verification_data = JwtVerificationData {
        issuer: Some(issuer),
        jwks: &public_jwks(&key, &kid),
        client_id: CLIENT_ID,
        signing_algorithms: &[JsonWebSignatureAlg::Rs256, JsonWebSignatureAlg::Es256],
    };

    verify_id_token(id_token.as_str(), verification_data, now()).unwrap();
}

#[test]
fn fail_verify_id_token_unexpected_alg() {
    let issuer = "https://example.com/";
    let (id_token, jwks) = id_token(issuer);

    let verification_data = JwtVerificationData {
        issuer: Some(issuer),
        jwks: &jwks,
        client_id: CLIENT_ID,
        signing_algorithms: &[JsonWebSignatureAlg::Es256],
    };

    let error = verify_id_token(id_token.as_str(), verification_data, now()).unwrap_err();

    assert_matches!(
        error,
        IdTokenError::Jwt(JwtVerificationError::WrongSignatureAlg)
    );
}

#[test]
fn fail_verify_id_token_wrong_issuer() {
    let (id_token, jwks) = id_token("https://example.com/");

    let verification_data = JwtVerificationData {
        issuer: Some("https://appleid.apple.com"),
        jwks: &jwks,
        client_id: CLIENT_ID,
        signing_algorithms: ID_TOKEN_SIGNING_ALGS,
    };

    let error = verify_id_token(id_token.as_str(), verification_data, now()).unwrap_err();

    assert_matches!(
        error,
        IdTokenError::Jwt(JwtVerificationError::Claim(ClaimError::ValidationError {
            claim: "iss",
            ..
        }))
    );
}

#[test]
fn fail_verify_id_token_unknown_kid() {
    let issuer = "https://example.com/";
    let (id_token, _) = id_token(issuer);
    let (key, _) = signing_key(&JsonWebSignatureAlg::Rs256);
    let jwks = public_jwks(&key, "some-other-kid");

    let verification_data = JwtVerificationData {
        issuer: Some(issuer),
        jwks: &jwks,
        client_id: CLIENT_ID,
        signing_algorithms: ID_TOKEN_SIGNING_ALGS,
    };

    let error = verify_id_token(id_token.as_str(), verification_data, now()).unwrap_err();

    assert_matches!(
        error,
        IdTokenError::Jwt(JwtVerificationError::JwtSignature(_))
    );
}

#[test]
fn fail_verify_id_token_expired() {
    let issuer = "https://example.com/";
    let (id_token, jwks) = id_token(issuer);

    let verification_data = JwtVerificationData {
        issuer: Some(issuer),
        jwks: &jwks,
        client_id: CLIENT_ID,
        signing_algorithms: ID_TOKEN_SIGNING_ALGS,
    };

    // Past the expiration, even with the leeway
    let later = now() + Duration::hours(2);
    let error = verify_id_token(id_token.as_str(), verification_data, later).unwrap_err();

    assert_matches!(
        error,
        IdTokenError::Claim(ClaimError::ValidationError { claim: "exp", .. })
    );
}

#[test]
fn fail_verify_id_token_missing_subject() {
    let issuer = "https://example.com/";

    let mut claims = id_token_claims(issuer);
    claims.remove("sub");
    let (id_token, jwks) = sign_id_token(claims);

    let verification_data = JwtVerificationData {
        issuer: Some(issuer),
        jwks: &jwks,
        client_id: CLIENT_ID,
        signing_algorithms: ID_TOKEN_SIGNING_ALGS,
    };

    let error = verify_id_token(id_token.as_str(), verification_data, now()).unwrap_err();

    assert_matches!(error, IdTokenError::Claim(ClaimError::MissingClaim("sub")));
}
