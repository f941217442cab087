// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2022-2024 Kévin Commaille.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Requests and method related to JSON Object Signing and Encryption.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use social_http::RequestBuilderExt;
use social_jose::{
    claims::{self, TimeNotAfter, TimeNotBefore, TimeOptions},
    jwa::JsonWebSignatureAlg,
    jwk::PublicJsonWebKeySet,
    jwt::Jwt,
};
use url::Url;

use crate::{
    error::{IdTokenError, JwksError, JwtVerificationError},
    types::IdToken,
};

/// Fetch a JWKS at the given URL.
///
/// # Arguments
///
/// * `http_client` - The reqwest client to use for making HTTP requests.
///
/// * `jwks_uri` - The URL where the JWKS can be retrieved.
///
/// # Errors
///
/// Returns an error if the request fails or if the data is invalid.
#[tracing::instrument(skip_all, fields(jwks_uri))]
pub async fn fetch_jwks(
    http_client: &reqwest::Client,
    jwks_uri: &Url,
) -> Result<PublicJsonWebKeySet, JwksError> {
    tracing::debug!("Fetching JWKS...");

    let response: PublicJsonWebKeySet = http_client
        .get(jwks_uri.as_str())
        .send_traced()
        .await?
        .error_for_status()?
        .json()
        .await?;

    tracing::debug!(keys = response.len(), "Fetched JWKS");

    Ok(response)
}

/// The data required to verify a JWT.
#[derive(Clone, Copy)]
pub struct JwtVerificationData<'a> {
    /// The URL of the issuer that generated the ID Token.
    pub issuer: Option<&'a str>,

    /// The issuer's JWKS.
    pub jwks: &'a PublicJsonWebKeySet,

    /// The ID obtained when registering the client.
    pub client_id: &'a str,

    /// The JWAs that may have been used to sign the JWT.
    pub signing_algorithms: &'a [JsonWebSignatureAlg],
}

/// Decode and verify a signed JWT.
///
/// The following checks are performed:
///
/// * The `alg` in the header must be one of the accepted signing algorithms.
///
/// * The signature is verified with the given JWKS.
///
/// * The `iss` claim must be present and match the issuer, if present
///
/// * The `aud` claim must be present and contain the client ID.
///
/// # Errors
///
/// Returns an error if the data is invalid or verification fails.
pub fn verify_signed_jwt<'a>(
    jwt: &'a str,
    verification_data: JwtVerificationData<'_>,
) -> Result<Jwt<'a, HashMap<String, Value>>, JwtVerificationError> {
    tracing::debug!("Validating JWT...");

    let JwtVerificationData {
        issuer,
        jwks,
        client_id,
        signing_algorithms,
    } = verification_data;

    let jwt: Jwt<HashMap<String, Value>> = jwt.try_into()?;

    // Must use one of the accepted algorithms.
    if !signing_algorithms.contains(jwt.header().alg()) {
        return Err(JwtVerificationError::WrongSignatureAlg);
    }

    jwt.verify_with_jwks(jwks)?;

    let mut claims = jwt.payload().clone();

    if let Some(issuer) = issuer {
        // Must have the proper issuer.
        claims::ISS.extract_required_with_options(&mut claims, issuer)?;
    }

    // Must have the proper audience.
    claims::AUD.extract_required_with_options(&mut claims, client_id)?;

    Ok(jwt)
}

/// Decode and verify an ID Token.
///
/// Besides the checks of [`verify_signed_jwt()`], the following checks are
/// performed:
///
/// * The `exp` claim must be present and the token must not have expired.
///
/// * The `iat` claim must be present and must be in the past.
///
/// * The `sub` claim must be present.
///
/// # Errors
///
/// Returns an error if the data is invalid or verification fails.
pub fn verify_id_token<'a>(
    id_token: &'a str,
    verification_data: JwtVerificationData<'_>,
    now: DateTime<Utc>,
) -> Result<IdToken<'a>, IdTokenError> {
    let id_token = verify_signed_jwt(id_token, verification_data)?;

    let mut claims = id_token.payload().clone();

    let time_options = TimeOptions::new(now);
    // Must not have expired.
    claims::EXP.extract_required_with_options(&mut claims, TimeNotAfter::from(&time_options))?;

    // `iat` claim must be present and not in the future.
    claims::IAT.extract_required_with_options(&mut claims, TimeNotBefore::from(&time_options))?;

    // Subject identifier must be present.
    claims::SUB.extract_required(&mut claims)?;

    Ok(id_token)
}
