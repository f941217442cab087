// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2022-2024 Kévin Commaille.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Requests for the [Authorization Code flow].
//!
//! [Authorization Code flow]: https://openid.net/specs/openid-connect-core-1_0.html#CodeFlowAuth

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Utc};
use rand::{
    Rng,
    distributions::{Alphanumeric, DistString},
};
use serde::{Deserialize, Serialize};
use social_jose::claims::{self, TokenHash};
use social_oauth2_types::{
    pkce::PkceCodeChallengeMethod,
    prelude::CodeChallengeMethodExt,
    requests::{
        AccessTokenRequest, AccessTokenResponse, AuthorizationCodeGrant, Prompt, ResponseMode,
    },
    scope::{OPENID, Scope},
};
use url::Url;

use super::jose::JwtVerificationData;
use crate::{
    error::{AuthorizationError, IdTokenError, TokenAuthorizationCodeError},
    requests::{jose::verify_id_token, token::request_access_token},
    types::{IdToken, client_credentials::ClientCredentials},
};

/// The data necessary to build an authorization request.
#[derive(Debug, Clone)]
pub struct AuthorizationRequestData {
    /// The ID obtained when registering the client.
    pub client_id: String,

    /// The scope to authorize.
    ///
    /// If it contains the OpenID Connect scope token (`openid`), a nonce is
    /// generated.
    pub scope: Scope,

    /// The URI to redirect the end-user to after the authorization.
    ///
    /// It must be one of the redirect URIs provided during registration.
    pub redirect_uri: Url,

    /// The separator used to join the scope tokens.
    ///
    /// Defaults to a space, some providers want a comma.
    pub scope_separator: String,

    /// The name of the query parameter carrying the client ID.
    ///
    /// Defaults to `client_id`.
    pub client_id_param: String,

    /// The state to send, if the caller wants to choose it.
    ///
    /// A random one is generated otherwise.
    pub state: Option<String>,

    /// The PKCE methods supported by the issuer.
    ///
    /// If it doesn't contain [`PkceCodeChallengeMethod::S256`], PKCE won't be
    /// used.
    pub code_challenge_methods_supported: Option<Vec<PkceCodeChallengeMethod>>,

    /// Whether the Authorization Server should prompt the End-User for
    /// reauthentication and consent.
    ///
    /// If [`Prompt::None`] is used, it must be the only value.
    pub prompt: Option<Vec<Prompt>>,

    /// Hint to the Authorization Server about the login identifier the End-User
    /// might use to log in.
    pub login_hint: Option<String>,

    /// Requested response mode.
    pub response_mode: Option<ResponseMode>,

    /// Provider-specific parameters, appended as is.
    pub extra_params: Vec<(String, String)>,
}

impl AuthorizationRequestData {
    /// Constructs a new `AuthorizationRequestData` with all the required
    /// fields.
    #[must_use]
    pub fn new(client_id: String, scope: Scope, redirect_uri: Url) -> Self {
        Self {
            client_id,
            scope,
            redirect_uri,
            scope_separator: " ".to_owned(),
            client_id_param: "client_id".to_owned(),
            state: None,
            code_challenge_methods_supported: None,
            prompt: None,
            login_hint: None,
            response_mode: None,
            extra_params: Vec::new(),
        }
    }

    /// Set the `scope_separator` field of this `AuthorizationRequestData`.
    #[must_use]
    pub fn with_scope_separator(mut self, scope_separator: impl Into<String>) -> Self {
        self.scope_separator = scope_separator.into();
        self
    }

    /// Set the `client_id_param` field of this `AuthorizationRequestData`.
    #[must_use]
    pub fn with_client_id_param(mut self, client_id_param: impl Into<String>) -> Self {
        self.client_id_param = client_id_param.into();
        self
    }

    /// Set the `state` field of this `AuthorizationRequestData`.
    #[must_use]
    pub fn with_state(mut self, state: String) -> Self {
        self.state = Some(state);
        self
    }

    /// Set the `code_challenge_methods_supported` field of this
    /// `AuthorizationRequestData`.
    #[must_use]
    pub fn with_code_challenge_methods_supported(
        mut self,
        code_challenge_methods_supported: Vec<PkceCodeChallengeMethod>,
    ) -> Self {
        self.code_challenge_methods_supported = Some(code_challenge_methods_supported);
        self
    }

    /// Set the `prompt` field of this `AuthorizationRequestData`.
    #[must_use]
    pub fn with_prompt(mut self, prompt: Vec<Prompt>) -> Self {
        self.prompt = Some(prompt);
        self
    }

    /// Set the `login_hint` field of this `AuthorizationRequestData`.
    #[must_use]
    pub fn with_login_hint(mut self, login_hint: String) -> Self {
        self.login_hint = Some(login_hint);
        self
    }

    /// Set the `response_mode` field of this `AuthorizationRequestData`.
    #[must_use]
    pub fn with_response_mode(mut self, response_mode: ResponseMode) -> Self {
        self.response_mode = Some(response_mode);
        self
    }

    /// Add a provider-specific parameter to this `AuthorizationRequestData`.
    #[must_use]
    pub fn with_extra_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_params.push((name.into(), value.into()));
        self
    }
}

/// The data necessary to validate a response from the Token endpoint in the
/// Authorization Code flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationValidationData {
    /// A unique identifier for the request.
    pub state: String,

    /// A string to mitigate replay attacks.
    /// Used when the `openid` scope is set (and therefore we are using OpenID
    /// Connect).
    pub nonce: Option<String>,

    /// The URI where the end-user will be redirected after authorization.
    pub redirect_uri: Url,

    /// A string to correlate the authorization request to the token request.
    pub code_challenge_verifier: Option<String>,
}

/// Build the URL for authenticating at the Authorization endpoint.
///
/// # Arguments
///
/// * `authorization_endpoint` - The URL of the issuer's authorization endpoint.
///
/// * `authorization_data` - The data necessary to build the authorization
///   request.
///
/// * `rng` - A random number generator.
///
/// # Returns
///
/// A URL to be opened in a web browser where the end-user will be able to
/// authorize the given scope, and the [`AuthorizationValidationData`] to
/// validate this request.
///
/// The redirect URI will receive parameters in its query:
///
/// * A successful response will receive a `code` and a `state`.
///
/// * If the authorization fails, it should receive an `error` parameter with a
///   [`ClientErrorCode`] and optionally an `error_description`.
///
/// # Errors
///
/// Returns an error if preparing the URL fails.
///
/// [`ClientErrorCode`]: social_oauth2_types::errors::ClientErrorCode
pub fn build_authorization_url(
    authorization_endpoint: Url,
    authorization_data: AuthorizationRequestData,
    rng: &mut impl Rng,
) -> Result<(Url, AuthorizationValidationData), AuthorizationError> {
    tracing::debug!(
        scope = %authorization_data.scope,
        "Authorizing..."
    );

    let AuthorizationRequestData {
        client_id,
        scope,
        redirect_uri,
        scope_separator,
        client_id_param,
        state,
        code_challenge_methods_supported,
        prompt,
        login_hint,
        response_mode,
        extra_params,
    } = authorization_data;

    let is_openid = scope.contains(OPENID.as_str());

    // Generate a random CSRF "state" token, unless we were given one.
    let state = state.unwrap_or_else(|| Alphanumeric.sample_string(rng, 16));

    // Generate a random nonce if we're in 'OpenID Connect' mode
    let nonce = is_openid.then(|| Alphanumeric.sample_string(rng, 16));

    // Use PKCE, whenever possible.
    let (pkce, code_challenge_verifier) = if code_challenge_methods_supported
        .iter()
        .any(|methods| methods.contains(&PkceCodeChallengeMethod::S256))
    {
        let mut verifier = [0u8; 32];
        rng.fill(&mut verifier);

        let method = PkceCodeChallengeMethod::S256;
        let verifier = Base64UrlUnpadded::encode_string(&verifier);
        let code_challenge = method.compute_challenge(&verifier)?.into_owned();

        (Some(code_challenge), Some(verifier))
    } else {
        (None, None)
    };

    let mut authorization_url = authorization_endpoint;

    {
        // Our parameters are appended to the query, as the URL might already have
        // one.
        let mut query = authorization_url.query_pairs_mut();

        query
            .append_pair("response_type", "code")
            .append_pair(&client_id_param, &client_id)
            .append_pair("redirect_uri", redirect_uri.as_str());

        if !scope.is_empty() {
            query.append_pair("scope", &scope.join(&scope_separator));
        }

        query.append_pair("state", &state);

        if let Some(response_mode) = &response_mode {
            query.append_pair("response_mode", &response_mode.to_string());
        }

        if let Some(nonce) = &nonce {
            query.append_pair("nonce", nonce);
        }

        if let Some(prompt) = &prompt {
            let prompt = prompt
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" ");
            query.append_pair("prompt", &prompt);
        }

        if let Some(login_hint) = &login_hint {
            query.append_pair("login_hint", login_hint);
        }

        if let Some(code_challenge) = &pkce {
            query
                .append_pair("code_challenge", code_challenge)
                .append_pair("code_challenge_method", "S256");
        }

        for (name, value) in &extra_params {
            query.append_pair(name, value);
        }
    }

    let validation_data = AuthorizationValidationData {
        state,
        nonce,
        redirect_uri,
        code_challenge_verifier,
    };

    Ok((authorization_url, validation_data))
}

/// Exchange an authorization code for an access token.
///
/// This should be used as the first step for logging in, and to request a
/// token with a new scope.
///
/// # Arguments
///
/// * `http_client` - The reqwest client to use for making HTTP requests.
///
/// * `client_credentials` - The credentials obtained when registering the
///   client.
///
/// * `token_endpoint` - The URL of the issuer's Token endpoint.
///
/// * `code` - The authorization code returned at the Authorization endpoint.
///
/// * `validation_data` - The validation data that was returned when building
///   the Authorization URL, for the state returned at the Authorization
///   endpoint.
///
/// * `id_token_verification_data` - The data required to verify the ID Token in
///   the response.
///
///   If it is not provided, the ID Token won't be verified. Note that in the
///   OpenID Connect specification, this verification is required.
///
/// * `now` - The current time.
///
/// # Errors
///
/// Returns an error if the request fails, the response is invalid or the
/// verification of the ID Token fails.
#[allow(clippy::too_many_arguments)]
#[tracing::instrument(skip_all, fields(token_endpoint))]
pub async fn access_token_with_authorization_code(
    http_client: &reqwest::Client,
    client_credentials: &ClientCredentials,
    token_endpoint: &Url,
    code: String,
    validation_data: AuthorizationValidationData,
    id_token_verification_data: Option<JwtVerificationData<'_>>,
    now: DateTime<Utc>,
) -> Result<(AccessTokenResponse, Option<IdToken<'static>>), TokenAuthorizationCodeError> {
    tracing::debug!("Exchanging authorization code for access token...");

    let token_response = request_access_token(
        http_client,
        client_credentials,
        token_endpoint,
        AccessTokenRequest::AuthorizationCode(AuthorizationCodeGrant {
            code: code.clone(),
            redirect_uri: Some(validation_data.redirect_uri),
            code_verifier: validation_data.code_challenge_verifier,
        }),
        now,
    )
    .await?;

    let id_token = if let Some(verification_data) = id_token_verification_data {
        let id_token = token_response
            .id_token
            .as_deref()
            .ok_or(IdTokenError::MissingIdToken)?;

        let id_token = verify_id_token(id_token, verification_data, now)?;

        let signing_alg = id_token.header().alg();
        let mut claims = id_token.payload().clone();

        // Access token hash must match.
        claims::AT_HASH
            .extract_optional_with_options(
                &mut claims,
                TokenHash::new(signing_alg, &token_response.access_token),
            )
            .map_err(IdTokenError::from)?;

        // Code hash must match.
        claims::C_HASH
            .extract_optional_with_options(&mut claims, TokenHash::new(signing_alg, &code))
            .map_err(IdTokenError::from)?;

        // Nonce must match if we have one.
        if let Some(nonce) = validation_data.nonce.as_deref() {
            claims::NONCE
                .extract_required_with_options(&mut claims, nonce)
                .map_err(IdTokenError::from)?;
        }

        Some(id_token.into_owned())
    } else {
        None
    };

    Ok((token_response, id_token))
}
