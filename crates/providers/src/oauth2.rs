// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2022-2024 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! The authorization code flow shared by all providers

use std::{collections::HashMap, fmt, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use http::header::ACCEPT;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use social_http::RequestBuilderExt;
use social_oauth2_types::{
    pkce::PkceCodeChallengeMethod,
    requests::{AccessTokenResponse, ResponseMode},
    scope::Scope,
};
use social_oidc_client::{
    requests::{
        authorization_code::{
            AuthorizationRequestData, AuthorizationValidationData,
            access_token_with_authorization_code, build_authorization_url,
        },
        jose::JwtVerificationData,
        refresh_token::refresh_access_token,
    },
    types::{IdToken, client_credentials::ClientCredentials},
};
use url::Url;

use crate::{CallbackParams, Clock, ProviderError, Session, SystemClock};

/// The session of the authorization code flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuth2Session {
    /// The URL the user is sent to
    pub auth_url: Url,

    /// What is needed to check the callback and exchange the code
    pub validation_data: AuthorizationValidationData,

    /// The access token, once authorized
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// The refresh token, if the provider issued one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// When the access token expires
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// The raw ID token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,

    /// The non-standard members of the token response
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra: HashMap<String, Value>,
}

impl OAuth2Session {
    /// The access token of this session.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::MissingAccessToken`] if the session was not
    /// authorized yet
    pub fn access_token(&self, provider: &str) -> Result<&str, ProviderError> {
        self.access_token
            .as_deref()
            .ok_or_else(|| ProviderError::MissingAccessToken {
                provider: provider.to_owned(),
            })
    }

    fn store(&mut self, response: AccessTokenResponse, now: DateTime<Utc>) {
        self.expires_at = response
            .expires_in
            .filter(|seconds| *seconds > 0)
            .map(|seconds| now + Duration::seconds(seconds));
        self.access_token = Some(response.access_token);
        self.refresh_token = response.refresh_token;
        self.id_token = response.id_token;
        self.extra = response.extra;
    }
}

impl Session for OAuth2Session {
    fn authorization_url(&self) -> &Url {
        &self.auth_url
    }
}

/// An OAuth 2.0 client doing the authorization code flow against one
/// provider.
///
/// Concrete providers wrap one and add their quirks on top.
#[derive(Clone)]
pub struct OAuth2Provider {
    name: String,
    http_client: reqwest::Client,
    clock: Arc<dyn Clock>,
    credentials: ClientCredentials,
    authorization_endpoint: Url,
    token_endpoint: Url,
    redirect_uri: Url,
    scope: Scope,
    scope_separator: String,
    client_id_param: String,
    response_mode: Option<ResponseMode>,
    extra_params: Vec<(String, String)>,
    pkce: bool,
}

impl fmt::Debug for OAuth2Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Provider")
            .field("name", &self.name)
            .field("credentials", &self.credentials)
            .field("authorization_endpoint", &self.authorization_endpoint.as_str())
            .field("token_endpoint", &self.token_endpoint.as_str())
            .field("redirect_uri", &self.redirect_uri.as_str())
            .field("scope", &self.scope)
            .field("pkce", &self.pkce)
            .finish_non_exhaustive()
    }
}

impl OAuth2Provider {
    /// Create a new client with the given endpoints
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        http_client: reqwest::Client,
        credentials: ClientCredentials,
        authorization_endpoint: Url,
        token_endpoint: Url,
        redirect_uri: Url,
    ) -> Self {
        Self {
            name: name.into(),
            http_client,
            clock: Arc::new(SystemClock::default()),
            credentials,
            authorization_endpoint,
            token_endpoint,
            redirect_uri,
            scope: Scope::default(),
            scope_separator: " ".to_owned(),
            client_id_param: "client_id".to_owned(),
            response_mode: None,
            extra_params: Vec::new(),
            pkce: false,
        }
    }

    /// Register the provider under another name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Use other authorization and token endpoints
    #[must_use]
    pub fn with_endpoints(mut self, authorization_endpoint: Url, token_endpoint: Url) -> Self {
        self.authorization_endpoint = authorization_endpoint;
        self.token_endpoint = token_endpoint;
        self
    }

    /// Set the scope to request
    #[must_use]
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Set the separator of the scope tokens in the authorization URL
    #[must_use]
    pub fn with_scope_separator(mut self, separator: impl Into<String>) -> Self {
        self.scope_separator = separator.into();
        self
    }

    /// Set the name of the authorization parameter carrying the client ID
    #[must_use]
    pub fn with_client_id_param(mut self, param: impl Into<String>) -> Self {
        self.client_id_param = param.into();
        self
    }

    /// Set the response mode to request
    #[must_use]
    pub fn with_response_mode(mut self, response_mode: ResponseMode) -> Self {
        self.response_mode = Some(response_mode);
        self
    }

    /// Add a parameter to the authorization URL
    #[must_use]
    pub fn with_extra_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_params.push((name.into(), value.into()));
        self
    }

    /// Use PKCE with the `S256` method
    #[must_use]
    pub fn with_pkce(mut self, pkce: bool) -> Self {
        self.pkce = pkce;
        self
    }

    /// Use another clock than the system one
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The name of the provider
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The HTTP client used for all requests
    #[must_use]
    pub fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }

    /// The client ID
    #[must_use]
    pub fn client_id(&self) -> &str {
        self.credentials.client_id()
    }

    /// The requested scope
    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// The current time, according to the clock of this client
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// The authorization request of a new login attempt, with the given
    /// `state`
    #[must_use]
    pub fn authorization_request(&self, state: &str) -> AuthorizationRequestData {
        let mut data = AuthorizationRequestData::new(
            self.credentials.client_id().to_owned(),
            self.scope.clone(),
            self.redirect_uri.clone(),
        )
        .with_scope_separator(self.scope_separator.as_str())
        .with_client_id_param(self.client_id_param.as_str())
        .with_state(state.to_owned());

        if let Some(response_mode) = &self.response_mode {
            data = data.with_response_mode(response_mode.clone());
        }

        if self.pkce {
            data = data.with_code_challenge_methods_supported(vec![PkceCodeChallengeMethod::S256]);
        }

        for (name, value) in &self.extra_params {
            data = data.with_extra_param(name.as_str(), value.as_str());
        }

        data
    }

    /// Build the authorization URL, with the given `state`.
    ///
    /// # Errors
    ///
    /// Returns an error if the PKCE challenge could not be computed
    pub fn begin_auth(&self, state: &str) -> Result<OAuth2Session, ProviderError> {
        self.begin_auth_with(self.authorization_request(state))
    }

    /// Build the authorization URL of a customized request.
    ///
    /// # Errors
    ///
    /// Returns an error if the PKCE challenge could not be computed
    pub fn begin_auth_with(
        &self,
        data: AuthorizationRequestData,
    ) -> Result<OAuth2Session, ProviderError> {
        let (auth_url, validation_data) = build_authorization_url(
            self.authorization_endpoint.clone(),
            data,
            &mut rand::thread_rng(),
        )?;

        tracing::debug!(provider = %self.name, "Built authorization URL");

        Ok(OAuth2Session {
            auth_url,
            validation_data,
            access_token: None,
            refresh_token: None,
            expires_at: None,
            id_token: None,
            extra: HashMap::new(),
        })
    }

    /// Check the callback parameters against the session, and get the
    /// authorization code out of them.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider redirected with an error, if the
    /// state does not match, or if there is no code
    pub fn check_callback<'p>(
        &self,
        session: &OAuth2Session,
        params: &'p CallbackParams,
    ) -> Result<&'p str, ProviderError> {
        if let Some(error) = params.get("error") {
            tracing::warn!(provider = %self.name, error, "Provider redirected with an error");
            return Err(ProviderError::Callback {
                error: error.to_owned(),
                error_description: params.get("error_description").map(ToOwned::to_owned),
            });
        }

        if params.get("state") != Some(session.validation_data.state.as_str()) {
            return Err(ProviderError::StateMismatch);
        }

        params.get("code").ok_or(ProviderError::MissingCode)
    }

    /// Exchange the authorization code, and store the tokens in the session.
    ///
    /// If `id_token_verification_data` is given, the ID token is required and
    /// verified, and returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the token request or the ID token verification
    /// fails
    #[tracing::instrument(skip_all, fields(provider = %self.name))]
    pub async fn exchange_code(
        &self,
        session: &mut OAuth2Session,
        code: &str,
        id_token_verification_data: Option<JwtVerificationData<'_>>,
    ) -> Result<Option<IdToken<'static>>, ProviderError> {
        let now = self.now();

        let (response, id_token) = access_token_with_authorization_code(
            &self.http_client,
            &self.credentials,
            &self.token_endpoint,
            code.to_owned(),
            session.validation_data.clone(),
            id_token_verification_data,
            now,
        )
        .await?;

        session.store(response, now);

        Ok(id_token)
    }

    /// Check the callback and exchange the code, without any ID token.
    ///
    /// # Errors
    ///
    /// See [`OAuth2Provider::check_callback`] and
    /// [`OAuth2Provider::exchange_code`]
    pub async fn authorize(
        &self,
        session: &mut OAuth2Session,
        params: &CallbackParams,
    ) -> Result<String, ProviderError> {
        let code = self.check_callback(session, params)?;
        self.exchange_code(session, code, None).await?;
        session.access_token(&self.name).map(ToOwned::to_owned)
    }

    /// Get a new access token with a refresh token.
    ///
    /// If `id_token_verification_data` is given, an ID token sent along with
    /// the new access token is verified.
    ///
    /// # Errors
    ///
    /// Returns an error if the token request or the ID token verification
    /// fails
    #[tracing::instrument(skip_all, fields(provider = %self.name))]
    pub async fn refresh(
        &self,
        refresh_token: &str,
        id_token_verification_data: Option<JwtVerificationData<'_>>,
    ) -> Result<AccessTokenResponse, ProviderError> {
        let (response, _) = refresh_access_token(
            &self.http_client,
            &self.credentials,
            &self.token_endpoint,
            refresh_token.to_owned(),
            None,
            id_token_verification_data,
            self.now(),
        )
        .await?;

        Ok(response)
    }

    /// Send an API request and decode its JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, if the status is not a success,
    /// or if the body is not JSON
    pub async fn get_json(&self, request: reqwest::RequestBuilder) -> Result<Value, ProviderError> {
        let response = request
            .header(ACCEPT, "application/json")
            .send_traced()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(provider = %self.name, %status, "API request failed");
            return Err(ProviderError::Status {
                provider: self.name.clone(),
                status,
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Implement the builders shared by every provider, forwarding them to its
/// `oauth2` field.
macro_rules! oauth2_builders {
    ($provider:ty) => {
        impl $provider {
            /// Register the provider under another name
            #[must_use]
            pub fn with_name(mut self, name: impl Into<String>) -> Self {
                self.oauth2 = self.oauth2.with_name(name);
                self
            }

            /// Request this scope instead of the default one
            #[must_use]
            pub fn with_scope(mut self, scope: ::social_oauth2_types::scope::Scope) -> Self {
                self.oauth2 = self.oauth2.with_scope(scope);
                self
            }

            /// Use other authorization and token endpoints
            #[must_use]
            pub fn with_endpoints(
                mut self,
                authorization_endpoint: ::url::Url,
                token_endpoint: ::url::Url,
            ) -> Self {
                self.oauth2 = self
                    .oauth2
                    .with_endpoints(authorization_endpoint, token_endpoint);
                self
            }

            /// Use another clock than the system one
            #[must_use]
            pub fn with_clock(mut self, clock: ::std::sync::Arc<dyn $crate::Clock>) -> Self {
                self.oauth2 = self.oauth2.with_clock(clock);
                self
            }
        }
    };
}

pub(crate) use oauth2_builders;

/// Build a scope out of known-valid tokens
pub(crate) fn static_scope(tokens: &[&'static str]) -> Scope {
    tokens
        .iter()
        .map(|&token| social_oauth2_types::scope::ScopeToken::from_static(token))
        .collect()
}
