// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2023, 2024 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Slack.
//!
//! The Web API always answers with a `200 OK`, errors are reported in the
//! `{"ok": false, "error": "..."}` envelope.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use social_oauth2_types::requests::AccessTokenResponse;
use social_oidc_client::types::client_credentials::ClientCredentials;
use url::Url;

use crate::{
    CallbackParams, Provider, ProviderError, User,
    oauth2::{OAuth2Provider, OAuth2Session, oauth2_builders, static_scope},
};

const AUTHORIZATION_ENDPOINT: &str = "https://slack.com/oauth/authorize";
const TOKEN_ENDPOINT: &str = "https://slack.com/api/oauth.access";
const API_BASE: &str = "https://slack.com/api/";

#[derive(Debug, Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthTest {
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct UsersInfo {
    user: SlackUser,
}

#[derive(Debug, Deserialize)]
struct SlackUser {
    id: String,
    name: Option<String>,
    real_name: Option<String>,
    tz: Option<String>,
    #[serde(default)]
    profile: SlackProfile,
}

#[derive(Debug, Default, Deserialize)]
struct SlackProfile {
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    real_name: Option<String>,
    title: Option<String>,
    image_192: Option<String>,
}

/// Slack
#[derive(Debug, Clone)]
pub struct Slack {
    oauth2: OAuth2Provider,
    api_base: Url,
}

oauth2_builders!(Slack);

impl Slack {
    /// Create the provider
    ///
    /// # Errors
    ///
    /// Returns an error if the Slack endpoints fail to parse
    pub fn new(
        http_client: reqwest::Client,
        client_id: String,
        client_secret: String,
        redirect_uri: Url,
    ) -> Result<Self, url::ParseError> {
        let oauth2 = OAuth2Provider::new(
            "slack",
            http_client,
            ClientCredentials::ClientSecretPost {
                client_id,
                client_secret,
            },
            AUTHORIZATION_ENDPOINT.parse()?,
            TOKEN_ENDPOINT.parse()?,
            redirect_uri,
        )
        .with_scope(static_scope(&["users:read"]));

        Ok(Self {
            oauth2,
            api_base: API_BASE.parse()?,
        })
    }

    /// Call the Web API at another base URL.
    ///
    /// The URL must end with a slash.
    #[must_use]
    pub fn with_api_base(mut self, api_base: Url) -> Self {
        self.api_base = api_base;
        self
    }

    /// Call a Web API method, and unwrap its envelope
    async fn call(
        &self,
        method: &str,
        access_token: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, ProviderError> {
        let url = self
            .api_base
            .join(method)
            .map_err(|e| ProviderError::invalid_response(self.name(), e.to_string()))?;

        let raw = self
            .oauth2
            .get_json(
                self.oauth2
                    .http_client()
                    .get(url)
                    .bearer_auth(access_token)
                    .query(query),
            )
            .await?;

        let envelope: Envelope = serde_json::from_value(raw.clone())?;
        if !envelope.ok {
            let error = envelope.error.unwrap_or_else(|| "unknown_error".to_owned());
            tracing::warn!(method, %error, "Slack API call failed");
            return Err(ProviderError::Api {
                provider: self.name().to_owned(),
                error,
            });
        }

        Ok(raw)
    }
}

#[async_trait]
impl Provider for Slack {
    type Session = OAuth2Session;

    fn name(&self) -> &str {
        self.oauth2.name()
    }

    async fn begin_auth(&self, state: &str) -> Result<OAuth2Session, ProviderError> {
        self.oauth2.begin_auth(state)
    }

    async fn authorize(
        &self,
        session: &mut OAuth2Session,
        params: &CallbackParams,
    ) -> Result<String, ProviderError> {
        self.oauth2.authorize(session, params).await
    }

    #[tracing::instrument(skip_all, fields(provider = self.name()))]
    async fn fetch_user(&self, session: &OAuth2Session) -> Result<User, ProviderError> {
        let access_token = session.access_token(self.name())?;

        let auth_test = self.call("auth.test", access_token, &[]).await?;
        let AuthTest { user_id } = serde_json::from_value(auth_test.clone())?;

        let users_info = self
            .call("users.info", access_token, &[("user", user_id.as_str())])
            .await?;
        let UsersInfo { user: profile } = serde_json::from_value(users_info.clone())?;

        let mut user = User::from_session(self.name(), session, access_token)
            .with_raw_data(auth_test)
            .with_raw_data(users_info.get("user").cloned().unwrap_or_default());
        user.user_id = profile.id;
        user.nick_name = profile.name;
        user.name = profile.real_name.or(profile.profile.real_name);
        user.first_name = profile.profile.first_name;
        user.last_name = profile.profile.last_name;
        user.email = profile.profile.email;
        user.avatar_url = profile.profile.image_192;
        user.description = profile.profile.title;
        user.location = profile.tz;

        Ok(user)
    }

    async fn refresh_token(
        &self,
        _refresh_token: &str,
    ) -> Result<AccessTokenResponse, ProviderError> {
        Err(ProviderError::RefreshUnsupported {
            provider: self.name().to_owned(),
        })
    }

    fn refresh_token_available(&self) -> bool {
        false
    }
}
