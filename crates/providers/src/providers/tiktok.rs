// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2023, 2024 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! TikTok, with the v2 API.
//!
//! TikTok calls the client ID a client key, everywhere, and wants the scope
//! tokens separated by commas.

use async_trait::async_trait;
use serde::Deserialize;
use social_oauth2_types::requests::AccessTokenResponse;
use social_oidc_client::types::client_credentials::ClientCredentials;
use url::Url;

use crate::{
    CallbackParams, Provider, ProviderError, User,
    oauth2::{OAuth2Provider, OAuth2Session, oauth2_builders, static_scope},
};

const AUTHORIZATION_ENDPOINT: &str = "https://www.tiktok.com/v2/auth/authorize/";
const TOKEN_ENDPOINT: &str = "https://open.tiktokapis.com/v2/oauth/token/";
const USER_INFO_ENDPOINT: &str = "https://open.tiktokapis.com/v2/user/info/";
const USER_INFO_FIELDS: &str = "open_id,union_id,avatar_url,display_name,username";

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    #[serde(default)]
    data: Option<UserInfoData>,
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct UserInfoData {
    // Errors come with an empty `data` object
    #[serde(default)]
    user: Option<TikTokUser>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct TikTokUser {
    open_id: String,
    display_name: Option<String>,
    username: Option<String>,
    avatar_url: Option<String>,
}

/// TikTok
#[derive(Debug, Clone)]
pub struct TikTok {
    oauth2: OAuth2Provider,
    user_info_endpoint: Url,
}

oauth2_builders!(TikTok);

impl TikTok {
    /// Create the provider
    ///
    /// # Errors
    ///
    /// Returns an error if the TikTok endpoints fail to parse
    pub fn new(
        http_client: reqwest::Client,
        client_key: String,
        client_secret: String,
        redirect_uri: Url,
    ) -> Result<Self, url::ParseError> {
        let oauth2 = OAuth2Provider::new(
            "tiktok",
            http_client,
            ClientCredentials::ClientKeyPost {
                client_key,
                client_secret,
            },
            AUTHORIZATION_ENDPOINT.parse()?,
            TOKEN_ENDPOINT.parse()?,
            redirect_uri,
        )
        .with_scope(static_scope(&["user.info.basic"]))
        .with_scope_separator(",")
        .with_client_id_param("client_key");

        Ok(Self {
            oauth2,
            user_info_endpoint: USER_INFO_ENDPOINT.parse()?,
        })
    }

    /// Fetch the profile from another endpoint
    #[must_use]
    pub fn with_user_info_endpoint(mut self, user_info_endpoint: Url) -> Self {
        self.user_info_endpoint = user_info_endpoint;
        self
    }
}

#[async_trait]
impl Provider for TikTok {
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

        let raw = self
            .oauth2
            .get_json(
                self.oauth2
                    .http_client()
                    .get(self.user_info_endpoint.as_str())
                    .bearer_auth(access_token)
                    .query(&[("fields", USER_INFO_FIELDS)]),
            )
            .await?;
        let response: UserInfoResponse = serde_json::from_value(raw.clone())?;

        if response.error.code != "ok" {
            tracing::warn!(code = %response.error.code, "TikTok API call failed");
            return Err(ProviderError::Api {
                provider: self.name().to_owned(),
                error: format!("{}: {}", response.error.code, response.error.message),
            });
        }

        let profile = response
            .data
            .and_then(|data| data.user)
            .ok_or_else(|| ProviderError::invalid_response(self.name(), "missing user data"))?;

        let raw_user = raw
            .pointer("/data/user")
            .cloned()
            .unwrap_or_default();

        let mut user = User::from_session(self.name(), session, access_token).with_raw_data(raw_user);
        user.user_id = profile.open_id;
        user.name = profile.display_name;
        user.nick_name = profile.username;
        user.avatar_url = profile.avatar_url;

        Ok(user)
    }

    async fn refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<AccessTokenResponse, ProviderError> {
        self.oauth2.refresh(refresh_token, None).await
    }

    fn refresh_token_available(&self) -> bool {
        true
    }
}
