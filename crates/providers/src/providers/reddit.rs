// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2023, 2024 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Reddit.
//!
//! Reddit rejects requests with a generic `User-Agent`, the HTTP client must
//! be built with a descriptive one.

use async_trait::async_trait;
use serde::Deserialize;
use social_oauth2_types::requests::AccessTokenResponse;
use social_oidc_client::types::client_credentials::ClientCredentials;
use url::Url;

use crate::{
    CallbackParams, Provider, ProviderError, User,
    oauth2::{OAuth2Provider, OAuth2Session, oauth2_builders, static_scope},
};

const AUTHORIZATION_ENDPOINT: &str = "https://www.reddit.com/api/v1/authorize";
const TOKEN_ENDPOINT: &str = "https://www.reddit.com/api/v1/access_token";
const ME_ENDPOINT: &str = "https://oauth.reddit.com/api/v1/me";

#[derive(Debug, Deserialize)]
struct RedditUser {
    id: String,
    name: String,
    icon_img: Option<String>,
    #[serde(default)]
    subreddit: Option<Subreddit>,
}

#[derive(Debug, Deserialize)]
struct Subreddit {
    title: Option<String>,
    public_description: Option<String>,
}

/// Reddit
#[derive(Debug, Clone)]
pub struct Reddit {
    oauth2: OAuth2Provider,
    me_endpoint: Url,
}

oauth2_builders!(Reddit);

impl Reddit {
    /// Create the provider.
    ///
    /// Tokens are requested with a `permanent` duration, so that they can be
    /// refreshed.
    ///
    /// # Errors
    ///
    /// Returns an error if the Reddit endpoints fail to parse
    pub fn new(
        http_client: reqwest::Client,
        client_id: String,
        client_secret: String,
        redirect_uri: Url,
    ) -> Result<Self, url::ParseError> {
        let oauth2 = OAuth2Provider::new(
            "reddit",
            http_client,
            ClientCredentials::ClientSecretBasic {
                client_id,
                client_secret,
            },
            AUTHORIZATION_ENDPOINT.parse()?,
            TOKEN_ENDPOINT.parse()?,
            redirect_uri,
        )
        .with_scope(static_scope(&["identity"]))
        .with_extra_param("duration", "permanent");

        Ok(Self {
            oauth2,
            me_endpoint: ME_ENDPOINT.parse()?,
        })
    }

    /// Fetch the profile from another endpoint
    #[must_use]
    pub fn with_me_endpoint(mut self, me_endpoint: Url) -> Self {
        self.me_endpoint = me_endpoint;
        self
    }
}

#[async_trait]
impl Provider for Reddit {
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
                    .get(self.me_endpoint.as_str())
                    .bearer_auth(access_token),
            )
            .await?;
        let profile: RedditUser = serde_json::from_value(raw.clone())?;

        let mut user = User::from_session(self.name(), session, access_token).with_raw_data(raw);
        user.user_id = profile.id;
        user.nick_name = Some(profile.name.clone());
        user.name = Some(profile.name);
        // Reddit HTML-escapes the query of the icon URL
        user.avatar_url = profile.icon_img.map(|url| url.replace("&amp;", "&"));

        if let Some(subreddit) = profile.subreddit {
            user.description = subreddit
                .public_description
                .filter(|description| !description.is_empty());
            if let Some(title) = subreddit.title.filter(|title| !title.is_empty()) {
                user.name = Some(title);
            }
        }

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
