// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2023, 2024 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! LinkedIn, with its OpenID Connect userinfo endpoint

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use social_oauth2_types::requests::AccessTokenResponse;
use social_oidc_client::{
    requests::userinfo::fetch_userinfo, types::client_credentials::ClientCredentials,
};
use url::Url;

use crate::{
    CallbackParams, Provider, ProviderError, User,
    oauth2::{OAuth2Provider, OAuth2Session, oauth2_builders, static_scope},
};

const AUTHORIZATION_ENDPOINT: &str = "https://www.linkedin.com/oauth/v2/authorization";
const TOKEN_ENDPOINT: &str = "https://www.linkedin.com/oauth/v2/accessToken";
const USERINFO_ENDPOINT: &str = "https://api.linkedin.com/v2/userinfo";

#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
    name: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
    email: Option<String>,
    picture: Option<String>,
}

/// LinkedIn
#[derive(Debug, Clone)]
pub struct LinkedIn {
    oauth2: OAuth2Provider,
    userinfo_endpoint: Url,
}

oauth2_builders!(LinkedIn);

impl LinkedIn {
    /// Create the provider
    ///
    /// # Errors
    ///
    /// Returns an error if the LinkedIn endpoints fail to parse
    pub fn new(
        http_client: reqwest::Client,
        client_id: String,
        client_secret: String,
        redirect_uri: Url,
    ) -> Result<Self, url::ParseError> {
        let oauth2 = OAuth2Provider::new(
            "linkedin",
            http_client,
            ClientCredentials::ClientSecretPost {
                client_id,
                client_secret,
            },
            AUTHORIZATION_ENDPOINT.parse()?,
            TOKEN_ENDPOINT.parse()?,
            redirect_uri,
        )
        .with_scope(static_scope(&["openid", "profile", "email"]));

        Ok(Self {
            oauth2,
            userinfo_endpoint: USERINFO_ENDPOINT.parse()?,
        })
    }

    /// Fetch the profile from another userinfo endpoint
    #[must_use]
    pub fn with_userinfo_endpoint(mut self, userinfo_endpoint: Url) -> Self {
        self.userinfo_endpoint = userinfo_endpoint;
        self
    }
}

#[async_trait]
impl Provider for LinkedIn {
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

        let claims = fetch_userinfo(
            self.oauth2.http_client(),
            &self.userinfo_endpoint,
            access_token,
            None,
        )
        .await?;
        let raw = Value::Object(claims.into_iter().collect());
        let profile: UserInfo = serde_json::from_value(raw.clone())?;

        let mut user = User::from_session(self.name(), session, access_token).with_raw_data(raw);
        user.user_id = profile.sub;
        user.name = profile.name;
        user.first_name = profile.given_name;
        user.last_name = profile.family_name;
        user.email = profile.email;
        user.avatar_url = profile.picture;

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
