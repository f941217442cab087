// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2023, 2024 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Microsoft Entra ID, formerly Azure AD, with the v2 endpoints.
//!
//! The profile comes from Microsoft Graph.

use async_trait::async_trait;
use serde::Deserialize;
use social_oauth2_types::requests::AccessTokenResponse;
use social_oidc_client::types::client_credentials::ClientCredentials;
use url::Url;

use crate::{
    CallbackParams, Provider, ProviderError, User,
    oauth2::{OAuth2Provider, OAuth2Session, oauth2_builders, static_scope},
};

const GRAPH_ME_ENDPOINT: &str = "https://graph.microsoft.com/v1.0/me";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphUser {
    id: String,
    display_name: Option<String>,
    given_name: Option<String>,
    surname: Option<String>,
    mail: Option<String>,
    user_principal_name: Option<String>,
    office_location: Option<String>,
    job_title: Option<String>,
}

/// Microsoft Entra ID
#[derive(Debug, Clone)]
pub struct Azure {
    oauth2: OAuth2Provider,
    graph_endpoint: Url,
}

oauth2_builders!(Azure);

impl Azure {
    /// Create the provider for the given tenant.
    ///
    /// The tenant is one of `common`, `organizations`, `consumers`, or the ID
    /// of a tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoints built from the tenant fail to parse
    pub fn new(
        http_client: reqwest::Client,
        client_id: String,
        client_secret: String,
        tenant: &str,
        redirect_uri: Url,
    ) -> Result<Self, url::ParseError> {
        let base = Url::parse("https://login.microsoftonline.com/")?.join(&format!("{tenant}/"))?;

        let oauth2 = OAuth2Provider::new(
            "azure",
            http_client,
            ClientCredentials::ClientSecretPost {
                client_id,
                client_secret,
            },
            base.join("oauth2/v2.0/authorize")?,
            base.join("oauth2/v2.0/token")?,
            redirect_uri,
        )
        .with_scope(static_scope(&[
            "openid",
            "profile",
            "email",
            "offline_access",
            "User.Read",
        ]));

        Ok(Self {
            oauth2,
            graph_endpoint: GRAPH_ME_ENDPOINT.parse()?,
        })
    }

    /// Fetch the profile from another Graph endpoint
    #[must_use]
    pub fn with_graph_endpoint(mut self, graph_endpoint: Url) -> Self {
        self.graph_endpoint = graph_endpoint;
        self
    }
}

#[async_trait]
impl Provider for Azure {
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
                    .get(self.graph_endpoint.as_str())
                    .bearer_auth(access_token),
            )
            .await?;
        let profile: GraphUser = serde_json::from_value(raw.clone())?;

        let mut user = User::from_session(self.name(), session, access_token).with_raw_data(raw);
        user.user_id = profile.id;
        user.name = profile.display_name;
        user.first_name = profile.given_name;
        user.last_name = profile.surname;
        // Accounts without a mailbox only have their principal name
        user.email = profile.mail.or(profile.user_principal_name);
        user.location = profile.office_location;
        user.description = profile.job_title;

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
