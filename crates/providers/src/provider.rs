// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2022-2024 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::{collections::BTreeMap, fmt::Debug};

use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use social_oauth2_types::requests::AccessTokenResponse;
use url::Url;

use crate::{ProviderError, User};

/// The parameters a provider redirected back with.
///
/// Those come from the query of the redirect URI, or from the form body when
/// the `form_post` response mode is used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallbackParams(BTreeMap<String, String>);

impl CallbackParams {
    /// Parse callback parameters from a URL-encoded query or form body
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect()
    }

    /// Get the value of a parameter
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Iterate over the parameters, sorted by name
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CallbackParams {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// The state of one login attempt, between the redirection to the provider
/// and the callback.
///
/// Sessions are serializable so that callers can store them wherever they
/// want between the two requests.
pub trait Session: Serialize + DeserializeOwned + Debug + Send + Sync {
    /// The URL to send the user to
    fn authorization_url(&self) -> &Url;
}

/// A social login provider
#[async_trait]
pub trait Provider: Debug + Send + Sync {
    /// The session type of this provider
    type Session: Session;

    /// The name this provider is registered under
    fn name(&self) -> &str;

    /// Start a login attempt.
    ///
    /// `state` is sent to the provider and must come back in the callback.
    async fn begin_auth(&self, state: &str) -> Result<Self::Session, ProviderError>;

    /// Complete the login attempt with the parameters of the callback.
    ///
    /// Returns the access token, which is also stored in the session.
    async fn authorize(
        &self,
        session: &mut Self::Session,
        params: &CallbackParams,
    ) -> Result<String, ProviderError>;

    /// Fetch the profile of the user of an authorized session
    async fn fetch_user(&self, session: &Self::Session) -> Result<User, ProviderError>;

    /// Get a new access token
    async fn refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<AccessTokenResponse, ProviderError>;

    /// Whether [`Provider::refresh_token`] is supported
    fn refresh_token_available(&self) -> bool;
}
