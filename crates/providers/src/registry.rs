// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2022-2024 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::{collections::BTreeMap, fmt, sync::Arc};

use async_trait::async_trait;
use social_oauth2_types::requests::AccessTokenResponse;
use url::Url;

use crate::{CallbackParams, Provider, ProviderError, Session, User};

#[async_trait]
trait ErasedProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn begin_auth(&self, state: &str) -> Result<(Url, String), ProviderError>;

    fn unmarshal_session(&self, session: &str) -> Result<Url, ProviderError>;

    async fn complete_auth(
        &self,
        session: &str,
        params: &CallbackParams,
    ) -> Result<(User, String), ProviderError>;

    async fn refresh_token(&self, refresh_token: &str)
    -> Result<AccessTokenResponse, ProviderError>;

    fn refresh_token_available(&self) -> bool;

    fn debug(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

#[async_trait]
impl<P: Provider> ErasedProvider for P {
    fn name(&self) -> &str {
        Provider::name(self)
    }

    async fn begin_auth(&self, state: &str) -> Result<(Url, String), ProviderError> {
        let session = Provider::begin_auth(self, state).await?;
        let url = session.authorization_url().clone();
        let session = serde_json::to_string(&session).map_err(ProviderError::Session)?;
        Ok((url, session))
    }

    fn unmarshal_session(&self, session: &str) -> Result<Url, ProviderError> {
        let session: P::Session = serde_json::from_str(session).map_err(ProviderError::Session)?;
        Ok(session.authorization_url().clone())
    }

    async fn complete_auth(
        &self,
        session: &str,
        params: &CallbackParams,
    ) -> Result<(User, String), ProviderError> {
        let mut session: P::Session =
            serde_json::from_str(session).map_err(ProviderError::Session)?;

        self.authorize(&mut session, params).await?;
        let user = self.fetch_user(&session).await?;

        let session = serde_json::to_string(&session).map_err(ProviderError::Session)?;
        Ok((user, session))
    }

    async fn refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<AccessTokenResponse, ProviderError> {
        Provider::refresh_token(self, refresh_token).await
    }

    fn refresh_token_available(&self) -> bool {
        Provider::refresh_token_available(self)
    }

    fn debug(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A provider of any type, working on sessions marshaled as JSON strings
#[derive(Clone)]
pub struct DynProvider {
    inner: Arc<dyn ErasedProvider>,
}

impl fmt::Debug for DynProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.debug(f)
    }
}

impl DynProvider {
    /// Wrap a provider
    #[must_use]
    pub fn new<P: Provider + 'static>(provider: P) -> Self {
        Self {
            inner: Arc::new(provider),
        }
    }

    /// The name this provider is registered under
    #[must_use]
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Start a login attempt.
    ///
    /// Returns the URL to send the user to, and the marshaled session to keep
    /// until the callback.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails to start the login attempt
    pub async fn begin_auth(&self, state: &str) -> Result<(Url, String), ProviderError> {
        self.inner.begin_auth(state).await
    }

    /// Check that a marshaled session belongs to this provider, and get its
    /// authorization URL back.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Session`] if the session can't be decoded
    pub fn unmarshal_session(&self, session: &str) -> Result<Url, ProviderError> {
        self.inner.unmarshal_session(session)
    }

    /// Complete a login attempt: authorize the session with the callback
    /// parameters, then fetch the user.
    ///
    /// Returns the user and the updated marshaled session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is invalid, or if the authorization or
    /// the profile request fails
    #[tracing::instrument(skip_all, fields(provider = self.name()))]
    pub async fn complete_auth(
        &self,
        session: &str,
        params: &CallbackParams,
    ) -> Result<(User, String), ProviderError> {
        self.inner.complete_auth(session, params).await
    }

    /// Get a new access token
    ///
    /// # Errors
    ///
    /// Returns an error if the provider can't refresh tokens, or if the
    /// request fails
    pub async fn refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<AccessTokenResponse, ProviderError> {
        self.inner.refresh_token(refresh_token).await
    }

    /// Whether this provider can refresh tokens
    #[must_use]
    pub fn refresh_token_available(&self) -> bool {
        self.inner.refresh_token_available()
    }
}

/// A set of providers, by name
#[derive(Debug, Clone, Default)]
pub struct Providers {
    providers: BTreeMap<String, DynProvider>,
}

impl Providers {
    /// An empty set of providers
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider.
    ///
    /// A provider already registered with the same name is replaced.
    pub fn use_provider<P: Provider + 'static>(&mut self, provider: P) {
        let provider = DynProvider::new(provider);
        if self
            .providers
            .insert(provider.name().to_owned(), provider)
            .is_some()
        {
            tracing::debug!("Replaced an already registered provider");
        }
    }

    /// Get a provider by name
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::UnknownProvider`] if there is none
    pub fn get(&self, name: &str) -> Result<&DynProvider, ProviderError> {
        self.providers
            .get(name)
            .ok_or_else(|| ProviderError::UnknownProvider {
                name: name.to_owned(),
            })
    }

    /// Remove all the providers
    pub fn clear(&mut self) {
        self.providers.clear();
    }

    /// The names of the registered providers, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    /// The number of registered providers
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether no provider is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
