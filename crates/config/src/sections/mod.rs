// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2022-2024 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use serde::{Deserialize, Serialize};

mod http;
mod providers;

pub use self::{
    http::HttpConfig,
    providers::{
        AppleConfig, AzureConfig, ClientSecretConfig, OpenIdConnectConfig, ProviderConfig,
        ProviderKind, ProvidersConfig, ShopifyConfig, SignInWithAppleConfig,
    },
};
use crate::util::{ConfigError, ConfigurationSection};

/// Application configuration root
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RootConfig {
    /// Configuration of the HTTP client talking to the providers
    #[serde(default, skip_serializing_if = "HttpConfig::is_default")]
    pub http: HttpConfig,

    /// Configuration of the login providers
    #[serde(default, skip_serializing_if = "ProvidersConfig::is_default")]
    pub providers: ProvidersConfig,
}

impl ConfigurationSection for RootConfig {
    fn validate(&self, figment: &figment::Figment) -> Result<(), ConfigError> {
        self.http.validate(figment)?;
        self.providers.validate(figment)?;

        Ok(())
    }
}
