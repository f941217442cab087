// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2023, 2024 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::{borrow::Cow, collections::BTreeSet};

use anyhow::Context;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize, de::Error as _};
use serde_with::skip_serializing_none;
use url::Url;

use crate::util::{ConfigError, ConfigurationSection};

/// Login providers configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProvidersConfig {
    /// List of providers
    pub providers: Vec<ProviderConfig>,
}

impl ProvidersConfig {
    /// Returns true if the configuration is the default one
    pub(crate) fn is_default(&self) -> bool {
        self.providers.is_empty()
    }
}

impl ConfigurationSection for ProvidersConfig {
    const PATH: Option<&'static str> = Some("providers");

    fn validate(&self, figment: &figment::Figment) -> Result<(), ConfigError> {
        let root = Self::PATH.unwrap_or("providers");
        let mut names = BTreeSet::new();

        for (index, provider) in self.providers.iter().enumerate() {
            let annotate = |mut error: figment::Error| {
                error.metadata = figment.find_metadata(root).cloned();
                error.profile = Some(figment::Profile::Default);
                error.path = vec![root.to_owned(), index.to_string()];
                error
            };

            let name = provider.name();
            if !names.insert(name.clone()) {
                return Err(annotate(figment::Error::custom(format!(
                    "Duplicate provider name `{name}`, set a distinct `name` on each instance"
                )))
                .into());
            }

            if let Err(message) = provider.kind.check() {
                return Err(annotate(figment::Error::custom(message)).into());
            }
        }

        Ok(())
    }
}

/// Configuration of one login provider instance.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// The name under which this provider is registered.
    ///
    /// Defaults to the name of its kind. Required to have several instances
    /// of the same kind.
    pub name: Option<String>,

    /// The client ID obtained when registering the application.
    ///
    /// This is the Services ID for Sign in with Apple, and the client key for
    /// TikTok.
    pub client_id: String,

    /// The URL the provider redirects to after the authorization
    pub redirect_uri: Url,

    /// The scopes to request, instead of the provider's default ones
    pub scopes: Option<Vec<String>>,

    /// Provider-specific settings
    #[serde(flatten)]
    pub kind: ProviderKind,
}

impl ProviderConfig {
    /// The name under which this provider is registered
    #[must_use]
    pub fn name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.kind.as_str().to_owned())
    }
}

/// The kind of a provider, with its specific settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderKind {
    /// Sign in with Apple
    Apple(AppleConfig),

    /// Microsoft Entra ID, formerly Azure AD, with the v2 endpoints
    Azure(AzureConfig),

    /// LinkedIn, with OpenID Connect
    Linkedin(ClientSecretConfig),

    /// Slack
    Slack(ClientSecretConfig),

    /// TikTok, with the v2 API
    Tiktok(ClientSecretConfig),

    /// Reddit
    Reddit(ClientSecretConfig),

    /// A Shopify shop
    Shopify(ShopifyConfig),

    /// Any provider supporting OpenID Connect Discovery
    OpenidConnect(OpenIdConnectConfig),
}

impl ProviderKind {
    /// The name of this kind of provider
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Apple(_) => "apple",
            Self::Azure(_) => "azure",
            Self::Linkedin(_) => "linkedin",
            Self::Slack(_) => "slack",
            Self::Tiktok(_) => "tiktok",
            Self::Reddit(_) => "reddit",
            Self::Shopify(_) => "shopify",
            Self::OpenidConnect(_) => "openid_connect",
        }
    }

    fn check(&self) -> Result<(), String> {
        match self {
            Self::Apple(apple) => apple.check(),
            Self::Azure(azure) => azure.check(),
            Self::Shopify(shopify) => shopify.check(),
            Self::OpenidConnect(oidc) => oidc.check(),
            Self::Linkedin(_) | Self::Slack(_) | Self::Tiktok(_) | Self::Reddit(_) => Ok(()),
        }
    }
}

/// Settings of providers which only need a client secret
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSecretConfig {
    /// The client secret obtained when registering the application
    pub client_secret: String,
}

/// Settings of Sign in with Apple.
///
/// Either a pre-generated `client_secret` or the `sign_in_with_apple` key
/// material to mint one on each request must be set.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppleConfig {
    /// A pre-generated client secret
    pub client_secret: Option<String>,

    /// The key material used to mint client secrets
    pub sign_in_with_apple: Option<SignInWithAppleConfig>,
}

impl AppleConfig {
    fn check(&self) -> Result<(), String> {
        match (&self.client_secret, &self.sign_in_with_apple) {
            (None, None) => Err("Missing `client_secret` or `sign_in_with_apple`".to_owned()),
            (Some(_), Some(_)) => {
                Err("Cannot specify both `client_secret` and `sign_in_with_apple`".to_owned())
            }
            (None, Some(siwa)) => siwa.check(),
            (Some(_), None) => Ok(()),
        }
    }
}

/// The key material of Sign in with Apple
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInWithAppleConfig {
    /// The private key file used to sign the client secrets
    pub private_key_file: Option<Utf8PathBuf>,

    /// The private key used to sign the client secrets, in PEM
    pub private_key: Option<String>,

    /// The Team ID of the Apple Developer Portal
    pub team_id: String,

    /// The key ID of the Apple Developer Portal
    pub key_id: String,
}

impl SignInWithAppleConfig {
    fn check(&self) -> Result<(), String> {
        match (&self.private_key, &self.private_key_file) {
            (None, None) => Err("Missing `private_key` or `private_key_file`".to_owned()),
            (Some(_), Some(_)) => {
                Err("Cannot specify both `private_key` and `private_key_file`".to_owned())
            }
            _ => Ok(()),
        }
    }

    /// Returns the PEM-encoded private key.
    ///
    /// If `private_key_file` was given, the key is read from that file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file could not be read, or if no key is set
    pub async fn private_key(&self) -> anyhow::Result<Cow<'_, str>> {
        match (&self.private_key, &self.private_key_file) {
            (Some(key), _) => Ok(Cow::Borrowed(key)),
            (None, Some(path)) => {
                let key = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read private key file {path}"))?;
                Ok(Cow::Owned(key))
            }
            (None, None) => anyhow::bail!("Missing `private_key` or `private_key_file`"),
        }
    }
}

/// Settings of Microsoft Entra ID
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureConfig {
    /// The client secret obtained when registering the application
    pub client_secret: String,

    /// The tenant allowed to log in.
    ///
    /// One of `common`, `organizations`, `consumers`, or a tenant ID.
    #[serde(default = "default_tenant")]
    pub tenant: String,
}

fn default_tenant() -> String {
    "common".to_owned()
}

impl AzureConfig {
    fn check(&self) -> Result<(), String> {
        // The tenant ends up as a path segment of the login endpoints
        let valid = !self.tenant.is_empty()
            && self
                .tenant
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');

        if !valid {
            return Err(format!(
                "Invalid tenant `{}`, expected `common`, `organizations`, `consumers`, a tenant ID or a domain",
                self.tenant
            ));
        }

        Ok(())
    }
}

/// Settings of a Shopify shop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopifyConfig {
    /// The client secret obtained when registering the application
    pub client_secret: String,

    /// The name of the shop, without the `.myshopify.com` suffix
    pub shop: String,
}

impl ShopifyConfig {
    fn check(&self) -> Result<(), String> {
        if self.shop.is_empty() || self.shop.contains(['.', '/']) {
            return Err(format!(
                "Invalid shop name `{}`, expected the part before `.myshopify.com`",
                self.shop
            ));
        }

        Ok(())
    }
}

/// Settings of a generic OpenID Connect provider
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenIdConnectConfig {
    /// The client secret, for confidential clients
    pub client_secret: Option<String>,

    /// The issuer, where the discovery document is looked up.
    ///
    /// It is compared as-is to the issuer advertised by the provider, so a
    /// trailing slash matters.
    pub issuer: String,
}

impl OpenIdConnectConfig {
    fn check(&self) -> Result<(), String> {
        match Url::parse(&self.issuer) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
            _ => Err(format!("Invalid issuer `{}`, expected an HTTP(S) URL", self.issuer)),
        }
    }
}
