// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2022-2024 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use anyhow::Context;
use elliptic_curve::pkcs8::DecodePrivateKey;
use social_config::{AppleConfig, HttpConfig, ProviderConfig, ProviderKind, ProvidersConfig};
use social_http::HttpClientOptions;
use social_oauth2_types::scope::Scope;
use social_oidc_client::types::client_credentials::ClientCredentials;

use crate::{
    Providers,
    providers::{Apple, Azure, LinkedIn, OpenIdConnect, Reddit, Shopify, Slack, TikTok},
};

/// The options of the HTTP client from its configuration
#[must_use]
pub fn http_client_options(config: &HttpConfig) -> HttpClientOptions {
    let defaults = HttpClientOptions::default();
    HttpClientOptions {
        user_agent: config.user_agent.clone().unwrap_or(defaults.user_agent),
        timeout: config.timeout,
        connect_timeout: config.connect_timeout,
    }
}

fn parse_scope(config: &ProviderConfig) -> anyhow::Result<Option<Scope>> {
    let Some(scopes) = &config.scopes else {
        return Ok(None);
    };

    let scope = scopes
        .iter()
        .map(|token| token.parse())
        .collect::<Result<Scope, _>>()
        .with_context(|| format!("Invalid scopes for provider {:?}", config.name()))?;

    Ok(Some(scope))
}

async fn apple_credentials(
    client_id: &str,
    config: &AppleConfig,
) -> anyhow::Result<ClientCredentials> {
    match (&config.client_secret, &config.sign_in_with_apple) {
        (Some(client_secret), None) => Ok(ClientCredentials::ClientSecretPost {
            client_id: client_id.to_owned(),
            client_secret: client_secret.clone(),
        }),
        (None, Some(siwa)) => {
            let pem = siwa.private_key().await?;
            let key = elliptic_curve::SecretKey::<p256::NistP256>::from_pkcs8_pem(&pem)
                .context("Invalid Sign in with Apple private key")?;

            Ok(ClientCredentials::SignInWithApple {
                client_id: client_id.to_owned(),
                key,
                key_id: siwa.key_id.clone(),
                team_id: siwa.team_id.clone(),
            })
        }
        _ => anyhow::bail!("Exactly one of `client_secret` and `sign_in_with_apple` must be set"),
    }
}

/// Register `$provider`, applying the name and scopes of `$config`
macro_rules! register {
    ($providers:expr, $config:expr, $provider:expr) => {{
        let mut provider = $provider.with_name($config.name());
        if let Some(scope) = parse_scope($config)? {
            provider = provider.with_scope(scope);
        }
        $providers.use_provider(provider);
    }};
}

impl Providers {
    /// Build a registry from the configuration.
    ///
    /// OpenID Connect issuers are discovered, and Sign in with Apple keys are
    /// loaded, while building.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client can't be built, if a key can't be
    /// loaded, or if a discovery fails
    #[tracing::instrument(skip_all)]
    pub async fn from_config(
        config: &ProvidersConfig,
        http: &HttpConfig,
    ) -> anyhow::Result<Self> {
        let http_client = social_http::reqwest_client_with_options(&http_client_options(http))
            .context("Failed to build the HTTP client")?;

        let mut providers = Self::new();

        for provider in &config.providers {
            let client_id = provider.client_id.clone();
            let redirect_uri = provider.redirect_uri.clone();
            let http_client = http_client.clone();

            match &provider.kind {
                ProviderKind::Apple(apple) => {
                    let credentials = apple_credentials(&client_id, apple).await?;
                    register!(
                        providers,
                        provider,
                        Apple::new(http_client, credentials, redirect_uri)?
                    );
                }
                ProviderKind::Azure(azure) => register!(
                    providers,
                    provider,
                    Azure::new(
                        http_client,
                        client_id,
                        azure.client_secret.clone(),
                        &azure.tenant,
                        redirect_uri,
                    )?
                ),
                ProviderKind::Linkedin(secret) => register!(
                    providers,
                    provider,
                    LinkedIn::new(
                        http_client,
                        client_id,
                        secret.client_secret.clone(),
                        redirect_uri
                    )?
                ),
                ProviderKind::Slack(secret) => register!(
                    providers,
                    provider,
                    Slack::new(
                        http_client,
                        client_id,
                        secret.client_secret.clone(),
                        redirect_uri
                    )?
                ),
                ProviderKind::Tiktok(secret) => register!(
                    providers,
                    provider,
                    TikTok::new(
                        http_client,
                        client_id,
                        secret.client_secret.clone(),
                        redirect_uri
                    )?
                ),
                ProviderKind::Reddit(secret) => register!(
                    providers,
                    provider,
                    Reddit::new(
                        http_client,
                        client_id,
                        secret.client_secret.clone(),
                        redirect_uri
                    )?
                ),
                ProviderKind::Shopify(shopify) => register!(
                    providers,
                    provider,
                    Shopify::new(
                        http_client,
                        client_id,
                        shopify.client_secret.clone(),
                        &shopify.shop,
                        redirect_uri,
                    )?
                ),
                ProviderKind::OpenidConnect(oidc) => {
                    let discovered = OpenIdConnect::discover(
                        http_client,
                        &oidc.issuer,
                        client_id,
                        oidc.client_secret.clone(),
                        redirect_uri,
                    )
                    .await
                    .with_context(|| format!("Failed to discover issuer {}", oidc.issuer))?;
                    register!(providers, provider, discovered);
                }
            }

            tracing::info!(
                name = %provider.name(),
                kind = provider.kind.as_str(),
                "Registered provider"
            );
        }

        Ok(providers)
    }
}
