// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2023, 2024 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Shopify.
//!
//! Every shop has its own endpoints, under `https://{shop}.myshopify.com`.
//! Shopify signs the callback with an HMAC-SHA256 of its other parameters,
//! keyed with the client secret.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use social_oauth2_types::requests::AccessTokenResponse;
use social_oidc_client::types::client_credentials::ClientCredentials;
use url::Url;

use crate::{
    CallbackParams, Provider, ProviderError, User,
    oauth2::{OAuth2Provider, OAuth2Session, oauth2_builders, static_scope},
};

type HmacSha256 = Hmac<Sha256>;

/// The suffix of the domains of all the shops
pub const SHOP_DOMAIN_SUFFIX: &str = ".myshopify.com";

const API_VERSION: &str = "2024-01";

#[derive(Debug, Deserialize)]
struct ShopResponse {
    shop: Shop,
}

#[derive(Debug, Deserialize)]
struct Shop {
    id: serde_json::Number,
    name: Option<String>,
    email: Option<String>,
    shop_owner: Option<String>,
    city: Option<String>,
    country_name: Option<String>,
}

/// A Shopify shop
#[derive(Debug, Clone)]
pub struct Shopify {
    oauth2: OAuth2Provider,
    client_secret: String,
    shop_domain: String,
    shop_endpoint: Url,
}

oauth2_builders!(Shopify);

impl Shopify {
    /// Create the provider for the given shop.
    ///
    /// `shop` is the name of the shop, without the `.myshopify.com` suffix.
    ///
    /// # Errors
    ///
    /// Returns an error if the shop endpoints fail to parse
    pub fn new(
        http_client: reqwest::Client,
        client_id: String,
        client_secret: String,
        shop: &str,
        redirect_uri: Url,
    ) -> Result<Self, url::ParseError> {
        let shop_domain = format!("{shop}{SHOP_DOMAIN_SUFFIX}");
        let base = Url::parse(&format!("https://{shop_domain}/admin/"))?;

        let oauth2 = OAuth2Provider::new(
            "shopify",
            http_client,
            ClientCredentials::ClientSecretPost {
                client_id,
                client_secret: client_secret.clone(),
            },
            base.join("oauth/authorize")?,
            base.join("oauth/access_token")?,
            redirect_uri,
        )
        .with_scope(static_scope(&["read_products"]))
        .with_scope_separator(",");

        Ok(Self {
            oauth2,
            client_secret,
            shop_endpoint: base.join(&format!("api/{API_VERSION}/shop.json"))?,
            shop_domain,
        })
    }

    /// Fetch the shop from another endpoint
    #[must_use]
    pub fn with_shop_endpoint(mut self, shop_endpoint: Url) -> Self {
        self.shop_endpoint = shop_endpoint;
        self
    }

    /// Check the HMAC of the callback parameters.
    ///
    /// The message is the URL-encoded query, sorted by name, without the
    /// `hmac` and `signature` parameters.
    fn verify_hmac(&self, params: &CallbackParams) -> Result<(), ProviderError> {
        let expected = params.get("hmac").ok_or(ProviderError::HmacMismatch)?;
        let expected = hex::decode(expected).map_err(|_| ProviderError::HmacMismatch)?;

        let message = signed_message(params);

        let mut mac = HmacSha256::new_from_slice(self.client_secret.as_bytes())
            .map_err(|_| ProviderError::HmacMismatch)?;
        mac.update(message.as_bytes());
        mac.verify_slice(&expected)
            .map_err(|_| ProviderError::HmacMismatch)
    }

    /// Check that the callback comes from the configured shop
    fn verify_shop(&self, params: &CallbackParams) -> Result<(), ProviderError> {
        let shop = params.get("shop").ok_or(ProviderError::MissingShop)?;

        if !shop.ends_with(SHOP_DOMAIN_SUFFIX) || shop != self.shop_domain {
            return Err(ProviderError::InvalidShop {
                shop: shop.to_owned(),
            });
        }

        Ok(())
    }
}

fn signed_message(params: &CallbackParams) -> String {
    // The parameters are already sorted by name
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (name, value) in params.iter() {
        if name != "hmac" && name != "signature" {
            serializer.append_pair(name, value);
        }
    }
    serializer.finish()
}

#[async_trait]
impl Provider for Shopify {
    type Session = OAuth2Session;

    fn name(&self) -> &str {
        self.oauth2.name()
    }

    async fn begin_auth(&self, state: &str) -> Result<OAuth2Session, ProviderError> {
        self.oauth2.begin_auth(state)
    }

    #[tracing::instrument(skip_all, fields(provider = self.name()))]
    async fn authorize(
        &self,
        session: &mut OAuth2Session,
        params: &CallbackParams,
    ) -> Result<String, ProviderError> {
        self.verify_hmac(params)?;
        self.verify_shop(params)?;
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
                    .get(self.shop_endpoint.as_str())
                    .header("X-Shopify-Access-Token", access_token),
            )
            .await?;
        let ShopResponse { shop } = serde_json::from_value(raw.clone())?;

        let location = match (shop.city, shop.country_name) {
            (Some(city), Some(country)) => Some(format!("{city}, {country}")),
            (city, country) => city.or(country),
        };

        let mut user = User::from_session(self.name(), session, access_token)
            .with_raw_data(raw.get("shop").cloned().unwrap_or_default());
        user.user_id = shop.id.to_string();
        user.name = shop.shop_owner;
        user.nick_name = shop.name;
        user.email = shop.email;
        user.location = location;
        // Offline tokens never expire
        user.expires_at = None;

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
