// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2023, 2024 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Any provider implementing OpenID Connect Discovery

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use social_jose::{
    jwa::{JsonWebSignatureAlg, SUPPORTED_SIGNING_ALGORITHMS},
    jwk::PublicJsonWebKeySet,
};
use social_oauth2_types::{oidc::VerifiedProviderMetadata, requests::AccessTokenResponse};
use social_oidc_client::{
    error::IdTokenError,
    requests::{
        discovery::discover,
        jose::{JwtVerificationData, fetch_jwks},
        userinfo::fetch_userinfo,
    },
    types::client_credentials::ClientCredentials,
};
use url::Url;

use crate::{
    CallbackParams, Provider, ProviderError, Session, User,
    oauth2::{OAuth2Provider, OAuth2Session, oauth2_builders, static_scope},
};

/// The session of an OpenID Connect login attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenIdConnectSession {
    /// The authorization code flow session
    pub oauth2: OAuth2Session,

    /// The claims of the verified ID token
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub claims: HashMap<String, Value>,
}

impl Session for OpenIdConnectSession {
    fn authorization_url(&self) -> &Url {
        self.oauth2.authorization_url()
    }
}

#[derive(Debug, Deserialize)]
struct StandardClaims {
    sub: String,
    name: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
    nickname: Option<String>,
    preferred_username: Option<String>,
    email: Option<String>,
    picture: Option<String>,
    locale: Option<String>,
}

/// A generic OpenID Connect provider
#[derive(Debug, Clone)]
pub struct OpenIdConnect {
    oauth2: OAuth2Provider,
    issuer: String,
    jwks_uri: Url,
    userinfo_endpoint: Option<Url>,
    signing_algorithms: Vec<JsonWebSignatureAlg>,
}

oauth2_builders!(OpenIdConnect);

impl OpenIdConnect {
    /// Discover the issuer, and create a provider out of its metadata.
    ///
    /// If a client secret is given, the client authenticates with HTTP Basic
    /// authentication, unless the issuer only supports sending it in the
    /// body.
    ///
    /// # Errors
    ///
    /// Returns an error if the discovery fails
    #[tracing::instrument(skip_all, fields(issuer = issuer))]
    pub async fn discover(
        http_client: reqwest::Client,
        issuer: &str,
        client_id: String,
        client_secret: Option<String>,
        redirect_uri: Url,
    ) -> Result<Self, ProviderError> {
        let metadata = discover(&http_client, issuer).await?;
        let credentials = credentials_for(&metadata, client_id, client_secret);
        Ok(Self::from_metadata(
            http_client,
            &metadata,
            credentials,
            redirect_uri,
        ))
    }

    /// Create a provider out of already discovered metadata
    #[must_use]
    pub fn from_metadata(
        http_client: reqwest::Client,
        metadata: &VerifiedProviderMetadata,
        credentials: ClientCredentials,
        redirect_uri: Url,
    ) -> Self {
        let oauth2 = OAuth2Provider::new(
            "openid_connect",
            http_client,
            credentials,
            metadata.authorization_endpoint().clone(),
            metadata.token_endpoint().clone(),
            redirect_uri,
        )
        .with_scope(static_scope(&["openid", "profile", "email"]))
        .with_pkce(metadata.supports_pkce_s256());

        // `none` and algorithms no key can verify are left out
        let mut signing_algorithms: Vec<_> = metadata
            .id_token_signing_alg_values_supported
            .iter()
            .flatten()
            .filter(|alg| SUPPORTED_SIGNING_ALGORITHMS.contains(*alg))
            .cloned()
            .collect();
        if signing_algorithms.is_empty() {
            signing_algorithms.push(JsonWebSignatureAlg::Rs256);
        }

        Self {
            oauth2,
            issuer: metadata.issuer().to_owned(),
            jwks_uri: metadata.jwks_uri().clone(),
            userinfo_endpoint: metadata.userinfo_endpoint.clone(),
            signing_algorithms,
        }
    }
}

impl OpenIdConnect {
    async fn fetch_jwks(&self) -> Result<PublicJsonWebKeySet, ProviderError> {
        Ok(fetch_jwks(self.oauth2.http_client(), &self.jwks_uri).await?)
    }

    fn verification_data<'a>(&'a self, jwks: &'a PublicJsonWebKeySet) -> JwtVerificationData<'a> {
        JwtVerificationData {
            issuer: Some(&self.issuer),
            jwks,
            client_id: self.oauth2.client_id(),
            signing_algorithms: &self.signing_algorithms,
        }
    }
}

fn credentials_for(
    metadata: &VerifiedProviderMetadata,
    client_id: String,
    client_secret: Option<String>,
) -> ClientCredentials {
    let Some(client_secret) = client_secret else {
        return ClientCredentials::None { client_id };
    };

    let post_only = metadata
        .token_endpoint_auth_methods_supported
        .as_deref()
        .is_some_and(|methods| {
            methods.iter().any(|m| m == "client_secret_post")
                && !methods.iter().any(|m| m == "client_secret_basic")
        });

    if post_only {
        ClientCredentials::ClientSecretPost {
            client_id,
            client_secret,
        }
    } else {
        ClientCredentials::ClientSecretBasic {
            client_id,
            client_secret,
        }
    }
}

#[async_trait]
impl Provider for OpenIdConnect {
    type Session = OpenIdConnectSession;

    fn name(&self) -> &str {
        self.oauth2.name()
    }

    async fn begin_auth(&self, state: &str) -> Result<OpenIdConnectSession, ProviderError> {
        Ok(OpenIdConnectSession {
            oauth2: self.oauth2.begin_auth(state)?,
            claims: HashMap::new(),
        })
    }

    #[tracing::instrument(skip_all, fields(provider = self.name()))]
    async fn authorize(
        &self,
        session: &mut OpenIdConnectSession,
        params: &CallbackParams,
    ) -> Result<String, ProviderError> {
        let code = self.oauth2.check_callback(&session.oauth2, params)?;

        let jwks = self.fetch_jwks().await?;
        let id_token = self
            .oauth2
            .exchange_code(&mut session.oauth2, code, Some(self.verification_data(&jwks)))
            .await?
            .ok_or(IdTokenError::MissingIdToken)?;

        session.claims = id_token.into_parts().1;

        session
            .oauth2
            .access_token(self.name())
            .map(ToOwned::to_owned)
    }

    #[tracing::instrument(skip_all, fields(provider = self.name()))]
    async fn fetch_user(&self, session: &OpenIdConnectSession) -> Result<User, ProviderError> {
        let access_token = session.oauth2.access_token(self.name())?;

        let mut claims: serde_json::Map<String, Value> = session
            .claims
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        if let Some(userinfo_endpoint) = &self.userinfo_endpoint {
            // The userinfo must be about the same user as the ID token
            let userinfo = fetch_userinfo(
                self.oauth2.http_client(),
                userinfo_endpoint,
                access_token,
                claims.get("sub").and_then(Value::as_str),
            )
            .await?;

            claims.extend(userinfo);
        }

        let raw = Value::Object(claims);
        let profile: StandardClaims = serde_json::from_value(raw.clone())?;

        let mut user = User::from_session(self.name(), &session.oauth2, access_token)
            .with_raw_data(raw);
        user.user_id = profile.sub;
        user.name = profile.name;
        user.first_name = profile.given_name;
        user.last_name = profile.family_name;
        user.nick_name = profile.preferred_username.or(profile.nickname);
        user.email = profile.email;
        user.avatar_url = profile.picture;
        user.location = profile.locale;

        Ok(user)
    }

    #[tracing::instrument(skip_all, fields(provider = self.name()))]
    async fn refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<AccessTokenResponse, ProviderError> {
        let jwks = self.fetch_jwks().await?;
        self.oauth2
            .refresh(refresh_token, Some(self.verification_data(&jwks)))
            .await
    }

    fn refresh_token_available(&self) -> bool {
        true
    }
}
