// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2023, 2024 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! [Sign in with Apple](https://developer.apple.com/documentation/sign_in_with_apple)
//!
//! The user is only known through the ID token: it must be verified against
//! Apple's JWKS, and bound to the access token with its `at_hash` claim.
//! Names are only sent once, in the `user` parameter of the first callback.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize, de::Unexpected};
use serde_json::Value;
use social_jose::{
    claims::{self, TokenHash},
    jwa::JsonWebSignatureAlg,
};
use social_oauth2_types::requests::{AccessTokenResponse, ResponseMode};
use social_oidc_client::{
    error::IdTokenError,
    requests::jose::{JwtVerificationData, fetch_jwks},
    types::client_credentials::ClientCredentials,
};
use url::Url;

use crate::{
    CallbackParams, Provider, ProviderError, Session, User,
    oauth2::{OAuth2Provider, OAuth2Session, oauth2_builders, static_scope},
};

/// The issuer of Apple's ID tokens
pub const ISSUER: &str = "https://appleid.apple.com";

const AUTHORIZATION_ENDPOINT: &str = "https://appleid.apple.com/auth/authorize";
const TOKEN_ENDPOINT: &str = "https://appleid.apple.com/auth/token";
const JWKS_URI: &str = "https://appleid.apple.com/auth/keys";

const SIGNING_ALGORITHMS: &[JsonWebSignatureAlg] =
    &[JsonWebSignatureAlg::Rs256, JsonWebSignatureAlg::Es256];

/// The name of the user, as sent in the `user` callback parameter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppleUserName {
    /// The given name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    /// The family name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

/// The `user` callback parameter, only sent the first time a user consents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppleUser {
    /// The name of the user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<AppleUserName>,

    /// The email of the user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// The session of a Sign in with Apple login attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppleSession {
    /// The authorization code flow session
    pub oauth2: OAuth2Session,

    /// The `user` parameter of the callback, if there was one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<AppleUser>,

    /// The claims of the verified ID token
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub claims: HashMap<String, Value>,
}

impl Session for AppleSession {
    fn authorization_url(&self) -> &Url {
        self.oauth2.authorization_url()
    }
}

/// The claims of Apple's ID tokens which make up the user
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct IdTokenClaims {
    sub: String,

    #[serde(default)]
    email: Option<String>,

    #[serde(default, deserialize_with = "bool_or_string")]
    email_verified: Option<bool>,

    #[serde(default, deserialize_with = "bool_or_string")]
    is_private_email: Option<bool>,
}

/// Apple sends some booleans as `"true"` and `"false"` strings
fn bool_or_string<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        String(String),
    }

    match Option::<BoolOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(BoolOrString::Bool(value)) => Ok(Some(value)),
        Some(BoolOrString::String(value)) => match value.as_str() {
            "true" => Ok(Some(true)),
            "false" => Ok(Some(false)),
            other => Err(serde::de::Error::invalid_value(
                Unexpected::Str(other),
                &"a boolean",
            )),
        },
    }
}

/// Sign in with Apple
#[derive(Debug, Clone)]
pub struct Apple {
    oauth2: OAuth2Provider,
    jwks_uri: Url,
}

oauth2_builders!(Apple);

impl Apple {
    /// Create the provider.
    ///
    /// The credentials are either a pre-generated client secret, sent with
    /// [`ClientCredentials::ClientSecretPost`], or the key to mint one on each
    /// request with [`ClientCredentials::SignInWithApple`].
    ///
    /// # Errors
    ///
    /// Returns an error if the Apple endpoints fail to parse
    pub fn new(
        http_client: reqwest::Client,
        credentials: ClientCredentials,
        redirect_uri: Url,
    ) -> Result<Self, url::ParseError> {
        let oauth2 = OAuth2Provider::new(
            "apple",
            http_client,
            credentials,
            AUTHORIZATION_ENDPOINT.parse()?,
            TOKEN_ENDPOINT.parse()?,
            redirect_uri,
        )
        .with_scope(static_scope(&["name", "email"]));

        Ok(Self {
            oauth2,
            jwks_uri: JWKS_URI.parse()?,
        })
    }

    /// Fetch the signing keys from another URL
    #[must_use]
    pub fn with_jwks_uri(mut self, jwks_uri: Url) -> Self {
        self.jwks_uri = jwks_uri;
        self
    }
}

#[async_trait]
impl Provider for Apple {
    type Session = AppleSession;

    fn name(&self) -> &str {
        self.oauth2.name()
    }

    async fn begin_auth(&self, state: &str) -> Result<AppleSession, ProviderError> {
        let mut data = self.oauth2.authorization_request(state);

        // Apple posts the callback as a form when names or emails are requested
        if !data.scope.is_empty() {
            data = data.with_response_mode(ResponseMode::FormPost);
        }

        Ok(AppleSession {
            oauth2: self.oauth2.begin_auth_with(data)?,
            user: None,
            claims: HashMap::new(),
        })
    }

    #[tracing::instrument(skip_all, fields(provider = self.name()))]
    async fn authorize(
        &self,
        session: &mut AppleSession,
        params: &CallbackParams,
    ) -> Result<String, ProviderError> {
        let code = self.oauth2.check_callback(&session.oauth2, params)?;

        if let Some(user) = params.get("user") {
            session.user = Some(serde_json::from_str(user)?);
        }

        let jwks = fetch_jwks(self.oauth2.http_client(), &self.jwks_uri).await?;
        let verification_data = JwtVerificationData {
            issuer: Some(ISSUER),
            jwks: &jwks,
            client_id: self.oauth2.client_id(),
            signing_algorithms: SIGNING_ALGORITHMS,
        };

        let id_token = self
            .oauth2
            .exchange_code(&mut session.oauth2, code, Some(verification_data))
            .await?
            .ok_or(IdTokenError::MissingIdToken)?;

        let access_token = session.oauth2.access_token(self.name())?.to_owned();

        // The ID token must be bound to the access token
        let mut claims = id_token.payload().clone();
        claims::AT_HASH
            .extract_required_with_options(
                &mut claims,
                TokenHash::new(id_token.header().alg(), &access_token),
            )
            .map_err(IdTokenError::from)?;

        tracing::debug!("Verified Apple ID token");
        session.claims = id_token.into_parts().1;

        Ok(access_token)
    }

    async fn fetch_user(&self, session: &AppleSession) -> Result<User, ProviderError> {
        let access_token = session.oauth2.access_token(self.name())?;
        if session.claims.is_empty() {
            return Err(IdTokenError::MissingIdToken.into());
        }

        let raw: serde_json::Map<String, Value> = session
            .claims
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let claims: IdTokenClaims = serde_json::from_value(Value::Object(raw.clone()))?;

        let mut user = User::from_session(self.name(), &session.oauth2, access_token)
            .with_raw_data(Value::Object(raw));
        user.user_id = claims.sub;
        user.email = claims.email;

        // Normalize the flags Apple sends either as booleans or strings
        for (name, value) in [
            ("email_verified", claims.email_verified),
            ("is_private_email", claims.is_private_email),
        ] {
            if let Some(value) = value {
                user.raw_data.insert(name.to_owned(), Value::Bool(value));
            }
        }

        if let Some(apple_user) = &session.user {
            if user.email.is_none() {
                user.email.clone_from(&apple_user.email);
            }

            if let Some(name) = &apple_user.name {
                user.first_name.clone_from(&name.first_name);
                user.last_name.clone_from(&name.last_name);

                let full_name = [name.first_name.as_deref(), name.last_name.as_deref()]
                    .into_iter()
                    .flatten()
                    .collect::<Vec<_>>()
                    .join(" ");
                if !full_name.is_empty() {
                    user.name = Some(full_name);
                }
            }
        }

        Ok(user)
    }

    #[tracing::instrument(skip_all, fields(provider = self.name()))]
    async fn refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<AccessTokenResponse, ProviderError> {
        // Apple sends a new ID token with the refreshed access token
        let jwks = fetch_jwks(self.oauth2.http_client(), &self.jwks_uri).await?;
        let verification_data = JwtVerificationData {
            issuer: Some(ISSUER),
            jwks: &jwks,
            client_id: self.oauth2.client_id(),
            signing_algorithms: SIGNING_ALGORITHMS,
        };

        self.oauth2
            .refresh(refresh_token, Some(verification_data))
            .await
    }

    fn refresh_token_available(&self) -> bool {
        true
    }
}
