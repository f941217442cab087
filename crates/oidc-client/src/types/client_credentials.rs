// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2022-2024 Kévin Commaille.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Types and methods for client credentials.

use std::{collections::HashMap, fmt};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use social_jose::{
    claims,
    jwa::{AsymmetricSigningKey, JsonWebSignatureAlg},
    jwt::{JsonWebSignatureHeader, Jwt},
};

use crate::error::CredentialsError;

/// The audience of the client secrets minted for Sign in with Apple.
pub const APPLE_AUDIENCE: &str = "https://appleid.apple.com";

/// The longest lifetime Apple accepts for a client secret: 6 months.
pub const APPLE_MAX_SECRET_LIFETIME_SECONDS: i64 = 15_777_000;

/// The credentials obtained during registration, to authenticate a client on
/// endpoints that require it.
#[derive(Clone)]
pub enum ClientCredentials {
    /// No client authentication is used.
    ///
    /// This is used if the client is public.
    None {
        /// The unique ID for the client.
        client_id: String,
    },

    /// The client authentication is sent via the Authorization HTTP header.
    ClientSecretBasic {
        /// The unique ID for the client.
        client_id: String,

        /// The secret of the client.
        client_secret: String,
    },

    /// The client authentication is sent with the body of the request.
    ClientSecretPost {
        /// The unique ID for the client.
        client_id: String,

        /// The secret of the client.
        client_secret: String,
    },

    /// Like [`ClientCredentials::ClientSecretPost`], but the client ID is
    /// sent as `client_key`, the way TikTok wants it.
    ClientKeyPost {
        /// The unique key for the client.
        client_key: String,

        /// The secret of the client.
        client_secret: String,
    },

    /// The client authenticates like Sign in with Apple wants
    SignInWithApple {
        /// The unique ID for the client.
        client_id: String,

        /// The ECDSA key used to sign
        key: elliptic_curve::SecretKey<p256::NistP256>,

        /// The key ID
        key_id: String,

        /// The Apple Team ID
        team_id: String,
    },
}

impl ClientCredentials {
    /// Get the client ID of these `ClientCredentials`.
    #[must_use]
    pub fn client_id(&self) -> &str {
        match self {
            ClientCredentials::None { client_id }
            | ClientCredentials::ClientSecretBasic { client_id, .. }
            | ClientCredentials::ClientSecretPost { client_id, .. }
            | ClientCredentials::ClientKeyPost {
                client_key: client_id,
                ..
            }
            | ClientCredentials::SignInWithApple { client_id, .. } => client_id,
        }
    }

    /// Get the static client secret of these `ClientCredentials`, if there is
    /// one.
    #[must_use]
    pub fn client_secret(&self) -> Option<&str> {
        match self {
            ClientCredentials::ClientSecretBasic { client_secret, .. }
            | ClientCredentials::ClientSecretPost { client_secret, .. }
            | ClientCredentials::ClientKeyPost { client_secret, .. } => Some(client_secret),
            ClientCredentials::None { .. } | ClientCredentials::SignInWithApple { .. } => None,
        }
    }

    /// Apply these [`ClientCredentials`] to the given request with the given
    /// form.
    pub(crate) fn authenticated_form<T: Serialize>(
        &self,
        request: reqwest::RequestBuilder,
        form: &T,
        now: DateTime<Utc>,
    ) -> Result<reqwest::RequestBuilder, CredentialsError> {
        let request = match self {
            ClientCredentials::None { client_id } => request.form(&RequestWithClientCredentials {
                body: form,
                client_id: Some(client_id),
                client_key: None,
                client_secret: None,
            }),

            ClientCredentials::ClientSecretBasic {
                client_id,
                client_secret,
            } => {
                let username =
                    form_urlencoded::byte_serialize(client_id.as_bytes()).collect::<String>();
                let password =
                    form_urlencoded::byte_serialize(client_secret.as_bytes()).collect::<String>();
                request
                    .basic_auth(username, Some(password))
                    .form(&RequestWithClientCredentials {
                        body: form,
                        client_id: None,
                        client_key: None,
                        client_secret: None,
                    })
            }

            ClientCredentials::ClientSecretPost {
                client_id,
                client_secret,
            } => request.form(&RequestWithClientCredentials {
                body: form,
                client_id: Some(client_id),
                client_key: None,
                client_secret: Some(client_secret),
            }),

            ClientCredentials::ClientKeyPost {
                client_key,
                client_secret,
            } => request.form(&RequestWithClientCredentials {
                body: form,
                client_id: None,
                client_key: Some(client_key),
                client_secret: Some(client_secret),
            }),

            ClientCredentials::SignInWithApple {
                client_id,
                key,
                key_id,
                team_id,
            } => {
                // SIWA expects a signed JWT as client secret
                // https://developer.apple.com/documentation/accountorganizationaldatasharing/creating-a-client-secret
                let client_secret = make_apple_client_secret(
                    client_id,
                    team_id,
                    key_id,
                    key,
                    now,
                    Duration::seconds(60),
                )?;

                request.form(&RequestWithClientCredentials {
                    body: form,
                    client_id: Some(client_id),
                    client_key: None,
                    client_secret: Some(&client_secret),
                })
            }
        };

        Ok(request)
    }
}

/// Mint a Sign in with Apple client secret.
///
/// The secret is an ES256-signed JWT with `iss` set to the team ID, `sub` to
/// the client ID (the Services ID), `aud` to `https://appleid.apple.com`, and
/// the key ID in the header. Apple accepts lifetimes of up to 6 months, which
/// allows pre-generating a secret and configuring it as a plain client
/// secret.
///
/// # Errors
///
/// Returns an error if the lifetime is out of bounds, or if signing fails.
pub fn make_apple_client_secret(
    client_id: &str,
    team_id: &str,
    key_id: &str,
    key: &elliptic_curve::SecretKey<p256::NistP256>,
    now: DateTime<Utc>,
    lifetime: Duration,
) -> Result<String, CredentialsError> {
    if lifetime <= Duration::zero() || lifetime.num_seconds() > APPLE_MAX_SECRET_LIFETIME_SECONDS {
        return Err(CredentialsError::InvalidLifetime {
            max_days: APPLE_MAX_SECRET_LIFETIME_SECONDS / 86_400,
        });
    }

    let signer = AsymmetricSigningKey::es256(key.clone());

    let mut claims = HashMap::new();

    claims::ISS.insert(&mut claims, team_id.to_owned())?;
    claims::SUB.insert(&mut claims, client_id.to_owned())?;
    claims::AUD.insert(&mut claims, APPLE_AUDIENCE.to_owned())?;
    claims::IAT.insert(&mut claims, now)?;
    claims::EXP.insert(&mut claims, now + lifetime)?;

    let header = JsonWebSignatureHeader::new(JsonWebSignatureAlg::Es256).with_kid(key_id);

    let client_secret = Jwt::sign(header, claims, &signer)?;

    Ok(client_secret.into_string())
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None { client_id } => f
                .debug_struct("None")
                .field("client_id", client_id)
                .finish(),
            Self::ClientSecretBasic { client_id, .. } => f
                .debug_struct("ClientSecretBasic")
                .field("client_id", client_id)
                .finish_non_exhaustive(),
            Self::ClientSecretPost { client_id, .. } => f
                .debug_struct("ClientSecretPost")
                .field("client_id", client_id)
                .finish_non_exhaustive(),
            Self::ClientKeyPost { client_key, .. } => f
                .debug_struct("ClientKeyPost")
                .field("client_key", client_key)
                .finish_non_exhaustive(),
            Self::SignInWithApple {
                client_id,
                key_id,
                team_id,
                ..
            } => f
                .debug_struct("SignInWithApple")
                .field("client_id", client_id)
                .field("key_id", key_id)
                .field("team_id", team_id)
                .finish_non_exhaustive(),
        }
    }
}

/// A request with client credentials added to it.
#[derive(Clone, Serialize)]
struct RequestWithClientCredentials<'a, T> {
    #[serde(flatten)]
    body: T,

    #[serde(skip_serializing_if = "Option::is_none")]
    client_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_key: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_secret: Option<&'a str>,
}
