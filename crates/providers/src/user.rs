// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2022-2024 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::oauth2::OAuth2Session;

/// A user, as returned by a provider after a successful login.
///
/// Only `provider` and `user_id` are always set. Everything the provider
/// returned is kept in `raw_data`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The name of the provider which authenticated the user
    pub provider: String,

    /// The stable identifier of the user at the provider
    pub user_id: String,

    /// The email address, not necessarily verified
    pub email: Option<String>,
    /// The display name
    pub name: Option<String>,
    /// The given name
    pub first_name: Option<String>,
    /// The family name
    pub last_name: Option<String>,
    /// The handle or username
    pub nick_name: Option<String>,
    /// A short description, like a job title
    pub description: Option<String>,
    /// A URL to the picture of the user
    pub avatar_url: Option<String>,
    /// Where the user is
    pub location: Option<String>,

    /// The access token obtained at the token endpoint
    pub access_token: String,
    /// The refresh token, if the provider issued one
    pub refresh_token: Option<String>,
    /// When the access token expires, if it does
    pub expires_at: Option<DateTime<Utc>>,
    /// The raw ID token, for OpenID Connect providers
    pub id_token: Option<String>,

    /// The profile as returned by the provider
    #[serde(default)]
    pub raw_data: HashMap<String, Value>,
}

impl User {
    /// Start a user from the tokens of an authorized session
    pub(crate) fn from_session(provider: &str, session: &OAuth2Session, access_token: &str) -> Self {
        Self {
            provider: provider.to_owned(),
            access_token: access_token.to_owned(),
            refresh_token: session.refresh_token.clone(),
            expires_at: session.expires_at,
            id_token: session.id_token.clone(),
            ..Self::default()
        }
    }

    /// Keep the members of a JSON object as the raw data of this user
    pub(crate) fn with_raw_data(mut self, raw: Value) -> Self {
        if let Value::Object(map) = raw {
            self.raw_data.extend(map);
        }
        self
    }
}
