// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2021-2024 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::time::Duration;

use serde::{Deserialize, Serialize, de::Error as _};
use serde_with::{DurationSeconds, serde_as, skip_serializing_none};

use crate::util::{ConfigError, ConfigurationSection};

const fn default_timeout() -> Duration {
    Duration::from_secs(60)
}

const fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Configuration of the HTTP client used to talk to the providers
#[serde_as]
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// The `User-Agent` sent with every request.
    ///
    /// Reddit rejects requests without a descriptive one. Defaults to
    /// `social-login/<version>`.
    pub user_agent: Option<String>,

    /// Timeout of a whole request, in seconds
    #[serde(default = "default_timeout")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub timeout: Duration,

    /// Timeout of the connection phase of a request, in seconds
    #[serde(default = "default_connect_timeout")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub connect_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: None,
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

impl HttpConfig {
    /// Returns true if the configuration is the default one
    pub(crate) fn is_default(&self) -> bool {
        self == &Self::default()
    }
}

impl ConfigurationSection for HttpConfig {
    const PATH: Option<&'static str> = Some("http");

    fn validate(&self, figment: &figment::Figment) -> Result<(), ConfigError> {
        let annotate = |mut error: figment::Error, field: &str| {
            error.metadata = figment.find_metadata(&format!("http.{field}")).cloned();
            error.profile = Some(figment::Profile::Default);
            error.path = vec!["http".to_owned(), field.to_owned()];
            error
        };

        if self.timeout.is_zero() {
            return Err(annotate(figment::Error::custom("must not be zero"), "timeout").into());
        }

        if self.connect_timeout.is_zero() {
            return Err(annotate(
                figment::Error::custom("must not be zero"),
                "connect_timeout",
            )
            .into());
        }

        if self.user_agent.as_deref().is_some_and(str::is_empty) {
            return Err(annotate(figment::Error::custom("must not be empty"), "user_agent").into());
        }

        Ok(())
    }
}
