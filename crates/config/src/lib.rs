// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2021-2024 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

#![deny(missing_docs, rustdoc::missing_crate_level_docs)]
#![allow(clippy::module_name_repetitions)]

//! Configuration of the social login adapters

use camino::Utf8PathBuf;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};

mod sections;
pub(crate) mod util;

pub use self::{
    sections::*,
    util::{ConfigError, ConfigurationSection, ConfigurationSectionExt},
};

/// The prefix of the environment variables overriding the configuration
pub const ENV_PREFIX: &str = "SOCIAL_";

/// Build the [`Figment`] the configuration is extracted from.
///
/// Files are merged in order, and environment variables prefixed with
/// [`ENV_PREFIX`] override them. Nested keys are separated by a double
/// underscore, e.g. `SOCIAL_HTTP__USER_AGENT`.
#[must_use]
pub fn figment(files: &[Utf8PathBuf]) -> Figment {
    let mut figment = Figment::new();
    for file in files {
        figment = figment.merge(Yaml::file(file));
    }

    figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
}
