// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2022-2024 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Social login providers.
//!
//! Every provider does the same three steps of the OAuth 2.0 authorization
//! code flow: build the authorization URL ([`Provider::begin_auth`]),
//! exchange the code from the callback ([`Provider::authorize`]) and fetch a
//! normalized [`User`] ([`Provider::fetch_user`]).
//!
//! Providers can be used directly, or through a [`Providers`] registry which
//! hands out [`DynProvider`]s working on sessions marshaled as JSON.
//!
//! The HTTP client uses rustls without a default crypto provider: one must be
//! installed before building a registry with [`Providers::from_config`].

#![deny(missing_docs)]
#![allow(clippy::module_name_repetitions)]

mod clock;
mod config;
mod error;
pub mod oauth2;
mod provider;
pub mod providers;
mod registry;
mod user;

pub use self::{
    clock::{Clock, MockClock, SystemClock},
    config::http_client_options,
    error::ProviderError,
    oauth2::{OAuth2Provider, OAuth2Session},
    provider::{CallbackParams, Provider, Session},
    registry::{DynProvider, Providers},
    user::User,
};
