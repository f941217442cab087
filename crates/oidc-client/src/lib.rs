// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2022-2024 Kévin Commaille.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! An [OAuth 2.0] and [OpenID Connect] client library for social login
//! providers.
//!
//! # Scope
//!
//! The requests needed by a relying party doing the authorization code flow
//! against a third-party identity provider. Most social providers implement
//! OAuth 2.0 loosely, so the requests here tolerate the usual deviations:
//! custom scope separators, a renamed `client_id` parameter, errors returned
//! with a `200 OK` status, `expires_in` sent as a string.
//!
//! # OpenID Connect and OAuth 2.0 Features
//!
//! - Grant Types:
//!   - [Authorization Code](https://openid.net/specs/openid-connect-core-1_0.html#CodeFlowAuth)
//!   - [Refresh Token](https://openid.net/specs/openid-connect-core-1_0.html#RefreshTokens)
//! - [User Info](https://openid.net/specs/openid-connect-core-1_0.html#UserInfo)
//! - [PKCE](https://www.rfc-editor.org/rfc/rfc7636)
//! - [Discovery](https://openid.net/specs/openid-connect-discovery-1_0.html)
//! - ID Token verification against a remote JWKS
//! - [Sign in with Apple] client secrets
//!
//! [OAuth 2.0]: https://oauth.net/2/
//! [OpenID Connect]: https://openid.net/connect/
//! [Sign in with Apple]: https://developer.apple.com/documentation/sign_in_with_apple

#![deny(missing_docs)]
#![allow(clippy::module_name_repetitions, clippy::implicit_hasher)]

pub mod error;
pub mod requests;
pub mod types;

#[doc(inline)]
pub use social_jose as jose;
