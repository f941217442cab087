// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2022-2024 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! The concrete providers

pub mod apple;
pub mod azure;
pub mod linkedin;
pub mod openid_connect;
pub mod reddit;
pub mod shopify;
pub mod slack;
pub mod tiktok;

pub use self::{
    apple::Apple, azure::Azure, linkedin::LinkedIn, openid_connect::OpenIdConnect,
    reddit::Reddit, shopify::Shopify, slack::Slack, tiktok::TikTok,
};
