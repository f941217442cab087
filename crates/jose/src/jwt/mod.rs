// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2022-2024 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

mod header;
mod raw;
mod signed;

pub use self::{
    header::JsonWebSignatureHeader,
    raw::{DecodeError as RawDecodeError, RawJwt},
    signed::{Jwt, JwtDecodeError, JwtSignatureError, JwtVerificationError, NoKeyWorked},
};
