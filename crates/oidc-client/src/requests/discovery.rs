// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2022-2024 Kévin Commaille.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Requests for OpenID Connect Provider [Discovery].
//!
//! [Discovery]: https://openid.net/specs/openid-connect-discovery-1_0.html

use social_http::RequestBuilderExt;
use social_oauth2_types::oidc::{ProviderMetadata, VerifiedProviderMetadata};
use url::Url;

use crate::error::DiscoveryError;

/// The URL of the discovery document of an issuer.
///
/// The well-known path is appended to the path of the issuer, so that
/// issuers with a path, like Keycloak realms, are supported.
///
/// # Errors
///
/// Returns an error if the issuer is not a valid URL.
pub fn well_known_url(issuer: &str) -> Result<Url, DiscoveryError> {
    let mut url: Url = issuer.parse()?;

    // `join` would replace the last segment of a path without a trailing slash
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url.join(".well-known/openid-configuration")?)
}

/// Fetch the provider metadata of an issuer and validate it.
///
/// The `issuer` is kept as given: the one advertised in the metadata must be
/// exactly the same string, trailing slash included.
///
/// # Errors
///
/// Returns an error if the request fails or if the data is invalid.
#[tracing::instrument(skip_all, fields(issuer))]
pub async fn discover(
    client: &reqwest::Client,
    issuer: &str,
) -> Result<VerifiedProviderMetadata, DiscoveryError> {
    let url = well_known_url(issuer)?;
    tracing::debug!(%url, "Fetching provider metadata...");

    let metadata: ProviderMetadata = client
        .get(url.as_str())
        .send_traced()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let metadata = metadata.validate(issuer)?;
    tracing::debug!(
        pkce = metadata.supports_pkce_s256(),
        userinfo = metadata.userinfo_endpoint.is_some(),
        "Discovered provider"
    );

    Ok(metadata)
}
