//! Request plumbing shared by the provider clients.

use crate::credentials::CredentialStore;
use crate::providers::error::ProviderError;
use crate::types::provider_kind::ProviderKind;
use log::{debug, warn};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::OnceCell;

pub(crate) fn build_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder().timeout(timeout).build()
}

/// Returns the memoised API key, looking it up on first use.
pub(crate) async fn api_key<'a>(
    cell: &'a OnceCell<String>,
    credentials: &dyn CredentialStore,
    provider: ProviderKind,
) -> Result<&'a str, ProviderError> {
    let key = cell
        .get_or_try_init(|| async {
            match credentials.get_credential(provider.secret_name()) {
                Ok(Some(key)) if !key.trim().is_empty() => Ok(key),
                Ok(_) => Err(ProviderError::Auth {
                    provider,
                    reason: format!(
                        "no API key stored under '{}'",
                        provider.secret_name()
                    ),
                }),
                Err(e) => Err(ProviderError::Auth {
                    provider,
                    reason: e.to_string(),
                }),
            }
        })
        .await?;
    Ok(key.as_str())
}

/// Sends `request` and decodes a 2xx JSON body. `url` is only used for
/// reporting and must not contain secrets. Transport errors are stripped of
/// the request URL, which may carry a key in its query string.
pub(crate) async fn get_json(
    provider: ProviderKind,
    request: RequestBuilder,
    url: &str,
) -> Result<Value, ProviderError> {
    debug!("Downloading data for {}", url);
    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::transport(url, e.without_url()))?;

    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        warn!("{} rejected the {} credential ({})", url, provider, status);
        return Err(ProviderError::Auth {
            provider,
            reason: format!("request rejected with status {}", status.as_u16()),
        });
    }
    if !status.is_success() {
        let reason = status.canonical_reason().unwrap_or("Unknown").to_string();
        warn!("HTTP error for {}: {} {}", url, status.as_u16(), reason);
        return Err(ProviderError::Upstream {
            url: url.to_string(),
            status: status.as_u16(),
            reason,
        });
    }

    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::transport(url, e.without_url()))?;
    serde_json::from_str(&body).map_err(|source| ProviderError::Decode {
        url: url.to_string(),
        source,
    })
}
