//! Client for the AEMET OpenData climatological API (daily values).
//!
//! AEMET answers every request with an envelope whose `datos` field points at
//! the actual document; the client follows it within the same fetch.

use crate::credentials::CredentialStore;
use crate::providers::error::ProviderError;
use crate::providers::http::{api_key, get_json};
use crate::providers::traits::{FetchQuery, ProviderClient};
use crate::types::payload::RawPayload;
use crate::types::provider_kind::ProviderKind;
use async_trait::async_trait;
use chrono::NaiveDate;
use log::info;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::OnceCell;

const DATA_KEY: &str = "datos";

pub struct AemetClient {
    http: Client,
    base_url: String,
    station: String,
    credentials: Arc<dyn CredentialStore>,
    api_key: OnceCell<String>,
}

impl AemetClient {
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        station: impl Into<String>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            station: station.into(),
            credentials,
            api_key: OnceCell::new(),
        }
    }

    pub(crate) fn daily_path(station: &str, date: NaiveDate) -> String {
        let day = date.format("%Y-%m-%d");
        format!(
            "/api/valores/climatologicos/diarios/datos/fechaini/{day}T00:00:00UTC/fechafin/{day}T23:59:59UTC/estacion/{station}"
        )
    }

    /// Requests `path` and follows the envelope's `datos` link.
    async fn get_data(&self, path: &str) -> Result<RawPayload, ProviderError> {
        let key = api_key(&self.api_key, self.credentials.as_ref(), ProviderKind::Aemet).await?;
        let url = format!("{}{}", self.base_url, path);
        let request = self
            .http
            .get(&url)
            .header("cache-control", "no-cache")
            .query(&[("api_key", key)]);
        let envelope = get_json(ProviderKind::Aemet, request, &url).await?;

        let estado = envelope.get("estado").and_then(Value::as_u64);
        let reason = envelope
            .get("descripcion")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        match estado {
            Some(404) => {
                info!("No data for {}: {}", url, reason);
                return Ok(RawPayload::empty());
            }
            Some(401) => {
                return Err(ProviderError::Auth {
                    provider: ProviderKind::Aemet,
                    reason,
                })
            }
            Some(code) if !(200..300).contains(&code) => {
                return Err(ProviderError::Upstream {
                    url,
                    status: u16::try_from(code).unwrap_or(u16::MAX),
                    reason,
                })
            }
            _ => {}
        }

        let data_url = envelope
            .get(DATA_KEY)
            .and_then(Value::as_str)
            .ok_or_else(|| ProviderError::Decode {
                url: url.clone(),
                source: serde::de::Error::custom("envelope has no 'datos' link"),
            })?;
        let data = get_json(ProviderKind::Aemet, self.http.get(data_url), data_url).await?;
        Ok(RawPayload(data))
    }

    /// Inventory entry of one station.
    pub async fn specific_station_metadata(
        &self,
        station_code: &str,
    ) -> Result<RawPayload, ProviderError> {
        self.get_data(&format!(
            "/api/valores/climatologicos/inventarioestaciones/estaciones/{station_code}"
        ))
        .await
    }

    /// Inventory of every AEMET station.
    pub async fn all_stations(&self) -> Result<RawPayload, ProviderError> {
        self.get_data("/api/valores/climatologicos/inventarioestaciones/todasestaciones")
            .await
    }
}

#[async_trait]
impl ProviderClient for AemetClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Aemet
    }

    fn station(&self) -> &str {
        &self.station
    }

    async fn authenticate(&self) -> Result<(), ProviderError> {
        api_key(&self.api_key, self.credentials.as_ref(), ProviderKind::Aemet).await?;
        Ok(())
    }

    async fn fetch(&self, query: &FetchQuery) -> Result<RawPayload, ProviderError> {
        self.get_data(&Self::daily_path(&self.station, query.date))
            .await
    }

    async fn station_metadata(&self) -> Result<RawPayload, ProviderError> {
        self.specific_station_metadata(&self.station).await
    }
}
