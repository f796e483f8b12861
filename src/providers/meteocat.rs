//! Client for the Meteocat XEMA API (sub-hourly readings, one variable per request).

use crate::credentials::CredentialStore;
use crate::providers::error::ProviderError;
use crate::providers::http::{api_key, get_json};
use crate::providers::traits::{FetchQuery, ProviderClient};
use crate::types::payload::RawPayload;
use crate::types::provider_kind::ProviderKind;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use reqwest::Client;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Meteocat code of air temperature, used to pick representative stations.
const TEMPERATURE_CODE: &str = "32";

pub struct MeteocatClient {
    http: Client,
    base_url: String,
    station: String,
    credentials: Arc<dyn CredentialStore>,
    api_key: OnceCell<String>,
}

impl MeteocatClient {
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

    pub(crate) fn readings_path(code: &str, station: &str, date: NaiveDate) -> String {
        format!(
            "/variables/mesurades/{}/{:04}/{:02}/{:02}?codiEstacio={}",
            code,
            date.year(),
            date.month(),
            date.day(),
            station
        )
    }

    async fn get(&self, path: &str) -> Result<RawPayload, ProviderError> {
        let key = api_key(&self.api_key, self.credentials.as_ref(), ProviderKind::Meteocat).await?;
        let url = format!("{}{}", self.base_url, path);
        let request = self
            .http
            .get(&url)
            .header("Content-Type", "application/json")
            .header("X-Api-Key", key);
        let value = get_json(ProviderKind::Meteocat, request, &url).await?;
        Ok(RawPayload(value))
    }

    /// Catalogue of the measured variables and their codes.
    pub async fn variable_codes(&self) -> Result<RawPayload, ProviderError> {
        self.get("/variables/mesurades/metadades").await
    }

    /// The station Meteocat considers representative for a municipality.
    pub async fn representative_station(&self, postcode: &str) -> Result<RawPayload, ProviderError> {
        self.get(&format!(
            "/representatives/metadades/municipis/{postcode}/variables/{TEMPERATURE_CODE}"
        ))
        .await
    }

    /// Yearly statistics of one variable at the configured station.
    pub async fn variable_statistics(&self, code: &str) -> Result<RawPayload, ProviderError> {
        self.get(&format!(
            "/variables/estadistics/anuals/{}?codiEstacio={}",
            code, self.station
        ))
        .await
    }

    /// Metadata of every station in `state` (e.g. `"ope"`) on `date`.
    pub async fn stations_metadata(
        &self,
        state: &str,
        date: NaiveDate,
    ) -> Result<RawPayload, ProviderError> {
        self.get(&format!(
            "/estacions/metadades?estat={}&data={}Z",
            state,
            date.format("%Y-%m-%d")
        ))
        .await
    }
}

#[async_trait]
impl ProviderClient for MeteocatClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Meteocat
    }

    fn station(&self) -> &str {
        &self.station
    }

    async fn authenticate(&self) -> Result<(), ProviderError> {
        api_key(&self.api_key, self.credentials.as_ref(), ProviderKind::Meteocat).await?;
        Ok(())
    }

    async fn fetch(&self, query: &FetchQuery) -> Result<RawPayload, ProviderError> {
        let variable = query.variable.ok_or(ProviderError::MissingVariable {
            provider: ProviderKind::Meteocat,
        })?;
        self.get(&Self::readings_path(variable.code, &self.station, query.date))
            .await
    }

    async fn station_metadata(&self) -> Result<RawPayload, ProviderError> {
        self.get(&format!("/estacions/{}/metadades", self.station))
            .await
    }
}
