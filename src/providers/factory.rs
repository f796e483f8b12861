use crate::config::{ConfigError, WeatherConfig};
use crate::credentials::CredentialStore;
use crate::providers::aemet::AemetClient;
use crate::providers::http::build_client;
use crate::providers::meteocat::MeteocatClient;
use crate::providers::traits::ProviderClient;
use crate::types::provider_kind::ProviderKind;
use log::debug;
use std::sync::Arc;

/// Builds the client for `config.service`.
pub fn create_provider(
    config: &WeatherConfig,
    credentials: Arc<dyn CredentialStore>,
) -> Result<Arc<dyn ProviderClient>, ConfigError> {
    let http = build_client(config.request_timeout()).map_err(ConfigError::HttpClient)?;
    debug!(
        "Creating {} client for station {} at {}",
        config.service,
        config.station(),
        config.base_url()
    );
    let provider: Arc<dyn ProviderClient> = match config.service {
        ProviderKind::Aemet => Arc::new(AemetClient::new(
            http,
            config.base_url(),
            config.station(),
            credentials,
        )),
        ProviderKind::Meteocat => Arc::new(MeteocatClient::new(
            http,
            config.base_url(),
            config.station(),
            credentials,
        )),
    };
    Ok(provider)
}
