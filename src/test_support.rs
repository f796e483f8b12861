//! Fakes shared by the unit tests.

use crate::providers::error::ProviderError;
use crate::providers::traits::{FetchQuery, ProviderClient};
use crate::types::payload::RawPayload;
use crate::types::provider_kind::ProviderKind;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
enum Scripted {
    Payload(Value),
    Status(u16),
    Refused,
}

/// Provider answering from a fixed script keyed by date and variable code.
/// Unscripted queries get an empty payload.
pub(crate) struct FakeProvider {
    kind: ProviderKind,
    script: HashMap<(NaiveDate, Option<&'static str>), Scripted>,
    delay: Duration,
    auth_fails: bool,
    fetches: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeProvider {
    fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            script: HashMap::new(),
            delay: Duration::ZERO,
            auth_fails: false,
            fetches: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub(crate) fn daily() -> Self {
        Self::new(ProviderKind::Aemet)
    }

    pub(crate) fn hourly() -> Self {
        Self::new(ProviderKind::Meteocat)
    }

    pub(crate) fn with_payload(
        mut self,
        date: NaiveDate,
        code: Option<&'static str>,
        payload: Value,
    ) -> Self {
        self.script.insert((date, code), Scripted::Payload(payload));
        self
    }

    pub(crate) fn with_status(mut self, date: NaiveDate, code: Option<&'static str>, status: u16) -> Self {
        self.script.insert((date, code), Scripted::Status(status));
        self
    }

    pub(crate) fn with_transport_error(mut self, date: NaiveDate, code: Option<&'static str>) -> Self {
        self.script.insert((date, code), Scripted::Refused);
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn failing_auth(mut self) -> Self {
        self.auth_fails = true;
        self
    }

    pub(crate) fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderClient for FakeProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn station(&self) -> &str {
        "TEST"
    }

    async fn authenticate(&self) -> Result<(), ProviderError> {
        if self.auth_fails {
            return Err(ProviderError::Auth {
                provider: self.kind,
                reason: "no API key".to_string(),
            });
        }
        Ok(())
    }

    async fn fetch(&self, query: &FetchQuery) -> Result<RawPayload, ProviderError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let url = format!("fake://{}/{}", query.date, query.variable.map_or("all", |v| v.code));
        match self.script.get(&(query.date, query.variable.map(|v| v.code))) {
            Some(Scripted::Payload(value)) => Ok(RawPayload(value.clone())),
            Some(Scripted::Status(status)) => Err(ProviderError::Upstream {
                url,
                status: *status,
                reason: "Scripted".to_string(),
            }),
            Some(Scripted::Refused) => Err(ProviderError::transport(
                &url,
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused"),
            )),
            None => Ok(RawPayload::empty()),
        }
    }

    async fn station_metadata(&self) -> Result<RawPayload, ProviderError> {
        Ok(RawPayload(json!([{"indicativo": "TEST", "nombre": "Test station"}])))
    }
}

/// AEMET daily document for `date` with the given temperature extremes.
pub(crate) fn aemet_record(date: NaiveDate, tmin: f64, tmax: f64) -> Value {
    let comma = |v: f64| format!("{v:.1}").replace('.', ",");
    json!([{
        "fecha": date.format("%Y-%m-%d").to_string(),
        "indicativo": "TEST",
        "tmin": comma(tmin),
        "tmax": comma(tmax),
        "prec": "0,0",
        "presMin": "1010,0",
        "presMax": "1020,0",
        "hrMedia": "70",
        "velmedia": "2,5"
    }])
}

/// Meteocat readings document with one validated reading per `(utc_hour, value)`.
pub(crate) fn meteocat_readings(date: NaiveDate, readings: &[(u32, f64)]) -> Value {
    let lectures: Vec<Value> = readings
        .iter()
        .map(|(hour, value)| {
            json!({
                "data": format!("{}T{:02}:00Z", date.format("%Y-%m-%d"), hour),
                "valor": value,
                "estat": "V",
                "baseHoraria": "SH"
            })
        })
        .collect();
    json!({"codi": "TEST", "lectures": lectures})
}

/// Local HTTP responder serving canned responses, one connection each.
pub(crate) struct MockServer {
    pub base_url: String,
    listener: TcpListener,
}

impl MockServer {
    pub(crate) async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        Self { base_url, listener }
    }

    /// Serves `responses` in order and resolves to the raw request heads received.
    pub(crate) fn respond(self, responses: Vec<(u16, String)>) -> JoinHandle<Vec<String>> {
        tokio::spawn(async move {
            let mut requests = Vec::with_capacity(responses.len());
            for (status, body) in responses {
                let (mut socket, _) = self.listener.accept().await.unwrap();
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = socket.read(&mut buf).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    head.extend_from_slice(&buf[..n]);
                }
                requests.push(String::from_utf8_lossy(&head).into_owned());
                let response = format!(
                    "HTTP/1.1 {status} Scripted\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
            }
            requests
        })
    }
}

/// Binds a server that answers a single request and returns its base URL.
pub(crate) async fn serve_once(status: u16, body: &str) -> String {
    let server = MockServer::bind().await;
    let base_url = server.base_url.clone();
    server.respond(vec![(status, body.to_string())]);
    base_url
}
