//! Remote collector transport.
//!
//! Serializes the event into a compact binary form (CBOR), compresses it
//! (zlib), base64-encodes the result and POSTs it as form data alongside
//! the access key to each configured endpoint. Delivery is at-most-once:
//! a failed endpoint is logged (with the response body when available)
//! and the event's message is re-emitted through local logging at its
//! original severity, then the loop continues to the next endpoint.

use std::io::Write;

use base64::Engine;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use reqwest::Url;
use thiserror::Error;

use crate::config::{resolve_env_vars, RemoteConfig, SecretString};
use crate::error::ConfigError;
use crate::event::{Event, Level};
use crate::transport::CaptureOutcome;

/// Failures while encoding an event for the wire. Never propagated;
/// an encode failure is treated like an unreachable endpoint.
#[derive(Error, Debug)]
enum EncodeError {
    #[error("serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("binary encoding failed: {0}")]
    Cbor(#[from] ciborium::ser::Error<std::io::Error>),
    #[error("compression failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Transport for one or more remote collector endpoints.
///
/// Every event is sent to every endpoint; one endpoint's failure never
/// aborts the others. The shared HTTP client carries the configured
/// per-request timeout, so no send blocks indefinitely.
pub struct RemoteTransport {
    client: reqwest::Client,
    endpoints: Vec<Url>,
    key: SecretString,
}

impl RemoteTransport {
    /// Build a transport from the remote configuration.
    ///
    /// `${VAR}` placeholders in endpoint URLs and the access key are
    /// resolved here, and the resolved URLs validated.
    ///
    /// # Errors
    /// Returns [`ConfigError`] for unresolvable placeholders, malformed
    /// endpoint URLs, or an HTTP client that fails to initialize.
    pub fn new(config: &RemoteConfig) -> Result<Self, ConfigError> {
        let mut endpoints = Vec::with_capacity(config.endpoints.len());
        for url in &config.endpoints {
            let resolved = resolve_env_vars(url)?;
            let parsed = Url::parse(&resolved).map_err(|e| ConfigError::InvalidEndpoint {
                url: url.clone(),
                message: e.to_string(),
            })?;
            endpoints.push(parsed);
        }

        let key = SecretString::new(resolve_env_vars(config.key.expose())?);

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                ConfigError::ValidationError(format!("failed to build HTTP client: {}", e))
            })?;

        tracing::debug!(
            endpoint_count = endpoints.len(),
            timeout_secs = config.timeout.as_secs(),
            "Remote transport configured"
        );

        Ok(Self {
            client,
            endpoints,
            key,
        })
    }

    /// Transport with an explicit client and endpoints (for testing).
    #[cfg(test)]
    pub(crate) fn with_parts(client: reqwest::Client, endpoints: Vec<Url>, key: SecretString) -> Self {
        Self {
            client,
            endpoints,
            key,
        }
    }

    /// Send an event to every configured endpoint.
    ///
    /// Never fails: per-endpoint errors are logged, the event's message
    /// is re-emitted locally at its original severity, and the remaining
    /// endpoints are still attempted.
    pub async fn send(&self, event: &Event) -> CaptureOutcome {
        let attempted = self.endpoints.len();

        let body = match encode(event) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode event for remote transport");
                relog_event(event);
                return CaptureOutcome::Sent {
                    attempted,
                    delivered: 0,
                };
            }
        };

        let mut delivered = 0;
        for url in &self.endpoints {
            let form = [("data", body.as_str()), ("key", self.key.expose())];
            match self.client.post(url.clone()).form(&form).send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!(remote_url = %url, "Event delivered to collector");
                    metrics::counter!("faultline_events_sent_total").increment(1);
                    delivered += 1;
                }
                Ok(response) => {
                    let status = response.status();
                    let response_body = response.text().await.unwrap_or_default();
                    tracing::error!(
                        remote_url = %url,
                        status = %status,
                        body = %response_body,
                        "Unable to reach collector"
                    );
                    relog_event(event);
                    metrics::counter!(
                        "faultline_send_errors_total",
                        "kind" => "http"
                    )
                    .increment(1);
                }
                Err(e) => {
                    tracing::error!(remote_url = %url, error = %e, "Unable to reach collector");
                    relog_event(event);
                    metrics::counter!(
                        "faultline_send_errors_total",
                        "kind" => "network"
                    )
                    .increment(1);
                }
            }
        }

        CaptureOutcome::Sent {
            attempted,
            delivered,
        }
    }
}

impl std::fmt::Debug for RemoteTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never expose the access key in debug output.
        f.debug_struct("RemoteTransport")
            .field("endpoint_count", &self.endpoints.len())
            .finish()
    }
}

/// Serialize → compress → base64 the wire payload.
fn encode(event: &Event) -> Result<String, EncodeError> {
    let value = serde_json::to_value(event)?;

    let mut cbor = Vec::new();
    ciborium::ser::into_writer(&value, &mut cbor)?;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&cbor)?;
    let compressed = encoder.finish()?;

    Ok(base64::engine::general_purpose::STANDARD.encode(compressed))
}

/// Best-effort local fallback: re-emit the event's message at its
/// original severity so a failed delivery is not silently dropped.
fn relog_event(event: &Event) {
    let message = event.message.as_deref().unwrap_or("");
    match event.level.unwrap_or(Level::Error) {
        Level::Debug => tracing::debug!("{}", message),
        Level::Info => tracing::info!("{}", message),
        Level::Warning => tracing::warn!("{}", message),
        Level::Error | Level::Fatal => tracing::error!("{}", message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::time::Duration;

    fn decode(wire: &str) -> serde_json::Value {
        let compressed = base64::engine::general_purpose::STANDARD
            .decode(wire)
            .unwrap();
        let mut decoder = flate2::read::ZlibDecoder::new(compressed.as_slice());
        let mut cbor = Vec::new();
        decoder.read_to_end(&mut cbor).unwrap();
        ciborium::de::from_reader(cbor.as_slice()).unwrap()
    }

    #[test]
    fn encode_round_trips_through_the_wire_stack() {
        let mut event = Event::new();
        event.message = Some("connection refused".to_string());
        event.level = Some(Level::Error);
        event.server_name = Some("web-01".to_string());

        let wire = encode(&event).unwrap();
        let value = decode(&wire);

        assert_eq!(value["message"], "connection refused");
        assert_eq!(value["level"], "error");
        assert_eq!(value["server_name"], "web-01");
    }

    #[test]
    fn encode_omits_unset_fields() {
        let event = Event::new();
        let value = decode(&encode(&event).unwrap());
        let obj = value.as_object().unwrap();
        assert!(!obj.contains_key("message"));
        assert!(!obj.contains_key("class_name"));
    }

    #[test]
    fn transport_construction_rejects_bad_urls() {
        let config = RemoteConfig {
            endpoints: vec!["not a url".to_string()],
            key: SecretString::new("k".to_string()),
            timeout: Duration::from_secs(1),
        };
        let err = RemoteTransport::new(&config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEndpoint { .. }));
    }

    #[test]
    fn debug_output_hides_the_key() {
        let transport = RemoteTransport::with_parts(
            reqwest::Client::new(),
            vec![Url::parse("https://collector.example.com/store/").unwrap()],
            SecretString::new("sekrit-key".to_string()),
        );
        let debug = format!("{:?}", transport);
        assert!(!debug.contains("sekrit-key"));
        assert!(debug.contains("endpoint_count"));
    }
}
