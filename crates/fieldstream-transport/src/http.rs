//! [`HttpTransport`]: JSON over HTTP to the solver service.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use fieldstream_core::{Batch, SimulationKind, SolveRequest, TransportError};

use crate::codec;
use crate::Transport;

/// Connection settings for [`HttpTransport`].
#[derive(Clone, Debug)]
pub struct TransportConfig {
    /// Scheme, host, and port of the solver service, without a
    /// trailing route. Default: `http://127.0.0.1:8000`.
    pub base_url: String,
    /// Per-request timeout covering connect, send, and body download.
    /// Default: 30 s.
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".into(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Solver transport over HTTP.
///
/// Each [`solve`](Transport::solve) is one `POST` to the route of the
/// request's domain. Failures are reported, never retried.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Build a transport with its own connection pool.
    pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TransportError::Network {
                reason: e.to_string(),
            })?;
        Ok(Self::with_client(client, config.base_url))
    }

    /// Build a transport around an existing client.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Full URL of the endpoint for `kind`.
    pub fn endpoint(&self, kind: SimulationKind) -> String {
        format!("{}{}", self.base_url, codec::route(kind))
    }
}

impl Transport for HttpTransport {
    async fn solve(&self, request: SolveRequest) -> Result<Batch, TransportError> {
        let body = codec::encode_request(&request)?;
        let url = self.endpoint(request.parameters.kind());
        debug!(%url, seeded = request.seed.is_some(), "posting solve request");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(from_reqwest)?;

        if !status.is_success() {
            return Err(TransportError::Http {
                status: status.as_u16(),
                detail: error_detail(&bytes),
            });
        }
        codec::decode_response(&request.parameters, &bytes)
    }
}

fn from_reqwest(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_decode() {
        TransportError::Decode {
            reason: e.to_string(),
        }
    } else {
        TransportError::Network {
            reason: e.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

/// The service's `detail` message, or the raw body when absent.
fn error_detail(body: &[u8]) -> String {
    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: serde_json::Value::String(s),
        }) => s,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) => String::from_utf8_lossy(body).into_owned(),
    }
}
