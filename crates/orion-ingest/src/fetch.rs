//! HTTP transport to the MicroServer

use crate::FetchError;
use reqwest::header::USER_AGENT;
use reqwest::{Client, Url};
use std::time::Duration;

/// Resource path of the enhanced (unit-tagged) current-data document.
pub const ENHANCED_DATA_PATH: &str = "/tmp/latestsampledata_u.xml";

/// One-shot document fetch. `StationClient` is the real transport; tests
/// substitute a scripted fake. No retrying happens at this layer.
#[async_trait::async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self) -> Result<Vec<u8>, FetchError>;
}

/// HTTP client bound to one station endpoint for the process lifetime.
#[derive(Debug)]
pub struct StationClient {
    client: Client,
    url: Url,
}

impl StationClient {
    const USER_AGENT: &'static str = concat!("orion-bridge/", env!("CARGO_PKG_VERSION"));

    pub fn new(host: &str, port: u16, timeout: Duration) -> Result<Self, FetchError> {
        if host.is_empty() {
            return Err(FetchError::InvalidEndpoint("empty host".to_string()));
        }
        if port == 0 {
            return Err(FetchError::InvalidEndpoint("port must be 1-65535".to_string()));
        }
        if timeout.is_zero() {
            return Err(FetchError::InvalidEndpoint(
                "request timeout must be positive".to_string(),
            ));
        }
        let url = Url::parse(&format!("http://{host}:{port}{ENHANCED_DATA_PATH}"))
            .map_err(|e| FetchError::InvalidEndpoint(e.to_string()))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::InvalidEndpoint(e.to_string()))?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait::async_trait]
impl Fetch for StationClient {
    async fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        tracing::debug!(url = %self.url, "requesting enhanced data");

        let response = self
            .client
            .get(self.url.clone())
            .header(USER_AGENT, Self::USER_AGENT)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let body = response.bytes().await.map_err(classify)?;
        if body.is_empty() {
            return Err(FetchError::EmptyBody);
        }
        Ok(body.to_vec())
    }
}

fn classify(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout
    } else if let Some(status) = error.status() {
        FetchError::HttpStatus(status.as_u16())
    } else {
        FetchError::Unreachable(error.to_string())
    }
}
