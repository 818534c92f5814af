//! HTTP transport for build requests
//!
//! The generator only sees the `Transport` trait so tests can swap in an
//! in-memory endpoint.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Url};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Transport-level failures. None of these carry a response.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

/// A fully received response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Raw `Content-Type` header, if the server sent one
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    /// Time from sending the request to reading the last body byte
    pub elapsed: Duration,
}

impl HttpResponse {
    /// Body decoded for display, replacing invalid UTF-8
    pub fn body_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Something that can deliver a JSON body to the build endpoint
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST a JSON body to the target endpoint
    async fn post_json(&self, body: Vec<u8>) -> Result<HttpResponse, TransportError>;

    /// Endpoint requests are sent to, for logging
    fn target(&self) -> &str;
}

/// `reqwest`-backed transport used for real runs
pub struct HttpTransport {
    client: Client,
    url: Url,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .pool_max_idle_per_host(200)
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self {
            client,
            url,
            timeout,
        })
    }

    fn classify(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(&self, body: Vec<u8>) -> Result<HttpResponse, TransportError> {
        let start = Instant::now();

        let resp = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = resp.bytes().await.map_err(|e| self.classify(e))?;

        Ok(HttpResponse {
            status,
            content_type,
            body: body.to_vec(),
            elapsed: start.elapsed(),
        })
    }

    fn target(&self) -> &str {
        self.url.as_str()
    }
}
