//! Common Test Utilities for Integration Tests
//!
//! A mock build endpoint served by axum on an ephemeral port, plus helpers
//! to point a generator at it.

#![allow(dead_code)]

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use velox_bench::{Generator, HttpTransport, RequestTemplate, RunMetrics};

pub const BUILD_PATH: &str = "/api.service.v1.BuildService/Build";

/// What the mock answers with
#[derive(Debug, Clone)]
pub struct MockReply {
    pub status: StatusCode,
    pub body: String,
    pub content_type: &'static str,
    pub delay: Duration,
}

impl MockReply {
    /// 200 `{"ok":true}` as JSON after 50ms
    pub fn ok() -> Self {
        Self {
            status: StatusCode::OK,
            body: r#"{"ok":true}"#.to_string(),
            content_type: "application/json",
            delay: Duration::from_millis(50),
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    pub fn with_content_type(mut self, content_type: &'static str) -> Self {
        self.content_type = content_type;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// A request as the mock received it
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub body: serde_json::Value,
    pub content_type: Option<String>,
    pub accept: Option<String>,
}

#[derive(Clone)]
struct MockState {
    reply: MockReply,
    received: Arc<Mutex<Vec<ReceivedRequest>>>,
}

/// Running mock build service
pub struct MockBuildService {
    pub url: String,
    pub received: Arc<Mutex<Vec<ReceivedRequest>>>,
}

impl MockBuildService {
    pub async fn start(reply: MockReply) -> Self {
        let received = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            reply,
            received: received.clone(),
        };

        let app = Router::new()
            .route(BUILD_PATH, post(build))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}{}", addr, BUILD_PATH),
            received,
        }
    }

    pub async fn requests(&self) -> Vec<ReceivedRequest> {
        self.received.lock().await.clone()
    }
}

async fn build(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let header_str = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    };

    state.received.lock().await.push(ReceivedRequest {
        body,
        content_type: header_str(header::CONTENT_TYPE),
        accept: header_str(header::ACCEPT),
    });

    tokio::time::sleep(state.reply.delay).await;

    (
        state.reply.status,
        [(header::CONTENT_TYPE, state.reply.content_type)],
        state.reply.body.clone(),
    )
        .into_response()
}

/// Generator wired to `url` with the built-in template and fresh metrics
pub fn generator_for(url: &str, timeout: Duration) -> Generator {
    let transport = HttpTransport::new(url.parse().unwrap(), timeout).unwrap();
    Generator::new(
        Arc::new(RequestTemplate::default()),
        Arc::new(transport),
        Arc::new(RunMetrics::new()),
    )
}

/// Initialize test logging for detailed output
pub fn init_test_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "velox_bench=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}
