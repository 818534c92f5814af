//! Per-iteration request generation and validation

use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, warn};

use crate::check::CheckResult;
use crate::payload::{PlatformSpec, RequestTemplate};
use crate::stats::{IterationSample, ResponseSample, RunMetrics};
use crate::transport::Transport;

/// Characters of the response body kept in failure diagnostics
pub const DIAGNOSTIC_BODY_CHARS: usize = 200;

/// What one iteration produced
#[derive(Debug, Clone)]
pub struct IterationOutcome {
    pub request_id: String,
    pub platform: PlatformSpec,
    /// `None` when no response arrived
    pub status: Option<u16>,
    pub elapsed: Duration,
    pub checks: CheckResult,
    /// Logged message, present only for failed iterations
    pub diagnostic: Option<String>,
}

impl IterationOutcome {
    pub fn passed(&self) -> bool {
        self.checks.passed()
    }
}

/// Stamps requests from the shared template, sends them and records results.
///
/// Cheap to clone; every field is shared read-only except the metric
/// registry, which only takes atomic increments.
#[derive(Clone)]
pub struct Generator {
    template: Arc<RequestTemplate>,
    transport: Arc<dyn Transport>,
    metrics: Arc<RunMetrics>,
}

impl Generator {
    pub fn new(
        template: Arc<RequestTemplate>,
        transport: Arc<dyn Transport>,
        metrics: Arc<RunMetrics>,
    ) -> Self {
        Self {
            template,
            transport,
            metrics,
        }
    }

    pub fn template(&self) -> &RequestTemplate {
        &self.template
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub fn metrics(&self) -> &Arc<RunMetrics> {
        &self.metrics
    }

    /// Run one iteration: build a request, send it, check the response.
    ///
    /// Never fails; every problem ends up in the returned checks, the
    /// metric registry and a `warn!` diagnostic.
    pub async fn generate_and_send(&self) -> IterationOutcome {
        let iteration_start = Instant::now();

        let (request_id, platform, body) = {
            let mut rng = rand::rng();
            let request = self.template.generate(&mut rng);
            let body = serde_json::to_vec(&request);
            (request.request_id, request.target_platform, body)
        };

        let (sent, result) = match body {
            Ok(body) => {
                let sent = body.len() as u64;
                let result = self.transport.post_json(body).await;
                (Some(sent), result.map_err(|e| e.to_string()))
            }
            Err(e) => {
                error!("Failed to serialize build request {}: {}", request_id, e);
                (None, Err(format!("serialization failed: {}", e)))
            }
        };

        let (checks, response, elapsed, detail) = match &result {
            Ok(resp) => {
                let text = resp.body_text();
                let preview = truncate_chars(&text, DIAGNOSTIC_BODY_CHARS);
                (
                    CheckResult::evaluate(resp),
                    Some(ResponseSample {
                        status: resp.status,
                        received: resp.body.len() as u64,
                        duration: resp.elapsed,
                    }),
                    resp.elapsed,
                    format!("body={:?}...", preview),
                )
            }
            Err(e) => (
                CheckResult::transport_failure(),
                None,
                iteration_start.elapsed(),
                format!("error={}", e),
            ),
        };
        let status = response.map(|r| r.status);
        let passed = checks.passed();

        // Counted on completion so iterations aborted at shutdown leave no trace
        self.metrics
            .record_iteration(&IterationSample {
                sent,
                response,
                checks,
                duration: iteration_start.elapsed(),
            })
            .await;

        let os = platform.os.as_str();
        let arch = platform.arch.as_str();
        counter!("velox_bench_requests_total", "os" => os, "arch" => arch).increment(1);
        histogram!("velox_bench_request_duration_seconds", "os" => os, "arch" => arch)
            .record(elapsed);

        let diagnostic = if passed {
            None
        } else {
            counter!("velox_bench_request_failures_total", "os" => os, "arch" => arch)
                .increment(1);
            let message = format!(
                "Request failed: status={} duration={:.1}ms {} request_id={} platform={} failed_checks={:?}",
                status.unwrap_or(0),
                elapsed.as_secs_f64() * 1000.0,
                detail,
                request_id,
                platform,
                checks.failed_checks(),
            );
            warn!("{}", message);
            Some(message)
        };

        IterationOutcome {
            request_id,
            platform,
            status,
            elapsed,
            checks,
            diagnostic,
        }
    }
}

/// First `max` characters of `text`, never splitting a code point
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
