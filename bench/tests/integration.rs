//! Integration Tests for the velox load generator
//!
//! These drive the real HTTP transport against a mock build service and
//! check the whole path from request generation to the final verdict.

use axum::http::StatusCode;
use std::collections::HashSet;
use std::time::Duration;
use velox_bench::payload::{PLATFORMS, default_plugins};
use velox_bench::threshold::Threshold;
use velox_bench::{Report, Runner, Scenario};

mod common;
use common::*;

const TIMEOUT: Duration = Duration::from_secs(120);

fn single_iteration() -> Scenario {
    Scenario::PerVuIterations {
        vus: 1,
        iterations: 1,
        max_duration: Duration::from_secs(60),
    }
}

// ============================================================================
// End-to-end runs
// ============================================================================

mod end_to_end {
    use super::*;

    #[tokio::test]
    async fn test_single_successful_iteration() {
        init_test_logging();
        let mock = MockBuildService::start(MockReply::ok()).await;
        let generator = generator_for(&mock.url, TIMEOUT);

        let result = Runner::new(generator, single_iteration()).run().await;

        assert_eq!(result.snapshot.iterations.count, 1);
        assert_eq!(result.snapshot.errors.hits, 0);
        assert_eq!(result.snapshot.errors.total, 1);
        assert_eq!(result.snapshot.errors.rate, 0.0);
        assert!(result.snapshot.http_req_duration.max >= 50.0);

        let report = Report::new(&mock.url, result, &Threshold::defaults());
        assert!(report.passed);
        assert_eq!(report.exit_status(), 0);
        assert_eq!(mock.requests().await.len(), 1);
    }

    #[tokio::test]
    async fn test_single_failing_iteration() {
        init_test_logging();
        let mock = MockBuildService::start(
            MockReply::ok()
                .with_status(StatusCode::INTERNAL_SERVER_ERROR)
                .with_body(r#"{"error":"build failed"}"#),
        )
        .await;
        let generator = generator_for(&mock.url, TIMEOUT);

        let outcome = generator.generate_and_send().await;
        assert!(!outcome.passed());
        assert_eq!(outcome.status, Some(500));
        assert!(!outcome.checks.status_ok);
        assert!(outcome.checks.has_body);
        assert!(outcome.checks.json_content_type);

        let diagnostic = outcome.diagnostic.expect("failure should be logged");
        assert!(diagnostic.contains(&outcome.request_id));
        assert!(diagnostic.contains(&outcome.platform.to_string()));
        assert!(diagnostic.contains("status=500"));

        let snapshot = generator.metrics().snapshot(Duration::from_secs(1)).await;
        assert_eq!(snapshot.errors.hits, 1);
        assert_eq!(snapshot.errors.rate, 1.0);
    }

    #[tokio::test]
    async fn test_failing_run_breaches_thresholds() {
        let mock = MockBuildService::start(
            MockReply::ok().with_status(StatusCode::INTERNAL_SERVER_ERROR),
        )
        .await;
        let generator = generator_for(&mock.url, TIMEOUT);

        let result = Runner::new(generator, single_iteration()).run().await;
        let report = Report::new(&mock.url, result, &Threshold::defaults());

        assert!(!report.passed);
        assert_eq!(report.exit_status(), 99);
        let failed: Vec<_> = report
            .thresholds
            .iter()
            .filter(|t| !t.passed)
            .map(|t| t.metric.as_str())
            .collect();
        assert_eq!(failed, vec!["http_req_failed", "errors"]);
    }

    #[tokio::test]
    async fn test_concurrent_workers_send_unique_requests() {
        let mock = MockBuildService::start(MockReply::ok().with_delay(Duration::from_millis(5))).await;
        let generator = generator_for(&mock.url, TIMEOUT);

        let result = Runner::new(
            generator,
            Scenario::ConstantVus {
                vus: 4,
                duration: Duration::from_millis(400),
            },
        )
        .run()
        .await;

        let requests = mock.requests().await;
        assert_eq!(requests.len() as u64, result.snapshot.http_reqs.count);
        assert!(requests.len() >= 4);

        let expected_plugins = serde_json::to_value(default_plugins()).unwrap();
        let mut ids = HashSet::new();
        for request in &requests {
            let body = &request.body;
            assert!(ids.insert(body["request_id"].as_str().unwrap().to_string()));

            let platform = serde_json::from_value(body["target_platform"].clone()).unwrap();
            assert!(PLATFORMS.contains(&platform));

            assert_eq!(body["plugins"], expected_plugins);
            assert_eq!(body["force_rebuild"], true);
            assert_eq!(body["rr_version"], "v2025.1.2");
        }
        assert_eq!(result.snapshot.errors.hits, 0);
    }
}

// ============================================================================
// Request shape
// ============================================================================

mod request_shape {
    use super::*;

    #[tokio::test]
    async fn test_json_headers_are_sent() {
        let mock = MockBuildService::start(MockReply::ok().with_delay(Duration::ZERO)).await;
        let generator = generator_for(&mock.url, TIMEOUT);

        generator.generate_and_send().await;

        let requests = mock.requests().await;
        assert_eq!(requests[0].content_type.as_deref(), Some("application/json"));
        assert_eq!(requests[0].accept.as_deref(), Some("application/json"));
    }

    #[tokio::test]
    async fn test_body_has_exact_field_set() {
        let mock = MockBuildService::start(MockReply::ok().with_delay(Duration::ZERO)).await;
        let generator = generator_for(&mock.url, TIMEOUT);

        generator.generate_and_send().await;

        let requests = mock.requests().await;
        let body = requests[0].body.as_object().unwrap();
        let mut keys: Vec<_> = body.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(
            keys,
            vec!["force_rebuild", "plugins", "request_id", "rr_version", "target_platform"]
        );
        let platform = body["target_platform"].as_object().unwrap();
        assert_eq!(platform.len(), 2);
        assert!(platform.contains_key("os"));
        assert!(platform.contains_key("arch"));
    }
}

// ============================================================================
// Failure classification
// ============================================================================

mod failures {
    use super::*;

    #[tokio::test]
    async fn test_wrong_content_type_fails() {
        let mock = MockBuildService::start(
            MockReply::ok()
                .with_content_type("text/plain")
                .with_delay(Duration::ZERO),
        )
        .await;
        let generator = generator_for(&mock.url, TIMEOUT);

        let outcome = generator.generate_and_send().await;
        assert!(!outcome.passed());
        assert!(outcome.checks.status_ok);
        assert!(!outcome.checks.json_content_type);

        // Status was fine, so the request itself did not fail
        let snapshot = generator.metrics().snapshot(Duration::from_secs(1)).await;
        assert_eq!(snapshot.http_req_failed.hits, 0);
        assert_eq!(snapshot.errors.hits, 1);
    }

    #[tokio::test]
    async fn test_empty_body_fails() {
        let mock = MockBuildService::start(
            MockReply::ok().with_body("").with_delay(Duration::ZERO),
        )
        .await;
        let generator = generator_for(&mock.url, TIMEOUT);

        let outcome = generator.generate_and_send().await;
        assert!(!outcome.passed());
        assert!(!outcome.checks.has_body);
    }

    #[tokio::test]
    async fn test_request_timeout_is_transport_failure() {
        let mock = MockBuildService::start(MockReply::ok().with_delay(Duration::from_secs(5))).await;
        let generator = generator_for(&mock.url, Duration::from_millis(200));

        let outcome = generator.generate_and_send().await;
        assert!(!outcome.passed());
        assert_eq!(outcome.status, None);
        assert_eq!(outcome.checks.failed_checks().len(), 4);
        assert!(outcome.diagnostic.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_connection_refused_does_not_abort_run() {
        // Bind then drop to get a port nothing listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = format!("http://{}{}", addr, BUILD_PATH);
        let generator = generator_for(&url, TIMEOUT);

        let result = Runner::new(
            generator,
            Scenario::PerVuIterations {
                vus: 2,
                iterations: 3,
                max_duration: Duration::from_secs(60),
            },
        )
        .run()
        .await;

        assert_eq!(result.snapshot.iterations.count, 6);
        assert_eq!(result.snapshot.errors.hits, 6);
        assert_eq!(result.snapshot.http_req_failed.hits, 6);
        assert_eq!(result.snapshot.http_req_duration.count, 0);
    }
}
