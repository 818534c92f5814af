//! Response checks
//!
//! Every response is judged by four independent predicates; an iteration
//! succeeds only when all of them hold.

use std::time::Duration;

use crate::transport::HttpResponse;

/// Status code a successful build must return
pub const EXPECTED_STATUS: u16 = 200;
/// Responses must arrive strictly faster than this
pub const MAX_RESPONSE_TIME: Duration = Duration::from_millis(30_000);
/// Substring the response `Content-Type` must contain
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Individual response check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    Status,
    ResponseTime,
    HasBody,
    ContentType,
}

impl Check {
    pub const ALL: [Check; 4] = [
        Check::Status,
        Check::ResponseTime,
        Check::HasBody,
        Check::ContentType,
    ];

    /// Name shown in the summary
    pub fn name(&self) -> &'static str {
        match self {
            Check::Status => "status is 200",
            Check::ResponseTime => "response time < 30000ms",
            Check::HasBody => "response has body",
            Check::ContentType => "content-type is application/json",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Check::Status => 0,
            Check::ResponseTime => 1,
            Check::HasBody => 2,
            Check::ContentType => 3,
        }
    }
}

/// Outcome of all four checks for one response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckResult {
    pub status_ok: bool,
    pub latency_ok: bool,
    pub has_body: bool,
    pub json_content_type: bool,
}

impl CheckResult {
    /// Evaluate a received response
    pub fn evaluate(response: &HttpResponse) -> Self {
        Self {
            status_ok: response.status == EXPECTED_STATUS,
            latency_ok: response.elapsed < MAX_RESPONSE_TIME,
            has_body: !response.body.is_empty(),
            json_content_type: response
                .content_type
                .as_deref()
                .is_some_and(|ct| ct.contains(JSON_CONTENT_TYPE)),
        }
    }

    /// No response arrived, so nothing can pass
    pub fn transport_failure() -> Self {
        Self {
            status_ok: false,
            latency_ok: false,
            has_body: false,
            json_content_type: false,
        }
    }

    pub fn get(&self, check: Check) -> bool {
        match check {
            Check::Status => self.status_ok,
            Check::ResponseTime => self.latency_ok,
            Check::HasBody => self.has_body,
            Check::ContentType => self.json_content_type,
        }
    }

    pub fn passed(&self) -> bool {
        self.status_ok && self.latency_ok && self.has_body && self.json_content_type
    }

    /// Names of the checks that did not hold
    pub fn failed_checks(&self) -> Vec<&'static str> {
        Check::ALL
            .iter()
            .filter(|c| !self.get(**c))
            .map(|c| c.name())
            .collect()
    }
}
