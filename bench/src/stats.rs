//! Run-wide metric registry
//!
//! Rates and counters are plain atomics so any worker can record without
//! coordination. Trends keep every sample so percentiles are exact.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

use crate::check::{Check, CheckResult};

/// Fraction of observations that were true
#[derive(Debug, Default)]
pub struct Rate {
    hits: AtomicU64,
    total: AtomicU64,
}

impl Rate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, value: bool) {
        if value {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn summary(&self) -> RateSummary {
        let hits = self.hits.load(Ordering::Relaxed);
        let total = self.total.load(Ordering::Relaxed);
        RateSummary::new(hits, total)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateSummary {
    pub rate: f64,
    pub hits: u64,
    pub total: u64,
}

impl RateSummary {
    pub fn new(hits: u64, total: u64) -> Self {
        let rate = if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        };
        Self { rate, hits, total }
    }
}

/// Monotonic counter
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CounterSummary {
    pub count: u64,
    /// Per second over the run
    pub rate: f64,
}

/// Latency samples in milliseconds
#[derive(Debug, Default)]
pub struct Trend {
    samples: Mutex<Vec<f64>>,
}

impl Trend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, value: Duration) {
        self.samples.lock().await.push(millis(value));
    }

    pub async fn summary(&self) -> TrendSummary {
        let samples = self.samples.lock().await.clone();
        TrendSummary::from_samples(samples)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSummary {
    pub count: usize,
    pub avg: f64,
    pub min: f64,
    pub med: f64,
    pub max: f64,
    pub p90: f64,
    pub p95: f64,
    #[serde(skip)]
    sorted: Vec<f64>,
}

impl TrendSummary {
    pub fn from_samples(mut samples: Vec<f64>) -> Self {
        samples.sort_by(f64::total_cmp);

        let count = samples.len();
        let avg = if count > 0 {
            samples.iter().sum::<f64>() / count as f64
        } else {
            0.0
        };

        let mut summary = Self {
            count,
            avg,
            min: samples.first().copied().unwrap_or(0.0),
            med: 0.0,
            max: samples.last().copied().unwrap_or(0.0),
            p90: 0.0,
            p95: 0.0,
            sorted: samples,
        };
        summary.med = summary.percentile(50.0);
        summary.p90 = summary.percentile(90.0);
        summary.p95 = summary.percentile(95.0);
        summary
    }

    /// Nearest-rank percentile (0-100); 0.0 when there are no samples
    pub fn percentile(&self, p: f64) -> f64 {
        if self.sorted.is_empty() {
            return 0.0;
        }

        let idx = ((p / 100.0) * (self.sorted.len() - 1) as f64).round() as usize;
        self.sorted[idx.min(self.sorted.len() - 1)]
    }
}

fn millis(value: Duration) -> f64 {
    value.as_nanos() as f64 / 1_000_000.0
}

/// Pass/fail counts for one named check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckSummary {
    pub name: &'static str,
    pub passes: u64,
    pub fails: u64,
}

/// A response as the registry sees it
#[derive(Debug, Clone, Copy)]
pub struct ResponseSample {
    pub status: u16,
    pub received: u64,
    pub duration: Duration,
}

/// Everything one finished iteration contributes to the registry
#[derive(Debug, Clone)]
pub struct IterationSample {
    /// Request bytes, `None` when nothing went out
    pub sent: Option<u64>,
    /// `None` when no response arrived
    pub response: Option<ResponseSample>,
    pub checks: CheckResult,
    pub duration: Duration,
}

/// Every metric the run records
#[derive(Debug, Default)]
pub struct RunMetrics {
    /// Custom error rate: true for every failed iteration
    pub errors: Rate,
    /// Transport errors and statuses outside 200..=399
    pub http_req_failed: Rate,
    pub checks: Rate,
    check_rates: [Rate; 4],
    pub http_reqs: Counter,
    pub iterations: Counter,
    pub data_sent: Counter,
    pub data_received: Counter,
    pub http_req_duration: Trend,
    pub iteration_duration: Trend,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_checks(&self, result: &CheckResult) {
        for check in Check::ALL {
            let ok = result.get(check);
            self.checks.add(ok);
            self.check_rates[check.index()].add(ok);
        }
    }

    /// Record one iteration as a unit.
    ///
    /// Both trend locks are held before any metric changes, so a task
    /// aborted while waiting leaves the registry untouched.
    pub async fn record_iteration(&self, sample: &IterationSample) {
        let mut req_durations = self.http_req_duration.samples.lock().await;
        let mut iter_durations = self.iteration_duration.samples.lock().await;

        if let Some(sent) = sample.sent {
            self.data_sent.add(sent);
            self.http_reqs.add(1);
        }
        match &sample.response {
            Some(resp) => {
                self.data_received.add(resp.received);
                self.http_req_failed.add(!(200..400).contains(&resp.status));
                req_durations.push(millis(resp.duration));
            }
            None => self.http_req_failed.add(true),
        }
        self.record_checks(&sample.checks);
        self.errors.add(!sample.checks.passed());
        self.iterations.add(1);
        iter_durations.push(millis(sample.duration));
    }

    pub async fn snapshot(&self, elapsed: Duration) -> MetricsSnapshot {
        let secs = elapsed.as_secs_f64();
        let counter = |c: &Counter| {
            let count = c.get();
            CounterSummary {
                count,
                rate: if secs > 0.0 { count as f64 / secs } else { 0.0 },
            }
        };

        let checks = Check::ALL
            .iter()
            .map(|check| {
                let rate = self.check_rates[check.index()].summary();
                CheckSummary {
                    name: check.name(),
                    passes: rate.hits,
                    fails: rate.total - rate.hits,
                }
            })
            .collect();

        MetricsSnapshot {
            elapsed_secs: secs,
            errors: self.errors.summary(),
            http_req_failed: self.http_req_failed.summary(),
            checks_rate: self.checks.summary(),
            checks,
            http_reqs: counter(&self.http_reqs),
            iterations: counter(&self.iterations),
            data_sent: counter(&self.data_sent),
            data_received: counter(&self.data_received),
            http_req_duration: self.http_req_duration.summary().await,
            iteration_duration: self.iteration_duration.summary().await,
        }
    }
}

/// Shape of a named metric
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Rate,
    Counter,
    Trend,
}

impl MetricKind {
    /// Kind of a metric known to `MetricsSnapshot`, by name
    pub fn of(name: &str) -> Option<Self> {
        match name {
            "errors" | "http_req_failed" | "checks" => Some(MetricKind::Rate),
            "http_reqs" | "iterations" | "data_sent" | "data_received" => {
                Some(MetricKind::Counter)
            }
            "http_req_duration" | "iteration_duration" => Some(MetricKind::Trend),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MetricKind::Rate => "rate",
            MetricKind::Counter => "counter",
            MetricKind::Trend => "trend",
        }
    }
}

/// A single metric's aggregated value, as thresholds see it
#[derive(Debug, Clone, Copy)]
pub enum MetricValue<'a> {
    Rate(&'a RateSummary),
    Counter(&'a CounterSummary),
    Trend(&'a TrendSummary),
}

/// Point-in-time aggregate of `RunMetrics`
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub elapsed_secs: f64,
    pub errors: RateSummary,
    pub http_req_failed: RateSummary,
    #[serde(rename = "checks")]
    pub checks_rate: RateSummary,
    #[serde(rename = "check_results")]
    pub checks: Vec<CheckSummary>,
    pub http_reqs: CounterSummary,
    pub iterations: CounterSummary,
    pub data_sent: CounterSummary,
    pub data_received: CounterSummary,
    pub http_req_duration: TrendSummary,
    pub iteration_duration: TrendSummary,
}

impl MetricsSnapshot {
    pub fn metric(&self, name: &str) -> Option<MetricValue<'_>> {
        match name {
            "errors" => Some(MetricValue::Rate(&self.errors)),
            "http_req_failed" => Some(MetricValue::Rate(&self.http_req_failed)),
            "checks" => Some(MetricValue::Rate(&self.checks_rate)),
            "http_reqs" => Some(MetricValue::Counter(&self.http_reqs)),
            "iterations" => Some(MetricValue::Counter(&self.iterations)),
            "data_sent" => Some(MetricValue::Counter(&self.data_sent)),
            "data_received" => Some(MetricValue::Counter(&self.data_received)),
            "http_req_duration" => Some(MetricValue::Trend(&self.http_req_duration)),
            "iteration_duration" => Some(MetricValue::Trend(&self.iteration_duration)),
            _ => None,
        }
    }
}
