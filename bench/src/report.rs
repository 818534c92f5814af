//! End-of-run summary

use serde::Serialize;
use std::path::Path;
use std::process::ExitCode;

use crate::runner::RunResult;
use crate::stats::{CounterSummary, MetricsSnapshot, RateSummary, TrendSummary};
use crate::threshold::{Threshold, ThresholdResult, evaluate_all};

/// Exit code when any threshold is breached
pub const THRESHOLDS_FAILED_EXIT_CODE: u8 = 99;

/// Final report: aggregated metrics plus the threshold verdict
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub timestamp: String,
    pub target: String,
    pub scenario: &'static str,
    pub elapsed_secs: f64,
    pub interrupted_workers: usize,
    pub metrics: MetricsSnapshot,
    pub thresholds: Vec<ThresholdResult>,
    pub passed: bool,
}

impl Report {
    pub fn new(target: &str, result: RunResult, thresholds: &[Threshold]) -> Self {
        let threshold_results = evaluate_all(thresholds, &result.snapshot);
        let passed = threshold_results.iter().all(|r| r.passed);

        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            target: target.to_string(),
            scenario: result.scenario,
            elapsed_secs: result.elapsed.as_secs_f64(),
            interrupted_workers: result.interrupted_workers,
            metrics: result.snapshot,
            thresholds: threshold_results,
            passed,
        }
    }

    /// Process status: 0 on pass, 99 on any breach
    pub fn exit_status(&self) -> u8 {
        if self.passed {
            0
        } else {
            THRESHOLDS_FAILED_EXIT_CODE
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Write the JSON summary to `path`
    pub fn write_json(&self, path: &Path) -> std::io::Result<()> {
        let json = self.to_json()?;
        std::fs::write(path, json)
    }

    /// Human-readable summary lines
    pub fn render(&self) -> Vec<String> {
        let m = &self.metrics;
        let mut lines = vec![
            "═══════════════════════════════════════════════════════════════".to_string(),
            format!(
                " RESULTS: {} scenario against {} ({:.1}s)",
                self.scenario, self.target, self.elapsed_secs
            ),
            "═══════════════════════════════════════════════════════════════".to_string(),
            String::new(),
            " ─── Checks ──────────────────────────────────────────────────".to_string(),
        ];

        for check in &m.checks {
            let mark = if check.fails == 0 { "✓" } else { "✗" };
            lines.push(format!(
                "   {} {:34} {:>8} pass {:>8} fail",
                mark, check.name, check.passes, check.fails
            ));
        }

        lines.push(String::new());
        lines.push(" ─── Metrics ─────────────────────────────────────────────────".to_string());
        lines.push(rate_line("checks", &m.checks_rate));
        lines.push(rate_line("errors", &m.errors));
        lines.push(rate_line("http_req_failed", &m.http_req_failed));
        lines.push(trend_line("http_req_duration", &m.http_req_duration));
        lines.push(trend_line("iteration_duration", &m.iteration_duration));
        lines.push(counter_line("http_reqs", &m.http_reqs, "/s"));
        lines.push(counter_line("iterations", &m.iterations, "/s"));
        lines.push(counter_line("data_sent", &m.data_sent, " B/s"));
        lines.push(counter_line("data_received", &m.data_received, " B/s"));

        if !self.thresholds.is_empty() {
            lines.push(String::new());
            lines.push(" ─── Thresholds ──────────────────────────────────────────────".to_string());
            for t in &self.thresholds {
                let mark = if t.passed { "✓" } else { "✗" };
                let observed = t
                    .observed
                    .map(|v| format!("{:.4}", v))
                    .unwrap_or_else(|| "N/A".to_string());
                lines.push(format!(
                    "   {} {:20} {:16} observed {}",
                    mark, t.metric, t.expression, observed
                ));
            }
        }

        if self.interrupted_workers > 0 {
            lines.push(String::new());
            lines.push(format!(
                "   {} workers interrupted at graceful stop",
                self.interrupted_workers
            ));
        }

        let overall = if self.passed {
            "PASS"
        } else {
            "FAIL (threshold breached)"
        };
        lines.push(String::new());
        lines.push("═══════════════════════════════════════════════════════════════".to_string());
        lines.push(format!(" OVERALL: {}", overall));
        lines.push("═══════════════════════════════════════════════════════════════".to_string());
        lines
    }

    pub fn print_summary(&self) {
        println!();
        for line in self.render() {
            println!("{}", line);
        }
        println!();
    }
}

fn rate_line(name: &str, rate: &RateSummary) -> String {
    format!(
        "   {:20} {:>7.2}%  {} / {}",
        name,
        rate.rate * 100.0,
        rate.hits,
        rate.total
    )
}

fn trend_line(name: &str, trend: &TrendSummary) -> String {
    format!(
        "   {:20} avg={:.1}ms min={:.1}ms med={:.1}ms max={:.1}ms p(90)={:.1}ms p(95)={:.1}ms",
        name, trend.avg, trend.min, trend.med, trend.max, trend.p90, trend.p95
    )
}

fn counter_line(name: &str, counter: &CounterSummary, unit: &str) -> String {
    format!(
        "   {:20} {:>10}  {:.1}{}",
        name, counter.count, counter.rate, unit
    )
}
