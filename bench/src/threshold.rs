//! Pass/fail thresholds over end-of-run metrics
//!
//! Expressions use the familiar `aggregate op value` form, e.g. `p(95)<30000`
//! or `rate<0.1`, attached to a metric name.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::stats::{MetricKind, MetricValue, MetricsSnapshot};

#[derive(Debug, Error, PartialEq)]
pub enum ThresholdParseError {
    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    #[error("Malformed threshold expression: {0}")]
    Malformed(String),

    #[error("Unknown aggregate `{0}`")]
    UnknownAggregate(String),

    #[error("Aggregate `{aggregate}` does not apply to {kind} metric `{metric}`")]
    WrongKind {
        metric: String,
        aggregate: String,
        kind: &'static str,
    },

    #[error("Invalid threshold value: {0}")]
    InvalidValue(String),
}

/// Statistic a threshold compares
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Aggregate {
    Rate,
    Count,
    Avg,
    Min,
    Med,
    Max,
    Percentile(f64),
}

impl Aggregate {
    fn applies_to(&self, kind: MetricKind) -> bool {
        match self {
            Aggregate::Rate => matches!(kind, MetricKind::Rate | MetricKind::Counter),
            Aggregate::Count => kind == MetricKind::Counter,
            _ => kind == MetricKind::Trend,
        }
    }

    fn observe(&self, value: MetricValue<'_>) -> Option<f64> {
        match (self, value) {
            (Aggregate::Rate, MetricValue::Rate(r)) => Some(r.rate),
            (Aggregate::Rate, MetricValue::Counter(c)) => Some(c.rate),
            (Aggregate::Count, MetricValue::Counter(c)) => Some(c.count as f64),
            (Aggregate::Avg, MetricValue::Trend(t)) => Some(t.avg),
            (Aggregate::Min, MetricValue::Trend(t)) => Some(t.min),
            (Aggregate::Med, MetricValue::Trend(t)) => Some(t.med),
            (Aggregate::Max, MetricValue::Trend(t)) => Some(t.max),
            (Aggregate::Percentile(p), MetricValue::Trend(t)) => Some(t.percentile(*p)),
            _ => None,
        }
    }
}

impl FromStr for Aggregate {
    type Err = ThresholdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rate" => Ok(Aggregate::Rate),
            "count" => Ok(Aggregate::Count),
            "avg" => Ok(Aggregate::Avg),
            "min" => Ok(Aggregate::Min),
            "med" => Ok(Aggregate::Med),
            "max" => Ok(Aggregate::Max),
            _ => {
                let inner = s
                    .strip_prefix("p(")
                    .and_then(|rest| rest.strip_suffix(')'))
                    .ok_or_else(|| ThresholdParseError::UnknownAggregate(s.to_string()))?;
                let p: f64 = inner
                    .trim()
                    .parse()
                    .map_err(|_| ThresholdParseError::UnknownAggregate(s.to_string()))?;
                if !(0.0..=100.0).contains(&p) {
                    return Err(ThresholdParseError::UnknownAggregate(s.to_string()));
                }
                Ok(Aggregate::Percentile(p))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Operator {
    // Two-character operators first so `<=` is not read as `<`
    const TOKENS: [(&'static str, Operator); 6] = [
        ("<=", Operator::Le),
        (">=", Operator::Ge),
        ("==", Operator::Eq),
        ("!=", Operator::Ne),
        ("<", Operator::Lt),
        (">", Operator::Gt),
    ];

    fn holds(&self, observed: f64, limit: f64) -> bool {
        match self {
            Operator::Lt => observed < limit,
            Operator::Le => observed <= limit,
            Operator::Gt => observed > limit,
            Operator::Ge => observed >= limit,
            Operator::Eq => observed == limit,
            Operator::Ne => observed != limit,
        }
    }
}

/// A parsed threshold bound to a metric
#[derive(Debug, Clone, PartialEq)]
pub struct Threshold {
    pub metric: String,
    pub expression: String,
    pub aggregate: Aggregate,
    pub operator: Operator,
    pub value: f64,
}

impl Threshold {
    pub fn parse(metric: &str, expression: &str) -> Result<Self, ThresholdParseError> {
        let metric = metric.trim();
        let expression: String = expression.chars().filter(|c| !c.is_whitespace()).collect();

        let kind = MetricKind::of(metric)
            .ok_or_else(|| ThresholdParseError::UnknownMetric(metric.to_string()))?;

        let (pos, token, operator) = Operator::TOKENS
            .iter()
            .filter_map(|(token, op)| expression.find(token).map(|pos| (pos, *token, *op)))
            .min_by_key(|(pos, token, _)| (*pos, std::cmp::Reverse(token.len())))
            .ok_or_else(|| ThresholdParseError::Malformed(expression.clone()))?;

        let (lhs, rhs) = (&expression[..pos], &expression[pos + token.len()..]);
        if lhs.is_empty() || rhs.is_empty() {
            return Err(ThresholdParseError::Malformed(expression.clone()));
        }

        let aggregate: Aggregate = lhs.parse()?;
        if !aggregate.applies_to(kind) {
            return Err(ThresholdParseError::WrongKind {
                metric: metric.to_string(),
                aggregate: lhs.to_string(),
                kind: kind.name(),
            });
        }

        let value: f64 = rhs
            .parse()
            .map_err(|_| ThresholdParseError::InvalidValue(rhs.to_string()))?;

        Ok(Self {
            metric: metric.to_string(),
            expression,
            aggregate,
            operator,
            value,
        })
    }

    /// Parse a non-empty `metric:expr;metric:expr` list
    pub fn parse_list(spec: &str) -> Result<Vec<Self>, ThresholdParseError> {
        let thresholds = spec
            .split(';')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let (metric, expression) = entry
                    .split_once(':')
                    .ok_or_else(|| ThresholdParseError::Malformed(entry.to_string()))?;
                Self::parse(metric, expression)
            })
            .collect::<Result<Vec<_>, _>>()?;

        if thresholds.is_empty() {
            return Err(ThresholdParseError::Malformed(spec.to_string()));
        }
        Ok(thresholds)
    }

    /// The thresholds every build-service run is gated on
    pub fn defaults() -> Vec<Self> {
        [
            ("http_req_duration", "p(95)<30000"),
            ("http_req_failed", "rate<0.1"),
            ("errors", "rate<0.1"),
        ]
        .iter()
        .filter_map(|(metric, expr)| Self::parse(metric, expr).ok())
        .collect()
    }

    pub fn evaluate(&self, snapshot: &MetricsSnapshot) -> ThresholdResult {
        let observed = snapshot
            .metric(&self.metric)
            .and_then(|value| self.aggregate.observe(value));
        let passed = observed.is_some_and(|v| self.operator.holds(v, self.value));

        ThresholdResult {
            metric: self.metric.clone(),
            expression: self.expression.clone(),
            observed,
            passed,
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.metric, self.expression)
    }
}

/// Outcome of one threshold at run end
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdResult {
    pub metric: String,
    pub expression: String,
    pub observed: Option<f64>,
    pub passed: bool,
}

/// Evaluate every threshold; the run passes only if all of them do
pub fn evaluate_all(thresholds: &[Threshold], snapshot: &MetricsSnapshot) -> Vec<ThresholdResult> {
    thresholds.iter().map(|t| t.evaluate(snapshot)).collect()
}
