//! Benchmark configuration
//!
//! Configuration is loaded from environment variables. Every value has a
//! default matching the standard build-service benchmark; anything that is
//! set but cannot be parsed aborts the run before a single request is sent.

use reqwest::Url;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::payload::{RequestTemplate, TemplateError};
use crate::runner::DEFAULT_GRACEFUL_STOP;
use crate::scenario::{Scenario, Stage};
use crate::threshold::{Threshold, ThresholdParseError};

/// Build endpoint hit by default
pub const DEFAULT_TARGET_URL: &str = "http://127.0.0.1:9000/api.service.v1.BuildService/Build";

/// Configuration errors are fatal at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid target URL {value:?}: {reason}")]
    InvalidUrl { value: String, reason: String },

    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    #[error("Unknown scenario {0:?} (expected constant, ramping or iterations)")]
    UnknownScenario(String),

    #[error("Scenario needs at least one worker")]
    NoWorkers,

    #[error("Invalid threshold: {0}")]
    Threshold(#[from] ThresholdParseError),

    #[error("Invalid payload template: {0}")]
    Template(#[from] TemplateError),
}

/// Main benchmark configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Endpoint build requests are POSTed to
    pub target_url: Url,
    /// Per-request timeout enforced by the HTTP client
    pub request_timeout: Duration,
    /// Load profile
    pub scenario: Scenario,
    /// How long in-flight iterations may run after the scenario ends
    pub graceful_stop: Duration,
    /// Payload configuration
    pub payload: PayloadConfig,
    /// Pass/fail gates evaluated at run end
    pub thresholds: Vec<Threshold>,
    /// Where to write the JSON summary, if anywhere
    pub summary_export: Option<PathBuf>,
    /// Address for a Prometheus scrape endpoint, if any
    pub prometheus_listen: Option<SocketAddr>,
}

/// Payload-related configuration
#[derive(Debug, Clone, Default)]
pub struct PayloadConfig {
    /// JSON file replacing the built-in template
    pub template_path: Option<PathBuf>,
    /// Overrides the template's `rr_version`
    pub rr_version: Option<String>,
    /// Overrides the template's `force_rebuild`
    pub force_rebuild: Option<bool>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_url: default_target_url(),
            request_timeout: Duration::from_secs(120),
            scenario: Scenario::default(),
            graceful_stop: DEFAULT_GRACEFUL_STOP,
            payload: PayloadConfig::default(),
            thresholds: Threshold::defaults(),
            summary_export: None,
            prometheus_listen: None,
        }
    }
}

fn default_target_url() -> Url {
    match Url::parse(DEFAULT_TARGET_URL) {
        Ok(url) => url,
        Err(e) => unreachable!("default target URL is valid: {e}"),
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        // Target config
        if let Some(url) = get("TARGET_URL") {
            config.target_url = parse_target_url(&url)?;
        }
        if let Some(val) = get("REQUEST_TIMEOUT_SECS") {
            config.request_timeout = parse_secs("REQUEST_TIMEOUT_SECS", &val)?;
        }

        // Scenario config
        let vus: Option<usize> = get("VUS")
            .map(|v| parse_var("VUS", &v))
            .transpose()?;
        let scenario_name = get("SCENARIO").unwrap_or_else(|| "constant".to_string());
        config.scenario = match scenario_name.to_lowercase().as_str() {
            "constant" => {
                let duration = match get("DURATION_SECS") {
                    Some(v) => parse_secs("DURATION_SECS", &v)?,
                    None => config.scenario.duration(),
                };
                Scenario::ConstantVus {
                    vus: vus.unwrap_or(50),
                    duration,
                }
            }
            "ramping" => match get("RAMP_STAGES") {
                Some(stages) => Scenario::RampingVus {
                    start_vus: get("RAMP_START_VUS")
                        .map(|v| parse_var("RAMP_START_VUS", &v))
                        .transpose()?
                        .unwrap_or(1),
                    stages: parse_stages(&stages)?,
                },
                None => Scenario::default_ramping(),
            },
            "iterations" => Scenario::PerVuIterations {
                vus: vus.unwrap_or(1),
                iterations: get("ITERATIONS")
                    .map(|v| parse_nonzero("ITERATIONS", &v))
                    .transpose()?
                    .unwrap_or(1),
                max_duration: get("MAX_DURATION_SECS")
                    .map(|v| parse_secs("MAX_DURATION_SECS", &v))
                    .transpose()?
                    .unwrap_or(Duration::from_secs(600)),
            },
            other => return Err(ConfigError::UnknownScenario(other.to_string())),
        };
        if config.scenario.max_vus() == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if let Some(val) = get("GRACEFUL_STOP_SECS") {
            config.graceful_stop = Duration::from_secs(parse_var("GRACEFUL_STOP_SECS", &val)?);
        }

        // Payload config
        if let Some(path) = get("PAYLOAD_TEMPLATE") {
            config.payload.template_path = Some(PathBuf::from(path));
        }
        if let Some(version) = get("RR_VERSION") {
            config.payload.rr_version = Some(version);
        }
        if let Some(val) = get("FORCE_REBUILD") {
            config.payload.force_rebuild = Some(parse_bool("FORCE_REBUILD", &val)?);
        }

        // Reporting config
        if let Some(spec) = get("THRESHOLDS") {
            config.thresholds = Threshold::parse_list(&spec)?;
        }
        if let Some(path) = get("SUMMARY_EXPORT") {
            config.summary_export = Some(PathBuf::from(path));
        }
        if let Some(addr) = get("PROMETHEUS_LISTEN") {
            config.prometheus_listen = Some(parse_var("PROMETHEUS_LISTEN", &addr)?);
        }

        Ok(config)
    }

    /// Build the shared request template: the configured file or the
    /// built-in catalog, with any overrides applied
    pub fn build_template(&self) -> Result<RequestTemplate, ConfigError> {
        let mut template = match &self.payload.template_path {
            Some(path) => RequestTemplate::from_file(path)?,
            None => RequestTemplate::default(),
        };
        if let Some(version) = &self.payload.rr_version {
            template = template.with_rr_version(version.clone())?;
        }
        if let Some(force) = self.payload.force_rebuild {
            template = template.with_force_rebuild(force);
        }
        Ok(template)
    }
}

fn parse_target_url(value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|e| ConfigError::InvalidUrl {
        value: value.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl {
            value: value.to_string(),
            reason: format!("unsupported scheme {}", url.scheme()),
        });
    }
    Ok(url)
}

fn parse_var<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        var,
        value: value.to_string(),
    })
}

/// Counts and durations that would leave the run with nothing to measure
fn parse_nonzero(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    match parse_var(var, value)? {
        0 => Err(ConfigError::InvalidValue {
            var,
            value: value.to_string(),
        }),
        n => Ok(n),
    }
}

fn parse_secs(var: &'static str, value: &str) -> Result<Duration, ConfigError> {
    parse_nonzero(var, value).map(Duration::from_secs)
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var,
            value: value.to_string(),
        }),
    }
}

/// `secs:target,secs:target`, e.g. `10:5,20:10,10:0`
fn parse_stages(value: &str) -> Result<Vec<Stage>, ConfigError> {
    let invalid = || ConfigError::InvalidValue {
        var: "RAMP_STAGES",
        value: value.to_string(),
    };

    let stages = value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|stage| {
            let (secs, target) = stage.split_once(':').ok_or_else(invalid)?;
            let secs: u64 = secs.trim().parse().map_err(|_| invalid())?;
            let target: usize = target.trim().parse().map_err(|_| invalid())?;
            Ok(Stage::new(secs, target))
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;

    if stages.iter().all(|stage| stage.duration.is_zero()) {
        return Err(invalid());
    }
    Ok(stages)
}
