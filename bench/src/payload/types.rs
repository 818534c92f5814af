//! Build request types and error definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur when loading a payload template
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Failed to read template {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed template JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Template field `{0}` must not be empty")]
    EmptyField(&'static str),
}

/// Target operating system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Linux,
    Windows,
    Darwin,
}

impl Os {
    pub fn as_str(&self) -> &'static str {
        match self {
            Os::Linux => "linux",
            Os::Windows => "windows",
            Os::Darwin => "darwin",
        }
    }
}

/// Target CPU architecture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    Amd64,
    Arm64,
}

impl Arch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::Amd64 => "amd64",
            Arch::Arm64 => "arm64",
        }
    }
}

/// An (os, arch) pair the build service is asked to target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlatformSpec {
    pub os: Os,
    pub arch: Arch,
}

impl PlatformSpec {
    pub const fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }
}

impl fmt::Display for PlatformSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} + {}", self.os.as_str(), self.arch.as_str())
    }
}

/// A plugin module pinned to a tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRef {
    /// Go module path, e.g. `github.com/roadrunner-server/http/v5`
    pub module_name: String,
    /// Semantic version tag
    pub tag: String,
}

/// Owned payload skeleton, as loaded from disk or built from the catalog.
///
/// `request_id` and `target_platform` may appear in a template file but are
/// overwritten for every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadTemplate {
    #[serde(default)]
    pub request_id: String,
    pub force_rebuild: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_platform: Option<PlatformSpec>,
    pub rr_version: String,
    pub plugins: Vec<PluginRef>,
}

/// A single build request body.
///
/// Borrows the version and plugin list from the shared template so the
/// per-request cost is one UUID and one platform.
#[derive(Debug, Clone, Serialize)]
pub struct BuildRequest<'a> {
    pub request_id: String,
    pub force_rebuild: bool,
    pub target_platform: PlatformSpec,
    pub rr_version: &'a str,
    pub plugins: &'a [PluginRef],
}
