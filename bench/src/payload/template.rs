//! Immutable request template shared by all workers

use rand::Rng;
use std::path::Path;
use uuid::Uuid;

use super::catalog::{PLATFORMS, default_template};
use super::types::{BuildRequest, PayloadTemplate, PlatformSpec, PluginRef, TemplateError};

/// Process-wide request skeleton.
///
/// Built once at startup and handed to workers behind an `Arc`; nothing in
/// here is mutated after construction.
#[derive(Debug, Clone)]
pub struct RequestTemplate {
    payload: PayloadTemplate,
    platforms: &'static [PlatformSpec],
}

impl RequestTemplate {
    /// Wrap a payload skeleton, validating its required fields
    pub fn new(payload: PayloadTemplate) -> Result<Self, TemplateError> {
        if payload.rr_version.trim().is_empty() {
            return Err(TemplateError::EmptyField("rr_version"));
        }
        if payload
            .plugins
            .iter()
            .any(|p| p.module_name.is_empty() || p.tag.is_empty())
        {
            return Err(TemplateError::EmptyField("plugins"));
        }
        Ok(Self {
            payload,
            platforms: &PLATFORMS,
        })
    }

    /// Load a payload skeleton from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, TemplateError> {
        let content = std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parse a payload skeleton from a JSON string
    pub fn from_json(json: &str) -> Result<Self, TemplateError> {
        let payload: PayloadTemplate = serde_json::from_str(json)?;
        Self::new(payload)
    }

    /// Override the requested RoadRunner version
    pub fn with_rr_version(mut self, version: impl Into<String>) -> Result<Self, TemplateError> {
        self.payload.rr_version = version.into();
        Self::new(self.payload)
    }

    /// Override the force_rebuild flag
    pub fn with_force_rebuild(mut self, force: bool) -> Self {
        self.payload.force_rebuild = force;
        self
    }

    pub fn plugins(&self) -> &[PluginRef] {
        &self.payload.plugins
    }

    pub fn platforms(&self) -> &[PlatformSpec] {
        self.platforms
    }

    pub fn rr_version(&self) -> &str {
        &self.payload.rr_version
    }

    pub fn force_rebuild(&self) -> bool {
        self.payload.force_rebuild
    }

    /// Pick a platform uniformly at random from the catalog
    pub fn pick_platform<R: Rng + ?Sized>(&self, rng: &mut R) -> PlatformSpec {
        self.platforms[rng.random_range(0..self.platforms.len())]
    }

    /// Overlay a request id and platform onto the skeleton
    pub fn request(&self, request_id: Uuid, platform: PlatformSpec) -> BuildRequest<'_> {
        BuildRequest {
            request_id: request_id.to_string(),
            force_rebuild: self.payload.force_rebuild,
            target_platform: platform,
            rr_version: &self.payload.rr_version,
            plugins: &self.payload.plugins,
        }
    }

    /// Build a fresh request with a random v4 id and a random platform
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> BuildRequest<'_> {
        let platform = self.pick_platform(rng);
        let request_id = uuid::Builder::from_random_bytes(rng.random()).into_uuid();
        self.request(request_id, platform)
    }
}

impl Default for RequestTemplate {
    fn default() -> Self {
        Self {
            payload: default_template(),
            platforms: &PLATFORMS,
        }
    }
}
