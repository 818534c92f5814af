//! Build request payload
//!
//! This module provides:
//! - The request body types (`BuildRequest`, `PlatformSpec`, `PluginRef`)
//! - The built-in platform and plugin catalogs
//! - `RequestTemplate`, the immutable skeleton every request is stamped from

mod catalog;
mod template;
mod types;

pub use catalog::{DEFAULT_RR_VERSION, PLATFORMS, default_plugins, default_template};
pub use template::RequestTemplate;
pub use types::{Arch, BuildRequest, Os, PayloadTemplate, PlatformSpec, PluginRef, TemplateError};
