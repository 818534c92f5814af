//! Run lifecycle hooks

use tracing::info;

use crate::generator::Generator;
use crate::payload::PlatformSpec;
use crate::scenario::Scenario;

/// Handle passed from `setup` to `teardown`. Carries nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetupData;

/// Runs once before any worker starts
pub fn setup(generator: &Generator, scenario: &Scenario) -> SetupData {
    let template = generator.template();
    info!("Starting velox build service benchmark...");
    info!("Target: {}", generator.transport().target());
    info!("Plugins count: {}", template.plugins().len());
    info!("Available platforms: {}", platform_list(template.platforms()));
    info!(
        "Scenario: {} (up to {} workers, {:?})",
        scenario.name(),
        scenario.max_vus(),
        scenario.duration()
    );
    info!("Each request will randomly select a platform combination");
    SetupData
}

/// Runs once after every worker has stopped
pub fn teardown(_data: SetupData) {
    info!("Benchmark completed!");
}

/// Comma-separated `os + arch` list
pub fn platform_list(platforms: &[PlatformSpec]) -> String {
    platforms
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
