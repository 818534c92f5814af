//! Built-in platform and plugin catalogs

use super::types::{Arch, Os, PayloadTemplate, PlatformSpec, PluginRef};

/// RoadRunner version requested by the built-in template
pub const DEFAULT_RR_VERSION: &str = "v2025.1.2";

/// Every (os, arch) combination the build service supports
pub const PLATFORMS: [PlatformSpec; 6] = [
    PlatformSpec::new(Os::Linux, Arch::Amd64),
    PlatformSpec::new(Os::Linux, Arch::Arm64),
    PlatformSpec::new(Os::Windows, Arch::Amd64),
    PlatformSpec::new(Os::Windows, Arch::Arm64),
    PlatformSpec::new(Os::Darwin, Arch::Amd64),
    PlatformSpec::new(Os::Darwin, Arch::Arm64),
];

const PLUGINS: &[(&str, &str)] = &[
    ("github.com/roadrunner-server/app-logger/v5", "v5.1.8"),
    ("github.com/roadrunner-server/logger/v5", "v5.1.8"),
    ("github.com/roadrunner-server/lock/v5", "v5.1.8"),
    ("github.com/roadrunner-server/rpc/v5", "v5.1.8"),
    ("github.com/roadrunner-server/centrifuge/v5", "v5.1.8"),
    ("github.com/temporalio/roadrunner-temporal/v5", "v5.7.0"),
    ("github.com/roadrunner-server/metrics/v5", "v5.1.8"),
    ("github.com/roadrunner-server/otel/v5", "v5.1.8"),
    ("github.com/roadrunner-server/http/v5", "v5.2.7"),
    ("github.com/roadrunner-server/gzip/v5", "v5.1.8"),
    ("github.com/roadrunner-server/prometheus/v5", "v5.1.7"),
    ("github.com/roadrunner-server/headers/v5", "v5.1.8"),
    ("github.com/roadrunner-server/static/v5", "v5.1.6"),
    ("github.com/roadrunner-server/proxy_ip_parser/v5", "v5.1.8"),
    ("github.com/roadrunner-server/send/v5", "v5.1.5"),
    ("github.com/roadrunner-server/server/v5", "v5.2.9"),
    ("github.com/roadrunner-server/service/v5", "v5.1.8"),
    ("github.com/roadrunner-server/jobs/v5", "v5.1.8"),
    ("github.com/roadrunner-server/amqp/v5", "v5.2.2"),
    ("github.com/roadrunner-server/sqs/v5", "v5.1.8"),
    ("github.com/roadrunner-server/beanstalk/v5", "v5.1.8"),
    ("github.com/roadrunner-server/nats/v5", "v5.1.8"),
    ("github.com/roadrunner-server/kafka/v5", "v5.2.4"),
    ("github.com/roadrunner-server/google-pub-sub/v5", "v5.1.8"),
    ("github.com/roadrunner-server/kv/v5", "v5.2.8"),
    ("github.com/roadrunner-server/boltdb/v5", "v5.1.8"),
    ("github.com/roadrunner-server/memory/v5", "v5.2.8"),
    ("github.com/roadrunner-server/redis/v5", "v5.1.9"),
    ("github.com/roadrunner-server/memcached/v5", "v5.1.8"),
    ("github.com/roadrunner-server/fileserver/v5", "v5.1.8"),
    ("github.com/roadrunner-server/grpc/v5", "v5.2.2"),
    ("github.com/roadrunner-server/status/v5", "v5.1.8"),
    ("github.com/roadrunner-server/tcp/v5", "v5.1.8"),
];

/// The plugin set every request asks to have compiled in
pub fn default_plugins() -> Vec<PluginRef> {
    PLUGINS
        .iter()
        .map(|(module_name, tag)| PluginRef {
            module_name: module_name.to_string(),
            tag: tag.to_string(),
        })
        .collect()
}

/// Payload skeleton used when no template file is configured
pub fn default_template() -> PayloadTemplate {
    PayloadTemplate {
        request_id: String::new(),
        force_rebuild: true,
        target_platform: None,
        rr_version: DEFAULT_RR_VERSION.to_string(),
        plugins: default_plugins(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_platform_catalog_is_complete() {
        let unique: HashSet<_> = PLATFORMS.iter().collect();
        assert_eq!(unique.len(), 6);
        for os in [Os::Linux, Os::Windows, Os::Darwin] {
            for arch in [Arch::Amd64, Arch::Arm64] {
                assert!(PLATFORMS.contains(&PlatformSpec::new(os, arch)));
            }
        }
    }

    #[test]
    fn test_plugin_modules_are_unique() {
        let plugins = default_plugins();
        let unique: HashSet<_> = plugins.iter().map(|p| p.module_name.as_str()).collect();
        assert_eq!(unique.len(), plugins.len());
        assert_eq!(plugins.len(), 33);
    }

    #[test]
    fn test_default_template() {
        let template = default_template();
        assert!(template.force_rebuild);
        assert_eq!(template.rr_version, "v2025.1.2");
        assert_eq!(template.plugins[0].module_name, "github.com/roadrunner-server/app-logger/v5");
        assert!(template.plugins.iter().all(|p| p.tag.starts_with('v')));
    }
}
