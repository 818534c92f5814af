use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use velox_bench::{Config, Generator, HttpTransport, Report, RunMetrics, Runner};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "velox_bench=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment; any error here aborts before load starts
    let config = Config::from_env().context("invalid configuration")?;
    info!(
        "Loaded configuration: target={}, scenario={}, timeout={:?}",
        config.target_url,
        config.scenario.name(),
        config.request_timeout
    );

    if let Some(addr) = config.prometheus_listen {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("failed to start Prometheus exporter")?;
        info!("Prometheus metrics on http://{}/metrics", addr);
    }

    let template = Arc::new(config.build_template().context("invalid payload template")?);
    let transport = Arc::new(
        HttpTransport::new(config.target_url.clone(), config.request_timeout)
            .context("failed to build HTTP client")?,
    );
    let generator = Generator::new(template, transport, Arc::new(RunMetrics::new()));

    let result = Runner::new(generator, config.scenario.clone())
        .with_graceful_stop(config.graceful_stop)
        .run()
        .await;

    let report = Report::new(config.target_url.as_str(), result, &config.thresholds);
    report.print_summary();

    if let Some(ref path) = config.summary_export {
        report
            .write_json(path)
            .with_context(|| format!("failed to write summary to {:?}", path))?;
        info!("Summary written to {:?}", path);
    }

    Ok(report.exit_code())
}
