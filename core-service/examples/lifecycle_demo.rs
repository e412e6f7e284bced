//! Lifecycle bridge demonstration on the desktop host
//!
//! Starts the SDK late (after the first window is already visible), walks the
//! host through a suspend/resume cycle and raises a test crash.
//!
//! Run with:
//! ```bash
//! # Pretty format
//! cargo run -p core-service --example lifecycle_demo
//!
//! # JSON format, legacy host without "left background"
//! cargo run -p core-service --example lifecycle_demo -- json legacy
//! ```

use bridge_desktop::{DesktopHost, DesktopHostOptions};
use bridge_traits::{ErrorSource, HostFault, LogLevel};
use core_runtime::logging::{redact_if_sensitive, LogFormat, LoggingConfig};
use core_service::{generate_test_crash, SdkConfig, SdkEvent, TelemetryService};
use std::env;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    let format = match args.get(1).map(String::as_str) {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        _ => LogFormat::Pretty,
    };
    let legacy = args.get(2).map(String::as_str) == Some("legacy");

    let host = Arc::new(DesktopHost::with_options(DesktopHostOptions {
        leaving_background_supported: !legacy,
        ..Default::default()
    }));
    host.open_surface(true)?;

    let config = SdkConfig::builder()
        .host_lifecycle(host.clone())
        .initial_user_id("demo-user@example.com")
        .logging(
            LoggingConfig::default()
                .with_format(format)
                .with_level(LogLevel::Trace)
                .with_target(true),
        )
        .build()?;

    let service = TelemetryService::start(config)?;
    let mut events = service.subscribe_events();

    if let Some(probe) = service.lifecycle().take_resume_probe() {
        let outcome = probe.await??;
        info!(?outcome, "Resume probe finished");
    }

    info!(
        user = %redact_if_sensitive("user_id", &service.user_id().unwrap_or_default()),
        started = service.lifecycle().is_started(),
        "SDK ready"
    );

    host.suspend();
    host.resume();

    let fault: HostFault = Arc::new(generate_test_crash().unwrap_err());
    if host
        .raise_unhandled_error(ErrorSource::new("lifecycle_demo"), fault)
        .is_some()
    {
        warn!("Test crash handed back to the native fault path");
    }

    while let Some(event) = events.try_recv() {
        let event: SdkEvent = event?;
        info!(severity = ?event.severity(), "{}", event.description());
    }

    for report in service.crash_reports() {
        info!(report = %serde_json::to_string(&report)?, "Stored crash report");
    }

    Ok(())
}
