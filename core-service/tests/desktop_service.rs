//! End-to-end flows through the service on the desktop host.

use bridge_desktop::{DesktopHost, DesktopHostOptions};
use bridge_traits::{ErrorSource, HostFault};
use core_service::{
    bootstrap_desktop, generate_test_crash, CrashEvent, LifecycleEvent, ProbeOutcome,
    ResumeStrategy, SdkConfig, SdkEvent, TelemetryService,
};
use std::sync::Arc;

fn legacy_service() -> (TelemetryService, Arc<DesktopHost>) {
    bootstrap_desktop(DesktopHostOptions {
        leaving_background_supported: false,
        ..Default::default()
    })
    .unwrap()
}

#[test]
fn legacy_host_is_started_after_bootstrap() {
    let (service, host) = legacy_service();

    assert_eq!(service.lifecycle().strategy(), ResumeStrategy::Coarse);
    assert!(service.lifecycle().is_started());

    let mut events = service.subscribe_events();
    host.suspend();
    host.resume();

    assert_eq!(
        events.try_recv().unwrap().unwrap(),
        SdkEvent::Lifecycle(LifecycleEvent::Suspended)
    );
    assert_eq!(
        events.try_recv().unwrap().unwrap(),
        SdkEvent::Lifecycle(LifecycleEvent::Resumed)
    );
    assert!(events.try_recv().is_none());
}

#[test]
fn test_crash_flows_to_reports_and_native_path() {
    let (service, host) = legacy_service();
    assert!(service.set_user_id(Some("tester".to_string())));
    let mut events = service.subscribe_events();

    let fault: HostFault = Arc::new(generate_test_crash().unwrap_err());
    let native = host
        .raise_unhandled_error(ErrorSource::new("Button.Click"), Arc::clone(&fault))
        .unwrap();
    assert!(Arc::ptr_eq(&native, &fault));

    let reports = service.crash_reports();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].is_test_crash);
    assert_eq!(reports[0].source, "Button.Click");
    assert_eq!(reports[0].user_id.as_deref(), Some("tester"));

    assert_eq!(
        events.try_recv().unwrap().unwrap(),
        SdkEvent::Lifecycle(LifecycleEvent::UnhandledException {
            source: "Button.Click".to_string(),
            message: "Test crash exception generated by SDK".to_string(),
        })
    );
    assert_eq!(
        events.try_recv().unwrap().unwrap(),
        SdkEvent::Crash(CrashEvent::ReportCaptured {
            report_id: reports[0].id.to_string(),
            is_test_crash: true,
        })
    );
}

#[test]
fn forwarding_can_be_disabled() {
    let host = Arc::new(DesktopHost::legacy());
    let config = SdkConfig::builder()
        .host_lifecycle(host.clone())
        .enable_event_bus_forwarding(false)
        .build()
        .unwrap();
    let service = TelemetryService::start(config).unwrap();
    let mut events = service.subscribe_events();

    host.suspend();
    assert!(events.try_recv().is_none());
}

#[tokio::test]
async fn visible_window_resume_reaches_event_bus() {
    let (service, host) = bootstrap_desktop(DesktopHostOptions::default()).unwrap();
    assert_eq!(service.lifecycle().strategy(), ResumeStrategy::Precise);
    assert!(!service.lifecycle().is_started());

    let mut events = service
        .subscribe_events()
        .filter(|event| matches!(event, SdkEvent::Lifecycle(_)));

    let probe = service.lifecycle().take_resume_probe().unwrap();
    assert_eq!(probe.await.unwrap().unwrap(), ProbeOutcome::NotReady);

    host.open_surface(true).unwrap();
    assert_eq!(
        service.lifecycle().probe_resume().await.unwrap(),
        ProbeOutcome::ResumeNeeded
    );
    assert_eq!(
        events.recv().await.unwrap(),
        SdkEvent::Lifecycle(LifecycleEvent::Resumed)
    );

    // Already started: the host's own notification still emits, the probe
    // does not.
    host.leave_background().unwrap();
    assert_eq!(
        service.lifecycle().probe_resume().await.unwrap(),
        ProbeOutcome::AlreadyStarted
    );
    assert_eq!(
        events.recv().await.unwrap(),
        SdkEvent::Lifecycle(LifecycleEvent::Resumed)
    );
    assert!(events.try_recv().is_none());
}

#[test]
fn start_on_explicit_runtime() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let host = Arc::new(DesktopHost::new());
    host.open_surface(true).unwrap();

    let config = SdkConfig::builder()
        .host_lifecycle(host)
        .build()
        .unwrap();
    let service = TelemetryService::start_on(config, runtime.handle().clone()).unwrap();

    let probe = service.lifecycle().take_resume_probe().unwrap();
    let outcome = runtime.block_on(probe).unwrap().unwrap();
    assert_eq!(outcome, ProbeOutcome::ResumeNeeded);
    assert!(service.lifecycle().is_started());
}
