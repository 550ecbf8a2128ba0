//! Lifecycle conformance integration tests
//!
//! Runs the harness against the reference chip, and against deliberately
//! broken controllers to make sure violations are caught.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use wifi_chip::{
    ChipCapabilities, ChipController, ChipDebugInfo, ChipEventCallback, ChipId, ChipMode,
    ChipModeId, DebugRingBufferStatus, FactoryChipProvider, HostWakeReasonStats, IfaceHandle,
    IfaceType, ReferenceChip, ReferenceChipConfig, RingBufferVerboseLevel, StaticChipProvider,
};
use wifi_error::{ErrorKind, WifiResult, WifiStatus, WifiStatusCode};
use wifi_harness::{
    ConformanceReport, HarnessConfig, IfaceSlot, LifecycleHarness, ScenarioOutcome,
    ScenarioRunner, await_ready, catalog, conformance_catalog,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn fast_config(nan_enabled: bool) -> HarnessConfig {
    HarnessConfig {
        nan_enabled,
        retry_delay_ms: 1,
        mode_toggle_delay_ms: 1,
        ..HarnessConfig::default()
    }
}

fn reference_harness(chip_config: ReferenceChipConfig, config: HarnessConfig) -> LifecycleHarness {
    let chip = Arc::new(ReferenceChip::new(chip_config));
    LifecycleHarness::new(Arc::new(StaticChipProvider::new(chip)), config)
}

fn outcome_of(report: &ConformanceReport, name: &str) -> ScenarioOutcome {
    report
        .results
        .iter()
        .find(|r| r.name == name)
        .map(|r| r.outcome.clone())
        .unwrap_or_else(|| panic!("scenario {} missing from report", name))
}

fn run_catalog(harness: &LifecycleHarness) -> ConformanceReport {
    let mut report = ConformanceReport::new(harness.config().clone());
    report.extend(ScenarioRunner::new(harness).run_all(&conformance_catalog()));
    report.finish();
    report
}

#[test]
fn test_reference_chip_passes_full_catalog_with_nan() {
    init_logging();
    let harness = reference_harness(ReferenceChipConfig::default(), fast_config(true));
    let report = run_catalog(&harness);

    let failures: Vec<_> = report.failures().map(|r| r.name.clone()).collect();
    assert!(failures.is_empty(), "unexpected failures: {:?}", failures);
    assert_eq!(report.summary.skipped, 1);
    assert!(outcome_of(&report, "nan_mode_absent_when_disabled").is_skipped());
    assert!(outcome_of(&report, "nan_enable_request").is_passed());
}

#[test]
fn test_nan_disabled_skips_nan_scenarios() {
    init_logging();
    let chip_config = ReferenceChipConfig {
        feature_aware: false,
        ..Default::default()
    };
    let harness = reference_harness(chip_config, fast_config(false));
    let report = run_catalog(&harness);

    assert!(report.is_success(), "failures: {:?}", report.failures().collect::<Vec<_>>());
    for name in [
        "create_nan_iface",
        "get_nan_iface_names",
        "get_nan_iface",
        "remove_nan_iface",
        "nan_enable_request",
    ] {
        assert!(outcome_of(&report, name).is_skipped(), "{} should be skipped", name);
    }
    assert!(outcome_of(&report, "nan_mode_absent_when_disabled").is_passed());
    assert!(outcome_of(&report, "create_p2p_iface").is_passed());
}

#[test]
fn test_nan_advertised_while_disabled_is_flagged() {
    init_logging();
    let harness = reference_harness(ReferenceChipConfig::default(), fast_config(false));
    let scenarios = catalog::select(
        conformance_catalog(),
        &["nan_mode_absent_when_disabled".to_string()],
    );
    let results = ScenarioRunner::new(&harness).run_all(&scenarios);
    assert_eq!(results.len(), 1);
    assert!(results[0].outcome.is_failed());
}

#[test]
fn test_missing_debug_capabilities_expect_not_supported() {
    init_logging();
    let chip_config = ReferenceChipConfig {
        capabilities: ChipCapabilities::DEBUG_ERROR_ALERTS.bits(),
        ..Default::default()
    };
    let harness = reference_harness(chip_config, fast_config(true));
    let report = run_catalog(&harness);
    assert!(report.is_success(), "failures: {:?}", report.failures().collect::<Vec<_>>());
}

#[test]
fn test_startup_window_is_absorbed_per_scenario() {
    init_logging();
    let starts = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&starts);
    // 每次查找都返回一个新芯片，前两次 start 处于过渡期
    let provider = FactoryChipProvider::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Arc::new(ReferenceChip::new(ReferenceChipConfig {
            startup_unavailable_calls: 2,
            ..Default::default()
        })) as Arc<dyn ChipController>
    });
    let harness = LifecycleHarness::new(Arc::new(provider), fast_config(true));
    let scenarios = catalog::select(conformance_catalog(), &["ap_iface".to_string()]);
    let results = ScenarioRunner::new(&harness).run_all(&scenarios);

    assert!(results.iter().all(|r| r.outcome.is_passed()));
    assert_eq!(starts.load(Ordering::SeqCst) as usize, results.len());
}

#[test]
fn test_retry_bound_literal() {
    let mut calls = 0;
    let status = await_ready(
        || {
            calls += 1;
            WifiStatus::from(WifiStatusCode::ErrorNotAvailable)
        },
        5,
        Duration::from_millis(2),
    );
    assert_eq!(calls, 6);
    assert_eq!(status.code, WifiStatusCode::ErrorNotAvailable);
}

#[test]
fn test_ap_scenario_literal() {
    init_logging();
    let harness = reference_harness(ReferenceChipConfig::default(), fast_config(false));
    let mut session = harness.setup().expect("setup");
    let lifecycle = session.lifecycle();

    session.configure_for(IfaceType::Ap).expect("configure AP mode");
    let handle = lifecycle.create(IfaceType::Ap).expect("create AP");
    let name = lifecycle.name_of(&handle).expect("name");
    assert_eq!(lifecycle.list_names(IfaceType::Ap).expect("list"), vec![name.clone()]);
    assert_eq!(
        lifecycle.create(IfaceType::Ap).unwrap_err().kind(),
        ErrorKind::NotAvailable
    );
    lifecycle.remove(IfaceType::Ap, &name).expect("remove");
    assert!(lifecycle.list_names(IfaceType::Ap).expect("list").is_empty());
    assert_eq!(
        lifecycle.remove(IfaceType::Ap, &name).unwrap_err().kind(),
        ErrorKind::InvalidArgument
    );

    // 删除后可以再次创建
    session.create_iface(IfaceType::Ap).expect("create after remove");
    session.teardown().expect("teardown");
}

#[test]
fn test_invalidation_on_teardown() {
    init_logging();
    let harness = reference_harness(ReferenceChipConfig::default(), fast_config(true));
    let mut session = harness.setup().expect("setup");

    let mut handles = Vec::new();
    for t in [IfaceType::Sta, IfaceType::P2p] {
        session.configure_for(t).expect("configure");
        handles.push(session.create_iface(t).expect("create"));
    }
    assert!(handles.iter().all(IfaceHandle::is_valid));

    session.stop().expect("stop");
    for handle in &handles {
        assert_eq!(
            handle.get_name().unwrap_err().kind(),
            ErrorKind::Invalidated
        );
    }
}

/// Ways a controller can deviate from the reference behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
    /// `remove_iface` on a missing name succeeds
    IdempotentRemove,
    /// Ring capability advertised, but no rings reported
    NoRings,
    /// Ring ops succeed although no ring capability is advertised
    RingOpsWithoutCapability,
    /// Rings reported with empty names
    UnnamedRings,
}

/// Reference chip with a single injected fault
struct FaultyChip {
    inner: ReferenceChip,
    fault: Fault,
}

impl FaultyChip {
    fn new(fault: Fault) -> Self {
        let config = match fault {
            Fault::RingOpsWithoutCapability => ReferenceChipConfig {
                capabilities: ChipCapabilities::DEBUG_MEMORY_FIRMWARE_DUMP.bits(),
                ..Default::default()
            },
            Fault::IdempotentRemove | Fault::NoRings | Fault::UnnamedRings => {
                ReferenceChipConfig::default()
            }
        };
        Self {
            inner: ReferenceChip::new(config),
            fault,
        }
    }

    fn harness(fault: Fault, nan_enabled: bool) -> LifecycleHarness {
        let chip = Arc::new(Self::new(fault));
        LifecycleHarness::new(Arc::new(StaticChipProvider::new(chip)), fast_config(nan_enabled))
    }

    /// Stand-in result for ring ops that should have been rejected
    fn ring_op(&self, real: WifiResult<()>) -> WifiResult<()> {
        match self.fault {
            Fault::RingOpsWithoutCapability => Ok(()),
            _ => real,
        }
    }
}

impl ChipController for FaultyChip {
    fn start(&self) -> WifiResult<()> {
        self.inner.start()
    }
    fn stop(&self) -> WifiResult<()> {
        self.inner.stop()
    }
    fn get_id(&self) -> WifiResult<ChipId> {
        self.inner.get_id()
    }
    fn register_event_callback(&self, callback: Arc<dyn ChipEventCallback>) -> WifiResult<()> {
        self.inner.register_event_callback(callback)
    }
    fn get_capabilities(&self) -> WifiResult<ChipCapabilities> {
        self.inner.get_capabilities()
    }
    fn get_available_modes(&self) -> WifiResult<Vec<ChipMode>> {
        self.inner.get_available_modes()
    }
    fn configure_chip(&self, mode_id: ChipModeId) -> WifiResult<()> {
        self.inner.configure_chip(mode_id)
    }
    fn get_mode(&self) -> WifiResult<ChipModeId> {
        self.inner.get_mode()
    }
    fn request_chip_debug_info(&self) -> WifiResult<ChipDebugInfo> {
        self.inner.request_chip_debug_info()
    }
    fn request_driver_debug_dump(&self) -> WifiResult<Vec<u8>> {
        self.inner.request_driver_debug_dump()
    }
    fn request_firmware_debug_dump(&self) -> WifiResult<Vec<u8>> {
        self.inner.request_firmware_debug_dump()
    }
    fn create_iface(&self, iface_type: IfaceType) -> WifiResult<IfaceHandle> {
        self.inner.create_iface(iface_type)
    }
    fn get_iface_names(&self, iface_type: IfaceType) -> WifiResult<Vec<String>> {
        self.inner.get_iface_names(iface_type)
    }
    fn get_iface(&self, iface_type: IfaceType, name: &str) -> WifiResult<IfaceHandle> {
        self.inner.get_iface(iface_type, name)
    }
    fn remove_iface(&self, iface_type: IfaceType, name: &str) -> WifiResult<()> {
        match self.inner.remove_iface(iface_type, name) {
            Err(status)
                if self.fault == Fault::IdempotentRemove
                    && status.code == WifiStatusCode::ErrorInvalidArgs =>
            {
                Ok(())
            }
            other => other,
        }
    }
    fn get_debug_ring_buffers_status(&self) -> WifiResult<Vec<DebugRingBufferStatus>> {
        let rings = self.inner.get_debug_ring_buffers_status()?;
        Ok(match self.fault {
            Fault::NoRings => Vec::new(),
            Fault::UnnamedRings => rings
                .into_iter()
                .map(|ring| DebugRingBufferStatus {
                    ring_name: String::new(),
                    ..ring
                })
                .collect(),
            Fault::IdempotentRemove | Fault::RingOpsWithoutCapability => rings,
        })
    }
    fn start_logging_to_debug_ring_buffer(
        &self,
        ring_name: &str,
        verbose_level: RingBufferVerboseLevel,
        max_interval_in_sec: u32,
        min_data_size_in_bytes: u32,
    ) -> WifiResult<()> {
        self.ring_op(self.inner.start_logging_to_debug_ring_buffer(
            ring_name,
            verbose_level,
            max_interval_in_sec,
            min_data_size_in_bytes,
        ))
    }
    fn force_dump_to_debug_ring_buffer(&self, ring_name: &str) -> WifiResult<()> {
        self.ring_op(self.inner.force_dump_to_debug_ring_buffer(ring_name))
    }
    fn get_debug_host_wake_reason_stats(&self) -> WifiResult<HostWakeReasonStats> {
        self.inner.get_debug_host_wake_reason_stats()
    }
}

fn assert_assertion_failure(report: &ConformanceReport, name: &str) {
    match outcome_of(report, name) {
        ScenarioOutcome::Failed { kind, .. } => assert_eq!(kind, ErrorKind::Assertion, "{}", name),
        other => panic!("{} should fail, got {:?}", name, other),
    }
}

#[test]
fn test_idempotent_removal_is_caught() {
    init_logging();
    let report = run_catalog(&FaultyChip::harness(Fault::IdempotentRemove, false));

    for t in [IfaceType::Sta, IfaceType::Ap, IfaceType::P2p] {
        assert_assertion_failure(&report, &format!("remove_{}_iface", t.as_str()));
    }
    assert!(outcome_of(&report, "ap_iface_lifecycle").is_failed());
    // 其他场景不受影响
    assert!(outcome_of(&report, "get_sta_iface").is_passed());
    assert!(outcome_of(&report, "get_id").is_passed());
}

#[test]
fn test_missing_rings_are_caught() {
    init_logging();
    let report = run_catalog(&FaultyChip::harness(Fault::NoRings, false));

    assert_assertion_failure(&report, "start_logging_to_debug_ring_buffer");
    assert_assertion_failure(&report, "force_dump_to_debug_ring_buffer");
    // 空列表本身是合法的状态查询结果
    assert!(outcome_of(&report, "get_debug_ring_buffers_status").is_passed());
}

#[test]
fn test_ring_ops_without_capability_are_caught() {
    init_logging();
    let report = run_catalog(&FaultyChip::harness(Fault::RingOpsWithoutCapability, false));

    assert_assertion_failure(&report, "start_logging_to_debug_ring_buffer");
    assert_assertion_failure(&report, "force_dump_to_debug_ring_buffer");
    assert!(outcome_of(&report, "get_debug_ring_buffers_status").is_passed());
    assert!(outcome_of(&report, "request_firmware_debug_dump").is_passed());
}

#[test]
fn test_unnamed_rings_are_caught() {
    init_logging();
    let report = run_catalog(&FaultyChip::harness(Fault::UnnamedRings, false));

    assert_assertion_failure(&report, "get_debug_ring_buffers_status");
}

#[test]
fn test_nan_request_unsupported_controller() {
    init_logging();
    // 默认 trait 实现不支持 NAN 回调
    let harness = FaultyChip::harness(Fault::IdempotentRemove, true);
    let mut session = harness.setup().expect("setup");
    let err = session
        .configure_and_create(IfaceType::Nan)
        .expect_err("NAN registration must fail");
    assert_eq!(err.kind(), ErrorKind::NotSupported);

    // 注册失败后不应留下存活的 NAN 接口
    let lifecycle = session.lifecycle();
    assert!(lifecycle.list_names(IfaceType::Nan).expect("list").is_empty());
    assert_eq!(lifecycle.slot(IfaceType::Nan).expect("slot"), IfaceSlot::Absent);
    // 槽位已释放，P2P 可以创建
    session.configure_and_create(IfaceType::P2p).expect("p2p after failed nan");
    session.teardown().expect("teardown");
}
