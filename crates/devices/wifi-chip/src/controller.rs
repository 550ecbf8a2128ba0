//! The chip controller contract
//!
//! Every call reports a [`WifiStatus`] on the error path. Controllers are
//! shared behind `Arc<dyn ChipController>` and may raise callbacks from their
//! own threads, hence `Send + Sync`.

use crate::callbacks::{ChipEventCallback, NanCommandId, NanEventCallback, NanRequest};
use crate::handle::IfaceHandle;
use crate::types::{
    ChipCapabilities, ChipDebugInfo, ChipId, ChipMode, ChipModeId, DebugRingBufferStatus,
    HostWakeReasonStats, IfaceType, RingBufferVerboseLevel,
};
use std::sync::Arc;
use wifi_error::{WifiResult, WifiStatus, WifiStatusCode};

/// A Wi-Fi chip as seen by the conformance harness
///
/// Implementations own the iface records; callers only ever hold
/// [`IfaceHandle`]s, which go invalid when the controller drops the record.
pub trait ChipController: Send + Sync {
    /// Bring the service up; may report `ERROR_NOT_AVAILABLE` while it is still starting
    fn start(&self) -> WifiResult<()>;

    /// Tear down every iface and the active mode; stopping twice is not an error
    fn stop(&self) -> WifiResult<()>;

    fn get_id(&self) -> WifiResult<ChipId>;

    fn register_event_callback(&self, callback: Arc<dyn ChipEventCallback>) -> WifiResult<()>;

    fn get_capabilities(&self) -> WifiResult<ChipCapabilities>;

    fn get_available_modes(&self) -> WifiResult<Vec<ChipMode>>;

    /// Switch modes; live ifaces are invalidated when the mode changes
    fn configure_chip(&self, mode_id: ChipModeId) -> WifiResult<()>;

    fn get_mode(&self) -> WifiResult<ChipModeId>;

    fn request_chip_debug_info(&self) -> WifiResult<ChipDebugInfo>;

    fn request_driver_debug_dump(&self) -> WifiResult<Vec<u8>>;

    fn request_firmware_debug_dump(&self) -> WifiResult<Vec<u8>>;

    fn create_iface(&self, iface_type: IfaceType) -> WifiResult<IfaceHandle>;

    fn get_iface_names(&self, iface_type: IfaceType) -> WifiResult<Vec<String>>;

    /// Exact name match only
    fn get_iface(&self, iface_type: IfaceType, name: &str) -> WifiResult<IfaceHandle>;

    /// Not idempotent: a second removal of the same name is `ERROR_INVALID_ARGS`
    fn remove_iface(&self, iface_type: IfaceType, name: &str) -> WifiResult<()>;

    fn get_debug_ring_buffers_status(&self) -> WifiResult<Vec<DebugRingBufferStatus>>;

    fn start_logging_to_debug_ring_buffer(
        &self,
        ring_name: &str,
        verbose_level: RingBufferVerboseLevel,
        max_interval_in_sec: u32,
        min_data_size_in_bytes: u32,
    ) -> WifiResult<()>;

    fn force_dump_to_debug_ring_buffer(&self, ring_name: &str) -> WifiResult<()>;

    fn get_debug_host_wake_reason_stats(&self) -> WifiResult<HostWakeReasonStats>;

    /// Register the response sink for a NAN iface
    fn nan_register_event_callback(
        &self,
        _iface: &IfaceHandle,
        _callback: Arc<dyn NanEventCallback>,
    ) -> WifiResult<()> {
        Err(WifiStatus::new(
            WifiStatusCode::ErrorNotSupported,
            "NAN callbacks not supported",
        ))
    }

    /// Issue a NAN command; the outcome arrives on the registered callback
    fn nan_request(
        &self,
        _iface: &IfaceHandle,
        _id: NanCommandId,
        _request: NanRequest,
    ) -> WifiResult<()> {
        Err(WifiStatus::new(
            WifiStatusCode::ErrorNotSupported,
            "NAN requests not supported",
        ))
    }
}

/// Opaque lookup of the chip under test
pub trait ChipProvider: Send + Sync {
    fn get_chip(&self) -> WifiResult<Arc<dyn ChipController>>;
}

/// Provider handing out one fixed controller instance
pub struct StaticChipProvider {
    chip: Arc<dyn ChipController>,
}

impl StaticChipProvider {
    pub fn new(chip: Arc<dyn ChipController>) -> Self {
        Self { chip }
    }
}

impl ChipProvider for StaticChipProvider {
    fn get_chip(&self) -> WifiResult<Arc<dyn ChipController>> {
        Ok(Arc::clone(&self.chip))
    }
}

/// Provider building a fresh controller on every lookup
pub struct FactoryChipProvider<F>
where
    F: Fn() -> Arc<dyn ChipController> + Send + Sync,
{
    factory: F,
}

impl<F> FactoryChipProvider<F>
where
    F: Fn() -> Arc<dyn ChipController> + Send + Sync,
{
    pub fn new(factory: F) -> Self {
        Self { factory }
    }
}

impl<F> ChipProvider for FactoryChipProvider<F>
where
    F: Fn() -> Arc<dyn ChipController> + Send + Sync,
{
    fn get_chip(&self) -> WifiResult<Arc<dyn ChipController>> {
        Ok((self.factory)())
    }
}
