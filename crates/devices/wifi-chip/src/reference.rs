//! In-memory reference chip
//!
//! Behaves like a real single-chip Wi-Fi device: an STA mode hosting one STA
//! plus one of P2P/NAN, and an AP mode hosting one AP. Creation is arbitrated
//! against the active mode's combinations, mode switches and `stop` invalidate
//! every live iface, and NAN command responses are delivered asynchronously on
//! a separate thread.

use crate::arbitration;
use crate::callbacks::{
    ChipEventCallback, NanCapabilities, NanCommandId, NanEventCallback, NanRequest,
};
use crate::controller::ChipController;
use crate::handle::{IfaceHandle, IfaceRecord, IfaceState};
use crate::types::{
    ChipCapabilities, ChipDebugInfo, ChipId, ChipIfaceCombination, ChipIfaceCombinationLimit,
    ChipMode, ChipModeId, DebugRingBufferStatus, HostWakeReasonStats, IfaceType,
    RingBufferVerboseLevel,
};
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use wifi_error::{WifiResult, WifiStatus, WifiStatusCode};

pub const STA_CHIP_MODE_ID: ChipModeId = 0;
pub const AP_CHIP_MODE_ID: ChipModeId = 1;

const RING_CONNECTIVITY: &str = "connectivity_events";
const RING_POWER: &str = "power_events";
const RING_WAKELOCK: &str = "wakelock_events";
const RING_VENDOR: &str = "vendor_data";
const RING_SIZE_BYTES: u32 = 32 * 1024;

/// Reference chip configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceChipConfig {
    pub chip_id: ChipId,
    pub sta_iface_name: String,
    pub ap_iface_name: String,
    pub p2p_iface_name: String,
    pub nan_iface_name: String,
    /// NAN shares the P2P slot of the STA mode only when the driver is feature aware
    pub feature_aware: bool,
    /// Raw capability bitmask, see [`ChipCapabilities`]
    pub capabilities: u32,
    /// Number of initial `start()` calls answered with `ERROR_NOT_AVAILABLE`
    pub startup_unavailable_calls: u32,
    pub driver_description: String,
    pub firmware_description: String,
    pub nan_response_delay_ms: u64,
}

impl Default for ReferenceChipConfig {
    fn default() -> Self {
        Self {
            chip_id: 0,
            sta_iface_name: "wlan0".to_string(),
            ap_iface_name: "wlan0".to_string(),
            p2p_iface_name: "p2p0".to_string(),
            nan_iface_name: "wlan0".to_string(),
            feature_aware: true,
            capabilities: (ChipCapabilities::DEBUG_MEMORY_FIRMWARE_DUMP
                | ChipCapabilities::DEBUG_MEMORY_DRIVER_DUMP
                | ChipCapabilities::DEBUG_RING_BUFFER_CONNECT_EVENT
                | ChipCapabilities::DEBUG_HOST_WAKE_REASON_STATS)
                .bits(),
            startup_unavailable_calls: 0,
            driver_description: "reference-driver 1.1".to_string(),
            firmware_description: "reference-firmware 1.1".to_string(),
            nan_response_delay_ms: 1,
        }
    }
}

impl ReferenceChipConfig {
    /// Configured name for ifaces of `iface_type`
    pub fn iface_name(&self, iface_type: IfaceType) -> &str {
        match iface_type {
            IfaceType::Sta => &self.sta_iface_name,
            IfaceType::Ap => &self.ap_iface_name,
            IfaceType::P2p => &self.p2p_iface_name,
            IfaceType::Nan => &self.nan_iface_name,
        }
    }

    pub fn chip_capabilities(&self) -> ChipCapabilities {
        ChipCapabilities::from_bits(self.capabilities)
    }

    /// Modes advertised by a chip built from this config
    pub fn modes(&self) -> Vec<ChipMode> {
        let shared_slot = if self.feature_aware {
            vec![IfaceType::P2p, IfaceType::Nan]
        } else {
            vec![IfaceType::P2p]
        };
        let sta = ChipMode::new(
            STA_CHIP_MODE_ID,
            vec![ChipIfaceCombination::new(vec![
                ChipIfaceCombinationLimit::new([IfaceType::Sta], 1),
                ChipIfaceCombinationLimit::new(shared_slot, 1),
            ])],
        );
        let ap = ChipMode::new(
            AP_CHIP_MODE_ID,
            vec![ChipIfaceCombination::new(vec![
                ChipIfaceCombinationLimit::new([IfaceType::Ap], 1),
            ])],
        );
        vec![sta, ap]
    }
}

#[derive(Default)]
struct ChipState {
    started: bool,
    start_calls: u32,
    current_mode: Option<ChipModeId>,
    ifaces: Vec<IfaceRecord>,
    next_iface_id: u64,
    event_callbacks: Vec<Arc<dyn ChipEventCallback>>,
    nan_callbacks: HashMap<u64, Arc<dyn NanEventCallback>>,
    ring_levels: HashMap<String, RingBufferVerboseLevel>,
}

impl ChipState {
    fn live_types(&self) -> Vec<IfaceType> {
        self.ifaces.iter().map(IfaceRecord::iface_type).collect()
    }

    fn find(&self, iface_type: IfaceType, name: &str) -> Option<usize> {
        self.ifaces
            .iter()
            .position(|r| r.iface_type() == iface_type && r.name() == name)
    }

    /// Drop every live iface; returns what was torn down
    fn invalidate_all(&mut self) -> Vec<(IfaceType, String)> {
        let torn_down = self
            .ifaces
            .drain(..)
            .map(|record| {
                record.mark(IfaceState::Invalidated);
                (record.iface_type(), record.name().to_string())
            })
            .collect();
        self.nan_callbacks.clear();
        torn_down
    }
}

/// Reference implementation of [`ChipController`]
pub struct ReferenceChip {
    config: ReferenceChipConfig,
    modes: Vec<ChipMode>,
    state: Mutex<ChipState>,
}

impl ReferenceChip {
    /// A stopped chip; call [`ChipController::start`] before anything else
    pub fn new(config: ReferenceChipConfig) -> Self {
        let modes = config.modes();
        Self {
            config,
            modes,
            state: Mutex::new(ChipState::default()),
        }
    }

    pub fn config(&self) -> &ReferenceChipConfig {
        &self.config
    }

    pub fn is_started(&self) -> bool {
        self.state.lock().started
    }

    /// Ifaces currently held by the chip, across all types
    pub fn live_iface_count(&self) -> usize {
        self.state.lock().ifaces.len()
    }

    fn not_started() -> WifiStatus {
        WifiStatus::new(WifiStatusCode::ErrorNotStarted, "chip is not started")
    }

    fn require_capability(&self, capability: ChipCapabilities, what: &str) -> WifiResult<()> {
        if self.config.chip_capabilities().contains(capability) {
            Ok(())
        } else {
            Err(WifiStatus::new(
                WifiStatusCode::ErrorNotSupported,
                format!("{} not supported", what),
            ))
        }
    }

    fn supported_rings(&self) -> Vec<&'static str> {
        let caps = self.config.chip_capabilities();
        [
            (ChipCapabilities::DEBUG_RING_BUFFER_CONNECT_EVENT, RING_CONNECTIVITY),
            (ChipCapabilities::DEBUG_RING_BUFFER_POWER_EVENT, RING_POWER),
            (ChipCapabilities::DEBUG_RING_BUFFER_WAKELOCK_EVENT, RING_WAKELOCK),
            (ChipCapabilities::DEBUG_RING_BUFFER_VENDOR_DATA, RING_VENDOR),
        ]
        .into_iter()
        .filter(|(bit, _)| caps.contains(*bit))
        .map(|(_, name)| name)
        .collect()
    }

    fn check_ring(&self, ring_name: &str) -> WifiResult<()> {
        if !self.config.chip_capabilities().has_any_ring_buffer() {
            return Err(WifiStatus::new(
                WifiStatusCode::ErrorNotSupported,
                "debug ring buffers not supported",
            ));
        }
        if !self.supported_rings().contains(&ring_name) {
            return Err(WifiStatus::new(
                WifiStatusCode::ErrorInvalidArgs,
                format!("unknown ring buffer {}", ring_name),
            ));
        }
        Ok(())
    }

    /// Pick the configured name, or the next free numbered variant if taken
    fn allocate_name(&self, state: &ChipState, iface_type: IfaceType) -> String {
        let base = self.config.iface_name(iface_type);
        let taken = |candidate: &str| state.ifaces.iter().any(|r| r.name() == candidate);
        if !taken(base) {
            return base.to_string();
        }

        let prefix = base.trim_end_matches(|c: char| c.is_ascii_digit());
        let start: u32 = base[prefix.len()..].parse().unwrap_or(0);
        let mut index = start + 1;
        loop {
            let candidate = format!("{}{}", prefix, index);
            if !taken(&candidate) {
                return candidate;
            }
            index += 1;
        }
    }

    fn owns_nan_iface(state: &ChipState, iface: &IfaceHandle) -> WifiResult<()> {
        let owned = state
            .ifaces
            .iter()
            .any(|r| r.iface_type() == IfaceType::Nan && iface.belongs_to(r));
        if owned && iface.is_valid() {
            Ok(())
        } else {
            Err(WifiStatus::new(
                WifiStatusCode::ErrorWifiIfaceInvalid,
                "not a live NAN iface of this chip",
            ))
        }
    }

    fn nan_capabilities() -> NanCapabilities {
        NanCapabilities {
            max_concurrent_clusters: 1,
            max_publishes: 8,
            max_subscribes: 8,
            max_ndi_interfaces: 1,
            max_ndp_sessions: 4,
        }
    }
}

impl Default for ReferenceChip {
    fn default() -> Self {
        Self::new(ReferenceChipConfig::default())
    }
}

impl ChipController for ReferenceChip {
    fn start(&self) -> WifiResult<()> {
        let mut state = self.state.lock();
        state.start_calls += 1;
        if state.start_calls <= self.config.startup_unavailable_calls {
            debug!("start call {} answered with ERROR_NOT_AVAILABLE", state.start_calls);
            return Err(WifiStatus::new(
                WifiStatusCode::ErrorNotAvailable,
                "service still starting",
            ));
        }
        if !state.started {
            info!("Chip {} started", self.config.chip_id);
            state.started = true;
        }
        Ok(())
    }

    fn stop(&self) -> WifiResult<()> {
        let mut state = self.state.lock();
        if !state.started {
            debug!("stop on an already stopped chip");
            return Ok(());
        }
        let torn_down = state.invalidate_all();
        state.started = false;
        state.current_mode = None;
        state.event_callbacks.clear();
        state.ring_levels.clear();
        info!("Chip {} stopped, {} iface(s) invalidated", self.config.chip_id, torn_down.len());
        Ok(())
    }

    fn get_id(&self) -> WifiResult<ChipId> {
        if !self.state.lock().started {
            return Err(Self::not_started());
        }
        Ok(self.config.chip_id)
    }

    fn register_event_callback(&self, callback: Arc<dyn ChipEventCallback>) -> WifiResult<()> {
        let mut state = self.state.lock();
        if !state.started {
            return Err(Self::not_started());
        }
        state.event_callbacks.push(callback);
        Ok(())
    }

    fn get_capabilities(&self) -> WifiResult<ChipCapabilities> {
        let state = self.state.lock();
        if !state.started {
            return Err(Self::not_started());
        }
        if state.current_mode.is_none() {
            return Err(WifiStatus::new(
                WifiStatusCode::ErrorNotAvailable,
                "chip mode not configured",
            ));
        }
        Ok(self.config.chip_capabilities())
    }

    fn get_available_modes(&self) -> WifiResult<Vec<ChipMode>> {
        if !self.state.lock().started {
            return Err(Self::not_started());
        }
        Ok(self.modes.clone())
    }

    fn configure_chip(&self, mode_id: ChipModeId) -> WifiResult<()> {
        let mut state = self.state.lock();
        if !state.started {
            return Err(Self::not_started());
        }

        if !self.modes.iter().any(|m| m.id == mode_id) {
            let status = WifiStatus::new(
                WifiStatusCode::ErrorInvalidArgs,
                format!("unknown mode id {}", mode_id),
            );
            warn!("configure_chip rejected: {}", status);
            let callbacks = state.event_callbacks.clone();
            drop(state);
            for callback in &callbacks {
                callback.on_chip_reconfigure_failure(&status);
            }
            return Err(status);
        }

        if state.current_mode == Some(mode_id) {
            debug!("Already in mode {}", mode_id);
            return Ok(());
        }

        let torn_down = state.invalidate_all();
        state.current_mode = Some(mode_id);
        info!(
            "Chip {} configured to mode {} ({} iface(s) invalidated)",
            self.config.chip_id,
            mode_id,
            torn_down.len()
        );

        let callbacks = state.event_callbacks.clone();
        drop(state);
        for callback in &callbacks {
            callback.on_chip_reconfigured(mode_id);
        }
        Ok(())
    }

    fn get_mode(&self) -> WifiResult<ChipModeId> {
        let state = self.state.lock();
        if !state.started {
            return Err(Self::not_started());
        }
        state.current_mode.ok_or_else(|| {
            WifiStatus::new(WifiStatusCode::ErrorNotAvailable, "chip mode not configured")
        })
    }

    fn request_chip_debug_info(&self) -> WifiResult<ChipDebugInfo> {
        if !self.state.lock().started {
            return Err(Self::not_started());
        }
        Ok(ChipDebugInfo {
            driver_description: self.config.driver_description.clone(),
            firmware_description: self.config.firmware_description.clone(),
        })
    }

    fn request_driver_debug_dump(&self) -> WifiResult<Vec<u8>> {
        if !self.state.lock().started {
            return Err(Self::not_started());
        }
        self.require_capability(ChipCapabilities::DEBUG_MEMORY_DRIVER_DUMP, "driver dump")?;
        Ok(self.config.driver_description.as_bytes().to_vec())
    }

    fn request_firmware_debug_dump(&self) -> WifiResult<Vec<u8>> {
        if !self.state.lock().started {
            return Err(Self::not_started());
        }
        self.require_capability(
            ChipCapabilities::DEBUG_MEMORY_FIRMWARE_DUMP,
            "firmware dump",
        )?;
        Ok(self.config.firmware_description.as_bytes().to_vec())
    }

    fn create_iface(&self, iface_type: IfaceType) -> WifiResult<IfaceHandle> {
        let mut state = self.state.lock();
        if !state.started {
            return Err(Self::not_started());
        }

        let Some(mode) = state
            .current_mode
            .and_then(|id| self.modes.iter().find(|m| m.id == id))
        else {
            return Err(WifiStatus::new(
                WifiStatusCode::ErrorNotAvailable,
                "chip mode not configured",
            ));
        };

        if !arbitration::can_add(mode, &state.live_types(), iface_type) {
            debug!("create_iface({}) rejected in mode {}: no free slot", iface_type, mode.id);
            return Err(WifiStatus::new(
                WifiStatusCode::ErrorNotAvailable,
                format!("no free {} slot in mode {}", iface_type, mode.id),
            ));
        }

        let name = self.allocate_name(&state, iface_type);
        state.next_iface_id += 1;
        let record = IfaceRecord::new(state.next_iface_id, name.clone(), iface_type);
        let handle = record.handle();
        state.ifaces.push(record);
        info!("Created {} iface {}", iface_type, name);

        let callbacks = state.event_callbacks.clone();
        drop(state);
        for callback in &callbacks {
            callback.on_iface_added(iface_type, &name);
        }
        Ok(handle)
    }

    fn get_iface_names(&self, iface_type: IfaceType) -> WifiResult<Vec<String>> {
        let state = self.state.lock();
        if !state.started {
            return Err(Self::not_started());
        }
        Ok(state
            .ifaces
            .iter()
            .filter(|r| r.iface_type() == iface_type)
            .map(|r| r.name().to_string())
            .collect())
    }

    fn get_iface(&self, iface_type: IfaceType, name: &str) -> WifiResult<IfaceHandle> {
        let state = self.state.lock();
        if !state.started {
            return Err(Self::not_started());
        }
        match state.find(iface_type, name) {
            Some(idx) => Ok(state.ifaces[idx].handle()),
            None => Err(WifiStatus::new(
                WifiStatusCode::ErrorInvalidArgs,
                format!("no {} iface named {:?}", iface_type, name),
            )),
        }
    }

    fn remove_iface(&self, iface_type: IfaceType, name: &str) -> WifiResult<()> {
        let mut state = self.state.lock();
        if !state.started {
            return Err(Self::not_started());
        }
        let Some(idx) = state.find(iface_type, name) else {
            return Err(WifiStatus::new(
                WifiStatusCode::ErrorInvalidArgs,
                format!("no {} iface named {:?}", iface_type, name),
            ));
        };

        let record = state.ifaces.remove(idx);
        record.mark(IfaceState::Removed);
        state.nan_callbacks.remove(&record.id());
        info!("Removed {} iface {}", iface_type, name);

        let callbacks = state.event_callbacks.clone();
        drop(state);
        for callback in &callbacks {
            callback.on_iface_removed(iface_type, name);
        }
        Ok(())
    }

    fn get_debug_ring_buffers_status(&self) -> WifiResult<Vec<DebugRingBufferStatus>> {
        let state = self.state.lock();
        if !state.started {
            return Err(Self::not_started());
        }
        if !self.config.chip_capabilities().has_any_ring_buffer() {
            return Err(WifiStatus::new(
                WifiStatusCode::ErrorNotSupported,
                "debug ring buffers not supported",
            ));
        }
        Ok(self
            .supported_rings()
            .into_iter()
            .enumerate()
            .map(|(idx, ring)| {
                let level = state
                    .ring_levels
                    .get(ring)
                    .copied()
                    .unwrap_or(RingBufferVerboseLevel::None);
                DebugRingBufferStatus {
                    ring_name: ring.to_string(),
                    ring_id: idx as u32,
                    size_in_bytes: RING_SIZE_BYTES,
                    free_size_in_bytes: RING_SIZE_BYTES,
                    verbose_level: level as u32,
                }
            })
            .collect())
    }

    fn start_logging_to_debug_ring_buffer(
        &self,
        ring_name: &str,
        verbose_level: RingBufferVerboseLevel,
        _max_interval_in_sec: u32,
        _min_data_size_in_bytes: u32,
    ) -> WifiResult<()> {
        let mut state = self.state.lock();
        if !state.started {
            return Err(Self::not_started());
        }
        self.check_ring(ring_name)?;
        state.ring_levels.insert(ring_name.to_string(), verbose_level);
        debug!("Ring {} logging at {:?}", ring_name, verbose_level);
        Ok(())
    }

    fn force_dump_to_debug_ring_buffer(&self, ring_name: &str) -> WifiResult<()> {
        if !self.state.lock().started {
            return Err(Self::not_started());
        }
        self.check_ring(ring_name)
    }

    fn get_debug_host_wake_reason_stats(&self) -> WifiResult<HostWakeReasonStats> {
        if !self.state.lock().started {
            return Err(Self::not_started());
        }
        self.require_capability(
            ChipCapabilities::DEBUG_HOST_WAKE_REASON_STATS,
            "host wake reason stats",
        )?;
        Ok(HostWakeReasonStats::default())
    }

    fn nan_register_event_callback(
        &self,
        iface: &IfaceHandle,
        callback: Arc<dyn NanEventCallback>,
    ) -> WifiResult<()> {
        let mut state = self.state.lock();
        if !state.started {
            return Err(Self::not_started());
        }
        Self::owns_nan_iface(&state, iface)?;
        state.nan_callbacks.insert(iface.id(), callback);
        Ok(())
    }

    fn nan_request(
        &self,
        iface: &IfaceHandle,
        id: NanCommandId,
        request: NanRequest,
    ) -> WifiResult<()> {
        let state = self.state.lock();
        if !state.started {
            return Err(Self::not_started());
        }
        Self::owns_nan_iface(&state, iface)?;

        let Some(callback) = state.nan_callbacks.get(&iface.id()).cloned() else {
            // 未注册回调时请求仍被接受，但响应会被丢弃
            debug!("NAN {} request {} accepted without a callback", request.name(), id);
            return Ok(());
        };
        drop(state);

        let delay = Duration::from_millis(self.config.nan_response_delay_ms);
        let spawned = std::thread::Builder::new()
            .name(format!("nan-response-{}", id))
            .spawn(move || {
                std::thread::sleep(delay);
                let status = WifiStatus::success();
                match request {
                    NanRequest::Enable(_) => callback.notify_enable_response(id, &status),
                    NanRequest::Disable => callback.notify_disable_response(id, &status),
                    NanRequest::GetCapabilities => callback.notify_capabilities_response(
                        id,
                        &status,
                        &Self::nan_capabilities(),
                    ),
                }
            });

        match spawned {
            Ok(_) => Ok(()),
            Err(e) => Err(WifiStatus::new(
                WifiStatusCode::ErrorUnknown,
                format!("failed to deliver NAN response: {}", e),
            )),
        }
    }
}
