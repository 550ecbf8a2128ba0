//! Event callbacks raised by a chip controller
//!
//! Callbacks may fire from a controller-owned thread, so implementors must be
//! `Send + Sync`. All methods default to no-ops.

use crate::types::{ChipModeId, IfaceType};
use serde::{Deserialize, Serialize};
use wifi_error::WifiStatus;

/// Observer for chip-level events; every method defaults to a no-op
pub trait ChipEventCallback: Send + Sync {
    fn on_chip_reconfigured(&self, _mode_id: ChipModeId) {}

    fn on_chip_reconfigure_failure(&self, _status: &WifiStatus) {}

    fn on_iface_added(&self, _iface_type: IfaceType, _name: &str) {}

    fn on_iface_removed(&self, _iface_type: IfaceType, _name: &str) {}
}

/// Command id carried by every NAN request and echoed in its response
pub type NanCommandId = u16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NanEnableRequest {
    pub master_pref: u8,
    pub cluster_id_low: u16,
    pub cluster_id_high: u16,
    pub disable_discovery_address_change_indication: bool,
}

impl Default for NanEnableRequest {
    fn default() -> Self {
        Self {
            master_pref: 2,
            cluster_id_low: 0,
            cluster_id_high: 0xffff,
            disable_discovery_address_change_indication: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NanRequest {
    Enable(NanEnableRequest),
    Disable,
    GetCapabilities,
}

impl NanRequest {
    pub fn name(&self) -> &'static str {
        match self {
            NanRequest::Enable(_) => "enable",
            NanRequest::Disable => "disable",
            NanRequest::GetCapabilities => "get_capabilities",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NanCapabilities {
    pub max_concurrent_clusters: u32,
    pub max_publishes: u32,
    pub max_subscribes: u32,
    pub max_ndi_interfaces: u32,
    pub max_ndp_sessions: u32,
}

/// Receiver for asynchronous NAN command responses and events
///
/// Responses echo the [`NanCommandId`] of the request that caused them and
/// may arrive on any thread.
pub trait NanEventCallback: Send + Sync {
    fn notify_enable_response(&self, _id: NanCommandId, _status: &WifiStatus) {}

    fn notify_disable_response(&self, _id: NanCommandId, _status: &WifiStatus) {}

    fn notify_capabilities_response(
        &self,
        _id: NanCommandId,
        _status: &WifiStatus,
        _capabilities: &NanCapabilities,
    ) {
    }

    /// Unsolicited: the NAN cluster went down
    fn event_disabled(&self, _status: &WifiStatus) {}
}
