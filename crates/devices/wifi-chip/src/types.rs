//! Chip data model: iface types, modes, combinations and capability bits

use serde::{Deserialize, Serialize};
use std::fmt;

pub type ChipId = u32;
pub type ChipModeId = u32;

/// Interface type tag
///
/// Closed set; per-type behaviour is expressed as data on this enum instead of
/// one code path per type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IfaceType {
    Sta,
    Ap,
    P2p,
    Nan,
}

impl IfaceType {
    pub const ALL: [IfaceType; 4] = [IfaceType::Ap, IfaceType::Nan, IfaceType::P2p, IfaceType::Sta];

    pub fn as_str(self) -> &'static str {
        match self {
            IfaceType::Sta => "sta",
            IfaceType::Ap => "ap",
            IfaceType::P2p => "p2p",
            IfaceType::Nan => "nan",
        }
    }

    /// NAN ifaces deliver their command responses through an event callback,
    /// which has to be registered before any request is issued.
    pub fn requires_event_callback(self) -> bool {
        matches!(self, IfaceType::Nan)
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "sta" => Some(IfaceType::Sta),
            "ap" => Some(IfaceType::Ap),
            "p2p" => Some(IfaceType::P2p),
            "nan" => Some(IfaceType::Nan),
            _ => None,
        }
    }
}

impl fmt::Display for IfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_ascii_uppercase())
    }
}

/// At most `max_ifaces` ifaces drawn from `types` may coexist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChipIfaceCombinationLimit {
    pub types: Vec<IfaceType>,
    pub max_ifaces: u32,
}

impl ChipIfaceCombinationLimit {
    pub fn new(types: impl Into<Vec<IfaceType>>, max_ifaces: u32) -> Self {
        Self {
            types: types.into(),
            max_ifaces,
        }
    }

    pub fn allows(&self, iface_type: IfaceType) -> bool {
        self.types.contains(&iface_type)
    }
}

/// A set of limits that must hold together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChipIfaceCombination {
    pub limits: Vec<ChipIfaceCombinationLimit>,
}

impl ChipIfaceCombination {
    pub fn new(limits: Vec<ChipIfaceCombinationLimit>) -> Self {
        Self { limits }
    }

    pub fn mentions(&self, iface_type: IfaceType) -> bool {
        self.limits.iter().any(|limit| limit.allows(iface_type))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChipMode {
    pub id: ChipModeId,
    pub available_combinations: Vec<ChipIfaceCombination>,
}

impl ChipMode {
    pub fn new(id: ChipModeId, available_combinations: Vec<ChipIfaceCombination>) -> Self {
        Self {
            id,
            available_combinations,
        }
    }

    pub fn supports(&self, iface_type: IfaceType) -> bool {
        self.available_combinations
            .iter()
            .any(|combination| combination.mentions(iface_type))
    }
}

/// Chip capability bitmask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChipCapabilities(u32);

impl ChipCapabilities {
    pub const DEBUG_MEMORY_FIRMWARE_DUMP: Self = Self(1 << 0);
    pub const DEBUG_MEMORY_DRIVER_DUMP: Self = Self(1 << 1);
    pub const DEBUG_RING_BUFFER_CONNECT_EVENT: Self = Self(1 << 2);
    pub const DEBUG_RING_BUFFER_POWER_EVENT: Self = Self(1 << 3);
    pub const DEBUG_RING_BUFFER_WAKELOCK_EVENT: Self = Self(1 << 4);
    pub const DEBUG_RING_BUFFER_VENDOR_DATA: Self = Self(1 << 5);
    pub const DEBUG_HOST_WAKE_REASON_STATS: Self = Self(1 << 6);
    pub const DEBUG_ERROR_ALERTS: Self = Self(1 << 7);

    pub const ANY_RING_BUFFER: Self = Self(
        Self::DEBUG_RING_BUFFER_CONNECT_EVENT.0
            | Self::DEBUG_RING_BUFFER_POWER_EVENT.0
            | Self::DEBUG_RING_BUFFER_WAKELOCK_EVENT.0
            | Self::DEBUG_RING_BUFFER_VENDOR_DATA.0,
    );

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn has_any_ring_buffer(self) -> bool {
        self.intersects(Self::ANY_RING_BUFFER)
    }
}

impl std::ops::BitOr for ChipCapabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChipDebugInfo {
    pub driver_description: String,
    pub firmware_description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RingBufferVerboseLevel {
    None,
    Default,
    Verbose,
    Excessive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugRingBufferStatus {
    pub ring_name: String,
    pub ring_id: u32,
    pub size_in_bytes: u32,
    pub free_size_in_bytes: u32,
    pub verbose_level: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HostWakeReasonStats {
    pub total_cmd_event_wake_cnt: u32,
    pub total_driver_fw_local_wake_cnt: u32,
    pub total_rx_packet_wake_cnt: u32,
}
