//! Wi-Fi chip model and controller contract
//!
//! - [`types`]: modes, combinations, iface types and capability bits
//! - [`controller`]: the [`ChipController`] trait every device under test implements
//! - [`handle`]: controller-owned iface records and non-owning [`IfaceHandle`]s
//! - [`arbitration`]: combination fitting and first-match mode lookup
//! - [`reference`]: an in-memory [`ReferenceChip`]

pub mod arbitration;
pub mod callbacks;
pub mod controller;
pub mod handle;
pub mod reference;
pub mod types;

pub use arbitration::{can_add, find_mode_for_type, fits_mode};
pub use callbacks::{
    ChipEventCallback, NanCapabilities, NanCommandId, NanEnableRequest, NanEventCallback,
    NanRequest,
};
pub use controller::{ChipController, ChipProvider, FactoryChipProvider, StaticChipProvider};
pub use handle::{IfaceHandle, IfaceRecord, IfaceState};
pub use reference::{AP_CHIP_MODE_ID, ReferenceChip, ReferenceChipConfig, STA_CHIP_MODE_ID};
pub use types::{
    ChipCapabilities, ChipDebugInfo, ChipId, ChipIfaceCombination, ChipIfaceCombinationLimit,
    ChipMode, ChipModeId, DebugRingBufferStatus, HostWakeReasonStats, IfaceType,
    RingBufferVerboseLevel,
};
