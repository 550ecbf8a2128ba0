//! Mode selection and chip configuration
//!
//! Modes are queried fresh on every call and never cached, since a chip may
//! change what it advertises across restarts.

use log::{debug, info, warn};
use std::sync::Arc;
use wifi_chip::{ChipController, ChipModeId, IfaceType, find_mode_for_type};
use wifi_error::{HarnessError, HarnessResult, WifiResultExt};

/// First-match mode selection over the modes a chip currently reports
pub struct ModeSelector {
    chip: Arc<dyn ChipController>,
}

impl ModeSelector {
    pub fn new(chip: Arc<dyn ChipController>) -> Self {
        Self { chip }
    }

    /// First mode, in the chip's enumeration order, able to host `iface_type`
    pub fn find_mode(&self, iface_type: IfaceType) -> HarnessResult<Option<ChipModeId>> {
        let modes = self.chip.get_available_modes().during("get_available_modes")?;
        let found = find_mode_for_type(&modes, iface_type);
        debug!("Mode lookup for {} over {} mode(s): {:?}", iface_type, modes.len(), found);
        Ok(found)
    }

    /// Configure the chip into the first mode supporting `iface_type`
    ///
    /// On success every iface created before the call is invalidated by the
    /// controller if the mode changed.
    pub fn select_and_configure(&self, iface_type: IfaceType) -> HarnessResult<ChipModeId> {
        let Some(mode_id) = self.find_mode(iface_type)? else {
            warn!("No chip mode supports {}", iface_type);
            return Err(HarnessError::ModeNotFound(iface_type.to_string()));
        };

        if let Err(status) = self.chip.configure_chip(mode_id) {
            warn!("Chip rejected mode {} for {}: {}", mode_id, iface_type, status);
            return Err(HarnessError::ConfigureRejected {
                mode_id,
                source: status,
            });
        }

        info!("Configured mode {} for {}", mode_id, iface_type);
        Ok(mode_id)
    }
}
