//! Chip event recording

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use wifi_chip::{ChipEventCallback, ChipModeId, IfaceType};
use wifi_error::{WifiStatus, WifiStatusCode};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChipEvent {
    Reconfigured(ChipModeId),
    ReconfigureFailed(WifiStatusCode),
    IfaceAdded { iface_type: IfaceType, name: String },
    IfaceRemoved { iface_type: IfaceType, name: String },
}

/// Chip event callback that keeps every event in arrival order
#[derive(Debug, Default)]
pub struct EventRecorder {
    events: Mutex<Vec<ChipEvent>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events in arrival order
    pub fn events(&self) -> Vec<ChipEvent> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn contains(&self, event: &ChipEvent) -> bool {
        self.events.lock().contains(event)
    }

    fn push(&self, event: ChipEvent) {
        log::debug!("chip event: {:?}", event);
        self.events.lock().push(event);
    }
}

impl ChipEventCallback for EventRecorder {
    fn on_chip_reconfigured(&self, mode_id: ChipModeId) {
        self.push(ChipEvent::Reconfigured(mode_id));
    }

    fn on_chip_reconfigure_failure(&self, status: &WifiStatus) {
        self.push(ChipEvent::ReconfigureFailed(status.code));
    }

    fn on_iface_added(&self, iface_type: IfaceType, name: &str) {
        self.push(ChipEvent::IfaceAdded {
            iface_type,
            name: name.to_string(),
        });
    }

    fn on_iface_removed(&self, iface_type: IfaceType, name: &str) {
        self.push(ChipEvent::IfaceRemoved {
            iface_type,
            name: name.to_string(),
        });
    }
}
