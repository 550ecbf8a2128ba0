//! Iface records and the non-owning handles given out to callers
//!
//! A controller keeps one [`IfaceRecord`] per live iface. Callers only ever see
//! [`IfaceHandle`]s: dropping a handle never removes the iface, while dropping
//! or invalidating the record turns every outstanding handle stale.

use crate::types::IfaceType;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use wifi_error::{WifiResult, WifiStatus, WifiStatusCode};

/// Iface liveness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum IfaceState {
    Live = 0,
    /// Explicitly removed by name
    Removed = 1,
    /// Torn down by a chip reconfigure or stop
    Invalidated = 2,
}

impl IfaceState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => IfaceState::Live,
            1 => IfaceState::Removed,
            _ => IfaceState::Invalidated,
        }
    }
}

#[derive(Debug)]
struct IfaceShared {
    id: u64,
    name: String,
    iface_type: IfaceType,
    state: AtomicU8,
}

/// Controller-side ownership of a live iface
#[derive(Debug)]
pub struct IfaceRecord {
    shared: Arc<IfaceShared>,
}

impl IfaceRecord {
    /// A fresh live record
    pub fn new(id: u64, name: impl Into<String>, iface_type: IfaceType) -> Self {
        Self {
            shared: Arc::new(IfaceShared {
                id,
                name: name.into(),
                iface_type,
                state: AtomicU8::new(IfaceState::Live as u8),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.shared.id
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn iface_type(&self) -> IfaceType {
        self.shared.iface_type
    }

    pub fn handle(&self) -> IfaceHandle {
        IfaceHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Set the state every outstanding handle observes
    pub fn mark(&self, state: IfaceState) {
        self.shared.state.store(state as u8, Ordering::Release);
    }

    pub fn state(&self) -> IfaceState {
        IfaceState::from_u8(self.shared.state.load(Ordering::Acquire))
    }
}

impl Drop for IfaceRecord {
    fn drop(&mut self) {
        // 记录被释放时，确保所有句柄失效
        if self.state() == IfaceState::Live {
            self.mark(IfaceState::Invalidated);
        }
    }
}

/// Non-owning reference to an iface living inside a controller
#[derive(Debug, Clone)]
pub struct IfaceHandle {
    shared: Arc<IfaceShared>,
}

impl IfaceHandle {
    fn check_live(&self) -> WifiResult<()> {
        match self.state() {
            IfaceState::Live => Ok(()),
            IfaceState::Removed => Err(WifiStatus::new(
                WifiStatusCode::ErrorWifiIfaceInvalid,
                format!("iface {} was removed", self.shared.name),
            )),
            IfaceState::Invalidated => Err(WifiStatus::new(
                WifiStatusCode::ErrorWifiIfaceInvalid,
                format!("iface {} was invalidated", self.shared.name),
            )),
        }
    }

    /// `ERROR_WIFI_IFACE_INVALID` once the iface is gone
    pub fn get_name(&self) -> WifiResult<String> {
        self.check_live()?;
        Ok(self.shared.name.clone())
    }

    pub fn get_type(&self) -> WifiResult<IfaceType> {
        self.check_live()?;
        Ok(self.shared.iface_type)
    }

    /// Controller-assigned identity, readable even after invalidation
    pub fn id(&self) -> u64 {
        self.shared.id
    }

    pub fn state(&self) -> IfaceState {
        IfaceState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    pub fn is_valid(&self) -> bool {
        self.state() == IfaceState::Live
    }

    /// Whether both handles reference the same controller-side iface
    pub fn same_iface(&self, other: &IfaceHandle) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    pub fn belongs_to(&self, record: &IfaceRecord) -> bool {
        Arc::ptr_eq(&self.shared, &record.shared)
    }
}
