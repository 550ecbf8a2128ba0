//! Iface lifecycle over every iface type
//!
//! One code path serves all types. Per slot the observable state machine is
//! `Absent --create--> Live(name) --remove--> Absent`; failed calls do not
//! transition and a mode switch forces `Live -> Absent`.

use log::debug;
use std::sync::Arc;
use wifi_chip::{ChipController, IfaceHandle, IfaceType};
use wifi_error::{HarnessResult, WifiResultExt};

/// Observed state of one iface type's slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IfaceSlot {
    /// No live iface of this type
    Absent,
    /// One live iface with the given name
    Live(String),
}

/// create / list / get / remove for one chip, uniform over [`IfaceType`]
///
/// Holds no state of its own; every call goes to the controller, so the
/// observed slot always reflects what the chip reports.
///
/// # 示例
///
/// ```rust,ignore
/// let lifecycle = InterfaceLifecycle::new(chip);
/// let handle = lifecycle.create(IfaceType::Ap)?;
/// let name = lifecycle.name_of(&handle)?;
/// assert_eq!(lifecycle.list_names(IfaceType::Ap)?, vec![name.clone()]);
/// lifecycle.remove(IfaceType::Ap, &name)?;
/// ```
pub struct InterfaceLifecycle {
    chip: Arc<dyn ChipController>,
}

impl InterfaceLifecycle {
    /// Bind to `chip`; the chip must already be configured for creation to succeed
    pub fn new(chip: Arc<dyn ChipController>) -> Self {
        Self { chip }
    }

    /// Fails with `NotAvailable` while the type's slot is full
    pub fn create(&self, iface_type: IfaceType) -> HarnessResult<IfaceHandle> {
        let handle = self
            .chip
            .create_iface(iface_type)
            .during(format!("create_iface({})", iface_type))?;
        debug!("create({}) -> iface #{}", iface_type, handle.id());
        Ok(handle)
    }

    /// Names of the live ifaces of `iface_type`
    ///
    /// Empty when the slot is absent, including right after a mode switch.
    pub fn list_names(&self, iface_type: IfaceType) -> HarnessResult<Vec<String>> {
        self.chip
            .get_iface_names(iface_type)
            .during(format!("get_iface_names({})", iface_type))
    }

    /// Exact-match lookup; any other name is `InvalidArgument`
    pub fn get_by_name(&self, iface_type: IfaceType, name: &str) -> HarnessResult<IfaceHandle> {
        self.chip
            .get_iface(iface_type, name)
            .during(format!("get_iface({}, {:?})", iface_type, name))
    }

    /// Not idempotent: removing an unknown or already removed name is `InvalidArgument`
    pub fn remove(&self, iface_type: IfaceType, name: &str) -> HarnessResult<()> {
        self.chip
            .remove_iface(iface_type, name)
            .during(format!("remove_iface({}, {:?})", iface_type, name))
    }

    /// Name behind `handle`; fails with `Invalidated` once the iface is gone
    pub fn name_of(&self, handle: &IfaceHandle) -> HarnessResult<String> {
        handle.get_name().during("get_name")
    }

    /// Current slot state, derived from [`InterfaceLifecycle::list_names`]
    pub fn slot(&self, iface_type: IfaceType) -> HarnessResult<IfaceSlot> {
        Ok(match self.list_names(iface_type)?.into_iter().next() {
            Some(name) => IfaceSlot::Live(name),
            None => IfaceSlot::Absent,
        })
    }
}
