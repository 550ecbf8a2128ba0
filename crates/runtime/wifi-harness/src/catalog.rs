//! Conformance scenario catalog
//!
//! Chip-level scenarios plus four lifecycle scenarios per iface type, all
//! generated from [`IfaceType::ALL`]. Scenarios for a type disabled in the
//! harness config are skipped; for NAN a dedicated scenario then checks that
//! no mode advertises it.

use crate::events::ChipEvent;
use crate::harness::ChipSession;
use crate::scenario::assert::{ensure, ensure_eq, expect_kind};
use crate::scenario::{Requirement, Scenario};
use wifi_chip::arbitration::max_ifaces_of_type;
use wifi_chip::{
    ChipCapabilities, ChipController, ChipMode, ChipModeId, IfaceType, NanEnableRequest,
    RingBufferVerboseLevel,
};
use wifi_error::{ErrorKind, HarnessError, HarnessResult, WifiResult, WifiResultExt};

/// Every conformance scenario, in execution order
pub fn conformance_catalog() -> Vec<Scenario> {
    let mut scenarios = chip_scenarios();
    scenarios.extend(debug_scenarios());
    for iface_type in IfaceType::ALL {
        scenarios.extend(iface_scenarios(iface_type));
    }
    scenarios.extend(invalidation_scenarios());
    scenarios.extend(nan_scenarios());
    scenarios
}

/// Names of [`conformance_catalog`] in execution order
pub fn scenario_names() -> Vec<String> {
    conformance_catalog()
        .iter()
        .map(|s| s.name().to_string())
        .collect()
}

/// Keep only the scenarios whose name contains one of `patterns`
pub fn select(scenarios: Vec<Scenario>, patterns: &[String]) -> Vec<Scenario> {
    if patterns.is_empty() {
        return scenarios;
    }
    scenarios
        .into_iter()
        .filter(|s| patterns.iter().any(|p| s.name().contains(p.as_str())))
        .collect()
}

fn mode_by_id(session: &ChipSession, mode_id: ChipModeId) -> HarnessResult<ChipMode> {
    let modes = session
        .chip()
        .get_available_modes()
        .during("get_available_modes")?;
    modes
        .into_iter()
        .find(|m| m.id == mode_id)
        .ok_or_else(|| HarnessError::assertion(format!("mode {} vanished", mode_id)))
}

fn chip_scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new("get_id", |s| {
            let id = s.chip().get_id().during("get_id")?;
            ensure(id != u32::MAX, "chip id must not be the invalid id")
        }),
        Scenario::new("get_available_modes", |s| {
            let modes = s.chip().get_available_modes().during("get_available_modes")?;
            ensure(!modes.is_empty(), "chip must advertise at least one mode")
        }),
        Scenario::new("configure_chip", |s| {
            let modes = s.chip().get_available_modes().during("get_available_modes")?;
            for mode in modes {
                // 每个模式都在全新启动的芯片上配置
                s.restart()?;
                s.chip()
                    .configure_chip(mode.id)
                    .during(format!("configure_chip({})", mode.id))?;
                ensure_eq(s.chip().get_mode().during("get_mode")?, mode.id, "active mode")?;
                s.pause_between_modes();
            }
            Ok(())
        }),
        Scenario::new("configure_chip_unknown_mode", |s| {
            let modes = s.chip().get_available_modes().during("get_available_modes")?;
            let unknown = modes.iter().map(|m| m.id).max().unwrap_or(0).saturating_add(1);
            expect_kind(
                s.chip().configure_chip(unknown).during("configure_chip"),
                ErrorKind::InvalidArgument,
                "configure_chip(unknown mode)",
            )?;
            expect_kind(
                s.chip().get_mode().during("get_mode"),
                ErrorKind::NotAvailable,
                "get_mode on unconfigured chip",
            )
        }),
        Scenario::new("get_capabilities", |s| {
            s.configure_for(IfaceType::Sta)?;
            let caps = s.chip().get_capabilities().during("get_capabilities")?;
            ensure(!caps.is_empty(), "capabilities must not be empty")
        }),
        Scenario::new("get_mode", |s| {
            let mode_id = s.configure_for(IfaceType::Sta)?;
            ensure_eq(s.chip().get_mode().during("get_mode")?, mode_id, "active mode")
        }),
        Scenario::new("request_chip_debug_info", |s| {
            s.configure_for(IfaceType::Sta)?;
            let info = s
                .chip()
                .request_chip_debug_info()
                .during("request_chip_debug_info")?;
            ensure(
                !info.driver_description.is_empty(),
                "driver description must not be empty",
            )?;
            ensure(
                !info.firmware_description.is_empty(),
                "firmware description must not be empty",
            )
        }),
    ]
}

type DebugOp = fn(&dyn ChipController) -> WifiResult<()>;

/// Success when the capability is advertised, `NotSupported` otherwise
fn capability_gated(
    name: &'static str,
    supported: fn(ChipCapabilities) -> bool,
    op: DebugOp,
) -> Scenario {
    Scenario::new(name, move |s| {
        s.configure_for(IfaceType::Sta)?;
        let caps = s.chip().get_capabilities().during("get_capabilities")?;
        let result = op(s.chip().as_ref()).during(name);
        if supported(caps) {
            result
        } else {
            expect_kind(result, ErrorKind::NotSupported, name)
        }
    })
}

type RingOp = fn(&dyn ChipController, &str) -> WifiResult<()>;

/// Run `op` on the first reported ring buffer
///
/// With a ring capability advertised the chip must report at least one ring
/// and `op` must succeed. Without one, both the status query and `op` on an
/// empty ring name must fail with `NotSupported`.
fn ring_buffer_op(name: &'static str, op: RingOp) -> Scenario {
    Scenario::new(name, move |s| {
        s.configure_for(IfaceType::Sta)?;
        let caps = s.chip().get_capabilities().during("get_capabilities")?;
        let chip = s.chip().as_ref();
        let rings = chip
            .get_debug_ring_buffers_status()
            .during("get_debug_ring_buffers_status");

        if caps.has_any_ring_buffer() {
            let rings = rings?;
            let first = rings.first().ok_or_else(|| {
                HarnessError::assertion("ring buffer capability advertised but no rings reported")
            })?;
            op(chip, &first.ring_name).during(name)
        } else {
            expect_kind(rings, ErrorKind::NotSupported, "get_debug_ring_buffers_status")?;
            expect_kind(op(chip, "").during(name), ErrorKind::NotSupported, name)
        }
    })
}

fn debug_scenarios() -> Vec<Scenario> {
    vec![
        capability_gated(
            "request_firmware_debug_dump",
            |caps| caps.contains(ChipCapabilities::DEBUG_MEMORY_FIRMWARE_DUMP),
            |chip| chip.request_firmware_debug_dump().map(|_| ()),
        ),
        capability_gated(
            "request_driver_debug_dump",
            |caps| caps.contains(ChipCapabilities::DEBUG_MEMORY_DRIVER_DUMP),
            |chip| chip.request_driver_debug_dump().map(|_| ()),
        ),
        Scenario::new("get_debug_ring_buffers_status", |s| {
            s.configure_for(IfaceType::Sta)?;
            let caps = s.chip().get_capabilities().during("get_capabilities")?;
            let rings = s
                .chip()
                .get_debug_ring_buffers_status()
                .during("get_debug_ring_buffers_status");
            if !caps.has_any_ring_buffer() {
                return expect_kind(rings, ErrorKind::NotSupported, "get_debug_ring_buffers_status");
            }
            for ring in rings? {
                ensure(!ring.ring_name.is_empty(), "ring buffer reported with an empty name")?;
            }
            Ok(())
        }),
        ring_buffer_op("start_logging_to_debug_ring_buffer", |chip, ring| {
            chip.start_logging_to_debug_ring_buffer(ring, RingBufferVerboseLevel::Verbose, 5, 1024)
        }),
        ring_buffer_op("force_dump_to_debug_ring_buffer", |chip, ring| {
            chip.force_dump_to_debug_ring_buffer(ring)
        }),
        capability_gated(
            "get_debug_host_wake_reason_stats",
            |caps| caps.contains(ChipCapabilities::DEBUG_HOST_WAKE_REASON_STATS),
            |chip| chip.get_debug_host_wake_reason_stats().map(|_| ()),
        ),
    ]
}

/// Create one iface of `iface_type` under a freshly selected mode
fn configure_and_name(s: &mut ChipSession, iface_type: IfaceType) -> HarnessResult<String> {
    let handle = s.configure_and_create(iface_type)?;
    s.lifecycle().name_of(&handle)
}

fn iface_scenarios(t: IfaceType) -> Vec<Scenario> {
    let requirement = Requirement::Enabled(t);
    vec![
        // 槽位排他：填满后再创建失败，删除后可再次创建
        Scenario::new(format!("create_{}_iface", t.as_str()), move |s| {
            let mode_id = s.configure_for(t)?;
            let capacity = max_ifaces_of_type(&mode_by_id(s, mode_id)?, t);
            ensure(capacity > 0, format!("mode {} cannot host {}", mode_id, t))?;

            let mut names = Vec::new();
            for _ in 0..capacity {
                let handle = s.create_iface(t)?;
                names.push(s.lifecycle().name_of(&handle)?);
            }
            expect_kind(
                s.create_iface(t),
                ErrorKind::NotAvailable,
                &format!("create_iface({}) with a full slot", t),
            )?;

            let lifecycle = s.lifecycle();
            if let Some(name) = names.first() {
                lifecycle.remove(t, name)?;
            }
            s.create_iface(t).map(|_| ())
        })
        .requires(requirement),
        Scenario::new(format!("get_{}_iface_names", t.as_str()), move |s| {
            s.configure_for(t)?;
            let lifecycle = s.lifecycle();
            ensure_eq(lifecycle.list_names(t)?, Vec::new(), "names before create")?;

            let handle = s.create_iface(t)?;
            let name = lifecycle.name_of(&handle)?;
            ensure_eq(lifecycle.list_names(t)?, vec![name.clone()], "names after create")?;

            lifecycle.remove(t, &name)?;
            ensure_eq(lifecycle.list_names(t)?, Vec::new(), "names after remove")
        })
        .requires(requirement),
        Scenario::new(format!("get_{}_iface", t.as_str()), move |s| {
            let name = configure_and_name(s, t)?;
            let lifecycle = s.lifecycle();

            let found = lifecycle.get_by_name(t, &name)?;
            ensure_eq(found.get_name().during("get_name")?, name.clone(), "looked up name")?;
            let again = lifecycle.get_by_name(t, &name)?;
            ensure(found.same_iface(&again), "lookups must refer to the same iface")?;

            expect_kind(
                lifecycle.get_by_name(t, &format!("{}0", name)),
                ErrorKind::InvalidArgument,
                "get_iface(invalid name)",
            )
        })
        .requires(requirement),
        Scenario::new(format!("remove_{}_iface", t.as_str()), move |s| {
            let name = configure_and_name(s, t)?;
            let lifecycle = s.lifecycle();

            expect_kind(
                lifecycle.remove(t, &format!("{}0", name)),
                ErrorKind::InvalidArgument,
                "remove_iface(invalid name)",
            )?;
            lifecycle.remove(t, &name)?;
            expect_kind(
                lifecycle.remove(t, &name),
                ErrorKind::InvalidArgument,
                "remove_iface(already removed)",
            )
        })
        .requires(requirement),
    ]
}

fn invalidation_scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new("ap_iface_lifecycle", |s| {
            let t = IfaceType::Ap;
            s.configure_for(t)?;
            let lifecycle = s.lifecycle();

            let handle = lifecycle.create(t)?;
            let name = lifecycle.name_of(&handle)?;
            ensure_eq(lifecycle.list_names(t)?, vec![name.clone()], "names after create")?;
            expect_kind(lifecycle.create(t), ErrorKind::NotAvailable, "second AP create")?;
            lifecycle.remove(t, &name)?;
            ensure_eq(lifecycle.list_names(t)?, Vec::new(), "names after remove")?;
            expect_kind(
                lifecycle.remove(t, &name),
                ErrorKind::InvalidArgument,
                "second AP remove",
            )
        }),
        Scenario::new("invalidate_on_stop", |s| {
            let handle = s.configure_and_create(IfaceType::Sta)?;
            s.stop()?;
            expect_kind(
                handle.get_name().during("get_name"),
                ErrorKind::Invalidated,
                "get_name after stop",
            )
        }),
        Scenario::new("invalidate_on_reconfigure", |s| {
            let sta_mode = s.configure_for(IfaceType::Sta)?;
            let sta = s.create_iface(IfaceType::Sta)?;
            let ap_mode = s.configure_for(IfaceType::Ap)?;
            if ap_mode == sta_mode {
                // 同一模式可同时承载两者，不会发生重配置
                return Ok(());
            }
            expect_kind(
                sta.get_name().during("get_name"),
                ErrorKind::Invalidated,
                "STA handle after switching modes",
            )?;
            ensure(
                s.events().contains(&ChipEvent::Reconfigured(ap_mode)),
                "reconfigure event must be reported",
            )
        }),
        Scenario::new("iface_event_trail", |s| {
            let t = IfaceType::Ap;
            let name = configure_and_name(s, t)?;
            s.lifecycle().remove(t, &name)?;
            let added = ChipEvent::IfaceAdded {
                iface_type: t,
                name: name.clone(),
            };
            let removed = ChipEvent::IfaceRemoved { iface_type: t, name };
            ensure(s.events().contains(&added), "iface added event")?;
            ensure(s.events().contains(&removed), "iface removed event")
        }),
    ]
}

fn nan_scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new("nan_enable_request", |s| {
            let handle = s.configure_and_create(IfaceType::Nan)?;
            let session = s
                .nan_session(&handle)
                .ok_or_else(|| HarnessError::assertion("NAN iface has no session"))?;
            session.enable(NanEnableRequest::default())?;
            let caps = session.get_capabilities()?;
            ensure(caps.max_concurrent_clusters > 0, "NAN must support a cluster")?;
            session.disable()
        })
        .requires(Requirement::Enabled(IfaceType::Nan)),
        Scenario::new("nan_mode_absent_when_disabled", |s| {
            expect_kind(
                s.configure_for(IfaceType::Nan),
                ErrorKind::ModeNotFound,
                "configure for NAN while NAN is off",
            )
        })
        .requires(Requirement::Disabled(IfaceType::Nan)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique() {
        let names = scenario_names();
        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn test_per_type_scenarios_present() {
        let names = scenario_names();
        for t in IfaceType::ALL {
            for op in ["create_{}_iface", "get_{}_iface_names", "get_{}_iface", "remove_{}_iface"] {
                let name = op.replace("{}", t.as_str());
                assert!(names.contains(&name), "missing {}", name);
            }
        }
    }

    #[test]
    fn test_select() {
        let selected = select(conformance_catalog(), &["ap".to_string()]);
        assert!(!selected.is_empty());
        assert!(selected.iter().all(|s| s.name().contains("ap")));
        assert_eq!(
            select(conformance_catalog(), &[]).len(),
            conformance_catalog().len()
        );
    }
}
