//! Chip-mode and iface lifecycle conformance harness
//!
//! Drives a [`wifi_chip::ChipController`] through valid and invalid mode and
//! iface transitions and checks the outcomes:
//!
//! - [`mode_selector`]: first-match mode selection and configuration
//! - [`lifecycle`]: create / list / get / remove for every iface type
//! - [`poller`]: bounded retry on transient unavailability
//! - [`nan`] and [`mailbox`]: NAN callbacks as blocking request/response
//! - [`harness`], [`scenario`], [`catalog`], [`report`]: isolated scenario runs
//!
//! # Example
//!
//! ```rust,ignore
//! let chip = Arc::new(ReferenceChip::default());
//! let harness = LifecycleHarness::new(
//!     Arc::new(StaticChipProvider::new(chip)),
//!     HarnessConfig::default(),
//! );
//! let results = ScenarioRunner::new(&harness).run_all(&conformance_catalog());
//! ```

pub mod catalog;
pub mod config;
pub mod events;
pub mod harness;
pub mod lifecycle;
pub mod mailbox;
pub mod mode_selector;
pub mod nan;
pub mod poller;
pub mod report;
pub mod scenario;

pub use catalog::{conformance_catalog, scenario_names};
pub use config::{
    Config, ConfigBuilder, ConfigError, ENV_PREFIX, HarnessConfig, HarnessConfigLayer,
};
pub use events::{ChipEvent, EventRecorder};
pub use harness::{ChipSession, LifecycleHarness};
pub use lifecycle::{IfaceSlot, InterfaceLifecycle};
pub use mailbox::Mailbox;
pub use mode_selector::ModeSelector;
pub use nan::{NanResponse, NanSession};
pub use poller::{ReadinessPoller, await_ready};
pub use report::{ConformanceReport, ReportSummary};
pub use scenario::{Requirement, Scenario, ScenarioOutcome, ScenarioResult, ScenarioRunner};
