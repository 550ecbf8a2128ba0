//! Scenario definitions and the isolating runner
//!
//! Each scenario gets its own [`ChipSession`]: the chip is stopped before and
//! after the body runs, so a failing scenario never leaks state into the next.

use crate::harness::{ChipSession, LifecycleHarness};
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use wifi_chip::IfaceType;
use wifi_error::{ErrorKind, HarnessError, HarnessResult, utils};

/// When a scenario is applicable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Always,
    /// Only when the config enables this iface type
    Enabled(IfaceType),
    /// Only when the config disables this iface type
    Disabled(IfaceType),
}

type ScenarioBody = Box<dyn Fn(&mut ChipSession) -> HarnessResult<()> + Send + Sync>;

/// A named conformance check run against a fresh [`ChipSession`]
pub struct Scenario {
    name: String,
    requirement: Requirement,
    body: ScenarioBody,
}

impl Scenario {
    /// 创建场景
    ///
    /// # 参数
    /// - `name`: unique within the catalog, used for selection and reporting
    /// - `body`: returns `Err` to fail the scenario; teardown runs either way
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut ChipSession) -> HarnessResult<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            requirement: Requirement::Always,
            body: Box::new(body),
        }
    }

    /// Restrict when the scenario runs; the default is [`Requirement::Always`]
    pub fn requires(mut self, requirement: Requirement) -> Self {
        self.requirement = requirement;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn requirement(&self) -> Requirement {
        self.requirement
    }
}

impl fmt::Debug for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("requirement", &self.requirement)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScenarioOutcome {
    Passed,
    Failed { kind: ErrorKind, reason: String },
    Skipped { reason: String },
}

impl ScenarioOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, ScenarioOutcome::Passed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ScenarioOutcome::Failed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, ScenarioOutcome::Skipped { .. })
    }

    fn from_error(error: &HarnessError) -> Self {
        ScenarioOutcome::Failed {
            kind: error.kind(),
            reason: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    #[serde(flatten)]
    pub outcome: ScenarioOutcome,
    pub duration_ms: u64,
}

/// Runs scenarios in isolation against one harness
pub struct ScenarioRunner<'a> {
    harness: &'a LifecycleHarness,
}

impl<'a> ScenarioRunner<'a> {
    pub fn new(harness: &'a LifecycleHarness) -> Self {
        Self { harness }
    }

    fn skip_reason(&self, requirement: Requirement) -> Option<String> {
        let config = self.harness.config();
        match requirement {
            Requirement::Always => None,
            Requirement::Enabled(t) if !config.is_enabled(t) => {
                Some(format!("{} disabled by configuration", t))
            }
            Requirement::Disabled(t) if config.is_enabled(t) => {
                Some(format!("{} enabled by configuration", t))
            }
            Requirement::Enabled(_) | Requirement::Disabled(_) => None,
        }
    }

    /// Run one scenario with its own setup and teardown
    pub fn run(&self, scenario: &Scenario) -> ScenarioResult {
        let start = Instant::now();
        let outcome = match self.skip_reason(scenario.requirement) {
            Some(reason) => {
                info!("[{}] skipped: {}", scenario.name, reason);
                ScenarioOutcome::Skipped { reason }
            }
            None => match self.execute(scenario) {
                Ok(()) => {
                    info!("[{}] passed", scenario.name);
                    ScenarioOutcome::Passed
                }
                Err(e) => {
                    utils::log_error(&e, &scenario.name);
                    ScenarioOutcome::from_error(&e)
                }
            },
        };

        ScenarioResult {
            name: scenario.name.clone(),
            outcome,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    fn execute(&self, scenario: &Scenario) -> HarnessResult<()> {
        info!("[{}] starting", scenario.name);
        let mut session = self.harness.setup()?;

        let body_result = (scenario.body)(&mut session);
        // 即使场景失败也要停止芯片
        let teardown_result = session.teardown();
        body_result.and(teardown_result)
    }

    /// Run every scenario; a failure never stops its siblings
    pub fn run_all(&self, scenarios: &[Scenario]) -> Vec<ScenarioResult> {
        scenarios.iter().map(|s| self.run(s)).collect()
    }
}

/// Assertion helpers for scenario bodies
pub mod assert {
    use super::*;
    use std::fmt::Debug;

    pub fn ensure(condition: bool, message: impl Into<String>) -> HarnessResult<()> {
        if condition {
            Ok(())
        } else {
            Err(HarnessError::assertion(message))
        }
    }

    /// Fail with an assertion error describing both values when they differ
    pub fn ensure_eq<T: PartialEq + Debug>(
        actual: T,
        expected: T,
        what: &str,
    ) -> HarnessResult<()> {
        if actual == expected {
            Ok(())
        } else {
            Err(HarnessError::assertion(format!(
                "{}: expected {:?}, got {:?}",
                what, expected, actual
            )))
        }
    }

    /// The operation must fail with exactly `kind`
    pub fn expect_kind<T: Debug>(
        result: HarnessResult<T>,
        kind: ErrorKind,
        what: &str,
    ) -> HarnessResult<()> {
        match result {
            Err(e) if e.kind() == kind => Ok(()),
            Err(e) => Err(HarnessError::assertion(format!(
                "{}: expected {}, got {} ({})",
                what,
                kind,
                e.kind(),
                e
            ))),
            Ok(value) => Err(HarnessError::assertion(format!(
                "{}: expected {}, but it succeeded with {:?}",
                what, kind, value
            ))),
        }
    }
}
