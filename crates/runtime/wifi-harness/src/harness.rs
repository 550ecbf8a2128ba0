//! Lifecycle harness: owns the controller for the duration of one scenario
//!
//! [`LifecycleHarness::setup`] looks the chip up, forces a clean stop/start
//! cycle (absorbing transient unavailability within the configured window) and
//! hands back a [`ChipSession`]. The session stops the chip again on teardown,
//! or on drop if teardown was never called.

use crate::config::HarnessConfig;
use crate::events::EventRecorder;
use crate::lifecycle::InterfaceLifecycle;
use crate::mode_selector::ModeSelector;
use crate::nan::NanSession;
use crate::poller::ReadinessPoller;
use log::{debug, info, warn};
use std::sync::Arc;
use wifi_chip::{ChipController, ChipModeId, ChipProvider, IfaceHandle, IfaceType};
use wifi_error::{HarnessResult, WifiResultExt};

/// Entry point: a chip provider plus the configuration every session inherits
pub struct LifecycleHarness {
    provider: Arc<dyn ChipProvider>,
    config: HarnessConfig,
    poller: ReadinessPoller,
}

impl LifecycleHarness {
    /// 创建测试框架
    ///
    /// # 参数
    /// - `provider`: looked up once per [`LifecycleHarness::setup`]
    /// - `config`: retry policy, NAN expectation and timeouts
    pub fn new(provider: Arc<dyn ChipProvider>, config: HarnessConfig) -> Self {
        let poller = ReadinessPoller::from_config(&config);
        Self {
            provider,
            config,
            poller,
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Poller built from the harness config
    pub fn poller(&self) -> &ReadinessPoller {
        &self.poller
    }

    /// Acquire the chip and bring it to a freshly started state
    pub fn setup(&self) -> HarnessResult<ChipSession> {
        let provider = Arc::clone(&self.provider);
        let chip = self.poller.require("get_chip", || provider.get_chip())?;

        let mut session = ChipSession {
            chip: Arc::clone(&chip),
            config: self.config.clone(),
            poller: self.poller,
            events: Arc::new(EventRecorder::new()),
            nan_sessions: Vec::new(),
            torn_down: false,
        };
        session.restart()?;
        debug!("Harness setup complete");
        Ok(session)
    }
}

/// A started chip plus the harness components bound to it
pub struct ChipSession {
    chip: Arc<dyn ChipController>,
    config: HarnessConfig,
    poller: ReadinessPoller,
    events: Arc<EventRecorder>,
    nan_sessions: Vec<NanSession>,
    torn_down: bool,
}

impl ChipSession {
    /// Controller under test
    pub fn chip(&self) -> &Arc<dyn ChipController> {
        &self.chip
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Chip events recorded since the last (re)start registered the recorder
    pub fn events(&self) -> &EventRecorder {
        &self.events
    }

    /// A mode selector over this session's chip
    pub fn selector(&self) -> ModeSelector {
        ModeSelector::new(Arc::clone(&self.chip))
    }

    /// Lifecycle operations over this session's chip
    ///
    /// Plain lifecycle calls skip per-type setup; use
    /// [`ChipSession::create_iface`] for ifaces that need a NAN session.
    pub fn lifecycle(&self) -> InterfaceLifecycle {
        InterfaceLifecycle::new(Arc::clone(&self.chip))
    }

    /// Stop and start the chip; every live iface is invalidated
    pub fn restart(&mut self) -> HarnessResult<()> {
        self.stop()?;
        let chip = Arc::clone(&self.chip);
        self.poller.require("start", || chip.start())?;
        self.chip
            .register_event_callback(self.events.clone())
            .during("register_event_callback")?;
        self.torn_down = false;
        Ok(())
    }

    /// Stop the chip and drop every NAN session; live handles become invalid
    pub fn stop(&mut self) -> HarnessResult<()> {
        self.nan_sessions.clear();
        self.chip.stop().during("stop")
    }

    /// Configure the first mode that can host `iface_type`, returning its id
    pub fn configure_for(&self, iface_type: IfaceType) -> HarnessResult<ChipModeId> {
        self.selector().select_and_configure(iface_type)
    }

    /// Create an iface, completing any per-type setup step
    ///
    /// Types that deliver responses through an event callback get a
    /// [`NanSession`] registered immediately, kept alive by this session.
    /// If that registration fails the new iface is removed again, so a failed
    /// call never leaves a live iface behind.
    pub fn create_iface(&mut self, iface_type: IfaceType) -> HarnessResult<IfaceHandle> {
        let lifecycle = self.lifecycle();
        let handle = lifecycle.create(iface_type)?;
        if iface_type.requires_event_callback() {
            match self.open_nan(handle.clone()) {
                Ok(session) => self.nan_sessions.push(session),
                Err(e) => {
                    Self::discard_iface(&lifecycle, iface_type, &handle);
                    return Err(e);
                }
            }
        }
        Ok(handle)
    }

    fn discard_iface(lifecycle: &InterfaceLifecycle, iface_type: IfaceType, handle: &IfaceHandle) {
        let removed = lifecycle
            .name_of(handle)
            .and_then(|name| lifecycle.remove(iface_type, &name));
        match removed {
            Ok(()) => debug!("Removed {} iface after failed setup", iface_type),
            Err(e) => warn!("Failed to remove {} iface after failed setup: {}", iface_type, e),
        }
    }

    /// Select the mode for `iface_type`, configure it and create one iface
    pub fn configure_and_create(&mut self, iface_type: IfaceType) -> HarnessResult<IfaceHandle> {
        self.configure_for(iface_type)?;
        self.create_iface(iface_type)
    }

    /// Register a fresh [`NanSession`] on `iface` without tracking it
    pub fn open_nan(&self, iface: IfaceHandle) -> HarnessResult<NanSession> {
        NanSession::open(Arc::clone(&self.chip), iface, self.config.callback_timeout())
    }

    /// Session registered for `iface` by [`ChipSession::create_iface`]
    pub fn nan_session(&mut self, iface: &IfaceHandle) -> Option<&mut NanSession> {
        self.nan_sessions
            .iter_mut()
            .find(|session| session.iface().same_iface(iface))
    }

    /// Sleep for [`HarnessConfig::mode_toggle_delay`] between mode switches
    pub fn pause_between_modes(&self) {
        std::thread::sleep(self.config.mode_toggle_delay());
    }

    /// Stop the chip and consume the session
    ///
    /// Dropping a session without calling this also stops the chip, but any
    /// error is then only logged.
    pub fn teardown(mut self) -> HarnessResult<()> {
        self.torn_down = true;
        self.stop()?;
        info!("Harness teardown complete");
        Ok(())
    }
}

impl Drop for ChipSession {
    fn drop(&mut self) {
        if !self.torn_down {
            if let Err(e) = self.stop() {
                warn!("Failed to stop chip while dropping session: {}", e);
            }
        }
    }
}
