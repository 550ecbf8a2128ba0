//! Synchronous NAN request/response session
//!
//! NAN commands are acknowledged through an event callback, possibly from a
//! controller thread. [`NanSession`] registers its own callback, forwards every
//! response into a [`Mailbox`], and turns each command into a blocking
//! request/await pair bounded by the configured callback timeout.

use crate::mailbox::Mailbox;
use log::{debug, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};
use wifi_chip::{
    ChipController, IfaceHandle, IfaceType, NanCapabilities, NanCommandId, NanEnableRequest,
    NanEventCallback, NanRequest,
};
use wifi_error::{HarnessError, HarnessResult, WifiResultExt, WifiStatus, WifiStatusCode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NanResponse {
    Enable {
        id: NanCommandId,
        status: WifiStatus,
    },
    Disable {
        id: NanCommandId,
        status: WifiStatus,
    },
    Capabilities {
        id: NanCommandId,
        status: WifiStatus,
        capabilities: NanCapabilities,
    },
}

impl NanResponse {
    pub fn id(&self) -> NanCommandId {
        match self {
            NanResponse::Enable { id, .. }
            | NanResponse::Disable { id, .. }
            | NanResponse::Capabilities { id, .. } => *id,
        }
    }

    pub fn status(&self) -> &WifiStatus {
        match self {
            NanResponse::Enable { status, .. }
            | NanResponse::Disable { status, .. }
            | NanResponse::Capabilities { status, .. } => status,
        }
    }
}

struct MailboxCallback {
    mailbox: Arc<Mailbox<NanResponse>>,
}

impl NanEventCallback for MailboxCallback {
    fn notify_enable_response(&self, id: NanCommandId, status: &WifiStatus) {
        self.mailbox.post(NanResponse::Enable {
            id,
            status: status.clone(),
        });
    }

    fn notify_disable_response(&self, id: NanCommandId, status: &WifiStatus) {
        self.mailbox.post(NanResponse::Disable {
            id,
            status: status.clone(),
        });
    }

    fn notify_capabilities_response(
        &self,
        id: NanCommandId,
        status: &WifiStatus,
        capabilities: &NanCapabilities,
    ) {
        self.mailbox.post(NanResponse::Capabilities {
            id,
            status: status.clone(),
            capabilities: *capabilities,
        });
    }
}

/// Blocking request/response wrapper around one NAN iface's callbacks
///
/// Each request carries a fresh command id. Responses for older ids are
/// discarded, so a late response never satisfies a newer request.
pub struct NanSession {
    chip: Arc<dyn ChipController>,
    iface: IfaceHandle,
    mailbox: Arc<Mailbox<NanResponse>>,
    timeout: Duration,
    next_id: NanCommandId,
}

impl NanSession {
    /// Register the session's callback on `iface`
    pub fn open(
        chip: Arc<dyn ChipController>,
        iface: IfaceHandle,
        timeout: Duration,
    ) -> HarnessResult<Self> {
        let iface_type = iface.get_type().during("get_type")?;
        if iface_type != IfaceType::Nan {
            return Err(HarnessError::controller(
                "nan_register_event_callback",
                WifiStatus::new(
                    WifiStatusCode::ErrorInvalidArgs,
                    format!("{} iface cannot host a NAN session", iface_type),
                ),
            ));
        }

        let mailbox = Arc::new(Mailbox::new());
        chip.nan_register_event_callback(
            &iface,
            Arc::new(MailboxCallback {
                mailbox: Arc::clone(&mailbox),
            }),
        )
        .during("nan_register_event_callback")?;

        Ok(Self {
            chip,
            iface,
            mailbox,
            timeout,
            next_id: 1,
        })
    }

    pub fn iface(&self) -> &IfaceHandle {
        &self.iface
    }

    /// Send an enable request and wait for its response
    pub fn enable(&mut self, request: NanEnableRequest) -> HarnessResult<()> {
        self.call(NanRequest::Enable(request)).map(|_| ())
    }

    /// Send a disable request and wait for its response
    pub fn disable(&mut self) -> HarnessResult<()> {
        self.call(NanRequest::Disable).map(|_| ())
    }

    /// Query NAN capabilities; fails with `Timeout` if no response arrives in time
    pub fn get_capabilities(&mut self) -> HarnessResult<NanCapabilities> {
        match self.call(NanRequest::GetCapabilities)? {
            NanResponse::Capabilities { capabilities, .. } => Ok(capabilities),
            other => Err(HarnessError::assertion(format!(
                "expected a capabilities response, got {:?}",
                other
            ))),
        }
    }

    /// Issue `request` and block for the response carrying the same command id
    pub fn call(&mut self, request: NanRequest) -> HarnessResult<NanResponse> {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        let operation = format!("nan_{}_request", request.name());

        self.mailbox.clear();
        self.chip
            .nan_request(&self.iface, id, request)
            .during(operation.clone())?;

        let deadline = Instant::now() + self.timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let Some(response) = self.mailbox.take(remaining) else {
                warn!("{} (id {}) timed out after {:?}", operation, id, self.timeout);
                return Err(HarnessError::Timeout {
                    operation,
                    timeout_ms: self.timeout.as_millis() as u64,
                });
            };

            if response.id() != id {
                debug!("Discarding stale NAN response {:?} while waiting for {}", response, id);
                continue;
            }
            if !response.status().is_success() {
                return Err(HarnessError::controller(operation, response.status().clone()));
            }
            return Ok(response);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wifi_chip::{ReferenceChip, ReferenceChipConfig, STA_CHIP_MODE_ID};
    use wifi_error::ErrorKind;

    fn nan_chip() -> (Arc<ReferenceChip>, IfaceHandle) {
        let chip = Arc::new(ReferenceChip::new(ReferenceChipConfig::default()));
        chip.start().expect("start");
        chip.configure_chip(STA_CHIP_MODE_ID).expect("configure");
        let nan = chip.create_iface(IfaceType::Nan).expect("nan");
        (chip, nan)
    }

    #[test]
    fn test_enable_and_capabilities() {
        let (chip, nan) = nan_chip();
        let mut session =
            NanSession::open(chip, nan, Duration::from_secs(2)).expect("open session");
        session.enable(NanEnableRequest::default()).expect("enable");
        let caps = session.get_capabilities().expect("capabilities");
        assert!(caps.max_publishes > 0);
        session.disable().expect("disable");
    }

    #[test]
    fn test_rejects_non_nan_iface() {
        let (chip, _nan) = nan_chip();
        let sta = chip.create_iface(IfaceType::Sta).expect("sta");
        let err = NanSession::open(chip, sta, Duration::from_millis(50))
            .err()
            .expect("non-NAN iface must be rejected");
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_times_out_when_response_is_slow() {
        let chip = Arc::new(ReferenceChip::new(ReferenceChipConfig {
            nan_response_delay_ms: 500,
            ..Default::default()
        }));
        chip.start().expect("start");
        chip.configure_chip(STA_CHIP_MODE_ID).expect("configure");
        let nan = chip.create_iface(IfaceType::Nan).expect("nan");

        let mut session = NanSession::open(chip, nan, Duration::from_millis(20)).expect("open");
        let err = session.enable(NanEnableRequest::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }

    #[test]
    fn test_invalidated_iface() {
        let (chip, nan) = nan_chip();
        let mut session = NanSession::open(chip.clone(), nan, Duration::from_millis(50))
            .expect("open");
        chip.stop().expect("stop");
        let err = session.disable().unwrap_err();
        assert!(err.status().is_some());
    }
}
