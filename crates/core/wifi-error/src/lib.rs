//! Unified error handling for the Wi-Fi chip conformance harness
//!
//! Two layers live here:
//! - [`WifiStatus`]: the status code (plus description) every chip controller
//!   call reports. `WifiResult<T>` puts the status on the error path and the
//!   payload on the success path.
//! - [`HarnessError`]: what the harness surfaces to a scenario, classified by
//!   [`ErrorKind`].

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Status codes reported by a chip controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum WifiStatusCode {
    Success = 0,
    /// The chip object was torn down (stop / power cycle)
    ErrorWifiChipInvalid = 1,
    /// The iface was used after its owning mode or chip went away
    ErrorWifiIfaceInvalid = 2,
    ErrorNotSupported = 4,
    /// Slot occupied, or service not ready yet
    ErrorNotAvailable = 5,
    ErrorNotStarted = 6,
    ErrorInvalidArgs = 7,
    ErrorBusy = 8,
    ErrorUnknown = 9,
}

impl WifiStatusCode {
    pub const fn as_raw(self) -> u32 {
        self as u32
    }

    /// Map a raw HAL status value; unknown values yield `None`
    pub fn from_raw(raw: u32) -> Option<Self> {
        let code = match raw {
            0 => Self::Success,
            1 => Self::ErrorWifiChipInvalid,
            2 => Self::ErrorWifiIfaceInvalid,
            4 => Self::ErrorNotSupported,
            5 => Self::ErrorNotAvailable,
            6 => Self::ErrorNotStarted,
            7 => Self::ErrorInvalidArgs,
            8 => Self::ErrorBusy,
            9 => Self::ErrorUnknown,
            _ => return None,
        };
        Some(code)
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::ErrorWifiChipInvalid => "ERROR_WIFI_CHIP_INVALID",
            Self::ErrorWifiIfaceInvalid => "ERROR_WIFI_IFACE_INVALID",
            Self::ErrorNotSupported => "ERROR_NOT_SUPPORTED",
            Self::ErrorNotAvailable => "ERROR_NOT_AVAILABLE",
            Self::ErrorNotStarted => "ERROR_NOT_STARTED",
            Self::ErrorInvalidArgs => "ERROR_INVALID_ARGS",
            Self::ErrorBusy => "ERROR_BUSY",
            Self::ErrorUnknown => "ERROR_UNKNOWN",
        }
    }
}

impl fmt::Display for WifiStatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A status code with an optional human readable description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiStatus {
    pub code: WifiStatusCode,
    pub description: String,
}

impl WifiStatus {
    pub fn new(code: WifiStatusCode, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
        }
    }

    pub fn success() -> Self {
        Self::from(WifiStatusCode::Success)
    }

    pub fn is_success(&self) -> bool {
        self.code.is_success()
    }

    /// Classification of this status, see [`ErrorKind`]
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::from(self.code)
    }
}

impl fmt::Display for WifiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.description.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{}: {}", self.code, self.description)
        }
    }
}

impl std::error::Error for WifiStatus {}

impl From<WifiStatusCode> for WifiStatus {
    fn from(code: WifiStatusCode) -> Self {
        Self::new(code, "")
    }
}

/// Controller call result: `Err` carries the failing status
pub type WifiResult<T> = Result<T, WifiStatus>;

/// Collapses a controller result to its status code
pub fn status_code_of<T>(result: &WifiResult<T>) -> WifiStatusCode {
    match result {
        Ok(_) => WifiStatusCode::Success,
        Err(status) => status.code,
    }
}

/// Error classification used by scenarios to decide pass / fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Service not ready yet; retried within a bounded window only
    TransientUnavailable,
    /// Capability absent on this chip
    NotSupported,
    /// Bad name or id
    InvalidArgument,
    /// Resource slot already occupied
    NotAvailable,
    /// Handle used after its owning mode or chip was torn down
    Invalidated,
    ModeNotFound,
    ConfigureRejected,
    Timeout,
    Assertion,
    Configuration,
    Unknown,
}

impl From<WifiStatusCode> for ErrorKind {
    fn from(code: WifiStatusCode) -> Self {
        match code {
            WifiStatusCode::ErrorNotAvailable => ErrorKind::NotAvailable,
            WifiStatusCode::ErrorNotSupported => ErrorKind::NotSupported,
            WifiStatusCode::ErrorInvalidArgs => ErrorKind::InvalidArgument,
            WifiStatusCode::ErrorWifiChipInvalid | WifiStatusCode::ErrorWifiIfaceInvalid => {
                ErrorKind::Invalidated
            }
            WifiStatusCode::Success
            | WifiStatusCode::ErrorNotStarted
            | WifiStatusCode::ErrorBusy
            | WifiStatusCode::ErrorUnknown => ErrorKind::Unknown,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Unified error type for all harness components
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum HarnessError {
    #[error("Controller error during {operation}: {source}")]
    Controller { source: WifiStatus, operation: String },

    #[error("Service still unavailable after {attempts} attempts")]
    TransientUnavailable { attempts: u32 },

    #[error("No chip mode supports iface type {0}")]
    ModeNotFound(String),

    #[error("Chip rejected mode {mode_id}: {source}")]
    ConfigureRejected { mode_id: u32, source: WifiStatus },

    #[error("Timed out after {timeout_ms}ms waiting for {operation}")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Assertion failed: {0}")]
    Assertion(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl HarnessError {
    /// A failing controller status tagged with the operation that produced it
    pub fn controller(operation: impl Into<String>, source: WifiStatus) -> Self {
        HarnessError::Controller {
            source,
            operation: operation.into(),
        }
    }

    /// A violated scenario expectation
    pub fn assertion(message: impl Into<String>) -> Self {
        HarnessError::Assertion(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            HarnessError::Controller { source, .. } => source.kind(),
            HarnessError::TransientUnavailable { .. } => ErrorKind::TransientUnavailable,
            HarnessError::ModeNotFound(_) => ErrorKind::ModeNotFound,
            HarnessError::ConfigureRejected { .. } => ErrorKind::ConfigureRejected,
            HarnessError::Timeout { .. } => ErrorKind::Timeout,
            HarnessError::Assertion(_) => ErrorKind::Assertion,
            HarnessError::Configuration(_) => ErrorKind::Configuration,
        }
    }

    /// Underlying controller status, if the error came from the chip
    pub fn status(&self) -> Option<&WifiStatus> {
        match self {
            HarnessError::Controller { source, .. }
            | HarnessError::ConfigureRejected { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type alias for convenience
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Extension trait lifting controller results into harness results
pub trait WifiResultExt<T> {
    fn during(self, operation: impl Into<String>) -> HarnessResult<T>;
}

impl<T> WifiResultExt<T> for WifiResult<T> {
    fn during(self, operation: impl Into<String>) -> HarnessResult<T> {
        self.map_err(|status| HarnessError::controller(operation, status))
    }
}

/// Utility functions for error handling
pub mod utils {
    use super::*;

    /// Only transient unavailability may be retried, and only a bounded number of times
    pub fn is_recoverable(error: &HarnessError) -> bool {
        error.kind() == ErrorKind::TransientUnavailable
    }

    /// Errors that always point at a bug in the calling scenario
    pub fn is_caller_error(error: &HarnessError) -> bool {
        matches!(
            error.kind(),
            ErrorKind::InvalidArgument | ErrorKind::Invalidated | ErrorKind::Assertion
        )
    }

    pub fn log_error(error: &HarnessError, scenario: &str) {
        log::error!("[{}] {} (kind: {})", scenario, error, error.kind());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_raw_round_trip() {
        for raw in 0..12 {
            if let Some(code) = WifiStatusCode::from_raw(raw) {
                assert_eq!(code.as_raw(), raw);
            }
        }
        assert_eq!(WifiStatusCode::from_raw(3), None);
        assert_eq!(WifiStatusCode::from_raw(42), None);
    }

    #[test]
    fn test_status_display() {
        let plain = WifiStatus::from(WifiStatusCode::ErrorInvalidArgs);
        assert_eq!(plain.to_string(), "ERROR_INVALID_ARGS");

        let described = WifiStatus::new(WifiStatusCode::ErrorNotAvailable, "slot busy");
        assert_eq!(described.to_string(), "ERROR_NOT_AVAILABLE: slot busy");
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            ErrorKind::from(WifiStatusCode::ErrorNotAvailable),
            ErrorKind::NotAvailable
        );
        assert_eq!(
            ErrorKind::from(WifiStatusCode::ErrorWifiIfaceInvalid),
            ErrorKind::Invalidated
        );
        assert_eq!(
            ErrorKind::from(WifiStatusCode::ErrorWifiChipInvalid),
            ErrorKind::Invalidated
        );
        assert_eq!(
            ErrorKind::from(WifiStatusCode::ErrorInvalidArgs),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn test_harness_error_kind() {
        let err: HarnessResult<()> =
            Err(WifiStatus::from(WifiStatusCode::ErrorNotSupported)).during("dump");
        let err = err.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotSupported);
        assert_eq!(
            err.status().map(|s| s.code),
            Some(WifiStatusCode::ErrorNotSupported)
        );

        let transient = HarnessError::TransientUnavailable { attempts: 6 };
        assert!(utils::is_recoverable(&transient));
        assert!(!utils::is_caller_error(&transient));
        assert!(utils::is_caller_error(&HarnessError::assertion("x")));
    }

    #[test]
    fn test_status_code_of() {
        let ok: WifiResult<u32> = Ok(1);
        let err: WifiResult<u32> = Err(WifiStatusCode::ErrorBusy.into());
        assert_eq!(status_code_of(&ok), WifiStatusCode::Success);
        assert_eq!(status_code_of(&err), WifiStatusCode::ErrorBusy);
    }

    #[test]
    fn test_error_serializes() {
        let err = HarnessError::ConfigureRejected {
            mode_id: 1,
            source: WifiStatusCode::ErrorUnknown.into(),
        };
        let json = serde_json::to_string(&err).expect("serialize");
        assert!(json.contains("ConfigureRejected"));
    }
}
