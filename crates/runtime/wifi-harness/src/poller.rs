//! Bounded readiness polling
//!
//! Only `ERROR_NOT_AVAILABLE` is retried. The delay between attempts is fixed
//! (no backoff, no jitter) and the number of retries is capped, so an
//! always-unavailable operation is called exactly `max_retries + 1` times.

use crate::config::HarnessConfig;
use log::{debug, warn};
use std::time::Duration;
use wifi_error::{HarnessError, HarnessResult, WifiResult, WifiStatus, WifiStatusCode};

/// Call `op` until it reports something other than `ERROR_NOT_AVAILABLE`
///
/// Returns the first non-transient status, or the last transient one once the
/// retries are exhausted.
pub fn await_ready<F>(mut op: F, max_retries: u32, delay: Duration) -> WifiStatus
where
    F: FnMut() -> WifiStatus,
{
    let (result, _) = poll(
        || {
            let status = op();
            if status.is_success() {
                Ok(())
            } else {
                Err(status)
            }
        },
        max_retries,
        delay,
    );
    match result {
        Ok(()) => WifiStatus::success(),
        Err(status) => status,
    }
}

/// Core loop shared by every entry point; also reports the attempt count
fn poll<T, F>(mut op: F, max_retries: u32, delay: Duration) -> (WifiResult<T>, u32)
where
    F: FnMut() -> WifiResult<T>,
{
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        match op() {
            Err(status) if status.code == WifiStatusCode::ErrorNotAvailable => {
                if attempts > max_retries {
                    warn!("Still unavailable after {} attempts, giving up", attempts);
                    return (Err(status), attempts);
                }
                debug!("Attempt {} unavailable, retrying in {:?}", attempts, delay);
                std::thread::sleep(delay);
            }
            other => return (other, attempts),
        }
    }
}

/// Readiness poller carrying its retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPoller {
    max_retries: u32,
    delay: Duration,
}

impl ReadinessPoller {
    /// 创建轮询器
    ///
    /// # 参数
    /// - `max_retries`: retries after the first attempt; 0 means a single call
    /// - `delay`: fixed pause before every retry
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Policy from [`HarnessConfig::max_retries`] and [`HarnessConfig::retry_delay`]
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(config.max_retries, config.retry_delay())
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// [`await_ready`] with this poller's policy
    pub fn await_ready<F>(&self, op: F) -> WifiStatus
    where
        F: FnMut() -> WifiStatus,
    {
        await_ready(op, self.max_retries, self.delay)
    }

    /// Like [`ReadinessPoller::await_ready`] for operations with a payload
    pub fn retry<T, F>(&self, op: F) -> WifiResult<T>
    where
        F: FnMut() -> WifiResult<T>,
    {
        poll(op, self.max_retries, self.delay).0
    }

    /// Retry, then lift the outcome into a harness result
    ///
    /// Exhaustion becomes the hard failure [`HarnessError::TransientUnavailable`];
    /// every other failing status is surfaced as a controller error.
    pub fn require<T, F>(&self, operation: &str, op: F) -> HarnessResult<T>
    where
        F: FnMut() -> WifiResult<T>,
    {
        match poll(op, self.max_retries, self.delay) {
            (Ok(value), _) => Ok(value),
            (Err(status), attempts) if status.code == WifiStatusCode::ErrorNotAvailable => {
                debug!("{} exhausted its readiness window: {}", operation, status);
                Err(HarnessError::TransientUnavailable { attempts })
            }
            (Err(status), _) => Err(HarnessError::controller(operation, status)),
        }
    }
}

impl Default for ReadinessPoller {
    fn default() -> Self {
        Self::from_config(&HarnessConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wifi_error::ErrorKind;

    fn status(code: WifiStatusCode) -> WifiStatus {
        WifiStatus::from(code)
    }

    #[test]
    fn test_always_transient_calls_six_times() {
        let mut calls = 0;
        let result = await_ready(
            || {
                calls += 1;
                status(WifiStatusCode::ErrorNotAvailable)
            },
            5,
            Duration::from_millis(2),
        );
        assert_eq!(calls, 6);
        assert_eq!(result.code, WifiStatusCode::ErrorNotAvailable);
    }

    #[test]
    fn test_success_returns_immediately() {
        let mut calls = 0;
        let result = await_ready(
            || {
                calls += 1;
                WifiStatus::success()
            },
            5,
            Duration::from_millis(2),
        );
        assert_eq!(calls, 1);
        assert!(result.is_success());
    }

    #[test]
    fn test_other_errors_are_not_retried() {
        for code in [
            WifiStatusCode::ErrorInvalidArgs,
            WifiStatusCode::ErrorNotSupported,
            WifiStatusCode::ErrorBusy,
            WifiStatusCode::ErrorWifiChipInvalid,
        ] {
            let mut calls = 0;
            let result = await_ready(
                || {
                    calls += 1;
                    status(code)
                },
                5,
                Duration::ZERO,
            );
            assert_eq!(calls, 1, "{} must not be retried", code);
            assert_eq!(result.code, code);
        }
    }

    #[test]
    fn test_recovers_within_window() {
        let poller = ReadinessPoller::new(5, Duration::ZERO);
        let mut calls = 0;
        let value = poller
            .retry(|| {
                calls += 1;
                if calls < 4 {
                    Err(status(WifiStatusCode::ErrorNotAvailable))
                } else {
                    Ok(calls)
                }
            })
            .expect("ready on fourth call");
        assert_eq!(value, 4);
    }

    #[test]
    fn test_zero_retries() {
        let mut calls = 0;
        let _ = await_ready(
            || {
                calls += 1;
                status(WifiStatusCode::ErrorNotAvailable)
            },
            0,
            Duration::ZERO,
        );
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_require_maps_exhaustion() {
        let poller = ReadinessPoller::new(2, Duration::ZERO);
        let err = poller
            .require::<(), _>("start", || Err(status(WifiStatusCode::ErrorNotAvailable)))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransientUnavailable);
        assert!(matches!(err, HarnessError::TransientUnavailable { attempts: 3 }));

        let err = poller
            .require::<(), _>("start", || Err(status(WifiStatusCode::ErrorUnknown)))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unknown);
    }

    #[test]
    fn test_fixed_delay_no_backoff() {
        let delay = Duration::from_millis(5);
        let start = std::time::Instant::now();
        let _ = await_ready(|| status(WifiStatusCode::ErrorNotAvailable), 3, delay);
        let elapsed = start.elapsed();
        // 3 次固定延迟，无指数退避
        assert!(elapsed >= delay * 3);
        assert!(elapsed < delay * 3 + Duration::from_secs(1));
    }
}
