//! Single-slot mailbox for turning callbacks into blocking waits
//!
//! A producer (usually a controller callback thread) posts one value; the
//! consumer blocks in [`Mailbox::take`] until the value arrives or the timeout
//! elapses. Posting into a full slot replaces the stale value.

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Mailbox<T> {
    slot: Mutex<Option<T>>,
    condvar: Condvar,
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            condvar: Condvar::new(),
        }
    }

    /// Deposit `value`, replacing (and logging) any unclaimed one, and wake a waiter
    pub fn post(&self, value: T) {
        let mut slot = self.slot.lock();
        if slot.is_some() {
            log::warn!("Mailbox slot still full, dropping the unread value");
        }
        *slot = Some(value);
        self.condvar.notify_all();
    }

    /// Block until a value is posted, or `None` once `timeout` has elapsed
    pub fn take(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.slot.lock();
        loop {
            if let Some(value) = slot.take() {
                return Some(value);
            }
            // 虚假唤醒时按剩余时间继续等待
            if self.condvar.wait_until(&mut slot, deadline).timed_out() {
                return slot.take();
            }
        }
    }

    /// Take the value if one is already there, without waiting
    pub fn try_take(&self) -> Option<T> {
        self.slot.lock().take()
    }

    pub fn clear(&self) {
        self.slot.lock().take();
    }

    pub fn is_full(&self) -> bool {
        self.slot.lock().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_take_returns_posted_value() {
        let mailbox = Mailbox::new();
        mailbox.post(5u32);
        assert!(mailbox.is_full());
        assert_eq!(mailbox.take(Duration::from_millis(10)), Some(5));
        assert!(!mailbox.is_full());
    }

    #[test]
    fn test_take_times_out() {
        let mailbox: Mailbox<u32> = Mailbox::new();
        let start = Instant::now();
        assert_eq!(mailbox.take(Duration::from_millis(20)), None);
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_cross_thread_delivery() {
        let mailbox = Arc::new(Mailbox::new());
        let producer = Arc::clone(&mailbox);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            producer.post("response");
        });
        assert_eq!(mailbox.take(Duration::from_secs(2)), Some("response"));
        handle.join().expect("producer thread");
    }

    #[test]
    fn test_post_replaces_stale_value() {
        let mailbox = Mailbox::new();
        mailbox.post(1);
        mailbox.post(2);
        assert_eq!(mailbox.try_take(), Some(2));
        assert_eq!(mailbox.try_take(), None);
        mailbox.post(3);
        mailbox.clear();
        assert_eq!(mailbox.try_take(), None);
    }
}
