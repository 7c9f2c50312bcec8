// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::{DelayDriver, Wakeup};

/// A delay driver that never fires on its own.
///
/// `VirtualDelay` is the driver of a [`VirtualScheduler`][crate::VirtualScheduler]. Instead
/// of waiting, it records the most recently armed delay, which tests can compare against
/// the time remaining until the head of the queue. Clones share the recorded state.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use chime::runtime::VirtualDelay;
/// use chime::{Clock, ClockControl, Scheduler, TimerTask};
///
/// let control = ClockControl::new();
/// let delay = VirtualDelay::new();
/// let scheduler = Scheduler::new(control.to_clock(), delay.clone());
///
/// scheduler.schedule(&TimerTask::new(|_| {}), Duration::from_millis(250))?;
///
/// assert_eq!(delay.armed(), Some(Duration::from_millis(250)));
/// # Ok::<(), chime::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct VirtualDelay {
    armed: Arc<Mutex<Option<Duration>>>,
}

impl VirtualDelay {
    /// Creates a driver with no outstanding wait.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the outstanding wait, or `None` if nothing is armed.
    #[must_use]
    pub fn armed(&self) -> Option<Duration> {
        *self.armed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set(&self, delay: Option<Duration>) {
        *self.armed.lock().unwrap_or_else(PoisonError::into_inner) = delay;
    }
}

impl DelayDriver for VirtualDelay {
    fn arm(&self, delay: Duration, _wakeup: Wakeup) {
        self.set(Some(delay));
    }

    fn disarm(&self) {
        self.set(None);
    }
}
