// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use crate::Clock;

/// Controls the flow of time for a virtual clock.
///
/// A clock created from `ClockControl` never moves on its own: its time changes only through
/// [`advance`][Self::advance], [`advance_millis`][Self::advance_millis],
/// [`advance_to`][Self::advance_to] or a configured [`auto_advance`][Self::auto_advance] step.
/// This is what makes the [`VirtualScheduler`][crate::VirtualScheduler] deterministic.
///
/// Advancing is only possible through `ClockControl`; a system [`Clock`] has no such
/// operation.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, SystemTime};
///
/// use chime::ClockControl;
///
/// let control = ClockControl::new_at(Duration::from_millis(2000));
/// let clock = control.to_clock();
///
/// control.advance_millis(120);
///
/// assert_eq!(clock.now(), SystemTime::UNIX_EPOCH + Duration::from_millis(2120));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ClockControl {
    /// Clones of the control and every clock created from it share this state.
    state: Arc<Mutex<State>>,
}

impl ClockControl {
    /// Creates a new `ClockControl` instance.
    ///
    /// The initial time is the UNIX epoch and no auto-advance is configured.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::new())),
        }
    }

    /// Creates a new `ClockControl` instance starting at `start`.
    ///
    /// - `SystemTime`: Sets the clock to an absolute system time
    /// - `Duration`: Sets the clock to the given offset from `UNIX_EPOCH`
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::{Duration, SystemTime};
    ///
    /// use chime::ClockControl;
    ///
    /// let control = ClockControl::new_at(Duration::from_secs(100));
    /// assert_eq!(control.now(), SystemTime::UNIX_EPOCH + Duration::from_secs(100));
    /// ```
    #[must_use]
    pub fn new_at(start: impl Into<StartTime>) -> Self {
        let this = Self::new();
        match start.into() {
            StartTime::At(time) => this.advance_to(time),
            StartTime::SinceEpoch(offset) => this.advance(offset),
        }
        this
    }

    /// Creates a new `ClockControl` instance frozen at the current system time.
    #[must_use]
    pub fn now_frozen() -> Self {
        Self::new_at(SystemTime::now())
    }

    /// Converts the `ClockControl` to a `Clock` instance.
    #[must_use]
    pub fn to_clock(&self) -> Clock {
        Clock::with_control(self)
    }

    /// Sets the duration by which the clock moves forward every time the current time is read.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use chime::ClockControl;
    ///
    /// let clock = ClockControl::new()
    ///     .auto_advance(Duration::from_millis(5))
    ///     .to_clock();
    ///
    /// let first = clock.now();
    /// let second = clock.now();
    ///
    /// assert_eq!(second.duration_since(first)?, Duration::from_millis(5));
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    #[must_use]
    pub fn auto_advance(self, duration: Duration) -> Self {
        self.with_state(|s| s.auto_advance = duration);
        self
    }

    /// Returns the current time without triggering auto-advance.
    #[must_use]
    pub fn now(&self) -> SystemTime {
        self.with_state(|s| s.system_time)
    }

    /// Manually advances the clock by the specified number of milliseconds.
    pub fn advance_millis(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }

    /// Manually advances the clock by the specified duration.
    ///
    /// # Panics
    ///
    /// Panics if the resulting time cannot be represented by [`SystemTime`].
    pub fn advance(&self, duration: Duration) {
        self.with_state(|s| s.advance(duration, TimeFlow::Forward));
    }

    /// Moves the clock to the specified system time.
    ///
    /// The clock can be moved to the future or to the past.
    #[expect(
        clippy::missing_panics_doc,
        reason = "we are handling cases where the timestamp is either in future or past and the resulting duration is always positive"
    )]
    pub fn advance_to(&self, timestamp: impl Into<SystemTime>) {
        let timestamp = timestamp.into();

        self.with_state(|s| match timestamp.duration_since(s.system_time) {
            Ok(duration) => s.advance(duration, TimeFlow::Forward),
            Err(_e) => {
                let duration = s
                    .system_time
                    .duration_since(timestamp)
                    .expect("the resulting duration must be positive here");

                s.advance(duration, TimeFlow::Backward);
            }
        });
    }

    pub(crate) fn read(&self) -> SystemTime {
        self.with_state(State::read)
    }

    fn with_state<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut State) -> R,
    {
        // The state is plain data; a panic while holding the lock cannot leave it torn.
        f(&mut self.state.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// The instant a [`ClockControl`] starts at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StartTime {
    /// An absolute instant.
    At(SystemTime),
    /// An offset from the UNIX epoch.
    SinceEpoch(Duration),
}

impl From<SystemTime> for StartTime {
    fn from(time: SystemTime) -> Self {
        Self::At(time)
    }
}

impl From<Duration> for StartTime {
    fn from(offset: Duration) -> Self {
        Self::SinceEpoch(offset)
    }
}

impl From<ClockControl> for Clock {
    fn from(control: ClockControl) -> Self {
        control.to_clock()
    }
}

impl From<&ClockControl> for Clock {
    fn from(control: &ClockControl) -> Self {
        control.to_clock()
    }
}

#[derive(Debug)]
struct State {
    system_time: SystemTime,
    auto_advance: Duration,
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

impl State {
    const fn new() -> Self {
        Self {
            system_time: SystemTime::UNIX_EPOCH,
            auto_advance: Duration::ZERO,
        }
    }

    fn read(&mut self) -> SystemTime {
        let time = self.system_time;
        self.advance(self.auto_advance, TimeFlow::Forward);
        time
    }

    fn advance(&mut self, duration: Duration, flow: TimeFlow) {
        if duration == Duration::ZERO {
            return;
        }

        self.system_time = match flow {
            TimeFlow::Forward => self.system_time.checked_add(duration),
            TimeFlow::Backward => self.system_time.checked_sub(duration),
        }
        .expect(OUTSIDE_RANGE_MESSAGE);
    }
}

#[derive(Debug, Copy, Clone)]
enum TimeFlow {
    Forward,
    Backward,
}

static OUTSIDE_RANGE_MESSAGE: &str = "moving the clock outside of the range supported by SystemTime is not possible";

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assert_types() {
        static_assertions::assert_impl_all!(ClockControl: Send, Sync, Clone);
    }

    #[test]
    fn defaults_ok() {
        let control = ClockControl::new();

        assert_eq!(control.with_state(|s| s.auto_advance), Duration::ZERO);
        assert_eq!(control.now(), SystemTime::UNIX_EPOCH);
    }

    #[test]
    fn advance_ok() {
        let control = ClockControl::new();
        let clock = control.to_clock();
        let now = clock.now();

        control.advance(Duration::from_secs(1));

        assert_eq!(clock.now().duration_since(now).unwrap(), Duration::from_secs(1));
    }

    #[test]
    fn advance_millis_ok() {
        let control = ClockControl::new();
        let clock = control.to_clock();
        let now = clock.now();

        control.advance_millis(123);

        assert_eq!(clock.now().duration_since(now).unwrap(), Duration::from_millis(123));
    }

    #[test]
    fn advance_to_past_ok() {
        let control = ClockControl::new_at(Duration::from_secs(10));

        control.advance_to(SystemTime::UNIX_EPOCH + Duration::from_secs(5));

        assert_eq!(control.now(), SystemTime::UNIX_EPOCH + Duration::from_secs(5));
    }

    #[test]
    fn advance_to_future_ok() {
        let control = ClockControl::new();

        control.advance_to(SystemTime::UNIX_EPOCH + Duration::from_secs(7));

        assert_eq!(control.now(), SystemTime::UNIX_EPOCH + Duration::from_secs(7));
    }

    #[test]
    fn auto_advance_applies_on_read() {
        let control = ClockControl::new().auto_advance(Duration::from_millis(10));

        assert_eq!(control.read(), SystemTime::UNIX_EPOCH);
        assert_eq!(control.read(), SystemTime::UNIX_EPOCH + Duration::from_millis(10));

        // Peeking does not move the clock.
        assert_eq!(control.now(), SystemTime::UNIX_EPOCH + Duration::from_millis(20));
        assert_eq!(control.now(), SystemTime::UNIX_EPOCH + Duration::from_millis(20));
    }

    #[test]
    fn clones_share_time() {
        let control = ClockControl::new();
        let clone = control.clone();

        clone.advance_millis(50);

        assert_eq!(control.now(), SystemTime::UNIX_EPOCH + Duration::from_millis(50));
    }

    #[test]
    fn new_at_with_system_time_ok() {
        let system_time = SystemTime::UNIX_EPOCH + Duration::from_secs(222);
        let control = ClockControl::new_at(system_time);

        assert_eq!(control.to_clock().now(), system_time);
    }

    #[cfg(not(miri))]
    #[test]
    fn now_frozen_ok() {
        let before = SystemTime::now();
        let control = ClockControl::now_frozen();

        assert!(control.now() >= before);
    }

    #[test]
    #[should_panic(expected = "moving the clock outside of the range")]
    fn advance_past_epoch_panics() {
        let control = ClockControl::new();
        control.advance_to(SystemTime::UNIX_EPOCH + Duration::from_secs(1));
        control.with_state(|s| s.advance(Duration::from_secs(u64::MAX), TimeFlow::Backward));
    }
}
