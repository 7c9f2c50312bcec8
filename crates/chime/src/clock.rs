// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::{Duration, SystemTime};

use crate::ClockControl;

/// Provides an abstraction over "what time is it now".
///
/// A scheduler never reads the system time directly; it asks the `Clock` it was constructed
/// with. This keeps the time source injectable: production code uses
/// [`Clock::new_system`], while tests use a frozen clock driven by a
/// [`ClockControl`][crate::ClockControl], so several independently clocked schedulers can
/// coexist in one process.
///
/// # Absolute time
///
/// Scheduling instants are absolute points in time represented by [`SystemTime`]. The
/// system clock is assumed to be non-decreasing; adjustments of the operating system clock
/// are not compensated for.
///
/// # Cloning and shared state
///
/// Cloning a clock is inexpensive and every clone shares the same underlying state. For a
/// controlled clock, time adjustments performed through the control are visible to every
/// clone.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, SystemTime};
///
/// use chime::Clock;
///
/// let clock = Clock::new_frozen_at(SystemTime::UNIX_EPOCH + Duration::from_secs(10));
///
/// assert_eq!(clock.now(), SystemTime::UNIX_EPOCH + Duration::from_secs(10));
/// assert_eq!(clock.now_millis(), 10_000);
/// ```
#[derive(Debug, Clone)]
pub struct Clock(ClockState);

#[derive(Debug, Clone)]
enum ClockState {
    System,
    ClockControl(ClockControl),
}

impl Clock {
    /// Creates a clock that reads the real system time.
    #[must_use]
    pub const fn new_system() -> Self {
        Self(ClockState::System)
    }

    /// Creates a new frozen clock at the UNIX epoch.
    ///
    /// This is a convenience method equivalent to calling `ClockControl::new().to_clock()`.
    /// Because the control is not retained, the returned clock never moves.
    #[must_use]
    pub fn new_frozen() -> Self {
        ClockControl::new().to_clock()
    }

    /// Creates a new frozen clock at the specified time.
    ///
    /// This is a convenience method equivalent to calling `ClockControl::new_at(time).to_clock()`.
    #[must_use]
    pub fn new_frozen_at(time: impl Into<SystemTime>) -> Self {
        ClockControl::new_at(time.into()).to_clock()
    }

    pub(crate) fn with_control(control: &ClockControl) -> Self {
        Self(ClockState::ClockControl(control.clone()))
    }

    /// Retrieves the current time.
    ///
    /// For a controlled clock this returns the stored instant (and applies the configured
    /// auto-advance step, if any).
    #[must_use]
    pub fn now(&self) -> SystemTime {
        match &self.0 {
            ClockState::System => SystemTime::now(),
            ClockState::ClockControl(control) => control.read(),
        }
    }

    /// Retrieves the current time as milliseconds since the UNIX epoch.
    ///
    /// Instants before the epoch are reported as `0`.
    #[must_use]
    pub fn now_millis(&self) -> u128 {
        self.now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_millis())
    }

    /// Returns `true` if the time of this clock is controlled by a [`ClockControl`].
    #[must_use]
    pub const fn is_controlled(&self) -> bool {
        matches!(self.0, ClockState::ClockControl(_))
    }

    /// Returns the duration from `now` until `when`, or zero if `when` is not in the future.
    pub(crate) fn until(when: SystemTime, now: SystemTime) -> Duration {
        when.duration_since(now).unwrap_or(Duration::ZERO)
    }
}
