// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::{Duration, SystemTime};

use crate::{Error, Result};

/// How a task is re-armed after it fires.
///
/// # Fixed delay and fixed rate
///
/// Both periodic policies fire the task every `period`, but they differ in what the period
/// is measured from:
///
/// - [`Period::FixedDelay`] measures from the instant the task *actually* fired. A late
///   firing pushes all subsequent firings later, so delays accumulate.
/// - [`Period::FixedRate`] measures from the instant the task was *supposed* to fire. After
///   a late firing the scheduler catches up: several firings may be owed and run back to
///   back, and the schedule does not drift.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, SystemTime};
///
/// use chime::Period;
///
/// let scheduled = SystemTime::UNIX_EPOCH + Duration::from_millis(2100);
/// let fired = SystemTime::UNIX_EPOCH + Duration::from_millis(2120);
/// let period = Duration::from_millis(60);
///
/// assert_eq!(
///     Period::FixedRate(period).next_execution(scheduled, fired),
///     Some(SystemTime::UNIX_EPOCH + Duration::from_millis(2160))
/// );
/// assert_eq!(
///     Period::FixedDelay(period).next_execution(scheduled, fired),
///     Some(SystemTime::UNIX_EPOCH + Duration::from_millis(2180))
/// );
/// assert_eq!(Period::OneShot.next_execution(scheduled, fired), None);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Period {
    /// The task fires once.
    #[default]
    OneShot,
    /// The next firing is `period` after the actual firing.
    FixedDelay(Duration),
    /// The next firing is `period` after the previously scheduled firing.
    FixedRate(Duration),
}

impl Period {
    /// Returns `true` for the repeating policies.
    #[must_use]
    pub const fn is_periodic(&self) -> bool {
        !matches!(self, Self::OneShot)
    }

    /// Returns the interval between firings, or `None` for a one-shot task.
    #[must_use]
    pub const fn interval(&self) -> Option<Duration> {
        match self {
            Self::OneShot => None,
            Self::FixedDelay(period) | Self::FixedRate(period) => Some(*period),
        }
    }

    /// Computes when a task with this policy fires next.
    ///
    /// `scheduled` is the instant the current firing was due and `fired` the instant it
    /// actually happened. Returns `None` for a one-shot task and when the next instant
    /// cannot be represented.
    #[must_use]
    pub fn next_execution(self, scheduled: SystemTime, fired: SystemTime) -> Option<SystemTime> {
        match self {
            Self::OneShot => None,
            Self::FixedDelay(period) => fired.checked_add(period),
            Self::FixedRate(period) => scheduled.checked_add(period),
        }
    }

    /// Recovers the instant of the most recent firing from the re-armed `next` instant.
    ///
    /// Both periodic policies add `period` when re-arming, so subtracting it undoes the
    /// rearm. For a fixed-delay task this yields the instant the task actually fired.
    pub(crate) fn scheduled_before(self, next: SystemTime) -> SystemTime {
        match self.interval() {
            Some(period) => next.checked_sub(period).unwrap_or(next),
            None => next,
        }
    }

    pub(crate) fn validate(self) -> Result<Self> {
        match self.interval() {
            Some(Duration::ZERO) => Err(Error::invalid_period(Duration::ZERO)),
            _ => Ok(self),
        }
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::ErrorKind;

    fn at(millis: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_millis(millis)
    }

    #[test]
    fn default_is_one_shot() {
        assert_eq!(Period::default(), Period::OneShot);
        assert!(!Period::OneShot.is_periodic());
        assert_eq!(Period::OneShot.interval(), None);
    }

    #[rstest]
    #[case::fixed_delay(Period::FixedDelay(Duration::from_millis(60)))]
    #[case::fixed_rate(Period::FixedRate(Duration::from_millis(60)))]
    fn periodic_interval(#[case] period: Period) {
        assert!(period.is_periodic());
        assert_eq!(period.interval(), Some(Duration::from_millis(60)));
    }

    #[test]
    fn fixed_rate_measures_from_schedule() {
        let period = Period::FixedRate(Duration::from_millis(60));

        assert_eq!(period.next_execution(at(2100), at(2120)), Some(at(2160)));
    }

    #[test]
    fn fixed_delay_measures_from_firing() {
        let period = Period::FixedDelay(Duration::from_millis(60));

        assert_eq!(period.next_execution(at(2100), at(2120)), Some(at(2180)));
    }

    #[test]
    fn policies_agree_without_drift() {
        let delay = Period::FixedDelay(Duration::from_millis(60));
        let rate = Period::FixedRate(Duration::from_millis(60));

        assert_eq!(delay.next_execution(at(2100), at(2100)), rate.next_execution(at(2100), at(2100)));
    }

    #[rstest]
    #[case::one_shot(Period::OneShot, at(2100))]
    #[case::fixed_delay(Period::FixedDelay(Duration::from_millis(60)), at(2120))]
    #[case::fixed_rate(Period::FixedRate(Duration::from_millis(60)), at(2120))]
    fn scheduled_before_undoes_rearm(#[case] period: Period, #[case] expected: SystemTime) {
        let next = period.next_execution(at(2100), at(2120)).unwrap_or(at(2100));

        assert_eq!(period.scheduled_before(next), expected);
    }

    #[rstest]
    #[case::fixed_delay(Period::FixedDelay(Duration::ZERO))]
    #[case::fixed_rate(Period::FixedRate(Duration::ZERO))]
    fn zero_period_rejected(#[case] period: Period) {
        assert_eq!(period.validate().unwrap_err().kind(), ErrorKind::InvalidPeriod);
    }

    #[test]
    fn one_shot_valid() {
        assert_eq!(Period::OneShot.validate().unwrap(), Period::OneShot);
    }
}
