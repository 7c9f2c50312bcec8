// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::{Duration, SystemTime};

use crate::{Error, Result};

/// Determines when a task runs for the first time.
///
/// A `Duration` converts into [`Trigger::After`] and a `SystemTime` into [`Trigger::At`], so
/// scheduling calls accept either directly.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, SystemTime};
///
/// use chime::Trigger;
///
/// assert_eq!(Trigger::from(Duration::from_millis(100)), Trigger::After(Duration::from_millis(100)));
/// assert_eq!(Trigger::from(SystemTime::UNIX_EPOCH), Trigger::At(SystemTime::UNIX_EPOCH));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Trigger {
    /// Run after the given delay, measured from the moment the task is scheduled.
    After(Duration),
    /// Run at the given absolute instant. Instants in the past are due immediately.
    At(SystemTime),
}

impl Trigger {
    /// Run as soon as possible.
    pub const NOW: Self = Self::After(Duration::ZERO);

    /// Run after the given number of milliseconds.
    #[must_use]
    pub const fn after_millis(millis: u64) -> Self {
        Self::After(Duration::from_millis(millis))
    }

    /// Resolves the trigger into an absolute instant relative to `now`.
    pub(crate) fn resolve(self, now: SystemTime) -> Result<SystemTime> {
        match self {
            Self::After(delay) => now
                .checked_add(delay)
                .ok_or_else(|| Error::out_of_range(format!("a delay of {delay:?} cannot be represented"))),
            Self::At(when) => Ok(when),
        }
    }
}

impl From<Duration> for Trigger {
    fn from(delay: Duration) -> Self {
        Self::After(delay)
    }
}

impl From<SystemTime> for Trigger {
    fn from(when: SystemTime) -> Self {
        Self::At(when)
    }
}
