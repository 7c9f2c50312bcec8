// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

use crate::TaskState;

/// The result type for fallible scheduling operations.
pub type Result<T> = std::result::Result<T, Error>;

/// An error returned when a scheduling request is rejected.
///
/// Every error is local to the call that produced it; the scheduler and the task are left
/// exactly as they were before the call.
///
/// # Limited introspection
///
/// Other than implementing [`std::error::Error`], [`Display`][fmt::Display] and [`Debug`],
/// the error only exposes its [`ErrorKind`] for matching.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use chime::{ErrorKind, TimerTask, VirtualScheduler};
///
/// let scheduler = VirtualScheduler::default();
/// let task = TimerTask::new(|_| {});
///
/// let error = scheduler
///     .schedule_at_fixed_rate(&task, Duration::from_millis(10), Duration::ZERO)
///     .unwrap_err();
///
/// assert_eq!(error.kind(), ErrorKind::InvalidPeriod);
/// ```
#[derive(Debug)]
pub struct Error(Repr);

#[derive(Debug)]
struct Repr {
    kind: ErrorKind,
    message: Cow<'static, str>,
}

/// The category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A periodic schedule was requested with a zero period.
    InvalidPeriod,
    /// The task is already scheduled and waiting in a queue.
    AlreadyScheduled,
    /// The task has already executed or was cancelled; finished tasks cannot be scheduled again.
    TaskFinished,
    /// The scheduler was cancelled and no longer accepts tasks.
    SchedulerCancelled,
    /// The requested instant cannot be represented.
    OutOfRange,
}

impl Error {
    const fn new(kind: ErrorKind, message: Cow<'static, str>) -> Self {
        Self(Repr { kind, message })
    }

    pub(crate) fn invalid_period(period: Duration) -> Self {
        Self::new(
            ErrorKind::InvalidPeriod,
            Cow::Owned(format!("periodic tasks require a non-zero period, got {period:?}")),
        )
    }

    pub(crate) fn already_scheduled() -> Self {
        Self::new(ErrorKind::AlreadyScheduled, Cow::Borrowed("the task is already scheduled"))
    }

    pub(crate) fn task_finished(state: TaskState) -> Self {
        Self::new(
            ErrorKind::TaskFinished,
            Cow::Owned(format!("the task cannot be scheduled because it is {state}")),
        )
    }

    pub(crate) fn scheduler_cancelled() -> Self {
        Self::new(ErrorKind::SchedulerCancelled, Cow::Borrowed("the scheduler has been cancelled"))
    }

    pub(crate) fn out_of_range(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::OutOfRange, message.into())
    }

    /// Returns the category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.0.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.message)
    }
}

impl std::error::Error for Error {}
