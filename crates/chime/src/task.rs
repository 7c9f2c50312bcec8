// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use crate::{Error, Period, Result};

type Work = Box<dyn FnMut(&TimerTask) + Send>;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a [`TimerTask`].
///
/// Identifiers are assigned in creation order and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        Self(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the numeric value of the identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The lifecycle state of a [`TimerTask`].
///
/// A task only ever moves forward: `Created → Scheduled → {Executed | Cancelled}`.
/// Periodic tasks leave `Scheduled` when cancelled, or reach `Executed` once their next
/// instant can no longer be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// The task has not been handed to a scheduler yet.
    Created,
    /// The task is waiting in a scheduler queue.
    Scheduled,
    /// The task has fired for the last time.
    Executed,
    /// The task was cancelled, either directly or by cancelling its scheduler.
    Cancelled,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::Scheduled => "scheduled",
            Self::Executed => "executed",
            Self::Cancelled => "cancelled",
        })
    }
}

/// A unit of work together with its scheduling metadata.
///
/// The body receives a reference to the task that is firing, which allows it to inspect
/// [`scheduled_execution_time`][Self::scheduled_execution_time] or to
/// [`cancel`][Self::cancel] itself.
///
/// Cloning a task is inexpensive and yields another handle to the same task. A task is
/// scheduled at most once over its lifetime; once it has executed or was cancelled it
/// cannot be scheduled again.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use chime::{TaskState, TimerTask, VirtualScheduler};
///
/// let scheduler = VirtualScheduler::default();
/// let task = TimerTask::with_name("cleanup", |_| println!("cleaning up"));
///
/// scheduler.schedule(&task, Duration::from_millis(50))?;
/// assert_eq!(task.state(), TaskState::Scheduled);
///
/// scheduler.simulate_millis(50);
/// assert_eq!(task.state(), TaskState::Executed);
/// # Ok::<(), chime::Error>(())
/// ```
#[derive(Clone)]
pub struct TimerTask(Arc<TaskInner>);

struct TaskInner {
    id: TaskId,
    name: Option<Cow<'static, str>>,
    meta: Mutex<Meta>,
    work: Mutex<Work>,
}

#[derive(Debug)]
struct Meta {
    state: TaskState,
    next_execution_time: Option<SystemTime>,
    period: Period,
}

/// Bookkeeping outcome of a due task, decided before its body runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fired {
    /// The task was cancelled and must be dropped without running.
    Cancelled,
    /// The one-shot task is now executed.
    Once,
    /// The periodic task must be re-inserted at the given instant.
    Again(SystemTime),
    /// The periodic task's next instant cannot be represented; it runs now for the last time.
    Exhausted,
}

impl TimerTask {
    /// Creates a new task with the given body.
    pub fn new(work: impl FnMut(&Self) + Send + 'static) -> Self {
        Self::build(None, Box::new(work))
    }

    /// Creates a new task with a name that appears in log events.
    pub fn with_name(name: impl Into<Cow<'static, str>>, work: impl FnMut(&Self) + Send + 'static) -> Self {
        Self::build(Some(name.into()), Box::new(work))
    }

    fn build(name: Option<Cow<'static, str>>, work: Work) -> Self {
        Self(Arc::new(TaskInner {
            id: TaskId::next(),
            name,
            meta: Mutex::new(Meta {
                state: TaskState::Created,
                next_execution_time: None,
                period: Period::OneShot,
            }),
            work: Mutex::new(work),
        }))
    }

    /// Returns the identifier of this task.
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.0.id
    }

    /// Returns the name of this task, if it has one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> TaskState {
        self.meta().state
    }

    /// Returns the re-arm policy. Tasks that were never scheduled report [`Period::OneShot`].
    #[must_use]
    pub fn period(&self) -> Period {
        self.meta().period
    }

    /// Returns the instant at which the task fires next.
    ///
    /// After a one-shot task has fired, or after the task was cancelled, this keeps
    /// reporting the last instant it was due.
    #[must_use]
    pub fn next_execution_time(&self) -> Option<SystemTime> {
        self.meta().next_execution_time
    }

    /// Returns the instant of the most recent scheduled execution.
    ///
    /// Inside a task body this is the instant of the firing in progress. For a one-shot task
    /// it equals [`next_execution_time`][Self::next_execution_time]; for a periodic task it
    /// is the next execution time minus the period. Returns `None` if the task was never
    /// scheduled.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::{Duration, SystemTime};
    ///
    /// use chime::{ClockControl, TimerTask, VirtualScheduler};
    ///
    /// let scheduler = VirtualScheduler::new(ClockControl::new_at(Duration::from_millis(2000)));
    /// let task = TimerTask::new(|_| {});
    ///
    /// scheduler.schedule_at_fixed_rate(&task, Duration::from_millis(100), Duration::from_millis(60))?;
    /// scheduler.simulate_millis(120);
    ///
    /// let at = |millis| SystemTime::UNIX_EPOCH + Duration::from_millis(millis);
    /// assert_eq!(task.next_execution_time(), Some(at(2160)));
    /// assert_eq!(task.scheduled_execution_time(), Some(at(2100)));
    /// # Ok::<(), chime::Error>(())
    /// ```
    #[must_use]
    pub fn scheduled_execution_time(&self) -> Option<SystemTime> {
        let meta = self.meta();
        meta.next_execution_time.map(|next| meta.period.scheduled_before(next))
    }

    /// Cancels the task.
    ///
    /// Returns `true` if this call prevented one or more future executions, that is, if the
    /// task was scheduled. Cancelling a task that was never scheduled, has already executed,
    /// or was already cancelled has no effect and returns `false`.
    ///
    /// The queue entry is not removed; the scheduler drops it when it reaches the head of
    /// the queue or on [`purge`][crate::Scheduler::purge]. Calling `cancel` from inside the
    /// task's own body is allowed.
    pub fn cancel(&self) -> bool {
        let mut meta = self.meta();
        if meta.state == TaskState::Scheduled {
            meta.state = TaskState::Cancelled;
            true
        } else {
            false
        }
    }

    /// Returns `true` if the task was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state() == TaskState::Cancelled
    }

    pub(crate) fn mark_scheduled(&self, when: SystemTime, period: Period) -> Result<()> {
        let mut meta = self.meta();
        match meta.state {
            TaskState::Created => {
                meta.state = TaskState::Scheduled;
                meta.next_execution_time = Some(when);
                meta.period = period;
                Ok(())
            }
            TaskState::Scheduled => Err(Error::already_scheduled()),
            state @ (TaskState::Executed | TaskState::Cancelled) => Err(Error::task_finished(state)),
        }
    }

    /// Performs the bookkeeping of a due task at instant `now`.
    pub(crate) fn fire(&self, now: SystemTime) -> Fired {
        let mut meta = self.meta();
        let (TaskState::Scheduled, Some(scheduled)) = (meta.state, meta.next_execution_time) else {
            return Fired::Cancelled;
        };

        if !meta.period.is_periodic() {
            meta.state = TaskState::Executed;
            return Fired::Once;
        }

        match meta.period.next_execution(scheduled, now) {
            Some(next) => {
                meta.next_execution_time = Some(next);
                Fired::Again(next)
            }
            None => {
                meta.state = TaskState::Executed;
                Fired::Exhausted
            }
        }
    }

    /// Runs the body. The caller must not hold any scheduler lock.
    pub(crate) fn run(&self) {
        // A body that panicked earlier leaves the closure itself intact.
        let mut work = self.0.work.lock().unwrap_or_else(PoisonError::into_inner);
        work(self);
    }

    fn meta(&self) -> MutexGuard<'_, Meta> {
        self.0.meta.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for TimerTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let meta = self.meta();
        f.debug_struct("TimerTask")
            .field("id", &self.0.id)
            .field("name", &self.0.name)
            .field("state", &meta.state)
            .field("next_execution_time", &meta.next_execution_time)
            .field("period", &meta.period)
            .finish_non_exhaustive()
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use rstest::rstest;

    use super::*;
    use crate::ErrorKind;

    static_assertions::assert_impl_all!(TimerTask: Send, Sync, Clone, fmt::Debug);
    static_assertions::assert_impl_all!(TaskId: Send, Sync, Copy, Ord, fmt::Display);

    fn at(millis: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_millis(millis)
    }

    #[test]
    fn new_task_is_created() {
        let task = TimerTask::new(|_| {});

        assert_eq!(task.state(), TaskState::Created);
        assert_eq!(task.period(), Period::OneShot);
        assert_eq!(task.next_execution_time(), None);
        assert_eq!(task.scheduled_execution_time(), None);
        assert_eq!(task.name(), None);
    }

    #[test]
    fn ids_are_unique_and_increasing() {
        let first = TimerTask::new(|_| {});
        let second = TimerTask::new(|_| {});

        assert!(second.id() > first.id());
        assert_eq!(first.clone().id(), first.id());
    }

    #[test]
    fn with_name_ok() {
        let task = TimerTask::with_name("heartbeat", |_| {});

        assert_eq!(task.name(), Some("heartbeat"));
        assert!(format!("{task:?}").contains("heartbeat"));
    }

    #[test]
    fn cancel_created_is_inert() {
        let task = TimerTask::new(|_| {});

        assert!(!task.cancel());
        assert_eq!(task.state(), TaskState::Created);
    }

    #[test]
    fn cancel_scheduled_once() {
        let task = TimerTask::new(|_| {});
        task.mark_scheduled(at(100), Period::OneShot).unwrap();

        assert!(task.cancel());
        assert!(!task.cancel());
        assert!(task.is_cancelled());
    }

    #[test]
    fn mark_scheduled_twice_rejected() {
        let task = TimerTask::new(|_| {});
        task.mark_scheduled(at(100), Period::OneShot).unwrap();

        let error = task.mark_scheduled(at(200), Period::OneShot).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::AlreadyScheduled);
        assert_eq!(task.next_execution_time(), Some(at(100)));
    }

    #[rstest]
    #[case::cancelled(true)]
    #[case::executed(false)]
    fn finished_task_rejected(#[case] cancel: bool) {
        let task = TimerTask::new(|_| {});
        task.mark_scheduled(at(100), Period::OneShot).unwrap();
        if cancel {
            task.cancel();
        } else {
            assert_eq!(task.fire(at(100)), Fired::Once);
        }

        let error = task.mark_scheduled(at(200), Period::OneShot).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::TaskFinished);
    }

    #[test]
    fn fire_one_shot_keeps_instant() {
        let task = TimerTask::new(|_| {});
        task.mark_scheduled(at(100), Period::OneShot).unwrap();

        assert_eq!(task.fire(at(130)), Fired::Once);
        assert_eq!(task.state(), TaskState::Executed);
        assert_eq!(task.scheduled_execution_time(), Some(at(100)));
    }

    #[rstest]
    #[case::fixed_rate(Period::FixedRate(Duration::from_millis(60)), at(2160))]
    #[case::fixed_delay(Period::FixedDelay(Duration::from_millis(60)), at(2180))]
    fn fire_periodic_rearms(#[case] period: Period, #[case] expected: SystemTime) {
        let task = TimerTask::new(|_| {});
        task.mark_scheduled(at(2100), period).unwrap();

        assert_eq!(task.fire(at(2120)), Fired::Again(expected));
        assert_eq!(task.state(), TaskState::Scheduled);
        assert_eq!(task.next_execution_time(), Some(expected));
    }

    #[test]
    fn fire_cancelled_is_dropped() {
        let task = TimerTask::new(|_| {});
        task.mark_scheduled(at(100), Period::FixedRate(Duration::from_millis(5))).unwrap();
        task.cancel();

        assert_eq!(task.fire(at(100)), Fired::Cancelled);
        assert_eq!(task.next_execution_time(), Some(at(100)));
    }

    #[test]
    fn fire_exhausted_when_next_overflows() {
        let task = TimerTask::new(|_| {});
        task.mark_scheduled(at(100), Period::FixedDelay(Duration::MAX)).unwrap();

        assert_eq!(task.fire(at(100)), Fired::Exhausted);
        assert_eq!(task.state(), TaskState::Executed);
        assert!(!task.cancel());
    }

    #[test]
    fn run_passes_handle() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let task = TimerTask::new(move |task| {
            seen.fetch_add(1, Ordering::SeqCst);
            task.cancel();
        });
        task.mark_scheduled(at(100), Period::FixedRate(Duration::from_millis(5))).unwrap();

        task.run();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(task.is_cancelled());
    }

    #[test]
    fn state_display() {
        assert_eq!(TaskState::Created.to_string(), "created");
        assert_eq!(TaskState::Scheduled.to_string(), "scheduled");
        assert_eq!(TaskState::Executed.to_string(), "executed");
        assert_eq!(TaskState::Cancelled.to_string(), "cancelled");
    }
}
