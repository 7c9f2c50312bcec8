// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, SystemTime};

use crate::queue::TaskQueue;
use crate::runtime::{DelayDriver, Wakeup};
use crate::task::Fired;
use crate::telemetry::Telemetry;
use crate::{Clock, Error, Period, Result, SchedulerOptions, TimerTask, Trigger};

/// Schedules one-shot and periodic [`TimerTask`]s against a [`Clock`].
///
/// The scheduler keeps its tasks in a queue ordered by the instant they fire next (ties
/// fire in the order they were queued). Whenever the head of the queue is not yet due, it
/// arms a single wait on its [`DelayDriver`]; when the wait elapses, the fire loop runs
/// every task that is due and arms the wait for the new head.
///
/// # Time source
///
/// The clock and the delay driver are injected. Production code typically uses
/// `Scheduler::new_tokio` (feature `tokio`), while tests use a
/// [`VirtualScheduler`][crate::VirtualScheduler] whose time only moves when told to.
///
/// # Fixed delay and fixed rate
///
/// See [`Period`] for how the two periodic policies compute the next firing.
///
/// # Cancellation
///
/// Cancelling a task does not touch the queue. A cancelled task is dropped when it reaches
/// the head of the queue, or when [`purge`][Self::purge] runs.
///
/// # Cloning
///
/// Cloning a scheduler is inexpensive and every clone refers to the same queue, so a task
/// body can capture a clone to schedule further work.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use chime::{ClockControl, TimerTask, VirtualScheduler};
///
/// let scheduler = VirtualScheduler::new(ClockControl::new_at(Duration::from_millis(2000)));
/// let heartbeat = TimerTask::new(|task| {
///     println!("heartbeat due at {:?}", task.scheduled_execution_time());
/// });
///
/// scheduler.schedule_at_fixed_rate(&heartbeat, Duration::from_millis(100), Duration::from_millis(60))?;
///
/// let report = scheduler.simulate_millis(620);
/// assert_eq!(report.fired, 9);
///
/// heartbeat.cancel();
/// assert_eq!(scheduler.purge(), 1);
/// # Ok::<(), chime::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Scheduler {
    shared: Arc<Shared>,
}

#[derive(Debug)]
pub(crate) struct Shared {
    clock: Clock,
    driver: Box<dyn DelayDriver>,
    options: SchedulerOptions,
    telemetry: Telemetry,
    state: Mutex<State>,
    panics: AtomicUsize,
}

#[derive(Debug, Default)]
struct State {
    queue: TaskQueue,

    /// Incremented on every arm and disarm; a wakeup from an older generation is stale.
    generation: u64,

    /// Set while a fire loop runs. Only one loop runs at a time.
    firing: bool,

    cancelled: bool,
}

impl Scheduler {
    /// Creates a scheduler with default options.
    pub fn new(clock: impl Into<Clock>, driver: impl DelayDriver) -> Self {
        Self::with_options(clock, driver, SchedulerOptions::default())
    }

    /// Creates a scheduler with the given options.
    pub fn with_options(clock: impl Into<Clock>, driver: impl DelayDriver, options: SchedulerOptions) -> Self {
        Self {
            shared: Arc::new(Shared {
                clock: clock.into(),
                driver: Box::new(driver),
                telemetry: Telemetry::new(&options),
                options,
                state: Mutex::new(State::default()),
                panics: AtomicUsize::new(0),
            }),
        }
    }

    /// Creates a scheduler over the system clock, driven by the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    #[cfg(any(feature = "tokio", test))]
    #[cfg_attr(docsrs, doc(cfg(feature = "tokio")))]
    #[must_use]
    pub fn new_tokio() -> Self {
        Self::new(Clock::new_system(), crate::runtime::TokioDelay::new())
    }

    /// Schedules `task` to run once.
    ///
    /// # Errors
    ///
    /// See [`schedule_with_period`][Self::schedule_with_period].
    pub fn schedule(&self, task: &TimerTask, trigger: impl Into<Trigger>) -> Result<()> {
        self.schedule_with_period(task, trigger, Period::OneShot)
    }

    /// Schedules `task` to run repeatedly, `period` after each actual execution.
    ///
    /// # Errors
    ///
    /// See [`schedule_with_period`][Self::schedule_with_period].
    pub fn schedule_with_fixed_delay(&self, task: &TimerTask, trigger: impl Into<Trigger>, period: Duration) -> Result<()> {
        self.schedule_with_period(task, trigger, Period::FixedDelay(period))
    }

    /// Schedules `task` to run repeatedly, `period` after each scheduled execution.
    ///
    /// # Errors
    ///
    /// See [`schedule_with_period`][Self::schedule_with_period].
    pub fn schedule_at_fixed_rate(&self, task: &TimerTask, trigger: impl Into<Trigger>, period: Duration) -> Result<()> {
        self.schedule_with_period(task, trigger, Period::FixedRate(period))
    }

    /// Schedules `task` with the given re-arm policy.
    ///
    /// The first execution happens at the instant described by `trigger`: a `Duration` is
    /// a delay from now, a `SystemTime` an absolute instant. Instants in the past are due
    /// immediately. If the task becomes the head of the queue, the fire loop runs before
    /// this call returns, so a task that is already due runs synchronously.
    ///
    /// # Rescheduling
    ///
    /// A task is scheduled at most once. Scheduling a task that is already scheduled, in
    /// this or any other scheduler, is rejected instead of moving it; cancel the task and
    /// schedule a new one to change its timing.
    ///
    /// # Errors
    ///
    /// The call has no effect when it fails.
    ///
    /// - [`ErrorKind::InvalidPeriod`][crate::ErrorKind::InvalidPeriod] if a periodic policy
    ///   has a zero period.
    /// - [`ErrorKind::OutOfRange`][crate::ErrorKind::OutOfRange] if the delay cannot be
    ///   represented.
    /// - [`ErrorKind::SchedulerCancelled`][crate::ErrorKind::SchedulerCancelled] if the
    ///   scheduler was cancelled.
    /// - [`ErrorKind::AlreadyScheduled`][crate::ErrorKind::AlreadyScheduled] if the task is
    ///   waiting in a queue.
    /// - [`ErrorKind::TaskFinished`][crate::ErrorKind::TaskFinished] if the task has
    ///   executed or was cancelled.
    pub fn schedule_with_period(&self, task: &TimerTask, trigger: impl Into<Trigger>, period: Period) -> Result<()> {
        let period = period.validate()?;
        let when = trigger.into().resolve(self.shared.clock.now())?;

        let mut state = self.shared.lock();
        if state.cancelled {
            return Err(Error::scheduler_cancelled());
        }

        task.mark_scheduled(when, period)?;
        state.queue.push(when, task.clone());
        self.shared.telemetry.task_scheduled(task, when);

        let is_head = state.queue.is_head(task);
        drop(state);

        if is_head {
            self.shared.run();
        }

        Ok(())
    }

    /// Cancels the scheduler and every task in its queue.
    ///
    /// The queue is emptied, the outstanding wait is disarmed and later scheduling calls
    /// fail with [`ErrorKind::SchedulerCancelled`][crate::ErrorKind::SchedulerCancelled].
    /// A task body that is running when this is called runs to completion.
    ///
    /// Returns the number of scheduled tasks this call cancelled. Calling it again has no
    /// effect and returns `0`.
    pub fn cancel(&self) -> usize {
        let mut state = self.shared.lock();
        if state.cancelled {
            return 0;
        }

        state.cancelled = true;
        let cancelled = state.queue.drain().filter(|task| task.cancel()).count();
        self.shared.disarm(&mut state);
        self.shared.telemetry.scheduler_cancelled(cancelled);

        cancelled
    }

    /// Removes every cancelled task from the queue and returns how many were removed.
    ///
    /// Purging is never required for correctness; it only releases cancelled tasks earlier
    /// than the fire loop would. If the head of the queue changes, the wait is re-armed for
    /// the new head.
    pub fn purge(&self) -> usize {
        let mut state = self.shared.lock();
        let removed = state.queue.purge();

        // A running fire loop re-arms on its own once the body returns.
        if removed > 0 && !state.firing {
            self.shared.settle(&mut state);
        }

        drop(state);
        self.shared.telemetry.queue_purged(removed);
        removed
    }

    /// Runs every task that is due now and re-arms the wait for the next one.
    ///
    /// This happens automatically whenever a wait elapses; calling it directly is useful
    /// after moving a controlled clock. Returns the number of task bodies that ran, which
    /// is `0` when a fire loop is already running, for example when called from a task body.
    #[cfg_attr(test, mutants::skip)] // Causes test timeout.
    pub fn run_pending(&self) -> usize {
        self.shared.run()
    }

    /// Returns the number of queued tasks, including cancelled tasks not yet dropped.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.lock().queue.len()
    }

    /// Returns `true` if the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.lock().queue.is_empty()
    }

    /// Returns when the next task that is not cancelled fires.
    #[must_use]
    pub fn next_execution_time(&self) -> Option<SystemTime> {
        self.shared.lock().queue.next_live()
    }

    /// Returns `true` if [`cancel`][Self::cancel] was called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.shared.lock().cancelled
    }

    /// Returns the number of task bodies that panicked and were contained.
    #[must_use]
    pub fn panic_count(&self) -> usize {
        self.shared.panics.load(Ordering::Relaxed)
    }

    /// Returns the clock of this scheduler.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.shared.clock
    }

    /// Returns the options this scheduler was created with.
    #[must_use]
    pub fn options(&self) -> &SchedulerOptions {
        &self.shared.options
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        // Task bodies never run under this lock, so a poisoned state is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn generation(&self) -> u64 {
        self.lock().generation
    }

    pub(crate) fn wake(self: &Arc<Self>, generation: u64) -> usize {
        if self.generation() != generation {
            return 0;
        }

        self.run()
    }

    /// The fire loop.
    #[cfg_attr(test, mutants::skip)] // Causes test timeout.
    fn run(self: &Arc<Self>) -> usize {
        {
            let mut state = self.lock();
            if state.firing {
                return 0;
            }
            state.firing = true;
        }

        let _firing = FiringGuard(self);
        let mut fired = 0;
        let mut state = self.lock();

        loop {
            let Some((when, head)) = state.queue.peek() else {
                self.disarm(&mut state);
                break;
            };

            if head.is_cancelled() {
                state.queue.pop();
                continue;
            }

            let now = self.clock.now();
            if when > now {
                self.arm(&mut state, Clock::until(when, now));
                break;
            }

            let Some((scheduled, task)) = state.queue.pop() else {
                break;
            };

            match task.fire(now) {
                Fired::Cancelled => continue,
                Fired::Again(next) => state.queue.push(next, task.clone()),
                Fired::Once | Fired::Exhausted => {}
            }

            drop(state);
            self.execute(&task, scheduled, now);
            fired += 1;
            state = self.lock();
        }

        // Cleared under the same lock as the final decision, so a task queued right after
        // is either seen by this loop or starts a new one.
        state.firing = false;
        fired
    }

    fn execute(&self, task: &TimerTask, scheduled: SystemTime, now: SystemTime) {
        self.telemetry.task_fired(task, scheduled, now);

        if !self.options.get_catch_panics() {
            task.run();
            return;
        }

        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| task.run())) {
            self.panics.fetch_add(1, Ordering::Relaxed);
            self.telemetry.task_panicked(task, panic_message(payload.as_ref()));
        }
    }

    /// Arms a wait for the head of the queue, or disarms if the queue is empty.
    fn settle(self: &Arc<Self>, state: &mut State) {
        match state.queue.peek().map(|(when, _)| when) {
            Some(when) => {
                let delay = Clock::until(when, self.clock.now());
                self.arm(state, delay);
            }
            None => self.disarm(state),
        }
    }

    fn arm(self: &Arc<Self>, state: &mut State, delay: Duration) {
        state.generation = state.generation.wrapping_add(1);
        self.driver.arm(delay, Wakeup::new(self, state.generation));
        self.telemetry.timer_armed(delay, state.generation);
    }

    fn disarm(&self, state: &mut State) {
        state.generation = state.generation.wrapping_add(1);
        self.driver.disarm();
    }
}

/// Releases the fire loop when a task body panics through it.
struct FiringGuard<'a>(&'a Arc<Shared>);

impl Drop for FiringGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            let mut state = self.0.lock();
            state.firing = false;
            self.0.settle(&mut state);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
