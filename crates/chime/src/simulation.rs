// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::ops::Deref;
use std::time::{Duration, SystemTime};

use crate::runtime::VirtualDelay;
use crate::{ClockControl, Scheduler, SchedulerOptions};

/// A [`Scheduler`] over a virtual clock, for deterministic tests.
///
/// The virtual scheduler owns the [`ClockControl`] of its clock and a [`VirtualDelay`]
/// driver, so nothing ever fires by itself: time moves only through
/// [`simulate`][Self::simulate], [`run_for`][Self::run_for] or the control. All scheduling
/// operations are available through `Deref`.
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
/// scheduler.schedule_with_fixed_delay(&task, Duration::from_millis(100), Duration::from_millis(60))?;
///
/// let report = scheduler.simulate_millis(120);
///
/// assert_eq!(report.fired, 1);
/// assert_eq!(report.now, SystemTime::UNIX_EPOCH + Duration::from_millis(2120));
/// assert_eq!(task.next_execution_time(), Some(SystemTime::UNIX_EPOCH + Duration::from_millis(2180)));
/// # Ok::<(), chime::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct VirtualScheduler {
    scheduler: Scheduler,
    control: ClockControl,
    delay: VirtualDelay,
}

/// The outcome of advancing a [`VirtualScheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct SimulationReport {
    /// The number of task bodies that ran.
    pub fired: usize,
    /// The virtual time after advancing.
    pub now: SystemTime,
}

impl VirtualScheduler {
    /// Creates a virtual scheduler with default options over the given control.
    #[must_use]
    pub fn new(control: ClockControl) -> Self {
        Self::with_options(control, SchedulerOptions::default())
    }

    /// Creates a virtual scheduler with the given options.
    #[must_use]
    pub fn with_options(control: ClockControl, options: SchedulerOptions) -> Self {
        let delay = VirtualDelay::new();

        Self {
            scheduler: Scheduler::with_options(&control, delay.clone(), options),
            control,
            delay,
        }
    }

    /// Returns the control of the virtual clock.
    #[must_use]
    pub fn control(&self) -> &ClockControl {
        &self.control
    }

    /// Returns the underlying scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Returns the wait the scheduler armed last, or `None` if nothing is pending.
    ///
    /// After every scheduling decision this equals the time remaining until the head of
    /// the queue.
    #[must_use]
    pub fn armed_delay(&self) -> Option<Duration> {
        self.delay.armed()
    }

    /// Advances the clock by `ticks` in a single jump, then runs the fire loop once.
    ///
    /// Every task due at the new time fires. Because the jump happens before any task
    /// runs, a fixed-delay task that was due inside the span computes its next execution
    /// from the end of the span, while a fixed-rate task catches up on every execution it
    /// owes.
    ///
    /// # Panics
    ///
    /// Panics if the resulting time cannot be represented by [`SystemTime`].
    pub fn simulate(&self, ticks: Duration) -> SimulationReport {
        self.control.advance(ticks);
        let fired = self.scheduler.run_pending();

        SimulationReport {
            fired,
            now: self.control.now(),
        }
    }

    /// Advances the clock by `ticks` milliseconds in a single jump, then runs the fire loop once.
    ///
    /// # Panics
    ///
    /// Panics if the resulting time cannot be represented by [`SystemTime`].
    pub fn simulate_millis(&self, ticks: u64) -> SimulationReport {
        self.simulate(Duration::from_millis(ticks))
    }

    /// Advances the clock by `span`, stopping at every instant a task is due.
    ///
    /// Unlike [`simulate`][Self::simulate], every task fires at exactly its scheduled
    /// instant, which is what a real clock would produce over the same span.
    ///
    /// # Panics
    ///
    /// Panics if the resulting time cannot be represented by [`SystemTime`].
    #[cfg_attr(test, mutants::skip)] // Causes test timeout.
    pub fn run_for(&self, span: Duration) -> SimulationReport {
        let end = self
            .control
            .now()
            .checked_add(span)
            .expect("moving the clock outside of the range supported by SystemTime is not possible");

        let mut fired = 0;
        while let Some(next) = self.scheduler.next_execution_time().filter(|next| *next <= end) {
            self.control.advance_to(next.max(self.control.now()));
            match self.scheduler.run_pending() {
                0 => break,
                count => fired += count,
            }
        }

        self.control.advance_to(end.max(self.control.now()));
        fired += self.scheduler.run_pending();

        SimulationReport {
            fired,
            now: self.control.now(),
        }
    }
}

impl Default for VirtualScheduler {
    /// Creates a virtual scheduler whose clock starts at the UNIX epoch.
    fn default() -> Self {
        Self::new(ClockControl::new())
    }
}

impl Deref for VirtualScheduler {
    type Target = Scheduler;

    fn deref(&self) -> &Self::Target {
        &self.scheduler
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::TimerTask;

    static_assertions::assert_impl_all!(VirtualScheduler: Send, Sync, Clone, std::fmt::Debug);

    fn at(millis: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_millis(millis)
    }

    fn recorder() -> (Arc<Mutex<Vec<SystemTime>>>, TimerTask) {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&fired);
        let task = TimerTask::new(move |task| {
            if let Some(when) = task.scheduled_execution_time() {
                seen.lock().unwrap().push(when);
            }
        });
        (fired, task)
    }

    #[test]
    fn default_starts_at_epoch() {
        let scheduler = VirtualScheduler::default();

        assert_eq!(scheduler.control().now(), SystemTime::UNIX_EPOCH);
        assert_eq!(scheduler.armed_delay(), None);
        assert!(scheduler.scheduler().is_empty());
    }

    #[test]
    fn simulate_reports_time() {
        let scheduler = VirtualScheduler::new(ClockControl::new_at(Duration::from_millis(2000)));

        let report = scheduler.simulate_millis(250);

        assert_eq!(report, SimulationReport { fired: 0, now: at(2250) });
    }

    #[test]
    fn simulate_jump_catches_up_fixed_rate() {
        let scheduler = VirtualScheduler::new(ClockControl::new_at(Duration::from_millis(2000)));
        let (fired, task) = recorder();
        scheduler
            .schedule_at_fixed_rate(&task, Duration::from_millis(100), Duration::from_millis(60))
            .unwrap();

        let report = scheduler.simulate_millis(620);

        assert_eq!(report.fired, 9);
        assert_eq!(fired.lock().unwrap().first(), Some(&at(2100)));
        assert_eq!(fired.lock().unwrap().last(), Some(&at(2580)));
        assert_eq!(task.next_execution_time(), Some(at(2640)));
        assert_eq!(scheduler.armed_delay(), Some(Duration::from_millis(20)));
    }

    #[test]
    fn simulate_jump_fires_fixed_delay_once() {
        let scheduler = VirtualScheduler::new(ClockControl::new_at(Duration::from_millis(2000)));
        let (fired, task) = recorder();
        scheduler
            .schedule_with_fixed_delay(&task, Duration::from_millis(100), Duration::from_millis(60))
            .unwrap();

        let report = scheduler.simulate_millis(620);

        assert_eq!(report.fired, 1);
        assert_eq!(fired.lock().unwrap().as_slice(), &[at(2620)]);
        assert_eq!(task.next_execution_time(), Some(at(2680)));
    }

    #[test]
    fn run_for_stops_at_each_instant() {
        let scheduler = VirtualScheduler::new(ClockControl::new_at(Duration::from_millis(2000)));
        let (fired, task) = recorder();
        scheduler
            .schedule_with_fixed_delay(&task, Duration::from_millis(100), Duration::from_millis(60))
            .unwrap();

        let report = scheduler.run_for(Duration::from_millis(620));

        assert_eq!(report, SimulationReport { fired: 9, now: at(2620) });
        assert_eq!(fired.lock().unwrap().last(), Some(&at(2580)));
        assert_eq!(task.next_execution_time(), Some(at(2640)));
        assert_eq!(scheduler.armed_delay(), Some(Duration::from_millis(20)));
    }

    #[test]
    fn run_for_without_tasks_advances() {
        let scheduler = VirtualScheduler::default();

        let report = scheduler.run_for(Duration::from_secs(3));

        assert_eq!(report, SimulationReport { fired: 0, now: at(3000) });
    }
}
