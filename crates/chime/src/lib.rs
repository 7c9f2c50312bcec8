// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(
    test,
    allow(
        clippy::arithmetic_side_effects,
        clippy::unchecked_time_subtraction,
        reason = "allow these lints in tests to improve the readability of the tests"
    )
)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Deterministic scheduling of one-shot and periodic tasks over a real or virtual clock.
//!
//! # Quick Start
//!
//! ```
//! use std::time::Duration;
//!
//! use chime::{ClockControl, TimerTask, VirtualScheduler};
//!
//! let scheduler = VirtualScheduler::new(ClockControl::new());
//! let task = TimerTask::new(|task| println!("tick at {:?}", task.scheduled_execution_time()));
//!
//! scheduler.schedule_at_fixed_rate(&task, Duration::from_secs(1), Duration::from_secs(1))?;
//!
//! // Three seconds pass in an instant.
//! assert_eq!(scheduler.simulate(Duration::from_secs(3)).fired, 3);
//! # Ok::<(), chime::Error>(())
//! ```
//!
//! # Overview
//!
//! A [`Scheduler`] holds [`TimerTask`]s in a queue ordered by the instant each one fires
//! next. Tasks are scheduled with a [`Trigger`] for the first execution and a [`Period`]
//! that decides what happens afterwards:
//!
//! - [`Scheduler::schedule`] runs a task once.
//! - [`Scheduler::schedule_with_fixed_delay`] re-runs a task `period` after each actual
//!   execution, so late executions push the schedule back.
//! - [`Scheduler::schedule_at_fixed_rate`] re-runs a task `period` after each scheduled
//!   execution, so the scheduler catches up after a late execution.
//!
//! Cancelling a task with [`TimerTask::cancel`] is constant-time; the scheduler drops the
//! cancelled task when it reaches the head of the queue, or on [`Scheduler::purge`].
//!
//! # Time
//!
//! The scheduler never reads the system time or sleeps by itself. It reads the time from
//! the [`Clock`] it was created with and waits through a
//! [`DelayDriver`][runtime::DelayDriver]:
//!
//! - With the `tokio` feature, `Scheduler::new_tokio` combines the system clock with a
//!   driver that sleeps on the Tokio runtime.
//! - For tests, a [`VirtualScheduler`] combines a clock driven by a [`ClockControl`] with a
//!   driver that never fires by itself. [`VirtualScheduler::simulate`] moves time forward
//!   and fires whatever became due, so timing behavior can be tested exactly and without
//!   waiting.
//!
//! # Testing
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::time::Duration;
//!
//! use chime::{ClockControl, TimerTask, VirtualScheduler};
//!
//! let calls = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&calls);
//!
//! let scheduler = VirtualScheduler::new(ClockControl::new_at(Duration::from_millis(2000)));
//! let task = TimerTask::new(move |_| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! scheduler.schedule(&task, Duration::from_millis(100))?;
//! assert_eq!(scheduler.armed_delay(), Some(Duration::from_millis(100)));
//!
//! scheduler.simulate_millis(99);
//! assert_eq!(calls.load(Ordering::SeqCst), 0);
//!
//! scheduler.simulate_millis(1);
//! assert_eq!(calls.load(Ordering::SeqCst), 1);
//! # Ok::<(), chime::Error>(())
//! ```
//!
//! # Features
//!
//! - `logs` (default): emits structured [`tracing`](https://docs.rs/tracing) events for
//!   scheduling decisions. Events can be turned off per scheduler through
//!   [`SchedulerOptions::enable_logs`].
//! - `serde`: implements `Serialize` and `Deserialize` for [`SchedulerOptions`].
//! - `tokio`: provides `Scheduler::new_tokio` and `runtime::TokioDelay`.

mod clock;
mod clock_control;
mod error;
mod options;
mod period;
mod queue;
mod scheduler;
mod simulation;
mod task;
mod telemetry;
mod trigger;

pub mod runtime;

#[cfg(test)]
mod testing;

pub use clock::Clock;
pub use clock_control::{ClockControl, StartTime};
pub use error::{Error, ErrorKind, Result};
pub use options::SchedulerOptions;
pub use period::Period;
pub use scheduler::Scheduler;
pub use simulation::{SimulationReport, VirtualScheduler};
pub use task::{TaskId, TaskState, TimerTask};
pub use trigger::Trigger;
