// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Structured log events emitted by the scheduler.

use std::time::{Duration, SystemTime};

use crate::{SchedulerOptions, TimerTask};

#[derive(Debug, Clone)]
pub(crate) struct Telemetry {
    #[cfg(any(feature = "logs", test))]
    scheduler_name: std::borrow::Cow<'static, str>,
    #[cfg(any(feature = "logs", test))]
    logs_enabled: bool,
}

impl Telemetry {
    #[cfg(any(feature = "logs", test))]
    pub fn new(options: &SchedulerOptions) -> Self {
        Self {
            scheduler_name: options.get_name().to_owned().into(),
            logs_enabled: options.get_enable_logs(),
        }
    }

    #[cfg(not(any(feature = "logs", test)))]
    pub fn new(_options: &SchedulerOptions) -> Self {
        Self {}
    }

    #[cfg_attr(
        not(any(feature = "logs", test)),
        expect(unused_variables, clippy::unused_self, reason = "unused when logs feature not used")
    )]
    pub fn task_scheduled(&self, task: &TimerTask, when: SystemTime) {
        #[cfg(any(feature = "logs", test))]
        if self.logs_enabled {
            tracing::event!(
                name: "chime.task.scheduled",
                tracing::Level::DEBUG,
                scheduler.name = %self.scheduler_name,
                task.id = task.id().get(),
                task.name = task.name().unwrap_or_default(),
                task.period = ?task.period(),
                task.next_execution_time = epoch_millis(when),
            );
        }
    }

    #[cfg_attr(
        not(any(feature = "logs", test)),
        expect(unused_variables, clippy::unused_self, reason = "unused when logs feature not used")
    )]
    pub fn task_fired(&self, task: &TimerTask, scheduled: SystemTime, now: SystemTime) {
        #[cfg(any(feature = "logs", test))]
        if self.logs_enabled {
            tracing::event!(
                name: "chime.task.fired",
                tracing::Level::DEBUG,
                scheduler.name = %self.scheduler_name,
                task.id = task.id().get(),
                task.name = task.name().unwrap_or_default(),
                task.scheduled_execution_time = epoch_millis(scheduled),
                task.lateness = now.duration_since(scheduled).unwrap_or_default().as_secs_f32(),
            );
        }
    }

    #[cfg_attr(
        not(any(feature = "logs", test)),
        expect(unused_variables, clippy::unused_self, reason = "unused when logs feature not used")
    )]
    pub fn task_panicked(&self, task: &TimerTask, message: &str) {
        #[cfg(any(feature = "logs", test))]
        if self.logs_enabled {
            tracing::event!(
                name: "chime.task.panicked",
                tracing::Level::ERROR,
                scheduler.name = %self.scheduler_name,
                task.id = task.id().get(),
                task.name = task.name().unwrap_or_default(),
                panic.message = message,
            );
        }
    }

    #[cfg_attr(
        not(any(feature = "logs", test)),
        expect(unused_variables, clippy::unused_self, reason = "unused when logs feature not used")
    )]
    pub fn timer_armed(&self, delay: Duration, generation: u64) {
        #[cfg(any(feature = "logs", test))]
        if self.logs_enabled {
            tracing::event!(
                name: "chime.timer.armed",
                tracing::Level::DEBUG,
                scheduler.name = %self.scheduler_name,
                timer.delay = delay.as_secs_f32(),
                timer.generation = generation,
            );
        }
    }

    #[cfg_attr(
        not(any(feature = "logs", test)),
        expect(unused_variables, clippy::unused_self, reason = "unused when logs feature not used")
    )]
    pub fn queue_purged(&self, removed: usize) {
        #[cfg(any(feature = "logs", test))]
        if self.logs_enabled {
            tracing::event!(
                name: "chime.queue.purged",
                tracing::Level::DEBUG,
                scheduler.name = %self.scheduler_name,
                queue.removed = removed,
            );
        }
    }

    #[cfg_attr(
        not(any(feature = "logs", test)),
        expect(unused_variables, clippy::unused_self, reason = "unused when logs feature not used")
    )]
    pub fn scheduler_cancelled(&self, cancelled: usize) {
        #[cfg(any(feature = "logs", test))]
        if self.logs_enabled {
            tracing::event!(
                name: "chime.scheduler.cancelled",
                tracing::Level::INFO,
                scheduler.name = %self.scheduler_name,
                scheduler.cancelled_tasks = cancelled,
            );
        }
    }
}

#[cfg(any(feature = "logs", test))]
fn epoch_millis(time: SystemTime) -> u64 {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .map_or(0, |elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}
