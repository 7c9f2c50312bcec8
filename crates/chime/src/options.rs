// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;

pub(crate) const DEFAULT_SCHEDULER_NAME: &str = "default";

/// Configuration of a [`Scheduler`][crate::Scheduler].
///
/// The [`name`][Self::name] is attached to every log event the scheduler emits, so the
/// events of several schedulers in one process can be told apart.
///
/// With the `serde` feature enabled, the options can be loaded from any serde format.
/// Missing fields take their default values.
///
/// # Examples
///
/// ```
/// use chime::{ClockControl, SchedulerOptions, VirtualScheduler};
///
/// let options = SchedulerOptions::default()
///     .name("heartbeats")
///     .catch_panics(false);
///
/// let scheduler = VirtualScheduler::with_options(ClockControl::new(), options);
///
/// assert_eq!(scheduler.options().get_name(), "heartbeats");
/// assert!(!scheduler.options().get_catch_panics());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(any(feature = "serde", test), derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(any(feature = "serde", test), serde(default))]
pub struct SchedulerOptions {
    name: Cow<'static, str>,
    enable_logs: bool,
    catch_panics: bool,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            name: Cow::Borrowed(DEFAULT_SCHEDULER_NAME),
            enable_logs: true,
            catch_panics: true,
        }
    }
}

impl SchedulerOptions {
    /// Sets the name reported in log events. Prefer `snake_case`, e.g. `heartbeat`.
    #[must_use]
    pub fn name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Gets the configured name (`default` if not set).
    #[must_use]
    pub fn get_name(&self) -> &str {
        &self.name
    }

    /// Enables or disables log events for the scheduler.
    ///
    /// Events are only emitted when the `logs` feature is enabled; this switch can turn
    /// them off for an individual scheduler.
    #[must_use]
    pub const fn enable_logs(mut self, enable: bool) -> Self {
        self.enable_logs = enable;
        self
    }

    /// Returns `true` if log events are enabled (the default).
    #[must_use]
    pub const fn get_enable_logs(&self) -> bool {
        self.enable_logs
    }

    /// Controls whether a panicking task body is contained.
    ///
    /// When enabled (the default), the panic is caught, logged and counted, and the
    /// scheduler keeps firing other tasks. When disabled, the panic propagates to whoever
    /// ran the fire loop. In both cases the task's bookkeeping is complete before its body
    /// runs, so the queue stays consistent.
    #[must_use]
    pub const fn catch_panics(mut self, catch: bool) -> Self {
        self.catch_panics = catch;
        self
    }

    /// Returns `true` if panicking task bodies are contained.
    #[must_use]
    pub const fn get_catch_panics(&self) -> bool {
        self.catch_panics
    }
}
