// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Debug;
use std::time::Duration;

use super::Wakeup;

/// Abstraction over the environment's "run this after a delay" primitive.
///
/// The scheduler calls [`arm`][Self::arm] while it holds its internal lock, so
/// implementations must not fire the wakeup synchronously from within `arm`.
pub trait DelayDriver: Send + Sync + Debug + 'static {
    /// Waits for `delay` and then calls [`Wakeup::fire`].
    ///
    /// Arming supersedes any wait armed earlier.
    fn arm(&self, delay: Duration, wakeup: Wakeup);

    /// Abandons the outstanding wait, if any.
    ///
    /// Called when the queue becomes empty or the scheduler is cancelled. The default
    /// implementation does nothing, which is correct because a superseded wakeup is
    /// ignored when fired.
    fn disarm(&self) {}
}
