// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::{DelayDriver, Wakeup};

/// A delay driver backed by the Tokio runtime.
///
/// Every arm spawns one sleeping task on the runtime; arming again or disarming aborts the
/// sleep that is still pending. Task bodies run on the runtime's worker threads, so they
/// should be short and must not block.
#[derive(Debug)]
pub struct TokioDelay {
    handle: Handle,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl TokioDelay {
    /// Creates a driver that spawns onto the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    #[must_use]
    #[expect(clippy::new_without_default, reason = "requires a Tokio runtime context")]
    pub fn new() -> Self {
        Self::with_handle(Handle::current())
    }

    /// Creates a driver that spawns onto the runtime behind `handle`.
    #[must_use]
    pub fn with_handle(handle: Handle) -> Self {
        Self {
            handle,
            pending: Mutex::new(None),
        }
    }

    fn replace(&self, next: Option<JoinHandle<()>>) {
        let previous = std::mem::replace(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner), next);
        if let Some(previous) = previous {
            previous.abort();
        }
    }
}

impl DelayDriver for TokioDelay {
    #[cfg_attr(test, mutants::skip)] // Causes test timeout.
    fn arm(&self, delay: Duration, wakeup: Wakeup) {
        let sleep = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            wakeup.fire();
        });

        self.replace(Some(sleep));
    }

    fn disarm(&self) {
        self.replace(None);
    }
}

impl Drop for TokioDelay {
    fn drop(&mut self) {
        self.replace(None);
    }
}
