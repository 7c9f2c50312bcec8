// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::{Arc, Weak};

use crate::scheduler::Shared;

/// A request to run a scheduler's fire loop, handed to a [`DelayDriver`][super::DelayDriver].
///
/// The wakeup does not keep the scheduler alive. Each wakeup carries the generation of the
/// arm that created it; once the scheduler has armed a newer wait, been cancelled or been
/// dropped, firing the wakeup has no effect.
#[derive(Debug, Clone)]
pub struct Wakeup {
    scheduler: Weak<Shared>,
    generation: u64,
}

impl Wakeup {
    pub(crate) fn new(scheduler: &Arc<Shared>, generation: u64) -> Self {
        Self {
            scheduler: Arc::downgrade(scheduler),
            generation,
        }
    }

    /// Runs the fire loop of the scheduler that armed this wakeup.
    ///
    /// Returns the number of task bodies that ran.
    pub fn fire(&self) -> usize {
        self.scheduler
            .upgrade()
            .map_or(0, |scheduler| scheduler.wake(self.generation))
    }

    /// Returns `true` if a newer wait has superseded this one or the scheduler is gone.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.scheduler
            .upgrade()
            .is_none_or(|scheduler| scheduler.generation() != self.generation)
    }
}
