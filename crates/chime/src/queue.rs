// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeMap;
use std::mem;
use std::time::SystemTime;

use crate::TimerTask;

/// Position of a task in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct QueueKey {
    when: SystemTime,

    /// Insertion sequence; orders tasks that are due at the same instant.
    seq: u64,
}

/// Tasks ordered by the instant they fire next.
///
/// Cancelled tasks are not removed eagerly. They stay in the queue until they reach the
/// head and the fire loop drops them, or until [`purge`][Self::purge] runs.
#[derive(Debug, Default)]
pub(crate) struct TaskQueue {
    /// Ordered map of queued tasks. A re-armed periodic task gets a fresh sequence number,
    /// so tasks re-inserted at equal instants rotate.
    entries: BTreeMap<QueueKey, TimerTask>,
    last_seq: u64,
}

impl TaskQueue {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts a task that fires at `when`, after every task already due at the same instant.
    pub fn push(&mut self, when: SystemTime, task: TimerTask) {
        self.last_seq = self.last_seq.wrapping_add(1);
        self.entries.insert(QueueKey { when, seq: self.last_seq }, task);
    }

    /// Returns the head of the queue without removing it.
    pub fn peek(&self) -> Option<(SystemTime, &TimerTask)> {
        self.entries.first_key_value().map(|(key, task)| (key.when, task))
    }

    pub fn pop(&mut self) -> Option<(SystemTime, TimerTask)> {
        self.entries.pop_first().map(|(key, task)| (key.when, task))
    }

    /// Returns `true` if `task` is at the head of the queue.
    pub fn is_head(&self, task: &TimerTask) -> bool {
        self.peek().is_some_and(|(_, head)| head.id() == task.id())
    }

    /// Returns the instant of the first task that is not cancelled.
    pub fn next_live(&self) -> Option<SystemTime> {
        self.entries
            .iter()
            .find(|(_, task)| !task.is_cancelled())
            .map(|(key, _)| key.when)
    }

    /// Removes every cancelled task and returns how many were removed.
    pub fn purge(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, task| !task.is_cancelled());
        before - self.entries.len()
    }

    /// Removes every task, in firing order.
    pub fn drain(&mut self) -> impl Iterator<Item = TimerTask> {
        mem::take(&mut self.entries).into_values()
    }
}
