// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! This example demonstrates two clients of the scheduler on the Tokio runtime.
//!
//! A heartbeat sender arms a fixed-rate task when it connects and cancels it when it
//! disconnects. A polling client retries failed polls after a back-off delay; retries are
//! one-off waits, so it sleeps instead of scheduling tasks.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chime::{Scheduler, TimerTask};

const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(250);
const MAX_POLL_ATTEMPTS: u32 = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let scheduler = Scheduler::new_tokio();

    // Send heartbeats for a second, then disconnect.
    let mut sender = HeartbeatSender::new(scheduler.clone());
    sender.connect()?;
    tokio::time::sleep(Duration::from_millis(1100)).await;
    sender.disconnect();
    println!("sent {} heartbeats", sender.sent());

    // No more heartbeats are sent after disconnecting.
    let sent = sender.sent();
    tokio::time::sleep(HEARTBEAT_INTERVAL * 2).await;
    assert_eq!(sender.sent(), sent);

    let value = poll_with_backoff().await?;
    println!("polled value: {value}");

    Ok(())
}

struct HeartbeatSender {
    scheduler: Scheduler,
    heartbeat: Option<TimerTask>,
    sent: Arc<AtomicUsize>,
}

impl HeartbeatSender {
    fn new(scheduler: Scheduler) -> Self {
        Self {
            scheduler,
            heartbeat: None,
            sent: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn connect(&mut self) -> chime::Result<()> {
        let sent = Arc::clone(&self.sent);
        let heartbeat = TimerTask::with_name("heartbeat", move |task| {
            let count = sent.fetch_add(1, Ordering::SeqCst) + 1;
            println!("heartbeat #{count}, due at {:?}", task.scheduled_execution_time());
        });

        self.scheduler
            .schedule_at_fixed_rate(&heartbeat, HEARTBEAT_INTERVAL, HEARTBEAT_INTERVAL)?;
        self.heartbeat = Some(heartbeat);

        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.cancel();
        }
    }

    fn sent(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }
}

async fn poll_with_backoff() -> anyhow::Result<u32> {
    let mut backoff = Duration::from_millis(50);

    for attempt in 1..=MAX_POLL_ATTEMPTS {
        match poll(attempt) {
            Ok(value) => return Ok(value),
            Err(error) => {
                println!("{error}, retrying in {}ms", backoff.as_millis());
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
        }
    }

    anyhow::bail!("no response after {MAX_POLL_ATTEMPTS} attempts")
}

/// Simulates a server that becomes available on the third attempt.
fn poll(attempt: u32) -> Result<u32, String> {
    if attempt < 3 {
        Err(format!("poll attempt {attempt} failed"))
    } else {
        Ok(attempt * 10)
    }
}
