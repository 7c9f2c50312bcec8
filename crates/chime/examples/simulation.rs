// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! This example demonstrates how fixed-delay and fixed-rate tasks differ when time jumps.

use std::time::{Duration, SystemTime};

use chime::{ClockControl, TimerTask, VirtualScheduler};

fn main() -> Result<(), chime::Error> {
    let scheduler = VirtualScheduler::new(ClockControl::new_at(Duration::from_millis(2000)));

    let rate = TimerTask::with_name("rate", report);
    let delay = TimerTask::with_name("delay", report);

    // Both tasks first run after 100ms and then every 60ms.
    scheduler.schedule_at_fixed_rate(&rate, Duration::from_millis(100), Duration::from_millis(60))?;
    scheduler.schedule_with_fixed_delay(&delay, Duration::from_millis(100), Duration::from_millis(60))?;

    // Jump 120ms ahead. Both tasks are 20ms late when they run.
    let outcome = scheduler.simulate_millis(120);
    println!("fired {} tasks, now at {}ms", outcome.fired, millis(outcome.now));

    // The fixed-rate task stays on its 2100 + n * 60 grid, the fixed-delay task drifts.
    println!("rate next runs at {}ms", rate.next_execution_time().map_or(0, millis));
    println!("delay next runs at {}ms", delay.next_execution_time().map_or(0, millis));

    // The scheduler is waiting for the earliest of the two.
    println!("armed delay: {:?}", scheduler.armed_delay());

    // A long jump lets the fixed-rate task catch up on every execution it owes.
    let outcome = scheduler.simulate_millis(500);
    println!("fired {} tasks, now at {}ms", outcome.fired, millis(outcome.now));

    Ok(())
}

fn report(task: &TimerTask) {
    println!(
        "{} ran for {}ms",
        task.name().unwrap_or("task"),
        task.scheduled_execution_time().map_or(0, millis)
    );
}

fn millis(time: SystemTime) -> u128 {
    time.duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default().as_millis()
}
