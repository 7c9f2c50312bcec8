// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg(feature = "serde")]

//! Integration tests for loading scheduler options.

use chime::{ClockControl, SchedulerOptions, TimerTask, VirtualScheduler};

#[test]
fn load_from_json() {
    let options: SchedulerOptions = serde_json::from_str(r#"{ "name": "poller", "catch_panics": false }"#).unwrap();

    assert_eq!(options.get_name(), "poller");
    assert!(options.get_enable_logs());
    assert!(!options.get_catch_panics());
}

#[test]
fn empty_document_gives_defaults() {
    let options: SchedulerOptions = serde_json::from_str("{}").unwrap();

    assert_eq!(options, SchedulerOptions::default());
}

#[test]
fn round_trip_preserves_options() {
    let options = SchedulerOptions::default().name("heartbeat").enable_logs(false);

    let json = serde_json::to_string(&options).unwrap();
    let loaded: SchedulerOptions = serde_json::from_str(&json).unwrap();

    assert_eq!(loaded, options);
}

#[test]
fn loaded_options_apply_to_scheduler() {
    let options: SchedulerOptions = serde_json::from_str(r#"{ "name": "loaded" }"#).unwrap();
    let scheduler = VirtualScheduler::with_options(ClockControl::new(), options);

    scheduler.schedule(&TimerTask::new(|_| {}), std::time::Duration::ZERO).unwrap();

    assert_eq!(scheduler.options().get_name(), "loaded");
    assert!(scheduler.is_empty());
}
