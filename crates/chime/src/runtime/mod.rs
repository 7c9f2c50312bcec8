// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Infrastructure for integrating the scheduler with an environment's delay primitive.
//!
//! A [`Scheduler`][crate::Scheduler] never sleeps or spawns anything by itself. Whenever
//! the head of its queue is not yet due, it asks a [`DelayDriver`] to wait for the
//! remaining duration and then fire a [`Wakeup`]. Exactly one wait is outstanding at a
//! time: arming a new wait supersedes the previous one.
//!
//! Two drivers are provided:
//!
//! - [`VirtualDelay`] never fires by itself. It records the most recently armed wait so
//!   tests can inspect it, while time is moved explicitly through a
//!   [`ClockControl`][crate::ClockControl].
//! - `TokioDelay` (feature `tokio`) sleeps on the Tokio runtime and fires the wakeup when
//!   the sleep completes.
//!
//! # Custom drivers
//!
//! Other environments can integrate by implementing [`DelayDriver`]:
//!
//! ```
//! use std::time::Duration;
//!
//! use chime::runtime::{DelayDriver, Wakeup};
//!
//! #[derive(Debug)]
//! struct ThreadDelay;
//!
//! impl DelayDriver for ThreadDelay {
//!     fn arm(&self, delay: Duration, wakeup: Wakeup) {
//!         std::thread::spawn(move || {
//!             std::thread::sleep(delay);
//!             wakeup.fire();
//!         });
//!     }
//! }
//! ```
//!
//! A driver does not need to cancel superseded waits: a wakeup that was superseded by a
//! later arm, or whose scheduler was dropped, does nothing when fired.

mod delay_driver;
#[cfg(any(feature = "tokio", test))]
mod tokio_delay;
mod virtual_delay;
mod wakeup;

pub use delay_driver::DelayDriver;
#[cfg(any(feature = "tokio", test))]
#[cfg_attr(docsrs, doc(cfg(feature = "tokio")))]
pub use tokio_delay::TokioDelay;
pub use virtual_delay::VirtualDelay;
pub use wakeup::Wakeup;
