//! # Ticker core
//!
//! The board agnostic half of ticker: periodic timers, one-shot alarms and the interrupt
//! handlers which toggle state on every period.
//!
//! ---
//!
//! Every demo in ticker is built from the same three pieces
//!
//! - A **periodic source** ([`source::PeriodicSource`]) which is a hardware counter configured to
//!   raise an interrupt once per [`TimerConfig`] period. An alarm ([`alarm::AlarmSource`]) or a
//!   watchdog ([`watchdog::Watchdog`]) can stand in for it.
//! - An **interrupt handler** ([`vector::Handler`]) which runs to completion on every interrupt.
//!   It always clears the pending flag before returning and then toggles the one piece of state it
//!   owns.
//! - A **foreground controller** ([`foreground`]) which either arms the source and idles forever
//!   or waits for a confirmation, arms a one-shot alarm and enters a low power mode.
//!
//! The hardware implementations of the traits live in `ticker-hal`. The `sim` module (feature
//! `sim`, on by default) provides simulated peripherals so the whole pattern can be exercised on
//! the host. Firmware builds turn default features off.
//!
//! ## Logging
//!
//! Logging goes through `defmt` when the `defmt` feature is enabled. Without it the log macros
//! compile to nothing.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod alarm;
pub mod config;
pub mod console;
pub mod error;
pub mod foreground;
pub mod power;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
pub mod source;
pub mod toggle;
pub mod vector;
pub mod watchdog;

pub use alarm::{AlarmSource, AlarmSpec, Calibration, Compare, OneShot, TimeOfDay};
pub use config::{BoardConfig, ClockSource, TimerConfig};
pub use console::{ButtonConsole, Console, Gate};
pub use error::{Component, Error, Fatal};
pub use foreground::{arm_periodic, GatedSleep, Wake};
pub use power::{ClockControl, LowPower, PowerMode, Ready};
pub use source::{InterruptSource, PeriodicSource};
pub use toggle::{Level, Polarity, ToggleHandler};
pub use vector::{Handler, Vector};
pub use watchdog::{ResetCause, Watchdog, WatchdogConfig, WatchdogMode};
