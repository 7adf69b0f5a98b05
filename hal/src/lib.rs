//! # Ticker HAL
//!
//! The STM32L0x3 side of the ticker: every peripheral the firmware uses, implementing the traits
//! from `ticker-core`.
//!
//! ---
//!
//! | peripheral | type | trait |
//! |------------|------|-------|
//! | SysTick | [`SysTick`] | `PeriodicSource` |
//! | RTC alarm A | [`Rtc`] | `AlarmSource` |
//! | RTC wakeup timer | [`rtc::Wakeup`] | `PeriodicSource` |
//! | IWDG | [`Iwdg`] | `Watchdog` |
//! | RCC | [`System`] | `ClockControl` |
//! | PWR/SCB | [`Power`] | `LowPower` |
//! | GPIO | [`Output`], [`Input`] | embedded-hal `OutputPin`, `InputPin` |
//!
//! As on the watch, the RTC is clocked by the external 32.768 kHz crystal (LSE) so it keeps
//! running while the system clock is stopped.

#![no_std]

pub mod gpio;
pub mod power;
pub mod rtc;
pub mod system;
pub mod systick;
pub mod watchdog;

pub use gpio::{Input, Output};
pub use power::Power;
pub use rtc::Rtc;
pub use system::{Clock, System};
pub use systick::SysTick;
pub use watchdog::Iwdg;

pub use stm32l0::stm32l0x3 as pac;
