//! # Errors
//!
//! There are two kinds of failure in ticker.
//!
//! - [`Error`] is returned when a configuration can be rejected before it reaches the hardware,
//!   e.g. a period which doesn't fit in the counter.
//! - [`Fatal`] is reported when the hardware has been misconfigured in a way which can't be
//!   recovered from, e.g. a handler which never clears its pending flag. A fatal report is logged
//!   and then the core halts through the panic handler.

use core::fmt;
use core::panic::Location;

/// Recoverable configuration errors
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A timer period of zero was requested
    ZeroPeriod,
    /// A prescale divisor of zero was requested
    ZeroPrescale,
    /// The period is shorter than a single tick of the input clock
    PeriodTooShort,
    /// The period needs more ticks than the counter can hold
    PeriodOutOfRange { ticks: u64, max: u32 },
    /// Hours, minutes or seconds out of range
    InvalidTime,
    /// Calibration interval outside of 1..=131071 seconds
    InvalidCalibration,
    /// Pin number doesn't exist on a 16 pin port
    InvalidPin,
    /// The watchdog timeout doesn't fit in the watchdog counter
    TimeoutOutOfRange { count: u64, min: u32, max: u32 },
    /// The PLL didn't report disconnected in time
    ClockNotSettled,
    /// The confirmation input never arrived
    GateTimeout,
    /// The peripheral can't do what was asked of it
    Unsupported,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ZeroPeriod => f.write_str("period must be non-zero"),
            Error::ZeroPrescale => f.write_str("prescale must be non-zero"),
            Error::PeriodTooShort => f.write_str("period is shorter than one input tick"),
            Error::PeriodOutOfRange { ticks, max } => {
                write!(f, "period needs {} ticks, counter holds at most {}", ticks, max)
            }
            Error::InvalidTime => f.write_str("invalid time of day"),
            Error::InvalidCalibration => f.write_str("calibration interval out of range"),
            Error::InvalidPin => f.write_str("pin number out of range"),
            Error::TimeoutOutOfRange { count, min, max } => write!(
                f,
                "watchdog count {} outside of {}..={}",
                count, min, max
            ),
            Error::ClockNotSettled => f.write_str("PLL did not disconnect"),
            Error::GateTimeout => f.write_str("no confirmation received"),
            Error::Unsupported => f.write_str("unsupported by this peripheral"),
        }
    }
}

/// The part of the system a fatal report came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Component {
    Source,
    Vector,
    Output,
    Alarm,
    Power,
    Watchdog,
    Console,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Component::Source => "source",
            Component::Vector => "vector",
            Component::Output => "output",
            Component::Alarm => "alarm",
            Component::Power => "power",
            Component::Watchdog => "watchdog",
            Component::Console => "console",
        };

        f.write_str(name)
    }
}

/// A fatal error report
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fatal {
    pub component: Component,
    pub condition: &'static str,
    pub file: &'static str,
    pub line: u32,
}

impl fmt::Display for Fatal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({}:{})",
            self.component, self.condition, self.file, self.line
        )
    }
}

/// Report a fatal error and halt.
///
/// The caller's location is recorded in the report. On the firmware the panic handler halts the
/// core, there is no attempt at recovery.
#[cold]
#[track_caller]
pub fn fatal(component: Component, condition: &'static str) -> ! {
    let location = Location::caller();
    let report = Fatal {
        component,
        condition,
        file: location.file(),
        line: location.line(),
    };

    error!(
        "fatal {}: {=str} at {=str}:{}",
        report.component,
        report.condition,
        report.file,
        report.line
    );

    panic!("{}", report)
}

/// Halt with a [`Fatal`] report unless the condition holds.
///
/// ```should_panic
/// use ticker_core::{ensure, Component};
///
/// let reload: u32 = 0x0100_0000;
/// ensure!(reload <= 0x00FF_FFFF, Component::Source);
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $component:expr $(,)?) => {
        if !$cond {
            $crate::error::fatal($component, ::core::stringify!($cond))
        }
    };
    ($cond:expr, $component:expr, $condition:literal $(,)?) => {
        if !$cond {
            $crate::error::fatal($component, $condition)
        }
    };
}
