//! # Watchdog
//!
//! In reset mode a watchdog timeout resets the whole device. The timeout flag survives the reset,
//! so the first thing the restarted firmware does is [`diagnose()`] why it was reset.
//!
//! In interrupt mode the timeout requests an interrupt instead, which is used to wake the core
//! from a low power mode. The handler is a [`OneShot`](crate::alarm::OneShot).

use crate::error::Error;
use crate::source::InterruptSource;
use embedded_time::duration::Microseconds;
use embedded_time::rate::Hertz;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WatchdogMode {
    /// Reset the device on timeout
    Reset,
    /// Request an interrupt on timeout
    Interrupt,
}

/// Prescalers of the STM32 independent watchdog
const IWDG_PRESCALERS: [u32; 7] = [4, 8, 16, 32, 64, 128, 256];

/// Watchdog configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WatchdogConfig {
    timeout_us: u32,
    clock_hz: u32,
    prescale: u32,
    min_count: u32,
    max_count: u32,
    pub mode: WatchdogMode,
}

impl WatchdogConfig {
    /// LPC style watchdog: fixed /4 prescaler and a 32 bit counter which can't be loaded below
    /// 0xFF
    pub const fn lpc(timeout: Microseconds<u32>, clock: Hertz<u32>, mode: WatchdogMode) -> Self {
        Self {
            timeout_us: timeout.0,
            clock_hz: clock.0,
            prescale: 4,
            min_count: 0xFF,
            max_count: u32::MAX,
            mode,
        }
    }

    /// STM32 independent watchdog: 12 bit reload, reset only
    pub const fn iwdg(timeout: Microseconds<u32>, clock: Hertz<u32>, prescale: u32) -> Self {
        Self {
            timeout_us: timeout.0,
            clock_hz: clock.0,
            prescale,
            min_count: 1,
            max_count: 0xFFF,
            mode: WatchdogMode::Reset,
        }
    }

    /// STM32 independent watchdog with the finest prescaler which fits the timeout
    pub fn iwdg_fit(timeout: Microseconds<u32>, clock: Hertz<u32>) -> Result<Self, Error> {
        let mut last = Err(Error::Unsupported);

        for prescale in IWDG_PRESCALERS {
            let config = Self::iwdg(timeout, clock, prescale);
            match config.counter() {
                Ok(_) => return Ok(config),
                Err(err) => last = Err(err),
            }
        }

        last
    }

    pub const fn timeout(&self) -> Microseconds<u32> {
        Microseconds(self.timeout_us)
    }

    pub const fn prescale(&self) -> u32 {
        self.prescale
    }

    /// The value to load into the watchdog counter
    pub fn counter(&self) -> Result<u32, Error> {
        if self.prescale == 0 {
            return Err(Error::ZeroPrescale);
        }

        let count =
            self.timeout_us as u64 * self.clock_hz as u64 / (self.prescale as u64 * 1_000_000);

        if count < self.min_count as u64 || count > self.max_count as u64 {
            return Err(Error::TimeoutOutOfRange {
                count,
                min: self.min_count,
                max: self.max_count,
            });
        }

        Ok(count as u32)
    }
}

/// A watchdog timer
pub trait Watchdog: InterruptSource {
    /// Load the timeout. Returns an error if the watchdog can't do it.
    fn configure(&mut self, config: &WatchdogConfig) -> Result<(), Error>;

    /// Start counting. Most watchdogs can't be stopped again.
    fn start(&mut self);

    /// Reload the counter
    fn feed(&mut self);

    /// Has a timeout occurred. The flag survives a watchdog reset.
    fn timeout_flag(&self) -> bool;

    fn clear_timeout_flag(&mut self);
}

/// Why the device last came out of reset
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResetCause {
    WatchdogTimeout,
    External,
}

impl ResetCause {
    pub const fn describe(&self) -> &'static str {
        match self {
            ResetCause::WatchdogTimeout => "caused by timeout",
            ResetCause::External => "caused by external",
        }
    }
}

/// Work out why the device was reset and clear the latched timeout flag
pub fn diagnose<W: Watchdog>(watchdog: &mut W) -> ResetCause {
    let cause = if watchdog.timeout_flag() {
        watchdog.clear_timeout_flag();
        ResetCause::WatchdogTimeout
    } else {
        ResetCause::External
    };

    info!("last reset {=str}", cause.describe());
    cause
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn five_seconds_on_the_lpc_irc() {
        // 4 MHz IRC, /4
        let config = WatchdogConfig::lpc(Microseconds(5_000_000), Hertz(4_000_000), WatchdogMode::Reset);
        assert_eq!(config.counter(), Ok(5_000_000));
    }

    #[test]
    fn lpc_counter_has_a_floor() {
        let config = WatchdogConfig::lpc(Microseconds(100), Hertz(4_000_000), WatchdogMode::Interrupt);

        assert_eq!(
            config.counter(),
            Err(Error::TimeoutOutOfRange {
                count: 100,
                min: 0xFF,
                max: u32::MAX
            })
        );
    }

    #[rstest]
    #[case(1_000_000, 16)]
    #[case(5_000_000, 64)]
    #[case(26_000_000, 256)]
    fn iwdg_picks_the_finest_prescaler(#[case] timeout_us: u32, #[case] prescale: u32) {
        let config = WatchdogConfig::iwdg_fit(Microseconds(timeout_us), Hertz(37_000)).unwrap();

        assert_eq!(config.prescale(), prescale);
        assert_eq!(config.mode, WatchdogMode::Reset);
        assert!(config.counter().unwrap() <= 0xFFF);
    }

    #[test]
    fn iwdg_timeout_too_long_is_rejected() {
        assert!(matches!(
            WatchdogConfig::iwdg_fit(Microseconds(60_000_000), Hertz(37_000)),
            Err(Error::TimeoutOutOfRange { .. })
        ));
    }

    #[test]
    fn zero_prescale_is_rejected() {
        let config = WatchdogConfig::iwdg(Microseconds(1_000), Hertz(37_000), 0);
        assert_eq!(config.counter(), Err(Error::ZeroPrescale));
    }

    #[rstest]
    #[case(ResetCause::WatchdogTimeout, "caused by timeout")]
    #[case(ResetCause::External, "caused by external")]
    fn causes_are_described(#[case] cause: ResetCause, #[case] text: &str) {
        assert_eq!(cause.describe(), text);
    }
}
