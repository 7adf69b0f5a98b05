//! # Configuration
//!
//! [`TimerConfig`] describes the period of a periodic source and the clock it counts. It is
//! created once at startup and never changed.
//!
//! [`BoardConfig`] describes the pins of a particular board. Rather than picking a board at
//! compile time, the firmware selects one of the [`BOARDS`] when it starts.

use crate::error::Error;
use crate::toggle::Polarity;
use embedded_time::duration::Milliseconds;
use embedded_time::rate::Hertz;

/// Number of ticks a 24 bit down counter (e.g. SysTick) can count in one period
pub const SYSTICK_RANGE: u32 = 1 << 24;

/// The clock a periodic source counts
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockSource {
    /// The core/peripheral clock
    Internal { hz: u32 },
    /// An external reference such as STCLK or a 32.768 kHz crystal
    External { hz: u32 },
}

impl ClockSource {
    pub const fn internal(rate: Hertz<u32>) -> Self {
        ClockSource::Internal { hz: rate.0 }
    }

    pub const fn external(rate: Hertz<u32>) -> Self {
        ClockSource::External { hz: rate.0 }
    }

    /// Frequency of the clock
    pub const fn rate(&self) -> Hertz<u32> {
        match *self {
            ClockSource::Internal { hz } | ClockSource::External { hz } => Hertz(hz),
        }
    }

    pub const fn is_external(&self) -> bool {
        matches!(self, ClockSource::External { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum Period {
    Millis(u32),
    Seconds(u32),
}

/// Periodic source configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerConfig {
    period: Period,
    clock: ClockSource,
    prescale: u32,
}

impl TimerConfig {
    /// A period in milliseconds
    pub const fn new(period: Milliseconds<u32>, clock: ClockSource) -> Self {
        Self {
            period: Period::Millis(period.0),
            clock,
            prescale: 1,
        }
    }

    pub const fn millis(ms: u32, clock: ClockSource) -> Self {
        Self::new(Milliseconds(ms), clock)
    }

    pub const fn seconds(seconds: u32, clock: ClockSource) -> Self {
        Self {
            period: Period::Seconds(seconds),
            clock,
            prescale: 1,
        }
    }

    /// Divide the input clock before it reaches the counter
    pub const fn with_prescale(mut self, prescale: u32) -> Self {
        self.prescale = prescale;
        self
    }

    pub const fn clock(&self) -> ClockSource {
        self.clock
    }

    pub const fn prescale(&self) -> u32 {
        self.prescale
    }

    /// The period in milliseconds
    pub const fn period_ms(&self) -> u64 {
        match self.period {
            Period::Millis(ms) => ms as u64,
            Period::Seconds(s) => s as u64 * 1000,
        }
    }

    /// Number of counter ticks in one period.
    pub fn ticks(&self) -> Result<u64, Error> {
        if self.prescale == 0 {
            return Err(Error::ZeroPrescale);
        }

        let hz = self.clock.rate().0 as u64;
        let counted = match self.period {
            Period::Millis(0) | Period::Seconds(0) => return Err(Error::ZeroPeriod),
            Period::Millis(ms) => ms as u64 * hz / 1000,
            Period::Seconds(s) => s as u64 * hz,
        };

        let ticks = counted / self.prescale as u64;
        if ticks == 0 {
            return Err(Error::PeriodTooShort);
        }

        Ok(ticks)
    }

    /// Validate the period against a counter which can count at most `max` ticks per period.
    ///
    /// Returns the number of ticks per period. Counters which reload from `N - 1` (like SysTick)
    /// need to subtract one before writing the reload register.
    pub fn reload(&self, max: u32) -> Result<u32, Error> {
        let ticks = self.ticks()?;

        if ticks > max as u64 {
            return Err(Error::PeriodOutOfRange { ticks, max });
        }

        Ok(ticks as u32)
    }
}

/// A GPIO port
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Port {
    A,
    B,
    C,
}

/// A pin on a GPIO port
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinId {
    pub port: Port,
    pub pin: u8,
}

impl PinId {
    pub const fn new(port: Port, pin: u8) -> Self {
        Self { port, pin }
    }
}

/// Board specific pin assignments
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BoardConfig {
    pub name: &'static str,
    /// Output toggled by the interrupt handler
    pub led: PinId,
    pub led_polarity: Polarity,
    /// Button used as the confirmation input
    pub button: PinId,
    pub button_polarity: Polarity,
    /// Byte which confirms a gated low power transition
    pub confirm_key: u8,
}

impl BoardConfig {
    /// The watch. There is no LED so the buzzer drive pin (PA0) is toggled instead and the alarm
    /// button (PA2, pulled down) confirms.
    pub const WATCH: BoardConfig = BoardConfig {
        name: "watch",
        led: PinId::new(Port::A, 0),
        led_polarity: Polarity::ActiveHigh,
        button: PinId::new(Port::A, 2),
        button_polarity: Polarity::ActiveHigh,
        confirm_key: b'1',
    };

    /// NUCLEO-L053R8 with the green user LED (PA5) and the blue user button (PC13, pulled up)
    pub const NUCLEO_L053R8: BoardConfig = BoardConfig {
        name: "nucleo-l053r8",
        led: PinId::new(Port::A, 5),
        led_polarity: Polarity::ActiveHigh,
        button: PinId::new(Port::C, 13),
        button_polarity: Polarity::ActiveLow,
        confirm_key: b'1',
    };

    /// Find a board by name
    pub fn by_name(name: &str) -> Option<&'static BoardConfig> {
        BOARDS.iter().find(|board| board.name == name)
    }

    /// Check every pin exists
    pub fn validate(&self) -> Result<(), Error> {
        if self.led.pin > 15 || self.button.pin > 15 {
            return Err(Error::InvalidPin);
        }

        Ok(())
    }
}

/// Every known board
pub static BOARDS: &[BoardConfig] = &[BoardConfig::WATCH, BoardConfig::NUCLEO_L053R8];

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const TICK_1KHZ: ClockSource = ClockSource::Internal { hz: 1_000 };

    #[test]
    fn ten_ms_on_a_1khz_tick_is_ten_ticks() {
        let cfg = TimerConfig::millis(10, TICK_1KHZ);
        assert_eq!(cfg.reload(SYSTICK_RANGE), Ok(10));
    }

    #[rstest]
    #[case(TimerConfig::millis(10, ClockSource::Internal { hz: 100_000_000 }), 1_000_000)]
    #[case(TimerConfig::millis(1, ClockSource::Internal { hz: 100_000_000 }), 100_000)]
    #[case(TimerConfig::seconds(1, ClockSource::External { hz: 32_768 }), 32_768)]
    #[case(TimerConfig::seconds(1, ClockSource::External { hz: 1 }), 1)]
    #[case(TimerConfig::millis(10, ClockSource::External { hz: 1_000_000 }).with_prescale(4), 2_500)]
    fn ticks_per_period(#[case] cfg: TimerConfig, #[case] expected: u64) {
        assert_eq!(cfg.ticks(), Ok(expected));
    }

    #[test]
    fn period_which_overflows_a_24_bit_counter_is_rejected() {
        // 1 s at 100 MHz needs 100M ticks
        let cfg = TimerConfig::seconds(1, ClockSource::Internal { hz: 100_000_000 });

        assert_eq!(
            cfg.reload(SYSTICK_RANGE),
            Err(Error::PeriodOutOfRange {
                ticks: 100_000_000,
                max: SYSTICK_RANGE
            })
        );
    }

    #[test]
    fn largest_period_fits_exactly() {
        let cfg = TimerConfig::millis(1000, ClockSource::Internal { hz: SYSTICK_RANGE });
        assert_eq!(cfg.reload(SYSTICK_RANGE), Ok(SYSTICK_RANGE));
    }

    #[rstest]
    #[case(TimerConfig::millis(0, TICK_1KHZ), Error::ZeroPeriod)]
    #[case(TimerConfig::seconds(0, TICK_1KHZ), Error::ZeroPeriod)]
    #[case(TimerConfig::millis(10, TICK_1KHZ).with_prescale(0), Error::ZeroPrescale)]
    #[case(TimerConfig::millis(1, ClockSource::Internal { hz: 500 }), Error::PeriodTooShort)]
    fn degenerate_periods_are_rejected(#[case] cfg: TimerConfig, #[case] expected: Error) {
        assert_eq!(cfg.ticks(), Err(expected));
    }

    #[test]
    fn seconds_are_reported_in_milliseconds() {
        assert_eq!(TimerConfig::seconds(5, TICK_1KHZ).period_ms(), 5000);
        assert_eq!(
            TimerConfig::new(Milliseconds(10), TICK_1KHZ).period_ms(),
            10
        );
    }

    #[test]
    fn clock_source_rate_round_trips_through_hertz() {
        let clock = ClockSource::external(Hertz(32_768));

        assert!(clock.is_external());
        assert_eq!(clock.rate().0, 32_768);
        assert!(!ClockSource::internal(Hertz(1)).is_external());
    }

    #[test]
    fn boards_are_selected_by_name() {
        assert_eq!(
            BoardConfig::by_name("nucleo-l053r8"),
            Some(&BoardConfig::NUCLEO_L053R8)
        );
        assert_eq!(BoardConfig::by_name("lpc1768"), None);
    }

    #[test]
    fn known_boards_are_valid() {
        for board in BOARDS {
            assert_eq!(board.validate(), Ok(()));
        }
    }

    #[test]
    fn out_of_range_pin_is_rejected() {
        let board = BoardConfig {
            led: PinId::new(Port::B, 16),
            ..BoardConfig::WATCH
        };

        assert_eq!(board.validate(), Err(Error::InvalidPin));
    }
}
