//! # Alarms
//!
//! The RTC keeps a running time of day. An [`AlarmSpec`] is compared against it by the hardware
//! and requests a single interrupt when they match. The alarm then stays quiet until it is armed
//! again, see [`OneShot`].
//!
//! Note that time is kept in 24 hour notation.
//!
//! ## Calibration
//!
//! The RTC can be trimmed with a [`Calibration`]. Every `interval` seconds it either counts an
//! extra second ([`Direction::Forward`], for a slow crystal) or holds for a second
//! ([`Direction::Backward`], for a fast crystal).

use core::fmt;

use crate::error::Error;
use crate::source::InterruptSource;
use crate::vector::Handler;

const SECONDS_PER_DAY: u32 = 24 * 60 * 60;

/// Time of day in 24 hour notation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimeOfDay {
    hours: u8,
    minutes: u8,
    seconds: u8,
}

/// Binary coded decimal represenation of the time
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Bcd {
    /// hour tens digit (0-2)
    pub hour_tens: u8,
    /// hour units digit (0-9)
    pub hour_units: u8,

    /// minute tens digit (0-5)
    pub minute_tens: u8,
    /// minute units digit (0-9)
    pub minute_units: u8,

    /// seconds tens digit (0-5)
    pub seconds_tens: u8,
    /// seconds units digit (0-9)
    pub seconds_units: u8,
}

impl Bcd {
    /// Pack the digits into the `HT HU MNT MNU ST SU` nibble layout of RTC time and alarm
    /// registers
    pub const fn packed(&self) -> u32 {
        (self.hour_tens as u32) << 20
            | (self.hour_units as u32) << 16
            | (self.minute_tens as u32) << 12
            | (self.minute_units as u32) << 8
            | (self.seconds_tens as u32) << 4
            | self.seconds_units as u32
    }
}

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay {
        hours: 0,
        minutes: 0,
        seconds: 0,
    };

    pub fn new(hours: u8, minutes: u8, seconds: u8) -> Result<Self, Error> {
        if hours > 23 || minutes > 59 || seconds > 59 {
            return Err(Error::InvalidTime);
        }

        Ok(Self {
            hours,
            minutes,
            seconds,
        })
    }

    pub fn from_seconds_of_day(seconds: u32) -> Self {
        let seconds = seconds % SECONDS_PER_DAY;

        Self {
            hours: (seconds / 3600) as u8,
            minutes: (seconds / 60 % 60) as u8,
            seconds: (seconds % 60) as u8,
        }
    }

    pub fn hours(&self) -> u8 {
        self.hours
    }

    pub fn minutes(&self) -> u8 {
        self.minutes
    }

    pub fn seconds(&self) -> u8 {
        self.seconds
    }

    pub fn seconds_of_day(&self) -> u32 {
        self.hours as u32 * 3600 + self.minutes as u32 * 60 + self.seconds as u32
    }

    /// Advance by `seconds`, wrapping at midnight
    pub fn add_seconds(&self, seconds: u32) -> Self {
        let now = self.seconds_of_day();
        Self::from_seconds_of_day((now + seconds % SECONDS_PER_DAY) % SECONDS_PER_DAY)
    }

    /// Advance by one second
    pub fn tick(&self) -> Self {
        self.add_seconds(1)
    }

    pub fn to_bcd(&self) -> Bcd {
        Bcd {
            hour_tens: self.hours / 10,
            hour_units: self.hours % 10,
            minute_tens: self.minutes / 10,
            minute_units: self.minutes % 10,
            seconds_tens: self.seconds / 10,
            seconds_units: self.seconds % 10,
        }
    }

    pub fn from_bcd(bcd: Bcd) -> Result<Self, Error> {
        let digits = [
            bcd.hour_tens,
            bcd.hour_units,
            bcd.minute_tens,
            bcd.minute_units,
            bcd.seconds_tens,
            bcd.seconds_units,
        ];
        if digits.iter().any(|digit| *digit > 9) {
            return Err(Error::InvalidTime);
        }

        Self::new(
            bcd.hour_tens * 10 + bcd.hour_units,
            bcd.minute_tens * 10 + bcd.minute_units,
            bcd.seconds_tens * 10 + bcd.seconds_units,
        )
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
    }
}

/// Which parts of the time of day an alarm compares
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Compare {
    /// Match once a minute, when the seconds match
    Seconds,
    /// Match once an hour
    MinutesSeconds,
    /// Match once a day
    Full,
}

/// A one-shot alarm
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AlarmSpec {
    pub target: TimeOfDay,
    pub compare: Compare,
}

impl AlarmSpec {
    pub const fn new(target: TimeOfDay, compare: Compare) -> Self {
        Self { target, compare }
    }

    /// An alarm `seconds` after `now`
    pub fn after(now: TimeOfDay, seconds: u32, compare: Compare) -> Self {
        Self::new(now.add_seconds(seconds), compare)
    }

    /// Does the running clock match the alarm
    pub fn matches(&self, now: &TimeOfDay) -> bool {
        let target = &self.target;
        let seconds = target.seconds == now.seconds;

        match self.compare {
            Compare::Seconds => seconds,
            Compare::MinutesSeconds => seconds && target.minutes == now.minutes,
            Compare::Full => target == now,
        }
    }
}

/// A real time clock with a match alarm
pub trait AlarmSource: InterruptSource {
    /// The running time of day
    fn now(&self) -> TimeOfDay;

    fn set_time(&mut self, time: TimeOfDay);

    /// Program the alarm registers and enable matching. The interrupt is enabled separately.
    fn arm(&mut self, alarm: &AlarmSpec);

    /// Stop matching
    fn disarm(&mut self);
}

/// Handler for a one-shot alarm or timeout.
///
/// The first interrupt clears the pending flag and then disables the source's interrupt. The
/// source has to be re-armed for it to fire again.
#[derive(Debug, Default)]
pub struct OneShot {
    fired: u32,
}

impl OneShot {
    pub const fn new() -> Self {
        Self { fired: 0 }
    }

    /// Number of times the alarm has fired
    pub fn fired(&self) -> u32 {
        self.fired
    }
}

impl<S: InterruptSource> Handler<S> for OneShot {
    fn handle(&mut self, source: &mut S) {
        source.clear_pending();
        source.disable_interrupt();

        self.fired += 1;
        debug!("one-shot fired");
    }
}

/// Calibration direction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Count an extra second every interval
    Forward,
    /// Hold for a second every interval
    Backward,
}

/// Smooth calibration over a window of 2^20 RTC clock cycles
///
/// `masked` cycles are dropped from the window, and 512 are added when `insert` is set, so the
/// correction is `(512 * insert - masked) / 2^20`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Smooth {
    pub insert: bool,
    pub masked: u32,
}

impl Smooth {
    const WINDOW: i64 = 1 << 20;
    const INSERTED: i64 = 512;
}

/// RTC calibration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Calibration {
    interval: u32,
    direction: Direction,
}

impl Calibration {
    /// Longest interval the 17 bit calibration counter can hold
    pub const MAX_INTERVAL: u32 = 0x1_FFFF;

    pub fn new(interval: u32, direction: Direction) -> Result<Self, Error> {
        if interval == 0 || interval > Self::MAX_INTERVAL {
            return Err(Error::InvalidCalibration);
        }

        Ok(Self {
            interval,
            direction,
        })
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Correction in parts per million, positive when the clock is sped up
    pub fn ppm(&self) -> i32 {
        let ppm = (1_000_000 / self.interval) as i32;

        match self.direction {
            Direction::Forward => ppm,
            Direction::Backward => -ppm,
        }
    }

    /// The nearest smooth calibration.
    ///
    /// Only about -488 to +488 ppm can be expressed, anything else is [`Error::Unsupported`].
    pub fn smooth(&self) -> Result<Smooth, Error> {
        let pulses = self.ppm() as i64 * Smooth::WINDOW / 1_000_000;

        if pulses > 0 && pulses <= Smooth::INSERTED {
            Ok(Smooth {
                insert: true,
                masked: (Smooth::INSERTED - pulses) as u32,
            })
        } else if pulses <= 0 && -pulses < Smooth::INSERTED {
            Ok(Smooth {
                insert: false,
                masked: (-pulses) as u32,
            })
        } else {
            Err(Error::Unsupported)
        }
    }

    /// Seconds the clock advances on the `counted`th second of the oscillator
    pub fn step(&self, counted: u32) -> u32 {
        if counted == 0 || counted % self.interval != 0 {
            return 1;
        }

        match self.direction {
            Direction::Forward => 2,
            Direction::Backward => 0,
        }
    }
}
