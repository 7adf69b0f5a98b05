//! # Power modes
//!
//! Entering any mode other than [`PowerMode::Sleep`] stops the clocks, and the PLL has to be
//! disconnected (and seen to be disconnected) before that is safe. [`prepare()`] is the only way
//! to get the [`Ready`] token which [`LowPower::enter()`] requires, so the ordering can't be
//! skipped.

use crate::error::Error;

/// Low power modes, lightest first
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerMode {
    /// Core clock gated, peripherals running
    Sleep,
    /// Clocks stopped, state retained
    DeepSleep,
    /// Clocks stopped, flash powered down
    PowerDown,
    /// Everything off except the RTC and wake logic. Waking is a reset.
    DeepPowerDown,
}

impl PowerMode {
    /// Does the mode stop the clock tree
    pub const fn stops_clocks(self) -> bool {
        !matches!(self, PowerMode::Sleep)
    }
}

/// Control over the system clock tree
pub trait ClockControl {
    /// Is the PLL still feeding the system clock
    fn pll_connected(&self) -> bool;

    /// Request the system clock be switched away from the PLL and the PLL shut down.
    ///
    /// The switch isn't immediate, [`pll_connected()`](ClockControl::pll_connected) has to be
    /// polled until it reports false.
    fn disconnect_pll(&mut self);

    /// Bring the clocks back to their running configuration after waking
    fn restore(&mut self);
}

/// Proof the clocks are safe to stop for `mode`
#[derive(Debug)]
#[must_use]
pub struct Ready {
    mode: PowerMode,
}

impl Ready {
    pub fn mode(&self) -> PowerMode {
        self.mode
    }
}

/// Get the clocks ready for `mode`.
///
/// For modes which stop the clocks the PLL is disconnected and then polled at most `polls` times
/// for the disconnect to take effect.
pub fn prepare<C: ClockControl>(clocks: &mut C, mode: PowerMode, polls: u32) -> Result<Ready, Error> {
    if !mode.stops_clocks() || !clocks.pll_connected() {
        return Ok(Ready { mode });
    }

    clocks.disconnect_pll();

    for _ in 0..polls {
        if !clocks.pll_connected() {
            debug!("pll disconnected");
            return Ok(Ready { mode });
        }
    }

    warn!("pll still connected after {} polls", polls);
    Err(Error::ClockNotSettled)
}

/// Entry into a low power mode
pub trait LowPower {
    /// Halt the core in `ready.mode()` until an enabled interrupt wakes it
    fn enter(&mut self, ready: Ready);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimClocks;

    #[test]
    fn sleep_keeps_the_pll() {
        let mut clocks = SimClocks::new(2);

        let ready = prepare(&mut clocks, PowerMode::Sleep, 0).unwrap();

        assert_eq!(ready.mode(), PowerMode::Sleep);
        assert!(clocks.pll_connected());
    }

    #[test]
    fn deep_sleep_waits_for_the_pll_to_disconnect() {
        let mut clocks = SimClocks::new(3);

        let ready = prepare(&mut clocks, PowerMode::DeepSleep, 10).unwrap();

        assert_eq!(ready.mode(), PowerMode::DeepSleep);
        assert_eq!(clocks.polls(), 4);
        assert!(!clocks.pll_connected());
    }

    #[test]
    fn pll_which_never_settles_is_an_error() {
        let mut clocks = SimClocks::new(u32::MAX);

        assert_eq!(
            prepare(&mut clocks, PowerMode::PowerDown, 100).map(|ready| ready.mode()),
            Err(Error::ClockNotSettled)
        );
    }

    #[test]
    fn already_disconnected_pll_is_ready() {
        let mut clocks = SimClocks::new(0);
        clocks.disconnect_pll();

        assert!(prepare(&mut clocks, PowerMode::DeepPowerDown, 0).is_ok());
    }

    #[test]
    fn only_sleep_keeps_clocks_running() {
        assert!(!PowerMode::Sleep.stops_clocks());
        assert!(PowerMode::DeepSleep.stops_clocks());
        assert!(PowerMode::PowerDown.stops_clocks());
        assert!(PowerMode::DeepPowerDown.stops_clocks());
    }
}
