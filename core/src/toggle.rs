//! # Toggle handler
//!
//! The handler used by the free running demos. Every period it clears the pending flag and then
//! drives its output to the other level.
//!
//! ```text
//!        interrupt                 interrupt
//! Active ---------> Inactive ---------------> Active ...
//! ```
//!
//! There is no other transition and no error state.

use crate::error::{fatal, Component};
use crate::source::InterruptSource;
use crate::vector::Handler;
use embedded_hal::digital::v2::OutputPin;

/// Logical level of an output
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    Active,
    Inactive,
}

impl Level {
    pub const fn toggled(self) -> Self {
        match self {
            Level::Active => Level::Inactive,
            Level::Inactive => Level::Active,
        }
    }
}

/// How a logical level maps onto the electrical level of a pin
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    ActiveHigh,
    ActiveLow,
}

impl Polarity {
    /// Is the pin high when at `level`
    pub const fn is_high(self, level: Level) -> bool {
        matches!(
            (self, level),
            (Polarity::ActiveHigh, Level::Active) | (Polarity::ActiveLow, Level::Inactive)
        )
    }

    /// The logical level of a pin which reads `high`
    pub const fn level(self, high: bool) -> Level {
        match (self, high) {
            (Polarity::ActiveHigh, true) | (Polarity::ActiveLow, false) => Level::Active,
            _ => Level::Inactive,
        }
    }
}

/// Drives an output to alternating levels, one per interrupt
pub struct ToggleHandler<P> {
    pin: P,
    polarity: Polarity,
    /// The level driven on the next interrupt
    next: Level,
}

impl<P: OutputPin> ToggleHandler<P> {
    /// `first` is the level driven by the first interrupt
    pub fn new(pin: P, polarity: Polarity, first: Level) -> Self {
        Self {
            pin,
            polarity,
            next: first,
        }
    }

    /// The level which will be driven on the next interrupt
    pub fn next(&self) -> Level {
        self.next
    }

    pub fn pin(&self) -> &P {
        &self.pin
    }

    pub fn release(self) -> P {
        self.pin
    }

    fn drive(&mut self, level: Level) {
        let result = if self.polarity.is_high(level) {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };

        if result.is_err() {
            fatal(Component::Output, "failed to drive toggle output");
        }
    }
}

impl<S, P> Handler<S> for ToggleHandler<P>
where
    S: InterruptSource,
    P: OutputPin,
{
    fn handle(&mut self, source: &mut S) {
        source.clear_pending();

        let level = self.next;
        self.drive(level);
        self.next = level.toggled();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimPin;
    use rstest::rstest;

    #[rstest]
    #[case(Polarity::ActiveHigh, Level::Active, true)]
    #[case(Polarity::ActiveHigh, Level::Inactive, false)]
    #[case(Polarity::ActiveLow, Level::Active, false)]
    #[case(Polarity::ActiveLow, Level::Inactive, true)]
    fn polarity_maps_levels(#[case] polarity: Polarity, #[case] level: Level, #[case] high: bool) {
        assert_eq!(polarity.is_high(level), high);
        assert_eq!(polarity.level(high), level);
    }

    #[test]
    fn level_toggles_back_and_forth() {
        assert_eq!(Level::Active.toggled(), Level::Inactive);
        assert_eq!(Level::Active.toggled().toggled(), Level::Active);
    }

    struct Flag(bool);

    impl InterruptSource for Flag {
        fn is_pending(&self) -> bool {
            self.0
        }

        fn clear_pending(&mut self) {
            self.0 = false;
        }

        fn interrupt_enabled(&self) -> bool {
            true
        }

        fn enable_interrupt(&mut self) {}

        fn disable_interrupt(&mut self) {}
    }

    #[test]
    fn handler_clears_then_drives() {
        let mut handler = ToggleHandler::new(SimPin::new(), Polarity::ActiveLow, Level::Active);
        let mut flag = Flag(true);

        handler.handle(&mut flag);

        assert!(!flag.0);
        assert_eq!(handler.pin().is_high(), Some(false));
        assert_eq!(handler.next(), Level::Inactive);
    }

    #[test]
    fn initial_level_is_per_handler() {
        let mut handler = ToggleHandler::new(SimPin::new(), Polarity::ActiveHigh, Level::Inactive);
        let mut flag = Flag(true);

        handler.handle(&mut flag);
        assert_eq!(handler.pin().is_high(), Some(false));

        flag.0 = true;
        handler.handle(&mut flag);
        assert_eq!(handler.pin().is_high(), Some(true));
        assert_eq!(handler.release().writes(), 2);
    }

    #[test]
    #[should_panic(expected = "output")]
    fn pin_failure_is_fatal() {
        let mut handler = ToggleHandler::new(SimPin::broken(), Polarity::ActiveHigh, Level::Active);
        handler.handle(&mut Flag(true));
    }
}
