//! # Debug console
//!
//! The gated demos wait for a single confirmation byte before they arm their alarm. Boards
//! without a serial console use a push button instead, see [`ButtonConsole`].

use core::convert::Infallible;

use crate::error::Error;
use crate::toggle::{Level, Polarity};
use embedded_hal::digital::v2::InputPin;

/// Byte oriented debug console
pub trait Console {
    /// Write a message, blocking until it has been sent
    fn write_str(&mut self, s: &str);

    /// Read a single byte if one has arrived
    fn read_byte(&mut self) -> nb::Result<u8, Infallible>;
}

/// Confirmation gate
///
/// Waits for `key` on the console. Every other byte is ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Gate {
    pub key: u8,
    /// Give up after this many reads. `None` waits forever.
    pub max_polls: Option<u32>,
}

impl Gate {
    pub const fn new(key: u8) -> Self {
        Self {
            key,
            max_polls: None,
        }
    }

    /// Give up after `polls` reads
    pub const fn bounded(mut self, polls: u32) -> Self {
        self.max_polls = Some(polls);
        self
    }

    /// Prompt and block until the key arrives
    pub fn wait<C: Console>(&self, console: &mut C, prompt: &str) -> Result<(), Error> {
        console.write_str(prompt);

        let mut polls: u32 = 0;
        loop {
            if let Some(max) = self.max_polls {
                if polls >= max {
                    warn!("gate timed out after {} polls", polls);
                    return Err(Error::GateTimeout);
                }
            }
            polls = polls.saturating_add(1);

            match console.read_byte() {
                Ok(byte) if byte == self.key => return Ok(()),
                Ok(byte) => trace!("ignoring {=u8:#x}", byte),
                Err(nb::Error::WouldBlock) => {}
                Err(nb::Error::Other(never)) => match never {},
            }
        }
    }
}

/// A console whose only input is a button
///
/// Output is written to the log. A press reads as `key`, so a [`Gate`] on the same key waits for
/// a press.
pub struct ButtonConsole<P> {
    button: P,
    polarity: Polarity,
    key: u8,
}

impl<P: InputPin> ButtonConsole<P> {
    pub fn new(button: P, polarity: Polarity, key: u8) -> Self {
        Self {
            button,
            polarity,
            key,
        }
    }

    pub fn release(self) -> P {
        self.button
    }
}

impl<P: InputPin> Console for ButtonConsole<P> {
    fn write_str(&mut self, s: &str) {
        info!("{=str}", s);
    }

    fn read_byte(&mut self) -> nb::Result<u8, Infallible> {
        // A pin which can't be read counts as released
        let high = match self.button.is_high() {
            Ok(high) => high,
            Err(_) => return Err(nb::Error::WouldBlock),
        };

        match self.polarity.level(high) {
            Level::Active => Ok(self.key),
            Level::Inactive => Err(nb::Error::WouldBlock),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimButton, SimConsole};

    #[test]
    fn other_bytes_are_ignored() {
        let mut console = SimConsole::new(b"abc\n1");

        assert_eq!(Gate::new(b'1').wait(&mut console, "press 1"), Ok(()));
        assert_eq!(console.output(), "press 1");
        assert_eq!(console.remaining(), 0);
    }

    #[test]
    fn bounded_gate_times_out() {
        let mut console = SimConsole::new(b"22222");

        assert_eq!(
            Gate::new(b'1').bounded(8).wait(&mut console, ""),
            Err(Error::GateTimeout)
        );
        assert_eq!(console.reads(), 8);
    }

    #[test]
    fn bounded_gate_passes_in_time() {
        let mut console = SimConsole::new(b"x1");

        assert_eq!(Gate::new(b'1').bounded(2).wait(&mut console, ""), Ok(()));
    }

    #[test]
    fn active_low_button_reads_as_key() {
        let mut console = ButtonConsole::new(SimButton::new(true), Polarity::ActiveLow, b'1');
        assert_eq!(console.read_byte(), Err(nb::Error::WouldBlock));

        let mut console = ButtonConsole::new(SimButton::new(false), Polarity::ActiveLow, b'1');
        assert_eq!(console.read_byte(), Ok(b'1'));
    }

    #[test]
    fn button_press_opens_the_gate() {
        let mut button = SimButton::new(false);
        button.press_after(3);
        let mut console = ButtonConsole::new(button, Polarity::ActiveHigh, b'1');

        assert_eq!(Gate::new(b'1').bounded(10).wait(&mut console, ""), Ok(()));
        assert_eq!(console.release().reads(), 4);
    }
}
