//! # GPIO
//!
//! Pins are chosen at run time from a [`BoardConfig`](ticker_core::config::BoardConfig), so
//! rather than one type per pin, a pin is a port and a number. The port clocks are enabled by
//! [`System::configure()`](crate::System::configure).

use core::convert::Infallible;
use embedded_hal::digital::v2::{InputPin, OutputPin};
use stm32l0::stm32l0x3::{GPIOA, GPIOB, GPIOC};
use ticker_core::config::{PinId, Port};
use ticker_core::toggle::Polarity;

/// Run `$body` with `$regs` bound to the register block of `$port`
macro_rules! with_port {
    ( $port:expr, |$regs:ident| $body:expr ) => {
        match $port {
            Port::A => {
                let $regs = unsafe { &*GPIOA::ptr() };
                $body
            }
            Port::B => {
                let $regs = unsafe { &*GPIOB::ptr() };
                $body
            }
            Port::C => {
                let $regs = unsafe { &*GPIOC::ptr() };
                $body
            }
        }
    };
}

// MODER / PUPDR values
const MODE_INPUT: u32 = 0b00;
const MODE_OUTPUT: u32 = 0b01;
const PULL_NONE: u32 = 0b00;
const PULL_UP: u32 = 0b01;
const PULL_DOWN: u32 = 0b10;

/// Set a two bit field of a pin
macro_rules! set_field {
    ( $reg:expr, $pin:expr, $value:expr ) => {
        $reg.modify(|r, w| unsafe {
            w.bits((r.bits() & !(0b11 << ($pin * 2))) | ($value << ($pin * 2)))
        })
    };
}

/// A push-pull output
pub struct Output(PinId);

impl Output {
    pub fn new(id: PinId) -> Self {
        let pin = id.pin as u32;

        with_port!(id.port, |gpio| {
            set_field!(gpio.pupdr, pin, PULL_NONE);
            set_field!(gpio.moder, pin, MODE_OUTPUT);
        });

        Self(id)
    }

    /// Invert the output
    pub fn toggle(&mut self) {
        let pin = self.0.pin as u32;
        let high = with_port!(self.0.port, |gpio| gpio.odr.read().bits() & (1 << pin) != 0);

        let _ = if high { self.set_low() } else { self.set_high() };
    }
}

impl OutputPin for Output {
    type Error = Infallible;

    fn set_high(&mut self) -> Result<(), Infallible> {
        let pin = self.0.pin as u32;
        with_port!(self.0.port, |gpio| gpio.bsrr.write(|w| unsafe { w.bits(1 << pin) }));
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Infallible> {
        let pin = self.0.pin as u32;
        with_port!(self.0.port, |gpio| gpio.bsrr.write(|w| unsafe { w.bits(1 << (pin + 16)) }));
        Ok(())
    }
}

/// An input, pulled towards its inactive level
pub struct Input(PinId);

impl Input {
    pub fn new(id: PinId, polarity: Polarity) -> Self {
        let pin = id.pin as u32;
        let pull = match polarity {
            Polarity::ActiveHigh => PULL_DOWN,
            Polarity::ActiveLow => PULL_UP,
        };

        with_port!(id.port, |gpio| {
            set_field!(gpio.moder, pin, MODE_INPUT);
            set_field!(gpio.pupdr, pin, pull);
        });

        Self(id)
    }
}

impl InputPin for Input {
    type Error = Infallible;

    fn is_high(&self) -> Result<bool, Infallible> {
        let pin = self.0.pin as u32;
        Ok(with_port!(self.0.port, |gpio| gpio.idr.read().bits() & (1 << pin) != 0))
    }

    fn is_low(&self) -> Result<bool, Infallible> {
        self.is_high().map(|high| !high)
    }
}
