//! # Independent watchdog (IWDG)
//!
//! The IWDG counts the LSI (~37 kHz) through a prescaler into a 12 bit down counter. Once started
//! it can't be stopped, and reaching zero always resets the device. There is no interrupt mode.
//!
//! The reset cause is kept in RCC_CSR until it is cleared with RMVF.

use stm32l0::stm32l0x3::{IWDG, RCC};
use ticker_core::error::Error;
use ticker_core::source::InterruptSource;
use ticker_core::watchdog::{Watchdog, WatchdogConfig, WatchdogMode};

/// Nominal LSI frequency (Hz)
pub const LSI_FREQ: u32 = 37_000;

// IWDG_KR
const KEY_RELOAD: u32 = 0xAAAA;
const KEY_ACCESS: u32 = 0x5555;
const KEY_START: u32 = 0xCCCC;

// RCC_CSR
const RMVF: u32 = 1 << 24;
const IWDGRSTF: u32 = 1 << 29;

pub struct Iwdg {
    iwdg: IWDG,
    pr: u32,
    rlr: u32,
}

impl Iwdg {
    pub fn new(iwdg: IWDG) -> Self {
        Self {
            iwdg,
            pr: 0b110,
            rlr: 0xFFF,
        }
    }

    fn csr() -> u32 {
        unsafe { (*RCC::ptr()).csr.read().bits() }
    }
}

impl InterruptSource for Iwdg {
    fn is_pending(&self) -> bool {
        false
    }

    fn clear_pending(&mut self) {}

    fn interrupt_enabled(&self) -> bool {
        false
    }

    fn enable_interrupt(&mut self) {}

    fn disable_interrupt(&mut self) {}
}

impl Watchdog for Iwdg {
    fn configure(&mut self, config: &WatchdogConfig) -> Result<(), Error> {
        if config.mode == WatchdogMode::Interrupt {
            return Err(Error::Unsupported);
        }

        let rlr = config.counter()?;

        // PR is log2(prescale) - 2
        let prescale = config.prescale();
        if !prescale.is_power_of_two() || !(4..=256).contains(&prescale) {
            return Err(Error::Unsupported);
        }

        self.pr = prescale.trailing_zeros() - 2;
        self.rlr = rlr;

        defmt::info!("iwdg prescale /{} reload {}", prescale, rlr);
        Ok(())
    }

    fn start(&mut self) {
        self.iwdg.kr.write(|w| unsafe { w.bits(KEY_START) });

        self.iwdg.kr.write(|w| unsafe { w.bits(KEY_ACCESS) });
        self.iwdg.pr.write(|w| unsafe { w.bits(self.pr) });
        self.iwdg.rlr.write(|w| unsafe { w.bits(self.rlr) });

        // Wait for the prescaler and reload to reach the LSI domain
        while self.iwdg.sr.read().bits() != 0 {}

        self.feed();
    }

    fn feed(&mut self) {
        self.iwdg.kr.write(|w| unsafe { w.bits(KEY_RELOAD) });
    }

    fn timeout_flag(&self) -> bool {
        Self::csr() & IWDGRSTF != 0
    }

    fn clear_timeout_flag(&mut self) {
        // Clears every reset flag
        unsafe {
            (*RCC::ptr())
                .csr
                .modify(|r, w| w.bits(r.bits() | RMVF))
        };
    }
}
