//! # SysTick
//!
//! The Cortex-M system timer as a [`PeriodicSource`].
//!
//! SysTick is a 24 bit down counter. It reloads from the reload register when it reaches zero,
//! setting COUNTFLAG and pending the SysTick exception. COUNTFLAG clears itself on every read of
//! CSR, including reads made only to test ENABLE or TICKINT. Every read therefore goes through
//! one helper, which latches the flag in software until the handler clears it.
//!
//! On the STM32L0 the external reference is HCLK / 8.

use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::{SCB, SYST};
use ticker_core::config::{TimerConfig, SYSTICK_RANGE};
use ticker_core::error::Error;
use ticker_core::source::{InterruptSource, PeriodicSource, ReadClearFlag};

// SYST_CSR
const ENABLE: u32 = 1 << 0;
const TICKINT: u32 = 1 << 1;
const COUNTFLAG: u32 = 1 << 16;

pub struct SysTick {
    syst: SYST,
    wrapped: ReadClearFlag,
}

impl SysTick {
    pub fn new(mut syst: SYST) -> Self {
        syst.disable_counter();
        syst.disable_interrupt();

        Self {
            syst,
            wrapped: ReadClearFlag::new(),
        }
    }

    /// Read CSR, keeping COUNTFLAG
    fn csr(&self) -> u32 {
        let csr = self.syst.csr.read();
        self.wrapped.observe(csr & COUNTFLAG != 0);
        csr
    }
}

impl InterruptSource for SysTick {
    fn is_pending(&self) -> bool {
        self.csr();
        self.wrapped.is_set()
    }

    fn clear_pending(&mut self) {
        // A wrap since the last read is still in COUNTFLAG
        self.wrapped.clear();
        SCB::clear_pendst();
    }

    fn interrupt_enabled(&self) -> bool {
        self.csr() & TICKINT != 0
    }

    fn enable_interrupt(&mut self) {
        self.csr();
        self.syst.enable_interrupt();
    }

    fn disable_interrupt(&mut self) {
        self.csr();
        self.syst.disable_interrupt();
    }
}

impl PeriodicSource for SysTick {
    fn configure(&mut self, config: &TimerConfig) -> Result<(), Error> {
        let ticks = config.reload(SYSTICK_RANGE)?;

        self.syst.set_clock_source(if config.clock().is_external() {
            SystClkSource::External
        } else {
            SystClkSource::Core
        });
        self.syst.set_reload(ticks - 1);
        self.syst.clear_current();

        defmt::debug!("systick reload {} at {} Hz", ticks - 1, config.clock().rate().0);
        Ok(())
    }

    fn enable_counter(&mut self) {
        self.csr();
        self.syst.enable_counter();
    }

    fn disable_counter(&mut self) {
        self.csr();
        self.syst.disable_counter();
    }

    fn counter_enabled(&self) -> bool {
        self.csr() & ENABLE != 0
    }
}
