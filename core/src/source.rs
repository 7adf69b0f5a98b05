//! Interrupt sources
//!
//! Every source has a hardware latched pending flag. The flag is set asynchronously by the
//! hardware and has to be cleared by the handler before it returns, otherwise the request line
//! stays asserted and the handler is entered again straight away.

use core::cell::Cell;

use crate::config::TimerConfig;
use crate::error::Error;

/// A peripheral which can request an interrupt
pub trait InterruptSource {
    /// Has the peripheral latched an interrupt request
    fn is_pending(&self) -> bool;

    /// Acknowledge the interrupt request.
    ///
    /// Implementations should use the peripheral's write-1-to-clear register where there is one.
    /// A read-modify-write can lose a request the hardware latches between the read and the write.
    fn clear_pending(&mut self);

    fn interrupt_enabled(&self) -> bool;

    fn enable_interrupt(&mut self);

    fn disable_interrupt(&mut self);
}

/// A counter which requests an interrupt once per period
///
/// The counter and its interrupt are switched on separately. No interrupts are requested until
/// both are enabled.
pub trait PeriodicSource: InterruptSource {
    /// Program the reload/compare value for the period.
    ///
    /// Returns an error instead of programming the hardware when the period doesn't fit the
    /// counter.
    fn configure(&mut self, config: &TimerConfig) -> Result<(), Error>;

    fn enable_counter(&mut self);

    fn disable_counter(&mut self);

    fn counter_enabled(&self) -> bool;
}

/// Software copy of a status flag which the hardware clears whenever its register is read
///
/// SysTick's COUNTFLAG is one: any read of CSR clears it, even a read made to test an enable bit.
/// Every read of such a register has to [`observe()`](ReadClearFlag::observe) the flag.
#[derive(Debug, Default)]
pub struct ReadClearFlag(Cell<bool>);

impl ReadClearFlag {
    pub const fn new() -> Self {
        Self(Cell::new(false))
    }

    /// Record the flag as read from the hardware. Returns whether it is latched.
    pub fn observe(&self, set: bool) -> bool {
        if set {
            self.0.set(true);
        }

        self.0.get()
    }

    pub fn is_set(&self) -> bool {
        self.0.get()
    }

    pub fn clear(&self) {
        self.0.set(false);
    }
}
