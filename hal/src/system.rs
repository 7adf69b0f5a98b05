use cortex_m::peripheral::SCB;
use embedded_time::rate::Hertz;
use stm32l0::stm32l0x3::{FLASH, PWR, RCC};
use ticker_core::power::ClockControl;

/// The MSI clock frequency (Hz) in range 0
pub const MSI_FREQ: u32 = 65536;

/// The PLL clock frequency (Hz), HSI16 * 4 / 2
pub const PLL_FREQ: u32 = 32_000_000;

// RCC_CR
const HSI16ON: u32 = 1 << 0;
const HSI16RDYF: u32 = 1 << 2;
const PLLON: u32 = 1 << 24;
const PLLRDY: u32 = 1 << 25;

// RCC_CFGR
const SW_MASK: u32 = 0b11;
const SW_HSI16: u32 = 0b01;
const SW_PLL: u32 = 0b11;
const SWS_SHIFT: u32 = 2;
const PLLMUL_4: u32 = 0b0001 << 18;
const PLLDIV_2: u32 = 0b01 << 22;

/// The system clock
#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub enum Clock {
    /// Multispeed internal oscillator, range 0 (~65.536 kHz)
    Msi,
    /// PLL from HSI16 (32 MHz)
    Pll,
}

/// # System management
///
/// The clock and power configuration is one of
///
/// * [`Clock::Msi`]: the system clock (MSI) is set to range 0 (~65.536 kHz) and the voltage
///   regulator to range 3 (1.2v). This is the ultra low power configuration used by the watch.
/// * [`Clock::Pll`]: the system clock runs off the PLL at 32 MHz with the voltage regulator in
///   range 1 (1.8v).
///
/// Stop mode always wakes up on the MSI. The PLL has to be disconnected before entering stop mode
/// and brought back with [`ClockControl::restore()`] after waking.
pub struct System {
    rcc: RCC,
    clock: Clock,
}

impl System {
    pub fn configure(rcc: RCC, pwr: &mut PWR, scb: &mut SCB, clock: Clock) -> Self {
        // Low power modes choose sleep depth themselves
        scb.clear_sleepdeep();

        // Set the MSI clock to 65.536 kHz
        rcc.icscr.write(|w| w.msirange().range0());

        // Enable PWR clock
        rcc.apb1enr.modify(|_, w| w.pwren().enabled());

        // Configure PWR control register
        //
        // * Enable voltage regulator range 3 (1.2V), or range 1 (1.8V) for the PLL
        // * Switch the regulator into low power mode when sleep or deep sleep is entered
        // * Enter stop mode on deepsleep
        // * Enable RTC write access
        pwr.cr.write(|w| {
            let w = match clock {
                Clock::Msi => w.vos().v1_2(),
                Clock::Pll => w.vos().v1_8(),
            };

            w.lpsdsr().low_power_mode().pdds().stop_mode().dbp().enabled()
        });

        // Wait for the regulator to reach the new voltage
        while pwr.csr.read().vosf().bit_is_set() {}

        // Enable SYSCFG clock
        rcc.apb2enr.modify(|_, w| w.syscfgen().enabled());

        // Enable GPIO port clocks
        rcc.iopenr
            .write(|w| w.iopaen().enabled().iopben().enabled().iopcen().enabled());

        // Configure the Control/Status register
        //
        // * Set the RTC to use the LSE
        // * Set LSE to medium-high drive capability
        rcc.csr
            .modify(|_, w| w.rtcsel().lse().lsedrv().medium_high());

        // Turn on the LSE
        rcc.csr.modify(|_, w| w.lseon().on());

        // Wait for the LSE to stabilise
        while rcc.csr.read().lserdy().is_not_ready() {}

        let mut sys = Self { rcc, clock };

        if clock == Clock::Pll {
            // One flash wait state above 16 MHz
            unsafe { (*FLASH::ptr()).acr.modify(|r, w| w.bits(r.bits() | 1)) };
            sys.start_pll();
        }

        defmt::info!("system clock {} at {} Hz", clock, sys.hclk().0);

        sys
    }

    /// The AHB clock frequency
    pub fn hclk(&self) -> Hertz<u32> {
        match self.clock {
            Clock::Msi => Hertz(MSI_FREQ),
            Clock::Pll => Hertz(PLL_FREQ),
        }
    }

    /// Switch the system clock onto the PLL
    fn start_pll(&mut self) {
        // PLL input is HSI16
        self.rcc.cr.modify(|r, w| unsafe { w.bits(r.bits() | HSI16ON) });
        while self.rcc.cr.read().bits() & HSI16RDYF == 0 {}

        // HSI16 (PLLSRC = 0) * 4 / 2
        self.rcc.cfgr.modify(|r, w| unsafe {
            w.bits((r.bits() & !(0b1111 << 18 | 0b11 << 22 | 1 << 16)) | PLLMUL_4 | PLLDIV_2)
        });

        self.rcc.cr.modify(|r, w| unsafe { w.bits(r.bits() | PLLON) });
        while self.rcc.cr.read().bits() & PLLRDY == 0 {}

        self.switch(SW_PLL);
    }

    /// Select the system clock and wait for the switch
    fn switch(&mut self, sw: u32) {
        self.rcc
            .cfgr
            .modify(|r, w| unsafe { w.bits((r.bits() & !SW_MASK) | sw) });

        while (self.rcc.cfgr.read().bits() >> SWS_SHIFT) & SW_MASK != sw {}
    }

    /// Enable the RTC
    pub(crate) fn enable_rtc(&mut self) {
        self.rcc.csr.modify(|_, w| w.rtcen().enabled());
    }
}

impl ClockControl for System {
    fn pll_connected(&self) -> bool {
        let sws = (self.rcc.cfgr.read().bits() >> SWS_SHIFT) & SW_MASK;

        sws == SW_PLL || self.rcc.cr.read().bits() & PLLRDY != 0
    }

    fn disconnect_pll(&mut self) {
        // HSI16 is still on from when the PLL was started
        self.switch(SW_HSI16);

        // The PLL can only be turned off once it no longer drives the system clock. PLLRDY is
        // polled through pll_connected().
        self.rcc.cr.modify(|r, w| unsafe { w.bits(r.bits() & !PLLON) });
    }

    fn restore(&mut self) {
        if self.clock == Clock::Pll {
            self.start_pll();
            defmt::debug!("pll restored");
        }
    }
}
