//! # Real time clock (RTC)
//!
//! The real time clock uses the low frequency external oscillator in order to measure wall time.
//!
//! Note that the RTC uses 24 hour notation.
//!
//! ## Alarms
//!
//! Alarm A is used as the one-shot [`AlarmSource`]. Its interrupt reaches the NVIC through EXTI
//! line 17, which is also what wakes the core from stop mode. Both the RTC's ALRAF flag and the
//! EXTI pending bit have to be cleared by the handler.
//!
//! ## Wakeup timer
//!
//! The RTC manages a wakeup timer which, clocked from ck_spre, requests an interrupt every
//! second. [`Rtc::into_wakeup()`] turns it into a [`PeriodicSource`]. Its interrupt reaches the
//! NVIC through EXTI line 20.
//!
//! ## Calibration
//!
//! The STM32L0 RTC uses smooth calibration, masking or inserting clock pulses over a 32 second
//! window. A [`Calibration`] is converted to the nearest pulse count, which only covers roughly
//! -488 to +488 ppm. ck_spre, and so the wakeup timer, follows the calibration.

use crate::system::System;
use stm32l0::stm32l0x3::{EXTI, RTC};
use ticker_core::alarm::{AlarmSource, AlarmSpec, Bcd, Calibration, Compare, TimeOfDay};
use ticker_core::config::TimerConfig;
use ticker_core::error::{fatal, Component, Error};
use ticker_core::source::{InterruptSource, PeriodicSource};

use stm32l0::stm32l0x3::rtc::tr::R as TR_R;

// RTC_ISR
const ALRAWF: u32 = 1 << 0;
const WUTWF: u32 = 1 << 2;
const INIT: u32 = 1 << 7;
const ALRAF: u32 = 1 << 8;
const WUTF: u32 = 1 << 10;
const RECALPF: u32 = 1 << 16;

// RTC_CR
const ALRAE: u32 = 1 << 8;
const WUTE: u32 = 1 << 10;
const ALRAIE: u32 = 1 << 12;
const WUTIE: u32 = 1 << 14;

// RTC_ALRMAR
const MSK2: u32 = 1 << 15;
const MSK3: u32 = 1 << 23;
const MSK4: u32 = 1 << 31;

// RTC_CALR
const CALP: u32 = 1 << 15;

/// EXTI line of the RTC alarms
const EXTI_ALARM: u32 = 1 << 17;
/// EXTI line of the RTC wakeup timer
const EXTI_WAKEUP: u32 = 1 << 20;

/// Most ticks the 16 bit wakeup timer can count in one period
pub const WAKEUP_RANGE: u32 = 1 << 16;

/// Clear an `rc_w0` flag of RTC_ISR, leaving the other flags and INIT as they are
fn clear_isr_flag(rtc: &RTC, flag: u32) {
    let isr = rtc.isr.read().bits();
    rtc.isr
        .write(|w| unsafe { w.bits(!(flag | INIT) | (isr & INIT)) });
}

/// EXTI pending is write 1 to clear
fn clear_exti(line: u32) {
    let exti = unsafe { &*EXTI::ptr() };
    exti.pr.write(|w| unsafe { w.bits(line) });
}

/// # RTC
///
/// The RTC has two states, `run` mode and `initialisation` mode.
///
/// - In initialisation mode the RTC is stopped; the time registers are writeable allowing the time
///   to be set.
/// - In run mode the RTC measures time; the time registers are read only.
///
/// See [`crate::rtc`] for more information.
pub struct Rtc(RTC);

impl Rtc {
    /// Configure the RTC
    pub fn configure(rtc: RTC, sys: &mut System, exti: &mut EXTI) -> Rtc {
        // Unlock RTC registers. They stay unlocked so the alarm can be re-armed.
        rtc.wpr.write(|w| w.key().bits(0xCA));
        rtc.wpr.write(|w| w.key().bits(0x53));

        // Configure the RTC control register
        //
        // * Bypass the shadow registers. This is required due to the low APB1 clock speed
        rtc.cr.write(|w| w.bypshad().bypass_shadow_reg());

        // Configure the rtc alarm event
        //
        // * Enable rising edge trigger
        // * Unmask the alarm interrupt
        exti.rtsr
            .modify(|r, w| unsafe { w.bits(r.bits() | EXTI_ALARM) });
        exti.imr
            .modify(|r, w| unsafe { w.bits(r.bits() | EXTI_ALARM) });

        sys.enable_rtc();

        Self(rtc)
    }

    /// Read the time register.
    ///
    /// Due to the system clock being slow, the register needs to be read twice to ensure a clock
    /// tick doesn't occur during the read.
    fn read_tr(&self) -> TR_R {
        let first = self.0.tr.read();
        let second = self.0.tr.read();

        if first.su().bits() != second.su().bits() {
            // An update occured during the first or second read. A third read will definately give
            // a correct result
            return self.0.tr.read();
        }

        second
    }

    /// Get the current time
    pub fn time(&self) -> Bcd {
        let tr = self.read_tr();

        Bcd {
            hour_tens: tr.ht().bits(),
            hour_units: tr.hu().bits(),

            minute_tens: tr.mnt().bits(),
            minute_units: tr.mnu().bits(),

            seconds_tens: tr.st().bits(),
            seconds_units: tr.su().bits(),
        }
    }

    /// Execute closure in initialisation mode
    pub fn init(&mut self, f: impl FnOnce(Init)) {
        // Enter initialisation mode
        self.0.isr.modify(|_, w| w.init().init_mode());
        // Wait for initialisation mode to be entered
        while self.0.isr.read().initf().is_not_allowed() {}

        f(Init(&mut self.0));

        // Return to run mode
        self.0.isr.modify(|_, w| w.init().free_running_mode());
        // Wait for run mode to be entered
        while self.0.isr.read().initf().is_allowed() {}
    }

    /// Apply a smooth calibration
    pub fn calibrate(&mut self, calibration: &Calibration) -> Result<(), Error> {
        let smooth = calibration.smooth()?;

        // A previous calibration may still be pending
        while self.0.isr.read().bits() & RECALPF != 0 {}

        let calp = if smooth.insert { CALP } else { 0 };
        self.0.calr.write(|w| unsafe { w.bits(calp | smooth.masked) });

        defmt::info!("rtc calibrated by {} ppm", calibration.ppm());
        Ok(())
    }

    /// Use the wakeup timer as a periodic source. The alarm is no longer available.
    pub fn into_wakeup(self, exti: &mut EXTI) -> Wakeup {
        // Configure the rtc wakeup timer event
        //
        // * Enable rising edge trigger
        // * Unmask the wakeup interrupt
        exti.rtsr
            .modify(|r, w| unsafe { w.bits(r.bits() | EXTI_WAKEUP) });
        exti.imr
            .modify(|r, w| unsafe { w.bits(r.bits() | EXTI_WAKEUP) });

        Wakeup(self)
    }
}

/// Initialisation state
pub struct Init<'a>(&'a mut RTC);

impl<'a> Init<'a> {
    /// Set the RTC to the given time
    pub fn set_time(&mut self, time: Bcd) {
        self.0.tr.write(|w| unsafe { w.bits(time.packed()) });
    }
}

impl InterruptSource for Rtc {
    fn is_pending(&self) -> bool {
        self.0.isr.read().bits() & ALRAF != 0
    }

    fn clear_pending(&mut self) {
        clear_isr_flag(&self.0, ALRAF);
        clear_exti(EXTI_ALARM);
    }

    fn interrupt_enabled(&self) -> bool {
        self.0.cr.read().bits() & ALRAIE != 0
    }

    fn enable_interrupt(&mut self) {
        self.0.cr.modify(|r, w| unsafe { w.bits(r.bits() | ALRAIE) });
    }

    fn disable_interrupt(&mut self) {
        self.0.cr.modify(|r, w| unsafe { w.bits(r.bits() & !ALRAIE) });
    }
}

impl AlarmSource for Rtc {
    fn now(&self) -> TimeOfDay {
        match TimeOfDay::from_bcd(self.time()) {
            Ok(now) => now,
            Err(_) => fatal(Component::Alarm, "time register doesn't hold a valid time"),
        }
    }

    fn set_time(&mut self, time: TimeOfDay) {
        self.init(|mut init| init.set_time(time.to_bcd()));
    }

    fn arm(&mut self, alarm: &AlarmSpec) {
        // The alarm can only be written while it is disabled
        self.disarm();
        while self.0.isr.read().bits() & ALRAWF == 0 {}

        // Parts of the time which aren't compared are masked. The date is never compared.
        let mask = match alarm.compare {
            Compare::Seconds => MSK2 | MSK3 | MSK4,
            Compare::MinutesSeconds => MSK3 | MSK4,
            Compare::Full => MSK4,
        };

        let bits = alarm.target.to_bcd().packed() | mask;
        self.0.alrmar().write(|w| unsafe { w.bits(bits) });

        self.0.cr.modify(|r, w| unsafe { w.bits(r.bits() | ALRAE) });
        defmt::debug!("alarm a set for {}", alarm.target);
    }

    fn disarm(&mut self) {
        self.0.cr.modify(|r, w| unsafe { w.bits(r.bits() & !ALRAE) });
    }
}

/// # Wakeup timer
///
/// A [`PeriodicSource`] counting ck_spre (1 Hz, calibrated) for an external [`TimerConfig`]
/// clock, or RTCCLK / 16 (2048 Hz) for an internal one.
pub struct Wakeup(Rtc);

impl InterruptSource for Wakeup {
    fn is_pending(&self) -> bool {
        self.0 .0.isr.read().bits() & WUTF != 0
    }

    fn clear_pending(&mut self) {
        clear_isr_flag(&self.0 .0, WUTF);
        clear_exti(EXTI_WAKEUP);
    }

    fn interrupt_enabled(&self) -> bool {
        self.0 .0.cr.read().bits() & WUTIE != 0
    }

    fn enable_interrupt(&mut self) {
        self.0 .0.cr.modify(|r, w| unsafe { w.bits(r.bits() | WUTIE) });
    }

    fn disable_interrupt(&mut self) {
        self.0 .0.cr.modify(|r, w| unsafe { w.bits(r.bits() & !WUTIE) });
    }
}

impl PeriodicSource for Wakeup {
    fn configure(&mut self, config: &TimerConfig) -> Result<(), Error> {
        let ticks = config.reload(WAKEUP_RANGE)?;

        // The timer can only be written while it is disabled
        self.disable_counter();

        let rtc = &self.0 .0;
        while rtc.isr.read().bits() & WUTWF == 0 {}

        if config.clock().is_external() {
            // Set the wakeup clock to ck_spre (1 Hz)
            rtc.cr.modify(|_, w| w.wucksel().clock_spare());
        } else {
            rtc.cr.modify(|_, w| w.wucksel().div16());
        }

        rtc.wutr.write(|w| unsafe { w.bits(ticks - 1) });

        defmt::debug!("wakeup timer reload {}", ticks - 1);
        Ok(())
    }

    fn enable_counter(&mut self) {
        self.0 .0.cr.modify(|r, w| unsafe { w.bits(r.bits() | WUTE) });
    }

    fn disable_counter(&mut self) {
        self.0 .0.cr.modify(|r, w| unsafe { w.bits(r.bits() & !WUTE) });
    }

    fn counter_enabled(&self) -> bool {
        self.0 .0.cr.read().bits() & WUTE != 0
    }
}
