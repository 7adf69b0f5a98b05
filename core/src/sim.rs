//! # Simulated peripherals
//!
//! Host side stand-ins for the hardware so the periodic source, handler and foreground pattern can
//! be tested without silicon. Each simulated source latches its pending flag the way the hardware
//! does and only moves when it is [advanced](Advance).
//!
//! Interrupt delivery is synchronous: advance the source, then [`Vector::service()`] it (see
//! [`step()`]). The handler runs to completion before the next event.

use core::cell::{Cell, RefCell};
use core::convert::Infallible;

use crate::alarm::{AlarmSource, AlarmSpec, Calibration, TimeOfDay};
use crate::config::{TimerConfig, SYSTICK_RANGE};
use crate::console::Console;
use crate::error::{fatal, Component, Error};
use crate::power::{ClockControl, LowPower, PowerMode, Ready};
use crate::source::{InterruptSource, PeriodicSource, ReadClearFlag};
use crate::vector::{Handler, Vector};
use crate::watchdog::{Watchdog, WatchdogConfig, WatchdogMode};
use embedded_hal::digital::v2::{InputPin, OutputPin};

/// A simulated peripheral which moves forward one unit of time at a time
pub trait Advance {
    fn advance(&mut self);
}

/// Advance the source by one unit and deliver its interrupt, if any
pub fn step<S, H>(vector: &mut Vector<S, H>) -> bool
where
    S: InterruptSource + Advance,
    H: Handler<S>,
{
    vector.source_mut().advance();
    vector.service()
}

/// A down counter which counts one input clock tick per [`Advance::advance()`]
#[derive(Debug)]
pub struct SimTick {
    range: u32,
    reload: u32,
    count: u32,
    counter: bool,
    interrupt: bool,
    pending: bool,
}

impl SimTick {
    /// A counter which holds at most `range` ticks per period
    pub fn new(range: u32) -> Self {
        Self {
            range,
            reload: 0,
            count: 0,
            counter: false,
            interrupt: false,
            pending: false,
        }
    }

    /// Ticks per period
    pub fn reload(&self) -> u32 {
        self.reload
    }

    /// Ticks counted in the current period
    pub fn count(&self) -> u32 {
        self.count
    }
}

impl InterruptSource for SimTick {
    fn is_pending(&self) -> bool {
        self.pending
    }

    fn clear_pending(&mut self) {
        self.pending = false;
    }

    fn interrupt_enabled(&self) -> bool {
        self.interrupt
    }

    fn enable_interrupt(&mut self) {
        self.interrupt = true;
    }

    fn disable_interrupt(&mut self) {
        self.interrupt = false;
    }
}

impl PeriodicSource for SimTick {
    fn configure(&mut self, config: &TimerConfig) -> Result<(), Error> {
        self.reload = config.reload(self.range)?;
        self.count = 0;
        Ok(())
    }

    fn enable_counter(&mut self) {
        self.counter = true;
    }

    fn disable_counter(&mut self) {
        self.counter = false;
    }

    fn counter_enabled(&self) -> bool {
        self.counter
    }
}

impl Advance for SimTick {
    fn advance(&mut self) {
        if !self.counter || self.reload == 0 {
            return;
        }

        self.count += 1;
        if self.count == self.reload {
            self.count = 0;
            self.pending = true;
        }
    }
}

// SYST_CSR
const ENABLE: u32 = 1 << 0;
const TICKINT: u32 = 1 << 1;
const COUNTFLAG: u32 = 1 << 16;

/// A SysTick whose control register clears COUNTFLAG on every read, the same as the silicon
///
/// The register is only read through [`csr()`](SimSysTick::csr), which latches COUNTFLAG in a
/// [`ReadClearFlag`].
#[derive(Debug)]
pub struct SimSysTick {
    csr: Cell<u32>,
    reload: u32,
    current: u32,
    wrapped: ReadClearFlag,
}

impl SimSysTick {
    pub fn new() -> Self {
        Self {
            csr: Cell::new(0),
            reload: 0,
            current: 0,
            wrapped: ReadClearFlag::new(),
        }
    }

    /// Read the control register, COUNTFLAG clears itself
    fn read(&self) -> u32 {
        let csr = self.csr.get();
        self.csr.set(csr & !COUNTFLAG);
        csr
    }

    fn csr(&self) -> u32 {
        let csr = self.read();
        self.wrapped.observe(csr & COUNTFLAG != 0);
        csr
    }

    fn modify(&mut self, set: u32, clear: u32) {
        let csr = self.csr();
        self.csr.set((csr | set) & !clear);
    }
}

impl Default for SimSysTick {
    fn default() -> Self {
        Self::new()
    }
}

impl InterruptSource for SimSysTick {
    fn is_pending(&self) -> bool {
        self.csr();
        self.wrapped.is_set()
    }

    fn clear_pending(&mut self) {
        self.wrapped.clear();
    }

    fn interrupt_enabled(&self) -> bool {
        self.csr() & TICKINT != 0
    }

    fn enable_interrupt(&mut self) {
        self.modify(TICKINT, 0);
    }

    fn disable_interrupt(&mut self) {
        self.modify(0, TICKINT);
    }
}

impl PeriodicSource for SimSysTick {
    fn configure(&mut self, config: &TimerConfig) -> Result<(), Error> {
        self.reload = config.reload(SYSTICK_RANGE)? - 1;
        self.current = 0;
        Ok(())
    }

    fn enable_counter(&mut self) {
        self.modify(ENABLE, 0);
    }

    fn disable_counter(&mut self) {
        self.modify(0, ENABLE);
    }

    fn counter_enabled(&self) -> bool {
        self.csr() & ENABLE != 0
    }
}

impl Advance for SimSysTick {
    fn advance(&mut self) {
        if self.csr.get() & ENABLE == 0 {
            return;
        }

        // Counts down to zero, then reloads on the next tick
        if self.current == 0 {
            self.current = self.reload;
        } else {
            self.current -= 1;
            if self.current == 0 {
                self.csr.set(self.csr.get() | COUNTFLAG);
            }
        }
    }
}

/// A real time clock which counts one second per [`Advance::advance()`]
#[derive(Debug)]
pub struct SimRtc {
    now: TimeOfDay,
    alarm: Option<AlarmSpec>,
    calibration: Option<Calibration>,
    counted: u32,
    interrupt: bool,
    pending: bool,
}

impl SimRtc {
    pub fn new(now: TimeOfDay) -> Self {
        Self {
            now,
            alarm: None,
            calibration: None,
            counted: 0,
            interrupt: false,
            pending: false,
        }
    }

    /// Start (or stop) calibrating. The calibration counter restarts.
    pub fn calibrate(&mut self, calibration: Option<Calibration>) {
        self.calibration = calibration;
        self.counted = 0;
    }

    pub fn is_armed(&self) -> bool {
        self.alarm.is_some()
    }

    fn compare(&mut self) {
        if let Some(alarm) = self.alarm {
            if alarm.matches(&self.now) {
                self.pending = true;
            }
        }
    }
}

impl InterruptSource for SimRtc {
    fn is_pending(&self) -> bool {
        self.pending
    }

    fn clear_pending(&mut self) {
        self.pending = false;
    }

    fn interrupt_enabled(&self) -> bool {
        self.interrupt
    }

    fn enable_interrupt(&mut self) {
        self.interrupt = true;
    }

    fn disable_interrupt(&mut self) {
        self.interrupt = false;
    }
}

impl AlarmSource for SimRtc {
    fn now(&self) -> TimeOfDay {
        self.now
    }

    fn set_time(&mut self, time: TimeOfDay) {
        self.now = time;
        self.compare();
    }

    fn arm(&mut self, alarm: &AlarmSpec) {
        self.alarm = Some(*alarm);
    }

    fn disarm(&mut self) {
        self.alarm = None;
    }
}

impl Advance for SimRtc {
    fn advance(&mut self) {
        self.counted = self.counted.wrapping_add(1);
        let seconds = self
            .calibration
            .map_or(1, |calibration| calibration.step(self.counted));

        if seconds > 0 {
            self.now = self.now.add_seconds(seconds);
            self.compare();
        }
    }
}

/// A watchdog which counts one tick per [`Advance::advance()`]
///
/// A timeout in reset mode is recorded in [`resets()`](SimWatchdog::resets) and stops the
/// watchdog; the timeout flag is kept, the same as the hardware's.
#[derive(Debug)]
pub struct SimWatchdog {
    mode: WatchdogMode,
    reload: u32,
    count: u32,
    running: bool,
    timeout_flag: bool,
    interrupt: bool,
    pending: bool,
    resets: u32,
}

impl SimWatchdog {
    /// A watchdog as found after reset, with the timeout flag in the given state
    pub fn new(timeout_flag: bool) -> Self {
        Self {
            mode: WatchdogMode::Reset,
            reload: 0,
            count: 0,
            running: false,
            timeout_flag,
            interrupt: false,
            pending: false,
            resets: 0,
        }
    }

    /// Simulate the device restarting. Only the timeout flag survives.
    pub fn restart(&mut self) {
        *self = Self {
            resets: self.resets,
            ..Self::new(self.timeout_flag)
        };
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Number of resets the watchdog has caused
    pub fn resets(&self) -> u32 {
        self.resets
    }
}

impl InterruptSource for SimWatchdog {
    fn is_pending(&self) -> bool {
        self.pending
    }

    fn clear_pending(&mut self) {
        self.pending = false;
    }

    fn interrupt_enabled(&self) -> bool {
        self.interrupt
    }

    fn enable_interrupt(&mut self) {
        self.interrupt = true;
    }

    fn disable_interrupt(&mut self) {
        self.interrupt = false;
    }
}

impl Watchdog for SimWatchdog {
    fn configure(&mut self, config: &WatchdogConfig) -> Result<(), Error> {
        self.reload = config.counter()?;
        self.mode = config.mode;
        Ok(())
    }

    fn start(&mut self) {
        self.count = self.reload;
        self.running = true;
    }

    fn feed(&mut self) {
        self.count = self.reload;
    }

    fn timeout_flag(&self) -> bool {
        self.timeout_flag
    }

    fn clear_timeout_flag(&mut self) {
        self.timeout_flag = false;
    }
}

impl Advance for SimWatchdog {
    fn advance(&mut self) {
        if !self.running {
            return;
        }

        self.count = self.count.saturating_sub(1);
        if self.count > 0 {
            return;
        }

        self.timeout_flag = true;
        self.running = false;

        match self.mode {
            WatchdogMode::Reset => self.resets += 1,
            WatchdogMode::Interrupt => self.pending = true,
        }
    }
}

/// Error returned by a [`SimPin`] which has been made to fail
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimPinError;

/// An output pin which remembers what it was driven to
#[derive(Debug, Default)]
pub struct SimPin {
    high: Option<bool>,
    writes: u32,
    broken: bool,
}

impl SimPin {
    pub fn new() -> Self {
        Self::default()
    }

    /// A pin whose every write fails
    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Self::default()
        }
    }

    /// The driven level, `None` until first written
    pub fn is_high(&self) -> Option<bool> {
        self.high
    }

    pub fn writes(&self) -> u32 {
        self.writes
    }

    fn set(&mut self, high: bool) -> Result<(), SimPinError> {
        if self.broken {
            return Err(SimPinError);
        }

        self.high = Some(high);
        self.writes += 1;
        Ok(())
    }
}

impl OutputPin for SimPin {
    type Error = SimPinError;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.set(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.set(true)
    }
}

/// A button input
#[derive(Debug)]
pub struct SimButton {
    high: bool,
    flip_after: Option<u32>,
    reads: Cell<u32>,
}

impl SimButton {
    /// A button held at a fixed level
    pub fn new(high: bool) -> Self {
        Self {
            high,
            flip_after: None,
            reads: Cell::new(0),
        }
    }

    /// Change level once `reads` reads have been made
    pub fn press_after(&mut self, reads: u32) {
        self.flip_after = Some(reads);
    }

    pub fn reads(&self) -> u32 {
        self.reads.get()
    }
}

impl InputPin for SimButton {
    type Error = Infallible;

    fn is_high(&self) -> Result<bool, Self::Error> {
        let reads = self.reads.get() + 1;
        self.reads.set(reads);

        match self.flip_after {
            Some(after) if reads > after => Ok(!self.high),
            _ => Ok(self.high),
        }
    }

    fn is_low(&self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

const CONSOLE_CAPACITY: usize = 256;

/// A console with scripted input. Output is kept, up to 256 bytes.
pub struct SimConsole {
    input: &'static [u8],
    position: usize,
    reads: u32,
    output: [u8; CONSOLE_CAPACITY],
    written: usize,
}

impl SimConsole {
    pub fn new(input: &'static [u8]) -> Self {
        Self {
            input,
            position: 0,
            reads: 0,
            output: [0; CONSOLE_CAPACITY],
            written: 0,
        }
    }

    pub fn output(&self) -> &str {
        core::str::from_utf8(&self.output[..self.written]).unwrap_or("")
    }

    /// Number of reads attempted
    pub fn reads(&self) -> u32 {
        self.reads
    }

    /// Input bytes not read yet
    pub fn remaining(&self) -> usize {
        self.input.len() - self.position
    }
}

impl Console for SimConsole {
    fn write_str(&mut self, s: &str) {
        let bytes = s.as_bytes();
        let len = bytes.len().min(CONSOLE_CAPACITY - self.written);

        self.output[self.written..self.written + len].copy_from_slice(&bytes[..len]);
        self.written += len;
    }

    fn read_byte(&mut self) -> nb::Result<u8, Infallible> {
        self.reads += 1;

        match self.input.get(self.position) {
            Some(byte) => {
                self.position += 1;
                Ok(*byte)
            }
            None => Err(nb::Error::WouldBlock),
        }
    }
}

/// A clock tree whose PLL takes a number of polls to report disconnected
#[derive(Debug)]
pub struct SimClocks {
    settle: u32,
    remaining: Cell<u32>,
    connected: Cell<bool>,
    disconnecting: bool,
    polls: Cell<u32>,
    restores: u32,
}

impl SimClocks {
    /// The PLL reports disconnected on the `settle`th poll after it is asked to disconnect
    pub fn new(settle: u32) -> Self {
        Self {
            settle,
            remaining: Cell::new(settle),
            connected: Cell::new(true),
            disconnecting: false,
            polls: Cell::new(0),
            restores: 0,
        }
    }

    /// Number of times the PLL state has been polled
    pub fn polls(&self) -> u32 {
        self.polls.get()
    }

    pub fn restores(&self) -> u32 {
        self.restores
    }
}

impl ClockControl for SimClocks {
    fn pll_connected(&self) -> bool {
        self.polls.set(self.polls.get() + 1);

        if self.disconnecting {
            let remaining = self.remaining.get().saturating_sub(1);
            self.remaining.set(remaining);

            if remaining == 0 {
                self.connected.set(false);
            }
        }

        self.connected.get()
    }

    fn disconnect_pll(&mut self) {
        self.disconnecting = true;
    }

    fn restore(&mut self) {
        self.disconnecting = false;
        self.remaining.set(self.settle);
        self.connected.set(true);
        self.restores += 1;
    }
}

/// Low power entry which advances a vector's source until its interrupt is serviced
///
/// The vector is shared with the foreground through a `RefCell` so the foreground can arm the
/// source before sleeping.
pub struct SimSleeper<'a, S, H> {
    vector: &'a RefCell<Vector<S, H>>,
    limit: u32,
    entered: Option<PowerMode>,
    steps: u32,
}

impl<'a, S, H> SimSleeper<'a, S, H> {
    /// Give up (fatally, as the core would never wake) after `limit` steps
    pub fn new(vector: &'a RefCell<Vector<S, H>>, limit: u32) -> Self {
        Self {
            vector,
            limit,
            entered: None,
            steps: 0,
        }
    }

    /// The mode last entered
    pub fn entered(&self) -> Option<PowerMode> {
        self.entered
    }

    /// Steps spent asleep
    pub fn steps(&self) -> u32 {
        self.steps
    }
}

impl<'a, S, H> LowPower for SimSleeper<'a, S, H>
where
    S: InterruptSource + Advance,
    H: Handler<S>,
{
    fn enter(&mut self, ready: Ready) {
        self.entered = Some(ready.mode());

        for _ in 0..self.limit {
            self.steps += 1;

            let mut vector = self.vector.borrow_mut();
            if step(&mut *vector) {
                return;
            }
        }

        fatal(Component::Power, "no enabled interrupt woke the core");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::{Compare, Direction};
    use crate::config::ClockSource;
    use crate::watchdog::WatchdogConfig;
    use embedded_time::duration::Microseconds;
    use embedded_time::rate::Hertz;

    #[test]
    fn tick_latches_without_interrupt_enabled() {
        let mut tick = SimTick::new(1 << 24);
        tick.configure(&TimerConfig::millis(2, ClockSource::Internal { hz: 1_000 }))
            .unwrap();
        tick.enable_counter();

        tick.advance();
        tick.advance();

        assert!(tick.is_pending());
        assert!(!tick.interrupt_enabled());
    }

    #[test]
    fn stopped_counter_does_not_count() {
        let mut tick = SimTick::new(1 << 24);
        tick.configure(&TimerConfig::millis(2, ClockSource::Internal { hz: 1_000 }))
            .unwrap();

        tick.advance();
        assert_eq!(tick.count(), 0);
    }

    #[test]
    fn systick_flag_survives_status_reads() {
        let mut tick = SimSysTick::new();
        tick.configure(&TimerConfig::millis(2, ClockSource::Internal { hz: 1_000 }))
            .unwrap();
        tick.enable_counter();

        // Load, then count 1, 0
        for _ in 0..3 {
            tick.advance();
        }

        assert!(tick.counter_enabled());
        assert!(!tick.interrupt_enabled());
        assert!(tick.is_pending());
        assert!(tick.is_pending());

        tick.clear_pending();
        assert!(!tick.is_pending());
    }

    #[test]
    fn rtc_calibration_forward_gains_a_second() {
        let mut rtc = SimRtc::new(TimeOfDay::MIDNIGHT);
        rtc.calibrate(Some(Calibration::new(5, Direction::Forward).unwrap()));

        for _ in 0..10 {
            rtc.advance();
        }

        assert_eq!(rtc.now(), TimeOfDay::new(0, 0, 12).unwrap());
    }

    #[test]
    fn rtc_calibration_backward_holds_a_second() {
        let mut rtc = SimRtc::new(TimeOfDay::MIDNIGHT);
        rtc.calibrate(Some(Calibration::new(3, Direction::Backward).unwrap()));

        for _ in 0..9 {
            rtc.advance();
        }

        assert_eq!(rtc.now(), TimeOfDay::new(0, 0, 6).unwrap());
    }

    #[test]
    fn rtc_matches_when_set_onto_the_alarm() {
        let target = TimeOfDay::new(6, 30, 0).unwrap();
        let mut rtc = SimRtc::new(TimeOfDay::MIDNIGHT);
        rtc.arm(&AlarmSpec::new(target, Compare::Full));

        rtc.set_time(target);
        assert!(rtc.is_pending());

        rtc.clear_pending();
        rtc.disarm();
        rtc.set_time(target);
        assert!(!rtc.is_pending());
    }

    #[test]
    fn watchdog_reset_keeps_the_flag() {
        let mut wdt = SimWatchdog::new(false);
        wdt.configure(&WatchdogConfig::lpc(
            Microseconds(1_000),
            Hertz(1_024_000),
            WatchdogMode::Reset,
        ))
        .unwrap();
        wdt.start();

        for _ in 0..256 {
            wdt.advance();
        }

        assert_eq!(wdt.resets(), 1);
        wdt.restart();
        assert!(wdt.timeout_flag());
        assert!(!wdt.is_running());
    }

    #[test]
    fn fed_watchdog_does_not_time_out() {
        let mut wdt = SimWatchdog::new(false);
        wdt.configure(&WatchdogConfig::lpc(
            Microseconds(1_000),
            Hertz(1_024_000),
            WatchdogMode::Reset,
        ))
        .unwrap();
        wdt.start();

        for _ in 0..1000 {
            wdt.advance();
            wdt.feed();
        }

        assert_eq!(wdt.resets(), 0);
        assert!(!wdt.timeout_flag());
    }

    #[test]
    fn console_output_is_truncated() {
        let mut console = SimConsole::new(b"");
        for _ in 0..100 {
            console.write_str("0123");
        }

        assert_eq!(console.output().len(), CONSOLE_CAPACITY);
    }
}
