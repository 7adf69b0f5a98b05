//! # Foreground control
//!
//! The foreground has nothing to do once its source is armed. There are two shapes
//!
//! - **Free running**: [`arm_periodic()`] and then idle forever. The handler does all the work.
//! - **Gated low power**: [`GatedSleep`] waits for a confirmation, arms a one-shot alarm and
//!   enters a low power mode. The alarm's handler disables the alarm, and the foreground carries
//!   on past the low power call once it has been woken.

use crate::alarm::{AlarmSource, AlarmSpec};
use crate::config::TimerConfig;
use crate::console::{Console, Gate};
use crate::error::Error;
use crate::power::{prepare, ClockControl, LowPower, PowerMode};
use crate::source::PeriodicSource;

/// Polls allowed for the PLL to disconnect before giving up
pub const SETTLE_POLLS: u32 = 10_000;

/// Configure a periodic source and start it.
///
/// A stale request left over from before the source was configured is cleared before the
/// interrupt is enabled.
pub fn arm_periodic<S: PeriodicSource>(source: &mut S, config: &TimerConfig) -> Result<(), Error> {
    source.configure(config)?;
    source.clear_pending();
    source.enable_interrupt();
    source.enable_counter();

    info!("periodic source armed, period {=u64} ms", config.period_ms());
    Ok(())
}

/// Arm a one-shot alarm and enable its interrupt
pub fn arm_alarm<A: AlarmSource>(source: &mut A, alarm: &AlarmSpec) {
    source.clear_pending();
    source.arm(alarm);
    source.enable_interrupt();

    debug!("alarm armed");
}

/// Returned once the core has woken from a gated low power transition
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Wake {
    pub mode: PowerMode,
}

/// Confirm, arm and then enter a low power mode
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GatedSleep {
    pub gate: Gate,
    pub mode: PowerMode,
    pub prompt: &'static str,
    pub settle_polls: u32,
}

impl GatedSleep {
    pub const fn new(gate: Gate, mode: PowerMode) -> Self {
        Self {
            gate,
            mode,
            prompt: "press the confirmation key to enter low power mode\r\n",
            settle_polls: SETTLE_POLLS,
        }
    }

    pub const fn with_prompt(mut self, prompt: &'static str) -> Self {
        self.prompt = prompt;
        self
    }

    /// Run the gated transition.
    ///
    /// `arm` is called once the confirmation arrives. It has to arm whatever will wake the core,
    /// otherwise `power` never returns. Clocks are restored after waking.
    pub fn run<C, A, K, P>(
        &self,
        console: &mut C,
        arm: A,
        clocks: &mut K,
        power: &mut P,
    ) -> Result<Wake, Error>
    where
        C: Console,
        A: FnOnce() -> Result<(), Error>,
        K: ClockControl,
        P: LowPower,
    {
        self.gate.wait(console, self.prompt)?;
        arm()?;

        let ready = prepare(clocks, self.mode, self.settle_polls)?;

        info!("entering {}", self.mode);
        power.enter(ready);

        clocks.restore();
        console.write_str("woken up\r\n");

        Ok(Wake { mode: self.mode })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClockSource;
    use crate::sim::{SimClocks, SimConsole, SimTick};
    use crate::source::{InterruptSource, PeriodicSource};

    struct NeverWakes;

    impl LowPower for NeverWakes {
        fn enter(&mut self, _: crate::power::Ready) {
            panic!("should not sleep");
        }
    }

    #[test]
    fn arming_enables_both_switches() {
        let mut tick = SimTick::new(1 << 24);

        arm_periodic(&mut tick, &TimerConfig::millis(10, ClockSource::Internal { hz: 1_000 }))
            .unwrap();

        assert!(tick.interrupt_enabled());
        assert!(tick.counter_enabled());
        assert_eq!(tick.reload(), 10);
    }

    #[test]
    fn rejected_period_leaves_the_source_off() {
        let mut tick = SimTick::new(1 << 24);
        let cfg = TimerConfig::seconds(1, ClockSource::Internal { hz: 100_000_000 });

        assert!(arm_periodic(&mut tick, &cfg).is_err());
        assert!(!tick.interrupt_enabled());
        assert!(!tick.counter_enabled());
    }

    #[test]
    fn gate_timeout_never_arms() {
        let mut console = SimConsole::new(b"0");
        let mut clocks = SimClocks::new(1);
        let mut armed = false;

        let result = GatedSleep::new(Gate::new(b'1').bounded(4), PowerMode::DeepSleep).run(
            &mut console,
            || {
                armed = true;
                Ok(())
            },
            &mut clocks,
            &mut NeverWakes,
        );

        assert_eq!(result, Err(Error::GateTimeout));
        assert!(!armed);
    }

    #[test]
    fn failed_arm_does_not_sleep() {
        let mut console = SimConsole::new(b"1");
        let mut clocks = SimClocks::new(1);

        let result = GatedSleep::new(Gate::new(b'1'), PowerMode::PowerDown).run(
            &mut console,
            || Err(Error::Unsupported),
            &mut clocks,
            &mut NeverWakes,
        );

        assert_eq!(result, Err(Error::Unsupported));
        assert!(clocks.pll_connected());
    }
}
