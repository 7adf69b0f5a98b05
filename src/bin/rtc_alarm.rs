//! Stop until an RTC alarm 5 s in the future, once the button has been pressed
//!
//! Every time the core wakes up the alarm is armed again, so each press gives another 5 s of
//! stop mode.

#![no_main]
#![no_std]
#![feature(type_alias_impl_trait)]

#[rtic::app(
    device = ticker_hal::pac,
    dispatchers = []
)]
mod app {
    use rtic::Mutex;
    use ticker_core::alarm::{AlarmSource, AlarmSpec, Compare, OneShot, TimeOfDay};
    use ticker_core::error::{fatal, Component};
    use ticker_core::foreground::arm_alarm;
    use ticker_core::{ButtonConsole, Gate, GatedSleep, PowerMode, Vector};
    use ticker_hal::{Clock, Input, Power, Rtc, System};

    /// Seconds between the confirmation and the alarm
    const ALARM_DELAY: u32 = 5;

    #[shared]
    struct Shared {
        alarm: Vector<Rtc, OneShot>,
    }

    #[local]
    struct Local {
        sys: System,
        power: Power,
        console: ButtonConsole<Input>,
        gate: Gate,
    }

    #[init]
    fn init(cx: init::Context) -> (Shared, Local) {
        defmt::info!("init");

        let mut dp = cx.device;
        let mut cp = cx.core;
        let board = ticker::board();

        let mut sys = System::configure(dp.RCC, &mut dp.PWR, &mut cp.SCB, Clock::Pll);

        let mut rtc = Rtc::configure(dp.RTC, &mut sys, &mut dp.EXTI);
        rtc.set_time(TimeOfDay::MIDNIGHT);

        let button = Input::new(board.button, board.button_polarity);

        (
            Shared {
                alarm: Vector::new(rtc, OneShot::new()),
            },
            Local {
                sys,
                power: Power::new(dp.PWR, cp.SCB),
                console: ButtonConsole::new(button, board.button_polarity, board.confirm_key),
                gate: Gate::new(board.confirm_key),
            },
        )
    }

    #[idle(shared = [alarm], local = [sys, power, console, gate])]
    fn idle(cx: idle::Context) -> ! {
        defmt::info!("idle");

        let mut alarm = cx.shared.alarm;
        let console = cx.local.console;
        let sys = cx.local.sys;
        let power = cx.local.power;
        let sleep = GatedSleep::new(*cx.local.gate, PowerMode::DeepSleep)
            .with_prompt("press the button to stop until the alarm\r\n");

        loop {
            let result = sleep.run(
                &mut *console,
                || {
                    alarm.lock(|alarm| {
                        let now = alarm.source().now();
                        defmt::info!("time is {}", now);
                        arm_alarm(
                            alarm.source_mut(),
                            &AlarmSpec::after(now, ALARM_DELAY, Compare::Full),
                        );
                    });
                    Ok(())
                },
                &mut *sys,
                &mut *power,
            );

            match result {
                Ok(wake) => {
                    let fired = alarm.lock(|alarm| alarm.handler().fired());
                    defmt::info!("woken from {}, alarm fired {} times", wake.mode, fired);
                }
                Err(err) => {
                    defmt::error!("{}", err);
                    fatal(Component::Power, "gated sleep failed");
                }
            }
        }
    }

    #[task(binds = RTC, shared = [alarm])]
    fn rtc(mut cx: rtc::Context) {
        cx.shared.alarm.lock(|alarm| alarm.service());
    }
}
