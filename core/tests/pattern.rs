//! The periodic source, handler and foreground pattern against simulated peripherals

use core::cell::RefCell;

use rstest::rstest;
use ticker_core::alarm::Compare;
use ticker_core::foreground::arm_alarm;
use ticker_core::power::ClockControl;
use ticker_core::sim::{
    step, SimClocks, SimConsole, SimPin, SimRtc, SimSleeper, SimSysTick, SimTick, SimWatchdog,
};
use ticker_core::watchdog::diagnose;
use ticker_core::{
    arm_periodic, AlarmSource, AlarmSpec, ClockSource, Gate, GatedSleep, InterruptSource, Level,
    OneShot, Polarity, PowerMode, ResetCause, TimeOfDay, TimerConfig, ToggleHandler, Vector,
    Watchdog, WatchdogConfig, WatchdogMode,
};
use embedded_time::duration::Microseconds;
use embedded_time::rate::Hertz;

const TICK_1MS: ClockSource = ClockSource::Internal { hz: 1_000 };

fn ten_ms_toggle(first: Level) -> Vector<SimTick, ToggleHandler<SimPin>> {
    let mut tick = SimTick::new(1 << 24);
    arm_periodic(&mut tick, &TimerConfig::millis(10, TICK_1MS)).unwrap();

    Vector::new(tick, ToggleHandler::new(SimPin::new(), Polarity::ActiveHigh, first))
}

#[test]
fn output_alternates_strictly() {
    let mut vector = ten_ms_toggle(Level::Active);
    let mut previous = None;

    for event in 0..1000 {
        let mut serviced = false;
        for _ in 0..10 {
            serviced |= step(&mut vector);
        }
        assert!(serviced, "no interrupt in period {}", event);

        let high = vector.handler().pin().is_high().unwrap();
        assert_eq!(high, event % 2 == 0, "wrong level on event {}", event);
        assert_ne!(Some(high), previous);
        previous = Some(high);
    }
}

#[test]
fn pending_flag_is_clear_after_every_handler() {
    let mut vector = ten_ms_toggle(Level::Active);

    for _ in 0..1000 * 10 {
        step(&mut vector);
        assert!(!vector.source().is_pending());
    }

    assert_eq!(vector.invocations(), 1000);
}

#[test]
fn handler_runs_on_the_tenth_tick() {
    let mut vector = ten_ms_toggle(Level::Inactive);

    for tick in 1..=9 {
        assert!(!step(&mut vector), "interrupt on tick {}", tick);
    }
    assert!(step(&mut vector));
    assert_eq!(vector.invocations(), 1);

    for tick in 11..=19 {
        assert!(!step(&mut vector), "interrupt on tick {}", tick);
    }
    assert!(step(&mut vector));
    assert_eq!(vector.invocations(), 2);

    // Inactive first
    assert_eq!(vector.handler().pin().is_high(), Some(true));
}

#[test]
fn systick_handler_runs_once_per_period() {
    let mut tick = SimSysTick::new();
    arm_periodic(&mut tick, &TimerConfig::millis(10, TICK_1MS)).unwrap();

    let handler = ToggleHandler::new(SimPin::new(), Polarity::ActiveHigh, Level::Active);
    let mut vector = Vector::new(tick, handler);

    // The first tick loads the counter
    assert!(!step(&mut vector));

    for period in 0..100 {
        let serviced = (0..10).filter(|_| step(&mut vector)).count();
        assert_eq!(serviced, 1, "period {}", period);
    }

    assert_eq!(vector.invocations(), 100);
    assert_eq!(vector.handler().pin().writes(), 100);
}

#[test]
fn masked_source_never_enters_the_handler() {
    let mut vector = ten_ms_toggle(Level::Active);
    vector.source_mut().disable_interrupt();

    for _ in 0..100 {
        assert!(!step(&mut vector));
    }

    assert!(vector.source().is_pending());
    assert_eq!(vector.handler().pin().writes(), 0);
}

#[test]
fn gated_alarm_fires_once() {
    let start = TimeOfDay::new(12, 0, 0).unwrap();
    let vector = RefCell::new(Vector::new(SimRtc::new(start), OneShot::new()));

    let mut console = SimConsole::new(b"1");
    let mut clocks = SimClocks::new(2);
    let mut sleeper = SimSleeper::new(&vector, 60);

    let wake = GatedSleep::new(Gate::new(b'1'), PowerMode::DeepSleep)
        .run(
            &mut console,
            || {
                let mut vector = vector.borrow_mut();
                let now = vector.source().now();
                arm_alarm(vector.source_mut(), &AlarmSpec::after(now, 5, Compare::Full));
                Ok(())
            },
            &mut clocks,
            &mut sleeper,
        )
        .unwrap();

    assert_eq!(wake.mode, PowerMode::DeepSleep);
    assert_eq!(sleeper.entered(), Some(PowerMode::DeepSleep));
    assert_eq!(sleeper.steps(), 5);
    assert_eq!(clocks.restores(), 1);
    assert!(clocks.pll_connected());
    assert!(console.output().ends_with("woken up\r\n"));

    let mut vector = vector.into_inner();
    assert_eq!(vector.invocations(), 1);
    assert_eq!(vector.handler().fired(), 1);
    assert!(!vector.source().interrupt_enabled());

    // Second match without re-arming
    let target = start.add_seconds(5);
    vector.source_mut().set_time(target.add_seconds(60 * 60 * 24 - 1));
    assert!(!step(&mut vector));
    assert_eq!(vector.source().now(), target);
    assert_eq!(vector.invocations(), 1);
}

#[test]
fn rearmed_alarm_fires_again() {
    let mut vector = Vector::new(SimRtc::new(TimeOfDay::MIDNIGHT), OneShot::new());

    for _ in 0..2 {
        let now = vector.source().now();
        arm_alarm(vector.source_mut(), &AlarmSpec::after(now, 3, Compare::Seconds));

        let fired = (0..3).filter(|_| step(&mut vector)).count();
        assert_eq!(fired, 1);
    }

    assert_eq!(vector.handler().fired(), 2);
}

#[test]
#[should_panic(expected = "no enabled interrupt woke the core")]
fn sleeping_without_arming_never_wakes() {
    let vector = RefCell::new(Vector::new(SimRtc::new(TimeOfDay::MIDNIGHT), OneShot::new()));
    let mut sleeper = SimSleeper::new(&vector, 120);

    let _ = GatedSleep::new(Gate::new(b'1'), PowerMode::PowerDown).run(
        &mut SimConsole::new(b"1"),
        || Ok(()),
        &mut SimClocks::new(1),
        &mut sleeper,
    );
}

#[rstest]
#[case(true, ResetCause::WatchdogTimeout)]
#[case(false, ResetCause::External)]
fn reset_cause_follows_the_timeout_flag(#[case] flag: bool, #[case] cause: ResetCause) {
    let mut wdt = SimWatchdog::new(flag);

    assert_eq!(diagnose(&mut wdt), cause);
    assert!(!wdt.timeout_flag());
    assert_eq!(diagnose(&mut wdt), ResetCause::External);
}

#[test]
fn watchdog_timeout_round_trip() {
    let mut wdt = SimWatchdog::new(false);
    assert_eq!(diagnose(&mut wdt).describe(), "caused by external");

    // 5 s on a 4 MHz IRC would be 5M ticks, scale the clock down to keep the test quick
    let config = WatchdogConfig::lpc(Microseconds(5_000_000), Hertz(4_000), WatchdogMode::Reset);
    wdt.configure(&config).unwrap();
    wdt.start();

    let mut ticks = 0;
    while wdt.resets() == 0 {
        ticks += 1;
        ticker_core::sim::Advance::advance(&mut wdt);
    }
    assert_eq!(ticks, config.counter().unwrap());

    wdt.restart();
    assert_eq!(diagnose(&mut wdt).describe(), "caused by timeout");
}

#[test]
fn watchdog_interrupt_wakes_once() {
    let mut wdt = SimWatchdog::new(false);
    wdt.configure(&WatchdogConfig::lpc(
        Microseconds(1_000_000),
        Hertz(1_020),
        WatchdogMode::Interrupt,
    ))
    .unwrap();
    wdt.enable_interrupt();
    wdt.start();

    let vector = RefCell::new(Vector::new(wdt, OneShot::new()));
    let mut sleeper = SimSleeper::new(&vector, 1_000);

    GatedSleep::new(Gate::new(b'1'), PowerMode::DeepSleep)
        .run(&mut SimConsole::new(b"1"), || Ok(()), &mut SimClocks::new(0), &mut sleeper)
        .unwrap();

    assert_eq!(sleeper.steps(), 255);
    drop(sleeper);

    let vector = vector.into_inner();
    assert_eq!(vector.handler().fired(), 1);
    assert!(vector.source().timeout_flag());
    assert!(!vector.source().interrupt_enabled());
    assert_eq!(vector.source().resets(), 0);
}
