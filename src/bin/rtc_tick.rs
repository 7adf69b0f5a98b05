//! Toggle the LED every calibrated second from the RTC wakeup timer
//!
//! The RTC is trimmed by one second every `CALIBRATION_INTERVAL` seconds before the wakeup timer
//! is armed, so the toggle follows the calibrated clock.

#![no_main]
#![no_std]
#![feature(type_alias_impl_trait)]

#[rtic::app(
    device = ticker_hal::pac,
    dispatchers = []
)]
mod app {
    use embedded_time::rate::Hertz;
    use ticker_core::alarm::{Calibration, Direction};
    use ticker_core::config::{ClockSource, TimerConfig};
    use ticker_core::error::{fatal, Component};
    use ticker_core::{arm_periodic, Level, ToggleHandler, Vector};
    use ticker_hal::rtc::Wakeup;
    use ticker_hal::{Clock, Output, Rtc, System};

    /// Seconds between calibration adjustments (~244 ppm)
    const CALIBRATION_INTERVAL: u32 = 4096;

    /// ck_spre
    const SECONDS: ClockSource = ClockSource::external(Hertz(1));

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        tick: Vector<Wakeup, ToggleHandler<Output>>,
    }

    #[init]
    fn init(cx: init::Context) -> (Shared, Local) {
        defmt::info!("init");

        let mut dp = cx.device;
        let mut cp = cx.core;
        let board = ticker::board();

        let mut sys = System::configure(dp.RCC, &mut dp.PWR, &mut cp.SCB, Clock::Msi);
        let mut rtc = Rtc::configure(dp.RTC, &mut sys, &mut dp.EXTI);

        let calibration = match Calibration::new(CALIBRATION_INTERVAL, Direction::Forward) {
            Ok(calibration) => calibration,
            Err(err) => {
                defmt::error!("{}", err);
                fatal(Component::Alarm, "invalid calibration interval");
            }
        };

        if let Err(err) = rtc.calibrate(&calibration) {
            defmt::error!("{}", err);
            fatal(Component::Alarm, "calibration out of range");
        }

        let mut wakeup = rtc.into_wakeup(&mut dp.EXTI);
        if let Err(err) = arm_periodic(&mut wakeup, &TimerConfig::seconds(1, SECONDS)) {
            defmt::error!("{}", err);
            fatal(Component::Source, "period doesn't fit the wakeup timer");
        }

        let led = Output::new(board.led);
        let handler = ToggleHandler::new(led, board.led_polarity, Level::Active);

        (
            Shared {},
            Local {
                tick: Vector::new(wakeup, handler),
            },
        )
    }

    #[idle]
    fn idle(_: idle::Context) -> ! {
        defmt::info!("idle");

        loop {
            cortex_m::asm::wfi();
        }
    }

    #[task(binds = RTC, local = [tick])]
    fn rtc(cx: rtc::Context) {
        cx.local.tick.service();
    }
}
