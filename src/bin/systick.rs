//! Toggle the LED every 10 ms from the SysTick interrupt
//!
//! The foreground arms SysTick and then has nothing left to do.

#![no_main]
#![no_std]
#![feature(type_alias_impl_trait)]

#[rtic::app(
    device = ticker_hal::pac,
    dispatchers = []
)]
mod app {
    use embedded_time::rate::Hertz;
    use ticker_core::config::{ClockSource, TimerConfig};
    use ticker_core::error::{fatal, Component};
    use ticker_core::{arm_periodic, Level, ToggleHandler, Vector};
    use ticker_hal::{Clock, Output, SysTick, System};

    /// Toggle period (ms)
    const PERIOD: u32 = 10;

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        tick: Vector<SysTick, ToggleHandler<Output>>,
    }

    #[init]
    fn init(cx: init::Context) -> (Shared, Local) {
        defmt::info!("init");

        let mut dp = cx.device;
        let mut cp = cx.core;
        let board = ticker::board();

        let sys = System::configure(dp.RCC, &mut dp.PWR, &mut cp.SCB, Clock::Pll);

        // SysTick counts the external reference, HCLK / 8
        let stclk = ClockSource::external(Hertz(sys.hclk().0 / 8));

        let mut systick = SysTick::new(cp.SYST);
        if let Err(err) = arm_periodic(&mut systick, &TimerConfig::millis(PERIOD, stclk)) {
            defmt::error!("{}", err);
            fatal(Component::Source, "period doesn't fit systick");
        }

        let led = Output::new(board.led);
        let handler = ToggleHandler::new(led, board.led_polarity, Level::Active);

        (
            Shared {},
            Local {
                tick: Vector::new(systick, handler),
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

    #[task(binds = SysTick, local = [tick])]
    fn systick(cx: systick::Context) {
        cx.local.tick.service();
    }
}
