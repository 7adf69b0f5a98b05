//! Report why the device was last reset, then let the watchdog reset it
//!
//! After the button is pressed the independent watchdog is started with a 5 s timeout and never
//! fed. The LED keeps blinking until the reset, after which the reset is reported as caused by
//! timeout.

#![no_main]
#![no_std]

use cortex_m_rt::entry;
use embedded_time::duration::Microseconds;
use embedded_time::rate::Hertz;
use ticker_core::error::{fatal, Component};
use ticker_core::watchdog::{diagnose, Watchdog, WatchdogConfig};
use ticker_core::{ButtonConsole, Gate};
use ticker_hal::watchdog::LSI_FREQ;
use ticker_hal::system::MSI_FREQ;
use ticker_hal::{pac, Clock, Input, Iwdg, Output, System};

/// Watchdog timeout
const TIMEOUT: Microseconds<u32> = Microseconds(5_000_000);

#[entry]
fn main() -> ! {
    defmt::info!("init");

    let (mut dp, mut cp) = match (pac::Peripherals::take(), cortex_m::Peripherals::take()) {
        (Some(dp), Some(cp)) => (dp, cp),
        _ => fatal(Component::Watchdog, "peripherals already taken"),
    };

    let board = ticker::board();
    let _sys = System::configure(dp.RCC, &mut dp.PWR, &mut cp.SCB, Clock::Msi);

    let mut iwdg = Iwdg::new(dp.IWDG);
    let cause = diagnose(&mut iwdg);
    defmt::info!("reset {}", cause.describe());

    let button = Input::new(board.button, board.button_polarity);
    let mut console = ButtonConsole::new(button, board.button_polarity, board.confirm_key);

    let prompt = "press the button to start the watchdog\r\n";
    if let Err(err) = Gate::new(board.confirm_key).wait(&mut console, prompt) {
        defmt::error!("{}", err);
        fatal(Component::Console, "no confirmation");
    }

    let config = match WatchdogConfig::iwdg_fit(TIMEOUT, Hertz(LSI_FREQ)) {
        Ok(config) => config,
        Err(err) => {
            defmt::error!("{}", err);
            fatal(Component::Watchdog, "timeout doesn't fit the iwdg");
        }
    };

    if let Err(err) = iwdg.configure(&config) {
        defmt::error!("{}", err);
        fatal(Component::Watchdog, "iwdg rejected the configuration");
    }

    iwdg.start();
    defmt::info!("watchdog started, not feeding");

    let mut led = Output::new(board.led);
    loop {
        led.toggle();
        // ~250 ms
        cortex_m::asm::delay(MSI_FREQ / 4);
    }
}
