//! # Ticker
//!
//! Demo firmware for the periodic timer pattern
//!
//! | binary | source | foreground |
//! |--------|--------|------------|
//! | `systick` | SysTick every 10 ms | toggles the LED forever |
//! | `rtc_tick` | RTC wakeup timer every calibrated second | toggles the LED forever |
//! | `rtc_alarm` | RTC alarm A, 5 s ahead | waits for the button, then stops until the alarm |
//! | `watchdog` | IWDG, 5 s | reports the reset cause, waits for the button, then never feeds |

#![no_std]

use defmt_rtt as _; // global logger
use panic_probe as _; // panic handler

use ticker_core::config::BoardConfig;
use ticker_core::error::{fatal, Component};

/// The board the firmware was built for.
///
/// Set `TICKER_BOARD` at build time to pick one of [`ticker_core::config::BOARDS`], the watch
/// is used otherwise.
pub fn board() -> &'static BoardConfig {
    let board = option_env!("TICKER_BOARD")
        .and_then(BoardConfig::by_name)
        .unwrap_or(&BoardConfig::WATCH);

    if board.validate().is_err() {
        fatal(Component::Output, "board has an invalid pin");
    }

    defmt::info!("board {}", board.name);
    board
}
