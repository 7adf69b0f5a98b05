//! # Low power modes
//!
//! How the ticker power modes map onto the STM32L0
//!
//! | mode | STM32L0 |
//! |------|---------|
//! | `Sleep` | sleep, WFI without SLEEPDEEP |
//! | `DeepSleep` | stop mode with the regulator in low power mode |
//! | `PowerDown` | stop mode with the internal voltage reference off (ULP) |
//! | `DeepPowerDown` | standby, waking is a reset |

use cortex_m::peripheral::SCB;
use stm32l0::stm32l0x3::PWR;
use ticker_core::power::{LowPower, PowerMode, Ready};

// PWR_CR
const LPSDSR: u32 = 1 << 0;
const PDDS: u32 = 1 << 1;
const CWUF: u32 = 1 << 2;
const ULP: u32 = 1 << 9;

pub struct Power {
    pwr: PWR,
    scb: SCB,
}

impl Power {
    pub fn new(pwr: PWR, scb: SCB) -> Self {
        Self { pwr, scb }
    }
}

impl LowPower for Power {
    fn enter(&mut self, ready: Ready) {
        let mode = ready.mode();

        let (deep, bits) = match mode {
            PowerMode::Sleep => (false, 0),
            PowerMode::DeepSleep => (true, LPSDSR),
            PowerMode::PowerDown => (true, LPSDSR | ULP),
            PowerMode::DeepPowerDown => (true, PDDS),
        };

        // Clear the wakeup flag, otherwise standby is left straight away
        self.pwr.cr.modify(|r, w| unsafe {
            w.bits((r.bits() & !(LPSDSR | PDDS | ULP)) | bits | CWUF)
        });

        if deep {
            self.scb.set_sleepdeep();
        } else {
            self.scb.clear_sleepdeep();
        }

        defmt::trace!("wfi in {}", mode);
        cortex_m::asm::dsb();
        cortex_m::asm::wfi();

        self.scb.clear_sleepdeep();
    }
}
