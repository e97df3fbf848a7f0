//! Busy-wait delay
//!
//! SysTick drives the monotonic, so ADC bring-up waits by counting core cycles instead.
use embedded_hal_02::blocking::delay::DelayUs;

pub struct AsmDelay {
    cycles_per_us: u32,
}

impl AsmDelay {
    /// # Args
    /// * `core_clock` - The CPU core frequency in Hz.
    pub fn new(core_clock: u32) -> AsmDelay {
        AsmDelay {
            cycles_per_us: core_clock / 1_000_000,
        }
    }
}

impl<U> DelayUs<U> for AsmDelay
where
    U: Into<u32>,
{
    fn delay_us(&mut self, us: U) {
        cortex_m::asm::delay(self.cycles_per_us * us.into())
    }
}
