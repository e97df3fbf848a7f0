//! Timers pacing the round-robin sampler and generating the excitation.
use super::hal;

/// The event that should generate an external trigger from the peripheral.
#[allow(dead_code)]
pub enum TriggerGenerator {
    Reset = 0b000,
    Enable = 0b001,
    Update = 0b010,
    ComparePulse = 0b011,
}

macro_rules! timer {
    ($name:ident, $TY:ident, $size:ty) => {
        /// A timer under manual register control.
        pub struct $name {
            timer: hal::timer::Timer<hal::stm32::$TY>,
        }

        // Not every timer uses every method.
        #[allow(dead_code)]
        impl $name {
            /// Take control of the timer. The timer is paused.
            pub fn new(mut timer: hal::timer::Timer<hal::stm32::$TY>) -> Self {
                timer.pause();
                Self { timer }
            }

            /// Divide the timer kernel clock by `divider`.
            pub fn set_prescaler(&mut self, divider: u32) {
                let regs = unsafe { &*hal::stm32::$TY::ptr() };
                regs.psc.write(|w| w.psc().bits((divider - 1) as u16));
            }

            /// Get the period of the timer.
            pub fn get_period(&self) -> $size {
                let regs = unsafe { &*hal::stm32::$TY::ptr() };
                regs.arr.read().arr().bits()
            }

            /// Manually set the period of the timer.
            pub fn set_period_ticks(&mut self, period: $size) {
                let regs = unsafe { &*hal::stm32::$TY::ptr() };
                regs.arr.write(|w| w.arr().bits(period));

                // Force the new period to take effect immediately.
                self.timer.apply_freq();
            }

            /// Drive channel 1 as a PWM output high while the counter is below `level`.
            pub fn set_pwm_level(&mut self, level: $size) {
                let regs = unsafe { &*hal::stm32::$TY::ptr() };
                regs.ccr[0].write(|w| w.ccr().bits(level));
                // Note(unsafe): 0b110 is PWM mode 1.
                #[allow(unused_unsafe)]
                regs.ccmr1_output().modify(|_, w| unsafe {
                    w.cc1s().bits(0).oc1m().bits(0b110).oc1pe().set_bit()
                });
                regs.ccer.modify(|_, w| w.cc1e().set_bit());
            }

            /// Start the timer.
            pub fn start(&mut self) {
                // Force a refresh of the frequency settings.
                self.timer.apply_freq();
                self.timer.reset_counter();

                self.timer.resume();
            }

            /// Count from zero without forcing an update event.
            pub fn restart(&mut self) {
                self.timer.reset_counter();
                self.timer.resume();
            }

            pub fn pause(&mut self) {
                self.timer.pause();
            }

            /// Configure the timer peripheral to generate a trigger based on the provided
            /// source.
            pub fn generate_trigger(&mut self, source: TriggerGenerator) {
                let regs = unsafe { &*hal::stm32::$TY::ptr() };
                // Note(unsafe) The TriggerGenerator enumeration is specified such that this is
                // always in range.
                regs.cr2.modify(|_, w| w.mms().bits(source as u8));
            }
        }
    };
}

timer!(SamplingTimer, TIM2, u32);
timer!(ExcitationTimer, TIM4, u16);
