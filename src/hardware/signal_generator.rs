//! Square wave excitation on TIM4 channel 1
//!
//! The excitation drives the bridge and doubles as the phase reference of the measurement. It
//! runs free from setup onwards and is never reconfigured.
use lockin_dsp::TimerParameters;

use super::{timers::ExcitationTimer, ExcitationPin};

pub struct SignalGenerator {
    _timer: ExcitationTimer,
    _pin: ExcitationPin,
}

impl SignalGenerator {
    /// Program the timer and start the excitation.
    ///
    /// # Args
    /// * `timer` - The excitation timer.
    /// * `pin` - The excitation output, routed to the timer channel.
    /// * `parameters` - The validated divider, wrap and compare level.
    pub fn configure_and_start(
        mut timer: ExcitationTimer,
        pin: ExcitationPin,
        parameters: &TimerParameters,
    ) -> Self {
        // Validated against the 16 bit limits.
        timer.set_prescaler(parameters.divider);
        timer.set_period_ticks(parameters.wrap as u16);
        timer.set_pwm_level(parameters.level as u16);
        timer.start();

        log::info!(
            "Excitation: divider {}, period {} ticks, level {}",
            parameters.divider,
            timer.get_period() as u32 + 1,
            parameters.level
        );

        Self {
            _timer: timer,
            _pin: pin,
        }
    }
}
