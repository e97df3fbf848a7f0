//! Measurement configuration derived from the design parameters and the clock tree.
use crate::design_parameters::{
    ADC_SAMPLE_TIME, CAPTURE_CAPACITY, EXCITATION_DUTY, EXCITATION_FREQUENCY,
    INPUT_CHANNEL, ITERATIONS, MAX_SKIPPED, MIN_SAMPLER_TIMEOUT, R_BRIDGE,
    REFERENCE_CHANNEL, R_INTERNAL, SAMPLER_RETRIES, SAMPLE_TICKS,
    TIMER_FREQUENCY,
};
use crate::round_robin::{RoundRobin, SequenceError};
use fugit::MillisDurationU32;
use lockin_dsp::{
    capture_len, AllocError, Bridge, ConfigError, ExcitationConfig, Measurement,
    PhaseSpacing, TimerLimits, TimerParameters,
};
use num_traits::float::FloatCore;
use serde::Serialize;

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Invalid excitation: {0}")]
    Config(#[from] ConfigError),
    #[error("Invalid capture: {0}")]
    Alloc(#[from] AllocError),
    #[error("Invalid channel sequence: {0}")]
    Sequence(#[from] SequenceError),
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct MeterConfig {
    pub excitation: ExcitationConfig,
    pub timer: TimerParameters,
    /// The realized excitation frequency in Hz.
    pub frequency: f64,
    /// The conversion slot rate in Hz.
    pub sample_rate: f64,
    /// The number of slots in a capture.
    pub capture_len: usize,
    pub sequence: RoundRobin,
    pub measurement: Measurement,
    pub bridge: Bridge,
    /// The sampler timeout in ms.
    pub timeout: u32,
}

impl MeterConfig {
    /// Derive the configuration.
    ///
    /// # Args
    /// * `timer_clock` - The kernel clock of the excitation timer in Hz.
    pub fn new(timer_clock: u32) -> Result<Self, Error> {
        let excitation = ExcitationConfig {
            frequency: EXCITATION_FREQUENCY.to_Hz(),
            duty: EXCITATION_DUTY,
            clock: timer_clock,
        };
        let timer =
            TimerParameters::compute(&excitation, &TimerLimits::SIXTEEN_BIT)?;
        let frequency = timer.frequency(timer_clock);

        let sample_rate = TIMER_FREQUENCY.to_Hz() as f64 / SAMPLE_TICKS as f64;
        let capture_len = capture_len(sample_rate, frequency)?;
        if capture_len > CAPTURE_CAPACITY {
            return Err(AllocError::Capacity {
                len: capture_len,
                capacity: CAPTURE_CAPACITY,
            }
            .into());
        }

        let sequence =
            RoundRobin::new(REFERENCE_CHANNEL, INPUT_CHANNEL, ADC_SAMPLE_TIME)?;

        Ok(Self {
            excitation,
            timer,
            frequency,
            sample_rate,
            capture_len,
            sequence,
            measurement: Measurement {
                iterations: ITERATIONS,
                spacing: PhaseSpacing::new(sample_rate, frequency),
                max_skipped: MAX_SKIPPED,
                sampler_retries: SAMPLER_RETRIES,
            },
            bridge: Bridge {
                r_internal: R_INTERNAL,
                r_bridge: R_BRIDGE,
            },
            timeout: sampler_timeout(capture_len, sample_rate).ticks(),
        })
    }

    pub fn timeout(&self) -> MillisDurationU32 {
        MillisDurationU32::millis(self.timeout)
    }
}

/// Four times the nominal time to fill a capture, at least [MIN_SAMPLER_TIMEOUT].
pub fn sampler_timeout(capture_len: usize, sample_rate: f64) -> MillisDurationU32 {
    let fill = capture_len as f64 * 1e3 / sample_rate;
    let timeout = (4. * fill).ceil() as u32;
    MillisDurationU32::millis(timeout.max(MIN_SAMPLER_TIMEOUT.ticks()))
}
