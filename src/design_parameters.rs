use crate::round_robin::SampleTime;
use fugit::{HertzU32 as Hertz, MillisDurationU32};

/// The system core clock.
pub const SYSCLK: Hertz = Hertz::MHz(400);

/// The kernel clock of the APB1 timers (TIM2 through TIM7) for the configured clock tree.
pub const TIMER_KERNEL_CLOCK: Hertz = Hertz::MHz(200);

/// The counting frequency of the sampling timer.
pub const TIMER_FREQUENCY: Hertz = Hertz::MHz(100);

// The number of sampling timer ticks between conversions. The timer runs at 100MHz, so the
// conversion slot rate is 200 kHz, shared between the reference and the input channel.
pub const SAMPLE_TICKS: u32 = 500;

/// The requested ADC kernel clock.
pub const ADC_CLOCK: Hertz = Hertz::MHz(25);

/// ADC1 channel tracking the excitation (PF11, INP2).
pub const REFERENCE_CHANNEL: u8 = 2;

/// ADC1 channel tracking the DUT response (PF12, INP6).
pub const INPUT_CHANNEL: u8 = 6;

// 16.5 + 8.5 cycles per conversion at 25 MHz take 1 us, well within a 5 us slot.
pub const ADC_SAMPLE_TIME: SampleTime = SampleTime::T16_5;

/// The DUT excitation frequency.
pub const EXCITATION_FREQUENCY: Hertz = Hertz::Hz(500);

/// The DUT excitation duty cycle in percent.
pub const EXCITATION_DUTY: u8 = 50;

/// The number of samples reserved for a capture.
pub const CAPTURE_CAPACITY: usize = 4096;

/// The bridge resistor in series with the excitation, in Ohm.
pub const R_INTERNAL: f64 = 100e3;

/// The bridge resistor across the DUT terminals, in Ohm.
pub const R_BRIDGE: f64 = 1e3;

/// The number of acquisitions averaged into one reading.
pub const ITERATIONS: u32 = 1000;

/// The number of acquisitions without reference zero crossing tolerated per reading.
pub const MAX_SKIPPED: u32 = 1000;

/// The number of consecutive sampler timeouts tolerated.
pub const SAMPLER_RETRIES: u32 = 3;

/// The shortest sampler timeout.
pub const MIN_SAMPLER_TIMEOUT: MillisDurationU32 = MillisDurationU32::millis(10);
