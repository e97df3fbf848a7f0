use super::{Channel, Complex};
use num_traits::float::FloatCore;
use serde::Serialize;

/// In-phase and quadrature components of the input, in ADC codes.
pub type ComplexVoltage = Complex<i32>;

/// The slot distance between the four demodulation phases.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PhaseSpacing {
    quarter: usize,
}

impl PhaseSpacing {
    /// Quarter of the excitation period in slots.
    ///
    /// # Args
    /// * `sample_rate` - The conversion slot rate in Hz.
    /// * `frequency` - The excitation frequency in Hz.
    pub fn new(sample_rate: f64, frequency: f64) -> Self {
        Self {
            quarter: (sample_rate / frequency / 4.).round() as usize,
        }
    }

    pub fn quarter(&self) -> usize {
        self.quarter
    }

    /// The input slots sampled at 0°, 90°, 180° and 270° after `origin`.
    ///
    /// Positions wrap around the capture. A position falling on a reference slot is moved to
    /// the following input slot. A trailing unpaired slot of an odd `len` is never used.
    pub fn positions(&self, origin: usize, len: usize) -> [usize; 4] {
        let len = len & !1;
        core::array::from_fn(|k| {
            let slot = (origin + k * self.quarter) % len;
            match Channel::of(slot) {
                Channel::Input => slot,
                Channel::Reference => (slot + 1) % len,
            }
        })
    }
}

/// Running sums of the input channel at the four demodulation phases.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QuadratureAccumulator {
    sums: [i64; 4],
    count: u32,
}

impl QuadratureAccumulator {
    /// Add one capture.
    ///
    /// # Args
    /// * `samples` - A round-robin capture. A trailing unpaired slot is ignored.
    /// * `origin` - The phase origin found in that capture.
    /// * `spacing` - The demodulation phase spacing.
    pub fn accumulate(
        &mut self,
        samples: &[u16],
        origin: usize,
        spacing: &PhaseSpacing,
    ) {
        let samples = &samples[..samples.len() & !1];
        let mean = Channel::Input.mean(samples);
        for (sum, slot) in self
            .sums
            .iter_mut()
            .zip(spacing.positions(origin, samples.len()))
        {
            *sum += (samples[slot] as i32 - mean) as i64;
        }
        self.count += 1;
    }

    /// The number of accumulated captures.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// The averaged samples, rounded to the nearest integer.
    pub fn finalize(&self) -> [i32; 4] {
        if self.count == 0 {
            return [0; 4];
        }
        let n = self.count as i64;
        self.sums.map(|sum| {
            let half = if sum < 0 { -n / 2 } else { n / 2 };
            ((sum + half) / n) as i32
        })
    }
}

/// Reduce four averaged phase samples to in-phase and quadrature components.
///
/// Antipodal differences cancel the common mode.
pub fn derive_voltage(samples: [i32; 4]) -> ComplexVoltage {
    Complex::new(samples[1] - samples[3], samples[0] - samples[2])
}
