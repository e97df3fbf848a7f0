//! Accumulation of many acquisitions into one averaged reading.
use super::{find_zero_crossing, NoZeroCrossing, PhaseSpacing, QuadratureAccumulator};
use serde::Serialize;

/// A source of round-robin captures.
pub trait Acquire {
    type Error: core::fmt::Debug;

    /// Fill the capture and return it.
    ///
    /// The capture is valid until the next call.
    fn acquire(&mut self) -> Result<&[u16], Self::Error>;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MeasurementError<E> {
    #[error("Sampler failed repeatedly: {0:?}")]
    Sampler(E),
    #[error("No reference zero crossing in {skipped} acquisitions")]
    NoSignal { skipped: u32 },
}

/// Parameters of one averaged reading.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Measurement {
    /// Number of acquisitions averaged into a reading.
    pub iterations: u32,
    /// Demodulation phase spacing.
    pub spacing: PhaseSpacing,
    /// Acquisitions without a reference zero crossing tolerated per reading.
    pub max_skipped: u32,
    /// Consecutive sampler failures tolerated before giving up.
    pub sampler_retries: u32,
}

impl Measurement {
    /// Acquire and accumulate until `iterations` captures with a phase origin have been
    /// averaged.
    ///
    /// # Note
    /// Captures without a zero crossing are skipped and do not count toward `iterations`.
    ///
    /// # Args
    /// * `sampler` - The capture source.
    /// * `progress` - Called with the number of accumulated captures after each one.
    ///
    /// # Returns
    /// The four averaged phase samples.
    pub fn run<A: Acquire>(
        &self,
        sampler: &mut A,
        mut progress: impl FnMut(u32),
    ) -> Result<[i32; 4], MeasurementError<A::Error>> {
        let mut accumulator = QuadratureAccumulator::default();
        let mut skipped = 0;
        let mut failures = 0;

        while accumulator.count() < self.iterations {
            let samples = match sampler.acquire() {
                Ok(samples) => {
                    failures = 0;
                    samples
                }
                Err(err) => {
                    failures += 1;
                    if failures > self.sampler_retries {
                        return Err(MeasurementError::Sampler(err));
                    }
                    log::warn!("Acquisition failed: {err:?}");
                    continue;
                }
            };

            match find_zero_crossing(samples) {
                Ok(origin) => {
                    accumulator.accumulate(samples, origin, &self.spacing);
                    progress(accumulator.count());
                }
                Err(NoZeroCrossing) => {
                    skipped += 1;
                    if skipped > self.max_skipped {
                        return Err(MeasurementError::NoSignal { skipped });
                    }
                    log::warn!("Skipping acquisition without zero crossing");
                }
            }
        }

        Ok(accumulator.finalize())
    }
}
