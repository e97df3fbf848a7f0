//! Round-robin capture layout
//!
//! A capture interleaves two channels slot by slot: even slots hold reference channel samples and
//! odd slots hold input channel samples. A capture always covers at least one excitation period
//! and its length is always even.
use num_traits::float::FloatCore;

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocError {
    #[error("Sampling does not resolve the excitation period")]
    Period,
    #[error("Capture length must be nonzero")]
    Empty,
    #[error("Capture length {0} is odd")]
    Odd(usize),
    #[error("Capture length {len} exceeds the storage capacity {capacity}")]
    Capacity { len: usize, capacity: usize },
    #[error("Capture storage is already allocated")]
    Taken,
}

/// The channel converted in a slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Channel {
    Reference = 0,
    Input = 1,
}

impl Channel {
    /// The channel converted in the given slot of a capture.
    pub fn of(slot: usize) -> Self {
        if slot & 1 == 0 {
            Self::Reference
        } else {
            Self::Input
        }
    }

    /// The mean of this channel's samples, rounded to the nearest integer.
    pub fn mean(self, samples: &[u16]) -> i32 {
        let (sum, count) = samples
            .iter()
            .skip(self as usize)
            .step_by(2)
            .fold((0u64, 0u64), |(sum, count), &s| (sum + s as u64, count + 1));
        if count == 0 {
            return 0;
        }
        ((sum + count / 2) / count) as i32
    }
}

/// Number of slots in a capture covering one excitation period.
///
/// # Args
/// * `sample_rate` - The conversion slot rate in Hz, shared by both channels.
/// * `frequency` - The excitation frequency in Hz.
///
/// # Returns
/// The smallest even slot count spanning at least one excitation period.
pub fn capture_len(sample_rate: f64, frequency: f64) -> Result<usize, AllocError> {
    let slots = sample_rate / frequency;
    if !(slots.is_finite() && slots > 0. && slots < (u32::MAX - 1) as f64) {
        return Err(AllocError::Period);
    }
    let len = slots.ceil() as usize;
    Ok(len + (len & 1))
}

/// Storage for one round-robin capture.
///
/// The length is fixed when the buffer is created and is always even.
pub struct CaptureBuffer<'a> {
    samples: &'a mut [u16],
}

impl<'a> CaptureBuffer<'a> {
    /// Carve a capture buffer of `len` slots out of `storage`.
    pub fn new(storage: &'a mut [u16], len: usize) -> Result<Self, AllocError> {
        if len == 0 {
            return Err(AllocError::Empty);
        }
        if len & 1 != 0 {
            return Err(AllocError::Odd(len));
        }
        if len > storage.len() {
            return Err(AllocError::Capacity {
                len,
                capacity: storage.len(),
            });
        }

        let (samples, _) = storage.split_at_mut(len);
        Ok(Self { samples })
    }

    /// The number of slots in the capture.
    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    pub fn samples(&self) -> &[u16] {
        self.samples
    }

    /// Release the underlying sample storage, e.g. to hand it to a DMA transfer.
    pub fn into_inner(self) -> &'a mut [u16] {
        self.samples
    }
}
