use super::Channel;

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Reference does not cross its mean")]
pub struct NoZeroCrossing;

/// Locate the rising crossing of the reference channel through its mean.
///
/// # Note
/// The reference slots are scanned cyclically: the slot preceding the first one is the last
/// reference slot of the capture. A periodic reference covering a full period therefore always
/// yields a crossing.
///
/// # Args
/// * `samples` - A round-robin capture of even length.
///
/// # Returns
/// The phase origin: the input slot directly following the first reference slot at or above the
/// mean whose predecessor is below the mean.
pub fn find_zero_crossing(samples: &[u16]) -> Result<usize, NoZeroCrossing> {
    let len = samples.len() & !1;
    if len == 0 {
        return Err(NoZeroCrossing);
    }
    let mean = Channel::Reference.mean(&samples[..len]);

    let mut previous = samples[len - 2] as i32;
    for slot in (0..len).step_by(2) {
        let current = samples[slot] as i32;
        if previous < mean && current >= mean {
            return Ok(slot + 1);
        }
        previous = current;
    }

    Err(NoZeroCrossing)
}
