//! Capture storage for the round-robin sampler
use core::sync::atomic::{AtomicBool, Ordering};

use lockin_dsp::{AllocError, CaptureBuffer};

use crate::design_parameters::CAPTURE_CAPACITY;

// The capture is written by DMA1 which cannot reach DTCM. Note that the contents of AXI SRAM is
// uninitialized, so the buffer contents on startup are undefined.
#[link_section = ".axisram.buffers"]
static mut CAPTURE_STORAGE: [u16; CAPTURE_CAPACITY] = [0; CAPTURE_CAPACITY];

static TAKEN: AtomicBool = AtomicBool::new(false);

/// Allocate the capture buffer.
///
/// # Note
/// The storage can only be handed out once.
///
/// # Args
/// * `len` - The number of slots in a capture, even and at most [CAPTURE_CAPACITY].
pub fn allocate(len: usize) -> Result<CaptureBuffer<'static>, AllocError> {
    if TAKEN.swap(true, Ordering::AcqRel) {
        return Err(AllocError::Taken);
    }

    // Note(unsafe): The storage is only ever borrowed here, exactly once.
    let storage =
        unsafe { &mut *core::ptr::addr_of_mut!(CAPTURE_STORAGE) };
    storage.fill(0);

    CaptureBuffer::new(storage, len).inspect_err(|_| {
        TAKEN.store(false, Ordering::Release);
    })
}
