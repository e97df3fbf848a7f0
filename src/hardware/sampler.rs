//! Round-robin ADC sampler
//!
//! # Design
//! ADC1 converts one slot of a two-channel regular sequence on every TIM2 update. DMA1 stream 0
//! moves each conversion into the capture buffer without CPU involvement and counts the slots.
//! An acquisition arms the ADC, starts the sampling timer and polls for the end of the transfer
//! against a deadline on the SysTick monotonic.
//!
//! The sampling timer is paused between acquisitions. Since the sequence and the DMA transfer
//! are restarted for every acquisition, the first slot of a capture is always the reference
//! channel.
use core::mem;

use fugit::MillisDurationU32;
use rtic_monotonics::Monotonic;

use lockin_dsp::{Acquire, CaptureBuffer};

use super::{
    hal,
    timers::{SamplingTimer, TriggerGenerator},
    InputPin, ReferencePin, Systick,
};
use crate::round_robin::{self, RoundRobin};

use hal::{
    adc::{Adc, Enabled},
    dma::{
        dma::{DmaConfig, Stream0},
        PeripheralToMemory, Transfer,
    },
    stm32::{ADC1, DMA1},
};

// End of conversion, end of sequence and overrun flags.
const ISR_CLEAR: u32 = 1 << 2 | 1 << 3 | 1 << 4;

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SamplerError {
    #[error("Acquisition timed out")]
    Timeout,
    #[error("DMA stream is not available")]
    Unavailable,
}

/// The round-robin sampler, exclusively owning the ADC, its DMA stream and the capture buffer.
pub struct Sampler {
    hardware: Option<(Stream0<DMA1>, Adc<ADC1, Enabled>)>,
    buffer: &'static mut [u16],
    timer: SamplingTimer,
    sequence: RoundRobin,
    timeout: MillisDurationU32,
    _pins: (ReferencePin, InputPin),
}

impl Sampler {
    /// Construct the sampler.
    ///
    /// # Args
    /// * `adc` - The calibrated and enabled ADC.
    /// * `stream` - The DMA stream moving conversions into the capture.
    /// * `timer` - The sampling timer with its period configured.
    /// * `buffer` - The capture buffer.
    /// * `sequence` - The channel sequence used by [Acquire].
    /// * `timeout` - The longest time an acquisition may take.
    /// * `pins` - The reference and input pins in analog mode.
    pub fn new(
        adc: Adc<ADC1, Enabled>,
        stream: Stream0<DMA1>,
        mut timer: SamplingTimer,
        buffer: CaptureBuffer<'static>,
        sequence: RoundRobin,
        timeout: MillisDurationU32,
        pins: (ReferencePin, InputPin),
    ) -> Self {
        timer.generate_trigger(TriggerGenerator::Update);

        let regs = unsafe { &*ADC1::ptr() };
        // Note(unsafe): The sampler owns ADC1. Only the trigger and DMA fields of CFGR change.
        regs.cfgr
            .modify(|r, w| unsafe { w.bits(round_robin::cfgr(r.bits())) });

        Self {
            hardware: Some((stream, adc)),
            buffer: buffer.into_inner(),
            timer,
            sequence,
            timeout,
            _pins: pins,
        }
    }

    /// Program the regular sequence.
    fn select(&mut self, channels: &RoundRobin) {
        let regs = unsafe { &*ADC1::ptr() };
        let (smpr1, smpr2) = channels.smpr();
        // Note(unsafe): All words are built from valid channel numbers and sample times.
        unsafe {
            regs.pcsel.write(|w| w.bits(channels.mask()));
            regs.smpr1.write(|w| w.bits(smpr1));
            regs.smpr2.write(|w| w.bits(smpr2));
            regs.sqr1.write(|w| w.bits(channels.sqr1()));
        }
    }

    /// Halt conversions and leave the ADC idle for the next acquisition.
    fn halt(&mut self) {
        self.timer.pause();

        let regs = unsafe { &*ADC1::ptr() };
        if regs.cr.read().adstart().bit_is_set() {
            regs.cr.modify(|_, w| w.adstp().set_bit());
            while regs.cr.read().adstart().bit_is_set() {}
        }

        // Drain a conversion that completed after the last transfer.
        let _ = regs.dr.read().bits();
        // Note(unsafe): The flags are cleared by writing ones.
        regs.isr.write(|w| unsafe { w.bits(ISR_CLEAR) });
    }

    /// Acquire one capture.
    ///
    /// # Note
    /// The returned capture is valid until the next acquisition.
    ///
    /// # Args
    /// * `channels` - The channel sequence. The first slot converts its reference channel.
    ///
    /// # Returns
    /// The filled capture, or [SamplerError::Timeout] if the transfer did not complete in time.
    pub fn arm_and_wait(
        &mut self,
        channels: &RoundRobin,
    ) -> Result<&[u16], SamplerError> {
        let (stream, adc) =
            self.hardware.take().ok_or(SamplerError::Unavailable)?;
        self.select(channels);

        let buffer = mem::take(&mut self.buffer);
        let mut transfer: Transfer<_, _, PeripheralToMemory, _, _> =
            Transfer::init(
                stream,
                adc,
                buffer,
                None,
                DmaConfig::default().memory_increment(true),
            );

        transfer.start(|_adc| {
            let regs = unsafe { &*ADC1::ptr() };
            regs.cr.modify(|_, w| w.adstart().set_bit());
        });
        self.timer.restart();

        let deadline = Systick::now() + self.timeout;
        let mut complete = transfer.get_transfer_complete_flag();
        while !complete && Systick::now() < deadline {
            complete = transfer.get_transfer_complete_flag();
        }

        self.halt();
        let (stream, adc, buffer, _) = transfer.free();
        self.hardware.replace((stream, adc));
        self.buffer = buffer;

        if complete {
            Ok(&self.buffer[..])
        } else {
            log::warn!("Sampler timeout after {} ms", self.timeout.ticks());
            Err(SamplerError::Timeout)
        }
    }
}

impl Acquire for Sampler {
    type Error = SamplerError;

    fn acquire(&mut self) -> Result<&[u16], SamplerError> {
        let sequence = self.sequence;
        self.arm_and_wait(&sequence)
    }
}
