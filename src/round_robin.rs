//! ADC register words for a two-channel round-robin sequence
//!
//! The regular sequence alternates the reference and input channels. Each conversion trigger
//! converts a single slot, so the two channels share the trigger rate.
use serde::Serialize;

/// ADC sample time in ADC clock cycles.
#[allow(dead_code)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum SampleTime {
    T1_5 = 0b000,
    T2_5 = 0b001,
    T8_5 = 0b010,
    T16_5 = 0b011,
    T32_5 = 0b100,
    T64_5 = 0b101,
    T387_5 = 0b110,
    T810_5 = 0b111,
}

/// Number of ADC channels.
const CHANNELS: u8 = 20;

// CFGR fields of a timer-triggered, one-shot DMA sequence.
const CFGR_DMNGT_ONE_SHOT: u32 = 0b01;
const CFGR_EXTSEL_TIM2_TRGO: u32 = 11 << 5;
const CFGR_EXTEN_RISING: u32 = 0b01 << 10;
const CFGR_OVRMOD: u32 = 1 << 12;
const CFGR_DISCEN: u32 = 1 << 16;
// DMNGT, EXTSEL, EXTEN, OVRMOD, CONT, DISCEN, DISCNUM
const CFGR_MASK: u32 = 0b11
    | 0b1_1111 << 5
    | 0b11 << 10
    | 1 << 12
    | 1 << 13
    | 1 << 16
    | 0b111 << 17;

/// The configuration register (CFGR) value converting one slot per TIM2_TRGO rising edge,
/// with the results moved by one-shot DMA and overruns overwriting the data register.
///
/// All other fields of `current`, the resolution among them, are kept.
pub fn cfgr(current: u32) -> u32 {
    current & !CFGR_MASK
        | CFGR_DMNGT_ONE_SHOT
        | CFGR_EXTSEL_TIM2_TRGO
        | CFGR_EXTEN_RISING
        | CFGR_OVRMOD
        | CFGR_DISCEN
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SequenceError {
    #[error("Channel {0} does not exist")]
    Channel(u8),
    #[error("Reference and input must be distinct channels")]
    Duplicate,
}

/// A regular sequence converting `reference` and `input` in turn, starting with `reference`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct RoundRobin {
    reference: u8,
    input: u8,
    sample_time: SampleTime,
}

impl RoundRobin {
    pub fn new(
        reference: u8,
        input: u8,
        sample_time: SampleTime,
    ) -> Result<Self, SequenceError> {
        for channel in [reference, input] {
            if channel >= CHANNELS {
                return Err(SequenceError::Channel(channel));
            }
        }
        if reference == input {
            return Err(SequenceError::Duplicate);
        }
        Ok(Self {
            reference,
            input,
            sample_time,
        })
    }

    /// The channel mask for the preselection register (PCSEL).
    pub fn mask(&self) -> u32 {
        1 << self.reference | 1 << self.input
    }

    /// The first sequence register (SQR1): length 2, reference first.
    pub fn sqr1(&self) -> u32 {
        1 | (self.reference as u32) << 6 | (self.input as u32) << 12
    }

    /// Sample time words for (SMPR1, SMPR2) with both channels set and all others zero.
    pub fn smpr(&self) -> (u32, u32) {
        let mut smpr = [0u32; 2];
        for channel in [self.reference, self.input] {
            let (index, offset) = ((channel / 10) as usize, (channel % 10) * 3);
            smpr[index] |= (self.sample_time as u32) << offset;
        }
        (smpr[0], smpr[1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_and_input() {
        let sequence = RoundRobin::new(2, 6, SampleTime::T16_5).unwrap();
        assert_eq!(sequence.mask(), 0b100_0100);
        assert_eq!(sequence.sqr1(), 1 | 2 << 6 | 6 << 12);
        assert_eq!(sequence.smpr(), (0b011 << 6 | 0b011 << 18, 0));
    }

    #[test]
    fn upper_channels() {
        let sequence = RoundRobin::new(16, 3, SampleTime::T810_5).unwrap();
        assert_eq!(sequence.mask(), 1 << 16 | 1 << 3);
        assert_eq!(sequence.smpr(), (0b111 << 9, 0b111 << 18));
    }

    #[test]
    fn trigger_configuration() {
        assert_eq!(cfgr(0), 0b01 | 11 << 5 | 0b01 << 10 | 1 << 12 | 1 << 16);
        // Continuous mode and a previous DISCNUM are cleared.
        assert_eq!(cfgr(1 << 13 | 0b111 << 17), cfgr(0));
    }

    #[test]
    fn resolution_kept() {
        for res in 0..8u32 {
            assert_eq!(cfgr(res << 2) >> 2 & 0b111, res);
        }
        // JQDIS and other fields outside the sampler's set survive.
        assert_eq!(cfgr(1 << 31) & 1 << 31, 1 << 31);
    }

    #[test]
    fn invalid() {
        assert_eq!(
            RoundRobin::new(20, 6, SampleTime::T1_5),
            Err(SequenceError::Channel(20))
        );
        assert_eq!(
            RoundRobin::new(6, 6, SampleTime::T1_5),
            Err(SequenceError::Duplicate)
        );
    }
}
