//! Excitation timer arithmetic
//!
//! The excitation is a square wave emitted by a PWM timer channel. The counter is clocked by the
//! timer kernel clock through an integer prescaler and wraps after `wrap + 1` ticks. The output
//! is high while the counter is below the compare `level`.
use serde::Serialize;

/// The requested excitation waveform.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExcitationConfig {
    /// Excitation frequency in Hz.
    pub frequency: u32,
    /// Fraction of the period the output is high, in percent. Exclusive of 0 and 100.
    pub duty: u8,
    /// Timer kernel clock in Hz.
    pub clock: u32,
}

/// Register limits of the timer producing the excitation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TimerLimits {
    /// Largest supported clock divider (prescaler register value plus one).
    pub max_divider: u32,
    /// Largest counter wrap value (auto-reload).
    pub max_wrap: u32,
}

impl TimerLimits {
    /// A general purpose timer with a 16-bit prescaler and a 16-bit counter.
    pub const SIXTEEN_BIT: Self = Self {
        max_divider: 1 << 16,
        max_wrap: u16::MAX as u32,
    };
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Excitation frequency must be nonzero")]
    ZeroFrequency,
    #[error("Duty cycle {0}% outside of (0, 100)")]
    Duty(u8),
    #[error("Clock divider resolves to zero")]
    ZeroDivider,
    #[error("Clock divider {0} exceeds the prescaler range")]
    Divider(u64),
    #[error("Counter wrap {0} is not representable")]
    Wrap(u64),
    #[error("Compare level resolves to zero")]
    ZeroLevel,
}

/// Number of dividers above the minimum that are tried for an exact period.
const DIVIDER_SEARCH: u64 = 16;

/// Timer register values realizing an [ExcitationConfig].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TimerParameters {
    /// Kernel clock divider, at least 1. The prescaler register takes `divider - 1`.
    pub divider: u32,
    /// Counter wrap value. The period is `wrap + 1` divided clock ticks.
    pub wrap: u32,
    /// Compare level, `wrap * duty / 100`.
    pub level: u32,
}

impl TimerParameters {
    /// Compute the divider, wrap and compare level for an excitation.
    ///
    /// # Note
    /// The smallest divider that keeps the wrap representable is used unless a slightly larger
    /// one divides the period exactly. The realized frequency is then exact.
    ///
    /// # Args
    /// * `config` - The requested excitation.
    /// * `limits` - The register limits of the timer.
    pub fn compute(
        config: &ExcitationConfig,
        limits: &TimerLimits,
    ) -> Result<Self, ConfigError> {
        if config.frequency == 0 {
            return Err(ConfigError::ZeroFrequency);
        }
        if config.duty == 0 || config.duty >= 100 {
            return Err(ConfigError::Duty(config.duty));
        }

        let clock = config.clock as u64;
        let frequency = config.frequency as u64;
        let max_divider = limits.max_divider as u64;

        let min_divider =
            clock.div_ceil(frequency * (limits.max_wrap as u64 + 1));
        if min_divider == 0 {
            return Err(ConfigError::ZeroDivider);
        }
        if min_divider > max_divider {
            return Err(ConfigError::Divider(min_divider));
        }

        let divider = (min_divider..min_divider + DIVIDER_SEARCH)
            .take_while(|&d| d <= max_divider)
            .find(|&d| clock % (d * frequency) == 0)
            .unwrap_or(min_divider);

        // Round to the nearest period.
        let ticks = (2 * clock + divider * frequency) / (2 * divider * frequency);
        let wrap = ticks.saturating_sub(1);
        if wrap == 0 || wrap > limits.max_wrap as u64 {
            return Err(ConfigError::Wrap(wrap));
        }

        let level = wrap * config.duty as u64 / 100;
        if level == 0 {
            return Err(ConfigError::ZeroLevel);
        }

        Ok(Self {
            divider: divider as u32,
            wrap: wrap as u32,
            level: level as u32,
        })
    }

    /// The realized excitation frequency in Hz for the given kernel clock.
    pub fn frequency(&self, clock: u32) -> f64 {
        clock as f64 / (self.divider as f64 * (self.wrap as f64 + 1.))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(frequency: u32, duty: u8, clock: u32) -> ExcitationConfig {
        ExcitationConfig {
            frequency,
            duty,
            clock,
        }
    }

    #[test]
    fn exact_period() {
        let p = TimerParameters::compute(
            &config(500, 50, 200_000_000),
            &TimerLimits::SIXTEEN_BIT,
        )
        .unwrap();
        assert_eq!(
            p,
            TimerParameters {
                divider: 8,
                wrap: 49_999,
                level: 24_999
            }
        );
        assert_eq!(p.frequency(200_000_000), 500.);
    }

    #[test]
    fn rp2040_clock() {
        let p = TimerParameters::compute(
            &config(500, 50, 125_000_000),
            &TimerLimits::SIXTEEN_BIT,
        )
        .unwrap();
        assert_eq!(p.divider, 4);
        assert_eq!(p.wrap, 62_499);
        assert_eq!(p.level, 31_249);
    }

    #[test]
    fn inexact_period() {
        let p = TimerParameters::compute(
            &config(7, 25, 200_000_000),
            &TimerLimits::SIXTEEN_BIT,
        )
        .unwrap();
        assert_eq!(p.divider, 436);
        assert_eq!(p.wrap, 65_530);
        assert_eq!(p.level, 16_382);
        assert!((p.frequency(200_000_000) - 7.).abs() < 1e-4);
    }

    #[test]
    fn wrap_representable() {
        for frequency in [1, 3, 10, 99, 500, 1_234, 10_000, 1_000_000] {
            let p = TimerParameters::compute(
                &config(frequency, 50, 200_000_000),
                &TimerLimits::SIXTEEN_BIT,
            )
            .unwrap();
            assert!(p.divider >= 1);
            assert!(p.wrap <= u16::MAX as u32);
            assert!(p.level < p.wrap);
            let realized = p.frequency(200_000_000);
            let frequency = frequency as f64;
            assert!((realized - frequency).abs() / frequency < 1e-3);
        }
    }

    #[test]
    fn invalid() {
        let limits = TimerLimits::SIXTEEN_BIT;
        assert_eq!(
            TimerParameters::compute(&config(0, 50, 1_000_000), &limits),
            Err(ConfigError::ZeroFrequency)
        );
        assert_eq!(
            TimerParameters::compute(&config(500, 0, 1_000_000), &limits),
            Err(ConfigError::Duty(0))
        );
        assert_eq!(
            TimerParameters::compute(&config(500, 100, 1_000_000), &limits),
            Err(ConfigError::Duty(100))
        );
        assert_eq!(
            TimerParameters::compute(&config(500, 50, 0), &limits),
            Err(ConfigError::ZeroDivider)
        );
        assert_eq!(
            TimerParameters::compute(&config(1_000_000, 50, 1_000_000), &limits),
            Err(ConfigError::Wrap(0))
        );
        assert_eq!(
            TimerParameters::compute(&config(600_000, 50, 1_000_000), &limits),
            Err(ConfigError::ZeroLevel)
        );
        assert_eq!(
            TimerParameters::compute(
                &config(1, 50, 200_000_000),
                &TimerLimits {
                    max_divider: 4,
                    max_wrap: 255
                }
            ),
            Err(ConfigError::Divider(781_250))
        );
    }
}
