//! Impedance estimation from an open-circuit and a DUT reading.
//!
//! The DUT terminals see the excitation through the bridge network. The network's Thévenin
//! source is the open-circuit voltage and its source resistance is `R_internal ∥ R_bridge`.
//! The short-circuit voltage is taken to be exactly zero.
use super::{Complex, ComplexVoltage};
use core::fmt;
use num_traits::Float;
use serde::Serialize;

/// Known resistances of the measurement bridge in Ohm.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Bridge {
    pub r_internal: f64,
    pub r_bridge: f64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Impedance is unbounded")]
pub struct Unbounded;

/// A complex impedance in Ohm.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Impedance(pub Complex<f64>);

impl Impedance {
    /// Magnitude in Ohm.
    pub fn magnitude(&self) -> f64 {
        self.0.norm()
    }

    /// Phase in degrees.
    pub fn phase(&self) -> f64 {
        self.0.arg().to_degrees()
    }
}

impl fmt::Display for Impedance {
    /// Formats as `real±imaginary i`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = f.precision().unwrap_or(2);
        let sign = if self.0.im.is_sign_negative() { '-' } else { '+' };
        write!(
            f,
            "{:.*}{}{:.*}i",
            precision,
            self.0.re,
            sign,
            precision,
            self.0.im.abs()
        )
    }
}

/// Estimate the DUT impedance.
///
/// `Z = R_internal·R_bridge·(V_dut − V_short) / ((R_internal + R_bridge)·(V_open − V_dut))`
/// with `V_short = 0`.
///
/// # Args
/// * `open` - The reading with the DUT terminals open.
/// * `dut` - The reading with the DUT connected.
/// * `bridge` - The bridge resistances.
///
/// # Returns
/// The impedance or [Unbounded] if the readings do not differ (an open DUT).
pub fn estimate(
    open: ComplexVoltage,
    dut: ComplexVoltage,
    bridge: &Bridge,
) -> Result<Impedance, Unbounded> {
    let open = Complex::new(open.re as f64, open.im as f64);
    let dut = Complex::new(dut.re as f64, dut.im as f64);
    let short = Complex::new(0., 0.);

    let denominator = (open - dut) * (bridge.r_internal + bridge.r_bridge);
    if denominator.norm_sqr() == 0. {
        return Err(Unbounded);
    }
    let z = (dut - short) * (bridge.r_internal * bridge.r_bridge) / denominator;
    if z.is_finite() {
        Ok(Impedance(z))
    } else {
        Err(Unbounded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::isclose;

    const BRIDGE: Bridge = Bridge {
        r_internal: 100e3,
        r_bridge: 1e3,
    };

    #[test]
    fn open_dut() {
        let v = Complex::new(1200, -340);
        assert_eq!(estimate(v, v, &BRIDGE), Err(Unbounded));
    }

    #[test]
    fn short_dut() {
        let z = estimate(Complex::new(1200, -340), Complex::new(0, 0), &BRIDGE)
            .unwrap();
        assert_eq!(z.0, Complex::new(0., 0.));
    }

    #[test]
    fn resistive_divider() {
        // Source resistance 100k || 1k, a matched DUT halves the open voltage.
        let source = 100e3 * 1e3 / 101e3;
        let z = estimate(Complex::new(2000, 0), Complex::new(1000, 0), &BRIDGE)
            .unwrap();
        assert!(isclose(z.0.re, source, 1e-12, 0.));
        assert!(isclose(z.0.im, 0., 0., 1e-12));
        assert!(isclose(z.magnitude(), source, 1e-12, 0.));
        assert!(isclose(z.phase(), 0., 0., 1e-9));
    }

    #[test]
    fn reactive() {
        let r = 100e3 * 1e3 / 101e3;
        let z = Complex::new(470., -220.);
        let open = Complex::new(30_000., 10_000.);
        let dut = open * z / (z + r);
        let estimated = estimate(
            Complex::new(open.re as i32, open.im as i32),
            Complex::new(dut.re.round() as i32, dut.im.round() as i32),
            &BRIDGE,
        )
        .unwrap();
        assert!(isclose(estimated.0.re, z.re, 1e-3, 0.));
        assert!(isclose(estimated.0.im, z.im, 1e-3, 0.));
        assert!(estimated.phase() < 0.);
    }

    #[test]
    fn display() {
        let z = Impedance(Complex::new(470.123, -220.5));
        assert_eq!(format!("{z}"), "470.12-220.50i");
        assert_eq!(format!("{z:.1}"), "470.1-220.5i");
        let z = Impedance(Complex::new(-1., 0.));
        assert_eq!(format!("{z}"), "-1.00+0.00i");
    }
}
