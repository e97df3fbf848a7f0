use super::Complex;

/// Maximum acceptable error between a computed and actual value given fixed and relative
/// tolerances.
pub fn max_error(a: f64, b: f64, rtol: f64, atol: f64) -> f64 {
    rtol * a.abs().max(b.abs()) + atol
}

pub fn isclose(a: f64, b: f64, rtol: f64, atol: f64) -> bool {
    (a - b).abs() <= max_error(a, b, rtol, atol)
}

pub fn complex_isclose(
    a: Complex<f64>,
    b: Complex<f64>,
    rtol: f64,
    atol: f64,
) -> bool {
    isclose(a.re, b.re, rtol, atol) && isclose(a.im, b.im, rtol, atol)
}
