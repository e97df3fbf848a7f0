#![cfg_attr(not(test), no_std)]

pub use num_complex::Complex;

mod capture;
pub use capture::*;
mod excitation;
pub use excitation::*;
mod impedance;
pub use impedance::*;
mod measurement;
pub use measurement::*;
mod phase;
pub use phase::*;
mod quadrature;
pub use quadrature::*;

#[cfg(test)]
pub mod testing;
