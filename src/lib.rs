#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod design_parameters;
pub mod round_robin;

#[cfg(target_os = "none")]
pub mod hardware;
