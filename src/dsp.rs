//! Digital Signal Processing
//!
//! Numeric helpers for the carrier datapath:
//! - Windowed-sinc channel filter design in Q1.15
//! - Carrier digital gain conversion between mdB and the multiplier register

pub mod fir_design;
pub mod gain;
