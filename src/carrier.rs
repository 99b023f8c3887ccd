//! Carrier Reconfiguration Pipeline
//!
//! Pure solve stages, run in order on a batch of profiles:
//! 1. `validate`: structural checks against the initialized chain
//! 2. `band`: carrier to band assignment and band centers
//! 3. `nco`: per-carrier NCO shift, phase and mixer enable
//! 4. `link`: rate ratios and transport link slots
//! 5. `filter`: channel filter selection and coefficient table packing
//! 6. `delay`: slot shuffle and delay buffers equalizing carrier latency
//!
//! `solution` chains the stages into one staged result. Nothing here touches
//! hardware.

pub mod chain;
pub mod validate;
pub mod band;
pub mod nco;
pub mod link;
pub mod filter;
pub mod delay;
pub mod solution;
