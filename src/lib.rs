//! Multi-Carrier Digital Front End Reconfiguration
//!
//! This library reconfigures the carriers of a running SDR transceiver's
//! digital front end: which carriers exist, where they sit in frequency, how
//! they are filtered, and how they are packed onto the transport link.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     DEVICE LAYER                             │
//! │  Transceiver: solve / apply / readback, per-direction state  │
//! ├─────────────────────────────────────────────────────────────┤
//! │                  CARRIER PIPELINE (pure)                     │
//! │  Validate → Bands → NCO → Link → Filters → Delay             │
//! ├─────────────────────────────────────────────────────────────┤
//! │                        DSP                                   │
//! │  FIR design (Q1.15)  │  Gain conversion                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │                        HAL                                   │
//! │  Register fields  │  Firmware commands  │  SPI bus           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Design Principles
//!
//! - **Two-phase commit**: solving is pure and staged; applying performs I/O
//! - **Type-driven design**: masks, ids and settings are distinct types
//! - **No unsafe**: hardware is reached only through the HAL traits
//! - **Explicit error handling**: every fallible operation returns `Result`

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]

/// Hardware Abstraction Layer
///
/// Register field access and auxiliary processor commands.
pub mod hal;

/// Digital Signal Processing
///
/// Channel filter design and gain conversion.
pub mod dsp;

/// Carrier Reconfiguration Pipeline
///
/// Validation, band assignment, NCO, link, filter and delay stages.
pub mod carrier;

/// Device Control
///
/// Solve / apply state machine and readback.
pub mod device;

/// Error types
pub mod error;

/// Shared types used across modules
pub mod types;

/// System configuration and constants
pub mod config;

pub use device::Transceiver;
pub use error::{ApplyError, CapacityError, Error, SolveError, ValidationError};

/// Prelude module for common imports
pub mod prelude {
    //! Convenient re-exports for common types and traits.

    pub use crate::config::*;
    pub use crate::types::*;

    pub use crate::carrier::chain::{BandInit, ChainInit, ChannelInit};
    pub use crate::carrier::filter::{FilterApplication, FilterPresets, FilterSelection};
    pub use crate::carrier::link::CarrierJesdCfg;
    pub use crate::carrier::solution::{ReconfigRequest, ReconfigSolution};
    pub use crate::device::{Phase, Transceiver};
    pub use crate::error::*;
    pub use crate::hal::firmware::{CommandResponse, FirmwareLink, ProcessorId, ProcessorTable};
    pub use crate::hal::registers::{BaseAddress, Field, RegisterAccess};
}
