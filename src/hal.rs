//! Hardware Abstraction Layer
//!
//! Narrow interfaces to the two collaborators the carrier pipeline drives:
//! channel-scoped register fields and auxiliary-processor firmware commands.

pub mod registers;
pub mod firmware;

#[cfg(feature = "embedded")]
pub mod spi;
