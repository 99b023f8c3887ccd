//! Error taxonomy for the carrier pipeline
//!
//! Solve-phase errors are raised before any hardware or firmware I/O and are
//! always safe to retry after correcting the input. Apply-phase errors leave
//! the device in whatever state the completed writes produced.

use thiserror::Error;

use crate::types::{CarrierId, ChannelMask};

/// Band index type used in error reports
pub type BandIndex = u8;

/// Structural or consistency problem in a profile batch
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ValidationError {
    /// Channel mask selects no channel
    #[error("profile {profile}: empty channel mask")]
    EmptyChannelMask {
        /// Offending profile
        profile: u8,
    },
    /// Channel mask names a channel the device does not have initialized
    #[error("profile {profile}: channel mask {mask:?} outside supported channels")]
    ChannelOutOfRange {
        /// Offending profile
        profile: u8,
        /// Mask as submitted
        mask: ChannelMask,
    },
    /// Two profiles in one batch share a channel
    #[error("profile {profile}: channel {channel} already claimed by profile {other}")]
    ChannelReused {
        /// Offending profile
        profile: u8,
        /// Profile that claimed the channel first
        other: u8,
        /// Shared channel
        channel: u8,
    },
    /// Channel was initialized under another profile
    #[error("profile {profile}: channel {channel} was initialized with a different profile")]
    ProfileMismatch {
        /// Offending profile
        profile: u8,
        /// Channel that cannot move
        channel: u8,
    },
    /// Enabled carrier with a zero or excessive sample rate
    #[error("{carrier}: sample rate {sample_rate_khz} kHz unsupported")]
    SampleRate {
        /// Offending carrier
        carrier: CarrierId,
        /// Rate as submitted
        sample_rate_khz: u32,
    },
    /// Enabled carrier with zero bandwidth or bandwidth above its sample rate
    #[error("{carrier}: bandwidth {ibw_khz} kHz unsupported")]
    Bandwidth {
        /// Offending carrier
        carrier: CarrierId,
        /// Bandwidth as submitted
        ibw_khz: u32,
    },
    /// Carrier edges fall outside the channel RF passband
    #[error("{carrier}: outside the channel RF span")]
    OutsideSpan {
        /// Offending carrier
        carrier: CarrierId,
    },
    /// NCO phase outside 0..360 degrees
    #[error("{carrier}: phase {degrees} out of range")]
    Phase {
        /// Offending carrier
        carrier: CarrierId,
        /// Phase as submitted
        degrees: u32,
    },
    /// NCO shift outside the supported span
    #[error("{carrier}: NCO shift {shift_khz} kHz out of range")]
    NcoRange {
        /// Offending carrier
        carrier: CarrierId,
        /// Computed shift
        shift_khz: i32,
    },
    /// Channels of one profile disagree on a band center
    #[error("profile {profile}: channel {channel} band {band} center differs from the rest of the profile")]
    BandCenterMismatch {
        /// Offending profile
        profile: u8,
        /// First channel that disagrees
        channel: u8,
        /// Band in question
        band: BandIndex,
    },
    /// Band rate / carrier rate is not one of the supported divisors
    #[error("{carrier}: rate ratio {numerator}/{denominator} is not a supported divisor")]
    UnsupportedRatio {
        /// Offending carrier (the fastest carrier for the link ratio)
        carrier: CarrierId,
        /// Faster rate
        numerator: u32,
        /// Slower rate
        denominator: u32,
    },
    /// Two carriers requested the same link slot
    #[error("{carrier}: slot {slot} already taken")]
    SlotConflict {
        /// Carrier that asked second
        carrier: CarrierId,
        /// Contested slot
        slot: u8,
    },
    /// Requested link slot does not exist
    #[error("{carrier}: slot {slot} beyond the link")]
    SlotRange {
        /// Offending carrier
        carrier: CarrierId,
        /// Requested slot
        slot: u8,
    },
    /// Filter selection does not describe the batch
    #[error("profile {profile}: filter selection missing or mismatched")]
    FilterSelection {
        /// Offending profile
        profile: u8,
    },
    /// No preset exists for the requested application and carrier
    #[error("{carrier}: no filter preset for the requested application")]
    NoPreset {
        /// Offending carrier
        carrier: CarrierId,
    },
    /// Caller coefficients are empty or longer than a carrier may use
    #[error("{carrier}: {taps} filter taps unsupported")]
    FilterTaps {
        /// Offending carrier
        carrier: CarrierId,
        /// Tap count as supplied
        taps: usize,
    },
}

/// A fixed-size resource ran out
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CapacityError {
    /// More profiles than the device supports
    #[error("{count} profiles submitted, at most {max} allowed")]
    TooManyProfiles {
        /// Profiles submitted
        count: usize,
        /// Device limit
        max: usize,
    },
    /// Neither band can hold the carrier
    #[error("{carrier}: no band can hold the carrier")]
    Band {
        /// Offending carrier
        carrier: CarrierId,
    },
    /// Coefficient table overflow
    #[error("{carrier}: coefficients need {required} entries, table holds {capacity}")]
    CoefficientTable {
        /// Carrier whose taps overflowed the table
        carrier: CarrierId,
        /// Entries needed including this carrier
        required: usize,
        /// Table size
        capacity: usize,
    },
    /// No free link slot
    #[error("{carrier}: no free link slot")]
    Slots {
        /// Carrier left without a slot
        carrier: CarrierId,
    },
    /// Every shuffle candidate needs more delay buffer memory than a channel has
    #[error("profile {profile}: delay buffers exceed channel memory")]
    DelayBuffer {
        /// Offending profile
        profile: u8,
    },
}

/// Failure of the pure solve phase
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SolveError {
    /// Bad input shape or inconsistency
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Resource exhausted
    #[error(transparent)]
    Capacity(#[from] CapacityError),
    /// No slot shuffle keeps delay mismatch under the threshold
    #[error("profile {profile}: best delay mismatch {best_cycles} cycles exceeds {threshold_cycles}")]
    DelayMismatch {
        /// Offending profile
        profile: u8,
        /// Smallest mismatch found within the search budget
        best_cycles: u32,
        /// Accepted mismatch
        threshold_cycles: u32,
    },
}

/// Transport failure reaching registers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// Transfer failed on the wire
    #[error("register transfer failed")]
    Transfer,
    /// Field has no address on this device
    #[error("field not mapped")]
    Unmapped,
}

/// Transport failure reaching an auxiliary processor
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("command transport to processor {processor} failed")]
pub struct TransportError {
    /// Processor that could not be reached
    pub processor: u8,
}

/// Failure of the commit phase
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ApplyError {
    /// Apply called with nothing solved
    #[error("no solution staged")]
    NoSolutionStaged,
    /// Register access failed
    #[error(transparent)]
    Bus(#[from] BusError),
    /// Command transport failed
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Firmware answered with an error code
    #[error("processor {processor} returned firmware error {code:#x}")]
    Firmware {
        /// Responding processor
        processor: u8,
        /// Firmware's own error code
        code: u32,
    },
    /// Every candidate processor answered, but some channels went unhandled
    #[error("firmware did not execute on all requested channels ({handled:?} of {requested:?})")]
    IncompleteDispatch {
        /// Channels the command targeted
        requested: ChannelMask,
        /// Channels acknowledged
        handled: ChannelMask,
    },
    /// Encoded command does not fit the payload limit
    #[error("command payload of {len} bytes exceeds limit")]
    PayloadTooLarge {
        /// Encoded size
        len: usize,
    },
    /// Channel or carrier selection invalid for a direct register operation
    #[error("invalid channel or carrier selection")]
    InvalidSelection,
    /// Gain outside the supported range
    #[error("gain {gain_mdb} mdB out of range")]
    GainRange {
        /// Gain as requested
        gain_mdb: i32,
    },
}

/// Any failure of the combined solve-then-apply entry point
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Solve failed; hardware untouched
    #[error(transparent)]
    Solve(#[from] SolveError),
    /// Apply failed; hardware may be partially updated
    #[error(transparent)]
    Apply(#[from] ApplyError),
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Self::Solve(err.into())
    }
}

impl From<CapacityError> for Error {
    fn from(err: CapacityError) -> Self {
        Self::Solve(err.into())
    }
}

/// Result of a solve-phase step
pub type SolveResult<T> = Result<T, SolveError>;

/// Result of an apply-phase step
pub type ApplyResult<T> = Result<T, ApplyError>;
