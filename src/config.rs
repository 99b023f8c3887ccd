//! Device configuration and hardware constants
//!
//! This module defines compile-time constants for the carrier datapath of the
//! transceiver, plus the runtime-tunable limits consumed by the solver.
//! All capacities, ranges and tuning parameters are centralized here.

/// Maximum number of carrier profiles in one reconfiguration batch
pub const MAX_PROFILES: usize = 4;

/// Maximum number of carriers per profile
pub const MAX_CARRIERS: usize = 8;

/// Number of receive (or transmit) channels on the device
pub const MAX_CHANNELS: usize = 8;

/// Number of decimation/interpolation bands per channel
pub const NUM_BANDS: usize = 2;

/// Shared channel filter coefficient table size (entries)
pub const COEFF_TABLE_CAPACITY: usize = 648;

/// Coefficients carried by one firmware upload command
pub const COEFF_LOAD_CHUNK_LEN: usize = 64;

/// Longest filter a single carrier may use
pub const MAX_TAPS_PER_CARRIER: usize = 128;

/// Transport link carrier slots
pub const MAX_CARRIER_SLOTS: usize = 64;

/// Supported decimation / interpolation divisors, ascending
pub const SUPPORTED_RATIOS: [u32; 12] = [1, 2, 3, 4, 6, 8, 12, 16, 24, 32, 48, 64];

/// Absolute limit on a carrier NCO shift
pub const MAX_NCO_SHIFT_KHZ: i32 = 500_000;

/// Highest carrier sample rate the datapath accepts
pub const MAX_CARRIER_SAMPLE_RATE_KHZ: u32 = 983_040;

/// Largest firmware command payload in bytes
pub const MAX_COMMAND_PAYLOAD: usize = 256;

/// Carrier digital gain lower limit (mdB)
pub const CARRIER_GAIN_MIN_MDB: i32 = -90_000;

/// Carrier digital gain upper limit (mdB)
pub const CARRIER_GAIN_MAX_MDB: i32 = 36_000;

/// Gain multiplier register value for 0 dB
pub const UNITY_GAIN_MULTIPLIER: u32 = 65_535;

/// Carrier datapath clock
pub const DATAPATH_CLOCK_KHZ: u32 = 983_040;

/// Worst-case inter-carrier delay mismatch accepted by the solver (clock cycles)
pub const DELAY_THRESHOLD_CYCLES: u32 = 7;

/// Delay buffers are sized in multiples of this many cycles
pub const DELAY_GRANULARITY_CYCLES: u32 = 8;

/// Extra latency for each position a carrier sits later in the shuffle order
pub const SLOT_CYCLES: u32 = 2;

/// Pipeline latency of one halfband decimation / interpolation stage (clock cycles)
pub const HALFBAND_LATENCY_CYCLES: u32 = 11;

/// Auxiliary processors that can own channels
pub const MAX_PROCESSORS: usize = 4;

/// Link crossbar value for a slot that carries no carrier
pub const UNUSED_SLOT: u32 = 0xFF;

/// Longest single-carrier delay buffer (clock cycles)
pub const MAX_DELAY_BUFFER_CYCLES: u32 = 4_096;

/// Delay buffer memory shared by all carriers of a channel (clock cycles)
pub const DELAY_BUFFER_CAPACITY_CYCLES: u32 = 16_384;

/// Shuffle orderings evaluated before the delay search gives up
pub const MAX_SHUFFLE_CANDIDATES: usize = 5_040;

/// Runtime-tunable solver limits
///
/// Defaults come from the constants above. Tests and bring-up code may tighten
/// them to exercise failure paths.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceLimits {
    /// Carrier datapath clock
    pub datapath_clock_khz: u32,
    /// Slots available on the transport link
    pub carrier_slots: usize,
    /// Accepted delay mismatch (cycles)
    pub delay_threshold_cycles: u32,
    /// Delay buffer granularity (cycles)
    pub delay_granularity_cycles: u32,
    /// Latency added per shuffle position (cycles)
    pub slot_cycles: u32,
    /// Per-carrier delay buffer limit (cycles)
    pub max_delay_buffer_cycles: u32,
    /// Per-channel delay buffer memory (cycles)
    pub delay_buffer_capacity_cycles: u32,
    /// Search budget for the slot shuffle
    pub max_shuffle_candidates: usize,
}

impl DeviceLimits {
    /// Limits matching the production datapath
    pub const DEFAULT: Self = Self {
        datapath_clock_khz: DATAPATH_CLOCK_KHZ,
        carrier_slots: MAX_CARRIER_SLOTS,
        delay_threshold_cycles: DELAY_THRESHOLD_CYCLES,
        delay_granularity_cycles: DELAY_GRANULARITY_CYCLES,
        slot_cycles: SLOT_CYCLES,
        max_delay_buffer_cycles: MAX_DELAY_BUFFER_CYCLES,
        delay_buffer_capacity_cycles: DELAY_BUFFER_CAPACITY_CYCLES,
        max_shuffle_candidates: MAX_SHUFFLE_CANDIDATES,
    };

    /// Replace the delay mismatch threshold (returns new limits)
    #[must_use]
    pub const fn with_delay_threshold(self, delay_threshold_cycles: u32) -> Self {
        Self {
            delay_threshold_cycles,
            ..self
        }
    }

    /// Replace the usable slot count (returns new limits)
    #[must_use]
    pub const fn with_carrier_slots(self, carrier_slots: usize) -> Self {
        Self {
            carrier_slots,
            ..self
        }
    }
}

impl Default for DeviceLimits {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Index of a supported ratio, if `ratio` is one
#[must_use]
pub fn ratio_index(ratio: u32) -> Option<usize> {
    SUPPORTED_RATIOS.iter().position(|&r| r == ratio)
}
