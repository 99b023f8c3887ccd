//! Shared types used across the carrier pipeline
//!
//! This module defines domain-specific types that enforce invariants
//! at compile time and provide type safety throughout the codebase.
//! Frequencies are integer kHz relative to the channel LO.

use core::fmt;

use crate::config::{MAX_CARRIERS, MAX_CHANNELS};

/// Datapath direction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Receive chain (decimating, down-converting)
    #[default]
    Rx,
    /// Transmit chain (interpolating, up-converting)
    Tx,
}

impl Direction {
    /// Index into per-direction state tables
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Rx => 0,
            Self::Tx => 1,
        }
    }
}

/// Set of channels, one bit per channel (bit 0 = channel 0)
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ChannelMask(u8);

impl ChannelMask {
    /// No channels
    pub const NONE: Self = Self(0);

    /// Every channel on the device
    pub const ALL: Self = Self(u8::MAX);

    /// Create a mask from raw bits
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Mask holding a single channel, `None` if out of range
    #[must_use]
    pub const fn single(channel: usize) -> Option<Self> {
        if channel < MAX_CHANNELS {
            Some(Self(1 << channel))
        } else {
            None
        }
    }

    /// Raw bits
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// True when no channel is selected
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when `channel` is selected
    #[must_use]
    pub const fn contains(self, channel: usize) -> bool {
        channel < MAX_CHANNELS && (self.0 >> channel) & 1 == 1
    }

    /// True when every channel of `other` is also in `self`
    #[must_use]
    pub const fn covers(self, other: Self) -> bool {
        other.0 & !self.0 == 0
    }

    /// True when the masks share at least one channel
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Union of both masks
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Channels of `self` not in `other`
    #[must_use]
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Number of selected channels
    #[must_use]
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Iterate selected channel indices in ascending order
    pub fn channels(self) -> impl Iterator<Item = usize> {
        (0..MAX_CHANNELS).filter(move |&ch| self.contains(ch))
    }
}

impl fmt::Debug for ChannelMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChannelMask({:#010b})", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ChannelMask {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=u8:#010b}", self.0);
    }
}

/// Set of carriers within a profile, one bit per carrier index
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CarrierMask(u8);

impl CarrierMask {
    /// No carriers
    pub const NONE: Self = Self(0);

    /// Create a mask from raw bits
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Raw bits
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// True when no carrier is selected
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when `carrier` is selected
    #[must_use]
    pub const fn contains(self, carrier: usize) -> bool {
        carrier < MAX_CARRIERS && (self.0 >> carrier) & 1 == 1
    }

    /// Mask with `carrier` added (returns new mask)
    #[must_use]
    pub const fn with(self, carrier: usize) -> Self {
        if carrier < MAX_CARRIERS {
            Self(self.0 | (1 << carrier))
        } else {
            self
        }
    }

    /// Number of selected carriers
    #[must_use]
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Iterate selected carrier indices in ascending order
    pub fn carriers(self) -> impl Iterator<Item = usize> {
        (0..MAX_CARRIERS).filter(move |&c| self.contains(c))
    }
}

/// One independently tunable carrier
///
/// Immutable once submitted to a solve.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CarrierSpec {
    /// Carrier is part of the configuration
    pub enabled: bool,
    /// Center frequency relative to the channel LO
    pub center_frequency_khz: i32,
    /// Carrier output sample rate
    pub sample_rate_khz: u32,
    /// Instantaneous (occupied) bandwidth
    pub ibw_khz: u32,
    /// Carrier NCO phase offset, 0..360
    pub nco_phase_degrees: u32,
}

impl CarrierSpec {
    /// A disabled carrier slot
    pub const DISABLED: Self = Self {
        enabled: false,
        center_frequency_khz: 0,
        sample_rate_khz: 0,
        ibw_khz: 0,
        nco_phase_degrees: 0,
    };

    /// Create an enabled carrier with zero phase
    #[must_use]
    pub const fn new(center_frequency_khz: i32, sample_rate_khz: u32, ibw_khz: u32) -> Self {
        Self {
            enabled: true,
            center_frequency_khz,
            sample_rate_khz,
            ibw_khz,
            nco_phase_degrees: 0,
        }
    }

    /// Set the NCO phase (returns new carrier)
    #[must_use]
    pub const fn with_phase(self, nco_phase_degrees: u32) -> Self {
        Self {
            nco_phase_degrees,
            ..self
        }
    }

    /// Lowest occupied frequency
    #[must_use]
    pub const fn low_edge_khz(&self) -> i64 {
        self.center_frequency_khz as i64 - (self.ibw_khz / 2) as i64
    }

    /// Highest occupied frequency
    #[must_use]
    pub const fn high_edge_khz(&self) -> i64 {
        self.center_frequency_khz as i64 + (self.ibw_khz - self.ibw_khz / 2) as i64
    }
}

/// A group of channels reconfigured together from one carrier set
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Profile {
    /// Channels bound to this profile
    pub channel_mask: ChannelMask,
    /// Carrier definitions, indexed by carrier number
    pub carriers: [CarrierSpec; MAX_CARRIERS],
}

impl Profile {
    /// Create a profile with every carrier disabled
    #[must_use]
    pub const fn new(channel_mask: ChannelMask) -> Self {
        Self {
            channel_mask,
            carriers: [CarrierSpec::DISABLED; MAX_CARRIERS],
        }
    }

    /// Place `carrier` at `index` (returns new profile, unchanged if out of range)
    #[must_use]
    pub fn with_carrier(mut self, index: usize, carrier: CarrierSpec) -> Self {
        if let Some(slot) = self.carriers.get_mut(index) {
            *slot = carrier;
        }
        self
    }

    /// Enabled carriers with their indices
    pub fn enabled_carriers(&self) -> impl Iterator<Item = (usize, &CarrierSpec)> {
        self.carriers.iter().enumerate().filter(|(_, c)| c.enabled)
    }

    /// Mask of enabled carriers
    #[must_use]
    pub fn enabled_mask(&self) -> CarrierMask {
        self.enabled_carriers()
            .fold(CarrierMask::NONE, |mask, (idx, _)| mask.with(idx))
    }
}

/// Identifies one carrier of one profile in a batch
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CarrierId {
    /// Profile index within the batch
    pub profile: u8,
    /// Carrier index within the profile
    pub carrier: u8,
}

impl CarrierId {
    /// Create a carrier id
    #[must_use]
    pub const fn new(profile: usize, carrier: usize) -> Self {
        Self {
            profile: profile as u8,
            carrier: carrier as u8,
        }
    }
}

impl fmt::Display for CarrierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "profile {} carrier {}", self.profile, self.carrier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_mask_iterates_in_order() {
        let mask = ChannelMask::from_bits(0b1010_0001);
        let channels: heapless::Vec<usize, 8> = mask.channels().collect();
        assert_eq!(channels.as_slice(), &[0, 5, 7]);
    }

    #[test]
    fn channel_mask_single_out_of_range() {
        assert!(ChannelMask::single(MAX_CHANNELS).is_none());
        assert_eq!(ChannelMask::single(3).map(ChannelMask::bits), Some(0b1000));
    }

    #[test]
    fn carrier_edges_cover_odd_bandwidth() {
        let c = CarrierSpec::new(1000, 30_720, 21);
        assert_eq!(c.high_edge_khz() - c.low_edge_khz(), 21);
    }

    #[test]
    fn profile_enabled_mask() {
        let p = Profile::new(ChannelMask::from_bits(1))
            .with_carrier(0, CarrierSpec::new(0, 7680, 5000))
            .with_carrier(3, CarrierSpec::new(10_000, 7680, 5000));
        assert_eq!(p.enabled_mask().bits(), 0b1001);
    }
}
