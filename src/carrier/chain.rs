//! Chain initialization
//!
//! What the device was brought up with: which channels exist, which profile
//! each channel belongs to, the RF passband and the two bands' rates. The
//! solver never changes any of this.

use crate::config::{MAX_CHANNELS, NUM_BANDS};
use crate::types::ChannelMask;

/// Initial configuration of one band
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BandInit {
    /// Band datapath is powered
    pub enabled: bool,
    /// Fixed center relative to LO, `None` lets the solver place it
    pub center_khz: Option<i32>,
    /// Bandwidth the band filter passes
    pub ibw_khz: u32,
    /// Band output sample rate
    pub sample_rate_khz: u32,
}

impl BandInit {
    /// Band that cannot carry anything
    pub const DISABLED: Self = Self {
        enabled: false,
        center_khz: None,
        ibw_khz: 0,
        sample_rate_khz: 0,
    };

    /// Enabled band whose center follows the carriers it receives
    #[must_use]
    pub const fn floating(sample_rate_khz: u32, ibw_khz: u32) -> Self {
        Self {
            enabled: true,
            center_khz: None,
            ibw_khz,
            sample_rate_khz,
        }
    }

    /// Enabled band pinned at `center_khz`
    #[must_use]
    pub const fn fixed(center_khz: i32, sample_rate_khz: u32, ibw_khz: u32) -> Self {
        Self {
            enabled: true,
            center_khz: Some(center_khz),
            ibw_khz,
            sample_rate_khz,
        }
    }
}

/// Initial configuration of one channel
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelInit {
    /// Profile the channel was initialized under, `None` if unused
    pub profile: Option<u8>,
    /// RF passband width, centered on LO
    pub rf_bandwidth_khz: u32,
    /// Band configuration
    pub bands: [BandInit; NUM_BANDS],
}

impl ChannelInit {
    /// Channel not brought up
    pub const UNUSED: Self = Self {
        profile: None,
        rf_bandwidth_khz: 0,
        bands: [BandInit::DISABLED; NUM_BANDS],
    };

    /// Channel in `profile` with the given passband and bands
    #[must_use]
    pub const fn new(profile: u8, rf_bandwidth_khz: u32, bands: [BandInit; NUM_BANDS]) -> Self {
        Self {
            profile: Some(profile),
            rf_bandwidth_khz,
            bands,
        }
    }

    /// Half of the RF passband
    #[must_use]
    pub const fn half_span_khz(&self) -> i64 {
        (self.rf_bandwidth_khz / 2) as i64
    }
}

/// Initial configuration of every channel of one direction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChainInit {
    /// Per-channel configuration
    pub channels: [ChannelInit; MAX_CHANNELS],
}

impl ChainInit {
    /// No channel brought up
    pub const EMPTY: Self = Self {
        channels: [ChannelInit::UNUSED; MAX_CHANNELS],
    };

    /// Set one channel (returns new init, unchanged if out of range)
    #[must_use]
    pub fn with_channel(mut self, channel: usize, init: ChannelInit) -> Self {
        if let Some(slot) = self.channels.get_mut(channel) {
            *slot = init;
        }
        self
    }

    /// Set every channel in `mask` (returns new init)
    #[must_use]
    pub fn with_channels(self, mask: ChannelMask, init: ChannelInit) -> Self {
        mask.channels()
            .fold(self, |chain, ch| chain.with_channel(ch, init))
    }

    /// Channel configuration, `None` if out of range
    #[must_use]
    pub fn channel(&self, channel: usize) -> Option<&ChannelInit> {
        self.channels.get(channel)
    }

    /// Channels that were brought up
    #[must_use]
    pub fn available(&self) -> ChannelMask {
        self.channels
            .iter()
            .enumerate()
            .filter(|(_, c)| c.profile.is_some())
            .fold(ChannelMask::NONE, |mask, (ch, _)| {
                ChannelMask::single(ch).map_or(mask, |m| mask.union(m))
            })
    }
}

impl Default for ChainInit {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn available_channels() {
        let band = [BandInit::floating(122_880, 100_000), BandInit::DISABLED];
        let chain = ChainInit::EMPTY
            .with_channels(ChannelMask::from_bits(0b0101), ChannelInit::new(0, 200_000, band))
            .with_channel(7, ChannelInit::new(1, 200_000, band));
        assert_eq!(chain.available().bits(), 0b1000_0101);
        assert_eq!(chain.channel(7).and_then(|c| c.profile), Some(1));
        assert!(chain.channel(8).is_none());
    }
}
