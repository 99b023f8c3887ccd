//! Register Field Access
//!
//! The carrier datapath is programmed through named fields at a base address
//! that selects the direction and channel (or the shared link block). Field
//! layout is owned by the implementor of [`RegisterAccess`].

use core::fmt;

use crate::error::BusError;
use crate::types::Direction;

/// Register operation result
pub type BusResult<T> = Result<T, BusError>;

/// Base address of a register block
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BaseAddress(u32);

impl BaseAddress {
    /// Receive carrier datapath, channel 0
    const RX_CHANNEL_BASE: u32 = 0x6000_0000;
    /// Transmit carrier datapath, channel 0
    const TX_CHANNEL_BASE: u32 = 0x6100_0000;
    /// Spacing between channel blocks
    const CHANNEL_STRIDE: u32 = 0x0001_0000;
    /// Receive link (framer) block
    const RX_LINK_BASE: u32 = 0x6200_0000;
    /// Transmit link (deframer) block
    const TX_LINK_BASE: u32 = 0x6300_0000;

    /// Carrier datapath block of one channel
    #[must_use]
    pub const fn channel(direction: Direction, channel: usize) -> Self {
        let base = match direction {
            Direction::Rx => Self::RX_CHANNEL_BASE,
            Direction::Tx => Self::TX_CHANNEL_BASE,
        };
        Self(base + channel as u32 * Self::CHANNEL_STRIDE)
    }

    /// Shared transport link block
    #[must_use]
    pub const fn link(direction: Direction) -> Self {
        match direction {
            Direction::Rx => Self(Self::RX_LINK_BASE),
            Direction::Tx => Self(Self::TX_LINK_BASE),
        }
    }

    /// Raw address
    #[must_use]
    pub const fn addr(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for BaseAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BaseAddress({:#010X})", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for BaseAddress {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=u32:#010X}", self.0);
    }
}

/// Named register field
///
/// Band fields take a band index, carrier fields a carrier index, shuffle
/// fields a processing position, crossbar fields a link slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Field {
    /// Band datapath enable
    BandEnable(u8),
    /// Band center relative to LO (two's complement kHz)
    BandCenterFrequency(u8),
    /// Carrier mixer / NCO enable
    CarrierMixerEnable(u8),
    /// Band the carrier is routed through
    CarrierBandSelect(u8),
    /// Carrier NCO shift (two's complement kHz)
    CarrierNcoFrequency(u8),
    /// Carrier NCO phase (degrees)
    CarrierNcoPhase(u8),
    /// Carrier decimation / interpolation ratio
    CarrierRatio(u8),
    /// Last halfband stage of the carrier pipeline
    CarrierDataPipeStop(u8),
    /// Channel filter bypass
    CarrierBypassFilter(u8),
    /// Channel filter has an odd tap count
    CarrierOddTaps(u8),
    /// Link slot carrying the carrier
    CarrierSlot(u8),
    /// Delay compensation buffer (cycles)
    CarrierDelayBuffer(u8),
    /// Carrier digital gain multiplier (7.16)
    CarrierGain(u8),
    /// Carrier digital gain enable
    CarrierGainEnable(u8),
    /// Carrier processed at a shuffle position
    ShufflePosition(u8),
    /// Source of one link crossbar slot
    SampleXbarSlot(u8),
    /// Link sample rate (kHz)
    LinkSampleRate,
    /// Link rate over fastest carrier rate
    LinkRatio,
}

/// Register field access capability
///
/// Every call blocks until the transfer is acknowledged or fails.
pub trait RegisterAccess {
    /// Write `value` to `field` of the block at `base`
    fn write_field(&mut self, base: BaseAddress, field: Field, value: u32) -> BusResult<()>;

    /// Read `field` of the block at `base`
    fn read_field(&mut self, base: BaseAddress, field: Field) -> BusResult<u32>;
}

impl<T: RegisterAccess + ?Sized> RegisterAccess for &mut T {
    fn write_field(&mut self, base: BaseAddress, field: Field, value: u32) -> BusResult<()> {
        (**self).write_field(base, field, value)
    }

    fn read_field(&mut self, base: BaseAddress, field: Field) -> BusResult<u32> {
        (**self).read_field(base, field)
    }
}

/// Encode a signed kHz value for a two's complement field
#[must_use]
pub const fn signed_field(value: i32) -> u32 {
    value as u32
}

/// Decode a two's complement field into signed kHz
#[must_use]
pub const fn field_signed(raw: u32) -> i32 {
    raw as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_blocks_do_not_overlap_link() {
        let last = BaseAddress::channel(Direction::Rx, 7).addr();
        assert!(last < BaseAddress::link(Direction::Rx).addr());
        assert_ne!(
            BaseAddress::channel(Direction::Rx, 0),
            BaseAddress::channel(Direction::Tx, 0)
        );
    }

    #[test]
    fn signed_fields_round_trip() {
        for v in [-250_000, -1, 0, 1, 491_520] {
            assert_eq!(field_signed(signed_field(v)), v);
        }
    }
}
