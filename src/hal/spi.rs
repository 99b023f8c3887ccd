//! SPI Register Bus
//!
//! Byte-wide device registers behind a 16-bit address, read flag in bit 15.
//! Named fields are resolved to byte ranges by a [`FieldMap`] and updated with
//! read-modify-write so neighbouring bits are preserved.

use embedded_hal::spi::SpiDevice;

use super::registers::{BaseAddress, BusResult, Field, RegisterAccess};
use crate::error::BusError;

/// Read flag in the address phase
const READ_FLAG: u16 = 0x8000;

/// Where a field lives in byte register space
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FieldLocation {
    /// Lowest byte register holding the field
    pub address: u16,
    /// Byte registers spanned, 1..=4, little-endian
    pub bytes: u8,
    /// Bit offset of the field within the span
    pub lsb: u8,
    /// Field width in bits
    pub width: u8,
}

impl FieldLocation {
    /// Field occupying whole byte registers
    #[must_use]
    pub const fn bytes(address: u16, bytes: u8) -> Self {
        Self {
            address,
            bytes,
            lsb: 0,
            width: bytes * 8,
        }
    }

    /// Single bit of one byte register
    #[must_use]
    pub const fn bit(address: u16, bit: u8) -> Self {
        Self {
            address,
            bytes: 1,
            lsb: bit,
            width: 1,
        }
    }

    /// Mask of the field within the span
    #[must_use]
    pub const fn mask(&self) -> u32 {
        if self.width >= 32 {
            u32::MAX
        } else {
            ((1u32 << self.width) - 1) << self.lsb
        }
    }

    const fn is_valid(&self) -> bool {
        self.bytes >= 1
            && self.bytes <= 4
            && self.width >= 1
            && self.lsb as u32 + self.width as u32 <= self.bytes as u32 * 8
    }
}

/// Device-specific field layout
pub trait FieldMap {
    /// Resolve a field of the block at `base`, `None` if the device lacks it
    fn locate(&self, base: BaseAddress, field: Field) -> Option<FieldLocation>;
}

/// Register bus over an SPI device
pub struct SpiRegisterBus<SPI, M> {
    spi: SPI,
    map: M,
}

impl<SPI: SpiDevice, M: FieldMap> SpiRegisterBus<SPI, M> {
    /// Create a bus from an SPI device and the device's field map
    #[must_use]
    pub fn new(spi: SPI, map: M) -> Self {
        Self { spi, map }
    }

    /// Release the SPI device
    pub fn release(self) -> SPI {
        self.spi
    }

    /// Write a single byte register
    pub fn write_reg(&mut self, address: u16, value: u8) -> BusResult<()> {
        let [hi, lo] = (address & !READ_FLAG).to_be_bytes();
        self.spi
            .write(&[hi, lo, value])
            .map_err(|_| BusError::Transfer)
    }

    /// Read a single byte register
    pub fn read_reg(&mut self, address: u16) -> BusResult<u8> {
        let [hi, lo] = (address | READ_FLAG).to_be_bytes();
        let mut frame = [hi, lo, 0];
        self.spi
            .transfer_in_place(&mut frame)
            .map_err(|_| BusError::Transfer)?;
        Ok(frame[2])
    }

    fn locate(&self, base: BaseAddress, field: Field) -> BusResult<FieldLocation> {
        self.map
            .locate(base, field)
            .filter(FieldLocation::is_valid)
            .ok_or(BusError::Unmapped)
    }

    fn read_span(&mut self, loc: FieldLocation) -> BusResult<u32> {
        let mut raw = 0u32;
        for i in 0..loc.bytes {
            let byte = self.read_reg(loc.address.wrapping_add(u16::from(i)))?;
            raw |= u32::from(byte) << (8 * u32::from(i));
        }
        Ok(raw)
    }
}

impl<SPI: SpiDevice, M: FieldMap> RegisterAccess for SpiRegisterBus<SPI, M> {
    fn write_field(&mut self, base: BaseAddress, field: Field, value: u32) -> BusResult<()> {
        let loc = self.locate(base, field)?;
        let mask = loc.mask();
        let full_span = u32::from(loc.width) == u32::from(loc.bytes) * 8;

        let current = if full_span { 0 } else { self.read_span(loc)? };
        let updated = (current & !mask) | ((value << loc.lsb) & mask);

        for i in 0..loc.bytes {
            let byte = (updated >> (8 * u32::from(i))) as u8;
            self.write_reg(loc.address.wrapping_add(u16::from(i)), byte)?;
        }
        Ok(())
    }

    fn read_field(&mut self, base: BaseAddress, field: Field) -> BusResult<u32> {
        let loc = self.locate(base, field)?;
        Ok((self.read_span(loc)? & loc.mask()) >> loc.lsb)
    }
}
