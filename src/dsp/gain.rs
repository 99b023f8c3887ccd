//! Carrier Digital Gain
//!
//! The per-carrier gain register holds a linear multiplier where
//! [`UNITY_GAIN_MULTIPLIER`] is 0 dB. Gains are exchanged in mdB.

#[cfg(not(feature = "std"))]
use micromath::F32Ext;

use crate::config::{CARRIER_GAIN_MAX_MDB, CARRIER_GAIN_MIN_MDB, UNITY_GAIN_MULTIPLIER};

/// True when `gain_mdb` is within the supported range
#[must_use]
pub const fn in_range(gain_mdb: i32) -> bool {
    gain_mdb >= CARRIER_GAIN_MIN_MDB && gain_mdb <= CARRIER_GAIN_MAX_MDB
}

/// Multiplier register value for a gain, `None` outside the supported range
#[must_use]
pub fn to_multiplier(gain_mdb: i32) -> Option<u32> {
    if !in_range(gain_mdb) {
        return None;
    }
    let linear = 10.0f32.powf(gain_mdb as f32 / 20_000.0);
    Some((linear * UNITY_GAIN_MULTIPLIER as f32).round() as u32)
}

/// Gain in mdB for a multiplier register value
///
/// A zero multiplier (gain never programmed) reads as 0 mdB.
#[must_use]
pub fn from_multiplier(multiplier: u32) -> i32 {
    if multiplier == 0 {
        return 0;
    }
    let ratio = multiplier as f32 / UNITY_GAIN_MULTIPLIER as f32;
    let mdb = (20_000.0 * ratio.log10()).round() as i32;
    mdb.clamp(CARRIER_GAIN_MIN_MDB, CARRIER_GAIN_MAX_MDB)
}
