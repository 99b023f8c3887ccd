//! Carrier NCO programming
//!
//! Receive mixes each carrier from its band center down to baseband, transmit
//! mixes baseband up to the carrier. Both use one shift convention with the
//! sign set by [`MixerDirection`], so `band + sign * shift` always lands on the
//! carrier center.

use crate::carrier::band::BandPlan;
use crate::config::{MAX_CARRIERS, MAX_NCO_SHIFT_KHZ};
use crate::error::{SolveResult, ValidationError};
use crate::types::{CarrierId, Direction, Profile};

/// Which way the carrier mixer translates
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MixerDirection {
    /// Carrier to baseband (receive)
    Downconvert,
    /// Baseband to carrier (transmit)
    Upconvert,
}

impl MixerDirection {
    /// Sign applied to the carrier offset from band center
    #[must_use]
    pub const fn sign(self) -> i64 {
        match self {
            Self::Downconvert => 1,
            Self::Upconvert => -1,
        }
    }
}

impl From<Direction> for MixerDirection {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Rx => Self::Downconvert,
            Direction::Tx => Self::Upconvert,
        }
    }
}

/// NCO shift for a carrier
#[must_use]
pub fn frequency_shift(direction: MixerDirection, band_center_khz: i32, carrier_khz: i32) -> i64 {
    direction.sign() * (i64::from(carrier_khz) - i64::from(band_center_khz))
}

/// Carrier center reached by a shift
#[must_use]
pub fn carrier_frequency(direction: MixerDirection, band_center_khz: i32, shift_khz: i64) -> i64 {
    i64::from(band_center_khz) + direction.sign() * shift_khz
}

/// NCO setting of one carrier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NcoSetting {
    /// Shift from band center
    pub frequency_shift_khz: i32,
    /// Phase offset in degrees
    pub phase_degrees: u32,
    /// Mixer runs
    pub mixer_enable: bool,
}

impl NcoSetting {
    /// Mixer off
    pub const DISABLED: Self = Self {
        frequency_shift_khz: 0,
        phase_degrees: 0,
        mixer_enable: false,
    };
}

/// Compute every carrier's NCO for one profile
///
/// The shift must stay within half the band rate and the absolute NCO limit.
pub fn reconfigure(
    direction: Direction,
    profile_idx: u8,
    profile: &Profile,
    plan: &BandPlan,
) -> SolveResult<[NcoSetting; MAX_CARRIERS]> {
    let mixer = MixerDirection::from(direction);
    let mut settings = [NcoSetting::DISABLED; MAX_CARRIERS];

    for (idx, carrier) in profile.enabled_carriers() {
        let id = CarrierId::new(profile_idx as usize, idx);
        let Some(band) = plan.assignment_of(idx) else {
            continue;
        };

        let shift = frequency_shift(mixer, band.center_khz, carrier.center_frequency_khz);
        let limit = i64::from(MAX_NCO_SHIFT_KHZ).min(i64::from(band.sample_rate_khz / 2));
        if shift.abs() > limit {
            return Err(ValidationError::NcoRange {
                carrier: id,
                shift_khz: shift.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32,
            }
            .into());
        }

        settings[idx] = NcoSetting {
            frequency_shift_khz: shift as i32,
            phase_degrees: carrier.nco_phase_degrees,
            mixer_enable: true,
        };
    }
    Ok(settings)
}
