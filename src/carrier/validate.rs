//! Profile batch validation
//!
//! Structural checks that need nothing but the batch and the chain's
//! initialization. Runs first so later stages can assume well-formed input.

use crate::carrier::chain::ChainInit;
use crate::config::{MAX_CARRIER_SAMPLE_RATE_KHZ, MAX_CHANNELS, MAX_PROFILES};
use crate::error::{CapacityError, SolveResult, ValidationError};
use crate::types::{CarrierId, CarrierSpec, Profile};

/// Check a whole batch, reporting the first problem found
///
/// Profiles are checked in index order, carriers within a profile in carrier
/// order.
pub fn validate_batch(init: &ChainInit, profiles: &[Profile]) -> SolveResult<()> {
    if profiles.len() > MAX_PROFILES {
        return Err(CapacityError::TooManyProfiles {
            count: profiles.len(),
            max: MAX_PROFILES,
        }
        .into());
    }

    let mut claimed: [Option<u8>; MAX_CHANNELS] = [None; MAX_CHANNELS];
    for (idx, profile) in profiles.iter().enumerate() {
        validate_channels(init, idx as u8, profile, &mut claimed)?;
        for (c, carrier) in profile.enabled_carriers() {
            validate_carrier(init, profile, CarrierId::new(idx, c), carrier)?;
        }
    }
    Ok(())
}

fn validate_channels(
    init: &ChainInit,
    profile_idx: u8,
    profile: &Profile,
    claimed: &mut [Option<u8>; MAX_CHANNELS],
) -> Result<(), ValidationError> {
    let mask = profile.channel_mask;
    if mask.is_empty() {
        return Err(ValidationError::EmptyChannelMask {
            profile: profile_idx,
        });
    }
    if !init.available().covers(mask) {
        return Err(ValidationError::ChannelOutOfRange {
            profile: profile_idx,
            mask,
        });
    }

    for ch in mask.channels() {
        if let Some(other) = claimed[ch] {
            return Err(ValidationError::ChannelReused {
                profile: profile_idx,
                other,
                channel: ch as u8,
            });
        }
        claimed[ch] = Some(profile_idx);

        if init.channels[ch].profile != Some(profile_idx) {
            return Err(ValidationError::ProfileMismatch {
                profile: profile_idx,
                channel: ch as u8,
            });
        }
    }
    Ok(())
}

fn validate_carrier(
    init: &ChainInit,
    profile: &Profile,
    id: CarrierId,
    carrier: &CarrierSpec,
) -> Result<(), ValidationError> {
    if carrier.sample_rate_khz == 0 || carrier.sample_rate_khz > MAX_CARRIER_SAMPLE_RATE_KHZ {
        return Err(ValidationError::SampleRate {
            carrier: id,
            sample_rate_khz: carrier.sample_rate_khz,
        });
    }
    if carrier.ibw_khz == 0 || carrier.ibw_khz > carrier.sample_rate_khz {
        return Err(ValidationError::Bandwidth {
            carrier: id,
            ibw_khz: carrier.ibw_khz,
        });
    }
    if carrier.nco_phase_degrees >= 360 {
        return Err(ValidationError::Phase {
            carrier: id,
            degrees: carrier.nco_phase_degrees,
        });
    }

    for ch in profile.channel_mask.channels() {
        let half = init.channels[ch].half_span_khz();
        if carrier.low_edge_khz() < -half || carrier.high_edge_khz() > half {
            return Err(ValidationError::OutsideSpan { carrier: id });
        }
    }
    Ok(())
}
