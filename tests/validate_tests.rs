//! Profile Batch Validation Tests
//!
//! Structural checks run before any band, link or filter work.

mod common;

use common::*;
use sdr_carrier::carrier::validate::validate_batch;
use sdr_carrier::config::MAX_PROFILES;
use sdr_carrier::error::{CapacityError, SolveError, ValidationError};
use sdr_carrier::types::{CarrierId, ChannelMask, Profile};

fn profile0() -> Profile {
    Profile::new(PROFILE0_CHANNELS).with_carrier(0, lte(0))
}

fn profile1() -> Profile {
    Profile::new(PROFILE1_CHANNELS).with_carrier(0, lte(50_000))
}

fn validation(err: SolveError) -> ValidationError {
    match err {
        SolveError::Validation(v) => v,
        other => panic!("expected validation error, got {other:?}"),
    }
}

// =============================================================================
// Accepted batches
// =============================================================================

#[test]
fn two_profiles_accepted() {
    let init = chain(floating_bands());
    assert_eq!(validate_batch(&init, &[profile0(), profile1()]), Ok(()));
}

#[test]
fn subset_of_profile_channels_accepted() {
    let init = chain(floating_bands());
    let p = Profile::new(ChannelMask::from_bits(0b0001)).with_carrier(0, lte(1_000));
    assert_eq!(validate_batch(&init, &[p]), Ok(()));
}

#[test]
fn profile_without_carriers_accepted() {
    let init = chain(floating_bands());
    assert_eq!(validate_batch(&init, &[Profile::new(PROFILE0_CHANNELS)]), Ok(()));
}

// =============================================================================
// Batch shape
// =============================================================================

#[test]
fn too_many_profiles() {
    let init = chain(floating_bands());
    let batch = [profile0(); MAX_PROFILES + 1];
    assert_eq!(
        validate_batch(&init, &batch),
        Err(SolveError::Capacity(CapacityError::TooManyProfiles {
            count: MAX_PROFILES + 1,
            max: MAX_PROFILES,
        }))
    );
}

#[test]
fn empty_channel_mask() {
    let init = chain(floating_bands());
    let err = validate_batch(&init, &[Profile::new(ChannelMask::NONE)]).unwrap_err();
    assert_eq!(validation(err), ValidationError::EmptyChannelMask { profile: 0 });
}

#[test]
fn mask_outside_initialized_channels() {
    let init = chain(floating_bands());
    let mask = ChannelMask::from_bits(0b0001_0001);
    let err = validate_batch(&init, &[Profile::new(mask)]).unwrap_err();
    assert_eq!(
        validation(err),
        ValidationError::ChannelOutOfRange { profile: 0, mask }
    );
}

#[test]
fn channel_claimed_twice() {
    let init = chain(floating_bands());
    let err = validate_batch(&init, &[profile0(), profile0()]).unwrap_err();
    assert_eq!(
        validation(err),
        ValidationError::ChannelReused {
            profile: 1,
            other: 0,
            channel: 0,
        }
    );
}

#[test]
fn channel_cannot_change_profile() {
    let init = chain(floating_bands());
    // Profile 0 claiming channel 2, which was brought up under profile 1
    let p = Profile::new(ChannelMask::from_bits(0b0100)).with_carrier(0, lte(0));
    let err = validate_batch(&init, &[p]).unwrap_err();
    assert_eq!(
        validation(err),
        ValidationError::ProfileMismatch {
            profile: 0,
            channel: 2,
        }
    );
}

// =============================================================================
// Carrier ranges
// =============================================================================

#[test]
fn zero_sample_rate() {
    let init = chain(floating_bands());
    let mut carrier = lte(0);
    carrier.sample_rate_khz = 0;
    let p = Profile::new(PROFILE0_CHANNELS).with_carrier(3, carrier);
    let err = validate_batch(&init, &[p]).unwrap_err();
    assert_eq!(
        validation(err),
        ValidationError::SampleRate {
            carrier: CarrierId::new(0, 3),
            sample_rate_khz: 0,
        }
    );
}

#[test]
fn bandwidth_above_sample_rate() {
    let init = chain(floating_bands());
    let mut carrier = lte(0);
    carrier.ibw_khz = 40_000;
    let p = Profile::new(PROFILE0_CHANNELS).with_carrier(1, carrier);
    let err = validate_batch(&init, &[p]).unwrap_err();
    assert_eq!(
        validation(err),
        ValidationError::Bandwidth {
            carrier: CarrierId::new(0, 1),
            ibw_khz: 40_000,
        }
    );
}

#[test]
fn phase_must_be_below_360() {
    let init = chain(floating_bands());
    let p = Profile::new(PROFILE0_CHANNELS).with_carrier(0, lte(0).with_phase(360));
    let err = validate_batch(&init, &[p]).unwrap_err();
    assert_eq!(
        validation(err),
        ValidationError::Phase {
            carrier: CarrierId::new(0, 0),
            degrees: 360,
        }
    );
    let ok = Profile::new(PROFILE0_CHANNELS).with_carrier(0, lte(0).with_phase(359));
    assert_eq!(validate_batch(&init, &[ok]), Ok(()));
}

#[test]
fn carrier_edge_outside_rf_span() {
    let init = chain(floating_bands());
    // Upper edge at 200 MHz + 1 kHz
    let p = Profile::new(PROFILE0_CHANNELS).with_carrier(0, lte(190_001));
    let err = validate_batch(&init, &[p]).unwrap_err();
    assert_eq!(
        validation(err),
        ValidationError::OutsideSpan {
            carrier: CarrierId::new(0, 0),
        }
    );
    let edge = Profile::new(PROFILE0_CHANNELS).with_carrier(0, lte(190_000));
    assert_eq!(validate_batch(&init, &[edge]), Ok(()));
}

#[test]
fn disabled_carriers_are_not_checked() {
    let init = chain(floating_bands());
    let mut junk = lte(10_000_000);
    junk.enabled = false;
    junk.sample_rate_khz = 0;
    let p = profile0().with_carrier(5, junk);
    assert_eq!(validate_batch(&init, &[p]), Ok(()));
}

#[test]
fn first_offending_profile_reported() {
    let init = chain(floating_bands());
    let bad = Profile::new(PROFILE1_CHANNELS).with_carrier(0, lte(0).with_phase(400));
    let worse = Profile::new(ChannelMask::NONE);
    let err = validate_batch(&init, &[profile0(), bad, worse]).unwrap_err();
    assert_eq!(
        validation(err),
        ValidationError::Phase {
            carrier: CarrierId::new(1, 0),
            degrees: 400,
        }
    );
}
