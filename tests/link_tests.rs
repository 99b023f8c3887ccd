//! Link Ratio and Slot Tests

mod common;

use common::*;
use sdr_carrier::carrier::band::{assign_bands, BandPlan};
use sdr_carrier::carrier::filter::CoefficientTable;
use sdr_carrier::carrier::link::{calculate, xbar_source, CarrierJesdCfg, LinkSlotConfig};
use sdr_carrier::config::DeviceLimits;
use sdr_carrier::error::{CapacityError, SolveError, ValidationError};
use sdr_carrier::types::{CarrierId, CarrierSpec, Profile};

fn batch() -> [Profile; 2] {
    [
        Profile::new(PROFILE0_CHANNELS)
            .with_carrier(0, lte(-20_000))
            .with_carrier(3, lte(20_000)),
        Profile::new(PROFILE1_CHANNELS).with_carrier(1, lte(0)),
    ]
}

fn plans(profiles: &[Profile]) -> Vec<BandPlan> {
    profiles
        .iter()
        .enumerate()
        .map(|(i, p)| assign_bands(i as u8, &floating_bands(), p).unwrap())
        .collect()
}

fn solve_link(profiles: &[Profile], previous: &CarrierJesdCfg, limits: &DeviceLimits) -> Result<LinkSlotConfig, SolveError> {
    calculate(profiles, &plans(profiles), previous, limits)
}

fn slot(link: &LinkSlotConfig, p: usize, c: usize) -> u8 {
    link.settings(CarrierId::new(p, c)).unwrap().slot
}

// =============================================================================
// Ratios
// =============================================================================

#[test]
fn carrier_and_link_ratios() {
    let profiles = batch();
    let link = solve_link(&profiles, &CarrierJesdCfg::new(LINK_RATE_KHZ), &DeviceLimits::DEFAULT).unwrap();

    let s = link.settings(CarrierId::new(0, 0)).unwrap();
    assert_eq!(s.ratio, 8);
    assert_eq!(s.data_pipe_stop, 3);
    assert_eq!(link.link_ratio, 8);
    assert_eq!(link.link_sample_rate_khz, LINK_RATE_KHZ);
    assert!(link.settings(CarrierId::new(0, 1)).is_none());
}

#[test]
fn link_ratio_follows_fastest_carrier() {
    let profiles = [Profile::new(PROFILE0_CHANNELS)
        .with_carrier(0, lte(-50_000))
        .with_carrier(1, CarrierSpec::new(50_000, 61_440, 40_000))];
    let link = solve_link(&profiles, &CarrierJesdCfg::new(LINK_RATE_KHZ), &DeviceLimits::DEFAULT).unwrap();

    assert_eq!(link.link_ratio, 4);
    assert_eq!(link.settings(CarrierId::new(0, 1)).unwrap().ratio, 4);
    assert_eq!(link.settings(CarrierId::new(0, 1)).unwrap().data_pipe_stop, 2);
}

#[test]
fn no_carriers_gives_unit_link_ratio() {
    let profiles = [Profile::new(PROFILE0_CHANNELS)];
    let link = solve_link(&profiles, &CarrierJesdCfg::new(LINK_RATE_KHZ), &DeviceLimits::DEFAULT).unwrap();
    assert_eq!(link.link_ratio, 1);
    assert!(link.crossbar().iter().all(Option::is_none));
}

#[test]
fn unsupported_carrier_ratio() {
    // 245.76 / 49.152 = 5
    let profiles = [Profile::new(PROFILE0_CHANNELS).with_carrier(2, CarrierSpec::new(0, 49_152, 40_000))];
    assert_eq!(
        solve_link(&profiles, &CarrierJesdCfg::new(LINK_RATE_KHZ), &DeviceLimits::DEFAULT),
        Err(SolveError::Validation(ValidationError::UnsupportedRatio {
            carrier: CarrierId::new(0, 2),
            numerator: BAND_RATE_KHZ,
            denominator: 49_152,
        }))
    );
}

#[test]
fn unsupported_link_ratio() {
    let profiles = batch();
    assert_eq!(
        solve_link(&profiles, &CarrierJesdCfg::new(153_600), &DeviceLimits::DEFAULT),
        Err(SolveError::Validation(ValidationError::UnsupportedRatio {
            carrier: CarrierId::new(0, 0),
            numerator: 153_600,
            denominator: 30_720,
        }))
    );
}

// =============================================================================
// Slots
// =============================================================================

#[test]
fn fresh_slots_fill_from_zero() {
    let profiles = batch();
    let link = solve_link(&profiles, &CarrierJesdCfg::new(LINK_RATE_KHZ), &DeviceLimits::DEFAULT).unwrap();

    assert_eq!(slot(&link, 0, 0), 0);
    assert_eq!(slot(&link, 0, 3), 1);
    assert_eq!(slot(&link, 1, 1), 2);
}

#[test]
fn previous_slots_are_kept() {
    let profiles = batch();
    let previous = CarrierJesdCfg::new(LINK_RATE_KHZ)
        .with_slot(CarrierId::new(0, 3), 0)
        .with_slot(CarrierId::new(1, 1), 17);
    let link = solve_link(&profiles, &previous, &DeviceLimits::DEFAULT).unwrap();

    assert_eq!(slot(&link, 0, 3), 0);
    assert_eq!(slot(&link, 1, 1), 17);
    assert_eq!(slot(&link, 0, 0), 1);
}

#[test]
fn resolving_with_own_output_is_stable() {
    let profiles = batch();
    let first = solve_link(&profiles, &CarrierJesdCfg::new(LINK_RATE_KHZ), &DeviceLimits::DEFAULT).unwrap();
    let second = solve_link(&profiles, &first.jesd(), &DeviceLimits::DEFAULT).unwrap();
    assert_eq!(first, second);
}

#[test]
fn added_carrier_does_not_move_others() {
    let profiles = batch();
    let first = solve_link(&profiles, &CarrierJesdCfg::new(LINK_RATE_KHZ), &DeviceLimits::DEFAULT).unwrap();

    let grown = [profiles[0].with_carrier(1, lte(0)), profiles[1]];
    let second = solve_link(&grown, &first.jesd(), &DeviceLimits::DEFAULT).unwrap();

    assert_eq!(slot(&second, 0, 0), slot(&first, 0, 0));
    assert_eq!(slot(&second, 0, 3), slot(&first, 0, 3));
    assert_eq!(slot(&second, 1, 1), slot(&first, 1, 1));
    assert_eq!(slot(&second, 0, 1), 3);
}

#[test]
fn duplicate_requested_slot() {
    let profiles = batch();
    let previous = CarrierJesdCfg::new(LINK_RATE_KHZ)
        .with_slot(CarrierId::new(0, 0), 5)
        .with_slot(CarrierId::new(0, 3), 5);
    assert_eq!(
        solve_link(&profiles, &previous, &DeviceLimits::DEFAULT),
        Err(SolveError::Validation(ValidationError::SlotConflict {
            carrier: CarrierId::new(0, 3),
            slot: 5,
        }))
    );
}

#[test]
fn requested_slot_beyond_link() {
    let profiles = batch();
    let limits = DeviceLimits::DEFAULT.with_carrier_slots(4);
    let previous = CarrierJesdCfg::new(LINK_RATE_KHZ).with_slot(CarrierId::new(1, 1), 4);
    assert_eq!(
        solve_link(&profiles, &previous, &limits),
        Err(SolveError::Validation(ValidationError::SlotRange {
            carrier: CarrierId::new(1, 1),
            slot: 4,
        }))
    );
}

#[test]
fn link_out_of_slots() {
    let profiles = batch();
    let limits = DeviceLimits::DEFAULT.with_carrier_slots(2);
    assert_eq!(
        solve_link(&profiles, &CarrierJesdCfg::new(LINK_RATE_KHZ), &limits),
        Err(SolveError::Capacity(CapacityError::Slots {
            carrier: CarrierId::new(1, 1),
        }))
    );
}

#[test]
fn slots_of_disabled_carriers_are_released() {
    let profiles = batch();
    let previous = CarrierJesdCfg::new(LINK_RATE_KHZ).with_slot(CarrierId::new(0, 6), 0);
    let link = solve_link(&profiles, &previous, &DeviceLimits::DEFAULT).unwrap();

    assert_eq!(slot(&link, 0, 0), 0);
    assert_eq!(link.jesd().slot(CarrierId::new(0, 6)), None);
}

#[test]
fn profiles_outside_the_batch_keep_their_slots() {
    let profiles = batch();
    let first = solve_link(&profiles, &CarrierJesdCfg::new(LINK_RATE_KHZ), &DeviceLimits::DEFAULT).unwrap();
    assert_eq!(slot(&first, 1, 1), 2);

    // Only profile 0, with a new carrier
    let only = [profiles[0].with_carrier(5, lte(40_000))];
    let link = solve_link(&only, &first.jesd(), &DeviceLimits::DEFAULT).unwrap();

    assert_eq!(slot(&link, 0, 5), 3);
    assert!(link.settings(CarrierId::new(1, 1)).is_none());
    assert_eq!(link.retained[1][1], Some(2));
    assert_eq!(link.jesd().slot(CarrierId::new(1, 1)), Some(2));
    assert_eq!(link.crossbar()[2], Some(CarrierId::new(1, 1)));
}

#[test]
fn retained_slot_cannot_be_requested() {
    let only = [batch()[0]];
    let previous = CarrierJesdCfg::new(LINK_RATE_KHZ)
        .with_slot(CarrierId::new(1, 1), 7)
        .with_slot(CarrierId::new(0, 0), 7);
    assert_eq!(
        solve_link(&only, &previous, &DeviceLimits::DEFAULT),
        Err(SolveError::Validation(ValidationError::SlotConflict {
            carrier: CarrierId::new(0, 0),
            slot: 7,
        }))
    );
}

#[test]
fn too_many_profiles_rejected_before_indexing() {
    let profiles = [batch()[0]; 5];
    let plans = plans(&profiles[..1]);
    let all = [plans[0], plans[0], plans[0], plans[0], plans[0]];
    assert_eq!(
        calculate(&profiles, &all, &CarrierJesdCfg::new(LINK_RATE_KHZ), &DeviceLimits::DEFAULT),
        Err(SolveError::Capacity(CapacityError::TooManyProfiles { count: 5, max: 4 }))
    );
}

// =============================================================================
// Crossbar and filter flags
// =============================================================================

#[test]
fn crossbar_names_slot_sources() {
    let profiles = batch();
    let previous = CarrierJesdCfg::new(LINK_RATE_KHZ).with_slot(CarrierId::new(1, 1), 9);
    let link = solve_link(&profiles, &previous, &DeviceLimits::DEFAULT).unwrap();
    let xbar = link.crossbar();

    assert_eq!(xbar[9], Some(CarrierId::new(1, 1)));
    assert_eq!(xbar[0], Some(CarrierId::new(0, 0)));
    assert_eq!(xbar[1], Some(CarrierId::new(0, 3)));
    assert_eq!(xbar.iter().flatten().count(), 3);
}

#[test]
fn crossbar_source_encoding() {
    assert_eq!(xbar_source(CarrierId::new(0, 0)), 0);
    assert_eq!(xbar_source(CarrierId::new(2, 5)), 0x15);
    assert_eq!(xbar_source(CarrierId::new(3, 7)), 0x1F);
}

#[test]
fn filter_flags_from_tap_counts() {
    let profiles = batch();
    let mut link = solve_link(&profiles, &CarrierJesdCfg::new(LINK_RATE_KHZ), &DeviceLimits::DEFAULT).unwrap();

    let mut table = CoefficientTable::new();
    table.push(CarrierId::new(0, 0), &[i16::MAX]).unwrap();
    table.push(CarrierId::new(0, 3), &[1, 2, 2, 1]).unwrap();
    table.push(CarrierId::new(1, 1), &[1, 2, 1]).unwrap();
    link.annotate_filters(&table);

    let bypass = link.settings(CarrierId::new(0, 0)).unwrap();
    assert!(bypass.bypass_filter);
    assert!(bypass.odd_taps);

    let even = link.settings(CarrierId::new(0, 3)).unwrap();
    assert!(!even.bypass_filter);
    assert!(!even.odd_taps);

    let odd = link.settings(CarrierId::new(1, 1)).unwrap();
    assert!(!odd.bypass_filter);
    assert!(odd.odd_taps);
}
