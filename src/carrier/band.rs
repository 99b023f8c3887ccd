//! Band assignment
//!
//! Each channel has two bands. Every enabled carrier of a profile is routed
//! through exactly one of them. Carriers are taken in ascending center
//! frequency and placed in the first band that can still hold them:
//! - a band with a fixed center holds carriers whose edges fall inside the
//!   band's passband around that center
//! - a floating band holds carriers while the occupied span stays within its
//!   bandwidth, and is centered on that span afterwards

use heapless::Vec;

use crate::carrier::chain::{BandInit, ChainInit};
use crate::config::{MAX_CARRIERS, NUM_BANDS};
use crate::error::{CapacityError, SolveResult, ValidationError};
use crate::types::{CarrierId, CarrierMask, CarrierSpec, Profile};

/// Outcome for one band of a profile
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BandAssignment {
    /// Band datapath is powered
    pub enabled: bool,
    /// Band center relative to LO
    pub center_khz: i32,
    /// Band output sample rate
    pub sample_rate_khz: u32,
    /// Bandwidth the band can pass
    pub budget_khz: u32,
    /// Span between the outermost carrier edges in the band
    pub occupied_khz: u32,
    /// Carriers routed through the band
    pub carriers: CarrierMask,
}

/// Band assignment for every carrier of one profile
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BandPlan {
    /// Per-band outcome
    pub bands: [BandAssignment; NUM_BANDS],
}

impl BandPlan {
    /// Band a carrier was routed to, `None` for disabled carriers
    #[must_use]
    pub fn band_of(&self, carrier: usize) -> Option<usize> {
        self.bands.iter().position(|b| b.carriers.contains(carrier))
    }

    /// Assignment of the band a carrier was routed to
    #[must_use]
    pub fn assignment_of(&self, carrier: usize) -> Option<&BandAssignment> {
        self.band_of(carrier).map(|b| &self.bands[b])
    }
}

/// Band configuration shared by every channel of a profile
///
/// The first channel of the mask is the reference; any other channel whose
/// bands differ in enable or fixed center is rejected.
pub fn profile_bands(
    init: &ChainInit,
    profile_idx: u8,
    profile: &Profile,
) -> SolveResult<[BandInit; NUM_BANDS]> {
    let mut channels = profile.channel_mask.channels();
    let Some(first) = channels.next() else {
        return Err(ValidationError::EmptyChannelMask {
            profile: profile_idx,
        }
        .into());
    };
    let reference = init.channels[first].bands;

    for ch in channels {
        let bands = &init.channels[ch].bands;
        for (b, (ours, theirs)) in reference.iter().zip(bands).enumerate() {
            if ours.enabled != theirs.enabled || ours.center_khz != theirs.center_khz {
                return Err(ValidationError::BandCenterMismatch {
                    profile: profile_idx,
                    channel: ch as u8,
                    band: b as u8,
                }
                .into());
            }
        }
    }
    Ok(reference)
}

#[derive(Clone, Copy)]
struct Span {
    low: i64,
    high: i64,
}

impl Span {
    fn of(carrier: &CarrierSpec) -> Self {
        Self {
            low: carrier.low_edge_khz(),
            high: carrier.high_edge_khz(),
        }
    }

    fn merge(self, other: Self) -> Self {
        Self {
            low: self.low.min(other.low),
            high: self.high.max(other.high),
        }
    }

    fn width(self) -> i64 {
        self.high - self.low
    }

    fn midpoint(self) -> i64 {
        self.low + self.width().div_euclid(2)
    }
}

fn fits(band: &BandInit, occupied: Option<Span>, carrier: Span) -> bool {
    if !band.enabled {
        return false;
    }
    let budget = i64::from(band.ibw_khz);
    match band.center_khz {
        Some(center) => {
            let center = i64::from(center);
            let low = center - budget / 2;
            let high = center + (budget - budget / 2);
            carrier.low >= low && carrier.high <= high
        }
        None => {
            let span = occupied.map_or(carrier, |s| s.merge(carrier));
            span.width() <= budget
        }
    }
}

/// Route every enabled carrier of a profile to a band
pub fn assign_bands(
    profile_idx: u8,
    bands: &[BandInit; NUM_BANDS],
    profile: &Profile,
) -> SolveResult<BandPlan> {
    let mut order: Vec<(i32, usize), MAX_CARRIERS> = profile
        .enabled_carriers()
        .map(|(idx, c)| (c.center_frequency_khz, idx))
        .collect();
    order.sort_unstable();

    let mut occupied: [Option<Span>; NUM_BANDS] = [None; NUM_BANDS];
    let mut plan = BandPlan::default();

    for &(_, idx) in &order {
        let span = Span::of(&profile.carriers[idx]);
        let band = (0..NUM_BANDS)
            .find(|&b| fits(&bands[b], occupied[b], span))
            .ok_or(CapacityError::Band {
                carrier: CarrierId::new(profile_idx as usize, idx),
            })?;

        occupied[band] = Some(occupied[band].map_or(span, |s| s.merge(span)));
        plan.bands[band].carriers = plan.bands[band].carriers.with(idx);
    }

    for (b, (assignment, init)) in plan.bands.iter_mut().zip(bands).enumerate() {
        assignment.enabled = init.enabled;
        assignment.sample_rate_khz = init.sample_rate_khz;
        assignment.budget_khz = init.ibw_khz;
        assignment.occupied_khz = occupied[b].map_or(0, |s| s.width() as u32);
        assignment.center_khz = match (init.center_khz, occupied[b]) {
            (Some(center), _) => center,
            (None, Some(span)) => span.midpoint() as i32,
            (None, None) => 0,
        };
    }

    log::debug!(
        "profile {}: band carriers {:#010b} / {:#010b}, centers {} / {} kHz",
        profile_idx,
        plan.bands[0].carriers.bits(),
        plan.bands[1].carriers.bits(),
        plan.bands[0].center_khz,
        plan.bands[1].center_khz
    );
    Ok(plan)
}
