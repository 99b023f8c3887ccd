//! Staged reconfiguration result
//!
//! Runs the solve stages in order and gathers their outputs into one
//! [`ReconfigSolution`], everything the commit phase needs to program the
//! device. Solving is pure; a failed solve leaves nothing behind.

use heapless::Vec;

use crate::carrier::band::{self, BandPlan};
use crate::carrier::chain::ChainInit;
use crate::carrier::delay::{self, DelayConfig};
use crate::carrier::filter::{self, CoefficientTable, FilterAssignment, FilterPresets, FilterSelection};
use crate::carrier::link::{self, CarrierJesdCfg, CarrierLinkSettings, LinkSlotConfig};
use crate::carrier::nco::{self, NcoSetting};
use crate::carrier::validate;
use crate::config::{DeviceLimits, MAX_CARRIERS, MAX_PROFILES};
use crate::error::SolveResult;
use crate::types::{CarrierId, ChannelMask, Direction, Profile};

/// Inputs of one reconfiguration
#[derive(Clone, Copy, Debug)]
pub struct ReconfigRequest<'a> {
    /// New carrier set, one entry per profile
    pub profiles: &'a [Profile],
    /// Link rate plus previous and requested carrier slots
    pub jesd: CarrierJesdCfg,
    /// Filter choice per carrier
    pub filters: FilterSelection<'a>,
}

/// Per-profile outputs of the band, NCO and delay stages
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ProfileOutput {
    /// Band routing and centers
    pub bands: BandPlan,
    /// NCO per carrier
    pub nco: [NcoSetting; MAX_CARRIERS],
    /// Shuffle and buffers, identical for every channel of the profile
    pub delay: DelayConfig,
}

/// Everything programmed for one carrier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CarrierRuntime {
    /// Band the carrier is routed through
    pub band: u8,
    /// That band's center
    pub band_center_khz: i32,
    /// Carrier NCO
    pub nco: NcoSetting,
    /// Ratios and link slot
    pub link: CarrierLinkSettings,
    /// Channel filter binding
    pub filter: FilterAssignment,
    /// Delay compensation buffer (cycles)
    pub delay_buffer_cycles: u32,
    /// Total latency after buffering (cycles)
    pub latency_cycles: u32,
}

/// A solved, not yet applied, reconfiguration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconfigSolution {
    /// Chain the solution is for
    pub direction: Direction,
    /// Profiles as submitted
    pub profiles: Vec<Profile, MAX_PROFILES>,
    /// Ratios and slots for the batch
    pub link: LinkSlotConfig,
    /// Packed channel filters
    pub filters: CoefficientTable,
    /// Per-profile results
    pub outputs: Vec<ProfileOutput, MAX_PROFILES>,
}

impl ReconfigSolution {
    /// Link configuration the solution establishes
    #[must_use]
    pub fn jesd(&self) -> CarrierJesdCfg {
        self.link.jesd()
    }

    /// Channels the solution reprograms
    #[must_use]
    pub fn channels(&self) -> ChannelMask {
        self.profiles
            .iter()
            .fold(ChannelMask::NONE, |mask, p| mask.union(p.channel_mask))
    }

    /// Profile that owns `channel` in this batch
    #[must_use]
    pub fn profile_of_channel(&self, channel: usize) -> Option<usize> {
        self.profiles
            .iter()
            .position(|p| p.channel_mask.contains(channel))
    }

    /// Programmed state of every carrier of a profile
    #[must_use]
    pub fn runtime(&self, profile: usize) -> [Option<CarrierRuntime>; MAX_CARRIERS] {
        let mut out = [None; MAX_CARRIERS];
        let (Some(spec), Some(output)) = (self.profiles.get(profile), self.outputs.get(profile)) else {
            return out;
        };

        for (c, _) in spec.enabled_carriers() {
            let id = CarrierId::new(profile, c);
            let (Some(band), Some(link)) = (output.bands.band_of(c), self.link.settings(id)) else {
                continue;
            };
            out[c] = Some(CarrierRuntime {
                band: band as u8,
                band_center_khz: output.bands.bands[band].center_khz,
                nco: output.nco[c],
                link: *link,
                filter: self.filters.assignment(id).unwrap_or_default(),
                delay_buffer_cycles: output.delay.buffer_cycles[c],
                latency_cycles: output.delay.latency_cycles[c],
            });
        }
        out
    }
}

/// Run every solve stage over a batch
pub fn solve<P: FilterPresets + ?Sized>(
    direction: Direction,
    init: &ChainInit,
    request: &ReconfigRequest<'_>,
    presets: &P,
    limits: &DeviceLimits,
) -> SolveResult<ReconfigSolution> {
    let profiles = request.profiles;
    validate::validate_batch(init, profiles)?;

    let mut outputs: Vec<ProfileOutput, MAX_PROFILES> = Vec::new();
    for (p, profile) in profiles.iter().enumerate() {
        let bands = band::profile_bands(init, p as u8, profile)?;
        let plan = band::assign_bands(p as u8, &bands, profile)?;
        let nco = nco::reconfigure(direction, p as u8, profile, &plan)?;
        // Count checked by validation
        let _ = outputs.push(ProfileOutput {
            bands: plan,
            nco,
            delay: DelayConfig::default(),
        });
    }

    let plans: Vec<BandPlan, MAX_PROFILES> = outputs.iter().map(|o| o.bands).collect();
    let mut link = link::calculate(profiles, &plans, &request.jesd, limits)?;
    let filters = filter::build_table(profiles, &request.filters, presets)?;
    link.annotate_filters(&filters);

    for (p, (profile, output)) in profiles.iter().zip(outputs.iter_mut()).enumerate() {
        output.delay = delay::solve_profile(p as u8, profile, &link, &filters, limits)?;
    }

    log::info!(
        "{:?} solve: {} profiles, {} coefficients, link ratio {}",
        direction,
        profiles.len(),
        filters.used(),
        link.link_ratio
    );

    Ok(ReconfigSolution {
        direction,
        profiles: Vec::from_slice(profiles).unwrap_or_default(),
        link,
        filters,
        outputs,
    })
}
