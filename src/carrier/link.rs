//! Link parameter calculation
//!
//! Rate ratios between band, carrier and transport link, and the link slot
//! each carrier occupies. A carrier keeps the slot it had in the supplied
//! [`CarrierJesdCfg`]; carriers without one take the lowest free slot.

use crate::carrier::band::BandPlan;
use crate::carrier::filter::CoefficientTable;
use crate::config::{
    ratio_index, DeviceLimits, MAX_CARRIERS, MAX_CARRIER_SLOTS, MAX_PROFILES,
};
use crate::error::{CapacityError, SolveResult, ValidationError};
use crate::types::{CarrierId, Profile};

/// Slot per carrier, indexed by profile then carrier
pub type SlotMap = [[Option<u8>; MAX_CARRIERS]; MAX_PROFILES];

/// Transport link carrier configuration
///
/// As input to a solve this holds the previous slot of each carrier and any
/// explicit reassignment; as output it holds the slots actually used.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CarrierJesdCfg {
    /// Link sample rate
    pub link_sample_rate_khz: u32,
    /// Slot of each carrier
    pub carrier_slots: SlotMap,
}

impl CarrierJesdCfg {
    /// Link at `link_sample_rate_khz` with no slots assigned
    #[must_use]
    pub const fn new(link_sample_rate_khz: u32) -> Self {
        Self {
            link_sample_rate_khz,
            carrier_slots: [[None; MAX_CARRIERS]; MAX_PROFILES],
        }
    }

    /// Request `slot` for a carrier (returns new config, unchanged if out of range)
    #[must_use]
    pub fn with_slot(mut self, id: CarrierId, slot: u8) -> Self {
        if let Some(entry) = self
            .carrier_slots
            .get_mut(id.profile as usize)
            .and_then(|p| p.get_mut(id.carrier as usize))
        {
            *entry = Some(slot);
        }
        self
    }

    /// Slot of a carrier
    #[must_use]
    pub fn slot(&self, id: CarrierId) -> Option<u8> {
        self.carrier_slots
            .get(id.profile as usize)
            .and_then(|p| p.get(id.carrier as usize))
            .copied()
            .flatten()
    }
}

/// Link-side settings of one carrier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CarrierLinkSettings {
    /// Band rate over carrier rate
    pub ratio: u32,
    /// Last halfband stage the carrier passes through
    pub data_pipe_stop: u8,
    /// Transport link slot
    pub slot: u8,
    /// Channel filter bypassed
    pub bypass_filter: bool,
    /// Channel filter has an odd tap count
    pub odd_taps: bool,
}

/// Link parameters for a whole batch
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkSlotConfig {
    /// Link sample rate
    pub link_sample_rate_khz: u32,
    /// Link rate over the fastest carrier rate
    pub link_ratio: u32,
    /// Per-carrier settings, `None` for disabled carriers
    pub carriers: [[Option<CarrierLinkSettings>; MAX_CARRIERS]; MAX_PROFILES],
    /// Slots still held by profiles outside the batch
    pub retained: SlotMap,
}

impl LinkSlotConfig {
    /// Settings of one carrier
    #[must_use]
    pub fn settings(&self, id: CarrierId) -> Option<&CarrierLinkSettings> {
        self.carriers
            .get(id.profile as usize)
            .and_then(|p| p.get(id.carrier as usize))
            .and_then(Option::as_ref)
    }

    /// Link configuration this result establishes
    #[must_use]
    pub fn jesd(&self) -> CarrierJesdCfg {
        let mut cfg = CarrierJesdCfg::new(self.link_sample_rate_khz);
        for (p, carriers) in self.carriers.iter().enumerate() {
            for (c, settings) in carriers.iter().enumerate() {
                cfg.carrier_slots[p][c] = settings.map(|s| s.slot).or(self.retained[p][c]);
            }
        }
        cfg
    }

    /// Carrier in each link slot
    #[must_use]
    pub fn crossbar(&self) -> [Option<CarrierId>; MAX_CARRIER_SLOTS] {
        let mut xbar = [None; MAX_CARRIER_SLOTS];
        for (p, carriers) in self.carriers.iter().enumerate() {
            for (c, settings) in carriers.iter().enumerate() {
                let slot = settings.map(|s| s.slot).or(self.retained[p][c]);
                if let Some(entry) = slot.and_then(|s| xbar.get_mut(s as usize)) {
                    *entry = Some(CarrierId::new(p, c));
                }
            }
        }
        xbar
    }

    /// Record filter bypass and tap parity once filters are chosen
    pub fn annotate_filters(&mut self, table: &CoefficientTable) {
        for (p, carriers) in self.carriers.iter_mut().enumerate() {
            for (c, settings) in carriers.iter_mut().enumerate() {
                let (Some(settings), Some(filter)) =
                    (settings.as_mut(), table.assignment(CarrierId::new(p, c)))
                else {
                    continue;
                };
                settings.bypass_filter = filter.tap_count <= 1;
                settings.odd_taps = filter.tap_count % 2 == 1;
            }
        }
    }
}

/// Crossbar register value selecting a carrier as a slot's source
#[must_use]
pub const fn xbar_source(id: CarrierId) -> u32 {
    ((id.profile as u32) << 3) | id.carrier as u32
}

fn carrier_ratio(id: CarrierId, fast_khz: u32, slow_khz: u32) -> Result<u32, ValidationError> {
    let err = ValidationError::UnsupportedRatio {
        carrier: id,
        numerator: fast_khz,
        denominator: slow_khz,
    };
    if slow_khz == 0 || fast_khz % slow_khz != 0 {
        return Err(err);
    }
    let ratio = fast_khz / slow_khz;
    ratio_index(ratio).map(|_| ratio).ok_or(err)
}

/// Ratios and slots for every enabled carrier of a batch
///
/// `plans` holds one band plan per profile, in batch order. Profiles past the
/// end of the batch keep the slots `previous` gives them.
pub fn calculate(
    profiles: &[Profile],
    plans: &[BandPlan],
    previous: &CarrierJesdCfg,
    limits: &DeviceLimits,
) -> SolveResult<LinkSlotConfig> {
    if profiles.len() > MAX_PROFILES {
        return Err(CapacityError::TooManyProfiles {
            count: profiles.len(),
            max: MAX_PROFILES,
        }
        .into());
    }
    let mut out = LinkSlotConfig {
        link_sample_rate_khz: previous.link_sample_rate_khz,
        link_ratio: 1,
        ..LinkSlotConfig::default()
    };

    // Ratios, and the fastest carrier for the link ratio
    let mut fastest: Option<(CarrierId, u32)> = None;
    for (p, (profile, plan)) in profiles.iter().zip(plans).enumerate() {
        for (c, carrier) in profile.enabled_carriers() {
            let id = CarrierId::new(p, c);
            let band_rate = plan.assignment_of(c).map_or(0, |b| b.sample_rate_khz);
            let ratio = carrier_ratio(id, band_rate, carrier.sample_rate_khz)?;
            out.carriers[p][c] = Some(CarrierLinkSettings {
                ratio,
                data_pipe_stop: ratio.trailing_zeros() as u8,
                ..CarrierLinkSettings::default()
            });
            if fastest.map_or(true, |(_, rate)| carrier.sample_rate_khz > rate) {
                fastest = Some((id, carrier.sample_rate_khz));
            }
        }
    }
    if let Some((id, rate)) = fastest {
        out.link_ratio = carrier_ratio(id, previous.link_sample_rate_khz, rate)?;
    }

    let usable = limits.carrier_slots.min(MAX_CARRIER_SLOTS);
    let mut taken: [Option<CarrierId>; MAX_CARRIER_SLOTS] = [None; MAX_CARRIER_SLOTS];
    retain_slots(&mut out, &mut taken, previous, profiles.len(), usable);
    assign_slots(&mut out, &mut taken, previous, usable)?;
    Ok(out)
}

/// Reserve the slots of carriers whose profile is not being reconfigured
fn retain_slots(
    out: &mut LinkSlotConfig,
    taken: &mut [Option<CarrierId>; MAX_CARRIER_SLOTS],
    previous: &CarrierJesdCfg,
    batch_len: usize,
    usable: usize,
) {
    for p in batch_len..MAX_PROFILES {
        for c in 0..MAX_CARRIERS {
            let id = CarrierId::new(p, c);
            let Some(slot) = previous.slot(id) else {
                continue;
            };
            if (slot as usize) < usable && taken[slot as usize].is_none() {
                taken[slot as usize] = Some(id);
                out.retained[p][c] = Some(slot);
            } else {
                log::warn!("{} keeps no link slot, {} is unusable", id, slot);
            }
        }
    }
}

fn assign_slots(
    out: &mut LinkSlotConfig,
    taken: &mut [Option<CarrierId>; MAX_CARRIER_SLOTS],
    previous: &CarrierJesdCfg,
    usable: usize,
) -> SolveResult<()> {
    let mut pending: heapless::Vec<CarrierId, { MAX_PROFILES * MAX_CARRIERS }> = heapless::Vec::new();

    // Keep existing and explicitly requested slots
    for (p, carriers) in out.carriers.iter_mut().enumerate() {
        for (c, settings) in carriers.iter_mut().enumerate() {
            let Some(settings) = settings.as_mut() else {
                continue;
            };
            let id = CarrierId::new(p, c);
            match previous.slot(id) {
                Some(slot) if slot as usize >= usable => {
                    return Err(ValidationError::SlotRange { carrier: id, slot }.into());
                }
                Some(slot) => {
                    if taken[slot as usize].is_some() {
                        return Err(ValidationError::SlotConflict { carrier: id, slot }.into());
                    }
                    taken[slot as usize] = Some(id);
                    settings.slot = slot;
                }
                None => {
                    let _ = pending.push(id);
                }
            }
        }
    }

    // Fill the rest from the lowest free slot
    for id in pending {
        let slot = taken[..usable]
            .iter()
            .position(Option::is_none)
            .ok_or(CapacityError::Slots { carrier: id })?;
        taken[slot] = Some(id);
        if let Some(settings) = out.carriers[id.profile as usize][id.carrier as usize].as_mut() {
            settings.slot = slot as u8;
        }
        log::debug!("{} assigned link slot {}", id, slot);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratios() {
        let id = CarrierId::new(0, 0);
        assert_eq!(carrier_ratio(id, 122_880, 30_720), Ok(4));
        assert_eq!(carrier_ratio(id, 122_880, 122_880), Ok(1));
        assert!(carrier_ratio(id, 122_880, 0).is_err());
        assert!(carrier_ratio(id, 122_880, 40_000).is_err());
        // 5 is not a supported divisor
        assert!(carrier_ratio(id, 153_600, 30_720).is_err());
    }

    #[test]
    fn jesd_slot_lookup() {
        let cfg = CarrierJesdCfg::new(245_760).with_slot(CarrierId::new(1, 2), 9);
        assert_eq!(cfg.slot(CarrierId::new(1, 2)), Some(9));
        assert_eq!(cfg.slot(CarrierId::new(1, 3)), None);
        assert_eq!(cfg.slot(CarrierId::new(9, 0)), None);
    }
}
