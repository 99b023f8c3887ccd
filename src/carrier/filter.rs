//! Channel filter management
//!
//! Every enabled carrier gets a channel filter, either from a preset chosen
//! per application or from caller-supplied coefficients. All filters share one
//! coefficient table; each carrier records its tap count, table offset and
//! whether the filter is asymmetric.

use heapless::Vec;

use crate::config::{COEFF_LOAD_CHUNK_LEN, COEFF_TABLE_CAPACITY, MAX_CARRIERS, MAX_PROFILES, MAX_TAPS_PER_CARRIER};
use crate::dsp::fir_design::{self, Coefficients};
use crate::error::{CapacityError, SolveResult, ValidationError};
use crate::types::{CarrierId, CarrierSpec, Profile};

/// What a carrier's channel filter is tuned for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FilterApplication {
    /// No filtering, single unity tap
    Bypass,
    /// Sharp filter for narrow carriers
    Narrowband,
    /// LTE channel filter
    #[default]
    Lte,
    /// NR channel filter
    Nr,
}

impl FilterApplication {
    /// Longest built-in design for the application
    #[must_use]
    pub const fn max_taps(self) -> usize {
        match self {
            Self::Bypass => 1,
            Self::Lte => 31,
            Self::Nr => 47,
            Self::Narrowband => 63,
        }
    }

    /// Tap count of the built-in design for a carrier
    ///
    /// Sized so the Hamming window's transition width (about 3.3 / taps of the
    /// sample rate) fits between the carrier edge and Nyquist, rounded up to an
    /// odd count and capped at [`Self::max_taps`].
    #[must_use]
    pub fn taps_for(self, carrier: &CarrierSpec) -> usize {
        let max = self.max_taps();
        if max <= 1 || carrier.sample_rate_khz == 0 {
            return max;
        }
        let guard = carrier.sample_rate_khz.saturating_sub(carrier.ibw_khz);
        if guard == 0 {
            return max;
        }
        // 3.3 / (guard / (2 * rate)) taps
        let needed = (66 * carrier.sample_rate_khz).div_ceil(10 * guard) as usize;
        (needed | 1).clamp(3, max)
    }
}

/// Source of preset filter coefficients
pub trait FilterPresets {
    /// Coefficients for a carrier, `None` if no preset suits it
    fn coefficients(&self, application: FilterApplication, carrier: &CarrierSpec) -> Option<Coefficients>;
}

/// Built-in presets: Hamming-windowed sinc with the cutoff in the middle of the
/// carrier's transition band
#[derive(Clone, Copy, Debug, Default)]
pub struct WindowedSincPresets;

impl FilterPresets for WindowedSincPresets {
    fn coefficients(&self, application: FilterApplication, carrier: &CarrierSpec) -> Option<Coefficients> {
        if carrier.sample_rate_khz == 0 {
            return None;
        }
        if application == FilterApplication::Bypass {
            return Some(fir_design::passthrough());
        }
        let rate = carrier.sample_rate_khz as f32;
        let edge = carrier.ibw_khz as f32 / 2.0;
        let cutoff = (edge + (rate / 2.0 - edge) / 2.0) / rate;
        Some(fir_design::lowpass(application.taps_for(carrier), cutoff))
    }
}

/// Preset choice of every carrier of one profile
pub type ApplicationSelection = [FilterApplication; MAX_CARRIERS];

/// Caller coefficients of every carrier of one profile; ignored for disabled carriers
pub type ExplicitFilters<'a> = [&'a [i16]; MAX_CARRIERS];

/// How the batch's filters are chosen
#[derive(Clone, Copy, Debug)]
pub enum FilterSelection<'a> {
    /// One preset choice per carrier, one entry per profile
    Preset(&'a [ApplicationSelection]),
    /// Coefficients per carrier, one entry per profile
    Explicit(&'a [ExplicitFilters<'a>]),
}

impl FilterSelection<'_> {
    fn len(&self) -> usize {
        match self {
            Self::Preset(p) => p.len(),
            Self::Explicit(e) => e.len(),
        }
    }
}

/// Where a carrier's filter sits in the table
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FilterAssignment {
    /// Coefficient count
    pub tap_count: u16,
    /// First table entry
    pub table_offset: u16,
    /// Coefficients are not mirror symmetric
    pub asymmetric: bool,
}

/// Shared coefficient table with per-carrier bindings
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct CoefficientTable {
    entries: Vec<i16, COEFF_TABLE_CAPACITY>,
    assignments: [[Option<FilterAssignment>; MAX_CARRIERS]; MAX_PROFILES],
}

impl CoefficientTable {
    /// Empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a carrier's coefficients
    pub fn push(&mut self, id: CarrierId, coefficients: &[i16]) -> Result<FilterAssignment, CapacityError> {
        let offset = self.entries.len();
        let required = offset + coefficients.len();
        if required > COEFF_TABLE_CAPACITY {
            return Err(CapacityError::CoefficientTable {
                carrier: id,
                required,
                capacity: COEFF_TABLE_CAPACITY,
            });
        }
        // Length checked above
        let _ = self.entries.extend_from_slice(coefficients);

        let assignment = FilterAssignment {
            tap_count: coefficients.len() as u16,
            table_offset: offset as u16,
            asymmetric: !fir_design::is_symmetric(coefficients),
        };
        if let Some(slot) = self
            .assignments
            .get_mut(id.profile as usize)
            .and_then(|p| p.get_mut(id.carrier as usize))
        {
            *slot = Some(assignment);
        }
        Ok(assignment)
    }

    /// Entries used
    #[must_use]
    pub fn used(&self) -> usize {
        self.entries.len()
    }

    /// Every stored coefficient in table order
    #[must_use]
    pub fn entries(&self) -> &[i16] {
        &self.entries
    }

    /// Binding of one carrier
    #[must_use]
    pub fn assignment(&self, id: CarrierId) -> Option<FilterAssignment> {
        self.assignments
            .get(id.profile as usize)
            .and_then(|p| p.get(id.carrier as usize))
            .copied()
            .flatten()
    }

    /// Bindings of every carrier of one profile
    #[must_use]
    pub fn profile_assignments(&self, profile: usize) -> Option<&[Option<FilterAssignment>; MAX_CARRIERS]> {
        self.assignments.get(profile)
    }

    /// Coefficients of one carrier
    #[must_use]
    pub fn coefficients(&self, id: CarrierId) -> Option<&[i16]> {
        let a = self.assignment(id)?;
        let start = a.table_offset as usize;
        self.entries.get(start..start + a.tap_count as usize)
    }

    /// Upload chunks as (first entry, coefficients)
    pub fn chunks(&self) -> impl Iterator<Item = (u16, &[i16])> {
        self.entries
            .chunks(COEFF_LOAD_CHUNK_LEN)
            .enumerate()
            .map(|(i, chunk)| ((i * COEFF_LOAD_CHUNK_LEN) as u16, chunk))
    }
}

/// Choose and pack filters for every enabled carrier of a batch
///
/// Carriers are packed in profile then carrier order.
pub fn build_table<P: FilterPresets + ?Sized>(
    profiles: &[Profile],
    selection: &FilterSelection<'_>,
    presets: &P,
) -> SolveResult<CoefficientTable> {
    if selection.len() != profiles.len() {
        return Err(ValidationError::FilterSelection {
            profile: selection.len().min(profiles.len()) as u8,
        }
        .into());
    }

    let mut table = CoefficientTable::new();
    for (p, profile) in profiles.iter().enumerate() {
        for (c, carrier) in profile.enabled_carriers() {
            let id = CarrierId::new(p, c);
            match selection {
                FilterSelection::Preset(apps) => {
                    let coeffs = presets
                        .coefficients(apps[p][c], carrier)
                        .ok_or(ValidationError::NoPreset { carrier: id })?;
                    check_taps(id, &coeffs)?;
                    table.push(id, &coeffs)?;
                }
                FilterSelection::Explicit(filters) => {
                    let coeffs = filters[p][c];
                    check_taps(id, coeffs)?;
                    table.push(id, coeffs)?;
                }
            }
        }
    }

    log::debug!("coefficient table: {} of {} entries", table.used(), COEFF_TABLE_CAPACITY);
    Ok(table)
}

fn check_taps(id: CarrierId, coefficients: &[i16]) -> Result<(), ValidationError> {
    if coefficients.is_empty() || coefficients.len() > MAX_TAPS_PER_CARRIER {
        Err(ValidationError::FilterTaps {
            carrier: id,
            taps: coefficients.len(),
        })
    } else {
        Ok(())
    }
}
