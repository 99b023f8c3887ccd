//! Delay equalization
//!
//! Carriers of a channel share one slot-shuffle pipeline. A carrier's latency
//! is its intrinsic delay (filter group delay plus halfband pipeline) plus
//! [`DeviceLimits::slot_cycles`] for every position it sits behind in the
//! shuffle. Delay buffers, sized in whole granules, pad the faster carriers
//! towards the slowest one.
//!
//! The search starts from the heuristic order (longest intrinsic delay first)
//! and then walks permutations of it in lexicographic order until one
//! leaves the mismatch within threshold or the candidate budget runs out.

use core::cmp::Reverse;

use heapless::Vec;

use crate::carrier::filter::CoefficientTable;
use crate::carrier::link::LinkSlotConfig;
use crate::config::{DeviceLimits, HALFBAND_LATENCY_CYCLES, MAX_CARRIERS};
use crate::error::{CapacityError, SolveError, SolveResult};
use crate::types::{CarrierId, Profile};

/// Carrier processing order within a channel
pub type ShuffleOrder = Vec<u8, MAX_CARRIERS>;

/// Delay programming of the channels of one profile
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DelayConfig {
    /// Buffer per carrier (cycles)
    pub buffer_cycles: [u32; MAX_CARRIERS],
    /// Enabled carriers in processing order
    pub shuffle: ShuffleOrder,
    /// Total latency per carrier after buffering (cycles)
    pub latency_cycles: [u32; MAX_CARRIERS],
    /// Spread between the fastest and slowest carrier (cycles)
    pub mismatch_cycles: u32,
}

/// Intrinsic latency of a carrier (cycles)
#[must_use]
pub fn intrinsic_delay(clock_khz: u32, sample_rate_khz: u32, taps: u16, data_pipe_stop: u8) -> u32 {
    let group = if sample_rate_khz == 0 {
        0
    } else {
        let half_taps = u64::from(taps.saturating_sub(1));
        (half_taps * u64::from(clock_khz) / (2 * u64::from(sample_rate_khz))) as u32
    };
    group + u32::from(data_pipe_stop) * HALFBAND_LATENCY_CYCLES
}

#[derive(Clone, Copy)]
struct Candidate {
    buffers: [u32; MAX_CARRIERS],
    latency: [u32; MAX_CARRIERS],
    mismatch: u32,
}

/// Buffers and mismatch for one order, `None` if buffer memory runs out
fn evaluate(order: &[u8], intrinsic: &[u32; MAX_CARRIERS], limits: &DeviceLimits) -> Option<Candidate> {
    let mut total = [0u32; MAX_CARRIERS];
    for (pos, &c) in order.iter().enumerate() {
        total[c as usize] = intrinsic[c as usize] + pos as u32 * limits.slot_cycles;
    }
    let target = order.iter().map(|&c| total[c as usize]).max().unwrap_or(0);
    let granule = limits.delay_granularity_cycles.max(1);

    let mut candidate = Candidate {
        buffers: [0; MAX_CARRIERS],
        latency: [0; MAX_CARRIERS],
        mismatch: 0,
    };
    let mut memory = 0u32;
    for &c in order {
        let c = c as usize;
        let pad = (target - total[c]) / granule * granule;
        let pad = pad.min(limits.max_delay_buffer_cycles);
        memory += pad;
        candidate.buffers[c] = pad;
        candidate.latency[c] = total[c] + pad;
    }
    if memory > limits.delay_buffer_capacity_cycles {
        return None;
    }

    let latencies = order.iter().map(|&c| candidate.latency[c as usize]);
    let hi = latencies.clone().max().unwrap_or(0);
    let lo = latencies.min().unwrap_or(0);
    candidate.mismatch = hi - lo;
    Some(candidate)
}

/// Advance to the next lexicographic permutation, false after the last
fn next_permutation(p: &mut [usize]) -> bool {
    let Some(i) = (1..p.len()).rev().find(|&i| p[i - 1] < p[i]) else {
        return false;
    };
    let pivot = i - 1;
    let Some(j) = (i..p.len()).rev().find(|&j| p[j] > p[pivot]) else {
        return false;
    };
    p.swap(pivot, j);
    p[i..].reverse();
    true
}

/// Find the shuffle and buffers for one profile
///
/// Every channel of the profile carries the same carriers, so the result
/// applies to each of them.
pub fn solve_profile(
    profile_idx: u8,
    profile: &Profile,
    link: &LinkSlotConfig,
    filters: &CoefficientTable,
    limits: &DeviceLimits,
) -> SolveResult<DelayConfig> {
    let mut intrinsic = [0u32; MAX_CARRIERS];
    let mut base: ShuffleOrder = Vec::new();
    for (c, carrier) in profile.enabled_carriers() {
        let id = CarrierId::new(profile_idx as usize, c);
        let taps = filters.assignment(id).map_or(1, |f| f.tap_count);
        let stop = link.settings(id).map_or(0, |s| s.data_pipe_stop);
        intrinsic[c] = intrinsic_delay(limits.datapath_clock_khz, carrier.sample_rate_khz, taps, stop);
        let _ = base.push(c as u8);
    }
    // Ties keep carrier order
    base.sort_unstable_by_key(|&c| (Reverse(intrinsic[c as usize]), c));

    let mut perm: Vec<usize, MAX_CARRIERS> = (0..base.len()).collect();
    let mut order: ShuffleOrder = base.clone();
    let mut best: Option<Candidate> = None;
    let mut tried = 0usize;

    loop {
        for (slot, &i) in order.iter_mut().zip(perm.iter()) {
            *slot = base[i];
        }
        tried += 1;

        if let Some(candidate) = evaluate(&order, &intrinsic, limits) {
            if candidate.mismatch <= limits.delay_threshold_cycles {
                log::debug!(
                    "profile {}: shuffle {:?} after {} candidates, mismatch {} cycles",
                    profile_idx,
                    order.as_slice(),
                    tried,
                    candidate.mismatch
                );
                return Ok(DelayConfig {
                    buffer_cycles: candidate.buffers,
                    shuffle: order,
                    latency_cycles: candidate.latency,
                    mismatch_cycles: candidate.mismatch,
                });
            }
            if best.map_or(true, |b| candidate.mismatch < b.mismatch) {
                best = Some(candidate);
            }
        }

        if tried >= limits.max_shuffle_candidates || !next_permutation(&mut perm) {
            break;
        }
    }

    let Some(best) = best else {
        log::warn!("profile {}: delay buffers exceed channel memory", profile_idx);
        return Err(CapacityError::DelayBuffer {
            profile: profile_idx,
        }
        .into());
    };
    let best_cycles = best.mismatch;
    log::warn!(
        "profile {}: no shuffle within {} cycles after {} candidates (best {})",
        profile_idx,
        limits.delay_threshold_cycles,
        tried,
        best_cycles
    );
    Err(SolveError::DelayMismatch {
        profile: profile_idx,
        best_cycles,
        threshold_cycles: limits.delay_threshold_cycles,
    })
}
