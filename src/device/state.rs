//! Per-Direction Chain State
//!
//! Tracks what is staged and what has been committed for one direction.
//! Committed state advances only as Apply steps complete.

use crate::carrier::chain::ChainInit;
use crate::carrier::link::CarrierJesdCfg;
use crate::carrier::solution::{CarrierRuntime, ReconfigSolution};
use crate::config::{MAX_CARRIERS, MAX_CHANNELS};
use crate::types::Profile;

/// Where a direction is in the solve / apply cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// Nothing staged since bring-up or the last apply
    #[default]
    Idle,
    /// A solution is staged
    Solved,
    /// The last apply completed
    Applied,
    /// The last apply stopped part way; hardware holds a mix of old and new
    PartiallyApplied,
}

/// Committed carrier configuration of one channel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelState {
    /// Profile index the channel belongs to
    pub profile_index: u8,
    /// Carrier set as last applied
    pub profile: Profile,
    /// Programmed state per carrier, `None` for disabled carriers
    pub carriers: [Option<CarrierRuntime>; MAX_CARRIERS],
}

impl ChannelState {
    /// Total latency per carrier, zero for disabled carriers
    #[must_use]
    pub fn latency(&self) -> [u32; MAX_CARRIERS] {
        self.carriers
            .map(|c| c.map_or(0, |runtime| runtime.latency_cycles))
    }
}

/// State of one direction
#[derive(Clone, Debug)]
pub(crate) struct ChainState {
    pub(crate) init: ChainInit,
    pub(crate) staged: Option<ReconfigSolution>,
    pub(crate) phase: Phase,
    pub(crate) channels: [Option<ChannelState>; MAX_CHANNELS],
    pub(crate) jesd: CarrierJesdCfg,
}

impl ChainState {
    pub(crate) const fn new(init: ChainInit) -> Self {
        Self {
            init,
            staged: None,
            phase: Phase::Idle,
            channels: [None; MAX_CHANNELS],
            jesd: CarrierJesdCfg::new(0),
        }
    }
}
