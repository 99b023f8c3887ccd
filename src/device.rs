//! Transceiver Carrier Control
//!
//! Entry points for reconfiguring carriers on a running device. Each direction
//! keeps its own state: what it was initialized with, a staged solution, and
//! the configuration last committed.
//!
//! Solving is pure and never touches hardware. Applying commits a staged (or
//! explicitly supplied) solution; it is not atomic and has no rollback, so a
//! failure part way leaves the direction in [`Phase::PartiallyApplied`].

pub mod state;
mod apply;

use crate::carrier::chain::ChainInit;
use crate::carrier::filter::{FilterPresets, WindowedSincPresets};
use crate::carrier::link::CarrierJesdCfg;
use crate::carrier::solution::{self, ReconfigRequest, ReconfigSolution};
use crate::config::{DeviceLimits, MAX_CARRIERS};
use crate::dsp::gain;
use crate::error::{ApplyError, ApplyResult, Error, SolveResult};
use crate::hal::firmware::{FirmwareLink, ProcessorTable};
use crate::hal::registers::{BaseAddress, Field, RegisterAccess};
use crate::types::{CarrierMask, ChannelMask, Direction};

use self::apply::Targets;
pub use self::state::{ChannelState, Phase};
use self::state::ChainState;

/// Carrier control for one device
///
/// Owns the register bus and firmware link; every operation blocks until the
/// hardware acknowledges. Calls must be serialized by the caller.
pub struct Transceiver<R, F, P = WindowedSincPresets> {
    regs: R,
    firmware: F,
    processors: ProcessorTable,
    presets: P,
    limits: DeviceLimits,
    chains: [ChainState; 2],
}

impl<R: RegisterAccess, F: FirmwareLink> Transceiver<R, F> {
    /// Create a controller with the built-in filter presets and default limits
    #[must_use]
    pub fn new(regs: R, firmware: F, processors: ProcessorTable, rx: ChainInit, tx: ChainInit) -> Self {
        Self {
            regs,
            firmware,
            processors,
            presets: WindowedSincPresets,
            limits: DeviceLimits::DEFAULT,
            chains: [ChainState::new(rx), ChainState::new(tx)],
        }
    }
}

impl<R: RegisterAccess, F: FirmwareLink, P: FilterPresets> Transceiver<R, F, P> {
    /// Replace the filter presets (returns new controller)
    #[must_use]
    pub fn with_presets<Q: FilterPresets>(self, presets: Q) -> Transceiver<R, F, Q> {
        Transceiver {
            regs: self.regs,
            firmware: self.firmware,
            processors: self.processors,
            presets,
            limits: self.limits,
            chains: self.chains,
        }
    }

    /// Replace the solver limits (returns new controller)
    #[must_use]
    pub fn with_limits(mut self, limits: DeviceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Seed the link configuration a direction was brought up with
    #[must_use]
    pub fn with_jesd(mut self, direction: Direction, jesd: CarrierJesdCfg) -> Self {
        self.chain_mut(direction).jesd = jesd;
        self
    }

    /// Solver limits in use
    #[must_use]
    pub const fn limits(&self) -> &DeviceLimits {
        &self.limits
    }

    /// Register bus
    #[must_use]
    pub const fn registers(&self) -> &R {
        &self.regs
    }

    /// Firmware link
    #[must_use]
    pub const fn firmware(&self) -> &F {
        &self.firmware
    }

    /// Give back the register bus and firmware link
    pub fn release(self) -> (R, F) {
        (self.regs, self.firmware)
    }

    fn chain(&self, direction: Direction) -> &ChainState {
        &self.chains[direction.index()]
    }

    fn chain_mut(&mut self, direction: Direction) -> &mut ChainState {
        &mut self.chains[direction.index()]
    }

    /// Where a direction is in the solve / apply cycle
    #[must_use]
    pub fn phase(&self, direction: Direction) -> Phase {
        self.chain(direction).phase
    }

    /// Solution waiting to be applied
    #[must_use]
    pub fn staged(&self, direction: Direction) -> Option<&ReconfigSolution> {
        self.chain(direction).staged.as_ref()
    }

    /// Solve without staging anything
    pub fn calculate(&self, direction: Direction, request: &ReconfigRequest<'_>) -> SolveResult<ReconfigSolution> {
        solution::solve(
            direction,
            &self.chain(direction).init,
            request,
            &self.presets,
            &self.limits,
        )
    }

    /// Solve and stage the result for [`Self::apply`]
    ///
    /// A failed solve leaves any previously staged solution in place.
    pub fn solve(&mut self, direction: Direction, request: &ReconfigRequest<'_>) -> SolveResult<&ReconfigSolution> {
        let solved = self.calculate(direction, request).map_err(|err| {
            log::warn!("{:?} solve failed: {}", direction, err);
            err
        })?;
        let chain = self.chain_mut(direction);
        chain.phase = Phase::Solved;
        Ok(chain.staged.insert(solved))
    }

    /// Commit the staged solution of a direction
    ///
    /// The solution stays staged until the next successful solve.
    pub fn apply(&mut self, direction: Direction) -> ApplyResult<()> {
        let Some(solution) = self.chain_mut(direction).staged.take() else {
            return Err(ApplyError::NoSolutionStaged);
        };
        let result = self.apply_solution(&solution);
        self.chain_mut(direction).staged = Some(solution);
        result
    }

    /// Commit an explicit solution
    pub fn apply_solution(&mut self, solution: &ReconfigSolution) -> ApplyResult<()> {
        let direction = solution.direction;
        let mut targets = Targets {
            regs: &mut self.regs,
            firmware: &mut self.firmware,
            processors: &self.processors,
            limits: &self.limits,
        };
        let chain = &mut self.chains[direction.index()];

        match apply::commit(&mut targets, solution, chain) {
            Ok(()) => {
                chain.phase = Phase::Applied;
                Ok(())
            }
            Err(err) => {
                log::warn!("{:?} apply stopped: {}", direction, err);
                chain.phase = Phase::PartiallyApplied;
                Err(err)
            }
        }
    }

    /// Solve, stage and commit in one call
    pub fn solve_and_apply(&mut self, direction: Direction, request: &ReconfigRequest<'_>) -> Result<(), Error> {
        self.solve(direction, request)?;
        self.apply(direction)?;
        Ok(())
    }

    /// Committed carrier configuration of a channel
    #[must_use]
    pub fn carrier_settings(&self, direction: Direction, channel: usize) -> Option<&ChannelState> {
        self.chain(direction).channels.get(channel)?.as_ref()
    }

    /// Link configuration as last applied
    #[must_use]
    pub fn jesd_config(&self, direction: Direction) -> &CarrierJesdCfg {
        &self.chain(direction).jesd
    }

    /// Per-carrier latency of a channel as last applied
    #[must_use]
    pub fn carrier_latency(&self, direction: Direction, channel: usize) -> Option<[u32; MAX_CARRIERS]> {
        self.carrier_settings(direction, channel)
            .map(ChannelState::latency)
    }

    /// Program the digital gain of selected carriers on selected channels
    pub fn set_carrier_gain(
        &mut self,
        direction: Direction,
        channels: ChannelMask,
        carriers: CarrierMask,
        gain_mdb: i32,
    ) -> ApplyResult<()> {
        let available = self.chain(direction).init.available();
        if channels.is_empty() || carriers.is_empty() || !available.covers(channels) {
            return Err(ApplyError::InvalidSelection);
        }
        let multiplier = gain::to_multiplier(gain_mdb).ok_or(ApplyError::GainRange { gain_mdb })?;

        for ch in channels.channels() {
            let base = BaseAddress::channel(direction, ch);
            for c in carriers.carriers() {
                self.regs.write_field(base, Field::CarrierGain(c as u8), multiplier)?;
                self.regs.write_field(base, Field::CarrierGainEnable(c as u8), 1)?;
            }
        }
        log::debug!(
            "{:?} gain {} mdB on channels {:?} carriers {:#010b}",
            direction,
            gain_mdb,
            channels,
            carriers.bits()
        );
        Ok(())
    }

    /// Read back the digital gain of one carrier
    pub fn carrier_gain(&mut self, direction: Direction, channel: usize, carrier: usize) -> ApplyResult<i32> {
        let in_chain = ChannelMask::single(channel)
            .is_some_and(|mask| self.chain(direction).init.available().covers(mask));
        if !in_chain || carrier >= MAX_CARRIERS {
            return Err(ApplyError::InvalidSelection);
        }
        let raw = self
            .regs
            .read_field(BaseAddress::channel(direction, channel), Field::CarrierGain(carrier as u8))?;
        Ok(gain::from_multiplier(raw))
    }
}
