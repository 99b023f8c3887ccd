//! Apply sequence
//!
//! Commits a solved reconfiguration in a fixed order:
//! 1. Coefficient table upload, chunk by chunk, to the primary processor
//! 2. Per profile: filter binding, firmware reconfigure on the owning
//!    processors, then the channel registers of every channel in the profile
//! 3. Link crossbar and link rate registers
//!
//! Each step must be acknowledged before the next starts. There is no
//! rollback; the first failure stops the sequence.

use crate::carrier::link::xbar_source;
use crate::carrier::solution::ReconfigSolution;
use crate::config::{DeviceLimits, MAX_CARRIERS, MAX_CARRIER_SLOTS, NUM_BANDS, UNUSED_SLOT};
use crate::device::state::{ChainState, ChannelState};
use crate::error::ApplyResult;
use crate::hal::firmware::{self, Command, FirmwareLink, ProcessorTable};
use crate::hal::registers::{signed_field, BaseAddress, Field, RegisterAccess};

/// Hardware endpoints an apply drives
pub(crate) struct Targets<'a, R, F> {
    pub(crate) regs: &'a mut R,
    pub(crate) firmware: &'a mut F,
    pub(crate) processors: &'a ProcessorTable,
    pub(crate) limits: &'a DeviceLimits,
}

/// Run the whole sequence, advancing `state` per completed step
pub(crate) fn commit<R: RegisterAccess, F: FirmwareLink>(
    targets: &mut Targets<'_, R, F>,
    solution: &ReconfigSolution,
    state: &mut ChainState,
) -> ApplyResult<()> {
    let direction = solution.direction;

    upload_coefficients(targets, solution)?;

    for (p, profile) in solution.profiles.iter().enumerate() {
        if let Some(filters) = solution.filters.profile_assignments(p) {
            firmware::send_primary(
                &mut *targets.firmware,
                targets.processors,
                &Command::LoadFilterConfig {
                    direction,
                    profile: p as u8,
                    filters,
                },
            )?;
        }

        let handled = firmware::broadcast(
            &mut *targets.firmware,
            targets.processors,
            &Command::CarrierReconfigure {
                direction,
                apply: true,
                profile,
            },
            profile.channel_mask,
        )?;
        log::debug!("{:?} profile {}: firmware reconfigured {:?}", direction, p, handled);

        let carriers = solution.runtime(p);
        for ch in profile.channel_mask.channels() {
            program_channel(&mut *targets.regs, solution, p, ch)?;
            state.channels[ch] = Some(ChannelState {
                profile_index: p as u8,
                profile: *profile,
                carriers,
            });
        }
    }

    program_link(&mut *targets.regs, targets.limits, solution)?;
    state.jesd = solution.jesd();

    log::info!(
        "{:?} apply: {} channels reconfigured, link ratio {}",
        direction,
        solution.channels().count(),
        solution.link.link_ratio
    );
    Ok(())
}

fn upload_coefficients<R, F: FirmwareLink>(
    targets: &mut Targets<'_, R, F>,
    solution: &ReconfigSolution,
) -> ApplyResult<()> {
    for (offset, coefficients) in solution.filters.chunks() {
        firmware::send_primary(
            &mut *targets.firmware,
            targets.processors,
            &Command::LoadCoefficients {
                direction: solution.direction,
                offset,
                coefficients,
            },
        )?;
    }
    log::debug!(
        "{:?}: uploaded {} coefficients",
        solution.direction,
        solution.filters.used()
    );
    Ok(())
}

fn program_channel<R: RegisterAccess>(
    regs: &mut R,
    solution: &ReconfigSolution,
    profile: usize,
    channel: usize,
) -> ApplyResult<()> {
    let base = BaseAddress::channel(solution.direction, channel);
    let Some(output) = solution.outputs.get(profile) else {
        return Ok(());
    };

    for b in 0..NUM_BANDS {
        let band = &output.bands.bands[b];
        regs.write_field(base, Field::BandEnable(b as u8), u32::from(band.enabled))?;
        regs.write_field(base, Field::BandCenterFrequency(b as u8), signed_field(band.center_khz))?;
    }

    let runtime = solution.runtime(profile);
    for c in 0..MAX_CARRIERS {
        let ci = c as u8;
        let Some(rt) = runtime[c] else {
            regs.write_field(base, Field::CarrierMixerEnable(ci), 0)?;
            continue;
        };
        regs.write_field(base, Field::CarrierBandSelect(ci), u32::from(rt.band))?;
        regs.write_field(base, Field::CarrierNcoFrequency(ci), signed_field(rt.nco.frequency_shift_khz))?;
        regs.write_field(base, Field::CarrierNcoPhase(ci), rt.nco.phase_degrees)?;
        regs.write_field(base, Field::CarrierRatio(ci), rt.link.ratio)?;
        regs.write_field(base, Field::CarrierDataPipeStop(ci), u32::from(rt.link.data_pipe_stop))?;
        regs.write_field(base, Field::CarrierBypassFilter(ci), u32::from(rt.link.bypass_filter))?;
        regs.write_field(base, Field::CarrierOddTaps(ci), u32::from(rt.link.odd_taps))?;
        regs.write_field(base, Field::CarrierSlot(ci), u32::from(rt.link.slot))?;
        regs.write_field(base, Field::CarrierDelayBuffer(ci), rt.delay_buffer_cycles)?;
        regs.write_field(base, Field::CarrierMixerEnable(ci), u32::from(rt.nco.mixer_enable))?;
    }

    for (pos, &c) in output.delay.shuffle.iter().enumerate() {
        regs.write_field(base, Field::ShufflePosition(pos as u8), u32::from(c))?;
    }
    Ok(())
}

fn program_link<R: RegisterAccess>(
    regs: &mut R,
    limits: &DeviceLimits,
    solution: &ReconfigSolution,
) -> ApplyResult<()> {
    let base = BaseAddress::link(solution.direction);
    let xbar = solution.link.crossbar();
    let usable = limits.carrier_slots.min(MAX_CARRIER_SLOTS);

    for (slot, source) in xbar.iter().enumerate().take(usable) {
        let value = source.map_or(UNUSED_SLOT, xbar_source);
        regs.write_field(base, Field::SampleXbarSlot(slot as u8), value)?;
    }
    regs.write_field(base, Field::LinkSampleRate, solution.link.link_sample_rate_khz)?;
    regs.write_field(base, Field::LinkRatio, solution.link.link_ratio)?;
    Ok(())
}
