//! Shared fixtures for integration tests
//!
//! A recording register bus and a scripted firmware link. Both log into one
//! journal so tests can check the order of register writes against firmware
//! commands.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use sdr_carrier::carrier::chain::{BandInit, ChainInit, ChannelInit};
use sdr_carrier::carrier::filter::{ApplicationSelection, FilterApplication};
use sdr_carrier::carrier::link::CarrierJesdCfg;
use sdr_carrier::config::MAX_CARRIERS;
use sdr_carrier::error::{BusError, TransportError};
use sdr_carrier::hal::firmware::{CommandId, CommandResponse, FirmwareLink, ProcessorId, ProcessorTable};
use sdr_carrier::hal::registers::{BaseAddress, Field, RegisterAccess};
use sdr_carrier::types::{CarrierSpec, ChannelMask, Direction};
use sdr_carrier::Transceiver;

/// Band output rate used by every fixture band
pub const BAND_RATE_KHZ: u32 = 245_760;

/// Link rate used by every fixture
pub const LINK_RATE_KHZ: u32 = 245_760;

/// RF passband of every fixture channel
pub const RF_BANDWIDTH_KHZ: u32 = 400_000;

/// Channels 0-1 in profile 0, channels 2-3 in profile 1
pub const PROFILE0_CHANNELS: ChannelMask = ChannelMask::from_bits(0b0011);
pub const PROFILE1_CHANNELS: ChannelMask = ChannelMask::from_bits(0b1100);

/// One step seen by the fakes
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Command(ProcessorId, CommandId),
    Write(BaseAddress, Field, u32),
}

pub type Journal = Rc<RefCell<Vec<Event>>>;

/// Register bus that remembers every write
#[derive(Default)]
pub struct RecordingBus {
    pub journal: Journal,
    pub values: HashMap<(BaseAddress, Field), u32>,
    pub writes: usize,
    /// Fail the write with this index (0-based)
    pub fail_at: Option<usize>,
}

impl RecordingBus {
    pub fn value(&self, base: BaseAddress, field: Field) -> Option<u32> {
        self.values.get(&(base, field)).copied()
    }
}

impl RegisterAccess for RecordingBus {
    fn write_field(&mut self, base: BaseAddress, field: Field, value: u32) -> Result<(), BusError> {
        let index = self.writes;
        self.writes += 1;
        if self.fail_at == Some(index) {
            return Err(BusError::Transfer);
        }
        self.journal.borrow_mut().push(Event::Write(base, field, value));
        self.values.insert((base, field), value);
        Ok(())
    }

    fn read_field(&mut self, base: BaseAddress, field: Field) -> Result<u32, BusError> {
        Ok(self.value(base, field).unwrap_or(0))
    }
}

/// How a scripted command should fail
#[derive(Clone, Copy, Debug)]
pub enum Failure {
    Status(u32),
    Transport,
}

/// Sent command with its payload
#[derive(Clone, Debug)]
pub struct Sent {
    pub processor: ProcessorId,
    pub id: CommandId,
    pub payload: Vec<u8>,
}

/// Firmware link answering with each processor's ownership
#[derive(Default)]
pub struct ScriptedFirmware {
    pub journal: Journal,
    pub handles: HashMap<u8, ChannelMask>,
    pub sent: Vec<Sent>,
    /// Fail the command with this index (0-based)
    pub fail_at: Option<(usize, Failure)>,
    /// Fail the n-th (0-based) command with this id
    pub fail_on: Option<(CommandId, usize, Failure)>,
}

impl ScriptedFirmware {
    pub fn for_table(table: &ProcessorTable) -> Self {
        Self {
            handles: table.entries().iter().map(|&(p, m)| (p.0, m)).collect(),
            ..Self::default()
        }
    }

    pub fn count(&self, id: CommandId) -> usize {
        self.sent.iter().filter(|s| s.id == id).count()
    }
}

impl FirmwareLink for ScriptedFirmware {
    fn send_command(
        &mut self,
        processor: ProcessorId,
        id: CommandId,
        payload: &[u8],
    ) -> Result<CommandResponse, TransportError> {
        let index = self.sent.len();
        let nth_of_id = self.count(id);
        self.sent.push(Sent {
            processor,
            id,
            payload: payload.to_vec(),
        });
        self.journal.borrow_mut().push(Event::Command(processor, id));

        let failure = match (self.fail_at, self.fail_on) {
            (Some((at, f)), _) if at == index => Some(f),
            (_, Some((fid, n, f))) if fid == id && n == nth_of_id => Some(f),
            _ => None,
        };
        match failure {
            Some(Failure::Transport) => Err(TransportError {
                processor: processor.0,
            }),
            Some(Failure::Status(code)) => Ok(CommandResponse {
                status: code,
                channel_mask: ChannelMask::NONE,
            }),
            None => Ok(CommandResponse::ok(
                self.handles.get(&processor.0).copied().unwrap_or(ChannelMask::NONE),
            )),
        }
    }
}

/// Two processors: 0 owns channels 0-3, 1 owns channels 4-7
pub fn processors() -> ProcessorTable {
    ProcessorTable::from_entries(&[
        (ProcessorId(0), ChannelMask::from_bits(0x0F)),
        (ProcessorId(1), ChannelMask::from_bits(0xF0)),
    ])
    .unwrap()
}

/// Two floating bands per channel
pub fn floating_bands() -> [BandInit; 2] {
    [
        BandInit::floating(BAND_RATE_KHZ, 200_000),
        BandInit::floating(BAND_RATE_KHZ, 200_000),
    ]
}

/// Band 0 pinned at LO, band 1 floating
pub fn pinned_bands() -> [BandInit; 2] {
    [
        BandInit::fixed(0, BAND_RATE_KHZ, 200_000),
        BandInit::floating(BAND_RATE_KHZ, 200_000),
    ]
}

/// Channels 0-1 in profile 0 and 2-3 in profile 1
pub fn chain(bands: [BandInit; 2]) -> ChainInit {
    ChainInit::EMPTY
        .with_channels(PROFILE0_CHANNELS, ChannelInit::new(0, RF_BANDWIDTH_KHZ, bands))
        .with_channels(PROFILE1_CHANNELS, ChannelInit::new(1, RF_BANDWIDTH_KHZ, bands))
}

/// 20 MHz LTE carrier at 30.72 MHz
pub fn lte(center_khz: i32) -> CarrierSpec {
    CarrierSpec::new(center_khz, 30_720, 20_000)
}

/// LTE preset on every carrier
pub const LTE_ALL: ApplicationSelection = [FilterApplication::Lte; MAX_CARRIERS];

pub type Device = Transceiver<RecordingBus, ScriptedFirmware>;

/// Controller over the recording fakes, both directions on `init`
pub fn device(init: ChainInit) -> Device {
    device_with(init, |_, _| {})
}

/// Like [`device`], with a chance to script failures first
pub fn device_with(init: ChainInit, script: impl FnOnce(&mut RecordingBus, &mut ScriptedFirmware)) -> Device {
    let table = processors();
    let journal = Journal::default();
    let mut bus = RecordingBus {
        journal: Rc::clone(&journal),
        ..RecordingBus::default()
    };
    let mut firmware = ScriptedFirmware {
        journal,
        ..ScriptedFirmware::for_table(&table)
    };
    script(&mut bus, &mut firmware);
    Transceiver::new(bus, firmware, table, init, init)
        .with_jesd(Direction::Rx, CarrierJesdCfg::new(LINK_RATE_KHZ))
        .with_jesd(Direction::Tx, CarrierJesdCfg::new(LINK_RATE_KHZ))
}
