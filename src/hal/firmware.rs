//! Auxiliary Processor Commands
//!
//! Carrier reconfiguration is executed partly by firmware running on the
//! device's auxiliary processors. Each processor owns a subset of channels; a
//! channel-scoped command is dispatched to owners until the acknowledged
//! channels cover the request.
//!
//! Payloads are little-endian and bounded by [`MAX_COMMAND_PAYLOAD`].

use heapless::Vec;

use crate::carrier::filter::FilterAssignment;
use crate::config::{MAX_CARRIERS, MAX_COMMAND_PAYLOAD, MAX_PROCESSORS};
use crate::error::{ApplyError, ApplyResult, TransportError};
use crate::types::{ChannelMask, Direction, Profile};

/// Encoded command payload
pub type Payload = Vec<u8, MAX_COMMAND_PAYLOAD>;

/// Auxiliary processor identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ProcessorId(pub u8);

/// Firmware command identifiers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum CommandId {
    /// Write a run of coefficients into the shared filter table
    LoadCoefficients = 0x0140,
    /// Bind carriers of one profile to their table entries
    LoadFilterConfig = 0x0141,
    /// Reconfigure carriers on the channels of one profile
    CarrierReconfigure = 0x0142,
}

impl CommandId {
    /// Wire value
    #[must_use]
    pub const fn code(self) -> u16 {
        self as u16
    }
}

/// Firmware reply to one command
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommandResponse {
    /// Zero on success, firmware error code otherwise
    pub status: u32,
    /// Channels the processor executed the command on
    pub channel_mask: ChannelMask,
}

impl CommandResponse {
    /// Successful response covering `channel_mask`
    #[must_use]
    pub const fn ok(channel_mask: ChannelMask) -> Self {
        Self {
            status: 0,
            channel_mask,
        }
    }
}

/// Command transport to the auxiliary processors
///
/// Blocks until the processor answers or the transport gives up.
pub trait FirmwareLink {
    /// Send `payload` as command `id` to `processor`
    fn send_command(
        &mut self,
        processor: ProcessorId,
        id: CommandId,
        payload: &[u8],
    ) -> Result<CommandResponse, TransportError>;
}

impl<T: FirmwareLink + ?Sized> FirmwareLink for &mut T {
    fn send_command(
        &mut self,
        processor: ProcessorId,
        id: CommandId,
        payload: &[u8],
    ) -> Result<CommandResponse, TransportError> {
        (**self).send_command(processor, id, payload)
    }
}

/// Which processor owns which channels
///
/// The first entry is the primary processor, which receives commands that are
/// not channel scoped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessorTable {
    entries: Vec<(ProcessorId, ChannelMask), MAX_PROCESSORS>,
}

impl ProcessorTable {
    /// Table with a single processor owning `channels`
    #[must_use]
    pub fn single(processor: ProcessorId, channels: ChannelMask) -> Self {
        let mut entries = Vec::new();
        // Capacity is at least one
        let _ = entries.push((processor, channels));
        Self { entries }
    }

    /// Table from explicit entries, `None` if there are none or too many
    #[must_use]
    pub fn from_entries(entries: &[(ProcessorId, ChannelMask)]) -> Option<Self> {
        if entries.is_empty() {
            return None;
        }
        Vec::from_slice(entries).ok().map(|entries| Self { entries })
    }

    /// Processor that handles table-wide commands
    #[must_use]
    pub fn primary(&self) -> ProcessorId {
        self.entries.first().map_or(ProcessorId(0), |&(p, _)| p)
    }

    /// Ownership entries in dispatch order
    #[must_use]
    pub fn entries(&self) -> &[(ProcessorId, ChannelMask)] {
        &self.entries
    }

    /// Union of every processor's channels
    #[must_use]
    pub fn owned(&self) -> ChannelMask {
        self.entries
            .iter()
            .fold(ChannelMask::NONE, |acc, &(_, mask)| acc.union(mask))
    }
}

/// Commands understood by the carrier firmware
#[derive(Clone, Copy, Debug)]
pub enum Command<'a> {
    /// Coefficients for table entries starting at `offset`
    LoadCoefficients {
        /// Chain the table belongs to
        direction: Direction,
        /// First table entry written
        offset: u16,
        /// Q1.15 coefficients
        coefficients: &'a [i16],
    },
    /// Filter binding of every carrier in a profile
    LoadFilterConfig {
        /// Chain
        direction: Direction,
        /// Profile index in the batch
        profile: u8,
        /// Per-carrier binding, `None` for disabled carriers
        filters: &'a [Option<FilterAssignment>; MAX_CARRIERS],
    },
    /// Carrier set for the channels of a profile
    CarrierReconfigure {
        /// Chain
        direction: Direction,
        /// Commit immediately rather than only check
        apply: bool,
        /// New carrier set
        profile: &'a Profile,
    },
}

impl Command<'_> {
    /// Identifier sent with the payload
    #[must_use]
    pub const fn id(&self) -> CommandId {
        match self {
            Self::LoadCoefficients { .. } => CommandId::LoadCoefficients,
            Self::LoadFilterConfig { .. } => CommandId::LoadFilterConfig,
            Self::CarrierReconfigure { .. } => CommandId::CarrierReconfigure,
        }
    }

    /// Serialize to a bounded little-endian payload
    pub fn encode(&self) -> ApplyResult<Payload> {
        let mut w = PayloadWriter::new();
        match *self {
            Self::LoadCoefficients {
                direction,
                offset,
                coefficients,
            } => {
                w.u8(direction.index() as u8);
                w.u8(0);
                w.u16(offset);
                w.u16(coefficients.len() as u16);
                for &c in coefficients {
                    w.u16(c as u16);
                }
            }
            Self::LoadFilterConfig {
                direction,
                profile,
                filters,
            } => {
                w.u8(direction.index() as u8);
                w.u8(profile);
                for entry in filters {
                    let entry = entry.unwrap_or_default();
                    w.u16(entry.tap_count);
                    w.u16(entry.table_offset);
                    w.u8(u8::from(entry.asymmetric));
                }
            }
            Self::CarrierReconfigure {
                direction,
                apply,
                profile,
            } => {
                w.u8(direction.index() as u8);
                w.u8(u8::from(apply));
                w.u8(profile.channel_mask.bits());
                w.u8(0);
                for carrier in &profile.carriers {
                    w.u8(u8::from(carrier.enabled));
                    w.u32(carrier.center_frequency_khz as u32);
                    w.u32(carrier.sample_rate_khz);
                    w.u32(carrier.ibw_khz);
                    w.u16(carrier.nco_phase_degrees as u16);
                }
            }
        }
        w.finish()
    }
}

/// Little-endian writer that remembers overflow instead of failing per call
struct PayloadWriter {
    buf: Payload,
    len: usize,
}

impl PayloadWriter {
    fn new() -> Self {
        Self {
            buf: Vec::new(),
            len: 0,
        }
    }

    fn bytes(&mut self, bytes: &[u8]) {
        self.len += bytes.len();
        if self.len <= MAX_COMMAND_PAYLOAD {
            let _ = self.buf.extend_from_slice(bytes);
        }
    }

    fn u8(&mut self, v: u8) {
        self.bytes(&[v]);
    }

    fn u16(&mut self, v: u16) {
        self.bytes(&v.to_le_bytes());
    }

    fn u32(&mut self, v: u32) {
        self.bytes(&v.to_le_bytes());
    }

    fn finish(self) -> ApplyResult<Payload> {
        if self.len > MAX_COMMAND_PAYLOAD {
            Err(ApplyError::PayloadTooLarge { len: self.len })
        } else {
            Ok(self.buf)
        }
    }
}

/// Send a table-wide command to the primary processor
pub fn send_primary<F: FirmwareLink + ?Sized>(
    link: &mut F,
    table: &ProcessorTable,
    command: &Command<'_>,
) -> ApplyResult<CommandResponse> {
    let payload = command.encode()?;
    let processor = table.primary();
    let response = link.send_command(processor, command.id(), &payload)?;
    check_status(processor, response)
}

/// Dispatch a channel-scoped command until every requested channel is handled
///
/// Processors are tried in table order, skipping those that own none of the
/// channels still outstanding. Returns the acknowledged channels.
pub fn broadcast<F: FirmwareLink + ?Sized>(
    link: &mut F,
    table: &ProcessorTable,
    command: &Command<'_>,
    requested: ChannelMask,
) -> ApplyResult<ChannelMask> {
    let payload = command.encode()?;
    let mut handled = ChannelMask::NONE;

    for &(processor, owned) in table.entries() {
        let outstanding = requested.difference(handled);
        if outstanding.is_empty() {
            break;
        }
        if !owned.intersects(outstanding) {
            continue;
        }

        let response = link.send_command(processor, command.id(), &payload)?;
        let response = check_status(processor, response)?;
        let acked = ChannelMask::from_bits(response.channel_mask.bits() & requested.bits());
        log::debug!(
            "{:?} on processor {}: handled {:?}",
            command.id(),
            processor.0,
            acked
        );
        handled = handled.union(acked);
    }

    if handled.covers(requested) {
        Ok(handled)
    } else {
        log::warn!(
            "{:?} incomplete: requested {:?}, handled {:?}",
            command.id(),
            requested,
            handled
        );
        Err(ApplyError::IncompleteDispatch { requested, handled })
    }
}

fn check_status(processor: ProcessorId, response: CommandResponse) -> ApplyResult<CommandResponse> {
    if response.status == 0 {
        Ok(response)
    } else {
        Err(ApplyError::Firmware {
            processor: processor.0,
            code: response.status,
        })
    }
}
