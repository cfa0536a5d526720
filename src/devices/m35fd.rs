//! Mackapar M35FD 3.5" floppy drive.
//!
//! HWI operations, selected by A:
//!
//! | A | effect |
//! |---|--------|
//! | 0 | poll: B = state, C = last error; the error is then cleared |
//! | 1 | interrupt with message X on every state or error change |
//! | 2 | read sector X into memory at Y; B = 1 if the transfer started |
//! | 3 | write sector X from memory at Y; B = 1 if the transfer started |
//!
//! Transfers are not instant. A started transfer first seeks the head
//! (2.4 ms per track of travel) and then moves the sector at 30700 words per
//! second, with time supplied through [`Device::update`]. The drive is busy
//! for the whole transfer and checks the medium after the seek and again
//! before the copy, so ejecting mid-transfer aborts it with
//! [`DriveError::Eject`].

use std::any::Any;
use std::collections::BTreeMap;
use std::time::Duration;

use tracing::{debug, trace, warn};

use super::{device_id, manufacturer_id, Device, Processor};
use crate::cpu::Register;
use crate::error::{MediaError, StateError};
use crate::io::{ReadLeExt, WriteLeExt};
use crate::word;

pub const WORDS_PER_SECTOR: usize = 512;
pub const SECTORS_PER_TRACK: u16 = 18;
pub const TRACKS: u16 = 80;
pub const SECTORS: u16 = SECTORS_PER_TRACK * TRACKS;
pub const WORDS_PER_DISK: usize = WORDS_PER_SECTOR * SECTORS as usize;

const WORDS_PER_SECOND: u64 = 30_700;

/// Head travel time per track.
pub const SEEK_TIME_PER_TRACK: Duration = Duration::from_micros(2_400);

/// Time to move one sector past the head.
pub const SECTOR_TIME: Duration =
    Duration::from_nanos(WORDS_PER_SECTOR as u64 * 1_000_000_000 / WORDS_PER_SECOND);

const POLL_DEVICE: u16 = 0;
const SET_INTERRUPT: u16 = 1;
const READ_SECTOR: u16 = 2;
const WRITE_SECTOR: u16 = 3;

const MEDIUM_MAGIC: u32 = 0xdbb0_cae1;
const MEDIUM_VERSION: u32 = 1;
const MEDIUM_FORMAT: &str = "M35FD medium";

pub type Sector = [u16; WORDS_PER_SECTOR];

/// Drive state reported in B by a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum DriveState {
    NoMedia = 0,
    Ready = 1,
    ReadyWp = 2,
    Busy = 3,
}

/// Last error reported in C by a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum DriveError {
    None = 0,
    Busy = 1,
    NoMedia = 2,
    Protected = 3,
    Eject = 4,
    BadSector = 5,
    Broken = 0xffff,
}

/// Track holding `sector`.
pub const fn track_for_sector(sector: u16) -> u16 {
    sector / SECTORS_PER_TRACK
}

/// A floppy disk. Sectors that were never written read as zeros and are not
/// stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloppyDisk {
    label: String,
    write_protected: bool,
    sectors: BTreeMap<u16, Box<Sector>>,
}

impl FloppyDisk {
    pub fn blank(label: impl Into<String>) -> Self {
        Self {
            label: clamp_label(label.into()),
            write_protected: false,
            sectors: BTreeMap::new(),
        }
    }

    /// Lays `words` out from sector 0 onwards.
    pub fn from_image(label: impl Into<String>, words: &[u16]) -> Result<Self, MediaError> {
        if words.len() > WORDS_PER_DISK {
            return Err(MediaError::TooLarge {
                words: words.len(),
                capacity: WORDS_PER_DISK,
            });
        }
        let mut disk = Self::blank(label);
        for (index, chunk) in words.chunks(WORDS_PER_SECTOR).enumerate() {
            disk.sector_mut(index as u16)[..chunk.len()].copy_from_slice(chunk);
        }
        Ok(disk)
    }

    /// Builds a disk from a raw big-endian image file.
    pub fn from_be_bytes(label: impl Into<String>, bytes: &[u8]) -> Result<Self, MediaError> {
        Self::from_image(label, &word::words_from_be_bytes(bytes))
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = clamp_label(label.into());
    }

    pub fn is_write_protected(&self) -> bool {
        self.write_protected
    }

    pub fn set_write_protected(&mut self, write_protected: bool) {
        self.write_protected = write_protected;
    }

    /// Contents of `sector`, or `None` if it was never written.
    pub fn sector(&self, sector: u16) -> Option<&Sector> {
        self.sectors.get(&sector).map(|data| &**data)
    }

    /// Mutable contents of `sector`, materializing it as zeros if needed.
    ///
    /// # Panics
    ///
    /// Panics if `sector` is not below [`SECTORS`].
    pub fn sector_mut(&mut self, sector: u16) -> &mut Sector {
        assert!(sector < SECTORS, "sector {sector} is outside the disk");
        self.sectors
            .entry(sector)
            .or_insert_with(|| Box::new([0; WORDS_PER_SECTOR]))
    }

    /// Number of stored sectors.
    pub fn populated_sectors(&self) -> usize {
        self.sectors.len()
    }

    /// Serializes the disk to the little-endian medium format.
    pub fn encode(&self) -> Vec<u8> {
        let mut out =
            Vec::with_capacity(16 + self.label.len() + self.sectors.len() * (2 + 2 * WORDS_PER_SECTOR));
        out.put_u32_le(MEDIUM_MAGIC);
        out.put_u32_le(MEDIUM_VERSION);
        out.put_u16_le(self.label.len() as u16);
        out.extend_from_slice(self.label.as_bytes());
        out.put_bool(self.write_protected);
        out.put_i32_le(self.sectors.len() as i32);
        for (&number, data) in &self.sectors {
            out.put_u16_le(number);
            out.put_words_le(&data[..]);
        }
        out
    }

    /// Parses the medium format.
    pub fn decode(bytes: &[u8]) -> Result<Self, StateError> {
        let mut reader = bytes;
        let io = StateError::io;

        let magic = reader.read_u32_le().map_err(io(MEDIUM_FORMAT))?;
        if magic != MEDIUM_MAGIC {
            return Err(StateError::InvalidMagic {
                format: MEDIUM_FORMAT,
                expected: MEDIUM_MAGIC,
                found: magic,
            });
        }
        let version = reader.read_u32_le().map_err(io(MEDIUM_FORMAT))?;
        if version != MEDIUM_VERSION {
            return Err(StateError::UnsupportedVersion {
                format: MEDIUM_FORMAT,
                expected: MEDIUM_VERSION,
                found: version,
            });
        }

        let label_len = reader.read_u16_le().map_err(io(MEDIUM_FORMAT))? as usize;
        let mut label = vec![0u8; label_len];
        std::io::Read::read_exact(&mut reader, &mut label).map_err(io(MEDIUM_FORMAT))?;
        let label = String::from_utf8(label).map_err(|_| StateError::Corrupt {
            format: MEDIUM_FORMAT,
            reason: "label is not valid UTF-8",
        })?;
        let write_protected = reader.read_bool().map_err(io(MEDIUM_FORMAT))?;

        let count = reader.read_i32_le().map_err(io(MEDIUM_FORMAT))?;
        if !(0..=SECTORS as i32).contains(&count) {
            return Err(StateError::Corrupt {
                format: MEDIUM_FORMAT,
                reason: "sector count out of range",
            });
        }

        let mut sectors = BTreeMap::new();
        for _ in 0..count {
            let number = reader.read_u16_le().map_err(io(MEDIUM_FORMAT))?;
            if number >= SECTORS {
                return Err(StateError::Corrupt {
                    format: MEDIUM_FORMAT,
                    reason: "sector number outside the disk",
                });
            }
            let mut data = Box::new([0u16; WORDS_PER_SECTOR]);
            reader.read_words_le(&mut data[..]).map_err(io(MEDIUM_FORMAT))?;
            if sectors.insert(number, data).is_some() {
                return Err(StateError::Corrupt {
                    format: MEDIUM_FORMAT,
                    reason: "duplicate sector",
                });
            }
        }

        if !reader.is_empty() {
            return Err(StateError::Corrupt {
                format: MEDIUM_FORMAT,
                reason: "trailing bytes",
            });
        }

        Ok(Self {
            label,
            write_protected,
            sectors,
        })
    }
}

/// Cuts a label to what the medium format's `u16` length can hold.
fn clamp_label(mut label: String) -> String {
    let max = u16::MAX as usize;
    if label.len() > max {
        let mut end = max;
        while !label.is_char_boundary(end) {
            end -= 1;
        }
        label.truncate(end);
    }
    label
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Read,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Seeking,
    Transferring,
}

/// A transfer in flight.
#[derive(Debug, Clone, Copy)]
struct Transfer {
    direction: Direction,
    sector: u16,
    address: u16,
    phase: Phase,
    /// Time left in the current phase.
    remaining: Duration,
    /// Set when the medium leaves the drive, even if another is inserted
    /// before the next check.
    media_lost: bool,
}

#[derive(Debug)]
pub struct M35fd {
    disk: Option<FloppyDisk>,
    state: DriveState,
    error: DriveError,
    track: u16,
    interrupt_message: u16,
    transfer: Option<Transfer>,
}

impl M35fd {
    /// An empty drive.
    pub fn new() -> Self {
        Self {
            disk: None,
            state: DriveState::NoMedia,
            error: DriveError::None,
            track: 0,
            interrupt_message: 0,
            transfer: None,
        }
    }

    /// A drive with `disk` already inserted.
    pub fn with_disk(disk: FloppyDisk) -> Self {
        let state = ready_state(&disk);
        Self {
            disk: Some(disk),
            state,
            ..Self::new()
        }
    }

    pub fn state(&self) -> DriveState {
        self.state
    }

    pub fn error(&self) -> DriveError {
        self.error
    }

    pub fn track(&self) -> u16 {
        self.track
    }

    pub fn interrupt_message(&self) -> u16 {
        self.interrupt_message
    }

    pub fn disk(&self) -> Option<&FloppyDisk> {
        self.disk.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.transfer.is_some()
    }

    /// Inserts `disk`, ejecting and returning any disk already present.
    pub fn insert(&mut self, cpu: &mut dyn Processor, disk: FloppyDisk) -> Option<FloppyDisk> {
        let previous = self.eject(cpu);
        debug!(label = disk.label(), "floppy inserted");
        self.disk = Some(disk);
        self.settle_state(cpu);
        previous
    }

    /// Removes the disk. A transfer in flight aborts at its next check.
    pub fn eject(&mut self, cpu: &mut dyn Processor) -> Option<FloppyDisk> {
        let disk = self.disk.take()?;
        debug!(label = disk.label(), "floppy ejected");
        if let Some(transfer) = self.transfer.as_mut() {
            transfer.media_lost = true;
        }
        self.settle_state(cpu);
        Some(disk)
    }

    /// Moves to the state the medium implies. A drive with a transfer in
    /// flight stays busy until the transfer completes or aborts.
    fn settle_state(&mut self, cpu: &mut dyn Processor) {
        if self.transfer.is_some() {
            return;
        }
        let state = match &self.disk {
            Some(disk) => ready_state(disk),
            None => DriveState::NoMedia,
        };
        self.set_state(cpu, state);
    }

    fn set_state(&mut self, cpu: &mut dyn Processor, state: DriveState) {
        self.set_error_or_state(cpu, None, Some(state));
    }

    fn set_error(&mut self, cpu: &mut dyn Processor, error: DriveError) {
        self.set_error_or_state(cpu, Some(error), None);
    }

    /// Applies the changes and raises the interrupt message if anything
    /// actually changed.
    fn set_error_or_state(
        &mut self,
        cpu: &mut dyn Processor,
        error: Option<DriveError>,
        state: Option<DriveState>,
    ) {
        let mut changed = false;
        if let Some(error) = error {
            changed |= error != self.error;
            self.error = error;
        }
        if let Some(state) = state {
            changed |= state != self.state;
            self.state = state;
        }
        if changed && self.interrupt_message != 0 {
            cpu.interrupt(self.interrupt_message);
        }
    }

    /// Validates and starts a transfer. Returns whether it started.
    fn start_transfer(
        &mut self,
        cpu: &mut dyn Processor,
        direction: Direction,
        sector: u16,
        address: u16,
    ) -> bool {
        let refusal = match self.state {
            _ if self.transfer.is_some() => Some(DriveError::Busy),
            DriveState::NoMedia => Some(DriveError::NoMedia),
            DriveState::Busy => Some(DriveError::Busy),
            DriveState::ReadyWp if direction == Direction::Write => Some(DriveError::Protected),
            DriveState::Ready | DriveState::ReadyWp => None,
        };
        if let Some(error) = refusal {
            self.set_error(cpu, error);
            return false;
        }
        if sector >= SECTORS {
            warn!(sector, "M35FD transfer requested for a sector outside the disk");
            self.set_error(cpu, DriveError::BadSector);
            return false;
        }

        let distance = track_for_sector(sector).abs_diff(self.track);
        trace!(?direction, sector, address, distance, "M35FD transfer started");
        self.transfer = Some(Transfer {
            direction,
            sector,
            address,
            phase: Phase::Seeking,
            remaining: SEEK_TIME_PER_TRACK * distance as u32,
            media_lost: false,
        });
        self.set_state(cpu, DriveState::Busy);
        true
    }

    /// True if the transfer may proceed. Otherwise records the abort.
    fn check_media(&mut self, cpu: &mut dyn Processor, transfer: &Transfer) -> bool {
        if transfer.media_lost || self.disk.is_none() {
            trace!(sector = transfer.sector, "M35FD transfer aborted, media ejected");
            self.set_error(cpu, DriveError::Eject);
            return false;
        }
        true
    }

    fn finish_seek(&mut self, cpu: &mut dyn Processor, mut transfer: Transfer) {
        if !self.check_media(cpu, &transfer) {
            self.complete(cpu);
            return;
        }
        self.track = track_for_sector(transfer.sector);
        transfer.phase = Phase::Transferring;
        transfer.remaining = SECTOR_TIME;
        self.transfer = Some(transfer);
    }

    fn finish_transfer(&mut self, cpu: &mut dyn Processor, transfer: Transfer) {
        if self.check_media(cpu, &transfer) {
            if let Some(disk) = self.disk.as_mut() {
                match transfer.direction {
                    Direction::Read => match disk.sector(transfer.sector) {
                        Some(data) => cpu.memory_mut().load(transfer.address, &data[..]),
                        None => cpu
                            .memory_mut()
                            .load(transfer.address, &[0; WORDS_PER_SECTOR]),
                    },
                    Direction::Write => {
                        let data = disk.sector_mut(transfer.sector);
                        cpu.memory().read_block(transfer.address, &mut data[..]);
                    }
                }
            }
            trace!(sector = transfer.sector, "M35FD transfer complete");
        }
        self.complete(cpu);
    }

    /// Ends the transfer, returning to ready if the drive is still busy.
    fn complete(&mut self, cpu: &mut dyn Processor) {
        self.transfer = None;
        self.settle_state(cpu);
    }
}

fn ready_state(disk: &FloppyDisk) -> DriveState {
    if disk.is_write_protected() {
        DriveState::ReadyWp
    } else {
        DriveState::Ready
    }
}

impl Default for M35fd {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for M35fd {
    fn friendly_name(&self) -> &str {
        "Mackapar 3.5\" Floppy Drive (M35FD)"
    }

    fn manufacturer_id(&self) -> u32 {
        manufacturer_id::MACKAPAR
    }

    fn device_id(&self) -> u32 {
        device_id::M35FD
    }

    fn version(&self) -> u16 {
        0x000b
    }

    fn on_disconnect(&mut self) {
        self.transfer = None;
        self.error = DriveError::None;
        self.track = 0;
        self.interrupt_message = 0;
        self.state = match &self.disk {
            Some(disk) => ready_state(disk),
            None => DriveState::NoMedia,
        };
    }

    fn on_interrupt(&mut self, cpu: &mut dyn Processor) -> u64 {
        match cpu.register(Register::A) {
            POLL_DEVICE => {
                cpu.set_register(Register::B, self.state as u16);
                cpu.set_register(Register::C, self.error as u16);
                self.set_error(cpu, DriveError::None);
            }
            SET_INTERRUPT => self.interrupt_message = cpu.register(Register::X),
            op @ (READ_SECTOR | WRITE_SECTOR) => {
                let direction = if op == READ_SECTOR {
                    Direction::Read
                } else {
                    Direction::Write
                };
                let sector = cpu.register(Register::X);
                let address = cpu.register(Register::Y);
                let started = self.start_transfer(cpu, direction, sector, address);
                cpu.set_register(Register::B, started as u16);
            }
            _ => {}
        }
        0
    }

    fn update(&mut self, cpu: &mut dyn Processor, elapsed: Duration) {
        let mut budget = elapsed;
        while let Some(mut transfer) = self.transfer {
            if budget < transfer.remaining {
                transfer.remaining -= budget;
                self.transfer = Some(transfer);
                return;
            }
            budget -= transfer.remaining;
            match transfer.phase {
                Phase::Seeking => self.finish_seek(cpu, transfer),
                Phase::Transferring => self.finish_transfer(cpu, transfer),
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
