//! Boot ROM.
//!
//! On any HWI the device copies its ROM image into memory at B. The stock
//! image is a small bootloader that looks for an M35FD and a LEM1802 and
//! boots from the disk, printing a message on the display when it cannot.

use std::any::Any;

use tracing::trace;

use super::{device_id, manufacturer_id, Device, Processor};
use crate::cpu::Register;
use crate::error::MediaError;
use crate::word;

/// Largest ROM image the device accepts.
pub const MAX_FIRMWARE_WORDS: usize = 512;

/// The stock bootloader.
pub const DEFAULT_FIRMWARE: [u16; 178] = [
    0xa8c1, 0x7ce1, 0x0200, 0x7cd2, 0x0200, 0x7f81, 0x0200, 0x39fe, //
    0x9381, 0x1a00, 0x88c3, 0x80d2, 0x7f81, 0x0214, 0x1a20, 0x7c12, //
    0x24c5, 0x7c32, 0x4fd5, 0x1bc1, 0x02a7, 0x7c12, 0xf615, 0x7c32, //
    0x7349, 0x1bc1, 0x02a8, 0x7f81, 0x0201, 0x83d2, 0x02a7, 0x7f81, //
    0x022e, 0x8401, 0x7a40, 0x02a7, 0x8432, 0x7f81, 0x0238, 0x8c01, //
    0x8461, 0x8481, 0x7a40, 0x02a7, 0x8833, 0x7f81, 0x0242, 0x8401, //
    0x7a40, 0x02a7, 0x8832, 0x7f81, 0x025e, 0x7f81, 0x0226, 0x83d2, //
    0x02a8, 0x7f81, 0x025c, 0x7c20, 0x024b, 0x7cc1, 0x0267, 0x7f81, //
    0x0251, 0x83d2, 0x02a8, 0x7f81, 0x025c, 0x7c20, 0x024b, 0x7cc1, //
    0x027f, 0x7f81, 0x0251, 0x83d2, 0x02a8, 0x8b83, 0x7c20, 0x024b, //
    0x7cc1, 0x0296, 0x7f81, 0x0251, 0x8401, 0x7c21, 0x8000, 0x7a40, //
    0x02a8, 0x6381, 0x7ce1, 0x8000, 0x85d2, 0x7f81, 0x025c, 0x3841, //
    0x7c4b, 0xf000, 0x09fe, 0x7f81, 0x0253, 0x7f81, 0x025c, 0x8401, //
    0x8421, 0x8441, 0x8461, 0x8481, 0x84c1, 0x84e1, 0x8761, 0x8781, //
    0x0041, 0x0054, 0x0054, 0x0041, 0x0043, 0x0048, 0x0020, 0x004d, //
    0x0033, 0x0035, 0x0046, 0x0044, 0x0020, 0x0041, 0x004e, 0x0044, //
    0x0020, 0x0052, 0x0045, 0x0042, 0x004f, 0x004f, 0x0054, 0x0000, //
    0x0049, 0x004e, 0x0053, 0x0045, 0x0052, 0x0054, 0x0020, 0x0044, //
    0x0049, 0x0053, 0x004b, 0x0020, 0x0041, 0x004e, 0x0044, 0x0020, //
    0x0052, 0x0045, 0x0042, 0x004f, 0x004f, 0x0054, 0x0000, 0x0044, //
    0x0052, 0x0049, 0x0056, 0x0045, 0x0020, 0x0052, 0x0045, 0x0041, //
    0x0044, 0x0020, 0x0045, 0x0052, 0x0052, 0x004f, 0x0052, 0x0000, //
    0xffff, 0xffff,
];

#[derive(Debug, Clone)]
pub struct Firmware {
    rom: Vec<u16>,
}

impl Firmware {
    /// Firmware with the stock bootloader.
    pub fn new() -> Self {
        Self {
            rom: DEFAULT_FIRMWARE.to_vec(),
        }
    }

    pub fn with_rom(rom: &[u16]) -> Result<Self, MediaError> {
        if rom.len() > MAX_FIRMWARE_WORDS {
            return Err(MediaError::TooLarge {
                words: rom.len(),
                capacity: MAX_FIRMWARE_WORDS,
            });
        }
        Ok(Self { rom: rom.to_vec() })
    }

    /// Firmware from a big-endian ROM file.
    pub fn from_be_bytes(bytes: &[u8]) -> Result<Self, MediaError> {
        Self::with_rom(&word::words_from_be_bytes(bytes))
    }

    pub fn rom(&self) -> &[u16] {
        &self.rom
    }
}

impl Default for Firmware {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for Firmware {
    fn friendly_name(&self) -> &str {
        "DCPU-16 Firmware"
    }

    fn manufacturer_id(&self) -> u32 {
        manufacturer_id::UNKNOWN
    }

    fn device_id(&self) -> u32 {
        device_id::FIRMWARE
    }

    fn version(&self) -> u16 {
        1
    }

    fn on_interrupt(&mut self, cpu: &mut dyn Processor) -> u64 {
        let base = cpu.register(Register::B);
        cpu.memory_mut().load(base, &self.rom);
        trace!(base, words = self.rom.len(), "firmware copied");
        0
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::CpuState;

    #[test]
    fn test_copies_rom_to_b() {
        let mut cpu = CpuState::new();
        let mut firmware = Firmware::new();
        cpu.set_reg(Register::B, 0x1000);
        assert_eq!(firmware.on_interrupt(&mut cpu), 0);
        assert_eq!(cpu.memory().read(0x1000), 0xa8c1);
        assert_eq!(cpu.memory().read(0x1000 + 177), 0xffff);
        assert_eq!(cpu.memory().read(0x1000 + 178), 0);
    }

    #[test]
    fn test_copy_wraps_at_end_of_memory() {
        let mut cpu = CpuState::new();
        let mut firmware = Firmware::with_rom(&[1, 2, 3]).unwrap();
        cpu.set_reg(Register::B, 0xffff);
        firmware.on_interrupt(&mut cpu);
        assert_eq!(cpu.memory().read(0xffff), 1);
        assert_eq!(cpu.memory().read(0x0000), 2);
        assert_eq!(cpu.memory().read(0x0001), 3);
    }

    #[test]
    fn test_rejects_oversized_rom() {
        assert!(Firmware::with_rom(&[0; MAX_FIRMWARE_WORDS]).is_ok());
        assert_eq!(
            Firmware::from_be_bytes(&[0; MAX_FIRMWARE_WORDS * 2 + 1]).unwrap_err(),
            MediaError::TooLarge {
                words: MAX_FIRMWARE_WORDS + 1,
                capacity: MAX_FIRMWARE_WORDS,
            }
        );
    }
}
