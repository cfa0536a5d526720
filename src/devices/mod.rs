//! Hardware devices for the DCPU-16 bus.
//!
//! This module defines the contract between the CPU and its peripherals and
//! provides the stock devices.
//!
//! # Architecture
//!
//! - **Device trait**: identity (the four values HWQ reports) plus connect,
//!   disconnect, interrupt and per-tick update callbacks
//! - **Processor trait**: the handle a device gets to the CPU's registers,
//!   memory and interrupt line
//! - **DeviceBus**: the ordered slot array the CPU owns; a slot's index is the
//!   device's hardware id
//! - **Device implementations**: clock, keyboard, LEM1802 display, M35FD
//!   floppy drive and a firmware ROM
//!
//! Disconnecting a device leaves a [`DeviceSlot::Disconnected`] placeholder
//! so that the hardware ids of later devices stay stable.
//!
//! # Example
//!
//! ```rust
//! use dcpu16::devices::{GenericClock, GenericKeyboard, Key};
//! use dcpu16::{Dcpu16, Register};
//!
//! let mut cpu = Dcpu16::new();
//! let clock = cpu.connect(Box::new(GenericClock::new())).unwrap();
//! let keyboard = cpu.connect(Box::new(GenericKeyboard::new())).unwrap();
//! assert_eq!((clock, keyboard), (0, 1));
//!
//! // The host feeds key presses through the device handle
//! cpu.with_device(keyboard, |kb: &mut GenericKeyboard, cpu| kb.key_down(cpu, Key::Char('a')));
//! assert_eq!(cpu.device::<GenericKeyboard>(keyboard).unwrap().buffered(), 1);
//! ```

use std::any::Any;
use std::fmt;
use std::time::Duration;

use tracing::debug;

use crate::cpu::Register;
use crate::error::BusError;
use crate::memory::Memory;

pub mod clock;
pub mod firmware;
pub mod keyboard;
pub mod lem1802;
pub mod m35fd;

pub use clock::GenericClock;
pub use firmware::Firmware;
pub use keyboard::{GenericKeyboard, Key};
pub use lem1802::Lem1802;
pub use m35fd::{FloppyDisk, M35fd};

/// Known device ids.
pub mod device_id {
    pub const GENERIC_CLOCK: u32 = 0x12d0_b402;
    pub const GENERIC_KEYBOARD: u32 = 0x30cf_7406;
    pub const LEM1802: u32 = 0x7349_f615;
    pub const M35FD: u32 = 0x4fd5_24c5;
    pub const FIRMWARE: u32 = 0x3746_4b39;
}

/// Known manufacturer ids.
pub mod manufacturer_id {
    pub const UNKNOWN: u32 = 0;
    pub const NYA_ELEKTRISKA: u32 = 0x1c6c_8b36;
    pub const MACKAPAR: u32 = 0x1eb3_7e91;
}

/// The CPU as seen by a device.
///
/// Devices read their operation selector and arguments from registers (A
/// selects the operation by convention), move data through memory, and raise
/// interrupts. All address arithmetic wraps.
pub trait Processor {
    fn register(&self, register: Register) -> u16;

    fn set_register(&mut self, register: Register, value: u16);

    fn memory(&self) -> &Memory;

    fn memory_mut(&mut self) -> &mut Memory;

    /// Raises an interrupt with `message`, following the CPU's queueing
    /// rules.
    fn interrupt(&mut self, message: u16);

    fn read_word(&self, addr: u16) -> u16 {
        self.memory().read(addr)
    }

    fn write_word(&mut self, addr: u16, value: u16) {
        self.memory_mut().write(addr, value);
    }
}

/// A peripheral on the DCPU-16 bus.
///
/// The identity accessors must return the same values for the lifetime of
/// the device. The callbacks receive the CPU handle for the duration of the
/// call only; a device never holds on to it.
///
/// # Examples
///
/// ```rust
/// use std::any::Any;
/// use dcpu16::devices::{Device, Processor};
/// use dcpu16::Register;
///
/// /// Answers every HWI by writing 0xcafe to C.
/// struct Beacon;
///
/// impl Device for Beacon {
///     fn friendly_name(&self) -> &str { "Beacon" }
///     fn manufacturer_id(&self) -> u32 { 0 }
///     fn device_id(&self) -> u32 { 0xbeac_0000 }
///     fn version(&self) -> u16 { 1 }
///
///     fn on_interrupt(&mut self, cpu: &mut dyn Processor) -> u64 {
///         cpu.set_register(Register::C, 0xcafe);
///         0
///     }
///
///     fn as_any(&self) -> &dyn Any { self }
///     fn as_any_mut(&mut self) -> &mut dyn Any { self }
/// }
/// ```
pub trait Device: Any {
    fn friendly_name(&self) -> &str;

    fn manufacturer_id(&self) -> u32;

    fn device_id(&self) -> u32;

    fn version(&self) -> u16;

    /// Called once the device has a hardware id.
    fn on_connect(&mut self, _cpu: &mut dyn Processor, _hardware_id: u16) {}

    /// Called when the device leaves the bus. Any pending work is cancelled.
    fn on_disconnect(&mut self) {}

    /// Handles HWI. Returns the cycles the operation costs beyond HWI's own.
    fn on_interrupt(&mut self, cpu: &mut dyn Processor) -> u64;

    /// Advances device time by `elapsed`.
    fn update(&mut self, _cpu: &mut dyn Processor, _elapsed: Duration) {}

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// The three values HWQ reports for a hardware id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HardwareInfo {
    pub device_id: u32,
    pub manufacturer_id: u32,
    pub version: u16,
}

/// Name reported for a disconnected slot.
pub const DISCONNECTED_NAME: &str = "Disconnected Device";

/// One position on the bus.
pub enum DeviceSlot {
    Connected(Box<dyn Device>),
    /// Left behind by a disconnect. Reports zeros and ignores HWI.
    Disconnected,
}

impl DeviceSlot {
    pub fn friendly_name(&self) -> &str {
        match self {
            DeviceSlot::Connected(device) => device.friendly_name(),
            DeviceSlot::Disconnected => DISCONNECTED_NAME,
        }
    }

    pub fn info(&self) -> HardwareInfo {
        match self {
            DeviceSlot::Connected(device) => HardwareInfo {
                device_id: device.device_id(),
                manufacturer_id: device.manufacturer_id(),
                version: device.version(),
            },
            DeviceSlot::Disconnected => HardwareInfo::default(),
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, DeviceSlot::Connected(_))
    }
}

impl fmt::Debug for DeviceSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceSlot::Connected(device) => {
                f.debug_tuple("Connected").field(&device.friendly_name()).finish()
            }
            DeviceSlot::Disconnected => f.write_str("Disconnected"),
        }
    }
}

/// Ordered device slots, indexed by hardware id.
///
/// Capped at 65535 devices so HWN can always report the count in one word.
#[derive(Debug, Default)]
pub struct DeviceBus {
    slots: Vec<DeviceSlot>,
}

impl DeviceBus {
    pub const CAPACITY: usize = u16::MAX as usize;

    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[DeviceSlot] {
        &self.slots
    }

    /// Appends `device` and runs its connect callback.
    pub fn connect(
        &mut self,
        mut device: Box<dyn Device>,
        cpu: &mut dyn Processor,
    ) -> Result<u16, BusError> {
        if self.slots.len() >= Self::CAPACITY {
            return Err(BusError::Full {
                capacity: Self::CAPACITY,
            });
        }
        let hardware_id = self.slots.len() as u16;
        debug!(hardware_id, device = device.friendly_name(), "device connected");
        device.on_connect(cpu, hardware_id);
        self.slots.push(DeviceSlot::Connected(device));
        Ok(hardware_id)
    }

    /// Swaps the slot for a placeholder and returns the device.
    pub fn disconnect(&mut self, hardware_id: u16) -> Option<Box<dyn Device>> {
        let slot = self.slots.get_mut(hardware_id as usize)?;
        match std::mem::replace(slot, DeviceSlot::Disconnected) {
            DeviceSlot::Connected(mut device) => {
                debug!(hardware_id, device = device.friendly_name(), "device disconnected");
                device.on_disconnect();
                Some(device)
            }
            DeviceSlot::Disconnected => None,
        }
    }

    /// Disconnects every device in bus order and clears the bus.
    pub fn disconnect_all(&mut self) -> Vec<Box<dyn Device>> {
        let devices = (0..self.slots.len())
            .filter_map(|id| self.disconnect(id as u16))
            .collect();
        self.slots.clear();
        devices
    }

    pub fn get(&self, hardware_id: u16) -> Option<&(dyn Device + 'static)> {
        match self.slots.get(hardware_id as usize)? {
            DeviceSlot::Connected(device) => Some(device.as_ref()),
            DeviceSlot::Disconnected => None,
        }
    }

    pub fn get_mut(&mut self, hardware_id: u16) -> Option<&mut (dyn Device + 'static)> {
        match self.slots.get_mut(hardware_id as usize)? {
            DeviceSlot::Connected(device) => Some(device.as_mut()),
            DeviceSlot::Disconnected => None,
        }
    }

    /// HWQ view of a slot. Unknown ids report zeros like a placeholder.
    pub fn query(&self, hardware_id: u16) -> HardwareInfo {
        self.slots
            .get(hardware_id as usize)
            .map(DeviceSlot::info)
            .unwrap_or_default()
    }

    /// Dispatches HWI to a device. Returns its extra cycles, zero for an
    /// empty or unknown slot.
    pub fn interrupt(&mut self, hardware_id: u16, cpu: &mut dyn Processor) -> u64 {
        match self.get_mut(hardware_id) {
            Some(device) => device.on_interrupt(cpu),
            None => 0,
        }
    }

    /// Runs each connected device's update in bus order.
    pub fn update(&mut self, cpu: &mut dyn Processor, elapsed: Duration) {
        for slot in &mut self.slots {
            if let DeviceSlot::Connected(device) = slot {
                device.update(cpu, elapsed);
            }
        }
    }
}
