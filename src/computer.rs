//! # Computer
//!
//! The host-facing wrapper around a [`Dcpu16`]: it keeps the peripherals
//! while the machine is off, connects them in order at power on, and turns
//! host frame time into cycle budgets.
//!
//! ## Tick Loop
//!
//! Each [`Computer::tick`]:
//! 1. Executes `round(elapsed * clock_hz)` cycles, capped by
//!    [`ComputerConfig::max_cycles_per_tick`], unless the CPU is halted with
//!    no wake-up pending
//! 2. Runs every device's update in bus order
//! 3. Reports the cycles run, the power state and the on-fire flag
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use dcpu16::devices::GenericClock;
//! use dcpu16::{Computer, ComputerConfig, PowerState};
//!
//! let mut computer = Computer::new(ComputerConfig::default());
//! computer.attach(Box::new(GenericClock::new())).unwrap();
//!
//! // ADD PC, -1
//! computer.power_on(&[0x83, 0x82]).unwrap();
//! let report = computer.tick(Duration::from_millis(10));
//! assert_eq!(report.state, PowerState::Halted);
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cpu::Dcpu16;
use crate::devices::{Device, DeviceBus, Processor};
use crate::error::BusError;

/// Number of ticks the clock-rate average covers.
const CLOCK_RATE_WINDOW: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputerConfig {
    /// Nominal CPU frequency.
    pub clock_hz: u32,
    /// Upper bound on the cycles one tick may request, so a long host stall
    /// does not turn into an equally long burst of emulation.
    pub max_cycles_per_tick: u64,
}

impl Default for ComputerConfig {
    fn default() -> Self {
        Self {
            clock_hz: 100_000,
            max_cycles_per_tick: 100_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    Off,
    Running,
    /// Spinning on `ADD PC, -1`.
    Halted,
}

/// Outcome of one [`Computer::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub cycles: u64,
    pub state: PowerState,
    pub on_fire: bool,
}

pub struct Computer {
    config: ComputerConfig,
    cpu: Dcpu16,
    /// Peripherals waiting for the next power on, in bus order.
    offline: Vec<Box<dyn Device>>,
    powered: bool,
    clock_rates: VecDeque<f64>,
}

impl Computer {
    pub fn new(config: ComputerConfig) -> Self {
        Self {
            config,
            cpu: Dcpu16::new(),
            offline: Vec::new(),
            powered: false,
            clock_rates: VecDeque::with_capacity(CLOCK_RATE_WINDOW),
        }
    }

    pub fn config(&self) -> &ComputerConfig {
        &self.config
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    pub fn cpu(&self) -> &Dcpu16 {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Dcpu16 {
        &mut self.cpu
    }

    /// Adds a peripheral. While powered it is connected at once and its
    /// hardware id returned; otherwise it joins the bus at the next power on.
    pub fn attach(&mut self, device: Box<dyn Device>) -> Result<Option<u16>, BusError> {
        if self.powered {
            return self.cpu.connect(device).map(Some);
        }
        if self.offline.len() >= DeviceBus::CAPACITY {
            return Err(BusError::Full {
                capacity: DeviceBus::CAPACITY,
            });
        }
        self.offline.push(device);
        Ok(None)
    }

    /// Peripherals held while powered off.
    pub fn offline_devices(&self) -> impl Iterator<Item = &dyn Device> {
        self.offline.iter().map(|device| device.as_ref())
    }

    /// Cold start: a fresh CPU, every peripheral connected in order, and
    /// `program` loaded at address 0. A running machine is powered off first.
    pub fn power_on(&mut self, program: &[u8]) -> Result<(), BusError> {
        self.boot()?;
        self.cpu.load_program(program);
        debug!(bytes = program.len(), "computer powered on");
        Ok(())
    }

    /// Warm start from a snapshot taken by [`Computer::power_off`].
    ///
    /// Falls back to a cold start with `program` if the snapshot does not
    /// load. Returns whether the snapshot was used.
    pub fn resume(&mut self, snapshot: &[u8], program: &[u8]) -> Result<bool, BusError> {
        self.boot()?;
        match self.cpu.load_state(snapshot) {
            Ok(()) => {
                debug!("computer resumed from snapshot");
                Ok(true)
            }
            Err(err) => {
                warn!(error = %err, "snapshot failed to load, cold starting");
                self.cpu.load_program(program);
                Ok(false)
            }
        }
    }

    fn boot(&mut self) -> Result<(), BusError> {
        self.power_off();
        let mut cpu = Dcpu16::new();
        for device in self.offline.drain(..) {
            cpu.connect(device)?;
        }
        self.cpu = cpu;
        self.powered = true;
        self.clock_rates.clear();
        Ok(())
    }

    /// Snapshots the CPU and disconnects every device, cancelling their
    /// pending work. Returns `None` if already off.
    pub fn power_off(&mut self) -> Option<Vec<u8>> {
        if !self.powered {
            return None;
        }
        let snapshot = self.cpu.save_state();
        self.offline = self.cpu.disconnect_all();
        self.powered = false;
        debug!(devices = self.offline.len(), "computer powered off");
        Some(snapshot)
    }

    /// Advances the machine by `elapsed` of host time.
    pub fn tick(&mut self, elapsed: Duration) -> TickReport {
        if !self.powered {
            return TickReport {
                cycles: 0,
                state: PowerState::Off,
                on_fire: false,
            };
        }

        let mut cycles = 0;
        if !self.cpu.is_halted() || self.cpu.is_pending_wake_up() {
            let budget = (elapsed.as_secs_f64() * self.config.clock_hz as f64).round() as u64;
            cycles = self.cpu.execute(budget.min(self.config.max_cycles_per_tick));
            if !elapsed.is_zero() {
                self.record_clock_rate(cycles as f64 / elapsed.as_secs_f64());
            }
        }
        self.cpu.update_devices(elapsed);

        TickReport {
            cycles,
            state: if self.cpu.is_halted() {
                PowerState::Halted
            } else {
                PowerState::Running
            },
            on_fire: self.cpu.is_on_fire(),
        }
    }

    fn record_clock_rate(&mut self, hz: f64) {
        if self.clock_rates.len() == CLOCK_RATE_WINDOW {
            self.clock_rates.pop_front();
        }
        self.clock_rates.push_back(hz);
    }

    /// Mean effective clock rate over the last 60 executing ticks, in Hz.
    pub fn average_clock_hz(&self) -> f64 {
        if self.clock_rates.is_empty() {
            return 0.0;
        }
        self.clock_rates.iter().sum::<f64>() / self.clock_rates.len() as f64
    }

    /// See [`Dcpu16::with_device`].
    pub fn with_device<T: Device, R>(
        &mut self,
        hardware_id: u16,
        f: impl FnOnce(&mut T, &mut dyn Processor) -> R,
    ) -> Option<R> {
        self.cpu.with_device(hardware_id, f)
    }
}

impl Default for Computer {
    fn default() -> Self {
        Self::new(ComputerConfig::default())
    }
}
