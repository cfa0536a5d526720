//! Generic clock.
//!
//! HWI operations, selected by A:
//!
//! | A | effect |
//! |---|--------|
//! | 0 | tick every B/60 seconds; B = 0 turns the clock off. Resets the tick count |
//! | 1 | C = ticks since the last A=0 |
//! | 2 | interrupt with message B on every tick; B = 0 turns interrupts off |
//!
//! Time comes from the host through [`Device::update`]. Leftover time past a
//! tick boundary carries into the next tick, and all arithmetic is on whole
//! nanoseconds, so the clock does not drift.

use std::any::Any;
use std::time::Duration;

use tracing::trace;

use super::{device_id, manufacturer_id, Device, Processor};
use crate::cpu::Register;

const SET_RATE: u16 = 0;
const GET_TICKS: u16 = 1;
const SET_INTERRUPT: u16 = 2;

#[derive(Debug, Default)]
pub struct GenericClock {
    /// `None` while the clock is off.
    period: Option<Duration>,
    accumulated: Duration,
    ticks: u16,
    interrupt_message: u16,
}

impl GenericClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tick period for a rate argument of `b`: `b / 60` seconds.
    pub fn period_for(b: u16) -> Option<Duration> {
        (b != 0).then(|| Duration::from_secs(b as u64) / 60)
    }

    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    pub fn is_enabled(&self) -> bool {
        self.period.is_some()
    }

    pub fn ticks(&self) -> u16 {
        self.ticks
    }

    pub fn interrupt_message(&self) -> u16 {
        self.interrupt_message
    }
}

impl Device for GenericClock {
    fn friendly_name(&self) -> &str {
        "Generic Clock (compatible)"
    }

    fn manufacturer_id(&self) -> u32 {
        manufacturer_id::UNKNOWN
    }

    fn device_id(&self) -> u32 {
        device_id::GENERIC_CLOCK
    }

    fn version(&self) -> u16 {
        1
    }

    fn on_disconnect(&mut self) {
        *self = Self::default();
    }

    fn on_interrupt(&mut self, cpu: &mut dyn Processor) -> u64 {
        match cpu.register(Register::A) {
            SET_RATE => {
                let b = cpu.register(Register::B);
                self.period = Self::period_for(b);
                self.accumulated = Duration::ZERO;
                self.ticks = 0;
                trace!(rate = b, "clock rate set");
            }
            GET_TICKS => cpu.set_register(Register::C, self.ticks),
            SET_INTERRUPT => self.interrupt_message = cpu.register(Register::B),
            _ => {}
        }
        0
    }

    fn update(&mut self, cpu: &mut dyn Processor, elapsed: Duration) {
        let Some(period) = self.period else {
            return;
        };
        self.accumulated += elapsed;
        while self.accumulated >= period {
            self.accumulated -= period;
            self.ticks = self.ticks.wrapping_add(1);
            if self.interrupt_message != 0 {
                cpu.interrupt(self.interrupt_message);
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
