//! Generic keyboard.
//!
//! HWI operations, selected by A:
//!
//! | A | effect |
//! |---|--------|
//! | 0 | clear the key buffer |
//! | 1 | C = next key code from the buffer, or 0 if empty |
//! | 2 | C = 1 if the key code in B is currently down, else 0 |
//! | 3 | interrupt with message B on every key press; B = 0 turns it off |
//!
//! Key codes: Backspace 0x10, Return 0x11, Insert 0x12, Delete 0x13,
//! printable ASCII 0x20-0x7f, arrow keys 0x80-0x83, Shift 0x90 and
//! Control 0x91. While Shift is down, keys with a shifted form produce it.

use std::any::Any;
use std::collections::{HashMap, HashSet, VecDeque};

use tracing::trace;

use super::{device_id, manufacturer_id, Device, Processor};
use crate::cpu::Register;

const CLEAR_BUFFER: u16 = 0;
const NEXT_KEY: u16 = 1;
const IS_KEY_DOWN: u16 = 2;
const SET_INTERRUPT: u16 = 3;

pub const BACKSPACE: u16 = 0x10;
pub const RETURN: u16 = 0x11;
pub const INSERT: u16 = 0x12;
pub const DELETE: u16 = 0x13;
pub const ARROW_UP: u16 = 0x80;
pub const ARROW_DOWN: u16 = 0x81;
pub const ARROW_LEFT: u16 = 0x82;
pub const ARROW_RIGHT: u16 = 0x83;
pub const SHIFT: u16 = 0x90;
pub const CONTROL: u16 = 0x91;

/// A physical key on the host keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Backspace,
    Return,
    Insert,
    Delete,
    Up,
    Down,
    Left,
    Right,
    Shift,
    Control,
    /// Tracked by hosts but has no code on this keyboard.
    Alt,
    /// A main-block key, named by its unshifted character (`'a'`, `'1'`,
    /// `';'`, `' '`). Upper-case letters name the same key as lower-case.
    Char(char),
    /// A keypad key: `'0'`-`'9'`, `'/'`, `'*'`, `'-'`, `'+'`, `'.'`, `'='`.
    Keypad(char),
    KeypadEnter,
}

/// Device codes for a key, unshifted and shifted.
fn key_codes(key: Key) -> Option<(u16, u16)> {
    let same = |code: u16| Some((code, code));
    match key {
        Key::Backspace => same(BACKSPACE),
        Key::Return | Key::KeypadEnter => same(RETURN),
        Key::Insert => same(INSERT),
        Key::Delete => same(DELETE),
        Key::Up => same(ARROW_UP),
        Key::Down => same(ARROW_DOWN),
        Key::Left => same(ARROW_LEFT),
        Key::Right => same(ARROW_RIGHT),
        Key::Shift => same(SHIFT),
        Key::Control => same(CONTROL),
        Key::Alt => None,
        Key::Keypad(c) => match c {
            '0'..='9' | '/' | '*' | '-' | '+' | '.' | '=' => same(c as u16),
            _ => None,
        },
        Key::Char(c) => {
            let c = c.to_ascii_lowercase();
            let shifted = match c {
                'a'..='z' => c.to_ascii_uppercase(),
                ' ' => ' ',
                '\'' => '"',
                ',' => '<',
                '-' => '_',
                '.' => '>',
                '/' => '?',
                '0' => ')',
                '1' => '!',
                '2' => '@',
                '3' => '#',
                '4' => '$',
                '5' => '%',
                '6' => '^',
                '7' => '&',
                '8' => '*',
                '9' => '(',
                ';' => ':',
                '=' => '+',
                '[' => '{',
                '\\' => '|',
                ']' => '}',
                '`' => '~',
                _ => return None,
            };
            Some((c as u16, shifted as u16))
        }
    }
}

#[derive(Debug, Default)]
pub struct GenericKeyboard {
    buffer: VecDeque<u16>,
    down: HashSet<u16>,
    /// Code each held key produced when pressed, so release clears the same
    /// code even if Shift changed in between.
    held: HashMap<Key, u16>,
    interrupt_message: u16,
}

impl GenericKeyboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Code `key` produces right now, taking Shift into account.
    pub fn code_for(&self, key: Key) -> Option<u16> {
        let (normal, shifted) = key_codes(key)?;
        Some(if self.down.contains(&SHIFT) {
            shifted
        } else {
            normal
        })
    }

    /// Host key press. Buffers the key's code, marks it down and raises the
    /// configured interrupt. Returns the code, or `None` for unmapped keys.
    pub fn key_down(&mut self, cpu: &mut dyn Processor, key: Key) -> Option<u16> {
        let code = self.code_for(key)?;
        self.buffer.push_back(code);
        self.down.insert(code);
        self.held.insert(key, code);
        trace!(code, "key down");
        if self.interrupt_message != 0 {
            cpu.interrupt(self.interrupt_message);
        }
        Some(code)
    }

    /// Host key release. Clears the down state but leaves the buffer alone.
    pub fn key_up(&mut self, key: Key) {
        let code = self.held.remove(&key).or_else(|| self.code_for(key));
        if let Some(code) = code {
            self.down.remove(&code);
        }
    }

    pub fn is_down(&self, code: u16) -> bool {
        self.down.contains(&code)
    }

    /// Number of buffered key codes.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn interrupt_message(&self) -> u16 {
        self.interrupt_message
    }
}

impl Device for GenericKeyboard {
    fn friendly_name(&self) -> &str {
        "Generic Keyboard (compatible)"
    }

    fn manufacturer_id(&self) -> u32 {
        manufacturer_id::UNKNOWN
    }

    fn device_id(&self) -> u32 {
        device_id::GENERIC_KEYBOARD
    }

    fn version(&self) -> u16 {
        1
    }

    fn on_disconnect(&mut self) {
        *self = Self::default();
    }

    fn on_interrupt(&mut self, cpu: &mut dyn Processor) -> u64 {
        match cpu.register(Register::A) {
            CLEAR_BUFFER => self.buffer.clear(),
            NEXT_KEY => {
                let code = self.buffer.pop_front().unwrap_or(0);
                cpu.set_register(Register::C, code);
            }
            IS_KEY_DOWN => {
                let down = self.is_down(cpu.register(Register::B));
                cpu.set_register(Register::C, down as u16);
            }
            SET_INTERRUPT => self.interrupt_message = cpu.register(Register::B),
            _ => {}
        }
        0
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
