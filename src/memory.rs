//! # Word-Addressed Memory
//!
//! The DCPU-16 sees a flat array of 65536 machine words. Every address is a
//! `u16`, so all address arithmetic wraps modulo 65536 by construction and an
//! access can never fall outside the array.
//!
//! Block operations (`load`, `read_block`) wrap at the top of memory the same
//! way single accesses do: a block starting at 0xfffe spills into 0x0000.

use std::fmt;
use std::ops::{Index, IndexMut};

/// Number of words in the address space.
pub const MEMORY_WORDS: usize = 0x10000;

/// 64K words of zero-initialized RAM.
///
/// # Examples
///
/// ```
/// use dcpu16::Memory;
///
/// let mut mem = Memory::new();
/// mem.write(0x1234, 0xbeef);
/// assert_eq!(mem.read(0x1234), 0xbeef);
/// assert_eq!(mem[0x1234], 0xbeef);
///
/// // Blocks wrap at the end of memory
/// mem.load(0xffff, &[1, 2]);
/// assert_eq!(mem[0xffff], 1);
/// assert_eq!(mem[0x0000], 2);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Memory {
    // Always exactly MEMORY_WORDS long.
    words: Box<[u16]>,
}

impl Memory {
    pub fn new() -> Self {
        Self {
            words: vec![0u16; MEMORY_WORDS].into_boxed_slice(),
        }
    }

    #[inline]
    pub fn read(&self, addr: u16) -> u16 {
        self.words[addr as usize]
    }

    #[inline]
    pub fn write(&mut self, addr: u16, value: u16) {
        self.words[addr as usize] = value;
    }

    /// Copies `data` into memory starting at `base`, wrapping past 0xffff.
    ///
    /// Blocks longer than the address space overwrite their own beginning;
    /// the last write to each address wins.
    pub fn load(&mut self, base: u16, data: &[u16]) {
        let mut addr = base;
        for &word in data {
            self.write(addr, word);
            addr = addr.wrapping_add(1);
        }
    }

    /// Fills `out` from memory starting at `base`, wrapping past 0xffff.
    pub fn read_block(&self, base: u16, out: &mut [u16]) {
        let mut addr = base;
        for slot in out.iter_mut() {
            *slot = self.read(addr);
            addr = addr.wrapping_add(1);
        }
    }

    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.words
    }

    pub fn as_mut_slice(&mut self) -> &mut [u16] {
        &mut self.words
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<u16> for Memory {
    type Output = u16;

    fn index(&self, addr: u16) -> &u16 {
        &self.words[addr as usize]
    }
}

impl IndexMut<u16> for Memory {
    fn index_mut(&mut self, addr: u16) -> &mut u16 {
        &mut self.words[addr as usize]
    }
}

impl fmt::Debug for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let used = self.words.iter().filter(|&&w| w != 0).count();
        f.debug_struct("Memory")
            .field("words", &MEMORY_WORDS)
            .field("nonzero", &used)
            .finish()
    }
}
