//! LEM1802 low energy monitor.
//!
//! A 32x12 text display with 4x8 pixel glyphs, rendered to a 128x96 frame.
//! The screen, font and palette each live in DCPU memory at an address the
//! program maps with HWI; a zero font or palette address selects the built-in
//! table, and a zero screen address blanks the display.
//!
//! Screen cell layout: `ffffbbbbBccccccc`, i.e. foreground palette index,
//! background palette index, blink flag, glyph index.

use std::any::Any;
use std::time::Duration;

use tracing::trace;

use super::{device_id, manufacturer_id, Device, Processor};
use crate::cpu::Register;
use crate::memory::Memory;

const MEM_MAP_SCREEN: u16 = 0;
const MEM_MAP_FONT: u16 = 1;
const MEM_MAP_PALETTE: u16 = 2;
const SET_BORDER_COLOR: u16 = 3;
const MEM_DUMP_FONT: u16 = 4;
const MEM_DUMP_PALETTE: u16 = 5;

pub const COLUMNS: usize = 32;
pub const ROWS: usize = 12;
pub const GLYPH_WIDTH: usize = 4;
pub const GLYPH_HEIGHT: usize = 8;
pub const WIDTH: usize = COLUMNS * GLYPH_WIDTH;
pub const HEIGHT: usize = ROWS * GLYPH_HEIGHT;

const BLINK_PERIOD: Duration = Duration::from_secs(1);

/// An 8-bit-per-channel RGB pixel.
pub type Rgb = [u8; 3];

pub const DEFAULT_PALETTE: [u16; 16] = [
    0x0000, 0x000a, 0x00a0, 0x00aa, 0x0a00, 0x0a0a, 0x0a50, 0x0aaa, //
    0x0555, 0x055f, 0x05f5, 0x05ff, 0x0f55, 0x0f5f, 0x0ff5, 0x0fff,
];

/// Two words per glyph, 128 glyphs.
pub const DEFAULT_FONT: [u16; 256] = [
    0xb79e, 0x388e, 0x722c, 0x75f4, 0x19bb, 0x7f8f, 0x85f9, 0xb158, //
    0x242e, 0x2400, 0x082a, 0x0800, 0x0008, 0x0000, 0x0808, 0x0808, //
    0x00ff, 0x0000, 0x00f8, 0x0808, 0x08f8, 0x0000, 0x080f, 0x0000, //
    0x000f, 0x0808, 0x00ff, 0x0808, 0x08f8, 0x0808, 0x08ff, 0x0000, //
    0x080f, 0x0808, 0x08ff, 0x0808, 0x6633, 0x99cc, 0x9933, 0x66cc, //
    0xfef8, 0xe080, 0x7f1f, 0x0701, 0x0107, 0x1f7f, 0x80e0, 0xf8fe, //
    0x5500, 0xaa00, 0x55aa, 0x55aa, 0xffaa, 0xff55, 0x0f0f, 0x0f0f, //
    0xf0f0, 0xf0f0, 0x0000, 0xffff, 0xffff, 0x0000, 0xffff, 0xffff, //
    0x0000, 0x0000, 0x005f, 0x0000, 0x0300, 0x0300, 0x3e14, 0x3e00, //
    0x266b, 0x3200, 0x611c, 0x4300, 0x3629, 0x7650, 0x0002, 0x0100, //
    0x1c22, 0x4100, 0x4122, 0x1c00, 0x1408, 0x1400, 0x081c, 0x0800, //
    0x4020, 0x0000, 0x0808, 0x0800, 0x0040, 0x0000, 0x601c, 0x0300, //
    0x3e49, 0x3e00, 0x427f, 0x4000, 0x6259, 0x4600, 0x2249, 0x3600, //
    0x0f08, 0x7f00, 0x2745, 0x3900, 0x3e49, 0x3200, 0x6119, 0x0700, //
    0x3649, 0x3600, 0x2649, 0x3e00, 0x0024, 0x0000, 0x4024, 0x0000, //
    0x0814, 0x2200, 0x1414, 0x1400, 0x2214, 0x0800, 0x0259, 0x0600, //
    0x3e59, 0x5e00, 0x7e09, 0x7e00, 0x7f49, 0x3600, 0x3e41, 0x2200, //
    0x7f41, 0x3e00, 0x7f49, 0x4100, 0x7f09, 0x0100, 0x3e41, 0x7a00, //
    0x7f08, 0x7f00, 0x417f, 0x4100, 0x2040, 0x3f00, 0x7f08, 0x7700, //
    0x7f40, 0x4000, 0x7f06, 0x7f00, 0x7f01, 0x7e00, 0x3e41, 0x3e00, //
    0x7f09, 0x0600, 0x3e61, 0x7e00, 0x7f09, 0x7600, 0x2649, 0x3200, //
    0x017f, 0x0100, 0x3f40, 0x7f00, 0x1f60, 0x1f00, 0x7f30, 0x7f00, //
    0x7708, 0x7700, 0x0778, 0x0700, 0x7149, 0x4700, 0x007f, 0x4100, //
    0x031c, 0x6000, 0x417f, 0x0000, 0x0201, 0x0200, 0x8080, 0x8000, //
    0x0001, 0x0200, 0x2454, 0x7800, 0x7f44, 0x3800, 0x3844, 0x2800, //
    0x3844, 0x7f00, 0x3854, 0x5800, 0x087e, 0x0900, 0x4854, 0x3c00, //
    0x7f04, 0x7800, 0x047d, 0x0000, 0x2040, 0x3d00, 0x7f10, 0x6c00, //
    0x017f, 0x0000, 0x7c18, 0x7c00, 0x7c04, 0x7800, 0x3844, 0x3800, //
    0x7c14, 0x0800, 0x0814, 0x7c00, 0x7c04, 0x0800, 0x4854, 0x2400, //
    0x043e, 0x4400, 0x3c40, 0x7c00, 0x1c60, 0x1c00, 0x7c30, 0x7c00, //
    0x6c10, 0x6c00, 0x4c50, 0x3c00, 0x6454, 0x4c00, 0x0836, 0x4100, //
    0x0077, 0x0000, 0x4136, 0x0800, 0x0201, 0x0201, 0x0205, 0x0200,
];

/// Expands a `0x0RGB` palette word to 8-bit channels.
pub fn expand_color(word: u16) -> Rgb {
    let nibble = |shift: u16| {
        let n = ((word >> shift) & 0xf) as u8;
        n | (n << 4)
    };
    [nibble(8), nibble(4), nibble(0)]
}

#[derive(Debug)]
pub struct Lem1802 {
    screen_map: u16,
    font_map: u16,
    palette_map: u16,
    border_color: u16,
    blink_on: bool,
    blink_elapsed: Duration,
}

impl Lem1802 {
    pub fn new() -> Self {
        Self {
            screen_map: 0,
            font_map: 0,
            palette_map: 0,
            border_color: 0,
            blink_on: true,
            blink_elapsed: Duration::ZERO,
        }
    }

    pub fn screen_map(&self) -> u16 {
        self.screen_map
    }

    pub fn font_map(&self) -> u16 {
        self.font_map
    }

    pub fn palette_map(&self) -> u16 {
        self.palette_map
    }

    /// Palette index of the border.
    pub fn border_color(&self) -> u16 {
        self.border_color
    }

    /// Whether blinking cells currently show their glyph.
    pub fn is_blink_on(&self) -> bool {
        self.blink_on
    }

    /// True while a screen is mapped.
    pub fn is_active(&self) -> bool {
        self.screen_map != 0
    }

    /// Palette entry `index` as RGB, from mapped memory or the built-in
    /// palette.
    pub fn color(&self, memory: &Memory, index: u16) -> Rgb {
        let index = index & 0xf;
        let word = if self.palette_map == 0 {
            DEFAULT_PALETTE[index as usize]
        } else {
            memory.read(self.palette_map.wrapping_add(index))
        };
        expand_color(word)
    }

    pub fn border_rgb(&self, memory: &Memory) -> Rgb {
        self.color(memory, self.border_color)
    }

    /// The two font words of `glyph` (0-127).
    pub fn glyph(&self, memory: &Memory, glyph: u16) -> [u16; 2] {
        let offset = (glyph & 0x7f) * 2;
        if self.font_map == 0 {
            [
                DEFAULT_FONT[offset as usize],
                DEFAULT_FONT[offset as usize + 1],
            ]
        } else {
            [
                memory.read(self.font_map.wrapping_add(offset)),
                memory.read(self.font_map.wrapping_add(offset + 1)),
            ]
        }
    }

    /// Renders the display into a fresh `WIDTH * HEIGHT` row-major frame.
    pub fn render(&self, memory: &Memory) -> Vec<Rgb> {
        let mut frame = vec![[0; 3]; WIDTH * HEIGHT];
        self.render_into(memory, &mut frame);
        frame
    }

    /// Renders into `frame`, row-major with the top-left pixel first.
    ///
    /// # Panics
    ///
    /// Panics if `frame` holds fewer than `WIDTH * HEIGHT` pixels.
    pub fn render_into(&self, memory: &Memory, frame: &mut [Rgb]) {
        let frame = &mut frame[..WIDTH * HEIGHT];
        if self.screen_map == 0 {
            frame.fill([0; 3]);
            return;
        }

        for row in 0..ROWS {
            for column in 0..COLUMNS {
                let cell_addr = self
                    .screen_map
                    .wrapping_add((row * COLUMNS + column) as u16);
                let cell = memory.read(cell_addr);
                let foreground = self.color(memory, cell >> 12);
                let background = self.color(memory, (cell >> 8) & 0xf);
                let hidden = cell & 0x80 != 0 && !self.blink_on;
                let [hi, lo] = self.glyph(memory, cell);
                let columns = [(hi >> 8) as u8, hi as u8, (lo >> 8) as u8, lo as u8];

                for (dx, bits) in columns.into_iter().enumerate() {
                    let x = column * GLYPH_WIDTH + dx;
                    for dy in 0..GLYPH_HEIGHT {
                        let y = row * GLYPH_HEIGHT + dy;
                        let lit = bits & (1 << dy) != 0 && !hidden;
                        frame[y * WIDTH + x] = if lit { foreground } else { background };
                    }
                }
            }
        }
    }
}

impl Default for Lem1802 {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for Lem1802 {
    fn friendly_name(&self) -> &str {
        "LEM1802 - Low Energy Monitor (compatible)"
    }

    fn manufacturer_id(&self) -> u32 {
        manufacturer_id::NYA_ELEKTRISKA
    }

    fn device_id(&self) -> u32 {
        device_id::LEM1802
    }

    fn version(&self) -> u16 {
        0x1802
    }

    fn on_disconnect(&mut self) {
        *self = Self::new();
    }

    fn on_interrupt(&mut self, cpu: &mut dyn Processor) -> u64 {
        let b = cpu.register(Register::B);
        match cpu.register(Register::A) {
            MEM_MAP_SCREEN => self.screen_map = b,
            MEM_MAP_FONT => self.font_map = b,
            MEM_MAP_PALETTE => self.palette_map = b,
            SET_BORDER_COLOR => self.border_color = b & 0xf,
            MEM_DUMP_FONT => {
                cpu.memory_mut().load(b, &DEFAULT_FONT);
                trace!(addr = b, "default font dumped");
                return DEFAULT_FONT.len() as u64;
            }
            MEM_DUMP_PALETTE => {
                cpu.memory_mut().load(b, &DEFAULT_PALETTE);
                trace!(addr = b, "default palette dumped");
                return DEFAULT_PALETTE.len() as u64;
            }
            _ => {}
        }
        0
    }

    fn update(&mut self, _cpu: &mut dyn Processor, elapsed: Duration) {
        self.blink_elapsed += elapsed;
        while self.blink_elapsed >= BLINK_PERIOD {
            self.blink_elapsed -= BLINK_PERIOD;
            self.blink_on = !self.blink_on;
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
