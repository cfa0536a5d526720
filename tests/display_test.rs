//! Integration tests for the LEM1802 display: guest mapping and host render.

use std::time::Duration;

use dcpu16::devices::lem1802::{expand_color, DEFAULT_PALETTE, HEIGHT, WIDTH};
use dcpu16::devices::Lem1802;
use dcpu16::opcodes::{basic, special};
use dcpu16::{BasicOpcode, Dcpu16, Operand, Register, SpecialOpcode};

const SCREEN: u16 = 0x8000;
const FONT: u16 = 0x9000;
const PALETTE: u16 = 0xa000;

const WHITE: [u8; 3] = [0xff, 0xff, 0xff];
const BLACK: [u8; 3] = [0, 0, 0];

fn reg(r: Register) -> Operand {
    Operand::Register(r)
}

/// Runs `SET A, a ; SET B, b ; HWI lem` at 0x0100.
fn hwi(cpu: &mut Dcpu16, lem: u16, a: u16, b: u16) -> u64 {
    let program = [
        basic(BasicOpcode::Set, reg(Register::A), Operand::NextWord(a)),
        basic(BasicOpcode::Set, reg(Register::B), Operand::NextWord(b)),
        special(SpecialOpcode::Hwi, Operand::NextWord(lem)),
    ]
    .concat();
    cpu.memory_mut().load(0x0100, &program);
    cpu.set_register(Register::Pc, 0x0100);
    cpu.step() + cpu.step() + cpu.step()
}

fn render(cpu: &Dcpu16, lem: u16) -> Vec<[u8; 3]> {
    cpu.device::<Lem1802>(lem).unwrap().render(cpu.memory())
}

fn pixel(frame: &[[u8; 3]], x: usize, y: usize) -> [u8; 3] {
    frame[y * WIDTH + x]
}

fn display() -> (Dcpu16, u16) {
    let mut cpu = Dcpu16::new();
    let lem = cpu.connect(Box::new(Lem1802::new())).unwrap();
    (cpu, lem)
}

#[test]
fn test_unmapped_screen_renders_black() {
    let (mut cpu, lem) = display();
    cpu.memory_mut().as_mut_slice().fill(0xffff);
    let frame = render(&cpu, lem);
    assert_eq!(frame.len(), WIDTH * HEIGHT);
    assert!(frame.iter().all(|&p| p == BLACK));
}

#[test]
fn test_custom_font_glyph_renders_column_major() {
    let (mut cpu, lem) = display();
    hwi(&mut cpu, lem, 0, SCREEN);
    hwi(&mut cpu, lem, 1, FONT);
    // Glyph 1: column 0 fully lit, column 3 only the top pixel
    cpu.memory_mut().load(FONT + 2, &[0xff00, 0x0001]);
    // White on black, glyph 1, top-left cell
    cpu.memory_mut().write(SCREEN, 0xf001);

    let frame = render(&cpu, lem);
    for y in 0..8 {
        assert_eq!(pixel(&frame, 0, y), WHITE, "row {y}");
        assert_eq!(pixel(&frame, 1, y), BLACK);
        assert_eq!(pixel(&frame, 2, y), BLACK);
    }
    assert_eq!(pixel(&frame, 3, 0), WHITE);
    assert_eq!(pixel(&frame, 3, 1), BLACK);
    // Second cell is zero: glyph 0 of an all-zero font, black on black
    assert_eq!(pixel(&frame, 4, 0), BLACK);
}

#[test]
fn test_mapped_palette_and_border() {
    let (mut cpu, lem) = display();
    hwi(&mut cpu, lem, 0, SCREEN);
    hwi(&mut cpu, lem, 2, PALETTE);
    hwi(&mut cpu, lem, 3, 0x0012);
    cpu.memory_mut().write(PALETTE + 2, 0x0f00);
    cpu.memory_mut().write(PALETTE + 3, 0x00f0);
    // Background 3 everywhere in the first cell, glyph 0 of the built-in
    // font, foreground 2
    cpu.memory_mut().write(SCREEN + 33, 0x2300);

    let device = cpu.device::<Lem1802>(lem).unwrap();
    assert_eq!(device.border_color(), 2);
    assert_eq!(device.border_rgb(cpu.memory()), [0xff, 0, 0]);
    assert_eq!(device.color(cpu.memory(), 3), [0, 0xff, 0]);

    let frame = render(&cpu, lem);
    // Cell (1, 1) starts at pixel (4, 8); every pixel is fg or bg
    for y in 8..16 {
        for x in 4..8 {
            let p = pixel(&frame, x, y);
            assert!(p == [0xff, 0, 0] || p == [0, 0xff, 0], "({x}, {y}) = {p:?}");
        }
    }
}

#[test]
fn test_blinking_cells_hide_every_second() {
    let (mut cpu, lem) = display();
    hwi(&mut cpu, lem, 0, SCREEN);
    hwi(&mut cpu, lem, 1, FONT);
    cpu.memory_mut().load(FONT + 2, &[0xff00, 0x0000]);
    cpu.memory_mut().write(SCREEN, 0xf081);

    assert_eq!(pixel(&render(&cpu, lem), 0, 0), WHITE);
    cpu.update_devices(Duration::from_millis(999));
    assert_eq!(pixel(&render(&cpu, lem), 0, 0), WHITE);
    cpu.update_devices(Duration::from_millis(1));
    assert_eq!(pixel(&render(&cpu, lem), 0, 0), BLACK);
    cpu.update_devices(Duration::from_secs(1));
    assert_eq!(pixel(&render(&cpu, lem), 0, 0), WHITE);
}

#[test]
fn test_dumps_cost_extra_cycles() {
    let (mut cpu, lem) = display();
    // SET (2) + SET (2) + HWI (5) + copied words
    assert_eq!(hwi(&mut cpu, lem, 4, 0x3000), 9 + 256);
    assert_eq!(hwi(&mut cpu, lem, 5, 0x4000), 9 + 16);
    let mut palette = [0u16; 16];
    cpu.memory().read_block(0x4000, &mut palette);
    assert_eq!(palette, DEFAULT_PALETTE);
    assert_eq!(expand_color(palette[9]), [0x55, 0x55, 0xff]);
}

#[test]
fn test_disconnect_resets_mappings() {
    let (mut cpu, lem) = display();
    hwi(&mut cpu, lem, 0, SCREEN);
    hwi(&mut cpu, lem, 3, 5);
    let device = cpu.disconnect(lem).unwrap();
    let lem = device.as_any().downcast_ref::<Lem1802>().unwrap();
    assert!(!lem.is_active());
    assert_eq!(lem.border_color(), 0);
    assert!(lem.is_blink_on());
}
