//! Fuzz target for the snapshot decoder.
//!
//! Arbitrary bytes must either load cleanly or be rejected without touching
//! the running state. Anything that loads must survive another save and load.

#![no_main]

use dcpu16::{Dcpu16, Register, Snapshot};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut cpu = Dcpu16::new();
    cpu.set_register(Register::J, 0xbeef);
    let before = Snapshot::capture(cpu.state());

    match cpu.load_state(data) {
        Ok(()) => {
            let loaded = Snapshot::capture(cpu.state());
            let mut again = Dcpu16::new();
            again.load_state(&cpu.save_state()).unwrap();
            assert_eq!(Snapshot::capture(again.state()), loaded);
        }
        Err(_) => assert_eq!(Snapshot::capture(cpu.state()), before),
    }
});
