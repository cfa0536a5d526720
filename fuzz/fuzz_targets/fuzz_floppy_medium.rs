//! Fuzz target for the floppy medium format.

#![no_main]

use dcpu16::devices::FloppyDisk;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(disk) = FloppyDisk::decode(data) {
        let reencoded = FloppyDisk::decode(&disk.encode()).unwrap();
        assert_eq!(reencoded, disk);
    }
});
