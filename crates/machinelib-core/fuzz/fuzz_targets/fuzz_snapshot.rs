#![no_main]
use machinelib_core::serialize::read_snapshot_header;
use machinelib_core::test_utils::*;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Feed arbitrary bytes to the binary save reader.
    // Must not panic -- returning Err is fine.
    let _ = read_snapshot_header(data);
    let storage = fluid_storage(3, 16_000);
    let _ = storage.read_bytes(data, &fluid_registry());
    assert_all_sane(&storage);
});
