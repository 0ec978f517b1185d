#![no_main]
use machinelib_core::test_utils::*;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes as a full storage packet and as a sync stream.
    // Must not panic and must leave every slot consistent.
    let registry = item_registry();

    let storage = item_storage(4, 64);
    let _ = storage.read_packet(&mut &data[..], &registry);
    assert_all_sane(&storage);

    let mirror = item_storage(4, 64);
    let _ = mirror.create_sync_handler().read(&mut &data[..], &registry);
    assert_all_sane(&mirror);
});
