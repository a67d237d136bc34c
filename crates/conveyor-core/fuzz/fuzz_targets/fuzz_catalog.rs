#![no_main]
use conveyor_core::data_loader::load_registry_json_bytes;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes as a JSON catalog. Must not panic -- returning Err is fine.
    if let Ok(builder) = load_registry_json_bytes(data) {
        let _ = builder.build();
    }
});
