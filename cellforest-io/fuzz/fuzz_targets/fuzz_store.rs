#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(store) = cellforest_io::MatrixStore::from_bytes(data) {
        let _ = store.into_counts();
    }
});
