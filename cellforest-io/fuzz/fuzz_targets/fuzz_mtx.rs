#![no_main]
use libfuzzer_sys::fuzz_target;
use std::io::Write;

fuzz_target!(|data: &[u8]| {
    let mut f = tempfile::NamedTempFile::with_suffix(".mtx").unwrap();
    f.write_all(data).unwrap();
    f.flush().unwrap();
    let _ = cellforest_io::read_mtx_csr(f.path(), true);
});
