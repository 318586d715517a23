#![no_main]
use libfuzzer_sys::fuzz_target;
use std::io::Write;

fuzz_target!(|data: &[u8]| {
    let mut f = tempfile::NamedTempFile::with_suffix(".tsv").unwrap();
    f.write_all(data).unwrap();
    f.flush().unwrap();
    let _ = cellforest_io::tsv::read_features(f.path(), b'\t');
});
