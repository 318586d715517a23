//! gzip utilities and extension-aware file handles.
//!
//! Single-cell inputs arrive both plain and gzip-compressed (`matrix.mtx` vs
//! `matrix.mtx.gz`). The helpers here pick the codec from the file extension
//! so callers can stay agnostic.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::{CellforestError, Result};

/// Default gzip level for written files.
pub const DEFAULT_GZIP_LEVEL: u32 = 6;

/// Compress data using gzip at the given level (0–9).
pub fn gzip_compress(data: &[u8], level: u32) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::new(level));
    encoder
        .write_all(data)
        .map_err(|e| CellforestError::Compression(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| CellforestError::Compression(e.to_string()))
}

/// Decompress gzip data.
pub fn gzip_decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = MultiGzDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| CellforestError::Compression(e.to_string()))?;
    Ok(decompressed)
}

/// Whether `data` starts with the gzip magic bytes.
pub fn is_gzip(data: &[u8]) -> bool {
    data.len() >= 2 && data[..2] == [0x1F, 0x8B]
}

/// Whether a path names a gzip file (by its `.gz` extension).
pub fn is_gzip_path(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("gz"))
}

/// Open a file for buffered reading, decompressing if it ends in `.gz`.
pub fn open_reader(path: impl AsRef<Path>) -> Result<Box<dyn BufRead>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| CellforestError::io_at(path, e))?;
    if is_gzip_path(path) {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// A file writer that compresses when the target ends in `.gz`.
///
/// Call [`TextWriter::finish`] when done: it flushes buffers and writes the
/// gzip trailer, surfacing errors that `Drop` would swallow.
pub enum TextWriter {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl TextWriter {
    /// Create (truncating) `path`, choosing the codec from its extension.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| CellforestError::io_at(path, e))?;
        let inner = BufWriter::new(file);
        if is_gzip_path(path) {
            Ok(TextWriter::Gzip(GzEncoder::new(
                inner,
                Compression::new(DEFAULT_GZIP_LEVEL),
            )))
        } else {
            Ok(TextWriter::Plain(inner))
        }
    }

    /// Flush and close the underlying file.
    pub fn finish(self) -> Result<()> {
        match self {
            TextWriter::Plain(mut w) => w.flush()?,
            TextWriter::Gzip(enc) => {
                let mut inner = enc
                    .finish()
                    .map_err(|e| CellforestError::Compression(e.to_string()))?;
                inner.flush()?;
            }
        }
        Ok(())
    }
}

impl Write for TextWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            TextWriter::Plain(w) => w.write(buf),
            TextWriter::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            TextWriter::Plain(w) => w.flush(),
            TextWriter::Gzip(w) => w.flush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_gzip_roundtrip() {
        let original = b"AAACCTGAGAAACCAT-1\nAAACCTGAGAAACCGC-1\n";
        let compressed = gzip_compress(original, 6).unwrap();
        assert!(is_gzip(&compressed));
        let decompressed = gzip_decompress(&compressed).unwrap();
        assert_eq!(original.to_vec(), decompressed);
    }

    #[test]
    fn test_detect_plain() {
        assert!(!is_gzip(b"%%MatrixMarket"));
    }

    #[test]
    fn test_gzip_decompress_garbage() {
        assert!(gzip_decompress(b"\x1f\x8bnot really gzip").is_err());
    }

    #[test]
    fn test_gzip_path_detection() {
        assert!(is_gzip_path("barcodes.tsv.gz"));
        assert!(is_gzip_path("dir/matrix.mtx.GZ"));
        assert!(!is_gzip_path("barcodes.tsv"));
        assert!(!is_gzip_path("gz"));
    }

    #[test]
    fn test_writer_reader_roundtrip_gz() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("features.tsv.gz");
        let mut w = TextWriter::create(&path).unwrap();
        writeln!(w, "ENSG00000243485\tMIR1302-2HG").unwrap();
        w.finish().unwrap();

        let raw = std::fs::read(&path).unwrap();
        assert!(is_gzip(&raw));

        let mut text = String::new();
        open_reader(&path).unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "ENSG00000243485\tMIR1302-2HG\n");
    }

    #[test]
    fn test_writer_reader_roundtrip_plain() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("barcodes.tsv");
        let mut w = TextWriter::create(&path).unwrap();
        writeln!(w, "c1").unwrap();
        w.finish().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "c1\n");
        let lines: Vec<String> = open_reader(&path)
            .unwrap()
            .lines()
            .map(|l| l.unwrap())
            .collect();
        assert_eq!(lines, vec!["c1"]);
    }

    #[test]
    fn test_open_missing_file() {
        assert!(open_reader("/nonexistent/matrix.mtx.gz").is_err());
    }
}
