//! Reader for 10x Genomics feature-barcode matrix directories.
//!
//! A directory holds three files, each optionally gzipped:
//!
//! | file | content |
//! |------|---------|
//! | `matrix.mtx` | Matrix Market, features × barcodes |
//! | `features.tsv` (`genes.tsv` before Cell Ranger 3) | id, symbol, type |
//! | `barcodes.tsv` | one barcode per line |
//!
//! Files are matched by name prefix, so `matrix.mtx.gz` satisfies
//! `matrix.mtx`.

use std::fs;
use std::path::{Path, PathBuf};

use cellforest_core::{CellforestError, Result};
use cellforest_omics::{Counts, CsrMatrix, FeatureTable};

use crate::{mtx, tsv};

/// File naming for a 10x directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    pub matrix_basename: String,
    pub features_basename: String,
    /// Feature file name used by older chemistries.
    pub legacy_features_basename: String,
    pub barcodes_basename: String,
    pub delimiter: u8,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            matrix_basename: "matrix.mtx".into(),
            features_basename: "features.tsv".into(),
            legacy_features_basename: "genes.tsv".into(),
            barcodes_basename: "barcodes.tsv".into(),
            delimiter: b'\t',
        }
    }
}

/// Located files of one 10x matrix directory.
#[derive(Debug, Clone)]
pub struct AssayReader {
    dir: PathBuf,
    matrix_path: PathBuf,
    features_path: PathBuf,
    barcodes_path: PathBuf,
    legacy_features: bool,
    config: ReaderConfig,
}

fn find_prefixed(dir: &Path, files: &[String], basename: &str) -> Option<PathBuf> {
    files
        .iter()
        .find(|name| name.starts_with(basename))
        .map(|name| dir.join(name))
}

fn not_found(dir: &Path, basename: &str) -> CellforestError {
    CellforestError::NotFound(format!("{}: no file matching '{basename}*'", dir.display()))
}

impl AssayReader {
    /// Locate the matrix, feature and barcode files in `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(dir, ReaderConfig::default())
    }

    /// Like [`AssayReader::open`] with custom file naming.
    pub fn open_with(dir: impl AsRef<Path>, config: ReaderConfig) -> Result<Self> {
        let dir = dir.as_ref();
        let entries = fs::read_dir(dir).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                CellforestError::NotFound(format!("{}: directory does not exist", dir.display()))
            }
            _ => CellforestError::io_at(dir, e),
        })?;
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CellforestError::io_at(dir, e))?;
            files.push(entry.file_name().to_string_lossy().into_owned());
        }
        // listing order is platform-dependent
        files.sort();

        let matrix_path = find_prefixed(dir, &files, &config.matrix_basename)
            .ok_or_else(|| not_found(dir, &config.matrix_basename))?;
        let barcodes_path = find_prefixed(dir, &files, &config.barcodes_basename)
            .ok_or_else(|| not_found(dir, &config.barcodes_basename))?;
        let (features_path, legacy_features) =
            match find_prefixed(dir, &files, &config.features_basename) {
                Some(path) => (path, false),
                None => {
                    let path = find_prefixed(dir, &files, &config.legacy_features_basename)
                        .ok_or_else(|| not_found(dir, &config.features_basename))?;
                    log::warn!(
                        "old 10x chemistry detected; features read from {}",
                        path.display()
                    );
                    (path, true)
                }
            };

        log::debug!(
            "10x directory {}: {}, {}, {}",
            dir.display(),
            matrix_path.display(),
            features_path.display(),
            barcodes_path.display()
        );
        Ok(Self {
            dir: dir.to_path_buf(),
            matrix_path,
            features_path,
            barcodes_path,
            legacy_features,
            config,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn matrix_path(&self) -> &Path {
        &self.matrix_path
    }

    pub fn features_path(&self) -> &Path {
        &self.features_path
    }

    pub fn barcodes_path(&self) -> &Path {
        &self.barcodes_path
    }

    /// Whether features came from the legacy `genes.tsv` file.
    pub fn is_legacy(&self) -> bool {
        self.legacy_features
    }

    /// The count matrix, transposed to cells × features.
    pub fn read_matrix(&self) -> Result<CsrMatrix> {
        mtx::read_mtx_csr(&self.matrix_path, true)
    }

    pub fn read_features(&self) -> Result<FeatureTable> {
        tsv::read_features(&self.features_path, self.config.delimiter)
    }

    pub fn read_barcodes(&self) -> Result<Vec<String>> {
        tsv::read_barcodes(&self.barcodes_path, self.config.delimiter)
    }

    /// Read all three files into a labeled matrix.
    pub fn read_counts(&self) -> Result<Counts> {
        let matrix = self.read_matrix()?;
        let barcodes = self.read_barcodes()?;
        let features = self.read_features()?;
        Counts::new(matrix, barcodes, features)
    }

    /// Not supported; see [`crate::bridge::MarketBridge`] for writing.
    pub fn write_matrix(&self, _matrix: &CsrMatrix) -> Result<()> {
        Err(CellforestError::Unsupported("writing 10x matrix files".into()))
    }

    /// Not supported; see [`crate::bridge::MarketBridge`] for writing.
    pub fn write_features(&self, _features: &FeatureTable) -> Result<()> {
        Err(CellforestError::Unsupported("writing 10x feature files".into()))
    }

    /// Not supported; see [`crate::bridge::MarketBridge`] for writing.
    pub fn write_barcodes(&self, _barcodes: &[String]) -> Result<()> {
        Err(CellforestError::Unsupported("writing 10x barcode files".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellforest_core::compress::TextWriter;
    use cellforest_omics::DType;
    use std::io::Write;
    use tempfile::TempDir;

    const MATRIX: &str = "\
%%MatrixMarket matrix coordinate integer general
3 2 4
1 1 1
2 2 2
1 2 3
3 2 4
";

    fn write_gz(path: &Path, text: &str) {
        let mut w = TextWriter::create(path).unwrap();
        w.write_all(text.as_bytes()).unwrap();
        w.finish().unwrap();
    }

    fn v3_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        write_gz(&dir.path().join("matrix.mtx.gz"), MATRIX);
        write_gz(
            &dir.path().join("features.tsv.gz"),
            "ENSG01\tg1\tGene Expression\nENSG02\tg2\tGene Expression\nENSG03\tg3\tGene Expression\n",
        );
        write_gz(&dir.path().join("barcodes.tsv.gz"), "c1\nc2\n");
        dir
    }

    #[test]
    fn reads_cell_major_counts() {
        let dir = v3_dir();
        let reader = AssayReader::open(dir.path()).unwrap();
        assert!(!reader.is_legacy());

        let counts = reader.read_counts().unwrap();
        assert_eq!(counts.shape(), (2, 3));
        assert_eq!(counts.cell_ids(), &["c1", "c2"]);
        assert_eq!(counts.genes(), &["g1", "g2", "g3"]);
        assert_eq!(counts.ensgs(), &["ENSG01", "ENSG02", "ENSG03"]);
        assert_eq!(counts.dtype(), DType::Int64);
        assert_eq!(
            counts.matrix().to_dense(),
            vec![vec![1.0, 0.0, 0.0], vec![3.0, 2.0, 4.0]]
        );
    }

    #[test]
    fn legacy_genes_file() {
        let dir = TempDir::new().unwrap();
        write_gz(&dir.path().join("matrix.mtx.gz"), MATRIX);
        write_gz(&dir.path().join("genes.tsv.gz"), "ENSG01\tg1\nENSG02\tg2\nENSG03\tg3\n");
        write_gz(&dir.path().join("barcodes.tsv.gz"), "c1\nc2\n");

        let reader = AssayReader::open(dir.path()).unwrap();
        assert!(reader.is_legacy());
        assert!(reader.features_path().ends_with("genes.tsv.gz"));
        let counts = reader.read_counts().unwrap();
        assert_eq!(counts.genes(), &["g1", "g2", "g3"]);
    }

    #[test]
    fn missing_files_are_not_found() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("matrix.mtx"), MATRIX).unwrap();
        fs::write(dir.path().join("barcodes.tsv"), "c1\nc2\n").unwrap();
        let err = AssayReader::open(dir.path()).unwrap_err();
        assert!(matches!(err, CellforestError::NotFound(_)));

        let err = AssayReader::open(dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, CellforestError::NotFound(_)));
    }

    #[test]
    fn barcode_count_mismatch_is_construction_error() {
        let dir = v3_dir();
        write_gz(&dir.path().join("barcodes.tsv.gz"), "c1\n");
        let err = AssayReader::open(dir.path()).unwrap().read_counts().unwrap_err();
        assert!(matches!(err, CellforestError::Construction(_)));
    }

    #[test]
    fn custom_basenames() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("counts.mtx"), MATRIX).unwrap();
        fs::write(dir.path().join("genes.csv"), "ENSG01,g1\nENSG02,g2\nENSG03,g3\n").unwrap();
        fs::write(dir.path().join("cells.csv"), "c1\nc2\n").unwrap();
        let config = ReaderConfig {
            matrix_basename: "counts.mtx".into(),
            features_basename: "genes.csv".into(),
            legacy_features_basename: "genes.tsv".into(),
            barcodes_basename: "cells.csv".into(),
            delimiter: b',',
        };
        let counts = AssayReader::open_with(dir.path(), config)
            .unwrap()
            .read_counts()
            .unwrap();
        assert_eq!(counts.ensgs(), &["ENSG01", "ENSG02", "ENSG03"]);
    }

    #[test]
    fn writers_are_unsupported() {
        let dir = v3_dir();
        let reader = AssayReader::open(dir.path()).unwrap();
        let m = reader.read_matrix().unwrap();
        assert!(matches!(reader.write_matrix(&m), Err(CellforestError::Unsupported(_))));
        assert!(matches!(reader.write_barcodes(&[]), Err(CellforestError::Unsupported(_))));
        let f = reader.read_features().unwrap();
        assert!(matches!(reader.write_features(&f), Err(CellforestError::Unsupported(_))));
    }
}
