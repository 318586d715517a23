//! Binary persistence of labeled count matrices.
//!
//! A store file is a 4-byte magic (`CFMS`), a little-endian `u16` format
//! version, and the bincode encoding of a [`MatrixStore`]. Files whose path
//! ends in `.gz` are gzip-compressed as a whole; compressed input is detected
//! from its magic bytes on load.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use cellforest_core::compress::{
    gzip_compress, gzip_decompress, is_gzip, is_gzip_path, DEFAULT_GZIP_LEVEL,
};
use cellforest_core::{CellforestError, Result, Summarizable};
use cellforest_omics::{Counts, CsrMatrix, FeatureTable};

const MAGIC: [u8; 4] = *b"CFMS";
const FORMAT_VERSION: u16 = 1;
const HEADER_LEN: usize = 6;

/// Serializable envelope of a count matrix and its labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixStore {
    matrix: CsrMatrix,
    cell_ids: Vec<String>,
    features: FeatureTable,
}

impl MatrixStore {
    /// Assemble a store and, when `save_path` is given, write it there
    /// (creating parent directories).
    pub fn build(
        matrix: CsrMatrix,
        cell_ids: Vec<String>,
        features: FeatureTable,
        save_path: Option<&Path>,
    ) -> Result<Self> {
        let store = Self {
            matrix,
            cell_ids,
            features,
        };
        store.check_shape()?;
        if let Some(path) = save_path {
            store.save(path)?;
        }
        Ok(store)
    }

    pub fn from_counts(counts: &Counts) -> Self {
        Self {
            matrix: counts.matrix().clone(),
            cell_ids: counts.cell_ids().to_vec(),
            features: counts.features(),
        }
    }

    pub fn into_counts(self) -> Result<Counts> {
        Counts::new(self.matrix, self.cell_ids, self.features)
    }

    pub fn matrix(&self) -> &CsrMatrix {
        &self.matrix
    }

    pub fn cell_ids(&self) -> &[String] {
        &self.cell_ids
    }

    pub fn features(&self) -> &FeatureTable {
        &self.features
    }

    fn check_shape(&self) -> Result<()> {
        let n_features = self.features.len();
        if self.features.names().len() != n_features
            || self
                .features
                .feature_types()
                .is_some_and(|t| t.len() != n_features)
        {
            return Err(CellforestError::Construction(
                "store feature columns differ in length".into(),
            ));
        }
        let (n_rows, n_cols) = self.matrix.shape();
        if self.cell_ids.len() != n_rows || self.features.len() != n_cols {
            return Err(CellforestError::Construction(format!(
                "store labels ({} cells, {} features) do not match matrix ({n_rows}, {n_cols})",
                self.cell_ids.len(),
                self.features.len()
            )));
        }
        Ok(())
    }

    /// Encode with the store header.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let payload = bincode::serialize(self)
            .map_err(|e| CellforestError::Serialization(format!("failed to encode store: {e}")))?;
        let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
        bytes.extend_from_slice(&MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    /// Decode bytes produced by [`MatrixStore::to_bytes`], gzipped or not.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let decompressed;
        let bytes = if is_gzip(bytes) {
            decompressed = gzip_decompress(bytes)?;
            decompressed.as_slice()
        } else {
            bytes
        };

        if bytes.len() < HEADER_LEN || bytes[..4] != MAGIC {
            return Err(CellforestError::Parse("not a matrix store (bad magic)".into()));
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != FORMAT_VERSION {
            return Err(CellforestError::Unsupported(format!(
                "matrix store format version {version} (expected {FORMAT_VERSION})"
            )));
        }
        let store: MatrixStore = bincode::deserialize(&bytes[HEADER_LEN..])
            .map_err(|e| CellforestError::Serialization(format!("failed to decode store: {e}")))?;
        store.matrix.validate()?;
        store.check_shape()?;
        Ok(store)
    }

    /// Write to `path`, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| CellforestError::io_at(parent, e))?;
        }
        let mut bytes = self.to_bytes()?;
        if is_gzip_path(path) {
            bytes = gzip_compress(&bytes, DEFAULT_GZIP_LEVEL)?;
        }
        fs::write(path, &bytes).map_err(|e| CellforestError::io_at(path, e))?;
        log::debug!("saved {} to {} ({} bytes)", self.summary(), path.display(), bytes.len());
        Ok(())
    }

    /// Read a store written by [`MatrixStore::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                CellforestError::NotFound(format!("{}: no such matrix store", path.display()))
            }
            _ => CellforestError::io_at(path, e),
        })?;
        let store = Self::from_bytes(&bytes).map_err(|e| match e {
            CellforestError::Parse(msg) => {
                CellforestError::Parse(format!("{}: {msg}", path.display()))
            }
            other => other,
        })?;
        log::debug!("loaded {} from {}", store.summary(), path.display());
        Ok(store)
    }
}

impl Summarizable for MatrixStore {
    fn summary(&self) -> String {
        let (r, c) = self.matrix.shape();
        format!("MatrixStore: {r} cells \u{00d7} {c} features, {} nonzeros", self.matrix.nnz())
    }
}

/// Save and load [`Counts`] through a [`MatrixStore`] file.
pub trait CountsStoreExt: Sized {
    fn save(&self, path: impl AsRef<Path>) -> Result<()>;
    fn load(path: impl AsRef<Path>) -> Result<Self>;
}

impl CountsStoreExt for Counts {
    fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        MatrixStore::from_counts(self).save(path)
    }

    fn load(path: impl AsRef<Path>) -> Result<Self> {
        MatrixStore::load(path)?.into_counts()
    }
}
