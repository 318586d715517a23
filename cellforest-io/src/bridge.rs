//! Conversion between a binary matrix store and a native interchange
//! directory, and reconciliation of the two inside a persisted assay dir.

use std::fs;
use std::path::{Path, PathBuf};

use cellforest_core::{Annotated, CellforestError, Result};

use crate::cellranger::{AssayReader, ReaderConfig};
use crate::store::MatrixStore;
use crate::{mtx, tsv};

/// A two-way codec between [`MatrixStore`] files and a native on-disk
/// representation.
pub trait FormatBridge: Annotated {
    /// Read the store at `store_path` and write the native form at
    /// `native_path`.
    fn store_to_native(&self, store_path: &Path, native_path: &Path) -> Result<()>;

    /// Read the native form at `native_path` and write a store at
    /// `store_path`.
    fn native_to_store(&self, native_path: &Path, store_path: &Path) -> Result<()>;
}

/// Native form: a 10x-style Matrix Market directory (gene-major), readable by
/// `Matrix::readMM` and `Read10X` style loaders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketBridge {
    /// Gzip the three files (`.gz` suffix).
    pub compress: bool,
    pub config: ReaderConfig,
}

impl Default for MarketBridge {
    fn default() -> Self {
        Self {
            compress: true,
            config: ReaderConfig::default(),
        }
    }
}

impl MarketBridge {
    fn file_name(&self, basename: &str) -> String {
        if self.compress {
            format!("{basename}.gz")
        } else {
            basename.to_string()
        }
    }
}

impl Annotated for MarketBridge {
    fn name(&self) -> &str {
        "market"
    }

    fn description(&self) -> Option<&str> {
        Some("10x-style directory of matrix.mtx, features.tsv and barcodes.tsv")
    }
}

impl FormatBridge for MarketBridge {
    fn store_to_native(&self, store_path: &Path, native_path: &Path) -> Result<()> {
        let store = MatrixStore::load(store_path)?;
        fs::create_dir_all(native_path).map_err(|e| CellforestError::io_at(native_path, e))?;

        let cfg = &self.config;
        mtx::write_mtx(
            native_path.join(self.file_name(&cfg.matrix_basename)),
            store.matrix(),
            true,
        )?;
        tsv::write_features(
            native_path.join(self.file_name(&cfg.features_basename)),
            store.features(),
            cfg.delimiter,
        )?;
        tsv::write_barcodes(
            native_path.join(self.file_name(&cfg.barcodes_basename)),
            store.cell_ids(),
            cfg.delimiter,
        )?;
        log::info!(
            "converted {} to {} directory {}",
            store_path.display(),
            self.name(),
            native_path.display()
        );
        Ok(())
    }

    fn native_to_store(&self, native_path: &Path, store_path: &Path) -> Result<()> {
        let counts = AssayReader::open_with(native_path, self.config.clone())?.read_counts()?;
        MatrixStore::from_counts(&counts).save(store_path)?;
        log::info!(
            "converted {} directory {} to {}",
            self.name(),
            native_path.display(),
            store_path.display()
        );
        Ok(())
    }
}

/// File naming inside a persisted assay directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixLayout {
    pub assay: String,
    /// Appended to the assay name for the store file.
    pub store_suffix: String,
    /// Appended to the assay name for the native directory.
    pub native_suffix: String,
}

impl Default for MatrixLayout {
    fn default() -> Self {
        Self {
            assay: "rna".into(),
            store_suffix: ".store".into(),
            native_suffix: "_r".into(),
        }
    }
}

impl MatrixLayout {
    /// The default layout for another assay.
    pub fn for_assay(assay: impl Into<String>) -> Self {
        Self {
            assay: assay.into(),
            ..Self::default()
        }
    }

    pub fn store_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}{}", self.assay, self.store_suffix))
    }

    pub fn native_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}{}", self.assay, self.native_suffix))
    }
}

/// Outcome of [`unify_matrix_dir`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unified {
    /// Both representations were already present.
    AlreadyUnified,
    /// The native directory was derived from the store.
    DerivedNative,
    /// The store was derived from the native directory.
    DerivedStore,
    /// Neither representation exists.
    Missing,
}

/// Make sure both the store and its native form exist in `dir`, deriving
/// whichever is absent from the other.
pub fn unify_matrix_dir(
    dir: impl AsRef<Path>,
    layout: &MatrixLayout,
    bridge: &dyn FormatBridge,
) -> Result<Unified> {
    let dir = dir.as_ref();
    let store = layout.store_path(dir);
    let native = layout.native_path(dir);

    let outcome = match (store.exists(), native.exists()) {
        (true, true) => Unified::AlreadyUnified,
        (false, false) => Unified::Missing,
        (true, false) => {
            bridge.store_to_native(&store, &native)?;
            Unified::DerivedNative
        }
        (false, true) => {
            bridge.native_to_store(&native, &store)?;
            Unified::DerivedStore
        }
    };
    log::debug!("unify {} ({}): {outcome:?}", dir.display(), layout.assay);
    Ok(outcome)
}
