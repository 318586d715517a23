//! On-disk formats for cellforest count matrices.
//!
//! - **10x directories**: [`AssayReader`] over `matrix.mtx`, `features.tsv`
//!   (or legacy `genes.tsv`) and `barcodes.tsv`, plain or gzipped
//! - **Matrix Market**: [`mtx`] coordinate reader and writer
//! - **Delimited tables**: [`tsv`] feature, barcode and dense-table files
//! - **Matrix stores**: [`MatrixStore`], a versioned bincode envelope, with
//!   [`CountsStoreExt`] adding `save`/`load` to [`Counts`](cellforest_omics::Counts)
//! - **Bridges**: [`FormatBridge`] and [`unify_matrix_dir`] keep a store and
//!   its native directory in step
//! - **Assays**: [`Assay`] and [`discover_assays`]
//!
//! # Example
//!
//! ```no_run
//! use cellforest_io::{AssayReader, CountsStoreExt};
//!
//! let counts = AssayReader::open("filtered_feature_bc_matrix")?.read_counts()?;
//! counts.save("processed/rna.store")?;
//! # Ok::<(), cellforest_core::CellforestError>(())
//! ```

pub mod assay;
pub mod bridge;
pub mod cellranger;
pub mod mtx;
pub mod store;
pub mod tsv;

pub use assay::{discover_assays, Assay};
pub use bridge::{unify_matrix_dir, FormatBridge, MarketBridge, MatrixLayout, Unified};
pub use cellranger::{AssayReader, ReaderConfig};
pub use mtx::{read_mtx, read_mtx_csr, write_mtx, MtxField, MtxHeader};
pub use store::{CountsStoreExt, MatrixStore};
