//! Labeled sparse count matrices for single-cell RNA-seq.
//!
//! This crate provides the in-memory types behind a cell × gene count matrix:
//!
//! - **Sparse storage**: [`CsrMatrix`] (compressed rows) and [`CooMatrix`]
//!   (triplets, the Matrix Market import layout)
//! - **Element types**: [`DType`] with cast and promotion rules
//! - **Labels**: [`LabelIndex`] (label ↔ positions) and [`FeatureTable`]
//! - **Selectors**: [`AxisKey`] for positions, labels, ranges and masks
//! - **Counts**: [`Counts`], a CSR matrix with cell ids on rows and gene
//!   symbols plus Ensembl ids on columns, kept in sync under slicing
//!
//! # Quick start
//!
//! ```
//! use cellforest_omics::{Counts, CsrMatrix, DType};
//! use cellforest_core::Summarizable;
//!
//! let matrix = CsrMatrix::from_dense(
//!     &[vec![0.0, 5.0], vec![2.0, 0.0]],
//!     DType::Int32,
//! ).unwrap();
//! let counts = Counts::new(matrix, ["AAAC-1", "AAAG-1"], vec!["CD3E", "MS4A1"]).unwrap();
//!
//! let b_cells = counts.select_cols("MS4A1").unwrap().dropna(None).unwrap();
//! assert_eq!(b_cells.cell_ids(), &["AAAC-1"]);
//! assert_eq!(counts.summary(), "Counts: 2 cells \u{00d7} 2 genes, 2 nonzeros");
//! ```

pub mod counts;
pub mod csr;
pub mod dtype;
pub mod key;
pub mod labels;
pub mod sparse;

pub use counts::{Counts, CountsTable};
pub use csr::{CsrMatrix, SparseFormat};
pub use dtype::DType;
pub use key::{Axis, AxisKey, LookupPolicy};
pub use labels::{FeatureTable, LabelIndex};
pub use sparse::CooMatrix;
