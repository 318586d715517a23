//! Labeled sparse count matrix (cells × genes).
//!
//! [`Counts`] couples a [`CsrMatrix`] with three label indices: cell ids on
//! rows, and gene symbols plus Ensembl ids on columns. The two column indices
//! are positionally aligned and are always sliced together.
//!
//! Instances are immutable values. Slicing, elementwise math and casts all
//! return a new `Counts` that owns its own buffers.
//!
//! # Example
//!
//! ```
//! use cellforest_omics::{Counts, CsrMatrix, DType, FeatureTable};
//!
//! let matrix = CsrMatrix::from_dense(
//!     &[vec![1.0, 0.0], vec![0.0, 2.0], vec![3.0, 4.0]],
//!     DType::Int64,
//! ).unwrap();
//! let features = FeatureTable::new(
//!     vec!["ENSG01".into(), "ENSG02".into()],
//!     vec!["g1".into(), "g2".into()],
//! ).unwrap();
//! let counts = Counts::new(matrix, ["c1", "c2", "c3"], features).unwrap();
//!
//! let sub = counts.select(vec!["c1", "c3"], "g2").unwrap();
//! assert_eq!(sub.shape(), (2, 1));
//! assert_eq!(sub.cell_ids(), &["c1", "c3"]);
//! assert_eq!(sub.matrix().get(1, 0), 4.0);
//! ```

use std::fmt;

use cellforest_core::{CellforestError, Result, Summarizable};

use crate::csr::{CsrMatrix, SparseFormat};
use crate::dtype::DType;
use crate::key::{Axis, AxisKey, LookupPolicy};
use crate::labels::{FeatureTable, LabelIndex};

/// A sparse cells × genes count matrix with synchronized labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Counts {
    matrix: CsrMatrix,
    cells: LabelIndex,
    genes: LabelIndex,
    ensgs: LabelIndex,
    feature_types: Option<Vec<String>>,
    policy: LookupPolicy,
}

impl Counts {
    /// Wrap a matrix with cell ids and a feature table.
    ///
    /// `features` accepts a [`FeatureTable`] or a single label sequence, which
    /// then serves as both symbols and ids.
    ///
    /// # Errors
    ///
    /// Returns [`CellforestError::Construction`] if the row count differs from
    /// the number of cell ids or the column count from the number of features.
    pub fn new<I, S>(matrix: CsrMatrix, cell_ids: I, features: impl Into<FeatureTable>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let cell_ids: Vec<String> = cell_ids.into_iter().map(Into::into).collect();
        let features = features.into();
        let (n_rows, n_cols) = matrix.shape();

        if cell_ids.len() != n_rows {
            return Err(CellforestError::Construction(format!(
                "cell_ids length ({}) does not match n_rows ({n_rows})",
                cell_ids.len()
            )));
        }
        if features.len() != n_cols {
            return Err(CellforestError::Construction(format!(
                "features length ({}) does not match n_cols ({n_cols})",
                features.len()
            )));
        }

        let (ids, names, feature_types) = features.into_parts();
        let cells = LabelIndex::new(cell_ids);
        let genes = LabelIndex::new(names);
        let ensgs = LabelIndex::new(ids);
        if cells.has_duplicates() {
            log::debug!("duplicate cell ids; label lookups return every match");
        }
        if genes.has_duplicates() {
            log::debug!("duplicate gene symbols; label lookups return every match");
        }

        Ok(Self {
            matrix,
            cells,
            genes,
            ensgs,
            feature_types,
            policy: LookupPolicy::default(),
        })
    }

    /// Set how list-form label keys handle absent labels.
    pub fn with_policy(mut self, policy: LookupPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// How list-form label keys handle absent labels.
    pub fn policy(&self) -> LookupPolicy {
        self.policy
    }

    /// The underlying sparse matrix.
    pub fn matrix(&self) -> &CsrMatrix {
        &self.matrix
    }

    /// Consume into the underlying sparse matrix.
    pub fn into_matrix(self) -> CsrMatrix {
        self.matrix
    }

    /// (n_cells, n_genes).
    pub fn shape(&self) -> (usize, usize) {
        self.matrix.shape()
    }

    /// Number of cells (rows).
    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    /// Number of genes (columns).
    pub fn n_genes(&self) -> usize {
        self.genes.len()
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.matrix.nnz()
    }

    /// Logical element type of the values.
    pub fn dtype(&self) -> DType {
        self.matrix.dtype()
    }

    /// Cell ids in row order.
    pub fn cell_ids(&self) -> &[String] {
        self.cells.labels()
    }

    /// Gene symbols in column order.
    pub fn genes(&self) -> &[String] {
        self.genes.labels()
    }

    /// Ensembl ids in column order.
    pub fn ensgs(&self) -> &[String] {
        self.ensgs.labels()
    }

    /// Row labels with their reverse lookup.
    pub fn cell_index(&self) -> &LabelIndex {
        &self.cells
    }

    /// Gene symbol column labels with their reverse lookup.
    pub fn gene_index(&self) -> &LabelIndex {
        &self.genes
    }

    /// Ensembl id column labels with their reverse lookup.
    pub fn ensg_index(&self) -> &LabelIndex {
        &self.ensgs
    }

    /// The feature table, rebuilt from the column indices.
    pub fn features(&self) -> FeatureTable {
        FeatureTable::from_parts(
            self.ensgs().to_vec(),
            self.genes().to_vec(),
            self.feature_types.clone(),
        )
    }

    // -----------------------------------------------------------------------
    // Slicing
    // -----------------------------------------------------------------------

    /// Select cells. Columns are unchanged.
    pub fn select_rows(&self, key: impl Into<AxisKey>) -> Result<Counts> {
        let key = key.into();
        if key == AxisKey::All {
            return Ok(self.clone());
        }
        let positions = key.resolve(self.n_cells(), Axis::Rows, self.policy, |label| {
            self.cells.positions(label)
        })?;
        Ok(Counts {
            matrix: self.matrix.select_rows(&positions)?,
            cells: self.cells.take(&positions),
            genes: self.genes.clone(),
            ensgs: self.ensgs.clone(),
            feature_types: self.feature_types.clone(),
            policy: self.policy,
        })
    }

    /// Select features. Labels resolve against gene symbols first and fall
    /// back to Ensembl ids per label.
    pub fn select_cols(&self, key: impl Into<AxisKey>) -> Result<Counts> {
        let key = key.into();
        if key == AxisKey::All {
            return Ok(self.clone());
        }
        let positions = key.resolve(self.n_genes(), Axis::Cols, self.policy, |label| {
            self.genes
                .positions(label)
                .or_else(|| self.ensgs.positions(label))
        })?;
        Ok(Counts {
            matrix: self.matrix.select_cols(&positions)?,
            cells: self.cells.clone(),
            genes: self.genes.take(&positions),
            ensgs: self.ensgs.take(&positions),
            feature_types: self
                .feature_types
                .as_ref()
                .map(|t| positions.iter().map(|&i| t[i].clone()).collect()),
            policy: self.policy,
        })
    }

    /// Select along both axes: columns first, then rows of the result.
    pub fn select(&self, rows: impl Into<AxisKey>, cols: impl Into<AxisKey>) -> Result<Counts> {
        self.select_cols(cols)?.select_rows(rows)
    }

    /// Reorder and subset rows to match `cell_ids` (e.g. a metadata index).
    pub fn align_to(&self, cell_ids: &[String]) -> Result<Counts> {
        if self.cell_ids() == cell_ids {
            return Ok(self.clone());
        }
        self.select_rows(cell_ids)
    }

    // -----------------------------------------------------------------------
    // Derived views
    // -----------------------------------------------------------------------

    /// Sums along rows (one per cell) or columns (one per gene).
    pub fn sum(&self, axis: Axis) -> Vec<f64> {
        match axis {
            Axis::Rows => self.matrix.row_sums(),
            Axis::Cols => self.matrix.col_sums(),
        }
    }

    /// Drop all-zero rows, columns, or both (`None`: rows, then columns).
    pub fn dropna(&self, axis: Option<Axis>) -> Result<Counts> {
        match axis {
            None => self.dropna(Some(Axis::Rows))?.dropna(Some(Axis::Cols)),
            Some(axis) => {
                let mask: Vec<bool> = self.sum(axis).iter().map(|&s| s != 0.0).collect();
                match axis {
                    Axis::Rows => self.select_rows(AxisKey::Mask(mask)),
                    Axis::Cols => self.select_cols(AxisKey::Mask(mask)),
                }
            }
        }
    }

    /// Materialize the dense table (rows = cell ids, columns = gene symbols).
    ///
    /// This allocates `n_cells × n_genes` values; a typical experiment with
    /// tens of thousands of cells and genes will not fit in memory this way.
    pub fn to_table(&self) -> CountsTable {
        CountsTable {
            index: self.cell_ids().to_vec(),
            columns: self.genes().to_vec(),
            values: self.matrix.to_dense(),
        }
    }

    // -----------------------------------------------------------------------
    // Structural operations
    // -----------------------------------------------------------------------

    /// Concatenating labeled matrices is not supported.
    pub fn vstack(&self, _other: &Counts) -> Result<Counts> {
        Err(CellforestError::Unsupported(
            "vstack of labeled count matrices".into(),
        ))
    }

    /// Concatenating labeled matrices is not supported.
    pub fn hstack(&self, _other: &Counts) -> Result<Counts> {
        Err(CellforestError::Unsupported(
            "hstack of labeled count matrices".into(),
        ))
    }

    fn rewrap(&self, matrix: CsrMatrix) -> Counts {
        debug_assert_eq!(matrix.shape(), self.matrix.shape());
        Counts {
            matrix,
            cells: self.cells.clone(),
            genes: self.genes.clone(),
            ensgs: self.ensgs.clone(),
            feature_types: self.feature_types.clone(),
            policy: self.policy,
        }
    }

    /// Cast to another dtype.
    pub fn astype(&self, dtype: DType) -> Counts {
        self.rewrap(self.matrix.astype(dtype))
    }

    /// Round-trip the data through another storage layout.
    pub fn asformat(&self, format: SparseFormat) -> Counts {
        self.rewrap(self.matrix.asformat(format))
    }

    /// Raise stored values to `exponent`. See [`CsrMatrix::power`] for the
    /// exponents that are refused.
    pub fn power(&self, exponent: f64) -> Result<Counts> {
        Ok(self.rewrap(self.matrix.power(exponent)?))
    }

    /// Elementwise maximum with a same-shape matrix.
    pub fn maximum(&self, other: &CsrMatrix) -> Result<Counts> {
        Ok(self.rewrap(self.matrix.maximum(other)?))
    }

    /// Elementwise minimum with a same-shape matrix.
    pub fn minimum(&self, other: &CsrMatrix) -> Result<Counts> {
        Ok(self.rewrap(self.matrix.minimum(other)?))
    }

    /// Elementwise product with a same-shape matrix.
    pub fn multiply(&self, other: &CsrMatrix) -> Result<Counts> {
        Ok(self.rewrap(self.matrix.multiply(other)?))
    }
}

macro_rules! label_preserving {
    ($($name:ident),* $(,)?) => {
        impl Counts {
            $(
                #[doc = concat!("[`CsrMatrix::", stringify!($name), "`] with this matrix's labels.")]
                pub fn $name(&self) -> Counts {
                    self.rewrap(self.matrix.$name())
                }
            )*
        }
    };
}

label_preserving!(
    arcsin,
    arcsinh,
    arctan,
    arctanh,
    asfptype,
    ceil,
    conj,
    conjugate,
    copy,
    deg2rad,
    eliminate_zeros,
    expm1,
    floor,
    log1p,
    rad2deg,
    rint,
    sign,
    sin,
    sinh,
    sqrt,
    tan,
    tanh,
    trunc,
);

impl Summarizable for Counts {
    fn summary(&self) -> String {
        format!(
            "Counts: {} cells \u{00d7} {} genes, {} nonzeros",
            self.n_cells(),
            self.n_genes(),
            self.nnz()
        )
    }
}

impl fmt::Display for Counts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Counts: [cell_ids x genes] matrix")?;
        write!(f, "{}", self.matrix)
    }
}

/// Dense tabular form of a [`Counts`] matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct CountsTable {
    /// Row labels (cell ids).
    pub index: Vec<String>,
    /// Column labels (gene symbols).
    pub columns: Vec<String>,
    /// Row-major values, `index.len()` rows of `columns.len()` values.
    pub values: Vec<Vec<f64>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    /// 3 cells × 2 genes:
    /// c1 [1, 0]
    /// c2 [0, 2]
    /// c3 [3, 4]
    fn sample() -> Counts {
        let m = CsrMatrix::from_dense(
            &[vec![1.0, 0.0], vec![0.0, 2.0], vec![3.0, 4.0]],
            DType::Int64,
        )
        .unwrap();
        let features =
            FeatureTable::new(strings(&["ENSG01", "ENSG02"]), strings(&["g1", "g2"])).unwrap();
        Counts::new(m, ["c1", "c2", "c3"], features).unwrap()
    }

    fn with_zeros() -> Counts {
        // c2 and g2 are all-zero
        let m = CsrMatrix::from_dense(
            &[
                vec![1.0, 0.0, 5.0],
                vec![0.0, 0.0, 0.0],
                vec![2.0, 0.0, 0.0],
            ],
            DType::Int64,
        )
        .unwrap();
        let features = FeatureTable::new(
            strings(&["ENSG01", "ENSG02", "ENSG03"]),
            strings(&["g1", "g2", "g3"]),
        )
        .unwrap();
        Counts::new(m, ["c1", "c2", "c3"], features).unwrap()
    }

    #[test]
    fn construction_lengths() {
        let c = sample();
        assert_eq!(c.shape(), (3, 2));
        assert_eq!(c.cell_ids().len(), 3);
        assert_eq!(c.genes().len(), 2);
        assert_eq!(c.ensgs().len(), 2);
        assert_eq!(c.genes(), &["g1", "g2"]);
        assert_eq!(c.ensgs(), &["ENSG01", "ENSG02"]);
    }

    #[test]
    fn construction_row_mismatch() {
        let m = CsrMatrix::zeros(2, 2);
        let err = Counts::new(m, ["c1"], vec!["g1", "g2"]).unwrap_err();
        assert!(matches!(err, CellforestError::Construction(_)));
    }

    #[test]
    fn construction_col_mismatch() {
        let m = CsrMatrix::zeros(1, 2);
        let err = Counts::new(m, ["c1"], vec!["g1"]).unwrap_err();
        assert!(matches!(err, CellforestError::Construction(_)));
    }

    #[test]
    fn single_sequence_features() {
        let c = Counts::new(CsrMatrix::zeros(1, 2), ["c1"], vec!["g1", "g2"]).unwrap();
        assert_eq!(c.genes(), c.ensgs());
    }

    #[test]
    fn row_labels_in_order() {
        let c = sample();
        let sub = c.select_rows(vec!["c1", "c3"]).unwrap();
        assert_eq!(sub.shape(), (2, 2));
        assert_eq!(sub.cell_ids(), &["c1", "c3"]);
        assert_eq!(sub.matrix().to_dense(), vec![vec![1.0, 0.0], vec![3.0, 4.0]]);
        assert_eq!(sub.genes(), c.genes());
    }

    #[test]
    fn row_labels_reversed() {
        let c = sample();
        let sub = c.select_rows(vec!["c3", "c1"]).unwrap();
        assert_eq!(sub.cell_ids(), &["c3", "c1"]);
        assert_eq!(sub.matrix().get(0, 1), 4.0);
    }

    #[test]
    fn position_and_label_agree() {
        let c = sample();
        for (i, label) in c.cell_ids().iter().enumerate() {
            let by_pos = c.select_rows(i).unwrap();
            let by_label = c.select_rows(label.as_str()).unwrap();
            assert_eq!(by_pos, by_label);
        }
        for (j, label) in c.genes().iter().enumerate() {
            assert_eq!(c.select_cols(j).unwrap(), c.select_cols(label.as_str()).unwrap());
        }
    }

    #[test]
    fn mixed_positions_and_single_gene() {
        let c = sample();
        let sub = c.select(vec![0usize, 1], "g2").unwrap();
        assert_eq!(sub.shape(), (2, 1));
        assert_eq!(sub.cell_ids(), &["c1", "c2"]);
        assert_eq!(sub.genes(), &["g2"]);
        assert_eq!(sub.ensgs(), &["ENSG02"]);
        assert_eq!(sub.matrix().to_dense(), vec![vec![0.0], vec![2.0]]);
    }

    #[test]
    fn columns_fall_back_to_ensembl_ids() {
        let c = sample();
        let sub = c.select_cols(vec!["ENSG02", "g1"]).unwrap();
        assert_eq!(sub.genes(), &["g2", "g1"]);
        assert_eq!(sub.ensgs(), &["ENSG02", "ENSG01"]);
        assert_eq!(sub.matrix().get(2, 0), 4.0);
        assert_eq!(sub.matrix().get(2, 1), 3.0);
    }

    #[test]
    fn missing_single_label_is_lookup_error() {
        let c = sample();
        assert!(matches!(c.select_rows("nope"), Err(CellforestError::Lookup(_))));
        assert!(matches!(c.select_cols("nope"), Err(CellforestError::Lookup(_))));
        assert!(matches!(c.select_rows(7usize), Err(CellforestError::Lookup(_))));
    }

    #[test]
    fn missing_list_labels_are_dropped() {
        let c = sample();
        let sub = c.select_rows(vec!["c2", "ghost", "c1"]).unwrap();
        assert_eq!(sub.cell_ids(), &["c2", "c1"]);
    }

    #[test]
    fn strict_policy_rejects_missing_list_labels() {
        let c = sample().with_policy(LookupPolicy::Strict);
        assert!(matches!(
            c.select_rows(vec!["c2", "ghost"]),
            Err(CellforestError::Lookup(_))
        ));
        // policy carries through slicing
        let sub = c.select_rows(0usize..2).unwrap();
        assert_eq!(sub.policy(), LookupPolicy::Strict);
    }

    #[test]
    fn range_slicing_composes() {
        let c = sample();
        let a = c.select_rows(1usize..3).unwrap();
        let b = a.select_rows(0usize..2).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.cell_ids(), &["c2", "c3"]);
    }

    #[test]
    fn stepped_range() {
        let c = sample();
        let sub = c.select_rows(AxisKey::range(0, None, 2)).unwrap();
        assert_eq!(sub.cell_ids(), &["c1", "c3"]);
    }

    #[test]
    fn duplicate_symbols_select_every_match() {
        let m = CsrMatrix::from_dense(&[vec![1.0, 2.0, 3.0]], DType::Int64).unwrap();
        let features = FeatureTable::new(
            strings(&["ENSG01", "ENSG02", "ENSG03"]),
            strings(&["TBCE", "A", "TBCE"]),
        )
        .unwrap();
        let c = Counts::new(m, ["c1"], features).unwrap();
        let sub = c.select_cols("TBCE").unwrap();
        assert_eq!(sub.ensgs(), &["ENSG01", "ENSG03"]);
        assert_eq!(sub.matrix().to_dense(), vec![vec![1.0, 3.0]]);
        // Ensembl ids stay unique handles
        let one = c.select_cols("ENSG03").unwrap();
        assert_eq!(one.shape(), (1, 1));
    }

    #[test]
    fn feature_types_follow_columns() {
        let m = CsrMatrix::zeros(1, 2);
        let features = FeatureTable::new(strings(&["E1", "E2"]), strings(&["A", "B"]))
            .unwrap()
            .with_feature_types(strings(&["Gene Expression", "Antibody Capture"]))
            .unwrap();
        let c = Counts::new(m, ["c1"], features).unwrap();
        let sub = c.select_cols("B").unwrap();
        assert_eq!(
            sub.features().feature_types(),
            Some(&["Antibody Capture".to_string()][..])
        );
    }

    #[test]
    fn elementwise_ops_keep_labels() {
        let c = sample();
        let s = c.sqrt();
        assert_eq!(s.cell_ids(), c.cell_ids());
        assert_eq!(s.genes(), c.genes());
        assert_eq!(s.ensgs(), c.ensgs());
        assert_eq!(s.dtype(), DType::Float64);
        assert_eq!(s.matrix().get(2, 0), 3.0f64.sqrt());

        let l = c.log1p();
        assert_eq!(l.cell_ids(), c.cell_ids());
        assert_eq!(l.matrix().get(0, 0), 1.0f64.ln_1p());

        let p = c.astype(DType::Float32).power(2.0).unwrap();
        assert_eq!(p.dtype(), DType::Float32);
        assert_eq!(p.matrix().get(2, 1), 16.0);
    }

    #[test]
    fn power_refuses_non_sparse_exponents() {
        let c = sample();
        assert!(matches!(c.power(0.0), Err(CellforestError::Unsupported(_))));
        assert!(matches!(c.power(-1.0), Err(CellforestError::InvalidInput(_))));

        let inv = c.astype(DType::Float64).power(-1.0).unwrap();
        assert_eq!(inv.cell_ids(), c.cell_ids());
        assert_eq!(inv.nnz(), c.nnz());
        assert_eq!(inv.matrix().get(2, 1), 0.25);
    }

    #[test]
    fn binary_ops_keep_labels() {
        let c = sample();
        let other = CsrMatrix::from_dense(
            &[vec![2.0, 0.0], vec![0.0, 1.0], vec![0.0, 0.0]],
            DType::Int64,
        )
        .unwrap();
        let m = c.multiply(&other).unwrap();
        assert_eq!(m.cell_ids(), c.cell_ids());
        assert_eq!(m.matrix().to_dense(), vec![vec![2.0, 0.0], vec![0.0, 2.0], vec![0.0, 0.0]]);
        assert!(c.maximum(&CsrMatrix::zeros(1, 1)).is_err());
        assert_eq!(c.minimum(&other).unwrap().genes(), c.genes());
    }

    #[test]
    fn stacking_is_unsupported() {
        let c = sample();
        assert!(matches!(c.vstack(&c), Err(CellforestError::Unsupported(_))));
        assert!(matches!(c.hstack(&c), Err(CellforestError::Unsupported(_))));
    }

    #[test]
    fn dropna_rows_cols_both() {
        let c = with_zeros();
        let rows = c.dropna(Some(Axis::Rows)).unwrap();
        assert_eq!(rows.cell_ids(), &["c1", "c3"]);
        assert_eq!(rows.genes(), &["g1", "g2", "g3"]);

        let cols = c.dropna(Some(Axis::Cols)).unwrap();
        assert_eq!(cols.genes(), &["g1", "g3"]);
        assert_eq!(cols.ensgs(), &["ENSG01", "ENSG03"]);
        assert_eq!(cols.cell_ids(), &["c1", "c2", "c3"]);

        let both = c.dropna(None).unwrap();
        assert_eq!(both.shape(), (2, 2));
        assert_eq!(both.matrix().to_dense(), vec![vec![1.0, 5.0], vec![2.0, 0.0]]);
    }

    #[test]
    fn to_table_is_dense() {
        let t = sample().to_table();
        assert_eq!(t.index, vec!["c1", "c2", "c3"]);
        assert_eq!(t.columns, vec!["g1", "g2"]);
        assert_eq!(t.values[2], vec![3.0, 4.0]);
    }

    #[test]
    fn align_to_metadata() {
        let c = sample();
        let meta = strings(&["c3", "c2"]);
        assert_eq!(c.align_to(&meta).unwrap().cell_ids(), &["c3", "c2"]);
        let same = c.align_to(c.cell_ids()).unwrap();
        assert_eq!(same, c);
    }

    #[test]
    fn display_and_summary() {
        let c = sample();
        assert_eq!(c.summary(), "Counts: 3 cells \u{00d7} 2 genes, 4 nonzeros");
        let shown = c.to_string();
        assert!(shown.starts_with("Counts: [cell_ids x genes] matrix\n"));
        assert!(shown.contains("CsrMatrix: 3\u{00d7}2 int64"));
    }
}
