//! Compressed sparse row (CSR) matrix.
//!
//! [`CsrMatrix`] is the storage behind every count matrix: row `i` owns the
//! entries `indptr[i]..indptr[i + 1]` of `indices` (column positions) and
//! `data` (values). Values are kept as `f64` and rounded to the matrix
//! [`DType`] on every construction path.
//!
//! The elementwise methods near the bottom of this file act on stored values
//! only. Each maps 0 to 0, so the sparsity pattern is preserved and no
//! implicit zero ever needs materializing. `power` refuses the exponents for
//! which that fails on integer data; a negative power of a float matrix
//! leaves implicit zeros at 0.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use cellforest_core::{CellforestError, Result, Summarizable};

use crate::dtype::DType;
use crate::sparse::CooMatrix;

/// Storage layout requested from [`CsrMatrix::asformat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SparseFormat {
    Csr,
    Csc,
    Coo,
}

impl FromStr for SparseFormat {
    type Err = CellforestError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csr" => Ok(SparseFormat::Csr),
            "csc" => Ok(SparseFormat::Csc),
            "coo" => Ok(SparseFormat::Coo),
            other => Err(CellforestError::InvalidInput(format!(
                "unsupported sparse format: {other}"
            ))),
        }
    }
}

/// A sparse matrix in CSR format.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CsrMatrix {
    n_rows: usize,
    n_cols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    data: Vec<f64>,
    dtype: DType,
}

impl CsrMatrix {
    /// An all-zero `Float64` matrix.
    pub fn zeros(n_rows: usize, n_cols: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            indptr: vec![0; n_rows + 1],
            indices: Vec::new(),
            data: Vec::new(),
            dtype: DType::Float64,
        }
    }

    /// Create a matrix from raw CSR arrays.
    ///
    /// - `indptr`: row pointer array (length `n_rows + 1`, non-decreasing)
    /// - `indices`: column index for each value
    /// - `data`: stored values, cast to `dtype`
    pub fn from_csr(
        n_rows: usize,
        n_cols: usize,
        indptr: Vec<usize>,
        indices: Vec<usize>,
        data: Vec<f64>,
        dtype: DType,
    ) -> Result<Self> {
        let mut m = Self {
            n_rows,
            n_cols,
            indptr,
            indices,
            data,
            dtype,
        };
        m.validate()?;
        for v in m.data.iter_mut() {
            *v = dtype.cast(*v);
        }
        Ok(m)
    }

    pub(crate) fn from_parts_unchecked(
        n_rows: usize,
        n_cols: usize,
        indptr: Vec<usize>,
        indices: Vec<usize>,
        data: Vec<f64>,
        dtype: DType,
    ) -> Self {
        Self {
            n_rows,
            n_cols,
            indptr,
            indices,
            data,
            dtype,
        }
    }

    /// Create a matrix from `(row, col, value)` triplets. Duplicates are summed.
    pub fn from_triplets(
        n_rows: usize,
        n_cols: usize,
        rows: Vec<usize>,
        cols: Vec<usize>,
        values: Vec<f64>,
        dtype: DType,
    ) -> Result<Self> {
        Ok(CooMatrix::from_triplets(rows, cols, values, n_rows, n_cols)?.to_csr(dtype))
    }

    /// Create a matrix from dense rows, storing only non-zero values.
    pub fn from_dense(rows: &[Vec<f64>], dtype: DType) -> Result<Self> {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, |r| r.len());
        let mut indptr = Vec::with_capacity(n_rows + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);

        for (i, row) in rows.iter().enumerate() {
            if row.len() != n_cols {
                return Err(CellforestError::InvalidInput(format!(
                    "row {i} has {} columns, expected {n_cols}",
                    row.len()
                )));
            }
            for (c, &v) in row.iter().enumerate() {
                let v = dtype.cast(v);
                if v != 0.0 {
                    indices.push(c);
                    data.push(v);
                }
            }
            indptr.push(indices.len());
        }

        Ok(Self::from_parts_unchecked(
            n_rows, n_cols, indptr, indices, data, dtype,
        ))
    }

    /// Check the structural invariants of the CSR arrays.
    pub fn validate(&self) -> Result<()> {
        if self.indptr.len().checked_sub(1) != Some(self.n_rows) {
            return Err(CellforestError::InvalidInput(format!(
                "CSR indptr length ({}) must be n_rows + 1 (n_rows={})",
                self.indptr.len(),
                self.n_rows
            )));
        }
        if self.data.len() != self.indices.len() {
            return Err(CellforestError::InvalidInput(
                "CSR data and indices must have the same length".into(),
            ));
        }
        if self.indptr[0] != 0 || self.indptr[self.n_rows] != self.data.len() {
            return Err(CellforestError::InvalidInput(format!(
                "CSR indptr must span 0..{} (got {}..{})",
                self.data.len(),
                self.indptr[0],
                self.indptr[self.n_rows]
            )));
        }
        if self.indptr.windows(2).any(|w| w[0] > w[1]) {
            return Err(CellforestError::InvalidInput(
                "CSR indptr must be non-decreasing".into(),
            ));
        }
        if let Some(&c) = self.indices.iter().find(|&&c| c >= self.n_cols) {
            return Err(CellforestError::InvalidInput(format!(
                "CSR column index {c} out of bounds for n_cols={}",
                self.n_cols
            )));
        }
        Ok(())
    }

    /// (n_rows, n_cols).
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.n_cols)
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Number of stored entries (explicit zeros included).
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    /// Logical element type.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn indptr(&self) -> &[usize] {
        &self.indptr
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Fraction of entries that are stored: `nnz / (n_rows * n_cols)`.
    pub fn density(&self) -> f64 {
        let total = self.n_rows as f64 * self.n_cols as f64;
        if total == 0.0 {
            return 0.0;
        }
        self.nnz() as f64 / total
    }

    fn row_range(&self, row: usize) -> Range<usize> {
        self.indptr[row]..self.indptr[row + 1]
    }

    /// Stored `(col, value)` pairs of one row. Empty if `row` is out of bounds.
    pub fn row(&self, row: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = if row < self.n_rows {
            self.row_range(row)
        } else {
            0..0
        };
        self.indices[range.clone()]
            .iter()
            .copied()
            .zip(self.data[range].iter().copied())
    }

    /// Value at `(row, col)`; 0.0 when nothing is stored there.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.row(row)
            .filter(|&(c, _)| c == col)
            .map(|(_, v)| v)
            .sum()
    }

    /// Iterate over stored triplets `(row, col, value)` in row order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (0..self.n_rows).flat_map(move |r| self.row(r).map(move |(c, v)| (r, c, v)))
    }

    /// Convert to a dense 2D vector.
    pub fn to_dense(&self) -> Vec<Vec<f64>> {
        let mut dense = vec![vec![0.0; self.n_cols]; self.n_rows];
        for (r, c, v) in self.iter() {
            dense[r][c] += v;
        }
        dense
    }

    /// Convert to COO triplets.
    pub fn to_coo(&self) -> CooMatrix {
        let mut coo = CooMatrix::with_capacity(self.n_rows, self.n_cols, self.nnz());
        for (r, c, v) in self.iter() {
            coo.push(r, c, v);
        }
        coo
    }

    /// Transpose. Rows of the result have sorted column indices.
    pub fn transpose(&self) -> CsrMatrix {
        let nnz = self.nnz();
        let mut indptr = vec![0usize; self.n_cols + 1];
        for &c in &self.indices {
            indptr[c + 1] += 1;
        }
        for i in 1..=self.n_cols {
            indptr[i] += indptr[i - 1];
        }

        let mut next = indptr.clone();
        let mut indices = vec![0usize; nnz];
        let mut data = vec![0.0; nnz];
        for r in 0..self.n_rows {
            for k in self.row_range(r) {
                let c = self.indices[k];
                let dst = next[c];
                indices[dst] = r;
                data[dst] = self.data[k];
                next[c] += 1;
            }
        }

        Self::from_parts_unchecked(self.n_cols, self.n_rows, indptr, indices, data, self.dtype)
    }

    /// Sorted column indices within each row, duplicates summed.
    pub fn canonical(&self) -> CsrMatrix {
        if self.has_canonical_format() {
            return self.clone();
        }
        self.to_coo().to_csr(self.dtype)
    }

    /// Whether every row has strictly increasing column indices.
    pub fn has_canonical_format(&self) -> bool {
        (0..self.n_rows).all(|r| self.indices[self.row_range(r)].windows(2).all(|w| w[0] < w[1]))
    }

    /// Sum of each row.
    pub fn row_sums(&self) -> Vec<f64> {
        (0..self.n_rows).map(|r| self.row(r).map(|(_, v)| v).sum()).collect()
    }

    /// Sum of each column.
    pub fn col_sums(&self) -> Vec<f64> {
        let mut sums = vec![0.0; self.n_cols];
        for (&c, &v) in self.indices.iter().zip(self.data.iter()) {
            sums[c] += v;
        }
        sums
    }

    /// Sum of all stored values.
    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    /// Gather rows in the given order. Positions may repeat.
    pub fn select_rows(&self, rows: &[usize]) -> Result<CsrMatrix> {
        let mut indptr = Vec::with_capacity(rows.len() + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);

        for &r in rows {
            if r >= self.n_rows {
                return Err(CellforestError::InvalidInput(format!(
                    "row index {r} out of bounds (n_rows={})",
                    self.n_rows
                )));
            }
            let range = self.row_range(r);
            indices.extend_from_slice(&self.indices[range.clone()]);
            data.extend_from_slice(&self.data[range]);
            indptr.push(indices.len());
        }

        Ok(Self::from_parts_unchecked(
            rows.len(),
            self.n_cols,
            indptr,
            indices,
            data,
            self.dtype,
        ))
    }

    /// Gather columns in the given order. Positions may repeat.
    pub fn select_cols(&self, cols: &[usize]) -> Result<CsrMatrix> {
        // old column -> every new position it lands on
        let mut targets: Vec<Vec<usize>> = vec![Vec::new(); self.n_cols];
        for (new, &old) in cols.iter().enumerate() {
            if old >= self.n_cols {
                return Err(CellforestError::InvalidInput(format!(
                    "column index {old} out of bounds (n_cols={})",
                    self.n_cols
                )));
            }
            targets[old].push(new);
        }

        let mut indptr = Vec::with_capacity(self.n_rows + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        let mut row_buf: Vec<(usize, f64)> = Vec::new();
        indptr.push(0);

        for r in 0..self.n_rows {
            row_buf.clear();
            for (c, v) in self.row(r) {
                row_buf.extend(targets[c].iter().map(|&new| (new, v)));
            }
            row_buf.sort_by_key(|&(c, _)| c);
            for &(c, v) in &row_buf {
                indices.push(c);
                data.push(v);
            }
            indptr.push(indices.len());
        }

        Ok(Self::from_parts_unchecked(
            self.n_rows,
            cols.len(),
            indptr,
            indices,
            data,
            self.dtype,
        ))
    }

    fn map_stored(&self, f: impl Fn(f64) -> f64, dtype: DType) -> CsrMatrix {
        Self::from_parts_unchecked(
            self.n_rows,
            self.n_cols,
            self.indptr.clone(),
            self.indices.clone(),
            self.data.iter().map(|&v| dtype.cast(f(v))).collect(),
            dtype,
        )
    }

    /// Combine two same-shape matrices entry by entry.
    ///
    /// With `union` set, coordinates stored in either operand are visited and
    /// the missing side reads as 0; otherwise only shared coordinates are.
    /// Zero results are not stored.
    fn zip_stored(
        &self,
        other: &CsrMatrix,
        op: &str,
        union: bool,
        f: impl Fn(f64, f64) -> f64,
    ) -> Result<CsrMatrix> {
        if self.shape() != other.shape() {
            return Err(CellforestError::InvalidInput(format!(
                "{op}: shape mismatch {:?} vs {:?}",
                self.shape(),
                other.shape()
            )));
        }
        let a = self.canonical();
        let b = other.canonical();
        let dtype = self.dtype.promote(other.dtype);

        let mut indptr = Vec::with_capacity(self.n_rows + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);

        for r in 0..self.n_rows {
            let (ra, rb) = (a.row_range(r), b.row_range(r));
            let (mut i, mut j) = (ra.start, rb.start);
            loop {
                let ca = (i < ra.end).then(|| a.indices[i]);
                let cb = (j < rb.end).then(|| b.indices[j]);
                let (col, va, vb, shared) = match (ca, cb) {
                    (Some(x), Some(y)) if x == y => {
                        let t = (x, a.data[i], b.data[j], true);
                        i += 1;
                        j += 1;
                        t
                    }
                    (Some(x), Some(y)) if x < y => {
                        let t = (x, a.data[i], 0.0, false);
                        i += 1;
                        t
                    }
                    (Some(x), None) => {
                        let t = (x, a.data[i], 0.0, false);
                        i += 1;
                        t
                    }
                    (_, Some(y)) => {
                        let t = (y, 0.0, b.data[j], false);
                        j += 1;
                        t
                    }
                    (None, None) => break,
                };
                if !union && !shared {
                    continue;
                }
                let v = dtype.cast(f(va, vb));
                if v != 0.0 {
                    indices.push(col);
                    data.push(v);
                }
            }
            indptr.push(indices.len());
        }

        Ok(Self::from_parts_unchecked(
            self.n_rows,
            self.n_cols,
            indptr,
            indices,
            data,
            dtype,
        ))
    }
}

macro_rules! float_unary_ops {
    ($($(#[$doc:meta])* $name:ident => $f:expr;)*) => {
        impl CsrMatrix {
            $(
                $(#[$doc])*
                pub fn $name(&self) -> CsrMatrix {
                    self.map_stored($f, self.dtype.float_promoted())
                }
            )*
        }
    };
}

float_unary_ops! {
    /// Elementwise inverse sine.
    arcsin => f64::asin;
    /// Elementwise inverse hyperbolic sine.
    arcsinh => f64::asinh;
    /// Elementwise inverse tangent.
    arctan => f64::atan;
    /// Elementwise inverse hyperbolic tangent.
    arctanh => f64::atanh;
    /// Elementwise ceiling.
    ceil => f64::ceil;
    /// Degrees to radians.
    deg2rad => f64::to_radians;
    /// `exp(x) - 1`, accurate near zero.
    expm1 => f64::exp_m1;
    /// Elementwise floor.
    floor => f64::floor;
    /// `ln(1 + x)`, accurate near zero. The usual transform for counts.
    log1p => f64::ln_1p;
    /// Radians to degrees.
    rad2deg => f64::to_degrees;
    /// Round to nearest integer, ties to even.
    rint => f64::round_ties_even;
    /// Elementwise sine.
    sin => f64::sin;
    /// Elementwise hyperbolic sine.
    sinh => f64::sinh;
    /// Elementwise square root.
    sqrt => f64::sqrt;
    /// Elementwise tangent.
    tan => f64::tan;
    /// Elementwise hyperbolic tangent.
    tanh => f64::tanh;
    /// Round toward zero.
    trunc => f64::trunc;
}

fn sign_of(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        // zero stays zero, NaN stays NaN
        v
    }
}

impl CsrMatrix {
    /// Elementwise sign (-1, 0, 1). Keeps the dtype.
    pub fn sign(&self) -> CsrMatrix {
        self.map_stored(sign_of, self.dtype)
    }

    /// Raise stored values to `exponent`.
    ///
    /// Integer dtypes are kept for whole positive exponents and widened for
    /// fractional ones. A zero exponent would turn implicit zeros into ones,
    /// so it is `Unsupported`; negative exponents of integer or boolean
    /// matrices are `InvalidInput`.
    pub fn power(&self, exponent: f64) -> Result<CsrMatrix> {
        if exponent == 0.0 {
            return Err(CellforestError::Unsupported(
                "power with a zero exponent is not sparse".into(),
            ));
        }
        if exponent < 0.0 && !self.dtype.is_float() {
            return Err(CellforestError::InvalidInput(format!(
                "negative power {exponent} of a {} matrix",
                self.dtype
            )));
        }
        let dtype = if exponent.fract() == 0.0 {
            self.dtype
        } else {
            self.dtype.float_promoted()
        };
        Ok(self.map_stored(|v| v.powf(exponent), dtype))
    }

    /// Elementwise maximum with another matrix of the same shape.
    pub fn maximum(&self, other: &CsrMatrix) -> Result<CsrMatrix> {
        self.zip_stored(other, "maximum", true, f64::max)
    }

    /// Elementwise minimum with another matrix of the same shape.
    pub fn minimum(&self, other: &CsrMatrix) -> Result<CsrMatrix> {
        self.zip_stored(other, "minimum", true, f64::min)
    }

    /// Elementwise (Hadamard) product with another matrix of the same shape.
    pub fn multiply(&self, other: &CsrMatrix) -> Result<CsrMatrix> {
        self.zip_stored(other, "multiply", false, |a, b| a * b)
    }

    /// Cast to another dtype.
    pub fn astype(&self, dtype: DType) -> CsrMatrix {
        self.map_stored(|v| v, dtype)
    }

    /// Cast integer and boolean matrices to a floating-point dtype.
    pub fn asfptype(&self) -> CsrMatrix {
        self.astype(self.dtype.float_promoted())
    }

    /// Round-trip through another storage layout.
    ///
    /// The result is always canonical CSR: the layouts only differ in how the
    /// data is organized, and a count matrix is held row-major.
    pub fn asformat(&self, format: SparseFormat) -> CsrMatrix {
        match format {
            SparseFormat::Csr => self.canonical(),
            SparseFormat::Csc => self.transpose().canonical().transpose(),
            SparseFormat::Coo => self.to_coo().to_csr(self.dtype),
        }
    }

    /// Complex conjugate; the identity on real data.
    pub fn conj(&self) -> CsrMatrix {
        self.clone()
    }

    /// Alias of [`CsrMatrix::conj`].
    pub fn conjugate(&self) -> CsrMatrix {
        self.conj()
    }

    /// Deep copy.
    pub fn copy(&self) -> CsrMatrix {
        self.clone()
    }

    /// Drop explicitly stored zeros.
    pub fn eliminate_zeros(&self) -> CsrMatrix {
        let mut indptr = Vec::with_capacity(self.n_rows + 1);
        let mut indices = Vec::with_capacity(self.nnz());
        let mut data = Vec::with_capacity(self.nnz());
        indptr.push(0);
        for r in 0..self.n_rows {
            for (c, v) in self.row(r) {
                if v != 0.0 {
                    indices.push(c);
                    data.push(v);
                }
            }
            indptr.push(indices.len());
        }
        Self::from_parts_unchecked(self.n_rows, self.n_cols, indptr, indices, data, self.dtype)
    }
}

impl Summarizable for CsrMatrix {
    fn summary(&self) -> String {
        format!(
            "CsrMatrix: {}\u{00d7}{} {}, {} nonzeros ({:.2}% density)",
            self.n_rows,
            self.n_cols,
            self.dtype,
            self.nnz(),
            self.density() * 100.0
        )
    }
}

impl fmt::Display for CsrMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn dense_matrix(max_dim: usize) -> impl Strategy<Value = Vec<Vec<f64>>> {
        (1..=max_dim, 1..=max_dim).prop_flat_map(|(r, c)| {
            proptest::collection::vec(
                proptest::collection::vec(prop_oneof![3 => Just(0u32), 1 => 1..50u32].prop_map(|v| v as f64), c),
                r,
            )
        })
    }

    proptest! {
        #[test]
        fn transpose_twice_is_identity(dense in dense_matrix(8)) {
            let m = CsrMatrix::from_dense(&dense, DType::Int64).unwrap();
            prop_assert_eq!(m.transpose().transpose(), m);
        }

        #[test]
        fn select_all_rows_is_identity(dense in dense_matrix(8)) {
            let m = CsrMatrix::from_dense(&dense, DType::Int64).unwrap();
            let all: Vec<usize> = (0..m.n_rows()).collect();
            prop_assert_eq!(m.select_rows(&all).unwrap(), m.clone());
            let all_cols: Vec<usize> = (0..m.n_cols()).collect();
            prop_assert_eq!(m.select_cols(&all_cols).unwrap(), m);
        }

        #[test]
        fn unary_ops_preserve_pattern(dense in dense_matrix(8)) {
            let m = CsrMatrix::from_dense(&dense, DType::Int64).unwrap();
            let s = m.sqrt();
            prop_assert_eq!(s.indptr(), m.indptr());
            prop_assert_eq!(s.indices(), m.indices());
        }
    }
}
