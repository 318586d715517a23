//! Coordinate-format (COO) sparse matrix.
//!
//! [`CooMatrix`] stores entries as `(row, col, value)` triplets. It is the
//! natural import format for Matrix Market files and the staging layout for
//! building a [`CsrMatrix`]. Duplicate coordinates are allowed here and are
//! summed on conversion to CSR.

use cellforest_core::{CellforestError, Result, Summarizable};

use crate::csr::CsrMatrix;
use crate::dtype::DType;

/// A sparse matrix in COO (coordinate) format.
#[derive(Debug, Clone)]
pub struct CooMatrix {
    rows: Vec<usize>,
    cols: Vec<usize>,
    values: Vec<f64>,
    n_rows: usize,
    n_cols: usize,
}

impl CooMatrix {
    /// Largest entry count [`CooMatrix::with_capacity`] reserves up front.
    pub const MAX_PREALLOC: usize = 1 << 20;

    /// Create an empty sparse matrix with the given dimensions.
    pub fn new(n_rows: usize, n_cols: usize) -> Self {
        Self {
            rows: Vec::new(),
            cols: Vec::new(),
            values: Vec::new(),
            n_rows,
            n_cols,
        }
    }

    /// Create an empty matrix with room for up to `nnz` entries.
    ///
    /// The reservation is capped by the matrix size and by
    /// [`MAX_PREALLOC`](Self::MAX_PREALLOC); the vectors grow past it on
    /// insert.
    pub fn with_capacity(n_rows: usize, n_cols: usize, nnz: usize) -> Self {
        let cap = nnz
            .min(n_rows.saturating_mul(n_cols))
            .min(Self::MAX_PREALLOC);
        Self {
            rows: Vec::with_capacity(cap),
            cols: Vec::with_capacity(cap),
            values: Vec::with_capacity(cap),
            n_rows,
            n_cols,
        }
    }

    /// Create a sparse matrix from triplet vectors.
    ///
    /// All three vectors must have the same length, and all indices must be
    /// within bounds.
    pub fn from_triplets(
        rows: Vec<usize>,
        cols: Vec<usize>,
        values: Vec<f64>,
        n_rows: usize,
        n_cols: usize,
    ) -> Result<Self> {
        if rows.len() != cols.len() || cols.len() != values.len() {
            return Err(CellforestError::InvalidInput(
                "rows, cols, and values must have the same length".into(),
            ));
        }
        for (i, (&r, &c)) in rows.iter().zip(cols.iter()).enumerate() {
            if r >= n_rows || c >= n_cols {
                return Err(CellforestError::InvalidInput(format!(
                    "triplet {i} index ({r}, {c}) out of bounds for ({n_rows}, {n_cols})"
                )));
            }
        }
        Ok(Self {
            rows,
            cols,
            values,
            n_rows,
            n_cols,
        })
    }

    /// Insert a single entry. Returns an error if indices are out of bounds.
    pub fn insert(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        if row >= self.n_rows || col >= self.n_cols {
            return Err(CellforestError::InvalidInput(format!(
                "index ({row}, {col}) out of bounds for ({}, {})",
                self.n_rows, self.n_cols
            )));
        }
        self.rows.push(row);
        self.cols.push(col);
        self.values.push(value);
        Ok(())
    }

    /// Append an entry whose indices the caller has already validated.
    pub(crate) fn push(&mut self, row: usize, col: usize, value: f64) {
        debug_assert!(row < self.n_rows && col < self.n_cols);
        self.rows.push(row);
        self.cols.push(col);
        self.values.push(value);
    }

    /// Number of stored entries (duplicates counted separately).
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// (n_rows, n_cols).
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.n_cols)
    }

    /// Swap rows and columns. O(1) per entry, no reordering.
    pub fn transpose(self) -> CooMatrix {
        CooMatrix {
            rows: self.cols,
            cols: self.rows,
            values: self.values,
            n_rows: self.n_cols,
            n_cols: self.n_rows,
        }
    }

    /// Convert to CSR with the given logical element type.
    ///
    /// Entries are sorted by `(row, col)` and duplicate coordinates summed.
    pub fn to_csr(&self, dtype: DType) -> CsrMatrix {
        let nnz = self.values.len();
        let mut order: Vec<usize> = (0..nnz).collect();
        order.sort_by_key(|&i| (self.rows[i], self.cols[i]));

        let mut data: Vec<f64> = Vec::with_capacity(nnz);
        let mut indices: Vec<usize> = Vec::with_capacity(nnz);
        let mut indptr = vec![0usize; self.n_rows + 1];
        let mut last: Option<(usize, usize)> = None;

        for &i in &order {
            let key = (self.rows[i], self.cols[i]);
            if last == Some(key) {
                // duplicate coordinate
                if let Some(v) = data.last_mut() {
                    *v += self.values[i];
                }
                continue;
            }
            data.push(self.values[i]);
            indices.push(key.1);
            indptr[key.0 + 1] += 1;
            last = Some(key);
        }

        for i in 1..=self.n_rows {
            indptr[i] += indptr[i - 1];
        }

        for v in data.iter_mut() {
            *v = dtype.cast(*v);
        }
        CsrMatrix::from_parts_unchecked(self.n_rows, self.n_cols, indptr, indices, data, dtype)
    }

    /// Iterate over stored triplets `(row, col, value)`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.rows
            .iter()
            .zip(self.cols.iter())
            .zip(self.values.iter())
            .map(|((&r, &c), &v)| (r, c, v))
    }
}

impl Summarizable for CooMatrix {
    fn summary(&self) -> String {
        format!(
            "CooMatrix: {}\u{00d7}{}, {} stored entries",
            self.n_rows,
            self.n_cols,
            self.nnz()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_empty() {
        let m = CooMatrix::new(10, 20);
        assert_eq!(m.shape(), (10, 20));
        assert_eq!(m.nnz(), 0);
    }

    #[test]
    fn test_with_capacity_is_capped() {
        let m = CooMatrix::with_capacity(1, 1, usize::MAX / 8);
        assert!(m.values.capacity() < 16);
        let m = CooMatrix::with_capacity(usize::MAX, usize::MAX, usize::MAX);
        assert!(m.rows.capacity() <= CooMatrix::MAX_PREALLOC);
        assert_eq!(m.nnz(), 0);
    }

    #[test]
    fn test_from_triplets_bounds_check() {
        let result = CooMatrix::from_triplets(vec![5], vec![0], vec![1.0], 3, 3);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_triplets_length_mismatch() {
        let result = CooMatrix::from_triplets(vec![0, 1], vec![0], vec![1.0], 3, 3);
        assert!(result.is_err());
    }

    #[test]
    fn test_insert() {
        let mut m = CooMatrix::new(3, 3);
        m.insert(0, 0, 5.0).unwrap();
        assert_eq!(m.nnz(), 1);
        assert!(m.insert(10, 0, 1.0).is_err());
    }

    #[test]
    fn test_transpose() {
        let m = CooMatrix::from_triplets(vec![0, 2], vec![1, 0], vec![3.0, 7.0], 3, 2).unwrap();
        let t = m.transpose();
        assert_eq!(t.shape(), (2, 3));
        let triplets: Vec<_> = t.iter().collect();
        assert_eq!(triplets, vec![(1, 0, 3.0), (0, 2, 7.0)]);
    }

    #[test]
    fn test_to_csr_sorts_and_sums_duplicates() {
        let m = CooMatrix::from_triplets(
            vec![2, 0, 0, 2],
            vec![0, 2, 0, 0],
            vec![4.0, 2.0, 1.0, 1.5],
            3,
            3,
        )
        .unwrap();
        let csr = m.to_csr(DType::Float64);
        assert_eq!(csr.indptr(), &[0, 2, 2, 3]);
        assert_eq!(csr.indices(), &[0, 2, 0]);
        assert_eq!(csr.data(), &[1.0, 2.0, 5.5]);
    }

    #[test]
    fn test_to_csr_casts_to_dtype() {
        let m = CooMatrix::from_triplets(vec![0], vec![0], vec![2.7], 1, 1).unwrap();
        let csr = m.to_csr(DType::Int64);
        assert_eq!(csr.data(), &[2.0]);
        assert_eq!(csr.dtype(), DType::Int64);
    }

    #[test]
    fn test_summary() {
        let m = CooMatrix::from_triplets(vec![0], vec![0], vec![1.0], 100, 50).unwrap();
        assert_eq!(m.summary(), "CooMatrix: 100\u{00d7}50, 1 stored entries");
    }
}
