//! Matrix Market (`.mtx`) coordinate files.
//!
//! Reading and writing go through [`sprs::io`]. This module adds what 10x
//! directories need on top: a `.gz` suffix selects gzip on both read and
//! write, the header is checked before any entry is read, and entries are
//! handed back as a [`CooMatrix`].
//!
//! Supported banners are `coordinate` with an `integer` or `real` field and
//! `general` symmetry, which covers 10x feature-barcode matrices.
//!
//! 10x stores matrices gene-major (features × barcodes); callers pass
//! `transpose = true` to move between that and cell-major [`CsrMatrix`].

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;

use sprs::TriMat;

use cellforest_core::compress::{is_gzip_path, open_reader, TextWriter};
use cellforest_core::{CellforestError, Result};
use cellforest_omics::{CooMatrix, CsrMatrix, DType};

const BANNER: &str = "%%MatrixMarket";

/// Shortest entry line: `"1 1 1\n"`.
const MIN_ENTRY_BYTES: usize = 6;

/// Largest row or column count accepted from a header.
pub const MAX_DIMENSION: usize = 1 << 28;

/// The value field declared in a Matrix Market banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MtxField {
    Integer,
    Real,
}

impl MtxField {
    /// The element type a matrix with this field loads as.
    pub fn dtype(self) -> DType {
        match self {
            MtxField::Integer => DType::Int64,
            MtxField::Real => DType::Float64,
        }
    }

    /// The field used to write values of `dtype`.
    pub fn for_dtype(dtype: DType) -> Self {
        if dtype.is_float() {
            MtxField::Real
        } else {
            MtxField::Integer
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MtxField::Integer => "integer",
            MtxField::Real => "real",
        }
    }
}

impl FromStr for MtxField {
    type Err = CellforestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "integer" => Ok(MtxField::Integer),
            "real" => Ok(MtxField::Real),
            other => Err(CellforestError::Unsupported(format!(
                "Matrix Market field '{other}'"
            ))),
        }
    }
}

/// Banner and size line of a Matrix Market file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MtxHeader {
    pub field: MtxField,
    pub n_rows: usize,
    pub n_cols: usize,
    pub nnz: usize,
}

fn parse_err(path: &Path, msg: impl std::fmt::Display) -> CellforestError {
    CellforestError::Parse(format!("{}: {msg}", path.display()))
}

fn parse_banner(line: &str, path: &Path) -> Result<MtxField> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 5 || !fields[0].eq_ignore_ascii_case(BANNER) {
        return Err(parse_err(path, "missing %%MatrixMarket banner"));
    }
    if !fields[1].eq_ignore_ascii_case("matrix") {
        return Err(CellforestError::Unsupported(format!(
            "{}: Matrix Market object '{}'",
            path.display(),
            fields[1]
        )));
    }
    if !fields[2].eq_ignore_ascii_case("coordinate") {
        return Err(CellforestError::Unsupported(format!(
            "{}: Matrix Market format '{}' (only coordinate is supported)",
            path.display(),
            fields[2]
        )));
    }
    let field = fields[3].parse::<MtxField>()?;
    if !fields[4].eq_ignore_ascii_case("general") {
        return Err(CellforestError::Unsupported(format!(
            "{}: Matrix Market symmetry '{}'",
            path.display(),
            fields[4]
        )));
    }
    Ok(field)
}

fn parse_size(line: &str, path: &Path) -> Result<(usize, usize, usize)> {
    let values = line
        .split_whitespace()
        .map(|t| {
            t.parse::<usize>()
                .map_err(|_| parse_err(path, format!("invalid size line '{line}'")))
        })
        .collect::<Result<Vec<_>>>()?;
    match values[..] {
        [n_rows, n_cols, nnz] => Ok((n_rows, n_cols, nnz)),
        _ => Err(parse_err(path, format!("invalid size line '{line}'"))),
    }
}

/// Read the banner and size line of `text`.
///
/// The declared entry count is checked against the bytes that follow the
/// size line, and dimensions against [`MAX_DIMENSION`], so a forged header
/// is rejected before anything is allocated for it.
pub fn read_header(text: &[u8], path: &Path) -> Result<MtxHeader> {
    let mut field = None;
    let mut offset = 0;
    for raw in text.split(|&b| b == b'\n') {
        offset += raw.len() + 1;
        let line = std::str::from_utf8(raw)
            .map_err(|_| parse_err(path, "header is not valid UTF-8"))?
            .trim();
        let Some(field) = field else {
            field = Some(parse_banner(line, path)?);
            continue;
        };
        if line.is_empty() || line.starts_with('%') {
            continue;
        }

        let (n_rows, n_cols, nnz) = parse_size(line, path)?;
        if n_rows > MAX_DIMENSION || n_cols > MAX_DIMENSION {
            return Err(parse_err(
                path,
                format!("dimensions {n_rows}\u{00d7}{n_cols} exceed {MAX_DIMENSION}"),
            ));
        }
        let remaining = text.len().saturating_sub(offset);
        if nnz > (remaining + 1) / MIN_ENTRY_BYTES {
            return Err(parse_err(
                path,
                format!("declares {nnz} entries but only {remaining} bytes follow"),
            ));
        }
        return Ok(MtxHeader {
            field,
            n_rows,
            n_cols,
            nnz,
        });
    }
    match field {
        Some(_) => Err(parse_err(path, "missing size line")),
        None => Err(parse_err(path, "empty file")),
    }
}

/// Parse Matrix Market text from a reader.
///
/// `path` only labels error messages.
pub fn parse_mtx<R: Read>(mut reader: R, path: &Path) -> Result<(MtxHeader, CooMatrix)> {
    let mut text = Vec::new();
    reader
        .read_to_end(&mut text)
        .map_err(|e| CellforestError::io_at(path, e))?;
    let header = read_header(&text, path)?;

    let tri: TriMat<f64> = sprs::io::read_matrix_market_from_bufread(&mut text.as_slice())
        .map_err(|e| parse_err(path, e))?;
    if (tri.rows(), tri.cols()) != (header.n_rows, header.n_cols) || tri.nnz() != header.nnz {
        return Err(parse_err(
            path,
            format!(
                "expected {}\u{00d7}{} with {} entries, found {}\u{00d7}{} with {}",
                header.n_rows,
                header.n_cols,
                header.nnz,
                tri.rows(),
                tri.cols(),
                tri.nnz()
            ),
        ));
    }

    let coo = CooMatrix::from_triplets(
        tri.row_inds().to_vec(),
        tri.col_inds().to_vec(),
        tri.data().to_vec(),
        header.n_rows,
        header.n_cols,
    )
    .map_err(|e| parse_err(path, e))?;
    Ok((header, coo))
}

/// Read a Matrix Market file as stored.
pub fn read_mtx(path: impl AsRef<Path>) -> Result<(MtxHeader, CooMatrix)> {
    let path = path.as_ref();
    log::debug!("reading Matrix Market file {}", path.display());
    parse_mtx(open_reader(path)?, path)
}

/// Read a Matrix Market file into CSR, optionally transposed.
pub fn read_mtx_csr(path: impl AsRef<Path>, transpose: bool) -> Result<CsrMatrix> {
    let (header, coo) = read_mtx(path)?;
    let coo = if transpose { coo.transpose() } else { coo };
    Ok(coo.to_csr(header.field.dtype()))
}

fn write_plain(path: &Path, matrix: &CsrMatrix, field: MtxField, transpose: bool) -> Result<()> {
    let shape = if transpose {
        (matrix.n_cols(), matrix.n_rows())
    } else {
        matrix.shape()
    };
    let entries = matrix
        .iter()
        .map(|(r, c, v)| if transpose { (c, r, v) } else { (r, c, v) });

    let written = match field {
        MtxField::Real => {
            let mut tri = TriMat::<f64>::with_capacity(shape, matrix.nnz());
            for (r, c, v) in entries {
                tri.add_triplet(r, c, v);
            }
            sprs::io::write_matrix_market(path, &tri)
        }
        MtxField::Integer => {
            let mut tri = TriMat::<i64>::with_capacity(shape, matrix.nnz());
            for (r, c, v) in entries {
                tri.add_triplet(r, c, v as i64);
            }
            sprs::io::write_matrix_market(path, &tri)
        }
    };
    written.map_err(|e| CellforestError::Io(io::Error::other(format!("{}: {e}", path.display()))))
}

/// Write `matrix` as a coordinate Matrix Market file.
///
/// With `transpose`, the file holds `matrix`ᵀ (e.g. cell-major in memory,
/// gene-major on disk). Only stored entries are written. A `.gz` target is
/// staged as plain text in a temporary file and compressed into place.
pub fn write_mtx(path: impl AsRef<Path>, matrix: &CsrMatrix, transpose: bool) -> Result<()> {
    let path = path.as_ref();
    let field = MtxField::for_dtype(matrix.dtype());

    if is_gzip_path(path) {
        let staged = tempfile::NamedTempFile::new()?;
        write_plain(staged.path(), matrix, field, transpose)?;
        let mut src =
            File::open(staged.path()).map_err(|e| CellforestError::io_at(staged.path(), e))?;
        let mut w = TextWriter::create(path)?;
        io::copy(&mut src, &mut w).map_err(|e| CellforestError::io_at(path, e))?;
        w.finish()?;
    } else {
        write_plain(path, matrix, field, transpose)?;
    }

    log::debug!(
        "wrote {} Matrix Market file {} ({} entries, transpose={transpose})",
        field.as_str(),
        path.display(),
        matrix.nnz()
    );
    Ok(())
}
