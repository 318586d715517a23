//! Headerless delimited tables: 10x `features.tsv` / `barcodes.tsv`, plus
//! the dense [`CountsTable`] export.

use std::path::Path;

use cellforest_core::compress::{open_reader, TextWriter};
use cellforest_core::{CellforestError, Result};
use cellforest_omics::{CountsTable, FeatureTable};

fn csv_err(path: &Path, e: csv::Error) -> CellforestError {
    match e.position() {
        Some(pos) => CellforestError::Parse(format!(
            "{}: line {}: {}",
            path.display(),
            pos.line(),
            e
        )),
        None => CellforestError::Parse(format!("{}: {}", path.display(), e)),
    }
}

fn writer(path: &Path, delimiter: u8) -> Result<csv::Writer<TextWriter>> {
    Ok(csv::WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .from_writer(TextWriter::create(path)?))
}

fn finish(path: &Path, w: csv::Writer<TextWriter>) -> Result<()> {
    w.into_inner()
        .map_err(|e| CellforestError::io_at(path, e.into_error()))?
        .finish()
}

/// Read every record of a headerless delimited file.
///
/// Records may differ in width. Gzip is detected from the `.gz` suffix.
pub fn read_records(path: impl AsRef<Path>, delimiter: u8) -> Result<Vec<Vec<String>>> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(open_reader(path)?);

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| csv_err(path, e))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

/// Read a headerless table column-wise.
///
/// The column count is the width of the first record; every record must
/// have at least that many fields.
pub fn read_columns(path: impl AsRef<Path>, delimiter: u8) -> Result<Vec<Vec<String>>> {
    let path = path.as_ref();
    let rows = read_records(path, delimiter)?;
    let width = rows.first().map_or(0, Vec::len);
    let mut columns: Vec<Vec<String>> = (0..width).map(|_| Vec::with_capacity(rows.len())).collect();
    for (i, row) in rows.into_iter().enumerate() {
        if row.len() < width {
            return Err(CellforestError::Parse(format!(
                "{}: line {}: expected {width} fields, found {}",
                path.display(),
                i + 1,
                row.len()
            )));
        }
        for (col, field) in columns.iter_mut().zip(row) {
            col.push(field);
        }
    }
    Ok(columns)
}

/// Read a 10x feature table (id, name, optional type).
pub fn read_features(path: impl AsRef<Path>, delimiter: u8) -> Result<FeatureTable> {
    let path = path.as_ref();
    let columns = read_columns(path, delimiter)?;
    FeatureTable::from_columns(columns).map_err(|e| match e {
        CellforestError::InvalidInput(msg) => {
            CellforestError::Parse(format!("{}: {msg}", path.display()))
        }
        other => other,
    })
}

/// Read cell barcodes from the first column.
pub fn read_barcodes(path: impl AsRef<Path>, delimiter: u8) -> Result<Vec<String>> {
    let rows = read_records(path, delimiter)?;
    Ok(rows
        .into_iter()
        .filter_map(|row| row.into_iter().next())
        .collect())
}

/// Write a feature table, one feature per line.
pub fn write_features(path: impl AsRef<Path>, features: &FeatureTable, delimiter: u8) -> Result<()> {
    let path = path.as_ref();
    let mut w = writer(path, delimiter)?;
    for record in features.records() {
        w.write_record(&record).map_err(|e| csv_err(path, e))?;
    }
    finish(path, w)
}

/// Write cell barcodes, one per line.
pub fn write_barcodes(path: impl AsRef<Path>, barcodes: &[String], delimiter: u8) -> Result<()> {
    let path = path.as_ref();
    let mut w = writer(path, delimiter)?;
    for barcode in barcodes {
        w.write_record([barcode]).map_err(|e| csv_err(path, e))?;
    }
    finish(path, w)
}

/// Write a dense counts table with a header row of gene symbols and the
/// cell id leading each row.
pub fn write_table(path: impl AsRef<Path>, table: &CountsTable, delimiter: u8) -> Result<()> {
    let path = path.as_ref();
    let mut w = writer(path, delimiter)?;

    let mut header = Vec::with_capacity(table.columns.len() + 1);
    header.push(String::new());
    header.extend(table.columns.iter().cloned());
    w.write_record(&header).map_err(|e| csv_err(path, e))?;

    for (cell, values) in table.index.iter().zip(&table.values) {
        let mut record = Vec::with_capacity(values.len() + 1);
        record.push(cell.clone());
        record.extend(values.iter().map(|v| v.to_string()));
        w.write_record(&record).map_err(|e| csv_err(path, e))?;
    }
    finish(path, w)
}
