//! Assay kinds and discovery of persisted assay stores.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use cellforest_core::{Annotated, CellforestError, Result};

use crate::bridge::MatrixLayout;

/// Single-cell assay modalities a processed directory may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Assay {
    Rna,
    Vdj,
    Surface,
    Antigen,
    Cnv,
    Atac,
    Spatial,
    Crispr,
}

impl Assay {
    pub const ALL: [Assay; 8] = [
        Assay::Rna,
        Assay::Vdj,
        Assay::Surface,
        Assay::Antigen,
        Assay::Cnv,
        Assay::Atac,
        Assay::Spatial,
        Assay::Crispr,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Assay::Rna => "rna",
            Assay::Vdj => "vdj",
            Assay::Surface => "surface",
            Assay::Antigen => "antigen",
            Assay::Cnv => "cnv",
            Assay::Atac => "atac",
            Assay::Spatial => "spatial",
            Assay::Crispr => "crispr",
        }
    }

    /// The default persisted layout for this assay.
    pub fn layout(self) -> MatrixLayout {
        MatrixLayout::for_assay(self.as_str())
    }
}

impl fmt::Display for Assay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Assay {
    type Err = CellforestError;

    fn from_str(s: &str) -> Result<Self> {
        Assay::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CellforestError::InvalidInput(format!("unknown assay: {s}")))
    }
}

impl Annotated for Assay {
    fn name(&self) -> &str {
        self.as_str()
    }

    fn description(&self) -> Option<&str> {
        Some(match self {
            Assay::Rna => "gene expression",
            Assay::Vdj => "V(D)J immune repertoire",
            Assay::Surface => "cell surface protein (antibody capture)",
            Assay::Antigen => "antigen capture",
            Assay::Cnv => "copy number variation",
            Assay::Atac => "chromatin accessibility",
            Assay::Spatial => "spatial gene expression",
            Assay::Crispr => "CRISPR guide capture",
        })
    }
}

/// Assays with a store file in `dir`, named `<assay><store_suffix>`.
///
/// Only `layout.store_suffix` is consulted. Files with the suffix but an
/// unknown assay name are skipped.
pub fn discover_assays(dir: impl AsRef<Path>, layout: &MatrixLayout) -> Result<Vec<Assay>> {
    let dir = dir.as_ref();
    let mut found = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| CellforestError::io_at(dir, e))? {
        let entry = entry.map_err(|e| CellforestError::io_at(dir, e))?;
        let name = entry.file_name();
        let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(&layout.store_suffix)) else {
            continue;
        };
        match stem.parse::<Assay>() {
            Ok(assay) => found.push(assay),
            Err(_) => log::debug!("skipping {}: not an assay store", entry.path().display()),
        }
    }
    found.sort();
    found.dedup();
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn names_round_trip() {
        for assay in Assay::ALL {
            assert_eq!(assay.to_string().parse::<Assay>().unwrap(), assay);
        }
        assert_eq!("RNA".parse::<Assay>().unwrap(), Assay::Rna);
        assert!("proteome".parse::<Assay>().is_err());
    }

    #[test]
    fn layout_uses_assay_name() {
        let layout = Assay::Vdj.layout();
        assert_eq!(layout.store_path(Path::new("d")), Path::new("d/vdj.store"));
        assert_eq!(layout.native_path(Path::new("d")), Path::new("d/vdj_r"));
    }

    #[test]
    fn discovers_store_files() {
        let dir = TempDir::new().unwrap();
        for name in ["surface.store", "rna.store", "notes.store", "rna_r", "meta.tsv"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        let found = discover_assays(dir.path(), &MatrixLayout::default()).unwrap();
        assert_eq!(found, vec![Assay::Rna, Assay::Surface]);
    }

    #[test]
    fn missing_dir_is_io_error() {
        let err = discover_assays("/nonexistent/cellforest", &MatrixLayout::default()).unwrap_err();
        assert!(matches!(err, CellforestError::Io(_)));
    }

    #[test]
    fn described() {
        assert_eq!(Assay::Atac.name(), "atac");
        assert_eq!(Assay::Rna.description(), Some("gene expression"));
    }
}
