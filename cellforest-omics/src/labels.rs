//! Label indices for count-matrix axes.
//!
//! A [`LabelIndex`] is an ordered label sequence (the forward view,
//! position → label) paired with a reverse lookup (label → positions).
//! Labels need not be unique: 10x feature tables routinely repeat gene
//! symbols across distinct Ensembl ids, so a label maps to every position it
//! occupies, in ascending order.

use std::collections::HashMap;

use cellforest_core::{CellforestError, Result};

/// An ordered label sequence with a reverse lookup.
#[derive(Debug, Clone, Default)]
pub struct LabelIndex {
    labels: Vec<String>,
    positions: HashMap<String, Vec<usize>>,
}

impl LabelIndex {
    /// Build both views from a label sequence.
    pub fn new(labels: Vec<String>) -> Self {
        let mut positions: HashMap<String, Vec<usize>> = HashMap::with_capacity(labels.len());
        for (i, label) in labels.iter().enumerate() {
            positions.entry(label.clone()).or_default().push(i);
        }
        Self { labels, positions }
    }

    /// Number of labels, counting duplicates.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the index holds no labels.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// The labels in positional order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Label at a position.
    pub fn get(&self, position: usize) -> Option<&str> {
        self.labels.get(position).map(String::as_str)
    }

    /// Every position holding `label`, ascending.
    pub fn positions(&self, label: &str) -> Option<&[usize]> {
        self.positions.get(label).map(Vec::as_slice)
    }

    /// Whether `label` occurs at least once.
    pub fn contains(&self, label: &str) -> bool {
        self.positions.contains_key(label)
    }

    /// Whether any label occurs more than once.
    pub fn has_duplicates(&self) -> bool {
        self.positions.len() != self.labels.len()
    }

    /// A new index holding the labels at `positions`, in that order.
    ///
    /// Callers resolve and bounds-check positions first.
    pub(crate) fn take(&self, positions: &[usize]) -> LabelIndex {
        LabelIndex::new(positions.iter().map(|&i| self.labels[i].clone()).collect())
    }

    /// Labels in positional order, borrowed.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

impl PartialEq for LabelIndex {
    fn eq(&self, other: &Self) -> bool {
        self.labels == other.labels
    }
}

impl<S: Into<String>> FromIterator<S> for LabelIndex {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        LabelIndex::new(iter.into_iter().map(Into::into).collect())
    }
}

/// Per-feature labels of a count matrix.
///
/// Column order follows the 10x `features.tsv` layout: `ids` (column 0,
/// Ensembl gene ids), `names` (column 1, gene symbols), and optionally
/// `feature_types` (column 2, e.g. `Gene Expression`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeatureTable {
    ids: Vec<String>,
    names: Vec<String>,
    feature_types: Option<Vec<String>>,
}

impl FeatureTable {
    /// Create a table from parallel id and name columns.
    pub fn new(ids: Vec<String>, names: Vec<String>) -> Result<Self> {
        if ids.len() != names.len() {
            return Err(CellforestError::Construction(format!(
                "feature ids ({}) and names ({}) differ in length",
                ids.len(),
                names.len()
            )));
        }
        Ok(Self {
            ids,
            names,
            feature_types: None,
        })
    }

    /// A table whose ids and names are the same single label sequence.
    pub fn from_names(names: Vec<String>) -> Self {
        Self {
            ids: names.clone(),
            names,
            feature_types: None,
        }
    }

    /// Build from the columns of a headerless feature table.
    ///
    /// One column is used for both ids and names; two or more are read as
    /// ids, names and (if present) feature types. Further columns are ignored.
    pub fn from_columns(mut columns: Vec<Vec<String>>) -> Result<Self> {
        match columns.len() {
            0 => Err(CellforestError::InvalidInput(
                "feature table has no columns".into(),
            )),
            1 => Ok(Self::from_names(columns.remove(0))),
            n => {
                columns.truncate(3);
                let feature_types = if n >= 3 { columns.pop() } else { None };
                let names = columns.pop().unwrap_or_default();
                let ids = columns.pop().unwrap_or_default();
                let table = Self::new(ids, names)?;
                match feature_types {
                    Some(types) => table.with_feature_types(types),
                    None => Ok(table),
                }
            }
        }
    }

    /// Attach a feature-type column.
    pub fn with_feature_types(mut self, feature_types: Vec<String>) -> Result<Self> {
        if feature_types.len() != self.len() {
            return Err(CellforestError::Construction(format!(
                "feature types ({}) do not match feature count ({})",
                feature_types.len(),
                self.len()
            )));
        }
        self.feature_types = Some(feature_types);
        Ok(self)
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Column 0: stable gene ids.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Column 1: gene symbols.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Column 2, when the source file had one.
    pub fn feature_types(&self) -> Option<&[String]> {
        self.feature_types.as_deref()
    }

    /// Rows of the table as `[id, name, (type)]` records.
    pub fn records(&self) -> impl Iterator<Item = Vec<&str>> + '_ {
        (0..self.len()).map(move |i| {
            let mut rec = vec![self.ids[i].as_str(), self.names[i].as_str()];
            if let Some(types) = &self.feature_types {
                rec.push(types[i].as_str());
            }
            rec
        })
    }

    pub(crate) fn from_parts(
        ids: Vec<String>,
        names: Vec<String>,
        feature_types: Option<Vec<String>>,
    ) -> Self {
        debug_assert_eq!(ids.len(), names.len());
        Self {
            ids,
            names,
            feature_types,
        }
    }

    pub(crate) fn into_parts(self) -> (Vec<String>, Vec<String>, Option<Vec<String>>) {
        (self.ids, self.names, self.feature_types)
    }
}

impl From<Vec<String>> for FeatureTable {
    fn from(names: Vec<String>) -> Self {
        FeatureTable::from_names(names)
    }
}

impl From<Vec<&str>> for FeatureTable {
    fn from(names: Vec<&str>) -> Self {
        FeatureTable::from_names(names.into_iter().map(String::from).collect())
    }
}
