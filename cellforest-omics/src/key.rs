//! Axis selectors for slicing count matrices.

use std::fmt;
use std::ops::{Range, RangeFrom, RangeFull, RangeTo};

use cellforest_core::{CellforestError, Result};

/// A matrix axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Cells.
    Rows,
    /// Features (genes).
    Cols,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Rows => f.write_str("cell"),
            Axis::Cols => f.write_str("feature"),
        }
    }
}

/// How list-form label keys treat labels absent from the index.
///
/// A single [`AxisKey::Label`] that is absent is always an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LookupPolicy {
    /// Drop absent labels and log a warning with the number dropped.
    #[default]
    FilterAndWarn,
    /// Fail on the first absent label.
    Strict,
}

/// A selector for one axis of a count matrix.
#[derive(Debug, Clone, PartialEq)]
pub enum AxisKey {
    /// Every position, unchanged.
    All,
    /// One position.
    Position(usize),
    /// Positions in the given order; repeats allowed.
    Positions(Vec<usize>),
    /// One label.
    Label(String),
    /// Labels in the given order.
    Labels(Vec<String>),
    /// Positional slice `start..stop` taking every `step`-th position.
    /// `stop: None` runs to the end; a stop past the end is clamped.
    Range {
        start: usize,
        stop: Option<usize>,
        step: usize,
    },
    /// Boolean mask, one entry per position.
    Mask(Vec<bool>),
}

impl AxisKey {
    /// A stepped positional slice.
    pub fn range(start: usize, stop: Option<usize>, step: usize) -> Self {
        AxisKey::Range { start, stop, step }
    }

    /// Resolve to positions along an axis of length `len`.
    ///
    /// `lookup` maps a label to its positions.
    pub(crate) fn resolve<'a>(
        &self,
        len: usize,
        axis: Axis,
        policy: LookupPolicy,
        lookup: impl Fn(&str) -> Option<&'a [usize]>,
    ) -> Result<Vec<usize>> {
        match self {
            AxisKey::All => Ok((0..len).collect()),
            AxisKey::Position(i) => {
                check_position(*i, len, axis)?;
                Ok(vec![*i])
            }
            AxisKey::Positions(v) => {
                for &i in v {
                    check_position(i, len, axis)?;
                }
                Ok(v.clone())
            }
            AxisKey::Label(label) => lookup(label.as_str()).map(<[usize]>::to_vec).ok_or_else(|| {
                CellforestError::Lookup(format!("{axis} label '{label}' not found"))
            }),
            AxisKey::Labels(labels) => {
                let mut positions = Vec::with_capacity(labels.len());
                let mut missing = 0usize;
                for label in labels {
                    match lookup(label.as_str()) {
                        Some(p) => positions.extend_from_slice(p),
                        None if policy == LookupPolicy::Strict => {
                            return Err(CellforestError::Lookup(format!(
                                "{axis} label '{label}' not found"
                            )));
                        }
                        None => missing += 1,
                    }
                }
                if missing > 0 {
                    log::warn!(
                        "{missing} of {} {axis} labels not found in index; dropped",
                        labels.len()
                    );
                }
                Ok(positions)
            }
            AxisKey::Range { start, stop, step } => {
                if *step == 0 {
                    return Err(CellforestError::InvalidInput(
                        "slice step cannot be zero".into(),
                    ));
                }
                let stop = stop.unwrap_or(len).min(len);
                let start = (*start).min(stop);
                Ok((start..stop).step_by(*step).collect())
            }
            AxisKey::Mask(mask) => {
                if mask.len() != len {
                    return Err(CellforestError::Lookup(format!(
                        "{axis} mask length ({}) does not match axis length ({len})",
                        mask.len()
                    )));
                }
                Ok(mask
                    .iter()
                    .enumerate()
                    .filter_map(|(i, &keep)| keep.then_some(i))
                    .collect())
            }
        }
    }
}

fn check_position(i: usize, len: usize, axis: Axis) -> Result<()> {
    if i >= len {
        return Err(CellforestError::Lookup(format!(
            "{axis} position {i} out of bounds (len={len})"
        )));
    }
    Ok(())
}

impl From<usize> for AxisKey {
    fn from(i: usize) -> Self {
        AxisKey::Position(i)
    }
}

impl From<&str> for AxisKey {
    fn from(label: &str) -> Self {
        AxisKey::Label(label.to_string())
    }
}

impl From<String> for AxisKey {
    fn from(label: String) -> Self {
        AxisKey::Label(label)
    }
}

impl From<Vec<usize>> for AxisKey {
    fn from(positions: Vec<usize>) -> Self {
        AxisKey::Positions(positions)
    }
}

impl From<&[usize]> for AxisKey {
    fn from(positions: &[usize]) -> Self {
        AxisKey::Positions(positions.to_vec())
    }
}

impl From<Vec<String>> for AxisKey {
    fn from(labels: Vec<String>) -> Self {
        AxisKey::Labels(labels)
    }
}

impl From<&[String]> for AxisKey {
    fn from(labels: &[String]) -> Self {
        AxisKey::Labels(labels.to_vec())
    }
}

impl From<Vec<&str>> for AxisKey {
    fn from(labels: Vec<&str>) -> Self {
        AxisKey::Labels(labels.into_iter().map(String::from).collect())
    }
}

impl From<Vec<bool>> for AxisKey {
    fn from(mask: Vec<bool>) -> Self {
        AxisKey::Mask(mask)
    }
}

impl From<Range<usize>> for AxisKey {
    fn from(r: Range<usize>) -> Self {
        AxisKey::range(r.start, Some(r.end), 1)
    }
}

impl From<RangeFrom<usize>> for AxisKey {
    fn from(r: RangeFrom<usize>) -> Self {
        AxisKey::range(r.start, None, 1)
    }
}

impl From<RangeTo<usize>> for AxisKey {
    fn from(r: RangeTo<usize>) -> Self {
        AxisKey::range(0, Some(r.end), 1)
    }
}

impl From<RangeFull> for AxisKey {
    fn from(_: RangeFull) -> Self {
        AxisKey::All
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn table() -> HashMap<String, Vec<usize>> {
        let mut m = HashMap::new();
        m.insert("a".to_string(), vec![0]);
        m.insert("b".to_string(), vec![1, 3]);
        m.insert("c".to_string(), vec![2]);
        m
    }

    fn resolve(key: impl Into<AxisKey>, policy: LookupPolicy) -> Result<Vec<usize>> {
        let t = table();
        let key: AxisKey = key.into();
        key.resolve(4, Axis::Rows, policy, |l| t.get(l).map(Vec::as_slice))
    }

    #[test]
    fn positions() {
        assert_eq!(resolve(2usize, LookupPolicy::default()).unwrap(), vec![2]);
        assert_eq!(resolve(vec![3usize, 0, 3], LookupPolicy::default()).unwrap(), vec![3, 0, 3]);
        assert!(matches!(
            resolve(4usize, LookupPolicy::default()),
            Err(CellforestError::Lookup(_))
        ));
    }

    #[test]
    fn single_label_is_strict() {
        assert_eq!(resolve("c", LookupPolicy::default()).unwrap(), vec![2]);
        assert_eq!(resolve("b", LookupPolicy::default()).unwrap(), vec![1, 3]);
        assert!(matches!(
            resolve("zz", LookupPolicy::default()),
            Err(CellforestError::Lookup(_))
        ));
    }

    #[test]
    fn label_list_filters_by_default() {
        let got = resolve(vec!["c", "missing", "a"], LookupPolicy::FilterAndWarn).unwrap();
        assert_eq!(got, vec![2, 0]);
    }

    #[test]
    fn label_list_strict_rejects_missing() {
        assert!(resolve(vec!["c", "missing"], LookupPolicy::Strict).is_err());
        assert_eq!(resolve(vec!["a", "b"], LookupPolicy::Strict).unwrap(), vec![0, 1, 3]);
    }

    #[test]
    fn ranges_follow_slice_semantics() {
        let p = LookupPolicy::default();
        assert_eq!(resolve(1usize..3, p).unwrap(), vec![1, 2]);
        assert_eq!(resolve(2usize.., p).unwrap(), vec![2, 3]);
        assert_eq!(resolve(..2usize, p).unwrap(), vec![0, 1]);
        assert_eq!(resolve(1usize..99, p).unwrap(), vec![1, 2, 3]);
        assert_eq!(resolve(3usize..1, p).unwrap(), Vec::<usize>::new());
        assert_eq!(resolve(AxisKey::range(0, None, 2), p).unwrap(), vec![0, 2]);
        assert_eq!(resolve(.., p).unwrap(), vec![0, 1, 2, 3]);
        assert!(resolve(AxisKey::range(0, None, 0), p).is_err());
    }

    #[test]
    fn masks() {
        let p = LookupPolicy::default();
        assert_eq!(resolve(vec![true, false, false, true], p).unwrap(), vec![0, 3]);
        assert!(resolve(vec![true], p).is_err());
    }

    #[test]
    fn axis_display() {
        assert_eq!(Axis::Rows.to_string(), "cell");
        assert_eq!(Axis::Cols.to_string(), "feature");
    }
}
