//! Traits implemented by matrices, stores, codecs and assay kinds across the
//! cellforest crates.

/// One-line description of a matrix or store, used in logs and `Display`.
pub trait Summarizable {
    /// Shape, element type and stored-entry counts, on a single line.
    fn summary(&self) -> String;
}

/// A named component such as a format bridge or an assay kind.
pub trait Annotated {
    /// Short lowercase identifier (`"market"`, `"rna"`).
    fn name(&self) -> &str;

    /// Longer human-readable description, if any.
    fn description(&self) -> Option<&str> {
        None
    }
}
