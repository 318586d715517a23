//! Logical element types for count matrices.
//!
//! Values are stored as `f64` regardless of [`DType`]; the dtype decides how
//! values are rounded on cast and which type an operation produces.

use std::fmt;
use std::str::FromStr;

use cellforest_core::CellforestError;

/// Logical element type of a sparse matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DType {
    Bool,
    Int32,
    Int64,
    Float32,
    Float64,
}

impl DType {
    /// Whether this is a floating-point type.
    pub fn is_float(self) -> bool {
        matches!(self, DType::Float32 | DType::Float64)
    }

    /// The type produced by a floating-point function applied to `self`.
    ///
    /// `Float32` is kept; integers and booleans widen to `Float64`.
    pub fn float_promoted(self) -> DType {
        match self {
            DType::Float32 => DType::Float32,
            _ => DType::Float64,
        }
    }

    /// The common type of a binary operation between `self` and `other`.
    pub fn promote(self, other: DType) -> DType {
        match (self, other) {
            (a, b) if a == b => a,
            (DType::Float64, _) | (_, DType::Float64) => DType::Float64,
            (DType::Float32, DType::Bool) | (DType::Bool, DType::Float32) => DType::Float32,
            (DType::Float32, _) | (_, DType::Float32) => DType::Float64,
            (a, b) => a.max(b),
        }
    }

    /// Round `v` to a value representable in this type.
    ///
    /// Integer casts truncate toward zero and saturate; NaN becomes 0.
    pub fn cast(self, v: f64) -> f64 {
        match self {
            DType::Bool => {
                if v != 0.0 && !v.is_nan() {
                    1.0
                } else {
                    0.0
                }
            }
            DType::Int32 => (v as i32) as f64,
            DType::Int64 => (v as i64) as f64,
            DType::Float32 => (v as f32) as f64,
            DType::Float64 => v,
        }
    }

    /// Lowercase type name (`"int64"`, `"float32"`, ...).
    pub fn name(self) -> &'static str {
        match self {
            DType::Bool => "bool",
            DType::Int32 => "int32",
            DType::Int64 => "int64",
            DType::Float32 => "float32",
            DType::Float64 => "float64",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DType {
    type Err = CellforestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bool" => Ok(DType::Bool),
            "int32" | "i32" => Ok(DType::Int32),
            "int64" | "i64" | "int" | "integer" => Ok(DType::Int64),
            "float32" | "f32" => Ok(DType::Float32),
            "float64" | "f64" | "float" | "real" => Ok(DType::Float64),
            other => Err(CellforestError::InvalidInput(format!(
                "unknown dtype: {other}"
            ))),
        }
    }
}
