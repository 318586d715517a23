//! Shared primitives, traits, and utilities for the cellforest workspace.
//!
//! `cellforest-core` provides the foundation the other crates build on:
//!
//! - **Error types**: [`CellforestError`] and [`Result`] for structured error handling
//! - **Traits**: [`Summarizable`] and [`Annotated`]
//! - **Compression**: gzip helpers and extension-aware readers/writers

pub mod compress;
pub mod error;
pub mod traits;

pub use error::{CellforestError, Result};
pub use traits::*;
