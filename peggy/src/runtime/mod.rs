//! # Runtime
//!
//! This module contains the [`Parser`] returned by compilations with `output = parser`, which runs the
//! grammar's bytecode directly.
//!
//! Matched values are [`serde_json::Value`]s: literals and matched characters are strings, sequences and
//! repetitions are arrays, and optional expressions which didn't match are `null`.

mod data;
mod errors;
mod executor;
mod trace;

pub use data::{ActionContext, SourcePosition, SourceSpan};
pub use errors::*;
pub use executor::*;
pub use trace::*;
