//! # Grammar syntax tree
//!
//! This module contains the syntax tree the compiler pipeline works on, as well as the
//! [visitor engine](`visitor`) used by every pass to traverse it.
//!
//! Syntax trees are produced by an external grammar parser (or deserialized from their JSON form).

mod data;
mod utils;
pub mod visitor;

pub use data::*;
pub use utils::*;
pub use visitor::{Visitor, VisitorMut};
