//! # Peggy core
//!
//! Compiler pipeline for Parsing Expression Grammars (PEG).
//!
//! It takes a [grammar syntax tree](`grammar::Grammar`), built in Rust or deserialized from its JSON form, and runs it
//! through an ordered list of [passes](`passes`) which check it, simplify it, and lower it to [bytecode](`bytecode`).
//! The result is either a [ready-to-use parser](`runtime::Parser`) running that bytecode, or Rust source code
//! for a standalone parser.
//!
//! ## Usage
//!
//! ```rust
//! use peggy_core::compiler::{compile, CompileOptions, Passes};
//! use peggy_core::grammar::{ClassPart, Expression, Grammar, Rule};
//! use serde_json::json;
//!
//! // 1. Build the grammar
//! let grammar = Grammar::new(vec![Rule::new(
//!     "list",
//!     Expression::sequence(vec![
//!         Expression::literal("["),
//!         Expression::pluck(None, Expression::zero_or_more(Expression::rule_ref("digit"))),
//!         Expression::literal("]"),
//!     ]),
//! ), Rule::new(
//!     "digit",
//!     Expression::named("digit", Expression::class(vec![ClassPart::Range('0', '9')], false)),
//! )]);
//!
//! // 2. Compile it
//! let parser = compile(grammar, &Passes::default(), CompileOptions::new())
//!     .unwrap_or_else(|err| panic!("{}", err))
//!     .into_parser()
//!     .unwrap();
//!
//! // 3. Parse!
//! assert_eq!(parser.parse("[12]").unwrap(), json!(["1", "2"]));
//!
//! let err = parser.parse("[1x]").unwrap_err();
//! assert_eq!(err.to_string(), "Expected \"]\" or digit but \"x\" found.");
//! ```

#![forbid(unsafe_code)]
#![forbid(unused_must_use)]

pub mod bytecode;
pub mod compiler;
pub mod grammar;
pub mod passes;
pub mod runtime;

#[cfg(feature = "rustgen")]
pub mod rustgen;
