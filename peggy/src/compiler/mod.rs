//! # Compiler pipeline
//!
//! This module contains the pipeline turning a [grammar syntax tree](`crate::grammar::Grammar`) into a parser.
//!
//! A compilation runs an ordered list of [stages](`Passes`), each made of [passes](`Pass`) working on a shared
//! [`Session`]. Check passes report errors, transform passes rewrite the grammar, and generate passes compute
//! the facts leading to the final artifact: either a ready-to-use [`Parser`] or Rust source code.
//!
//! ## Usage
//!
//! ```rust
//! use peggy_core::compiler::{compile, CompileOptions, CompileOutput, Passes};
//! use peggy_core::grammar::{Expression, Grammar, Rule};
//!
//! let grammar = Grammar::new(vec![Rule::new(
//!     "start",
//!     Expression::one_or_more(Expression::literal("a")),
//! )]);
//!
//! let parser = match compile(grammar, &Passes::default(), CompileOptions::new()).unwrap() {
//!     CompileOutput::Parser(parser) => parser,
//!     CompileOutput::Source(_) => unreachable!(),
//! };
//!
//! assert!(parser.parse("aaa").is_ok());
//! assert!(parser.parse("b").is_err());
//! ```

mod errors;
mod options;
mod report;
mod session;

pub use errors::*;
pub use options::*;
pub use report::*;
pub use session::*;

use crate::passes;
use crate::runtime::Parser;
use crate::grammar::Grammar;
use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace};

/// Function implementing a pass
pub type PassFn = dyn Fn(&mut Session) -> Result<(), CompileError>;

/// A named pass of the pipeline
#[derive(Clone)]
pub struct Pass {
    name: String,
    run: Rc<PassFn>,
}

impl Pass {
    /// Create a new pass
    pub fn new(
        name: impl Into<String>,
        run: impl Fn(&mut Session) -> Result<(), CompileError> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            run: Rc::new(run),
        }
    }

    /// Get the pass' name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the pass on a session
    pub fn run(&self, session: &mut Session) -> Result<(), CompileError> {
        (self.run)(session)
    }
}

impl fmt::Debug for Pass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Pass").field("name", &self.name).finish()
    }
}

/// Ordered stages of the pipeline, each one being an ordered list of passes
#[derive(Debug, Clone)]
pub struct Passes {
    stages: IndexMap<String, Vec<Pass>>,
}

impl Passes {
    /// Create a pipeline without any stage
    pub fn empty() -> Self {
        Self {
            stages: IndexMap::new(),
        }
    }

    /// Get the passes of a stage, creating it at the end of the pipeline if it doesn't exist yet
    pub fn stage_mut(&mut self, stage: &str) -> &mut Vec<Pass> {
        self.stages.entry(stage.to_string()).or_default()
    }

    /// Get the passes of a stage
    pub fn stage(&self, stage: &str) -> Option<&[Pass]> {
        self.stages.get(stage).map(Vec::as_slice)
    }

    /// Add a pass at the end of a stage
    pub fn add(&mut self, stage: &str, pass: Pass) -> &mut Self {
        self.stage_mut(stage).push(pass);
        self
    }

    /// Remove every pass with the provided name, returning `true` if one was found
    pub fn remove(&mut self, name: &str) -> bool {
        let mut found = false;

        for passes in self.stages.values_mut() {
            let before = passes.len();
            passes.retain(|pass| pass.name != name);
            found |= passes.len() != before;
        }

        found
    }

    /// Iterate over the stages, in order
    pub fn stages(&self) -> impl Iterator<Item = (&str, &[Pass])> {
        self.stages
            .iter()
            .map(|(stage, passes)| (stage.as_str(), passes.as_slice()))
    }

    /// Get the names of every pass, in running order
    pub fn pass_names(&self) -> Vec<&str> {
        self.stages
            .values()
            .flat_map(|passes| passes.iter().map(Pass::name))
            .collect()
    }
}

impl Default for Passes {
    fn default() -> Self {
        let mut pipeline = Self::empty();

        pipeline
            .add("check", Pass::new("report_undefined_rules", passes::report_undefined_rules))
            .add("check", Pass::new("report_duplicate_rules", passes::report_duplicate_rules))
            .add("check", Pass::new("report_duplicate_labels", passes::report_duplicate_labels))
            .add("check", Pass::new("report_infinite_recursion", passes::report_infinite_recursion))
            .add("check", Pass::new("report_infinite_repetition", passes::report_infinite_repetition))
            .add("check", Pass::new("report_incorrect_plucking", passes::report_incorrect_plucking))
            .add("transform", Pass::new("remove_proxy_rules", passes::remove_proxy_rules))
            .add("generate", Pass::new("calc_report_failures", passes::calc_report_failures))
            .add("generate", Pass::new("inference_match_result", passes::inference_match_result))
            .add("generate", Pass::new("generate_bytecode", passes::generate_bytecode));

        #[cfg(feature = "rustgen")]
        pipeline.add("generate", Pass::new("generate_rust", crate::rustgen::generate_rust));

        pipeline
    }
}

/// Extension of the pipeline, applied before compiling
pub trait Plugin {
    /// Register passes and adjust options
    fn apply(&self, passes: &mut Passes, options: &mut CompileOptions);
}

/// Artifact produced by a compilation
#[derive(Debug)]
pub enum CompileOutput {
    Parser(Parser),
    Source(String),
}

impl CompileOutput {
    pub fn into_parser(self) -> Option<Parser> {
        match self {
            Self::Parser(parser) => Some(parser),
            Self::Source(_) => None,
        }
    }

    pub fn into_source(self) -> Option<String> {
        match self {
            Self::Parser(_) => None,
            Self::Source(source) => Some(source),
        }
    }
}

/// Compile a grammar
///
/// Options are normalized against the grammar, then every pass runs in order.
/// The compilation is aborted after the first pass reporting errors in the grammar.
pub fn compile(
    grammar: Grammar,
    passes: &Passes,
    options: CompileOptions,
) -> Result<CompileOutput, CompileError> {
    let options = options.normalize(&grammar)?;
    let mut session = Session::new(grammar, options);

    for (stage, stage_passes) in passes.stages() {
        debug!(stage, passes = stage_passes.len(), "running stage");

        for pass in stage_passes {
            debug!(stage, pass = pass.name(), "running pass");

            pass.run(&mut session)?;

            if !session.errors().is_empty() {
                let errors = session.take_errors();
                debug!(pass = pass.name(), errors = errors.len(), "pass reported errors");
                return Err(CompileError::Grammar(errors));
            }
        }
    }

    trace!(
        rules = session.grammar().rules.len(),
        literals = session.tables().literals().count(),
        expectations = session.tables().expectations().count(),
        functions = session.tables().functions().count(),
        "compilation succeeded"
    );

    match session.options().output {
        OutputKind::Parser => Ok(CompileOutput::Parser(Parser::from_session(&session)?)),
        OutputKind::Source => Ok(CompileOutput::Source(session.into_source()?)),
    }
}

/// Apply plugins to the default pipeline, then compile a grammar
pub fn compile_with_plugins(
    grammar: Grammar,
    plugins: &[&dyn Plugin],
    mut options: CompileOptions,
) -> Result<CompileOutput, CompileError> {
    let mut passes = Passes::default();

    for plugin in plugins {
        plugin.apply(&mut passes, &mut options);
    }

    compile(grammar, &passes, options)
}
