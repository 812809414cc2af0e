use super::errors::{CompileError, GrammarError};
use super::options::CompileOptions;
use crate::bytecode::{ConstTables, Instruction};
use crate::grammar::Grammar;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Static classification of what an expression does when matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchResult {
    /// Matches on any input
    Always,

    /// Depends on the input
    Sometimes,

    /// Fails on any input
    Never,
}

impl MatchResult {
    /// Result of an expression succeeding when this one fails, and the other way around
    pub fn negate(self) -> Self {
        match self {
            Self::Always => Self::Never,
            Self::Sometimes => Self::Sometimes,
            Self::Never => Self::Always,
        }
    }

    /// Get the statically known outcome, if any (`true` for success)
    pub fn known(self) -> Option<bool> {
        match self {
            Self::Always => Some(true),
            Self::Sometimes => None,
            Self::Never => Some(false),
        }
    }
}

/// Facts inferred for a single rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleFacts {
    pub result: MatchResult,

    /// Does the rule advance the input on every successful match?
    pub always_consumes: bool,
}

/// State of a single compilation
///
/// Owns the grammar being compiled, the normalized options, and every fact produced by the passes.
/// Facts are written by the pass producing them and read by later passes; reading a fact before it has been
/// produced is a [`CompileError::MissingFact`].
#[derive(Debug)]
pub struct Session {
    grammar: Grammar,
    options: CompileOptions,
    errors: Vec<GrammarError>,
    tables: ConstTables,
    report_failures: Option<IndexMap<String, bool>>,
    match_facts: Option<IndexMap<String, RuleFacts>>,
    bytecode: Option<Vec<Vec<Instruction>>>,
    source: Option<String>,
}

impl Session {
    /// Create a session from a grammar and already-normalized options
    pub fn new(grammar: Grammar, options: CompileOptions) -> Self {
        Self {
            grammar,
            options,
            errors: vec![],
            tables: ConstTables::new(),
            report_failures: None,
            match_facts: None,
            bytecode: None,
            source: None,
        }
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Get the grammar for rewriting (transform passes only)
    pub fn grammar_mut(&mut self) -> &mut Grammar {
        &mut self.grammar
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Report an error found in the grammar
    ///
    /// The compilation is aborted once the current pass returns.
    pub fn error(&mut self, err: GrammarError) {
        self.errors.push(err);
    }

    /// Get the errors reported by passes so far
    pub fn errors(&self) -> &[GrammarError] {
        &self.errors
    }

    pub(crate) fn take_errors(&mut self) -> Vec<GrammarError> {
        std::mem::take(&mut self.errors)
    }

    pub fn tables(&self) -> &ConstTables {
        &self.tables
    }

    pub fn tables_mut(&mut self) -> &mut ConstTables {
        &mut self.tables
    }

    pub fn set_report_failures(&mut self, flags: IndexMap<String, bool>) {
        self.report_failures = Some(flags);
    }

    /// Check if a rule reports its failures (unknown rules don't)
    pub fn report_failures(&self, rule: &str) -> Result<bool, CompileError> {
        self.report_failures
            .as_ref()
            .map(|flags| flags.get(rule).copied().unwrap_or(false))
            .ok_or(CompileError::MissingFact {
                fact: "failure reporting flags",
                producer: "calc_report_failures",
            })
    }

    pub fn set_match_facts(&mut self, facts: IndexMap<String, RuleFacts>) {
        self.match_facts = Some(facts);
    }

    /// Get the facts inferred for every rule
    pub fn match_facts(&self) -> Result<&IndexMap<String, RuleFacts>, CompileError> {
        self.match_facts.as_ref().ok_or(CompileError::MissingFact {
            fact: "match results",
            producer: "inference_match_result",
        })
    }

    /// Store the bytecode of every rule, in the grammar's rules order
    pub fn set_bytecode(&mut self, bytecode: Vec<Vec<Instruction>>) {
        self.bytecode = Some(bytecode);
    }

    pub fn bytecode(&self) -> Result<&[Vec<Instruction>], CompileError> {
        self.bytecode
            .as_deref()
            .ok_or(CompileError::MissingFact {
                fact: "bytecode",
                producer: "generate_bytecode",
            })
    }

    pub fn set_source(&mut self, source: String) {
        self.source = Some(source);
    }

    /// Consume the session, returning the generated source
    pub(crate) fn into_source(self) -> Result<String, CompileError> {
        self.source.ok_or(CompileError::MissingFact {
            fact: "generated source",
            producer: "generate_rust",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Expression, Rule};

    #[test]
    fn reading_facts_before_their_pass_fails() {
        let session = Session::new(
            Grammar::new(vec![Rule::new("start", Expression::any())]),
            CompileOptions::default(),
        );

        assert_eq!(
            session.bytecode().unwrap_err(),
            CompileError::MissingFact {
                fact: "bytecode",
                producer: "generate_bytecode"
            }
        );
        assert!(session.report_failures("start").is_err());
        assert!(session.match_facts().is_err());
    }

    #[test]
    fn negation() {
        assert_eq!(MatchResult::Always.negate(), MatchResult::Never);
        assert_eq!(MatchResult::Sometimes.negate(), MatchResult::Sometimes);
        assert_eq!(MatchResult::Never.known(), Some(false));
    }
}
