//! # Compiler passes
//!
//! Every pass takes the compile [`Session`](crate::compiler::Session), reads the grammar and the facts
//! produced by earlier passes, and either reports grammar errors, rewrites the grammar, or stores new facts.
//!
//! Passes are grouped in stages by the [`Passes`](crate::compiler::Passes) pipeline:
//!
//! * `check`: [`report_undefined_rules`], [`report_duplicate_rules`], [`report_duplicate_labels`],
//!   [`report_infinite_recursion`], [`report_infinite_repetition`], [`report_incorrect_plucking`]
//! * `transform`: [`remove_proxy_rules`]
//! * `generate`: [`calc_report_failures`], [`inference_match_result`], [`generate_bytecode`]
//!   and the Rust source generator

mod duplicate_labels;
mod duplicate_rules;
mod gen_bytecode;
mod incorrect_plucking;
mod infinite_recursion;
mod infinite_repetition;
mod match_result;
mod remove_proxy_rules;
mod report_failures;
mod undefined_rules;

pub use duplicate_labels::report_duplicate_labels;
pub use duplicate_rules::report_duplicate_rules;
pub use gen_bytecode::generate_bytecode;
pub use incorrect_plucking::report_incorrect_plucking;
pub use infinite_recursion::report_infinite_recursion;
pub use infinite_repetition::report_infinite_repetition;
pub use match_result::{infer_expression, inference_match_result};
pub use remove_proxy_rules::remove_proxy_rules;
pub use report_failures::calc_report_failures;
pub use undefined_rules::report_undefined_rules;

#[cfg(test)]
pub(crate) mod tests {
    use crate::compiler::{CompileOptions, Session};
    use crate::grammar::{Grammar, Rule};

    /// Create a session with the default options (the first rule being the start rule)
    pub fn session_for(rules: Vec<Rule>) -> Session {
        let grammar = Grammar::new(rules);
        let options = CompileOptions::default()
            .normalize(&grammar)
            .unwrap_or_default();

        Session::new(grammar, options)
    }
}
