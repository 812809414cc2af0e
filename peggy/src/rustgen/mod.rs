//! # Rust source generation
//!
//! This module turns the bytecode produced by the [generation pass](`crate::passes::generate_bytecode`) into the
//! source code of a standalone parser, which only depends on `serde_json`.
//!
//! The generated source exposes:
//!
//! * `parse(input)` to parse from the default start rule
//! * `parse_from(input, start_rule)` to parse from any allowed start rule
//! * `parse_traced(input)` when tracing is enabled, returning the list of rules entered and left
//! * `SyntaxError` describing the furthest failure
//!
//! Depending on the [optimization target](`crate::compiler::Optimize`), each rule is either lowered to a dedicated
//! method (speed), or embedded as encoded bytecode run by a single interpreter (size).
//!
//! Code blocks are inserted as-is in functions taking the visible labels as [`serde_json::Value`] arguments.
//! Actions may return anything convertible to a value, and predicates a `bool`.

mod constants;
mod prelude;
mod size;
mod speed;
mod utils;

pub use utils::{make_safe_ident, RUST_RESERVED_KEYWORDS};

use crate::compiler::{CompileError, CompileOptions, Format, Optimize, OutputKind, Session};
use constants::{gen_classes, gen_functions, gen_tables};
use prelude::{gen_prelude, PreludeConfig};
use proc_macro2::TokenStream;
use quote::quote;
use speed::SpeedGenerator;
use tracing::debug;
use utils::parse_code;

/// Generate the Rust source of the parser (only when the output is source code)
pub fn generate_rust(session: &mut Session) -> Result<(), CompileError> {
    if session.options().output != OutputKind::Source {
        return Ok(());
    }

    let source = {
        let tokens = gen_tokens(session)?;
        render(session.options(), &tokens)
    };

    debug!(bytes = source.len(), "generated Rust source");

    session.set_source(source);
    Ok(())
}

/// Generate the parser's items, wrapped in a module for the module format
pub fn gen_tokens(session: &Session) -> Result<TokenStream, CompileError> {
    let grammar = session.grammar();
    let options = session.options();
    let tables = session.tables();
    let bytecode = session.bytecode()?;

    let rule_names = grammar
        .rules
        .iter()
        .map(|rule| rule.name.as_str())
        .collect::<Vec<_>>();

    let start_rules = options
        .allowed_start_rules
        .iter()
        .filter_map(|name| {
            rule_names
                .iter()
                .position(|rule| *rule == name.as_str())
                .map(|i| (name.as_str(), i))
        })
        .collect::<Vec<_>>();

    let prelude = gen_prelude(&PreludeConfig {
        start_rules,
        cache: options.cache,
        trace: options.trace,
    });

    let rules = match options.optimize {
        Optimize::Speed => SpeedGenerator {
            tables,
            direct_calls: !options.cache && !options.trace,
        }
        .gen_rules(bytecode, &rule_names),

        Optimize::Size => size::gen_interpreter(tables, bytecode),
    };

    let tables_items = gen_tables(tables, &rule_names);
    let classes = gen_classes(tables);
    let functions = gen_functions(tables)?;

    let initializer = match &grammar.initializer {
        Some(block) => parse_code(&block.code, block.location)?,
        None => quote! {},
    };

    let items = quote! {
        #initializer
        #prelude
        #tables_items
        #classes
        #functions
        #rules
    };

    match options.format {
        Format::Bare => Ok(items),
        Format::Module => {
            let name = make_safe_ident(options.module_name());

            let imports = options
                .dependencies
                .iter()
                .map(|(name, path)| {
                    let name = make_safe_ident(name);
                    let path = path.parse::<TokenStream>().map_err(|err| {
                        CompileError::InvalidOptions(format!("invalid dependency path '{}': {}", path, err))
                    })?;

                    Ok(quote! {
                        #[allow(unused_imports)]
                        use #path as #name;
                    })
                })
                .collect::<Result<Vec<_>, CompileError>>()?;

            Ok(quote! {
                pub mod #name {
                    #(#imports)*
                    #items
                }
            })
        }
    }
}

/// Render the generated tokens with the header
fn render(options: &CompileOptions, tokens: &TokenStream) -> String {
    let header = match &options.header {
        Some(header) => header.lines().join("\n"),
        None => format!("// Generated by peggy_core {}.", env!("CARGO_PKG_VERSION")),
    };

    format!("{}\n\n{}\n", header, tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{compile, CompileOutput, Header, Passes};
    use crate::grammar::{ClassPart, CodeBlock, Expression, Grammar, Rule};

    fn grammar() -> Grammar {
        Grammar::new(vec![
            Rule::new(
                "start",
                Expression::action(
                    Expression::sequence(vec![
                        Expression::labeled("digits", Expression::one_or_more(Expression::rule_ref("digit"))),
                        Expression::literal("!"),
                    ]),
                    "digits",
                ),
            ),
            Rule::new(
                "digit",
                Expression::named("digit", Expression::class(vec![ClassPart::Range('0', '9')], false)),
            ),
        ])
    }

    fn source(grammar: Grammar, options: CompileOptions) -> Result<String, CompileError> {
        let options = CompileOptions {
            output: OutputKind::Source,
            ..options
        };

        compile(grammar, &Passes::default(), options).map(|output| match output {
            CompileOutput::Source(source) => source,
            CompileOutput::Parser(_) => panic!("expected generated source"),
        })
    }

    #[test]
    fn nothing_is_generated_for_parsers() {
        let output = compile(grammar(), &Passes::default(), CompileOptions::new()).unwrap();
        assert!(matches!(output, CompileOutput::Parser(_)));
    }

    #[test]
    fn default_header_and_api() {
        let out = source(grammar(), CompileOptions::new()).unwrap();

        assert!(out.starts_with(&format!("// Generated by peggy_core {}.\n\n", env!("CARGO_PKG_VERSION"))));
        assert!(out.contains("pub fn parse (input : & str)"));
        assert!(out.contains("pub fn parse_from"));
        assert!(out.contains("fn peg_rule_0 (& mut self)"));
        assert!(!out.contains("PEG_BYTECODE"));
        assert!(!out.contains("pub mod"));
    }

    #[test]
    fn module_format_with_dependencies() {
        let mut options = CompileOptions {
            format: Format::Module,
            export_var: Some("digits".to_string()),
            header: Some(Header::Lines(vec!["// first".to_string(), "// second".to_string()])),
            optimize: Optimize::Size,
            ..CompileOptions::new()
        };
        options
            .dependencies
            .insert("helpers".to_string(), "crate::helpers".to_string());

        let out = source(grammar(), options).unwrap();

        assert!(out.starts_with("// first\n// second\n\n"));
        assert!(out.contains("pub mod digits {"));
        assert!(out.contains("use crate :: helpers as helpers ;"));
        assert!(out.contains("static PEG_BYTECODE"));
    }

    #[test]
    fn initializer_is_inserted() {
        let mut grammar = grammar();
        grammar.initializer = Some(CodeBlock {
            code: "const LIMIT: usize = 10;".to_string(),
            location: Default::default(),
        });

        let out = source(grammar, CompileOptions::new()).unwrap();
        assert!(out.contains("const LIMIT : usize = 10 ;"));
    }

    #[test]
    fn invalid_code_blocks_are_rejected() {
        for code in ["\"unterminated", "(]", "{ vec![1, 2 }"] {
            let grammar = Grammar::new(vec![Rule::new(
                "start",
                Expression::action(Expression::literal("a"), code),
            )]);

            match source(grammar, CompileOptions::new()) {
                Err(CompileError::InvalidCode { code: invalid, .. }) => assert_eq!(invalid, code),
                other => panic!("code block {:?} was accepted: {:?}", code, other),
            }
        }
    }

    #[test]
    fn cache_and_trace_wrap_rule_calls() {
        let out = source(
            grammar(),
            CompileOptions {
                cache: true,
                trace: true,
                ..CompileOptions::new()
            },
        )
        .unwrap();

        assert!(out.contains("self . peg_rule (1)"));
        assert!(out.contains("pub fn parse_traced"));
        assert!(out.contains("peg_cache"));
    }
}
