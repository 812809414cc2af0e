//! Read a grammar syntax tree serialized as JSON from STDIN, and print the Rust source of its parser
//!
//! Compilation options may be provided as a JSON object in the first argument, e.g.:
//! `cargo run --example rust_generator_stdin -- '{"optimize": "size"}' < grammar.json`

use peggy_core::compiler::{compile, CompileOptions, OutputKind, Passes};
use peggy_core::grammar::Grammar;
use std::io::{self, Read};
use std::process;

fn main() {
    let mut input = String::new();

    if let Err(err) = io::stdin().read_to_string(&mut input) {
        eprintln!("Failed to read STDIN: {}", err);
        process::exit(1);
    }

    let grammar: Grammar = serde_json::from_str(&input).unwrap_or_else(|err| {
        eprintln!("Invalid grammar: {}", err);
        process::exit(1);
    });

    let options: CompileOptions = match std::env::args().nth(1) {
        Some(options) => serde_json::from_str(&options).unwrap_or_else(|err| {
            eprintln!("Invalid options: {}", err);
            process::exit(1);
        }),
        None => CompileOptions::new(),
    };

    let options = CompileOptions {
        output: OutputKind::Source,
        ..options
    };

    match compile(grammar, &Passes::default(), options) {
        Ok(output) => println!("{}", output.into_source().unwrap_or_default()),
        Err(err) => {
            for grammar_err in err.grammar_errors() {
                eprintln!("{}", grammar_err);
            }

            eprintln!("Failed to compile the grammar: {}", err);
            process::exit(1);
        }
    }
}
