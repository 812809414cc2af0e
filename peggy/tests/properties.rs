//! Property-based tests
//!
//! Parsers built from the same grammar must agree whatever the options, and the generated
//! source must only depend on the grammar and the options.

use peggy_core::compiler::{compile, CompileOptions, Optimize, OutputKind, Passes};
use peggy_core::grammar::{ClassPart, Expression, Grammar, Rule};
use peggy_core::runtime::{Parser, TraceEventKind, TraceLog, ParseOptions};
use proptest::prelude::*;
use rstest::*;
use serde_json::{json, Value};

/// `words = (word " "?)*`, `word = $[a-z]+`
fn words_grammar() -> Grammar {
    Grammar::new(vec![
        Rule::new(
            "words",
            Expression::zero_or_more(Expression::group(Expression::sequence(vec![
                Expression::pluck(None, Expression::rule_ref("word")),
                Expression::optional(Expression::literal(" ")),
            ]))),
        ),
        Rule::new(
            "word",
            Expression::text(Expression::one_or_more(Expression::class(
                vec![ClassPart::Range('a', 'z')],
                false,
            ))),
        ),
    ])
}

fn parser(options: CompileOptions) -> Parser {
    compile(words_grammar(), &Passes::default(), options)
        .unwrap()
        .into_parser()
        .unwrap()
}

/// `r0 = r1`, ..., `rN = r0`, with a literal consumed before the reference in rule `consuming`
fn cycle(len: usize, consuming: Option<usize>) -> Grammar {
    Grammar::new(
        (0..len)
            .map(|i| {
                let next = Expression::rule_ref(format!("r{}", (i + 1) % len));

                let expr = if consuming == Some(i) {
                    Expression::sequence(vec![Expression::literal("x"), next])
                } else {
                    next
                };

                Rule::new(format!("r{}", i), expr)
            })
            .collect(),
    )
}

fn grammar_errors(grammar: Grammar) -> Vec<String> {
    match compile(grammar, &Passes::default(), CompileOptions::new()) {
        Ok(_) => vec![],
        Err(err) => err.grammar_errors().iter().map(|err| err.message()).collect(),
    }
}

fn source(options: CompileOptions) -> String {
    let options = CompileOptions {
        output: OutputKind::Source,
        ..options
    };

    compile(words_grammar(), &Passes::default(), options)
        .unwrap()
        .into_source()
        .unwrap()
}

proptest! {
    /// Words separated by single spaces are parsed back
    #[rstest]
    fn prop_words_are_parsed(words in prop::collection::vec("[a-z]{1,8}", 0..8)) {
        let input = words.join(" ");
        let expected = Value::from(words.clone());

        prop_assert_eq!(parser(CompileOptions::new()).parse(&input).unwrap(), expected);
    }

    /// Memoization doesn't change the outcome of a parse
    #[rstest]
    fn prop_cache_is_transparent(input in "[a-z 0-9]{0,24}") {
        let uncached = parser(CompileOptions::new()).parse(&input);

        let cached = parser(CompileOptions {
            cache: true,
            ..CompileOptions::new()
        })
        .parse(&input);

        prop_assert_eq!(uncached, cached);
    }

    /// Errors point inside the input
    #[rstest]
    fn prop_errors_are_located_in_the_input(input in "[a-z]{0,4}[0-9][a-z ]{0,4}") {
        let err = parser(CompileOptions::new()).parse(&input).unwrap_err();
        let syntax = err.syntax().unwrap();

        prop_assert!(syntax.location.start.offset <= input.len());
        prop_assert!(syntax.found.is_some());
    }

    /// Rules entered are always left, and matches never go backwards
    #[rstest]
    fn prop_trace_is_balanced(input in "[a-z ]{0,16}") {
        let mut log = TraceLog::new();
        let _ = parser(CompileOptions::new()).parse_with(&input, ParseOptions::new().tracer(&mut log));

        let entered = log.records.iter().filter(|record| record.kind == TraceEventKind::Enter).count();
        let left = log.records.len() - entered;
        prop_assert_eq!(entered, left);

        for record in &log.records {
            prop_assert!(record.location.start.offset <= record.location.end.offset);
        }
    }

    /// A cycle of references without consumption is left recursion
    #[rstest]
    fn prop_reference_cycles_are_left_recursive(len in 1usize..6) {
        let errors = grammar_errors(cycle(len, None));

        prop_assert!(!errors.is_empty());
        for message in errors {
            prop_assert!(message.starts_with("possible infinite loop when parsing (left recursion: "));
        }
    }

    /// Consuming input anywhere in the cycle breaks it
    #[rstest]
    fn prop_consumption_breaks_cycles(len in 1usize..6, at in 0usize..6) {
        prop_assert_eq!(grammar_errors(cycle(len, Some(at % len))), Vec::<String>::new());
    }

    /// Repeating a literal is only an infinite loop when the literal is empty
    #[rstest]
    fn prop_repeated_literals_must_consume(literal in "[a-z]{0,3}") {
        let grammar = Grammar::new(vec![Rule::new(
            "start",
            Expression::zero_or_more(Expression::literal(literal.as_str())),
        )]);

        prop_assert_eq!(grammar_errors(grammar).is_empty(), !literal.is_empty());
    }
}

#[rstest]
#[case(Optimize::Speed)]
#[case(Optimize::Size)]
fn generated_source_is_deterministic(#[case] optimize: Optimize) {
    let options = CompileOptions {
        optimize,
        ..CompileOptions::new()
    };

    assert_eq!(source(options.clone()), source(options));
}

#[test]
fn optimization_targets_differ() {
    let speed = source(CompileOptions::new());

    let size = source(CompileOptions {
        optimize: Optimize::Size,
        ..CompileOptions::new()
    });

    assert_ne!(speed, size);
    assert!(size.contains("PEG_BYTECODE"));
    assert!(speed.contains("fn peg_rule_1"));
}

#[test]
fn empty_input_matches_zero_words() {
    assert_eq!(parser(CompileOptions::new()).parse("").unwrap(), json!([]));
}
