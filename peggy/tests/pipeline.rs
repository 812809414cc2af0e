//! End-to-end tests of the compilation pipeline
//!
//! Grammars are built in Rust, compiled with the default passes, and run with the bytecode parser.

use peggy_core::compiler::{
    compile, compile_with_plugins, CompileError, CompileOptions, GrammarError, GrammarErrorContent, Pass, Passes,
    Plugin, Session,
};
use peggy_core::grammar::{ClassPart, Expression, Grammar, Rule};
use peggy_core::runtime::{ParseError, ParseOptions, Parser};
use rstest::*;
use serde_json::{json, Value};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

fn digits() -> Expression {
    Expression::one_or_more(Expression::class(vec![ClassPart::Range('0', '9')], false))
}

/// `sum = head:int tail:("+" @int)* {sum}` and `int = [0-9]+ {int}`
fn sum_grammar() -> Grammar {
    Grammar::new(vec![
        Rule::new(
            "sum",
            Expression::action(
                Expression::sequence(vec![
                    Expression::labeled("head", Expression::rule_ref("int")),
                    Expression::labeled(
                        "tail",
                        Expression::zero_or_more(Expression::group(Expression::sequence(vec![
                            Expression::literal("+"),
                            Expression::pluck(None, Expression::rule_ref("int")),
                        ]))),
                    ),
                ]),
                "sum",
            ),
        ),
        Rule::new("int", Expression::named("integer", Expression::action(digits(), "int"))),
    ])
}

fn sum_parser() -> Parser {
    compile(sum_grammar(), &Passes::default(), CompileOptions::new())
        .unwrap()
        .into_parser()
        .unwrap()
        .on_action("int", |ctx| json!(ctx.text().parse::<i64>().unwrap()))
        .on_action("sum", |ctx| {
            let head = ctx.label("head").and_then(Value::as_i64).unwrap_or(0);

            let tail = ctx
                .label("tail")
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(Value::as_i64).sum::<i64>())
                .unwrap_or(0);

            json!(head + tail)
        })
}

fn compile_err(rules: Vec<Rule>) -> Vec<GrammarError> {
    compile(Grammar::new(rules), &Passes::default(), CompileOptions::new())
        .unwrap_err()
        .grammar_errors()
        .to_vec()
}

#[rstest]
#[case("1", 1)]
#[case("1+2", 3)]
#[case("10+20+300", 330)]
fn actions_compute_values(#[case] input: &str, #[case] expected: i64) {
    assert_eq!(sum_parser().parse(input).unwrap(), json!(expected));
}

#[rstest]
#[case("", "Expected integer but end of input found.")]
#[case("1+", "Expected integer but end of input found.")]
#[case("1+x", "Expected integer but \"x\" found.")]
#[case("1-2", "Expected \"+\" or end of input but \"-\" found.")]
fn syntax_errors_describe_the_furthest_failure(#[case] input: &str, #[case] message: &str) {
    let err = sum_parser().parse(input).unwrap_err();
    assert_eq!(err.to_string(), message);
}

#[test]
fn unbound_actions_return_the_matched_text() {
    let parser = compile(sum_grammar(), &Passes::default(), CompileOptions::new())
        .unwrap()
        .into_parser()
        .unwrap();

    assert_eq!(parser.parse("12+3").unwrap(), json!("12+3"));
}

#[test]
fn start_rules_must_be_allowed() {
    let options = CompileOptions {
        allowed_start_rules: vec!["sum".to_string(), "int".to_string()],
        ..CompileOptions::new()
    };

    let parser = compile(sum_grammar(), &Passes::default(), options)
        .unwrap()
        .into_parser()
        .unwrap();

    assert_eq!(
        parser.parse_with("42", ParseOptions::new().start_rule("int")).unwrap(),
        json!("42")
    );

    let err = sum_parser()
        .parse_with("42", ParseOptions::new().start_rule("int"))
        .unwrap_err();
    assert_eq!(err, ParseError::UnknownStartRule("int".to_string()));
}

#[rstest]
#[case::undefined_rule(
    vec![Rule::new("start", Expression::rule_ref("missing"))],
    "rule 'missing' is not defined"
)]
#[case::duplicate_rule(
    vec![Rule::new("start", Expression::any()), Rule::new("start", Expression::any())],
    "rule 'start' is already defined"
)]
#[case::duplicate_label(
    vec![Rule::new("start", Expression::sequence(vec![
        Expression::labeled("a", Expression::any()),
        Expression::labeled("a", Expression::any()),
    ]))],
    "label 'a' is already defined"
)]
#[case::left_recursion(
    vec![Rule::new("start", Expression::sequence(vec![Expression::rule_ref("start"), Expression::literal("a")]))],
    "possible infinite loop when parsing (left recursion: start -> start)"
)]
#[case::infinite_repetition(
    vec![Rule::new("start", Expression::zero_or_more(Expression::optional(Expression::literal("a"))))],
    "possible infinite loop when parsing (repetition used with an expression that may not consume any input)"
)]
#[case::pluck_with_action(
    vec![Rule::new("start", Expression::action(
        Expression::sequence(vec![Expression::pluck(None, Expression::any())]),
        "x",
    ))],
    "\"@\" cannot be used with an action block"
)]
fn grammar_errors(#[case] rules: Vec<Rule>, #[case] message: &str) {
    let errors = compile_err(rules);

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message(), message);
}

#[test]
fn proxy_rules_are_removed_before_generation() {
    let grammar = Grammar::new(vec![
        Rule::new("start", Expression::rule_ref("proxy")),
        Rule::new("proxy", Expression::rule_ref("target")),
        Rule::new("target", Expression::literal("t")),
    ]);

    let parser = compile(grammar, &Passes::default(), CompileOptions::new())
        .unwrap()
        .into_parser()
        .unwrap();

    assert_eq!(parser.rules(), ["start", "target"]);
    assert_eq!(parser.parse("t").unwrap(), json!("t"));
}

#[rstest]
#[case::empty_literal(Expression::zero_or_more(Expression::literal("")), "", json!([""]))]
#[case::optional_literal(
    Expression::one_or_more(Expression::optional(Expression::literal("a"))),
    "aa",
    json!(["a", "a"])
)]
fn repetitions_stop_when_no_input_is_consumed(
    #[case] expression: Expression,
    #[case] input: &'static str,
    #[case] expected: Value,
) {
    let (sender, receiver) = mpsc::channel();

    thread::spawn(move || {
        let mut passes = Passes::default();
        assert!(passes.remove("report_infinite_repetition"));

        let parser = compile(
            Grammar::new(vec![Rule::new("start", expression)]),
            &passes,
            CompileOptions::new(),
        )
        .unwrap()
        .into_parser()
        .unwrap();

        let _ = sender.send(parser.parse(input));
    });

    let result = receiver
        .recv_timeout(Duration::from_secs(5))
        .expect("parsing didn't terminate");

    assert_eq!(result.unwrap(), expected);
}

struct RejectLongRules;

impl Plugin for RejectLongRules {
    fn apply(&self, passes: &mut Passes, options: &mut CompileOptions) {
        options.cache = true;

        passes.add(
            "check",
            Pass::new("reject_long_rule_names", |session: &mut Session| -> Result<(), CompileError> {
                let long = session
                    .grammar()
                    .rules
                    .iter()
                    .filter(|rule| rule.name.len() > 5)
                    .map(|rule| rule.name.clone())
                    .collect::<Vec<_>>();

                for name in long {
                    session.error(GrammarError::new(
                        None,
                        GrammarErrorContent::Custom(format!("rule name '{}' is too long", name)),
                    ));
                }

                Ok(())
            }),
        );
    }
}

#[test]
fn plugins_extend_the_pipeline() {
    let errors = compile_with_plugins(
        Grammar::new(vec![Rule::new("too_long", Expression::any())]),
        &[&RejectLongRules],
        CompileOptions::new(),
    )
    .unwrap_err()
    .grammar_errors()
    .to_vec();

    assert_eq!(errors[0].message(), "rule name 'too_long' is too long");

    let output = compile_with_plugins(sum_grammar(), &[&RejectLongRules], CompileOptions::new()).unwrap();
    assert!(output.into_parser().is_some());
}
