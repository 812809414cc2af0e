//! This file demonstrates how to build a small calculator with Peggy: the grammar is built in Rust,
//! compiled to a bytecode parser, and its actions are bound to closures

use peggy_core::compiler::{compile, CompileOptions, Passes};
use peggy_core::grammar::{ClassPart, Expression, Grammar, Rule};
use peggy_core::runtime::ParseError;
use serde_json::{json, Value};
use std::time::Instant;

static TEST_SUBJECT: &str = "12 + 30 - 2 + 7";

/// sum = head:int tail:(_ @op _ @int)*
/// int = $[0-9]+
/// op  = "+" / "-"
/// _   = " "*
fn grammar() -> Grammar {
    let spaces = || Expression::zero_or_more(Expression::literal(" "));

    Grammar::new(vec![
        Rule::new(
            "sum",
            Expression::action(
                Expression::sequence(vec![
                    Expression::labeled("head", Expression::rule_ref("int")),
                    Expression::labeled(
                        "tail",
                        Expression::zero_or_more(Expression::group(Expression::sequence(vec![
                            spaces(),
                            Expression::pluck(None, Expression::rule_ref("op")),
                            spaces(),
                            Expression::pluck(None, Expression::rule_ref("int")),
                        ]))),
                    ),
                ]),
                "fold(head, tail)",
            ),
        ),
        Rule::new(
            "int",
            Expression::named(
                "integer",
                Expression::text(Expression::one_or_more(Expression::class(
                    vec![ClassPart::Range('0', '9')],
                    false,
                ))),
            ),
        ),
        Rule::new(
            "op",
            Expression::choice(vec![Expression::literal("+"), Expression::literal("-")]),
        ),
    ])
}

fn int(value: &Value) -> i64 {
    value.as_str().and_then(|digits| digits.parse().ok()).unwrap_or(0)
}

fn main() {
    // Measure performances
    let now = Instant::now();

    let parser = compile(grammar(), &Passes::default(), CompileOptions::new())
        .unwrap_or_else(|err| panic!("Failed to compile the calculator's grammar: {}", err))
        .into_parser()
        .expect("Compilation didn't produce a parser")
        .on_action("fold(head, tail)", |ctx| {
            let mut total = ctx.label("head").map_or(0, int);

            for pair in ctx.label("tail").and_then(Value::as_array).into_iter().flatten() {
                match pair.as_array().map(Vec::as_slice) {
                    Some([op, value]) if op == "-" => total -= int(value),
                    Some([_, value]) => total += int(value),
                    _ => {}
                }
            }

            json!(total)
        });

    println!("Grammar compiled in: {} us", now.elapsed().as_micros());

    println!("Bytecode of the 'sum' rule:\n{}", parser.disassemble("sum").unwrap_or_default());

    let now = Instant::now();

    match parser.parse(TEST_SUBJECT) {
        Ok(result) => println!("{} = {} (in {} us)", TEST_SUBJECT, result, now.elapsed().as_micros()),
        Err(ParseError::Syntax(err)) => eprintln!("{}", err.format(TEST_SUBJECT)),
        Err(err) => eprintln!("{}", err),
    }
}
