use peggy_core::compiler::{compile, CompileOptions, Passes};
use peggy_core::grammar::{Expression, Grammar, Rule};
use peggy_core::runtime::Parser;

fn parser(rules: Vec<Rule>) -> Parser {
    compile(Grammar::new(rules), &Passes::default(), CompileOptions::new())
        .unwrap()
        .into_parser()
        .unwrap()
}

#[test]
fn choice_tries_alternatives_in_order() {
    let parser = parser(vec![Rule::new(
        "start",
        Expression::choice(vec![Expression::literal("a"), Expression::literal("b")]),
    )]);

    insta::assert_snapshot!(parser.disassemble("start").unwrap(), @r###"
    MATCH_STRING #0
      ACCEPT_STRING #0
    ELSE
      FAIL #0
    IF_ERROR
      POP
      MATCH_STRING #1
        ACCEPT_STRING #1
      ELSE
        FAIL #1
    "###);
}

#[test]
fn optional_replaces_failures_by_null() {
    let parser = parser(vec![Rule::new("start", Expression::optional(Expression::literal("a")))]);

    insta::assert_snapshot!(parser.disassemble("start").unwrap(), @r###"
    MATCH_STRING #0
      ACCEPT_STRING #0
    ELSE
      FAIL #0
    IF_ERROR
      POP
      PUSH_NULL
    "###);
}

#[test]
fn named_rules_silence_their_internals() {
    let parser = parser(vec![Rule::new(
        "start",
        Expression::named("letter a", Expression::literal("a")),
    )]);

    insta::assert_snapshot!(parser.disassemble("start").unwrap(), @r###"
    SILENT_FAILS_ON
    MATCH_STRING #0
      ACCEPT_STRING #0
    ELSE
      FAIL #1
    SILENT_FAILS_OFF
    IF_ERROR
      POP
      FAIL #0
    "###);
}
