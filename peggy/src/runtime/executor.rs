use super::data::{is_truthy, match_ignore_case, ActionContext, Slot, SourceSpan};
use super::errors::{ParseError, SyntaxError};
use super::trace::{DefaultTracer, TraceEvent, TraceEventKind, Tracer};
use crate::bytecode::{disassemble, Cond, ConstTables, Expectation, Instruction};
use crate::compiler::{CompileError, Session};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

type ActionHandler = dyn Fn(&ActionContext<'_>) -> Value;
type PredicateHandler = dyn Fn(&ActionContext<'_>) -> bool;

/// Parser running the bytecode of a compiled grammar
///
/// Code blocks of the grammar can't be run by the interpreter: handlers are bound to them by their code instead.
/// An action without handler returns the text it matched, while reaching a semantic predicate without handler
/// is an error.
///
/// A parser is never modified by parsing, and can be used for any number of inputs.
#[derive(Clone)]
pub struct Parser {
    rules: Vec<String>,
    start_rules: Vec<String>,
    tables: ConstTables,
    bytecode: Vec<Vec<Instruction>>,
    cache: bool,
    trace: bool,
    actions: HashMap<String, Rc<ActionHandler>>,
    predicates: HashMap<String, Rc<PredicateHandler>>,
}

impl Parser {
    /// Build a parser from the bytecode of a session
    pub fn from_session(session: &Session) -> Result<Self, CompileError> {
        let options = session.options();

        Ok(Self {
            rules: session
                .grammar()
                .rules
                .iter()
                .map(|rule| rule.name.clone())
                .collect(),
            start_rules: options.allowed_start_rules.clone(),
            tables: session.tables().clone(),
            bytecode: session.bytecode()?.to_vec(),
            cache: options.cache,
            trace: options.trace,
            actions: HashMap::new(),
            predicates: HashMap::new(),
        })
    }

    /// Bind a handler to the actions with the provided code (compared without surrounding whitespace)
    pub fn on_action(
        mut self,
        code: &str,
        handler: impl Fn(&ActionContext<'_>) -> Value + 'static,
    ) -> Self {
        self.actions.insert(code.trim().to_string(), Rc::new(handler));
        self
    }

    /// Bind a handler to the semantic predicates with the provided code (compared without surrounding whitespace)
    pub fn on_predicate(
        mut self,
        code: &str,
        handler: impl Fn(&ActionContext<'_>) -> bool + 'static,
    ) -> Self {
        self.predicates
            .insert(code.trim().to_string(), Rc::new(handler));
        self
    }

    /// Get the name of every rule, in bytecode order
    pub fn rules(&self) -> &[String] {
        &self.rules
    }

    pub fn start_rules(&self) -> &[String] {
        &self.start_rules
    }

    pub fn tables(&self) -> &ConstTables {
        &self.tables
    }

    /// Get the bytecode of a rule
    pub fn bytecode(&self, rule: &str) -> Option<&[Instruction]> {
        let index = self.rules.iter().position(|name| name == rule)?;
        self.bytecode.get(index).map(Vec::as_slice)
    }

    /// Get the bytecode of a rule as text
    pub fn disassemble(&self, rule: &str) -> Option<String> {
        self.bytecode(rule).map(disassemble)
    }

    /// Parse an input from the default start rule
    pub fn parse(&self, input: &str) -> Result<Value, ParseError> {
        self.parse_with(input, ParseOptions::default())
    }

    /// Parse an input
    pub fn parse_with(&self, input: &str, options: ParseOptions<'_>) -> Result<Value, ParseError> {
        let start_rule = match options.start_rule {
            Some(rule) => rule,
            None => self.start_rules.first().map(String::as_str).unwrap_or(""),
        };

        let index = self
            .start_rules
            .iter()
            .any(|rule| rule == start_rule)
            .then(|| self.rules.iter().position(|rule| rule == start_rule))
            .flatten()
            .ok_or_else(|| ParseError::UnknownStartRule(start_rule.to_string()))?;

        match options.tracer {
            Some(tracer) => Execution::new(self, input, Some(tracer)).start(index),
            None if self.trace => Execution::new(self, input, Some(&mut DefaultTracer)).start(index),
            None => Execution::new(self, input, None).start(index),
        }
    }
}

impl fmt::Debug for Parser {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Parser")
            .field("rules", &self.rules)
            .field("start_rules", &self.start_rules)
            .field("cache", &self.cache)
            .field("trace", &self.trace)
            .field("actions", &self.actions.len())
            .field("predicates", &self.predicates.len())
            .finish()
    }
}

/// Options of a single parse
#[derive(Default)]
pub struct ParseOptions<'t> {
    /// Rule to start from (defaults to the first allowed start rule)
    pub start_rule: Option<&'t str>,

    /// Receiver of tracing events (defaults to [`DefaultTracer`] if the grammar was compiled with `trace`)
    pub tracer: Option<&'t mut dyn Tracer>,
}

impl<'t> ParseOptions<'t> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_rule(mut self, rule: &'t str) -> Self {
        self.start_rule = Some(rule);
        self
    }

    pub fn tracer(mut self, tracer: &'t mut dyn Tracer) -> Self {
        self.tracer = Some(tracer);
        self
    }
}

/// Something a failed match expected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    Expected(usize),
    End,
}

/// State of a single parse
struct Execution<'p, 'i, 't> {
    parser: &'p Parser,
    input: &'i str,
    pos: usize,
    saved_pos: usize,
    silent_fails: usize,
    max_fail_pos: usize,
    max_fail_expected: Vec<Failure>,
    cache: HashMap<(usize, usize), (usize, Slot)>,
    tracer: Option<&'t mut dyn Tracer>,
}

impl<'p, 'i, 't> Execution<'p, 'i, 't> {
    fn new(parser: &'p Parser, input: &'i str, tracer: Option<&'t mut dyn Tracer>) -> Self {
        Self {
            parser,
            input,
            pos: 0,
            saved_pos: 0,
            silent_fails: 0,
            max_fail_pos: 0,
            max_fail_expected: vec![],
            cache: HashMap::new(),
            tracer,
        }
    }

    /// Match the whole input against a rule
    fn start(mut self, rule: usize) -> Result<Value, ParseError> {
        match self.rule(rule)? {
            Slot::Failed => {}
            result if self.pos == self.input.len() => return into_value(result),
            _ => self.fail(Failure::End),
        }

        let expected = self
            .max_fail_expected
            .iter()
            .filter_map(|failure| match failure {
                Failure::Expected(index) => self.parser.tables.expectation(*index).cloned(),
                Failure::End => Some(Expectation::End),
            })
            .collect();

        Err(SyntaxError::new(self.input, self.max_fail_pos, expected).into())
    }

    /// Record a failure at the current position
    ///
    /// Only failures at the furthest position reached so far are kept.
    fn fail(&mut self, failure: Failure) {
        if self.pos < self.max_fail_pos {
            return;
        }

        if self.pos > self.max_fail_pos {
            self.max_fail_pos = self.pos;
            self.max_fail_expected.clear();
        }

        self.max_fail_expected.push(failure);
    }

    fn trace(&mut self, kind: TraceEventKind, rule: usize, start: usize, end: usize) {
        let parser = self.parser;

        if let Some(tracer) = self.tracer.as_mut() {
            tracer.trace(TraceEvent {
                kind,
                rule: parser.rules.get(rule).map(String::as_str).unwrap_or(""),
                location: SourceSpan::new(self.input, start..end),
            });
        }
    }

    fn rule(&mut self, index: usize) -> Result<Slot, ParseError> {
        let parser = self.parser;

        let code = parser
            .bytecode
            .get(index)
            .ok_or_else(|| invalid(format!("unknown rule #{}", index)))?;

        let start = self.pos;
        self.trace(TraceEventKind::Enter, index, start, start);

        let cached = if parser.cache {
            self.cache.get(&(index, start)).cloned()
        } else {
            None
        };

        let result = match cached {
            Some((end, result)) => {
                self.pos = end;
                result
            }
            None => {
                let mut stack = vec![];
                self.run(code, &mut stack)?;

                let result = pop(&mut stack)?;

                if parser.cache {
                    self.cache.insert((index, start), (self.pos, result.clone()));
                }

                result
            }
        };

        if result.is_failed() {
            self.trace(TraceEventKind::Fail, index, start, start);
        } else {
            self.trace(TraceEventKind::Match, index, start, self.pos);
        }

        Ok(result)
    }

    fn run(&mut self, code: &'p [Instruction], stack: &mut Vec<Slot>) -> Result<(), ParseError> {
        let mut ip = 0;

        while ip < code.len() {
            let instr = &code[ip];
            ip += 1;

            match instr {
                Instruction::PushEmptyString => stack.push(Slot::Value(Value::String(String::new()))),
                Instruction::PushUndefined | Instruction::PushNull => stack.push(Slot::Value(Value::Null)),
                Instruction::PushFailed => stack.push(Slot::Failed),
                Instruction::PushEmptyArray => stack.push(Slot::Value(Value::Array(vec![]))),
                Instruction::PushCurrPos => stack.push(Slot::Pos(self.pos)),

                Instruction::Pop => {
                    pop(stack)?;
                }
                Instruction::PopCurrPos => self.pos = position(&pop(stack)?)?,
                Instruction::PopN(n) => truncate(stack, *n)?,
                Instruction::Nip => {
                    let top = pop(stack)?;
                    pop(stack)?;
                    stack.push(top);
                }
                Instruction::Append => {
                    let value = into_value(pop(stack)?)?;

                    match stack.last_mut() {
                        Some(Slot::Value(Value::Array(items))) => items.push(value),
                        _ => return Err(invalid("appending to a non-array value")),
                    }
                }
                Instruction::Wrap(n) => {
                    let at = stack.len().checked_sub(*n).ok_or_else(underflow)?;

                    let items = stack
                        .split_off(at)
                        .into_iter()
                        .map(into_value)
                        .collect::<Result<Vec<_>, _>>()?;

                    stack.push(Slot::Value(Value::Array(items)));
                }
                Instruction::Text => {
                    let start = position(&pop(stack)?)?;
                    let text = self.input.get(start..self.pos).unwrap_or("");
                    stack.push(Slot::Value(Value::String(text.to_string())));
                }
                Instruction::Pluck { pop: count, picks } => {
                    let mut values = picks
                        .iter()
                        .map(|offset| peek(stack, *offset).and_then(|slot| into_value(slot.clone())))
                        .collect::<Result<Vec<_>, _>>()?;

                    truncate(stack, *count)?;

                    stack.push(Slot::Value(if values.len() == 1 {
                        values.remove(0)
                    } else {
                        Value::Array(values)
                    }));
                }

                Instruction::Branch {
                    cond,
                    then_len,
                    else_len,
                } => {
                    let end = ip + then_len + else_len;

                    let (then_code, else_code) = code
                        .get(ip..end)
                        .ok_or_else(|| invalid("truncated conditional block"))?
                        .split_at(*then_len);

                    if self.check(*cond, stack)? {
                        self.run(then_code, stack)?;
                    } else {
                        self.run(else_code, stack)?;
                    }

                    ip = end;
                }
                Instruction::WhileNotError { body_len } => {
                    let body = code
                        .get(ip..ip + body_len)
                        .ok_or_else(|| invalid("truncated loop body"))?;

                    while !peek(stack, 0)?.is_failed() {
                        self.run(body, stack)?;
                    }

                    ip += body_len;
                }
                Instruction::WhileProgressing { body_len } => {
                    let body = code
                        .get(ip..ip + body_len)
                        .ok_or_else(|| invalid("truncated loop body"))?;

                    while !peek(stack, 0)?.is_failed() {
                        let start = self.pos;
                        self.run(body, stack)?;

                        if self.pos == start && !peek(stack, 0)?.is_failed() {
                            break;
                        }
                    }

                    ip += body_len;
                }

                Instruction::AcceptN(n) => {
                    let rest = self.rest();
                    let len = rest.char_indices().nth(*n).map_or(rest.len(), |(i, _)| i);

                    stack.push(Slot::Value(Value::String(rest[..len].to_string())));
                    self.pos += len;
                }
                Instruction::AcceptString(index) => {
                    let literal = self.literal(*index)?;

                    stack.push(Slot::Value(Value::String(literal.to_string())));
                    self.pos += literal.len();
                }
                Instruction::AcceptStringIc(index) => {
                    let rest = self.rest();
                    let len = match_ignore_case(rest, self.literal(*index)?)
                        .ok_or_else(|| invalid("accepting an unmatched literal"))?;

                    stack.push(Slot::Value(Value::String(rest[..len].to_string())));
                    self.pos += len;
                }
                Instruction::Fail(expectation) => {
                    stack.push(Slot::Failed);

                    if let (0, Some(index)) = (self.silent_fails, expectation) {
                        self.fail(Failure::Expected(*index));
                    }
                }

                Instruction::LoadSavedPos(offset) => self.saved_pos = position(peek(stack, *offset)?)?,
                Instruction::UpdateSavedPos => self.saved_pos = self.pos,
                Instruction::Call {
                    function,
                    pop: count,
                    args,
                } => {
                    let value = self.call(*function, args, stack)?;
                    truncate(stack, *count)?;
                    stack.push(Slot::Value(value));
                }

                Instruction::Rule(index) => {
                    let result = self.rule(*index)?;
                    stack.push(result);
                }

                Instruction::SilentFailsOn => self.silent_fails += 1,
                Instruction::SilentFailsOff => {
                    self.silent_fails = self.silent_fails.saturating_sub(1)
                }
            }
        }

        Ok(())
    }

    fn rest(&self) -> &'i str {
        self.input.get(self.pos..).unwrap_or("")
    }

    fn literal(&self, index: usize) -> Result<&'p str, ParseError> {
        self.parser
            .tables
            .literal(index)
            .ok_or_else(|| invalid(format!("unknown literal #{}", index)))
    }

    fn check(&self, cond: Cond, stack: &[Slot]) -> Result<bool, ParseError> {
        Ok(match cond {
            Cond::If => match peek(stack, 0)? {
                Slot::Value(value) => is_truthy(value),
                Slot::Pos(_) => true,
                Slot::Failed => false,
            },
            Cond::IfError => peek(stack, 0)?.is_failed(),
            Cond::IfNotError => !peek(stack, 0)?.is_failed(),
            Cond::MatchAny => self.pos < self.input.len(),
            Cond::MatchString(index) => self.rest().starts_with(self.literal(index)?),
            Cond::MatchStringIc(index) => match_ignore_case(self.rest(), self.literal(index)?).is_some(),
            Cond::MatchClass(index) => {
                let class = self
                    .parser
                    .tables
                    .class(index)
                    .ok_or_else(|| invalid(format!("unknown class #{}", index)))?;

                self.rest().chars().next().map_or(false, |c| class.matches(c))
            }
        })
    }

    /// Call the handler bound to a code block
    fn call(&self, index: usize, args: &[usize], stack: &[Slot]) -> Result<Value, ParseError> {
        let parser = self.parser;

        let (function, _) = parser
            .tables
            .function(index)
            .ok_or_else(|| invalid(format!("unknown function #{}", index)))?;

        let labels = function
            .params
            .iter()
            .zip(args)
            .map(|(param, offset)| {
                peek(stack, *offset)
                    .and_then(|slot| into_value(slot.clone()))
                    .map(|value| (param.as_str(), value))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let ctx = ActionContext {
            input: self.input,
            range: self.saved_pos..self.pos,
            labels,
        };

        let code = function.body.trim();

        if function.predicate {
            match parser.predicates.get(code) {
                Some(handler) => Ok(Value::Bool(handler(&ctx))),
                None => Err(ParseError::UnboundPredicate {
                    code: code.to_string(),
                }),
            }
        } else {
            Ok(match parser.actions.get(code) {
                Some(handler) => handler(&ctx),
                None => Value::String(ctx.text().to_string()),
            })
        }
    }
}

fn invalid(message: impl Into<String>) -> ParseError {
    ParseError::InvalidBytecode(message.into())
}

fn underflow() -> ParseError {
    invalid("stack underflow")
}

fn pop(stack: &mut Vec<Slot>) -> Result<Slot, ParseError> {
    stack.pop().ok_or_else(underflow)
}

fn peek(stack: &[Slot], offset: usize) -> Result<&Slot, ParseError> {
    stack
        .len()
        .checked_sub(offset + 1)
        .and_then(|index| stack.get(index))
        .ok_or_else(underflow)
}

fn truncate(stack: &mut Vec<Slot>, count: usize) -> Result<(), ParseError> {
    let len = stack.len().checked_sub(count).ok_or_else(underflow)?;
    stack.truncate(len);
    Ok(())
}

fn position(slot: &Slot) -> Result<usize, ParseError> {
    match slot {
        Slot::Pos(pos) => Ok(*pos),
        _ => Err(invalid("expected a saved position")),
    }
}

fn into_value(slot: Slot) -> Result<Value, ParseError> {
    match slot {
        Slot::Value(value) => Ok(value),
        Slot::Failed => Err(invalid("expected a value, found a failure")),
        Slot::Pos(_) => Err(invalid("expected a value, found a saved position")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{compile, CompileOptions, Passes};
    use crate::grammar::{ClassPart, Expression, Grammar, Rule};
    use crate::runtime::{TraceEventKind, TraceLog};
    use serde_json::json;

    fn parser_with(rules: Vec<Rule>, options: CompileOptions) -> Parser {
        compile(Grammar::new(rules), &Passes::default(), options)
            .unwrap()
            .into_parser()
            .unwrap()
    }

    fn parser(rules: Vec<Rule>) -> Parser {
        parser_with(rules, CompileOptions::default())
    }

    fn digits() -> Expression {
        Expression::text(Expression::one_or_more(Expression::class(
            vec![ClassPart::Range('0', '9')],
            false,
        )))
    }

    #[test]
    fn unbound_actions_return_the_matched_text() {
        let parser = parser(vec![Rule::new(
            "start",
            Expression::action(Expression::one_or_more(Expression::literal("a")), " return true; "),
        )]);

        assert_eq!(parser.parse("aaa").unwrap(), json!("aaa"));

        let parser = parser.on_action("return true;", |_| json!(true));
        assert_eq!(parser.parse("aaa").unwrap(), json!(true));

        let err = parser.parse("").unwrap_err();
        let err = err.syntax().unwrap();

        assert_eq!(err.message, "Expected \"a\" but end of input found.");
        assert_eq!(err.location.start.offset, 0);
    }

    #[test]
    fn actions_receive_labels() {
        let parser = parser(vec![
            Rule::new(
                "sum",
                Expression::action(
                    Expression::sequence(vec![
                        Expression::labeled("left", Expression::rule_ref("number")),
                        Expression::literal("+"),
                        Expression::labeled("right", Expression::rule_ref("number")),
                    ]),
                    "left + right",
                ),
            ),
            Rule::new(
                "number",
                Expression::action(Expression::labeled("digits", digits()), "digits.parse()"),
            ),
        ])
        .on_action("digits.parse()", |ctx| {
            json!(ctx.text().parse::<i64>().unwrap())
        })
        .on_action("left + right", |ctx| {
            let left = ctx.label("left").and_then(Value::as_i64).unwrap();
            let right = ctx.label("right").and_then(Value::as_i64).unwrap();
            json!(left + right)
        });

        assert_eq!(parser.parse("12+30").unwrap(), json!(42));
    }

    #[test]
    fn sequences_plucks_and_optionals() {
        let parser = parser(vec![Rule::new(
            "start",
            Expression::sequence(vec![
                Expression::literal("("),
                Expression::pluck(None, Expression::optional(digits())),
                Expression::literal(")"),
            ]),
        )]);

        assert_eq!(parser.parse("(12)").unwrap(), json!("12"));
        assert_eq!(parser.parse("()").unwrap(), json!(null));

        let parser = self::parser(vec![Rule::new(
            "start",
            Expression::sequence(vec![Expression::literal_ic("ab"), Expression::any()]),
        )]);

        assert_eq!(parser.parse("aBc").unwrap(), json!(["aB", "c"]));
    }

    #[test]
    fn ignore_case_literals_consume_the_matched_characters() {
        let parser = parser(vec![Rule::new("start", Expression::literal_ic("İ"))]);

        assert_eq!(parser.parse("İ").unwrap(), json!("İ"));
        assert_eq!(parser.parse("i\u{307}").unwrap(), json!("i\u{307}"));
        assert_eq!(
            parser.parse("i").unwrap_err().to_string(),
            "Expected \"İ\" but \"i\" found."
        );

        let parser = self::parser(vec![Rule::new(
            "start",
            Expression::sequence(vec![Expression::literal_ic("straße"), Expression::any()]),
        )]);

        assert_eq!(parser.parse("STRAßE!").unwrap(), json!(["STRAßE", "!"]));
    }

    #[test]
    fn furthest_failures_are_reported() {
        let parser = parser(vec![
            Rule::new(
                "start",
                Expression::choice(vec![
                    Expression::sequence(vec![Expression::literal("a"), Expression::literal("b")]),
                    Expression::sequence(vec![Expression::literal("a"), Expression::rule_ref("digit")]),
                ]),
            ),
            Rule::new(
                "digit",
                Expression::named(
                    "digit",
                    Expression::class(vec![ClassPart::Range('0', '9')], false),
                ),
            ),
        ]);

        let err = parser.parse("ax").unwrap_err();
        let err = err.syntax().unwrap();

        assert_eq!(err.message, "Expected \"b\" or digit but \"x\" found.");
        assert_eq!(err.location.start.column, 2);
        assert_eq!(err.found.as_deref(), Some("x"));

        let err = parser.parse("a1!").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Expected end of input but \"!\" found."
        );
    }

    #[test]
    fn predicates_need_a_handler() {
        let rules = vec![Rule::new(
            "start",
            Expression::sequence(vec![
                Expression::labeled("word", digits()),
                Expression::semantic_and("word.len() < 3"),
            ]),
        )];

        assert_eq!(
            parser(rules.clone()).parse("12").unwrap_err(),
            ParseError::UnboundPredicate {
                code: "word.len() < 3".to_string()
            }
        );

        let parser = parser(rules).on_predicate("word.len() < 3", |ctx| {
            ctx.label("word")
                .and_then(Value::as_str)
                .map_or(false, |word| word.len() < 3)
        });

        assert_eq!(parser.parse("12").unwrap(), json!(["12", null]));
        assert!(parser.parse("123").is_err());
    }

    #[test]
    fn start_rules() {
        let rules = vec![
            Rule::new("first", Expression::literal("a")),
            Rule::new("second", Expression::literal("b")),
        ];

        let parser = parser_with(
            rules,
            CompileOptions {
                allowed_start_rules: vec!["first".to_string(), "second".to_string()],
                ..CompileOptions::default()
            },
        );

        assert!(parser.parse("a").is_ok());
        assert!(parser
            .parse_with("b", ParseOptions::new().start_rule("second"))
            .is_ok());
        assert_eq!(
            parser
                .parse_with("a", ParseOptions::new().start_rule("third"))
                .unwrap_err()
                .to_string(),
            "Can't start parsing from rule \"third\"."
        );
    }

    #[test]
    fn cached_and_traced_parses() {
        let rules = vec![
            Rule::new(
                "start",
                Expression::choice(vec![
                    Expression::sequence(vec![Expression::rule_ref("word"), Expression::literal("!")]),
                    Expression::sequence(vec![Expression::rule_ref("word"), Expression::literal("?")]),
                ]),
            ),
            Rule::new("word", digits()),
        ];

        let options = CompileOptions {
            cache: true,
            ..CompileOptions::default()
        };

        let cached = parser_with(rules.clone(), options);
        let uncached = parser(rules);

        let mut cached_log = TraceLog::new();
        let mut uncached_log = TraceLog::new();

        let cached_result = cached.parse_with("42?", ParseOptions::new().tracer(&mut cached_log));
        let uncached_result =
            uncached.parse_with("42?", ParseOptions::new().tracer(&mut uncached_log));

        assert_eq!(cached_result.unwrap(), json!(["42", "?"]));
        assert_eq!(uncached_result.unwrap(), json!(["42", "?"]));

        let kinds: Vec<_> = uncached_log
            .records
            .iter()
            .map(|record| (record.kind, record.rule.as_str()))
            .collect();

        assert_eq!(
            kinds,
            vec![
                (TraceEventKind::Enter, "start"),
                (TraceEventKind::Enter, "word"),
                (TraceEventKind::Match, "word"),
                (TraceEventKind::Enter, "word"),
                (TraceEventKind::Match, "word"),
                (TraceEventKind::Match, "start"),
            ]
        );

        // Cached results are still traced
        assert_eq!(cached_log.records.len(), uncached_log.records.len());
        assert_eq!(cached_log.records[4].location.end.offset, 2);
    }
}
