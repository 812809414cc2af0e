use super::match_result::infer_expression;
use crate::bytecode::*;
use crate::compiler::{
    CompileError, GrammarError, GrammarErrorContent, MatchResult, RuleFacts, Session,
};
use crate::grammar::*;
use indexmap::IndexMap;
use tracing::trace;

/// Labels visible from the current expression, with the stack slot holding their value
type Env<'g> = IndexMap<&'g str, isize>;

/// Lowers rules to bytecode
///
/// Stack slots are tracked with `sp`, the index of the topmost slot (`-1` for an empty stack).
struct BytecodeGenerator<'g> {
    grammar: &'g Grammar,
    facts: &'g IndexMap<String, RuleFacts>,
    consumption: ConsumptionAnalysis<'g>,
    tables: ConstTables,

    /// Does the rule being generated report its failures?
    report_failures: bool,
}

type Code = Result<Vec<Instruction>, CompileError>;

impl<'g> BytecodeGenerator<'g> {
    fn match_of(&self, expr: &Expression) -> MatchResult {
        infer_expression(expr, &|name: &str| {
            self.facts
                .get(name)
                .map(|facts| facts.result)
                .unwrap_or(MatchResult::Sometimes)
        })
    }

    /// Repetitions of expressions which may not consume input are guarded against looping forever
    fn needs_guard(&mut self, repeated: &Expression) -> bool {
        !self.consumption.always_consumes_on_success(repeated)
    }

    fn expectation(&mut self, expectation: Expectation) -> Option<usize> {
        if self.report_failures {
            Some(self.tables.add_expectation(expectation))
        } else {
            None
        }
    }

    fn function(&mut self, predicate: bool, env: &Env<'g>, code: &str, location: Location) -> usize {
        self.tables.add_function(
            FunctionConst {
                predicate,
                params: env.keys().map(|label| label.to_string()).collect(),
                body: code.to_string(),
            },
            location,
        )
    }

    fn call(&self, function: usize, pop: usize, env: &Env<'g>, sp: isize) -> Instruction {
        Instruction::Call {
            function,
            pop,
            args: env.values().map(|slot| offset(sp, *slot)).collect(),
        }
    }

    fn rule(&mut self, rule: &'g Rule) -> Code {
        self.generate(&rule.expression, -1, &mut Env::new(), &mut vec![], None)
    }

    /// Generate the code of an expression
    ///
    /// Labeled expressions declare their label in `env` and register plucked slots in `pluck`, both being
    /// shared with the enclosing sequence. `action` is the action the sequence must call with its elements.
    fn generate(
        &mut self,
        expr: &'g Expression,
        sp: isize,
        env: &mut Env<'g>,
        pluck: &mut Vec<isize>,
        action: Option<&'g Expression>,
    ) -> Code {
        match &expr.kind {
            ExpressionKind::Named { name, expression } => {
                let result = self.match_of(expression);

                let expectation = if result == MatchResult::Never {
                    None
                } else {
                    self.expectation(Expectation::Rule { name: name.clone() })
                };

                let mut code = vec![Instruction::SilentFailsOn];
                code.extend(self.generate(expression, sp, env, pluck, action)?);
                code.push(Instruction::SilentFailsOff);
                code.extend(build_condition(
                    result.negate().known(),
                    Cond::IfError,
                    vec![Instruction::Pop, Instruction::Fail(expectation)],
                    vec![],
                ));

                Ok(code)
            }

            ExpressionKind::Choice { alternatives } => self.alternatives(alternatives, sp, env),

            ExpressionKind::Action { expression, code } => {
                let mut action_env = env.clone();

                let emit_call = !matches!(
                    &expression.kind,
                    ExpressionKind::Sequence { elements } if !elements.is_empty()
                );

                if !emit_call {
                    // The sequence calls the action itself, with its elements on the stack
                    return self.generate(expression, sp, &mut action_env, &mut vec![], Some(expr));
                }

                let expression_code =
                    self.generate(expression, sp + 1, &mut action_env, &mut vec![], None)?;

                let result = self.match_of(expression);

                let then_code = if result == MatchResult::Never {
                    vec![]
                } else {
                    let function = self.function(false, &action_env, code, expr.location);
                    vec![
                        Instruction::LoadSavedPos(1),
                        self.call(function, 1, &action_env, sp + 2),
                    ]
                };

                let mut out = vec![Instruction::PushCurrPos];
                out.extend(expression_code);
                out.extend(build_condition(
                    result.known(),
                    Cond::IfNotError,
                    then_code,
                    vec![],
                ));
                out.push(Instruction::Nip);

                Ok(out)
            }

            ExpressionKind::Sequence { elements } => {
                let mut code = vec![Instruction::PushCurrPos];
                code.extend(self.elements(elements, elements, sp + 1, env, &mut vec![], action)?);
                Ok(code)
            }

            ExpressionKind::Labeled {
                label,
                pick,
                expression,
                ..
            } => {
                let slot = sp + 1;
                let mut inner_env = env.clone();

                if let Some(label) = label {
                    env.insert(label, slot);
                }

                if *pick {
                    pluck.push(slot);
                }

                self.generate(expression, sp, &mut inner_env, &mut vec![], None)
            }

            ExpressionKind::Prefixed {
                operator,
                expression,
            } => match operator {
                PrefixOperator::Text => {
                    let mut code = vec![Instruction::PushCurrPos];
                    code.extend(self.generate(expression, sp + 1, &mut env.clone(), &mut vec![], None)?);
                    code.extend(build_condition(
                        self.match_of(expression).known(),
                        Cond::IfNotError,
                        vec![Instruction::Pop, Instruction::Text],
                        vec![Instruction::Nip],
                    ));
                    Ok(code)
                }
                PrefixOperator::SimpleAnd => self.simple_predicate(expression, false, sp, env),
                PrefixOperator::SimpleNot => self.simple_predicate(expression, true, sp, env),
            },

            ExpressionKind::Suffixed {
                operator,
                expression,
            } => match operator {
                SuffixOperator::Optional => {
                    let mut code = self.generate(expression, sp, &mut env.clone(), &mut vec![], None)?;
                    code.extend(build_condition(
                        self.match_of(expression).negate().known(),
                        Cond::IfError,
                        vec![Instruction::Pop, Instruction::PushNull],
                        vec![],
                    ));
                    Ok(code)
                }
                SuffixOperator::ZeroOrMore => {
                    let expression_code =
                        self.generate(expression, sp + 1, &mut env.clone(), &mut vec![], None)?;

                    let guarded = self.needs_guard(expression);

                    let mut code = vec![Instruction::PushEmptyArray];
                    code.extend(expression_code.clone());
                    code.extend(append_loop(expression_code, guarded));
                    code.push(Instruction::Pop);
                    Ok(code)
                }
                SuffixOperator::OneOrMore => {
                    let expression_code =
                        self.generate(expression, sp + 1, &mut env.clone(), &mut vec![], None)?;

                    let guarded = self.needs_guard(expression);

                    let mut then_code = append_loop(expression_code.clone(), guarded);
                    then_code.push(Instruction::Pop);

                    let mut code = vec![Instruction::PushEmptyArray];
                    code.extend(expression_code);
                    code.extend(build_condition(
                        self.match_of(expression).known(),
                        Cond::IfNotError,
                        then_code,
                        vec![Instruction::Pop, Instruction::Pop, Instruction::PushFailed],
                    ));
                    Ok(code)
                }
            },

            ExpressionKind::Group { expression } => {
                self.generate(expression, sp, &mut env.clone(), &mut vec![], None)
            }

            ExpressionKind::SemanticPredicate { operator, code } => {
                let negative = *operator == PredicateOperator::Not;
                let function = self.function(true, env, code, expr.location);

                let (on_true, on_false) = if negative {
                    (Instruction::PushFailed, Instruction::PushUndefined)
                } else {
                    (Instruction::PushUndefined, Instruction::PushFailed)
                };

                let mut out = vec![
                    Instruction::UpdateSavedPos,
                    self.call(function, 0, env, sp),
                ];
                out.extend(build_condition(
                    None,
                    Cond::If,
                    vec![Instruction::Pop, on_true],
                    vec![Instruction::Pop, on_false],
                ));

                Ok(out)
            }

            ExpressionKind::RuleRef { name } => match self.grammar.index_of_rule(name) {
                Some(index) => Ok(vec![Instruction::Rule(index)]),
                None => Err(GrammarError::new(
                    Some(expr.location),
                    GrammarErrorContent::UndefinedRule(name.clone()),
                )
                .into()),
            },

            ExpressionKind::Literal { value, ignore_case } => {
                if value.is_empty() {
                    return Ok(vec![Instruction::PushEmptyString]);
                }

                let result = self.match_of(expr);

                let literal = if *ignore_case {
                    self.tables.add_literal(&value.to_lowercase())
                } else {
                    self.tables.add_literal(value)
                };

                let expectation = if result == MatchResult::Always {
                    None
                } else {
                    self.expectation(Expectation::Literal {
                        value: value.clone(),
                        ignore_case: *ignore_case,
                    })
                };

                Ok(if *ignore_case {
                    build_condition(
                        result.known(),
                        Cond::MatchStringIc(literal),
                        vec![Instruction::AcceptStringIc(literal)],
                        vec![Instruction::Fail(expectation)],
                    )
                } else {
                    build_condition(
                        result.known(),
                        Cond::MatchString(literal),
                        vec![Instruction::AcceptString(literal)],
                        vec![Instruction::Fail(expectation)],
                    )
                })
            }

            ExpressionKind::Class {
                parts,
                inverted,
                ignore_case,
            } => {
                let result = self.match_of(expr);

                let class = if result == MatchResult::Sometimes {
                    self.tables.add_class(ClassConst {
                        parts: parts.clone(),
                        inverted: *inverted,
                        ignore_case: *ignore_case,
                    })
                } else {
                    0
                };

                let expectation = self.expectation(Expectation::Class {
                    parts: parts.clone(),
                    inverted: *inverted,
                    ignore_case: *ignore_case,
                });

                Ok(build_condition(
                    result.known(),
                    Cond::MatchClass(class),
                    vec![Instruction::AcceptN(1)],
                    vec![Instruction::Fail(expectation)],
                ))
            }

            ExpressionKind::Any => {
                let expectation = self.expectation(Expectation::Any);

                Ok(build_condition(
                    None,
                    Cond::MatchAny,
                    vec![Instruction::AcceptN(1)],
                    vec![Instruction::Fail(expectation)],
                ))
            }
        }
    }

    /// Generate the alternatives of a choice, each one tried if the previous ones failed
    fn alternatives(&mut self, alternatives: &'g [Expression], sp: isize, env: &Env<'g>) -> Code {
        let (first, rest) = match alternatives.split_first() {
            Some(split) => split,
            None => return Ok(vec![Instruction::PushFailed]),
        };

        let mut code = self.generate(first, sp, &mut env.clone(), &mut vec![], None)?;

        // Alternatives after an always-matching one are unreachable
        if self.match_of(first) == MatchResult::Always || rest.is_empty() {
            return Ok(code);
        }

        let mut then_code = vec![Instruction::Pop];
        then_code.extend(self.alternatives(rest, sp, env)?);

        code.extend(build_condition(None, Cond::IfError, then_code, vec![]));
        Ok(code)
    }

    /// Generate the remaining elements of a sequence, `sp` being the slot of the last generated one
    fn elements(
        &mut self,
        all: &'g [Expression],
        remaining: &'g [Expression],
        sp: isize,
        env: &mut Env<'g>,
        pluck: &mut Vec<isize>,
        action: Option<&'g Expression>,
    ) -> Code {
        let (first, rest) = match remaining.split_first() {
            Some(split) => split,
            None => return Ok(self.finish_sequence(all.len(), sp, env, pluck, action)),
        };

        let processed = all.len() - remaining.len() + 1;

        let mut code = self.generate(first, sp, env, pluck, None)?;
        let then_code = self.elements(all, rest, sp + 1, env, pluck, action)?;

        let mut else_code = vec![if processed > 1 {
            Instruction::PopN(processed)
        } else {
            Instruction::Pop
        }];
        else_code.extend([Instruction::PopCurrPos, Instruction::PushFailed]);

        code.extend(build_condition(
            self.match_of(first).known(),
            Cond::IfNotError,
            then_code,
            else_code,
        ));

        Ok(code)
    }

    /// Replace a matched sequence (its saved position and elements) by its result
    fn finish_sequence(
        &mut self,
        len: usize,
        sp: isize,
        env: &Env<'g>,
        pluck: &[isize],
        action: Option<&'g Expression>,
    ) -> Vec<Instruction> {
        if !pluck.is_empty() {
            return vec![Instruction::Pluck {
                pop: len + 1,
                picks: pluck.iter().map(|slot| offset(sp, *slot)).collect(),
            }];
        }

        if let Some(action) = action {
            if let ExpressionKind::Action { code, .. } = &action.kind {
                let function = self.function(false, env, code, action.location);

                return vec![
                    Instruction::LoadSavedPos(len),
                    self.call(function, len + 1, env, sp),
                ];
            }
        }

        vec![Instruction::Wrap(len), Instruction::Nip]
    }

    fn simple_predicate(
        &mut self,
        expression: &'g Expression,
        negative: bool,
        sp: isize,
        env: &Env<'g>,
    ) -> Code {
        let result = self.match_of(expression);

        let mut code = vec![Instruction::PushCurrPos, Instruction::SilentFailsOn];
        code.extend(self.generate(expression, sp + 1, &mut env.clone(), &mut vec![], None)?);
        code.push(Instruction::SilentFailsOff);

        let (known, cond, restore_on_success) = if negative {
            (result.negate().known(), Cond::IfError, false)
        } else {
            (result.known(), Cond::IfNotError, true)
        };

        let then_code = vec![
            Instruction::Pop,
            if restore_on_success {
                Instruction::PopCurrPos
            } else {
                Instruction::Pop
            },
            Instruction::PushUndefined,
        ];

        let else_code = vec![
            Instruction::Pop,
            if restore_on_success {
                Instruction::Pop
            } else {
                Instruction::PopCurrPos
            },
            Instruction::PushFailed,
        ];

        code.extend(build_condition(known, cond, then_code, else_code));
        Ok(code)
    }
}

/// Distance from the top of the stack to a slot
fn offset(sp: isize, slot: isize) -> usize {
    usize::try_from(sp - slot).unwrap_or(0)
}

/// Loop appending the result of an expression to the array below it, until the expression fails
///
/// A guarded loop also ends when the expression matches without consuming input, that last result being dropped.
fn append_loop(expression_code: Vec<Instruction>, guarded: bool) -> Vec<Instruction> {
    let mut body = vec![Instruction::Append];
    body.extend(expression_code);
    build_loop(body, guarded)
}

/// Lower every rule to bytecode, interning constants in the session's tables
pub fn generate_bytecode(session: &mut Session) -> Result<(), CompileError> {
    let report_failures = session
        .grammar()
        .rules
        .iter()
        .map(|rule| session.report_failures(&rule.name))
        .collect::<Result<Vec<_>, _>>()?;

    let tables = std::mem::take(session.tables_mut());

    let (bytecode, tables) = {
        let facts = session.match_facts()?;

        let mut generator = BytecodeGenerator {
            grammar: session.grammar(),
            facts,
            consumption: ConsumptionAnalysis::with_known_rules(
                session.grammar(),
                facts
                    .iter()
                    .map(|(name, facts)| (name.as_str(), facts.always_consumes)),
            ),
            tables,
            report_failures: false,
        };

        let mut bytecode = vec![];

        for (rule, report_failures) in session.grammar().rules.iter().zip(report_failures) {
            generator.report_failures = report_failures;

            let code = generator.rule(rule)?;
            trace!(rule = %rule.name, instructions = code.len(), "generated bytecode");

            bytecode.push(code);
        }

        (bytecode, generator.tables)
    };

    *session.tables_mut() = tables;
    session.set_bytecode(bytecode);

    Ok(())
}
