use crate::compiler::{
    CompileError, GrammarError, GrammarErrorContent, MatchResult, RuleFacts, Session,
};
use crate::grammar::*;
use indexmap::IndexMap;
use tracing::trace;

/// Infer the match result of an expression, given the results of the rules it references
pub fn infer_expression(expr: &Expression, rules: &impl Fn(&str) -> MatchResult) -> MatchResult {
    match &expr.kind {
        ExpressionKind::Literal { value, .. } => {
            if value.is_empty() {
                MatchResult::Always
            } else {
                MatchResult::Sometimes
            }
        }

        ExpressionKind::Class {
            parts, inverted, ..
        } => {
            if parts.is_empty() && !inverted {
                MatchResult::Never
            } else {
                MatchResult::Sometimes
            }
        }

        ExpressionKind::Any | ExpressionKind::SemanticPredicate { .. } => MatchResult::Sometimes,

        ExpressionKind::RuleRef { name } => rules(name),

        ExpressionKind::Suffixed {
            operator,
            expression,
        } => match operator {
            SuffixOperator::Optional | SuffixOperator::ZeroOrMore => MatchResult::Always,
            SuffixOperator::OneOrMore => infer_expression(expression, rules),
        },

        ExpressionKind::Prefixed {
            operator,
            expression,
        } => match operator {
            PrefixOperator::SimpleNot => infer_expression(expression, rules).negate(),
            PrefixOperator::Text | PrefixOperator::SimpleAnd => infer_expression(expression, rules),
        },

        ExpressionKind::Group { expression }
        | ExpressionKind::Labeled { expression, .. }
        | ExpressionKind::Action { expression, .. }
        | ExpressionKind::Named { expression, .. } => infer_expression(expression, rules),

        ExpressionKind::Sequence { elements } => {
            let results: Vec<_> = elements.iter().map(|e| infer_expression(e, rules)).collect();

            if results.iter().all(|r| *r == MatchResult::Always) {
                MatchResult::Always
            } else if results.iter().any(|r| *r == MatchResult::Never) {
                MatchResult::Never
            } else {
                MatchResult::Sometimes
            }
        }

        ExpressionKind::Choice { alternatives } => {
            let results: Vec<_> = alternatives
                .iter()
                .map(|e| infer_expression(e, rules))
                .collect();

            if results.iter().all(|r| *r == MatchResult::Always) {
                MatchResult::Always
            } else if results.iter().all(|r| *r == MatchResult::Never) {
                MatchResult::Never
            } else {
                MatchResult::Sometimes
            }
        }
    }
}

/// Infer the match result of every rule
///
/// Rules reference each other, so results are computed as a global fixed point where every rule
/// starts as [`MatchResult::Sometimes`].
pub fn inference_match_result(session: &mut Session) -> Result<(), CompileError> {
    match infer_rules(session.grammar()) {
        Ok(facts) => session.set_match_facts(facts),
        Err(err) => session.error(err),
    }

    Ok(())
}

fn infer_rules(grammar: &Grammar) -> Result<IndexMap<String, RuleFacts>, GrammarError> {
    let max_iterations = grammar.rules.len() * 3 + 6;

    let mut results: IndexMap<&str, MatchResult> = grammar
        .rules
        .iter()
        .map(|rule| (rule.name.as_str(), MatchResult::Sometimes))
        .collect();

    let mut iterations = 0;

    loop {
        let mut changed: Option<&Rule> = None;

        for rule in &grammar.rules {
            let result = infer_expression(&rule.expression, &|name: &str| {
                results
                    .get(name)
                    .copied()
                    .unwrap_or(MatchResult::Sometimes)
            });

            if results.get(rule.name.as_str()) != Some(&result) {
                results.insert(rule.name.as_str(), result);

                if changed.is_none() {
                    changed = Some(rule);
                }
            }
        }

        iterations += 1;

        match changed {
            None => break,
            Some(rule) if iterations >= max_iterations => {
                return Err(GrammarError::new(
                    Some(rule.location),
                    GrammarErrorContent::MatchResultCycle(rule.name.clone()),
                ))
            }
            Some(_) => {}
        }
    }

    trace!(iterations, "inferred match results");

    let mut consumption = ConsumptionAnalysis::new(grammar);

    Ok(grammar
        .rules
        .iter()
        .map(|rule| {
            let facts = RuleFacts {
                result: results
                    .get(rule.name.as_str())
                    .copied()
                    .unwrap_or(MatchResult::Sometimes),
                always_consumes: consumption.rule_always_consumes(&rule.name),
            };

            (rule.name.clone(), facts)
        })
        .collect())
}
