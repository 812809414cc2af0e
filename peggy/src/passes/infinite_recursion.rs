use crate::compiler::{CompileError, GrammarError, GrammarErrorContent, Session};
use crate::grammar::*;

/// Depth-first walk following the rule references reachable without consuming any input
struct InfiniteRecursion<'g> {
    grammar: &'g Grammar,
    consumption: ConsumptionAnalysis<'g>,

    /// Rules being visited, outermost first
    visited_rules: Vec<&'g str>,

    /// References followed to reach the current point
    backtrace: Vec<&'g Expression>,

    errors: Vec<GrammarError>,
}

impl<'g> Visitor<'g> for InfiniteRecursion<'g> {
    fn visit_rule(&mut self, rule: &'g Rule) {
        self.visited_rules.push(&rule.name);
        self.visit_expression(&rule.expression);
        self.visited_rules.pop();
    }

    fn visit_sequence(&mut self, _expr: &'g Expression, elements: &'g [Expression]) {
        for element in elements {
            self.visit_expression(element);

            // Elements after a consuming one are never reached at the same input position
            if self.consumption.always_consumes_on_success(element) {
                break;
            }
        }
    }

    fn visit_rule_ref(&mut self, expr: &'g Expression, name: &'g str) {
        self.backtrace.push(expr);

        let rule = self.grammar.find_rule(name);

        if self.visited_rules.contains(&name) {
            let cycle = self
                .visited_rules
                .iter()
                .chain(std::iter::once(&name))
                .map(|name| name.to_string())
                .collect();

            let steps = self.backtrace.len();

            let err = self.backtrace.iter().enumerate().fold(
                GrammarError::new(
                    rule.map(|rule| rule.name_location),
                    GrammarErrorContent::InfiniteRecursion(cycle),
                ),
                |err, (i, step)| {
                    let message = match step.as_rule_ref() {
                        Some(_) if i + 1 == steps => format!(
                            "step {}: call itself without input consumption - left recursion",
                            i + 1
                        ),
                        Some(callee) => format!(
                            "step {}: call of the rule '{}' without input consumption",
                            i + 1,
                            callee
                        ),
                        None => format!("step {}", i + 1),
                    };

                    err.with_note(message, step.location)
                },
            );

            self.errors.push(err);
        } else if let Some(rule) = rule {
            self.visit_rule(rule);
        }

        self.backtrace.pop();
    }
}

/// Report left-recursive rules, which would loop forever without consuming any input
pub fn report_infinite_recursion(session: &mut Session) -> Result<(), CompileError> {
    let errors = {
        let grammar = session.grammar();

        let mut visitor = InfiniteRecursion {
            grammar,
            consumption: ConsumptionAnalysis::new(grammar),
            visited_rules: vec![],
            backtrace: vec![],
            errors: vec![],
        };

        visitor.visit_grammar(grammar);
        visitor.errors
    };

    for err in errors {
        session.error(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::tests::session_for;

    fn check(rules: Vec<(&str, Expression)>) -> Vec<String> {
        let mut session = session_for(
            rules
                .into_iter()
                .map(|(name, expr)| Rule::new(name, expr))
                .collect(),
        );

        report_infinite_recursion(&mut session).unwrap();
        session.errors().iter().map(|err| err.message()).collect()
    }

    #[test]
    fn direct_recursion() {
        assert_eq!(
            check(vec![("a", Expression::rule_ref("a"))]),
            vec!["possible infinite loop when parsing (left recursion: a -> a)"]
        );
    }

    #[test]
    fn consuming_prefix_breaks_the_cycle() {
        let expr = Expression::choice(vec![
            Expression::sequence(vec![Expression::literal("x"), Expression::rule_ref("a")]),
            Expression::literal("y"),
        ]);

        assert!(check(vec![("a", expr)]).is_empty());
    }

    #[test]
    fn every_alternative_is_followed() {
        let expr = Expression::choice(vec![Expression::literal("x"), Expression::rule_ref("a")]);
        assert_eq!(check(vec![("a", expr)]).len(), 1);
    }

    #[test]
    fn non_consuming_prefix_does_not_break_the_cycle() {
        let expr = Expression::sequence(vec![
            Expression::optional(Expression::literal("x")),
            Expression::rule_ref("b"),
        ]);

        let errors = check(vec![("a", expr), ("b", Expression::rule_ref("a"))]);
        assert_eq!(
            errors[0],
            "possible infinite loop when parsing (left recursion: a -> b -> a)"
        );
    }

    #[test]
    fn notes_follow_the_backtrace() {
        let mut session = session_for(vec![
            Rule::new("a", Expression::rule_ref("b")),
            Rule::new("b", Expression::rule_ref("a")),
        ]);

        report_infinite_recursion(&mut session).unwrap();

        let notes = session.errors()[0].notes();
        assert_eq!(notes.len(), 2);
        assert_eq!(
            notes[0].message,
            "step 1: call of the rule 'b' without input consumption"
        );
        assert_eq!(
            notes[1].message,
            "step 2: call itself without input consumption - left recursion"
        );
    }
}
