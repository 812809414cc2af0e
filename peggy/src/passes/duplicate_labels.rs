use crate::compiler::{CompileError, GrammarError, GrammarErrorContent, Session};
use crate::grammar::*;
use std::collections::HashMap;

/// Labels visible at the current point of the traversal, with their location
struct DuplicateLabels<'g> {
    env: HashMap<&'g str, Location>,
    errors: Vec<GrammarError>,
}

impl<'g> DuplicateLabels<'g> {
    /// Visit an expression with a copy of the current labels, discarding the ones it declares
    fn visit_scoped(&mut self, expr: &'g Expression) {
        let saved = self.env.clone();
        self.visit_expression(expr);
        self.env = saved;
    }
}

impl<'g> Visitor<'g> for DuplicateLabels<'g> {
    fn visit_rule(&mut self, rule: &'g Rule) {
        self.env.clear();
        self.visit_expression(&rule.expression);
    }

    fn visit_labeled(&mut self, expr: &'g Expression, label: Option<&'g str>, inner: &'g Expression) {
        let location = match &expr.kind {
            ExpressionKind::Labeled {
                label_location: Some(location),
                ..
            } => *location,
            _ => expr.location,
        };

        if let Some(label) = label {
            if let Some(original) = self.env.get(label) {
                self.errors.push(
                    GrammarError::new(
                        Some(location),
                        GrammarErrorContent::DuplicateLabel(label.to_string()),
                    )
                    .with_note("original label location", *original),
                );
            }
        }

        self.visit_expression(inner);

        // Sequence siblings share the environment, so the label stays visible after this element
        if let Some(label) = label {
            self.env.insert(label, location);
        }
    }

    fn visit_choice(&mut self, _expr: &'g Expression, alternatives: &'g [Expression]) {
        for alternative in alternatives {
            self.visit_scoped(alternative);
        }
    }

    fn visit_action(&mut self, _expr: &'g Expression, inner: &'g Expression, _code: &'g str) {
        self.visit_scoped(inner)
    }

    fn visit_group(&mut self, _expr: &'g Expression, inner: &'g Expression) {
        self.visit_scoped(inner)
    }

    fn visit_prefixed(&mut self, _expr: &'g Expression, _operator: PrefixOperator, inner: &'g Expression) {
        self.visit_scoped(inner)
    }

    fn visit_suffixed(&mut self, _expr: &'g Expression, _operator: SuffixOperator, inner: &'g Expression) {
        self.visit_scoped(inner)
    }
}

/// Report labels that shadow another label visible from the same scope
pub fn report_duplicate_labels(session: &mut Session) -> Result<(), CompileError> {
    let errors = {
        let mut visitor = DuplicateLabels {
            env: HashMap::new(),
            errors: vec![],
        };

        visitor.visit_grammar(session.grammar());
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

    fn check(expression: Expression) -> Vec<String> {
        let mut session = session_for(vec![Rule::new("start", expression)]);
        report_duplicate_labels(&mut session).unwrap();
        session.errors().iter().map(|err| err.message()).collect()
    }

    fn a() -> Expression {
        Expression::labeled("a", Expression::literal("x"))
    }

    #[test]
    fn same_sequence() {
        assert_eq!(
            check(Expression::sequence(vec![a(), a()])),
            vec!["label 'a' is already defined"]
        );
    }

    #[test]
    fn alternatives_are_independent() {
        assert!(check(Expression::choice(vec![a(), a()])).is_empty());
        assert!(check(Expression::choice(vec![
            Expression::sequence(vec![a(), Expression::literal("y")]),
            Expression::sequence(vec![a(), Expression::literal("z")]),
        ]))
        .is_empty());
    }

    #[test]
    fn nested_scopes_see_outer_labels() {
        let nested = Expression::sequence(vec![
            a(),
            Expression::group(Expression::sequence(vec![a(), Expression::literal("y")])),
        ]);

        assert_eq!(check(nested), vec!["label 'a' is already defined"]);
    }

    #[test]
    fn labels_inside_groups_do_not_leak() {
        let expr = Expression::sequence(vec![
            Expression::group(Expression::sequence(vec![a(), Expression::literal("y")])),
            a(),
        ]);

        assert!(check(expr).is_empty());
    }
}
