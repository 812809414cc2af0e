use crate::compiler::{CompileError, GrammarError, GrammarErrorContent, Session};
use crate::grammar::{Expression, Grammar, Visitor};

struct UndefinedRules<'g> {
    grammar: &'g Grammar,
    errors: Vec<GrammarError>,
}

impl<'g> Visitor<'g> for UndefinedRules<'g> {
    fn visit_rule_ref(&mut self, expr: &'g Expression, name: &'g str) {
        if self.grammar.find_rule(name).is_none() {
            self.errors.push(GrammarError::new(
                Some(expr.location),
                GrammarErrorContent::UndefinedRule(name.to_string()),
            ));
        }
    }
}

/// Report references to rules that don't exist, as well as unknown start rules
pub fn report_undefined_rules(session: &mut Session) -> Result<(), CompileError> {
    let mut visitor = UndefinedRules {
        grammar: session.grammar(),
        errors: vec![],
    };

    visitor.visit_grammar(session.grammar());

    let mut errors = visitor.errors;

    for start_rule in &session.options().allowed_start_rules {
        if session.grammar().find_rule(start_rule).is_none() {
            errors.push(GrammarError::new(
                None,
                GrammarErrorContent::UndefinedStartRule(start_rule.clone()),
            ));
        }
    }

    for err in errors {
        session.error(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Location, Position, Rule};
    use crate::passes::tests::session_for;

    #[test]
    fn reports_every_undefined_reference_at_its_location() {
        let at = Location::new(Position::new(10, 2, 3), Position::new(15, 2, 8));

        let mut session = session_for(vec![Rule::new(
            "start",
            Expression::sequence(vec![
                Expression::rule_ref("other").at(at),
                Expression::rule_ref("start"),
                Expression::rule_ref("missing"),
            ]),
        )]);

        report_undefined_rules(&mut session).unwrap();

        let errors = session.errors();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].message(), "rule 'other' is not defined");
        assert_eq!(errors[0].location(), Some(&at));
        assert_eq!(errors[1].message(), "rule 'missing' is not defined");
    }

    #[test]
    fn validates_start_rules() {
        let grammar = crate::grammar::Grammar::new(vec![Rule::new("start", Expression::any())]);
        let options = crate::compiler::CompileOptions {
            allowed_start_rules: vec!["start".to_string(), "nope".to_string()],
            ..Default::default()
        };

        let mut session = Session::new(grammar, options);
        report_undefined_rules(&mut session).unwrap();

        assert_eq!(
            session.errors()[0].content(),
            &GrammarErrorContent::UndefinedStartRule("nope".to_string())
        );
        assert_eq!(session.errors()[0].location(), None);
    }
}
