use crate::compiler::{CompileError, GrammarError, GrammarErrorContent, Session};
use crate::grammar::*;

struct IncorrectPlucking<'g> {
    /// Action whose result would be computed from the current sequence
    action: Option<&'g Expression>,
    errors: Vec<GrammarError>,
}

impl<'g> Visitor<'g> for IncorrectPlucking<'g> {
    fn visit_action(&mut self, expr: &'g Expression, inner: &'g Expression, _code: &'g str) {
        let outer = self.action.replace(expr);
        self.visit_expression(inner);
        self.action = outer;
    }

    fn visit_labeled(&mut self, expr: &'g Expression, _label: Option<&'g str>, inner: &'g Expression) {
        if let ExpressionKind::Labeled {
            pick: true,
            label_location,
            ..
        } = &expr.kind
        {
            if let Some(action) = self.action {
                self.errors.push(
                    GrammarError::new(
                        Some(label_location.unwrap_or(expr.location)),
                        GrammarErrorContent::PluckWithAction,
                    )
                    .with_note("action block location", action.location),
                );
            }
        }

        let outer = self.action.take();
        self.visit_expression(inner);
        self.action = outer;
    }
}

/// Report plucked (`@`) expressions whose result would be discarded by an action
pub fn report_incorrect_plucking(session: &mut Session) -> Result<(), CompileError> {
    let errors = {
        let mut visitor = IncorrectPlucking {
            action: None,
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
