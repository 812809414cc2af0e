use crate::compiler::{CompileError, GrammarError, GrammarErrorContent, Session};
use crate::grammar::*;

struct InfiniteRepetition<'g> {
    consumption: ConsumptionAnalysis<'g>,
    errors: Vec<GrammarError>,
}

impl<'g> Visitor<'g> for InfiniteRepetition<'g> {
    fn visit_suffixed(&mut self, expr: &'g Expression, operator: SuffixOperator, inner: &'g Expression) {
        if operator.is_repetition() && !self.consumption.always_consumes_on_success(inner) {
            self.errors.push(GrammarError::new(
                Some(expr.location),
                GrammarErrorContent::InfiniteRepetition,
            ));
        }

        self.visit_expression(inner)
    }
}

/// Report repetitions of expressions that may succeed without consuming any input
pub fn report_infinite_repetition(session: &mut Session) -> Result<(), CompileError> {
    let errors = {
        let grammar = session.grammar();

        let mut visitor = InfiniteRepetition {
            consumption: ConsumptionAnalysis::new(grammar),
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
