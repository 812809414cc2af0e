use crate::compiler::{CompileError, GrammarError, GrammarErrorContent, Session};
use crate::grammar::Location;
use std::collections::HashMap;

/// Report rules declared more than once
///
/// The first declaration wins, every later one is reported.
pub fn report_duplicate_rules(session: &mut Session) -> Result<(), CompileError> {
    let mut seen: HashMap<&str, Location> = HashMap::new();
    let mut errors = vec![];

    for rule in &session.grammar().rules {
        match seen.get(rule.name.as_str()) {
            Some(original) => errors.push(
                GrammarError::new(
                    Some(rule.name_location),
                    GrammarErrorContent::DuplicateRule(rule.name.clone()),
                )
                .with_note("original rule location", *original),
            ),
            None => {
                seen.insert(&rule.name, rule.name_location);
            }
        }
    }

    for err in errors {
        session.error(err);
    }

    Ok(())
}
