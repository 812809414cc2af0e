use crate::compiler::{CompileError, Session};
use crate::grammar::*;
use tracing::debug;

/// Rename the references to a rule
struct RenameRefs<'a> {
    from: &'a str,
    to: &'a str,
}

impl<'a> VisitorMut for RenameRefs<'a> {
    fn visit_rule_ref_mut(&mut self, name: &mut String, _location: &Location) {
        if name.as_str() == self.from {
            *name = self.to.to_string();
        }
    }
}

/// Remove rules whose whole expression is a reference to another rule
///
/// References to a proxy rule are redirected to its target, and the proxy itself is removed unless
/// it is an allowed start rule.
pub fn remove_proxy_rules(session: &mut Session) -> Result<(), CompileError> {
    let start_rules = session.options().allowed_start_rules.clone();
    let grammar = session.grammar_mut();

    let mut removed = vec![];

    for i in 0..grammar.rules.len() {
        let (proxy, target) = match grammar.rules[i].expression.as_rule_ref() {
            Some(target) if target != grammar.rules[i].name => {
                (grammar.rules[i].name.clone(), target.to_string())
            }
            _ => continue,
        };

        RenameRefs {
            from: &proxy,
            to: &target,
        }
        .visit_grammar_mut(grammar);

        if !start_rules.contains(&proxy) {
            debug!(proxy = %proxy, target = %target, "removing proxy rule");
            removed.push(i);
        }
    }

    for i in removed.into_iter().rev() {
        grammar.rules.remove(i);
    }

    Ok(())
}
