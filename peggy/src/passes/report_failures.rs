use crate::compiler::{CompileError, Session};
use crate::grammar::*;
use indexmap::IndexMap;

/// Collects the rules referenced outside of named expressions
struct ReportedRefs<'g>(Vec<&'g str>);

impl<'g> Visitor<'g> for ReportedRefs<'g> {
    fn visit_rule_ref(&mut self, _expr: &'g Expression, name: &'g str) {
        self.0.push(name);
    }

    // Failures inside a named expression are replaced by the name itself
    fn visit_named(&mut self, _expr: &'g Expression, _name: &'g str, _inner: &'g Expression) {}
}

/// Compute which rules record their failures for syntax error messages
///
/// Start rules do, as well as every rule they reference outside of a named expression (transitively).
/// With the `trace` option, every rule does.
pub fn calc_report_failures(session: &mut Session) -> Result<(), CompileError> {
    let grammar = session.grammar();
    let options = session.options();

    let mut flags: IndexMap<String, bool> = grammar
        .rules
        .iter()
        .map(|rule| (rule.name.clone(), options.trace))
        .collect();

    if !options.trace {
        let mut pending: Vec<&Rule> = vec![];

        for name in &options.allowed_start_rules {
            if let Some(rule) = grammar.find_rule(name) {
                flags.insert(rule.name.clone(), true);
                pending.push(rule);
            }
        }

        while let Some(rule) = pending.pop() {
            let mut refs = ReportedRefs(vec![]);
            refs.visit_expression(&rule.expression);

            for name in refs.0 {
                if let Some(flag) = flags.get_mut(name) {
                    if !*flag {
                        *flag = true;

                        if let Some(referenced) = grammar.find_rule(name) {
                            pending.push(referenced);
                        }
                    }
                }
            }
        }
    }

    session.set_report_failures(flags);
    Ok(())
}
