//! Dispatch-by-kind traversal shared by every compiler pass
//!
//! A pass implements [`Visitor`] (or [`VisitorMut`] to rewrite the tree in place) and only overrides
//! the methods of the node kinds it is interested in. Every other method falls back to the matching
//! `walk_*` function, which visits the node's children with the same dispatch.

use super::data::*;

/// Read-only visitor
pub trait Visitor<'g>: Sized {
    fn visit_grammar(&mut self, grammar: &'g Grammar) {
        walk_grammar(self, grammar)
    }

    fn visit_rule(&mut self, rule: &'g Rule) {
        walk_rule(self, rule)
    }

    /// Entry point for any expression, dispatches to the kind-specific methods below
    fn visit_expression(&mut self, expr: &'g Expression) {
        walk_expression(self, expr)
    }

    fn visit_literal(&mut self, _expr: &'g Expression, _value: &'g str, _ignore_case: bool) {}

    fn visit_class(&mut self, _expr: &'g Expression, _parts: &'g [ClassPart], _inverted: bool) {}

    fn visit_any(&mut self, _expr: &'g Expression) {}

    fn visit_rule_ref(&mut self, _expr: &'g Expression, _name: &'g str) {}

    fn visit_semantic_predicate(
        &mut self,
        _expr: &'g Expression,
        _operator: PredicateOperator,
        _code: &'g str,
    ) {
    }

    fn visit_group(&mut self, _expr: &'g Expression, inner: &'g Expression) {
        self.visit_expression(inner)
    }

    fn visit_suffixed(&mut self, _expr: &'g Expression, _operator: SuffixOperator, inner: &'g Expression) {
        self.visit_expression(inner)
    }

    fn visit_prefixed(&mut self, _expr: &'g Expression, _operator: PrefixOperator, inner: &'g Expression) {
        self.visit_expression(inner)
    }

    fn visit_labeled(&mut self, _expr: &'g Expression, _label: Option<&'g str>, inner: &'g Expression) {
        self.visit_expression(inner)
    }

    fn visit_sequence(&mut self, _expr: &'g Expression, elements: &'g [Expression]) {
        for element in elements {
            self.visit_expression(element);
        }
    }

    fn visit_action(&mut self, _expr: &'g Expression, inner: &'g Expression, _code: &'g str) {
        self.visit_expression(inner)
    }

    fn visit_choice(&mut self, _expr: &'g Expression, alternatives: &'g [Expression]) {
        for alternative in alternatives {
            self.visit_expression(alternative);
        }
    }

    fn visit_named(&mut self, _expr: &'g Expression, _name: &'g str, inner: &'g Expression) {
        self.visit_expression(inner)
    }
}

/// Visit all rules of a grammar
pub fn walk_grammar<'g, V: Visitor<'g>>(visitor: &mut V, grammar: &'g Grammar) {
    for rule in &grammar.rules {
        visitor.visit_rule(rule);
    }
}

/// Visit a rule's expression
pub fn walk_rule<'g, V: Visitor<'g>>(visitor: &mut V, rule: &'g Rule) {
    visitor.visit_expression(&rule.expression)
}

/// Dispatch an expression to the visitor method of its kind
pub fn walk_expression<'g, V: Visitor<'g>>(visitor: &mut V, expr: &'g Expression) {
    match &expr.kind {
        ExpressionKind::Literal { value, ignore_case } => {
            visitor.visit_literal(expr, value, *ignore_case)
        }
        ExpressionKind::Class {
            parts, inverted, ..
        } => visitor.visit_class(expr, parts, *inverted),
        ExpressionKind::Any => visitor.visit_any(expr),
        ExpressionKind::RuleRef { name } => visitor.visit_rule_ref(expr, name),
        ExpressionKind::SemanticPredicate { operator, code } => {
            visitor.visit_semantic_predicate(expr, *operator, code)
        }
        ExpressionKind::Group { expression } => visitor.visit_group(expr, expression),
        ExpressionKind::Suffixed {
            operator,
            expression,
        } => visitor.visit_suffixed(expr, *operator, expression),
        ExpressionKind::Prefixed {
            operator,
            expression,
        } => visitor.visit_prefixed(expr, *operator, expression),
        ExpressionKind::Labeled {
            label, expression, ..
        } => visitor.visit_labeled(expr, label.as_deref(), expression),
        ExpressionKind::Sequence { elements } => visitor.visit_sequence(expr, elements),
        ExpressionKind::Action { expression, code } => {
            visitor.visit_action(expr, expression, code)
        }
        ExpressionKind::Choice { alternatives } => visitor.visit_choice(expr, alternatives),
        ExpressionKind::Named { name, expression } => visitor.visit_named(expr, name, expression),
    }
}

/// Visitor rewriting the tree in place
///
/// Only rule references are exposed directly, as they are the only nodes transform passes rewrite
/// without replacing a whole subtree; other rewrites override [`VisitorMut::visit_expression_mut`].
pub trait VisitorMut: Sized {
    fn visit_grammar_mut(&mut self, grammar: &mut Grammar) {
        walk_grammar_mut(self, grammar)
    }

    fn visit_rule_mut(&mut self, rule: &mut Rule) {
        self.visit_expression_mut(&mut rule.expression)
    }

    fn visit_expression_mut(&mut self, expr: &mut Expression) {
        walk_expression_mut(self, expr)
    }

    fn visit_rule_ref_mut(&mut self, _name: &mut String, _location: &Location) {}
}

/// Visit all rules of a grammar, mutably
pub fn walk_grammar_mut<V: VisitorMut>(visitor: &mut V, grammar: &mut Grammar) {
    for rule in grammar.rules.iter_mut() {
        visitor.visit_rule_mut(rule);
    }
}

/// Visit the children of an expression, mutably
pub fn walk_expression_mut<V: VisitorMut>(visitor: &mut V, expr: &mut Expression) {
    let location = expr.location;

    match &mut expr.kind {
        ExpressionKind::Literal { .. }
        | ExpressionKind::Class { .. }
        | ExpressionKind::Any
        | ExpressionKind::SemanticPredicate { .. } => {}

        ExpressionKind::RuleRef { name } => visitor.visit_rule_ref_mut(name, &location),

        ExpressionKind::Group { expression }
        | ExpressionKind::Suffixed { expression, .. }
        | ExpressionKind::Prefixed { expression, .. }
        | ExpressionKind::Labeled { expression, .. }
        | ExpressionKind::Action { expression, .. }
        | ExpressionKind::Named { expression, .. } => visitor.visit_expression_mut(expression),

        ExpressionKind::Sequence { elements: children }
        | ExpressionKind::Choice {
            alternatives: children,
        } => {
            for child in children.iter_mut() {
                visitor.visit_expression_mut(child);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RefCollector<'g>(Vec<&'g str>);

    impl<'g> Visitor<'g> for RefCollector<'g> {
        fn visit_rule_ref(&mut self, _expr: &'g Expression, name: &'g str) {
            self.0.push(name);
        }
    }

    struct Renamer;

    impl VisitorMut for Renamer {
        fn visit_rule_ref_mut(&mut self, name: &mut String, _location: &Location) {
            name.make_ascii_uppercase();
        }
    }

    fn sample() -> Grammar {
        Grammar::new(vec![
            Rule::new(
                "start",
                Expression::choice(vec![
                    Expression::sequence(vec![
                        Expression::labeled("a", Expression::rule_ref("a")),
                        Expression::zero_or_more(Expression::rule_ref("b")),
                    ]),
                    Expression::simple_not(Expression::group(Expression::rule_ref("c"))),
                ]),
            ),
            Rule::new("a", Expression::action(Expression::rule_ref("d"), "x")),
        ])
    }

    #[test]
    fn default_methods_reach_every_reference() {
        let grammar = sample();
        let mut collector = RefCollector(vec![]);
        collector.visit_grammar(&grammar);

        assert_eq!(collector.0, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn mutable_visitor_rewrites_in_place() {
        let mut grammar = sample();
        Renamer.visit_grammar_mut(&mut grammar);

        let mut collector = RefCollector(vec![]);
        collector.visit_grammar(&grammar);

        assert_eq!(collector.0, vec!["A", "B", "C", "D"]);
    }
}
