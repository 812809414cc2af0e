use super::data::*;
use std::collections::HashMap;

/// Per-rule state of the consumption analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleConsumption {
    /// The rule is being evaluated (we are inside a reference cycle)
    InProgress,

    /// The rule was evaluated
    Known(bool),
}

/// Computes whether expressions always advance the input on success
///
/// Results are memoized per rule, so a single analysis should be reused when checking many
/// expressions of the same grammar.
pub struct ConsumptionAnalysis<'g> {
    grammar: &'g Grammar,
    rules: HashMap<&'g str, RuleConsumption>,
}

impl<'g> ConsumptionAnalysis<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self {
            grammar,
            rules: HashMap::new(),
        }
    }

    /// Create an analysis reusing the consumption already computed for some rules
    pub fn with_known_rules(
        grammar: &'g Grammar,
        known: impl IntoIterator<Item = (&'g str, bool)>,
    ) -> Self {
        Self {
            grammar,
            rules: known
                .into_iter()
                .map(|(name, consumes)| (name, RuleConsumption::Known(consumes)))
                .collect(),
        }
    }

    /// Check if a rule always consumes input when it matches
    ///
    /// Undefined rules are considered as non-consuming.
    pub fn rule_always_consumes(&mut self, name: &str) -> bool {
        let rule = match self.grammar.find_rule(name) {
            Some(rule) => rule,
            None => return false,
        };

        match self.rules.get(rule.name.as_str()) {
            Some(RuleConsumption::Known(consumes)) => return *consumes,
            // Unresolved cycle
            Some(RuleConsumption::InProgress) => return false,
            None => {}
        }

        self.rules.insert(&rule.name, RuleConsumption::InProgress);
        let consumes = self.always_consumes_on_success(&rule.expression);
        self.rules.insert(&rule.name, RuleConsumption::Known(consumes));

        consumes
    }

    /// Check if an expression always consumes input when it matches
    pub fn always_consumes_on_success(&mut self, expr: &Expression) -> bool {
        match &expr.kind {
            ExpressionKind::Literal { value, .. } => !value.is_empty(),
            ExpressionKind::Class { .. } | ExpressionKind::Any => true,

            ExpressionKind::RuleRef { name } => self.rule_always_consumes(name),

            ExpressionKind::SemanticPredicate { .. } => false,

            ExpressionKind::Suffixed {
                operator,
                expression,
            } => match operator {
                SuffixOperator::Optional | SuffixOperator::ZeroOrMore => false,
                SuffixOperator::OneOrMore => self.always_consumes_on_success(expression),
            },

            ExpressionKind::Prefixed {
                operator,
                expression,
            } => match operator {
                // `$e` matches exactly what `e` matches
                PrefixOperator::Text => self.always_consumes_on_success(expression),
                PrefixOperator::SimpleAnd | PrefixOperator::SimpleNot => false,
            },

            ExpressionKind::Group { expression }
            | ExpressionKind::Labeled { expression, .. }
            | ExpressionKind::Action { expression, .. }
            | ExpressionKind::Named { expression, .. } => {
                self.always_consumes_on_success(expression)
            }

            ExpressionKind::Sequence { elements } => elements
                .iter()
                .any(|element| self.always_consumes_on_success(element)),

            ExpressionKind::Choice { alternatives } => alternatives
                .iter()
                .all(|alternative| self.always_consumes_on_success(alternative)),
        }
    }
}
