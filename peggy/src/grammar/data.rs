use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Position in the grammar source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Byte offset from the beginning of the source
    pub offset: usize,

    /// Line number (starts at 1)
    pub line: usize,

    /// Column number (starts at 1)
    pub column: usize,
}

impl Position {
    /// Create a new position
    pub fn new(offset: usize, line: usize, column: usize) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }
}

/// Span in the grammar source, used to point diagnostics at a grammar construct
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub start: Position,
    pub end: Position,
}

impl Location {
    /// Create a new location
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Length of the span, in bytes
    pub fn len(&self) -> usize {
        self.end.offset.saturating_sub(self.start.offset)
    }

    /// Is the span empty?
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.start.line, self.start.column)
    }
}

/// A complete grammar, root of the syntax tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grammar {
    /// Code run once before parsing
    #[serde(default)]
    pub initializer: Option<CodeBlock>,

    /// Rules, in declaration order
    pub rules: Vec<Rule>,

    /// Comments found in the source, keyed by their offset
    #[serde(default)]
    pub comments: BTreeMap<usize, Comment>,

    /// Location of the whole grammar
    #[serde(default)]
    pub location: Location,
}

impl Grammar {
    /// Create a grammar from a list of rules
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            initializer: None,
            rules,
            comments: BTreeMap::new(),
            location: Location::default(),
        }
    }

    /// Find the first rule declared with the provided name
    pub fn find_rule(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.name == name)
    }

    /// Get the index of the first rule declared with the provided name
    pub fn index_of_rule(&self, name: &str) -> Option<usize> {
        self.rules.iter().position(|rule| rule.name == name)
    }

    /// Check if an expression advances the input on every successful match
    ///
    /// See [`super::ConsumptionAnalysis`] to share the per-rule cache between calls.
    pub fn always_consumes_on_success(&self, expr: &Expression) -> bool {
        super::ConsumptionAnalysis::new(self).always_consumes_on_success(expr)
    }
}

/// A named rule (`name = expression`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,

    #[serde(default)]
    pub name_location: Location,

    pub expression: Expression,

    #[serde(default)]
    pub location: Location,
}

impl Rule {
    /// Create a new rule
    pub fn new(name: impl Into<String>, expression: Expression) -> Self {
        Self {
            name: name.into(),
            name_location: Location::default(),
            expression,
            location: Location::default(),
        }
    }

    /// Set the rule's locations
    pub fn at(mut self, location: Location, name_location: Location) -> Self {
        self.location = location;
        self.name_location = name_location;
        self
    }
}

/// Piece of code embedded in the grammar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub code: String,

    #[serde(default)]
    pub location: Location,
}

/// Comment found in the grammar source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,

    #[serde(default)]
    pub multiline: bool,

    #[serde(default)]
    pub location: Location,
}

/// A single expression node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    #[serde(flatten)]
    pub kind: ExpressionKind,

    #[serde(default)]
    pub location: Location,
}

/// Kind of an [`Expression`], serialized under the `type` discriminant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExpressionKind {
    /// Match a constant string
    Literal {
        value: String,
        #[serde(default)]
        ignore_case: bool,
    },

    /// Match a single character against a set
    Class {
        parts: Vec<ClassPart>,
        #[serde(default)]
        inverted: bool,
        #[serde(default)]
        ignore_case: bool,
    },

    /// Match any single character
    Any,

    /// Match using another rule, resolved by name
    RuleRef { name: String },

    /// Succeed or fail depending on the result of a code block
    SemanticPredicate {
        operator: PredicateOperator,
        code: String,
    },

    /// Parenthesized expression, opening a new label scope
    Group { expression: Box<Expression> },

    /// Repeated or optional expression
    Suffixed {
        operator: SuffixOperator,
        expression: Box<Expression>,
    },

    /// Text capture or lookahead
    Prefixed {
        operator: PrefixOperator,
        expression: Box<Expression>,
    },

    /// Expression whose result is bound to a label (and/or plucked with `@`)
    Labeled {
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        label_location: Option<Location>,
        #[serde(default)]
        pick: bool,
        expression: Box<Expression>,
    },

    /// Suite of expressions, all of which must match in order
    Sequence { elements: Vec<Expression> },

    /// Expression followed by a code block computing the result
    Action {
        expression: Box<Expression>,
        code: String,
    },

    /// Ordered alternatives, the first successful one wins
    Choice { alternatives: Vec<Expression> },

    /// Human-readable name attached to a rule's expression
    Named {
        name: String,
        expression: Box<Expression>,
    },
}

/// Operator of a [semantic predicate](`ExpressionKind::SemanticPredicate`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateOperator {
    And,
    Not,
}

/// Operator of a [suffixed](`ExpressionKind::Suffixed`) expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuffixOperator {
    /// `?`
    Optional,

    /// `*`
    ZeroOrMore,

    /// `+`
    OneOrMore,
}

impl SuffixOperator {
    /// Get the operator's symbol
    pub fn symbol(self) -> char {
        match self {
            Self::Optional => '?',
            Self::ZeroOrMore => '*',
            Self::OneOrMore => '+',
        }
    }

    /// Does the operator loop over its operand?
    pub fn is_repetition(self) -> bool {
        matches!(self, Self::ZeroOrMore | Self::OneOrMore)
    }
}

/// Operator of a [prefixed](`ExpressionKind::Prefixed`) expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrefixOperator {
    /// `$`
    Text,

    /// `&`
    SimpleAnd,

    /// `!`
    SimpleNot,
}

/// Part of a character class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassPart {
    Char(char),
    Range(char, char),
}

impl ClassPart {
    /// Check if a character belongs to this part
    pub fn contains(&self, c: char) -> bool {
        match *self {
            Self::Char(expected) => c == expected,
            Self::Range(from, to) => from <= c && c <= to,
        }
    }
}

impl Expression {
    /// Create an expression of the provided kind with a default location
    pub fn new(kind: ExpressionKind) -> Self {
        Self {
            kind,
            location: Location::default(),
        }
    }

    /// Set the expression's location
    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Self::new(ExpressionKind::Literal {
            value: value.into(),
            ignore_case: false,
        })
    }

    pub fn literal_ic(value: impl Into<String>) -> Self {
        Self::new(ExpressionKind::Literal {
            value: value.into(),
            ignore_case: true,
        })
    }

    pub fn class(parts: Vec<ClassPart>, inverted: bool) -> Self {
        Self::new(ExpressionKind::Class {
            parts,
            inverted,
            ignore_case: false,
        })
    }

    pub fn any() -> Self {
        Self::new(ExpressionKind::Any)
    }

    pub fn rule_ref(name: impl Into<String>) -> Self {
        Self::new(ExpressionKind::RuleRef { name: name.into() })
    }

    pub fn semantic_and(code: impl Into<String>) -> Self {
        Self::new(ExpressionKind::SemanticPredicate {
            operator: PredicateOperator::And,
            code: code.into(),
        })
    }

    pub fn semantic_not(code: impl Into<String>) -> Self {
        Self::new(ExpressionKind::SemanticPredicate {
            operator: PredicateOperator::Not,
            code: code.into(),
        })
    }

    pub fn group(expression: Expression) -> Self {
        Self::new(ExpressionKind::Group {
            expression: Box::new(expression),
        })
    }

    pub fn suffixed(operator: SuffixOperator, expression: Expression) -> Self {
        Self::new(ExpressionKind::Suffixed {
            operator,
            expression: Box::new(expression),
        })
    }

    pub fn optional(expression: Expression) -> Self {
        Self::suffixed(SuffixOperator::Optional, expression)
    }

    pub fn zero_or_more(expression: Expression) -> Self {
        Self::suffixed(SuffixOperator::ZeroOrMore, expression)
    }

    pub fn one_or_more(expression: Expression) -> Self {
        Self::suffixed(SuffixOperator::OneOrMore, expression)
    }

    pub fn prefixed(operator: PrefixOperator, expression: Expression) -> Self {
        Self::new(ExpressionKind::Prefixed {
            operator,
            expression: Box::new(expression),
        })
    }

    pub fn text(expression: Expression) -> Self {
        Self::prefixed(PrefixOperator::Text, expression)
    }

    pub fn simple_and(expression: Expression) -> Self {
        Self::prefixed(PrefixOperator::SimpleAnd, expression)
    }

    pub fn simple_not(expression: Expression) -> Self {
        Self::prefixed(PrefixOperator::SimpleNot, expression)
    }

    pub fn labeled(label: impl Into<String>, expression: Expression) -> Self {
        Self::new(ExpressionKind::Labeled {
            label: Some(label.into()),
            label_location: None,
            pick: false,
            expression: Box::new(expression),
        })
    }

    /// Plucked expression (`@expr` or `@label:expr`)
    pub fn pluck(label: Option<String>, expression: Expression) -> Self {
        Self::new(ExpressionKind::Labeled {
            label,
            label_location: None,
            pick: true,
            expression: Box::new(expression),
        })
    }

    pub fn sequence(elements: Vec<Expression>) -> Self {
        Self::new(ExpressionKind::Sequence { elements })
    }

    pub fn action(expression: Expression, code: impl Into<String>) -> Self {
        Self::new(ExpressionKind::Action {
            expression: Box::new(expression),
            code: code.into(),
        })
    }

    pub fn choice(alternatives: Vec<Expression>) -> Self {
        Self::new(ExpressionKind::Choice { alternatives })
    }

    pub fn named(name: impl Into<String>, expression: Expression) -> Self {
        Self::new(ExpressionKind::Named {
            name: name.into(),
            expression: Box::new(expression),
        })
    }

    /// Get the name of the referenced rule, if this is a rule reference
    pub fn as_rule_ref(&self) -> Option<&str> {
        match &self.kind {
            ExpressionKind::RuleRef { name } => Some(name),
            _ => None,
        }
    }

    /// Get the kind's discriminant, as written in the serialized form
    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            ExpressionKind::Literal { .. } => "literal",
            ExpressionKind::Class { .. } => "class",
            ExpressionKind::Any => "any",
            ExpressionKind::RuleRef { .. } => "rule_ref",
            ExpressionKind::SemanticPredicate { .. } => "semantic_predicate",
            ExpressionKind::Group { .. } => "group",
            ExpressionKind::Suffixed { .. } => "suffixed",
            ExpressionKind::Prefixed { .. } => "prefixed",
            ExpressionKind::Labeled { .. } => "labeled",
            ExpressionKind::Sequence { .. } => "sequence",
            ExpressionKind::Action { .. } => "action",
            ExpressionKind::Choice { .. } => "choice",
            ExpressionKind::Named { .. } => "named",
        }
    }
}
