use crate::grammar::{ClassPart, Location};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Constants referenced by the bytecode through their index
///
/// Every table is deduplicated: adding a constant twice returns the index of the first insertion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstTables {
    literals: IndexSet<String>,
    classes: IndexSet<ClassConst>,
    expectations: IndexSet<Expectation>,
    functions: IndexMap<FunctionConst, Location>,
}

impl ConstTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a literal (already lowercased for case-insensitive matches)
    pub fn add_literal(&mut self, literal: &str) -> usize {
        match self.literals.get_index_of(literal) {
            Some(index) => index,
            None => self.literals.insert_full(literal.to_string()).0,
        }
    }

    pub fn add_class(&mut self, class: ClassConst) -> usize {
        self.classes.insert_full(class).0
    }

    pub fn add_expectation(&mut self, expectation: Expectation) -> usize {
        self.expectations.insert_full(expectation).0
    }

    /// Intern a code block, remembering the location of its first occurrence
    pub fn add_function(&mut self, function: FunctionConst, location: Location) -> usize {
        match self.functions.get_index_of(&function) {
            Some(index) => index,
            None => self.functions.insert_full(function, location).0,
        }
    }

    pub fn literal(&self, index: usize) -> Option<&str> {
        self.literals.get_index(index).map(String::as_str)
    }

    pub fn class(&self, index: usize) -> Option<&ClassConst> {
        self.classes.get_index(index)
    }

    pub fn expectation(&self, index: usize) -> Option<&Expectation> {
        self.expectations.get_index(index)
    }

    pub fn function(&self, index: usize) -> Option<(&FunctionConst, &Location)> {
        self.functions.get_index(index)
    }

    pub fn literals(&self) -> impl Iterator<Item = &str> {
        self.literals.iter().map(String::as_str)
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassConst> {
        self.classes.iter()
    }

    pub fn expectations(&self) -> impl Iterator<Item = &Expectation> {
        self.expectations.iter()
    }

    pub fn functions(&self) -> impl Iterator<Item = (&FunctionConst, &Location)> {
        self.functions.iter()
    }
}

/// Character class, as matched by the bytecode
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassConst {
    pub parts: Vec<ClassPart>,
    pub inverted: bool,
    pub ignore_case: bool,
}

impl ClassConst {
    /// Check if a character is matched by the class
    pub fn matches(&self, c: char) -> bool {
        let in_parts = |c: char| self.parts.iter().any(|part| part.contains(c));

        let found = if self.ignore_case {
            in_parts(c) || c.to_lowercase().any(in_parts) || c.to_uppercase().any(in_parts)
        } else {
            in_parts(c)
        };

        found != self.inverted
    }
}

/// Something the parser expected to find when a match failed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expectation {
    Literal { value: String, ignore_case: bool },
    Class {
        parts: Vec<ClassPart>,
        inverted: bool,
        ignore_case: bool,
    },
    Any,
    /// Display name of a named rule
    Rule { name: String },
    End,
}

impl Expectation {
    /// Get the human-readable description used in syntax error messages
    pub fn describe(&self) -> String {
        match self {
            Self::Literal { value, .. } => format!("\"{}\"", escape_literal(value)),
            Self::Class {
                parts, inverted, ..
            } => {
                let parts = parts
                    .iter()
                    .map(|part| match *part {
                        ClassPart::Char(c) => escape_class(c),
                        ClassPart::Range(from, to) => {
                            format!("{}-{}", escape_class(from), escape_class(to))
                        }
                    })
                    .collect::<String>();

                format!("[{}{}]", if *inverted { "^" } else { "" }, parts)
            }
            Self::Any => "any character".to_string(),
            Self::Rule { name } => name.clone(),
            Self::End => "end of input".to_string(),
        }
    }
}

/// Code block called by the bytecode (action or semantic predicate)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionConst {
    /// Predicates return a boolean, actions a value
    pub predicate: bool,

    /// Labels visible from the code block, in argument order
    pub params: Vec<String>,

    pub body: String,
}

/// Escape a string to display it between double quotes
pub fn escape_literal(input: &str) -> String {
    input.chars().map(|c| escape_char(c, false)).collect()
}

fn escape_class(c: char) -> String {
    escape_char(c, true)
}

fn escape_char(c: char, in_class: bool) -> String {
    match c {
        '\\' => "\\\\".to_string(),
        '"' if !in_class => "\\\"".to_string(),
        ']' | '^' | '-' if in_class => format!("\\{}", c),
        '\0' => "\\0".to_string(),
        '\t' => "\\t".to_string(),
        '\n' => "\\n".to_string(),
        '\r' => "\\r".to_string(),
        '\u{0}'..='\u{1F}' | '\u{7F}'..='\u{9F}' => format!("\\x{:02X}", c as u32),
        _ => c.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_deduplicated() {
        let mut tables = ConstTables::new();

        assert_eq!(tables.add_literal("a"), 0);
        assert_eq!(tables.add_literal("b"), 1);
        assert_eq!(tables.add_literal("a"), 0);

        let function = FunctionConst {
            predicate: false,
            params: vec!["x".to_string()],
            body: "x".to_string(),
        };
        assert_eq!(tables.add_function(function.clone(), Location::default()), 0);
        assert_eq!(tables.add_function(function, Location::default()), 0);
        assert_eq!(tables.functions().count(), 1);
    }

    #[test]
    fn descriptions() {
        let class = Expectation::Class {
            parts: vec![ClassPart::Range('a', 'z'), ClassPart::Char('-')],
            inverted: true,
            ignore_case: false,
        };

        assert_eq!(class.describe(), "[^a-z\\-]");
        assert_eq!(
            Expectation::Literal {
                value: "say \"hi\"\n".to_string(),
                ignore_case: false
            }
            .describe(),
            "\"say \\\"hi\\\"\\n\""
        );
        assert_eq!(Expectation::Any.describe(), "any character");
        assert_eq!(Expectation::End.describe(), "end of input");
    }

    #[test]
    fn class_matching() {
        let class = ClassConst {
            parts: vec![ClassPart::Range('a', 'c')],
            inverted: false,
            ignore_case: true,
        };

        assert!(class.matches('b'));
        assert!(class.matches('B'));
        assert!(!class.matches('d'));

        let inverted = ClassConst {
            inverted: true,
            ..class
        };
        assert!(inverted.matches('d'));
    }
}
