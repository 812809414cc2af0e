use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::ops::Range;

/// Cell of the interpreter's stack
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Slot {
    /// Marker of a failed match
    Failed,

    /// Saved input position
    Pos(usize),

    Value(Value),
}

impl Slot {
    pub(crate) fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// Position in a parsed input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourcePosition {
    /// Byte offset from the beginning of the input
    pub offset: usize,

    /// Line number (starts at 1)
    pub line: usize,

    /// Column number, in characters (starts at 1)
    pub column: usize,
}

impl SourcePosition {
    /// Compute the line and column of a byte offset in an input
    pub fn at(input: &str, offset: usize) -> Self {
        let offset = offset.min(input.len());
        let mut line = 1;
        let mut column = 1;

        for c in input[..floor_char_boundary(input, offset)].chars() {
            if c == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }

        Self {
            offset,
            line,
            column,
        }
    }
}

/// Span of a parsed input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceSpan {
    pub start: SourcePosition,
    pub end: SourcePosition,
}

impl SourceSpan {
    pub fn new(input: &str, range: Range<usize>) -> Self {
        Self {
            start: SourcePosition::at(input, range.start),
            end: SourcePosition::at(input, range.end),
        }
    }
}

fn floor_char_boundary(input: &str, mut offset: usize) -> usize {
    while !input.is_char_boundary(offset) {
        offset -= 1;
    }

    offset
}

/// Data provided to action and semantic predicate handlers
#[derive(Debug, Clone)]
pub struct ActionContext<'a> {
    pub(crate) input: &'a str,
    pub(crate) range: Range<usize>,
    pub(crate) labels: Vec<(&'a str, Value)>,
}

impl<'a> ActionContext<'a> {
    /// Get the text matched by the expression (always empty for semantic predicates)
    pub fn text(&self) -> &'a str {
        self.input.get(self.range.clone()).unwrap_or("")
    }

    /// Get the byte range matched by the expression
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    /// Get the span matched by the expression
    pub fn location(&self) -> SourceSpan {
        SourceSpan::new(self.input, self.range.clone())
    }

    /// Get the value of a label visible from the code block
    pub fn label(&self, name: &str) -> Option<&Value> {
        self.labels
            .iter()
            .find(|(label, _)| *label == name)
            .map(|(_, value)| value)
    }

    /// Get the values of every visible label, in declaration order
    pub fn labels(&self) -> impl Iterator<Item = (&'a str, &Value)> {
        self.labels.iter().map(|(label, value)| (*label, value))
    }
}

/// Check if a value is truthy (`null`, `false`, `0`, `NaN` and `""` are not)
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(value) => *value,
        Value::Number(number) => number.as_f64().map_or(true, |n| n != 0.0 && !n.is_nan()),
        Value::String(string) => !string.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Match the start of an input against a lowercased literal, case-insensitively
///
/// Input characters are lowercased one at a time, as lowercasing may change the number of characters
/// (`İ` becomes `i̇`). Returns the length in bytes of the matched input.
pub(crate) fn match_ignore_case(input: &str, lowered: &str) -> Option<usize> {
    let mut expected = lowered.chars();
    let mut len = 0;

    while !expected.as_str().is_empty() {
        let c = input.get(len..)?.chars().next()?;

        for lower in c.to_lowercase() {
            if expected.next() != Some(lower) {
                return None;
            }
        }

        len += c.len_utf8();
    }

    Some(len)
}
