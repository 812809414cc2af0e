use super::data::SourceSpan;
use crate::bytecode::{escape_literal, Expectation};
use thiserror::Error;

/// Error raised when an input doesn't match the grammar
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SyntaxError {
    /// Human-readable message (`Expected "a" or [0-9] but "x" found.`)
    pub message: String,

    /// What was expected at the furthest position parsing reached, sorted by description
    pub expected: Vec<Expectation>,

    /// Character found at that position (`None` at the end of the input)
    pub found: Option<String>,

    pub location: SourceSpan,
}

impl SyntaxError {
    /// Build the error for the furthest failure position
    pub(crate) fn new(input: &str, offset: usize, mut expected: Vec<Expectation>) -> Self {
        expected.sort_by_cached_key(Expectation::describe);
        expected.dedup_by_key(|expectation| expectation.describe());

        let found = input.get(offset..).and_then(|rest| rest.chars().next());
        let end = offset + found.map_or(0, char::len_utf8);

        Self {
            message: build_message(&expected, found),
            expected,
            found: found.map(String::from),
            location: SourceSpan::new(input, offset..end),
        }
    }

    /// Format the error with the offending line of the input
    pub fn format(&self, input: &str) -> String {
        let start = self.location.start;
        let line = input.lines().nth(start.line - 1).unwrap_or("");

        format!(
            "ERROR: At line {}, column {}:\n\n{} | {}\n{}^\n\n{}",
            start.line,
            start.column,
            start.line,
            line,
            " ".repeat(start.column - 1 + start.line.to_string().len() + 3),
            self.message
        )
    }
}

fn build_message(expected: &[Expectation], found: Option<char>) -> String {
    let found = match found {
        Some(c) => format!("\"{}\"", escape_literal(&c.to_string())),
        None => "end of input".to_string(),
    };

    let descriptions: Vec<String> = expected.iter().map(Expectation::describe).collect();

    let expected = match descriptions.as_slice() {
        [] => return format!("Unexpected {}.", found),
        [single] => single.clone(),
        [first, second] => format!("{} or {}", first, second),
        [init @ .., last] => format!("{}, or {}", init.join(", "), last),
    };

    format!("Expected {} but {} found.", expected, found)
}

/// Error returned by [`Parser::parse`](super::Parser::parse)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("Can't start parsing from rule \"{0}\".")]
    UnknownStartRule(String),

    /// A semantic predicate was reached without a handler bound to its code
    #[error("no handler is bound to the semantic predicate {{{code}}}")]
    UnboundPredicate { code: String },

    /// The parser's bytecode is malformed
    #[error("invalid bytecode: {0}")]
    InvalidBytecode(String),
}

impl ParseError {
    /// Get the syntax error, if the input didn't match
    pub fn syntax(&self) -> Option<&SyntaxError> {
        match self {
            Self::Syntax(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(value: &str) -> Expectation {
        Expectation::Literal {
            value: value.to_string(),
            ignore_case: false,
        }
    }

    #[test]
    fn expectations_are_sorted_and_deduplicated() {
        let err = SyntaxError::new(
            "x",
            0,
            vec![literal("b"), Expectation::Any, literal("a"), literal("b")],
        );

        assert_eq!(err.expected.len(), 3);
        assert_eq!(
            err.message,
            "Expected \"a\", \"b\", or any character but \"x\" found."
        );
        assert_eq!(err.location.end.offset, 1);
    }

    #[test]
    fn end_of_input() {
        let err = SyntaxError::new("ab", 2, vec![literal("c"), Expectation::End]);

        assert_eq!(err.message, "Expected \"c\" or end of input but end of input found.");
        assert_eq!(err.found, None);
        assert_eq!(err.location.start, err.location.end);
    }

    #[test]
    fn formatting_points_at_the_failure() {
        let input = "12\n3x4";
        let err = SyntaxError::new(input, 4, vec![Expectation::End]);

        assert_eq!(
            err.format(input),
            "ERROR: At line 2, column 2:\n\n2 | 3x4\n     ^\n\nExpected end of input but \"x\" found."
        );
    }
}
