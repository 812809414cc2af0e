use super::errors::GrammarError;

/// Format in a human-readable way a grammar error, against the grammar's source
pub fn pretty_format_grammar_err(input: &str, err: &GrammarError) -> String {
    let location = match err.location() {
        Some(location) => location,
        None => return format!("ERROR: {}", err),
    };

    let line = location.start.line.max(1);
    let col = location.start.column.max(1);

    let padding = " ".repeat(col - 1 + line.to_string().len() + 3);

    let notes = err
        .notes()
        .iter()
        .map(|note| {
            format!(
                "\n{}Note: {} (line {}, column {})",
                padding, note.message, note.location.start.line, note.location.start.column
            )
        })
        .collect::<String>();

    format!(
        "ERROR: At line {}, column {}:\n\n{} | {}\n{}{}\n{}{}{}",
        line,
        col,
        line,
        input.lines().nth(line - 1).unwrap_or(""),
        padding,
        "^".repeat(location.len().max(1)),
        padding,
        err,
        notes
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::GrammarErrorContent;
    use crate::grammar::{Location, Position};

    #[test]
    fn points_at_the_offending_span() {
        let source = "start = a\nb = \"x\"";
        let err = GrammarError::new(
            Some(Location::new(Position::new(8, 1, 9), Position::new(9, 1, 10))),
            GrammarErrorContent::UndefinedRule("a".to_string()),
        );

        assert_eq!(
            pretty_format_grammar_err(source, &err),
            "ERROR: At line 1, column 9:\n\n1 | start = a\n            ^\n            rule 'a' is not defined"
        );
    }

    #[test]
    fn errors_without_location() {
        let err = GrammarError::new(None, GrammarErrorContent::UndefinedStartRule("s".to_string()));
        assert_eq!(
            pretty_format_grammar_err("", &err),
            "ERROR: start rule 's' is not defined"
        );
    }
}
