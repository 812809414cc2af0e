use crate::compiler::CompileError;
use crate::grammar::Location;
use proc_macro2::{Ident, Literal, Span, TokenStream};
use quote::{format_ident, quote};

/// Lints disabled on every generated item
pub fn no_linting() -> TokenStream {
    quote! {
        #[allow(dead_code)]
        #[allow(unused_variables, unused_mut, unused_parens, unused_braces, unreachable_code)]
        #[allow(non_snake_case, non_camel_case_types)]
        #[allow(clippy::all)]
    }
}

/// Make an identifier from a grammar name (labels, export variables, dependencies)
pub fn make_safe_ident(ident: &str) -> Ident {
    let mut name: String = ident
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    if name.is_empty() || name.starts_with(|c: char| c.is_numeric()) {
        name.insert(0, '_');
    }

    match name.as_str() {
        // Can't be raw identifiers
        "self" | "Self" | "super" | "crate" | "_" => format_ident!("{}_", name),
        _ if RUST_RESERVED_KEYWORDS.contains(&name.as_str()) => Ident::new_raw(&name, Span::call_site()),
        _ => format_ident!("{}", name),
    }
}

pub static RUST_RESERVED_KEYWORDS: &[&str] = &[
    "as", "break", "const", "continue", "crate", "else", "enum", "extern", "false", "fn", "for",
    "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return",
    "self", "Self", "static", "struct", "super", "trait", "true", "type", "unsafe", "use", "where",
    "while", "async", "await", "dyn", "abstract", "become", "box", "do", "final", "macro",
    "override", "priv", "typeof", "unsized", "virtual", "yield", "try", "union",
];

/// Tokenize a code block of the grammar
pub fn parse_code(code: &str, location: Location) -> Result<TokenStream, CompileError> {
    code.parse::<TokenStream>()
        .map_err(|err| CompileError::InvalidCode {
            code: code.to_string(),
            location,
            reason: err.to_string(),
        })
}

/// Unsuffixed integer literal, for indices
pub fn index(value: usize) -> Literal {
    Literal::usize_unsuffixed(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_sanitized() {
        assert_eq!(make_safe_ident("value").to_string(), "value");
        assert_eq!(make_safe_ident("type").to_string(), "r#type");
        assert_eq!(make_safe_ident("self").to_string(), "self_");
        assert_eq!(make_safe_ident("$item").to_string(), "_item");
        assert_eq!(make_safe_ident("2nd").to_string(), "_2nd");
    }

    #[test]
    fn invalid_code_is_reported() {
        assert!(parse_code("return a + b;", Location::default()).is_ok());

        let err = parse_code("\"unterminated", Location::default()).unwrap_err();
        assert!(matches!(err, CompileError::InvalidCode { .. }));
    }
}
