use super::errors::CompileError;
use crate::grammar::Grammar;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Options of a compilation
///
/// Can be deserialized from any serde format, using camelCase keys (`allowedStartRules`, `exportVar`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompileOptions {
    /// Rules parsing can start from (defaults to the grammar's first rule)
    pub allowed_start_rules: Vec<String>,

    /// Memoize rule results in the generated parser
    pub cache: bool,

    /// Items imported by the generated source (`use <path> as <name>;`)
    pub dependencies: IndexMap<String, String>,

    /// Name of the module wrapping the generated source (module format only)
    pub export_var: Option<String>,

    /// Shape of the generated source
    pub format: Format,

    /// Comment lines put at the top of the generated source
    pub header: Option<Header>,

    /// Optimize the generated source for size or for speed
    pub optimize: Optimize,

    /// Kind of artifact the compilation returns
    pub output: OutputKind,

    /// Make rules report tracing events
    pub trace: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            allowed_start_rules: vec![],
            cache: false,
            dependencies: IndexMap::new(),
            export_var: None,
            format: Format::Bare,
            header: None,
            optimize: Optimize::Speed,
            output: OutputKind::Parser,
            trace: false,
        }
    }
}

impl CompileOptions {
    /// Create a new set of options
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize the options against the grammar they'll be used for
    ///
    /// Fills the default start rule and rejects combinations the passes can't work with.
    /// Start rules existence is validated by the undefined rules check.
    pub fn normalize(mut self, grammar: &Grammar) -> Result<Self, CompileError> {
        if self.allowed_start_rules.is_empty() {
            let first = grammar.rules.first().ok_or_else(|| {
                CompileError::InvalidOptions("grammar must have at least one rule".to_string())
            })?;

            self.allowed_start_rules.push(first.name.clone());
        }

        if self.format == Format::Bare {
            if let Some(export_var) = &self.export_var {
                return Err(CompileError::InvalidOptions(format!(
                    "export variable '{}' can't be used with the bare format",
                    export_var
                )));
            }

            if !self.dependencies.is_empty() {
                return Err(CompileError::InvalidOptions(
                    "dependencies can't be used with the bare format".to_string(),
                ));
            }
        }

        if let Some(export_var) = &self.export_var {
            if !is_identifier(export_var) {
                return Err(CompileError::InvalidOptions(format!(
                    "export variable '{}' is not a valid identifier",
                    export_var
                )));
            }
        }

        for (name, path) in &self.dependencies {
            if !is_identifier(name) || path.trim().is_empty() {
                return Err(CompileError::InvalidOptions(format!(
                    "invalid dependency '{}' = '{}'",
                    name, path
                )));
            }
        }

        Ok(self)
    }

    /// Name of the module wrapping the generated source
    pub fn module_name(&self) -> &str {
        self.export_var.as_deref().unwrap_or("parser")
    }
}

/// Shape of the generated source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Items at the top level, to be included in an existing module
    Bare,

    /// Items wrapped in a `pub mod` named after the export variable
    Module,
}

/// Optimization target of the generated source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Optimize {
    /// Embed the bytecode and a single interpreter
    Size,

    /// Lower each rule to a dedicated function
    Speed,
}

/// Kind of artifact returned by a compilation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// A ready-to-use [`crate::runtime::Parser`]
    Parser,

    /// Generated Rust source
    Source,
}

/// Header of the generated source, as a single string or as a list of lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Header {
    Single(String),
    Lines(Vec<String>),
}

impl Header {
    /// Get the header's lines
    pub fn lines(&self) -> Vec<&str> {
        match self {
            Self::Single(header) => header.lines().collect(),
            Self::Lines(lines) => lines.iter().flat_map(|line| line.lines()).collect(),
        }
    }
}

/// Check if a string is a valid Rust path segment
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();

    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }

    name != "_" && chars.all(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Expression, Rule};

    fn grammar() -> Grammar {
        Grammar::new(vec![
            Rule::new("start", Expression::literal("a")),
            Rule::new("other", Expression::literal("b")),
        ])
    }

    #[test]
    fn first_rule_is_the_default_start_rule() {
        let options = CompileOptions::new().normalize(&grammar()).unwrap();
        assert_eq!(options.allowed_start_rules, vec!["start".to_string()]);
    }

    #[test]
    fn empty_grammars_are_rejected() {
        let err = CompileOptions::new()
            .normalize(&Grammar::new(vec![]))
            .unwrap_err();

        assert!(matches!(err, CompileError::InvalidOptions(_)));
    }

    #[test]
    fn bare_format_has_no_export_var() {
        let options = CompileOptions {
            export_var: Some("calc".to_string()),
            ..CompileOptions::default()
        };

        assert!(options.clone().normalize(&grammar()).is_err());

        let options = CompileOptions {
            format: Format::Module,
            ..options
        };
        assert_eq!(options.normalize(&grammar()).unwrap().module_name(), "calc");
    }

    #[test]
    fn deserializes_camel_case_keys() {
        let options: CompileOptions = serde_json::from_str(
            r#"{
                "allowedStartRules": ["other"],
                "format": "module",
                "exportVar": "calc",
                "header": ["first", "second"],
                "optimize": "size",
                "output": "source",
                "dependencies": { "helpers": "crate::helpers" }
            }"#,
        )
        .unwrap();

        assert_eq!(options.allowed_start_rules, vec!["other".to_string()]);
        assert_eq!(options.optimize, Optimize::Size);
        assert_eq!(options.output, OutputKind::Source);
        assert_eq!(options.header.unwrap().lines(), vec!["first", "second"]);
        assert!(!options.cache);
    }
}
