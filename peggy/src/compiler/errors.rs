use crate::grammar::Location;
use thiserror::Error;

/// Static error found in a grammar
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{content}")]
pub struct GrammarError {
    location: Option<Location>,
    content: GrammarErrorContent,
    notes: Vec<DiagnosticNote>,
}

impl GrammarError {
    /// Create a new grammar error
    pub fn new(location: Option<Location>, content: GrammarErrorContent) -> Self {
        Self {
            location,
            content,
            notes: vec![],
        }
    }

    /// Attach a note pointing at a related location
    pub fn with_note(mut self, message: impl Into<String>, location: Location) -> Self {
        self.notes.push(DiagnosticNote {
            message: message.into(),
            location,
        });
        self
    }

    /// Get the location of the error, if any
    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    /// Get the error's content
    pub fn content(&self) -> &GrammarErrorContent {
        &self.content
    }

    /// Get the human-readable message of the error
    pub fn message(&self) -> String {
        self.content.to_string()
    }

    /// Get the notes attached to the error
    pub fn notes(&self) -> &[DiagnosticNote] {
        &self.notes
    }
}

/// Secondary location attached to a [`GrammarError`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticNote {
    pub message: String,
    pub location: Location,
}

/// Content of a [`GrammarError`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarErrorContent {
    #[error("rule '{0}' is not defined")]
    UndefinedRule(String),

    #[error("start rule '{0}' is not defined")]
    UndefinedStartRule(String),

    #[error("rule '{0}' is already defined")]
    DuplicateRule(String),

    #[error("label '{0}' is already defined")]
    DuplicateLabel(String),

    #[error("possible infinite loop when parsing (left recursion: {})", .0.join(" -> "))]
    InfiniteRecursion(Vec<String>),

    #[error("possible infinite loop when parsing (repetition used with an expression that may not consume any input)")]
    InfiniteRepetition,

    #[error("\"@\" cannot be used with an action block")]
    PluckWithAction,

    #[error("infinite cycle detected when trying to evaluate match result of rule '{0}'")]
    MatchResultCycle(String),

    /// Error reported by a pass registered by a plugin
    #[error("{0}")]
    Custom(String),
}

/// Error aborting a compilation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// One or more errors were found in the grammar by a pass
    #[error("{}", format_grammar_errors(.0))]
    Grammar(Vec<GrammarError>),

    /// Provided options are invalid
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// A pass needs a fact that no earlier pass produced
    #[error("missing {fact}: the '{producer}' pass must run first")]
    MissingFact {
        fact: &'static str,
        producer: &'static str,
    },

    /// A code block can't be embedded in the generated parser
    #[error("invalid code block at {location}: {reason}")]
    InvalidCode {
        code: String,
        location: Location,
        reason: String,
    },
}

impl CompileError {
    /// Get the grammar errors carried by this error (empty for other kinds)
    pub fn grammar_errors(&self) -> &[GrammarError] {
        match self {
            Self::Grammar(errors) => errors,
            _ => &[],
        }
    }
}

impl From<GrammarError> for CompileError {
    fn from(err: GrammarError) -> Self {
        Self::Grammar(vec![err])
    }
}

fn format_grammar_errors(errors: &[GrammarError]) -> String {
    match errors {
        [] => "unknown grammar error".to_string(),
        [single] => single.to_string(),
        [first, rest @ ..] => format!("{} (and {} more)", first, rest.len()),
    }
}
