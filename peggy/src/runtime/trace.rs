use super::data::SourceSpan;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Kind of a [`TraceEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TraceEventKind {
    #[serde(rename = "rule.enter")]
    Enter,

    #[serde(rename = "rule.match")]
    Match,

    #[serde(rename = "rule.fail")]
    Fail,
}

impl TraceEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Enter => "rule.enter",
            Self::Match => "rule.match",
            Self::Fail => "rule.fail",
        }
    }
}

/// Event emitted when a rule is entered or left
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent<'a> {
    pub kind: TraceEventKind,
    pub rule: &'a str,

    /// Input matched by the rule (empty when entering or failing)
    pub location: SourceSpan,
}

/// Receiver of the tracing events of a parse
pub trait Tracer {
    fn trace(&mut self, event: TraceEvent<'_>);
}

/// Tracer forwarding events to [`tracing`], at the `TRACE` level
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTracer;

impl Tracer for DefaultTracer {
    fn trace(&mut self, event: TraceEvent<'_>) {
        trace!(
            event = event.kind.as_str(),
            rule = event.rule,
            start = event.location.start.offset,
            end = event.location.end.offset,
            "{}:{}-{}:{} {} {}",
            event.location.start.line,
            event.location.start.column,
            event.location.end.line,
            event.location.end.column,
            event.kind.as_str(),
            event.rule
        );
    }
}

/// Owned copy of a [`TraceEvent`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceRecord {
    pub kind: TraceEventKind,
    pub rule: String,
    pub location: SourceSpan,
}

/// Tracer recording every event
#[derive(Debug, Clone, Default)]
pub struct TraceLog {
    pub records: Vec<TraceRecord>,
}

impl TraceLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Tracer for TraceLog {
    fn trace(&mut self, event: TraceEvent<'_>) {
        self.records.push(TraceRecord {
            kind: event.kind,
            rule: event.rule.to_string(),
            location: event.location,
        });
    }
}
