use serde::Serialize;
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DiagnosticKind {
    /// An edge or associative pair points at a class that is not in the graph.
    StaleReference,
    /// A junction candidate whose second owner could not be resolved.
    InferenceGap,
    /// A generated name clashes with a declared one.
    NamingCollision,
    /// A classifier record is missing required identifiers.
    MalformedPayload,
    /// A heuristic had more than one plausible reading.
    Ambiguous,
    /// An associative class whose owner pair is unusable.
    InvalidAssociative,
}

impl DiagnosticKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StaleReference => "stale-reference",
            Self::InferenceGap => "inference-gap",
            Self::NamingCollision => "naming-collision",
            Self::MalformedPayload => "malformed-payload",
            Self::Ambiguous => "ambiguous",
            Self::InvalidAssociative => "invalid-associative",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Class name, edge id or payload position the entry is about.
    pub subject: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind.as_str(), self.subject, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        kind: DiagnosticKind,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) {
        let diagnostic = Diagnostic {
            kind,
            subject: subject.into(),
            message: message.into(),
        };
        warn!(kind = diagnostic.kind.as_str(), subject = %diagnostic.subject, "{}", diagnostic.message);
        self.items.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.items.iter().filter(|d| d.kind == kind).count()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}
