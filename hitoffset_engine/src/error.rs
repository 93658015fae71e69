use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisErrorKind {
    EmptySelection,
    InvalidInput,
    Cancelled,
}

impl AnalysisErrorKind {
    pub(crate) fn from_code(code: &'static str) -> Self {
        match code {
            // Empty selection
            "E1001" | "E1002" | "E1003" | "E1004" | "E1005" => Self::EmptySelection,

            // Invalid input
            "E2001" | "E2002" | "E2003" => Self::InvalidInput,

            // Cancelled
            "E3001" => Self::Cancelled,

            _ => Self::InvalidInput,
        }
    }
}

#[derive(Debug, Error, Clone)]
#[error("{code}: {message}")]
pub struct AnalysisError {
    pub code: &'static str,
    pub kind: AnalysisErrorKind,
    pub message: String,

    pub context: Option<String>,
}

impl AnalysisError {
    pub(crate) fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            kind: AnalysisErrorKind::from_code(code),
            message: message.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn is_empty_selection(&self) -> bool {
        self.kind == AnalysisErrorKind::EmptySelection
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == AnalysisErrorKind::Cancelled
    }
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
