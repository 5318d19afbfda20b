//! Error families reported by the triangulation engine, the move engine and the driver.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Code, message and context carried by every [`CdtError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Kebab-case code, stable across releases.
    pub code: String,
    /// One-line description.
    pub message: String,
    /// Handles, counts and paths involved in the failure.
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// What the caller can change to avoid the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Payload with an empty context and no hint.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Records `key = value` in the context.
    pub fn with_context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }

    /// Attaches a hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Every fallible operation in the workspace returns this.
///
/// Candidate exhaustion during a move is not represented here; moves report it
/// through their outcome type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum CdtError {
    /// Combinatorial or geometric validity of the triangulation is broken.
    #[error("triangulation error: {0}")]
    Triangulation(ErrorInfo),
    /// A cell does not classify as one of the admissible simplex types.
    #[error("simplex error: {0}")]
    Simplex(ErrorInfo),
    /// The foliation could not be repaired within the pass budget.
    #[error("foliation error: {0}")]
    Foliation(ErrorInfo),
    /// A rewrite completed but violated its expected postcondition.
    #[error("move error: {0}")]
    Move(ErrorInfo),
    /// Arbitrary precision arithmetic failed to initialise or produced a non-finite value.
    #[error("precision error: {0}")]
    Precision(ErrorInfo),
    /// Randomness and seeding errors.
    #[error("rng error: {0}")]
    Rng(ErrorInfo),
    /// Serialization and filesystem errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
    /// Invalid run configuration.
    #[error("config error: {0}")]
    Config(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        for (key, value) in &self.context {
            write!(f, " {key}={value}")?;
        }
        match &self.hint {
            Some(hint) => write!(f, " ({hint})"),
            None => Ok(()),
        }
    }
}

impl CdtError {
    /// Payload of whichever family this is.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            CdtError::Triangulation(info)
            | CdtError::Simplex(info)
            | CdtError::Foliation(info)
            | CdtError::Move(info)
            | CdtError::Precision(info)
            | CdtError::Rng(info)
            | CdtError::Serde(info)
            | CdtError::Config(info) => info,
        }
    }

    /// Returns true for errors that a move transaction recovers from by rolling back.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CdtError::Triangulation(_) | CdtError::Simplex(_) | CdtError::Move(_)
        )
    }
}
