//! Artifact kind tags

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of artifact kinds the workspace knows how to render and validate
///
/// Unrecognised tags are carried verbatim in [`ArtifactKind::Other`] so data
/// written by a newer build is never dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ArtifactKind {
    /// Ordered list of steps with statuses
    ExecutionPlan,
    /// Health metrics with an overall status
    SystemStatusPanel,
    /// Columns of cards
    KanbanBoard,
    /// Output of a command or analysis
    CommandResultPanel,
    /// Options scored against criteria
    DecisionMatrix,
    /// Any other tag
    Other(String),
}

impl ArtifactKind {
    /// All built-in kinds, in registry order
    pub const BUILTIN: [ArtifactKind; 5] = [
        ArtifactKind::ExecutionPlan,
        ArtifactKind::SystemStatusPanel,
        ArtifactKind::KanbanBoard,
        ArtifactKind::CommandResultPanel,
        ArtifactKind::DecisionMatrix,
    ];

    /// Wire tag
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::ExecutionPlan => "ExecutionPlan",
            Self::SystemStatusPanel => "SystemStatusPanel",
            Self::KanbanBoard => "KanbanBoard",
            Self::CommandResultPanel => "CommandResultPanel",
            Self::DecisionMatrix => "DecisionMatrix",
            Self::Other(tag) => tag,
        }
    }

    /// Human label used in context strings ("execution plan")
    #[must_use]
    pub fn label(&self) -> String {
        let mut out = String::new();
        for (i, ch) in self.as_str().chars().enumerate() {
            if ch.is_uppercase() && i > 0 {
                out.push(' ');
            }
            out.extend(ch.to_lowercase());
        }
        out
    }

    /// Check if this is one of the built-in kinds
    #[inline]
    #[must_use]
    pub fn is_builtin(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<&str> for ArtifactKind {
    fn from(tag: &str) -> Self {
        match tag {
            "ExecutionPlan" => Self::ExecutionPlan,
            "SystemStatusPanel" => Self::SystemStatusPanel,
            "KanbanBoard" => Self::KanbanBoard,
            "CommandResultPanel" => Self::CommandResultPanel,
            "DecisionMatrix" => Self::DecisionMatrix,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for ArtifactKind {
    fn from(tag: String) -> Self {
        Self::from(tag.as_str())
    }
}

impl From<ArtifactKind> for String {
    fn from(kind: ArtifactKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
