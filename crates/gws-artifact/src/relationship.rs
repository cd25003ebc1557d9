//! Directed, typed edges between artifacts

use crate::id::{ArtifactId, RelationshipId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Edge type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    /// Source mentions or reads target
    References,
    /// Source cannot proceed without target
    DependsOn,
    /// Source contradicts target
    ConflictsWith,
    /// Source was produced from target
    DerivedFrom,
    /// Source and target cover the same ground
    SimilarTo,
}

impl RelationshipKind {
    /// Wire name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::References => "references",
            Self::DependsOn => "depends_on",
            Self::ConflictsWith => "conflicts_with",
            Self::DerivedFrom => "derived_from",
            Self::SimilarTo => "similar_to",
        }
    }

    /// Symmetric kinds are recorded as bidirectional edges
    #[inline]
    #[must_use]
    pub fn is_symmetric(&self) -> bool {
        matches!(self, Self::ConflictsWith | Self::SimilarTo)
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RelationshipKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "references" => Ok(Self::References),
            "depends_on" => Ok(Self::DependsOn),
            "conflicts_with" => Ok(Self::ConflictsWith),
            "derived_from" => Ok(Self::DerivedFrom),
            "similar_to" => Ok(Self::SimilarTo),
            other => Err(format!("unknown relationship type: {other}")),
        }
    }
}

/// Directed edge between two artifacts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: RelationshipId,
    pub source_id: ArtifactId,
    pub target_id: ArtifactId,
    #[serde(rename = "type")]
    pub kind: RelationshipKind,
    #[serde(default)]
    pub bidirectional: bool,
    pub created_at: DateTime<Utc>,
}

impl Relationship {
    /// Create edge stamped now; symmetric kinds are bidirectional
    #[must_use]
    pub fn new(source_id: ArtifactId, target_id: ArtifactId, kind: RelationshipKind) -> Self {
        Self {
            id: RelationshipId::new(),
            source_id,
            target_id,
            kind,
            bidirectional: kind.is_symmetric(),
            created_at: Utc::now(),
        }
    }

    /// Check if the edge touches an artifact at either end
    #[inline]
    #[must_use]
    pub fn touches(&self, id: &ArtifactId) -> bool {
        &self.source_id == id || &self.target_id == id
    }

    /// Check if the edge connects the same pair with the same kind
    ///
    /// Bidirectional edges match either orientation.
    #[must_use]
    pub fn same_edge(&self, source: &ArtifactId, target: &ArtifactId, kind: RelationshipKind) -> bool {
        if self.kind != kind {
            return false;
        }
        let forward = &self.source_id == source && &self.target_id == target;
        let backward = &self.source_id == target && &self.target_id == source;
        forward || (self.bidirectional && backward)
    }

    /// The end opposite to `id`, if the edge touches it
    #[must_use]
    pub fn other_end(&self, id: &ArtifactId) -> Option<&ArtifactId> {
        if &self.source_id == id {
            Some(&self.target_id)
        } else if &self.target_id == id {
            Some(&self.source_id)
        } else {
            None
        }
    }
}
