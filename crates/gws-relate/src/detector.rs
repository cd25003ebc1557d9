//! Relationship detection from chat text and from artifact kinds

use crate::keywords::kind_mentions;
use crate::resolver::{chronological, explicit_ids};
use gws_artifact::{Artifact, ArtifactId, ArtifactKind, RelationshipKind};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Relationship verbs, checked in order; the first match sets the edge kind
static VERBS: Lazy<Vec<(Regex, RelationshipKind)>> = Lazy::new(|| {
    [
        (r"\b(?:depends?\s+on|requires?|needs|blocked\s+by)\b", RelationshipKind::DependsOn),
        (r"\b(?:derived\s+from|built\s+from|based\s+on|generated\s+from)\b", RelationshipKind::DerivedFrom),
        (r"\b(?:conflicts?\s+with|contradicts?|inconsistent\s+with)\b", RelationshipKind::ConflictsWith),
        (r"\b(?:similar\s+to|like|resembles?)\b", RelationshipKind::SimilarTo),
    ]
    .into_iter()
    .map(|(pattern, kind)| {
        let regex = Regex::new(&format!("(?i){pattern}")).expect("valid relationship verb regex");
        (regex, kind)
    })
    .collect()
});

/// Shortest title that counts as a literal mention
const MIN_TITLE_MATCH: usize = 4;

/// An edge proposed by the detector, not yet stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedRelationship {
    pub source_id: ArtifactId,
    pub target_id: ArtifactId,
    #[serde(rename = "type")]
    pub kind: RelationshipKind,
    pub reason: String,
}

/// How an artifact was mentioned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MentionKind {
    ExplicitId,
    KindKeyword,
    Title,
}

/// One artifact mentioned in a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mention {
    /// Byte offset of the first mention
    pub offset: usize,
    pub id: ArtifactId,
    pub via: MentionKind,
}

/// Every artifact a message mentions, in mention order, each once
///
/// Explicit ids, kind keywords (newest artifact of that kind) and literal
/// title substrings all count.
#[must_use]
pub fn find_mentions(text: &str, artifacts: &[&Artifact]) -> Vec<Mention> {
    let mut found: Vec<Mention> = explicit_ids(text, artifacts)
        .into_iter()
        .map(|(offset, id)| Mention {
            offset,
            id,
            via: MentionKind::ExplicitId,
        })
        .collect();

    let ordered = chronological(artifacts);
    for (offset, kind) in kind_mentions(text) {
        if let Some(artifact) = ordered.iter().rev().find(|a| a.kind == kind) {
            found.push(Mention {
                offset,
                id: artifact.id.clone(),
                via: MentionKind::KindKeyword,
            });
        }
    }

    let lowered = text.to_lowercase();
    for artifact in artifacts {
        let title = artifact.display_title().to_lowercase();
        if title.chars().count() < MIN_TITLE_MATCH {
            continue;
        }
        if let Some(offset) = lowered.find(&title) {
            found.push(Mention {
                offset,
                id: artifact.id.clone(),
                via: MentionKind::Title,
            });
        }
    }

    found.sort_by_key(|m| m.offset);
    let mut seen = Vec::new();
    found.retain(|m| {
        if seen.contains(&m.id) {
            false
        } else {
            seen.push(m.id.clone());
            true
        }
    });
    found
}

/// Edge kind implied by the verbs in a message
#[must_use]
pub fn infer_kind(text: &str) -> (RelationshipKind, Option<String>) {
    VERBS
        .iter()
        .find_map(|(regex, kind)| regex.find(text).map(|m| (*kind, Some(m.as_str().to_lowercase()))))
        .unwrap_or((RelationshipKind::References, None))
}

/// Static affinity table: kinds a new artifact links to on creation
#[must_use]
pub fn affinity(kind: &ArtifactKind) -> Vec<(ArtifactKind, RelationshipKind)> {
    match kind {
        ArtifactKind::ExecutionPlan => vec![
            (ArtifactKind::SystemStatusPanel, RelationshipKind::References),
            (ArtifactKind::CommandResultPanel, RelationshipKind::References),
        ],
        ArtifactKind::KanbanBoard => vec![(ArtifactKind::ExecutionPlan, RelationshipKind::DerivedFrom)],
        ArtifactKind::DecisionMatrix => vec![(ArtifactKind::CommandResultPanel, RelationshipKind::References)],
        ArtifactKind::CommandResultPanel => vec![(ArtifactKind::SystemStatusPanel, RelationshipKind::References)],
        ArtifactKind::SystemStatusPanel | ArtifactKind::Other(_) => Vec::new(),
    }
}

/// Finds relationships between artifacts
#[derive(Debug, Default, Clone, Copy)]
pub struct RelationshipDetector;

impl RelationshipDetector {
    /// Create detector
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Edges implied by a message
    ///
    /// With a known `source`, edges run from it to every other mentioned
    /// artifact. Without one, two or more mentions are chained pairwise in
    /// mention order.
    #[must_use]
    pub fn detect_relationships(
        &self,
        text: &str,
        source: Option<&ArtifactId>,
        artifacts: &[&Artifact],
    ) -> Vec<DetectedRelationship> {
        let mentions = find_mentions(text, artifacts);
        let (kind, verb) = infer_kind(text);
        let reason = |via: MentionKind| match &verb {
            Some(verb) => format!("\"{verb}\" in message"),
            None => match via {
                MentionKind::ExplicitId => "referenced by id in message".to_string(),
                MentionKind::KindKeyword => "referenced by kind in message".to_string(),
                MentionKind::Title => "referenced by title in message".to_string(),
            },
        };

        let source = source.filter(|id| artifacts.iter().any(|a| &a.id == *id));
        let edges: Vec<DetectedRelationship> = match source {
            Some(source) => mentions
                .iter()
                .filter(|m| &m.id != source)
                .map(|m| DetectedRelationship {
                    source_id: source.clone(),
                    target_id: m.id.clone(),
                    kind,
                    reason: reason(m.via),
                })
                .collect(),
            None => mentions
                .windows(2)
                .map(|pair| DetectedRelationship {
                    source_id: pair[0].id.clone(),
                    target_id: pair[1].id.clone(),
                    kind,
                    reason: reason(pair[1].via),
                })
                .collect(),
        };
        if !edges.is_empty() {
            tracing::debug!(count = edges.len(), %kind, "relationships detected in message");
        }
        edges
    }

    /// Edges a new artifact gets from the affinity table
    #[must_use]
    pub fn detect_type_based_relationships(
        &self,
        new: &Artifact,
        existing: &[&Artifact],
    ) -> Vec<DetectedRelationship> {
        let table = affinity(&new.kind);
        existing
            .iter()
            .filter(|other| other.id != new.id)
            .filter_map(|other| {
                table
                    .iter()
                    .find(|(kind, _)| kind == &other.kind)
                    .map(|(_, edge)| DetectedRelationship {
                        source_id: new.id.clone(),
                        target_id: other.id.clone(),
                        kind: *edge,
                        reason: format!("{} usually {} {}", new.kind.label(), edge_phrase(*edge), other.kind.label()),
                    })
            })
            .collect()
    }
}

fn edge_phrase(kind: RelationshipKind) -> &'static str {
    match kind {
        RelationshipKind::References => "references",
        RelationshipKind::DependsOn => "depends on",
        RelationshipKind::ConflictsWith => "conflicts with",
        RelationshipKind::DerivedFrom => "is derived from",
        RelationshipKind::SimilarTo => "is similar to",
    }
}
