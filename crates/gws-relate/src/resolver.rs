//! Reference resolution: chat phrases → artifact ids
//!
//! Strategies run in a fixed order and the first hit wins:
//!
//! 1. explicit id (`#1a2b3c4d`, "artifact 1a2b3c4d") that exists
//! 2. ordinal among artifacts by creation time ("the second plan")
//! 3. recency ("the latest board", "the last one", "the previous one",
//!    "the last step" → newest artifact)
//! 4. kind keyword ("the plan" → newest plan)
//! 5. bare pronoun ("this", "that", "it") → most recently referenced, else newest
//!
//! Ordinals only bind to artifacts when a kind keyword or an artifact noun
//! follows them, so "remove the second step" does not pick the second
//! artifact. A kind word used as the property being set ("set the status of
//! step 2") is not a kind reference.

use crate::keywords::{kind_for_keyword, kind_mentions, GENERIC_NOUNS, ITEM_NOUNS, KIND_KEYWORDS};
use gws_artifact::{Artifact, ArtifactId, ArtifactKind};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::fmt;

pub(crate) static EXPLICIT_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:#|\bartifact\s+)([0-9a-f]{8})\b").expect("valid artifact id regex")
});

static ORDINAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?P<ord>first|second|third|fourth|fifth|1st|2nd|3rd|4th|5th)\s+(?P<noun>{KIND_KEYWORDS}|{GENERIC_NOUNS})\b"
    ))
    .expect("valid ordinal reference regex")
});

static LAST_QUALIFIED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)\blast\s+(?P<noun>{KIND_KEYWORDS}|{GENERIC_NOUNS}|{ITEM_NOUNS})\b"))
        .expect("valid last reference regex")
});

static PROPERTY_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:set|change|update)\s+(?:the\s+)?(?P<prop>{KIND_KEYWORDS})\s+(?:of|for|on)\b"
    ))
    .expect("valid property position regex")
});

static RECENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?P<word>latest|newest|most\s+recent|previous|prior)\b(?:\s+(?P<noun>{KIND_KEYWORDS}|{GENERIC_NOUNS})\b)?"
    ))
    .expect("valid recency reference regex")
});

static PRONOUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:this|that|it)\b").expect("valid pronoun regex"));

/// Which strategy produced a resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    ExplicitId,
    Ordinal,
    Recency,
    KindKeyword,
    Pronoun,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ExplicitId => "explicit_id",
            Self::Ordinal => "ordinal",
            Self::Recency => "recency",
            Self::KindKeyword => "kind_keyword",
            Self::Pronoun => "pronoun",
        };
        f.write_str(name)
    }
}

/// A resolved reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub id: ArtifactId,
    pub strategy: Strategy,
}

/// Resolves chat phrases to artifact ids
#[derive(Debug, Default, Clone, Copy)]
pub struct ReferenceResolver;

impl ReferenceResolver {
    /// Create resolver
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Resolve the artifact a message refers to
    ///
    /// `recent` lists recently referenced ids, most recent first; it only
    /// feeds the pronoun strategy.
    #[must_use]
    pub fn resolve(&self, text: &str, artifacts: &[&Artifact], recent: &[ArtifactId]) -> Option<Resolution> {
        if artifacts.is_empty() || text.trim().is_empty() {
            return None;
        }
        let ordered = chronological(artifacts);

        let found = explicit_id(text, artifacts)
            .map(|id| (id, Strategy::ExplicitId))
            .or_else(|| ordinal(text, &ordered).map(|id| (id, Strategy::Ordinal)))
            .or_else(|| recency(text, &ordered).map(|id| (id, Strategy::Recency)))
            .or_else(|| kind_keyword(text, &ordered).map(|id| (id, Strategy::KindKeyword)))
            .or_else(|| pronoun(text, &ordered, recent).map(|id| (id, Strategy::Pronoun)));

        let (id, strategy) = found?;
        tracing::debug!(artifact = %id, %strategy, "reference resolved");
        Some(Resolution { id, strategy })
    }

    /// Resolve to an id only
    #[must_use]
    pub fn resolve_reference(&self, text: &str, artifacts: &[&Artifact], recent: &[ArtifactId]) -> Option<ArtifactId> {
        self.resolve(text, artifacts, recent).map(|r| r.id)
    }
}

/// Artifacts oldest first; ties keep the given order
#[must_use]
pub fn chronological<'a>(artifacts: &[&'a Artifact]) -> Vec<&'a Artifact> {
    let mut ordered = artifacts.to_vec();
    ordered.sort_by_key(|a| a.created_at);
    ordered
}

/// Every explicit id in the text that names an existing artifact, in order
pub(crate) fn explicit_ids(text: &str, artifacts: &[&Artifact]) -> Vec<(usize, ArtifactId)> {
    EXPLICIT_ID
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let hex = caps.get(1)?.as_str().to_lowercase();
            artifacts
                .iter()
                .find(|a| a.id.as_str() == hex)
                .map(|a| (whole.start(), a.id.clone()))
        })
        .collect()
}

fn explicit_id(text: &str, artifacts: &[&Artifact]) -> Option<ArtifactId> {
    explicit_ids(text, artifacts).into_iter().next().map(|(_, id)| id)
}

/// Artifacts of the kind named by a noun capture, or all of them
fn pool<'a>(caps: &Captures<'_>, ordered: &[&'a Artifact]) -> Vec<&'a Artifact> {
    match caps.name("noun").and_then(|n| kind_for_keyword(n.as_str())) {
        Some(kind) => ordered.iter().copied().filter(|a| a.kind == kind).collect(),
        None => ordered.to_vec(),
    }
}

fn ordinal(text: &str, ordered: &[&Artifact]) -> Option<ArtifactId> {
    let caps = ORDINAL.captures(text)?;
    let position = match caps.name("ord")?.as_str().to_lowercase().as_str() {
        "first" | "1st" => 0,
        "second" | "2nd" => 1,
        "third" | "3rd" => 2,
        "fourth" | "4th" => 3,
        _ => 4,
    };
    pool(&caps, ordered).get(position).map(|a| a.id.clone())
}

fn recency(text: &str, ordered: &[&Artifact]) -> Option<ArtifactId> {
    let caps = match (LAST_QUALIFIED.captures(text), RECENT.captures(text)) {
        (Some(last), Some(recent)) => {
            if recent.get(0)?.start() < last.get(0)?.start() {
                recent
            } else {
                last
            }
        }
        (Some(caps), None) | (None, Some(caps)) => caps,
        (None, None) => return None,
    };
    let back = usize::from(
        caps.name("word")
            .is_some_and(|w| matches!(w.as_str().to_lowercase().as_str(), "previous" | "prior")),
    );
    let pool = pool(&caps, ordered);
    pool.len().checked_sub(1 + back).and_then(|i| pool.get(i)).map(|a| a.id.clone())
}

fn kind_keyword(text: &str, ordered: &[&Artifact]) -> Option<ArtifactId> {
    let properties: Vec<usize> = PROPERTY_WORD
        .captures_iter(text)
        .filter_map(|caps| caps.name("prop").map(|m| m.start()))
        .collect();
    kind_mentions(text)
        .into_iter()
        .filter(|(at, _)| !properties.contains(at))
        .find_map(|(_, kind)| newest_of(ordered, &kind))
        .map(|a| a.id.clone())
}

fn newest_of<'a>(ordered: &[&'a Artifact], kind: &ArtifactKind) -> Option<&'a Artifact> {
    ordered.iter().rev().copied().find(|a| &a.kind == kind)
}

fn pronoun(text: &str, ordered: &[&Artifact], recent: &[ArtifactId]) -> Option<ArtifactId> {
    if !PRONOUN.is_match(text) {
        return None;
    }
    recent
        .iter()
        .find(|id| ordered.iter().any(|a| &a.id == *id))
        .cloned()
        .or_else(|| ordered.last().map(|a| a.id.clone()))
}
