//! Cross-artifact queries and the context blob handed to the model

use crate::detector::find_mentions;
use crate::keywords::{kind_for_keyword, kind_mentions, KIND_WORD};
use crate::resolver::chronological;
use gws_artifact::{Artifact, ArtifactId, ArtifactKind};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};

/// Shape of a question spanning several artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    /// "which tasks affect the launch plan"
    Impact,
    /// "compare the plan and the board"
    Comparison,
    /// "any conflicts between these?"
    Conflict,
    /// "based on the analysis, create a plan"
    Derivation,
    /// "merge the two plans"
    Merge,
}

impl QueryKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Impact => "impact",
            Self::Comparison => "comparison",
            Self::Conflict => "conflict",
            Self::Derivation => "derivation",
            Self::Merge => "merge",
        }
    }

    fn instruction(self) -> &'static str {
        match self {
            Self::Impact => "Explain which items in one artifact affect items in another, citing both.",
            Self::Comparison => "Compare the artifacts item by item and state which differences matter.",
            Self::Conflict => "List every inconsistency between the artifacts, quoting the conflicting values.",
            Self::Derivation => "Build the new artifact only from the source states; mark anything inferred.",
            Self::Merge => "Combine the artifacts into one, keeping every item exactly once.",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static IMPACT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:which|what)\b.*\b(?:affects?|impacts?|influences?|blocks?)\b|\bimpact\s+(?:of|on)\b")
        .expect("valid impact query regex")
});

static COMPARISON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:compare|comparing|comparison\s+of|versus|vs\.?|differences?\s+between)\b")
        .expect("valid comparison query regex")
});

static CONFLICT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:conflicts?|conflicting|inconsisten(?:t|cy|cies)|contradict\w*|mismatch\w*)\b")
        .expect("valid conflict query regex")
});

static DERIVATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bbased\s+on\b.*\b(?:create|make|build|generate|draft)\b|\b(?:create|make|build|generate|draft)\b.*\b(?:from|based\s+on)\b")
        .expect("valid derivation query regex")
});

static CREATE_VERB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:create|make|build|generate|draft)\b").expect("valid create verb regex")
});

static MERGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:merge|combine|consolidate|unify)\b").expect("valid merge query regex")
});

/// A detected cross-artifact question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossArtifactQuery {
    pub kind: QueryKind,
    /// Artifacts the answer must read, in mention order
    pub artifact_ids: Vec<ArtifactId>,
    /// Kind of artifact the answer should produce, when implied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_output: Option<ArtifactKind>,
    pub text: String,
}

/// Recognise a question that spans several artifacts
///
/// Comparisons and merges with fewer than two mentioned artifacts fall back
/// to the two most recent, of the first named kind when there are two.
/// Impact and conflict questions with no mention read the whole workspace;
/// derivations read the newest artifact.
#[must_use]
pub fn detect_cross_artifact_query(text: &str, artifacts: &[&Artifact]) -> Option<CrossArtifactQuery> {
    if artifacts.is_empty() {
        return None;
    }
    let kind = [
        (&*IMPACT, QueryKind::Impact),
        (&*COMPARISON, QueryKind::Comparison),
        (&*CONFLICT, QueryKind::Conflict),
        (&*DERIVATION, QueryKind::Derivation),
        (&*MERGE, QueryKind::Merge),
    ]
    .into_iter()
    .find(|(regex, _)| regex.is_match(text))
    .map(|(_, kind)| kind)?;

    let ordered = chronological(artifacts);
    // "merge the two plans" narrows the fallback to plans when there are enough
    let focus = kind_mentions(text).into_iter().map(|(_, kind)| kind).next();
    let newest = |n: usize| -> Vec<ArtifactId> {
        let of_focus: Vec<&Artifact> = ordered
            .iter()
            .copied()
            .filter(|a| focus.as_ref() == Some(&a.kind))
            .collect();
        let pool = if of_focus.len() >= n { of_focus } else { ordered.clone() };
        let mut ids: Vec<ArtifactId> = pool.iter().rev().take(n).map(|a| a.id.clone()).collect();
        ids.reverse();
        ids
    };

    let mut expected_output = None;
    let mut mentions = find_mentions(text, artifacts);
    if kind == QueryKind::Derivation {
        if let Some((offset, output)) = derivation_output(text) {
            mentions.retain(|m| m.offset != offset);
            expected_output = Some(output);
        }
    }
    let mut artifact_ids: Vec<ArtifactId> = mentions.into_iter().map(|m| m.id).collect();

    match kind {
        QueryKind::Comparison | QueryKind::Merge if artifact_ids.len() < 2 => artifact_ids = newest(2),
        QueryKind::Impact | QueryKind::Conflict if artifact_ids.is_empty() => {
            artifact_ids = ordered.iter().map(|a| a.id.clone()).collect();
        }
        QueryKind::Derivation if artifact_ids.is_empty() => artifact_ids = newest(1),
        _ => {}
    }

    match kind {
        QueryKind::Comparison => expected_output = Some(ArtifactKind::DecisionMatrix),
        QueryKind::Merge => expected_output = shared_kind(&artifact_ids, artifacts),
        _ => {}
    }

    tracing::debug!(%kind, artifacts = artifact_ids.len(), "cross-artifact query detected");
    Some(CrossArtifactQuery {
        kind,
        artifact_ids,
        expected_output,
        text: text.trim().to_string(),
    })
}

/// Kind keyword after the create verb, with its offset
fn derivation_output(text: &str) -> Option<(usize, ArtifactKind)> {
    let verb = CREATE_VERB.find(text)?;
    KIND_WORD
        .find_iter(&text[verb.end()..])
        .find_map(|m| kind_for_keyword(m.as_str()).map(|kind| (verb.end() + m.start(), kind)))
}

fn shared_kind(ids: &[ArtifactId], artifacts: &[&Artifact]) -> Option<ArtifactKind> {
    let mut kinds = ids
        .iter()
        .filter_map(|id| artifacts.iter().find(|a| &a.id == id).map(|a| &a.kind));
    let first = kinds.next()?;
    kinds.all(|k| k == first).then(|| first.clone())
}

/// Context blob for a cross-artifact query
///
/// Embeds the verbatim current state of every artifact the query names,
/// followed by provenance instructions.
#[must_use]
pub fn build_cross_artifact_context(query: &CrossArtifactQuery, artifacts: &[&Artifact]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Cross-artifact request ({})", query.kind);
    let _ = writeln!(out, "User request: {}", query.text);
    if let Some(kind) = &query.expected_output {
        let _ = writeln!(out, "Expected output: {kind}");
    }
    out.push('\n');

    let mut cited = Vec::new();
    for id in &query.artifact_ids {
        let Some(artifact) = artifacts.iter().find(|a| &a.id == id) else {
            continue;
        };
        write_artifact_section(&mut out, artifact);
        cited.push(artifact.id.tag());
    }

    let _ = writeln!(out, "Instructions:");
    let _ = writeln!(out, "- Treat the artifact states above as the only source of truth.");
    let _ = writeln!(
        out,
        "- Cite the artifact id ({}) for every fact you use.",
        cited.join(", ")
    );
    let _ = writeln!(out, "- Do not invent items, values or statuses that are not present.");
    let _ = writeln!(out, "- {}", query.kind.instruction());
    out
}

/// Append one artifact section: header line plus pretty JSON state
pub fn write_artifact_section(out: &mut String, artifact: &Artifact) {
    let state = serde_json::to_string_pretty(&artifact.state).unwrap_or_else(|_| artifact.state.to_string());
    let _ = writeln!(
        out,
        "## {} {} \"{}\" (version {})",
        artifact.id.tag(),
        artifact.kind,
        artifact.display_title(),
        artifact.version
    );
    let _ = writeln!(out, "```json\n{state}\n```\n");
}
