//! Words that name artifact kinds in chat text

use gws_artifact::ArtifactKind;
use once_cell::sync::Lazy;
use regex::Regex;

/// Every keyword [`kind_for_keyword`] recognises, as a regex alternation
pub(crate) const KIND_KEYWORDS: &str = r"plans?|roadmaps?|status|metrics|health|dashboards?|boards?|kanbans?|results?|analysis|analyses|outputs?|decisions?|matrix|matrices|comparisons?";

/// Whole-word match of any kind keyword
pub(crate) static KIND_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"(?i)\b(?:{KIND_KEYWORDS})\b")).expect("valid kind keyword regex"));

/// Nouns that stand for "an artifact" without naming a kind
pub(crate) const GENERIC_NOUNS: &str = r"one|artifacts?|panels?|widgets?";

/// Nouns for items inside an artifact ("the last step")
pub(crate) const ITEM_NOUNS: &str = r"steps?|items?|tasks?|entry|entries|options?|cards?|rows?|criteria|criterion|todos?";

/// Map a keyword ("plan", "dashboard", "matrix") to the kind it names
#[must_use]
pub fn kind_for_keyword(word: &str) -> Option<ArtifactKind> {
    let kind = match word.trim().to_lowercase().as_str() {
        "plan" | "plans" | "roadmap" | "roadmaps" => ArtifactKind::ExecutionPlan,
        "status" | "metrics" | "health" | "dashboard" | "dashboards" => ArtifactKind::SystemStatusPanel,
        "board" | "boards" | "kanban" | "kanbans" => ArtifactKind::KanbanBoard,
        "result" | "results" | "analysis" | "analyses" | "output" | "outputs" => ArtifactKind::CommandResultPanel,
        "decision" | "decisions" | "matrix" | "matrices" | "comparison" | "comparisons" => {
            ArtifactKind::DecisionMatrix
        }
        _ => return None,
    };
    Some(kind)
}

/// Kind keywords in the text, with their byte offsets, in order
pub(crate) fn kind_mentions(text: &str) -> Vec<(usize, ArtifactKind)> {
    KIND_WORD
        .find_iter(text)
        .filter_map(|m| kind_for_keyword(m.as_str()).map(|kind| (m.start(), kind)))
        .collect()
}
