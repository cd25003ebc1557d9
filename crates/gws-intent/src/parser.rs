//! Natural-language command → [`MutationIntent`]
//!
//! An ordered table of (pattern, extractor) rules evaluated top to bottom.
//! The first rule whose pattern matches decides the outcome; there is no
//! backtracking into later rules. The parser never looks at artifact
//! contents: which artifact a command targets is resolved elsewhere.

use crate::intent::{ItemCondition, ItemIndex, MutationIntent};
use crate::ordinal::{parse_ordinal, parse_position, ORDINAL_PATTERN};
use gws_artifact::{Artifact, MutationOperation};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

/// Collection nouns accepted in commands
const NOUNS: &str = r"(?:items?|steps?|tasks?|metrics?|entry|entries|options?|cards?|rows?|criteria|criterion|todos?|one)";

/// Kind words that may trail a command as its artifact target
const TARGET_WORDS: &str =
    r"(?:plan|roadmap|board|kanban|panel|status|dashboard|matrix|list|results?|analysis|checklist|artifact|one)";

static ITEM_REF: Lazy<String> = Lazy::new(|| {
    format!(
        r"(?:(?:the\s+)?(?P<ord>{ORDINAL_PATTERN})\s+(?P<noun1>{NOUNS})|(?P<noun2>{NOUNS})\s+(?:#|no\.?\s*|number\s+)?(?P<num>\d+)\b)"
    )
});

static LEADING_FILLER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:(?:please|pls|can\s+you|could\s+you|would\s+you|now|also|and|then|ok(?:ay)?,?)\s+|(?:in|on|for)\s+(?:#[0-9a-f]{8}|artifact\s+[0-9a-f]{8})\s*,?\s+)+")
        .expect("valid filler regex")
});

static TRAILING_TARGET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\s+(?:to|from|in|on|into|of|for)\s+(?:(?:the|this|that|my|our)\s+(?:[\w-]+\s+){{0,2}}?{TARGET_WORDS}|#[0-9a-f]{{8}}|artifact\s+[0-9a-f]{{8}})\s*$"
    ))
    .expect("valid target suffix regex")
});

static BARE_NOUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("(?i)^{NOUNS}$")).expect("valid noun regex"));

static MUTATION_VERB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:remove|delete|drop|clear|add|insert|append|include|change|update|set|mark|flag|rename|retitle|move|reorder|shift|put|swap)\b")
        .expect("valid verb regex")
});

/// One row of the pattern table
struct Rule {
    name: &'static str,
    pattern: Regex,
    extract: fn(&Captures<'_>) -> Option<MutationIntent>,
}

impl Rule {
    fn new(name: &'static str, pattern: &str, extract: fn(&Captures<'_>) -> Option<MutationIntent>) -> Self {
        let pattern = Regex::new(&format!("(?i){pattern}")).expect("valid mutation rule regex");
        Self {
            name,
            pattern,
            extract,
        }
    }
}

static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    let item = ITEM_REF.as_str();
    vec![
        Rule::new(
            "remove_completed",
            &format!(r"^(?:remove|delete|drop|clear)\s+(?:all\s+)?(?:of\s+)?(?:the\s+)?(?:completed|complete|done|finished)\b(?:\s+(?P<noun>{NOUNS})\b)?"),
            remove_completed,
        ),
        Rule::new(
            "remove_status_adjective",
            &format!(r"^(?:remove|delete|drop|clear)\s+(?:all\s+)?(?:of\s+)?(?:the\s+)?(?P<status>pending|failed|skipped|blocked|cancell?ed|in[\s_-]progress|todo|down|degraded|unknown)\s+(?P<noun>{NOUNS})\b"),
            remove_by_status,
        ),
        Rule::new(
            "remove_status_clause",
            &format!(r"^(?:remove|delete|drop|clear)\s+(?:all\s+)?(?:of\s+)?(?:the\s+)?(?P<noun>{NOUNS})\s+(?:with\s+status|whose\s+status\s+is|that\s+are|which\s+are|marked(?:\s+as)?)\s+(?P<status>[a-z][a-z_\- ]*?)(?:\s+(?:from|in|on)\b.*)?$"),
            remove_by_status,
        ),
        Rule::new(
            "remove_indexed",
            &format!(r"^(?:remove|delete|drop)\s+{item}"),
            remove_indexed,
        ),
        Rule::new(
            "set_property_of_item",
            &format!(r"^(?:set|change|update)\s+(?:the\s+)?(?P<prop>[a-z][a-z ]*?)\s+(?:of|for|on)\s+{item}\s+to\s+(?P<value>.+)$"),
            set_item_property,
        ),
        Rule::new(
            "set_item_property",
            &format!(r"^(?:set|change|update)\s+{item}(?:'s)?\s+(?P<prop>[a-z][a-z ]*?)\s+to\s+(?P<value>.+)$"),
            set_item_property,
        ),
        Rule::new(
            "mark_item",
            &format!(r"^(?:mark|flag|set)\s+{item}\s+(?:as\s+|to\s+)?(?P<value>.+)$"),
            mark_item,
        ),
        Rule::new(
            "rename_item",
            &format!(r"^(?:rename|retitle|change|update)\s+{item}\s+(?:to|as)\s+(?P<value>.+)$"),
            rename_item,
        ),
        Rule::new(
            "rename_artifact",
            r"^(?:rename|retitle)\s+(?:(?:this|that|it|the)\b\s*)?(?:[\w#-]+\s+){0,3}?(?:to|as)\s+(?P<value>.+)$",
            rename_artifact,
        ),
        Rule::new(
            "set_property",
            r"^(?:set|change|update)\s+(?:the\s+)?(?P<prop>[a-z][a-z _-]*?)(?:\s+(?:of|for|on|in)\s+(?:the\s+)?#?[\w-]+(?:\s+[\w-]+){0,2}?)?\s+(?:to|=|as)\s+(?P<value>.+)$",
            set_property,
        ),
        Rule::new(
            "add_item",
            &format!(r"^(?:add|insert|append|include)\s+(?:(?:a|an|another|one\s+more)\s+)?(?:new\s+)?(?:(?P<noun>{NOUNS})\b\s*(?:called\s+|named\s+|titled\s+|:\s*)?)?(?P<value>.+?)(?:\s+(?:at|in|as)\s+(?:position|slot|place|{NOUNS})\s+#?(?P<pos>\d+)|\s+(?:at|to)\s+the\s+(?P<edge>top|beginning|start|front|end|bottom))?$"),
            add_item,
        ),
        Rule::new(
            "move_item",
            &format!(r"^(?:move|reorder|shift|put)\s+{item}\s+(?:to\s+)?(?:the\s+)?(?:(?P<edge>top|beginning|start|front|bottom|end)|(?:position|slot|place|spot)\s+#?(?P<pos>\d+)|(?P<pos_ord>{ORDINAL_PATTERN})(?:\s+(?:position|place|slot|spot))?)\b"),
            move_item,
        ),
        Rule::new(
            "swap_items",
            &format!(r"^swap\s+(?:(?P<noun>{NOUNS})\s+)?#?(?P<a>\d+)\s+(?:and|with)\s+(?:{NOUNS}\s+)?#?(?P<b>\d+)\b"),
            swap_items,
        ),
    ]
});

/// Pattern-table parser for edit commands
#[derive(Debug, Default, Clone, Copy)]
pub struct MutationIntentParser;

impl MutationIntentParser {
    /// Create parser
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Cheap pre-filter: does the text start with an edit verb
    #[must_use]
    pub fn is_mutation_request(&self, text: &str) -> bool {
        MUTATION_VERB.is_match(&normalize(text))
    }

    /// Parse a command when there is at least one artifact it could apply to
    #[must_use]
    pub fn detect_mutation(&self, text: &str, artifacts: &[&Artifact]) -> Option<MutationIntent> {
        if artifacts.is_empty() {
            return None;
        }
        self.parse(text)
    }

    /// Parse a command into an intent
    #[must_use]
    pub fn parse(&self, text: &str) -> Option<MutationIntent> {
        let normalized = normalize(text);
        let (rule, caps) = RULES
            .iter()
            .find_map(|rule| rule.pattern.captures(&normalized).map(|caps| (rule, caps)))?;
        let intent = (rule.extract)(&caps);
        tracing::debug!(rule = rule.name, text = %normalized, ?intent, "mutation rule matched");
        intent
    }
}

/// Strip politeness, leading target phrases and trailing punctuation
fn normalize(text: &str) -> String {
    let trimmed = text.trim().trim_end_matches(['.', '!', '?']).trim();
    let trimmed = trimmed
        .strip_suffix(" please")
        .or_else(|| trimmed.strip_suffix(", please"))
        .unwrap_or(trimmed);
    LEADING_FILLER.replace(trimmed, "").trim().to_string()
}

/// Remove a trailing "to the plan" / "from #abcd1234" from a captured value
fn strip_target_suffix(value: &str) -> &str {
    match TRAILING_TARGET.find(value) {
        Some(m) => value[..m.start()].trim_end(),
        None => value.trim_end(),
    }
}

fn unquote(value: &str) -> &str {
    let value = value.trim();
    for (open, close) in [('"', '"'), ('\'', '\''), ('“', '”'), ('`', '`')] {
        if let Some(inner) = value.strip_prefix(open).and_then(|v| v.strip_suffix(close)) {
            return inner.trim();
        }
    }
    value
}

/// Interpret a typed value: booleans, null, numbers, else text
///
/// Quoted values are always text.
fn parse_scalar(raw: &str) -> Value {
    let stripped = strip_target_suffix(raw).trim();
    let text = unquote(stripped);
    if text.len() != stripped.len() {
        return Value::String(text.to_string());
    }
    match text.to_lowercase().as_str() {
        "true" | "yes" => return Value::Bool(true),
        "false" | "no" => return Value::Bool(false),
        "null" | "none" | "nothing" => return Value::Null,
        _ => {}
    }
    if let Ok(n) = text.parse::<i64>() {
        return Value::from(n);
    }
    match text.parse::<f64>() {
        Ok(f) if f.is_finite() => Value::from(f),
        _ => Value::String(text.to_string()),
    }
}

/// Fold status synonyms onto the canonical item statuses
#[must_use]
pub fn normalize_status(raw: &str) -> String {
    let word = unquote(strip_target_suffix(raw)).to_lowercase();
    let word = word.trim();
    match word {
        "done" | "complete" | "completed" | "finished" => "complete".into(),
        "in progress" | "in-progress" | "in_progress" | "started" | "doing" | "wip" | "active" => "in_progress".into(),
        "todo" | "to do" | "pending" | "not started" | "open" => "pending".into(),
        "failed" | "failing" | "broken" => "failed".into(),
        "skipped" | "skip" => "skipped".into(),
        other => other.replace([' ', '-'], "_"),
    }
}

/// Field name a collection noun most likely refers to
///
/// Generic nouns ("item", "row", "one") name no particular list.
fn collection_for(noun: &str) -> Option<String> {
    let noun = noun.to_lowercase();
    let field = match noun.as_str() {
        "one" | "item" | "items" | "row" | "rows" => return None,
        "entry" | "entries" => "entries",
        "criterion" | "criteria" => "criteria",
        "card" | "cards" | "todo" | "todos" => "tasks",
        n if n.ends_with('s') => n,
        n => return Some(format!("{n}s")),
    };
    Some(field.to_string())
}

fn with_hint(intent: MutationIntent, noun: Option<regex::Match<'_>>) -> MutationIntent {
    match noun.and_then(|n| collection_for(n.as_str())) {
        Some(field) => intent.with_collection(field),
        None => intent,
    }
}

/// Position and noun from an `ITEM_REF` capture
fn item_ref<'t>(caps: &Captures<'t>) -> Option<(ItemIndex, Option<regex::Match<'t>>)> {
    if let Some(ord) = caps.name("ord") {
        return Some((parse_ordinal(ord.as_str())?, caps.name("noun1")));
    }
    let num = caps.name("num")?;
    Some((parse_position(num.as_str())?, caps.name("noun2")))
}

fn remove_completed(caps: &Captures<'_>) -> Option<MutationIntent> {
    let intent = MutationIntent::new(MutationOperation::RemoveItem).with_condition(ItemCondition::Completed);
    Some(with_hint(intent, caps.name("noun")))
}

fn remove_by_status(caps: &Captures<'_>) -> Option<MutationIntent> {
    let status = normalize_status(caps.name("status")?.as_str());
    let condition = if status == "complete" {
        ItemCondition::Completed
    } else {
        ItemCondition::StatusIs(status)
    };
    let intent = MutationIntent::new(MutationOperation::RemoveItem).with_condition(condition);
    Some(with_hint(intent, caps.name("noun")))
}

fn remove_indexed(caps: &Captures<'_>) -> Option<MutationIntent> {
    let (index, noun) = item_ref(caps)?;
    let intent = MutationIntent::new(MutationOperation::RemoveItem).with_index(index);
    Some(with_hint(intent, noun))
}

fn set_item_property(caps: &Captures<'_>) -> Option<MutationIntent> {
    let (index, noun) = item_ref(caps)?;
    let property = caps.name("prop")?.as_str().trim().to_string();
    let raw = caps.name("value")?.as_str();
    let value = if property.eq_ignore_ascii_case("status") {
        Value::String(normalize_status(raw))
    } else {
        parse_scalar(raw)
    };
    let intent = MutationIntent::new(MutationOperation::UpdateItem)
        .with_index(index)
        .with_property(property)
        .with_value(value);
    Some(with_hint(intent, noun))
}

fn mark_item(caps: &Captures<'_>) -> Option<MutationIntent> {
    let (index, noun) = item_ref(caps)?;
    let status = normalize_status(caps.name("value")?.as_str());
    if status.is_empty() {
        return None;
    }
    let intent = MutationIntent::new(MutationOperation::UpdateItem)
        .with_index(index)
        .with_property("status")
        .with_value(Value::String(status));
    Some(with_hint(intent, noun))
}

fn rename_item(caps: &Captures<'_>) -> Option<MutationIntent> {
    let (index, noun) = item_ref(caps)?;
    let label = unquote(strip_target_suffix(caps.name("value")?.as_str()));
    if label.is_empty() {
        return None;
    }
    let intent = MutationIntent::new(MutationOperation::UpdateItem)
        .with_index(index)
        .with_property("title")
        .with_value(Value::String(label.to_string()));
    Some(with_hint(intent, noun))
}

fn rename_artifact(caps: &Captures<'_>) -> Option<MutationIntent> {
    let title = unquote(strip_target_suffix(caps.name("value")?.as_str()));
    if title.is_empty() {
        return None;
    }
    Some(
        MutationIntent::new(MutationOperation::UpdateProperty)
            .with_property("title")
            .with_value(Value::String(title.to_string())),
    )
}

fn set_property(caps: &Captures<'_>) -> Option<MutationIntent> {
    let property = caps.name("prop")?.as_str().trim().to_string();
    let raw = caps.name("value")?.as_str();
    let value = if property.to_lowercase().ends_with("status") {
        Value::String(unquote(strip_target_suffix(raw)).to_lowercase())
    } else {
        parse_scalar(raw)
    };
    Some(
        MutationIntent::new(MutationOperation::UpdateProperty)
            .with_property(property)
            .with_value(value),
    )
}

fn add_item(caps: &Captures<'_>) -> Option<MutationIntent> {
    let noun = caps.name("noun");
    let mut label = unquote(strip_target_suffix(caps.name("value")?.as_str())).to_string();
    let noun_word = noun.map(|n| n.as_str().to_lowercase());
    if label.is_empty() || BARE_NOUN.is_match(&label) {
        let word = noun_word.clone().unwrap_or_else(|| label.to_lowercase());
        let word = if word.is_empty() { "item".to_string() } else { word };
        label = format!("New {}", word.trim_end_matches('s'));
    }

    let mut intent = MutationIntent::new(MutationOperation::AddItem).with_value(Value::String(label));
    if let Some(pos) = caps.name("pos") {
        intent = intent.with_destination(parse_position(pos.as_str())?);
    } else if let Some(edge) = caps.name("edge") {
        intent = intent.with_destination(edge_index(edge.as_str()));
    }
    Some(with_hint(intent, noun))
}

fn edge_index(edge: &str) -> ItemIndex {
    match edge.to_lowercase().as_str() {
        "end" | "bottom" => ItemIndex::Last,
        _ => ItemIndex::At(0),
    }
}

fn move_item(caps: &Captures<'_>) -> Option<MutationIntent> {
    let (index, noun) = item_ref(caps)?;
    let destination = if let Some(edge) = caps.name("edge") {
        edge_index(edge.as_str())
    } else if let Some(pos) = caps.name("pos") {
        parse_position(pos.as_str())?
    } else {
        parse_ordinal(caps.name("pos_ord")?.as_str())?
    };
    let intent = MutationIntent::new(MutationOperation::ReorderItems)
        .with_index(index)
        .with_destination(destination);
    Some(with_hint(intent, noun))
}

/// "swap A and B" moves A into B's slot and shifts the items between; it is
/// not a two-way exchange unless the positions are adjacent
fn swap_items(caps: &Captures<'_>) -> Option<MutationIntent> {
    let from = parse_position(caps.name("a")?.as_str())?;
    let to = parse_position(caps.name("b")?.as_str())?;
    let intent = MutationIntent::new(MutationOperation::ReorderItems)
        .with_index(from)
        .with_destination(to);
    Some(with_hint(intent, caps.name("noun")))
}
