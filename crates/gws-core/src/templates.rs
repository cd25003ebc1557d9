//! Built-in workspace templates

use gws_artifact::{ArtifactKind, RelationshipKind};
use serde_json::{json, Value};

/// Names accepted by [`builtin`]
pub const TEMPLATE_NAMES: [&str; 2] = ["incident-response", "product-launch"];

/// One artifact in a template
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateArtifact {
    pub kind: ArtifactKind,
    pub title: &'static str,
    pub state: Value,
}

/// A named set of artifacts and the edges between them
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub name: &'static str,
    pub description: &'static str,
    pub artifacts: Vec<TemplateArtifact>,
    /// Edges as (source index, target index, kind) into `artifacts`
    pub links: Vec<(usize, usize, RelationshipKind)>,
}

/// Look up a built-in template by name
#[must_use]
pub fn builtin(name: &str) -> Option<Template> {
    match name.trim().to_lowercase().replace([' ', '_'], "-").as_str() {
        "incident-response" => Some(incident_response()),
        "product-launch" => Some(product_launch()),
        _ => None,
    }
}

fn incident_response() -> Template {
    Template {
        name: "incident-response",
        description: "Status panel, response plan and diagnostics for a live incident",
        artifacts: vec![
            TemplateArtifact {
                kind: ArtifactKind::SystemStatusPanel,
                title: "Incident status",
                state: json!({
                    "title": "Incident status",
                    "overallStatus": "degraded",
                    "metrics": [
                        {"label": "Error rate", "value": "4.2%", "status": "degraded"},
                        {"label": "p99 latency", "value": "1.8s", "status": "degraded"},
                        {"label": "Availability", "value": "99.1%", "status": "healthy"}
                    ]
                }),
            },
            TemplateArtifact {
                kind: ArtifactKind::ExecutionPlan,
                title: "Incident response",
                state: json!({
                    "title": "Incident response",
                    "steps": ["Triage and assign an incident lead", "Mitigate customer impact", "Post status updates", "Write the postmortem"]
                }),
            },
            TemplateArtifact {
                kind: ArtifactKind::CommandResultPanel,
                title: "Diagnostics",
                state: json!({
                    "title": "Diagnostics",
                    "command": "collect diagnostics",
                    "status": "running",
                    "output": "",
                    "entries": []
                }),
            },
        ],
        links: vec![
            (1, 0, RelationshipKind::References),
            (1, 2, RelationshipKind::References),
            (2, 0, RelationshipKind::References),
        ],
    }
}

fn product_launch() -> Template {
    Template {
        name: "product-launch",
        description: "Launch plan, the board derived from it and a channel decision",
        artifacts: vec![
            TemplateArtifact {
                kind: ArtifactKind::ExecutionPlan,
                title: "Launch plan",
                state: json!({
                    "title": "Launch plan",
                    "steps": ["Finalize scope", "Beta with design partners", "Pricing review", "Public announcement"]
                }),
            },
            TemplateArtifact {
                kind: ArtifactKind::KanbanBoard,
                title: "Launch board",
                state: json!({
                    "title": "Launch board",
                    "columns": ["todo", "in_progress", "done"],
                    "tasks": [
                        {"title": "Landing page copy", "column": "todo", "priority": "high"},
                        {"title": "Beta invite list", "column": "in_progress"},
                        {"title": "Pricing page", "column": "todo"}
                    ]
                }),
            },
            TemplateArtifact {
                kind: ArtifactKind::DecisionMatrix,
                title: "Launch channel",
                state: json!({
                    "title": "Launch channel",
                    "options": [{"name": "Product Hunt"}, {"name": "Press release"}, {"name": "Email list"}],
                    "criteria": [{"name": "Reach", "weight": 3}, {"name": "Cost", "weight": 2}],
                    "recommendation": null
                }),
            },
        ],
        links: vec![(1, 0, RelationshipKind::DerivedFrom), (2, 0, RelationshipKind::References)],
    }
}
