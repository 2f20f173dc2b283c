//! Renders turn outcomes into the single chat-facing message.

use serde_json::Value;

use super::{RefusalReason, SyncStatus, TurnOutcome};
use crate::domain::entities::{EntitySchema, FieldKind, PartialRecord, SchemaSet};

pub const INJECTION_REFUSAL: &str = "Sorry, I cannot process that message.";

pub const CRISIS_RESOURCES: &str = "I noticed something in your message that concerns me. \
If you are struggling, please reach out:\n\
iCall (India): 9152987821\n\
Vandrevala Foundation: 1860-2662-345 (24/7)\n\
I am here to chat whenever you feel ready.";

pub const RETRY_MESSAGE: &str = "Sorry, something went wrong on my side. Please try again in a moment.";

pub const CONFIRM_HEADER: &str = "I have logged the following:";

/// Pure rendering of [`TurnOutcome`]s.
pub struct ResponseComposer;

impl ResponseComposer {
    pub fn render(outcome: &TurnOutcome, schemas: &SchemaSet) -> String {
        match outcome {
            TurnOutcome::Clarify { prompts } if prompts.is_empty() => {
                "Could you tell me a bit more?".to_string()
            }
            TurnOutcome::Clarify { prompts } => prompts
                .iter()
                .map(|p| p.text.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
            TurnOutcome::Confirm { entities, sync } => {
                let mut lines = vec![CONFIRM_HEADER.to_string()];
                for entity in entities {
                    let line = match schemas.get(&entity.entity_type) {
                        Some(schema) => entity_summary(schema, &entity.fields),
                        None => entity.entity_type.clone(),
                    };
                    lines.push(format!("- {}", line));
                }
                match sync {
                    SyncStatus::Skipped => {}
                    SyncStatus::Synced => lines.push("Synced to Notion.".to_string()),
                    SyncStatus::Degraded { failed } => lines.push(format!(
                        "Saved, but I couldn't sync {} to Notion right now.",
                        failed.join(", ")
                    )),
                }
                lines.join("\n")
            }
            TurnOutcome::QueryAnswer(answer) => answer.clone(),
            TurnOutcome::Chitchat(reply) => reply.clone(),
            TurnOutcome::Refused(RefusalReason::Injection) => INJECTION_REFUSAL.to_string(),
            TurnOutcome::Refused(RefusalReason::Crisis) => CRISIS_RESOURCES.to_string(),
            TurnOutcome::Error => RETRY_MESSAGE.to_string(),
        }
    }
}

/// One-line rendering of an entity's summary fields, e.g.
/// `"Meditation: Minutes: 20"`.
pub fn entity_summary(schema: &EntitySchema, fields: &PartialRecord) -> String {
    let parts: Vec<String> = schema
        .fields
        .iter()
        .filter(|spec| spec.summary)
        .filter_map(|spec| {
            fields
                .value(&spec.name)
                .map(|v| format!("{}: {}", spec.label, display_value(&spec.kind, v)))
        })
        .collect();
    if parts.is_empty() {
        schema.label.clone()
    } else {
        format!("{}: {}", schema.label, parts.join(", "))
    }
}

fn display_value(kind: &FieldKind, value: &Value) -> String {
    let is_choice = matches!(kind, FieldKind::Choice { .. } | FieldKind::ChoiceList { .. });
    let text = |s: &str| {
        if is_choice {
            s.replace('_', " ")
        } else {
            s.to_string()
        }
    };
    match value {
        Value::String(s) => text(s),
        Value::Array(items) => items
            .iter()
            .map(|i| match i {
                Value::String(s) => text(s),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", "),
        Value::Bool(true) => "yes".to_string(),
        Value::Bool(false) => "no".to_string(),
        other => other.to_string(),
    }
}
