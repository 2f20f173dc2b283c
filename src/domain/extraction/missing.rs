//! Missing-field resolution and clarification prompts.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::conversation::PendingEntities;
use crate::domain::entities::{EntitySchema, PartialRecord, SchemaSet};

/// A required field that a pending instance still lacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingField {
    pub entity_type: String,
    /// Index of the instance within its entity type's pending list.
    pub instance: usize,
    pub field: String,
    /// Phrase used in the clarification question.
    pub prompt: String,
    /// Names the instance when its type has several pending, e.g. `"run"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
}

/// One clarification question covering every missing field of one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClarificationPrompt {
    pub entity_type: String,
    pub instance: usize,
    pub fields: Vec<String>,
    pub text: String,
}

/// Computes outstanding required fields from pending entities.
#[derive(Debug, Clone, Copy, Default)]
pub struct MissingFieldResolver;

impl MissingFieldResolver {
    /// Every (entity type, instance, field) still required.
    ///
    /// Entity types touched most recently come first; ties fall back to the
    /// type name. Within a type instances keep their pending order, which is
    /// the order the merge fills them in, and fields keep schema order.
    pub fn resolve(&self, pending: &PendingEntities, schemas: &SchemaSet) -> Vec<MissingField> {
        let mut types: Vec<(u64, &str)> = pending
            .iter()
            .map(|(entity_type, list)| {
                let recency = list.iter().map(|inst| inst.touched_turn).max().unwrap_or(0);
                (recency, entity_type.as_str())
            })
            .collect();
        types.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(b.1)));

        let mut missing = Vec::new();
        for (_, entity_type) in types {
            let (Some(schema), Some(list)) = (schemas.get(entity_type), pending.get(entity_type))
            else {
                continue;
            };
            for (index, instance) in list.iter().enumerate() {
                let qualifier = (list.len() > 1).then(|| qualifier(schema, &instance.fields, index));
                for spec in schema.missing_fields(&instance.fields) {
                    missing.push(MissingField {
                        entity_type: entity_type.to_string(),
                        instance: index,
                        field: spec.name.clone(),
                        prompt: spec.prompt_phrase(),
                        qualifier: qualifier.clone(),
                    });
                }
            }
        }
        missing
    }

    /// Groups missing fields into one question per instance, keeping the
    /// order of `missing`.
    pub fn prompts(&self, missing: &[MissingField], schemas: &SchemaSet) -> Vec<ClarificationPrompt> {
        let mut groups: Vec<Vec<&MissingField>> = Vec::new();
        for entry in missing {
            let group = groups.iter_mut().find(|g| {
                g[0].entity_type == entry.entity_type && g[0].instance == entry.instance
            });
            match group {
                Some(fields) => {
                    if !fields.iter().any(|f| f.field == entry.field) {
                        fields.push(entry);
                    }
                }
                None => groups.push(vec![entry]),
            }
        }

        groups
            .into_iter()
            .map(|fields| {
                let first = fields[0];
                let label = schemas
                    .get(&first.entity_type)
                    .map(|s| s.label.to_lowercase())
                    .unwrap_or_else(|| first.entity_type.replace('_', " "));
                let subject = match &first.qualifier {
                    Some(q) => format!("{} ({})", label, q),
                    None => label,
                };
                let phrases: Vec<&str> = fields.iter().map(|f| f.prompt.as_str()).collect();
                ClarificationPrompt {
                    text: format!(
                        "For your {}, could you tell me {}?",
                        subject,
                        join_phrases(&phrases)
                    ),
                    fields: fields.iter().map(|f| f.field.clone()).collect(),
                    entity_type: first.entity_type.clone(),
                    instance: first.instance,
                }
            })
            .collect()
    }
}

/// First text value in schema order, or the instance's ordinal.
fn qualifier(schema: &EntitySchema, fields: &PartialRecord, index: usize) -> String {
    schema
        .fields
        .iter()
        .find_map(|spec| fields.value(&spec.name).and_then(Value::as_str))
        .map(|s| s.replace('_', " "))
        .unwrap_or_else(|| format!("#{}", index + 1))
}

fn join_phrases(phrases: &[&str]) -> String {
    match phrases {
        [] => String::new(),
        [one] => one.to_string(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::PendingInstance;
    use crate::domain::entities::PartialRecord;
    use std::collections::BTreeMap;

    fn schemas() -> SchemaSet {
        SchemaSet::builtin().unwrap()
    }

    fn pending(entries: Vec<(&str, PartialRecord, u64)>) -> PendingEntities {
        let mut map: PendingEntities = BTreeMap::new();
        for (entity_type, fields, turn) in entries {
            map.entry(entity_type.to_string())
                .or_default()
                .push(PendingInstance::new(fields, turn));
        }
        map
    }

    #[test]
    fn gym_session_yields_combined_prompt() {
        let set = schemas();
        let p = pending(vec![("exercise", PartialRecord::new().with("exercise_type", "gym"), 1)]);

        let missing = MissingFieldResolver.resolve(&p, &set);
        let fields: Vec<_> = missing.iter().map(|m| m.field.as_str()).collect();
        assert_eq!(fields, vec!["body_parts", "duration_minutes"]);

        let prompts = MissingFieldResolver.prompts(&missing, &set);
        assert_eq!(prompts.len(), 1);
        assert_eq!(
            prompts[0].text,
            "For your exercise, could you tell me which body parts you trained and how long it lasted?"
        );
    }

    #[test]
    fn most_recently_touched_entity_comes_first() {
        let set = schemas();
        let p = pending(vec![
            ("exercise", PartialRecord::new().with("exercise_type", "run"), 1),
            ("sleep", PartialRecord::new().with("quality", "good"), 2),
        ]);

        let missing = MissingFieldResolver.resolve(&p, &set);
        assert_eq!(missing[0].entity_type, "sleep");
        assert_eq!(missing.last().unwrap().entity_type, "exercise");
    }

    #[test]
    fn ties_break_by_name_then_instance() {
        let set = schemas();
        let p = pending(vec![
            ("task", PartialRecord::new().with("priority", 1), 3),
            ("exercise", PartialRecord::new().with("exercise_type", "run"), 3),
            ("exercise", PartialRecord::new().with("exercise_type", "swim"), 3),
        ]);

        let order: Vec<_> = MissingFieldResolver
            .resolve(&p, &set)
            .into_iter()
            .map(|m| (m.entity_type, m.instance))
            .collect();
        assert_eq!(
            order,
            vec![
                ("exercise".to_string(), 0),
                ("exercise".to_string(), 1),
                ("task".to_string(), 0)
            ]
        );
    }

    #[test]
    fn each_instance_gets_its_own_named_prompt() {
        let set = schemas();
        let p = pending(vec![
            ("exercise", PartialRecord::new().with("exercise_type", "run"), 1),
            ("exercise", PartialRecord::new().with("exercise_type", "swim"), 1),
        ]);

        let missing = MissingFieldResolver.resolve(&p, &set);
        assert_eq!(missing.len(), 2);
        assert_eq!(missing[0].qualifier.as_deref(), Some("run"));

        let prompts = MissingFieldResolver.prompts(&missing, &set);
        let texts: Vec<_> = prompts.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "For your exercise (run), could you tell me how long it lasted?",
                "For your exercise (swim), could you tell me how long it lasted?",
            ]
        );
        assert_eq!(prompts[1].instance, 1);
    }

    #[test]
    fn instances_keep_pending_order_regardless_of_touch() {
        let set = schemas();
        let p = pending(vec![
            ("exercise", PartialRecord::new().with("exercise_type", "run"), 1),
            ("exercise", PartialRecord::new().with("exercise_type", "swim"), 4),
        ]);

        let instances: Vec<_> = MissingFieldResolver
            .resolve(&p, &set)
            .into_iter()
            .map(|m| m.instance)
            .collect();
        assert_eq!(instances, vec![0, 1]);
    }

    #[test]
    fn unnamed_instance_falls_back_to_ordinal() {
        let set = schemas();
        let p = pending(vec![
            ("exercise", PartialRecord::new().with("exercise_type", "run"), 1),
            ("exercise", PartialRecord::new().with("duration_minutes", 20), 1),
        ]);

        let prompts = MissingFieldResolver.prompts(&MissingFieldResolver.resolve(&p, &set), &set);
        assert_eq!(
            prompts[1].text,
            "For your exercise (#2), could you tell me what kind of exercise it was?"
        );
    }

    #[test]
    fn single_instance_has_no_qualifier() {
        let set = schemas();
        let p = pending(vec![("exercise", PartialRecord::new().with("exercise_type", "run"), 1)]);
        assert_eq!(MissingFieldResolver.resolve(&p, &set)[0].qualifier, None);
    }

    #[test]
    fn complete_pending_has_nothing_missing() {
        let set = schemas();
        let p = pending(vec![("task", PartialRecord::new().with("task", "call the dentist"), 1)]);
        assert!(MissingFieldResolver.resolve(&p, &set).is_empty());
    }

    #[test]
    fn three_phrases_are_joined_with_commas() {
        assert_eq!(join_phrases(&["a", "b", "c"]), "a, b and c");
    }
}
