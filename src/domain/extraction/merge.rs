//! Schema-driven, field-level last-write-wins merge.

use std::collections::BTreeSet;

use crate::domain::conversation::{PendingEntities, PendingInstance};
use crate::domain::entities::{EntitySchema, Extraction, FieldValue, PartialRecord, SchemaSet, SchemaViolation};

/// What a turn's merge did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeReport {
    /// Values dropped because they failed their field's constraint.
    pub violations: Vec<SchemaViolation>,
    /// Entity types that gained or changed an instance.
    pub touched: BTreeSet<String>,
    /// Entity types not present in the schema set.
    pub unknown_types: BTreeSet<String>,
    /// Incoming instances discarded for lacking any valid value.
    pub discarded: usize,
}

impl MergeReport {
    /// Returns true if nothing from the extraction was kept.
    pub fn is_empty(&self) -> bool {
        self.touched.is_empty()
    }
}

/// Merges extracted partial records into pending state.
pub struct MergeEngine;

impl MergeEngine {
    /// Merges `incoming` over `existing` for one instance.
    ///
    /// Concrete incoming values win; absent ones never overwrite. Fields not
    /// in the schema and values failing validation are dropped.
    pub fn merge(schema: &EntitySchema, existing: &PartialRecord, incoming: &PartialRecord) -> PartialRecord {
        let mut violations = Vec::new();
        let clean = Self::sanitize(schema, incoming, &mut violations);
        Self::overlay(schema, existing, &clean)
    }

    /// Applies a whole turn's extraction to the pending entities.
    ///
    /// Per entity type the incoming instances are matched in order to the
    /// pending instances that are still incomplete: the first incoming
    /// instance fills the first incomplete one, the second the second, and so
    /// on. Incoming instances left over are pushed as new ones. `turn_seq` is
    /// stamped on every instance that changes.
    pub fn apply(
        pending: &mut PendingEntities,
        extraction: &Extraction,
        schemas: &SchemaSet,
        turn_seq: u64,
    ) -> MergeReport {
        let mut report = MergeReport::default();

        for (entity_type, instances) in extraction {
            let Some(schema) = schemas.get(entity_type) else {
                tracing::debug!(entity_type = %entity_type, "Dropping unknown entity type");
                report.unknown_types.insert(entity_type.clone());
                continue;
            };

            let list = pending.entry(entity_type.clone()).or_default();
            let mut open = list
                .iter()
                .enumerate()
                .filter(|(_, inst)| !schema.is_complete(&inst.fields))
                .map(|(i, _)| i)
                .collect::<Vec<_>>()
                .into_iter();

            for incoming in instances {
                let clean = Self::sanitize(schema, incoming, &mut report.violations);
                if !clean.has_any_concrete() {
                    report.discarded += 1;
                    continue;
                }

                match open.next().and_then(|i| list.get_mut(i)) {
                    Some(instance) => {
                        instance.fields = Self::overlay(schema, &instance.fields, &clean);
                        instance.touched_turn = turn_seq;
                    }
                    None => {
                        let fields = Self::overlay(schema, &PartialRecord::new(), &clean);
                        list.push(PendingInstance::new(fields, turn_seq));
                    }
                }
                report.touched.insert(entity_type.clone());
            }
        }

        pending.retain(|_, list| !list.is_empty());
        report
    }

    /// Keeps schema fields only, normalizing concrete values and dropping
    /// invalid ones.
    fn sanitize(
        schema: &EntitySchema,
        incoming: &PartialRecord,
        violations: &mut Vec<SchemaViolation>,
    ) -> PartialRecord {
        let mut clean = PartialRecord::new();
        for (field, value) in incoming.iter() {
            if schema.spec(field).is_none() {
                continue;
            }
            match value {
                FieldValue::Absent => clean.set(field.clone(), FieldValue::Absent),
                FieldValue::Present(raw) => match schema.validate(field, raw) {
                    Ok(normalized) => clean.set(field.clone(), FieldValue::Present(normalized)),
                    Err(violation) => {
                        tracing::warn!(
                            entity_type = %violation.entity_type,
                            field = %violation.field,
                            reason = %violation.reason,
                            "Discarding extracted value that violates schema"
                        );
                        violations.push(violation);
                    }
                },
            }
        }
        clean
    }

    fn overlay(schema: &EntitySchema, existing: &PartialRecord, clean: &PartialRecord) -> PartialRecord {
        let mut merged = existing.clone();
        for (field, value) in clean.iter() {
            match value {
                FieldValue::Present(_) => merged.set(field.clone(), value.clone()),
                FieldValue::Absent => {
                    if merged.get(field).is_none() {
                        merged.set(field.clone(), FieldValue::Absent);
                    }
                }
            }
        }
        schema.apply_derivations(&mut merged);
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn schemas() -> SchemaSet {
        SchemaSet::builtin().unwrap()
    }

    fn extraction(entries: Vec<(&str, Vec<PartialRecord>)>) -> Extraction {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    mod merge {
        use super::*;

        #[test]
        fn incoming_concrete_value_wins() {
            let set = schemas();
            let schema = set.get("exercise").unwrap();
            let existing = PartialRecord::new().with("duration_minutes", 30);
            let incoming = PartialRecord::new().with("duration_minutes", 45);

            let merged = MergeEngine::merge(schema, &existing, &incoming);
            assert_eq!(merged.value("duration_minutes"), Some(&json!(45)));
        }

        #[test]
        fn absent_incoming_never_overwrites() {
            let set = schemas();
            let schema = set.get("exercise").unwrap();
            let existing = PartialRecord::new().with("body_parts", json!(["chest"]));
            let incoming = PartialRecord::new().with_absent("body_parts");

            let merged = MergeEngine::merge(schema, &existing, &incoming);
            assert_eq!(merged.value("body_parts"), Some(&json!(["chest"])));
        }

        #[test]
        fn unknown_fields_are_dropped() {
            let set = schemas();
            let schema = set.get("exercise").unwrap();
            let incoming = PartialRecord::new().with("calories", 300).with("exercise_type", "run");

            let merged = MergeEngine::merge(schema, &PartialRecord::new(), &incoming);
            assert!(merged.get("calories").is_none());
            assert!(merged.is_concrete("exercise_type"));
        }

        #[test]
        fn invalid_value_keeps_existing() {
            let set = schemas();
            let schema = set.get("exercise").unwrap();
            let existing = PartialRecord::new().with("intensity", 6);
            let incoming = PartialRecord::new().with("intensity", 15);

            let merged = MergeEngine::merge(schema, &existing, &incoming);
            assert_eq!(merged.value("intensity"), Some(&json!(6)));
        }

        #[test]
        fn later_wake_time_derives_duration() {
            let set = schemas();
            let schema = set.get("sleep").unwrap();
            let existing = PartialRecord::new().with("bedtime_hour", 23);
            let incoming = PartialRecord::new().with("wake_hour", 7);

            let merged = MergeEngine::merge(schema, &existing, &incoming);
            assert_eq!(merged.value("duration_hours"), Some(&json!(8.0)));
        }
    }

    mod apply {
        use super::*;

        #[test]
        fn first_instance_merges_into_open_instance() {
            let set = schemas();
            let mut pending: PendingEntities = BTreeMap::new();
            MergeEngine::apply(
                &mut pending,
                &extraction(vec![("exercise", vec![PartialRecord::new().with("exercise_type", "gym")])]),
                &set,
                1,
            );
            let report = MergeEngine::apply(
                &mut pending,
                &extraction(vec![("exercise", vec![PartialRecord::new().with("duration_minutes", 45)])]),
                &set,
                2,
            );

            assert!(report.touched.contains("exercise"));
            let list = &pending["exercise"];
            assert_eq!(list.len(), 1);
            assert_eq!(list[0].touched_turn, 2);
            assert_eq!(list[0].fields.value("exercise_type"), Some(&json!("gym")));
            assert_eq!(list[0].fields.value("duration_minutes"), Some(&json!(45)));
        }

        #[test]
        fn second_instance_in_same_turn_stays_separate() {
            let set = schemas();
            let mut pending: PendingEntities = BTreeMap::new();
            MergeEngine::apply(
                &mut pending,
                &extraction(vec![(
                    "exercise",
                    vec![
                        PartialRecord::new().with("exercise_type", "run"),
                        PartialRecord::new().with("exercise_type", "swim"),
                    ],
                )]),
                &set,
                1,
            );
            assert_eq!(pending["exercise"].len(), 2);
        }

        #[test]
        fn answers_fill_incomplete_instances_in_order() {
            let set = schemas();
            let mut pending: PendingEntities = BTreeMap::new();
            let both = extraction(vec![(
                "exercise",
                vec![
                    PartialRecord::new().with("exercise_type", "run"),
                    PartialRecord::new().with("exercise_type", "swim"),
                ],
            )]);
            let thirty = extraction(vec![(
                "exercise",
                vec![PartialRecord::new().with("duration_minutes", 30)],
            )]);
            MergeEngine::apply(&mut pending, &both, &set, 1);

            MergeEngine::apply(&mut pending, &thirty, &set, 2);
            let list = &pending["exercise"];
            assert_eq!(list.len(), 2);
            assert_eq!(list[0].fields.value("duration_minutes"), Some(&json!(30)));
            assert!(!list[1].fields.is_concrete("duration_minutes"));

            MergeEngine::apply(&mut pending, &thirty, &set, 3);
            let list = &pending["exercise"];
            assert_eq!(list.len(), 2);
            assert!(list.iter().all(|inst| set.get("exercise").unwrap().is_complete(&inst.fields)));
        }

        #[test]
        fn several_answers_in_one_turn_fill_several_instances() {
            let set = schemas();
            let mut pending: PendingEntities = BTreeMap::new();
            MergeEngine::apply(
                &mut pending,
                &extraction(vec![(
                    "exercise",
                    vec![
                        PartialRecord::new().with("exercise_type", "run"),
                        PartialRecord::new().with("exercise_type", "swim"),
                    ],
                )]),
                &set,
                1,
            );
            MergeEngine::apply(
                &mut pending,
                &extraction(vec![(
                    "exercise",
                    vec![
                        PartialRecord::new().with("duration_minutes", 30),
                        PartialRecord::new().with("duration_minutes", 45),
                        PartialRecord::new().with("exercise_type", "yoga"),
                    ],
                )]),
                &set,
                2,
            );

            let list = &pending["exercise"];
            assert_eq!(list.len(), 3);
            assert_eq!(list[0].fields.value("duration_minutes"), Some(&json!(30)));
            assert_eq!(list[1].fields.value("duration_minutes"), Some(&json!(45)));
            assert_eq!(list[2].fields.value("exercise_type"), Some(&json!("yoga")));
        }

        #[test]
        fn complete_instance_is_not_reopened() {
            let set = schemas();
            let mut pending: PendingEntities = BTreeMap::new();
            let run = PartialRecord::new().with("exercise_type", "run").with("duration_minutes", 30);
            MergeEngine::apply(&mut pending, &extraction(vec![("exercise", vec![run])]), &set, 1);
            MergeEngine::apply(
                &mut pending,
                &extraction(vec![("exercise", vec![PartialRecord::new().with("exercise_type", "walk")])]),
                &set,
                2,
            );

            let list = &pending["exercise"];
            assert_eq!(list.len(), 2);
            assert_eq!(list[0].fields.value("exercise_type"), Some(&json!("run")));
        }

        #[test]
        fn all_absent_instance_creates_nothing() {
            let set = schemas();
            let mut pending: PendingEntities = BTreeMap::new();
            let report = MergeEngine::apply(
                &mut pending,
                &extraction(vec![("sleep", vec![PartialRecord::new().with_absent("quality")])]),
                &set,
                1,
            );
            assert!(pending.is_empty());
            assert!(report.is_empty());
            assert_eq!(report.discarded, 1);
        }

        #[test]
        fn only_invalid_values_creates_nothing() {
            let set = schemas();
            let mut pending: PendingEntities = BTreeMap::new();
            let report = MergeEngine::apply(
                &mut pending,
                &extraction(vec![("sleep", vec![PartialRecord::new().with("bedtime_hour", 13)])]),
                &set,
                1,
            );
            assert!(pending.is_empty());
            assert_eq!(report.violations.len(), 1);
            assert_eq!(report.violations[0].field, "bedtime_hour");
        }

        #[test]
        fn unknown_entity_type_is_reported_and_dropped() {
            let set = schemas();
            let mut pending: PendingEntities = BTreeMap::new();
            let report = MergeEngine::apply(
                &mut pending,
                &extraction(vec![("recipe", vec![PartialRecord::new().with("name", "soup")])]),
                &set,
                1,
            );
            assert!(pending.is_empty());
            assert!(report.unknown_types.contains("recipe"));
        }

        #[test]
        fn several_types_in_one_turn() {
            let set = schemas();
            let mut pending: PendingEntities = BTreeMap::new();
            let report = MergeEngine::apply(
                &mut pending,
                &extraction(vec![
                    ("wellness", vec![PartialRecord::new().with("mood_score", 8)]),
                    ("meditation", vec![PartialRecord::new().with("minutes", 20)]),
                    ("task", vec![PartialRecord::new().with("task", "call the dentist")]),
                ]),
                &set,
                1,
            );
            assert_eq!(report.touched.len(), 3);
            assert_eq!(pending.len(), 3);
        }
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;
        use serde_json::Value;

        fn arb_exercise_field() -> impl Strategy<Value = (String, Option<Value>)> {
            prop_oneof![
                prop_oneof![Just("run"), Just("gym"), Just("GYM"), Just("dance")]
                    .prop_map(|v| ("exercise_type".to_string(), Some(json!(v)))),
                (-5i64..700).prop_map(|v| ("duration_minutes".to_string(), Some(json!(v)))),
                (0i64..12).prop_map(|v| ("intensity".to_string(), Some(json!(v)))),
                (0.0f64..50.0).prop_map(|v| ("distance_km".to_string(), Some(json!(v)))),
                prop::sample::subsequence(vec!["chest", "back", "abs"], 0..3)
                    .prop_map(|v| ("body_parts".to_string(), Some(json!(v)))),
                "[a-z ]{1,20}".prop_map(|v| ("notes".to_string(), Some(json!(v)))),
                prop_oneof![Just("exercise_type"), Just("duration_minutes"), Just("notes")]
                    .prop_map(|f| (f.to_string(), None)),
            ]
        }

        fn arb_record() -> impl Strategy<Value = PartialRecord> {
            prop::collection::vec(arb_exercise_field(), 0..8).prop_map(|fields| {
                let mut record = PartialRecord::new();
                for (field, value) in fields {
                    record.set(field, FieldValue::from(value));
                }
                record
            })
        }

        proptest! {
            #[test]
            fn merge_is_idempotent(raw in arb_record()) {
                let set = schemas();
                let schema = set.get("exercise").unwrap();
                let p = MergeEngine::merge(schema, &PartialRecord::new(), &raw);
                prop_assert_eq!(MergeEngine::merge(schema, &p, &p), p);
            }

            #[test]
            fn merge_retains_concrete_fields_absent_from_incoming(
                existing_raw in arb_record(),
                incoming in arb_record(),
            ) {
                let set = schemas();
                let schema = set.get("exercise").unwrap();
                let existing = MergeEngine::merge(schema, &PartialRecord::new(), &existing_raw);
                let merged = MergeEngine::merge(schema, &existing, &incoming);

                for (field, value) in existing.concrete() {
                    if !incoming.is_concrete(field) {
                        prop_assert_eq!(merged.value(field), Some(value));
                    }
                }
            }

            #[test]
            fn valid_incoming_value_wins(existing_raw in arb_record(), minutes in 1i64..=600) {
                let set = schemas();
                let schema = set.get("exercise").unwrap();
                let existing = MergeEngine::merge(schema, &PartialRecord::new(), &existing_raw);
                let incoming = PartialRecord::new().with("duration_minutes", minutes);

                let merged = MergeEngine::merge(schema, &existing, &incoming);
                prop_assert_eq!(merged.value("duration_minutes"), Some(&json!(minutes)));
            }
        }
    }
}
