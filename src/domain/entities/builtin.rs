//! Built-in life-log schema set.

use super::schema::{Derivation, EntitySchema, FieldKind, FieldSpec, SchemaSet};
use super::SchemaError;

fn choice(options: &[&str]) -> FieldKind {
    FieldKind::Choice {
        options: options.iter().map(|s| s.to_string()).collect(),
    }
}

fn choice_list(options: &[&str]) -> FieldKind {
    FieldKind::ChoiceList {
        options: options.iter().map(|s| s.to_string()).collect(),
    }
}

fn int(min: i64, max: Option<i64>) -> FieldKind {
    FieldKind::Integer {
        min: Some(min),
        max,
        reject_between: None,
    }
}

fn text(max_len: Option<usize>) -> FieldKind {
    FieldKind::Text { max_len }
}

fn sleep() -> EntitySchema {
    EntitySchema::new("sleep", "Sleep")
        .describe_as("a night of sleep; hours are 24h clock")
        .field(
            FieldSpec::new(
                "bedtime_hour",
                "Bedtime",
                FieldKind::Integer {
                    min: Some(0),
                    max: Some(23),
                    reject_between: Some([9, 17]),
                },
            )
            .required("what time you went to bed"),
        )
        .field(FieldSpec::new("bedtime_minute", "Bedtime minute", int(0, Some(59))).hidden())
        .field(
            FieldSpec::new("wake_hour", "Wake time", int(0, Some(23)))
                .required("what time you woke up"),
        )
        .field(FieldSpec::new("wake_minute", "Wake minute", int(0, Some(59))).hidden())
        .field(FieldSpec::new(
            "duration_hours",
            "Duration (hours)",
            FieldKind::Number {
                min: Some(0.0),
                max: Some(24.0),
            },
        ))
        .field(
            FieldSpec::new("quality", "Quality", choice(&["poor", "fair", "good", "excellent"]))
                .required("how well you slept"),
        )
        .field(FieldSpec::new("notes", "Notes", text(Some(500))))
        .derived(Derivation::ElapsedHours {
            start_hour: "bedtime_hour".into(),
            start_minute: Some("bedtime_minute".into()),
            end_hour: "wake_hour".into(),
            end_minute: Some("wake_minute".into()),
            target: "duration_hours".into(),
        })
}

fn exercise() -> EntitySchema {
    EntitySchema::new("exercise", "Exercise")
        .describe_as("one training session; mention each separate session as its own item")
        .field(
            FieldSpec::new(
                "exercise_type",
                "Type",
                choice(&["run", "walk", "gym", "weights", "yoga", "swim", "cycle", "other"]),
            )
            .required("what kind of exercise it was"),
        )
        .field(
            FieldSpec::new(
                "body_parts",
                "Body parts",
                choice_list(&[
                    "full_body",
                    "chest",
                    "biceps",
                    "triceps",
                    "shoulders",
                    "back",
                    "abs",
                    "lower_body",
                    "other",
                ]),
            )
            .required_when("exercise_type", &["gym", "weights"], "which body parts you trained"),
        )
        .field(
            FieldSpec::new("duration_minutes", "Duration (min)", int(1, Some(600)))
                .required("how long it lasted"),
        )
        .field(FieldSpec::new(
            "distance_km",
            "Distance (km)",
            FieldKind::Number {
                min: Some(0.0),
                max: None,
            },
        ))
        .field(FieldSpec::new("intensity", "Intensity", int(1, Some(10))))
        .field(FieldSpec::new("notes", "Notes", text(Some(500))))
}

fn wellness() -> EntitySchema {
    EntitySchema::new("wellness", "Wellness")
        .describe_as("how the user feels; mood and energy on a 1-10 scale")
        .field(FieldSpec::new("mood_score", "Mood", int(1, Some(10))))
        .field(FieldSpec::new("energy_level", "Energy", int(1, Some(10))))
        .field(FieldSpec::new("notes", "Notes", text(Some(1000))))
}

fn meditation() -> EntitySchema {
    EntitySchema::new("meditation", "Meditation")
        .describe_as("a meditation or Heartfulness practice session")
        .field(
            FieldSpec::new("minutes", "Minutes", int(0, None))
                .required("how many minutes you meditated"),
        )
        .field(FieldSpec::new(
            "meditation_type",
            "Practice",
            choice(&["meditation", "cleaning", "sitting", "group_meditation", "other"]),
        ))
        .field(FieldSpec::new("time_of_day", "Time", text(Some(32))))
}

fn task() -> EntitySchema {
    EntitySchema::new("task", "Task")
        .describe_as("a to-do item; priority 1=high, 2=medium, 3=low")
        .field(FieldSpec::new("task", "Task", text(Some(500))).required("what the task is"))
        .field(FieldSpec::new("priority", "Priority", int(1, Some(3))))
}

fn reading_link() -> EntitySchema {
    EntitySchema::new("reading_link", "Reading link")
        .describe_as("a link to read or watch later")
        .field(FieldSpec::new("url", "URL", FieldKind::Url).required("the link"))
        .field(FieldSpec::new("context", "Context", text(Some(500))))
}

fn reminder() -> EntitySchema {
    EntitySchema::new("reminder", "Reminder")
        .describe_as("something to be reminded of at a specific date and time")
        .field(
            FieldSpec::new("text", "Reminder", text(Some(500)))
                .required("what you want to be reminded about"),
        )
        .field(
            FieldSpec::new("remind_at", "When", FieldKind::DateTime)
                .required("when you want the reminder"),
        )
}

fn journal() -> EntitySchema {
    EntitySchema::new("journal", "Journal")
        .describe_as("a free-form note or reflection")
        .field(FieldSpec::new("note", "Note", text(Some(4000))).required("what you want to note"))
}

/// All built-in schemas.
pub fn builtin_schemas() -> Vec<EntitySchema> {
    vec![
        sleep(),
        exercise(),
        wellness(),
        meditation(),
        task(),
        reading_link(),
        reminder(),
        journal(),
    ]
}

impl SchemaSet {
    /// The built-in life-log schema set.
    pub fn builtin() -> Result<Self, SchemaError> {
        SchemaSet::new(builtin_schemas())
    }
}
