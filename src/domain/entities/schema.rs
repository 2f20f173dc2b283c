//! Entity schemas: field shapes, validity constraints and requirements.
//!
//! The schema set is the source of truth for what an entity looks like.
//! Merge drops anything it does not name, and the missing-field resolver
//! asks only for what it marks required.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use super::value::PartialRecord;

/// An extracted value failed its field's validity constraint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{entity_type}.{field}: {reason}")]
pub struct SchemaViolation {
    pub entity_type: String,
    pub field: String,
    pub reason: String,
}

/// Errors building or loading a schema set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("Failed to parse schema definition: {0}")]
    Parse(String),

    #[error("Entity type '{0}' is defined more than once")]
    DuplicateEntity(String),

    #[error("Entity '{entity}' has duplicate field '{field}'")]
    DuplicateField { entity: String, field: String },

    #[error("Entity '{entity}' references unknown field '{field}'")]
    UnknownReference { entity: String, field: String },

    #[error("Schema set is empty")]
    Empty,
}

/// Shape and validity constraint of a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Text {
        #[serde(default)]
        max_len: Option<usize>,
    },
    Integer {
        #[serde(default)]
        min: Option<i64>,
        #[serde(default)]
        max: Option<i64>,
        /// Inclusive band of values that are rejected even inside min/max.
        #[serde(default)]
        reject_between: Option<[i64; 2]>,
    },
    Number {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
    Choice {
        options: Vec<String>,
    },
    ChoiceList {
        options: Vec<String>,
    },
    Url,
    Date,
    DateTime,
    Flag,
}

impl FieldKind {
    /// Validates a raw extracted value, returning its normalized form.
    pub fn normalize(&self, value: &Value) -> Result<Value, String> {
        match self {
            FieldKind::Text { max_len } => {
                let text = match value {
                    Value::String(s) => s.trim().to_string(),
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => return Err("expected text".to_string()),
                };
                if text.is_empty() {
                    return Err("text is empty".to_string());
                }
                if let Some(max) = max_len {
                    if text.chars().count() > *max {
                        return Err(format!("longer than {} characters", max));
                    }
                }
                Ok(Value::String(text))
            }
            FieldKind::Integer {
                min,
                max,
                reject_between,
            } => {
                let n = as_integer(value).ok_or_else(|| "expected a whole number".to_string())?;
                if let Some(min) = min {
                    if n < *min {
                        return Err(format!("{} is below the minimum {}", n, min));
                    }
                }
                if let Some(max) = max {
                    if n > *max {
                        return Err(format!("{} is above the maximum {}", n, max));
                    }
                }
                if let Some([low, high]) = reject_between {
                    if (*low..=*high).contains(&n) {
                        return Err(format!("{} falls in the rejected band {}-{}", n, low, high));
                    }
                }
                Ok(Value::from(n))
            }
            FieldKind::Number { min, max } => {
                let n = as_number(value).ok_or_else(|| "expected a number".to_string())?;
                if !n.is_finite() {
                    return Err("number is not finite".to_string());
                }
                if let Some(min) = min {
                    if n < *min {
                        return Err(format!("{} is below the minimum {}", n, min));
                    }
                }
                if let Some(max) = max {
                    if n > *max {
                        return Err(format!("{} is above the maximum {}", n, max));
                    }
                }
                serde_json::Number::from_f64(n)
                    .map(Value::Number)
                    .ok_or_else(|| "number is not representable".to_string())
            }
            FieldKind::Choice { options } => {
                let raw = value
                    .as_str()
                    .ok_or_else(|| "expected one of the listed options".to_string())?;
                match_option(options, raw)
                    .map(Value::String)
                    .ok_or_else(|| format!("'{}' is not one of {}", raw, options.join(", ")))
            }
            FieldKind::ChoiceList { options } => {
                let items: Vec<&Value> = match value {
                    Value::Array(items) => items.iter().collect(),
                    single @ Value::String(_) => vec![single],
                    _ => return Err("expected a list of options".to_string()),
                };
                let mut normalized: Vec<Value> = Vec::new();
                for item in items {
                    let raw = item
                        .as_str()
                        .ok_or_else(|| "list items must be text".to_string())?;
                    let option = match_option(options, raw)
                        .ok_or_else(|| format!("'{}' is not one of {}", raw, options.join(", ")))?;
                    let option = Value::String(option);
                    if !normalized.contains(&option) {
                        normalized.push(option);
                    }
                }
                if normalized.is_empty() {
                    return Err("list is empty".to_string());
                }
                Ok(Value::Array(normalized))
            }
            FieldKind::Url => {
                let raw = value.as_str().ok_or_else(|| "expected a URL".to_string())?.trim();
                let url = reqwest::Url::parse(raw).map_err(|e| e.to_string())?;
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(format!("unsupported URL scheme '{}'", url.scheme()));
                }
                Ok(Value::String(url.to_string()))
            }
            FieldKind::Date => {
                let raw = value.as_str().ok_or_else(|| "expected a date".to_string())?.trim();
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
                    .map_err(|e| e.to_string())
            }
            FieldKind::DateTime => {
                let raw = value
                    .as_str()
                    .ok_or_else(|| "expected a date and time".to_string())?
                    .trim();
                parse_datetime(raw)
                    .map(|dt| Value::String(dt.format("%Y-%m-%dT%H:%M:%S").to_string()))
                    .ok_or_else(|| format!("'{}' is not a date and time", raw))
            }
            FieldKind::Flag => match value {
                Value::Bool(b) => Ok(Value::Bool(*b)),
                Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
                Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
                _ => Err("expected true or false".to_string()),
            },
        }
    }

    /// Short type hint for the extraction prompt.
    pub fn hint(&self) -> String {
        match self {
            FieldKind::Text { .. } => "text".to_string(),
            FieldKind::Integer { min, max, .. } => match (min, max) {
                (Some(lo), Some(hi)) => format!("integer {}-{}", lo, hi),
                (Some(lo), None) => format!("integer >= {}", lo),
                _ => "integer".to_string(),
            },
            FieldKind::Number { .. } => "number".to_string(),
            FieldKind::Choice { options } => format!("one of: {}", options.join("|")),
            FieldKind::ChoiceList { options } => format!("list of: {}", options.join("|")),
            FieldKind::Url => "URL".to_string(),
            FieldKind::Date => "date YYYY-MM-DD".to_string(),
            FieldKind::DateTime => "datetime YYYY-MM-DDTHH:MM".to_string(),
            FieldKind::Flag => "true|false".to_string(),
        }
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn match_option(options: &[String], raw: &str) -> Option<String> {
    let wanted = raw.trim().to_lowercase().replace([' ', '-'], "_");
    options
        .iter()
        .find(|o| o.to_lowercase() == wanted)
        .cloned()
}

fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// When a field must be supplied before an entity can be finalized.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    #[default]
    Optional,
    Always,
    /// Required only while another field holds one of the listed values.
    When { field: String, one_of: Vec<String> },
}

/// Specification of one field in an entity schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub requirement: Requirement,
    /// Phrase used inside a clarification question, e.g. "how long it lasted".
    #[serde(default)]
    pub prompt: Option<String>,
    /// Whether the field is shown in confirmation summaries.
    #[serde(default = "default_summary")]
    pub summary: bool,
}

fn default_summary() -> bool {
    true
}

impl FieldSpec {
    /// Creates an optional field.
    pub fn new(name: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind,
            requirement: Requirement::Optional,
            prompt: None,
            summary: true,
        }
    }

    /// Marks the field as always required.
    pub fn required(mut self, prompt: impl Into<String>) -> Self {
        self.requirement = Requirement::Always;
        self.prompt = Some(prompt.into());
        self
    }

    /// Marks the field as required while `field` holds one of `one_of`.
    pub fn required_when(
        mut self,
        field: impl Into<String>,
        one_of: &[&str],
        prompt: impl Into<String>,
    ) -> Self {
        self.requirement = Requirement::When {
            field: field.into(),
            one_of: one_of.iter().map(|s| s.to_string()).collect(),
        };
        self.prompt = Some(prompt.into());
        self
    }

    /// Hides the field from confirmation summaries.
    pub fn hidden(mut self) -> Self {
        self.summary = false;
        self
    }

    /// Clarification phrase, falling back to the label.
    pub fn prompt_phrase(&self) -> String {
        self.prompt
            .clone()
            .unwrap_or_else(|| format!("the {}", self.label.to_lowercase()))
    }
}

/// A value computed from other fields after every merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Derivation {
    /// Hours elapsed between two clock times, wrapping past midnight.
    ElapsedHours {
        start_hour: String,
        #[serde(default)]
        start_minute: Option<String>,
        end_hour: String,
        #[serde(default)]
        end_minute: Option<String>,
        target: String,
    },
}

impl Derivation {
    fn referenced_fields(&self) -> Vec<&str> {
        match self {
            Derivation::ElapsedHours {
                start_hour,
                start_minute,
                end_hour,
                end_minute,
                target,
            } => {
                let mut fields = vec![start_hour.as_str(), end_hour.as_str(), target.as_str()];
                fields.extend(start_minute.as_deref());
                fields.extend(end_minute.as_deref());
                fields
            }
        }
    }

    fn apply(&self, record: &mut PartialRecord) {
        match self {
            Derivation::ElapsedHours {
                start_hour,
                start_minute,
                end_hour,
                end_minute,
                target,
            } => {
                if record.is_concrete(target) {
                    return;
                }
                let read = |field: &Option<String>| {
                    field
                        .as_deref()
                        .and_then(|f| record.value(f))
                        .and_then(Value::as_i64)
                        .unwrap_or(0)
                };
                let (Some(start), Some(end)) = (
                    record.value(start_hour).and_then(Value::as_i64),
                    record.value(end_hour).and_then(Value::as_i64),
                ) else {
                    return;
                };
                let start_total = start * 60 + read(start_minute);
                let mut end_total = end * 60 + read(end_minute);
                if end_total <= start_total {
                    end_total += 24 * 60;
                }
                let hours = ((end_total - start_total) as f64 / 60.0 * 100.0).round() / 100.0;
                if let Some(n) = serde_json::Number::from_f64(hours) {
                    record.set(target.clone(), Value::Number(n).into());
                }
            }
        }
    }
}

/// Schema of one entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySchema {
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub derive: Vec<Derivation>,
}

impl EntitySchema {
    /// Creates a schema with no fields.
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            description: None,
            fields: Vec::new(),
            derive: Vec::new(),
        }
    }

    /// Sets the description shown to the extractor.
    pub fn describe_as(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a field.
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Adds a derivation.
    pub fn derived(mut self, derivation: Derivation) -> Self {
        self.derive.push(derivation);
        self
    }

    /// Looks up a field spec.
    pub fn spec(&self, field: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == field)
    }

    /// Returns true if the field is required given the record's other values.
    pub fn is_required(&self, spec: &FieldSpec, record: &PartialRecord) -> bool {
        match &spec.requirement {
            Requirement::Optional => false,
            Requirement::Always => true,
            Requirement::When { field, one_of } => match record.value(field) {
                Some(Value::String(s)) => one_of.iter().any(|o| o == s),
                Some(Value::Array(items)) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .any(|s| one_of.iter().any(|o| o == s)),
                _ => false,
            },
        }
    }

    /// Required fields not yet holding a concrete value, in schema order.
    pub fn missing_fields<'a>(&'a self, record: &PartialRecord) -> Vec<&'a FieldSpec> {
        self.fields
            .iter()
            .filter(|spec| self.is_required(spec, record) && !record.is_concrete(&spec.name))
            .collect()
    }

    /// Returns true if every required field is concrete.
    pub fn is_complete(&self, record: &PartialRecord) -> bool {
        self.missing_fields(record).is_empty()
    }

    /// Validates one extracted value against its field.
    pub fn validate(&self, field: &str, value: &Value) -> Result<Value, SchemaViolation> {
        let violation = |reason: String| SchemaViolation {
            entity_type: self.name.clone(),
            field: field.to_string(),
            reason,
        };
        let spec = self
            .spec(field)
            .ok_or_else(|| violation("field is not part of the schema".to_string()))?;
        spec.kind.normalize(value).map_err(violation)
    }

    /// Recomputes derived fields in place.
    pub fn apply_derivations(&self, record: &mut PartialRecord) {
        for derivation in &self.derive {
            derivation.apply(record);
        }
    }

    fn check(&self) -> Result<(), SchemaError> {
        let mut seen = std::collections::HashSet::new();
        for spec in &self.fields {
            if !seen.insert(spec.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    entity: self.name.clone(),
                    field: spec.name.clone(),
                });
            }
        }
        let unknown = |field: &str| SchemaError::UnknownReference {
            entity: self.name.clone(),
            field: field.to_string(),
        };
        for spec in &self.fields {
            if let Requirement::When { field, .. } = &spec.requirement {
                if self.spec(field).is_none() {
                    return Err(unknown(field));
                }
            }
        }
        for derivation in &self.derive {
            if let Some(field) = derivation
                .referenced_fields()
                .into_iter()
                .find(|f| self.spec(f).is_none())
            {
                return Err(unknown(field));
            }
        }
        Ok(())
    }
}

/// The set of entity schemas the engine works with.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaSet {
    schemas: BTreeMap<String, EntitySchema>,
}

impl SchemaSet {
    /// Builds a set, checking names and internal references.
    pub fn new(schemas: Vec<EntitySchema>) -> Result<Self, SchemaError> {
        if schemas.is_empty() {
            return Err(SchemaError::Empty);
        }
        let mut map = BTreeMap::new();
        for schema in schemas {
            schema.check()?;
            if map.contains_key(&schema.name) {
                return Err(SchemaError::DuplicateEntity(schema.name));
            }
            map.insert(schema.name.clone(), schema);
        }
        Ok(Self { schemas: map })
    }

    /// Parses a YAML list of entity schemas.
    pub fn from_yaml(yaml: &str) -> Result<Self, SchemaError> {
        let schemas: Vec<EntitySchema> =
            serde_yaml::from_str(yaml).map_err(|e| SchemaError::Parse(e.to_string()))?;
        Self::new(schemas)
    }

    /// Looks up a schema by entity type.
    pub fn get(&self, entity_type: &str) -> Option<&EntitySchema> {
        self.schemas.get(entity_type)
    }

    /// Iterates schemas in name order.
    pub fn iter(&self) -> impl Iterator<Item = &EntitySchema> {
        self.schemas.values()
    }

    /// Number of entity types.
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Returns true if the set is empty (never true for a constructed set).
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Plain-text description of every entity type for the extraction prompt.
    pub fn describe(&self) -> String {
        self.schemas
            .values()
            .map(|schema| {
                let fields = schema
                    .fields
                    .iter()
                    .map(|f| format!("    - {} ({})", f.name, f.kind.hint()))
                    .collect::<Vec<_>>()
                    .join("\n");
                match &schema.description {
                    Some(desc) => format!("- {}: {}\n{}", schema.name, desc, fields),
                    None => format!("- {}\n{}", schema.name, fields),
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn exercise() -> EntitySchema {
        EntitySchema::new("exercise", "Exercise")
            .field(
                FieldSpec::new(
                    "exercise_type",
                    "Exercise type",
                    FieldKind::Choice {
                        options: vec!["run".into(), "gym".into(), "weights".into()],
                    },
                )
                .required("what kind of exercise it was"),
            )
            .field(
                FieldSpec::new(
                    "body_parts",
                    "Body parts",
                    FieldKind::ChoiceList {
                        options: vec!["chest".into(), "back".into(), "lower_body".into()],
                    },
                )
                .required_when("exercise_type", &["gym", "weights"], "which body parts you trained"),
            )
    }

    #[test]
    fn text_enforces_max_len() {
        let kind = FieldKind::Text { max_len: Some(3) };
        assert_eq!(kind.normalize(&json!(" abc ")), Ok(json!("abc")));
        assert!(kind.normalize(&json!("abcd")).is_err());
        assert!(kind.normalize(&json!("")).is_err());
    }

    #[test]
    fn integer_accepts_numeric_strings_and_whole_floats() {
        let kind = FieldKind::Integer {
            min: Some(1),
            max: Some(600),
            reject_between: None,
        };
        assert_eq!(kind.normalize(&json!("45")), Ok(json!(45)));
        assert_eq!(kind.normalize(&json!(45.0)), Ok(json!(45)));
        assert!(kind.normalize(&json!(45.5)).is_err());
        assert!(kind.normalize(&json!(0)).is_err());
        assert!(kind.normalize(&json!(601)).is_err());
    }

    #[test]
    fn integer_rejects_band() {
        let kind = FieldKind::Integer {
            min: Some(0),
            max: Some(23),
            reject_between: Some([9, 17]),
        };
        assert!(kind.normalize(&json!(13)).is_err());
        assert_eq!(kind.normalize(&json!(23)), Ok(json!(23)));
    }

    #[test]
    fn choice_is_normalized_case_insensitively() {
        let kind = FieldKind::Choice {
            options: vec!["lower_body".into()],
        };
        assert_eq!(kind.normalize(&json!("Lower Body")), Ok(json!("lower_body")));
        assert!(kind.normalize(&json!("arms")).is_err());
    }

    #[test]
    fn choice_list_accepts_single_string_and_dedupes() {
        let kind = FieldKind::ChoiceList {
            options: vec!["chest".into(), "back".into()],
        };
        assert_eq!(kind.normalize(&json!("chest")), Ok(json!(["chest"])));
        assert_eq!(
            kind.normalize(&json!(["chest", "Chest", "back"])),
            Ok(json!(["chest", "back"]))
        );
        assert!(kind.normalize(&json!([])).is_err());
    }

    #[test]
    fn url_requires_http_scheme() {
        assert!(FieldKind::Url.normalize(&json!("https://example.com/a")).is_ok());
        assert!(FieldKind::Url.normalize(&json!("ftp://example.com")).is_err());
        assert!(FieldKind::Url.normalize(&json!("not a url")).is_err());
    }

    #[test]
    fn datetime_accepts_common_formats() {
        let kind = FieldKind::DateTime;
        assert_eq!(
            kind.normalize(&json!("2024-05-01T09:30")),
            Ok(json!("2024-05-01T09:30:00"))
        );
        assert_eq!(
            kind.normalize(&json!("2024-05-01 09:30:15")),
            Ok(json!("2024-05-01T09:30:15"))
        );
        assert!(kind.normalize(&json!("tomorrow")).is_err());
    }

    #[test]
    fn conditional_requirement_depends_on_other_field() {
        let schema = exercise();
        let run = PartialRecord::new().with("exercise_type", "run");
        let gym = PartialRecord::new().with("exercise_type", "gym");

        assert!(schema.is_complete(&run));
        let missing: Vec<_> = schema.missing_fields(&gym).iter().map(|f| f.name.as_str()).collect();
        assert_eq!(missing, vec!["body_parts"]);
    }

    #[test]
    fn validate_rejects_unknown_field() {
        let schema = exercise();
        let err = schema.validate("calories", &json!(300)).unwrap_err();
        assert_eq!(err.entity_type, "exercise");
        assert_eq!(err.field, "calories");
    }

    #[test]
    fn elapsed_hours_wraps_past_midnight() {
        let schema = EntitySchema::new("sleep", "Sleep")
            .field(FieldSpec::new("bed", "Bed", FieldKind::Integer { min: None, max: None, reject_between: None }))
            .field(FieldSpec::new("bed_min", "Bed min", FieldKind::Integer { min: None, max: None, reject_between: None }))
            .field(FieldSpec::new("wake", "Wake", FieldKind::Integer { min: None, max: None, reject_between: None }))
            .field(FieldSpec::new("wake_min", "Wake min", FieldKind::Integer { min: None, max: None, reject_between: None }))
            .field(FieldSpec::new("hours", "Hours", FieldKind::Number { min: None, max: None }))
            .derived(Derivation::ElapsedHours {
                start_hour: "bed".into(),
                start_minute: Some("bed_min".into()),
                end_hour: "wake".into(),
                end_minute: Some("wake_min".into()),
                target: "hours".into(),
            });

        let mut record = PartialRecord::new()
            .with("bed", 23)
            .with("bed_min", 0)
            .with("wake", 6)
            .with("wake_min", 30);
        schema.apply_derivations(&mut record);
        assert_eq!(record.value("hours"), Some(&json!(7.5)));
    }

    #[test]
    fn derivation_keeps_supplied_target() {
        let schema = EntitySchema::new("sleep", "Sleep")
            .field(FieldSpec::new("bed", "Bed", FieldKind::Integer { min: None, max: None, reject_between: None }))
            .field(FieldSpec::new("wake", "Wake", FieldKind::Integer { min: None, max: None, reject_between: None }))
            .field(FieldSpec::new("hours", "Hours", FieldKind::Number { min: None, max: None }))
            .derived(Derivation::ElapsedHours {
                start_hour: "bed".into(),
                start_minute: None,
                end_hour: "wake".into(),
                end_minute: None,
                target: "hours".into(),
            });

        let mut record = PartialRecord::new().with("bed", 22).with("wake", 7).with("hours", 8.0);
        schema.apply_derivations(&mut record);
        assert_eq!(record.value("hours"), Some(&json!(8.0)));
    }

    #[test]
    fn schema_set_rejects_duplicates_and_bad_references() {
        assert_eq!(
            SchemaSet::new(vec![exercise(), exercise()]),
            Err(SchemaError::DuplicateEntity("exercise".into()))
        );

        let broken = EntitySchema::new("x", "X").field(
            FieldSpec::new("a", "A", FieldKind::Flag).required_when("missing", &["y"], "a"),
        );
        assert!(matches!(
            SchemaSet::new(vec![broken]),
            Err(SchemaError::UnknownReference { .. })
        ));
        assert_eq!(SchemaSet::new(vec![]), Err(SchemaError::Empty));
    }

    #[test]
    fn schema_set_loads_from_yaml() {
        let yaml = r#"
- name: meditation
  label: Meditation
  fields:
    - name: minutes
      label: Minutes
      kind: { type: integer, min: 1 }
      requirement: always
      prompt: how many minutes you meditated
    - name: style
      label: Style
      kind: { type: choice, options: [sitting, cleaning] }
- name: task
  label: Task
  fields:
    - name: task
      label: Task
      kind: { type: text }
      requirement:
        when: { field: task, one_of: [x] }
"#;
        let set = SchemaSet::from_yaml(yaml).unwrap();
        assert_eq!(set.len(), 2);
        let meditation = set.get("meditation").unwrap();
        assert_eq!(meditation.spec("minutes").unwrap().requirement, Requirement::Always);
        assert!(meditation.spec("style").unwrap().summary);
        assert!(matches!(
            set.get("task").unwrap().fields[0].requirement,
            Requirement::When { .. }
        ));
    }

    #[test]
    fn schema_set_yaml_parse_error_is_reported() {
        assert!(matches!(
            SchemaSet::from_yaml("- name: [unclosed"),
            Err(SchemaError::Parse(_))
        ));
    }

    #[test]
    fn describe_mentions_every_field() {
        let set = SchemaSet::new(vec![exercise()]).unwrap();
        let text = set.describe();
        assert!(text.contains("exercise_type (one of: run|gym|weights)"));
        assert!(text.contains("body_parts (list of: chest|back|lower_body)"));
    }
}
