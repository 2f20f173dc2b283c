//! Entities module - schema-driven partial records.
//!
//! Nothing here knows which life-log entities exist beyond the built-in
//! set; merge and clarification work from whatever `SchemaSet` is loaded.

mod builtin;
mod schema;
mod value;

pub use builtin::builtin_schemas;
pub use schema::{
    Derivation, EntitySchema, FieldKind, FieldSpec, Requirement, SchemaError, SchemaSet,
    SchemaViolation,
};
pub use value::{Extraction, FieldValue, PartialRecord};
