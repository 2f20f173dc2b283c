//! Domain layer containing the conversation engine's pure logic.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (IDs, timestamps, errors, state machine trait)
//! - `entities` - Field values, partial records and entity schemas
//! - `conversation` - Per-thread record, history and turn states
//! - `extraction` - Merge engine, missing-field resolver, finalize batches
//! - `response` - Turn outcomes and the response composer

pub mod conversation;
pub mod entities;
pub mod extraction;
pub mod foundation;
pub mod response;
