//! Lifelog - conversational life logging
//!
//! Turns free-form chat messages into validated structured records. Each
//! turn is classified, merged into the thread's pending entities, checked
//! for missing required fields and either clarified or finalized.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
