//! Document sync adapters.

mod notion;

pub use notion::{NoopDocumentSync, NotionConfig, NotionDocumentSync};
