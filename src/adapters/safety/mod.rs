//! Safety check adapters.

mod pattern_guard;

pub use pattern_guard::PatternSafetyGuard;
