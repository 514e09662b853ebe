//! Repository layer: entity-scoped database operations.

mod override_audit;

pub use override_audit::*;
