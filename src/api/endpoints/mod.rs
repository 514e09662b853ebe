//! API endpoint handlers.
//!
//! Handlers are thin: they translate HTTP to `SafetyCheckService` calls on
//! the shared engine and shape the responses.

pub mod allergies;
pub mod encounters;
pub mod health;
pub mod interactions;
