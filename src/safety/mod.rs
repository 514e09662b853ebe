//! Clinical safety checks for the medication-entry step of an encounter.
//!
//! A working medication list is evaluated against the interaction knowledge
//! base and the patient's recorded allergies. Any finding blocks the encounter
//! workflow until a clinician overrides it with a documented reason.

pub mod allergies;
pub mod audit;
pub mod engine;
pub mod evaluator;
pub mod gate;
pub mod knowledge;
pub mod messages;
pub mod session;
pub mod severity;
pub mod types;

pub use audit::{OverrideAudit, OverrideEvent};
pub use engine::DefaultSafetyEngine;
pub use gate::{CheckOutcome, GateDecision};
pub use knowledge::InteractionKnowledgeBase;
pub use session::CheckSession;
pub use types::*;
