pub mod allergy;
pub mod enums;
pub mod interaction;

pub use allergy::AllergyRecord;
pub use interaction::InteractionRule;
