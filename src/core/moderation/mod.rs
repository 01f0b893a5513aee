// Core moderation module - warning ledger and timeout rules.
// Following the same pattern as the leveling module.

pub mod moderation_models;
pub mod moderation_service;

pub use moderation_models::*;
pub use moderation_service::*;
