// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "settings/mod.rs"]
pub mod settings;

#[path = "moderation/mod.rs"]
pub mod moderation;

#[path = "leveling/leveling_service.rs"]
pub mod leveling;

#[path = "giveaway/giveaway_service.rs"]
pub mod giveaway;

#[path = "embed_builder/embed_draft.rs"]
pub mod embed_builder;

#[path = "music/mod.rs"]
pub mod music;
