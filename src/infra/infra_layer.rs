// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "json_file.rs"]
pub mod json_file;

#[path = "settings/json_store.rs"]
pub mod settings;

#[path = "moderation/json_store.rs"]
pub mod moderation;

#[path = "leveling/leveling_store.rs"]
pub mod leveling;

#[path = "music/mod.rs"]
pub mod music;
