// Implementations for the leveling system.

pub mod json_store;

pub use json_store::JsonLevelStore;
