// Core music module - per-guild queues driven by an actor per guild.

mod guild_player;
pub mod music_models;
pub mod music_ports;
pub mod music_queue;
pub mod music_service;
pub mod resolution;

pub use music_models::*;
pub use music_ports::*;
pub use music_service::{MusicBackends, MusicService};
