// Slash commands, one file per feature.

pub mod config;
pub mod embed_builder;
pub mod fun;
pub mod giveaway;
pub mod leveling;
pub mod moderation;
pub mod music;
pub mod presence;
pub mod utility;

use crate::discord::{Data, Error};

/// Every command registered with the framework.
pub fn all() -> Vec<poise::Command<Data, Error>> {
    vec![
        config::config(),
        moderation::moderation(),
        leveling::level(),
        leveling::leaderboard(),
        giveaway::giveaway(),
        embed_builder::embed(),
        music::music(),
        utility::info(),
        utility::avatar(),
        utility::ping(),
        utility::say(),
        fun::hello(),
        fun::eight_ball(),
        fun::ship(),
        fun::meme(),
        fun::hug(),
        fun::pat(),
        fun::slap(),
    ]
}
