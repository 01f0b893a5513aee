// Entry point of the bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (JSON stores, yt-dlp, Spotify, voice)
// - `discord/` = Discord-specific adapters (commands, events, buttons)
//
// This file loads configuration, wires the services together and starts the
// poise framework.

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::core::leveling::{LevelingError, LevelingService};
use crate::core::moderation::WarningService;
use crate::core::music::{CatalogLookup, MusicBackends, MusicService};
use crate::core::settings::SettingsService;
use crate::discord::commands::presence;
use crate::discord::leveling_announcements::send_level_up;
use crate::discord::music_controls::DiscordAnnouncer;
use crate::discord::{error_handler, member_events, music_controls, panels, Data, Error};
use crate::infra::leveling::JsonLevelStore;
use crate::infra::moderation::JsonWarningStore;
use crate::infra::music::{SongbirdVoiceLink, SpotifyClient, YtDlpResolver};
use crate::infra::settings::JsonSettingsStore;
use poise::serenity_prelude as serenity;
use songbird::serenity::SerenityInit;
use songbird::Songbird;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Event handler for non-command Discord events.
async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Message { new_message } => {
            if new_message.author.bot {
                return Ok(());
            }
            let Some(guild_id) = new_message.guild_id else {
                return Ok(());
            };

            match data
                .leveling
                .process_message(new_message.author.id.get(), guild_id.get())
                .await
            {
                Ok(Some(level_up)) => {
                    info!(
                        user_id = level_up.user_id,
                        guild_id = level_up.guild_id,
                        level = level_up.new_level,
                        "Member leveled up"
                    );
                    if let Err(err) = send_level_up(ctx, new_message, &level_up).await {
                        warn!("Failed to send level-up message: {err}");
                    }
                }
                Ok(None) | Err(LevelingError::OnCooldown(_)) => {}
                Err(e) => error!("Failed to award message XP: {e}"),
            }
        }
        serenity::FullEvent::GuildMemberAddition { new_member } => {
            if let Err(e) = member_events::on_member_join(ctx, new_member, data).await {
                error!(guild_id = new_member.guild_id.get(), "Error handling member join: {e}");
            }
        }
        serenity::FullEvent::GuildMemberRemoval { guild_id, user, .. } => {
            if let Err(e) = member_events::on_member_leave(ctx, *guild_id, user, data).await {
                error!(guild_id = guild_id.get(), "Error handling member leave: {e}");
            }
        }
        serenity::FullEvent::InteractionCreate {
            interaction: serenity::Interaction::Component(component),
        } => {
            let handled = match panels::handle_component(ctx, component, data).await {
                Ok(false) => music_controls::handle_component(ctx, component, data).await,
                other => other,
            };
            if let Err(e) = handled {
                error!(
                    custom_id = %component.data.custom_id,
                    "Error handling button press: {e}"
                );
            }
        }
        serenity::FullEvent::VoiceStateUpdate { new, .. } => {
            // The bot itself was disconnected or kicked from voice.
            let bot_id = ctx.cache.current_user().id;
            if new.user_id == bot_id && new.channel_id.is_none() {
                if let Some(guild_id) = new.guild_id {
                    debug!(guild_id = guild_id.get(), "Left voice, tearing down player");
                    if let Err(e) = data.music.teardown(guild_id.get()).await {
                        warn!(guild_id = guild_id.get(), "Music teardown failed: {e}");
                    }
                }
            }
        }
        _ => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let Ok(token) = std::env::var("DISCORD_TOKEN") else {
        error!("Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.");
        std::process::exit(1);
    };

    let data_dir = PathBuf::from(std::env::var("BOT_DATA_DIR").unwrap_or_else(|_| "data".into()));
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        warn!(path = %data_dir.display(), "Could not create data directory: {e}");
    }
    let ytdlp_path = std::env::var("YTDLP_PATH").unwrap_or_else(|_| "yt-dlp".into());

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================

    let settings = Arc::new(SettingsService::new(JsonSettingsStore::new(
        data_dir.join("server_configs.json"),
    )));
    let warnings = Arc::new(WarningService::new(JsonWarningStore::new(
        data_dir.join("warnings.json"),
    )));
    let leveling = Arc::new(LevelingService::new(JsonLevelStore::new(
        data_dir.join("levels.json"),
    )));

    let http_client = reqwest::Client::new();
    let voice_manager = Songbird::serenity();

    let catalog: Option<Arc<dyn CatalogLookup>> = match (
        std::env::var("SPOTIFY_CLIENT_ID"),
        std::env::var("SPOTIFY_CLIENT_SECRET"),
    ) {
        (Ok(id), Ok(secret)) => {
            info!("Spotify links enabled");
            Some(Arc::new(SpotifyClient::new(http_client.clone(), &id, &secret)) as Arc<dyn CatalogLookup>)
        }
        _ => {
            info!("Spotify credentials not set; Spotify links are searched as plain text");
            None
        }
    };

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::GUILD_MEMBERS
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_VOICE_STATES;

    let setup_voice = Arc::clone(&voice_manager);
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: discord::commands::all(),
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            on_error: |error| Box::pin(error_handler::on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!(user = %ready.user.name, "Bot is starting up");

                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                info!("Commands registered");

                presence::update_status(ctx);
                presence::spawn_status_loop(ctx.clone());

                let music = Arc::new(MusicService::new(MusicBackends {
                    resolver: Arc::new(YtDlpResolver::new(ytdlp_path)),
                    catalog,
                    voice: Arc::new(SongbirdVoiceLink::new(setup_voice, http_client.clone())),
                    announcer: Arc::new(DiscordAnnouncer::new(ctx.http.clone())),
                }));

                Ok(Data {
                    settings,
                    warnings,
                    leveling,
                    music,
                    http_client,
                })
            })
        })
        .build();

    let client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .register_songbird_with(voice_manager)
        .await;

    let mut client = match client {
        Ok(client) => client,
        Err(e) => {
            error!("Error creating client: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = client.start().await {
        error!("Client error: {e}");
        std::process::exit(1);
    }
}
