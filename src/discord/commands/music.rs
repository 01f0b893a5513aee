// Music commands. All state lives in the music service; these only check
// voice presence and format replies.

use crate::core::music::{MusicError, SNAPSHOT_LIMIT};
use crate::discord::music_controls::{member_voice_channel, now_playing_embed};
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;
use tracing::info;

/// Play music in your voice channel.
#[poise::command(
    slash_command,
    subcommands(
        "play",
        "volume",
        "skip",
        "stop",
        "pause",
        "resume",
        "toggle_loop",
        "shuffle",
        "nowplaying",
        "queue"
    ),
    guild_only
)]
pub async fn music(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Play a song or playlist (search text, Spotify track or playlist link).
#[poise::command(slash_command, guild_only)]
pub async fn play(
    ctx: Context<'_>,
    #[description = "Song name or link"] query: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;

    let Some(voice_channel) = member_voice_channel(ctx.cache(), guild_id, ctx.author().id) else {
        reply_ephemeral(ctx, "You must be in a voice channel!").await?;
        return Ok(());
    };

    let music = &ctx.data().music;
    let plan = join_plan(music.connected_channel(guild_id.get()).await, voice_channel);
    if plan == JoinPlan::Elsewhere {
        reply_ephemeral(ctx, "You must be in the same channel as the bot!").await?;
        return Ok(());
    }

    ctx.defer().await?;

    if plan == JoinPlan::Join {
        music.join(guild_id.get(), voice_channel).await?;
        info!(guild_id = guild_id.get(), channel_id = voice_channel, "Joined voice channel");
    }

    let phrases = match music.search_phrases(&query).await {
        Ok(phrases) if !phrases.is_empty() => phrases,
        Ok(_) => {
            ctx.say("That playlist is empty.").await?;
            return Ok(());
        }
        Err(e) => {
            ctx.say(format!("Could not look that up: {e}")).await?;
            return Ok(());
        }
    };

    if phrases.len() > 1 {
        ctx.say(format!("Processing {} tracks...", phrases.len()))
            .await?;
    }

    match music
        .enqueue_phrases(guild_id.get(), ctx.channel_id().get(), phrases)
        .await
    {
        Ok(outcome) if outcome.added == 1 => {
            let title = outcome.first_title.unwrap_or_default();
            ctx.say(format!("Added **{title}** to the queue.")).await?;
        }
        Ok(outcome) => {
            let mut reply = format!("Added {} tracks to the queue.", outcome.added);
            if outcome.failed > 0 {
                reply.push_str(&format!(" {} could not be found.", outcome.failed));
            }
            ctx.say(reply).await?;
        }
        Err(e @ (MusicError::NotFound(_) | MusicError::NothingFound)) => {
            ctx.say(e.to_string()).await?;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// Change the volume (1-200%).
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn volume(
    ctx: Context<'_>,
    #[description = "Volume in percent"]
    #[min = 1]
    #[max = 200]
    percent: u32,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;

    if ctx.data().music.set_volume(guild_id.get(), percent).await? {
        ctx.say(format!("🔊 Volume set to **{percent}%**.")).await?;
    } else {
        reply_ephemeral(ctx, "I'm not playing anything.").await?;
    }
    Ok(())
}

/// Skip the current song.
#[poise::command(slash_command, guild_only)]
pub async fn skip(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;

    match ctx.data().music.skip(guild_id.get()).await? {
        Some(track) => ctx.say(format!("⏭️ Skipped **{}**.", track.title)).await?,
        None => ctx.say("Nothing is playing.").await?,
    };
    Ok(())
}

/// Stop the music, clear the queue and leave the channel.
#[poise::command(slash_command, guild_only)]
pub async fn stop(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;

    ctx.data().music.stop(guild_id.get()).await?;
    ctx.say("⏹️ Stopped the music.").await?;
    Ok(())
}

/// Pause the current song.
#[poise::command(slash_command, guild_only)]
pub async fn pause(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;

    if ctx.data().music.pause(guild_id.get()).await? {
        ctx.say("⏸️ Paused.").await?;
    } else {
        reply_ephemeral(ctx, "Nothing is playing.").await?;
    }
    Ok(())
}

/// Resume a paused song.
#[poise::command(slash_command, guild_only)]
pub async fn resume(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;

    if ctx.data().music.resume(guild_id.get()).await? {
        ctx.say("▶️ Resumed.").await?;
    } else {
        reply_ephemeral(ctx, "Nothing is paused.").await?;
    }
    Ok(())
}

/// Repeat the current song until turned off.
#[poise::command(slash_command, guild_only, rename = "loop")]
pub async fn toggle_loop(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;

    if ctx.data().music.toggle_loop(guild_id.get()).await? {
        ctx.say("🔁 Loop enabled.").await?;
    } else {
        ctx.say("Loop disabled.").await?;
    }
    Ok(())
}

/// Shuffle the queue.
#[poise::command(slash_command, guild_only)]
pub async fn shuffle(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;

    if ctx.data().music.shuffle(guild_id.get()).await? {
        ctx.say("🔀 Queue shuffled.").await?;
    } else {
        reply_ephemeral(ctx, "Queue is empty.").await?;
    }
    Ok(())
}

/// Show the song that is playing now.
#[poise::command(slash_command, guild_only)]
pub async fn nowplaying(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;

    match ctx.data().music.now_playing(guild_id.get()).await? {
        Some(track) => {
            ctx.send(poise::CreateReply::default().embed(now_playing_embed(&track)))
                .await?;
        }
        None => reply_ephemeral(ctx, "Nothing is playing right now.").await?,
    }
    Ok(())
}

/// Show the queue.
#[poise::command(slash_command, guild_only)]
pub async fn queue(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;
    let snapshot = ctx.data().music.snapshot(guild_id.get()).await?;

    let mut description = String::new();
    if let Some(current) = &snapshot.current {
        let link = current.page_url.as_deref().unwrap_or(&current.source_url);
        description.push_str(&format!("**Now playing:** [{}]({})\n\n", current.title, link));
    }

    if snapshot.upcoming.is_empty() {
        description.push_str("The queue is empty.");
    } else {
        description.push_str("**Up next:**\n");
        for (i, track) in snapshot.upcoming.iter().enumerate() {
            description.push_str(&format!("**{}.** {}\n", i + 1, track.title));
        }
        if snapshot.total_queued > SNAPSHOT_LIMIT {
            description.push_str(&format!(
                "\n... and {} more.",
                snapshot.total_queued - SNAPSHOT_LIMIT
            ));
        }
    }

    let mut status = format!("Volume {}%", snapshot.volume_percent);
    if snapshot.looping {
        status.push_str(" · Loop on");
    }
    if snapshot.paused {
        status.push_str(" · Paused");
    }

    let embed = serenity::CreateEmbed::new()
        .title("🎶 Queue")
        .description(description)
        .color(serenity::Colour::PURPLE)
        .footer(serenity::CreateEmbedFooter::new(status));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

async fn reply_ephemeral(ctx: Context<'_>, content: &str) -> Result<(), Error> {
    ctx.send(
        poise::CreateReply::default()
            .content(content)
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JoinPlan {
    Join,
    AlreadyThere,
    /// Connected to another channel; an active session is never moved.
    Elsewhere,
}

fn join_plan(connected: Option<u64>, member_channel: u64) -> JoinPlan {
    match connected {
        None => JoinPlan::Join,
        Some(channel) if channel == member_channel => JoinPlan::AlreadyThere,
        Some(_) => JoinPlan::Elsewhere,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_only_when_disconnected() {
        assert_eq!(join_plan(None, 7), JoinPlan::Join);
        assert_eq!(join_plan(Some(7), 7), JoinPlan::AlreadyThere);
    }

    #[test]
    fn member_in_another_channel_cannot_move_the_bot() {
        assert_eq!(join_plan(Some(3), 7), JoinPlan::Elsewhere);
    }
}
