use crate::core::leveling::{filled_cells, xp_threshold, LevelUpEvent};
use poise::serenity_prelude::{self as serenity, builder::CreateMessage};
use std::time::Duration;
use tracing::debug;

/// Level-up notices clean themselves up after this long.
const ANNOUNCEMENT_LIFETIME: Duration = Duration::from_secs(15);

/// Cells in the `/level` progress bar.
pub const PROGRESS_CELLS: usize = 20;

/// Congratulate the member in the channel they just leveled up in.
pub async fn send_level_up(
    ctx: &serenity::Context,
    message: &serenity::Message,
    level_up: &LevelUpEvent,
) -> Result<(), serenity::Error> {
    let embed = serenity::CreateEmbed::new()
        .description(format!(
            "🎉 Congrats <@{}>! You reached level **{}**!",
            level_up.user_id, level_up.new_level
        ))
        .color(level_color(level_up.new_level))
        .footer(serenity::CreateEmbedFooter::new(format!(
            "Next level at {} XP",
            xp_threshold(level_up.new_level)
        )));

    let sent = message
        .channel_id
        .send_message(ctx, CreateMessage::new().embed(embed))
        .await?;

    let http = ctx.http.clone();
    tokio::spawn(async move {
        tokio::time::sleep(ANNOUNCEMENT_LIFETIME).await;
        if let Err(e) = sent.delete(&http).await {
            debug!("Level-up message already gone: {e}");
        }
    });

    Ok(())
}

pub fn level_color(level: u32) -> serenity::Colour {
    if level >= 50 {
        serenity::Colour::DARK_PURPLE
    } else if level >= 25 {
        serenity::Colour::ORANGE
    } else if level >= 10 {
        serenity::Colour::GOLD
    } else if level >= 5 {
        serenity::Colour::BLURPLE
    } else {
        serenity::Colour::LIGHT_GREY
    }
}

/// `[🟩🟩⬛⬛...]` showing how far `xp` is towards `threshold`.
pub fn progress_bar(xp: u64, threshold: u64) -> String {
    let filled = filled_cells(xp, threshold, PROGRESS_CELLS);
    format!(
        "[{}{}]",
        "🟩".repeat(filled),
        "⬛".repeat(PROGRESS_CELLS - filled)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_always_has_twenty_cells() {
        for (xp, threshold) in [(0, 155), (77, 155), (155, 155), (999, 155)] {
            let bar = progress_bar(xp, threshold);
            let cells = bar.chars().filter(|c| *c == '🟩' || *c == '⬛').count();
            assert_eq!(cells, PROGRESS_CELLS);
        }
    }

    #[test]
    fn half_way_fills_half_the_bar() {
        let bar = progress_bar(50, 100);
        assert_eq!(bar.chars().filter(|c| *c == '🟩').count(), 10);
    }

    #[test]
    fn colour_steps_up_with_level() {
        assert_eq!(level_color(1), serenity::Colour::LIGHT_GREY);
        assert_eq!(level_color(10), serenity::Colour::GOLD);
        assert_eq!(level_color(60), serenity::Colour::DARK_PURPLE);
    }
}
