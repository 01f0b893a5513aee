// Fun commands.

use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use tracing::warn;

const MEME_API_URL: &str = "https://meme-api.com/gimme";

const EIGHT_BALL_ANSWERS: [&str; 5] = [
    "It is certain.",
    "Definitely yes.",
    "My answer is no.",
    "Very doubtful.",
    "Ask again later.",
];

const HUG_GIF: &str = "https://media1.tenor.com/m/p1GGOs0i2dkAAAAC/hug-love.gif";
const PAT_GIF: &str = "https://media1.tenor.com/m/D212_d8G9HAAAAAC/anime-pat.gif";
const SLAP_GIF: &str = "https://media1.tenor.com/m/VEe-d_iF0iAAAAAC/anime-slap-mad.gif";

#[derive(Debug, Deserialize)]
struct Meme {
    title: String,
    #[serde(rename = "postLink")]
    post_link: String,
    url: String,
}

/// Say hi.
#[poise::command(slash_command)]
pub async fn hello(ctx: Context<'_>) -> Result<(), Error> {
    ctx.say(format!("Hi, <@{}>!", ctx.author().id)).await?;
    Ok(())
}

/// Ask the magic 8-ball a question.
#[poise::command(slash_command, rename = "8ball")]
pub async fn eight_ball(
    ctx: Context<'_>,
    #[description = "Your question"] question: String,
) -> Result<(), Error> {
    let answer = EIGHT_BALL_ANSWERS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(EIGHT_BALL_ANSWERS[0]);

    let embed = serenity::CreateEmbed::new()
        .title("🎱 Magic 8-ball")
        .color(serenity::Colour::DARK_GREY)
        .field("Question", question, false)
        .field("Answer", answer, false);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Measure the love between two people.
#[poise::command(slash_command, guild_only)]
pub async fn ship(
    ctx: Context<'_>,
    #[description = "First person"] first: serenity::User,
    #[description = "Second person"] second: serenity::User,
) -> Result<(), Error> {
    let percent: u8 = rand::thread_rng().gen_range(0..=100);
    let (emoji, comment) = ship_verdict(percent);

    let embed = serenity::CreateEmbed::new()
        .title("💕 Love meter 💕")
        .description(format!(
            "Checking the match between **{}** and **{}**...",
            first.display_name(),
            second.display_name()
        ))
        .color(serenity::Colour::MAGENTA)
        .field("Result", format!("## `{percent}%` {emoji}"), false)
        .footer(serenity::CreateEmbedFooter::new(comment));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Show a random meme.
#[poise::command(slash_command)]
pub async fn meme(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer().await?;

    let meme = match fetch_meme(&ctx.data().http_client).await {
        Ok(meme) => meme,
        Err(e) => {
            warn!("Meme fetch failed: {e:#}");
            ctx.say("Couldn't fetch a meme right now, try again later.")
                .await?;
            return Ok(());
        }
    };

    let embed = serenity::CreateEmbed::new()
        .title(meme.title)
        .url(meme.post_link)
        .image(meme.url)
        .color(0xff4500);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Hug someone.
#[poise::command(slash_command, guild_only)]
pub async fn hug(
    ctx: Context<'_>,
    #[description = "Who to hug"] user: serenity::User,
) -> Result<(), Error> {
    interact(ctx, &user, "hugs", HUG_GIF).await
}

/// Pat someone.
#[poise::command(slash_command, guild_only)]
pub async fn pat(
    ctx: Context<'_>,
    #[description = "Who to pat"] user: serenity::User,
) -> Result<(), Error> {
    interact(ctx, &user, "pats", PAT_GIF).await
}

/// Slap someone.
#[poise::command(slash_command, guild_only)]
pub async fn slap(
    ctx: Context<'_>,
    #[description = "Who to slap"] user: serenity::User,
) -> Result<(), Error> {
    interact(ctx, &user, "slaps", SLAP_GIF).await
}

async fn interact(
    ctx: Context<'_>,
    target: &serenity::User,
    verb: &str,
    gif: &str,
) -> Result<(), Error> {
    if target.id == ctx.author().id {
        ctx.send(
            poise::CreateReply::default()
                .content("You can't do that to yourself!")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let embed = serenity::CreateEmbed::new()
        .description(format!("<@{}> {} <@{}>!", ctx.author().id, verb, target.id))
        .image(gif)
        .color(serenity::Colour::FABLED_PINK);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

async fn fetch_meme(client: &reqwest::Client) -> anyhow::Result<Meme> {
    let meme = client
        .get(MEME_API_URL)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(meme)
}

fn ship_verdict(percent: u8) -> (&'static str, &'static str) {
    match percent {
        0..=20 => ("💔", "Probably not going to happen..."),
        21..=50 => ("🤔", "There's a chance, but not a big one."),
        51..=80 => ("😊", "Looking pretty good! There's potential."),
        _ => ("💖", "This must be true love! A perfect match!"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ship_bands_cover_the_whole_range() {
        assert_eq!(ship_verdict(0).0, "💔");
        assert_eq!(ship_verdict(20).0, "💔");
        assert_eq!(ship_verdict(21).0, "🤔");
        assert_eq!(ship_verdict(50).0, "🤔");
        assert_eq!(ship_verdict(80).0, "😊");
        assert_eq!(ship_verdict(81).0, "💖");
        assert_eq!(ship_verdict(100).0, "💖");
    }

    #[test]
    fn meme_payload_parses() {
        let meme: Meme = serde_json::from_str(
            r#"{
                "postLink": "https://redd.it/abc",
                "subreddit": "memes",
                "title": "Funny",
                "url": "https://i.redd.it/abc.png",
                "nsfw": false
            }"#,
        )
        .unwrap();
        assert_eq!(meme.title, "Funny");
        assert_eq!(meme.post_link, "https://redd.it/abc");
        assert_eq!(meme.url, "https://i.redd.it/abc.png");
    }
}
