// Interactive embed builder.
//
// An ephemeral preview with four buttons. Two of them open modals that edit
// the draft; the preview is re-rendered after every change.

use crate::core::embed_builder::{EmbedBuilderSession, EmbedDraft, EmbedDraftError, MAX_FIELDS};
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;
use std::time::Duration;
use tracing::{debug, warn};

const SESSION_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, poise::Modal)]
#[name = "Edit title and description"]
struct CoreModal {
    #[name = "Title"]
    #[max_length = 256]
    title: String,
    #[name = "Description"]
    #[paragraph]
    #[max_length = 2000]
    description: String,
    #[name = "Colour (hex, e.g. #FF0000)"]
    #[placeholder = "#000000"]
    #[max_length = 7]
    colour: Option<String>,
}

#[derive(Debug, poise::Modal)]
#[name = "Add a field"]
struct FieldModal {
    #[name = "Field name"]
    #[max_length = 256]
    name: String,
    #[name = "Field value"]
    #[paragraph]
    #[max_length = 1024]
    value: String,
    #[name = "Inline? (yes/no)"]
    #[placeholder = "yes"]
    #[max_length = 5]
    inline: Option<String>,
}

/// Build an embed step by step and post it in this channel.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_MESSAGES")]
pub async fn embed(ctx: Context<'_>) -> Result<(), Error> {
    let mut session = EmbedBuilderSession::new(ctx.author().id.get());

    let prefix = ctx.id();
    let edit_id = format!("{prefix}_embed_edit");
    let field_id = format!("{prefix}_embed_field");
    let send_id = format!("{prefix}_embed_send");
    let cancel_id = format!("{prefix}_embed_cancel");
    let buttons = |disabled: bool| {
        vec![
            serenity::CreateActionRow::Buttons(vec![
                serenity::CreateButton::new(&edit_id)
                    .label("Edit title/description")
                    .style(serenity::ButtonStyle::Primary)
                    .disabled(disabled),
                serenity::CreateButton::new(&field_id)
                    .label("Add field")
                    .style(serenity::ButtonStyle::Secondary)
                    .disabled(disabled),
            ]),
            serenity::CreateActionRow::Buttons(vec![
                serenity::CreateButton::new(&send_id)
                    .label("Send embed")
                    .style(serenity::ButtonStyle::Success)
                    .disabled(disabled),
                serenity::CreateButton::new(&cancel_id)
                    .label("Cancel")
                    .style(serenity::ButtonStyle::Danger)
                    .disabled(disabled),
            ]),
        ]
    };

    let handle = ctx
        .send(
            poise::CreateReply::default()
                .content("Use the buttons below to build and send your embed.")
                .embed(render(session.draft()))
                .components(buttons(false))
                .ephemeral(true),
        )
        .await?;
    let msg_id = handle.message().await?.id;

    while let Some(mci) = serenity::ComponentInteractionCollector::new(ctx)
        .author_id(ctx.author().id)
        .channel_id(ctx.channel_id())
        .timeout(SESSION_TIMEOUT)
        .filter(move |mci| mci.message.id == msg_id)
        .await
    {
        let custom_id = mci.data.custom_id.as_str();

        if custom_id == edit_id {
            let draft = session.edit()?;
            let defaults = CoreModal {
                title: draft.title.clone(),
                description: draft.description.clone(),
                colour: None,
            };
            let Some(input) =
                poise::execute_modal_on_component_interaction(ctx, mci.clone(), Some(defaults), None)
                    .await?
            else {
                continue;
            };
            session.edit()?.set_core(
                &input.title,
                &input.description,
                input.colour.as_deref().unwrap_or_default(),
            );
        } else if custom_id == field_id {
            let Some(input) = poise::execute_modal_on_component_interaction::<FieldModal>(
                ctx,
                mci.clone(),
                None,
                None,
            )
            .await?
            else {
                continue;
            };
            let added = session.edit()?.add_field(
                &input.name,
                &input.value,
                input.inline.as_deref().unwrap_or_default(),
            );
            if let Err(EmbedDraftError::FieldLimit) = added {
                ctx.send(
                    poise::CreateReply::default()
                        .content(format!("An embed can't have more than {MAX_FIELDS} fields!"))
                        .ephemeral(true),
                )
                .await?;
                continue;
            }
            added?;
        } else if custom_id == send_id {
            let draft = session.pending_send()?;
            if let Err(e) = ctx
                .channel_id()
                .send_message(ctx, serenity::CreateMessage::new().embed(render(&draft)))
                .await
            {
                warn!("Embed builder post failed: {e}");
                mci.create_response(
                    &ctx,
                    serenity::CreateInteractionResponse::Message(
                        serenity::CreateInteractionResponseMessage::new()
                            .content(format!("Failed to send the embed: {e}"))
                            .ephemeral(true),
                    ),
                )
                .await?;
                continue;
            }
            session.send()?;

            mci.create_response(
                &ctx,
                serenity::CreateInteractionResponse::Message(
                    serenity::CreateInteractionResponseMessage::new()
                        .content("Embed sent!")
                        .ephemeral(true),
                ),
            )
            .await?;
            handle
                .edit(
                    ctx,
                    poise::CreateReply::default()
                        .content("Embed created and sent.")
                        .embed(render(&draft))
                        .components(vec![]),
                )
                .await?;
            return Ok(());
        } else if custom_id == cancel_id {
            session.cancel()?;
            mci.create_response(
                &ctx,
                serenity::CreateInteractionResponse::UpdateMessage(
                    serenity::CreateInteractionResponseMessage::new()
                        .content("Embed creation cancelled.")
                        .embeds(vec![])
                        .components(vec![]),
                ),
            )
            .await?;
            return Ok(());
        } else {
            continue;
        }

        handle
            .edit(
                ctx,
                poise::CreateReply::default()
                    .content("Use the buttons below to build and send your embed.")
                    .embed(render(session.draft()))
                    .components(buttons(false)),
            )
            .await?;
    }

    session.time_out()?;
    if let Err(e) = handle
        .edit(
            ctx,
            poise::CreateReply::default()
                .content("Editing time expired.")
                .embed(render(session.draft()))
                .components(buttons(true)),
        )
        .await
    {
        debug!("Embed builder message already gone: {e}");
    }
    Ok(())
}

fn render(draft: &EmbedDraft) -> serenity::CreateEmbed {
    let mut embed = serenity::CreateEmbed::new()
        .title(&draft.title)
        .description(&draft.description);
    if let Some(colour) = draft.colour {
        embed = embed.color(colour);
    }
    for field in &draft.fields {
        embed = embed.field(&field.name, &field.value, field.inline);
    }
    embed
}
