use anyhow::Result;
use serenity::{
    builder::{
        CreateInteractionResponse, CreateInteractionResponseMessage, EditInteractionResponse,
    },
    model::{
        application::{
            CommandDataOption, CommandDataOptionValue, CommandInteraction, ComponentInteraction,
            ComponentInteractionDataKind,
        },
        id::{ChannelId, GuildId, UserId},
    },
    prelude::Context,
};
use tracing::{debug, info, warn};

use crate::{
    audio::{
        session::{Enqueued, SeekMode, SkipScope},
        track::Track,
    },
    bot::JukeboxBot,
    cache::Selection,
    error::PlaybackError,
    sources::{is_url, LoadResult},
    ui::{
        buttons::{self, component_ids},
        embeds,
    },
};

/// Dispatches slash commands.
pub async fn handle_command(
    ctx: &Context,
    command: CommandInteraction,
    bot: &JukeboxBot,
) -> Result<()> {
    let guild_id = command
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("command used outside of a guild"))?;

    info!(
        "📝 /{} used by {} in guild {}",
        command.data.name, command.user.name, guild_id
    );

    match command.data.name.as_str() {
        "play" => handle_play(ctx, &command, bot, guild_id).await?,
        "leave" => handle_leave(ctx, &command, bot, guild_id).await?,
        "skip" => handle_skip(ctx, &command, bot, guild_id).await?,
        "show" => handle_show(ctx, &command, bot, guild_id).await?,
        "set" => handle_set(ctx, &command, bot, guild_id).await?,
        "seek" => handle_seek(ctx, &command, bot, guild_id).await?,
        _ => reply(ctx, &command, "❌ Unknown command").await?,
    }

    Ok(())
}

/// Dispatches message component interactions.
pub async fn handle_component(
    ctx: &Context,
    component: ComponentInteraction,
    bot: &JukeboxBot,
) -> Result<()> {
    let guild_id = component
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("component used outside of a guild"))?;

    debug!(
        "🔘 component {} used by {} in guild {}",
        component.data.custom_id, component.user.name, guild_id
    );

    match component.data.custom_id.as_str() {
        component_ids::SELECT_TRACK => handle_track_selection(ctx, &component, bot, guild_id).await,
        other => {
            warn!(custom_id = other, "Unknown component interaction");
            Ok(())
        }
    }
}

async fn handle_play(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &JukeboxBot,
    guild_id: GuildId,
) -> Result<()> {
    let Some(query) = command
        .data
        .options
        .iter()
        .find(|opt| opt.name == "query")
        .and_then(|opt| opt.value.as_str())
    else {
        warn!("/play arrived without a query; are the commands registered correctly?");
        return reply(ctx, command, "❌ The command appears to be set up incorrectly.").await;
    };

    // Resolving can easily take longer than Discord's 3 second window.
    command.defer_ephemeral(&ctx.http).await?;

    let loaded = match bot.resolver.resolve(query).await {
        Ok(loaded) => loaded,
        Err(e) => {
            warn!(query, error = ?e, "Query failed to load");
            return edit(ctx, command, "❌ Error while loading your query. Try again.").await;
        }
    };

    let requester_channel = user_voice_channel(ctx, guild_id, command.user.id);
    let response = match loaded {
        LoadResult::Track(track) => {
            let url = track.uri().to_string();
            match bot.controller.play(guild_id, requester_channel, vec![track.clone()]).await {
                Ok(outcome) => EditInteractionResponse::new()
                    .content(enqueued_message(&track, &outcome))
                    .components(vec![buttons::create_link_row("Link to your song", &url, "🎶")]),
                Err(e) => EditInteractionResponse::new().content(playback_error_message(&e)),
            }
        }
        LoadResult::Playlist { name, tracks } => {
            let count = tracks.len();
            match bot.controller.play(guild_id, requester_channel, tracks).await {
                Ok(_) => {
                    let content = format!("📃 Added playlist **{name}** ({count} songs) to the queue.");
                    let mut response = EditInteractionResponse::new().content(content);
                    if is_url(query) {
                        response = response.components(vec![buttons::create_link_row(
                            "Link to your playlist",
                            query.trim(),
                            "🎶",
                        )]);
                    }
                    response
                }
                Err(e) => EditInteractionResponse::new().content(playback_error_message(&e)),
            }
        }
        LoadResult::Search(mut tracks) => {
            tracks.truncate(bot.config.search_results);
            let menu = buttons::create_track_select_row(&tracks);
            bot.selections.offer(command.user.id, tracks);
            EditInteractionResponse::new()
                .content("🔍 Please choose a song from the menu.")
                .components(vec![menu])
        }
        LoadResult::Empty => EditInteractionResponse::new().content("🤷 No matches found for your query."),
    };

    command.edit_response(&ctx.http, response).await?;
    Ok(())
}

async fn handle_track_selection(
    ctx: &Context,
    component: &ComponentInteraction,
    bot: &JukeboxBot,
    guild_id: GuildId,
) -> Result<()> {
    let ComponentInteractionDataKind::StringSelect { values } = &component.data.kind else {
        warn!("Track selection without select-menu data");
        return Ok(());
    };
    let Some(identifier) = values.first() else {
        warn!("Track selection without a chosen value");
        return Ok(());
    };

    component.defer(&ctx.http).await?;

    let response = match bot.selections.take(component.user.id, identifier) {
        Selection::Chosen(track) => {
            info!(user = %component.user.name, track = %track, "✅ track selected");
            let requester_channel = user_voice_channel(ctx, guild_id, component.user.id);
            let url = track.uri().to_string();
            match bot.controller.play(guild_id, requester_channel, vec![track.clone()]).await {
                Ok(outcome) => EditInteractionResponse::new()
                    .content(enqueued_message(&track, &outcome))
                    .components(vec![buttons::create_link_row("Click here for the link", &url, "🙈")]),
                Err(e) => EditInteractionResponse::new()
                    .content(playback_error_message(&e))
                    .components(Vec::new()),
            }
        }
        Selection::NoPendingSelection => EditInteractionResponse::new()
            .content("⌛ Could not find a search for you. Please run /play again.")
            .components(Vec::new()),
        Selection::UnknownTrack => EditInteractionResponse::new()
            .content("❓ That song is not part of your last search. Please try again."),
    };

    component.edit_response(&ctx.http, response).await?;
    Ok(())
}

async fn handle_leave(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &JukeboxBot,
    guild_id: GuildId,
) -> Result<()> {
    let message = match bot.controller.leave(guild_id).await {
        Ok(()) => "👋 Left the voice channel.".to_string(),
        Err(e) => playback_error_message(&e),
    };
    reply(ctx, command, &message).await
}

async fn handle_skip(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &JukeboxBot,
    guild_id: GuildId,
) -> Result<()> {
    let scope = match subcommand(command).map(|(name, _)| name.parse::<SkipScope>()) {
        Some(Ok(scope)) => scope,
        Some(Err(e)) => return reply(ctx, command, &playback_error_message(&e)).await,
        None => SkipScope::Single,
    };

    let message = match bot.controller.skip(guild_id, scope).await {
        Ok(Some(next)) => CreateInteractionResponseMessage::new()
            .content("⏭️ Skipped.")
            .embed(embeds::create_now_playing_embed(&next)),
        Ok(None) => CreateInteractionResponseMessage::new().content("⏹️ Skipped. Nothing left to play."),
        Err(e) => CreateInteractionResponseMessage::new().content(playback_error_message(&e)),
    };

    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(message.ephemeral(true)),
        )
        .await?;
    Ok(())
}

async fn handle_show(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &JukeboxBot,
    guild_id: GuildId,
) -> Result<()> {
    let queued = match bot.controller.query_queue(guild_id) {
        Ok(queued) => queued,
        Err(e) => return reply(ctx, command, &playback_error_message(&e)).await,
    };
    let now_playing = bot.controller.now_playing(guild_id).await.ok().flatten();

    let message = if queued.is_empty() && now_playing.is_none() {
        CreateInteractionResponseMessage::new().content("📭 Playlist is empty.")
    } else {
        CreateInteractionResponseMessage::new()
            .embed(embeds::create_queue_embed(now_playing.as_ref(), &queued))
    };

    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(message.ephemeral(true)),
        )
        .await?;
    Ok(())
}

async fn handle_set(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &JukeboxBot,
    guild_id: GuildId,
) -> Result<()> {
    let Some((mode, _)) = subcommand(command) else {
        return reply(ctx, command, "❌ Use one of the modes: off, song, queue.").await;
    };

    let message = match bot.controller.set_repeat_mode(guild_id, mode) {
        Ok(mode) => format!("🔁 Repeat mode set to `{mode}`."),
        Err(e) => playback_error_message(&e),
    };
    reply(ctx, command, &message).await
}

async fn handle_seek(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &JukeboxBot,
    guild_id: GuildId,
) -> Result<()> {
    let Some((mode, options)) = subcommand(command) else {
        return reply(ctx, command, "❌ Use /seek absolute or /seek relative.").await;
    };
    let seconds = options
        .iter()
        .find(|opt| opt.name == "seconds")
        .and_then(|opt| opt.value.as_i64())
        .unwrap_or(0);

    let message = match mode.parse::<SeekMode>() {
        Ok(mode) => match bot.controller.seek(guild_id, mode, seconds).await {
            Ok(target) => format!("⏩ Jumped to {}.", embeds::format_position(target)),
            Err(e) => playback_error_message(&e),
        },
        Err(e) => playback_error_message(&e),
    };
    reply(ctx, command, &message).await
}

/// Name and options of the invoked subcommand, if the command has one.
fn subcommand(command: &CommandInteraction) -> Option<(&str, &[CommandDataOption])> {
    command.data.options.first().and_then(|opt| match &opt.value {
        CommandDataOptionValue::SubCommand(options) => Some((opt.name.as_str(), options.as_slice())),
        _ => None,
    })
}

fn user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    let guild = guild_id.to_guild_cached(&ctx.cache)?;
    guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
}

async fn reply(ctx: &Context, command: &CommandInteraction, content: &str) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(content)
                    .ephemeral(true),
            ),
        )
        .await?;
    Ok(())
}

async fn edit(ctx: &Context, command: &CommandInteraction, content: &str) -> Result<()> {
    command
        .edit_response(&ctx.http, EditInteractionResponse::new().content(content))
        .await?;
    Ok(())
}

fn enqueued_message(track: &Track, outcome: &Enqueued) -> String {
    match outcome {
        Enqueued::Started(_) => format!("▶️ Now playing **{}**.", track.title()),
        Enqueued::Queued { queue_len } => format!(
            "➕ Added **{}** to the queue ({} waiting).",
            track.title(),
            queue_len
        ),
    }
}

/// User-facing text for an engine failure.
fn playback_error_message(error: &PlaybackError) -> String {
    match error {
        PlaybackError::NoActiveSession => {
            "🔇 I'm not playing in this server. Use /play first.".to_string()
        }
        PlaybackError::NotConnected => "🎧 Join a voice channel first.".to_string(),
        PlaybackError::UnsupportedMode(mode) => format!("❌ `{mode}` is not a supported option."),
        PlaybackError::NoTrackPlaying => "🤷 Nothing is playing right now.".to_string(),
        PlaybackError::JoinFailed(_) => {
            "🚫 I couldn't join your voice channel. Check my permissions.".to_string()
        }
        PlaybackError::PlayerCommandFailed { .. } | PlaybackError::PlayerUnavailable(_) => {
            warn!(error = ?error, "Player failure reported to user");
            "😭 The audio player failed. Please try again.".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::track::track;
    use pretty_assertions::assert_eq;

    #[test]
    fn enqueue_messages_reflect_the_outcome() {
        let t = track("a", 60);
        assert_eq!(
            enqueued_message(&t, &Enqueued::Started(t.clone())),
            "▶️ Now playing **Track a**."
        );
        assert_eq!(
            enqueued_message(&t, &Enqueued::Queued { queue_len: 3 }),
            "➕ Added **Track a** to the queue (3 waiting)."
        );
    }

    #[test]
    fn every_error_has_a_message() {
        let errors = [
            PlaybackError::NoActiveSession,
            PlaybackError::NotConnected,
            PlaybackError::UnsupportedMode("loud".into()),
            PlaybackError::player("play", anyhow::anyhow!("boom")),
            PlaybackError::NoTrackPlaying,
            PlaybackError::JoinFailed(anyhow::anyhow!("denied")),
            PlaybackError::PlayerUnavailable(anyhow::anyhow!("down")),
        ];
        for error in &errors {
            assert!(!playback_error_message(error).is_empty());
        }
        assert!(playback_error_message(&errors[2]).contains("loud"));
    }
}
