use anyhow::Result;
use serenity::{
    builder::{CreateCommand, CreateCommandOption},
    model::{application::CommandOptionType, id::GuildId},
    prelude::Context,
};

/// Registers the commands globally (propagation can take up to an hour).
pub async fn register_global_commands(ctx: &Context) -> Result<()> {
    for command in all_commands() {
        ctx.http.create_global_command(&command).await?;
    }

    Ok(())
}

/// Registers the commands for one guild only. Updates are visible immediately.
pub async fn register_guild_commands(ctx: &Context, guild_id: GuildId) -> Result<()> {
    guild_id.set_commands(&ctx.http, all_commands()).await?;

    Ok(())
}

fn all_commands() -> Vec<CreateCommand> {
    vec![
        play_command(),
        leave_command(),
        skip_command(),
        show_command(),
        set_command(),
        seek_command(),
    ]
}

fn play_command() -> CreateCommand {
    CreateCommand::new("play")
        .description("Play a song, a playlist or search results")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::String,
                "query",
                "URL or search terms",
            )
            .required(true),
        )
}

fn leave_command() -> CreateCommand {
    CreateCommand::new("leave").description("Leave the voice channel and clear the queue")
}

fn skip_command() -> CreateCommand {
    CreateCommand::new("skip")
        .description("Skip songs")
        .add_option(CreateCommandOption::new(
            CommandOptionType::SubCommand,
            "single",
            "Skip the current song",
        ))
        .add_option(CreateCommandOption::new(
            CommandOptionType::SubCommand,
            "all",
            "Clear the queue and stop playback",
        ))
}

fn show_command() -> CreateCommand {
    CreateCommand::new("show").description("Show the next songs in the queue")
}

fn set_command() -> CreateCommand {
    CreateCommand::new("set")
        .description("Set the repeat mode")
        .add_option(CreateCommandOption::new(
            CommandOptionType::SubCommand,
            "off",
            "Play through the queue once",
        ))
        .add_option(CreateCommandOption::new(
            CommandOptionType::SubCommand,
            "song",
            "Repeat the current song",
        ))
        .add_option(CreateCommandOption::new(
            CommandOptionType::SubCommand,
            "queue",
            "Loop over the whole queue",
        ))
}

fn seek_command() -> CreateCommand {
    let seconds = |description: &str| {
        CreateCommandOption::new(CommandOptionType::Integer, "seconds", description).required(true)
    };

    CreateCommand::new("seek")
        .description("Jump within the current song")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::SubCommand,
                "absolute",
                "Jump to a position",
            )
            .add_sub_option(seconds("Position from the start, in seconds")),
        )
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::SubCommand,
                "relative",
                "Jump forward or backward",
            )
            .add_sub_option(seconds("Offset from the current position, negative to rewind")),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn registers_every_playback_command() {
        let names: Vec<String> = all_commands()
            .iter()
            .map(|c| serde_json::to_value(c).unwrap()["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["play", "leave", "skip", "show", "set", "seek"]);
    }

    #[test]
    fn seek_subcommands_require_seconds() {
        let seek = serde_json::to_value(seek_command()).unwrap();
        for sub in seek["options"].as_array().unwrap() {
            let seconds = &sub["options"][0];
            assert_eq!(seconds["name"], "seconds");
            assert_eq!(seconds["required"], true);
        }
    }
}
