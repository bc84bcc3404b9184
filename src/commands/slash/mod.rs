//! # Slash Commands (/)
//!
//! Discord native slash command definitions, registration and option access.
//!
//! - **Version**: 3.0.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 3.0.0: Feeding tracker command set; options map onto a single invocation argument
//! - 1.0.0: Reorganized from monolithic slash_commands.rs

use anyhow::Result;
use log::info;
use serenity::builder::CreateApplicationCommand;
use serenity::model::application::command::{Command, CommandOptionType};
use serenity::model::application::interaction::application_command::CommandDataOption;
use serenity::model::id::GuildId;
use serenity::prelude::Context;

/// Creates all slash command definitions
pub fn create_slash_commands() -> Vec<CreateApplicationCommand> {
    vec![
        // Session lifecycle
        CreateApplicationCommand::default()
            .name("start")
            .description("Start tracking feedings here, or change the feeding period")
            .create_option(|option| {
                option
                    .name("period")
                    .description("Feeding period as H:M:S, e.g. 3:00:00")
                    .kind(CommandOptionType::String)
                    .required(true)
            })
            .to_owned(),
        simple_command("stop", "Stop tracking and delete everything recorded here"),
        simple_command("reset", "Go back to logging feedings"),
        simple_command("help", "Show the available commands"),
        // Statistics
        CreateApplicationCommand::default()
            .name("report")
            .description("List feedings of the last 24 hours or of one day")
            .create_option(|option| {
                option
                    .name("date")
                    .description("Calendar day, e.g. Mar 10")
                    .kind(CommandOptionType::String)
                    .required(false)
            })
            .to_owned(),
        simple_command("stats", "Daily totals and time since the last feeding"),
        simple_command("month", "Daily totals for the last 31 days"),
        // Topics
        CreateApplicationCommand::default()
            .name("newtopic")
            .description("Start a topic for free-text notes")
            .create_option(|option| {
                option
                    .name("name")
                    .description("Topic name; if omitted, your next message names it")
                    .kind(CommandOptionType::String)
                    .required(false)
            })
            .to_owned(),
        simple_command("topics", "List open topics"),
        numbered_command("topic", "Write into an existing topic"),
        numbered_command("closetopic", "Close a topic"),
        numbered_command("forward", "Replay a topic's notes"),
    ]
}

fn simple_command(name: &str, description: &str) -> CreateApplicationCommand {
    CreateApplicationCommand::default()
        .name(name)
        .description(description)
        .to_owned()
}

fn numbered_command(name: &str, description: &str) -> CreateApplicationCommand {
    CreateApplicationCommand::default()
        .name(name)
        .description(description)
        .create_option(|option| {
            option
                .name("number")
                .description("Topic number as shown by /topics")
                .kind(CommandOptionType::Integer)
                .required(true)
        })
        .to_owned()
}

/// Registers all slash commands globally
pub async fn register_global_commands(ctx: &Context) -> Result<()> {
    let slash_commands = create_slash_commands();
    let count = slash_commands.len();

    Command::set_global_application_commands(&ctx.http, |commands| {
        for command in slash_commands {
            commands.add_application_command(command);
        }
        commands
    })
    .await?;

    info!("Global slash commands registered successfully ({count} commands)");
    Ok(())
}

/// Registers all slash commands for a specific guild (faster for testing)
pub async fn register_guild_commands(ctx: &Context, guild_id: GuildId) -> Result<()> {
    let slash_commands = create_slash_commands();
    let count = slash_commands.len();

    guild_id
        .set_application_commands(&ctx.http, |commands| {
            for command in slash_commands {
                commands.add_application_command(command);
            }
            commands
        })
        .await?;

    info!("Guild slash commands registered for guild {guild_id} ({count} commands)");
    Ok(())
}

/// The single argument a command takes, read from its named option
pub fn command_argument(name: &str, options: &[CommandDataOption]) -> Option<String> {
    match name {
        "start" => get_string_option(options, "period"),
        "report" => get_string_option(options, "date"),
        "newtopic" => get_string_option(options, "name"),
        "topic" | "closetopic" | "forward" => {
            get_integer_option(options, "number").map(|n| n.to_string())
        }
        _ => None,
    }
}

/// Utility function to get string option from slash command
pub fn get_string_option(options: &[CommandDataOption], name: &str) -> Option<String> {
    options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_ref())
        .and_then(|val| val.as_str())
        .map(|s| s.to_string())
}

/// Utility function to get integer option from slash command
pub fn get_integer_option(options: &[CommandDataOption], name: &str) -> Option<i64> {
    options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_ref())
        .and_then(|val| val.as_i64())
}
