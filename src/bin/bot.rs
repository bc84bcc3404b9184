use anyhow::Result;
use chrono::{DateTime, Utc};
use dotenvy::dotenv;
use log::{error, info, warn};
use serenity::async_trait;
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::model::application::interaction::{Interaction, InteractionResponseType};
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::id::GuildId;
use serenity::prelude::*;
use std::sync::Arc;

use feedwatch::commands::{
    command_argument, register_global_commands, register_guild_commands, CommandHandler,
    CommandInvocation,
};
use feedwatch::core::{chunk_for_message, Config, SessionId};
use feedwatch::database::{Database, EventStore};
use feedwatch::features::reminders::{MuteTable, ReminderScheduler, SchedulerConfig};
use feedwatch::transport::{deliver, DiscordTransport, InboundText, Reply};

struct Handler {
    command_handler: Arc<CommandHandler>,
    guild_id: Option<GuildId>,
}

impl Handler {
    fn new(command_handler: CommandHandler, guild_id: Option<GuildId>) -> Self {
        Self {
            command_handler: Arc::new(command_handler),
            guild_id,
        }
    }

    fn to_inbound(msg: &Message) -> InboundText {
        InboundText {
            session_id: msg.channel_id.0 as SessionId,
            text: msg.content.clone(),
            transport_message_id: msg.id.0 as i64,
            timestamp: DateTime::from_timestamp(msg.timestamp.unix_timestamp(), 0)
                .unwrap_or_else(Utc::now),
        }
    }

    /// Answer the interaction with the text replies; overflow and forwards go as channel messages
    async fn respond(
        &self,
        ctx: &Context,
        command: &ApplicationCommandInteraction,
        replies: Vec<Reply>,
    ) -> Result<()> {
        let session_id = command.channel_id.0 as SessionId;
        let (texts, forwards): (Vec<Reply>, Vec<Reply>) = replies
            .into_iter()
            .partition(|reply| matches!(reply, Reply::Text(_)));

        let joined = texts
            .iter()
            .filter_map(|reply| match reply {
                Reply::Text(text) => Some(text.as_str()),
                Reply::Forward { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n\n");
        let mut chunks = chunk_for_message(&joined).into_iter();
        let first = chunks
            .next()
            .filter(|chunk| !chunk.is_empty())
            .unwrap_or_else(|| "Done.".to_string());

        command
            .create_interaction_response(&ctx.http, |response| {
                response
                    .kind(InteractionResponseType::ChannelMessageWithSource)
                    .interaction_response_data(|message| message.content(first))
            })
            .await?;

        let rest: Vec<Reply> = chunks.map(Reply::Text).chain(forwards).collect();
        if !rest.is_empty() {
            let transport = DiscordTransport::new(ctx.http.clone());
            let failed = deliver(&transport, session_id, &rest).await;
            if failed > 0 {
                warn!("{failed} follow-up replies to /{} were not delivered", command.data.name);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot || msg.content.trim().is_empty() {
            return;
        }

        let inbound = Self::to_inbound(&msg);
        let replies = self.command_handler.handle_message(&inbound).await;
        if replies.is_empty() {
            return;
        }

        let transport = DiscordTransport::new(ctx.http.clone());
        let failed = deliver(&transport, inbound.session_id, &replies).await;
        if failed > 0 {
            error!(
                "Failed to deliver {failed} of {} replies to channel {}",
                replies.len(),
                msg.channel_id
            );
        }
    }

    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🎉 {} is connected and ready!", ready.user.name);
        info!("📡 Connected to {} guilds", ready.guilds.len());
        info!("🤖 Bot ID: {}", ready.user.id);

        let registered = match self.guild_id {
            Some(guild_id) => register_guild_commands(&ctx, guild_id).await,
            None => register_global_commands(&ctx).await,
        };
        if let Err(e) = registered {
            error!("Failed to register slash commands: {e}");
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::ApplicationCommand(command) = interaction else {
            return;
        };

        let invocation = CommandInvocation::new(
            command.channel_id.0 as SessionId,
            command.data.name.as_str(),
            command_argument(&command.data.name, &command.data.options),
            Utc::now(),
        );
        let replies = self.command_handler.handle_command(&invocation).await;

        if let Err(e) = self.respond(&ctx, &command, replies).await {
            error!(
                "Error responding to slash command '{}': {}",
                command.data.name, e
            );
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting feeding tracker bot...");

    let database = Database::new(&config.database_path, config.store_timeout()).await?;
    let store: Arc<dyn EventStore> = Arc::new(database);
    let command_handler = CommandHandler::new(Arc::clone(&store));

    // Parse guild ID if provided for development mode
    let guild_id = config
        .discord_guild_id
        .as_ref()
        .and_then(|id| id.parse::<u64>().ok())
        .map(GuildId);

    let handler = Handler::new(command_handler, guild_id);

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .await
        .map_err(|e| {
            error!("Failed to create Discord client: {e}");
            anyhow::anyhow!("Client creation failed: {}", e)
        })?;

    info!("Bot configured successfully. Connecting to Discord gateway...");

    // Start the reminder scheduler
    let transport = Arc::new(DiscordTransport::new(client.cache_and_http.http.clone()));
    let scheduler = Arc::new(ReminderScheduler::new(
        store,
        transport,
        Arc::new(MuteTable::new()),
        SchedulerConfig::from_config(&config),
    ));
    tokio::spawn(scheduler.run());

    if let Err(why) = client.start().await {
        error!("Gateway connection failed: {why:?}");
        return Err(anyhow::anyhow!(
            "Failed to establish gateway connection: {}",
            why
        ));
    }

    Ok(())
}
