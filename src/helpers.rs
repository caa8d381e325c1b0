use anyhow::{Context as _, Error, bail};
use itertools::Itertools as _;
use poise::serenity_prelude::{self as serenity, Mentionable};
use tracing::warn;

use crate::commands::settings::database as settings;
use crate::types::{Context, DENIED_COLOR, Data, EMBED_COLOR};

/// Responds with a short explanation of what went wrong, ephemerally.
///
/// Every command routes its errors here, so this also answers permission checks that failed to
/// run. Anything else goes to poise's default handler.
pub async fn acknowledge_fail(error: poise::FrameworkError<'_, Data, Error>) {
	let (ctx, message) = match &error {
		poise::FrameworkError::Command { error, ctx, .. } => {
			warn!("Command {} failed: {}", ctx.command().qualified_name, error);
			(*ctx, error.to_string())
		}
		poise::FrameworkError::CommandCheckFailed {
			error: Some(error),
			ctx,
			..
		} => {
			warn!(
				"Permission check for {} failed: {}",
				ctx.command().qualified_name,
				error
			);
			(*ctx, check_failure_message(error))
		}
		poise::FrameworkError::ArgumentParse { error, ctx, .. } => {
			let message = match &ctx.command().help_text {
				Some(help_text) => format!("**{error}**\n{help_text}"),
				None => error.to_string(),
			};
			(*ctx, message)
		}
		// A denial was already answered by the check itself
		poise::FrameworkError::CommandCheckFailed { error: None, .. } => return,
		_ => {
			if let Err(e) = poise::builtins::on_error(error).await {
				warn!("Error while handling error: {}", e);
			}
			return;
		}
	};

	let reply = poise::CreateReply::default()
		.embed(error_embed(message))
		.ephemeral(true);
	if let Err(e) = ctx.send(reply).await {
		warn!("Failed to send failure acknowledgment: {}", e);
	}
}

/// What a member is told when their permissions couldn't be checked. The command did not run.
#[must_use]
pub fn check_failure_message(error: &Error) -> String {
	format!("Couldn't check your permissions, so the command didn't run: {error}")
}

#[must_use]
pub fn embed(title: impl Into<String>, description: impl Into<String>) -> serenity::CreateEmbed {
	serenity::CreateEmbed::new()
		.color(EMBED_COLOR)
		.title(title)
		.description(description)
}

#[must_use]
pub fn error_embed(description: impl Into<String>) -> serenity::CreateEmbed {
	serenity::CreateEmbed::new()
		.color(DENIED_COLOR)
		.title("⛔ Error")
		.description(description)
}

/// Sends an ephemeral error embed, for user mistakes that aren't worth failing the command over.
pub async fn reject(ctx: Context<'_>, message: impl Into<String>) -> Result<(), Error> {
	ctx.send(
		poise::CreateReply::default()
			.embed(error_embed(message))
			.ephemeral(true),
	)
	.await?;
	Ok(())
}

/// Formats a list of mentionable IDs, or `None` when empty.
#[must_use]
pub fn mention_list<T: Mentionable>(items: &[T]) -> String {
	if items.is_empty() {
		return "`None`".to_owned();
	}
	items.iter().map(|item| item.mention().to_string()).join(", ")
}

/// Posts a message to the guild's configured log channel. Does nothing when no log channel is
/// configured.
pub async fn send_guild_log(
	http: impl serenity::CacheHttp,
	database: &sqlx::PgPool,
	guild_id: serenity::GuildId,
	log_message: serenity::CreateMessage,
) -> Result<(), Error> {
	let Some(log_channel_id) = settings::fetch(database, guild_id).await?.log_channel_id else {
		return Ok(());
	};

	let channel = log_channel_id
		.to_channel(&http)
		.await
		.context("Log channel not found. Use /settings log_channel to pick another one.")?;

	let is_text_channel = matches!(channel.guild(), Some(guild_channel) if guild_channel.kind == serenity::ChannelType::Text);
	if !is_text_channel {
		bail!("The log channel must be a text channel.");
	}

	log_channel_id
		.send_message(&http, log_message)
		.await
		.context("Failed to send log message")?;

	Ok(())
}

/// Logs an action taken through a command, naming the member who ran it. Failures are only
/// warned about, since the action itself already happened.
pub async fn log_action(ctx: Context<'_>, category: &str, content: &str) {
	let Some(guild_id) = ctx.guild_id() else {
		return;
	};

	let log_embed = embed(
		category,
		format!("Executor: {}\n\n{}", ctx.author().id.mention(), content),
	)
	.timestamp(serenity::Timestamp::now());

	let log_message = serenity::CreateMessage::new().embed(log_embed);
	if let Err(e) = send_guild_log(ctx, &ctx.data().database, guild_id, log_message).await {
		warn!("Failed to write {} log for guild {}: {}", category, guild_id, e);
	}
}
