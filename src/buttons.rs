//! Ban and unban buttons attached to moderation replies and join logs.
//!
//! Buttons go through the same permission overrides as `/ban` and `/unban`.

use anyhow::Error;
use poise::serenity_prelude::{self as serenity, Mentionable, UserId};
use tracing::{info, warn};

use crate::checks::{denial_message, member_invoker};
use crate::helpers;
use crate::permissions::{self, Decision};
use crate::types::Data;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModerationButton {
	Ban(UserId),
	Unban(UserId),
}

impl ModerationButton {
	/// Parses a `ban-<user id>` or `unban-<user id>` custom id.
	#[must_use]
	pub fn parse(custom_id: &str) -> Option<Self> {
		let (action, user_id) = custom_id.split_once('-')?;
		let user_id = user_id.parse::<u64>().ok().filter(|id| *id != 0)?;

		match action {
			"ban" => Some(Self::Ban(UserId::new(user_id))),
			"unban" => Some(Self::Unban(UserId::new(user_id))),
			_ => None,
		}
	}

	#[must_use]
	pub fn custom_id(self) -> String {
		match self {
			Self::Ban(user_id) => format!("ban-{user_id}"),
			Self::Unban(user_id) => format!("unban-{user_id}"),
		}
	}

	/// The command whose permissions gate this button.
	#[must_use]
	pub fn command(self) -> &'static str {
		match self {
			Self::Ban(_) => "ban",
			Self::Unban(_) => "unban",
		}
	}

	fn user_id(self) -> UserId {
		match self {
			Self::Ban(user_id) | Self::Unban(user_id) => user_id,
		}
	}

	#[must_use]
	pub fn button(self) -> serenity::CreateButton {
		match self {
			Self::Ban(_) => serenity::CreateButton::new(self.custom_id())
				.label("Ban")
				.emoji('🔨')
				.style(serenity::ButtonStyle::Danger),
			Self::Unban(_) => serenity::CreateButton::new(self.custom_id())
				.label("Unban")
				.emoji('📤')
				.style(serenity::ButtonStyle::Secondary),
		}
	}

	#[must_use]
	pub fn row(self) -> serenity::CreateActionRow {
		serenity::CreateActionRow::Buttons(vec![self.button()])
	}
}

/// Handles a pressed moderation button. Components with other custom ids are ignored.
pub async fn handle(
	ctx: &serenity::Context,
	data: &Data,
	component: &serenity::ComponentInteraction,
) -> Result<(), Error> {
	let Some(button) = ModerationButton::parse(&component.data.custom_id) else {
		return Ok(());
	};
	let (Some(guild_id), Some(member)) = (component.guild_id, component.member.as_ref()) else {
		return Ok(());
	};

	let cached_owner = ctx.cache.guild(guild_id).map(|guild| guild.owner_id);
	let owner_id = match cached_owner {
		Some(owner_id) => owner_id,
		None => guild_id.to_partial_guild(ctx).await?.owner_id,
	};
	let invoker = member_invoker(ctx, guild_id, member, Some(owner_id)).await?;
	let decision = permissions::evaluate(
		&data.database,
		&data.registry,
		guild_id,
		&invoker,
		component.channel_id,
		button.command(),
		&[],
	)
	.await?;
	if let Decision::Denied(denial) = decision {
		let reason: &'static str = denial.into();
		info!(
			"Denied {} button for {} in guild {} ({})",
			button.command(),
			member.user.name,
			guild_id,
			reason
		);
		return reject(ctx, component, denial_message(denial)).await;
	}

	let user_id = button.user_id();
	let reason = format!("{} button pressed by {}", button.command(), member.user.name);
	let (title, description, follow_up) = match button {
		ModerationButton::Ban(_) => {
			if user_id == owner_id || user_id == member.user.id {
				return reject(ctx, component, "You can't ban this user!").await;
			}
			if let Err(e) = guild_id.ban_with_reason(ctx, user_id, 0, &reason).await {
				warn!("Ban button failed for {} in guild {}: {}", user_id, guild_id, e);
				return reject(
					ctx,
					component,
					"Couldn't ban that user. Check that they're below the bot in the role hierarchy.",
				)
				.await;
			}
			(
				"🔨 Banned",
				format!("{} was banned.\n\nReason: {}", user_id.mention(), reason),
				Some(ModerationButton::Unban(user_id)),
			)
		}
		ModerationButton::Unban(_) => {
			if let Err(e) = guild_id.unban(ctx, user_id).await {
				warn!("Unban button failed for {} in guild {}: {}", user_id, guild_id, e);
				return reject(ctx, component, "This user isn't banned!").await;
			}
			("📤 Unbanned", format!("{} was unbanned.", user_id.mention()), None)
		}
	};
	info!(
		"{} used the {} button on {} in guild {}",
		member.user.name,
		button.command(),
		user_id,
		guild_id
	);

	let mut message =
		serenity::CreateInteractionResponseMessage::new().embed(helpers::embed(title, &description));
	if let Some(button) = follow_up {
		message = message.components(vec![button.row()]);
	}
	component
		.create_response(ctx, serenity::CreateInteractionResponse::Message(message))
		.await?;

	let log_embed = helpers::embed(
		title,
		format!("Executor: {}\n\n{}", member.user.id.mention(), description),
	)
	.timestamp(serenity::Timestamp::now());
	let log_message = serenity::CreateMessage::new().embed(log_embed);
	if let Err(e) = helpers::send_guild_log(ctx, &data.database, guild_id, log_message).await {
		warn!("Failed to write button log for guild {}: {}", guild_id, e);
	}

	Ok(())
}

async fn reject(
	ctx: &serenity::Context,
	component: &serenity::ComponentInteraction,
	message: &str,
) -> Result<(), Error> {
	let message = serenity::CreateInteractionResponseMessage::new()
		.embed(helpers::error_embed(message))
		.ephemeral(true);
	component
		.create_response(ctx, serenity::CreateInteractionResponse::Message(message))
		.await?;
	Ok(())
}
