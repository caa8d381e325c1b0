use anyhow::{Error, anyhow};
use poise::CreateReply;
use poise::serenity_prelude::{self as serenity, Mentionable};
use tracing::info;

use crate::buttons::ModerationButton;
use crate::checks::require_guild;
use crate::commands::settings::database as settings;
use crate::helpers;
use crate::types::Context;

const NO_REASON: &str = "No reason specified.";

/// Bans a user from the server
///
/// /ban <user> [reason]
#[poise::command(
	slash_command,
	guild_only,
	category = "Moderation",
	on_error = "crate::helpers::acknowledge_fail"
)]
pub async fn ban(
	ctx: Context<'_>,
	#[description = "User to ban"] user: serenity::User,
	#[description = "Ban reason"] reason: Option<String>,
) -> Result<(), Error> {
	let guild_id = require_guild(ctx)?;
	if user.id == ctx.author().id {
		return helpers::reject(ctx, "You can't ban yourself!").await;
	}

	let reason = reason.unwrap_or_else(|| NO_REASON.to_owned());
	guild_id
		.ban_with_reason(ctx.http(), user.id, 0, &reason)
		.await?;
	info!("{} banned {} in guild {}", ctx.author().name, user.name, guild_id);

	let description = format!("{} was banned.\n\nReason: {}", user.id.mention(), reason);
	ctx.send(
		CreateReply::default()
			.embed(helpers::embed("🔨 Banned", &description))
			.components(vec![ModerationButton::Unban(user.id).row()]),
	)
	.await?;
	helpers::log_action(ctx, "Member Banned", &description).await;

	Ok(())
}

/// Lifts a ban
///
/// /unban <user>
#[poise::command(
	slash_command,
	guild_only,
	category = "Moderation",
	on_error = "crate::helpers::acknowledge_fail"
)]
pub async fn unban(
	ctx: Context<'_>,
	#[description = "User to unban"] user: serenity::User,
) -> Result<(), Error> {
	let guild_id = require_guild(ctx)?;

	guild_id
		.unban(ctx.http(), user.id)
		.await
		.map_err(|e| anyhow!("Couldn't unban {}: {e}", user.name))?;
	info!("{} unbanned {} in guild {}", ctx.author().name, user.name, guild_id);

	let description = format!("{} was unbanned.", user.id.mention());
	ctx.send(CreateReply::default().embed(helpers::embed("📤 Unbanned", &description)))
		.await?;
	helpers::log_action(ctx, "Member Unbanned", &description).await;

	Ok(())
}

/// Gives a member the server's mute role
///
/// /mute <member> [reason]
///
/// The mute role is configured with /settings mute_role.
#[poise::command(
	slash_command,
	guild_only,
	category = "Moderation",
	on_error = "crate::helpers::acknowledge_fail"
)]
pub async fn mute(
	ctx: Context<'_>,
	#[description = "Member to mute"] member: serenity::Member,
	#[description = "Mute reason"] reason: Option<String>,
) -> Result<(), Error> {
	let guild_id = require_guild(ctx)?;
	let mute_role_id = settings::fetch(&ctx.data().database, guild_id)
		.await?
		.mute_role_id
		.ok_or(anyhow!(
			"There is no mute role set up. Use /settings mute_role first."
		))?;

	if member.roles.contains(&mute_role_id) {
		return helpers::reject(ctx, "This member is already muted!").await;
	}

	let reason = reason.unwrap_or_else(|| NO_REASON.to_owned());
	ctx.http()
		.add_member_role(guild_id, member.user.id, mute_role_id, Some(reason.as_str()))
		.await?;
	info!("{} muted {} in guild {}", ctx.author().name, member.user.name, guild_id);

	let description = format!("{} was muted.\n\nReason: {}", member.mention(), reason);
	ctx.send(CreateReply::default().embed(helpers::embed("🔇 Muted", &description)))
		.await?;
	helpers::log_action(ctx, "Member Muted", &description).await;

	Ok(())
}

/// Removes the mute role from a member
///
/// /unmute <member>
#[poise::command(
	slash_command,
	guild_only,
	category = "Moderation",
	on_error = "crate::helpers::acknowledge_fail"
)]
pub async fn unmute(
	ctx: Context<'_>,
	#[description = "Member to unmute"] member: serenity::Member,
) -> Result<(), Error> {
	let guild_id = require_guild(ctx)?;
	let guild_settings = settings::fetch(&ctx.data().database, guild_id).await?;

	let Some(mute_role_id) = guild_settings
		.mute_role_id
		.filter(|role_id| member.roles.contains(role_id))
	else {
		return helpers::reject(ctx, "This member isn't muted!").await;
	};

	ctx.http()
		.remove_member_role(
			guild_id,
			member.user.id,
			mute_role_id,
			Some(format!("Unmuted by {}", ctx.author().name).as_str()),
		)
		.await?;
	info!("{} unmuted {} in guild {}", ctx.author().name, member.user.name, guild_id);

	let description = format!("{} was unmuted.", member.mention());
	ctx.send(CreateReply::default().embed(helpers::embed("🔊 Unmuted", &description)))
		.await?;
	helpers::log_action(ctx, "Member Unmuted", &description).await;

	Ok(())
}
