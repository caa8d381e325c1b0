use anyhow::{Error, anyhow};
use poise::serenity_prelude as serenity;
use tracing::info;

use crate::permissions::{self, Decision, Denial, Invoker};
use crate::types::Context;

/// Runs before every command and refuses invocations that a guild's command overrides don't
/// allow.
///
/// Errors while loading overrides are returned rather than treated as an allow, so the command
/// doesn't run.
pub async fn command_check(ctx: Context<'_>) -> Result<bool, Error> {
	let Some(guild_id) = ctx.guild_id() else {
		// Every command is guild_only, poise rejects these itself
		return Ok(true);
	};

	let invoker = invoker(ctx, guild_id).await?;
	let qualified_name = &ctx.command().qualified_name;
	let mut segments = qualified_name.split_whitespace();
	let command = segments.next().unwrap_or_default();
	let path = segments.collect::<Vec<_>>();

	let decision = permissions::evaluate(
		&ctx.data().database,
		&ctx.data().registry,
		guild_id,
		&invoker,
		ctx.channel_id(),
		command,
		&path,
	)
	.await?;

	let Decision::Denied(denial) = decision else {
		return Ok(true);
	};

	let reason: &'static str = denial.into();
	info!(
		"Denied /{} for {} ({}) in guild {} ({})",
		qualified_name,
		ctx.author().name,
		invoker.user_id,
		guild_id,
		reason
	);

	let embed = serenity::CreateEmbed::new()
		.color(crate::types::DENIED_COLOR)
		.title("⛔ Permission Denied")
		.description(denial_message(denial));
	ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
		.await?;

	Ok(false)
}

#[must_use]
pub fn denial_message(denial: Denial) -> &'static str {
	match denial {
		Denial::NoPermission => "You do not have permission to use this command.",
		Denial::NoPermissionChannel => "This command is not available in this channel.",
		Denial::Disabled => "This command is disabled.",
		Denial::NotFound => "This command is not found.",
	}
}

async fn invoker(ctx: Context<'_>, guild_id: serenity::GuildId) -> Result<Invoker, Error> {
	let member = ctx
		.author_member()
		.await
		.ok_or(anyhow!("Failed to fetch server member."))?;

	let cached_owner = ctx.guild().map(|guild| guild.owner_id);
	member_invoker(ctx, guild_id, &member, cached_owner).await
}

/// Builds the permission view of a member. `cached_owner` skips fetching the guild when the owner
/// is already known.
pub async fn member_invoker(
	cache_http: impl serenity::CacheHttp,
	guild_id: serenity::GuildId,
	member: &serenity::Member,
	cached_owner: Option<serenity::UserId>,
) -> Result<Invoker, Error> {
	let owner_id = match cached_owner {
		Some(owner_id) => owner_id,
		None => guild_id.to_partial_guild(cache_http).await?.owner_id,
	};

	let is_administrator = member
		.permissions
		.is_some_and(serenity::Permissions::administrator);

	Ok(Invoker {
		user_id: member.user.id,
		roles: member.roles.clone(),
		is_owner: member.user.id == owner_id,
		is_administrator,
	})
}

/// The guild a command was invoked in. Fails for commands run in DMs.
pub fn require_guild(ctx: Context<'_>) -> Result<serenity::GuildId, Error> {
	ctx.guild_id()
		.ok_or(anyhow!("This command only works inside guilds"))
}
