use anyhow::Error;
use itertools::Itertools as _;
use poise::CreateReply;
use poise::serenity_prelude::{self as serenity, Mentionable};
use tracing::info;

use crate::checks::require_guild;
use crate::helpers;
use crate::permissions::{
	CommandOverride, OverrideEdit, OverrideRules, OverrideStore, OverrideTarget, parse_command_path,
};
use crate::types::Context;

const UNKNOWN_COMMAND: &str = "This is not a known command!";

/// Suggests command paths as the user types them.
pub async fn autocomplete_command_path<'a>(
	ctx: Context<'a>,
	partial: &'a str,
) -> impl Iterator<Item = String> + 'a {
	let partial = partial.trim_start_matches('/');
	ctx.data()
		.registry
		.paths()
		.into_iter()
		.filter(move |path| path.starts_with(partial))
		.take(25)
}

/// Edit who may use a command, and where.
#[poise::command(
	slash_command,
	guild_only,
	category = "Permissions",
	subcommands(
		"role",
		"channel",
		"commands_admin_only",
		"commands_disable",
		"commands_enable",
		"commands_view",
		"commands_reset",
		"commands_list",
	),
	subcommand_required
)]
pub async fn commands(_ctx: Context<'_>) -> Result<(), Error> {
	// Can't be invoked directly
	Ok(())
}

/// Allow or block roles from using a command.
#[poise::command(
	slash_command,
	guild_only,
	category = "Permissions",
	subcommands("role_blacklist", "role_unblacklist", "role_allow", "role_disallow"),
	subcommand_required
)]
pub async fn role(_ctx: Context<'_>) -> Result<(), Error> {
	Ok(())
}

/// Blacklist a role from using a command.
#[poise::command(
	rename = "blacklist",
	slash_command,
	guild_only,
	category = "Permissions",
	on_error = "crate::helpers::acknowledge_fail"
)]
pub async fn role_blacklist(
	ctx: Context<'_>,
	#[description = "Command, e.g. \"settings view\""]
	#[autocomplete = "autocomplete_command_path"]
	command: String,
	#[description = "Role to blacklist"] role: serenity::Role,
) -> Result<(), Error> {
	edit_and_report(
		ctx,
		&command,
		OverrideEdit::BlacklistRole(role.id),
		|target| {
			format!(
				"The role {} has been blacklisted from using the command `{target}`.",
				role.id.mention()
			)
		},
	)
	.await
}

/// Remove a role from a command's blacklist.
#[poise::command(
	rename = "unblacklist",
	slash_command,
	guild_only,
	category = "Permissions",
	on_error = "crate::helpers::acknowledge_fail"
)]
pub async fn role_unblacklist(
	ctx: Context<'_>,
	#[description = "Command, e.g. \"settings view\""]
	#[autocomplete = "autocomplete_command_path"]
	command: String,
	#[description = "Role to remove from the blacklist"] role: serenity::Role,
) -> Result<(), Error> {
	edit_and_report(
		ctx,
		&command,
		OverrideEdit::UnblacklistRole(role.id),
		|target| {
			format!(
				"The role {} is no longer blacklisted from using the command `{target}`.",
				role.id.mention()
			)
		},
	)
	.await
}

/// Add a role to a command's allow-list.
///
/// Once the list isn't empty, only those roles may use the command.
#[poise::command(
	rename = "allow",
	slash_command,
	guild_only,
	category = "Permissions",
	on_error = "crate::helpers::acknowledge_fail"
)]
pub async fn role_allow(
	ctx: Context<'_>,
	#[description = "Command, e.g. \"settings view\""]
	#[autocomplete = "autocomplete_command_path"]
	command: String,
	#[description = "Role to allow"] role: serenity::Role,
) -> Result<(), Error> {
	edit_and_report(ctx, &command, OverrideEdit::AllowRole(role.id), |target| {
		format!(
			"The role {} has been allowed to use the command `{target}`.",
			role.id.mention()
		)
	})
	.await
}

/// Remove a role from a command's allow-list.
#[poise::command(
	rename = "disallow",
	slash_command,
	guild_only,
	category = "Permissions",
	on_error = "crate::helpers::acknowledge_fail"
)]
pub async fn role_disallow(
	ctx: Context<'_>,
	#[description = "Command, e.g. \"settings view\""]
	#[autocomplete = "autocomplete_command_path"]
	command: String,
	#[description = "Role to remove from the allow-list"] role: serenity::Role,
) -> Result<(), Error> {
	edit_and_report(ctx, &command, OverrideEdit::DisallowRole(role.id), |target| {
		format!(
			"The role {} has been removed from the allow-list of the command `{target}`.",
			role.id.mention()
		)
	})
	.await
}

/// Allow or block channels from running a command.
#[poise::command(
	slash_command,
	guild_only,
	category = "Permissions",
	subcommands(
		"channel_blacklist",
		"channel_unblacklist",
		"channel_allow",
		"channel_disallow"
	),
	subcommand_required
)]
pub async fn channel(_ctx: Context<'_>) -> Result<(), Error> {
	Ok(())
}

/// Blacklist a channel from running a command.
#[poise::command(
	rename = "blacklist",
	slash_command,
	guild_only,
	category = "Permissions",
	on_error = "crate::helpers::acknowledge_fail"
)]
pub async fn channel_blacklist(
	ctx: Context<'_>,
	#[description = "Command, e.g. \"settings view\""]
	#[autocomplete = "autocomplete_command_path"]
	command: String,
	#[description = "Channel to blacklist"] channel: serenity::GuildChannel,
) -> Result<(), Error> {
	edit_and_report(
		ctx,
		&command,
		OverrideEdit::BlacklistChannel(channel.id),
		|target| {
			format!(
				"The command `{target}` can no longer be used in {}.",
				channel.id.mention()
			)
		},
	)
	.await
}

/// Remove a channel from a command's blacklist.
#[poise::command(
	rename = "unblacklist",
	slash_command,
	guild_only,
	category = "Permissions",
	on_error = "crate::helpers::acknowledge_fail"
)]
pub async fn channel_unblacklist(
	ctx: Context<'_>,
	#[description = "Command, e.g. \"settings view\""]
	#[autocomplete = "autocomplete_command_path"]
	command: String,
	#[description = "Channel to remove from the blacklist"] channel: serenity::GuildChannel,
) -> Result<(), Error> {
	edit_and_report(
		ctx,
		&command,
		OverrideEdit::UnblacklistChannel(channel.id),
		|target| {
			format!(
				"The command `{target}` is no longer blacklisted in {}.",
				channel.id.mention()
			)
		},
	)
	.await
}

/// Add a channel to a command's allow-list.
///
/// Once the list isn't empty, the command only works in those channels.
#[poise::command(
	rename = "allow",
	slash_command,
	guild_only,
	category = "Permissions",
	on_error = "crate::helpers::acknowledge_fail"
)]
pub async fn channel_allow(
	ctx: Context<'_>,
	#[description = "Command, e.g. \"settings view\""]
	#[autocomplete = "autocomplete_command_path"]
	command: String,
	#[description = "Channel to allow"] channel: serenity::GuildChannel,
) -> Result<(), Error> {
	edit_and_report(
		ctx,
		&command,
		OverrideEdit::AllowChannel(channel.id),
		|target| {
			format!(
				"The command `{target}` has been allowed in {}.",
				channel.id.mention()
			)
		},
	)
	.await
}

/// Remove a channel from a command's allow-list.
#[poise::command(
	rename = "disallow",
	slash_command,
	guild_only,
	category = "Permissions",
	on_error = "crate::helpers::acknowledge_fail"
)]
pub async fn channel_disallow(
	ctx: Context<'_>,
	#[description = "Command, e.g. \"settings view\""]
	#[autocomplete = "autocomplete_command_path"]
	command: String,
	#[description = "Channel to remove from the allow-list"] channel: serenity::GuildChannel,
) -> Result<(), Error> {
	edit_and_report(
		ctx,
		&command,
		OverrideEdit::DisallowChannel(channel.id),
		|target| {
			format!(
				"{} has been removed from the allow-list of the command `{target}`.",
				channel.id.mention()
			)
		},
	)
	.await
}

/// Restrict a command to administrators.
#[poise::command(
	rename = "admin_only",
	slash_command,
	guild_only,
	category = "Permissions",
	on_error = "crate::helpers::acknowledge_fail"
)]
pub async fn commands_admin_only(
	ctx: Context<'_>,
	#[description = "Command, e.g. \"settings view\""]
	#[autocomplete = "autocomplete_command_path"]
	command: String,
	#[description = "Whether only administrators may use it"] admin_only: bool,
) -> Result<(), Error> {
	edit_and_report(ctx, &command, OverrideEdit::AdminOnly(admin_only), |target| {
		if admin_only {
			format!("The command `{target}` is now restricted to administrators.")
		} else {
			format!("The command `{target}` is no longer restricted to administrators.")
		}
	})
	.await
}

/// Disable a command.
#[poise::command(
	rename = "disable",
	slash_command,
	guild_only,
	category = "Permissions",
	on_error = "crate::helpers::acknowledge_fail"
)]
pub async fn commands_disable(
	ctx: Context<'_>,
	#[description = "Command, e.g. \"settings view\""]
	#[autocomplete = "autocomplete_command_path"]
	command: String,
) -> Result<(), Error> {
	edit_and_report(ctx, &command, OverrideEdit::Disabled(true), |target| {
		format!("The command `{target}` has been disabled.")
	})
	.await
}

/// Enable a previously disabled command.
#[poise::command(
	rename = "enable",
	slash_command,
	guild_only,
	category = "Permissions",
	on_error = "crate::helpers::acknowledge_fail"
)]
pub async fn commands_enable(
	ctx: Context<'_>,
	#[description = "Command, e.g. \"settings view\""]
	#[autocomplete = "autocomplete_command_path"]
	command: String,
) -> Result<(), Error> {
	edit_and_report(ctx, &command, OverrideEdit::Disabled(false), |target| {
		format!("The command `{target}` has been enabled.")
	})
	.await
}

/// View the permission override of a command.
#[poise::command(
	rename = "view",
	slash_command,
	guild_only,
	ephemeral,
	category = "Permissions",
	on_error = "crate::helpers::acknowledge_fail"
)]
pub async fn commands_view(
	ctx: Context<'_>,
	#[description = "Command, e.g. \"settings view\""]
	#[autocomplete = "autocomplete_command_path"]
	command: String,
) -> Result<(), Error> {
	let guild_id = require_guild(ctx)?;
	let Some(target) = resolve_target(ctx, &command) else {
		return helpers::reject(ctx, UNKNOWN_COMMAND).await;
	};

	let embed = match ctx.data().database.fetch_override(guild_id, &target).await? {
		Some(record) => {
			helpers::embed(format!("✋ Permissions for {target}"), describe_rules(&record.rules))
		}
		None => helpers::embed(
			format!("✋ Permissions for {target}"),
			"There is no override for this command. Its default permissions apply.",
		),
	};
	ctx.send(CreateReply::default().embed(embed)).await?;

	Ok(())
}

/// Delete the permission override of a command, restoring its default permissions.
#[poise::command(
	rename = "reset",
	slash_command,
	guild_only,
	category = "Permissions",
	on_error = "crate::helpers::acknowledge_fail"
)]
pub async fn commands_reset(
	ctx: Context<'_>,
	#[description = "Command, e.g. \"settings view\""]
	#[autocomplete = "autocomplete_command_path"]
	command: String,
) -> Result<(), Error> {
	let guild_id = require_guild(ctx)?;
	let Some(target) = resolve_target(ctx, &command) else {
		return helpers::reject(ctx, UNKNOWN_COMMAND).await;
	};

	if !ctx.data().database.delete_override(guild_id, &target).await? {
		return helpers::reject(ctx, format!("There is no override for `{target}`.")).await;
	}
	info!(
		"{} reset permissions of {} in guild {}",
		ctx.author().name,
		target,
		guild_id
	);

	let description = format!("The permissions of `{target}` have been reset to their defaults.");
	ctx.send(
		CreateReply::default().embed(helpers::embed("Command Permissions Reset", &description)),
	)
	.await?;
	helpers::log_action(ctx, "Command Permissions Reset", &description).await;

	Ok(())
}

/// List every command permission override in this server.
#[poise::command(
	rename = "list",
	slash_command,
	guild_only,
	ephemeral,
	category = "Permissions",
	on_error = "crate::helpers::acknowledge_fail"
)]
pub async fn commands_list(ctx: Context<'_>) -> Result<(), Error> {
	let guild_id = require_guild(ctx)?;
	let overrides = ctx.data().database.list_overrides(guild_id).await?;

	let description = if overrides.is_empty() {
		"No command has a permission override. Every command uses its default permissions."
			.to_owned()
	} else {
		overrides.iter().map(summarize).join("\n")
	};
	ctx.send(CreateReply::default().embed(helpers::embed("✋ Command Permissions", description)))
		.await?;

	Ok(())
}

/// Resolves a user-typed command to the override key it addresses.
fn resolve_target(ctx: Context<'_>, raw: &str) -> Option<OverrideTarget> {
	let (command, path) = parse_command_path(raw)?;
	let resolved = ctx.data().registry.resolve(command, &path)?;
	Some(resolved.identity.target())
}

async fn edit_and_report(
	ctx: Context<'_>,
	command: &str,
	edit: OverrideEdit,
	describe: impl FnOnce(&OverrideTarget) -> String,
) -> Result<(), Error> {
	let guild_id = require_guild(ctx)?;
	let Some(target) = resolve_target(ctx, command) else {
		return helpers::reject(ctx, UNKNOWN_COMMAND).await;
	};

	let record = ctx
		.data()
		.database
		.edit_override(guild_id, &target, edit)
		.await?;
	info!(
		"{} edited permissions of {} in guild {}: {:?}",
		ctx.author().name,
		target,
		guild_id,
		edit
	);

	let description = describe(&target);
	let embed = helpers::embed("Command Permissions Updated", &description)
		.field("Override", describe_rules(&record.rules), false);
	ctx.send(CreateReply::default().embed(embed)).await?;
	helpers::log_action(ctx, "Command Permissions Updated", &description).await;

	Ok(())
}

fn describe_rules(rules: &OverrideRules) -> String {
	let flag = |set: bool| if set { "✅" } else { "❎" };
	format!(
		"Admin Only: {}\nDisabled: {}\nRoles: {}\nBlacklisted Roles: {}\nChannels: {}\nBlacklisted Channels: {}",
		flag(rules.admin_only),
		flag(rules.disabled),
		helpers::mention_list(&rules.roles),
		helpers::mention_list(&rules.blacklist_roles),
		helpers::mention_list(&rules.channels),
		helpers::mention_list(&rules.blacklist_channels),
	)
}

fn summarize(record: &CommandOverride) -> String {
	let rules = &record.rules;
	let mut parts = Vec::new();
	if rules.admin_only {
		parts.push("admin only".to_owned());
	}
	if rules.disabled {
		parts.push("disabled".to_owned());
	}
	for (label, count) in [
		("allowed roles", rules.roles.len()),
		("blacklisted roles", rules.blacklist_roles.len()),
		("allowed channels", rules.channels.len()),
		("blacklisted channels", rules.blacklist_channels.len()),
	] {
		if count > 0 {
			parts.push(format!("{count} {label}"));
		}
	}
	if parts.is_empty() {
		parts.push("no restrictions".to_owned());
	}

	format!(
		"`{}` ({}): {}",
		record.target,
		record.target.specificity.level(),
		parts.join(", ")
	)
}
