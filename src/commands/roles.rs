use std::collections::HashMap;

use anyhow::{Error, anyhow};
use futures::StreamExt as _;
use poise::CreateReply;
use poise::serenity_prelude::{self as serenity, Mentionable, RoleId};
use tracing::{info, warn};

use crate::checks::require_guild;
use crate::helpers;
use crate::types::Context;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MassRoleAction {
	Give,
	Take,
}

/// Give everybody a role, or take it away from everyone who has it.
#[poise::command(
	slash_command,
	guild_only,
	category = "Roles",
	subcommands("massrole_give", "massrole_take"),
	subcommand_required
)]
pub async fn massrole(_ctx: Context<'_>) -> Result<(), Error> {
	// Can't be invoked directly
	Ok(())
}

/// Give everybody a role.
///
/// Only members below both you and the bot in the role hierarchy are changed.
#[poise::command(
	rename = "give",
	slash_command,
	guild_only,
	category = "Roles",
	on_error = "crate::helpers::acknowledge_fail"
)]
pub async fn massrole_give(
	ctx: Context<'_>,
	#[description = "The role to be given"] role: serenity::Role,
) -> Result<(), Error> {
	mass_role(ctx, &role, MassRoleAction::Give).await
}

/// Take a role away from everybody.
///
/// Only members below both you and the bot in the role hierarchy are changed.
#[poise::command(
	rename = "take",
	slash_command,
	guild_only,
	category = "Roles",
	on_error = "crate::helpers::acknowledge_fail"
)]
pub async fn massrole_take(
	ctx: Context<'_>,
	#[description = "The role to be taken away"] role: serenity::Role,
) -> Result<(), Error> {
	mass_role(ctx, &role, MassRoleAction::Take).await
}

async fn mass_role(
	ctx: Context<'_>,
	role: &serenity::Role,
	action: MassRoleAction,
) -> Result<(), Error> {
	let guild_id = require_guild(ctx)?;
	let positions = guild_id
		.roles(ctx.http())
		.await?
		.into_iter()
		.map(|(id, role)| (id, role.position))
		.collect::<HashMap<_, _>>();

	let bot_id = ctx.cache().current_user().id;
	let bot = guild_id.member(ctx, bot_id).await?;
	let invoker = ctx
		.author_member()
		.await
		.ok_or(anyhow!("Failed to fetch server member."))?;
	let owner_id = guild_id.to_partial_guild(ctx).await?.owner_id;

	let invoker_ceiling = if invoker.user.id == owner_id {
		u16::MAX
	} else {
		highest_position(&positions, &invoker.roles)
	};
	let ceiling = highest_position(&positions, &bot.roles).min(invoker_ceiling);

	if role.position >= ceiling {
		return helpers::reject(
			ctx,
			"That role is not below both you and the bot in the role hierarchy!",
		)
		.await;
	}

	let progress = match action {
		MassRoleAction::Give => "Currently giving the role...",
		MassRoleAction::Take => "Currently removing the role...",
	};
	let handle = ctx
		.send(CreateReply::default().embed(helpers::embed("👥 Mass Role", progress)))
		.await?;

	let mut targets = Vec::new();
	let mut members = guild_id.members_iter(ctx.http()).boxed();
	while let Some(member) = members.next().await {
		let member = member?;
		if is_mass_role_target(&positions, &member.roles, role.id, action, ceiling) {
			targets.push(member.user.id);
		}
	}

	let reason = format!("Mass role by {}", ctx.author().name);
	let mut failed = 0;
	for user_id in &targets {
		let result = match action {
			MassRoleAction::Give => {
				ctx.http()
					.add_member_role(guild_id, *user_id, role.id, Some(reason.as_str()))
					.await
			}
			MassRoleAction::Take => {
				ctx.http()
					.remove_member_role(guild_id, *user_id, role.id, Some(reason.as_str()))
					.await
			}
		};
		if let Err(e) = result {
			warn!("Mass role failed for {} in guild {}: {}", user_id, guild_id, e);
			failed += 1;
		}
	}
	info!(
		"{} ran mass role {:?} for {} on {} members in guild {}",
		ctx.author().name,
		action,
		role.name,
		targets.len(),
		guild_id
	);

	let description = summary(role.id, action, targets.len() - failed, failed);
	handle
		.edit(
			ctx,
			CreateReply::default().embed(helpers::embed("👥 Mass Role", &description)),
		)
		.await?;
	helpers::log_action(ctx, "Mass Role", &description).await;

	Ok(())
}

/// Position of the highest role among `roles`. Members without roles sit at the bottom.
#[must_use]
pub fn highest_position(positions: &HashMap<RoleId, u16>, roles: &[RoleId]) -> u16 {
	roles
		.iter()
		.filter_map(|role_id| positions.get(role_id).copied())
		.max()
		.unwrap_or(0)
}

/// Whether a member with `member_roles` should be changed: they must sit strictly below `ceiling`
/// and not already be in the wanted state.
#[must_use]
pub fn is_mass_role_target(
	positions: &HashMap<RoleId, u16>,
	member_roles: &[RoleId],
	role_id: RoleId,
	action: MassRoleAction,
	ceiling: u16,
) -> bool {
	let has_role = member_roles.contains(&role_id);
	let needs_change = match action {
		MassRoleAction::Give => !has_role,
		MassRoleAction::Take => has_role,
	};

	needs_change && highest_position(positions, member_roles) < ceiling
}

fn summary(role_id: RoleId, action: MassRoleAction, changed: usize, failed: usize) -> String {
	let mut description = match action {
		MassRoleAction::Give => format!("Gave {} to {} members.", role_id.mention(), changed),
		MassRoleAction::Take => format!("Took {} from {} members.", role_id.mention(), changed),
	};
	if failed > 0 {
		description.push_str(&format!("\n\n{failed} members couldn't be changed."));
	}
	description
}

#[cfg(test)]
mod tests {
	use super::*;

	const MOD: RoleId = RoleId::new(10);
	const MEMBER: RoleId = RoleId::new(11);
	const NEWS: RoleId = RoleId::new(12);

	fn positions() -> HashMap<RoleId, u16> {
		HashMap::from([(MOD, 5), (MEMBER, 2), (NEWS, 1)])
	}

	#[test]
	fn highest_position_defaults_to_bottom() {
		assert_eq!(highest_position(&positions(), &[]), 0);
		assert_eq!(highest_position(&positions(), &[NEWS, MOD]), 5);
		assert_eq!(highest_position(&positions(), &[RoleId::new(99)]), 0);
	}

	#[test]
	fn give_skips_members_that_already_have_the_role() {
		assert!(is_mass_role_target(&positions(), &[MEMBER], NEWS, MassRoleAction::Give, 5));
		assert!(!is_mass_role_target(&positions(), &[MEMBER, NEWS], NEWS, MassRoleAction::Give, 5));
	}

	#[test]
	fn take_only_touches_members_with_the_role() {
		assert!(is_mass_role_target(&positions(), &[NEWS], NEWS, MassRoleAction::Take, 5));
		assert!(!is_mass_role_target(&positions(), &[MEMBER], NEWS, MassRoleAction::Take, 5));
	}

	#[test]
	fn members_at_or_above_the_ceiling_are_skipped() {
		assert!(!is_mass_role_target(&positions(), &[MOD], NEWS, MassRoleAction::Give, 5));
		assert!(!is_mass_role_target(&positions(), &[MEMBER], NEWS, MassRoleAction::Give, 2));
		assert!(is_mass_role_target(&positions(), &[], NEWS, MassRoleAction::Give, 1));
	}

	#[test]
	fn summary_mentions_failures() {
		assert_eq!(summary(NEWS, MassRoleAction::Give, 3, 0), "Gave <@&12> to 3 members.");
		assert_eq!(
			summary(NEWS, MassRoleAction::Take, 1, 2),
			"Took <@&12> from 1 members.\n\n2 members couldn't be changed."
		);
	}
}
