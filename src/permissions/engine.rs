use anyhow::Error;
use poise::serenity_prelude::{ChannelId, GuildId, RoleId, UserId};
use tracing::debug;

use super::overrides::{CommandOverride, Specificity};
use super::registry::{CommandIdentity, CommandRegistry};
use super::store::OverrideStore;

/// Why a command invocation was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Denial {
	NoPermission,
	NoPermissionChannel,
	Disabled,
	NotFound,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Decision {
	Allowed,
	Denied(Denial),
}

/// The member invoking a command, reduced to what permission checks look at.
#[derive(Clone, Debug)]
pub struct Invoker {
	pub user_id: UserId,
	pub roles: Vec<RoleId>,
	pub is_owner: bool,
	pub is_administrator: bool,
}

/// The override records that apply to one identity, at most one per level.
#[derive(Debug, Default)]
struct Candidates<'a> {
	command: Option<&'a CommandOverride>,
	group: Option<&'a CommandOverride>,
	subcommand: Option<&'a CommandOverride>,
}

impl<'a> Candidates<'a> {
	fn select(overrides: &'a [CommandOverride], identity: &CommandIdentity) -> Self {
		let command = find_record(overrides, &identity.command, |specificity| {
			*specificity == Specificity::Command
		});
		let group = identity.group.as_deref().and_then(|wanted| {
			find_record(overrides, &identity.command, |specificity| {
				matches!(specificity, Specificity::Group(group) if group == wanted)
			})
		});
		let subcommand = identity.subcommand.as_deref().and_then(|wanted| {
			find_record(overrides, &identity.command, |specificity| {
				matches!(
					specificity,
					Specificity::Subcommand { group, subcommand }
						if subcommand == wanted && group.as_deref() == identity.group.as_deref()
				)
			})
		});

		Self {
			command,
			group,
			subcommand,
		}
	}

	fn is_empty(&self) -> bool {
		self.command.is_none() && self.group.is_none() && self.subcommand.is_none()
	}

	/// Tests every existing record, finest level first. A denial from a coarser level replaces
	/// whatever a finer level decided, and missing levels have no say.
	fn compose(&self, invoker: &Invoker, channel_id: ChannelId) -> Decision {
		[self.subcommand, self.group, self.command]
			.into_iter()
			.flatten()
			.map(|record| record.rules.test(invoker, channel_id))
			.fold(Decision::Allowed, |decision, level| match level {
				Decision::Allowed => decision,
				denied @ Decision::Denied(_) => denied,
			})
	}
}

fn find_record<'a>(
	overrides: &'a [CommandOverride],
	command: &str,
	matches: impl Fn(&Specificity) -> bool,
) -> Option<&'a CommandOverride> {
	overrides
		.iter()
		.find(|record| record.target.command == command && matches(&record.target.specificity))
}

/// Decides whether `invoker` may run `command` (with the given subcommand path) in `channel_id`.
///
/// Guild owners and administrators are always allowed. Otherwise the command-, group- and
/// subcommand-level overrides are tested and the coarsest denial wins; with no overrides at all
/// the command's default policy applies. Store errors are returned as-is and must not be treated
/// as an allow.
pub async fn evaluate(
	store: &impl OverrideStore,
	registry: &CommandRegistry,
	guild_id: GuildId,
	invoker: &Invoker,
	channel_id: ChannelId,
	command: &str,
	path: &[&str],
) -> Result<Decision, Error> {
	if invoker.is_owner || invoker.is_administrator {
		return Ok(Decision::Allowed);
	}

	let Some(resolved) = registry.resolve(command, path) else {
		return Ok(Decision::Denied(Denial::NotFound));
	};

	let overrides = store
		.fetch_overrides(guild_id, &resolved.identity.command)
		.await?;
	let candidates = Candidates::select(&overrides, &resolved.identity);
	debug!(
		"Permission candidates for {} in guild {}: {:?}",
		resolved.identity, guild_id, candidates
	);

	if candidates.is_empty() {
		return Ok(if resolved.allowed_by_default {
			Decision::Allowed
		} else {
			Decision::Denied(Denial::NoPermission)
		});
	}

	Ok(candidates.compose(invoker, channel_id))
}
