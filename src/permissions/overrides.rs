use std::fmt;

use poise::serenity_prelude::{ChannelId, GuildId, RoleId};
use serde::Serialize;

use super::engine::{Decision, Denial, Invoker};

/// Which level of a command an override applies to. A record matches at exactly one level.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, strum::IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Specificity {
	Command,
	Group(String),
	Subcommand {
		group: Option<String>,
		subcommand: String,
	},
}

impl Specificity {
	/// Rebuilds the level from its stored parts, where empty strings mean "absent".
	#[must_use]
	pub fn from_parts(group: &str, subcommand: &str) -> Self {
		let group = (!group.is_empty()).then(|| group.to_owned());
		match (group, subcommand) {
			(None, "") => Self::Command,
			(Some(group), "") => Self::Group(group),
			(group, subcommand) => Self::Subcommand {
				group,
				subcommand: subcommand.to_owned(),
			},
		}
	}

	#[must_use]
	pub fn group(&self) -> Option<&str> {
		match self {
			Self::Command => None,
			Self::Group(group) => Some(group),
			Self::Subcommand { group, .. } => group.as_deref(),
		}
	}

	#[must_use]
	pub fn subcommand(&self) -> Option<&str> {
		match self {
			Self::Subcommand { subcommand, .. } => Some(subcommand),
			_ => None,
		}
	}

	#[must_use]
	pub fn level(&self) -> &'static str {
		self.into()
	}
}

/// Key of an override record within a guild.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct OverrideTarget {
	pub command: String,
	pub specificity: Specificity,
}

impl fmt::Display for OverrideTarget {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "/{}", self.command)?;
		for segment in [self.specificity.group(), self.specificity.subcommand()]
			.into_iter()
			.flatten()
		{
			write!(f, " {segment}")?;
		}
		Ok(())
	}
}

/// The restrictions an administrator attached to a command. Empty allow-lists mean "no
/// restriction", not "nobody".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OverrideRules {
	pub admin_only: bool,
	pub disabled: bool,
	pub roles: Vec<RoleId>,
	pub blacklist_roles: Vec<RoleId>,
	pub channels: Vec<ChannelId>,
	pub blacklist_channels: Vec<ChannelId>,
}

impl OverrideRules {
	/// Checks a single record against the invoking member and channel. The first failing rule
	/// decides the outcome.
	#[must_use]
	pub fn test(&self, invoker: &Invoker, channel_id: ChannelId) -> Decision {
		if self.admin_only && !invoker.is_administrator {
			return Decision::Denied(Denial::NoPermission);
		}
		if self.blacklist_channels.contains(&channel_id) {
			return Decision::Denied(Denial::NoPermissionChannel);
		}
		if !self.channels.is_empty() && !self.channels.contains(&channel_id) {
			return Decision::Denied(Denial::NoPermissionChannel);
		}
		if invoker
			.roles
			.iter()
			.any(|role| self.blacklist_roles.contains(role))
		{
			return Decision::Denied(Denial::NoPermission);
		}
		if !self.roles.is_empty() && !invoker.roles.iter().any(|role| self.roles.contains(role)) {
			return Decision::Denied(Denial::NoPermission);
		}
		if self.disabled {
			return Decision::Denied(Denial::Disabled);
		}
		Decision::Allowed
	}

	/// Applies an edit in place. Returns whether anything changed.
	pub fn apply(&mut self, edit: OverrideEdit) -> bool {
		match edit {
			OverrideEdit::AllowRole(role) => insert_unique(&mut self.roles, role),
			OverrideEdit::DisallowRole(role) => remove_item(&mut self.roles, role),
			OverrideEdit::BlacklistRole(role) => insert_unique(&mut self.blacklist_roles, role),
			OverrideEdit::UnblacklistRole(role) => remove_item(&mut self.blacklist_roles, role),
			OverrideEdit::AllowChannel(channel) => insert_unique(&mut self.channels, channel),
			OverrideEdit::DisallowChannel(channel) => remove_item(&mut self.channels, channel),
			OverrideEdit::BlacklistChannel(channel) => {
				insert_unique(&mut self.blacklist_channels, channel)
			}
			OverrideEdit::UnblacklistChannel(channel) => {
				remove_item(&mut self.blacklist_channels, channel)
			}
			OverrideEdit::AdminOnly(admin_only) => {
				std::mem::replace(&mut self.admin_only, admin_only) != admin_only
			}
			OverrideEdit::Disabled(disabled) => {
				std::mem::replace(&mut self.disabled, disabled) != disabled
			}
		}
	}
}

fn insert_unique<T: PartialEq>(list: &mut Vec<T>, item: T) -> bool {
	if list.contains(&item) {
		return false;
	}
	list.push(item);
	true
}

fn remove_item<T: PartialEq>(list: &mut Vec<T>, item: T) -> bool {
	let len = list.len();
	list.retain(|existing| *existing != item);
	list.len() != len
}

/// A single administrative change to an override record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverrideEdit {
	AllowRole(RoleId),
	DisallowRole(RoleId),
	BlacklistRole(RoleId),
	UnblacklistRole(RoleId),
	AllowChannel(ChannelId),
	DisallowChannel(ChannelId),
	BlacklistChannel(ChannelId),
	UnblacklistChannel(ChannelId),
	AdminOnly(bool),
	Disabled(bool),
}

/// A persisted override.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CommandOverride {
	pub guild_id: GuildId,
	pub target: OverrideTarget,
	pub rules: OverrideRules,
}

impl CommandOverride {
	#[must_use]
	pub fn new(guild_id: GuildId, target: OverrideTarget) -> Self {
		Self {
			guild_id,
			target,
			rules: OverrideRules::default(),
		}
	}
}

#[cfg(test)]
mod tests {
	use poise::serenity_prelude::UserId;

	use super::*;

	const CHANNEL: ChannelId = ChannelId::new(10);
	const OTHER_CHANNEL: ChannelId = ChannelId::new(11);
	const ROLE: RoleId = RoleId::new(20);
	const OTHER_ROLE: RoleId = RoleId::new(21);

	fn member(roles: &[RoleId]) -> Invoker {
		Invoker {
			user_id: UserId::new(1),
			roles: roles.to_vec(),
			is_owner: false,
			is_administrator: false,
		}
	}

	#[test]
	fn empty_rules_allow_everyone() {
		let rules = OverrideRules::default();
		assert_eq!(rules.test(&member(&[]), CHANNEL), Decision::Allowed);
	}

	#[test]
	fn admin_only_is_checked_first() {
		let rules = OverrideRules {
			admin_only: true,
			disabled: true,
			blacklist_channels: vec![CHANNEL],
			..Default::default()
		};
		assert_eq!(
			rules.test(&member(&[]), CHANNEL),
			Decision::Denied(Denial::NoPermission)
		);
	}

	#[test]
	fn channel_blacklist_beats_channel_allow_list() {
		let rules = OverrideRules {
			channels: vec![CHANNEL],
			blacklist_channels: vec![CHANNEL],
			..Default::default()
		};
		assert_eq!(
			rules.test(&member(&[]), CHANNEL),
			Decision::Denied(Denial::NoPermissionChannel)
		);
	}

	#[test]
	fn channel_allow_list_restricts_other_channels() {
		let rules = OverrideRules {
			channels: vec![CHANNEL],
			..Default::default()
		};
		assert_eq!(rules.test(&member(&[]), CHANNEL), Decision::Allowed);
		assert_eq!(
			rules.test(&member(&[]), OTHER_CHANNEL),
			Decision::Denied(Denial::NoPermissionChannel)
		);
	}

	#[test]
	fn role_blacklist_beats_role_allow_list() {
		let rules = OverrideRules {
			roles: vec![ROLE],
			blacklist_roles: vec![OTHER_ROLE],
			..Default::default()
		};
		assert_eq!(rules.test(&member(&[ROLE]), CHANNEL), Decision::Allowed);
		assert_eq!(
			rules.test(&member(&[ROLE, OTHER_ROLE]), CHANNEL),
			Decision::Denied(Denial::NoPermission)
		);
		assert_eq!(
			rules.test(&member(&[]), CHANNEL),
			Decision::Denied(Denial::NoPermission)
		);
	}

	#[test]
	fn disabled_is_checked_after_gating() {
		let rules = OverrideRules {
			disabled: true,
			roles: vec![ROLE],
			..Default::default()
		};
		assert_eq!(
			rules.test(&member(&[]), CHANNEL),
			Decision::Denied(Denial::NoPermission)
		);
		assert_eq!(
			rules.test(&member(&[ROLE]), CHANNEL),
			Decision::Denied(Denial::Disabled)
		);
	}

	#[test]
	fn edits_report_changes() {
		let mut rules = OverrideRules::default();
		assert!(rules.apply(OverrideEdit::BlacklistRole(ROLE)));
		assert!(!rules.apply(OverrideEdit::BlacklistRole(ROLE)));
		assert_eq!(rules.blacklist_roles, vec![ROLE]);

		assert!(rules.apply(OverrideEdit::UnblacklistRole(ROLE)));
		assert!(!rules.apply(OverrideEdit::UnblacklistRole(ROLE)));
		assert!(rules.blacklist_roles.is_empty());

		assert!(rules.apply(OverrideEdit::Disabled(true)));
		assert!(!rules.apply(OverrideEdit::Disabled(true)));
		assert!(rules.disabled);
	}

	#[test]
	fn specificity_round_trips_through_stored_parts() {
		for specificity in [
			Specificity::Command,
			Specificity::Group("role".to_owned()),
			Specificity::Subcommand {
				group: None,
				subcommand: "view".to_owned(),
			},
			Specificity::Subcommand {
				group: Some("role".to_owned()),
				subcommand: "blacklist".to_owned(),
			},
		] {
			let rebuilt = Specificity::from_parts(
				specificity.group().unwrap_or_default(),
				specificity.subcommand().unwrap_or_default(),
			);
			assert_eq!(rebuilt, specificity);
		}
	}

	#[test]
	fn target_display_lists_every_segment() {
		let target = OverrideTarget {
			command: "commands".to_owned(),
			specificity: Specificity::Subcommand {
				group: Some("role".to_owned()),
				subcommand: "blacklist".to_owned(),
			},
		};
		assert_eq!(target.to_string(), "/commands role blacklist");
		assert_eq!(target.specificity.level(), "subcommand");
	}
}
