use std::sync::Mutex;

use anyhow::{Error, bail};
use poise::serenity_prelude::{ChannelId, GuildId, RoleId, UserId};

use super::{
	CommandEntry, CommandOverride, CommandRegistry, Decision, Denial, GroupEntry, Invoker,
	OverrideEdit, OverrideRules, OverrideStore, OverrideTarget, Specificity, evaluate,
};

const GUILD: GuildId = GuildId::new(1);
const CHANNEL: ChannelId = ChannelId::new(100);
const OTHER_CHANNEL: ChannelId = ChannelId::new(101);
const MEMBER_ROLE: RoleId = RoleId::new(200);
const MUTED_ROLE: RoleId = RoleId::new(201);

#[derive(Default)]
struct MockOverrideStore {
	records: Mutex<Vec<CommandOverride>>,
	broken: bool,
}

impl MockOverrideStore {
	fn with(records: impl IntoIterator<Item = CommandOverride>) -> Self {
		Self {
			records: Mutex::new(records.into_iter().collect()),
			broken: false,
		}
	}

	fn broken() -> Self {
		Self {
			broken: true,
			..Self::default()
		}
	}
}

impl OverrideStore for MockOverrideStore {
	async fn fetch_overrides(
		&self,
		guild_id: GuildId,
		command: &str,
	) -> Result<Vec<CommandOverride>, Error> {
		if self.broken {
			bail!("connection refused");
		}
		Ok(self
			.records
			.lock()
			.unwrap()
			.iter()
			.filter(|record| record.guild_id == guild_id && record.target.command == command)
			.cloned()
			.collect())
	}

	async fn list_overrides(&self, guild_id: GuildId) -> Result<Vec<CommandOverride>, Error> {
		Ok(self
			.records
			.lock()
			.unwrap()
			.iter()
			.filter(|record| record.guild_id == guild_id)
			.cloned()
			.collect())
	}

	async fn fetch_override(
		&self,
		guild_id: GuildId,
		target: &OverrideTarget,
	) -> Result<Option<CommandOverride>, Error> {
		Ok(self
			.records
			.lock()
			.unwrap()
			.iter()
			.find(|record| record.guild_id == guild_id && record.target == *target)
			.cloned())
	}

	async fn edit_override(
		&self,
		guild_id: GuildId,
		target: &OverrideTarget,
		edit: OverrideEdit,
	) -> Result<CommandOverride, Error> {
		let mut records = self.records.lock().unwrap();
		let index = match records
			.iter()
			.position(|record| record.guild_id == guild_id && record.target == *target)
		{
			Some(index) => index,
			None => {
				records.push(CommandOverride::new(guild_id, target.clone()));
				records.len() - 1
			}
		};
		records[index].rules.apply(edit);
		Ok(records[index].clone())
	}

	async fn delete_override(
		&self,
		guild_id: GuildId,
		target: &OverrideTarget,
	) -> Result<bool, Error> {
		let mut records = self.records.lock().unwrap();
		let len = records.len();
		records.retain(|record| !(record.guild_id == guild_id && record.target == *target));
		Ok(records.len() != len)
	}
}

fn registry() -> CommandRegistry {
	CommandRegistry::new([
		CommandEntry::new("help", true),
		CommandEntry::new("ban", false),
		CommandEntry::new("settings", false)
			.subcommand("view")
			.subcommand_with_policy("ping", true),
		CommandEntry::new("commands", true)
			.subcommand("list")
			.group(GroupEntry::new("role").subcommand("blacklist").subcommand("allow")),
	])
}

fn member(roles: &[RoleId]) -> Invoker {
	Invoker {
		user_id: UserId::new(10),
		roles: roles.to_vec(),
		is_owner: false,
		is_administrator: false,
	}
}

fn command_level(command: &str, rules: OverrideRules) -> CommandOverride {
	record(command, Specificity::Command, rules)
}

fn group_level(command: &str, group: &str, rules: OverrideRules) -> CommandOverride {
	record(command, Specificity::Group(group.to_owned()), rules)
}

fn subcommand_level(
	command: &str,
	group: Option<&str>,
	subcommand: &str,
	rules: OverrideRules,
) -> CommandOverride {
	record(
		command,
		Specificity::Subcommand {
			group: group.map(str::to_owned),
			subcommand: subcommand.to_owned(),
		},
		rules,
	)
}

fn record(command: &str, specificity: Specificity, rules: OverrideRules) -> CommandOverride {
	CommandOverride {
		guild_id: GUILD,
		target: OverrideTarget {
			command: command.to_owned(),
			specificity,
		},
		rules,
	}
}

fn disabled() -> OverrideRules {
	OverrideRules {
		disabled: true,
		..Default::default()
	}
}

async fn check(
	store: &MockOverrideStore,
	invoker: &Invoker,
	channel: ChannelId,
	command: &str,
	path: &[&str],
) -> Decision {
	evaluate(store, &registry(), GUILD, invoker, channel, command, path)
		.await
		.unwrap()
}

#[tokio::test]
async fn owner_and_administrator_bypass_every_override() {
	let store = MockOverrideStore::with([
		command_level(
			"ban",
			OverrideRules {
				admin_only: true,
				disabled: true,
				blacklist_channels: vec![CHANNEL],
				blacklist_roles: vec![MUTED_ROLE],
				..Default::default()
			},
		),
		subcommand_level("settings", None, "view", disabled()),
	]);

	let owner = Invoker {
		is_owner: true,
		..member(&[MUTED_ROLE])
	};
	let admin = Invoker {
		is_administrator: true,
		..member(&[MUTED_ROLE])
	};

	for invoker in [&owner, &admin] {
		assert_eq!(check(&store, invoker, CHANNEL, "ban", &[]).await, Decision::Allowed);
		assert_eq!(
			check(&store, invoker, CHANNEL, "settings", &["view"]).await,
			Decision::Allowed
		);
		assert_eq!(
			check(&store, invoker, CHANNEL, "does-not-exist", &[]).await,
			Decision::Allowed
		);
	}
}

#[tokio::test]
async fn no_overrides_falls_back_to_default_policy() {
	let store = MockOverrideStore::default();
	let invoker = member(&[]);

	assert_eq!(check(&store, &invoker, CHANNEL, "help", &[]).await, Decision::Allowed);
	assert_eq!(
		check(&store, &invoker, CHANNEL, "ban", &[]).await,
		Decision::Denied(Denial::NoPermission)
	);
	assert_eq!(
		check(&store, &invoker, CHANNEL, "settings", &["view"]).await,
		Decision::Denied(Denial::NoPermission)
	);
	assert_eq!(
		check(&store, &invoker, CHANNEL, "settings", &["ping"]).await,
		Decision::Allowed
	);
}

#[tokio::test]
async fn existing_override_replaces_default_policy() {
	let store = MockOverrideStore::with([command_level(
		"ban",
		OverrideRules {
			roles: vec![MEMBER_ROLE],
			..Default::default()
		},
	)]);

	assert_eq!(
		check(&store, &member(&[MEMBER_ROLE]), CHANNEL, "ban", &[]).await,
		Decision::Allowed
	);
	assert_eq!(
		check(&store, &member(&[]), CHANNEL, "ban", &[]).await,
		Decision::Denied(Denial::NoPermission)
	);
}

#[tokio::test]
async fn lone_command_level_denial_applies_to_subcommands() {
	let store = MockOverrideStore::with([command_level("commands", disabled())]);

	assert_eq!(
		check(&store, &member(&[]), CHANNEL, "commands", &["role", "blacklist"]).await,
		Decision::Denied(Denial::Disabled)
	);
	assert_eq!(
		check(&store, &member(&[]), CHANNEL, "commands", &["list"]).await,
		Decision::Denied(Denial::Disabled)
	);
}

#[tokio::test]
async fn group_denial_beats_command_allow() {
	let store = MockOverrideStore::with([
		command_level("commands", OverrideRules::default()),
		group_level(
			"commands",
			"role",
			OverrideRules {
				channels: vec![OTHER_CHANNEL],
				..Default::default()
			},
		),
	]);

	assert_eq!(
		check(&store, &member(&[]), CHANNEL, "commands", &["role", "allow"]).await,
		Decision::Denied(Denial::NoPermissionChannel)
	);
	assert_eq!(
		check(&store, &member(&[]), OTHER_CHANNEL, "commands", &["role", "allow"]).await,
		Decision::Allowed
	);
	// The group record doesn't apply outside its group
	assert_eq!(
		check(&store, &member(&[]), CHANNEL, "commands", &["list"]).await,
		Decision::Allowed
	);
}

#[tokio::test]
async fn command_denial_beats_subcommand_allow() {
	let store = MockOverrideStore::with([
		command_level(
			"settings",
			OverrideRules {
				admin_only: true,
				..Default::default()
			},
		),
		subcommand_level("settings", None, "view", OverrideRules::default()),
	]);

	assert_eq!(
		check(&store, &member(&[]), CHANNEL, "settings", &["view"]).await,
		Decision::Denied(Denial::NoPermission)
	);
}

#[tokio::test]
async fn coarser_denial_overwrites_finer_denial() {
	let store = MockOverrideStore::with([
		command_level("commands", disabled()),
		group_level(
			"commands",
			"role",
			OverrideRules {
				blacklist_channels: vec![CHANNEL],
				..Default::default()
			},
		),
		subcommand_level(
			"commands",
			Some("role"),
			"blacklist",
			OverrideRules {
				roles: vec![MEMBER_ROLE],
				..Default::default()
			},
		),
	]);

	assert_eq!(
		check(&store, &member(&[]), CHANNEL, "commands", &["role", "blacklist"]).await,
		Decision::Denied(Denial::Disabled)
	);
}

#[tokio::test]
async fn command_blacklist_beats_subcommand_role_allow() {
	let store = MockOverrideStore::with([
		command_level(
			"commands",
			OverrideRules {
				blacklist_roles: vec![MUTED_ROLE],
				..Default::default()
			},
		),
		subcommand_level(
			"commands",
			Some("role"),
			"blacklist",
			OverrideRules {
				roles: vec![MUTED_ROLE],
				..Default::default()
			},
		),
	]);

	assert_eq!(
		check(
			&store,
			&member(&[MUTED_ROLE]),
			CHANNEL,
			"commands",
			&["role", "blacklist"]
		)
		.await,
		Decision::Denied(Denial::NoPermission)
	);
}

#[tokio::test]
async fn subcommand_denial_applies_when_coarser_levels_allow() {
	let store = MockOverrideStore::with([
		command_level("commands", OverrideRules::default()),
		subcommand_level("commands", Some("role"), "blacklist", disabled()),
	]);

	assert_eq!(
		check(&store, &member(&[]), CHANNEL, "commands", &["role", "blacklist"]).await,
		Decision::Denied(Denial::Disabled)
	);
	assert_eq!(
		check(&store, &member(&[]), CHANNEL, "commands", &["role", "allow"]).await,
		Decision::Allowed
	);
}

#[tokio::test]
async fn subcommand_records_must_match_their_group() {
	// Same subcommand name, but addressed without the group
	let store = MockOverrideStore::with([subcommand_level(
		"commands",
		None,
		"blacklist",
		disabled(),
	)]);

	assert_eq!(
		check(&store, &member(&[]), CHANNEL, "commands", &["role", "blacklist"]).await,
		Decision::Allowed
	);
}

#[tokio::test]
async fn empty_role_list_means_no_restriction() {
	let store = MockOverrideStore::with([command_level("ban", OverrideRules::default())]);

	assert_eq!(check(&store, &member(&[]), CHANNEL, "ban", &[]).await, Decision::Allowed);
}

#[tokio::test]
async fn channel_blacklist_beats_channel_allow_list() {
	let store = MockOverrideStore::with([command_level(
		"ban",
		OverrideRules {
			channels: vec![CHANNEL],
			blacklist_channels: vec![CHANNEL],
			..Default::default()
		},
	)]);

	assert_eq!(
		check(&store, &member(&[]), CHANNEL, "ban", &[]).await,
		Decision::Denied(Denial::NoPermissionChannel)
	);
}

#[tokio::test]
async fn unknown_command_is_not_found() {
	let store = MockOverrideStore::with([command_level("nope", OverrideRules::default())]);

	assert_eq!(
		check(&store, &member(&[]), CHANNEL, "nope", &[]).await,
		Decision::Denied(Denial::NotFound)
	);
	assert_eq!(
		check(&store, &member(&[]), CHANNEL, "settings", &["nope"]).await,
		Decision::Denied(Denial::NotFound)
	);
}

#[tokio::test]
async fn overrides_from_other_guilds_are_ignored() {
	let mut foreign = command_level("help", disabled());
	foreign.guild_id = GuildId::new(2);
	let store = MockOverrideStore::with([foreign]);

	assert_eq!(check(&store, &member(&[]), CHANNEL, "help", &[]).await, Decision::Allowed);
}

#[tokio::test]
async fn store_errors_are_not_an_allow() {
	let store = MockOverrideStore::broken();

	let result = evaluate(
		&store,
		&registry(),
		GUILD,
		&member(&[]),
		CHANNEL,
		"help",
		&[],
	)
	.await;
	assert!(result.is_err());
}

#[tokio::test]
async fn edits_are_observed_by_the_next_evaluation() {
	let store = MockOverrideStore::default();
	let target = registry().resolve("ban", &[]).unwrap().identity.target();

	store
		.edit_override(GUILD, &target, OverrideEdit::AllowRole(MEMBER_ROLE))
		.await
		.unwrap();
	assert_eq!(
		check(&store, &member(&[MEMBER_ROLE]), CHANNEL, "ban", &[]).await,
		Decision::Allowed
	);

	store
		.edit_override(GUILD, &target, OverrideEdit::BlacklistChannel(CHANNEL))
		.await
		.unwrap();
	assert_eq!(
		check(&store, &member(&[MEMBER_ROLE]), CHANNEL, "ban", &[]).await,
		Decision::Denied(Denial::NoPermissionChannel)
	);

	assert!(store.delete_override(GUILD, &target).await.unwrap());
	assert_eq!(
		check(&store, &member(&[MEMBER_ROLE]), CHANNEL, "ban", &[]).await,
		Decision::Denied(Denial::NoPermission)
	);
	assert_eq!(store.list_overrides(GUILD).await.unwrap(), Vec::new());
}
