/*
PostgreSQL schema for command overrides (see migrations/):

CREATE TABLE command_overrides
(
	guild_id           BIGINT   NOT NULL,
	command            TEXT     NOT NULL,
	group_name         TEXT     NOT NULL DEFAULT '',
	subcommand         TEXT     NOT NULL DEFAULT '',
	admin_only         BOOLEAN  NOT NULL DEFAULT FALSE,
	disabled           BOOLEAN  NOT NULL DEFAULT FALSE,
	roles              BIGINT[] NOT NULL DEFAULT '{}',
	blacklist_roles    BIGINT[] NOT NULL DEFAULT '{}',
	channels           BIGINT[] NOT NULL DEFAULT '{}',
	blacklist_channels BIGINT[] NOT NULL DEFAULT '{}',
	PRIMARY KEY (guild_id, command, group_name, subcommand)
);

An empty group_name/subcommand means that part is absent, so the primary key allows exactly one
record per command, group and subcommand level.
 */

use anyhow::{Error, anyhow};
use poise::serenity_prelude::{ChannelId, GuildId, RoleId};
use sqlx::{FromRow, PgPool};

use super::overrides::{CommandOverride, OverrideEdit, OverrideRules, OverrideTarget, Specificity};

/// Persistence for override records.
#[allow(async_fn_in_trait)]
pub trait OverrideStore {
	/// Every override in the guild that targets `command`, at any level.
	async fn fetch_overrides(
		&self,
		guild_id: GuildId,
		command: &str,
	) -> Result<Vec<CommandOverride>, Error>;

	async fn list_overrides(&self, guild_id: GuildId) -> Result<Vec<CommandOverride>, Error>;

	async fn fetch_override(
		&self,
		guild_id: GuildId,
		target: &OverrideTarget,
	) -> Result<Option<CommandOverride>, Error>;

	/// Creates the record if needed and applies `edit` to it. The read-modify-write happens
	/// atomically for that record.
	async fn edit_override(
		&self,
		guild_id: GuildId,
		target: &OverrideTarget,
		edit: OverrideEdit,
	) -> Result<CommandOverride, Error>;

	/// Returns whether a record existed.
	async fn delete_override(
		&self,
		guild_id: GuildId,
		target: &OverrideTarget,
	) -> Result<bool, Error>;
}

#[derive(FromRow)]
struct OverrideRow {
	guild_id: i64,
	command: String,
	group_name: String,
	subcommand: String,
	admin_only: bool,
	disabled: bool,
	roles: Vec<i64>,
	blacklist_roles: Vec<i64>,
	channels: Vec<i64>,
	blacklist_channels: Vec<i64>,
}

impl From<OverrideRow> for CommandOverride {
	fn from(row: OverrideRow) -> Self {
		let roles = |ids: Vec<i64>| -> Vec<RoleId> {
			ids.into_iter().map(|id| RoleId::new(i64_to_u64(id))).collect()
		};
		let channels = |ids: Vec<i64>| -> Vec<ChannelId> {
			ids.into_iter()
				.map(|id| ChannelId::new(i64_to_u64(id)))
				.collect()
		};

		Self {
			guild_id: GuildId::new(i64_to_u64(row.guild_id)),
			target: OverrideTarget {
				command: row.command,
				specificity: Specificity::from_parts(&row.group_name, &row.subcommand),
			},
			rules: OverrideRules {
				admin_only: row.admin_only,
				disabled: row.disabled,
				roles: roles(row.roles),
				blacklist_roles: roles(row.blacklist_roles),
				channels: channels(row.channels),
				blacklist_channels: channels(row.blacklist_channels),
			},
		}
	}
}

impl OverrideStore for PgPool {
	async fn fetch_overrides(
		&self,
		guild_id: GuildId,
		command: &str,
	) -> Result<Vec<CommandOverride>, Error> {
		let sql = "SELECT * FROM command_overrides WHERE guild_id = $1 AND command = $2";
		let rows = sqlx::query_as::<_, OverrideRow>(sql)
			.bind(u64_to_i64(guild_id.get()))
			.bind(command)
			.fetch_all(self)
			.await
			.map_err(|e| anyhow!(e))?;

		Ok(rows.into_iter().map(CommandOverride::from).collect())
	}

	async fn list_overrides(&self, guild_id: GuildId) -> Result<Vec<CommandOverride>, Error> {
		let sql = "
			SELECT *
			FROM command_overrides
			WHERE guild_id = $1
			ORDER BY command, group_name, subcommand
		";
		let rows = sqlx::query_as::<_, OverrideRow>(sql)
			.bind(u64_to_i64(guild_id.get()))
			.fetch_all(self)
			.await
			.map_err(|e| anyhow!(e))?;

		Ok(rows.into_iter().map(CommandOverride::from).collect())
	}

	async fn fetch_override(
		&self,
		guild_id: GuildId,
		target: &OverrideTarget,
	) -> Result<Option<CommandOverride>, Error> {
		let sql = "
			SELECT *
			FROM command_overrides
			WHERE guild_id = $1 AND command = $2 AND group_name = $3 AND subcommand = $4
		";
		let row = sqlx::query_as::<_, OverrideRow>(sql)
			.bind(u64_to_i64(guild_id.get()))
			.bind(&target.command)
			.bind(target.specificity.group().unwrap_or_default())
			.bind(target.specificity.subcommand().unwrap_or_default())
			.fetch_optional(self)
			.await
			.map_err(|e| anyhow!(e))?;

		Ok(row.map(CommandOverride::from))
	}

	async fn edit_override(
		&self,
		guild_id: GuildId,
		target: &OverrideTarget,
		edit: OverrideEdit,
	) -> Result<CommandOverride, Error> {
		let guild = u64_to_i64(guild_id.get());
		let group_name = target.specificity.group().unwrap_or_default();
		let subcommand = target.specificity.subcommand().unwrap_or_default();

		let mut transaction = self.begin().await.map_err(|e| anyhow!(e))?;

		// Make sure the row exists so the lock below always has something to hold on to
		sqlx::query(
			"
			INSERT INTO command_overrides (guild_id, command, group_name, subcommand)
			VALUES ($1, $2, $3, $4)
			ON CONFLICT (guild_id, command, group_name, subcommand) DO NOTHING
			",
		)
		.bind(guild)
		.bind(&target.command)
		.bind(group_name)
		.bind(subcommand)
		.execute(&mut *transaction)
		.await
		.map_err(|e| anyhow!(e))?;

		let row = sqlx::query_as::<_, OverrideRow>(
			"
			SELECT *
			FROM command_overrides
			WHERE guild_id = $1 AND command = $2 AND group_name = $3 AND subcommand = $4
			FOR UPDATE
			",
		)
		.bind(guild)
		.bind(&target.command)
		.bind(group_name)
		.bind(subcommand)
		.fetch_one(&mut *transaction)
		.await
		.map_err(|e| anyhow!(e))?;

		let mut record = CommandOverride::from(row);
		record.rules.apply(edit);

		let ids = |ids: &[RoleId]| ids.iter().map(|id| u64_to_i64(id.get())).collect::<Vec<_>>();
		let channel_ids =
			|ids: &[ChannelId]| ids.iter().map(|id| u64_to_i64(id.get())).collect::<Vec<_>>();
		sqlx::query(
			"
			UPDATE command_overrides
			SET admin_only = $5,
			    disabled = $6,
			    roles = $7,
			    blacklist_roles = $8,
			    channels = $9,
			    blacklist_channels = $10
			WHERE guild_id = $1 AND command = $2 AND group_name = $3 AND subcommand = $4
			",
		)
		.bind(guild)
		.bind(&target.command)
		.bind(group_name)
		.bind(subcommand)
		.bind(record.rules.admin_only)
		.bind(record.rules.disabled)
		.bind(ids(&record.rules.roles))
		.bind(ids(&record.rules.blacklist_roles))
		.bind(channel_ids(&record.rules.channels))
		.bind(channel_ids(&record.rules.blacklist_channels))
		.execute(&mut *transaction)
		.await
		.map_err(|e| anyhow!(e))?;

		transaction.commit().await.map_err(|e| anyhow!(e))?;

		Ok(record)
	}

	async fn delete_override(
		&self,
		guild_id: GuildId,
		target: &OverrideTarget,
	) -> Result<bool, Error> {
		let sql = "
			DELETE FROM command_overrides
			WHERE guild_id = $1 AND command = $2 AND group_name = $3 AND subcommand = $4
		";
		let deleted = sqlx::query(sql)
			.bind(u64_to_i64(guild_id.get()))
			.bind(&target.command)
			.bind(target.specificity.group().unwrap_or_default())
			.bind(target.specificity.subcommand().unwrap_or_default())
			.execute(self)
			.await
			.map_err(|e| anyhow!(e))?;

		Ok(deleted.rows_affected() == 1)
	}
}

pub fn i64_to_u64(value: i64) -> u64 {
	u64::from_le_bytes(value.to_le_bytes())
}

pub fn u64_to_i64(value: u64) -> i64 {
	i64::from_le_bytes(value.to_le_bytes())
}
