use anyhow::Error;
use poise::CreateReply;
use poise::serenity_prelude::{self as serenity, Mentionable};

use crate::checks::require_guild;
use crate::helpers;
use crate::types::Context;

/*
PostgreSQL schema for guild settings (see migrations/):

CREATE TABLE guild_settings
(
	guild_id       BIGINT PRIMARY KEY,
	log_channel_id BIGINT,
	mute_role_id   BIGINT
);
 */

/// Change settings for the server.
#[poise::command(
	slash_command,
	guild_only,
	category = "Settings",
	subcommands("settings_view", "settings_log_channel", "settings_mute_role"),
	subcommand_required
)]
pub async fn settings(_ctx: Context<'_>) -> Result<(), Error> {
	// Can't be invoked directly
	Ok(())
}

/// View this server's settings.
#[poise::command(
	rename = "view",
	slash_command,
	guild_only,
	ephemeral,
	category = "Settings",
	on_error = "crate::helpers::acknowledge_fail"
)]
pub async fn settings_view(ctx: Context<'_>) -> Result<(), Error> {
	let guild_id = require_guild(ctx)?;
	let settings = database::fetch(&ctx.data().database, guild_id).await?;

	let mention_or_none = |mention: Option<serenity::Mention>| {
		mention.map_or_else(|| "`None`".to_owned(), |mention| mention.to_string())
	};

	let embed = helpers::embed(
		"⚙️ Server Settings",
		format!(
			"🗒️ Log Channel: {}\n🎤 Mute Role: {}",
			mention_or_none(settings.log_channel_id.map(|id| id.mention())),
			mention_or_none(settings.mute_role_id.map(|id| id.mention())),
		),
	);
	ctx.send(CreateReply::default().embed(embed)).await?;

	Ok(())
}

/// Change the channel where log messages are broadcast. Leave empty to stop logging.
#[poise::command(
	rename = "log_channel",
	slash_command,
	guild_only,
	category = "Settings",
	on_error = "crate::helpers::acknowledge_fail"
)]
pub async fn settings_log_channel(
	ctx: Context<'_>,
	#[description = "The channel to broadcast all logs to"]
	#[channel_types("Text")]
	channel: Option<serenity::GuildChannel>,
) -> Result<(), Error> {
	let guild_id = require_guild(ctx)?;
	let channel_id = channel.map(|channel| channel.id);
	database::set_log_channel(&ctx.data().database, guild_id, channel_id).await?;

	let description = match channel_id {
		Some(channel_id) => format!("Log messages will now be sent to {}.", channel_id.mention()),
		None => "Log messages will no longer be sent.".to_owned(),
	};
	ctx.send(CreateReply::default().embed(helpers::embed("⚙️ Log Channel Changed", &description)))
		.await?;
	helpers::log_action(ctx, "Settings Changed", &description).await;

	Ok(())
}

/// Change the role applied by /mute. Leave empty to unset it.
#[poise::command(
	rename = "mute_role",
	slash_command,
	guild_only,
	category = "Settings",
	on_error = "crate::helpers::acknowledge_fail"
)]
pub async fn settings_mute_role(
	ctx: Context<'_>,
	#[description = "The role to apply when muted"] role: Option<serenity::Role>,
) -> Result<(), Error> {
	let guild_id = require_guild(ctx)?;
	let role_id = role.map(|role| role.id);
	database::set_mute_role(&ctx.data().database, guild_id, role_id).await?;

	let description = match role_id {
		Some(role_id) => format!("Muted members will now receive {}.", role_id.mention()),
		None => "The mute role has been unset.".to_owned(),
	};
	ctx.send(CreateReply::default().embed(helpers::embed("⚙️ Mute Role Changed", &description)))
		.await?;
	helpers::log_action(ctx, "Settings Changed", &description).await;

	Ok(())
}

pub mod database {
	use anyhow::{Error, anyhow};
	use poise::serenity_prelude::{ChannelId, GuildId, RoleId};
	use serde::Serialize;
	use sqlx::{FromRow, PgPool};

	use crate::permissions::store::{i64_to_u64, u64_to_i64};

	/// Per-guild configuration. Guilds that never changed a setting have no row and get the
	/// defaults.
	#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
	pub struct GuildSettings {
		pub log_channel_id: Option<ChannelId>,
		pub mute_role_id: Option<RoleId>,
	}

	#[derive(FromRow)]
	struct SettingsRow {
		log_channel_id: Option<i64>,
		mute_role_id: Option<i64>,
	}

	impl From<SettingsRow> for GuildSettings {
		fn from(row: SettingsRow) -> Self {
			Self {
				log_channel_id: row.log_channel_id.map(|id| ChannelId::new(i64_to_u64(id))),
				mute_role_id: row.mute_role_id.map(|id| RoleId::new(i64_to_u64(id))),
			}
		}
	}

	pub async fn fetch(pool: &PgPool, guild_id: GuildId) -> Result<GuildSettings, Error> {
		let sql = "SELECT log_channel_id, mute_role_id FROM guild_settings WHERE guild_id = $1";
		let row = sqlx::query_as::<_, SettingsRow>(sql)
			.bind(u64_to_i64(guild_id.get()))
			.fetch_optional(pool)
			.await
			.map_err(|e| anyhow!(e))?;

		Ok(row.map(GuildSettings::from).unwrap_or_default())
	}

	pub async fn set_log_channel(
		pool: &PgPool,
		guild_id: GuildId,
		channel_id: Option<ChannelId>,
	) -> Result<(), Error> {
		let sql = "
			INSERT INTO guild_settings (guild_id, log_channel_id)
			VALUES ($1, $2)
			ON CONFLICT (guild_id) DO UPDATE SET log_channel_id = EXCLUDED.log_channel_id
		";
		sqlx::query(sql)
			.bind(u64_to_i64(guild_id.get()))
			.bind(channel_id.map(|id| u64_to_i64(id.get())))
			.execute(pool)
			.await
			.map_err(|e| anyhow!(e))?;

		Ok(())
	}

	pub async fn set_mute_role(
		pool: &PgPool,
		guild_id: GuildId,
		role_id: Option<RoleId>,
	) -> Result<(), Error> {
		let sql = "
			INSERT INTO guild_settings (guild_id, mute_role_id)
			VALUES ($1, $2)
			ON CONFLICT (guild_id) DO UPDATE SET mute_role_id = EXCLUDED.mute_role_id
		";
		sqlx::query(sql)
			.bind(u64_to_i64(guild_id.get()))
			.bind(role_id.map(|id| u64_to_i64(id.get())))
			.execute(pool)
			.await
			.map_err(|e| anyhow!(e))?;

		Ok(())
	}
}
