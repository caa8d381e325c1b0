#![warn(rust_2018_idioms, clippy::pedantic)]
#![allow(
	clippy::too_many_lines,
	clippy::missing_errors_doc,
	clippy::missing_panics_doc,
	clippy::cast_possible_wrap,
	clippy::cast_sign_loss,
	clippy::module_name_repetitions,
)]

use std::collections::HashMap;

use anyhow::{Error, anyhow};
use poise::serenity_prelude::{self as serenity, Mentionable};
use tracing::{debug, info, warn};

use crate::types::Data;

pub mod api;
pub mod buttons;
pub mod checks;
pub mod commands;
pub mod helpers;
pub mod permissions;
pub mod types;

pub struct SecretStore(pub HashMap<String, String>);

impl SecretStore {
	#[must_use]
	pub fn get(&self, key: &str) -> Option<String> {
		self.0.get(key).cloned()
	}

	/// Gets a secret and parses it as a Discord ID (u64).
	///
	/// # Errors
	/// Returns an error if the key is missing or the value cannot be parsed as u64.
	pub fn get_discord_id(&self, key: &str) -> Result<u64, Error> {
		self.get(key)
			.ok_or_else(|| anyhow!("Failed to get '{key}' from the secret store"))?
			.parse::<u64>()
			.map_err(|e| anyhow!("Failed to parse '{key}' as u64: {e}"))
	}
}

pub struct ShuttleSerenity(pub serenity::Client);

impl From<serenity::Client> for ShuttleSerenity {
	fn from(value: serenity::Client) -> Self {
		Self(value)
	}
}

pub async fn serenity(
	secret_store: SecretStore,
	database: sqlx::PgPool,
) -> Result<ShuttleSerenity, Error> {
	let token = secret_store
		.get("DISCORD_TOKEN")
		.ok_or(anyhow!("Couldn't find your DISCORD_TOKEN!"))?;

	let development_guild = match secret_store.get("DISCORD_GUILD") {
		Some(_) => Some(serenity::GuildId::new(
			secret_store.get_discord_id("DISCORD_GUILD")?,
		)),
		None => None,
	};

	if let Some(address) = secret_store.get("API_ADDRESS") {
		let address = address
			.parse::<std::net::SocketAddr>()
			.map_err(|e| anyhow!("Failed to parse 'API_ADDRESS' as a socket address: {e}"))?;
		let api_token = secret_store
			.get("API_TOKEN")
			.ok_or(anyhow!("API_ADDRESS is set but API_TOKEN is missing!"))?;
		let state = api::ApiState::new(database.clone(), api_token);

		tokio::spawn(async move {
			if let Err(e) = api::serve(address, state).await {
				warn!("Dashboard API failed: {:?}", e);
			}
		});
	}

	let framework = poise::Framework::builder()
		.setup(move |ctx, ready, framework| {
			Box::pin(async move {
				let data = Data::new(database);

				info!(
					"Registering {} commands...",
					framework.options().commands.len()
				);
				match development_guild {
					Some(guild_id) => {
						poise::builtins::register_in_guild(
							ctx,
							&framework.options().commands,
							guild_id,
						)
						.await?;
					}
					None => {
						poise::builtins::register_globally(ctx, &framework.options().commands)
							.await?;
					}
				}

				debug!("Setting activity text");
				ctx.set_activity(Some(serenity::ActivityData::listening("/help")));

				info!("warden logged in as {}", ready.user.name);
				Ok(data)
			})
		})
		.options(poise::FrameworkOptions {
			commands: build_command_list(),
			// The global error handler for all error cases that may occur
			on_error: |error| {
				Box::pin(async move {
					warn!("Encountered error: {:?}", error);
					helpers::acknowledge_fail(error).await;
				})
			},
			// This code is run before every command
			pre_command: |ctx| {
				Box::pin(async move {
					let channel_name = &ctx
						.channel_id()
						.name(&ctx)
						.await
						.unwrap_or_else(|_| "<unknown>".to_owned());
					let author = &ctx.author().name;

					info!(
						"{} in {} used slash command '{}'",
						author,
						channel_name,
						&ctx.invoked_command_name()
					);
				})
			},
			// This code is run after a command if it was successful (returned Ok)
			post_command: |ctx| {
				Box::pin(async move {
					info!("Executed command {}!", ctx.command().qualified_name);
				})
			},
			// Every command invocation must pass this check to continue execution
			command_check: Some(|ctx| Box::pin(checks::command_check(ctx))),
			// Owners go through the check too, it allows them on its own
			skip_checks_for_owners: false,
			event_handler: |ctx, event, _framework, data| {
				Box::pin(async move { event_handler(ctx, event, data).await })
			},
			// Disallow all mentions (except those to the replied user) by default
			allowed_mentions: Some(serenity::CreateAllowedMentions::new().replied_user(true)),
			..Default::default()
		})
		.build();

	// Member join and leave events need GUILD_MEMBERS
	let intents =
		serenity::GatewayIntents::non_privileged() | serenity::GatewayIntents::GUILD_MEMBERS;

	let client = serenity::ClientBuilder::new(token, intents)
		.framework(framework)
		.await
		.map_err(|e| anyhow!(e))?;

	Ok(client.into())
}

fn build_command_list() -> Vec<poise::Command<Data, Error>> {
	vec![
		commands::utilities::help(),
		commands::utilities::register(),
		commands::utilities::uptime(),
		commands::moderation::ban(),
		commands::moderation::unban(),
		commands::moderation::mute(),
		commands::moderation::unmute(),
		commands::settings::settings(),
		commands::roles::massrole(),
		commands::command_permissions::commands(),
	]
}

async fn event_handler(
	ctx: &serenity::Context,
	event: &serenity::FullEvent,
	data: &Data,
) -> Result<(), Error> {
	debug!(
		"Got an event in event handler: {:?}",
		event.snake_case_name()
	);

	let (guild_id, log_message) = match event {
		serenity::FullEvent::InteractionCreate {
			interaction: serenity::Interaction::Component(component),
			..
		} => return buttons::handle(ctx, data, component).await,
		serenity::FullEvent::GuildMemberAddition { new_member } => {
			let log_embed = helpers::embed(
				"📥 Member Joined",
				format!("{} ({})", new_member.mention(), new_member.user.name),
			);
			(
				new_member.guild_id,
				log_embed_message(log_embed)
					.components(vec![buttons::ModerationButton::Ban(new_member.user.id).row()]),
			)
		}
		serenity::FullEvent::GuildMemberRemoval { guild_id, user, .. } => (
			*guild_id,
			log_embed_message(helpers::embed(
				"📤 Member Left",
				format!("{} ({})", user.mention(), user.name),
			)),
		),
		serenity::FullEvent::MessageDelete {
			channel_id,
			deleted_message_id,
			guild_id: Some(guild_id),
		} => (
			*guild_id,
			log_embed_message(helpers::embed(
				"🗑️ Message Deleted",
				format!(
					"A message was deleted in {}.\n\nMessage ID: {}",
					channel_id.mention(),
					deleted_message_id
				),
			)),
		),
		_ => return Ok(()),
	};

	if let Err(e) = helpers::send_guild_log(ctx, &data.database, guild_id, log_message).await {
		warn!("Failed to write event log for guild {}: {}", guild_id, e);
	}

	Ok(())
}

fn log_embed_message(log_embed: serenity::CreateEmbed) -> serenity::CreateMessage {
	serenity::CreateMessage::new().embed(log_embed.timestamp(serenity::Timestamp::now()))
}
