use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use poise::serenity_prelude::GuildId;
use serde::Serialize;

use super::error::ApiError;
use super::{ApiState, is_authorized};
use crate::commands::settings::database::{self as settings, GuildSettings};
use crate::permissions::{CommandOverride, OverrideStore};

/// Everything the dashboard shows for one guild.
#[derive(Debug, Serialize)]
pub struct GuildConfig {
	pub guild_id: GuildId,
	pub settings: GuildSettings,
	pub command_overrides: Vec<CommandOverride>,
}

pub async fn get_guild_config(
	State(state): State<ApiState>,
	headers: HeaderMap,
	Path(guild_id): Path<u64>,
) -> Result<impl IntoResponse, ApiError> {
	let guild_id = authorize(&state, &headers, guild_id)?;

	let config = GuildConfig {
		guild_id,
		settings: settings::fetch(&state.database, guild_id).await?,
		command_overrides: state.database.list_overrides(guild_id).await?,
	};

	Ok((StatusCode::OK, Json(config)))
}

pub async fn get_guild_settings(
	State(state): State<ApiState>,
	headers: HeaderMap,
	Path(guild_id): Path<u64>,
) -> Result<impl IntoResponse, ApiError> {
	let guild_id = authorize(&state, &headers, guild_id)?;
	let settings = settings::fetch(&state.database, guild_id).await?;

	Ok((StatusCode::OK, Json(settings)))
}

pub async fn get_command_overrides(
	State(state): State<ApiState>,
	headers: HeaderMap,
	Path(guild_id): Path<u64>,
) -> Result<impl IntoResponse, ApiError> {
	let guild_id = authorize(&state, &headers, guild_id)?;
	let overrides = state.database.list_overrides(guild_id).await?;

	Ok((StatusCode::OK, Json(overrides)))
}

/// Checks the token before anything touches the database.
fn authorize(state: &ApiState, headers: &HeaderMap, guild_id: u64) -> Result<GuildId, ApiError> {
	if !is_authorized(headers, &state.token) {
		return Err(ApiError::Unauthorized);
	}
	if guild_id == 0 {
		return Err(ApiError::BadRequest("Invalid guild id".to_owned()));
	}
	Ok(GuildId::new(guild_id))
}
