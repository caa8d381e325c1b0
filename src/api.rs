//! Read-only dashboard API over a guild's settings and command overrides.
//!
//! Every route requires `Authorization: Bearer <API_TOKEN>`.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context as _, Error};
use axum::Router;
use axum::http::{HeaderMap, header};
use axum::routing::get;
use tracing::info;

pub mod error;
pub mod guild;

#[derive(Clone)]
pub struct ApiState {
	pub database: sqlx::PgPool,
	pub token: Arc<str>,
}

impl ApiState {
	pub fn new(database: sqlx::PgPool, token: impl Into<Arc<str>>) -> Self {
		Self {
			database,
			token: token.into(),
		}
	}
}

pub fn router(state: ApiState) -> Router {
	Router::new()
		.route("/api/guilds/{guild_id}", get(guild::get_guild_config))
		.route("/api/guilds/{guild_id}/settings", get(guild::get_guild_settings))
		.route("/api/guilds/{guild_id}/commands", get(guild::get_command_overrides))
		.with_state(state)
}

pub async fn serve(address: SocketAddr, state: ApiState) -> Result<(), Error> {
	let listener = tokio::net::TcpListener::bind(address)
		.await
		.with_context(|| format!("Failed to bind the dashboard API to {address}"))?;
	info!("Dashboard API listening on {}", address);

	axum::serve(listener, router(state))
		.await
		.context("Dashboard API stopped")
}

/// Whether the request carries the configured bearer token.
#[must_use]
pub fn is_authorized(headers: &HeaderMap, token: &str) -> bool {
	headers
		.get(header::AUTHORIZATION)
		.and_then(|value| value.to_str().ok())
		.and_then(|value| value.strip_prefix("Bearer "))
		.is_some_and(|provided| !token.is_empty() && provided == token)
}
