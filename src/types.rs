use anyhow::Error;

use crate::permissions::CommandRegistry;

#[derive(Debug)]
pub struct Data {
	pub database: sqlx::PgPool,
	pub registry: CommandRegistry,
	pub bot_start_time: std::time::Instant,
}

impl Data {
	#[must_use]
	pub fn new(database: sqlx::PgPool) -> Self {
		Self {
			database,
			registry: crate::commands::command_registry(),
			bot_start_time: std::time::Instant::now(),
		}
	}
}

pub type Context<'a> = poise::Context<'a, Data, Error>;

pub const EMBED_COLOR: (u8, u8, u8) = (0xb7, 0x47, 0x00);
pub const DENIED_COLOR: (u8, u8, u8) = (0xed, 0x42, 0x45);
