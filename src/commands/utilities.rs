use anyhow::Error;
use poise::CreateReply;

use crate::helpers;
use crate::types::Context;

/// Show this menu
#[poise::command(
	slash_command,
	category = "Utilities",
	on_error = "crate::helpers::acknowledge_fail"
)]
pub async fn help(
	ctx: Context<'_>,
	#[description = "Specific command to show help about"]
	#[autocomplete = "poise::builtins::autocomplete_command"]
	command: Option<String>,
) -> Result<(), Error> {
	let extra_text_at_bottom = "\
Server administrators can change who may use a command with /commands.
Type /help command for more info on a command.";

	poise::builtins::help(
		ctx,
		command.as_deref(),
		poise::builtins::HelpConfiguration {
			extra_text_at_bottom,
			ephemeral: true,
			..Default::default()
		},
	)
	.await?;
	Ok(())
}

/// Register slash commands in this guild or globally
#[poise::command(
	slash_command,
	guild_only,
	category = "Utilities",
	hide_in_help,
	on_error = "crate::helpers::acknowledge_fail"
)]
pub async fn register(ctx: Context<'_>) -> Result<(), Error> {
	poise::builtins::register_application_commands_buttons(ctx).await?;

	Ok(())
}

/// Tells you how long the bot has been up for
#[poise::command(
	slash_command,
	category = "Utilities",
	on_error = "crate::helpers::acknowledge_fail"
)]
pub async fn uptime(ctx: Context<'_>) -> Result<(), Error> {
	let uptime = std::time::Instant::now() - ctx.data().bot_start_time;

	ctx.send(CreateReply::default().embed(helpers::embed("⏱️ Uptime", format_uptime(uptime.as_secs()))))
		.await?;

	Ok(())
}

fn format_uptime(seconds: u64) -> String {
	let div_mod = |a, b| (a / b, a % b);

	let (minutes, seconds) = div_mod(seconds, 60);
	let (hours, minutes) = div_mod(minutes, 60);
	let (days, hours) = div_mod(hours, 24);

	format!("{days}d {hours}h {minutes}m {seconds}s")
}
