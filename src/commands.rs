use crate::permissions::{CommandEntry, CommandRegistry, GroupEntry};

pub mod command_permissions;
pub mod moderation;
pub mod roles;
pub mod settings;
pub mod utilities;

/// Default permission policy for every command the bot registers. Anything missing here is
/// reported as an unknown command when invoked.
#[must_use]
pub fn command_registry() -> CommandRegistry {
	CommandRegistry::new([
		CommandEntry::new("help", true),
		CommandEntry::new("uptime", true),
		CommandEntry::new("register", false),
		CommandEntry::new("ban", false),
		CommandEntry::new("unban", false),
		CommandEntry::new("mute", false),
		CommandEntry::new("unmute", false),
		CommandEntry::new("massrole", false)
			.subcommand("give")
			.subcommand("take"),
		CommandEntry::new("settings", false)
			.subcommand("view")
			.subcommand("log_channel")
			.subcommand("mute_role"),
		CommandEntry::new("commands", false)
			.group(
				GroupEntry::new("role")
					.subcommand("blacklist")
					.subcommand("unblacklist")
					.subcommand("allow")
					.subcommand("disallow"),
			)
			.group(
				GroupEntry::new("channel")
					.subcommand("blacklist")
					.subcommand("unblacklist")
					.subcommand("allow")
					.subcommand("disallow"),
			)
			.subcommand("admin_only")
			.subcommand("disable")
			.subcommand("enable")
			.subcommand("view")
			.subcommand("reset")
			.subcommand("list"),
	])
}

#[cfg(test)]
mod tests {
	use anyhow::Error;

	use super::command_registry;
	use crate::types::Data;

	fn leaf_commands(commands: &[poise::Command<Data, Error>]) -> Vec<&poise::Command<Data, Error>> {
		commands
			.iter()
			.flat_map(|command| {
				if command.subcommands.is_empty() {
					vec![command]
				} else {
					leaf_commands(&command.subcommands)
				}
			})
			.collect()
	}

	fn all_commands(commands: &[poise::Command<Data, Error>]) -> Vec<&poise::Command<Data, Error>> {
		commands
			.iter()
			.flat_map(|command| {
				let mut found = vec![command];
				found.extend(all_commands(&command.subcommands));
				found
			})
			.collect()
	}

	#[test]
	fn descriptions_fit_discord_limits() {
		let commands = crate::build_command_list();
		for command in all_commands(&commands) {
			let description = command.description.as_deref().unwrap_or_default();
			assert!(
				!description.is_empty() && description.chars().count() <= 100,
				"/{} has a description of {} chars",
				command.qualified_name,
				description.chars().count()
			);
			assert!(command.name.chars().count() <= 32, "/{} name is too long", command.qualified_name);

			for parameter in &command.parameters {
				let description = parameter.description.as_deref().unwrap_or_default();
				assert!(
					description.chars().count() <= 100,
					"parameter {} of /{} has a description that is too long",
					parameter.name,
					command.qualified_name
				);
			}
		}
	}

	// Command-level handlers take precedence over the framework one, so every command must answer
	// failed permission checks itself
	#[test]
	fn every_command_reports_its_own_failures() {
		let commands = crate::build_command_list();
		for command in leaf_commands(&commands) {
			assert!(
				command.on_error.is_some(),
				"/{} doesn't route errors through acknowledge_fail",
				command.qualified_name
			);
		}
	}

	#[test]
	fn every_registered_command_has_a_policy() {
		let registry = command_registry();

		for command in crate::build_command_list() {
			if command.subcommands.is_empty() {
				assert!(
					registry.resolve(&command.name, &[]).is_some(),
					"/{} is missing from the registry",
					command.name
				);
			}

			for subcommand in &command.subcommands {
				if subcommand.subcommands.is_empty() {
					assert!(
						registry
							.resolve(&command.name, &[&*subcommand.name])
							.is_some(),
						"/{} {} is missing from the registry",
						command.name,
						subcommand.name
					);
				}

				for nested in &subcommand.subcommands {
					assert!(
						registry
							.resolve(&command.name, &[&*subcommand.name, &*nested.name])
							.is_some(),
						"/{} {} {} is missing from the registry",
						command.name,
						subcommand.name,
						nested.name
					);
				}
			}
		}
	}

	#[test]
	fn registry_has_no_stale_entries() {
		let registered = crate::build_command_list()
			.iter()
			.flat_map(|command| {
				let mut names = vec![command.name.to_string()];
				for subcommand in &command.subcommands {
					names.push(format!("{} {}", command.name, subcommand.name));
					for nested in &subcommand.subcommands {
						names.push(format!(
							"{} {} {}",
							command.name, subcommand.name, nested.name
						));
					}
				}
				names
			})
			.collect::<Vec<_>>();

		for path in command_registry().paths() {
			assert!(registered.contains(&path), "/{path} is not a registered command");
		}
	}
}
