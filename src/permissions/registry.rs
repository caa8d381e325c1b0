use std::collections::HashMap;
use std::fmt;

use super::overrides::{OverrideTarget, Specificity};

/// Canonical name of a registered command, subcommand group, or subcommand.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CommandIdentity {
	pub command: String,
	pub group: Option<String>,
	pub subcommand: Option<String>,
}

impl CommandIdentity {
	/// The override key that addresses exactly this identity.
	#[must_use]
	pub fn target(&self) -> OverrideTarget {
		let specificity = match (&self.group, &self.subcommand) {
			(_, Some(subcommand)) => Specificity::Subcommand {
				group: self.group.clone(),
				subcommand: subcommand.clone(),
			},
			(Some(group), None) => Specificity::Group(group.clone()),
			(None, None) => Specificity::Command,
		};

		OverrideTarget {
			command: self.command.clone(),
			specificity,
		}
	}
}

impl fmt::Display for CommandIdentity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "/{}", self.command)?;
		for segment in [&self.group, &self.subcommand].into_iter().flatten() {
			write!(f, " {segment}")?;
		}
		Ok(())
	}
}

/// A resolved identity together with its declared default policy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedCommand {
	pub identity: CommandIdentity,
	pub allowed_by_default: bool,
}

#[derive(Clone, Debug)]
struct SubcommandEntry {
	name: String,
	allowed_by_default: Option<bool>,
}

/// A subcommand group. Unless overridden, its subcommands inherit the group's policy, which in
/// turn inherits the parent command's.
#[derive(Clone, Debug)]
pub struct GroupEntry {
	name: String,
	allowed_by_default: Option<bool>,
	subcommands: Vec<SubcommandEntry>,
}

impl GroupEntry {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			allowed_by_default: None,
			subcommands: Vec::new(),
		}
	}

	#[must_use]
	pub fn allowed_by_default(mut self, allowed: bool) -> Self {
		self.allowed_by_default = Some(allowed);
		self
	}

	#[must_use]
	pub fn subcommand(mut self, name: impl Into<String>) -> Self {
		self.subcommands.push(SubcommandEntry {
			name: name.into(),
			allowed_by_default: None,
		});
		self
	}

	fn find(&self, name: &str) -> Option<&SubcommandEntry> {
		self.subcommands.iter().find(|entry| entry.name == name)
	}
}

/// A top level command and everything nested below it.
#[derive(Clone, Debug)]
pub struct CommandEntry {
	name: String,
	allowed_by_default: bool,
	subcommands: Vec<SubcommandEntry>,
	groups: Vec<GroupEntry>,
}

impl CommandEntry {
	pub fn new(name: impl Into<String>, allowed_by_default: bool) -> Self {
		Self {
			name: name.into(),
			allowed_by_default,
			subcommands: Vec::new(),
			groups: Vec::new(),
		}
	}

	#[must_use]
	pub fn subcommand(mut self, name: impl Into<String>) -> Self {
		self.subcommands.push(SubcommandEntry {
			name: name.into(),
			allowed_by_default: None,
		});
		self
	}

	#[must_use]
	pub fn subcommand_with_policy(mut self, name: impl Into<String>, allowed: bool) -> Self {
		self.subcommands.push(SubcommandEntry {
			name: name.into(),
			allowed_by_default: Some(allowed),
		});
		self
	}

	#[must_use]
	pub fn group(mut self, group: GroupEntry) -> Self {
		self.groups.push(group);
		self
	}

	fn find_subcommand(&self, name: &str) -> Option<&SubcommandEntry> {
		self.subcommands.iter().find(|entry| entry.name == name)
	}

	fn find_group(&self, name: &str) -> Option<&GroupEntry> {
		self.groups.iter().find(|entry| entry.name == name)
	}
}

/// Every command the bot exposes, keyed by top level name.
#[derive(Clone, Debug, Default)]
pub struct CommandRegistry {
	commands: HashMap<String, CommandEntry>,
}

impl CommandRegistry {
	pub fn new(entries: impl IntoIterator<Item = CommandEntry>) -> Self {
		Self {
			commands: entries
				.into_iter()
				.map(|entry| (entry.name.clone(), entry))
				.collect(),
		}
	}

	/// Resolves a command name and a subcommand path of up to two segments.
	///
	/// A single segment names a direct subcommand or, failing that, a subcommand group. Two
	/// segments name a subcommand inside a group. Returns `None` for anything that isn't
	/// registered.
	#[must_use]
	pub fn resolve(&self, command: &str, path: &[&str]) -> Option<ResolvedCommand> {
		let entry = self.commands.get(command)?;
		let identity = |group: Option<&str>, subcommand: Option<&str>| CommandIdentity {
			command: entry.name.clone(),
			group: group.map(str::to_owned),
			subcommand: subcommand.map(str::to_owned),
		};

		match *path {
			[] => Some(ResolvedCommand {
				identity: identity(None, None),
				allowed_by_default: entry.allowed_by_default,
			}),
			[name] => {
				if let Some(subcommand) = entry.find_subcommand(name) {
					return Some(ResolvedCommand {
						identity: identity(None, Some(name)),
						allowed_by_default: subcommand
							.allowed_by_default
							.unwrap_or(entry.allowed_by_default),
					});
				}

				let group = entry.find_group(name)?;
				Some(ResolvedCommand {
					identity: identity(Some(name), None),
					allowed_by_default: group.allowed_by_default.unwrap_or(entry.allowed_by_default),
				})
			}
			[group_name, subcommand_name] => {
				let group = entry.find_group(group_name)?;
				let subcommand = group.find(subcommand_name)?;
				let group_default = group.allowed_by_default.unwrap_or(entry.allowed_by_default);

				Some(ResolvedCommand {
					identity: identity(Some(group_name), Some(subcommand_name)),
					allowed_by_default: subcommand.allowed_by_default.unwrap_or(group_default),
				})
			}
			_ => None,
		}
	}

	/// Every addressable path, formatted the way a user would type it (`"role blacklist"`).
	#[must_use]
	pub fn paths(&self) -> Vec<String> {
		let mut paths = Vec::new();
		for entry in self.commands.values() {
			paths.push(entry.name.clone());
			for subcommand in &entry.subcommands {
				paths.push(format!("{} {}", entry.name, subcommand.name));
			}
			for group in &entry.groups {
				paths.push(format!("{} {}", entry.name, group.name));
				for subcommand in &group.subcommands {
					paths.push(format!("{} {} {}", entry.name, group.name, subcommand.name));
				}
			}
		}
		paths.sort_unstable();
		paths
	}
}

/// Splits a user-typed command such as `"/settings log_channel"` into its name and path.
#[must_use]
pub fn parse_command_path(raw: &str) -> Option<(&str, Vec<&str>)> {
	let raw = raw.trim();
	let raw = raw.strip_prefix('/').unwrap_or(raw);

	let mut segments = raw.split_whitespace();
	let command = segments.next()?;
	Some((command, segments.collect()))
}
