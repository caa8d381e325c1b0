//! Per-guild command permission overrides and the resolver that decides whether a member may run
//! a command.

pub use engine::{Decision, Denial, Invoker, evaluate};
pub use overrides::{CommandOverride, OverrideEdit, OverrideRules, OverrideTarget, Specificity};
pub use registry::{CommandEntry, CommandIdentity, CommandRegistry, GroupEntry, parse_command_path};
pub use store::OverrideStore;

pub mod engine;
pub mod overrides;
pub mod registry;
pub mod store;

#[cfg(test)]
mod tests;
