//! Command execution module
//!
//! Provides a unified interface for all engine commands through the Command trait.
//! Each command family is implemented in a separate file for high cohesion.

mod context;
mod registry;

// Command implementations
mod string;
mod counter;
mod hash;
mod list;
mod set;
mod ttl;
mod admin;
pub mod cluster;

pub use context::CommandContext;
pub use registry::CommandRegistry;

use crate::protocol::Reply;

/// Command execution trait
///
/// All engine commands implement this trait with a single execute method.
/// This provides loose coupling between command implementations and the dispatcher.
pub trait Command: Send + Sync {
    /// Execute the command with the given context and arguments
    ///
    /// Arguments:
    /// - ctx: the command context (engine and optional cluster coordinator)
    /// - args: command arguments (excluding the command name itself)
    ///
    /// Returns:
    /// - the Reply to send to the client
    fn execute(&self, ctx: &CommandContext, args: &[String]) -> Reply;

    /// Get the command name (for lookup and logging)
    fn name(&self) -> &'static str;

    /// Get the minimum number of arguments required
    fn min_args(&self) -> usize {
        0
    }

    /// Get the maximum number of arguments (None = unlimited)
    fn max_args(&self) -> Option<usize> {
        None
    }
}

/// Parse an integer argument, producing an error reply naming `what` on failure
pub(crate) fn parse_integer(value: &str, what: &str) -> Result<i64, Reply> {
    value
        .parse::<i64>()
        .map_err(|_| Reply::error(format!("Invalid {} value", what)))
}
