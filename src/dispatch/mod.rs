//! Command dispatcher
//!
//! Routes incoming command lines to the appropriate handler.
//! Client sessions, the replication slave and the web surface all go through
//! [`Dispatcher::dispatch_line`].

use crate::commands::{self, CommandContext, CommandRegistry};
use crate::protocol::{tokenize, Reply};
use crate::store::StorageEngine;
use std::sync::Arc;
use tracing::{debug, warn};

/// Command dispatcher
///
/// Tokenizes command lines, validates them, and routes to appropriate handlers
pub struct Dispatcher {
    /// Command registry
    registry: CommandRegistry,

    /// Command execution context
    context: CommandContext,
}

impl Dispatcher {
    /// Create a dispatcher over a fresh engine
    pub fn new() -> Self {
        Self::with_context(CommandContext::new())
    }

    /// Create a dispatcher over an existing engine
    pub fn with_engine(engine: Arc<StorageEngine>) -> Self {
        Self::with_context(CommandContext::with_engine(engine))
    }

    /// Create a dispatcher over a prepared context
    pub fn with_context(context: CommandContext) -> Self {
        Dispatcher {
            registry: CommandRegistry::new(),
            context,
        }
    }

    /// Dispatch one raw command line
    ///
    /// Malformed lines produce an error reply and leave the engine untouched.
    pub async fn dispatch_line(&self, line: &str) -> Reply {
        match tokenize(line) {
            Ok(tokens) => self.dispatch(&tokens).await,
            Err(e) => {
                warn!("Protocol error: {}", e);
                Reply::error(e.to_string())
            }
        }
    }

    /// Dispatch an already tokenized command
    pub async fn dispatch(&self, tokens: &[String]) -> Reply {
        let Some((cmd_name, cmd_args)) = tokens.split_first() else {
            return Reply::error("empty command");
        };

        debug!("Dispatching command: {}", cmd_name);

        if cmd_name.eq_ignore_ascii_case(commands::cluster::NAME) {
            return commands::cluster::execute(&self.context, cmd_args).await;
        }

        self.dispatch_local(cmd_name, cmd_args)
    }

    /// Dispatch a command that never leaves this process
    pub fn dispatch_local(&self, cmd_name: &str, cmd_args: &[String]) -> Reply {
        // Look up the command
        let command = match self.registry.get(cmd_name) {
            Some(cmd) => cmd,
            None => {
                warn!("Unknown command: {}", cmd_name);
                return Reply::error(format!("unknown command '{}'", cmd_name));
            }
        };

        // Validate argument count
        let too_few = cmd_args.len() < command.min_args();
        let too_many = command.max_args().map_or(false, |max| cmd_args.len() > max);
        if too_few || too_many {
            return Reply::error(format!(
                "wrong number of arguments for '{}' command",
                command.name()
            ));
        }

        // Execute the command
        command.execute(&self.context, cmd_args)
    }

    /// Get reference to the context (for testing/inspection)
    pub fn context(&self) -> &CommandContext {
        &self.context
    }

    /// Shared engine behind this dispatcher
    pub fn engine(&self) -> &Arc<StorageEngine> {
        &self.context.engine
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dispatch_line() {
        let dispatcher = Dispatcher::new();

        assert_eq!(dispatcher.dispatch_line("PING").await, Reply::Pong);
        assert_eq!(dispatcher.dispatch_line("set greeting \"hello world\"").await, Reply::Ok);
        assert_eq!(
            dispatcher.dispatch_line("GET greeting").await,
            Reply::value("hello world")
        );
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let dispatcher = Dispatcher::new();
        let result = dispatcher.dispatch_line("FOO bar").await;
        assert_eq!(result, Reply::error("unknown command 'FOO'"));
    }

    #[tokio::test]
    async fn test_wrong_arity_leaves_engine_untouched() {
        let dispatcher = Dispatcher::new();

        let result = dispatcher.dispatch_line("SET onlykey").await;
        assert_eq!(
            result,
            Reply::error("wrong number of arguments for 'SET' command")
        );

        let result = dispatcher.dispatch_line("GET a b").await;
        assert!(result.is_error());
        assert_eq!(dispatcher.engine().stats().total(), 0);
    }

    #[tokio::test]
    async fn test_malformed_line() {
        let dispatcher = Dispatcher::new();
        let result = dispatcher.dispatch_line("SET key \"unterminated").await;
        assert!(result.is_error());
        assert_eq!(dispatcher.engine().get("key"), None);

        let result = dispatcher.dispatch_line("   ").await;
        assert_eq!(result, Reply::error("empty command"));
    }

    #[tokio::test]
    async fn test_cluster_disabled() {
        let dispatcher = Dispatcher::new();
        let result = dispatcher.dispatch_line("cluster keyslot foo").await;
        assert_eq!(result, Reply::error("clustering is disabled"));
    }

    #[tokio::test]
    async fn test_shared_engine() {
        let engine = Arc::new(StorageEngine::new());
        let a = Dispatcher::with_engine(engine.clone());
        let b = Dispatcher::with_engine(engine);

        a.dispatch_line("LPUSH l x y").await;
        assert_eq!(
            b.dispatch_line("LRANGE l 0 -1").await,
            Reply::List(vec!["x".to_string(), "y".to_string()])
        );
    }
}
