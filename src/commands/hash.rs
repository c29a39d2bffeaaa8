//! Hash commands (HSET, HGET, HGETALL)

use super::{Command, CommandContext};
use crate::protocol::Reply;

/// HSET command - Set the value of a hash field
///
/// Syntax: HSET key field value
pub struct HSetCommand;

impl Command for HSetCommand {
    fn execute(&self, ctx: &CommandContext, args: &[String]) -> Reply {
        if args.len() < 3 {
            return Reply::error("HSET requires hash key, field, and value");
        }

        ctx.engine.hset(&args[0], &args[1], args[2].as_str());
        Reply::Ok
    }

    fn name(&self) -> &'static str {
        "HSET"
    }

    fn min_args(&self) -> usize {
        3
    }

    fn max_args(&self) -> Option<usize> {
        Some(3)
    }
}

/// HGET command - Get the value of a hash field
///
/// Syntax: HGET key field
pub struct HGetCommand;

impl Command for HGetCommand {
    fn execute(&self, ctx: &CommandContext, args: &[String]) -> Reply {
        if args.len() < 2 {
            return Reply::error("HGET requires hash key and field");
        }

        Reply::optional(ctx.engine.hget(&args[0], &args[1]))
    }

    fn name(&self) -> &'static str {
        "HGET"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(2)
    }
}

/// HGETALL command - Get all fields and values of a hash
///
/// Syntax: HGETALL key
pub struct HGetAllCommand;

impl Command for HGetAllCommand {
    fn execute(&self, ctx: &CommandContext, args: &[String]) -> Reply {
        match args.first() {
            Some(key) => Reply::Hash(ctx.engine.hgetall(key)),
            None => Reply::error("HGETALL requires hash key"),
        }
    }

    fn name(&self) -> &'static str {
        "HGETALL"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}
