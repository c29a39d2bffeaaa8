//! String commands (SET, GET)

use super::{Command, CommandContext};
use crate::protocol::Reply;

/// SET command - Set the string value of a key
///
/// Syntax: SET key value
pub struct SetCommand;

impl Command for SetCommand {
    fn execute(&self, ctx: &CommandContext, args: &[String]) -> Reply {
        if args.len() < 2 {
            return Reply::error("SET requires key and value");
        }

        ctx.engine.set(&args[0], args[1].as_str());
        Reply::Ok
    }

    fn name(&self) -> &'static str {
        "SET"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(2)
    }
}

/// GET command - Get the value of a key
///
/// Syntax: GET key
pub struct GetCommand;

impl Command for GetCommand {
    fn execute(&self, ctx: &CommandContext, args: &[String]) -> Reply {
        match args.first() {
            Some(key) => Reply::optional(ctx.engine.get(key)),
            None => Reply::error("GET requires key"),
        }
    }

    fn name(&self) -> &'static str {
        "GET"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}
