//! Counter commands (INCR, DECR, INCRBY)
//!
//! A missing or non-numeric value never fails: the key restarts at the
//! operation's result on zero.

use super::{parse_integer, Command, CommandContext};
use crate::protocol::Reply;

/// INCR command - Increment the integer value of a key by 1
///
/// Syntax: INCR key
pub struct IncrCommand;

impl Command for IncrCommand {
    fn execute(&self, ctx: &CommandContext, args: &[String]) -> Reply {
        match args.first() {
            Some(key) => Reply::Integer(ctx.engine.incr(key)),
            None => Reply::error("INCR requires key"),
        }
    }

    fn name(&self) -> &'static str {
        "INCR"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}

/// DECR command - Decrement the integer value of a key by 1
///
/// Syntax: DECR key
pub struct DecrCommand;

impl Command for DecrCommand {
    fn execute(&self, ctx: &CommandContext, args: &[String]) -> Reply {
        match args.first() {
            Some(key) => Reply::Integer(ctx.engine.decr(key)),
            None => Reply::error("DECR requires key"),
        }
    }

    fn name(&self) -> &'static str {
        "DECR"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}

/// INCRBY command - Increment the integer value of a key by the given amount
///
/// Syntax: INCRBY key increment
pub struct IncrByCommand;

impl Command for IncrByCommand {
    fn execute(&self, ctx: &CommandContext, args: &[String]) -> Reply {
        if args.len() < 2 {
            return Reply::error("INCRBY requires key and increment");
        }

        // The increment itself must be numeric; only the stored value is coerced
        let increment = match parse_integer(&args[1], "increment") {
            Ok(i) => i,
            Err(reply) => return reply,
        };

        Reply::Integer(ctx.engine.incrby(&args[0], increment))
    }

    fn name(&self) -> &'static str {
        "INCRBY"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_incr() {
        let ctx = CommandContext::new();

        // INCR on non-existent key
        let result = IncrCommand.execute(&ctx, &args(&["counter"]));
        assert_eq!(result, Reply::Integer(1));

        // INCR again
        let result = IncrCommand.execute(&ctx, &args(&["counter"]));
        assert_eq!(result, Reply::Integer(2));
    }

    #[test]
    fn test_decr() {
        let ctx = CommandContext::new();

        let result = DecrCommand.execute(&ctx, &args(&["counter"]));
        assert_eq!(result, Reply::Integer(-1));

        let result = DecrCommand.execute(&ctx, &args(&["counter"]));
        assert_eq!(result, Reply::Integer(-2));
    }

    #[test]
    fn test_incrby() {
        let ctx = CommandContext::new();

        let result = IncrByCommand.execute(&ctx, &args(&["counter", "10"]));
        assert_eq!(result, Reply::Integer(10));

        let result = IncrByCommand.execute(&ctx, &args(&["counter", "10"]));
        assert_eq!(result, Reply::Integer(20));
    }

    #[test]
    fn test_incrby_invalid_increment() {
        let ctx = CommandContext::new();
        let result = IncrByCommand.execute(&ctx, &args(&["counter", "ten"]));
        assert_eq!(result, Reply::error("Invalid increment value"));
        assert_eq!(ctx.engine.get("counter"), None);
    }

    #[test]
    fn test_incr_non_numeric_value_resets() {
        let ctx = CommandContext::new();
        ctx.engine.set("counter", "abc");
        let result = IncrCommand.execute(&ctx, &args(&["counter"]));
        assert_eq!(result, Reply::Integer(1));
    }
}
