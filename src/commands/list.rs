//! List commands (LPUSH, RPOP, LRANGE)

use super::{parse_integer, Command, CommandContext};
use crate::protocol::Reply;

/// LPUSH command - Prepend one or multiple values to a list
///
/// Syntax: LPUSH key value [value ...]
///
/// The values end up at the head in the order given.
pub struct LPushCommand;

impl Command for LPushCommand {
    fn execute(&self, ctx: &CommandContext, args: &[String]) -> Reply {
        if args.len() < 2 {
            return Reply::error("LPUSH requires list key and at least one value");
        }

        let length = ctx.engine.lpush(&args[0], &args[1..]);
        Reply::Integer(length as i64)
    }

    fn name(&self) -> &'static str {
        "LPUSH"
    }

    fn min_args(&self) -> usize {
        2
    }
}

/// RPOP command - Remove and return the last element of a list
///
/// Syntax: RPOP key
pub struct RPopCommand;

impl Command for RPopCommand {
    fn execute(&self, ctx: &CommandContext, args: &[String]) -> Reply {
        match args.first() {
            Some(key) => Reply::optional(ctx.engine.rpop(key)),
            None => Reply::error("RPOP requires list key"),
        }
    }

    fn name(&self) -> &'static str {
        "RPOP"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}

/// LRANGE command - Get a range of elements from a list
///
/// Syntax: LRANGE key start stop
pub struct LRangeCommand;

impl Command for LRangeCommand {
    fn execute(&self, ctx: &CommandContext, args: &[String]) -> Reply {
        if args.len() < 3 {
            return Reply::error("LRANGE requires list key, start index, and end index");
        }

        let (start, stop) = match (
            parse_integer(&args[1], "range"),
            parse_integer(&args[2], "range"),
        ) {
            (Ok(start), Ok(stop)) => (start, stop),
            (Err(reply), _) | (_, Err(reply)) => return reply,
        };

        Reply::List(ctx.engine.lrange(&args[0], start, stop))
    }

    fn name(&self) -> &'static str {
        "LRANGE"
    }

    fn min_args(&self) -> usize {
        3
    }

    fn max_args(&self) -> Option<usize> {
        Some(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    fn list(parts: &[&str]) -> Reply {
        Reply::List(args(parts))
    }

    #[test]
    fn test_lpush_lrange() {
        let ctx = CommandContext::new();

        // LPUSH mylist a b c
        let result = LPushCommand.execute(&ctx, &args(&["mylist", "a", "b", "c"]));
        assert_eq!(result, Reply::Integer(3));

        // LPUSH mylist x
        let result = LPushCommand.execute(&ctx, &args(&["mylist", "x"]));
        assert_eq!(result, Reply::Integer(4));

        // LRANGE mylist 0 -1 should return [x, a, b, c]
        let result = LRangeCommand.execute(&ctx, &args(&["mylist", "0", "-1"]));
        assert_eq!(result, list(&["x", "a", "b", "c"]));
    }

    #[test]
    fn test_lrange_negative_indices() {
        let ctx = CommandContext::new();
        LPushCommand.execute(&ctx, &args(&["mylist", "a", "b", "c", "d", "e"]));

        // LRANGE mylist 1 3 should return [b, c, d]
        let result = LRangeCommand.execute(&ctx, &args(&["mylist", "1", "3"]));
        assert_eq!(result, list(&["b", "c", "d"]));

        // LRANGE mylist -2 -1 should return [d, e]
        let result = LRangeCommand.execute(&ctx, &args(&["mylist", "-2", "-1"]));
        assert_eq!(result, list(&["d", "e"]));
    }

    #[test]
    fn test_lrange_missing_and_invalid() {
        let ctx = CommandContext::new();

        let result = LRangeCommand.execute(&ctx, &args(&["nolist", "0", "-1"]));
        assert_eq!(result, Reply::List(vec![]));

        let result = LRangeCommand.execute(&ctx, &args(&["nolist", "zero", "-1"]));
        assert_eq!(result, Reply::error("Invalid range values"));
    }

    #[test]
    fn test_rpop() {
        let ctx = CommandContext::new();
        LPushCommand.execute(&ctx, &args(&["mylist", "a", "b"]));

        let result = RPopCommand.execute(&ctx, &args(&["mylist"]));
        assert_eq!(result, Reply::value("b"));

        RPopCommand.execute(&ctx, &args(&["mylist"]));
        let result = RPopCommand.execute(&ctx, &args(&["mylist"]));
        assert_eq!(result, Reply::Nil);
    }
}
