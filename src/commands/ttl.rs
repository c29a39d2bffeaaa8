//! Expiration commands (EXPIRE, TTL)

use super::{parse_integer, Command, CommandContext};
use crate::protocol::Reply;

/// EXPIRE command - Set a key's time to live in seconds
///
/// Syntax: EXPIRE key seconds
///
/// Replies 1 when a live key was found, 0 otherwise. A non-positive
/// duration expires the key immediately.
pub struct ExpireCommand;

impl Command for ExpireCommand {
    fn execute(&self, ctx: &CommandContext, args: &[String]) -> Reply {
        if args.len() < 2 {
            return Reply::error("EXPIRE requires key and seconds");
        }

        let seconds = match parse_integer(&args[1], "seconds") {
            Ok(s) => s,
            Err(reply) => return reply,
        };

        Reply::boolean(ctx.engine.expire(&args[0], seconds))
    }

    fn name(&self) -> &'static str {
        "EXPIRE"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(2)
    }
}

/// TTL command - Get the time to live for a key in seconds
///
/// Syntax: TTL key
///
/// Returns:
/// - TTL in seconds if key exists and has an expiration
/// - -1 if key exists but has no expiration
/// - -2 if key does not exist
pub struct TtlCommand;

impl Command for TtlCommand {
    fn execute(&self, ctx: &CommandContext, args: &[String]) -> Reply {
        match args.first() {
            Some(key) => Reply::Integer(ctx.engine.ttl(key)),
            None => Reply::error("TTL requires key"),
        }
    }

    fn name(&self) -> &'static str {
        "TTL"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_expire_and_ttl() {
        let ctx = CommandContext::new();
        ctx.engine.set("key", "value");

        // No expiration yet
        assert_eq!(TtlCommand.execute(&ctx, &args(&["key"])), Reply::Integer(-1));

        let result = ExpireCommand.execute(&ctx, &args(&["key", "100"]));
        assert_eq!(result, Reply::Integer(1));

        match TtlCommand.execute(&ctx, &args(&["key"])) {
            Reply::Integer(ttl) => assert!((98..=100).contains(&ttl)),
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    #[test]
    fn test_expire_missing_key() {
        let ctx = CommandContext::new();
        let result = ExpireCommand.execute(&ctx, &args(&["nokey", "10"]));
        assert_eq!(result, Reply::Integer(0));
        assert_eq!(TtlCommand.execute(&ctx, &args(&["nokey"])), Reply::Integer(-2));
    }

    #[test]
    fn test_expire_invalid_seconds() {
        let ctx = CommandContext::new();
        ctx.engine.set("key", "value");
        let result = ExpireCommand.execute(&ctx, &args(&["key", "soon"]));
        assert_eq!(result, Reply::error("Invalid seconds value"));
        assert_eq!(ctx.engine.ttl("key"), -1);
    }

    #[test]
    fn test_expire_zero_removes_key() {
        let ctx = CommandContext::new();
        ctx.engine.set("key", "value");
        ExpireCommand.execute(&ctx, &args(&["key", "0"]));
        assert_eq!(ctx.engine.get("key"), None);
    }
}
