//! Set commands (SADD, SREM, SISMEMBER, SMEMBERS, SCARD)

use super::{Command, CommandContext};
use crate::protocol::Reply;

/// SADD command - Add one or more members to a set
///
/// Syntax: SADD key member [member ...]
///
/// Returns the number of members that were not already present.
pub struct SAddCommand;

impl Command for SAddCommand {
    fn execute(&self, ctx: &CommandContext, args: &[String]) -> Reply {
        if args.len() < 2 {
            return Reply::error("SADD requires set key and at least one member");
        }

        let added = ctx.engine.sadd(&args[0], &args[1..]);
        Reply::Integer(added as i64)
    }

    fn name(&self) -> &'static str {
        "SADD"
    }

    fn min_args(&self) -> usize {
        2
    }
}

/// SREM command - Remove one or more members from a set
///
/// Syntax: SREM key member [member ...]
pub struct SRemCommand;

impl Command for SRemCommand {
    fn execute(&self, ctx: &CommandContext, args: &[String]) -> Reply {
        if args.len() < 2 {
            return Reply::error("SREM requires set key and at least one member");
        }

        let removed = ctx.engine.srem(&args[0], &args[1..]);
        Reply::Integer(removed as i64)
    }

    fn name(&self) -> &'static str {
        "SREM"
    }

    fn min_args(&self) -> usize {
        2
    }
}

/// SISMEMBER command - Determine if a value is a member of a set
///
/// Syntax: SISMEMBER key member
pub struct SIsMemberCommand;

impl Command for SIsMemberCommand {
    fn execute(&self, ctx: &CommandContext, args: &[String]) -> Reply {
        if args.len() < 2 {
            return Reply::error("SISMEMBER requires set key and member");
        }

        Reply::boolean(ctx.engine.sismember(&args[0], &args[1]))
    }

    fn name(&self) -> &'static str {
        "SISMEMBER"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(2)
    }
}

/// SMEMBERS command - Get all members of a set
///
/// Syntax: SMEMBERS key
pub struct SMembersCommand;

impl Command for SMembersCommand {
    fn execute(&self, ctx: &CommandContext, args: &[String]) -> Reply {
        match args.first() {
            Some(key) => Reply::Set(ctx.engine.smembers(key)),
            None => Reply::error("SMEMBERS requires set key"),
        }
    }

    fn name(&self) -> &'static str {
        "SMEMBERS"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}

/// SCARD command - Get the number of members in a set
///
/// Syntax: SCARD key
pub struct SCardCommand;

impl Command for SCardCommand {
    fn execute(&self, ctx: &CommandContext, args: &[String]) -> Reply {
        match args.first() {
            Some(key) => Reply::Integer(ctx.engine.scard(key) as i64),
            None => Reply::error("SCARD requires set key"),
        }
    }

    fn name(&self) -> &'static str {
        "SCARD"
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
    fn test_sadd_smembers() {
        let ctx = CommandContext::new();

        // SADD myset a b c
        let result = SAddCommand.execute(&ctx, &args(&["myset", "a", "b", "c"]));
        assert_eq!(result, Reply::Integer(3));

        // SADD myset a d (a already exists)
        let result = SAddCommand.execute(&ctx, &args(&["myset", "a", "d"]));
        assert_eq!(result, Reply::Integer(1));

        let result = SMembersCommand.execute(&ctx, &args(&["myset"]));
        assert_eq!(result, Reply::Set(args(&["a", "b", "c", "d"])));
    }

    #[test]
    fn test_srem_scard() {
        let ctx = CommandContext::new();
        SAddCommand.execute(&ctx, &args(&["myset", "a", "b"]));

        let result = SRemCommand.execute(&ctx, &args(&["myset", "a", "zzz"]));
        assert_eq!(result, Reply::Integer(1));

        let result = SCardCommand.execute(&ctx, &args(&["myset"]));
        assert_eq!(result, Reply::Integer(1));

        // Removing the last member drops the set
        SRemCommand.execute(&ctx, &args(&["myset", "b"]));
        let result = SMembersCommand.execute(&ctx, &args(&["myset"]));
        assert_eq!(result, Reply::Set(vec![]));
    }

    #[test]
    fn test_sismember() {
        let ctx = CommandContext::new();
        SAddCommand.execute(&ctx, &args(&["myset", "a"]));

        assert_eq!(
            SIsMemberCommand.execute(&ctx, &args(&["myset", "a"])),
            Reply::Integer(1)
        );
        assert_eq!(
            SIsMemberCommand.execute(&ctx, &args(&["myset", "b"])),
            Reply::Integer(0)
        );
        assert_eq!(
            SIsMemberCommand.execute(&ctx, &args(&["noset", "a"])),
            Reply::Integer(0)
        );
    }
}
