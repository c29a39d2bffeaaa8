//! Text command protocol
//!
//! Turns command lines into tokens and replies into CRLF-terminated text.
//! It is completely independent from other modules (loose coupling).

mod tokenizer;
mod reply;

pub use tokenizer::{tokenize, quote, join_command};
pub use reply::{Reply, ReplyEncoder};
