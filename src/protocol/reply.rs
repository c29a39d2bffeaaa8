//! Reply types and their text encoding
//!
//! Every reply line ends with CRLF.

use bytes::{BufMut, BytesMut};
use std::fmt;

const CRLF: &str = "\r\n";

/// A reply to one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// PONG
    Pong,

    /// OK
    Ok,

    /// A literal value
    Value(String),

    /// (nil)
    Nil,

    /// Decimal integer
    Integer(i64),

    /// Hash fields as `field: value` lines, or `(empty hash)`
    Hash(Vec<(String, String)>),

    /// List elements as `i) value` lines, or `(empty list)`
    List(Vec<String>),

    /// Set members one per line, or `(empty set)`
    Set(Vec<String>),

    /// Free-form multi-line text (admin output)
    Text(Vec<String>),

    /// ERROR: <reason>
    Error(String),
}

impl Reply {
    /// Create a value reply
    pub fn value(s: impl Into<String>) -> Self {
        Reply::Value(s.into())
    }

    /// Create an error reply
    pub fn error(reason: impl Into<String>) -> Self {
        Reply::Error(reason.into())
    }

    /// Create a value reply, or `(nil)` when absent
    pub fn optional(value: Option<String>) -> Self {
        value.map_or(Reply::Nil, Reply::Value)
    }

    /// Create a 0/1 integer reply
    pub fn boolean(b: bool) -> Self {
        Reply::Integer(i64::from(b))
    }

    /// Check if this is an error reply
    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }

    /// The reply lines, without line terminators
    pub fn lines(&self) -> Vec<String> {
        match self {
            Reply::Pong => vec!["PONG".to_string()],
            Reply::Ok => vec!["OK".to_string()],
            Reply::Value(v) => vec![v.clone()],
            Reply::Nil => vec!["(nil)".to_string()],
            Reply::Integer(i) => vec![i.to_string()],
            Reply::Hash(fields) if fields.is_empty() => vec!["(empty hash)".to_string()],
            Reply::Hash(fields) => fields
                .iter()
                .map(|(field, value)| format!("{}: {}", field, value))
                .collect(),
            Reply::List(values) if values.is_empty() => vec!["(empty list)".to_string()],
            Reply::List(values) => values
                .iter()
                .enumerate()
                .map(|(i, value)| format!("{}) {}", i, value))
                .collect(),
            Reply::Set(members) if members.is_empty() => vec!["(empty set)".to_string()],
            Reply::Set(members) => members.clone(),
            Reply::Text(lines) => lines.clone(),
            Reply::Error(reason) => vec![format!("ERROR: {}", reason)],
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lines().join("\n"))
    }
}

/// Reply encoder
pub struct ReplyEncoder;

impl ReplyEncoder {
    /// Encode a reply into a buffer
    pub fn encode_to(buf: &mut BytesMut, reply: &Reply) {
        for line in reply.lines() {
            buf.put_slice(line.as_bytes());
            buf.put_slice(CRLF.as_bytes());
        }
    }

    /// Encode a reply into a new string
    pub fn encode(reply: &Reply) -> String {
        let mut buf = BytesMut::new();
        Self::encode_to(&mut buf, reply);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_simple_replies() {
        assert_eq!(ReplyEncoder::encode(&Reply::Pong), "PONG\r\n");
        assert_eq!(ReplyEncoder::encode(&Reply::Ok), "OK\r\n");
        assert_eq!(ReplyEncoder::encode(&Reply::Nil), "(nil)\r\n");
        assert_eq!(ReplyEncoder::encode(&Reply::Integer(-2)), "-2\r\n");
        assert_eq!(
            ReplyEncoder::encode(&Reply::error("SET requires key and value")),
            "ERROR: SET requires key and value\r\n"
        );
    }

    #[test]
    fn test_encode_collections() {
        assert_eq!(ReplyEncoder::encode(&Reply::Hash(vec![])), "(empty hash)\r\n");
        assert_eq!(ReplyEncoder::encode(&Reply::List(vec![])), "(empty list)\r\n");
        assert_eq!(ReplyEncoder::encode(&Reply::Set(vec![])), "(empty set)\r\n");

        let list = Reply::List(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(ReplyEncoder::encode(&list), "0) a\r\n1) b\r\n");

        let hash = Reply::Hash(vec![("f".to_string(), "v".to_string())]);
        assert_eq!(ReplyEncoder::encode(&hash), "f: v\r\n");
    }
}
