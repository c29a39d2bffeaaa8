//! Connection handling
//!
//! Manages individual client connections, splitting command lines
//! and sending replies.

use crate::dispatch::Dispatcher;
use crate::net::MAX_LINE_LENGTH;
use crate::protocol::{Reply, ReplyEncoder};
use base64::Engine as _;
use bytes::BytesMut;
use std::io;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, warn};

/// Connection handler
pub struct Connection {
    /// TCP stream
    stream: TcpStream,

    /// Read buffer
    read_buffer: BytesMut,

    /// Write buffer
    write_buffer: BytesMut,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(stream: TcpStream) -> Self {
        Connection {
            stream,
            read_buffer: BytesMut::with_capacity(4096),
            write_buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Handle the connection
    ///
    /// Reads command lines from the client, dispatches them in order, and
    /// sends one reply per line.
    pub async fn handle(&mut self, dispatcher: &Dispatcher) -> io::Result<()> {
        loop {
            // Read data from the socket
            let n = self.stream.read_buf(&mut self.read_buffer).await?;

            // Connection closed
            if n == 0 {
                if !self.read_buffer.is_empty() {
                    debug!("Dropping {} bytes of unterminated input", self.read_buffer.len());
                }
                return Ok(());
            }

            debug!("Read {} bytes", n);

            // Dispatch every complete line in the buffer
            while let Some(line) = next_line(&mut self.read_buffer) {
                let reply = match std::str::from_utf8(&line) {
                    Ok(text) if text.trim().is_empty() => continue,
                    Ok(text) => dispatcher.dispatch_line(text).await,
                    Err(_) => {
                        warn!(
                            "Rejected non UTF-8 command line: {}",
                            base64::engine::general_purpose::STANDARD.encode(&line)
                        );
                        Reply::error("command line is not valid UTF-8")
                    }
                };

                debug!("Reply: {}", reply);
                self.send_reply(&reply).await?;
            }

            if self.read_buffer.len() > MAX_LINE_LENGTH {
                warn!("Command line exceeds {} bytes, discarding", MAX_LINE_LENGTH);
                self.read_buffer.clear();
                self.send_reply(&Reply::error("command line too long")).await?;
            }
        }
    }

    /// Send a reply to the client
    async fn send_reply(&mut self, reply: &Reply) -> io::Result<()> {
        // Encode the reply
        self.write_buffer.clear();
        ReplyEncoder::encode_to(&mut self.write_buffer, reply);

        // Write to the socket
        self.stream.write_all(&self.write_buffer).await?;
        self.stream.flush().await
    }
}

/// Split the next `\n`-terminated line off `buffer`, without its terminator
fn next_line(buffer: &mut BytesMut) -> Option<BytesMut> {
    let newline = buffer.iter().position(|&b| b == b'\n')?;
    let mut line = buffer.split_to(newline + 1);
    line.truncate(newline);
    if line.last() == Some(&b'\r') {
        line.truncate(newline - 1);
    }
    Some(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_line() {
        let mut buffer = BytesMut::from(&b"GET a\r\nGET b\nGET"[..]);

        assert_eq!(next_line(&mut buffer).as_deref(), Some(&b"GET a"[..]));
        assert_eq!(next_line(&mut buffer).as_deref(), Some(&b"GET b"[..]));
        assert_eq!(next_line(&mut buffer), None);
        assert_eq!(&buffer[..], b"GET");
    }

    #[test]
    fn test_next_line_empty() {
        let mut buffer = BytesMut::from(&b"\r\n"[..]);
        assert_eq!(next_line(&mut buffer).as_deref(), Some(&b""[..]));
        assert!(buffer.is_empty());
    }
}
