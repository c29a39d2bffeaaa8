//! Line-oriented socket helpers shared by the cluster and replication channels

use crate::error::{Error, Result};
use base64::Engine as _;
use std::time::Duration;
use tokio::io::{
    self, AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::TcpStream;
use tracing::warn;

/// Longest accepted line, terminator excluded
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Read the next non-blank line, without its terminator
///
/// Returns `None` at end of stream. Lines that are not valid UTF-8 are logged
/// as base64 and skipped. A line longer than [`MAX_LINE_LENGTH`] is an
/// `InvalidData` error.
pub async fn read_line<R>(reader: &mut R) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    // Room for the content plus CRLF
    let limit = (MAX_LINE_LENGTH + 2) as u64;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let bytes = (&mut *reader).take(limit).read_until(b'\n', &mut buf).await?;
        if bytes == 0 {
            return Ok(None);
        }

        let terminated = buf.last() == Some(&b'\n');
        while matches!(buf.last(), Some(b'\n' | b'\r')) {
            buf.pop();
        }

        if buf.len() > MAX_LINE_LENGTH || (!terminated && bytes as u64 == limit) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("line exceeds {} bytes", MAX_LINE_LENGTH),
            ));
        }

        if buf.is_empty() {
            continue;
        }

        match std::str::from_utf8(&buf) {
            Ok(text) => return Ok(Some(text.to_string())),
            Err(_) => warn!(
                "Skipping non UTF-8 line: {}",
                base64::engine::general_purpose::STANDARD.encode(&buf)
            ),
        }
    }
}

/// Write one CRLF-terminated line and flush
pub async fn write_line<W>(writer: &mut W, line: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\r\n").await?;
    writer.flush().await
}

/// Connect to `addr`, send one line and wait for one reply line
///
/// Every step shares the same deadline.
pub async fn exchange(addr: &str, line: &str, deadline: Duration) -> Result<String> {
    let request = async {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| Error::network(addr, e))?;
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        write_line(&mut writer, line)
            .await
            .map_err(|e| Error::network(addr, e))?;

        match read_line(&mut reader).await {
            Ok(Some(reply)) => Ok(reply),
            Ok(None) => Err(Error::network(
                addr,
                io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed before reply"),
            )),
            Err(e) => Err(Error::network(addr, e)),
        }
    };

    tokio::time::timeout(deadline, request)
        .await
        .map_err(|_| Error::Timeout(addr.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_read_line_skips_blank_lines() {
        let (mut writer, reader) = tokio::io::duplex(1024);
        let mut reader = BufReader::new(reader);

        writer.write_all(b"\r\n\nfirst\r\nsecond\n").await.unwrap();
        drop(writer);

        assert_eq!(read_line(&mut reader).await.unwrap(), Some("first".to_string()));
        assert_eq!(read_line(&mut reader).await.unwrap(), Some("second".to_string()));
        assert_eq!(read_line(&mut reader).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_read_line_skips_invalid_utf8() {
        let (mut writer, reader) = tokio::io::duplex(1024);
        let mut reader = BufReader::new(reader);

        writer.write_all(b"SET bad \xff\xfe\r\nSET a 1\r\n").await.unwrap();
        drop(writer);

        assert_eq!(read_line(&mut reader).await.unwrap(), Some("SET a 1".to_string()));
        assert_eq!(read_line(&mut reader).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_read_line_rejects_oversized_line() {
        let data = vec![b'x'; MAX_LINE_LENGTH + 10];
        let mut reader = BufReader::new(&data[..]);

        let err = read_line(&mut reader).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn test_read_line_accepts_longest_line() {
        let mut data = vec![b'x'; MAX_LINE_LENGTH];
        data.extend_from_slice(b"\r\nnext\n");
        let mut reader = BufReader::new(&data[..]);

        let line = read_line(&mut reader).await.unwrap().unwrap();
        assert_eq!(line.len(), MAX_LINE_LENGTH);
        assert_eq!(read_line(&mut reader).await.unwrap(), Some("next".to_string()));
    }

    #[tokio::test]
    async fn test_exchange() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let (reader, mut writer) = socket.into_split();
            let mut reader = BufReader::new(reader);
            let line = read_line(&mut reader).await.unwrap().unwrap();
            write_line(&mut writer, &format!("echo {}", line)).await.unwrap();
        });

        let reply = exchange(&addr, "hello", Duration::from_secs(2)).await.unwrap();
        assert_eq!(reply, "echo hello");
    }

    #[tokio::test]
    async fn test_exchange_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        // Accept but never answer
        let _hold = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });

        let result = exchange(&addr, "hello", Duration::from_millis(100)).await;
        assert!(matches!(result, Err(Error::Timeout(_))));
    }
}
