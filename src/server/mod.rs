//! Server module
//!
//! Handles client TCP connections and manages the accept loop.
//! This module is responsible for accepting connections and delegating
//! command processing to the dispatcher.

mod connection;

use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

pub use connection::Connection;
pub use crate::net::MAX_LINE_LENGTH;

/// Bind the client listener
///
/// A bind failure is fatal for the server and surfaces as [`Error::Bind`].
pub async fn bind(addr: &str) -> Result<TcpListener> {
    TcpListener::bind(addr).await.map_err(|source| Error::Bind {
        addr: addr.to_string(),
        source,
    })
}

/// Accept connections on `listener` until `shutdown` resolves
///
/// Connections already accepted keep running on their own tasks.
pub async fn serve<F>(listener: TcpListener, dispatcher: Arc<Dispatcher>, shutdown: F)
where
    F: Future<Output = ()>,
{
    if let Ok(local) = listener.local_addr() {
        info!("RediCraft server listening on {}", local);
    }

    tokio::pin!(shutdown);

    loop {
        // Accept incoming connections
        let (socket, addr) = tokio::select! {
            _ = &mut shutdown => break,
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    continue;
                }
            },
        };
        info!("New connection from {}", addr);

        // Clone the dispatcher Arc for this connection
        let dispatcher = dispatcher.clone();

        // Spawn a new task to handle this connection
        tokio::spawn(async move {
            let mut connection = Connection::new(socket);

            if let Err(e) = connection.handle(&dispatcher).await {
                error!("Connection error from {}: {}", addr, e);
            }

            info!("Connection closed: {}", addr);
        });
    }

    info!("Client listener stopped");
}

/// Address the listener is bound to, for logs and tests
pub fn local_addr(listener: &TcpListener) -> Option<SocketAddr> {
    listener.local_addr().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn start() -> (SocketAddr, tokio::sync::oneshot::Sender<()>) {
        let listener = bind("127.0.0.1:0").await.unwrap();
        let addr = local_addr(&listener).unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(serve(listener, Arc::new(Dispatcher::new()), async move {
            let _ = rx.await;
        }));

        (addr, tx)
    }

    async fn read_until(stream: &mut TcpStream, expected: &str) -> String {
        let mut received = Vec::new();
        let mut buf = [0u8; 1024];
        while !String::from_utf8_lossy(&received).ends_with(expected) {
            let n = stream.read(&mut buf).await.unwrap();
            assert!(n > 0, "connection closed early");
            received.extend_from_slice(&buf[..n]);
        }
        String::from_utf8_lossy(&received).into_owned()
    }

    #[tokio::test]
    async fn test_session() {
        let (addr, _shutdown) = start().await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        stream.write_all(b"SET a 1\r\nINCR a\r\n").await.unwrap();
        let reply = read_until(&mut stream, "2\r\n").await;
        assert_eq!(reply, "OK\r\n2\r\n");

        stream.write_all(b"LPUSH l x y\nLRANGE l 0 -1\n").await.unwrap();
        let reply = read_until(&mut stream, "1) y\r\n").await;
        assert_eq!(reply, "2\r\n0) x\r\n1) y\r\n");
    }

    #[tokio::test]
    async fn test_bind_conflict() {
        let (addr, _shutdown) = start().await;
        let result = bind(&addr.to_string()).await;
        assert!(matches!(result, Err(Error::Bind { .. })));
    }
}
