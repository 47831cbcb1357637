//! Newline-delimited TCP transport.
//!
//! Stream transports carry one JSON object per line. The read and write
//! halves are locked independently so a pending `recv` never blocks a
//! concurrent `send` on the same connection.

use std::net::SocketAddr;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use crate::{Connection, ConnectionId, MAX_MESSAGE_LEN, Transport, TransportError};

/// A [`Transport`] that frames messages with `\n` over raw TCP.
pub struct LineTransport {
    listener: TcpListener,
}

impl LineTransport {
    /// Binds a new line transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| TransportError::bind(addr, e))?;
        tracing::info!(addr, "line transport listening");
        Ok(Self { listener })
    }
}

impl Transport for LineTransport {
    type Connection = LineConnection;

    async fn accept(&mut self) -> Result<Self::Connection, TransportError> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::Admit)?;

        let conn = LineConnection::from_stream(stream);
        tracing::debug!(id = %conn.id, %addr, "accepted line connection");
        Ok(conn)
    }

    fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

/// A single newline-delimited TCP connection.
pub struct LineConnection {
    id: ConnectionId,
    reader: Mutex<Lines<BufReader<OwnedReadHalf>>>,
    writer: Mutex<OwnedWriteHalf>,
}

impl LineConnection {
    /// Wraps an already-connected stream. Used by the listener and by
    /// clients that want the same framing on their side.
    pub fn from_stream(stream: TcpStream) -> Self {
        let (read, write) = stream.into_split();
        Self {
            id: ConnectionId::next(),
            reader: Mutex::new(BufReader::new(read).lines()),
            writer: Mutex::new(write),
        }
    }
}

impl Connection for LineConnection {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let mut frame = Vec::with_capacity(data.len() + 1);
        frame.extend_from_slice(data);
        frame.push(b'\n');

        let mut writer = self.writer.lock().await;
        writer
            .write_all(&frame)
            .await
            .map_err(TransportError::Write)?;
        writer.flush().await.map_err(TransportError::Write)
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut reader = self.reader.lock().await;
        loop {
            // `next_line` is cancel safe: a partially read line stays
            // buffered inside `Lines` if the caller's select! drops us.
            let line = reader
                .next_line()
                .await
                .map_err(TransportError::Read)?;
            match line {
                None => return Ok(None),
                Some(line) if line.len() > MAX_MESSAGE_LEN => {
                    return Err(TransportError::too_large(line.len()));
                }
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => return Ok(Some(line.into_bytes())),
            }
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.writer
            .lock()
            .await
            .shutdown()
            .await
            .map_err(TransportError::Write)
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
