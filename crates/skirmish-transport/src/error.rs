//! Failures while moving packet bytes between the server and its peers.

use std::io;

/// Why a listener or a peer link failed.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The listen address could not be bound.
    #[error("cannot listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// A peer could not be taken off the listener: the TCP accept or the
    /// WebSocket upgrade failed.
    #[error("incoming peer not admitted: {0}")]
    Admit(#[source] io::Error),

    /// Writing a message to the peer, or closing the link, failed.
    #[error("write to peer failed: {0}")]
    Write(#[source] io::Error),

    /// Reading the next message from the peer failed.
    #[error("read from peer failed: {0}")]
    Read(#[source] io::Error),

    /// The peer sent more than [`MAX_MESSAGE_LEN`](crate::MAX_MESSAGE_LEN)
    /// bytes in one message.
    #[error("peer sent a {len}-byte message, limit is {max}")]
    MessageTooLarge { len: usize, max: usize },
}

impl TransportError {
    pub(crate) fn bind(addr: &str, source: io::Error) -> Self {
        Self::Bind {
            addr: addr.to_string(),
            source,
        }
    }

    pub(crate) fn too_large(len: usize) -> Self {
        Self::MessageTooLarge {
            len,
            max: crate::MAX_MESSAGE_LEN,
        }
    }
}
