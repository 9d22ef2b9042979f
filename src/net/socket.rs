/**
 * One bound UDP endpoint: the listening socket, or the relay socket of a
 * TURN allocation.
 */
use std::{
    io,
    task::{Context, Poll},
};

use thiserror::Error;
use tokio::net::UdpSocket;

use super::address::Address;

/// Largest datagram read in one go
pub(crate) const MAX_DATAGRAM_SIZE: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum SocketError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: Address,
        #[source]
        source: io::Error,
    },

    #[error("no destination given and no peer address configured")]
    NoDestination,

    #[error("failed to send to {address}: {source}")]
    Send {
        address: Address,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug)]
pub struct Socket {
    inner: UdpSocket,
    bound_address: Address,
    /// The TURN client owning this relay socket
    pub client_address: Option<Address>,
    /// The peer this socket currently forwards to
    pub peer_address: Option<Address>,
}

impl Socket {
    /**
     * Bind a UDP socket. Without a port the OS picks an ephemeral one, which
     * is read back into `bound_address`.
     */
    pub async fn bind(address: Address) -> Result<Self, SocketError> {
        let inner = UdpSocket::bind(address.socket_addr())
            .await
            .map_err(|source| SocketError::Bind { address, source })?;
        let local = inner
            .local_addr()
            .map_err(|source| SocketError::Bind { address, source })?;

        Ok(Self {
            inner,
            bound_address: local.into(),
            client_address: None,
            peer_address: None,
        })
    }

    pub fn bound_address(&self) -> Address {
        self.bound_address
    }

    /**
     * Readiness check used by the dispatcher's poll. Registers the task's
     * waker when nothing is ready.
     */
    pub(crate) fn poll_read_ready(&self, cx: &mut Context<'_>) -> Poll<()> {
        self.inner.poll_recv_ready(cx).map(|_| ())
    }

    /**
     * Non-blocking read. `None` covers both "nothing queued" and transient
     * OS errors.
     */
    pub fn read(&self) -> Option<(Vec<u8>, Address)> {
        let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];
        match self.inner.try_recv_from(&mut buffer) {
            Ok((n, sender)) => {
                buffer.truncate(n);
                Some((buffer, sender.into()))
            }
            Err(_) => None,
        }
    }

    /**
     * Send to `destination`, or to the configured peer when `None`.
     */
    pub async fn send(&self, data: &[u8], destination: Option<&Address>) -> Result<usize, SocketError> {
        let address = destination
            .or(self.peer_address.as_ref())
            .copied()
            .ok_or(SocketError::NoDestination)?;
        self.inner
            .send_to(data, address.socket_addr())
            .await
            .map_err(|source| SocketError::Send { address, source })
    }
}
