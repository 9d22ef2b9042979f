/**
 * The TURN side of the relay: the allocation registry and the handler that
 * turns STUN/TURN requests into registry changes and replies.
 */
use async_trait::async_trait;
use thiserror::Error;

use crate::{
    net::address::Address,
    stun::StunError,
};

pub mod processor;
pub mod registry;

use registry::{Registry, RegistryError};

#[derive(Debug, Error)]
pub enum TurnError {
    #[error(transparent)]
    Stun(#[from] StunError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("FINGERPRINT does not match the message")]
    BadFingerprint,

    #[error("{0} bytes of data do not fit a DATA indication")]
    Oversized(usize),
}

/**
 * Largest payload relayed as a DATA indication: the attribute section
 * (DATA plus an IPv6 XOR-PEER-ADDRESS) must fit the 16-bit header length.
 */
pub const MAX_RELAYED_DATA: usize = 65504;

/// A datagram the dispatcher sends from the listening socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transmit {
    pub to: Address,
    pub data: Vec<u8>,
}

/**
 * The protocol side of the dispatcher. The dispatcher owns the sockets and
 * the registry, and hands each inbound datagram to one of these methods.
 */
#[async_trait]
pub trait MessageProcessor {
    /// A STUN message received on the listening socket from `sender`
    async fn process_message(
        &self,
        registry: &mut Registry,
        input: &[u8],
        sender: Address,
    ) -> Result<Option<Transmit>, TurnError>;

    /// Raw data received from `sender` on the relay socket bound to `relay`
    fn process_peer_data(
        &self,
        registry: &mut Registry,
        relay: Address,
        input: &[u8],
        sender: Address,
    ) -> Result<Option<Transmit>, TurnError>;
}
