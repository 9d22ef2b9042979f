/**
 * The relay registry: one allocation per TURN client, each owning a relay
 * socket. Allocations are indexed both by relay address and by client
 * address, and the two indexes are kept mutually inverse.
 */
use std::{
    collections::{HashMap, HashSet},
    net::IpAddr,
    time::{Duration, Instant},
};

use thiserror::Error;

use crate::net::{
    address::Address,
    socket::{Socket, SocketError},
};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no allocation for {0}")]
    LookupMiss(Address),

    #[error("client {0} already holds an allocation")]
    AlreadyAllocated(Address),

    #[error("relay {relay} has no permission towards {peer}")]
    NoPermission { relay: Address, peer: Address },

    #[error(transparent)]
    Socket(#[from] SocketError),
}

#[derive(Debug)]
pub struct Allocation {
    socket: Socket,
    lifetime: Duration,
    expires_at: Instant,
    channels: HashMap<u16, Address>,
}

impl Allocation {
    pub fn relay_address(&self) -> Address {
        self.socket.bound_address()
    }

    pub fn client_address(&self) -> Address {
        // always set by Registry::allocate
        self.socket.client_address.unwrap_or_else(|| self.relay_address())
    }

    /// Relay address of the allocation this one is paired with
    pub fn peer_address(&self) -> Option<Address> {
        self.socket.peer_address
    }

    pub fn socket(&self) -> &Socket {
        &self.socket
    }

    #[cfg(test)]
    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    pub fn channel_peer(&self, channel: u16) -> Option<Address> {
        self.channels.get(&channel).copied()
    }

    fn refresh(&mut self, now: Instant) {
        self.expires_at = now + self.lifetime;
    }
}

/// Where a client's relayed traffic goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    /// Relay address of the sending client
    pub relay: Address,
    /// Relay address of the paired allocation
    pub peer_relay: Address,
    /// Client owning the paired allocation
    pub peer_client: Address,
}

#[derive(Debug, Default)]
pub struct Registry {
    by_relay: HashMap<Address, Allocation>,
    by_client: HashMap<Address, Address>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_relay.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_relay.is_empty()
    }

    /**
     * Bind a fresh relay socket on `relay_ip` with an OS-assigned port and
     * register it for `client`. A client holds at most one allocation.
     */
    pub async fn allocate(
        &mut self,
        client: Address,
        relay_ip: IpAddr,
        lifetime: Duration,
        now: Instant,
    ) -> Result<&Allocation, RegistryError> {
        if self.by_client.contains_key(&client) {
            return Err(RegistryError::AlreadyAllocated(client));
        }

        let mut socket = Socket::bind(Address::new(relay_ip, None)).await?;
        socket.client_address = Some(client);
        let relay = socket.bound_address();

        self.by_client.insert(client, relay);
        let allocation = self.by_relay.entry(relay).or_insert(Allocation {
            socket,
            lifetime,
            expires_at: now + lifetime,
            channels: HashMap::new(),
        });
        Ok(allocation)
    }

    pub fn by_client(&self, client: &Address) -> Option<&Allocation> {
        self.by_client
            .get(client)
            .and_then(|relay| self.by_relay.get(relay))
    }

    pub fn by_relay(&self, relay: &Address) -> Option<&Allocation> {
        self.by_relay.get(relay)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Address, &Allocation)> {
        self.by_relay.iter()
    }

    fn relay_of(&self, client: &Address) -> Result<Address, RegistryError> {
        self.by_client
            .get(client)
            .copied()
            .ok_or(RegistryError::LookupMiss(*client))
    }

    /// Push back the expiry of the allocation relaying on `relay`
    pub fn touch(&mut self, relay: &Address, now: Instant) {
        if let Some(allocation) = self.by_relay.get_mut(relay) {
            allocation.refresh(now);
        }
    }

    /**
     * Pair the allocation of `client` with the allocation relaying on
     * `peer_relay`. Pairing is symmetric: each side's peer becomes the
     * other's relay address, and a former partner of either side loses its
     * link back. Returns the client's own relay address.
     */
    pub fn pair(&mut self, client: &Address, peer_relay: &Address, now: Instant) -> Result<Address, RegistryError> {
        let relay = self.relay_of(client)?;
        if !self.by_relay.contains_key(peer_relay) {
            return Err(RegistryError::LookupMiss(*peer_relay));
        }

        self.unlink(&relay);
        self.unlink(peer_relay);
        if let Some(own) = self.by_relay.get_mut(&relay) {
            own.socket.peer_address = Some(*peer_relay);
            own.refresh(now);
        }
        if let Some(peer) = self.by_relay.get_mut(peer_relay) {
            peer.socket.peer_address = Some(relay);
        }
        Ok(relay)
    }

    /// Drop the pairing of `relay` on both ends
    fn unlink(&mut self, relay: &Address) {
        let Some(old) = self.by_relay.get_mut(relay).and_then(|a| a.socket.peer_address.take()) else {
            return;
        };
        if let Some(partner) = self.by_relay.get_mut(&old) {
            if partner.socket.peer_address == Some(*relay) {
                partner.socket.peer_address = None;
            }
        }
    }

    /**
     * Resolve where data from `client` is relayed to. With `peer_relay`
     * given, it must match the established pairing.
     */
    pub fn route(&mut self, client: &Address, peer_relay: Option<&Address>, now: Instant) -> Result<Route, RegistryError> {
        let relay = self.relay_of(client)?;
        let paired = self.by_relay.get(&relay).and_then(Allocation::peer_address);

        let target = match (paired, peer_relay) {
            (Some(paired), Some(requested)) if paired == *requested => paired,
            (Some(paired), None) => paired,
            (_, requested) => {
                return Err(RegistryError::NoPermission {
                    relay,
                    peer: requested.copied().unwrap_or(relay),
                })
            }
        };
        let peer_client = self
            .by_relay
            .get(&target)
            .map(Allocation::client_address)
            .ok_or(RegistryError::LookupMiss(target))?;

        self.touch(&relay, now);
        Ok(Route {
            relay,
            peer_relay: target,
            peer_client,
        })
    }

    /// Record `channel` as a shorthand for `peer` on the allocation of `client`
    pub fn bind_channel(&mut self, client: &Address, channel: u16, peer: Address, now: Instant) -> Result<Address, RegistryError> {
        let relay = self.relay_of(client)?;
        let allocation = self
            .by_relay
            .get_mut(&relay)
            .ok_or(RegistryError::LookupMiss(relay))?;
        allocation.channels.insert(channel, peer);
        allocation.refresh(now);
        Ok(relay)
    }

    /**
     * Remove every allocation whose lifetime ran out. Pairings pointing at a
     * removed allocation are cleared. Dropping the returned allocations
     * closes their relay sockets.
     */
    pub fn sweep(&mut self, now: Instant) -> Vec<Allocation> {
        let expired: HashSet<Address> = self
            .by_relay
            .iter()
            .filter(|(_, allocation)| allocation.expires_at <= now)
            .map(|(relay, _)| *relay)
            .collect();
        if expired.is_empty() {
            return Vec::new();
        }

        let mut removed = Vec::with_capacity(expired.len());
        for relay in &expired {
            if let Some(allocation) = self.by_relay.remove(relay) {
                self.by_client.remove(&allocation.client_address());
                removed.push(allocation);
            }
        }
        for allocation in self.by_relay.values_mut() {
            if allocation
                .socket
                .peer_address
                .is_some_and(|peer| expired.contains(&peer))
            {
                allocation.socket.peer_address = None;
            }
        }
        removed
    }
}
