/**
 * Network related functionality: the single-task event loop that owns the
 * listening socket, every relay socket and the relay registry.
 *
 */
use std::{
    future::poll_fn,
    sync::Arc,
    task::Poll,
    time::Instant,
};

use crate::{
    turn::{registry::Registry, MessageProcessor, Transmit, TurnError},
    utils, Context,
};
use address::Address;
use slog::{debug, info, trace, warn};
use socket::{Socket, SocketError};
use tokio::time::{timeout, Duration};

pub(crate) mod address;
pub(crate) mod socket;

/// How an inbound datagram on the listening socket is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Datagram {
    /// Top two bits `00`: a STUN message
    Stun,
    /// Any other leading bits: ChannelData, relayed verbatim
    ChannelData,
    Empty,
}

pub(crate) fn classify(data: &[u8]) -> Datagram {
    match data.first() {
        None => Datagram::Empty,
        Some(first) if first & 0xC0 == 0 => Datagram::Stun,
        Some(_) => Datagram::ChannelData,
    }
}

/// A socket reported readable by one poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Listener,
    Relay(Address),
}

/**
 * The dispatcher. Each iteration polls the listener plus every relay socket
 * for readiness, services the ready ones in order, then retires expired
 * allocations.
 */
pub(crate) struct Dispatcher<T: MessageProcessor> {
    context: Arc<Context>,
    processor: T,
    listener: Socket,
    registry: Registry,
    poll_interval: Duration,
}

impl<T: MessageProcessor> Dispatcher<T> {
    /**
     * Bind the listening socket. The context contains global logger and
     * configuration settings, and the message processor does the protocol
     * work (in this case TURN).
     */
    pub async fn bind(context: &Arc<Context>, message_processor: T, address: Address) -> Result<Self, SocketError> {
        let listener = Socket::bind(address).await?;
        debug!(context.logger, "Listening socket bound to {}", listener.bound_address());
        Ok(Self {
            context: Arc::clone(context),
            processor: message_processor,
            listener,
            registry: Registry::new(),
            poll_interval: Duration::from_millis(context.config.poll_interval_ms),
        })
    }

    pub fn local_address(&self) -> Address {
        self.listener.bound_address()
    }

    #[cfg(test)]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Runs until the process is terminated
    pub async fn run(mut self) {
        info!(self.context.logger, "Relaying on {}", self.local_address());
        loop {
            self.iterate().await;
        }
    }

    pub(crate) async fn iterate(&mut self) {
        for source in self.poll_ready().await {
            self.service(source).await;
        }

        if self.registry.is_empty() {
            return;
        }
        for allocation in self.registry.sweep(Instant::now()) {
            info!(
                self.context.logger,
                "EXPIRED R:[{}] of C:[{}], {} left",
                allocation.relay_address(),
                allocation.client_address(),
                self.registry.len()
            );
        }
    }

    /**
     * Wait, at most one poll interval, for any socket to become readable.
     * Relay sockets allocated during this iteration are picked up by the
     * next poll.
     */
    async fn poll_ready(&self) -> Vec<Source> {
        let listener = &self.listener;
        let registry = &self.registry;
        let ready = poll_fn(|cx| {
            let mut ready = Vec::new();
            if listener.poll_read_ready(cx).is_ready() {
                ready.push(Source::Listener);
            }
            for (relay, allocation) in registry.iter() {
                if allocation.socket().poll_read_ready(cx).is_ready() {
                    ready.push(Source::Relay(*relay));
                }
            }
            if ready.is_empty() {
                Poll::Pending
            } else {
                Poll::Ready(ready)
            }
        });
        timeout(self.poll_interval, ready).await.unwrap_or_default()
    }

    async fn service(&mut self, source: Source) {
        let socket = match source {
            Source::Listener => &self.listener,
            Source::Relay(relay) => match self.registry.by_relay(&relay) {
                Some(allocation) => allocation.socket(),
                // swept or never existed
                None => return,
            },
        };
        let Some((data, sender)) = socket.read() else {
            return;
        };

        let result = match source {
            Source::Listener => match classify(&data) {
                Datagram::Stun => {
                    self.processor
                        .process_message(&mut self.registry, &data, sender)
                        .await
                }
                Datagram::ChannelData => self.relay_raw(&data, sender),
                Datagram::Empty => Ok(None),
            },
            Source::Relay(relay) => self
                .processor
                .process_peer_data(&mut self.registry, relay, &data, sender),
        };

        match result {
            Ok(Some(transmit)) => self.deliver(transmit).await,
            Ok(None) => {}
            Err(e) => debug!(self.context.logger, "dropping datagram from {}: {}", sender, e),
        }
    }

    /// Forward ChannelData verbatim to the client paired with the sender
    fn relay_raw(&mut self, data: &[u8], sender: Address) -> Result<Option<Transmit>, TurnError> {
        let route = self.registry.route(&sender, None, Instant::now())?;
        let channel = match data {
            [hi, lo, ..] => u16::from_be_bytes([*hi, *lo]),
            _ => 0,
        };
        let bound = self
            .registry
            .by_relay(&route.relay)
            .and_then(|allocation| allocation.channel_peer(channel));
        trace!(
            self.context.logger,
            "RAW C:[{}] -> C:[{}] channel 0x{:04x} bound to {:?}: {}",
            sender,
            route.peer_client,
            channel,
            bound,
            utils::hex_encode_delimited(data)
        );
        Ok(Some(Transmit {
            to: route.peer_client,
            data: data.to_vec(),
        }))
    }

    async fn deliver(&self, transmit: Transmit) {
        if let Err(e) = self.listener.send(&transmit.data, Some(&transmit.to)).await {
            warn!(self.context.logger, "{}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serial_test::serial;

    use super::*;
    use crate::{
        auth::StaticCredentials,
        config::{compliance_type::Compliance, Settings},
        logging,
        stun::{Attribute, AttributeKind, Class, Message, Method},
        turn::processor::{StaticConfig, TurnMessageProcessor},
    };

    type TestDispatcher = Dispatcher<TurnMessageProcessor<StaticCredentials>>;

    fn loopback() -> Address {
        "127.0.0.1".parse().unwrap()
    }

    async fn dispatcher() -> TestDispatcher {
        dispatcher_with_lifetime(600).await
    }

    async fn dispatcher_with_lifetime(lifetime: u32) -> TestDispatcher {
        let mut config = Settings::new().expect("Deserialization failed");
        config.poll_interval_ms = 20;
        let context = Arc::new(Context {
            config,
            logger: logging::discard_logger(),
        });
        let settings = StaticConfig {
            software_name: "turn-relay/test".to_string(),
            realm: "example.org".to_string(),
            lifetime,
            compliance: Compliance::RFC5389,
            relay_ip: loopback().ip(),
        };
        let credentials = StaticCredentials::new("example.org", HashMap::new(), Some("test".to_string()));
        let processor = TurnMessageProcessor::new(&context, &settings, credentials);
        Dispatcher::bind(&context, processor, loopback()).await.unwrap()
    }

    /// Drive the loop until `client` has a datagram waiting
    async fn exchange(dispatcher: &mut TestDispatcher, client: &Socket) -> Vec<u8> {
        for _ in 0..50 {
            dispatcher.iterate().await;
            if let Some((data, _)) = client.read() {
                return data;
            }
        }
        panic!("no reply within 50 iterations");
    }

    /// Drive the loop a few times and check nothing reached `client`
    async fn assert_silent(dispatcher: &mut TestDispatcher, client: &Socket) {
        for _ in 0..5 {
            dispatcher.iterate().await;
        }
        assert!(client.read().is_none());
    }

    async fn allocate(dispatcher: &mut TestDispatcher, client: &Socket) -> Address {
        let mut request = Message::new(Class::Request, Method::Allocate);
        request
            .set_attribute(Attribute::username("user"))
            .set_attribute(Attribute::realm("example.org"));
        client
            .send(&request.serialize(), Some(&dispatcher.local_address()))
            .await
            .unwrap();
        let reply = Message::parse(&exchange(dispatcher, client).await).unwrap();
        assert_eq!(reply.class(), Class::Response);
        reply
            .attribute(AttributeKind::XorRelayedAddress)
            .unwrap()
            .address(&reply)
            .unwrap()
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(&[]), Datagram::Empty);
        for first in [0x00u8, 0x01, 0x3F] {
            assert_eq!(classify(&[first, 0x01]), Datagram::Stun);
        }
        for first in [0xC0u8, 0xFF, 0x40, 0x7F, 0x80] {
            assert_eq!(classify(&[first, 0x00, 0x00, 0x04]), Datagram::ChannelData);
        }
    }

    #[tokio::test]
    #[serial]
    async fn test_binding_over_loopback() {
        let mut dispatcher = dispatcher().await;
        let client = Socket::bind(loopback()).await.unwrap();

        let request = Message::new(Class::Request, Method::Binding);
        client
            .send(&request.serialize(), Some(&dispatcher.local_address()))
            .await
            .unwrap();

        let reply = Message::parse(&exchange(&mut dispatcher, &client).await).unwrap();
        assert_eq!(reply.transaction_id(), request.transaction_id());
        let mapped = reply.attribute(AttributeKind::XorMappedAddress).unwrap();
        assert_eq!(mapped.address(&reply).unwrap(), client.bound_address());
    }

    #[tokio::test]
    #[serial]
    async fn test_garbage_is_dropped() {
        let mut dispatcher = dispatcher().await;
        let client = Socket::bind(loopback()).await.unwrap();
        client
            .send(&[0x00, 0x01, 0x00], Some(&dispatcher.local_address()))
            .await
            .unwrap();
        for _ in 0..5 {
            dispatcher.iterate().await;
        }
        assert!(client.read().is_none());
        assert!(dispatcher.registry().is_empty());
    }

    #[tokio::test]
    #[serial]
    async fn test_relay_between_two_clients() {
        let mut dispatcher = dispatcher().await;
        let a = Socket::bind(loopback()).await.unwrap();
        let b = Socket::bind(loopback()).await.unwrap();
        let relay_a = allocate(&mut dispatcher, &a).await;
        let relay_b = allocate(&mut dispatcher, &b).await;
        assert_eq!(dispatcher.registry().len(), 2);

        let mut permission = Message::new(Class::Request, Method::CreatePermission);
        let xor_peer = Attribute::xor_peer_address(&relay_b, &permission);
        permission.set_attribute(xor_peer);
        a.send(&permission.serialize(), Some(&dispatcher.local_address()))
            .await
            .unwrap();
        let reply = Message::parse(&exchange(&mut dispatcher, &a).await).unwrap();
        assert_eq!(reply.class(), Class::Response);

        let mut send = Message::new(Class::Indication, Method::Send);
        let xor_peer = Attribute::xor_peer_address(&relay_b, &send);
        send.set_attribute(xor_peer).set_attribute(Attribute::data(b"ping"));
        a.send(&send.serialize(), Some(&dispatcher.local_address()))
            .await
            .unwrap();
        let indication = Message::parse(&exchange(&mut dispatcher, &b).await).unwrap();
        assert_eq!(indication.method(), Some(Method::Data));
        assert_eq!(indication.attribute(AttributeKind::Data).unwrap().value(), b"ping");
        let from = indication.attribute(AttributeKind::XorPeerAddress).unwrap();
        assert_eq!(from.address(&indication).unwrap(), relay_a);

        let channel_data = [0x40, 0x01, 0x00, 0x04, b'p', b'o', b'n', b'g'];
        b.send(&channel_data, Some(&dispatcher.local_address()))
            .await
            .unwrap();
        assert_eq!(exchange(&mut dispatcher, &a).await, channel_data);
    }

    #[tokio::test]
    #[serial]
    async fn test_channel_data_without_allocation_is_dropped() {
        let mut dispatcher = dispatcher().await;
        let a = Socket::bind(loopback()).await.unwrap();
        let b = Socket::bind(loopback()).await.unwrap();
        allocate(&mut dispatcher, &b).await;

        let channel_data = [0x40, 0x01, 0x00, 0x04, b'p', b'i', b'n', b'g'];
        a.send(&channel_data, Some(&dispatcher.local_address()))
            .await
            .unwrap();
        assert_silent(&mut dispatcher, &b).await;
        assert!(a.read().is_none());
        assert_eq!(dispatcher.registry().len(), 1);
    }

    #[tokio::test]
    #[serial]
    async fn test_channel_data_without_pairing_is_dropped() {
        let mut dispatcher = dispatcher().await;
        let a = Socket::bind(loopback()).await.unwrap();
        let b = Socket::bind(loopback()).await.unwrap();
        allocate(&mut dispatcher, &a).await;
        allocate(&mut dispatcher, &b).await;

        let channel_data = [0x40, 0x01, 0x00, 0x04, b'p', b'i', b'n', b'g'];
        a.send(&channel_data, Some(&dispatcher.local_address()))
            .await
            .unwrap();
        assert_silent(&mut dispatcher, &b).await;
        assert!(a.read().is_none());
    }

    #[tokio::test]
    #[serial]
    async fn test_expired_allocation_is_swept_by_the_loop() {
        let mut dispatcher = dispatcher_with_lifetime(0).await;
        let a = Socket::bind(loopback()).await.unwrap();
        let b = Socket::bind(loopback()).await.unwrap();
        let relay_a = allocate(&mut dispatcher, &a).await;
        allocate(&mut dispatcher, &b).await;
        dispatcher.iterate().await;
        assert!(dispatcher.registry().is_empty());
        assert!(dispatcher.registry().by_relay(&relay_a).is_none());

        // the client may allocate again once its allocation is gone
        let again = allocate(&mut dispatcher, &a).await;
        assert_eq!(again.ip(), relay_a.ip());
    }
}
