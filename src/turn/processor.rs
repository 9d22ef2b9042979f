/**
 * A message processor for STUN/TURN messages
 *
 */
use std::{
    net::IpAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use slog::{debug, info, trace, warn};

use super::{
    registry::{Registry, RegistryError},
    MessageProcessor, Transmit, TurnError, MAX_RELAYED_DATA,
};
use crate::{
    auth::CredentialStore,
    config::compliance_type::Compliance,
    net::address::Address,
    stun::{attribute::TRANSPORT_UDP, Attribute, AttributeKind, Class, ErrorCode, Message, Method, UnknownAttributes},
    utils, Context,
};

/// Channel numbers a client may bind
const CHANNEL_RANGE: std::ops::RangeInclusive<u16> = 0x4000..=0x7FFF;

#[derive(Clone, Debug)]
pub(crate) struct StaticConfig {
    pub software_name: String,
    pub realm: String,
    /// Allocation lifetime in seconds
    pub lifetime: u32,
    pub compliance: Compliance,
    /// IP relay sockets are bound to
    pub relay_ip: IpAddr,
}

/// Username and realm of a request, with the password they resolve to
struct Credentials {
    username: Attribute,
    realm: Attribute,
    password: String,
}

/**
 * Implement the `MessageProcessor` trait for the TURN methods.
 */
pub(crate) struct TurnMessageProcessor<A: CredentialStore + Send + Sync + 'static> {
    context: Arc<Context>,
    settings: StaticConfig,
    credentials: A,
}

impl<A: CredentialStore + Send + Sync + 'static> TurnMessageProcessor<A> {
    pub fn new(context: &Arc<Context>, static_settings: &StaticConfig, credentials: A) -> Self {
        Self {
            context: Arc::clone(context),
            settings: static_settings.clone(),
            credentials,
        }
    }

    fn lifetime(&self) -> Duration {
        Duration::from_secs(u64::from(self.settings.lifetime))
    }

    /**
     * Resolve the long-term credentials of `request`. The realm defaults to
     * the configured one when the request carries none.
     */
    fn credentials_of(&self, request: &Message) -> Option<Credentials> {
        let username = request.attribute(AttributeKind::Username)?.clone();
        let realm = request
            .attribute(AttributeKind::Realm)
            .cloned()
            .unwrap_or_else(|| Attribute::realm(&self.settings.realm));
        let password = self
            .credentials
            .lookup_password(&username.text().ok()?, &realm.text().ok()?)?;
        Some(Credentials {
            username,
            realm,
            password,
        })
    }

    /// Add MESSAGE-INTEGRITY when the request's credentials resolve, then FINGERPRINT if asked
    fn seal(&self, reply: &mut Message, request: &Message, fingerprint: bool) -> Result<(), TurnError> {
        if let Some(credentials) = self.credentials_of(request) {
            reply.sign(&credentials.password, &credentials.username, &credentials.realm)?;
        }
        if fingerprint {
            reply.add_fingerprint();
        }
        Ok(())
    }

    fn error_reply(request: &Message, code: ErrorCode) -> Message {
        let mut reply = Message::reply_to(request);
        reply
            .set_class(Class::Error)
            .set_attribute(Attribute::error_code(code));
        reply
    }

    /**
     * Error response for requests. Indications never get a response, so for
     * them the failure is only logged.
     */
    fn reject(&self, request: &Message, sender: Address, code: ErrorCode) -> Option<Transmit> {
        if request.class() != Class::Request {
            debug!(self.context.logger, "dropping indication from {}: {}", sender, code.reason());
            return None;
        }
        Some(self.respond(&Self::error_reply(request, code), sender))
    }

    fn respond(&self, reply: &Message, sender: Address) -> Transmit {
        let data = reply.serialize();
        trace!(
            self.context.logger,
            "--<-- [{}]: {}",
            hex::encode(reply.transaction_id()),
            utils::hex_encode_delimited(&data)
        );
        Transmit { to: sender, data }
    }

    fn binding(&self, request: &Message, sender: Address) -> Message {
        let mut reply = Message::reply_to(request);
        let xor_mapped = Attribute::xor_mapped_address(&sender, &reply);
        reply.set_attribute(xor_mapped);
        if self.settings.compliance == Compliance::Relaxed {
            reply.set_attribute(Attribute::mapped_address(&sender));
        }
        reply
    }

    fn unauthenticated(&self, request: &Message) -> Message {
        let mut reply = Message::reply_to(request);
        reply
            .set_class(Class::Error)
            .set_attribute(Attribute::realm(&self.settings.realm))
            .set_attribute(Attribute::nonce())
            .set_attribute(Attribute::error_code(ErrorCode::Unauthenticated));
        reply
    }

    async fn allocate(
        &self,
        registry: &mut Registry,
        request: &Message,
        input: &[u8],
        sender: Address,
    ) -> Result<Option<Transmit>, TurnError> {
        let Some(credentials) = self.credentials_of(request) else {
            debug!(self.context.logger, "ALLOCATE from {} without known credentials", sender);
            return Ok(Some(self.respond(&self.unauthenticated(request), sender)));
        };
        let integrity = Message::verify_integrity(input, &credentials.password, &credentials.username, &credentials.realm)?;
        if integrity == Some(false) {
            debug!(self.context.logger, "ALLOCATE from {} with bad MESSAGE-INTEGRITY", sender);
            return Ok(Some(self.respond(&self.unauthenticated(request), sender)));
        }

        if let Some(transport) = request.attribute(AttributeKind::RequestedTransport) {
            if transport.transport()? != TRANSPORT_UDP {
                return Ok(self.reject(request, sender, ErrorCode::UnsupportedTransportProtocol));
            }
        }

        let relay = match registry
            .allocate(sender, self.settings.relay_ip, self.lifetime(), Instant::now())
            .await
        {
            Ok(allocation) => allocation.relay_address(),
            Err(RegistryError::AlreadyAllocated(_)) => {
                return Ok(self.reject(request, sender, ErrorCode::AllocationMismatch));
            }
            Err(e) => {
                warn!(self.context.logger, "ALLOCATE for {} failed: {}", sender, e);
                return Ok(self.reject(request, sender, ErrorCode::ServerError));
            }
        };
        info!(
            self.context.logger,
            "ALLOCATE {} C:[{}] with R:[{}]",
            credentials.username.text().unwrap_or_default(),
            sender,
            relay
        );

        let mut reply = Message::reply_to(request);
        reply
            .set_attribute(Attribute::lifetime(self.settings.lifetime))
            .set_attribute(Attribute::software(&self.settings.software_name))
            .set_attribute(credentials.realm.clone());
        let xor_relayed = Attribute::xor_relayed_address(&relay, &reply);
        let xor_mapped = Attribute::xor_mapped_address(&sender, &reply);
        reply.set_attribute(xor_relayed).set_attribute(xor_mapped);
        reply
            .sign(&credentials.password, &credentials.username, &credentials.realm)?
            .add_fingerprint();
        Ok(Some(self.respond(&reply, sender)))
    }

    fn create_permission(&self, registry: &mut Registry, request: &Message, sender: Address) -> Result<Option<Transmit>, TurnError> {
        let peer = match request.require(AttributeKind::XorPeerAddress) {
            Ok(peer) => peer.address(request)?,
            Err(e) => {
                debug!(self.context.logger, "PERMISSION from {}: {}", sender, e);
                return Ok(self.reject(request, sender, ErrorCode::BadRequest));
            }
        };

        match registry.pair(&sender, &peer, Instant::now()) {
            Ok(relay) => info!(self.context.logger, "PERMISSION R:[{}] paired with R:[{}]", relay, peer),
            Err(RegistryError::LookupMiss(missing)) => {
                debug!(self.context.logger, "PERMISSION from {}: no allocation for {}", sender, missing);
                return Ok(self.reject(request, sender, ErrorCode::AllocationMismatch));
            }
            Err(e) => return Err(e.into()),
        }

        let mut reply = Message::reply_to(request);
        reply.set_attribute(Attribute::software(&self.settings.software_name));
        let xor_mapped = Attribute::xor_mapped_address(&sender, &reply);
        reply.set_attribute(xor_mapped);
        self.seal(&mut reply, request, true)?;
        Ok(Some(self.respond(&reply, sender)))
    }

    /**
     * Forward DATA to the client owning the addressed peer relay, as a DATA
     * indication sent from the listening socket.
     */
    fn send(&self, registry: &mut Registry, request: &Message, sender: Address) -> Result<Option<Transmit>, TurnError> {
        let (peer, data) = match (
            request.require(AttributeKind::XorPeerAddress),
            request.require(AttributeKind::Data),
        ) {
            (Ok(peer), Ok(data)) => (peer.address(request)?, data.value()),
            (Err(e), _) | (_, Err(e)) => {
                debug!(self.context.logger, "SEND from {}: {}", sender, e);
                return Ok(self.reject(request, sender, ErrorCode::BadRequest));
            }
        };
        if data.len() > MAX_RELAYED_DATA {
            return Err(TurnError::Oversized(data.len()));
        }

        let route = match registry.route(&sender, Some(&peer), Instant::now()) {
            Ok(route) => route,
            Err(RegistryError::LookupMiss(missing)) => {
                debug!(self.context.logger, "SEND from {}: no allocation for {}", sender, missing);
                return Ok(self.reject(request, sender, ErrorCode::AllocationMismatch));
            }
            Err(RegistryError::NoPermission { relay, peer }) => {
                debug!(self.context.logger, "SEND from R:[{}] to R:[{}] without permission", relay, peer);
                return Ok(self.reject(request, sender, ErrorCode::Forbidden));
            }
            Err(e) => return Err(e.into()),
        };

        let mut indication = Message::new(Class::Indication, Method::Data);
        indication.set_attribute(Attribute::data(data));
        let xor_peer = Attribute::xor_peer_address(&route.relay, &indication);
        indication.set_attribute(xor_peer);
        Ok(Some(Transmit {
            to: route.peer_client,
            data: indication.serialize(),
        }))
    }

    fn channel_bind(&self, registry: &mut Registry, request: &Message, sender: Address) -> Result<Option<Transmit>, TurnError> {
        if let (Some(channel), Some(peer)) = (
            request.attribute(AttributeKind::ChannelNumber),
            request.attribute(AttributeKind::XorPeerAddress),
        ) {
            let channel = channel.channel()?;
            if !CHANNEL_RANGE.contains(&channel) {
                return Ok(self.reject(request, sender, ErrorCode::BadRequest));
            }
            let peer = peer.address(request)?;
            if let Err(e) = registry.bind_channel(&sender, channel, peer, Instant::now()) {
                debug!(self.context.logger, "CHANNEL_BIND from {}: {}", sender, e);
                return Ok(self.reject(request, sender, ErrorCode::AllocationMismatch));
            }
            info!(self.context.logger, "CHANNEL 0x{:04x} of C:[{}] bound to {}", channel, sender, peer);
        }

        let mut reply = Message::reply_to(request);
        self.seal(&mut reply, request, false)?;
        Ok(Some(self.respond(&reply, sender)))
    }
}

#[async_trait]
impl<A: CredentialStore + Send + Sync + 'static> MessageProcessor for TurnMessageProcessor<A> {
    async fn process_message(
        &self,
        registry: &mut Registry,
        input: &[u8],
        sender: Address,
    ) -> Result<Option<Transmit>, TurnError> {
        let request = Message::parse_with(input, UnknownAttributes::Skip)?;
        trace!(
            self.context.logger,
            "-->-- [{}]: {}",
            hex::encode(request.transaction_id()),
            utils::hex_encode_delimited(input)
        );

        if Message::verify_fingerprint_bytes(input) == Some(false) {
            return Err(TurnError::BadFingerprint);
        }

        match request.class() {
            Class::Response | Class::Error => {
                debug!(self.context.logger, "discarding response from {}", sender);
                return Ok(None);
            }
            Class::Indication if request.method() != Some(Method::Send) => {
                debug!(self.context.logger, "ignoring indication 0x{:04x} from {}", request.type_field(), sender);
                return Ok(None);
            }
            _ => {}
        }

        match request.method() {
            Some(Method::Binding) => Ok(Some(self.respond(&self.binding(&request, sender), sender))),
            Some(Method::Allocate) => self.allocate(registry, &request, input, sender).await,
            Some(Method::CreatePermission) => self.create_permission(registry, &request, sender),
            Some(Method::Send) => self.send(registry, &request, sender),
            Some(Method::ChannelBind) => self.channel_bind(registry, &request, sender),
            _ => {
                debug!(
                    self.context.logger,
                    "no handler for method 0x{:03x} from {}",
                    request.method_number(),
                    sender
                );
                Ok(None)
            }
        }
    }

    fn process_peer_data(
        &self,
        registry: &mut Registry,
        relay: Address,
        input: &[u8],
        sender: Address,
    ) -> Result<Option<Transmit>, TurnError> {
        let allocation = registry
            .by_relay(&relay)
            .ok_or(RegistryError::LookupMiss(relay))?;
        if allocation.peer_address() != Some(sender) {
            return Err(RegistryError::NoPermission { relay, peer: sender }.into());
        }
        if input.len() > MAX_RELAYED_DATA {
            return Err(TurnError::Oversized(input.len()));
        }
        let client = allocation.client_address();
        registry.touch(&relay, Instant::now());

        let mut indication = Message::new(Class::Indication, Method::Data);
        indication.set_attribute(Attribute::data(input));
        let xor_peer = Attribute::xor_peer_address(&sender, &indication);
        indication.set_attribute(xor_peer);
        Ok(Some(Transmit {
            to: client,
            data: indication.serialize(),
        }))
    }
}
