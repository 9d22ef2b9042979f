/**
 * STUN attribute TLV codec, see RFC 5389 Section 15
 * https://datatracker.ietf.org/doc/html/rfc5389#section-15
 *
 * Attributes that need message context (XOR'ed addresses, MESSAGE-INTEGRITY,
 * FINGERPRINT) take the owning message as an explicit parameter.
 */
use rand::RngCore;

use crate::net::address::{Address, FAMILY_IPV4, FAMILY_IPV6};

use super::{
    defs::{AttributeKind, ErrorCode},
    error::StunError,
    message::Message,
    util::{self, FINGERPRINT_XOR, INTEGRITY_LENGTH},
};

/// Length of a TLV header (kind + length)
pub(crate) const ATTRIBUTE_HEADER_LENGTH: usize = 4;

/// Protocol number of UDP in REQUESTED-TRANSPORT
pub(crate) const TRANSPORT_UDP: u8 = 0x11;

/**
 * What to do with attribute kinds outside the known registry while parsing.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownAttributes {
    /// Fail the parse with `UnknownAttributeKind`
    Reject,
    /// Drop the attribute and keep walking
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    kind: AttributeKind,
    value: Vec<u8>,
}

/**
 * Decoded attribute value, one variant per value shape.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    Address(Address),
    Text(String),
    Bytes(Vec<u8>),
    Integer(u32),
    Error { code: u16, reason: String },
    Transport(u8),
    Channel(u16),
    Flag,
}

impl Attribute {
    pub fn new(kind: AttributeKind, value: Vec<u8>) -> Self {
        Self { kind, value }
    }

    pub fn kind(&self) -> AttributeKind {
        self.kind
    }

    /// Raw, unpadded value bytes
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn padding(&self) -> usize {
        (4 - self.value.len() % 4) % 4
    }

    /// Size on the wire: TLV header, value and padding
    pub fn encoded_len(&self) -> usize {
        ATTRIBUTE_HEADER_LENGTH + self.value.len() + self.padding()
    }

    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.kind.code().to_be_bytes());
        out.extend_from_slice(&(self.value.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.value);
        out.extend_from_slice(&[0u8; 3][..self.padding()]);
    }

    /**
     * Walk the attribute section of a message. The iterator stops after the
     * first error.
     */
    pub fn parse(bytes: &[u8], unknown: UnknownAttributes) -> AttributeIter<'_> {
        AttributeIter {
            bytes,
            offset: 0,
            unknown,
            done: false,
        }
    }

    pub fn username(name: &str) -> Self {
        Self::new(AttributeKind::Username, name.as_bytes().to_vec())
    }

    pub fn realm(realm: &str) -> Self {
        Self::new(AttributeKind::Realm, realm.as_bytes().to_vec())
    }

    pub fn software(name: &str) -> Self {
        Self::new(AttributeKind::Software, name.as_bytes().to_vec())
    }

    pub fn data(payload: &[u8]) -> Self {
        Self::new(AttributeKind::Data, payload.to_vec())
    }

    /**
     * A fresh NONCE: 16 random bytes, hex encoded so the value stays within
     * the quoted-string character set.
     */
    pub fn nonce() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self::new(AttributeKind::Nonce, hex::encode(bytes).into_bytes())
    }

    pub fn lifetime(seconds: u32) -> Self {
        Self::new(AttributeKind::Lifetime, seconds.to_be_bytes().to_vec())
    }

    /// Protocol byte followed by three RFFU bytes
    #[cfg(test)]
    pub fn requested_transport(protocol: u8) -> Self {
        Self::new(AttributeKind::RequestedTransport, vec![protocol, 0, 0, 0])
    }

    /// Channel number followed by two RFFU bytes
    #[cfg(test)]
    pub fn channel_number(channel: u16) -> Self {
        let [hi, lo] = channel.to_be_bytes();
        Self::new(AttributeKind::ChannelNumber, vec![hi, lo, 0, 0])
    }

    pub fn error_code(code: ErrorCode) -> Self {
        Self::error_code_with_reason(code.code(), code.reason())
    }

    /**
     * ERROR-CODE value: 21 reserved bits, 3 bits of class (hundreds), 8 bits
     * of number (code modulo 100), then the UTF-8 reason phrase.
     */
    pub fn error_code_with_reason(code: u16, reason: &str) -> Self {
        let mut value = vec![0, 0, (code / 100) as u8 & 0x07, (code % 100) as u8];
        value.extend_from_slice(reason.as_bytes());
        Self::new(AttributeKind::ErrorCode, value)
    }

    pub fn mapped_address(address: &Address) -> Self {
        Self::new(AttributeKind::MappedAddress, encode_address(address, None))
    }

    /**
     * An XOR'ed address attribute of the given kind. The mask is the owning
     * message's cookie followed by its transaction id.
     */
    pub fn xor_address(kind: AttributeKind, address: &Address, message: &Message) -> Self {
        Self::new(kind, encode_address(address, Some(&message.xor_mask())))
    }

    pub fn xor_mapped_address(address: &Address, message: &Message) -> Self {
        Self::xor_address(AttributeKind::XorMappedAddress, address, message)
    }

    pub fn xor_peer_address(address: &Address, message: &Message) -> Self {
        Self::xor_address(AttributeKind::XorPeerAddress, address, message)
    }

    pub fn xor_relayed_address(address: &Address, message: &Message) -> Self {
        Self::xor_address(AttributeKind::XorRelayedAddress, address, message)
    }

    /**
     * Compute MESSAGE-INTEGRITY for `message`.
     *
     * The HMAC-SHA1 covers the message up to (not including) any existing
     * MESSAGE-INTEGRITY or FINGERPRINT, with the header length rewritten as if
     * the 24-byte integrity attribute were already appended. The key is
     * MD5("username:realm:password"). `message` is not modified.
     */
    pub fn message_integrity(
        password: &str,
        username: &Attribute,
        realm: &Attribute,
        message: &Message,
    ) -> Result<Self, StunError> {
        let username = username.text()?;
        let realm = realm.text()?;
        let key = util::long_term_key(&username, &realm, password);
        Self::message_integrity_with_key(&key, message)
    }

    fn message_integrity_with_key(key: &[u8], message: &Message) -> Result<Self, StunError> {
        let input = message.encode_until(
            &[AttributeKind::MessageIntegrity, AttributeKind::Fingerprint],
            (ATTRIBUTE_HEADER_LENGTH + INTEGRITY_LENGTH) as u16,
        );
        let digest = util::hmac_sha1(key, &input)?;
        Ok(Self::new(AttributeKind::MessageIntegrity, digest.to_vec()))
    }

    /**
     * Compute FINGERPRINT for `message`: CRC32 over the message up to any
     * existing FINGERPRINT, header length counting the 8-byte fingerprint
     * attribute, XOR'ed with "STUN".
     */
    pub fn fingerprint(message: &Message) -> Self {
        let input = message.encode_until(&[AttributeKind::Fingerprint], 8);
        let crc = util::calculate_local_fingerprint(&input) ^ FINGERPRINT_XOR;
        Self::new(AttributeKind::Fingerprint, crc.to_be_bytes().to_vec())
    }

    /**
     * Decode the value according to its kind.
     */
    pub fn decode(&self, message: &Message) -> Result<AttributeValue, StunError> {
        use AttributeKind::*;
        match self.kind {
            MappedAddress | AlternateServer | ResponseOrigin | OtherAddress => {
                Ok(AttributeValue::Address(decode_address(self.kind, &self.value, None)?))
            }
            XorMappedAddress | XorPeerAddress | XorRelayedAddress => Ok(AttributeValue::Address(
                decode_address(self.kind, &self.value, Some(&message.xor_mask()))?,
            )),
            Username | Realm | Nonce | Software | AlternateDomain => {
                Ok(AttributeValue::Text(self.text()?))
            }
            Lifetime | Priority | Fingerprint | CacheTimeout => {
                Ok(AttributeValue::Integer(self.integer()?))
            }
            AttributeKind::ErrorCode => {
                let (code, reason) = self.error()?;
                Ok(AttributeValue::Error { code, reason })
            }
            RequestedTransport => Ok(AttributeValue::Transport(self.transport()?)),
            ChannelNumber => Ok(AttributeValue::Channel(self.channel()?)),
            DontFragment | UseCandidate => Ok(AttributeValue::Flag),
            MessageIntegrity
            | AttributeKind::UnknownAttributes
            | Data
            | RequestedAddressFamily
            | EvenPort
            | AccessToken
            | MessageIntegritySha256
            | PasswordAlgorithm
            | Userhash
            | ReservationToken
            | Padding
            | ResponsePort
            | ConnectionId
            | AdditionalAddressFamily
            | AddressErrorCode
            | PasswordAlgorithms
            | Icmp
            | TransactionTransmitCounter
            | IceControlled
            | IceControlling
            | EcnCheck
            | ThirdPartyAuthorization
            | MobilityTicket
            | CiscoStunFlowdata
            | EnfFlowDescription
            | EnfNetworkStatus
            | CiscoWebexFlowInfo
            | CitrixTransactionId
            | GoogNetworkInfo
            | GoogLastIceCheckReceived
            | GoogMiscInfo
            | GoogObsolete1
            | GoogConnectionId
            | GoogDelta
            | GoogDeltaAck
            | GoogDeltaSyncReq
            | GoogMessageIntegrity32 => Ok(AttributeValue::Bytes(self.value.clone())),
        }
    }

    /**
     * Address carried by an address attribute, un-XOR'ing when the kind calls for it.
     */
    pub fn address(&self, message: &Message) -> Result<Address, StunError> {
        match self.decode(message)? {
            AttributeValue::Address(address) => Ok(address),
            _ => Err(StunError::InvalidAttribute(self.kind)),
        }
    }

    pub fn text(&self) -> Result<String, StunError> {
        String::from_utf8(self.value.clone()).map_err(|_| StunError::InvalidAttribute(self.kind))
    }

    pub fn integer(&self) -> Result<u32, StunError> {
        let bytes: [u8; 4] = self
            .value
            .as_slice()
            .try_into()
            .map_err(|_| StunError::InvalidAttribute(self.kind))?;
        Ok(u32::from_be_bytes(bytes))
    }

    pub fn error(&self) -> Result<(u16, String), StunError> {
        if self.value.len() < 4 {
            return Err(StunError::InvalidAttribute(self.kind));
        }
        let code = (self.value[2] & 0x07) as u16 * 100 + self.value[3] as u16;
        let reason = String::from_utf8_lossy(&self.value[4..]).to_string();
        Ok((code, reason))
    }

    pub fn transport(&self) -> Result<u8, StunError> {
        self.value
            .first()
            .copied()
            .ok_or(StunError::InvalidAttribute(self.kind))
    }

    pub fn channel(&self) -> Result<u16, StunError> {
        if self.value.len() < 2 {
            return Err(StunError::InvalidAttribute(self.kind));
        }
        Ok(u16::from_be_bytes([self.value[0], self.value[1]]))
    }
}

/**
 * Address attribute value: [0x00, family, port (2), address (4 or 16)].
 * With a mask, port and address are XOR'ed with its leading bytes.
 */
fn encode_address(address: &Address, mask: Option<&[u8; 16]>) -> Vec<u8> {
    let mut value = vec![0x00, address.family()];
    value.extend(xor(&address.port_octets(), mask));
    value.extend(xor(&address.ip_octets(), mask));
    value
}

fn decode_address(
    kind: AttributeKind,
    value: &[u8],
    mask: Option<&[u8; 16]>,
) -> Result<Address, StunError> {
    if value.len() < 4 {
        return Err(StunError::InvalidAttribute(kind));
    }
    let ip_length = match value[1] {
        FAMILY_IPV4 => 4,
        FAMILY_IPV6 => 16,
        _ => return Err(StunError::InvalidAttribute(kind)),
    };
    if value.len() != 4 + ip_length {
        return Err(StunError::InvalidAttribute(kind));
    }

    let port = xor(&value[2..4], mask);
    let ip = xor(&value[4..], mask);
    let ip = match ip_length {
        4 => {
            let octets: [u8; 4] = ip.try_into().map_err(|_| StunError::InvalidAttribute(kind))?;
            std::net::IpAddr::from(octets)
        }
        _ => {
            let octets: [u8; 16] = ip.try_into().map_err(|_| StunError::InvalidAttribute(kind))?;
            std::net::IpAddr::from(octets)
        }
    };
    Ok(Address::new(ip, Some(u16::from_be_bytes([port[0], port[1]]))))
}

fn xor(bytes: &[u8], mask: Option<&[u8; 16]>) -> Vec<u8> {
    match mask {
        Some(mask) => bytes.iter().zip(mask.iter()).map(|(b, m)| b ^ m).collect(),
        None => bytes.to_vec(),
    }
}

/**
 * Lazy walk over sequential attribute TLVs. Finite and not restartable.
 */
pub struct AttributeIter<'a> {
    bytes: &'a [u8],
    offset: usize,
    unknown: UnknownAttributes,
    done: bool,
}

impl<'a> Iterator for AttributeIter<'a> {
    type Item = Result<Attribute, StunError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done && self.offset < self.bytes.len() {
            let rest = &self.bytes[self.offset..];
            if rest.len() < ATTRIBUTE_HEADER_LENGTH {
                self.done = true;
                return Some(Err(StunError::TruncatedAttribute {
                    kind: if rest.len() >= 2 { u16::from_be_bytes([rest[0], rest[1]]) } else { 0 },
                    needed: ATTRIBUTE_HEADER_LENGTH,
                    available: rest.len(),
                }));
            }

            let code = u16::from_be_bytes([rest[0], rest[1]]);
            let length = u16::from_be_bytes([rest[2], rest[3]]) as usize;
            let end = ATTRIBUTE_HEADER_LENGTH + length;
            if end > rest.len() {
                self.done = true;
                return Some(Err(StunError::TruncatedAttribute {
                    kind: code,
                    needed: end,
                    available: rest.len(),
                }));
            }

            // padding of the final attribute may be missing on the wire
            let padded = end + (4 - length % 4) % 4;
            self.offset += padded.min(rest.len());

            match AttributeKind::from_code(code) {
                Some(kind) => {
                    return Some(Ok(Attribute::new(
                        kind,
                        rest[ATTRIBUTE_HEADER_LENGTH..end].to_vec(),
                    )))
                }
                None if self.unknown == UnknownAttributes::Skip => continue,
                None => {
                    self.done = true;
                    return Some(Err(StunError::UnknownAttributeKind(code)));
                }
            }
        }
        None
    }
}
