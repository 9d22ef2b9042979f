/**
 * A STUN message: 20-byte header plus attributes.
 * See RFC 5389 Section 6 for details
 * https://datatracker.ietf.org/doc/html/rfc5389#section-6
 *
 */
use rand::RngCore;

use super::{
    attribute::{Attribute, UnknownAttributes, ATTRIBUTE_HEADER_LENGTH},
    defs::{decode_method, AttributeKind, Class, Method, METHOD_MASK},
    error::StunError,
    util::{self, INTEGRITY_LENGTH},
    HEADER_LENGTH, MAGIC_COOKIE,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    type_field: u16,
    cookie: [u8; 4],
    transaction_id: [u8; 12],
    /// At most one attribute per kind, kept in insertion order
    attributes: Vec<Attribute>,
}

impl Message {
    /**
     * Create an outgoing message with the magic cookie and a random
     * transaction id.
     */
    pub fn new(class: Class, method: Method) -> Self {
        let mut transaction_id = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut transaction_id);
        Self {
            type_field: class.bits() | method.to_type_bits(),
            cookie: MAGIC_COOKIE.to_be_bytes(),
            transaction_id,
            attributes: Vec::new(),
        }
    }

    /**
     * A reply skeleton for `request`: same method, cookie and transaction id,
     * class RESPONSE, no attributes. `request` is left untouched.
     */
    pub fn reply_to(request: &Message) -> Self {
        let mut reply = Self {
            type_field: request.type_field,
            cookie: request.cookie,
            transaction_id: request.transaction_id,
            attributes: Vec::new(),
        };
        reply.set_class(Class::Response);
        reply
    }

    /**
     * Parse a datagram, rejecting unknown attribute kinds.
     */
    pub fn parse(bytes: &[u8]) -> Result<Self, StunError> {
        Self::parse_with(bytes, UnknownAttributes::Reject)
    }

    /**
     * Parse a datagram. Fails when the header is short, the top two bits of
     * the type are set, the magic cookie is wrong or the declared length
     * exceeds the buffer. Bytes past the declared length are ignored.
     */
    pub fn parse_with(bytes: &[u8], unknown: UnknownAttributes) -> Result<Self, StunError> {
        let header = HEADER_LENGTH as usize;
        if bytes.len() < header {
            return Err(StunError::MalformedHeader("message is shorter than the header"));
        }

        let type_field = u16::from_be_bytes([bytes[0], bytes[1]]);
        let length = u16::from_be_bytes([bytes[2], bytes[3]]) as usize;
        let mut cookie = [0u8; 4];
        cookie.copy_from_slice(&bytes[4..8]);
        let mut transaction_id = [0u8; 12];
        transaction_id.copy_from_slice(&bytes[8..20]);

        if type_field & 0xC000 != 0 {
            return Err(StunError::MalformedHeader("leading type bits are not zero"));
        }
        if u32::from_be_bytes(cookie) != MAGIC_COOKIE {
            return Err(StunError::MalformedHeader("invalid magic cookie"));
        }
        if length % 4 != 0 {
            return Err(StunError::MalformedHeader("length is not a multiple of 4"));
        }
        if header + length > bytes.len() {
            return Err(StunError::MalformedHeader("declared length exceeds the datagram"));
        }

        let mut message = Self {
            type_field,
            cookie,
            transaction_id,
            attributes: Vec::new(),
        };
        for attribute in Attribute::parse(&bytes[header..header + length], unknown) {
            message.set_attribute(attribute?);
        }
        Ok(message)
    }

    /**
     * Serialize header and attributes. The length field is recomputed from
     * the current attributes every time.
     */
    pub fn serialize(&self) -> Vec<u8> {
        self.encode_attributes(&self.attributes, 0)
    }

    /**
     * Serialize the attributes that precede the first attribute of any kind
     * in `stops`, with the header length increased by `trailing` bytes. This
     * is the input to MESSAGE-INTEGRITY and FINGERPRINT.
     */
    pub(crate) fn encode_until(&self, stops: &[AttributeKind], trailing: u16) -> Vec<u8> {
        let end = self
            .attributes
            .iter()
            .position(|a| stops.contains(&a.kind()))
            .unwrap_or(self.attributes.len());
        self.encode_attributes(&self.attributes[..end], trailing)
    }

    /**
     * The header length field saturates at `u16::MAX`. Callers keep relayed
     * payloads below `MAX_RELAYED_DATA` so real messages never get there.
     */
    fn encode_attributes(&self, attributes: &[Attribute], trailing: u16) -> Vec<u8> {
        let length: usize = attributes.iter().map(Attribute::encoded_len).sum();
        let field = u16::try_from(length).unwrap_or(u16::MAX).saturating_add(trailing);
        let mut out = Vec::with_capacity(HEADER_LENGTH as usize + length);
        out.extend_from_slice(&self.type_field.to_be_bytes());
        out.extend_from_slice(&field.to_be_bytes());
        out.extend_from_slice(&self.cookie);
        out.extend_from_slice(&self.transaction_id);
        for attribute in attributes {
            attribute.encode_into(&mut out);
        }
        out
    }

    pub fn type_field(&self) -> u16 {
        self.type_field
    }

    pub fn transaction_id(&self) -> &[u8; 12] {
        &self.transaction_id
    }

    #[cfg(test)]
    pub fn set_transaction_id(&mut self, transaction_id: [u8; 12]) -> &mut Self {
        self.transaction_id = transaction_id;
        self
    }

    /// Cookie followed by transaction id, the mask for XOR'ed addresses
    pub fn xor_mask(&self) -> [u8; 16] {
        let mut mask = [0u8; 16];
        mask[..4].copy_from_slice(&self.cookie);
        mask[4..].copy_from_slice(&self.transaction_id);
        mask
    }

    pub fn class(&self) -> Class {
        Class::from_type(self.type_field)
    }

    pub fn set_class(&mut self, class: Class) -> &mut Self {
        self.type_field = (self.type_field & METHOD_MASK) | class.bits();
        self
    }

    /// The method number, whether or not it is a known method
    pub fn method_number(&self) -> u16 {
        decode_method(self.type_field)
    }

    pub fn method(&self) -> Option<Method> {
        Method::from_number(self.method_number())
    }

    #[cfg(test)]
    pub fn set_method(&mut self, method: Method) -> &mut Self {
        self.type_field = (self.type_field & super::defs::CLASS_MASK) | method.to_type_bits();
        self
    }

    pub fn attribute(&self, kind: AttributeKind) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.kind() == kind)
    }

    pub fn require(&self, kind: AttributeKind) -> Result<&Attribute, StunError> {
        self.attribute(kind).ok_or(StunError::MissingAttribute(kind))
    }

    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }

    /**
     * Add an attribute. An attribute of the same kind is replaced in place.
     */
    pub fn set_attribute(&mut self, attribute: Attribute) -> &mut Self {
        match self.attributes.iter_mut().find(|a| a.kind() == attribute.kind()) {
            Some(existing) => *existing = attribute,
            None => self.attributes.push(attribute),
        }
        self
    }

    #[cfg(test)]
    pub fn remove_attribute(&mut self, kind: AttributeKind) -> Option<Attribute> {
        let index = self.attributes.iter().position(|a| a.kind() == kind)?;
        Some(self.attributes.remove(index))
    }

    /**
     * Append MESSAGE-INTEGRITY computed over everything set so far.
     */
    pub fn sign(&mut self, password: &str, username: &Attribute, realm: &Attribute) -> Result<&mut Self, StunError> {
        let integrity = Attribute::message_integrity(password, username, realm, self)?;
        Ok(self.set_attribute(integrity))
    }

    /**
     * Append FINGERPRINT computed over everything set so far. Must be the
     * last attribute added.
     */
    pub fn add_fingerprint(&mut self) -> &mut Self {
        let fingerprint = Attribute::fingerprint(self);
        self.set_attribute(fingerprint)
    }

    /**
     * Check the FINGERPRINT attribute. `None` when the message has none.
     */
    pub fn verify_fingerprint(&self) -> Option<bool> {
        let received = self.attribute(AttributeKind::Fingerprint)?;
        Some(Attribute::fingerprint(self).value() == received.value())
    }

    /**
     * Check a trailing FINGERPRINT on the raw datagram. Unlike
     * `verify_fingerprint` this also covers attributes a lenient parse
     * skipped. `None` when the message does not end in a FINGERPRINT.
     */
    pub fn verify_fingerprint_bytes(bytes: &[u8]) -> Option<bool> {
        let header = HEADER_LENGTH as usize;
        let length = u16::from_be_bytes([*bytes.get(2)?, *bytes.get(3)?]) as usize;
        let end = header + length;
        if length < 8 || end > bytes.len() {
            return None;
        }
        let trailer = &bytes[end - 8..end];
        if u16::from_be_bytes([trailer[0], trailer[1]]) != AttributeKind::Fingerprint.code() {
            return None;
        }
        let expected = util::calculate_local_fingerprint(&bytes[..end - 8]) ^ util::FINGERPRINT_XOR;
        Some(expected.to_be_bytes()[..] == trailer[4..])
    }

    /**
     * Check MESSAGE-INTEGRITY on the raw datagram against the long-term
     * credential. The HMAC input is every byte before the attribute, with
     * the header length ending at it. `Ok(None)` when there is none.
     */
    pub fn verify_integrity(
        bytes: &[u8],
        password: &str,
        username: &Attribute,
        realm: &Attribute,
    ) -> Result<Option<bool>, StunError> {
        let Some(offset) = Self::raw_attribute_offset(bytes, AttributeKind::MessageIntegrity) else {
            return Ok(None);
        };
        let value_start = offset + ATTRIBUTE_HEADER_LENGTH;
        let received = bytes
            .get(value_start..value_start + INTEGRITY_LENGTH)
            .ok_or(StunError::InvalidAttribute(AttributeKind::MessageIntegrity))?;

        let covered = value_start + INTEGRITY_LENGTH - HEADER_LENGTH as usize;
        let covered = u16::try_from(covered).map_err(|_| StunError::MalformedHeader("length overflows"))?;
        let mut input = bytes[..offset].to_vec();
        input[2..4].copy_from_slice(&covered.to_be_bytes());

        let key = util::long_term_key(&username.text()?, &realm.text()?, password);
        Ok(Some(util::hmac_sha1(&key, &input)?[..] == *received))
    }

    /// Offset of the first attribute of `kind` that lies within the declared length
    fn raw_attribute_offset(bytes: &[u8], kind: AttributeKind) -> Option<usize> {
        let header = HEADER_LENGTH as usize;
        let length = u16::from_be_bytes([*bytes.get(2)?, *bytes.get(3)?]) as usize;
        let end = (header + length).min(bytes.len());
        let mut offset = header;
        while offset + ATTRIBUTE_HEADER_LENGTH <= end {
            let code = u16::from_be_bytes([bytes[offset], bytes[offset + 1]]);
            let value_length = u16::from_be_bytes([bytes[offset + 2], bytes[offset + 3]]) as usize;
            let next = offset + ATTRIBUTE_HEADER_LENGTH + value_length;
            if next > end {
                return None;
            }
            if code == kind.code() {
                return Some(offset);
            }
            offset = next + (4 - value_length % 4) % 4;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::address::Address;
    use crate::stun::attribute::AttributeValue;

    const FINGERPRINT_FIXTURE: &str = "0001004c2112a4424f382f645079454e376a6e7a0006000974686f353a55365555000000c0570004000003e7802900082b2c9a309840e50b002400046e001fff0008001429fae316e202f50b0698c30d11972968c14f81cd80280004c34c7260";

    const INTEGRITY_FIXTURE: &str = "010300482112a4426544462f4342307375574852001600080001c2535e12a443000d000400000258002000080001ebd55e12a443802200096e6f64652d7475726e0000000008001402e293416c1accd279be0a2d4e26f90479235711";

    fn fixture(hex_str: &str) -> Vec<u8> {
        hex::decode(hex_str).unwrap()
    }

    #[test]
    fn test_parse_fingerprint_fixture() {
        let bytes = fixture(FINGERPRINT_FIXTURE);
        let msg = Message::parse(&bytes).unwrap();

        assert_eq!(msg.type_field(), 0x0001);
        assert_eq!(msg.class(), Class::Request);
        assert_eq!(msg.method(), Some(Method::Binding));
        assert_eq!(&bytes[2..4], &[0x00, 0x4c]);
        assert_eq!(msg.attributes().count(), 6);
        assert_eq!(
            msg.attribute(AttributeKind::Username).unwrap().text().unwrap(),
            "tho5:U6UU"
        );
        assert_eq!(msg.serialize(), bytes);
    }

    #[test]
    fn test_fingerprint_recomputed() {
        let bytes = fixture(FINGERPRINT_FIXTURE);
        let original = Message::parse(&bytes).unwrap();
        assert_eq!(original.verify_fingerprint(), Some(true));

        let mut modified = original.clone();
        modified.remove_attribute(AttributeKind::Fingerprint);
        modified.add_fingerprint();
        assert_eq!(
            modified.attribute(AttributeKind::Fingerprint).unwrap().value(),
            [0xc3, 0x4c, 0x72, 0x60]
        );
        assert_eq!(modified.serialize(), bytes);

        // any other attribute byte changes the fingerprint
        let mut tampered = original.clone();
        tampered.set_attribute(Attribute::username("tho5:U6UV"));
        assert_eq!(tampered.verify_fingerprint(), Some(false));
        tampered.add_fingerprint();
        assert_ne!(
            tampered.attribute(AttributeKind::Fingerprint).unwrap().value(),
            [0xc3, 0x4c, 0x72, 0x60]
        );
    }

    #[test]
    fn test_message_integrity_recomputed() {
        let bytes = fixture(INTEGRITY_FIXTURE);
        let original = Message::parse(&bytes).unwrap();
        assert_eq!(original.class(), Class::Response);
        assert_eq!(original.method(), Some(Method::Allocate));

        let username = Attribute::username("nwnisworking");
        let realm = Attribute::realm("atlantis-software.net");

        let mut modified = original.clone();
        let removed = modified.remove_attribute(AttributeKind::MessageIntegrity).unwrap();
        let integrity =
            Attribute::message_integrity("password", &username, &realm, &modified).unwrap();
        assert_eq!(integrity.value(), removed.value());
        assert_eq!(hex::encode(integrity.value()), "02e293416c1accd279be0a2d4e26f90479235711");

        // computing on the original skips its own integrity attribute
        let again = Attribute::message_integrity("password", &username, &realm, &original).unwrap();
        assert_eq!(again, integrity);

        assert_eq!(Message::verify_integrity(&bytes, "password", &username, &realm), Ok(Some(true)));
        assert_eq!(Message::verify_integrity(&bytes, "wrong", &username, &realm), Ok(Some(false)));
        let unsigned = modified.serialize();
        assert_eq!(Message::verify_integrity(&unsigned, "password", &username, &realm), Ok(None));
    }

    #[test]
    fn test_integrity_fixture_addresses() {
        let msg = Message::parse(&fixture(INTEGRITY_FIXTURE)).unwrap();
        let relayed = msg.attribute(AttributeKind::XorRelayedAddress).unwrap();
        assert_eq!(relayed.address(&msg).unwrap(), "127.0.0.1:58177".parse::<Address>().unwrap());
        assert_eq!(
            msg.attribute(AttributeKind::Lifetime).unwrap().decode(&msg).unwrap(),
            AttributeValue::Integer(600)
        );
        assert_eq!(
            msg.attribute(AttributeKind::Software).unwrap().text().unwrap(),
            "node-turn"
        );
    }

    #[test]
    fn test_sign_then_fingerprint() {
        let mut msg = Message::new(Class::Response, Method::Allocate);
        msg.set_attribute(Attribute::lifetime(300))
            .set_attribute(Attribute::software("turn"));
        let username = Attribute::username("alice");
        let realm = Attribute::realm("example.org");
        msg.sign("secret", &username, &realm).unwrap().add_fingerprint();

        let kinds: Vec<_> = msg.attributes().map(Attribute::kind).collect();
        assert_eq!(
            kinds,
            vec![
                AttributeKind::Lifetime,
                AttributeKind::Software,
                AttributeKind::MessageIntegrity,
                AttributeKind::Fingerprint
            ]
        );

        let bytes = msg.serialize();
        let parsed = Message::parse(&bytes).unwrap();
        assert_eq!(parsed.verify_fingerprint(), Some(true));
        assert_eq!(Message::verify_integrity(&bytes, "secret", &username, &realm), Ok(Some(true)));
    }

    #[test]
    fn test_class_and_method_are_independent() {
        let mut msg = Message::new(Class::Request, Method::Allocate);
        assert_eq!(msg.type_field(), 0x0003);

        msg.set_class(Class::Error);
        assert_eq!(msg.type_field(), 0x0113);
        assert_eq!(msg.method(), Some(Method::Allocate));

        msg.set_method(Method::GoogPing);
        assert_eq!(msg.class(), Class::Error);
        assert_eq!(msg.method(), Some(Method::GoogPing));

        let mut indication = Message::new(Class::Indication, Method::Data);
        assert_eq!(indication.type_field(), 0x0017);
        indication.set_method(Method::Send);
        assert_eq!(indication.type_field(), 0x0016);
        indication.set_class(Class::Request);
        assert_eq!(indication.type_field(), 0x0006);

        for class in [Class::Request, Class::Indication, Class::Response, Class::Error] {
            for method in [Method::Binding, Method::ChannelBind, Method::ConnectionAttempt] {
                let mut msg = Message::new(Class::Response, Method::Refresh);
                msg.set_method(method).set_class(class);
                assert_eq!((msg.class(), msg.method()), (class, Some(method)));
                msg.set_class(class).set_method(method);
                assert_eq!((msg.class(), msg.method()), (class, Some(method)));
            }
        }
    }

    #[test]
    fn test_round_trip() {
        let mut msg = Message::new(Class::Indication, Method::Data);
        let peer: Address = "192.0.2.10:40000".parse().unwrap();
        msg.set_attribute(Attribute::data(b"hello relay"));
        let xor = Attribute::xor_peer_address(&peer, &msg);
        msg.set_attribute(xor);
        msg.set_attribute(Attribute::error_code_with_reason(420, "Unknown"));

        let parsed = Message::parse(&msg.serialize()).unwrap();
        assert_eq!(parsed, msg);
        assert_eq!(
            parsed.attribute(AttributeKind::XorPeerAddress).unwrap().address(&parsed).unwrap(),
            peer
        );
        assert_eq!(parsed.attribute(AttributeKind::Data).unwrap().value(), b"hello relay");
    }

    #[test]
    fn test_length_is_recomputed() {
        let mut msg = Message::new(Class::Request, Method::Binding);
        assert_eq!(&msg.serialize()[2..4], [0, 0]);
        msg.set_attribute(Attribute::software("abcde"));
        assert_eq!(&msg.serialize()[2..4], [0, 12]);
        msg.set_attribute(Attribute::software("abc"));
        assert_eq!(&msg.serialize()[2..4], [0, 8]);
        msg.remove_attribute(AttributeKind::Software);
        assert_eq!(msg.serialize().len(), 20);
    }

    #[test]
    fn test_oversized_length_saturates() {
        let mut msg = Message::new(Class::Indication, Method::Data);
        msg.set_attribute(Attribute::data(&[0u8; 65532]));
        assert_eq!(&msg.serialize()[2..4], [0xff, 0xff]);
        assert_eq!(&msg.encode_until(&[], 24)[2..4], [0xff, 0xff]);
    }

    #[test]
    fn test_require_reports_missing_kind() {
        let mut msg = Message::new(Class::Request, Method::CreatePermission);
        assert_eq!(
            msg.require(AttributeKind::XorPeerAddress),
            Err(StunError::MissingAttribute(AttributeKind::XorPeerAddress))
        );
        msg.set_attribute(Attribute::software("abc"));
        assert_eq!(msg.require(AttributeKind::Software).unwrap().text().unwrap(), "abc");
    }

    #[test]
    fn test_reply_is_independent_copy() {
        let mut request = Message::new(Class::Request, Method::Allocate);
        request.set_attribute(Attribute::username("bob"));

        let mut reply = Message::reply_to(&request);
        reply.set_attribute(Attribute::lifetime(10));

        assert_eq!(reply.class(), Class::Response);
        assert_eq!(reply.method(), Some(Method::Allocate));
        assert_eq!(reply.transaction_id(), request.transaction_id());
        assert!(reply.attribute(AttributeKind::Username).is_none());
        assert!(request.attribute(AttributeKind::Lifetime).is_none());
        assert_eq!(request.class(), Class::Request);
    }

    #[test]
    fn test_malformed_headers() {
        assert_eq!(
            Message::parse(&[0u8; 10]),
            Err(StunError::MalformedHeader("message is shorter than the header"))
        );

        let mut bytes = Message::new(Class::Request, Method::Binding).serialize();
        bytes[4] = 0;
        assert_eq!(
            Message::parse(&bytes),
            Err(StunError::MalformedHeader("invalid magic cookie"))
        );

        let mut bytes = Message::new(Class::Request, Method::Binding).serialize();
        bytes[3] = 8;
        assert_eq!(
            Message::parse(&bytes),
            Err(StunError::MalformedHeader("declared length exceeds the datagram"))
        );

        let mut bytes = Message::new(Class::Request, Method::Binding).serialize();
        bytes[0] = 0x40;
        assert!(Message::parse(&bytes).is_err());
    }

    #[test]
    fn test_fingerprint_over_raw_bytes() {
        let bytes = fixture(FINGERPRINT_FIXTURE);
        assert_eq!(Message::verify_fingerprint_bytes(&bytes), Some(true));

        let mut tampered = bytes.clone();
        tampered[30] ^= 0x01;
        assert_eq!(Message::verify_fingerprint_bytes(&tampered), Some(false));

        let plain = Message::new(Class::Request, Method::Binding).serialize();
        assert_eq!(Message::verify_fingerprint_bytes(&plain), None);
        assert_eq!(Message::verify_fingerprint_bytes(&plain[..2]), None);

        // an attribute the lenient parse drops is still covered
        let mut message = Message::new(Class::Request, Method::Binding);
        let mut raw = message.serialize();
        raw[3] = 8;
        raw.extend_from_slice(&[0x7f, 0x01, 0x00, 0x04, 1, 2, 3, 4]);
        let crc = util::calculate_local_fingerprint(&{
            let mut covered = raw.clone();
            covered[3] = 16;
            covered
        }) ^ util::FINGERPRINT_XOR;
        raw[3] = 16;
        raw.extend_from_slice(&[0x80, 0x28, 0x00, 0x04]);
        raw.extend_from_slice(&crc.to_be_bytes());
        assert_eq!(Message::verify_fingerprint_bytes(&raw), Some(true));

        message = Message::parse_with(&raw, UnknownAttributes::Skip).unwrap();
        assert_eq!(message.verify_fingerprint(), Some(false));
    }

    #[test]
    fn test_integrity_covers_skipped_attributes() {
        let username = Attribute::username("alice");
        let realm = Attribute::realm("example.org");
        let key = util::long_term_key("alice", "example.org", "secret");

        let mut bytes = Message::new(Class::Request, Method::Allocate).serialize();
        bytes.extend_from_slice(&[0x7f, 0x01, 0x00, 0x03, 1, 2, 3, 0]);
        bytes[3] = 8 + 24;
        let mac = util::hmac_sha1(&key, &bytes).unwrap();
        bytes.extend_from_slice(&[0x00, 0x08, 0x00, 0x14]);
        bytes.extend_from_slice(&mac);

        assert_eq!(Message::verify_integrity(&bytes, "secret", &username, &realm), Ok(Some(true)));
        assert_eq!(Message::verify_integrity(&bytes, "other", &username, &realm), Ok(Some(false)));

        // re-encoding drops the unknown attribute, so only the raw check holds
        let lenient = Message::parse_with(&bytes, UnknownAttributes::Skip).unwrap();
        assert_eq!(
            Message::verify_integrity(&lenient.serialize(), "secret", &username, &realm),
            Ok(Some(false))
        );

        // truncated below the declared length
        assert_eq!(Message::verify_integrity(&bytes[..30], "secret", &username, &realm), Ok(None));
    }

    #[test]
    fn test_unknown_attribute_policy() {
        let mut bytes = Message::new(Class::Request, Method::Binding).serialize();
        bytes[3] = 8;
        bytes.extend_from_slice(&[0x7f, 0x01, 0x00, 0x04, 1, 2, 3, 4]);

        assert_eq!(
            Message::parse(&bytes),
            Err(StunError::UnknownAttributeKind(0x7f01))
        );
        let msg = Message::parse_with(&bytes, UnknownAttributes::Skip).unwrap();
        assert_eq!(msg.attributes().count(), 0);
    }
}
