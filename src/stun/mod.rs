/**
 * The STUN wire codec: message header, attribute TLVs, XOR'ed addresses,
 * MESSAGE-INTEGRITY and FINGERPRINT (RFC 5389, RFC 5766).
 */

pub mod attribute;
pub mod defs;
pub mod error;
pub mod message;
mod util;

/// length of a STUN header is 20 bytes
pub(crate) const HEADER_LENGTH: u16 = 20;

/// This value is included in STUN messages to help differentiate them from other types of network traffic and to
/// ensure that the messages are processed correctly by STUN servers and clients. The Magic Cookie value is 0x2112A442
pub(crate) const MAGIC_COOKIE: u32 = 0x2112A442;

pub use attribute::{Attribute, UnknownAttributes};
pub use defs::{AttributeKind, Class, ErrorCode, Method};
pub use error::StunError;
pub use message::Message;
