use thiserror::Error;

use super::defs::AttributeKind;

/**
 * Failures while decoding or encoding STUN messages and attributes.
 */
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StunError {
    #[error("malformed STUN header: {0}")]
    MalformedHeader(&'static str),

    #[error("unknown attribute kind 0x{0:04X}")]
    UnknownAttributeKind(u16),

    #[error("attribute 0x{kind:04X} truncated: needs {needed} bytes, {available} available")]
    TruncatedAttribute {
        kind: u16,
        needed: usize,
        available: usize,
    },

    #[error("attribute {0:?} has an invalid value")]
    InvalidAttribute(AttributeKind),

    #[error("attribute {0:?} is required but missing")]
    MissingAttribute(AttributeKind),
}
