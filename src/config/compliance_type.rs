use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/**
 * How strictly responses follow RFC 5389
 */

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Default)]
pub(crate) enum Compliance {
    /**
     * RFC 5389, but makes some allowances for older clients (BINDING responses
     * carry MAPPED-ADDRESS next to XOR-MAPPED-ADDRESS)
     * https://datatracker.ietf.org/doc/html/rfc5389
     */
    Relaxed,
    /**
     * Compatibile with RFC 5389, but may not work with some older clients
     * https://datatracker.ietf.org/doc/html/rfc5389
     */
    #[default]
    RFC5389,
}

impl Compliance {
    pub fn as_str(&self) -> &'static str {
        match *self {
            Compliance::Relaxed => "Relaxed",
            Compliance::RFC5389 => "RFC5389",
        }
    }

    /// Unrecognized names fall back to RFC5389
    fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "relaxed" => Compliance::Relaxed,
            _ => Compliance::RFC5389,
        }
    }
}

/**
 * Deserialize the compliance level from the configuration. Anything that is
 * not a recognized level becomes RFC5389.
 */
pub fn deserialize<'de, D>(deserializer: D) -> Result<Compliance, D::Error>
where
    D: Deserializer<'de>,
{
    match deserializer.deserialize_str(ComplianceVisitor) {
        Ok(c) => Ok(c),
        Err(_) => Ok(Compliance::RFC5389),
    }
}

struct ComplianceVisitor;

impl<'de> Visitor<'de> for ComplianceVisitor {
    type Value = Compliance;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a string representing a compliance level")
    }

    fn visit_str<E>(self, value: &str) -> Result<Compliance, E>
    where
        E: de::Error,
    {
        Ok(Compliance::from_name(value))
    }
}
