/**
 * Cryptographic helpers for MESSAGE-INTEGRITY and FINGERPRINT
 */
use hmac::{Hmac, Mac};
use md5::{Digest, Md5};
use sha1::Sha1;

use super::{defs::AttributeKind, error::StunError};

/// FINGERPRINT is the CRC32 XOR'ed with the ASCII of "STUN"
pub(crate) const FINGERPRINT_XOR: u32 = 0x5354554E;

/// Length of an HMAC-SHA1 digest, the MESSAGE-INTEGRITY value length
pub(crate) const INTEGRITY_LENGTH: usize = 20;

type HmacSha1 = Hmac<Sha1>;

/**
 * CRC32 of the given bytes, before the XOR with the "STUN" constant.
 */
pub(crate) fn calculate_local_fingerprint(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/**
 * Long-term credential key, MD5("username:realm:password")
 */
pub(crate) fn long_term_key(username: &str, realm: &str, password: &str) -> [u8; 16] {
    let digest = Md5::digest(format!("{username}:{realm}:{password}").as_bytes());
    let mut key = [0u8; 16];
    key.copy_from_slice(&digest);
    key
}

/**
 * HMAC-SHA1 of `data` keyed with `key`.
 */
pub(crate) fn hmac_sha1(key: &[u8], data: &[u8]) -> Result<[u8; INTEGRITY_LENGTH], StunError> {
    let mut mac = HmacSha1::new_from_slice(key)
        .map_err(|_| StunError::InvalidAttribute(AttributeKind::MessageIntegrity))?;
    mac.update(data);

    let mut out = [0u8; INTEGRITY_LENGTH];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_term_key() {
        // username and password from the RFC 5769 long-term credential sample
        let key = long_term_key(
            "\u{30DE}\u{30C8}\u{30EA}\u{30C3}\u{30AF}\u{30B9}",
            "example.org",
            "TheMatrIX",
        );
        assert_eq!(hex::encode(key), "e8ca7ad59d5eb0518e312911d2dab2a9");
    }

    #[test]
    fn test_fingerprint_crc() {
        // CRC32 (ISO-HDLC) check value
        assert_eq!(calculate_local_fingerprint(b"123456789"), 0xCBF43926);
    }

    #[test]
    fn test_hmac_sha1() {
        // RFC 2202 test case 2
        let digest = hmac_sha1(b"Jefe", b"what do ya want for nothing?").unwrap();
        assert_eq!(hex::encode(digest), "effcdf6ae5eb2fa2d27416d5f184df9c259a7c79");
    }
}
