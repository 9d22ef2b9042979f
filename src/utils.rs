/**
 * Various misc. utility functions
 */

/**
 * Hex dump of a datagram with bytes separated by commas, for trace logs of
 * wire traffic.
 */
pub(crate) fn hex_encode_delimited(buffer: &[u8]) -> String {
    buffer
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect::<Vec<_>>()
        .join(",")
}
