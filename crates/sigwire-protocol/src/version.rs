//! Version framing shared by both message codecs.
//!
//! The first byte of every message packs the protocol version into the high
//! nibble and [`CIPHERTEXT_VERSION_MARKER`] into the low nibble, so version 3
//! frames as `0x33` and version 4 as `0x43`.

/// Low-nibble constant identifying ciphertext message framing.
pub const CIPHERTEXT_VERSION_MARKER: u8 = 3;

/// Oldest version accepted by default.
pub const MIN_SUPPORTED_VERSION: u8 = 3;

/// Newest version, and the one new messages are built with by default.
pub const CURRENT_VERSION: u8 = 4;

pub(crate) fn marker_byte(version: u8) -> u8 {
    (version << 4) | CIPHERTEXT_VERSION_MARKER
}

/// Split a marker byte into `(version, framing marker)`.
pub(crate) fn split_marker(byte: u8) -> (u8, u8) {
    (byte >> 4, byte & 0x0f)
}
