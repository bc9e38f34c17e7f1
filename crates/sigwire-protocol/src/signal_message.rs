//! The ratchet message embedded in every pre-key message.
//!
//! Layout (big-endian):
//!
//! ```text
//! marker(1) | sender ratchet key(32) | counter(4) | previous counter(4) | ciphertext(n >= 1) | mac(8)
//! ```

use bytes::{Buf, BufMut};
use sigwire_crypto::{mac, IdentityKey, PublicKey, MAC_LENGTH, PUBLIC_KEY_LENGTH};

use crate::config::WireConfig;
use crate::error::ProtocolError;
use crate::version::marker_byte;

/// Header bytes before the ciphertext.
const HEADER_LENGTH: usize = 1 + PUBLIC_KEY_LENGTH + 4 + 4;

/// Shortest well-formed message: header, one ciphertext byte, tag.
pub const SIGNAL_MESSAGE_MIN_LENGTH: usize = HEADER_LENGTH + 1 + MAC_LENGTH;

/// A parsed, structurally valid ratchet message. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalMessage {
    message_version: u8,
    sender_ratchet_key: PublicKey,
    counter: u32,
    previous_counter: u32,
    ciphertext: Box<[u8]>,
    serialized: Box<[u8]>,
}

impl SignalMessage {
    /// Assemble a message and append its MAC.
    ///
    /// A `MalformedMessage` error here points at the arguments (an
    /// unsupported version or an empty ciphertext), not at received bytes.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        message_version: u8,
        mac_key: &[u8; 32],
        sender_ratchet_key: PublicKey,
        counter: u32,
        previous_counter: u32,
        ciphertext: &[u8],
        sender_identity: &IdentityKey,
        receiver_identity: &IdentityKey,
    ) -> Result<Self, ProtocolError> {
        if !WireConfig::default().supports(message_version) {
            return Err(ProtocolError::MalformedMessage(format!(
                "unsupported version {message_version}"
            )));
        }
        if ciphertext.is_empty() {
            return Err(ProtocolError::MalformedMessage("empty ciphertext".into()));
        }

        let mut serialized = Vec::with_capacity(HEADER_LENGTH + ciphertext.len() + MAC_LENGTH);
        serialized.put_u8(marker_byte(message_version));
        serialized.put_slice(sender_ratchet_key.as_bytes());
        serialized.put_u32(counter);
        serialized.put_u32(previous_counter);
        serialized.put_slice(ciphertext);
        let tag = mac::compute(mac_key, sender_identity, receiver_identity, &serialized);
        serialized.put_slice(&tag);

        Ok(Self {
            message_version,
            sender_ratchet_key,
            counter,
            previous_counter,
            ciphertext: ciphertext.into(),
            serialized: serialized.into_boxed_slice(),
        })
    }

    /// Parse with the default version policy.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, ProtocolError> {
        Self::deserialize_with(bytes, &WireConfig::default())
    }

    /// Parse with an explicit version policy.
    pub fn deserialize_with(bytes: &[u8], config: &WireConfig) -> Result<Self, ProtocolError> {
        let Some(&marker) = bytes.first() else {
            return Err(ProtocolError::MalformedMessage("empty signal message".into()));
        };
        let message_version = config.read_version(marker)?;

        if bytes.len() < SIGNAL_MESSAGE_MIN_LENGTH {
            return Err(ProtocolError::MalformedMessage(format!(
                "signal message too short: {} bytes",
                bytes.len()
            )));
        }

        let mut buf = &bytes[1..];
        let mut ratchet_key = [0u8; PUBLIC_KEY_LENGTH];
        buf.copy_to_slice(&mut ratchet_key);
        let sender_ratchet_key = PublicKey::from_bytes(&ratchet_key)?;
        let counter = buf.get_u32();
        let previous_counter = buf.get_u32();
        let ciphertext = &buf[..buf.len() - MAC_LENGTH];

        Ok(Self {
            message_version,
            sender_ratchet_key,
            counter,
            previous_counter,
            ciphertext: ciphertext.into(),
            serialized: bytes.into(),
        })
    }

    pub fn message_version(&self) -> u8 {
        self.message_version
    }

    pub fn sender_ratchet_key(&self) -> &PublicKey {
        &self.sender_ratchet_key
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn previous_counter(&self) -> u32 {
        self.previous_counter
    }

    /// The encrypted payload.
    pub fn body(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn mac(&self) -> &[u8] {
        &self.serialized[self.serialized.len() - MAC_LENGTH..]
    }

    pub fn serialized(&self) -> &[u8] {
        &self.serialized
    }

    /// Check the trailing tag against the identities of both parties.
    pub fn verify_mac(
        &self,
        sender_identity: &IdentityKey,
        receiver_identity: &IdentityKey,
        mac_key: &[u8; 32],
    ) -> bool {
        let (data, tag) = self
            .serialized
            .split_at(self.serialized.len() - MAC_LENGTH);
        mac::verify(mac_key, sender_identity, receiver_identity, data, tag)
    }
}

impl TryFrom<&[u8]> for SignalMessage {
    type Error = ProtocolError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::deserialize(bytes)
    }
}
