//! Pre-key messages: the first message of a new session.
//!
//! The envelope carries everything the recipient needs to run its half of
//! the key agreement, followed by the first ratchet message. Layout
//! (big-endian):
//!
//! | Offset | Field            | Size      |
//! |--------|------------------|-----------|
//! | 0      | marker byte      | 1         |
//! | 1      | registration id  | 4         |
//! | 5      | pre-key id       | 4         |
//! | 9      | signed pre-key id| 4         |
//! | 13     | base key         | 32        |
//! | 45     | identity key     | 32        |
//! | 77     | signal message   | remainder |
//!
//! A pre-key id of `0xFFFFFFFF` means no one-time pre-key was consumed.

use bytes::{Buf, BufMut};
use sigwire_crypto::{IdentityKey, PublicKey, PUBLIC_KEY_LENGTH};

use crate::config::WireConfig;
use crate::error::ProtocolError;
use crate::ids::{PreKeyId, SignedPreKeyId};
use crate::signal_message::SignalMessage;
use crate::version::marker_byte;

/// Bytes before the embedded message.
pub const PREKEY_MESSAGE_FIXED_LENGTH: usize = 1 + 4 + 4 + 4 + 2 * PUBLIC_KEY_LENGTH;

/// A validated pre-key message.
///
/// Immutable after construction. `Clone` is a deep copy and dropping the
/// value releases everything it owns, so there is no way to touch a
/// destroyed message through this type. Hosts that need a runtime
/// destroy go through [`crate::handle::PreKeyMessageHandle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreKeyMessage {
    message_version: u8,
    registration_id: u32,
    pre_key_id: Option<PreKeyId>,
    signed_pre_key_id: SignedPreKeyId,
    base_key: PublicKey,
    identity_key: IdentityKey,
    message: SignalMessage,
    serialized: Box<[u8]>,
}

impl PreKeyMessage {
    /// Assemble a pre-key message around an already built ratchet message.
    ///
    /// A `MalformedMessage` error here points at the arguments (an
    /// unsupported version, or an embedded message of another version),
    /// not at received bytes.
    pub fn new(
        message_version: u8,
        registration_id: u32,
        pre_key_id: Option<PreKeyId>,
        signed_pre_key_id: SignedPreKeyId,
        base_key: PublicKey,
        identity_key: IdentityKey,
        message: SignalMessage,
    ) -> Result<Self, ProtocolError> {
        if !WireConfig::default().supports(message_version) {
            return Err(ProtocolError::MalformedMessage(format!(
                "unsupported version {message_version}"
            )));
        }
        if message.message_version() != message_version {
            return Err(ProtocolError::MalformedMessage(format!(
                "embedded message is version {}, envelope is version {message_version}",
                message.message_version()
            )));
        }

        let mut serialized =
            Vec::with_capacity(PREKEY_MESSAGE_FIXED_LENGTH + message.serialized().len());
        serialized.put_u8(marker_byte(message_version));
        serialized.put_u32(registration_id);
        serialized.put_u32(PreKeyId::encode(pre_key_id));
        serialized.put_u32(signed_pre_key_id.value());
        serialized.put_slice(base_key.as_bytes());
        serialized.put_slice(identity_key.public_key().as_bytes());
        serialized.put_slice(message.serialized());

        Ok(Self {
            message_version,
            registration_id,
            pre_key_id,
            signed_pre_key_id,
            base_key,
            identity_key,
            message,
            serialized: serialized.into_boxed_slice(),
        })
    }

    /// Parse with the default version policy.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, ProtocolError> {
        Self::deserialize_with(bytes, &WireConfig::default())
    }

    /// Parse with an explicit version policy.
    ///
    /// Either the whole message validates or nothing is returned. A failure
    /// means the session-establishment attempt must be dropped; the same
    /// bytes will fail the same way again.
    pub fn deserialize_with(bytes: &[u8], config: &WireConfig) -> Result<Self, ProtocolError> {
        config.validate()?;

        match decode(bytes, config) {
            Ok(message) => {
                tracing::debug!(
                    version = message.message_version,
                    len = bytes.len(),
                    one_time_pre_key = message.pre_key_id.is_some(),
                    "pre-key message decoded"
                );
                Ok(message)
            }
            Err(e) => {
                tracing::debug!(len = bytes.len(), error = %e, "pre-key message rejected");
                Err(e)
            }
        }
    }

    pub fn message_version(&self) -> u8 {
        self.message_version
    }

    pub fn registration_id(&self) -> u32 {
        self.registration_id
    }

    /// The consumed one-time pre-key, if any. Never the raw sentinel.
    pub fn pre_key_id(&self) -> Option<PreKeyId> {
        self.pre_key_id
    }

    pub fn signed_pre_key_id(&self) -> SignedPreKeyId {
        self.signed_pre_key_id
    }

    pub fn base_key(&self) -> &PublicKey {
        &self.base_key
    }

    pub fn identity_key(&self) -> &IdentityKey {
        &self.identity_key
    }

    /// The embedded ratchet message.
    pub fn message(&self) -> &SignalMessage {
        &self.message
    }

    /// Canonical wire bytes.
    pub fn serialized(&self) -> &[u8] {
        &self.serialized
    }
}

impl TryFrom<&[u8]> for PreKeyMessage {
    type Error = ProtocolError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::deserialize(bytes)
    }
}

fn decode(bytes: &[u8], config: &WireConfig) -> Result<PreKeyMessage, ProtocolError> {
    let Some(&marker) = bytes.first() else {
        return Err(ProtocolError::MalformedMessage("empty pre-key message".into()));
    };
    let message_version = config.read_version(marker)?;

    if bytes.len() < PREKEY_MESSAGE_FIXED_LENGTH {
        return Err(ProtocolError::MalformedMessage(format!(
            "pre-key message too short: {} bytes",
            bytes.len()
        )));
    }

    let mut buf = &bytes[1..];
    let registration_id = buf.get_u32();
    let pre_key_id = PreKeyId::decode(buf.get_u32());
    let signed_pre_key_id = SignedPreKeyId::from(buf.get_u32());

    let mut key = [0u8; PUBLIC_KEY_LENGTH];
    buf.copy_to_slice(&mut key);
    let base_key = PublicKey::from_bytes(&key)?;
    buf.copy_to_slice(&mut key);
    let identity_key = IdentityKey::from_bytes(&key)?;

    let message = SignalMessage::deserialize_with(buf, config).map_err(|e| {
        ProtocolError::MalformedMessage(format!("embedded message: {e}"))
    })?;
    if message.message_version() != message_version {
        return Err(ProtocolError::MalformedMessage(format!(
            "embedded message is version {}, envelope is version {message_version}",
            message.message_version()
        )));
    }

    Ok(PreKeyMessage {
        message_version,
        registration_id,
        pre_key_id,
        signed_pre_key_id,
        base_key,
        identity_key,
        message,
        serialized: bytes.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal_message::SIGNAL_MESSAGE_MIN_LENGTH;
    use crate::version::{CURRENT_VERSION, MIN_SUPPORTED_VERSION};
    use sigwire_crypto::{IdentityKeyPair, KeyPair};

    const MAC_KEY: [u8; 32] = [0x11; 32];

    fn signal_message(version: u8) -> SignalMessage {
        SignalMessage::new(
            version,
            &MAC_KEY,
            *KeyPair::generate().public_key(),
            0,
            0,
            b"first ratchet message",
            &IdentityKeyPair::generate().identity_key(),
            &IdentityKeyPair::generate().identity_key(),
        )
        .unwrap()
    }

    fn prekey_message(version: u8, pre_key_id: Option<PreKeyId>) -> PreKeyMessage {
        PreKeyMessage::new(
            version,
            1234,
            pre_key_id,
            SignedPreKeyId::from(9),
            *KeyPair::generate().public_key(),
            IdentityKeyPair::generate().identity_key(),
            signal_message(version),
        )
        .unwrap()
    }

    #[test]
    fn deserialize_restores_every_field() {
        let original = prekey_message(4, Some(PreKeyId::try_from(77).unwrap()));
        let parsed = PreKeyMessage::deserialize(original.serialized()).unwrap();

        assert_eq!(parsed, original);
        assert_eq!(parsed.message_version(), 4);
        assert_eq!(parsed.registration_id(), 1234);
        assert_eq!(parsed.pre_key_id().map(PreKeyId::value), Some(77));
        assert_eq!(parsed.signed_pre_key_id().value(), 9);
        assert_eq!(parsed.base_key(), original.base_key());
        assert_eq!(parsed.identity_key(), original.identity_key());
        assert_eq!(parsed.message(), original.message());
        assert_eq!(parsed.serialized(), original.serialized());
    }

    #[test]
    fn absent_pre_key_uses_sentinel() {
        let original = prekey_message(3, None);
        let bytes = original.serialized();
        assert_eq!(&bytes[5..9], &[0xff, 0xff, 0xff, 0xff]);

        let parsed = PreKeyMessage::deserialize(bytes).unwrap();
        assert_eq!(parsed.pre_key_id(), None);
    }

    #[test]
    fn fixed_fields_at_documented_offsets() {
        let original = prekey_message(3, Some(PreKeyId::try_from(0x0102_0304).unwrap()));
        let bytes = original.serialized();

        assert_eq!(bytes[0], 0x33);
        assert_eq!(&bytes[1..5], &1234u32.to_be_bytes());
        assert_eq!(&bytes[5..9], &[1, 2, 3, 4]);
        assert_eq!(&bytes[9..13], &[0, 0, 0, 9]);
        assert_eq!(&bytes[13..45], original.base_key().as_bytes());
        assert_eq!(&bytes[45..77], original.identity_key().public_key().as_bytes());
        assert_eq!(&bytes[77..], original.message().serialized());
    }

    #[test]
    fn truncated_input_is_malformed() {
        let original = prekey_message(4, None);
        let bytes = original.serialized();

        for len in 0..PREKEY_MESSAGE_FIXED_LENGTH + SIGNAL_MESSAGE_MIN_LENGTH {
            assert!(
                matches!(
                    PreKeyMessage::deserialize(&bytes[..len]),
                    Err(ProtocolError::MalformedMessage(_))
                ),
                "prefix of {len} bytes was accepted"
            );
        }
    }

    #[test]
    fn corrupted_base_key_is_invalid_encoding() {
        let mut bytes = prekey_message(4, None).serialized().to_vec();
        bytes[13 + 31] |= 0x80;
        assert!(matches!(
            PreKeyMessage::deserialize(&bytes),
            Err(ProtocolError::InvalidKeyEncoding(_))
        ));
    }

    #[test]
    fn corrupted_identity_key_is_invalid_encoding() {
        let mut bytes = prekey_message(4, None).serialized().to_vec();
        bytes[45..77].fill(0);
        assert!(matches!(
            PreKeyMessage::deserialize(&bytes),
            Err(ProtocolError::InvalidKeyEncoding(_))
        ));
    }

    #[test]
    fn off_curve_keys_are_invalid_encoding() {
        // u = 2 lies on the twist of Curve25519.
        let mut twist = [0u8; PUBLIC_KEY_LENGTH];
        twist[0] = 2;

        for window in [13..45, 45..77] {
            let mut bytes = prekey_message(4, None).serialized().to_vec();
            bytes[window].copy_from_slice(&twist);
            assert!(matches!(
                PreKeyMessage::deserialize(&bytes),
                Err(ProtocolError::InvalidKeyEncoding(_))
            ));
        }
    }

    #[test]
    fn inner_key_failure_is_wrapped_as_malformed() {
        let mut bytes = prekey_message(4, None).serialized().to_vec();
        // Sender ratchet key of the embedded message.
        bytes[78..110].fill(0);
        assert!(matches!(
            PreKeyMessage::deserialize(&bytes),
            Err(ProtocolError::MalformedMessage(_))
        ));
    }

    #[test]
    fn version_gate() {
        let mut bytes = prekey_message(3, None).serialized().to_vec();
        for unsupported in [0x03, 0x23, 0x53, 0xf3] {
            bytes[0] = unsupported;
            assert!(matches!(
                PreKeyMessage::deserialize(&bytes),
                Err(ProtocolError::MalformedMessage(_))
            ));
        }

        let oldest = prekey_message(MIN_SUPPORTED_VERSION, None);
        assert!(PreKeyMessage::deserialize(oldest.serialized()).is_ok());
        let newest = prekey_message(CURRENT_VERSION, None);
        assert!(PreKeyMessage::deserialize(newest.serialized()).is_ok());
    }

    #[test]
    fn wrong_framing_nibble_rejected() {
        let mut bytes = prekey_message(3, None).serialized().to_vec();
        bytes[0] = 0x34;
        assert!(matches!(
            PreKeyMessage::deserialize(&bytes),
            Err(ProtocolError::MalformedMessage(_))
        ));
    }

    #[test]
    fn envelope_and_embedded_versions_must_agree() {
        let result = PreKeyMessage::new(
            4,
            1,
            None,
            SignedPreKeyId::from(1),
            *KeyPair::generate().public_key(),
            IdentityKeyPair::generate().identity_key(),
            signal_message(3),
        );
        assert!(matches!(result, Err(ProtocolError::MalformedMessage(_))));

        // Same mismatch arriving over the wire.
        let mut bytes = prekey_message(4, None).serialized().to_vec();
        bytes[0] = 0x33;
        assert!(matches!(
            PreKeyMessage::deserialize(&bytes),
            Err(ProtocolError::MalformedMessage(_))
        ));
    }

    #[test]
    fn custom_policy_applies() {
        let only_current = WireConfig {
            min_version: 4,
            max_version: 4,
        };
        let old = prekey_message(3, None);
        assert!(PreKeyMessage::deserialize_with(old.serialized(), &only_current).is_err());

        let new = prekey_message(4, None);
        assert!(PreKeyMessage::deserialize_with(new.serialized(), &only_current).is_ok());
    }

    #[test]
    fn invalid_policy_is_reported() {
        let broken = WireConfig {
            min_version: 4,
            max_version: 3,
        };
        let message = prekey_message(4, None);
        assert!(matches!(
            PreKeyMessage::deserialize_with(message.serialized(), &broken),
            Err(ProtocolError::InvalidConfig(_))
        ));
    }

    #[test]
    fn clone_is_independent() {
        let original = prekey_message(4, None);
        let copy = original.clone();
        drop(original);
        assert_eq!(copy.registration_id(), 1234);
        assert!(PreKeyMessage::deserialize(copy.serialized()).is_ok());
    }
}
