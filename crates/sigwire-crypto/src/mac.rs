//! Truncated HMAC-SHA256 tags for ratchet messages.
//!
//! The tag binds a message to both parties' identity keys:
//! `HMAC(mac_key, sender_identity || receiver_identity || message)`, cut to
//! [`MAC_LENGTH`] bytes. Deriving `mac_key` belongs to the ratchet.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::identity::IdentityKey;

/// Size of the tag appended to every ratchet message.
pub const MAC_LENGTH: usize = 8;

type HmacSha256 = Hmac<Sha256>;

/// Compute the tag over `data`.
pub fn compute(
    mac_key: &[u8; 32],
    sender_identity: &IdentityKey,
    receiver_identity: &IdentityKey,
    data: &[u8],
) -> [u8; MAC_LENGTH] {
    let mut mac =
        <HmacSha256 as Mac>::new_from_slice(mac_key).expect("HMAC accepts keys of any length");
    mac.update(sender_identity.public_key().as_bytes());
    mac.update(receiver_identity.public_key().as_bytes());
    mac.update(data);
    let full = mac.finalize().into_bytes();

    let mut tag = [0u8; MAC_LENGTH];
    tag.copy_from_slice(&full[..MAC_LENGTH]);
    tag
}

/// Check `tag` against the tag computed over `data`, in constant time.
pub fn verify(
    mac_key: &[u8; 32],
    sender_identity: &IdentityKey,
    receiver_identity: &IdentityKey,
    data: &[u8],
    tag: &[u8],
) -> bool {
    let expected = compute(mac_key, sender_identity, receiver_identity, data);
    bool::from(expected.as_slice().ct_eq(tag))
}
