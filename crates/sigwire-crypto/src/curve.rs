//! Curve25519 public keys in the form they travel on the wire.
//!
//! A key is a 32-byte Montgomery u-coordinate (the X25519 encoding). X25519
//! itself will happily multiply any 32 bytes, so decoding here is stricter:
//! the encoding must be canonical, the point must lie on Curve25519 rather
//! than on its quadratic twist, and it must not be a small-order point.

use std::cmp::Ordering;
use std::fmt;

use curve25519_dalek::montgomery::MontgomeryPoint;
use rand::rngs::OsRng;
use x25519_dalek::{PublicKey as X25519Public, SharedSecret, StaticSecret};

use crate::error::CryptoError;

/// Size of a serialized public key.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Little-endian encoding of the field prime 2^255 - 19.
const FIELD_PRIME: [u8; 32] = [
    0xed, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x7f,
];

/// A validated Curve25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; PUBLIC_KEY_LENGTH]);

impl PublicKey {
    /// Decode and validate a serialized public key.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; PUBLIC_KEY_LENGTH] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidKey(format!(
                "public key must be {PUBLIC_KEY_LENGTH} bytes, got {}",
                bytes.len()
            ))
        })?;

        if !is_canonical(&bytes) {
            return Err(CryptoError::InvalidKey(
                "non-canonical u-coordinate".into(),
            ));
        }

        // The birational map only succeeds for points on the curve itself;
        // twist points fail to decompress on the Edwards side.
        let edwards = MontgomeryPoint(bytes)
            .to_edwards(0)
            .ok_or_else(|| CryptoError::InvalidKey("not a point on Curve25519".into()))?;

        if edwards.is_small_order() {
            return Err(CryptoError::InvalidKey("small-order point".into()));
        }

        Ok(Self(bytes))
    }

    /// The 32-byte wire encoding.
    pub fn serialize(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.0
    }

    /// Hex rendering, for logs and display.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl TryFrom<&[u8]> for PublicKey {
    type Error = CryptoError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::from_bytes(bytes)
    }
}

impl From<&PublicKey> for X25519Public {
    fn from(key: &PublicKey) -> Self {
        X25519Public::from(key.0)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PublicKey").field(&self.to_hex()).finish()
    }
}

/// Canonical means strictly below the field prime, which also rules out the
/// top bit being set.
fn is_canonical(bytes: &[u8; PUBLIC_KEY_LENGTH]) -> bool {
    for (byte, prime) in bytes.iter().rev().zip(FIELD_PRIME.iter().rev()) {
        match byte.cmp(prime) {
            Ordering::Less => return true,
            Ordering::Greater => return false,
            Ordering::Equal => {}
        }
    }
    false
}

/// An X25519 key pair.
///
/// The private half zeroizes on drop (`x25519-dalek` does this for
/// `StaticSecret`).
pub struct KeyPair {
    private_key: StaticSecret,
    public_key: PublicKey,
}

impl KeyPair {
    /// Generate a new random key pair from the OS RNG.
    pub fn generate() -> Self {
        let private_key = StaticSecret::random_from_rng(OsRng);
        let public_key = PublicKey(X25519Public::from(&private_key).to_bytes());
        Self {
            private_key,
            public_key,
        }
    }

    /// Restore a key pair from a 32-byte private scalar.
    pub fn from_private_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        let private_key = StaticSecret::from(bytes);
        let public_key = PublicKey::from_bytes(X25519Public::from(&private_key).as_bytes())?;
        Ok(Self {
            private_key,
            public_key,
        })
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn private_key_bytes(&self) -> [u8; 32] {
        self.private_key.to_bytes()
    }

    /// Raw X25519 agreement with a peer key. Composition into X3DH or a
    /// ratchet step is the caller's business.
    pub fn agree(&self, their_public: &PublicKey) -> SharedSecret {
        self.private_key
            .diffie_hellman(&X25519Public::from(their_public))
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}
