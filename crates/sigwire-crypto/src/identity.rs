use std::fmt;

use ed25519_dalek::{SigningKey, VerifyingKey};
use x25519_dalek::SharedSecret;

use crate::curve::{KeyPair, PublicKey, PUBLIC_KEY_LENGTH};
use crate::error::CryptoError;

/// A device's long-term identity key, as carried in pre-key messages.
///
/// On the wire this is just a [`PublicKey`]; the wrapper exists so identity
/// keys and ephemeral keys cannot be swapped by accident.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    public_key: PublicKey,
}

impl IdentityKey {
    pub fn new(public_key: PublicKey) -> Self {
        Self { public_key }
    }

    /// Decode and validate a serialized identity key.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        PublicKey::from_bytes(bytes).map(Self::new)
    }

    /// Convert a peer's Ed25519 verifying key to its Montgomery form.
    ///
    /// Uses the standard Edwards→Montgomery birational map (RFC 7748), so a
    /// host whose identities are Ed25519 keys can put them on the wire.
    pub fn from_ed25519(ed25519_public_bytes: &[u8; 32]) -> Result<Self, CryptoError> {
        let verifying_key = VerifyingKey::from_bytes(ed25519_public_bytes).map_err(|e| {
            CryptoError::VerificationError(format!("invalid Ed25519 public key: {e}"))
        })?;
        let montgomery = verifying_key.to_montgomery();
        Self::from_bytes(montgomery.as_bytes())
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn serialize(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        self.public_key.serialize()
    }

    /// Hex fingerprint for display and safety-number style comparison.
    pub fn fingerprint(&self) -> String {
        self.public_key.to_hex()
    }
}

impl From<PublicKey> for IdentityKey {
    fn from(public_key: PublicKey) -> Self {
        Self::new(public_key)
    }
}

impl fmt::Debug for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityKey")
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

/// The local half of an identity: key pair plus the derived [`IdentityKey`].
pub struct IdentityKeyPair {
    key_pair: KeyPair,
}

impl IdentityKeyPair {
    /// Generate a new random identity.
    pub fn generate() -> Self {
        Self {
            key_pair: KeyPair::generate(),
        }
    }

    /// Derive the identity from an Ed25519 secret key.
    ///
    /// Uses the SHA-512-expanded scalar (the one Ed25519 signs with) so the
    /// result agrees with [`IdentityKey::from_ed25519`] applied to the
    /// matching verifying key.
    pub fn from_ed25519_secret(secret: &[u8; 32]) -> Result<Self, CryptoError> {
        let signing_key = SigningKey::from_bytes(secret);
        let key_pair = KeyPair::from_private_bytes(signing_key.to_scalar_bytes())?;
        Ok(Self { key_pair })
    }

    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey::new(*self.key_pair.public_key())
    }

    pub fn key_pair(&self) -> &KeyPair {
        &self.key_pair
    }

    pub fn agree(&self, their_public: &PublicKey) -> SharedSecret {
        self.key_pair.agree(their_public)
    }
}

impl fmt::Debug for IdentityKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityKeyPair")
            .field("identity_key", &self.identity_key())
            .finish_non_exhaustive()
    }
}
