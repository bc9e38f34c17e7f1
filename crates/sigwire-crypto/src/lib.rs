pub mod curve;
pub mod error;
pub mod identity;
pub mod mac;

pub use curve::{KeyPair, PublicKey, PUBLIC_KEY_LENGTH};
pub use error::CryptoError;
pub use identity::{IdentityKey, IdentityKeyPair};
pub use mac::MAC_LENGTH;
