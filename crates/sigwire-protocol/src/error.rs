use sigwire_crypto::CryptoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("invalid key encoding: {0}")]
    InvalidKeyEncoding(String),

    #[error("message used after it was destroyed")]
    UseAfterDestroy,

    #[error("pre-key id 0xffffffff is reserved to mean \"no pre-key\"")]
    ReservedPreKeyId,

    #[error("invalid wire config: {0}")]
    InvalidConfig(String),
}

impl ProtocolError {
    /// Stable numeric code for host bindings. Codes are never reused.
    pub fn code(&self) -> u32 {
        match self {
            Self::MalformedMessage(_) => 1,
            Self::InvalidKeyEncoding(_) => 2,
            Self::UseAfterDestroy => 3,
            Self::ReservedPreKeyId => 4,
            Self::InvalidConfig(_) => 5,
        }
    }
}

impl From<CryptoError> for ProtocolError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::InvalidKey(reason) | CryptoError::VerificationError(reason) => {
                Self::InvalidKeyEncoding(reason)
            }
        }
    }
}
