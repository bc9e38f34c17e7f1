pub mod config;
pub mod error;
pub mod handle;
pub mod ids;
pub mod prekey_message;
pub mod signal_message;
pub mod version;

pub use config::WireConfig;
pub use error::ProtocolError;
pub use handle::{MessageHandle, PreKeyMessageHandle};
pub use ids::{PreKeyId, SignedPreKeyId};
pub use prekey_message::PreKeyMessage;
pub use signal_message::SignalMessage;
pub use version::{CIPHERTEXT_VERSION_MARKER, CURRENT_VERSION, MIN_SUPPORTED_VERSION};
