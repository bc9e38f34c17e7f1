use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::version::{
    split_marker, CIPHERTEXT_VERSION_MARKER, CURRENT_VERSION, MIN_SUPPORTED_VERSION,
};

/// Version policy applied when decoding messages.
///
/// Hosts that load this from their own configuration get the defaults for
/// any missing field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireConfig {
    /// Oldest message version to accept.
    pub min_version: u8,
    /// Newest message version to accept.
    pub max_version: u8,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            min_version: MIN_SUPPORTED_VERSION,
            max_version: CURRENT_VERSION,
        }
    }
}

impl WireConfig {
    /// Reject ranges this implementation cannot honour.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.min_version > self.max_version {
            return Err(ProtocolError::InvalidConfig(format!(
                "min_version {} is above max_version {}",
                self.min_version, self.max_version
            )));
        }
        if self.min_version < MIN_SUPPORTED_VERSION {
            return Err(ProtocolError::InvalidConfig(format!(
                "versions below {MIN_SUPPORTED_VERSION} are not implemented"
            )));
        }
        if self.max_version > CURRENT_VERSION {
            return Err(ProtocolError::InvalidConfig(format!(
                "versions above {CURRENT_VERSION} are not implemented"
            )));
        }
        Ok(())
    }

    pub fn supports(&self, version: u8) -> bool {
        (self.min_version..=self.max_version).contains(&version)
    }

    /// Decode a marker byte, returning the version it announces.
    pub(crate) fn read_version(&self, marker: u8) -> Result<u8, ProtocolError> {
        let (version, framing) = split_marker(marker);
        if framing != CIPHERTEXT_VERSION_MARKER {
            return Err(ProtocolError::MalformedMessage(format!(
                "unexpected framing marker {framing:#x}"
            )));
        }
        if !self.supports(version) {
            return Err(ProtocolError::MalformedMessage(format!(
                "unsupported version {version}"
            )));
        }
        Ok(version)
    }
}
