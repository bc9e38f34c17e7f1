use std::fmt;

use crate::error::ProtocolError;

/// Wire value standing in for "no one-time pre-key was used".
const NO_PRE_KEY: u32 = u32::MAX;

/// Identifier of a recipient's one-time pre-key.
///
/// `0xFFFFFFFF` is reserved on the wire to mean absence, so it can never be
/// a real id: [`TryFrom<u32>`] refuses it and absence is spelled `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PreKeyId(u32);

impl PreKeyId {
    /// Map a wire value to an optional id.
    pub fn decode(raw: u32) -> Option<Self> {
        (raw != NO_PRE_KEY).then_some(Self(raw))
    }

    /// Map an optional id to its wire value.
    pub fn encode(id: Option<Self>) -> u32 {
        id.map_or(NO_PRE_KEY, |id| id.0)
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for PreKeyId {
    type Error = ProtocolError;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        Self::decode(raw).ok_or(ProtocolError::ReservedPreKeyId)
    }
}

impl From<PreKeyId> for u32 {
    fn from(id: PreKeyId) -> Self {
        id.0
    }
}

impl fmt::Display for PreKeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of a recipient's signed pre-key. Every value is legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SignedPreKeyId(u32);

impl SignedPreKeyId {
    pub fn value(self) -> u32 {
        self.0
    }
}

impl From<u32> for SignedPreKeyId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl From<SignedPreKeyId> for u32 {
    fn from(id: SignedPreKeyId) -> Self {
        id.0
    }
}

impl fmt::Display for SignedPreKeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
