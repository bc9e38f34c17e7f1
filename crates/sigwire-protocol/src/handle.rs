//! Release-once handles for hosts that cannot express ownership.
//!
//! Inside Rust a [`PreKeyMessage`] is simply dropped. Bindings and other
//! shared holders need an explicit destroy that may race with readers, so
//! the value lives in a slot behind a reader/writer lock: readers see
//! either the live value or [`ProtocolError::UseAfterDestroy`], and the
//! first destroy is the only one that releases anything.

use parking_lot::RwLock;
use sigwire_crypto::{IdentityKey, PublicKey};

use crate::error::ProtocolError;
use crate::ids::{PreKeyId, SignedPreKeyId};
use crate::prekey_message::PreKeyMessage;
use crate::signal_message::SignalMessage;

/// A value that is `Live` until [`destroy`](Self::destroy) moves it to the
/// terminal `Destroyed` state.
#[derive(Debug)]
pub struct MessageHandle<T> {
    slot: RwLock<Option<T>>,
}

impl<T> MessageHandle<T> {
    pub fn new(value: T) -> Self {
        Self {
            slot: RwLock::new(Some(value)),
        }
    }

    /// Run `f` against the live value.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, ProtocolError> {
        self.slot
            .read()
            .as_ref()
            .map(f)
            .ok_or(ProtocolError::UseAfterDestroy)
    }

    /// Release the value. Every call after the first fails.
    pub fn destroy(&self) -> Result<(), ProtocolError> {
        // Take under the write lock, drop outside it.
        let released = self.slot.write().take();
        if released.is_some() {
            tracing::trace!("message handle released");
            Ok(())
        } else {
            tracing::warn!("message handle destroyed more than once");
            Err(ProtocolError::UseAfterDestroy)
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.slot.read().is_none()
    }

    /// Move the value out, consuming the handle.
    pub fn into_inner(self) -> Result<T, ProtocolError> {
        self.slot.into_inner().ok_or(ProtocolError::UseAfterDestroy)
    }
}

impl<T: Clone> MessageHandle<T> {
    /// A new handle around a deep copy; the two are destroyed independently.
    pub fn try_clone(&self) -> Result<Self, ProtocolError> {
        self.with(|value| Self::new(value.clone()))
    }
}

impl<T> From<T> for MessageHandle<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

pub type PreKeyMessageHandle = MessageHandle<PreKeyMessage>;

impl MessageHandle<PreKeyMessage> {
    pub fn deserialize(bytes: &[u8]) -> Result<Self, ProtocolError> {
        PreKeyMessage::deserialize(bytes).map(Self::new)
    }

    /// Owned copy of the wire bytes.
    pub fn serialize(&self) -> Result<Vec<u8>, ProtocolError> {
        self.with(|message| message.serialized().to_vec())
    }

    pub fn message_version(&self) -> Result<u8, ProtocolError> {
        self.with(PreKeyMessage::message_version)
    }

    pub fn registration_id(&self) -> Result<u32, ProtocolError> {
        self.with(PreKeyMessage::registration_id)
    }

    pub fn pre_key_id(&self) -> Result<Option<PreKeyId>, ProtocolError> {
        self.with(PreKeyMessage::pre_key_id)
    }

    pub fn signed_pre_key_id(&self) -> Result<SignedPreKeyId, ProtocolError> {
        self.with(PreKeyMessage::signed_pre_key_id)
    }

    pub fn base_key(&self) -> Result<PublicKey, ProtocolError> {
        self.with(|message| *message.base_key())
    }

    pub fn identity_key(&self) -> Result<IdentityKey, ProtocolError> {
        self.with(|message| *message.identity_key())
    }

    pub fn message(&self) -> Result<SignalMessage, ProtocolError> {
        self.with(|message| message.message().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_handle_reads() {
        let handle = MessageHandle::new(41u32);
        assert_eq!(handle.with(|v| v + 1).unwrap(), 42);
        assert!(!handle.is_destroyed());
    }

    #[test]
    fn destroy_is_terminal() {
        let handle = MessageHandle::new(String::from("live"));
        handle.destroy().unwrap();

        assert!(handle.is_destroyed());
        assert!(matches!(
            handle.with(String::len),
            Err(ProtocolError::UseAfterDestroy)
        ));
        assert!(matches!(
            handle.destroy(),
            Err(ProtocolError::UseAfterDestroy)
        ));
        assert!(handle.try_clone().is_err());
    }

    #[test]
    fn clone_survives_original_destroy() {
        let original = MessageHandle::new(vec![1u8, 2, 3]);
        let copy = original.try_clone().unwrap();
        original.destroy().unwrap();

        assert_eq!(copy.with(Vec::len).unwrap(), 3);
        assert_eq!(copy.into_inner().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn into_inner_after_destroy_fails() {
        let handle = MessageHandle::from(5u8);
        handle.destroy().unwrap();
        assert!(matches!(
            handle.into_inner(),
            Err(ProtocolError::UseAfterDestroy)
        ));
    }

    #[test]
    fn concurrent_destroy_releases_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let handle = Arc::new(MessageHandle::new(0u64));
        let released = Arc::new(AtomicUsize::new(0));

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let handle = Arc::clone(&handle);
                let released = Arc::clone(&released);
                std::thread::spawn(move || {
                    let _ = handle.with(|v| *v);
                    if handle.destroy().is_ok() {
                        released.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        assert_eq!(released.load(Ordering::SeqCst), 1);
        assert!(handle.is_destroyed());
    }
}
