//! Key store boundary.
//!
//! A [`KeyStore`] maps an opaque key reference to key material. The token
//! engine only ever asks for the public form of a key, the full form is
//! requested by the [`CryptoExtension`](crate::extension::CryptoExtension)
//! right before a private operation and never leaves it.

use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;

use crate::{CryptoError, jose::JWK};

/// Store of key material addressed by reference.
///
/// Implementations are expected to serialize concurrent writes to the
/// same reference themselves.
pub trait KeyStore: Send + Sync + 'static {
    /// Key material stored under the reference.
    ///
    /// Returns the public form unless `include_private` is set,
    /// [`CryptoError::KeyNotFound`] if nothing is stored. Symmetric keys
    /// have no public form, asking for it fails with
    /// [`CryptoError::UnsupportedOperation`].
    fn get(
        &self,
        reference: &str,
        include_private: bool,
    ) -> impl Future<Output = Result<JWK, CryptoError>> + Send;

    /// Store key material under the reference, replacing what was there
    fn save(&self, reference: &str, key: JWK) -> impl Future<Output = Result<(), CryptoError>> + Send;

    fn contains(&self, reference: &str) -> impl Future<Output = Result<bool, CryptoError>> + Send;
}

impl<K: KeyStore> KeyStore for Arc<K> {
    #[inline]
    fn get(
        &self,
        reference: &str,
        include_private: bool,
    ) -> impl Future<Output = Result<JWK, CryptoError>> + Send {
        self.as_ref().get(reference, include_private)
    }

    #[inline]
    fn save(&self, reference: &str, key: JWK) -> impl Future<Output = Result<(), CryptoError>> + Send {
        self.as_ref().save(reference, key)
    }

    #[inline]
    fn contains(&self, reference: &str) -> impl Future<Output = Result<bool, CryptoError>> + Send {
        self.as_ref().contains(reference)
    }
}

#[derive(Debug, Clone, Default)]
/// In-memory [`KeyStore`], cheap to clone and safe to share between tasks
pub struct MemoryKeyStore {
    keys: Arc<RwLock<HashMap<String, JWK>>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }
}

impl KeyStore for MemoryKeyStore {
    async fn get(&self, reference: &str, include_private: bool) -> Result<JWK, CryptoError> {
        let key = self
            .keys
            .read()
            .get(reference)
            .cloned()
            .ok_or_else(|| CryptoError::KeyNotFound(reference.to_owned()))?;
        if include_private {
            Ok(key)
        } else {
            key.to_public()
        }
    }

    async fn save(&self, reference: &str, key: JWK) -> Result<(), CryptoError> {
        tracing::trace!(reference, kty = key.kty(), "save key");
        self.keys.write().insert(reference.to_owned(), key);
        Ok(())
    }

    async fn contains(&self, reference: &str) -> Result<bool, CryptoError> {
        Ok(self.keys.read().contains_key(reference))
    }
}
