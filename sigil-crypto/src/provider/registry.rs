use std::{collections::HashMap, fmt, sync::Arc};

use sigil_utils::macros::generate_set_and_with;

use super::{CryptoProvider, DefaultProvider};
use crate::CryptoError;

/// Key under which the fallback provider of a category is registered
const WILDCARD: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Role in which a provider is looked up
pub enum ProviderCategory {
    /// Encrypts content encryption keys for JWE recipients
    KeyWrap,
    /// Shared secret derivation
    SharedKey,
    /// Content encryption of JWE payloads
    SymmetricEncryption,
    /// Asymmetric JWS signatures
    MessageSigner,
    /// HMAC JWS signatures
    MacSigner,
    MessageDigest,
}

impl ProviderCategory {
    pub const ALL: [Self; 6] = [
        Self::KeyWrap,
        Self::SharedKey,
        Self::SymmetricEncryption,
        Self::MessageSigner,
        Self::MacSigner,
        Self::MessageDigest,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::KeyWrap => "key wrap",
            Self::SharedKey => "shared key",
            Self::SymmetricEncryption => "symmetric encryption",
            Self::MessageSigner => "message signer",
            Self::MacSigner => "mac signer",
            Self::MessageDigest => "message digest",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ProviderCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Default)]
struct ProviderTable {
    // keys are lower case algorithm names
    providers: HashMap<String, Arc<dyn CryptoProvider>>,
}

impl ProviderTable {
    fn insert(&mut self, algorithm: &str, provider: Arc<dyn CryptoProvider>) {
        self.providers
            .insert(algorithm.to_ascii_lowercase(), provider);
    }

    fn lookup(&self, algorithm: &str) -> Option<&Arc<dyn CryptoProvider>> {
        self.providers
            .get(&algorithm.to_ascii_lowercase())
            .or_else(|| self.providers.get(WILDCARD))
    }
}

impl fmt::Debug for ProviderTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.providers
                    .iter()
                    .map(|(algorithm, provider)| (algorithm, provider.name())),
            )
            .finish()
    }
}

#[derive(Clone)]
/// Registry of providers, one table per [`ProviderCategory`].
///
/// Lookups are case-insensitive on the algorithm name and fall back to the
/// provider registered under `*` for that category. Registration happens
/// through the [`CryptoFactoryBuilder`], a built factory is immutable and can
/// be shared between tasks.
pub struct CryptoFactory {
    tables: [ProviderTable; 6],
}

impl CryptoFactory {
    /// Factory with the [`DefaultProvider`] as fallback of every category
    pub fn new() -> Self {
        CryptoFactoryBuilder::new()
            .with_default_provider(Arc::new(DefaultProvider::new()))
            .build()
    }

    pub fn builder() -> CryptoFactoryBuilder {
        CryptoFactoryBuilder::new()
    }

    /// Provider registered for the algorithm in the given category.
    ///
    /// Returns [`CryptoError::UnsupportedAlgorithm`] if neither the algorithm
    /// nor a wildcard fallback is registered.
    pub fn provider(
        &self,
        category: ProviderCategory,
        algorithm: &str,
    ) -> Result<Arc<dyn CryptoProvider>, CryptoError> {
        self.tables[category.index()]
            .lookup(algorithm)
            .cloned()
            .ok_or_else(|| CryptoError::UnsupportedAlgorithm(algorithm.to_owned()))
    }

    pub fn key_wrap(&self, algorithm: &str) -> Result<Arc<dyn CryptoProvider>, CryptoError> {
        self.provider(ProviderCategory::KeyWrap, algorithm)
    }

    pub fn shared_key(&self, algorithm: &str) -> Result<Arc<dyn CryptoProvider>, CryptoError> {
        self.provider(ProviderCategory::SharedKey, algorithm)
    }

    pub fn symmetric_encryption(
        &self,
        algorithm: &str,
    ) -> Result<Arc<dyn CryptoProvider>, CryptoError> {
        self.provider(ProviderCategory::SymmetricEncryption, algorithm)
    }

    pub fn message_signer(&self, algorithm: &str) -> Result<Arc<dyn CryptoProvider>, CryptoError> {
        self.provider(ProviderCategory::MessageSigner, algorithm)
    }

    pub fn mac_signer(&self, algorithm: &str) -> Result<Arc<dyn CryptoProvider>, CryptoError> {
        self.provider(ProviderCategory::MacSigner, algorithm)
    }

    pub fn message_digest(&self, algorithm: &str) -> Result<Arc<dyn CryptoProvider>, CryptoError> {
        self.provider(ProviderCategory::MessageDigest, algorithm)
    }
}

impl Default for CryptoFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CryptoFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                ProviderCategory::ALL
                    .iter()
                    .map(|category| (category.as_str(), &self.tables[category.index()])),
            )
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
/// Builder of a [`CryptoFactory`], starts without any provider
pub struct CryptoFactoryBuilder {
    tables: [ProviderTable; 6],
}

impl CryptoFactoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    generate_set_and_with! {
        /// Register the provider as `*` fallback of every category
        pub fn default_provider(mut self, provider: Arc<dyn CryptoProvider>) -> Self {
            for table in &mut self.tables {
                table.insert(WILDCARD, provider.clone());
            }
            self
        }
    }

    generate_set_and_with! {
        /// Register the provider for an algorithm in one category,
        /// `*` registers the fallback of that category
        pub fn provider(
            mut self,
            category: ProviderCategory,
            algorithm: &str,
            provider: Arc<dyn CryptoProvider>,
        ) -> Self {
            self.tables[category.index()].insert(algorithm, provider);
            self
        }
    }

    pub fn build(self) -> CryptoFactory {
        CryptoFactory {
            tables: self.tables,
        }
    }
}
