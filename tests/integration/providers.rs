//! Registry overrides and capability gating with custom providers.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use sigil::crypto::{
    CryptoError,
    extension::CryptoExtension,
    jose::{JWS, SignOptions},
    keystore::MemoryKeyStore,
    provider::{
        AlgorithmParams, Capabilities, CryptoFactory, CryptoKey, CryptoProvider, DefaultProvider,
        DigestProvider, EcdsaProvider, KeyClass, KeyData, KeyUsages, ProviderCategory, ProviderExt,
    },
};

#[derive(Debug, Default)]
struct CountingDigest {
    calls: AtomicUsize,
}

impl CryptoProvider for CountingDigest {
    fn name(&self) -> &str {
        "SHA-256"
    }

    fn capabilities(&self, _algorithm: &str) -> Capabilities {
        Capabilities::DIGEST
    }

    fn allowed_usages(&self, _algorithm: &str, _class: KeyClass) -> KeyUsages {
        KeyUsages::empty()
    }

    fn on_digest(&self, algorithm: &str, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        DigestProvider::new().digest(algorithm, data)
    }
}

/// ES256 provider which can verify, but never sign
#[derive(Debug, Default)]
struct VerifyOnly(EcdsaProvider);

impl CryptoProvider for VerifyOnly {
    fn name(&self) -> &str {
        "ES256"
    }

    fn capabilities(&self, _algorithm: &str) -> Capabilities {
        Capabilities::VERIFY | Capabilities::IMPORT_KEY
    }

    fn allowed_usages(&self, algorithm: &str, class: KeyClass) -> KeyUsages {
        self.0.allowed_usages(algorithm, class)
    }

    fn on_verify(
        &self,
        algorithm: &str,
        key: &CryptoKey,
        signature: &[u8],
        data: &[u8],
    ) -> Result<bool, CryptoError> {
        self.0.on_verify(algorithm, key, signature, data)
    }

    fn on_import_key(
        &self,
        algorithm: &str,
        data: &KeyData,
        usages: KeyUsages,
    ) -> Result<CryptoKey, CryptoError> {
        self.0.on_import_key(algorithm, data, usages)
    }
}

#[test]
fn category_override_falls_back_to_wildcard() {
    let counting = Arc::new(CountingDigest::default());
    let factory = CryptoFactory::builder()
        .with_default_provider(Arc::new(DefaultProvider::new()))
        .with_provider(ProviderCategory::MessageDigest, "SHA-256", counting.clone())
        .build();
    let extension = CryptoExtension::new(Arc::new(factory), MemoryKeyStore::new());

    assert_eq!(extension.digest("sha-256", b"abc").unwrap().len(), 32);
    assert_eq!(extension.digest("SHA-256", b"abc").unwrap().len(), 32);
    assert_eq!(counting.calls.load(Ordering::SeqCst), 2);

    assert_eq!(extension.digest("SHA-512", b"abc").unwrap().len(), 64);
    assert_eq!(counting.calls.load(Ordering::SeqCst), 2);

    // categories are independent tables
    assert_eq!(
        extension.factory().mac_signer("SHA-256").unwrap().name(),
        "*"
    );
}

#[test]
fn factory_without_fallback() {
    let factory = CryptoFactory::builder()
        .with_provider(ProviderCategory::MessageDigest, "SHA-256", Arc::new(CountingDigest::default()))
        .build();
    factory.message_digest("SHA-256").unwrap();
    assert!(matches!(
        factory.message_digest("SHA-384"),
        Err(CryptoError::UnsupportedAlgorithm(alg)) if alg == "SHA-384"
    ));
    assert!(matches!(
        factory.message_signer("ES256"),
        Err(CryptoError::UnsupportedAlgorithm(_))
    ));
}

#[tokio::test]
async fn capabilities_gate_operations() {
    let key_store = MemoryKeyStore::new();
    let full = CryptoExtension::with_default_factory(key_store.clone());
    let public = full
        .generate_key_pair("ES256", &AlgorithmParams::None, "signing")
        .await
        .unwrap();

    let factory = CryptoFactory::builder()
        .with_default_provider(Arc::new(DefaultProvider::new()))
        .with_provider(ProviderCategory::MessageSigner, "ES256", Arc::new(VerifyOnly::default()))
        .build();
    let restricted = CryptoExtension::new(Arc::new(factory), key_store);

    assert!(matches!(
        JWS::sign(&restricted, "signing", b"nope".as_slice(), &SignOptions::new()).await,
        Err(CryptoError::UnsupportedOperation { operation, .. }) if operation == "sign"
    ));

    let jws = JWS::sign(&full, "signing", b"yes".as_slice(), &SignOptions::new())
        .await
        .unwrap();
    assert!(jws.verify(&restricted, &[public]).unwrap());
}
