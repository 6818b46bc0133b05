use std::{fmt, sync::Arc};

use zeroize::Zeroizing;

use super::{
    AesGcmProvider, AlgorithmParams, Capabilities, CryptoKey, CryptoKeyPair, CryptoProvider,
    DigestProvider, EcdhProvider, EcdsaProvider, HmacProvider, KeyClass, KeyData, KeyFormat,
    KeyUsages, RsaOaepProvider, RsaSsaProvider,
};
use crate::{CryptoError, jose::JWK};

#[derive(Clone)]
/// Wildcard provider which routes every algorithm to the built-in family implementing it.
///
/// This is the provider registered under `*` in every category of a default
/// [`CryptoFactory`](super::CryptoFactory).
pub struct DefaultProvider {
    families: Arc<[Arc<dyn CryptoProvider>]>,
}

impl DefaultProvider {
    pub fn new() -> Self {
        Self {
            families: Arc::new([
                Arc::new(EcdsaProvider::new()) as Arc<dyn CryptoProvider>,
                Arc::new(RsaSsaProvider::new()),
                Arc::new(HmacProvider::new()),
                Arc::new(RsaOaepProvider::new()),
                Arc::new(AesGcmProvider::new()),
                Arc::new(EcdhProvider::new()),
                Arc::new(DigestProvider::new()),
            ]),
        }
    }

    fn family(&self, algorithm: &str) -> Result<&dyn CryptoProvider, CryptoError> {
        self.families
            .iter()
            .find(|family| family.supports(algorithm))
            .map(AsRef::as_ref)
            .ok_or_else(|| CryptoError::UnsupportedAlgorithm(algorithm.to_owned()))
    }
}

impl Default for DefaultProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DefaultProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.families.iter().map(|family| family.name()))
            .finish()
    }
}

impl CryptoProvider for DefaultProvider {
    fn name(&self) -> &str {
        "*"
    }

    fn supports(&self, algorithm: &str) -> bool {
        self.family(algorithm).is_ok()
    }

    fn capabilities(&self, algorithm: &str) -> Capabilities {
        self.family(algorithm)
            .map(|family| family.capabilities(algorithm))
            .unwrap_or_else(|_err| Capabilities::empty())
    }

    fn allowed_usages(&self, algorithm: &str, class: KeyClass) -> KeyUsages {
        self.family(algorithm)
            .map(|family| family.allowed_usages(algorithm, class))
            .unwrap_or_else(|_err| KeyUsages::empty())
    }

    fn import_formats(&self, algorithm: &str) -> &'static [KeyFormat] {
        self.family(algorithm)
            .map(|family| family.import_formats(algorithm))
            .unwrap_or(&[])
    }

    fn check_params(
        &self,
        algorithm: &str,
        operation: Capabilities,
        params: &AlgorithmParams<'_>,
    ) -> Result<(), CryptoError> {
        self.family(algorithm)?.check_params(algorithm, operation, params)
    }

    fn on_sign(&self, algorithm: &str, key: &CryptoKey, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.family(algorithm)?.on_sign(algorithm, key, data)
    }

    fn on_verify(
        &self,
        algorithm: &str,
        key: &CryptoKey,
        signature: &[u8],
        data: &[u8],
    ) -> Result<bool, CryptoError> {
        self.family(algorithm)?.on_verify(algorithm, key, signature, data)
    }

    fn on_encrypt(
        &self,
        algorithm: &str,
        params: &AlgorithmParams<'_>,
        key: &CryptoKey,
        data: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        self.family(algorithm)?.on_encrypt(algorithm, params, key, data)
    }

    fn on_decrypt(
        &self,
        algorithm: &str,
        params: &AlgorithmParams<'_>,
        key: &CryptoKey,
        data: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        self.family(algorithm)?.on_decrypt(algorithm, params, key, data)
    }

    fn on_derive_bits(
        &self,
        algorithm: &str,
        params: &AlgorithmParams<'_>,
        key: &CryptoKey,
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        self.family(algorithm)?.on_derive_bits(algorithm, params, key)
    }

    fn on_digest(&self, algorithm: &str, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.family(algorithm)?.on_digest(algorithm, data)
    }

    fn on_generate_key(
        &self,
        algorithm: &str,
        params: &AlgorithmParams<'_>,
        usages: KeyUsages,
    ) -> Result<CryptoKey, CryptoError> {
        self.family(algorithm)?.on_generate_key(algorithm, params, usages)
    }

    fn on_generate_key_pair(
        &self,
        algorithm: &str,
        params: &AlgorithmParams<'_>,
        usages: KeyUsages,
    ) -> Result<CryptoKeyPair, CryptoError> {
        self.family(algorithm)?
            .on_generate_key_pair(algorithm, params, usages)
    }

    fn on_import_key(
        &self,
        algorithm: &str,
        data: &KeyData,
        usages: KeyUsages,
    ) -> Result<CryptoKey, CryptoError> {
        self.family(algorithm)?.on_import_key(algorithm, data, usages)
    }

    fn on_export_key(&self, key: &CryptoKey) -> Result<JWK, CryptoError> {
        self.family(key.algorithm())?.on_export_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{jose::ECDH, provider::ProviderExt};

    #[test]
    fn routes_by_algorithm_family() {
        let provider = DefaultProvider::new();
        for algorithm in [
            "ES256", "ES256K", "RS256", "PS512", "HS384", "RSA-OAEP", "RSA-OAEP-256", "A128GCM",
            ECDH, "SHA-512",
        ] {
            assert!(provider.supports(algorithm), "{algorithm}");
        }
        assert!(!provider.supports("none"));
        assert!(provider.capabilities("none").is_empty());
    }

    #[test]
    fn unknown_algorithm_is_unsupported() {
        let err = DefaultProvider::new().digest("MD5", b"x").unwrap_err();
        assert!(matches!(err, CryptoError::UnsupportedAlgorithm(alg) if alg == "MD5"));
    }

    #[test]
    fn family_capabilities_are_kept() {
        let provider = DefaultProvider::new();
        assert!(matches!(
            provider.digest("ES256", b"x"),
            Err(CryptoError::UnsupportedOperation { operation: "digest", .. })
        ));
        assert_eq!(provider.import_formats("RS256"), &[KeyFormat::Jwk]);

        let pair = provider
            .generate_key_pair("ES256", &AlgorithmParams::None, KeyUsages::SIGN | KeyUsages::VERIFY)
            .unwrap();
        let signature = provider.sign("ES256", &pair.private, b"data").unwrap();
        assert!(provider.verify("ES256", &pair.public, &signature, b"data").unwrap());
        assert_eq!(provider.digest("sha-256", b"").unwrap().len(), 32);
    }
}
