//! Key store aware entry point to the providers.
//!
//! The [`CryptoExtension`] resolves key references through a [`KeyStore`],
//! picks the provider from the [`CryptoFactory`] and imports the key right
//! before the primitive is invoked. Private key material never leaves it.

use std::sync::Arc;

use sigil_error::ErrorContext as _;
use zeroize::Zeroizing;

use crate::{
    CryptoError,
    jose::{
        DigestAlgorithm, ECDH, JWA, JWEAlgorithm, JWEEncryption, JWK, JWKEllipticCurves,
        is_mac_algorithm,
    },
    keystore::KeyStore,
    provider::{
        AES_GCM_TAG_LEN, AlgorithmParams, CryptoFactory, CryptoProvider, KeyClass, KeyData,
        KeyUsages, ProviderCategory, ProviderExt,
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Public metadata of a stored key
pub struct KeyMetadata {
    pub kty: &'static str,
    pub alg: Option<String>,
    pub kid: Option<String>,
    pub curve: Option<JWKEllipticCurves>,
}

impl From<&JWK> for KeyMetadata {
    fn from(jwk: &JWK) -> Self {
        Self {
            kty: jwk.kty(),
            alg: jwk.alg().map(ToOwned::to_owned),
            kid: jwk.kid().map(ToOwned::to_owned),
            curve: jwk.curve(),
        }
    }
}

/// Category a provider for the algorithm is looked up in
pub fn category_of(algorithm: &str) -> Result<ProviderCategory, CryptoError> {
    if is_mac_algorithm(algorithm) {
        Ok(ProviderCategory::MacSigner)
    } else if algorithm.parse::<JWA>().is_ok() {
        Ok(ProviderCategory::MessageSigner)
    } else if algorithm.parse::<JWEAlgorithm>().is_ok() {
        Ok(ProviderCategory::KeyWrap)
    } else if algorithm.parse::<JWEEncryption>().is_ok() {
        Ok(ProviderCategory::SymmetricEncryption)
    } else if algorithm.eq_ignore_ascii_case(ECDH) {
        Ok(ProviderCategory::SharedKey)
    } else if algorithm.parse::<DigestAlgorithm>().is_ok() {
        Ok(ProviderCategory::MessageDigest)
    } else {
        Err(CryptoError::UnsupportedAlgorithm(algorithm.to_owned()))
    }
}

#[derive(Debug, Clone)]
/// Binds a [`CryptoFactory`] to a [`KeyStore`]
pub struct CryptoExtension<K> {
    factory: Arc<CryptoFactory>,
    key_store: K,
}

impl<K: KeyStore> CryptoExtension<K> {
    pub fn new(factory: Arc<CryptoFactory>, key_store: K) -> Self {
        Self { factory, key_store }
    }

    /// Extension backed by the built-in providers
    pub fn with_default_factory(key_store: K) -> Self {
        Self::new(Arc::new(CryptoFactory::default()), key_store)
    }

    pub fn factory(&self) -> &CryptoFactory {
        &self.factory
    }

    pub fn key_store(&self) -> &K {
        &self.key_store
    }

    fn signer(&self, algorithm: &str) -> Result<Arc<dyn CryptoProvider>, CryptoError> {
        if is_mac_algorithm(algorithm) {
            self.factory.mac_signer(algorithm)
        } else {
            self.factory.message_signer(algorithm)
        }
    }

    /// Algorithm, key id and type of the key behind the reference
    pub async fn key_metadata(&self, reference: &str) -> Result<KeyMetadata, CryptoError> {
        match self.key_store.get(reference, false).await {
            Ok(public) => Ok(KeyMetadata::from(&public)),
            Err(CryptoError::UnsupportedOperation { .. }) => {
                // secret keys have no public form
                tracing::trace!(reference, "read metadata of a secret key");
                let jwk = self.key_store.get(reference, true).await?;
                Ok(KeyMetadata::from(&jwk))
            }
            Err(err) => Err(err),
        }
    }

    /// Sign `data` with the private key behind the reference
    pub async fn sign_with_key_reference(
        &self,
        algorithm: &str,
        reference: &str,
        data: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let provider = self.signer(algorithm)?;
        tracing::debug!(algorithm, reference, provider = provider.name(), "sign with key reference");
        let jwk = self.key_store.get(reference, true).await?;
        let key = provider.import_key(algorithm, &KeyData::Jwk(jwk), KeyUsages::SIGN)?;
        provider.sign(algorithm, &key, data)
    }

    /// Verify a signature with the given key, only its public form is used
    /// for asymmetric keys.
    ///
    /// Returns `Ok(false)` if the signature does not match.
    pub fn verify_with_key(
        &self,
        algorithm: &str,
        jwk: &JWK,
        signature: &[u8],
        data: &[u8],
    ) -> Result<bool, CryptoError> {
        let provider = self.signer(algorithm)?;
        tracing::trace!(algorithm, kid = jwk.kid(), provider = provider.name(), "verify with key");
        let jwk = match jwk.key_type() {
            crate::jose::JWKType::OCT { .. } => jwk.clone(),
            _ => jwk.to_public()?,
        };
        let key = provider.import_key(algorithm, &KeyData::Jwk(jwk), KeyUsages::VERIFY)?;
        provider.verify(algorithm, &key, signature, data)
    }

    pub async fn verify_with_key_reference(
        &self,
        algorithm: &str,
        reference: &str,
        signature: &[u8],
        data: &[u8],
    ) -> Result<bool, CryptoError> {
        let include_private = is_mac_algorithm(algorithm);
        let jwk = self.key_store.get(reference, include_private).await?;
        self.verify_with_key(algorithm, &jwk, signature, data)
    }

    /// Wrap a content encryption key for the holder of the given public key
    pub fn encrypt_with_key(
        &self,
        algorithm: &str,
        jwk: &JWK,
        cek: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let provider = self.factory.key_wrap(algorithm)?;
        tracing::debug!(algorithm, kid = jwk.kid(), provider = provider.name(), "wrap content encryption key");
        let key = provider.import_key(algorithm, &KeyData::Jwk(jwk.to_public()?), KeyUsages::WRAP_KEY)?;
        provider.wrap_key(algorithm, &key, cek)
    }

    /// Unwrap a content encryption key with the private key behind the reference
    pub async fn decrypt_with_key_reference(
        &self,
        algorithm: &str,
        reference: &str,
        wrapped: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let provider = self.factory.key_wrap(algorithm)?;
        tracing::debug!(algorithm, reference, provider = provider.name(), "unwrap content encryption key");
        let jwk = self.key_store.get(reference, true).await?;
        let key = provider.import_key(algorithm, &KeyData::Jwk(jwk), KeyUsages::UNWRAP_KEY)?;
        provider.unwrap_key(algorithm, &key, wrapped)
    }

    /// Shared secret between the private key behind the reference and the peer's public key
    pub async fn derive_bits_with_key_reference(
        &self,
        reference: &str,
        peer: &JWK,
        length: Option<usize>,
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let provider = self.factory.shared_key(ECDH)?;
        tracing::debug!(reference, peer = peer.kid(), provider = provider.name(), "derive shared secret");
        let jwk = self.key_store.get(reference, true).await?;
        let private = provider.import_key(ECDH, &KeyData::Jwk(jwk), KeyUsages::DERIVE_BITS)?;
        let public = provider.import_key(ECDH, &KeyData::Jwk(peer.to_public()?), KeyUsages::empty())?;
        provider.derive_bits(ECDH, &AlgorithmParams::Ecdh { public: &public }, &private, length)
    }

    pub fn digest(&self, algorithm: &str, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.factory.message_digest(algorithm)?.digest(algorithm, data)
    }

    /// Authenticated encryption of `plaintext`, returns `(ciphertext, tag)`
    pub fn symmetric_encrypt(
        &self,
        algorithm: &str,
        cek: &[u8],
        iv: &[u8],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), CryptoError> {
        let provider = self.factory.symmetric_encryption(algorithm)?;
        tracing::trace!(algorithm, provider = provider.name(), "encrypt content");
        let key = provider.import_key(
            algorithm,
            &KeyData::Raw(Zeroizing::new(cek.to_vec())),
            KeyUsages::ENCRYPT,
        )?;
        let mut ciphertext = provider.encrypt(algorithm, &AlgorithmParams::Aead { iv, aad }, &key, plaintext)?;
        let split = ciphertext
            .len()
            .checked_sub(AES_GCM_TAG_LEN)
            .context("sealed content is shorter than its tag")?;
        let tag = ciphertext.split_off(split);
        Ok((ciphertext, tag))
    }

    /// Authenticated decryption, fails with [`CryptoError::DecryptionFailure`]
    /// if the tag does not match
    pub fn symmetric_decrypt(
        &self,
        algorithm: &str,
        cek: &[u8],
        iv: &[u8],
        aad: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let provider = self.factory.symmetric_encryption(algorithm)?;
        tracing::trace!(algorithm, provider = provider.name(), "decrypt content");
        let key = provider.import_key(
            algorithm,
            &KeyData::Raw(Zeroizing::new(cek.to_vec())),
            KeyUsages::DECRYPT,
        )?;
        let mut sealed = Vec::with_capacity(ciphertext.len() + tag.len());
        sealed.extend_from_slice(ciphertext);
        sealed.extend_from_slice(tag);
        provider.decrypt(algorithm, &AlgorithmParams::Aead { iv, aad }, &key, &sealed)
    }

    /// Generate a secret key and store it under the reference, returns its key id
    pub async fn generate_key(
        &self,
        algorithm: &str,
        params: &AlgorithmParams<'_>,
        reference: &str,
    ) -> Result<String, CryptoError> {
        let provider = self.factory.provider(category_of(algorithm)?, algorithm)?;
        let usages = provider.allowed_usages(algorithm, KeyClass::Secret);
        let key = provider.generate_key(algorithm, params, usages)?;
        let jwk = with_thumbprint_kid(provider.export_key(&key)?)?;
        let kid = jwk.kid().unwrap_or_default().to_owned();
        tracing::debug!(algorithm, reference, kid, "generated secret key");
        self.key_store.save(reference, jwk).await?;
        Ok(kid)
    }

    /// Generate a key pair, store its private form under the reference
    /// and return the public form
    pub async fn generate_key_pair(
        &self,
        algorithm: &str,
        params: &AlgorithmParams<'_>,
        reference: &str,
    ) -> Result<JWK, CryptoError> {
        let provider = self.factory.provider(category_of(algorithm)?, algorithm)?;
        let usages = provider.allowed_usages(algorithm, KeyClass::Private)
            | provider.allowed_usages(algorithm, KeyClass::Public);
        let pair = provider.generate_key_pair(algorithm, params, usages)?;
        let private = with_thumbprint_kid(provider.export_key(&pair.private)?)?;
        let public = private.to_public()?;
        tracing::debug!(algorithm, reference, kid = public.kid(), "generated key pair");
        self.key_store.save(reference, private).await?;
        Ok(public)
    }
}

/// Use the thumbprint of the key as its id, unless it already has one
pub(crate) fn with_thumbprint_kid(jwk: JWK) -> Result<JWK, CryptoError> {
    if jwk.kid().is_some() {
        return Ok(jwk);
    }
    let kid = jwk.thumbprint()?;
    Ok(jwk.with_kid(kid))
}
