//! Algorithm providers and the registry which selects them.
//!
//! A [`CryptoProvider`] implements the primitives of one algorithm family,
//! it declares which algorithms it [supports](CryptoProvider::supports),
//! which [`Capabilities`] it offers and which [`KeyUsages`] are legal per
//! [`KeyClass`]. Callers never invoke the `on_*` hooks directly, the
//! [`ProviderExt`] methods gate every call in order:
//!
//! 1. the algorithm is supported by the provider (else [`CryptoError::UnsupportedAlgorithm`]);
//! 2. the provider offers the capability (else [`CryptoError::UnsupportedOperation`]);
//! 3. the algorithm parameters have a valid shape;
//! 4. the usage is declared by the key and allowed by the provider for the
//!    key's class (else [`CryptoError::KeyUsageViolation`]).
//!
//! Imports are further gated on the [`KeyFormat`] of the key material
//! (else [`CryptoError::KeyFormatMismatch`]) and, for JWK material, on the
//! usages the key declares in `key_ops` and `use` (see [`KeyUsages::declared_by`]).

use bitflags::bitflags;
use zeroize::Zeroizing;

use crate::{CryptoError, jose::JWK};

mod key;
pub use key::{CryptoKey, CryptoKeyPair, KeyClass, KeyData, KeyFormat, KeyHandle, KeyUsages};

mod aes_gcm;
mod digest;
mod ec;
mod ecdh;
mod ecdsa;
mod hmac;
mod rsa_keys;
mod rsa_oaep;
mod rsa_ssa;

pub use aes_gcm::{AES_GCM_IV_LEN, AES_GCM_TAG_LEN, AesGcmProvider};
pub use digest::DigestProvider;
pub use ecdh::EcdhProvider;
pub use ecdsa::EcdsaProvider;
pub use hmac::HmacProvider;
pub use rsa_oaep::RsaOaepProvider;
pub use rsa_ssa::RsaSsaProvider;

mod default;
pub use default::DefaultProvider;

mod registry;
pub use registry::{CryptoFactory, CryptoFactoryBuilder, ProviderCategory};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// Primitive operations offered by a provider
    pub struct Capabilities: u16 {
        const SIGN = 1;
        const VERIFY = 1 << 1;
        const ENCRYPT = 1 << 2;
        const DECRYPT = 1 << 3;
        const DERIVE_BITS = 1 << 4;
        const DIGEST = 1 << 5;
        const GENERATE_KEY = 1 << 6;
        const GENERATE_KEY_PAIR = 1 << 7;
        const IMPORT_KEY = 1 << 8;
        const EXPORT_KEY = 1 << 9;
    }
}

#[derive(Debug, Clone, Copy, Default)]
/// Algorithm specific parameters of an operation
pub enum AlgorithmParams<'a> {
    #[default]
    None,
    /// Authenticated encryption: initialization vector and additional authenticated data
    Aead { iv: &'a [u8], aad: &'a [u8] },
    /// Shared secret derivation with the public key of the other party
    Ecdh { public: &'a CryptoKey },
    /// RSA key pair generation
    RsaKeyGen { modulus_length: usize },
    /// Elliptic curve key pair generation
    EcKeyGen {
        curve: crate::jose::JWKEllipticCurves,
    },
    /// Secret key generation, length in bytes
    SecretKeyGen { length: usize },
}

impl AlgorithmParams<'_> {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Aead { .. } => "aead",
            Self::Ecdh { .. } => "ecdh",
            Self::RsaKeyGen { .. } => "rsa key generation",
            Self::EcKeyGen { .. } => "ec key generation",
            Self::SecretKeyGen { .. } => "secret key generation",
        }
    }
}

/// Implementation of the primitives of one algorithm family.
///
/// Only the hooks matching the declared [`Capabilities`] need to be implemented,
/// all others report [`CryptoError::UnsupportedOperation`].
pub trait CryptoProvider: Send + Sync + 'static {
    /// Name of the algorithm family
    fn name(&self) -> &str;

    /// Returns true if this provider implements the given algorithm,
    /// compared case-insensitive
    fn supports(&self, algorithm: &str) -> bool {
        self.name().eq_ignore_ascii_case(algorithm)
    }

    fn capabilities(&self, algorithm: &str) -> Capabilities;

    /// Usages legal for keys of the given class
    fn allowed_usages(&self, algorithm: &str, class: KeyClass) -> KeyUsages;

    /// Formats accepted by [`CryptoProvider::on_import_key`]
    fn import_formats(&self, _algorithm: &str) -> &'static [KeyFormat] {
        &[KeyFormat::Raw, KeyFormat::Jwk]
    }

    /// Validate the shape of the algorithm parameters for an operation
    fn check_params(
        &self,
        _algorithm: &str,
        _operation: Capabilities,
        _params: &AlgorithmParams<'_>,
    ) -> Result<(), CryptoError> {
        Ok(())
    }

    fn on_sign(&self, algorithm: &str, _key: &CryptoKey, _data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Err(CryptoError::unsupported_operation(algorithm, "sign"))
    }

    fn on_verify(
        &self,
        algorithm: &str,
        _key: &CryptoKey,
        _signature: &[u8],
        _data: &[u8],
    ) -> Result<bool, CryptoError> {
        Err(CryptoError::unsupported_operation(algorithm, "verify"))
    }

    fn on_encrypt(
        &self,
        algorithm: &str,
        _params: &AlgorithmParams<'_>,
        _key: &CryptoKey,
        _data: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        Err(CryptoError::unsupported_operation(algorithm, "encrypt"))
    }

    fn on_decrypt(
        &self,
        algorithm: &str,
        _params: &AlgorithmParams<'_>,
        _key: &CryptoKey,
        _data: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        Err(CryptoError::unsupported_operation(algorithm, "decrypt"))
    }

    fn on_derive_bits(
        &self,
        algorithm: &str,
        _params: &AlgorithmParams<'_>,
        _key: &CryptoKey,
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        Err(CryptoError::unsupported_operation(algorithm, "deriveBits"))
    }

    fn on_digest(&self, algorithm: &str, _data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Err(CryptoError::unsupported_operation(algorithm, "digest"))
    }

    fn on_generate_key(
        &self,
        algorithm: &str,
        _params: &AlgorithmParams<'_>,
        _usages: KeyUsages,
    ) -> Result<CryptoKey, CryptoError> {
        Err(CryptoError::unsupported_operation(algorithm, "generateKey"))
    }

    fn on_generate_key_pair(
        &self,
        algorithm: &str,
        _params: &AlgorithmParams<'_>,
        _usages: KeyUsages,
    ) -> Result<CryptoKeyPair, CryptoError> {
        Err(CryptoError::unsupported_operation(algorithm, "generateKeyPair"))
    }

    fn on_import_key(
        &self,
        algorithm: &str,
        _data: &KeyData,
        _usages: KeyUsages,
    ) -> Result<CryptoKey, CryptoError> {
        Err(CryptoError::unsupported_operation(algorithm, "importKey"))
    }

    /// Export a key as [`JWK`], private keys export their full form
    fn on_export_key(&self, key: &CryptoKey) -> Result<JWK, CryptoError> {
        Err(CryptoError::unsupported_operation(key.algorithm(), "exportKey"))
    }
}

/// Capability gated entry points of a [`CryptoProvider`]
pub trait ProviderExt: CryptoProvider {
    fn sign(&self, algorithm: &str, key: &CryptoKey, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        gate(self, algorithm, Capabilities::SIGN, "sign", &AlgorithmParams::None)?;
        check_usage(self, algorithm, key, KeyUsages::SIGN)?;
        self.on_sign(algorithm, key, data)
    }

    /// Returns `Ok(false)` for a signature which does not match
    fn verify(
        &self,
        algorithm: &str,
        key: &CryptoKey,
        signature: &[u8],
        data: &[u8],
    ) -> Result<bool, CryptoError> {
        gate(self, algorithm, Capabilities::VERIFY, "verify", &AlgorithmParams::None)?;
        check_usage(self, algorithm, key, KeyUsages::VERIFY)?;
        self.on_verify(algorithm, key, signature, data)
    }

    fn encrypt(
        &self,
        algorithm: &str,
        params: &AlgorithmParams<'_>,
        key: &CryptoKey,
        data: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        gate(self, algorithm, Capabilities::ENCRYPT, "encrypt", params)?;
        check_usage(self, algorithm, key, KeyUsages::ENCRYPT)?;
        self.on_encrypt(algorithm, params, key, data)
    }

    fn decrypt(
        &self,
        algorithm: &str,
        params: &AlgorithmParams<'_>,
        key: &CryptoKey,
        data: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        gate(self, algorithm, Capabilities::DECRYPT, "decrypt", params)?;
        check_usage(self, algorithm, key, KeyUsages::DECRYPT)?;
        self.on_decrypt(algorithm, params, key, data)
    }

    /// Encrypt a content encryption key for the holder of `key`
    fn wrap_key(&self, algorithm: &str, key: &CryptoKey, cek: &[u8]) -> Result<Vec<u8>, CryptoError> {
        gate(self, algorithm, Capabilities::ENCRYPT, "wrapKey", &AlgorithmParams::None)?;
        check_usage(self, algorithm, key, KeyUsages::WRAP_KEY)?;
        self.on_encrypt(algorithm, &AlgorithmParams::None, key, cek)
    }

    /// Decrypt a content encryption key wrapped by [`ProviderExt::wrap_key`]
    fn unwrap_key(
        &self,
        algorithm: &str,
        key: &CryptoKey,
        wrapped: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        gate(self, algorithm, Capabilities::DECRYPT, "unwrapKey", &AlgorithmParams::None)?;
        check_usage(self, algorithm, key, KeyUsages::UNWRAP_KEY)?;
        self.on_decrypt(algorithm, &AlgorithmParams::None, key, wrapped)
    }

    /// Derive `length` bits of shared secret, or all available bits if `None`
    fn derive_bits(
        &self,
        algorithm: &str,
        params: &AlgorithmParams<'_>,
        key: &CryptoKey,
        length: Option<usize>,
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        gate(self, algorithm, Capabilities::DERIVE_BITS, "deriveBits", params)?;
        check_usage(self, algorithm, key, KeyUsages::DERIVE_BITS)?;
        let mut bits = self.on_derive_bits(algorithm, params, key)?;
        if let Some(length) = length {
            if length % 8 != 0 || length / 8 > bits.len() {
                return Err(CryptoError::other(format!(
                    "cannot derive {length} bits from a {} bit secret",
                    bits.len() * 8
                )));
            }
            bits.truncate(length / 8);
        }
        Ok(bits)
    }

    fn digest(&self, algorithm: &str, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        gate(self, algorithm, Capabilities::DIGEST, "digest", &AlgorithmParams::None)?;
        self.on_digest(algorithm, data)
    }

    fn generate_key(
        &self,
        algorithm: &str,
        params: &AlgorithmParams<'_>,
        usages: KeyUsages,
    ) -> Result<CryptoKey, CryptoError> {
        gate(self, algorithm, Capabilities::GENERATE_KEY, "generateKey", params)?;
        check_requested_usages(self, algorithm, KeyClass::Secret, usages)?;
        self.on_generate_key(algorithm, params, usages)
    }

    fn generate_key_pair(
        &self,
        algorithm: &str,
        params: &AlgorithmParams<'_>,
        usages: KeyUsages,
    ) -> Result<CryptoKeyPair, CryptoError> {
        gate(self, algorithm, Capabilities::GENERATE_KEY_PAIR, "generateKeyPair", params)?;
        let legal = self.allowed_usages(algorithm, KeyClass::Private)
            | self.allowed_usages(algorithm, KeyClass::Public);
        if !legal.contains(usages) {
            return Err(CryptoError::usage_violation(algorithm, usages.difference(legal).name()));
        }
        self.on_generate_key_pair(algorithm, params, usages)
    }

    fn import_key(
        &self,
        algorithm: &str,
        data: &KeyData,
        usages: KeyUsages,
    ) -> Result<CryptoKey, CryptoError> {
        gate(self, algorithm, Capabilities::IMPORT_KEY, "importKey", &AlgorithmParams::None)?;
        let formats = self.import_formats(algorithm);
        if !formats.contains(&data.format()) {
            let expected = match formats {
                [single] => single.as_str(),
                _ => "raw or jwk",
            };
            return Err(CryptoError::format_mismatch(expected, data.format().as_str()));
        }
        if let KeyData::Jwk(jwk) = data {
            let declared = KeyUsages::declared_by(jwk);
            if !declared.contains(usages) {
                return Err(CryptoError::usage_violation(
                    algorithm,
                    usages.difference(declared).name(),
                ));
            }
        }
        let key = self.on_import_key(algorithm, data, usages)?;
        check_requested_usages(self, algorithm, key.class(), usages)?;
        Ok(key)
    }

    fn export_key(&self, key: &CryptoKey) -> Result<JWK, CryptoError> {
        gate(
            self,
            key.algorithm(),
            Capabilities::EXPORT_KEY,
            "exportKey",
            &AlgorithmParams::None,
        )?;
        self.on_export_key(key)
    }
}

impl<P: CryptoProvider + ?Sized> ProviderExt for P {}

fn gate<P: CryptoProvider + ?Sized>(
    provider: &P,
    algorithm: &str,
    capability: Capabilities,
    operation: &'static str,
    params: &AlgorithmParams<'_>,
) -> Result<(), CryptoError> {
    if !provider.supports(algorithm) {
        return Err(CryptoError::UnsupportedAlgorithm(algorithm.to_owned()));
    }
    if !provider.capabilities(algorithm).contains(capability) {
        return Err(CryptoError::unsupported_operation(algorithm, operation));
    }
    provider.check_params(algorithm, capability, params)
}

fn check_usage<P: CryptoProvider + ?Sized>(
    provider: &P,
    algorithm: &str,
    key: &CryptoKey,
    usage: KeyUsages,
) -> Result<(), CryptoError> {
    if !key.usages().contains(usage)
        || !provider.allowed_usages(algorithm, key.class()).contains(usage)
    {
        return Err(CryptoError::usage_violation(algorithm, usage.name()));
    }
    Ok(())
}

fn check_requested_usages<P: CryptoProvider + ?Sized>(
    provider: &P,
    algorithm: &str,
    class: KeyClass,
    usages: KeyUsages,
) -> Result<(), CryptoError> {
    let allowed = provider.allowed_usages(algorithm, class);
    if !allowed.contains(usages) {
        return Err(CryptoError::usage_violation(algorithm, usages.difference(allowed).name()));
    }
    Ok(())
}

pub(crate) fn invalid_params(algorithm: &str, params: &AlgorithmParams<'_>) -> CryptoError {
    CryptoError::other(format!(
        "invalid parameters for algorithm '{algorithm}': {}",
        params.name()
    ))
}
