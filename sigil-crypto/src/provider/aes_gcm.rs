use aws_lc_rs::aead::{AES_128_GCM, AES_192_GCM, AES_256_GCM, Aad, LessSafeKey, Nonce, UnboundKey};
use sigil_error::OpaqueError;
use zeroize::Zeroizing;

use super::{
    AlgorithmParams, Capabilities, CryptoKey, CryptoProvider, KeyClass, KeyData, KeyHandle,
    KeyUsages,
    hmac::{export_secret, random_secret, secret_from_data},
    invalid_params,
};
use crate::{
    CryptoError,
    jose::{JWEEncryption, JWK},
};

/// Length of the initialization vector of every AES-GCM variant
pub const AES_GCM_IV_LEN: usize = 12;
/// Length of the authentication tag appended to the ciphertext
pub const AES_GCM_TAG_LEN: usize = 16;

#[derive(Debug, Clone, Copy, Default)]
#[non_exhaustive]
/// AES in Galois/Counter mode (`A128GCM`, `A192GCM`, `A256GCM`).
///
/// Encryption returns `ciphertext || tag`, decryption expects the same layout.
pub struct AesGcmProvider;

impl AesGcmProvider {
    pub fn new() -> Self {
        Self
    }
}

fn aead_key(algorithm: &str, key: &CryptoKey) -> Result<LessSafeKey, CryptoError> {
    let enc: JWEEncryption = algorithm.parse()?;
    let KeyHandle::Secret(secret) = key.handle() else {
        return Err(CryptoError::format_mismatch("oct", key.handle().kty()));
    };
    if secret.len() != enc.key_len() {
        return Err(CryptoError::invalid_key(format!(
            "{enc} requires a {} byte key, got {}",
            enc.key_len(),
            secret.len()
        )));
    }
    let aead = match enc {
        JWEEncryption::A128GCM => &AES_128_GCM,
        JWEEncryption::A192GCM => &AES_192_GCM,
        JWEEncryption::A256GCM => &AES_256_GCM,
    };
    let key = UnboundKey::new(aead, secret)
        .map_err(|err| CryptoError::InvalidKey(OpaqueError::from_std(err)))?;
    Ok(LessSafeKey::new(key))
}

fn nonce_and_aad<'a>(
    algorithm: &str,
    params: &AlgorithmParams<'a>,
) -> Result<(Nonce, &'a [u8]), CryptoError> {
    let AlgorithmParams::Aead { iv, aad } = *params else {
        return Err(invalid_params(algorithm, params));
    };
    let nonce = Nonce::try_assume_unique_for_key(iv).map_err(|_unspecified| {
        CryptoError::other(format!("iv must be {AES_GCM_IV_LEN} bytes, got {}", iv.len()))
    })?;
    Ok((nonce, aad))
}

impl CryptoProvider for AesGcmProvider {
    fn name(&self) -> &str {
        "AES-GCM"
    }

    fn supports(&self, algorithm: &str) -> bool {
        algorithm.parse::<JWEEncryption>().is_ok()
    }

    fn capabilities(&self, _algorithm: &str) -> Capabilities {
        Capabilities::ENCRYPT
            | Capabilities::DECRYPT
            | Capabilities::GENERATE_KEY
            | Capabilities::IMPORT_KEY
            | Capabilities::EXPORT_KEY
    }

    fn allowed_usages(&self, _algorithm: &str, class: KeyClass) -> KeyUsages {
        match class {
            KeyClass::Secret => {
                KeyUsages::ENCRYPT | KeyUsages::DECRYPT | KeyUsages::WRAP_KEY | KeyUsages::UNWRAP_KEY
            }
            KeyClass::Private | KeyClass::Public => KeyUsages::empty(),
        }
    }

    fn check_params(
        &self,
        algorithm: &str,
        operation: Capabilities,
        params: &AlgorithmParams<'_>,
    ) -> Result<(), CryptoError> {
        let valid = if operation == Capabilities::ENCRYPT || operation == Capabilities::DECRYPT {
            matches!(params, AlgorithmParams::Aead { iv, .. } if iv.len() == AES_GCM_IV_LEN)
        } else if operation == Capabilities::GENERATE_KEY {
            matches!(params, AlgorithmParams::None | AlgorithmParams::SecretKeyGen { .. })
        } else {
            true
        };
        if valid {
            Ok(())
        } else {
            Err(invalid_params(algorithm, params))
        }
    }

    fn on_encrypt(
        &self,
        algorithm: &str,
        params: &AlgorithmParams<'_>,
        key: &CryptoKey,
        data: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let key = aead_key(algorithm, key)?;
        let (nonce, aad) = nonce_and_aad(algorithm, params)?;
        let mut in_out = data.to_vec();
        let tag = key
            .seal_in_place_separate_tag(nonce, Aad::from(aad), &mut in_out)
            .map_err(|err| CryptoError::Other(OpaqueError::from_std(err)))?;
        in_out.extend_from_slice(tag.as_ref());
        Ok(in_out)
    }

    fn on_decrypt(
        &self,
        algorithm: &str,
        params: &AlgorithmParams<'_>,
        key: &CryptoKey,
        data: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let key = aead_key(algorithm, key)?;
        let (nonce, aad) = nonce_and_aad(algorithm, params)?;
        if data.len() < AES_GCM_TAG_LEN {
            return Err(CryptoError::decryption("ciphertext is shorter than the tag"));
        }
        let mut in_out = Zeroizing::new(data.to_vec());
        let plaintext_len = key
            .open_in_place(nonce, Aad::from(aad), &mut in_out)
            .map_err(|_unspecified| CryptoError::decryption("authentication tag mismatch"))?
            .len();
        in_out.truncate(plaintext_len);
        Ok(in_out)
    }

    fn on_generate_key(
        &self,
        algorithm: &str,
        _params: &AlgorithmParams<'_>,
        usages: KeyUsages,
    ) -> Result<CryptoKey, CryptoError> {
        let enc: JWEEncryption = algorithm.parse()?;
        Ok(CryptoKey::new(
            algorithm,
            usages,
            KeyHandle::Secret(random_secret(enc.key_len())?),
        ))
    }

    fn on_import_key(
        &self,
        algorithm: &str,
        data: &KeyData,
        usages: KeyUsages,
    ) -> Result<CryptoKey, CryptoError> {
        let enc: JWEEncryption = algorithm.parse()?;
        let secret = secret_from_data(data)?;
        if secret.len() != enc.key_len() {
            return Err(CryptoError::invalid_key(format!(
                "{enc} requires a {} byte key, got {}",
                enc.key_len(),
                secret.len()
            )));
        }
        Ok(CryptoKey::new(algorithm, usages, KeyHandle::Secret(secret)))
    }

    fn on_export_key(&self, key: &CryptoKey) -> Result<JWK, CryptoError> {
        export_secret(key)
    }
}
