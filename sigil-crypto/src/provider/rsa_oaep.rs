use aws_lc_rs::rsa::{
    OAEP_SHA1_MGF1SHA1, OAEP_SHA256_MGF1SHA256, OaepAlgorithm, OaepPrivateDecryptingKey,
    PrivateDecryptingKey,
};
use rsa::{Oaep, pkcs8::EncodePrivateKey as _, rand_core::OsRng};
use sha1::Sha1;
use sha2::Sha256;
use sigil_error::ErrorContext as _;
use zeroize::Zeroizing;

use super::{
    AlgorithmParams, Capabilities, CryptoKey, CryptoKeyPair, CryptoProvider, KeyClass, KeyData,
    KeyFormat, KeyUsages, invalid_params,
    rsa_keys::{self, MIN_MODULUS_BITS},
};
use crate::{
    CryptoError,
    jose::{JWEAlgorithm, JWK},
};

#[derive(Debug, Clone, Copy, Default)]
#[non_exhaustive]
/// RSAES-OAEP key encryption (`RSA-OAEP` with SHA-1, `RSA-OAEP-256` with SHA-256),
/// used to wrap the content encryption key of a JWE recipient.
pub struct RsaOaepProvider;

impl RsaOaepProvider {
    pub fn new() -> Self {
        Self
    }
}

fn padding(algorithm: JWEAlgorithm) -> Oaep {
    match algorithm {
        JWEAlgorithm::RsaOaep => Oaep::new::<Sha1>(),
        JWEAlgorithm::RsaOaep256 => Oaep::new::<Sha256>(),
    }
}

fn unwrap_padding(algorithm: JWEAlgorithm) -> &'static OaepAlgorithm {
    match algorithm {
        JWEAlgorithm::RsaOaep => &OAEP_SHA1_MGF1SHA1,
        JWEAlgorithm::RsaOaep256 => &OAEP_SHA256_MGF1SHA256,
    }
}

/// Load the private key into aws-lc, which decrypts in constant time
fn decrypting_key(key: &CryptoKey) -> Result<OaepPrivateDecryptingKey, CryptoError> {
    let der = rsa_keys::private_of(key.handle())?
        .to_pkcs8_der()
        .context("encode RSA private key as PKCS#8")
        .map_err(CryptoError::InvalidKey)?;
    PrivateDecryptingKey::from_pkcs8(der.as_bytes())
        .context("load RSA private key")
        .and_then(|private| OaepPrivateDecryptingKey::new(private).context("load RSA-OAEP key"))
        .map_err(CryptoError::InvalidKey)
}

impl CryptoProvider for RsaOaepProvider {
    fn name(&self) -> &str {
        "RSAES-OAEP"
    }

    fn supports(&self, algorithm: &str) -> bool {
        algorithm.parse::<JWEAlgorithm>().is_ok()
    }

    fn capabilities(&self, _algorithm: &str) -> Capabilities {
        Capabilities::ENCRYPT
            | Capabilities::DECRYPT
            | Capabilities::GENERATE_KEY_PAIR
            | Capabilities::IMPORT_KEY
            | Capabilities::EXPORT_KEY
    }

    fn allowed_usages(&self, _algorithm: &str, class: KeyClass) -> KeyUsages {
        match class {
            KeyClass::Public => KeyUsages::ENCRYPT | KeyUsages::WRAP_KEY,
            KeyClass::Private => KeyUsages::DECRYPT | KeyUsages::UNWRAP_KEY,
            KeyClass::Secret => KeyUsages::empty(),
        }
    }

    fn import_formats(&self, _algorithm: &str) -> &'static [KeyFormat] {
        &[KeyFormat::Jwk]
    }

    fn check_params(
        &self,
        algorithm: &str,
        operation: Capabilities,
        params: &AlgorithmParams<'_>,
    ) -> Result<(), CryptoError> {
        let valid = if operation == Capabilities::ENCRYPT || operation == Capabilities::DECRYPT {
            // no OAEP label support
            matches!(params, AlgorithmParams::None)
        } else if operation == Capabilities::GENERATE_KEY_PAIR {
            match params {
                AlgorithmParams::None => true,
                AlgorithmParams::RsaKeyGen { modulus_length } => *modulus_length >= MIN_MODULUS_BITS,
                _ => false,
            }
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
        _params: &AlgorithmParams<'_>,
        key: &CryptoKey,
        data: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let algorithm: JWEAlgorithm = algorithm.parse()?;
        let public = rsa_keys::public_of(key.handle())?;
        public
            .encrypt(&mut OsRng, padding(algorithm), data)
            .with_context(|| format!("{algorithm} encryption"))
            .map_err(CryptoError::Other)
    }

    fn on_decrypt(
        &self,
        algorithm: &str,
        _params: &AlgorithmParams<'_>,
        key: &CryptoKey,
        data: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let algorithm: JWEAlgorithm = algorithm.parse()?;
        let private = decrypting_key(key)?;
        let mut plaintext = Zeroizing::new(vec![0; private.min_output_size()]);
        let len = private
            .decrypt(unwrap_padding(algorithm), data, &mut plaintext, None)
            .with_context(|| format!("{algorithm} decryption"))
            .map_err(CryptoError::DecryptionFailure)?
            .len();
        plaintext.truncate(len);
        Ok(plaintext)
    }

    fn on_generate_key_pair(
        &self,
        algorithm: &str,
        params: &AlgorithmParams<'_>,
        usages: KeyUsages,
    ) -> Result<CryptoKeyPair, CryptoError> {
        let bits = match *params {
            AlgorithmParams::RsaKeyGen { modulus_length } => modulus_length,
            _ => MIN_MODULUS_BITS,
        };
        let (private, public) = rsa_keys::generate(bits)?;
        Ok(CryptoKeyPair {
            private: CryptoKey::new(
                algorithm,
                usages & (KeyUsages::DECRYPT | KeyUsages::UNWRAP_KEY),
                private,
            ),
            public: CryptoKey::new(
                algorithm,
                usages & (KeyUsages::ENCRYPT | KeyUsages::WRAP_KEY),
                public,
            ),
        })
    }

    fn on_import_key(
        &self,
        algorithm: &str,
        data: &KeyData,
        usages: KeyUsages,
    ) -> Result<CryptoKey, CryptoError> {
        Ok(CryptoKey::new(algorithm, usages, rsa_keys::import(data)?))
    }

    fn on_export_key(&self, key: &CryptoKey) -> Result<JWK, CryptoError> {
        Ok(JWK::new(rsa_keys::export(key.handle())?).with_alg(key.algorithm().to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ProviderExt, rsa_keys::tests::rfc7515_a2_key};

    fn keys(algorithm: &str) -> (CryptoKey, CryptoKey) {
        let provider = RsaOaepProvider::new();
        let private = provider
            .import_key(
                algorithm,
                &KeyData::Jwk(rfc7515_a2_key()),
                KeyUsages::UNWRAP_KEY | KeyUsages::DECRYPT,
            )
            .unwrap();
        let public = provider
            .import_key(
                algorithm,
                &KeyData::Jwk(rfc7515_a2_key().to_public().unwrap()),
                KeyUsages::WRAP_KEY,
            )
            .unwrap();
        (private, public)
    }

    #[test]
    fn wrap_and_unwrap() {
        let provider = RsaOaepProvider::new();
        for algorithm in ["RSA-OAEP", "RSA-OAEP-256"] {
            let (private, public) = keys(algorithm);
            let cek = [0x5a; 32];
            let wrapped = provider.wrap_key(algorithm, &public, &cek).unwrap();
            assert_eq!(wrapped.len(), 256);
            assert_ne!(wrapped, provider.wrap_key(algorithm, &public, &cek).unwrap());

            let unwrapped = provider.unwrap_key(algorithm, &private, &wrapped).unwrap();
            assert_eq!(unwrapped.as_slice(), cek);
        }
    }

    #[test]
    fn unwrap_failure_is_a_decryption_failure() {
        let provider = RsaOaepProvider::new();
        let (private, public) = keys("RSA-OAEP-256");
        let mut wrapped = provider.wrap_key("RSA-OAEP-256", &public, &[1; 16]).unwrap();
        wrapped[10] ^= 0x80;
        assert!(matches!(
            provider.unwrap_key("RSA-OAEP-256", &private, &wrapped),
            Err(CryptoError::DecryptionFailure(_))
        ));

        // hash mismatch between wrap and unwrap
        let wrapped = provider.wrap_key("RSA-OAEP", &public, &[1; 16]).unwrap();
        assert!(provider.unwrap_key("RSA-OAEP-256", &private, &wrapped).is_err());
    }

    #[test]
    fn truncated_and_oversized_input_fail_to_unwrap() {
        let provider = RsaOaepProvider::new();
        let (private, public) = keys("RSA-OAEP");
        let wrapped = provider.wrap_key("RSA-OAEP", &public, &[1; 16]).unwrap();
        for data in [&wrapped[..255], &[0xff; 257][..], &[][..]] {
            assert!(matches!(
                provider.unwrap_key("RSA-OAEP", &private, data),
                Err(CryptoError::DecryptionFailure(_))
            ));
        }
    }

    #[test]
    fn key_classes_are_enforced() {
        let provider = RsaOaepProvider::new();
        let (private, public) = keys("RSA-OAEP");
        assert!(matches!(
            provider.wrap_key("RSA-OAEP", &private, &[1; 16]),
            Err(CryptoError::KeyUsageViolation { usage: "wrapKey", .. })
        ));
        assert!(matches!(
            provider.unwrap_key("RSA-OAEP", &public, &[1; 256]),
            Err(CryptoError::KeyUsageViolation { usage: "unwrapKey", .. })
        ));
    }

    #[test]
    fn signature_names_are_not_supported() {
        let provider = RsaOaepProvider::new();
        assert!(!provider.supports("RS256"));
        assert!(provider.supports("rsa-oaep"));
    }
}
