use aws_lc_rs::{
    hmac,
    rand::{SecureRandom as _, SystemRandom},
};
use sigil_error::OpaqueError;
use zeroize::Zeroizing;

use super::{
    AlgorithmParams, Capabilities, CryptoKey, CryptoProvider, KeyClass, KeyData, KeyHandle,
    KeyUsages, invalid_params,
};
use crate::{
    CryptoError,
    jose::{DigestAlgorithm, JWA, JWK, JWKType, b64},
};

#[derive(Debug, Clone, Copy, Default)]
#[non_exhaustive]
/// HMAC signatures (`HS256`, `HS384`, `HS512`)
pub struct HmacProvider;

impl HmacProvider {
    pub fn new() -> Self {
        Self
    }
}

fn hmac_algorithm(algorithm: &str) -> Result<hmac::Algorithm, CryptoError> {
    let jwa: JWA = algorithm.parse()?;
    if !jwa.is_mac() {
        return Err(CryptoError::UnsupportedAlgorithm(algorithm.to_owned()));
    }
    Ok(match jwa.digest() {
        DigestAlgorithm::Sha256 => hmac::HMAC_SHA256,
        DigestAlgorithm::Sha384 => hmac::HMAC_SHA384,
        DigestAlgorithm::Sha512 => hmac::HMAC_SHA512,
    })
}

fn secret(key: &CryptoKey) -> Result<&[u8], CryptoError> {
    match key.handle() {
        KeyHandle::Secret(secret) => Ok(secret.as_slice()),
        handle => Err(CryptoError::format_mismatch("oct", handle.kty())),
    }
}

pub(crate) fn secret_from_data(data: &KeyData) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    match data {
        KeyData::Raw(raw) => Ok(raw.clone()),
        KeyData::Jwk(jwk) => match jwk.key_type() {
            JWKType::OCT { k } => b64::decode(k)
                .map(Zeroizing::new)
                .map_err(|err| CryptoError::InvalidKey(OpaqueError::from_std(err))),
            JWKType::RSA { .. } | JWKType::EC { .. } => {
                Err(CryptoError::format_mismatch("oct", jwk.kty()))
            }
        },
    }
}

pub(crate) fn export_secret(key: &CryptoKey) -> Result<JWK, CryptoError> {
    let secret = secret(key)?;
    Ok(JWK::new(JWKType::OCT {
        k: b64::encode(secret),
    })
    .with_alg(key.algorithm().to_owned()))
}

pub(crate) fn random_secret(length: usize) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let mut secret = Zeroizing::new(vec![0u8; length]);
    SystemRandom::new()
        .fill(&mut secret)
        .map_err(|err| CryptoError::Other(OpaqueError::from_std(err)))?;
    Ok(secret)
}

impl CryptoProvider for HmacProvider {
    fn name(&self) -> &str {
        "HMAC"
    }

    fn supports(&self, algorithm: &str) -> bool {
        hmac_algorithm(algorithm).is_ok()
    }

    fn capabilities(&self, _algorithm: &str) -> Capabilities {
        Capabilities::SIGN
            | Capabilities::VERIFY
            | Capabilities::GENERATE_KEY
            | Capabilities::IMPORT_KEY
            | Capabilities::EXPORT_KEY
    }

    fn allowed_usages(&self, _algorithm: &str, class: KeyClass) -> KeyUsages {
        match class {
            KeyClass::Secret => KeyUsages::SIGN | KeyUsages::VERIFY,
            KeyClass::Private | KeyClass::Public => KeyUsages::empty(),
        }
    }

    fn check_params(
        &self,
        algorithm: &str,
        operation: Capabilities,
        params: &AlgorithmParams<'_>,
    ) -> Result<(), CryptoError> {
        if operation == Capabilities::GENERATE_KEY
            && !matches!(params, AlgorithmParams::SecretKeyGen { length } if *length > 0)
        {
            return Err(invalid_params(algorithm, params));
        }
        Ok(())
    }

    fn on_sign(&self, algorithm: &str, key: &CryptoKey, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let key = hmac::Key::new(hmac_algorithm(algorithm)?, secret(key)?);
        Ok(hmac::sign(&key, data).as_ref().to_vec())
    }

    fn on_verify(
        &self,
        algorithm: &str,
        key: &CryptoKey,
        signature: &[u8],
        data: &[u8],
    ) -> Result<bool, CryptoError> {
        let key = hmac::Key::new(hmac_algorithm(algorithm)?, secret(key)?);
        // constant time comparison
        Ok(hmac::verify(&key, data, signature).is_ok())
    }

    fn on_generate_key(
        &self,
        algorithm: &str,
        params: &AlgorithmParams<'_>,
        usages: KeyUsages,
    ) -> Result<CryptoKey, CryptoError> {
        let AlgorithmParams::SecretKeyGen { length } = *params else {
            return Err(invalid_params(algorithm, params));
        };
        Ok(CryptoKey::new(
            algorithm,
            usages,
            KeyHandle::Secret(random_secret(length)?),
        ))
    }

    fn on_import_key(
        &self,
        algorithm: &str,
        data: &KeyData,
        usages: KeyUsages,
    ) -> Result<CryptoKey, CryptoError> {
        let secret = secret_from_data(data)?;
        if secret.is_empty() {
            return Err(CryptoError::invalid_key("hmac secret is empty"));
        }
        Ok(CryptoKey::new(algorithm, usages, KeyHandle::Secret(secret)))
    }

    fn on_export_key(&self, key: &CryptoKey) -> Result<JWK, CryptoError> {
        export_secret(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderExt;

    fn key(secret: &[u8]) -> CryptoKey {
        HmacProvider::new()
            .import_key(
                "HS256",
                &KeyData::Raw(Zeroizing::new(secret.to_vec())),
                KeyUsages::SIGN | KeyUsages::VERIFY,
            )
            .unwrap()
    }

    #[test]
    fn rfc4231_test_case_2() {
        let signature = HmacProvider::new()
            .sign("HS256", &key(b"Jefe"), b"what do ya want for nothing?")
            .unwrap();
        assert_eq!(
            signature,
            [
                0x5b, 0xdc, 0xc1, 0x46, 0xbf, 0x60, 0x75, 0x4e, 0x6a, 0x04, 0x24, 0x26, 0x08, 0x95,
                0x75, 0xc7, 0x5a, 0x00, 0x3f, 0x08, 0x9d, 0x27, 0x39, 0x83, 0x9d, 0xec, 0x58, 0xb9,
                0x64, 0xec, 0x38, 0x43,
            ]
        );
    }

    #[test]
    fn verify_mismatch_is_false() {
        let provider = HmacProvider::new();
        let key = key(b"secret");
        let signature = provider.sign("HS256", &key, b"payload").unwrap();
        assert!(provider.verify("HS256", &key, &signature, b"payload").unwrap());
        assert!(!provider.verify("HS256", &key, &signature, b"other").unwrap());
        assert!(!provider.verify("HS256", &key, b"short", b"payload").unwrap());
    }

    #[test]
    fn jwk_import_and_export() {
        let jwk: JWK = serde_json::from_str(r#"{"kty":"oct","k":"c2VjcmV0"}"#).unwrap();
        let provider = HmacProvider::new();
        let key = provider
            .import_key("HS512", &KeyData::Jwk(jwk), KeyUsages::SIGN)
            .unwrap();
        assert_eq!(provider.sign("HS512", &key, b"x").unwrap().len(), 64);

        let exported = provider.export_key(&key).unwrap();
        assert_eq!(exported.alg(), Some("HS512"));
        assert!(matches!(exported.key_type(), JWKType::OCT { k } if k == "c2VjcmV0"));
    }

    #[test]
    fn rsa_jwk_is_a_format_mismatch() {
        let jwk: JWK = serde_json::from_str(r#"{"kty":"RSA","n":"AQAB","e":"AQAB"}"#).unwrap();
        let err = HmacProvider::new()
            .import_key("HS256", &KeyData::Jwk(jwk), KeyUsages::SIGN)
            .unwrap_err();
        assert!(matches!(err, CryptoError::KeyFormatMismatch { expected: "oct", .. }));
    }

    #[test]
    fn generate_key_needs_length() {
        let provider = HmacProvider::new();
        let key = provider
            .generate_key(
                "HS256",
                &AlgorithmParams::SecretKeyGen { length: 32 },
                KeyUsages::SIGN,
            )
            .unwrap();
        assert!(matches!(key.handle(), KeyHandle::Secret(s) if s.len() == 32));

        assert!(
            provider
                .generate_key("HS256", &AlgorithmParams::None, KeyUsages::SIGN)
                .is_err()
        );
    }
}
