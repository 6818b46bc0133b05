use aws_lc_rs::digest;
use rsa::{Pkcs1v15Sign, Pss, rand_core::OsRng};
use sha2::{Sha256, Sha384, Sha512};
use sigil_error::ErrorContext as _;

use super::{
    AlgorithmParams, Capabilities, CryptoKey, CryptoKeyPair, CryptoProvider, KeyClass, KeyData,
    KeyFormat, KeyUsages, digest::digest_algorithm, invalid_params,
    rsa_keys::{self, MIN_MODULUS_BITS},
};
use crate::{
    CryptoError,
    jose::{DigestAlgorithm, JWA, JWK},
};

/// Modulus length of generated keys when the caller does not ask for one
const DEFAULT_MODULUS_BITS: usize = 2048;

#[derive(Debug, Clone, Copy, Default)]
#[non_exhaustive]
/// RSASSA-PKCS1-v1_5 (`RS256`, `RS384`, `RS512`) and
/// RSASSA-PSS (`PS256`, `PS384`, `PS512`) signatures.
///
/// PSS uses MGF1 with the message digest and a salt of the digest length.
pub struct RsaSsaProvider;

impl RsaSsaProvider {
    pub fn new() -> Self {
        Self
    }
}

fn rsa_algorithm(algorithm: &str) -> Result<JWA, CryptoError> {
    let jwa: JWA = algorithm.parse()?;
    if jwa.kty() != "RSA" {
        return Err(CryptoError::UnsupportedAlgorithm(algorithm.to_owned()));
    }
    Ok(jwa)
}

fn is_pss(jwa: JWA) -> bool {
    matches!(jwa, JWA::PS256 | JWA::PS384 | JWA::PS512)
}

fn hashed(jwa: JWA, data: &[u8]) -> digest::Digest {
    digest::digest(digest_algorithm(jwa.digest()), data)
}

impl CryptoProvider for RsaSsaProvider {
    fn name(&self) -> &str {
        "RSASSA"
    }

    fn supports(&self, algorithm: &str) -> bool {
        rsa_algorithm(algorithm).is_ok()
    }

    fn capabilities(&self, _algorithm: &str) -> Capabilities {
        Capabilities::SIGN
            | Capabilities::VERIFY
            | Capabilities::GENERATE_KEY_PAIR
            | Capabilities::IMPORT_KEY
            | Capabilities::EXPORT_KEY
    }

    fn allowed_usages(&self, _algorithm: &str, class: KeyClass) -> KeyUsages {
        match class {
            KeyClass::Private => KeyUsages::SIGN,
            KeyClass::Public => KeyUsages::VERIFY,
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
        if operation == Capabilities::GENERATE_KEY_PAIR {
            let valid = match params {
                AlgorithmParams::None => true,
                AlgorithmParams::RsaKeyGen { modulus_length } => *modulus_length >= MIN_MODULUS_BITS,
                _ => false,
            };
            if !valid {
                return Err(invalid_params(algorithm, params));
            }
        }
        Ok(())
    }

    fn on_sign(&self, algorithm: &str, key: &CryptoKey, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let jwa = rsa_algorithm(algorithm)?;
        let private = rsa_keys::private_of(key.handle())?;
        let hashed = hashed(jwa, data);
        let hashed = hashed.as_ref();
        let signature = match (is_pss(jwa), jwa.digest()) {
            (false, DigestAlgorithm::Sha256) => private.sign(Pkcs1v15Sign::new::<Sha256>(), hashed),
            (false, DigestAlgorithm::Sha384) => private.sign(Pkcs1v15Sign::new::<Sha384>(), hashed),
            (false, DigestAlgorithm::Sha512) => private.sign(Pkcs1v15Sign::new::<Sha512>(), hashed),
            (true, DigestAlgorithm::Sha256) => {
                private.sign_with_rng(&mut OsRng, Pss::new::<Sha256>(), hashed)
            }
            (true, DigestAlgorithm::Sha384) => {
                private.sign_with_rng(&mut OsRng, Pss::new::<Sha384>(), hashed)
            }
            (true, DigestAlgorithm::Sha512) => {
                private.sign_with_rng(&mut OsRng, Pss::new::<Sha512>(), hashed)
            }
        };
        signature
            .with_context(|| format!("{jwa} signature"))
            .map_err(CryptoError::Other)
    }

    fn on_verify(
        &self,
        algorithm: &str,
        key: &CryptoKey,
        signature: &[u8],
        data: &[u8],
    ) -> Result<bool, CryptoError> {
        let jwa = rsa_algorithm(algorithm)?;
        let public = rsa_keys::public_of(key.handle())?;
        let hashed = hashed(jwa, data);
        let hashed = hashed.as_ref();
        let verified = match (is_pss(jwa), jwa.digest()) {
            (false, DigestAlgorithm::Sha256) => {
                public.verify(Pkcs1v15Sign::new::<Sha256>(), hashed, signature)
            }
            (false, DigestAlgorithm::Sha384) => {
                public.verify(Pkcs1v15Sign::new::<Sha384>(), hashed, signature)
            }
            (false, DigestAlgorithm::Sha512) => {
                public.verify(Pkcs1v15Sign::new::<Sha512>(), hashed, signature)
            }
            (true, DigestAlgorithm::Sha256) => public.verify(Pss::new::<Sha256>(), hashed, signature),
            (true, DigestAlgorithm::Sha384) => public.verify(Pss::new::<Sha384>(), hashed, signature),
            (true, DigestAlgorithm::Sha512) => public.verify(Pss::new::<Sha512>(), hashed, signature),
        };
        Ok(verified.is_ok())
    }

    fn on_generate_key_pair(
        &self,
        algorithm: &str,
        params: &AlgorithmParams<'_>,
        usages: KeyUsages,
    ) -> Result<CryptoKeyPair, CryptoError> {
        let bits = match *params {
            AlgorithmParams::RsaKeyGen { modulus_length } => modulus_length,
            _ => DEFAULT_MODULUS_BITS,
        };
        let (private, public) = rsa_keys::generate(bits)?;
        Ok(CryptoKeyPair {
            private: CryptoKey::new(algorithm, usages & KeyUsages::SIGN, private),
            public: CryptoKey::new(algorithm, usages & KeyUsages::VERIFY, public),
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
    use zeroize::Zeroizing;

    use super::*;
    use crate::{jose::b64, provider::{ProviderExt, rsa_keys::tests::rfc7515_a2_key}};

    const SIGNING_INPUT: &str = "eyJhbGciOiJSUzI1NiJ9.eyJpc3MiOiJqb2UiLA0KICJleHAiOjEzMDA4MTkzODAsDQogImh0dHA6Ly9leGFtcGxlLmNvbS9pc19yb290Ijp0cnVlfQ";
    const SIGNATURE: &str = "cC4hiUPoj9Eetdgtv3hF80EGrhuB__dzERat0XF9g2VtQgr9PJbu3XOiZj5RZmh7AAuHIm4Bh-0Qc_lF5YKt_O8W2Fp5jujGbds9uJdbF9CUAr7t1dnZcAcQjbKBYNX4BAynRFdiuB--f_nZLgrnbyTyWzO75vRK5h6xBArLIARNPvkSjtQBMHlb1L07Qe7K0GarZRmB_eSN9383LcOLn6_dO--xi12jzDwusC-eOkHWEsqtFZESc6BfI7noOPqvhJ1phCnvWh6IeYI2w9QOYEUipUTI8np6LbgGY9Fs98rqVt5AXLIhWkWywlVmtVrBp0igcN_IoypGlUPQGe77Rw";

    fn private_key() -> CryptoKey {
        RsaSsaProvider::new()
            .import_key("RS256", &KeyData::Jwk(rfc7515_a2_key()), KeyUsages::SIGN)
            .unwrap()
    }

    fn public_key(algorithm: &str) -> CryptoKey {
        RsaSsaProvider::new()
            .import_key(
                algorithm,
                &KeyData::Jwk(rfc7515_a2_key().to_public().unwrap()),
                KeyUsages::VERIFY,
            )
            .unwrap()
    }

    #[test]
    fn rfc7515_a2_signature() {
        let provider = RsaSsaProvider::new();
        let signature = provider
            .sign("RS256", &private_key(), SIGNING_INPUT.as_bytes())
            .unwrap();
        assert_eq!(b64::encode(&signature), SIGNATURE);

        let public = public_key("RS256");
        assert!(provider.verify("RS256", &public, &signature, SIGNING_INPUT.as_bytes()).unwrap());
        assert!(!provider.verify("RS256", &public, &signature, b"tampered").unwrap());
    }

    #[test]
    fn pss_signatures_verify() {
        let provider = RsaSsaProvider::new();
        let private = provider
            .import_key("PS384", &KeyData::Jwk(rfc7515_a2_key()), KeyUsages::SIGN)
            .unwrap();
        let signature = provider.sign("PS384", &private, b"payload").unwrap();
        assert_eq!(signature.len(), 256);

        let public = public_key("PS384");
        assert!(provider.verify("PS384", &public, &signature, b"payload").unwrap());
        // a PSS signature is not a PKCS1 v1.5 signature
        assert!(!provider.verify("RS384", &public, &signature, b"payload").unwrap());
    }

    #[test]
    fn raw_material_is_a_format_mismatch() {
        let err = RsaSsaProvider::new()
            .import_key(
                "RS256",
                &KeyData::Raw(Zeroizing::new(vec![1; 256])),
                KeyUsages::VERIFY,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            CryptoError::KeyFormatMismatch { expected: "jwk", found } if found == "raw"
        ));
    }

    #[test]
    fn export_keeps_private_members() {
        let provider = RsaSsaProvider::new();
        let exported = provider.export_key(&private_key()).unwrap();
        assert_eq!(exported.key_type(), rfc7515_a2_key().key_type());
        assert_eq!(exported.alg(), Some("RS256"));
    }

    #[test]
    fn generation_refuses_weak_modulus() {
        let err = RsaSsaProvider::new()
            .generate_key_pair(
                "RS256",
                &AlgorithmParams::RsaKeyGen { modulus_length: 1024 },
                KeyUsages::SIGN,
            )
            .unwrap_err();
        assert!(matches!(err, CryptoError::Other(_)));
    }

    #[test]
    fn hmac_names_are_not_supported() {
        assert!(!RsaSsaProvider::new().supports("HS256"));
        assert!(RsaSsaProvider::new().supports("ps512"));
    }
}
