use super::{
    AlgorithmParams, Capabilities, CryptoKey, CryptoKeyPair, CryptoProvider, KeyClass, KeyData,
    KeyUsages, ec, invalid_params,
};
use crate::{
    CryptoError,
    jose::{JWA, JWK, JWKEllipticCurves},
};

#[derive(Debug, Clone, Copy, Default)]
#[non_exhaustive]
/// ECDSA signatures with SHA-256 on P-256 (`ES256`) and secp256k1 (`ES256K`),
/// encoded as the fixed size `r || s` form of [`rfc7518, section 3.4`]
///
/// [`rfc7518, section 3.4`]: https://datatracker.ietf.org/doc/html/rfc7518#section-3.4
pub struct EcdsaProvider;

impl EcdsaProvider {
    pub fn new() -> Self {
        Self
    }
}

fn curve(algorithm: &str) -> Result<JWKEllipticCurves, CryptoError> {
    algorithm
        .parse::<JWA>()?
        .curve()
        .ok_or_else(|| CryptoError::UnsupportedAlgorithm(algorithm.to_owned()))
}

fn check_curve(algorithm: &str, key: &CryptoKey) -> Result<(), CryptoError> {
    let expected = curve(algorithm)?;
    match ec::curve_of(key.handle()) {
        Some(found) if found == expected => Ok(()),
        Some(found) => Err(CryptoError::invalid_key(format!(
            "{algorithm} requires a {} key, got {}",
            expected.as_str(),
            found.as_str()
        ))),
        None => Err(CryptoError::format_mismatch("EC", key.handle().kty())),
    }
}

impl CryptoProvider for EcdsaProvider {
    fn name(&self) -> &str {
        "ECDSA"
    }

    fn supports(&self, algorithm: &str) -> bool {
        curve(algorithm).is_ok()
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

    fn check_params(
        &self,
        algorithm: &str,
        operation: Capabilities,
        params: &AlgorithmParams<'_>,
    ) -> Result<(), CryptoError> {
        if operation == Capabilities::GENERATE_KEY_PAIR {
            let valid = match params {
                AlgorithmParams::None => true,
                AlgorithmParams::EcKeyGen { curve: requested } => Some(*requested) == curve(algorithm).ok(),
                _ => false,
            };
            if !valid {
                return Err(invalid_params(algorithm, params));
            }
        }
        Ok(())
    }

    fn on_sign(&self, algorithm: &str, key: &CryptoKey, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        check_curve(algorithm, key)?;
        ec::sign(key.handle(), data)
    }

    fn on_verify(
        &self,
        algorithm: &str,
        key: &CryptoKey,
        signature: &[u8],
        data: &[u8],
    ) -> Result<bool, CryptoError> {
        check_curve(algorithm, key)?;
        ec::verify(key.handle(), signature, data)
    }

    fn on_generate_key_pair(
        &self,
        algorithm: &str,
        _params: &AlgorithmParams<'_>,
        usages: KeyUsages,
    ) -> Result<CryptoKeyPair, CryptoError> {
        let private = ec::generate(curve(algorithm)?)?;
        let public = ec::public_of(&private);
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
        let handle = ec::import(curve(algorithm)?, data)?;
        Ok(CryptoKey::new(algorithm, usages, handle))
    }

    fn on_export_key(&self, key: &CryptoKey) -> Result<JWK, CryptoError> {
        Ok(JWK::new(ec::export(key.handle())?).with_alg(key.algorithm().to_owned()))
    }
}
