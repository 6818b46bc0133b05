use zeroize::Zeroizing;

use super::{
    AlgorithmParams, Capabilities, CryptoKey, CryptoKeyPair, CryptoProvider, KeyClass, KeyData,
    KeyFormat, KeyUsages, ec, invalid_params,
};
use crate::{
    CryptoError,
    jose::{ECDH, JWK},
};

#[derive(Debug, Clone, Copy, Default)]
#[non_exhaustive]
/// Raw elliptic curve Diffie-Hellman on P-256 and secp256k1.
///
/// The curve is taken from the key itself, so only JWK material is imported.
pub struct EcdhProvider;

impl EcdhProvider {
    pub fn new() -> Self {
        Self
    }
}

impl CryptoProvider for EcdhProvider {
    fn name(&self) -> &str {
        ECDH
    }

    fn capabilities(&self, _algorithm: &str) -> Capabilities {
        Capabilities::DERIVE_BITS
            | Capabilities::GENERATE_KEY_PAIR
            | Capabilities::IMPORT_KEY
            | Capabilities::EXPORT_KEY
    }

    fn allowed_usages(&self, _algorithm: &str, class: KeyClass) -> KeyUsages {
        match class {
            KeyClass::Private => KeyUsages::DERIVE_BITS | KeyUsages::DERIVE_KEY,
            KeyClass::Public | KeyClass::Secret => KeyUsages::empty(),
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
        let valid = if operation == Capabilities::DERIVE_BITS {
            matches!(params, AlgorithmParams::Ecdh { .. })
        } else if operation == Capabilities::GENERATE_KEY_PAIR {
            matches!(params, AlgorithmParams::EcKeyGen { .. })
        } else {
            true
        };
        if valid {
            Ok(())
        } else {
            Err(invalid_params(algorithm, params))
        }
    }

    fn on_derive_bits(
        &self,
        algorithm: &str,
        params: &AlgorithmParams<'_>,
        key: &CryptoKey,
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let AlgorithmParams::Ecdh { public } = *params else {
            return Err(invalid_params(algorithm, params));
        };
        if public.class() != KeyClass::Public {
            return Err(CryptoError::invalid_key(
                "shared secret derivation needs the public key of the other party",
            ));
        }
        ec::diffie_hellman(key.handle(), public.handle())
    }

    fn on_generate_key_pair(
        &self,
        algorithm: &str,
        params: &AlgorithmParams<'_>,
        usages: KeyUsages,
    ) -> Result<CryptoKeyPair, CryptoError> {
        let AlgorithmParams::EcKeyGen { curve } = *params else {
            return Err(invalid_params(algorithm, params));
        };
        let private = ec::generate(curve)?;
        let public = ec::public_of(&private);
        Ok(CryptoKeyPair {
            private: CryptoKey::new(algorithm, usages, private),
            public: CryptoKey::new(algorithm, KeyUsages::empty(), public),
        })
    }

    fn on_import_key(
        &self,
        algorithm: &str,
        data: &KeyData,
        usages: KeyUsages,
    ) -> Result<CryptoKey, CryptoError> {
        let KeyData::Jwk(jwk) = data else {
            return Err(CryptoError::format_mismatch("jwk", data.format().as_str()));
        };
        let curve = jwk
            .curve()
            .ok_or_else(|| CryptoError::format_mismatch("EC", jwk.kty()))?;
        Ok(CryptoKey::new(algorithm, usages, ec::import(curve, data)?))
    }

    fn on_export_key(&self, key: &CryptoKey) -> Result<JWK, CryptoError> {
        Ok(JWK::new(ec::export(key.handle())?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        jose::{JWKEllipticCurves, JWKType},
        provider::ProviderExt,
    };

    fn pair(curve: JWKEllipticCurves) -> CryptoKeyPair {
        EcdhProvider::new()
            .generate_key_pair(
                ECDH,
                &AlgorithmParams::EcKeyGen { curve },
                KeyUsages::DERIVE_BITS,
            )
            .unwrap()
    }

    #[test]
    fn both_parties_derive_the_same_secret() {
        let provider = EcdhProvider::new();
        let alice = pair(JWKEllipticCurves::P256);
        let bob = pair(JWKEllipticCurves::P256);

        let ab = provider
            .derive_bits(ECDH, &AlgorithmParams::Ecdh { public: &bob.public }, &alice.private, None)
            .unwrap();
        let ba = provider
            .derive_bits(ECDH, &AlgorithmParams::Ecdh { public: &alice.public }, &bob.private, None)
            .unwrap();
        assert_eq!(ab, ba);

        let truncated = provider
            .derive_bits(
                ECDH,
                &AlgorithmParams::Ecdh { public: &bob.public },
                &alice.private,
                Some(128),
            )
            .unwrap();
        assert_eq!(truncated.as_slice(), &ab[..16]);
    }

    #[test]
    fn derive_bits_needs_the_peer_public_key() {
        let provider = EcdhProvider::new();
        let alice = pair(JWKEllipticCurves::Secp256k1);
        assert!(
            provider
                .derive_bits(ECDH, &AlgorithmParams::None, &alice.private, None)
                .is_err()
        );
        assert!(matches!(
            provider.derive_bits(
                ECDH,
                &AlgorithmParams::Ecdh { public: &alice.private },
                &alice.private,
                None
            ),
            Err(CryptoError::InvalidKey(_))
        ));
        assert!(matches!(
            provider.derive_bits(
                ECDH,
                &AlgorithmParams::Ecdh { public: &alice.public },
                &alice.public,
                None
            ),
            Err(CryptoError::KeyUsageViolation { .. })
        ));
    }

    #[test]
    fn curve_is_taken_from_the_jwk() {
        let provider = EcdhProvider::new();
        let public = provider.export_key(&pair(JWKEllipticCurves::Secp256k1).public).unwrap();
        assert!(matches!(
            public.key_type(),
            JWKType::EC { crv: JWKEllipticCurves::Secp256k1, d: None, .. }
        ));

        let imported = provider
            .import_key(ECDH, &KeyData::Jwk(public), KeyUsages::empty())
            .unwrap();
        assert_eq!(imported.class(), KeyClass::Public);

        let raw = KeyData::Raw(Zeroizing::new(vec![1; 32]));
        assert!(matches!(
            provider.import_key(ECDH, &raw, KeyUsages::DERIVE_BITS),
            Err(CryptoError::KeyFormatMismatch { expected: "jwk", .. })
        ));
    }
}
