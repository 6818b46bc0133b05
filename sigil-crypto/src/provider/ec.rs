//! Elliptic curve key handling shared by the ECDSA and ECDH providers

use aws_lc_rs::rand::{SecureRandom as _, SystemRandom};
use sigil_error::OpaqueError;
use zeroize::Zeroizing;

use super::{KeyData, KeyHandle};
use crate::{
    CryptoError,
    jose::{JWKEllipticCurves, JWKType, b64},
};

/// Byte length of a field element and of a private scalar, for both curves
const FIELD_LEN: usize = 32;
const MAX_GENERATE_ATTEMPTS: usize = 16;

macro_rules! curve_ops {
    ($module:ident, $krate:ident) => {
        pub(super) mod $module {
            use $krate::{
                PublicKey, SecretKey,
                ecdsa::{
                    Signature, SigningKey, VerifyingKey,
                    signature::{Signer as _, Verifier as _},
                },
                elliptic_curve::sec1::ToEncodedPoint as _,
            };
            use zeroize::Zeroizing;

            use super::FIELD_LEN;
            use crate::CryptoError;

            pub(in crate::provider) fn secret_key(scalar: &[u8]) -> Result<SecretKey, CryptoError> {
                if scalar.len() != FIELD_LEN {
                    return Err(CryptoError::invalid_key(format!(
                        "private scalar must be {FIELD_LEN} bytes, got {}",
                        scalar.len()
                    )));
                }
                SecretKey::from_slice(scalar)
                    .map_err(|_err| CryptoError::invalid_key("private scalar is out of range"))
            }

            pub(in crate::provider) fn public_key(sec1: &[u8]) -> Result<PublicKey, CryptoError> {
                PublicKey::from_sec1_bytes(sec1)
                    .map_err(|_err| CryptoError::invalid_key("point is not on the curve"))
            }

            pub(in crate::provider) fn coordinates(
                public: &PublicKey,
            ) -> Result<(Vec<u8>, Vec<u8>), CryptoError> {
                let point = public.to_encoded_point(false);
                match (point.x(), point.y()) {
                    (Some(x), Some(y)) => Ok((x.to_vec(), y.to_vec())),
                    _ => Err(CryptoError::invalid_key("point has no affine coordinates")),
                }
            }

            pub(in crate::provider) fn scalar(secret: &SecretKey) -> Zeroizing<Vec<u8>> {
                Zeroizing::new(secret.to_bytes().to_vec())
            }

            /// Fixed size `r || s` signature over the SHA-256 digest of `data`
            pub(in crate::provider) fn sign(
                secret: &SecretKey,
                data: &[u8],
            ) -> Result<Vec<u8>, CryptoError> {
                let signature: Signature = SigningKey::from(secret)
                    .try_sign(data)
                    .map_err(CryptoError::other)?;
                Ok(signature.to_bytes().to_vec())
            }

            pub(in crate::provider) fn verify(
                public: &PublicKey,
                signature: &[u8],
                data: &[u8],
            ) -> bool {
                let Ok(signature) = Signature::from_slice(signature) else {
                    return false;
                };
                VerifyingKey::from(public).verify(data, &signature).is_ok()
            }

            pub(in crate::provider) fn diffie_hellman(
                secret: &SecretKey,
                public: &PublicKey,
            ) -> Zeroizing<Vec<u8>> {
                let shared =
                    $krate::ecdh::diffie_hellman(secret.to_nonzero_scalar(), public.as_affine());
                Zeroizing::new(shared.raw_secret_bytes().to_vec())
            }
        }
    };
}

curve_ops!(p256_ops, p256);
curve_ops!(k256_ops, k256);

pub(super) fn curve_of(handle: &KeyHandle) -> Option<JWKEllipticCurves> {
    match handle {
        KeyHandle::P256Private(_) | KeyHandle::P256Public(_) => Some(JWKEllipticCurves::P256),
        KeyHandle::K256Private(_) | KeyHandle::K256Public(_) => Some(JWKEllipticCurves::Secp256k1),
        KeyHandle::RsaPrivate(_) | KeyHandle::RsaPublic(_) | KeyHandle::Secret(_) => None,
    }
}

fn private_from_scalar(curve: JWKEllipticCurves, scalar: &[u8]) -> Result<KeyHandle, CryptoError> {
    Ok(match curve {
        JWKEllipticCurves::P256 => KeyHandle::P256Private(p256_ops::secret_key(scalar)?),
        JWKEllipticCurves::Secp256k1 => KeyHandle::K256Private(k256_ops::secret_key(scalar)?),
    })
}

fn public_from_sec1(curve: JWKEllipticCurves, sec1: &[u8]) -> Result<KeyHandle, CryptoError> {
    Ok(match curve {
        JWKEllipticCurves::P256 => KeyHandle::P256Public(p256_ops::public_key(sec1)?),
        JWKEllipticCurves::Secp256k1 => KeyHandle::K256Public(k256_ops::public_key(sec1)?),
    })
}

fn decode_member(name: &'static str, value: &str) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let bytes = b64::decode(value)
        .map(Zeroizing::new)
        .map_err(|err| CryptoError::InvalidKey(OpaqueError::from_std(err)))?;
    if bytes.len() != FIELD_LEN {
        return Err(CryptoError::invalid_key(format!(
            "member '{name}' must be {FIELD_LEN} bytes, got {}",
            bytes.len()
        )));
    }
    Ok(bytes)
}

/// Import EC key material on the given curve.
///
/// Raw material is either a 32 byte private scalar or a SEC1 encoded point.
pub(super) fn import(curve: JWKEllipticCurves, data: &KeyData) -> Result<KeyHandle, CryptoError> {
    match data {
        KeyData::Raw(raw) if raw.len() == FIELD_LEN => private_from_scalar(curve, raw),
        KeyData::Raw(raw) => public_from_sec1(curve, raw),
        KeyData::Jwk(jwk) => {
            let JWKType::EC { crv, x, y, d } = jwk.key_type() else {
                return Err(CryptoError::format_mismatch("EC", jwk.kty()));
            };
            if *crv != curve {
                return Err(CryptoError::invalid_key(format!(
                    "expected a key on curve {}, got {}",
                    curve.as_str(),
                    crv.as_str()
                )));
            }

            let mut sec1 = Vec::with_capacity(1 + 2 * FIELD_LEN);
            sec1.push(0x04);
            sec1.extend_from_slice(&decode_member("x", x)?);
            sec1.extend_from_slice(&decode_member("y", y)?);
            let public = public_from_sec1(curve, &sec1)?;

            let Some(d) = d else {
                return Ok(public);
            };
            let private = private_from_scalar(curve, &decode_member("d", d)?)?;
            if export(&public_of(&private))? != export(&public)? {
                return Err(CryptoError::invalid_key(
                    "private scalar does not match the public point",
                ));
            }
            Ok(private)
        }
    }
}

/// Public counterpart of a private key, public keys are returned as is
pub(super) fn public_of(handle: &KeyHandle) -> KeyHandle {
    match handle {
        KeyHandle::P256Private(secret) => KeyHandle::P256Public(secret.public_key()),
        KeyHandle::K256Private(secret) => KeyHandle::K256Public(secret.public_key()),
        other => other.clone(),
    }
}

/// JWK members of an EC key, including `d` for private keys
pub(super) fn export(handle: &KeyHandle) -> Result<JWKType, CryptoError> {
    let (crv, (x, y), d) = match handle {
        KeyHandle::P256Private(secret) => (
            JWKEllipticCurves::P256,
            p256_ops::coordinates(&secret.public_key())?,
            Some(p256_ops::scalar(secret)),
        ),
        KeyHandle::P256Public(public) => {
            (JWKEllipticCurves::P256, p256_ops::coordinates(public)?, None)
        }
        KeyHandle::K256Private(secret) => (
            JWKEllipticCurves::Secp256k1,
            k256_ops::coordinates(&secret.public_key())?,
            Some(k256_ops::scalar(secret)),
        ),
        KeyHandle::K256Public(public) => (
            JWKEllipticCurves::Secp256k1,
            k256_ops::coordinates(public)?,
            None,
        ),
        KeyHandle::RsaPrivate(_) | KeyHandle::RsaPublic(_) | KeyHandle::Secret(_) => {
            return Err(CryptoError::format_mismatch("EC", handle.kty()));
        }
    };
    Ok(JWKType::EC {
        crv,
        x: b64::encode(x),
        y: b64::encode(y),
        d: d.map(b64::encode),
    })
}

/// Generate a private key with rejection sampling of random scalars
pub(super) fn generate(curve: JWKEllipticCurves) -> Result<KeyHandle, CryptoError> {
    let rng = SystemRandom::new();
    let mut scalar = Zeroizing::new([0u8; FIELD_LEN]);
    for _ in 0..MAX_GENERATE_ATTEMPTS {
        rng.fill(scalar.as_mut())
            .map_err(|err| CryptoError::Other(OpaqueError::from_std(err)))?;
        match private_from_scalar(curve, scalar.as_ref()) {
            Ok(handle) => return Ok(handle),
            Err(CryptoError::InvalidKey(_)) => {}
            Err(err) => return Err(err),
        }
    }
    Err(CryptoError::other("failed to generate a valid private scalar"))
}

pub(super) fn sign(handle: &KeyHandle, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    match handle {
        KeyHandle::P256Private(secret) => p256_ops::sign(secret, data),
        KeyHandle::K256Private(secret) => k256_ops::sign(secret, data),
        other => Err(CryptoError::format_mismatch("EC private key", other.kty())),
    }
}

pub(super) fn verify(handle: &KeyHandle, signature: &[u8], data: &[u8]) -> Result<bool, CryptoError> {
    match public_of(handle) {
        KeyHandle::P256Public(public) => Ok(p256_ops::verify(&public, signature, data)),
        KeyHandle::K256Public(public) => Ok(k256_ops::verify(&public, signature, data)),
        other => Err(CryptoError::format_mismatch("EC key", other.kty())),
    }
}

pub(super) fn diffie_hellman(
    private: &KeyHandle,
    public: &KeyHandle,
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    match (private, public_of(public)) {
        (KeyHandle::P256Private(secret), KeyHandle::P256Public(public)) => {
            Ok(p256_ops::diffie_hellman(secret, &public))
        }
        (KeyHandle::K256Private(secret), KeyHandle::K256Public(public)) => {
            Ok(k256_ops::diffie_hellman(secret, &public))
        }
        _ => Err(CryptoError::invalid_key(
            "shared secret derivation needs a private and a public key on the same curve",
        )),
    }
}
