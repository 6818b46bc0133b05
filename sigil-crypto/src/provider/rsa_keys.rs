//! RSA key handling shared by the signature and key encryption providers

use rsa::{
    BigUint, RsaPrivateKey, RsaPublicKey,
    rand_core::OsRng,
    traits::{PrivateKeyParts as _, PublicKeyParts as _},
};
use sigil_error::ErrorContext as _;

use super::{KeyData, KeyHandle};
use crate::{
    CryptoError,
    jose::{JWKType, b64},
};

/// Smallest modulus accepted for generated keys
pub(super) const MIN_MODULUS_BITS: usize = 2048;

fn decode_uint(name: &'static str, value: &str) -> Result<BigUint, CryptoError> {
    let bytes = b64::decode(value)
        .with_context(|| format!("decode member '{name}'"))
        .map_err(CryptoError::InvalidKey)?;
    if bytes.is_empty() {
        return Err(CryptoError::invalid_key(format!("member '{name}' is empty")));
    }
    Ok(BigUint::from_bytes_be(&bytes))
}

fn encode_uint(value: &BigUint) -> String {
    b64::encode(value.to_bytes_be())
}

/// Import an RSA key from its JWK members.
///
/// Private keys need the prime factors `p` and `q`, the CRT members are
/// recomputed from them.
pub(super) fn import(data: &KeyData) -> Result<KeyHandle, CryptoError> {
    let KeyData::Jwk(jwk) = data else {
        return Err(CryptoError::format_mismatch("jwk", data.format().as_str()));
    };
    let JWKType::RSA { n, e, d, p, q, .. } = jwk.key_type() else {
        return Err(CryptoError::format_mismatch("RSA", jwk.kty()));
    };
    let n = decode_uint("n", n)?;
    let e = decode_uint("e", e)?;

    let Some(d) = d else {
        let public = RsaPublicKey::new(n, e)
            .context("import RSA public key")
            .map_err(CryptoError::InvalidKey)?;
        return Ok(KeyHandle::RsaPublic(public));
    };
    let (Some(p), Some(q)) = (p, q) else {
        return Err(CryptoError::invalid_key(
            "private RSA key without the prime factors 'p' and 'q'",
        ));
    };
    let primes = vec![decode_uint("p", p)?, decode_uint("q", q)?];
    let mut private = RsaPrivateKey::from_components(n, e, decode_uint("d", d)?, primes)
        .context("import RSA private key")
        .map_err(CryptoError::InvalidKey)?;
    private
        .validate()
        .and_then(|()| private.precompute())
        .context("validate RSA private key")
        .map_err(CryptoError::InvalidKey)?;
    Ok(KeyHandle::RsaPrivate(Box::new(private)))
}

/// JWK members of an RSA key, including all private members for private keys
pub(super) fn export(handle: &KeyHandle) -> Result<JWKType, CryptoError> {
    match handle {
        KeyHandle::RsaPublic(public) => Ok(JWKType::RSA {
            n: encode_uint(public.n()),
            e: encode_uint(public.e()),
            d: None,
            p: None,
            q: None,
            dp: None,
            dq: None,
            qi: None,
        }),
        KeyHandle::RsaPrivate(private) => {
            let primes = private.primes();
            Ok(JWKType::RSA {
                n: encode_uint(private.n()),
                e: encode_uint(private.e()),
                d: Some(encode_uint(private.d())),
                p: primes.first().map(encode_uint),
                q: primes.get(1).map(encode_uint),
                dp: private.dp().map(encode_uint),
                dq: private.dq().map(encode_uint),
                qi: private.crt_coefficient().as_ref().map(encode_uint),
            })
        }
        other => Err(CryptoError::format_mismatch("RSA", other.kty())),
    }
}

pub(super) fn public_of(handle: &KeyHandle) -> Result<RsaPublicKey, CryptoError> {
    match handle {
        KeyHandle::RsaPublic(public) => Ok(public.clone()),
        KeyHandle::RsaPrivate(private) => Ok(private.to_public_key()),
        other => Err(CryptoError::format_mismatch("RSA", other.kty())),
    }
}

pub(super) fn private_of(handle: &KeyHandle) -> Result<&RsaPrivateKey, CryptoError> {
    match handle {
        KeyHandle::RsaPrivate(private) => Ok(private),
        other => Err(CryptoError::format_mismatch("RSA private key", other.kty())),
    }
}

pub(super) fn generate(modulus_bits: usize) -> Result<(KeyHandle, KeyHandle), CryptoError> {
    if modulus_bits < MIN_MODULUS_BITS {
        return Err(CryptoError::other(format!(
            "RSA modulus must be at least {MIN_MODULUS_BITS} bits, got {modulus_bits}"
        )));
    }
    let private = RsaPrivateKey::new(&mut OsRng, modulus_bits)
        .context("generate RSA key pair")
        .map_err(CryptoError::Other)?;
    let public = private.to_public_key();
    Ok((
        KeyHandle::RsaPrivate(Box::new(private)),
        KeyHandle::RsaPublic(public),
    ))
}
