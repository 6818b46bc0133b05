use std::fmt;

use bitflags::bitflags;
use zeroize::Zeroizing;

use crate::jose::{JWK, JWKUse};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// Operations a key may be used for
    pub struct KeyUsages: u16 {
        const SIGN = 1;
        const VERIFY = 1 << 1;
        const ENCRYPT = 1 << 2;
        const DECRYPT = 1 << 3;
        const DERIVE_BITS = 1 << 4;
        const DERIVE_KEY = 1 << 5;
        const WRAP_KEY = 1 << 6;
        const UNWRAP_KEY = 1 << 7;
    }
}

const USAGE_NAMES: [(KeyUsages, &str); 8] = [
    (KeyUsages::SIGN, "sign"),
    (KeyUsages::VERIFY, "verify"),
    (KeyUsages::ENCRYPT, "encrypt"),
    (KeyUsages::DECRYPT, "decrypt"),
    (KeyUsages::DERIVE_BITS, "deriveBits"),
    (KeyUsages::DERIVE_KEY, "deriveKey"),
    (KeyUsages::WRAP_KEY, "wrapKey"),
    (KeyUsages::UNWRAP_KEY, "unwrapKey"),
];

impl KeyUsages {
    /// Registered name of the first usage contained in this set
    pub fn name(self) -> &'static str {
        USAGE_NAMES
            .iter()
            .find(|(usage, _)| self.contains(*usage))
            .map_or("none", |(_, name)| name)
    }

    /// Usage registered under the given `key_ops` value
    pub fn from_key_op(op: &str) -> Option<Self> {
        USAGE_NAMES
            .iter()
            .find(|(_, name)| *name == op)
            .map(|(usage, _)| *usage)
    }

    /// Usages a [`JWK`] declares through its `key_ops` and `use` members.
    ///
    /// A key declaring neither may be used for anything, a key declaring
    /// both is limited to the usages permitted by each of them.
    /// Unregistered `key_ops` values grant nothing.
    pub fn declared_by(jwk: &JWK) -> Self {
        let by_ops = jwk.key_ops().map_or(Self::all(), |ops| {
            ops.iter()
                .filter_map(|op| Self::from_key_op(op))
                .fold(Self::empty(), |acc, usage| acc | usage)
        });
        let by_use = match jwk.key_use() {
            None => Self::all(),
            Some(JWKUse::Signature) => Self::SIGN | Self::VERIFY,
            Some(JWKUse::Encryption) => Self::all().difference(Self::SIGN | Self::VERIFY),
        };
        by_ops & by_use
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Class of a key, the allowed usages of a provider are declared per class
pub enum KeyClass {
    Private,
    Public,
    Secret,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Shape in which key material is handed to a provider
pub enum KeyFormat {
    /// Raw bytes: a secret, an EC private scalar or a SEC1 encoded EC point
    Raw,
    /// JWK shaped key material
    Jwk,
}

impl KeyFormat {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Jwk => "jwk",
        }
    }
}

/// Key material to import
pub enum KeyData {
    Raw(Zeroizing<Vec<u8>>),
    Jwk(JWK),
}

impl KeyData {
    pub fn format(&self) -> KeyFormat {
        match self {
            Self::Raw(_) => KeyFormat::Raw,
            Self::Jwk(_) => KeyFormat::Jwk,
        }
    }
}

impl fmt::Debug for KeyData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw(raw) => f.debug_tuple("Raw").field(&raw.len()).finish(),
            Self::Jwk(jwk) => f.debug_tuple("Jwk").field(jwk).finish(),
        }
    }
}

impl From<JWK> for KeyData {
    fn from(value: JWK) -> Self {
        Self::Jwk(value)
    }
}

#[derive(Clone)]
/// Imported key material, in the representation of the backing crypto library
pub enum KeyHandle {
    RsaPrivate(Box<rsa::RsaPrivateKey>),
    RsaPublic(rsa::RsaPublicKey),
    P256Private(p256::SecretKey),
    P256Public(p256::PublicKey),
    K256Private(k256::SecretKey),
    K256Public(k256::PublicKey),
    Secret(Zeroizing<Vec<u8>>),
}

impl KeyHandle {
    pub fn class(&self) -> KeyClass {
        match self {
            Self::RsaPrivate(_) | Self::P256Private(_) | Self::K256Private(_) => KeyClass::Private,
            Self::RsaPublic(_) | Self::P256Public(_) | Self::K256Public(_) => KeyClass::Public,
            Self::Secret(_) => KeyClass::Secret,
        }
    }

    /// `kty` of this key material
    pub fn kty(&self) -> &'static str {
        match self {
            Self::RsaPrivate(_) | Self::RsaPublic(_) => "RSA",
            Self::P256Private(_) | Self::P256Public(_) | Self::K256Private(_) | Self::K256Public(_) => {
                "EC"
            }
            Self::Secret(_) => "oct",
        }
    }
}

impl fmt::Debug for KeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RsaPrivate(_) => "RsaPrivate",
            Self::RsaPublic(_) => "RsaPublic",
            Self::P256Private(_) => "P256Private",
            Self::P256Public(_) => "P256Public",
            Self::K256Private(_) => "K256Private",
            Self::K256Public(_) => "K256Public",
            Self::Secret(_) => "Secret",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
/// A key imported into (or generated by) a provider.
///
/// It only lives for the duration of a single operation,
/// persistent keys are kept by the key store as [`JWK`].
pub struct CryptoKey {
    algorithm: String,
    usages: KeyUsages,
    handle: KeyHandle,
}

impl CryptoKey {
    pub fn new(algorithm: impl Into<String>, usages: KeyUsages, handle: KeyHandle) -> Self {
        Self {
            algorithm: algorithm.into(),
            usages,
            handle,
        }
    }

    /// Algorithm this key was imported or generated for
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn class(&self) -> KeyClass {
        self.handle.class()
    }

    pub fn usages(&self) -> KeyUsages {
        self.usages
    }

    pub fn handle(&self) -> &KeyHandle {
        &self.handle
    }
}

#[derive(Debug, Clone)]
pub struct CryptoKeyPair {
    pub private: CryptoKey,
    pub public: CryptoKey,
}
