use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sigil_utils::macros::match_ignore_ascii_case_str;

use crate::{CryptoError, jose::JWKEllipticCurves};

macro_rules! jose_names {
    (
        $(#[$m:meta])*
        pub enum $name:ident {
            $( $(#[$var_meta:meta])* $var:ident => $val:literal ),+ $(,)?
        }
    ) => {
        $(#[$m])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$var_meta])* $var ),+
        }

        impl $name {
            /// Registered name of this algorithm
            pub const fn as_str(self) -> &'static str {
                match self {
                    $( Self::$var => $val ),+
                }
            }
        }

        impl FromStr for $name {
            type Err = CryptoError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match_ignore_ascii_case_str!(match (s) {
                    $( $val => Ok(Self::$var) ),+ ,
                    _ => Err(CryptoError::UnsupportedAlgorithm(s.to_owned())),
                })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

jose_names! {
    /// [`JWA`] or JSON Web Algorithms for digital signatures and MACs as defined in [`rfc7518`],
    /// extended with `ES256K` from [`rfc8812`]
    ///
    /// [`rfc7518`]: https://datatracker.ietf.org/doc/html/rfc7518#section-3.1
    /// [`rfc8812`]: https://datatracker.ietf.org/doc/html/rfc8812#section-3.1
    pub enum JWA {
        /// HMAC using SHA-256
        HS256 => "HS256",
        /// HMAC using SHA-384
        HS384 => "HS384",
        /// HMAC using SHA-512
        HS512 => "HS512",
        /// RSASSA-PKCS1-v1_5 using SHA-256
        RS256 => "RS256",
        /// RSASSA-PKCS1-v1_5 using SHA-384
        RS384 => "RS384",
        /// RSASSA-PKCS1-v1_5 using SHA-512
        RS512 => "RS512",
        /// RSASSA-PSS using SHA-256 and MGF1 with SHA-256
        PS256 => "PS256",
        /// RSASSA-PSS using SHA-384 and MGF1 with SHA-384
        PS384 => "PS384",
        /// RSASSA-PSS using SHA-512 and MGF1 with SHA-512
        PS512 => "PS512",
        /// ECDSA using P-256 and SHA-256
        ES256 => "ES256",
        /// ECDSA using secp256k1 and SHA-256
        ES256K => "ES256K",
    }
}

jose_names! {
    /// Key management algorithms used to wrap the content encryption key of a JWE,
    /// see [`rfc7518, section 4.1`]
    ///
    /// [`rfc7518, section 4.1`]: https://datatracker.ietf.org/doc/html/rfc7518#section-4.1
    pub enum JWEAlgorithm {
        /// RSAES OAEP using default parameters (SHA-1, MGF1 with SHA-1)
        RsaOaep => "RSA-OAEP",
        /// RSAES OAEP using SHA-256 and MGF1 with SHA-256
        RsaOaep256 => "RSA-OAEP-256",
    }
}

jose_names! {
    /// Content encryption algorithms of a JWE, see [`rfc7518, section 5.1`]
    ///
    /// [`rfc7518, section 5.1`]: https://datatracker.ietf.org/doc/html/rfc7518#section-5.1
    pub enum JWEEncryption {
        /// AES GCM using 128-bit key
        A128GCM => "A128GCM",
        /// AES GCM using 192-bit key
        A192GCM => "A192GCM",
        /// AES GCM using 256-bit key
        A256GCM => "A256GCM",
    }
}

jose_names! {
    /// Message digest algorithms
    pub enum DigestAlgorithm {
        Sha256 => "SHA-256",
        Sha384 => "SHA-384",
        Sha512 => "SHA-512",
    }
}

/// Raw elliptic curve Diffie-Hellman shared secret derivation
pub const ECDH: &str = "ECDH";

/// Signature algorithm used when neither the caller nor the key declares one
pub const DEFAULT_SIGNING_ALGORITHM: JWA = JWA::ES256K;
/// Content encryption algorithm used when the caller does not declare one
pub const DEFAULT_CONTENT_ENCRYPTION: JWEEncryption = JWEEncryption::A256GCM;
/// Key encryption algorithm used when neither the caller nor the recipient key declares one
pub const DEFAULT_KEY_ENCRYPTION: JWEAlgorithm = JWEAlgorithm::RsaOaep256;

impl JWA {
    /// `kty` of the keys this algorithm operates on
    pub const fn kty(self) -> &'static str {
        match self {
            Self::HS256 | Self::HS384 | Self::HS512 => "oct",
            Self::RS256 | Self::RS384 | Self::RS512 | Self::PS256 | Self::PS384 | Self::PS512 => {
                "RSA"
            }
            Self::ES256 | Self::ES256K => "EC",
        }
    }

    /// True for the HMAC family, which is served by the mac signer category
    pub const fn is_mac(self) -> bool {
        matches!(self, Self::HS256 | Self::HS384 | Self::HS512)
    }

    /// Curve a key must be on to be used with this algorithm
    pub const fn curve(self) -> Option<JWKEllipticCurves> {
        match self {
            Self::ES256 => Some(JWKEllipticCurves::P256),
            Self::ES256K => Some(JWKEllipticCurves::Secp256k1),
            _ => None,
        }
    }

    /// Digest used to hash the signing input
    pub const fn digest(self) -> DigestAlgorithm {
        match self {
            Self::HS256 | Self::RS256 | Self::PS256 | Self::ES256 | Self::ES256K => {
                DigestAlgorithm::Sha256
            }
            Self::HS384 | Self::RS384 | Self::PS384 => DigestAlgorithm::Sha384,
            Self::HS512 | Self::RS512 | Self::PS512 => DigestAlgorithm::Sha512,
        }
    }
}

impl From<JWKEllipticCurves> for JWA {
    fn from(value: JWKEllipticCurves) -> Self {
        match value {
            JWKEllipticCurves::P256 => Self::ES256,
            JWKEllipticCurves::Secp256k1 => Self::ES256K,
        }
    }
}

impl JWEEncryption {
    /// Length in bytes of the content encryption key
    pub const fn key_len(self) -> usize {
        match self {
            Self::A128GCM => 16,
            Self::A192GCM => 24,
            Self::A256GCM => 32,
        }
    }
}

/// True if the name is one of the HMAC signature algorithms
pub(crate) fn is_mac_algorithm(algorithm: &str) -> bool {
    algorithm.parse::<JWA>().is_ok_and(JWA::is_mac)
}
