//! # JOSE: JSON Object Signing and Encryption
//!
//! The token engine of sigil, producing and consuming:
//!
//! * JWS (JSON Web Signature): a payload and one or more signatures, each
//!   covering its protected header and the payload. See [`rfc7515`].
//!
//! * JWE (JSON Web Encryption): a payload encrypted under a fresh content
//!   encryption key (CEK), with the CEK wrapped for one or more recipients.
//!   See [`rfc7516`].
//!
//! * JWK (JSON Web Key): the key material record used at the key store boundary.
//!   See [`rfc7517`].
//!
//! * JWA (JSON Web Algorithms): the registered algorithm names. See [`rfc7518`].
//!
//! Both token kinds can be serialized in the three [`TokenFormat`]s and are
//! parsed by auto-detection (general, flattened, then compact).
//!
//! [`rfc7515`]: https://datatracker.ietf.org/doc/html/rfc7515
//! [`rfc7516`]: https://datatracker.ietf.org/doc/html/rfc7516
//! [`rfc7517`]: https://datatracker.ietf.org/doc/html/rfc7517
//! [`rfc7518`]: https://datatracker.ietf.org/doc/html/rfc7518

use std::{fmt, str::FromStr};

use sigil_utils::macros::match_ignore_ascii_case_str;

use crate::CryptoError;

mod jwa;
pub use jwa::{
    DEFAULT_CONTENT_ENCRYPTION, DEFAULT_KEY_ENCRYPTION, DEFAULT_SIGNING_ALGORITHM,
    DigestAlgorithm, ECDH, JWA, JWEAlgorithm, JWEEncryption,
};
pub(crate) use jwa::is_mac_algorithm;

mod jwk;
pub use jwk::{JWK, JWKEllipticCurves, JWKType, JWKUse};

mod header;
pub use header::Header;
pub(crate) use header::{HeaderField, fill_parameter};

mod jws;
pub use jws::{JWS, JwsBuilder, SignOptions, Signature};

mod jwe;
pub use jwe::{DecryptOptions, EncryptOptions, JWE, Recipient};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
/// Wire serialization of a token
pub enum TokenFormat {
    /// Dot separated base64url segments, single signature or recipient only
    #[default]
    Compact,
    /// JSON object with a single signature or recipient inlined
    Flat,
    /// JSON object with an array of signatures or recipients
    General,
}

impl TokenFormat {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Flat => "flat",
            Self::General => "general",
        }
    }
}

impl fmt::Display for TokenFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenFormat {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match_ignore_ascii_case_str!(match (s) {
            "compact" => Ok(Self::Compact),
            "flat" | "flattened" => Ok(Self::Flat),
            "general" | "json" => Ok(Self::General),
            _ => Err(CryptoError::other(format!("unknown token format '{s}'"))),
        })
    }
}

pub(crate) mod b64 {
    //! base64url without padding, as used by every JOSE member

    use base64::{DecodeError, Engine as _, prelude::BASE64_URL_SAFE_NO_PAD};

    pub(crate) fn encode(data: impl AsRef<[u8]>) -> String {
        BASE64_URL_SAFE_NO_PAD.encode(data)
    }

    /// Decoding is strict: padding and non-canonical trailing bits are rejected
    pub(crate) fn decode(encoded: impl AsRef<[u8]>) -> Result<Vec<u8>, DecodeError> {
        BASE64_URL_SAFE_NO_PAD.decode(encoded)
    }
}
