use std::fmt;

use aws_lc_rs::digest::{SHA256, digest};
use serde::{Deserialize, Serialize, Serializer, ser::SerializeStruct};
use sigil_error::{ErrorContext, OpaqueError};
use sigil_utils::macros::generate_set_and_with;

use crate::{CryptoError, jose::b64};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
/// [`JWK`] or JSON Web Key as defined in [`rfc7517`]
///
/// Private members are only present in the full form of a key,
/// [`JWK::to_public`] strips them.
///
/// [`rfc7517`]: https://datatracker.ietf.org/doc/html/rfc7517
pub struct JWK {
    #[serde(flatten)]
    key_type: JWKType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kid: Option<String>,
    /// Intended algorithm to be used with this key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    alg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    r#use: Option<JWKUse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key_ops: Option<Vec<String>>,
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kty")]
/// The "kty" (key type) parameter identifies the cryptographic algorithm family used with the key
///
/// All members are base64url encoded (without padding) big-endian integers or octets.
pub enum JWKType {
    RSA {
        n: String,
        e: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        d: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        p: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        q: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dp: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dq: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        qi: Option<String>,
    },
    /// Elliptic curve
    EC {
        crv: JWKEllipticCurves,
        x: String,
        y: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        d: Option<String>,
    },
    /// an octet sequence key, which represents a symmetric key
    #[serde(rename = "oct")]
    OCT { k: String },
}

impl fmt::Debug for JWKType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // private members are never printed
        match self {
            Self::RSA { n, e, d, .. } => f
                .debug_struct("RSA")
                .field("n", n)
                .field("e", e)
                .field("private", &d.is_some())
                .finish(),
            Self::EC { crv, x, y, d } => f
                .debug_struct("EC")
                .field("crv", crv)
                .field("x", x)
                .field("y", y)
                .field("private", &d.is_some())
                .finish(),
            Self::OCT { .. } => f.debug_struct("OCT").finish_non_exhaustive(),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum JWKEllipticCurves {
    #[serde(rename = "P-256")]
    P256,
    #[serde(rename = "secp256k1")]
    Secp256k1,
}

impl JWKEllipticCurves {
    /// Registered `crv` name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::P256 => "P-256",
            Self::Secp256k1 => "secp256k1",
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
/// [`JWKUse`] identifies the intended use of the public key
pub enum JWKUse {
    #[serde(rename = "sig")]
    Signature,
    #[serde(rename = "enc")]
    Encryption,
}

/// Required members of a [`JWK`] in lexicographic order, as hashed by [`rfc7638`]
///
/// [`rfc7638`]: https://datatracker.ietf.org/doc/html/rfc7638#section-3.2
struct ThumbprintMembers<'a>(&'a JWKType);

impl Serialize for ThumbprintMembers<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Order here is important as this output is hashed
        match self.0 {
            JWKType::EC { crv, x, y, .. } => {
                let mut state = serializer.serialize_struct("JWK", 4)?;
                state.serialize_field("crv", crv)?;
                state.serialize_field("kty", "EC")?;
                state.serialize_field("x", x)?;
                state.serialize_field("y", y)?;
                state.end()
            }
            JWKType::RSA { n, e, .. } => {
                let mut state = serializer.serialize_struct("JWK", 3)?;
                state.serialize_field("e", e)?;
                state.serialize_field("kty", "RSA")?;
                state.serialize_field("n", n)?;
                state.end()
            }
            JWKType::OCT { k } => {
                let mut state = serializer.serialize_struct("JWK", 2)?;
                state.serialize_field("k", k)?;
                state.serialize_field("kty", "oct")?;
                state.end()
            }
        }
    }
}

impl JWK {
    /// Create a [`JWK`] without any optional metadata
    pub fn new(key_type: JWKType) -> Self {
        Self {
            key_type,
            kid: None,
            alg: None,
            r#use: None,
            key_ops: None,
        }
    }

    generate_set_and_with! {
        /// Key id, used to match a key with the `kid` header of a token
        pub fn kid(mut self, kid: Option<String>) -> Self {
            self.kid = kid;
            self
        }
    }

    generate_set_and_with! {
        /// Algorithm this key is intended for
        pub fn alg(mut self, alg: Option<String>) -> Self {
            self.alg = alg;
            self
        }
    }

    generate_set_and_with! {
        /// Intended use of the public key
        pub fn key_use(mut self, key_use: Option<JWKUse>) -> Self {
            self.r#use = key_use;
            self
        }
    }

    generate_set_and_with! {
        /// Operations this key is intended for
        pub fn key_ops(mut self, key_ops: Option<Vec<String>>) -> Self {
            self.key_ops = key_ops;
            self
        }
    }

    pub fn key_type(&self) -> &JWKType {
        &self.key_type
    }

    pub fn kid(&self) -> Option<&str> {
        self.kid.as_deref().filter(|kid| !kid.is_empty())
    }

    pub fn alg(&self) -> Option<&str> {
        self.alg.as_deref().filter(|alg| !alg.is_empty())
    }

    pub fn key_use(&self) -> Option<JWKUse> {
        self.r#use
    }

    pub fn key_ops(&self) -> Option<&[String]> {
        self.key_ops.as_deref()
    }

    /// Registered `kty` value of this key
    pub fn kty(&self) -> &'static str {
        match self.key_type {
            JWKType::RSA { .. } => "RSA",
            JWKType::EC { .. } => "EC",
            JWKType::OCT { .. } => "oct",
        }
    }

    /// Curve of an elliptic curve key
    pub fn curve(&self) -> Option<JWKEllipticCurves> {
        match self.key_type {
            JWKType::EC { crv, .. } => Some(crv),
            JWKType::RSA { .. } | JWKType::OCT { .. } => None,
        }
    }

    /// True if this key carries private (or secret) material
    pub fn is_private(&self) -> bool {
        match &self.key_type {
            JWKType::RSA { d, .. } | JWKType::EC { d, .. } => d.is_some(),
            JWKType::OCT { .. } => true,
        }
    }

    /// Public form of this key, with all private members removed
    ///
    /// Symmetric keys have no public form.
    pub fn to_public(&self) -> Result<Self, CryptoError> {
        let key_type = match &self.key_type {
            JWKType::RSA { n, e, .. } => JWKType::RSA {
                n: n.clone(),
                e: e.clone(),
                d: None,
                p: None,
                q: None,
                dp: None,
                dq: None,
                qi: None,
            },
            JWKType::EC { crv, x, y, .. } => JWKType::EC {
                crv: *crv,
                x: x.clone(),
                y: y.clone(),
                d: None,
            },
            JWKType::OCT { .. } => {
                return Err(CryptoError::unsupported_operation("oct", "public key export"));
            }
        };

        Ok(Self {
            key_type,
            kid: self.kid.clone(),
            alg: self.alg.clone(),
            r#use: self.r#use,
            key_ops: self.key_ops.clone(),
        })
    }

    /// [`JWK`] thumbprint as defined in [`rfc7638`], a url safe identifier for a [`JWK`]
    /// computed with SHA-256 over its required public members
    ///
    /// [`rfc7638`]: https://datatracker.ietf.org/doc/html/rfc7638
    pub fn thumbprint(&self) -> Result<String, OpaqueError> {
        let members = serde_json::to_vec(&ThumbprintMembers(&self.key_type))
            .context("serialize JWK thumbprint members")?;
        Ok(b64::encode(digest(&SHA256, &members)))
    }
}
