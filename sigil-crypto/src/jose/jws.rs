use serde::{Deserialize, Serialize};
use sigil_error::{ErrorContext, OpaqueError};
use sigil_utils::macros::generate_set_and_with;

use crate::{
    CryptoError,
    extension::CryptoExtension,
    jose::{DEFAULT_SIGNING_ALGORITHM, Header, HeaderField, JWA, JWK, TokenFormat, b64, fill_parameter},
    keystore::KeyStore,
};

#[derive(Debug, Clone, Default)]
/// Options of a single signature
pub struct SignOptions {
    algorithm: Option<String>,
    format: TokenFormat,
    protected: Header,
    header: Header,
    kid: Option<String>,
}

impl SignOptions {
    pub fn new() -> Self {
        Self::default()
    }

    generate_set_and_with! {
        /// Signing algorithm, overrides the `alg` declared by the key
        pub fn algorithm(mut self, algorithm: Option<String>) -> Self {
            self.algorithm = algorithm;
            self
        }
    }

    generate_set_and_with! {
        /// Wire format of the token returned by [`JWS::sign`]
        pub fn format(mut self, format: TokenFormat) -> Self {
            self.format = format;
            self
        }
    }

    generate_set_and_with! {
        /// Parameters of the protected header, merged over the defaults
        pub fn protected(mut self, protected: Header) -> Self {
            self.protected.merge(&protected);
            self
        }
    }

    generate_set_and_with! {
        /// Parameters of the unprotected header
        pub fn header(mut self, header: Header) -> Self {
            self.header.merge(&header);
            self
        }
    }

    generate_set_and_with! {
        /// Key id to fill in, overrides the `kid` of the key
        pub fn kid(mut self, kid: Option<String>) -> Self {
            self.kid = kid;
            self
        }
    }

    pub fn format(&self) -> TokenFormat {
        self.format
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// One signature over the payload of a [`JWS`]
pub struct Signature {
    protected: Header,
    // segment as signed, never re-encoded
    protected_b64: String,
    header: Header,
    signature: Vec<u8>,
}

impl Signature {
    fn from_parts(protected_b64: String, header: Header, signature: Vec<u8>) -> Result<Self, CryptoError> {
        let protected = Header::decode(&protected_b64)
            .context("decode protected header")
            .map_err(CryptoError::MalformedToken)?;
        if !protected.has_elements() && !header.has_elements() {
            return Err(CryptoError::malformed(
                "signature has neither a protected nor an unprotected header",
            ));
        }
        Ok(Self {
            protected,
            protected_b64,
            header,
            signature,
        })
    }

    pub fn protected(&self) -> &Header {
        &self.protected
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Algorithm, looked up in the protected header first
    pub fn alg(&self) -> Option<&str> {
        self.protected.alg().or_else(|| self.header.alg())
    }

    /// Key id, looked up in the protected header first
    pub fn kid(&self) -> Option<&str> {
        self.protected.kid().or_else(|| self.header.kid())
    }

    fn signing_input(&self, payload: &[u8]) -> Vec<u8> {
        signing_input(&self.protected_b64, payload)
    }

    fn check_critical(&self) -> Result<(), CryptoError> {
        match self.protected.crit() {
            Some(crit) if !crit.is_empty() => Err(CryptoError::unsupported_operation(
                self.alg().unwrap_or_default(),
                "critical header parameters",
            )),
            _ => Ok(()),
        }
    }
}

fn signing_input(protected_b64: &str, payload: &[u8]) -> Vec<u8> {
    format!("{protected_b64}.{}", b64::encode(payload)).into_bytes()
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Signed token: a payload with one or more [`Signature`]s
pub struct JWS {
    payload: Vec<u8>,
    signatures: Vec<Signature>,
    format: TokenFormat,
}

impl JWS {
    /// Sign the payload with the key behind the reference
    pub async fn sign<K: KeyStore>(
        extension: &CryptoExtension<K>,
        reference: &str,
        payload: impl Into<Vec<u8>>,
        options: &SignOptions,
    ) -> Result<Self, CryptoError> {
        JwsBuilder::new(payload)
            .sign(extension, reference, options)
            .await?
            .build(options.format)
    }

    /// Parse a token in any [`TokenFormat`], tried in order general, flat, compact
    pub fn parse(token: &str) -> Result<Self, CryptoError> {
        let token = token.trim();
        let general = match parse_general(token) {
            Ok(jws) => return Ok(jws),
            Err(err) => err,
        };
        tracing::trace!(%general, "not a general JWS");
        let flat = match parse_flat(token) {
            Ok(jws) => return Ok(jws),
            Err(err) => err,
        };
        tracing::trace!(%flat, "not a flat JWS");
        parse_compact(token).map_err(|compact| {
            CryptoError::malformed(format!(
                "not a JWS in any format: general: {general}; flat: {flat}; compact: {compact}"
            ))
        })
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    /// Format the token was parsed from or built for
    pub fn format(&self) -> TokenFormat {
        self.format
    }

    /// Algorithm of the first signature
    pub fn alg(&self) -> Option<&str> {
        self.signatures.first().and_then(Signature::alg)
    }

    /// Key id of the first signature
    pub fn kid(&self) -> Option<&str> {
        self.signatures.first().and_then(Signature::kid)
    }

    /// Serialize in the format of this token
    pub fn serialize(&self) -> Result<String, CryptoError> {
        self.serialize_as(self.format)
    }

    pub fn serialize_as(&self, format: TokenFormat) -> Result<String, CryptoError> {
        check_format(format, &self.signatures)?;
        let payload = b64::encode(&self.payload);
        match format {
            TokenFormat::Compact => {
                let [signature] = self.signatures.as_slice() else {
                    return Err(compact_signature_count(self.signatures.len()));
                };
                Ok(format!(
                    "{}.{payload}.{}",
                    signature.protected_b64,
                    b64::encode(&signature.signature)
                ))
            }
            TokenFormat::Flat => {
                let [signature] = self.signatures.as_slice() else {
                    return Err(CryptoError::other(format!(
                        "flat JWS has exactly one signature, found {}",
                        self.signatures.len()
                    )));
                };
                let RawSignature {
                    protected,
                    header,
                    signature,
                } = RawSignature::from(signature);
                to_json(&FlatJws {
                    payload,
                    protected,
                    header,
                    signature,
                })
            }
            TokenFormat::General => to_json(&GeneralJws {
                payload,
                signatures: self.signatures.iter().map(RawSignature::from).collect(),
            }),
        }
    }

    /// Returns true if any signature verifies with one of the candidate keys.
    ///
    /// A candidate is only tried for a signature if its key type fits the
    /// algorithm and, when both carry one, its `kid` matches.
    pub fn verify<K: KeyStore>(
        &self,
        extension: &CryptoExtension<K>,
        candidates: &[JWK],
    ) -> Result<bool, CryptoError> {
        self.verify_candidates(extension, candidates, true)
    }

    /// Returns true if any signature verifies with the given key,
    /// key ids are not compared.
    ///
    /// Unlike [`JWS::verify`] a key which cannot be used fails the call.
    pub fn verify_with_key<K: KeyStore>(
        &self,
        extension: &CryptoExtension<K>,
        key: &JWK,
    ) -> Result<bool, CryptoError> {
        self.verify_candidates(extension, std::slice::from_ref(key), false)
    }

    fn verify_candidates<K: KeyStore>(
        &self,
        extension: &CryptoExtension<K>,
        candidates: &[JWK],
        search: bool,
    ) -> Result<bool, CryptoError> {
        for (index, signature) in self.signatures.iter().enumerate() {
            signature.check_critical()?;
            let alg = signature.alg().ok_or_else(|| {
                CryptoError::malformed(format!("signature {index} does not declare an algorithm"))
            })?;
            let input = signature.signing_input(&self.payload);
            for key in candidates {
                if search
                    && let (Some(expected), Some(kid)) = (signature.kid(), key.kid())
                    && expected != kid
                {
                    tracing::trace!(signature = index, kid, expected, "skip candidate key: kid mismatch");
                    continue;
                }
                if !fits_algorithm(alg, key) {
                    tracing::trace!(signature = index, alg, kty = key.kty(), "skip candidate key: key type mismatch");
                    continue;
                }
                match extension.verify_with_key(alg, key, &signature.signature, &input) {
                    Ok(true) => {
                        tracing::debug!(signature = index, alg, kid = key.kid(), "signature verified");
                        return Ok(true);
                    }
                    Ok(false) => {}
                    Err(
                        err @ (CryptoError::InvalidKey(_)
                        | CryptoError::KeyFormatMismatch { .. }
                        | CryptoError::KeyUsageViolation { .. }),
                    ) if search => {
                        tracing::trace!(signature = index, alg, kid = key.kid(), %err, "skip candidate key: unusable");
                    }
                    Err(err) => return Err(err),
                }
            }
        }
        tracing::debug!(signatures = self.signatures.len(), "no signature verified");
        Ok(false)
    }
}

/// Key type (and curve) of the key fit the algorithm, unknown algorithms
/// are left to their provider
fn fits_algorithm(alg: &str, key: &JWK) -> bool {
    alg.parse::<JWA>().ok().is_none_or(|jwa| {
        jwa.kty() == key.kty() && jwa.curve().is_none_or(|curve| key.curve() == Some(curve))
    })
}

#[derive(Debug, Clone)]
/// Builder of a [`JWS`] with one or more signatures over the same payload
pub struct JwsBuilder {
    payload: Vec<u8>,
    signatures: Vec<Signature>,
}

impl JwsBuilder {
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
            signatures: Vec::new(),
        }
    }

    /// Add a signature made with the key behind the reference
    pub async fn sign<K: KeyStore>(
        mut self,
        extension: &CryptoExtension<K>,
        reference: &str,
        options: &SignOptions,
    ) -> Result<Self, CryptoError> {
        let metadata = extension.key_metadata(reference).await?;
        let algorithm = options
            .algorithm
            .as_deref()
            .or(metadata.alg.as_deref())
            .unwrap_or(DEFAULT_SIGNING_ALGORITHM.as_str())
            .to_owned();

        let mut protected = options.protected.clone();
        let mut header = options.header.clone();
        for declared in [protected.alg(), header.alg()].into_iter().flatten() {
            if !declared.eq_ignore_ascii_case(&algorithm) {
                return Err(CryptoError::other(format!(
                    "header declares algorithm '{declared}' but the signature uses '{algorithm}'"
                )));
            }
        }
        let kid = options.kid.as_deref().or(metadata.kid.as_deref());
        fill_parameter(HeaderField::Alg, Some(&algorithm), &mut protected, &mut [&mut header]);
        fill_parameter(HeaderField::Kid, kid, &mut protected, &mut [&mut header]);

        let protected_b64 = protected.encode()?;
        let input = signing_input(&protected_b64, &self.payload);
        let signature = extension
            .sign_with_key_reference(&algorithm, reference, &input)
            .await?;
        tracing::debug!(algorithm, reference, kid, "signed payload");

        self.signatures.push(Signature {
            protected,
            protected_b64,
            header,
            signature,
        });
        Ok(self)
    }

    /// Finish the token, fails if it has no signature or does not fit the format
    pub fn build(self, format: TokenFormat) -> Result<JWS, CryptoError> {
        if self.signatures.is_empty() {
            return Err(CryptoError::other("JWS requires at least one signature"));
        }
        check_format(format, &self.signatures)?;
        Ok(JWS {
            payload: self.payload,
            signatures: self.signatures,
            format,
        })
    }
}

fn compact_signature_count(count: usize) -> CryptoError {
    CryptoError::other(format!("compact JWS has exactly one signature, found {count}"))
}

fn check_format(format: TokenFormat, signatures: &[Signature]) -> Result<(), CryptoError> {
    match format {
        TokenFormat::Compact => match signatures {
            [signature] if signature.header.has_elements() => Err(CryptoError::other(
                "compact JWS cannot carry an unprotected header",
            )),
            [signature] if signature.protected_b64.is_empty() => Err(CryptoError::other(
                "compact JWS requires a protected header",
            )),
            [_] => Ok(()),
            _ => Err(compact_signature_count(signatures.len())),
        },
        TokenFormat::Flat if signatures.len() != 1 => Err(CryptoError::other(format!(
            "flat JWS has exactly one signature, found {}",
            signatures.len()
        ))),
        TokenFormat::Flat | TokenFormat::General => Ok(()),
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RawSignature {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    protected: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    header: Option<Header>,
    signature: String,
}

impl From<&Signature> for RawSignature {
    fn from(signature: &Signature) -> Self {
        Self {
            protected: signature.protected_b64.clone(),
            header: signature
                .header
                .has_elements()
                .then(|| signature.header.clone()),
            signature: b64::encode(&signature.signature),
        }
    }
}

impl RawSignature {
    fn decode(self) -> Result<Signature, CryptoError> {
        let signature = b64::decode(&self.signature)
            .context("base64url decode signature")
            .map_err(CryptoError::MalformedToken)?;
        Signature::from_parts(self.protected, self.header.unwrap_or_default(), signature)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct FlatJws {
    payload: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    protected: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    header: Option<Header>,
    signature: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeneralJws {
    payload: String,
    signatures: Vec<RawSignature>,
}

fn to_json(value: &impl Serialize) -> Result<String, CryptoError> {
    serde_json::to_string(value)
        .context("serialize JWS json")
        .map_err(CryptoError::Other)
}

fn decode_payload(payload: &str) -> Result<Vec<u8>, CryptoError> {
    b64::decode(payload)
        .context("base64url decode payload")
        .map_err(CryptoError::MalformedToken)
}

fn parse_general(token: &str) -> Result<JWS, OpaqueError> {
    let general: GeneralJws = serde_json::from_str(token).context("parse general JWS json")?;
    if general.signatures.is_empty() {
        return Err(OpaqueError::from_display("signatures array is empty"));
    }
    let signatures = general
        .signatures
        .into_iter()
        .map(RawSignature::decode)
        .collect::<Result<Vec<_>, _>>()
        .context("decode signatures")?;
    Ok(JWS {
        payload: decode_payload(&general.payload).context("decode general JWS")?,
        signatures,
        format: TokenFormat::General,
    })
}

fn parse_flat(token: &str) -> Result<JWS, OpaqueError> {
    let flat: FlatJws = serde_json::from_str(token).context("parse flat JWS json")?;
    let signature = RawSignature {
        protected: flat.protected,
        header: flat.header,
        signature: flat.signature,
    }
    .decode()
    .context("decode signature")?;
    Ok(JWS {
        payload: decode_payload(&flat.payload).context("decode flat JWS")?,
        signatures: vec![signature],
        format: TokenFormat::Flat,
    })
}

fn parse_compact(token: &str) -> Result<JWS, OpaqueError> {
    let mut segments = token.split('.');
    let (Some(protected), Some(payload), Some(signature), None) =
        (segments.next(), segments.next(), segments.next(), segments.next())
    else {
        return Err(OpaqueError::from_display(
            "compact JWS has three dot separated segments",
        ));
    };
    let signature = RawSignature {
        protected: protected.to_owned(),
        header: None,
        signature: signature.to_owned(),
    }
    .decode()
    .context("decode compact signature")?;
    Ok(JWS {
        payload: decode_payload(payload).context("decode compact JWS")?,
        signatures: vec![signature],
        format: TokenFormat::Compact,
    })
}
