use aws_lc_rs::rand::{SecureRandom as _, SystemRandom};
use serde::{Deserialize, Serialize};
use sigil_error::{ErrorContext, OpaqueError};
use sigil_utils::macros::generate_set_and_with;
use zeroize::Zeroizing;

use crate::{
    CryptoError,
    extension::CryptoExtension,
    jose::{
        DEFAULT_CONTENT_ENCRYPTION, DEFAULT_KEY_ENCRYPTION, Header, HeaderField, JWEEncryption,
        JWK, TokenFormat, b64, fill_parameter,
    },
    keystore::KeyStore,
    provider::AES_GCM_IV_LEN,
};

#[derive(Clone, Default)]
/// Options of [`JWE::encrypt`]
pub struct EncryptOptions {
    content_algorithm: Option<JWEEncryption>,
    key_algorithm: Option<String>,
    format: TokenFormat,
    protected: Header,
    unprotected: Header,
    header: Header,
    cek: Option<Zeroizing<Vec<u8>>>,
    iv: Option<Vec<u8>>,
    aad: Option<Vec<u8>>,
}

impl std::fmt::Debug for EncryptOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptOptions")
            .field("content_algorithm", &self.content_algorithm)
            .field("key_algorithm", &self.key_algorithm)
            .field("format", &self.format)
            .field("protected", &self.protected)
            .field("unprotected", &self.unprotected)
            .field("header", &self.header)
            .field("cek", &self.cek.as_ref().map(|_| "<redacted>"))
            .field("iv", &self.iv)
            .field("aad", &self.aad)
            .finish()
    }
}

impl EncryptOptions {
    pub fn new() -> Self {
        Self::default()
    }

    generate_set_and_with! {
        /// Content encryption algorithm, `A256GCM` if not set
        pub fn content_algorithm(mut self, content_algorithm: Option<JWEEncryption>) -> Self {
            self.content_algorithm = content_algorithm;
            self
        }
    }

    generate_set_and_with! {
        /// Key encryption algorithm of every recipient, overrides the `alg` of the recipient keys
        pub fn key_algorithm(mut self, key_algorithm: Option<String>) -> Self {
            self.key_algorithm = key_algorithm;
            self
        }
    }

    generate_set_and_with! {
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
        /// Shared unprotected header, not covered by the tag
        pub fn unprotected(mut self, unprotected: Header) -> Self {
            self.unprotected.merge(&unprotected);
            self
        }
    }

    generate_set_and_with! {
        /// Header of every recipient
        pub fn header(mut self, header: Header) -> Self {
            self.header.merge(&header);
            self
        }
    }

    generate_set_and_with! {
        /// Content encryption key, a fresh random key is used if not set
        pub fn cek(mut self, cek: Option<Zeroizing<Vec<u8>>>) -> Self {
            self.cek = cek;
            self
        }
    }

    generate_set_and_with! {
        /// Initialization vector, a fresh random one is used if not set
        pub fn iv(mut self, iv: Option<Vec<u8>>) -> Self {
            self.iv = iv;
            self
        }
    }

    generate_set_and_with! {
        /// Additional authenticated data, not available in the compact format
        pub fn aad(mut self, aad: Option<Vec<u8>>) -> Self {
            self.aad = aad;
            self
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
/// Options of [`JWE::decrypt`]
pub struct DecryptOptions {
    recipient: usize,
}

impl DecryptOptions {
    pub fn new() -> Self {
        Self::default()
    }

    generate_set_and_with! {
        /// Position of the recipient entry to unwrap the key of
        pub fn recipient(mut self, recipient: usize) -> Self {
            self.recipient = recipient;
            self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Content encryption key wrapped for one recipient
pub struct Recipient {
    header: Header,
    encrypted_key: Vec<u8>,
}

impl Recipient {
    /// Per-recipient unprotected header
    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn encrypted_key(&self) -> &[u8] {
        &self.encrypted_key
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Encrypted token: a payload encrypted under a content encryption key
/// which is wrapped for every [`Recipient`].
pub struct JWE {
    protected: Header,
    protected_b64: String,
    unprotected: Header,
    aad: Option<Vec<u8>>,
    iv: Vec<u8>,
    ciphertext: Vec<u8>,
    tag: Vec<u8>,
    recipients: Vec<Recipient>,
    format: TokenFormat,
}

fn random_bytes(length: usize) -> Result<Vec<u8>, CryptoError> {
    let mut bytes = vec![0; length];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|err| CryptoError::Other(OpaqueError::from_std(err)))?;
    Ok(bytes)
}

/// `ASCII(BASE64URL(protected))`, followed by `.BASE64URL(aad)` if there is one
fn additional_data(protected_b64: &str, aad: Option<&[u8]>) -> Vec<u8> {
    match aad {
        Some(aad) => format!("{protected_b64}.{}", b64::encode(aad)).into_bytes(),
        None => protected_b64.as_bytes().to_vec(),
    }
}

impl JWE {
    /// Encrypt the payload for every recipient key.
    ///
    /// A single recipient carries `alg` and `kid` in the protected header,
    /// multiple recipients carry them in their own header.
    pub fn encrypt<K: KeyStore>(
        extension: &CryptoExtension<K>,
        recipients: &[JWK],
        payload: &[u8],
        options: &EncryptOptions,
    ) -> Result<Self, CryptoError> {
        if recipients.is_empty() {
            return Err(CryptoError::other("JWE requires at least one recipient"));
        }
        let enc = options.content_algorithm.unwrap_or(DEFAULT_CONTENT_ENCRYPTION);
        let cek = match &options.cek {
            Some(cek) if cek.len() != enc.key_len() => {
                return Err(CryptoError::other(format!(
                    "{enc} requires a {} byte content encryption key, got {}",
                    enc.key_len(),
                    cek.len()
                )));
            }
            Some(cek) => cek.clone(),
            None => Zeroizing::new(random_bytes(enc.key_len())?),
        };
        let iv = match &options.iv {
            Some(iv) if iv.len() != AES_GCM_IV_LEN => {
                return Err(CryptoError::other(format!(
                    "initialization vector must be {AES_GCM_IV_LEN} bytes, got {}",
                    iv.len()
                )));
            }
            Some(iv) => iv.clone(),
            None => random_bytes(AES_GCM_IV_LEN)?,
        };

        let mut protected = options.protected.clone();
        let mut unprotected = options.unprotected.clone();
        for declared in [protected.enc(), unprotected.enc()].into_iter().flatten() {
            if !declared.eq_ignore_ascii_case(enc.as_str()) {
                return Err(CryptoError::other(format!(
                    "header declares content encryption '{declared}' but '{enc}' is used"
                )));
            }
        }
        fill_parameter(HeaderField::Enc, Some(enc.as_str()), &mut protected, &mut [&mut unprotected]);

        let single = recipients.len() == 1;
        let mut entries = Vec::with_capacity(recipients.len());
        for key in recipients {
            let algorithm = options
                .key_algorithm
                .as_deref()
                .or(key.alg())
                .unwrap_or(DEFAULT_KEY_ENCRYPTION.as_str())
                .to_owned();
            let mut header = options.header.clone();
            if single {
                fill_parameter(
                    HeaderField::Alg,
                    Some(&algorithm),
                    &mut protected,
                    &mut [&mut unprotected, &mut header],
                );
                fill_parameter(
                    HeaderField::Kid,
                    key.kid(),
                    &mut protected,
                    &mut [&mut unprotected, &mut header],
                );
            } else {
                fill_parameter(HeaderField::Alg, Some(&algorithm), &mut header, &mut []);
                fill_parameter(HeaderField::Kid, key.kid(), &mut header, &mut []);
            }
            entries.push((algorithm, key, header));
        }

        let protected_b64 = protected.encode()?;
        let aad = options.aad.clone();
        let (ciphertext, tag) = extension.symmetric_encrypt(
            enc.as_str(),
            &cek,
            &iv,
            &additional_data(&protected_b64, aad.as_deref()),
            payload,
        )?;

        let recipients = entries
            .into_iter()
            .map(|(algorithm, key, header)| {
                tracing::debug!(algorithm, kid = key.kid(), %enc, "wrap content encryption key for recipient");
                Ok(Recipient {
                    encrypted_key: extension.encrypt_with_key(&algorithm, key, &cek)?,
                    header,
                })
            })
            .collect::<Result<Vec<_>, CryptoError>>()?;

        let jwe = Self {
            protected,
            protected_b64,
            unprotected,
            aad,
            iv,
            ciphertext,
            tag,
            recipients,
            format: options.format,
        };
        jwe.check_format(options.format)?;
        Ok(jwe)
    }

    /// Decrypt the payload with the private key behind the reference.
    ///
    /// The key is unwrapped from the recipient entry selected in the options,
    /// any tag mismatch fails with [`CryptoError::DecryptionFailure`].
    pub async fn decrypt<K: KeyStore>(
        &self,
        extension: &CryptoExtension<K>,
        reference: &str,
        options: &DecryptOptions,
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let recipient = self.recipients.get(options.recipient).ok_or_else(|| {
            CryptoError::other(format!(
                "no recipient at position {}, token has {}",
                options.recipient,
                self.recipients.len()
            ))
        })?;
        if self.protected.crit().is_some_and(|crit| !crit.is_empty()) {
            return Err(CryptoError::unsupported_operation(
                self.parameter(recipient, Header::alg).unwrap_or_default(),
                "critical header parameters",
            ));
        }
        if [&self.protected, &self.unprotected, &recipient.header]
            .iter()
            .any(|header| header.get("zip").is_some())
        {
            return Err(CryptoError::unsupported_operation(
                self.parameter(recipient, Header::alg).unwrap_or_default(),
                "compressed payload",
            ));
        }
        let algorithm = self
            .parameter(recipient, Header::alg)
            .ok_or_else(|| CryptoError::malformed("recipient does not declare a key encryption algorithm"))?;
        let enc = self
            .parameter(recipient, Header::enc)
            .ok_or_else(|| CryptoError::malformed("token does not declare a content encryption algorithm"))?;

        tracing::debug!(algorithm, enc, reference, recipient = options.recipient, "decrypt JWE");
        let cek = extension
            .decrypt_with_key_reference(algorithm, reference, &recipient.encrypted_key)
            .await?;
        extension.symmetric_decrypt(
            enc,
            &cek,
            &self.iv,
            &additional_data(&self.protected_b64, self.aad.as_deref()),
            &self.ciphertext,
            &self.tag,
        )
    }

    /// Header parameter for the recipient: protected, then shared unprotected,
    /// then the recipient header
    fn parameter<'a>(
        &'a self,
        recipient: &'a Recipient,
        get: fn(&Header) -> Option<&str>,
    ) -> Option<&'a str> {
        get(&self.protected)
            .or_else(|| get(&self.unprotected))
            .or_else(|| get(&recipient.header))
    }

    /// Parse a token in any [`TokenFormat`], tried in order general, flat, compact
    pub fn parse(token: &str) -> Result<Self, CryptoError> {
        let token = token.trim();
        let general = match parse_general(token) {
            Ok(jwe) => return Ok(jwe),
            Err(err) => err,
        };
        tracing::trace!(%general, "not a general JWE");
        let flat = match parse_flat(token) {
            Ok(jwe) => return Ok(jwe),
            Err(err) => err,
        };
        tracing::trace!(%flat, "not a flat JWE");
        parse_compact(token).map_err(|compact| {
            CryptoError::malformed(format!(
                "not a JWE in any format: general: {general}; flat: {flat}; compact: {compact}"
            ))
        })
    }

    pub fn protected(&self) -> &Header {
        &self.protected
    }

    pub fn unprotected(&self) -> &Header {
        &self.unprotected
    }

    pub fn aad(&self) -> Option<&[u8]> {
        self.aad.as_deref()
    }

    pub fn iv(&self) -> &[u8] {
        &self.iv
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn tag(&self) -> &[u8] {
        &self.tag
    }

    pub fn recipients(&self) -> &[Recipient] {
        &self.recipients
    }

    pub fn format(&self) -> TokenFormat {
        self.format
    }

    /// Key encryption algorithm of the first recipient
    pub fn alg(&self) -> Option<&str> {
        self.recipients
            .first()
            .and_then(|recipient| self.parameter(recipient, Header::alg))
    }

    /// Key id of the first recipient
    pub fn kid(&self) -> Option<&str> {
        self.recipients
            .first()
            .and_then(|recipient| self.parameter(recipient, Header::kid))
    }

    /// Content encryption algorithm
    pub fn enc(&self) -> Option<&str> {
        self.protected.enc().or_else(|| self.unprotected.enc())
    }

    fn check_format(&self, format: TokenFormat) -> Result<(), CryptoError> {
        match format {
            TokenFormat::Compact => {
                let [recipient] = self.recipients.as_slice() else {
                    return Err(CryptoError::other(format!(
                        "compact JWE has exactly one recipient, found {}",
                        self.recipients.len()
                    )));
                };
                if self.unprotected.has_elements() || recipient.header.has_elements() {
                    return Err(CryptoError::other("compact JWE cannot carry unprotected headers"));
                }
                if self.aad.is_some() {
                    return Err(CryptoError::other(
                        "compact JWE cannot carry additional authenticated data",
                    ));
                }
                if self.protected_b64.is_empty() {
                    return Err(CryptoError::other("compact JWE requires a protected header"));
                }
                Ok(())
            }
            TokenFormat::Flat if self.recipients.len() != 1 => Err(CryptoError::other(format!(
                "flat JWE has exactly one recipient, found {}",
                self.recipients.len()
            ))),
            TokenFormat::Flat | TokenFormat::General => Ok(()),
        }
    }

    /// Serialize in the format of this token
    pub fn serialize(&self) -> Result<String, CryptoError> {
        self.serialize_as(self.format)
    }

    pub fn serialize_as(&self, format: TokenFormat) -> Result<String, CryptoError> {
        self.check_format(format)?;
        let shared = SharedMembers {
            protected: self.protected_b64.clone(),
            unprotected: self
                .unprotected
                .has_elements()
                .then(|| self.unprotected.clone()),
            aad: self.aad.as_ref().map(b64::encode),
            iv: b64::encode(&self.iv),
            ciphertext: b64::encode(&self.ciphertext),
            tag: b64::encode(&self.tag),
        };
        match (format, self.recipients.as_slice()) {
            (TokenFormat::Compact, [recipient]) => Ok(format!(
                "{}.{}.{}.{}.{}",
                shared.protected,
                b64::encode(&recipient.encrypted_key),
                shared.iv,
                shared.ciphertext,
                shared.tag
            )),
            (TokenFormat::Flat, [recipient]) => to_json(&FlatJwe {
                recipient: RawRecipient::from(recipient),
                shared,
            }),
            (TokenFormat::General, recipients) => to_json(&GeneralJwe {
                recipients: recipients.iter().map(RawRecipient::from).collect(),
                shared,
            }),
            (format, recipients) => Err(CryptoError::other(format!(
                "{format} JWE cannot carry {} recipients",
                recipients.len()
            ))),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SharedMembers {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    protected: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unprotected: Option<Header>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    aad: Option<String>,
    iv: String,
    ciphertext: String,
    tag: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawRecipient {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    header: Option<Header>,
    encrypted_key: String,
}

impl From<&Recipient> for RawRecipient {
    fn from(recipient: &Recipient) -> Self {
        Self {
            header: recipient
                .header
                .has_elements()
                .then(|| recipient.header.clone()),
            encrypted_key: b64::encode(&recipient.encrypted_key),
        }
    }
}

impl RawRecipient {
    fn decode(self) -> Result<Recipient, OpaqueError> {
        Ok(Recipient {
            header: self.header.unwrap_or_default(),
            encrypted_key: b64::decode(&self.encrypted_key).context("base64url decode encrypted_key")?,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct FlatJwe {
    #[serde(flatten)]
    recipient: RawRecipient,
    #[serde(flatten)]
    shared: SharedMembers,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeneralJwe {
    recipients: Vec<RawRecipient>,
    #[serde(flatten)]
    shared: SharedMembers,
}

fn to_json(value: &impl Serialize) -> Result<String, CryptoError> {
    serde_json::to_string(value)
        .context("serialize JWE json")
        .map_err(CryptoError::Other)
}

fn decode_member(name: &'static str, value: &str) -> Result<Vec<u8>, OpaqueError> {
    b64::decode(value).with_context(|| format!("base64url decode {name}"))
}

fn from_parts(
    shared: SharedMembers,
    recipients: Vec<Recipient>,
    format: TokenFormat,
) -> Result<JWE, OpaqueError> {
    let protected = Header::decode(&shared.protected).context("decode protected header")?;
    let unprotected = shared.unprotected.unwrap_or_default();
    if protected.enc().is_none() && unprotected.enc().is_none() {
        return Err(OpaqueError::from_display("no content encryption algorithm declared"));
    }
    Ok(JWE {
        protected,
        protected_b64: shared.protected,
        unprotected,
        aad: shared.aad.as_deref().map(|aad| decode_member("aad", aad)).transpose()?,
        iv: decode_member("iv", &shared.iv)?,
        ciphertext: decode_member("ciphertext", &shared.ciphertext)?,
        tag: decode_member("tag", &shared.tag)?,
        recipients,
        format,
    })
}

fn parse_general(token: &str) -> Result<JWE, OpaqueError> {
    let general: GeneralJwe = serde_json::from_str(token).context("parse general JWE json")?;
    if general.recipients.is_empty() {
        return Err(OpaqueError::from_display("recipients array is empty"));
    }
    let recipients = general
        .recipients
        .into_iter()
        .map(RawRecipient::decode)
        .collect::<Result<Vec<_>, _>>()
        .context("decode recipients")?;
    from_parts(general.shared, recipients, TokenFormat::General)
}

fn parse_flat(token: &str) -> Result<JWE, OpaqueError> {
    let flat: FlatJwe = serde_json::from_str(token).context("parse flat JWE json")?;
    let recipient = flat.recipient.decode()?;
    from_parts(flat.shared, vec![recipient], TokenFormat::Flat)
}

fn parse_compact(token: &str) -> Result<JWE, OpaqueError> {
    let segments: Vec<&str> = token.split('.').collect();
    let [protected, encrypted_key, iv, ciphertext, tag] = segments.as_slice() else {
        return Err(OpaqueError::from_display(format!(
            "compact JWE has five dot separated segments, found {}",
            segments.len()
        )));
    };
    if protected.is_empty() {
        return Err(OpaqueError::from_display("compact JWE requires a protected header"));
    }
    let recipient = RawRecipient {
        header: None,
        encrypted_key: (*encrypted_key).to_owned(),
    }
    .decode()?;
    from_parts(
        SharedMembers {
            protected: (*protected).to_owned(),
            unprotected: None,
            aad: None,
            iv: (*iv).to_owned(),
            ciphertext: (*ciphertext).to_owned(),
            tag: (*tag).to_owned(),
        },
        vec![recipient],
        TokenFormat::Compact,
    )
}
