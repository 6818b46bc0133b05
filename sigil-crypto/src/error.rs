use std::fmt;

use sigil_error::OpaqueError;

/// Errors returned by the token engine, its providers and the key store boundary.
///
/// A signature that does not verify is not an error: verification
/// returns `Ok(false)` for an untrusted signer.
pub enum CryptoError {
    /// Token is missing a mandatory field or could not be decoded in any format
    MalformedToken(OpaqueError),
    /// No provider is registered for the algorithm (and no wildcard fallback exists)
    UnsupportedAlgorithm(String),
    /// Provider knows the algorithm but does not offer the requested operation
    UnsupportedOperation {
        algorithm: String,
        operation: &'static str,
    },
    /// Key usages (of the key or of the provider for that key class) do not permit the operation
    KeyUsageViolation {
        algorithm: String,
        usage: &'static str,
    },
    /// Key material was handed over in a shape the operation does not accept
    KeyFormatMismatch {
        expected: &'static str,
        found: String,
    },
    /// Key material is well-formed but cannot be used (e.g. scalar out of range)
    InvalidKey(OpaqueError),
    /// AEAD tag mismatch or key unwrap failure
    DecryptionFailure(OpaqueError),
    /// Key store has no key for the given reference
    KeyNotFound(String),
    /// Normal [`OpaqueError`] like we use everywhere else
    Other(OpaqueError),
}

impl CryptoError {
    pub(crate) fn malformed(reason: impl fmt::Display + fmt::Debug + Send + Sync + 'static) -> Self {
        Self::MalformedToken(OpaqueError::from_display(reason))
    }

    pub(crate) fn unsupported_operation(algorithm: &str, operation: &'static str) -> Self {
        Self::UnsupportedOperation {
            algorithm: algorithm.to_owned(),
            operation,
        }
    }

    pub(crate) fn usage_violation(algorithm: &str, usage: &'static str) -> Self {
        Self::KeyUsageViolation {
            algorithm: algorithm.to_owned(),
            usage,
        }
    }

    pub(crate) fn format_mismatch(expected: &'static str, found: impl Into<String>) -> Self {
        Self::KeyFormatMismatch {
            expected,
            found: found.into(),
        }
    }

    pub(crate) fn invalid_key(reason: impl fmt::Display + fmt::Debug + Send + Sync + 'static) -> Self {
        Self::InvalidKey(OpaqueError::from_display(reason))
    }

    pub(crate) fn decryption(reason: impl fmt::Display + fmt::Debug + Send + Sync + 'static) -> Self {
        Self::DecryptionFailure(OpaqueError::from_display(reason))
    }

    pub(crate) fn other(reason: impl fmt::Display + fmt::Debug + Send + Sync + 'static) -> Self {
        Self::Other(OpaqueError::from_display(reason))
    }
}

impl fmt::Debug for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::MalformedToken(err) => write!(f, "malformed token: {err:?}"),
            Self::UnsupportedAlgorithm(alg) => write!(f, "unsupported algorithm: {alg:?}"),
            Self::UnsupportedOperation {
                algorithm,
                operation,
            } => write!(f, "unsupported operation: {operation} ({algorithm:?})"),
            Self::KeyUsageViolation { algorithm, usage } => {
                write!(f, "key usage violation: {usage} ({algorithm:?})")
            }
            Self::KeyFormatMismatch { expected, found } => {
                write!(f, "key format mismatch: expected {expected}, found {found:?}")
            }
            Self::InvalidKey(err) => write!(f, "invalid key: {err:?}"),
            Self::DecryptionFailure(err) => write!(f, "decryption failure: {err:?}"),
            Self::KeyNotFound(reference) => write!(f, "key not found: {reference:?}"),
            Self::Other(err) => write!(f, "opaque error: {err:?}"),
        }
    }
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedToken(err) => write!(f, "malformed token: {err}"),
            Self::UnsupportedAlgorithm(alg) => write!(f, "unsupported algorithm '{alg}'"),
            Self::UnsupportedOperation {
                algorithm,
                operation,
            } => write!(f, "operation '{operation}' is not supported for algorithm '{algorithm}'"),
            Self::KeyUsageViolation { algorithm, usage } => {
                write!(f, "key usage '{usage}' is not permitted for algorithm '{algorithm}'")
            }
            Self::KeyFormatMismatch { expected, found } => {
                write!(f, "key format mismatch: expected {expected}, found {found}")
            }
            Self::InvalidKey(err) => write!(f, "invalid key: {err}"),
            Self::DecryptionFailure(err) => write!(f, "decryption failure: {err}"),
            Self::KeyNotFound(reference) => write!(f, "no key found for reference '{reference}'"),
            Self::Other(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for CryptoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::MalformedToken(err)
            | Self::InvalidKey(err)
            | Self::DecryptionFailure(err)
            | Self::Other(err) => err.source(),
            Self::UnsupportedAlgorithm(_)
            | Self::UnsupportedOperation { .. }
            | Self::KeyUsageViolation { .. }
            | Self::KeyFormatMismatch { .. }
            | Self::KeyNotFound(_) => None,
        }
    }
}

impl From<OpaqueError> for CryptoError {
    fn from(value: OpaqueError) -> Self {
        Self::Other(value)
    }
}
