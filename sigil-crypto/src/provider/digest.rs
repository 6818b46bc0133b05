use aws_lc_rs::digest;

use super::{Capabilities, CryptoProvider, KeyClass, KeyUsages};
use crate::{CryptoError, jose::DigestAlgorithm};

#[derive(Debug, Clone, Copy, Default)]
#[non_exhaustive]
/// SHA-2 message digests
pub struct DigestProvider;

impl DigestProvider {
    pub fn new() -> Self {
        Self
    }
}

pub(crate) fn digest_algorithm(algorithm: DigestAlgorithm) -> &'static digest::Algorithm {
    match algorithm {
        DigestAlgorithm::Sha256 => &digest::SHA256,
        DigestAlgorithm::Sha384 => &digest::SHA384,
        DigestAlgorithm::Sha512 => &digest::SHA512,
    }
}

impl CryptoProvider for DigestProvider {
    fn name(&self) -> &str {
        "SHA"
    }

    fn supports(&self, algorithm: &str) -> bool {
        algorithm.parse::<DigestAlgorithm>().is_ok()
    }

    fn capabilities(&self, _algorithm: &str) -> Capabilities {
        Capabilities::DIGEST
    }

    fn allowed_usages(&self, _algorithm: &str, _class: KeyClass) -> KeyUsages {
        KeyUsages::empty()
    }

    fn on_digest(&self, algorithm: &str, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let algorithm: DigestAlgorithm = algorithm.parse()?;
        Ok(digest::digest(digest_algorithm(algorithm), data)
            .as_ref()
            .to_vec())
    }
}
