//! Deterministic pairwise keys.
//!
//! A persona presents a different key pair to every peer it talks to. The
//! pairs are derived from a long lived seed secret kept in the key store, so
//! they can be reproduced at any time without being stored:
//!
//! ```text
//! master    = HMAC-SHA512(seed, persona)
//! candidate = HMAC-SHA256(master, peer || counter)
//! ```
//!
//! where `counter` is a big-endian `u32` starting at zero, incremented until
//! the candidate is a valid private scalar of the curve.

use zeroize::Zeroizing;

use crate::{
    CryptoError,
    extension::{CryptoExtension, with_thumbprint_kid},
    jose::{JWA, JWK},
    keystore::KeyStore,
    provider::{KeyData, KeyUsages, ProviderExt},
};

const MASTER_KEY_ALGORITHM: &str = "HS512";
const CANDIDATE_ALGORITHM: &str = "HS256";
const MAX_CANDIDATES: u32 = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Private and public form of a derived key
pub struct KeyPair {
    pub private: JWK,
    pub public: JWK,
}

#[derive(Debug, Clone)]
/// Derives pairwise key pairs from a seed secret stored behind a key reference
pub struct PairwiseKeyGenerator<K> {
    extension: CryptoExtension<K>,
}

impl<K: KeyStore> PairwiseKeyGenerator<K> {
    pub fn new(extension: CryptoExtension<K>) -> Self {
        Self { extension }
    }

    pub fn extension(&self) -> &CryptoExtension<K> {
        &self.extension
    }

    /// Derive the key pair of `persona_id` for `peer_id`.
    ///
    /// Only elliptic curve algorithms (`ES256`, `ES256K`) are supported, any
    /// other algorithm fails with [`CryptoError::UnsupportedAlgorithm`].
    /// Both keys carry their thumbprint as `kid`.
    pub async fn generate(
        &self,
        seed_reference: &str,
        persona_id: &str,
        peer_id: &str,
        algorithm: &str,
    ) -> Result<KeyPair, CryptoError> {
        let jwa: JWA = algorithm.parse()?;
        if jwa.curve().is_none() {
            return Err(CryptoError::UnsupportedAlgorithm(algorithm.to_owned()));
        }

        let master = Zeroizing::new(
            self.extension
                .sign_with_key_reference(MASTER_KEY_ALGORITHM, seed_reference, persona_id.as_bytes())
                .await?,
        );
        let factory = self.extension.factory();
        let mac = factory.mac_signer(CANDIDATE_ALGORITHM)?;
        let master = mac.import_key(CANDIDATE_ALGORITHM, &KeyData::Raw(master), KeyUsages::SIGN)?;
        let signer = factory.message_signer(jwa.as_str())?;

        let mut input = Vec::with_capacity(peer_id.len() + 4);
        for counter in 0..MAX_CANDIDATES {
            input.clear();
            input.extend_from_slice(peer_id.as_bytes());
            input.extend_from_slice(&counter.to_be_bytes());
            let candidate = Zeroizing::new(mac.sign(CANDIDATE_ALGORITHM, &master, &input)?);

            match signer.import_key(jwa.as_str(), &KeyData::Raw(candidate), KeyUsages::SIGN) {
                Ok(key) => {
                    let private = with_thumbprint_kid(signer.export_key(&key)?)?;
                    let public = private.to_public()?;
                    tracing::debug!(seed_reference, algorithm = jwa.as_str(), counter, "derived pairwise key");
                    return Ok(KeyPair { private, public });
                }
                Err(CryptoError::InvalidKey(_)) => {
                    tracing::trace!(counter, "pairwise candidate is not a valid scalar");
                }
                Err(err) => return Err(err),
            }
        }
        Err(CryptoError::other(format!(
            "no valid private scalar in {MAX_CANDIDATES} pairwise candidates"
        )))
    }
}
