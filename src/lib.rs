//! 🔏 sigil is a secure token engine for the 🦀 Rust language, producing and consuming
//! signed (JWS) and encrypted (JWE) tokens over pluggable algorithm providers.
//!
//! | category | support list |
//! |-|-|
//! | ✅ [signed tokens](crate::crypto::jose::JWS) | ✅ compact ⸱ ✅ flattened JSON ⸱ ✅ general JSON ⸱ ✅ multiple signers |
//! | ✅ [encrypted tokens](crate::crypto::jose::JWE) | ✅ compact ⸱ ✅ flattened JSON ⸱ ✅ general JSON ⸱ ✅ multiple recipients |
//! | ✅ [providers](crate::crypto::provider) | ✅ RSASSA ⸱ ✅ RSA-PSS ⸱ ✅ ECDSA (P-256, secp256k1) ⸱ ✅ HMAC ⸱ ✅ RSA-OAEP ⸱ ✅ AES-GCM ⸱ ✅ ECDH ⸱ ✅ SHA-2 |
//! | ✅ [key store](crate::crypto::keystore) | ✅ [in memory](crate::crypto::keystore::MemoryKeyStore) ⸱ ✅ bring your own |
//! | ✅ [pairwise keys](crate::crypto::pairwise) | ✅ P-256 ⸱ ✅ secp256k1 |
//! | ✅ utilities | ✅ [error handling](crate::error) ⸱ ✅ [tracing](crate::telemetry::tracing) |
//!
//! Private key material is only ever addressed by reference: the
//! [`CryptoExtension`](crate::crypto::extension::CryptoExtension) resolves the
//! reference in the [`KeyStore`](crate::crypto::keystore::KeyStore), imports the key
//! into the provider selected by the [`CryptoFactory`](crate::crypto::provider::CryptoFactory)
//! and hands back nothing but the result of the operation.
//!
//! ```
//! # #[tokio::main]
//! # async fn main() -> Result<(), sigil::crypto::CryptoError> {
//! use sigil::crypto::{
//!     extension::CryptoExtension,
//!     jose::{EncryptOptions, JWE, TokenFormat},
//!     keystore::MemoryKeyStore,
//!     provider::AlgorithmParams,
//! };
//!
//! let extension = CryptoExtension::with_default_factory(MemoryKeyStore::new());
//! let recipient = extension
//!     .generate_key_pair(
//!         "RSA-OAEP-256",
//!         &AlgorithmParams::RsaKeyGen { modulus_length: 2048 },
//!         "inbox",
//!     )
//!     .await?;
//!
//! let token = JWE::encrypt(
//!     &extension,
//!     &[recipient],
//!     b"for your eyes only",
//!     &EncryptOptions::new().with_format(TokenFormat::Flat),
//! )?
//! .serialize()?;
//!
//! let plaintext = JWE::parse(&token)?
//!     .decrypt(&extension, "inbox", &Default::default())
//!     .await?;
//! assert_eq!(plaintext.as_slice(), b"for your eyes only");
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(not(test), warn(clippy::print_stdout, clippy::dbg_macro))]

#[doc(inline)]
pub use ::sigil_error as error;

#[doc(inline)]
pub use ::sigil_utils as utils;

#[doc(inline)]
pub use ::sigil_crypto as crypto;

pub mod telemetry;
