//! Secure token engine of sigil.
//!
//! Signed (JWS) and encrypted (JWE) tokens in compact, flattened and general
//! JSON serialization, backed by pluggable algorithm providers:
//!
//! - [`provider`]: capability gated [`CryptoProvider`]s per algorithm family
//!   and the [`CryptoFactory`] registry which selects them per category;
//! - [`keystore`]: the [`KeyStore`] boundary mapping key references to key material;
//! - [`extension`]: the [`CryptoExtension`] which signs, unwraps and derives
//!   by key reference, so private key material never leaves the key store boundary;
//! - [`jose`]: the token codec;
//! - [`pairwise`]: deterministic per-peer key pairs derived from a stored seed.
//!
//! ```
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), sigil_crypto::CryptoError> {
//! use sigil_crypto::{
//!     extension::CryptoExtension,
//!     jose::{JWS, SignOptions},
//!     keystore::MemoryKeyStore,
//!     provider::AlgorithmParams,
//! };
//!
//! let extension = CryptoExtension::with_default_factory(MemoryKeyStore::new());
//! let public = extension
//!     .generate_key_pair("ES256K", &AlgorithmParams::None, "signing")
//!     .await?;
//!
//! let token = JWS::sign(&extension, "signing", b"hello".to_vec(), &SignOptions::new())
//!     .await?
//!     .serialize()?;
//!
//! let jws = JWS::parse(&token)?;
//! assert!(jws.verify(&extension, &[public])?);
//! # Ok(())
//! # }
//! ```
//!
//! [`CryptoProvider`]: provider::CryptoProvider
//! [`CryptoFactory`]: provider::CryptoFactory
//! [`KeyStore`]: keystore::KeyStore
//! [`CryptoExtension`]: extension::CryptoExtension

#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(not(test), warn(clippy::print_stdout, clippy::dbg_macro))]

mod error;
pub use error::CryptoError;

pub mod extension;
pub mod jose;
pub mod keystore;
pub mod pairwise;
pub mod provider;

pub mod dep {
    //! Dependencies for sigil crypto modules.
    //!
    //! Exported for your convenience

    pub mod aws_lc_rs {
        //! Re-export of the [`aws-lc-rs`] crate.
        //!
        //! [`aws-lc-rs`]: https://docs.rs/aws-lc-rs

        #[doc(inline)]
        pub use aws_lc_rs::*;
    }

    pub mod rsa {
        //! Re-export of the [`rsa`] crate.
        //!
        //! [`rsa`]: https://docs.rs/rsa

        #[doc(inline)]
        pub use rsa::*;
    }

    pub mod p256 {
        //! Re-export of the [`p256`] crate.
        //!
        //! [`p256`]: https://docs.rs/p256

        #[doc(inline)]
        pub use p256::*;
    }

    pub mod k256 {
        //! Re-export of the [`k256`] crate.
        //!
        //! [`k256`]: https://docs.rs/k256

        #[doc(inline)]
        pub use k256::*;
    }
}

