//! Error types and utilities for sigil.
//!
//! The [`BoxError`] type is a type-erased error type that can be used to represent any error that
//! implements the `std::error::Error` trait. It is used where it is not that important
//! what specific error type is returned, but rather that an error occurred.
//!
//! [`OpaqueError`] is the concrete form of such an error, carrying the chain of context
//! that was added while it travelled up the call stack. Use [`ErrorContext`] on `Result` and
//! `Option` values to add that context, and [`ErrorExt`] to reach the root cause.
//!
//! # Reason chains
//!
//! Context is rendered outermost first, which makes for readable single line reasons:
//!
//! ```
//! use sigil_error::{ErrorContext, ErrorExt};
//!
//! let err = "x".parse::<u8>()
//!     .context("parse counter")
//!     .context("decode token")
//!     .unwrap_err();
//!
//! assert_eq!(err.to_string(), "decode token: parse counter: invalid digit found in string");
//! assert!(err.root_cause().is::<std::num::ParseIntError>());
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

/// Alias for a type-erased error type.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

mod ext;
pub use ext::{ErrorContext, ErrorExt, OpaqueError};
