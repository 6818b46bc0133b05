//! utilities crate for sigil
//!
//! `sigil-utils` contains the small macro toolbox shared by the sigil crates:
//! builder method generation and case-insensitive string matching.

#![cfg_attr(docsrs, feature(doc_cfg))]

#[doc(hidden)]
#[macro_use]
pub mod macros;
