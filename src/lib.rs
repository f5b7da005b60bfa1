//! `mailshare`: share read-only access to a mailbox through revocable
//! distribution tokens.
//!
//! This crate provides the MIME extraction engine that turns raw RFC 5322
//! messages into displayable text, the token store that grants viewers
//! access, and the request builder for the upstream mailbox API.

pub mod config;
pub mod error;
pub mod i18n;
pub mod model;
pub mod parser;
pub mod proxy;
pub mod render;
pub mod store;

pub use error::{MailShareError, Result};
pub use parser::header::decode_encoded_words as decode_header_value;
pub use parser::mime::extract_part;
