//! Email decoding: header handling, content types, transfer and charset
//! decoding, and MIME part extraction.

pub mod charset;
pub mod content_type;
pub mod eml;
pub mod header;
pub mod mime;
pub mod transfer;
