//! Core data model: upstream mail records, addresses, and distribution tokens.

pub mod address;
pub mod mail;
pub mod token;
