//! Core domain + application logic for the Telegram PM relay bot.
//!
//! This crate is intentionally framework-agnostic. Telegram and Redis live
//! behind ports (traits) implemented in adapter crates.

pub mod callback;
pub mod challenge;
pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod kv;
pub mod logging;
pub mod messaging;
pub mod moderation;
pub mod records;
pub mod relay;
pub mod verification;

pub use errors::{Error, Result};

#[cfg(test)]
pub(crate) mod test_support;
