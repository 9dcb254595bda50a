//! Dynamic DNS updater for Cloudflare.
//!
//! Resolves the public IPv4 address through an IP-echo service and keeps
//! every A record of a zone pointed at it.

pub mod config;
pub mod daemon;
pub mod dns;
pub mod error;
pub mod ip;

pub use error::{Error, Result};
