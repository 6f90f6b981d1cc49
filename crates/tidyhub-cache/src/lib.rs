//! # tidyhub-cache
//!
//! Cache provider implementation for TidyHub chat, backed by
//! [moka](https://crates.io/crates/moka) with per-entry TTL, plus the
//! centralised key builders every cached value goes through.

pub mod keys;
pub mod memory;
pub mod provider;

pub use provider::CacheManager;
