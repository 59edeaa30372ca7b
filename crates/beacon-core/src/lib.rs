//! Core types and trait definitions for the Beacon tracing backend.
//!
//! This crate has no HTTP, cryptography or database dependencies. The
//! volatile [`memory::MemoryStore`] lives here alongside the trait it
//! implements.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod forward;
pub mod memory;
pub mod record;
pub mod store;

pub use error::{Error, Result};
