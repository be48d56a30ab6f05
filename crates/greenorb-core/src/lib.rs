//! Core types and trait definitions for the GreenOrb ESG pipeline.
//!
//! This crate is deliberately free of HTTP, database and LLM dependencies.
//! Every other crate depends on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod accumulator;
pub mod activity;
pub mod error;
pub mod event;
pub mod projection;
pub mod record;
pub mod stage;
pub mod store;

pub use error::{Error, Result};
