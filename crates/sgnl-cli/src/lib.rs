//! `sgnl` crate (library surface).
//!
//! The primary entrypoint is the `sgnl` binary. This module re-exports the
//! core types and the local pipeline for embedding.

pub use sgnl_core as core;
pub use sgnl_local as local;
