//! `wikise` crate (library surface).
//!
//! The primary entrypoint for end users is the `wikise` binary (CLI + MCP stdio).
//! This library module exists to support embedding: build a [`core::Resolver`] over a
//! [`local::MediaWikiSource`] (or your own [`core::ContentSource`]) and call it directly.

pub use wikise_core as core;
pub use wikise_local as local;
