//! # Tracklight Core
//!
//! Shared, I/O-free logic for Tracklight: character usage models, the
//! per-tool highlighting level lookup, span merging, colour selection,
//! HTML rendering, and the extraction store trait.
//!
//! This crate contains no tokio, sqlx, XML or filesystem dependencies.
//! File loading, tokenizing and XML offset tracking live in the
//! `tracklight` crate, which builds on these types.

pub mod color;
pub mod level;
pub mod merge;
pub mod models;
pub mod render;
pub mod store;
