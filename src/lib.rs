//! Kiln - Content-addressable build artifact cache
//!
//! Caches build outputs keyed by a fingerprint of source contents, build
//! options, dependencies, and toolchain identity, so identical builds
//! are served from disk instead of rebuilt.

pub mod cache;
pub mod ccache;
pub mod cli;
pub mod config;
pub mod error;
pub mod optimizer;
pub mod ui;

pub use error::{KilnError, KilnResult};
