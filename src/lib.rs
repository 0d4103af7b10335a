//! Brute-force preimage search over Jenkins `hashlittle2` string
//! digests (see `SPEC_FULL.md` for the full design).
//!
//! The crate is split leaf-to-root the way the spec's dependency order
//! lays it out: `hash` and `hash_string` at the bottom, `alphabet` and
//! `pattern` building on them, `enumerator` and `target_index`
//! independent of either, then the two search engines (`cpu_pool`,
//! `gpu`) that tie everything together. `error`, `progress`, and
//! `sink` are the ambient seams the binary front-end (`main.rs`) hooks
//! into.

pub mod alphabet;
pub mod cpu_pool;
pub mod enumerator;
pub mod error;
pub mod gpu;
pub mod hash;
pub mod hash_string;
pub mod pattern;
pub mod progress;
pub mod sink;
pub mod target_index;

pub use error::{FinderError, Result};
