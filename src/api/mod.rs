//! Public API for opgraph.
//!
//! This module contains all user-facing types and functions.
//! Most users should only interact with the re-exports at the crate root.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod owner;
pub mod scope;
pub mod stats;
