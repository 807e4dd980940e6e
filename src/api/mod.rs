//! Public API for allochook.
//!
//! This module contains all user-facing types for building and driving a
//! hook chain. Most users only need the re-exports at the crate root.

pub mod chain;
pub mod config;
pub mod global;
pub mod interceptor;
pub mod request;
pub mod sink;
pub mod stats;
pub mod translate;
