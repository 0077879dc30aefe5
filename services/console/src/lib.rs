//! Parley Console Library Crate
//!
//! Configuration, prompt loading, demo tools and the line-driven session
//! loop used by the `console` binary. The binary is a thin wrapper around
//! this library.

pub mod config;
pub mod prompts;
pub mod session;
pub mod tools;
