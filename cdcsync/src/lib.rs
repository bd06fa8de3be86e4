//! Library module for the cdcsync binary.
//!
//! Argument parsing and command logic live here so they can be tested
//! without spawning the binary. `main.rs` only wires them together.

pub mod cli;
pub mod commands;
pub mod credentials;
pub mod output;
