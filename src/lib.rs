//! `xform-infer` library crate.
//!
//! The binary (`xform`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - modules are reusable (e.g., future service/daemon embedding)
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod classify;
pub mod cli;
pub mod domain;
pub mod error;
pub mod fit;
pub mod infer;
pub mod io;
pub mod llm;
pub mod math;
pub mod report;
pub mod script;
pub mod synth;
