//! Sandboxed interpreter for synthesized transform routines.
//!
//! Synthesized code is a small Python-style, indentation-based language
//! defining a single `def transform(x):` routine. It is executed by an
//! in-crate tree-walking interpreter, never by a host `eval`:
//!
//! - no filesystem, network, or process access exists by construction;
//!   the only ambient capability is a `datetime` parse/format bridge
//! - a fixed evaluation-step budget bounds runaway routines
//! - parse errors carry line numbers so the synthesizer can report the
//!   offending text
//!
//! Pipeline: [`tokenize`] → [`parse`] → [`run_transform`].

pub mod ast;
pub mod eval;
pub mod lexer;
pub mod parse;
pub mod value;

pub use ast::Function;
pub use eval::{run_transform, Sandbox};
pub use lexer::tokenize;
pub use parse::parse;
pub use value::Value;
