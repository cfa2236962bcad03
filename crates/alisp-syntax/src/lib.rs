//! Expression tree definitions for alisp.
//!
//! This crate defines the tree produced by the parser and consumed by the
//! evaluator's reader.

mod sexp;

pub use sexp::*;
