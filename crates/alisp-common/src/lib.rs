//! Common utilities and data structures for alisp.
//!
//! This crate provides foundational types used across the interpreter:
//! - `Span`: Source code location tracking
//! - `LineIndex`: Byte offset to line/column translation
//! - `Registry`: Opaque handle registry for external resources

mod span;
mod registry;

pub use span::{BytePos, LineIndex, Location, Span};
pub use registry::{Handle, Registry, RegistryError, INLINE_SLOTS};
