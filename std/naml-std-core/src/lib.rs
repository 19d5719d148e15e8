//!
//! naml-std-core - Core Runtime Types
//!
//! This crate provides the managed types that native bindings read from and
//! hand back to naml programs:
//!
//! - `HeapHeader` and `HeapTag` for reference-counted heap objects
//! - `NamlString` for heap-allocated strings
//! - `NamlBytes` for heap-allocated byte buffers
//! - Exception handling primitives for try/catch support
//!
//! All heap objects use atomic reference counting for thread safety.
//! A null pointer is a valid "absent" value for both strings and bytes and is
//! distinct from an allocated object of length zero.
//!

pub mod value;
pub mod bytes;
pub mod exception;

pub use value::*;
pub use bytes::*;
pub use exception::*;
