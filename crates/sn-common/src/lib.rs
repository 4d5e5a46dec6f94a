//! Common types for the Sindarin compiler.
//!
//! This crate provides the diagnostic types used across all sn crates:
//! - Error taxonomy (`ErrorKind`)
//! - Structured diagnostics (`Diagnostic`) and accumulation (`DiagnosticSink`)

pub mod diagnostics;
pub use diagnostics::{Diagnostic, DiagnosticSink, ErrorKind};
