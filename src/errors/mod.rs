//! Error types and error handling for the lowering core.
//!
//! This module defines the error kinds raised while lowering a tree and the
//! reporter that collects them. It includes:
//!
//! - Error structures carrying the function being lowered
//! - Specific error variants for each local failure and the fatal backend failure
//! - Error formatting and tips
//! - The `Diagnostics` reporter returning the error sentinel

pub mod errors;
