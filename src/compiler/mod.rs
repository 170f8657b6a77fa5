//! Code generation module.
//!
//! This module lowers the node tree into LLVM IR. It handles:
//!
//! - Lowering of expression nodes (literals, memory, arithmetic, calls, returns)
//! - Prototype declaration and function body emission
//! - The per-function codegen context threaded through every lowering call
//! - The signature registry used to resolve calls

pub mod compiler;
pub mod context;
pub mod expr;
pub mod function;
pub mod registry;
