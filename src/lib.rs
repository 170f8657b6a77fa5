#![allow(clippy::module_inception)]

//! Expression and type lowering core.
//!
//! Takes an already-built node tree (function prototypes and bodies of
//! fixed-width integer expressions) and emits it into an LLVM module.
//!
//! ```ignore
//! let context = Context::create();
//! let compiler = compile(&context, CompileOptions::default(), &functions)?;
//! for error in compiler.diagnostics.errors() {
//!     eprintln!("{}: {}", error.get_error_name(), error.get_tip());
//! }
//! ```

pub mod ast;
pub mod compiler;
pub mod errors;

pub use compiler::compiler::{compile, CompileOptions, Compiler};
