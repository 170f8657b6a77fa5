/// AST (Abstract Syntax Tree) module
/// Contains the node tree handed over by the parser
///
/// Submodules:
/// - ast: The expression node and its closed set of kinds
/// - expressions: Payloads of the individual expression kinds
/// - statements: Prototypes and function definitions
/// - types: The fixed-width integer type system
pub mod ast;
pub mod expressions;
pub mod statements;
pub mod types;
