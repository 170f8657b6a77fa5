use std::fmt::Display;

use thiserror::Error;
use tracing::error;

use crate::compiler::context::Lowered;

#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    internal_error: ErrorImpl,
    function: Option<String>,
}

impl Error {
    pub fn new(error_impl: ErrorImpl, function: Option<String>) -> Self {
        Error {
            internal_error: error_impl,
            function,
        }
    }

    pub fn get_error(&self) -> &ErrorImpl {
        &self.internal_error
    }

    /// Name of the function whose lowering produced the error, if any.
    pub fn get_function(&self) -> Option<&str> {
        self.function.as_deref()
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self.internal_error, ErrorImpl::BackendError { .. })
    }

    pub fn get_error_name(&self) -> &str {
        match &self.internal_error {
            ErrorImpl::LiteralParseError { .. } => "LiteralParseError",
            ErrorImpl::UndefinedSymbol { .. } => "UndefinedSymbol",
            ErrorImpl::ArityMismatch { .. } => "ArityMismatch",
            ErrorImpl::MultiplicityViolation { .. } => "MultiplicityViolation",
            ErrorImpl::TypeMismatch { .. } => "TypeMismatch",
            ErrorImpl::UnreachableCode { .. } => "UnreachableCode",
            ErrorImpl::FunctionAlreadyDeclared { .. } => "FunctionAlreadyDeclared",
            ErrorImpl::BackendError { .. } => "BackendError",
        }
    }

    pub fn get_tip(&self) -> ErrorTip {
        match &self.internal_error {
            ErrorImpl::LiteralParseError { literal } => ErrorTip::Suggestion(format!(
                "Invalid number: `{}`, is it above the integer limit?",
                literal
            )),
            ErrorImpl::UndefinedSymbol { symbol } => {
                ErrorTip::Suggestion(format!("`{}` is not declared in this scope", symbol))
            }
            ErrorImpl::ArityMismatch {
                expected, received, ..
            } => ErrorTip::Suggestion(format!(
                "Expected {} arguments, received {}",
                expected, received
            )),
            ErrorImpl::MultiplicityViolation { expected, received } => ErrorTip::Suggestion(
                format!("Expected {} value(s), received {}", expected, received),
            ),
            ErrorImpl::TypeMismatch { expected, received } => ErrorTip::Suggestion(format!(
                "Expected type `{}`, received `{}`",
                expected, received
            )),
            ErrorImpl::UnreachableCode { .. } => {
                ErrorTip::Suggestion(String::from("Remove the code following the return"))
            }
            ErrorImpl::FunctionAlreadyDeclared { function } => {
                ErrorTip::Suggestion(format!("Function `{}` already has a body", function))
            }
            ErrorImpl::BackendError { .. } => ErrorTip::None,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.function {
            Some(function) => write!(f, "in `{}`: {}", function, self.internal_error),
            None => write!(f, "{}", self.internal_error),
        }
    }
}

impl std::error::Error for Error {}

impl From<inkwell::builder::BuilderError> for Error {
    fn from(error: inkwell::builder::BuilderError) -> Self {
        Error::new(
            ErrorImpl::BackendError {
                message: error.to_string(),
            },
            None,
        )
    }
}

pub enum ErrorTip {
    None,
    Suggestion(String),
}

impl Display for ErrorTip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorTip::None => write!(f, ""),
            ErrorTip::Suggestion(suggestion) => write!(f, "{}", suggestion),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErrorImpl {
    #[error("error parsing number: {literal:?}")]
    LiteralParseError { literal: String },
    #[error("undefined symbol {symbol:?}")]
    UndefinedSymbol { symbol: String },
    #[error("wrong number of arguments to {callee:?}: expected {expected}, received {received}")]
    ArityMismatch {
        callee: String,
        expected: usize,
        received: usize,
    },
    #[error("expected exactly {expected} result(s), received {received}")]
    MultiplicityViolation { expected: usize, received: usize },
    #[error("types do not match: expected {expected:?}, received {received:?}")]
    TypeMismatch { expected: String, received: String },
    #[error("unreachable code after return in {function:?}")]
    UnreachableCode { function: String },
    #[error("function {function:?} already declared")]
    FunctionAlreadyDeclared { function: String },
    #[error("backend error: {message}")]
    BackendError { message: String },
}

/// Collects the local failures reported during lowering.
///
/// Reporting never aborts: the caller receives the error sentinel and keeps
/// walking the tree so that later problems are reported in the same pass.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<Error>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    pub fn report<'ctx>(&mut self, error: Error) -> Lowered<'ctx> {
        error!(kind = error.get_error_name(), "{}", error);
        self.errors.push(error);
        Lowered::Poison
    }

    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of reported errors of the given kind name.
    pub fn count(&self, name: &str) -> usize {
        self.errors
            .iter()
            .filter(|error| error.get_error_name() == name)
            .count()
    }
}
