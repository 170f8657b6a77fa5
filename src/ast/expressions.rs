use lazy_static::lazy_static;
use regex::Regex;

use crate::errors::errors::{Error, ErrorImpl};

use super::{ast::Expression, types::Type};

lazy_static! {
    static ref INTEGER_LITERAL: Regex = Regex::new(r"^-?[0-9]+$").unwrap();
    static ref FLOAT_LITERAL: Regex =
        Regex::new(r"^-?([0-9]+\.[0-9]*|\.[0-9]+)f?$").unwrap();
}

// LITERALS

/// Parsed payload of a numeric literal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumberValue {
    Float(f32),
    Double(f64),
    Int(i128),
    UInt(u128),
}

/// Number Expression
/// A numeric literal, parsed once when the node is built.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberExpr {
    pub value: NumberValue,
    pub bit: u32,
    pub value_as_string: String,
}

impl NumberExpr {
    pub const DEFAULT_BIT_WIDTH: u32 = 32;

    /// Parses `text` into a literal of the default 32-bit width.
    ///
    /// A decimal point selects the floating-point branch (a trailing `f`
    /// means single precision). Otherwise `is_unsigned` picks the signed or
    /// unsigned integer parse.
    pub fn parse(text: &str, is_unsigned: bool) -> Result<NumberExpr, Error> {
        NumberExpr::parse_with_width(text, is_unsigned, NumberExpr::DEFAULT_BIT_WIDTH)
    }

    pub fn parse_with_width(text: &str, is_unsigned: bool, bit: u32) -> Result<NumberExpr, Error> {
        let invalid = || {
            Error::new(
                ErrorImpl::LiteralParseError {
                    literal: text.to_string(),
                },
                None,
            )
        };

        let value = if text.contains('.') {
            if !FLOAT_LITERAL.is_match(text) {
                return Err(invalid());
            }

            if let Some(digits) = text.strip_suffix('f') {
                NumberValue::Float(digits.parse::<f32>().map_err(|_| invalid())?)
            } else {
                NumberValue::Double(text.parse::<f64>().map_err(|_| invalid())?)
            }
        } else {
            if !INTEGER_LITERAL.is_match(text) || !matches!(bit, 1 | 8 | 16 | 32 | 64 | 128) {
                return Err(invalid());
            }

            if is_unsigned {
                let value = text.parse::<u128>().map_err(|_| invalid())?;
                if bit < 128 && value >> bit != 0 {
                    return Err(invalid());
                }
                NumberValue::UInt(value)
            } else {
                let value = text.parse::<i128>().map_err(|_| invalid())?;
                if !fits_signed(value, bit) {
                    return Err(invalid());
                }
                NumberValue::Int(value)
            }
        };

        Ok(NumberExpr {
            value,
            bit,
            value_as_string: text.to_string(),
        })
    }

    pub fn is_float(&self) -> bool {
        matches!(self.value, NumberValue::Float(_) | NumberValue::Double(_))
    }
}

fn fits_signed(value: i128, bit: u32) -> bool {
    match bit {
        128 => true,
        // i1 holds 0 and 1 so booleans can be written as `0` / `1`
        1 => value == 0 || value == 1,
        _ => {
            let max = (1i128 << (bit - 1)) - 1;
            let min = -(1i128 << (bit - 1));
            (min..=max).contains(&value)
        }
    }
}

// REFERENCES AND MEMORY

/// Variable Expression
/// A reference to a named storage slot of the enclosing function.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableExpr {
    pub name: String,
    pub ty: Type,
}

/// Alloca Expression
/// Reserves a fresh, uninitialized slot and binds it to `name`.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocaExpr {
    pub ty: Type,
    pub name: String,
    /// The produced address is never loaded, even under scalar coercion.
    pub no_load: bool,
}

/// Load Expression
#[derive(Debug, Clone, PartialEq)]
pub struct LoadExpr {
    /// Label for the produced value; carries no meaning.
    pub name: String,
    pub ty: Type,
    pub target: Box<Expression>,
}

/// Store Expression
#[derive(Debug, Clone, PartialEq)]
pub struct StoreExpr {
    pub target: Box<Expression>,
    pub value: Box<Expression>,
}

/// Operands of Add and Sub.
#[derive(Debug, Clone, PartialEq)]
pub struct ArithmeticExpr {
    pub target: Box<Expression>,
    pub value: Box<Expression>,
}

/// Link Expression
/// Stores `value` into `target` and retypes the target's binding to the
/// value's type for the rest of the function body.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkExpr {
    pub target: Box<Expression>,
    pub value: Box<Expression>,
}

// CALLS

/// Call Expression
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub callee: String,
    pub args: Vec<Expression>,
}
