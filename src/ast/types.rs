//! Type system definitions for the AST.
//!
//! The language only knows fixed-width integers. Each type is a bit width
//! plus a signedness flag; lowering it to a backend type handle is a pure
//! function of those two fields.
//!
//! Floating-point literals are typed directly by the literal node and never
//! pass through this module.

use std::fmt::Display;

use inkwell::{context::Context, types::IntType};

/// The six supported integer widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    I1,
    I8,
    I16,
    I32,
    I64,
    I128,
}

impl IntWidth {
    pub const ALL: [IntWidth; 6] = [
        IntWidth::I1,
        IntWidth::I8,
        IntWidth::I16,
        IntWidth::I32,
        IntWidth::I64,
        IntWidth::I128,
    ];

    pub fn bits(self) -> u32 {
        match self {
            IntWidth::I1 => 1,
            IntWidth::I8 => 8,
            IntWidth::I16 => 16,
            IntWidth::I32 => 32,
            IntWidth::I64 => 64,
            IntWidth::I128 => 128,
        }
    }

    pub fn from_bits(bits: u32) -> Option<IntWidth> {
        match bits {
            1 => Some(IntWidth::I1),
            8 => Some(IntWidth::I8),
            16 => Some(IntWidth::I16),
            32 => Some(IntWidth::I32),
            64 => Some(IntWidth::I64),
            128 => Some(IntWidth::I128),
            _ => None,
        }
    }
}

/// An integer type: width and signedness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Type {
    pub width: IntWidth,
    pub is_unsigned: bool,
}

impl Type {
    pub fn new(width: IntWidth, is_unsigned: bool) -> Self {
        Type { width, is_unsigned }
    }

    pub fn bool() -> Self {
        Type::new(IntWidth::I1, true)
    }

    pub fn i8() -> Self {
        Type::new(IntWidth::I8, false)
    }

    pub fn i16() -> Self {
        Type::new(IntWidth::I16, false)
    }

    pub fn i32() -> Self {
        Type::new(IntWidth::I32, false)
    }

    pub fn i64() -> Self {
        Type::new(IntWidth::I64, false)
    }

    pub fn i128() -> Self {
        Type::new(IntWidth::I128, false)
    }

    /// Returns the same width with the unsigned flag set.
    pub fn unsigned(self) -> Self {
        Type::new(self.width, true)
    }

    pub fn bits(&self) -> u32 {
        self.width.bits()
    }

    /// Lowers the type to the backend's integer type.
    ///
    /// LLVM integer types are uniqued per context, so two lowerings of the
    /// same width always compare equal. Signedness does not exist at the
    /// backend level; it only selects opcodes during lowering.
    pub fn lower<'ctx>(&self, context: &'ctx Context) -> IntType<'ctx> {
        match self.width {
            IntWidth::I1 => context.bool_type(),
            IntWidth::I8 => context.i8_type(),
            IntWidth::I16 => context.i16_type(),
            IntWidth::I32 => context.i32_type(),
            IntWidth::I64 => context.i64_type(),
            IntWidth::I128 => context.i128_type(),
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.width == IntWidth::I1 {
            return write!(f, "bool");
        }

        let prefix = if self.is_unsigned { 'u' } else { 'i' };
        write!(f, "{}{}", prefix, self.bits())
    }
}
