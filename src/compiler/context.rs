//! Per-function lowering state.
//!
//! A `CodegenContext` is created for each function body and threaded through
//! every lowering call. It owns the local scope, the most recently produced
//! value, the identifier being resolved, and the signature being emitted.

use std::collections::HashMap;

use inkwell::values::{BasicValueEnum, FunctionValue, PointerValue};
use inkwell::types::BasicTypeEnum;

use crate::ast::types::Type;

/// A typed storage slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slot<'ctx> {
    pub ptr: PointerValue<'ctx>,
    /// Type of the value held in the slot.
    pub ty: BasicTypeEnum<'ctx>,
    pub is_unsigned: bool,
}

/// The result of lowering one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lowered<'ctx> {
    Value {
        value: BasicValueEnum<'ctx>,
        is_unsigned: bool,
    },
    Address(Slot<'ctx>),
    Unit,
    /// Error sentinel returned after a diagnostic was reported.
    Poison,
}

impl<'ctx> Lowered<'ctx> {
    pub fn value(&self) -> Option<BasicValueEnum<'ctx>> {
        match self {
            Lowered::Value { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn slot(&self) -> Option<Slot<'ctx>> {
        match self {
            Lowered::Address(slot) => Some(*slot),
            _ => None,
        }
    }

    pub fn is_unsigned(&self) -> bool {
        match self {
            Lowered::Value { is_unsigned, .. } => *is_unsigned,
            Lowered::Address(slot) => slot.is_unsigned,
            Lowered::Unit | Lowered::Poison => true,
        }
    }

    pub fn is_poison(&self) -> bool {
        matches!(self, Lowered::Poison)
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Lowered::Unit)
    }

    /// Number of usable values this result stands for.
    pub fn result_count(&self) -> usize {
        match self {
            Lowered::Value { .. } | Lowered::Address(_) => 1,
            Lowered::Unit | Lowered::Poison => 0,
        }
    }
}

pub struct CodegenContext<'ctx> {
    pub function: FunctionValue<'ctx>,
    pub function_name: String,
    /// Return type of the signature being emitted; `None` for unit.
    pub return_type: Option<Type>,
    scope: HashMap<String, Slot<'ctx>>,
    last_value: Option<Lowered<'ctx>>,
    current_identifier: Option<String>,
    terminated: bool,
}

impl<'ctx> CodegenContext<'ctx> {
    pub fn new(function: FunctionValue<'ctx>, function_name: &str, return_type: Option<Type>) -> Self {
        CodegenContext {
            function,
            function_name: function_name.to_string(),
            return_type,
            scope: HashMap::new(),
            last_value: None,
            current_identifier: None,
            terminated: false,
        }
    }

    /// Binds `name` to `slot`, returning the binding it replaces.
    pub fn bind(&mut self, name: &str, slot: Slot<'ctx>) -> Option<Slot<'ctx>> {
        self.scope.insert(name.to_string(), slot)
    }

    pub fn lookup(&self, name: &str) -> Option<Slot<'ctx>> {
        self.scope.get(name).copied()
    }

    /// The value produced by the most recent lowering call.
    pub fn last_value(&self) -> Option<Lowered<'ctx>> {
        self.last_value
    }

    pub(crate) fn set_last_value(&mut self, value: Lowered<'ctx>) {
        self.last_value = Some(value);
    }

    pub fn current_identifier(&self) -> Option<&str> {
        self.current_identifier.as_deref()
    }

    pub(crate) fn set_current_identifier(&mut self, name: &str) {
        self.current_identifier = Some(name.to_string());
    }

    /// Whether the current code path already ended in a return.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub(crate) fn terminate(&mut self) {
        self.terminated = true;
    }
}
