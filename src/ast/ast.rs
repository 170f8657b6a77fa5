use crate::errors::errors::Error;

use super::{
    expressions::{
        AllocaExpr, ArithmeticExpr, CallExpr, LinkExpr, LoadExpr, NumberExpr, StoreExpr,
        VariableExpr,
    },
    types::Type,
};

/// Expression Kinds
///
/// The closed set of node kinds. Lowering matches on it exhaustively, so a
/// new kind cannot be added without handling it.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Number(NumberExpr),
    Variable(VariableExpr),
    Call(CallExpr),
    Alloca(AllocaExpr),
    Load(LoadExpr),
    Store(StoreExpr),
    Add(ArithmeticExpr),
    Sub(ArithmeticExpr),
    Link(LinkExpr),
    VerifyOne(Box<Expression>),
    Nothing,
    Return(Box<Expression>),
}

/// A node of the tree plus the flags consulted while lowering it.
///
/// The structure is fixed once the parser built it; only the flags may be
/// toggled before lowering.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub kind: ExprKind,
    /// The consumer wants the storage address, not the stored value.
    pub wants_pointer: bool,
    /// The result must be consumed as a scalar.
    pub force_load: bool,
    pub is_unsigned: bool,
}

impl Expression {
    pub fn new(kind: ExprKind) -> Self {
        Expression {
            kind,
            wants_pointer: false,
            force_load: false,
            is_unsigned: true,
        }
    }

    fn with_sign(mut self, is_unsigned: bool) -> Self {
        self.is_unsigned = is_unsigned;
        self
    }

    /// Number literal of the default width.
    pub fn number(text: &str, is_unsigned: bool) -> Result<Self, Error> {
        let number = NumberExpr::parse(text, is_unsigned)?;
        Ok(Expression::new(ExprKind::Number(number)).with_sign(is_unsigned))
    }

    pub fn number_with_width(text: &str, is_unsigned: bool, bit: u32) -> Result<Self, Error> {
        let number = NumberExpr::parse_with_width(text, is_unsigned, bit)?;
        Ok(Expression::new(ExprKind::Number(number)).with_sign(is_unsigned))
    }

    pub fn variable(ty: Type, name: &str) -> Self {
        Expression::new(ExprKind::Variable(VariableExpr {
            name: name.to_string(),
            ty,
        }))
        .with_sign(ty.is_unsigned)
    }

    pub fn call(callee: &str, args: Vec<Expression>) -> Self {
        Expression::new(ExprKind::Call(CallExpr {
            callee: callee.to_string(),
            args,
        }))
    }

    pub fn alloca(ty: Type, name: &str) -> Self {
        Expression::new(ExprKind::Alloca(AllocaExpr {
            ty,
            name: name.to_string(),
            no_load: false,
        }))
        .with_sign(ty.is_unsigned)
    }

    /// An alloca whose address is never coerced into a load.
    pub fn alloca_no_load(ty: Type, name: &str) -> Self {
        Expression::new(ExprKind::Alloca(AllocaExpr {
            ty,
            name: name.to_string(),
            no_load: true,
        }))
        .with_sign(ty.is_unsigned)
    }

    pub fn load(name: &str, ty: Type, target: Expression) -> Self {
        Expression::new(ExprKind::Load(LoadExpr {
            name: name.to_string(),
            ty,
            target: Box::new(target),
        }))
        .with_sign(ty.is_unsigned)
    }

    pub fn store(target: Expression, value: Expression) -> Self {
        let is_unsigned = value.is_unsigned;
        Expression::new(ExprKind::Store(StoreExpr {
            target: Box::new(target),
            value: Box::new(value),
        }))
        .with_sign(is_unsigned)
    }

    /// Addition; signedness follows `target` when the operands disagree.
    pub fn add(target: Expression, value: Expression) -> Self {
        let is_unsigned = target.is_unsigned;
        Expression::new(ExprKind::Add(ArithmeticExpr {
            target: Box::new(target),
            value: Box::new(value),
        }))
        .with_sign(is_unsigned)
    }

    /// Subtraction; signedness follows `target` when the operands disagree.
    pub fn sub(target: Expression, value: Expression) -> Self {
        let is_unsigned = target.is_unsigned;
        Expression::new(ExprKind::Sub(ArithmeticExpr {
            target: Box::new(target),
            value: Box::new(value),
        }))
        .with_sign(is_unsigned)
    }

    pub fn link(target: Expression, value: Expression) -> Self {
        let is_unsigned = value.is_unsigned;
        Expression::new(ExprKind::Link(LinkExpr {
            target: Box::new(target),
            value: Box::new(value),
        }))
        .with_sign(is_unsigned)
    }

    pub fn verify_one(target: Expression) -> Self {
        let is_unsigned = target.is_unsigned;
        Expression::new(ExprKind::VerifyOne(Box::new(target))).with_sign(is_unsigned)
    }

    pub fn nothing() -> Self {
        Expression::new(ExprKind::Nothing)
    }

    pub fn ret(expression: Expression) -> Self {
        Expression::new(ExprKind::Return(Box::new(expression)))
    }

    /// Requests the storage address instead of the loaded value.
    pub fn get_pointer(mut self) -> Self {
        self.wants_pointer = true;
        self
    }

    /// Requests scalar coercion of the result.
    pub fn only_load(mut self) -> Self {
        self.force_load = true;
        self
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            ExprKind::Number(_) => "Number",
            ExprKind::Variable(_) => "Variable",
            ExprKind::Call(_) => "Call",
            ExprKind::Alloca(_) => "Alloca",
            ExprKind::Load(_) => "Load",
            ExprKind::Store(_) => "Store",
            ExprKind::Add(_) => "Add",
            ExprKind::Sub(_) => "Sub",
            ExprKind::Link(_) => "Link",
            ExprKind::VerifyOne(_) => "VerifyOne",
            ExprKind::Nothing => "Nothing",
            ExprKind::Return(_) => "Return",
        }
    }

    /// Name of the local binding this node refers to, if it refers to one.
    pub fn binding_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Variable(variable) => Some(&variable.name),
            ExprKind::Alloca(alloca) => Some(&alloca.name),
            _ => None,
        }
    }
}
