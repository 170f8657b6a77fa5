use super::{ast::Expression, expressions::VariableExpr, types::Type};

/// Prototype
/// A function signature, resolvable before any body exists.
#[derive(Debug, Clone, PartialEq)]
pub struct Prototype {
    /// `None` for a unit-returning function.
    pub return_type: Option<Type>,
    pub name: String,
    pub args: Vec<VariableExpr>,
    /// Textual form of the signature, kept for diagnostics.
    pub type_as_string: String,
}

impl Prototype {
    pub fn new(
        return_type: Option<Type>,
        name: &str,
        args: Vec<VariableExpr>,
        type_as_string: &str,
    ) -> Self {
        Prototype {
            return_type,
            name: name.to_string(),
            args,
            type_as_string: type_as_string.to_string(),
        }
    }

    /// Builds a prototype from `(name, type)` pairs and derives the
    /// textual signature, e.g. `fn(i32, u8) -> i64`.
    pub fn with_params(return_type: Option<Type>, name: &str, params: &[(&str, Type)]) -> Self {
        let args: Vec<VariableExpr> = params
            .iter()
            .map(|(name, ty)| VariableExpr {
                name: name.to_string(),
                ty: *ty,
            })
            .collect();

        let params = args
            .iter()
            .map(|arg| arg.ty.to_string())
            .collect::<Vec<String>>()
            .join(", ");
        let type_as_string = match return_type {
            Some(ty) => format!("fn({}) -> {}", params, ty),
            None => format!("fn({})", params),
        };

        Prototype {
            return_type,
            name: name.to_string(),
            args,
            type_as_string,
        }
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }
}

/// Function
/// A prototype plus the ordered body lowered into it.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub proto: Prototype,
    pub body: Vec<Expression>,
}

impl Function {
    pub fn new(proto: Prototype, body: Vec<Expression>) -> Self {
        Function { proto, body }
    }
}
