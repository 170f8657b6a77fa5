use inkwell::{
    types::{BasicTypeEnum, IntType},
    values::{BasicMetadataValueEnum, BasicValueEnum, IntValue},
};
use tracing::{debug, instrument};

use crate::{
    ast::{
        ast::{ExprKind, Expression},
        expressions::{
            AllocaExpr, ArithmeticExpr, CallExpr, LinkExpr, LoadExpr, NumberExpr, NumberValue,
            StoreExpr, VariableExpr,
        },
        types::{IntWidth, Type},
    },
    errors::errors::{Error, ErrorImpl},
};

use super::{
    compiler::{type_name, Compiler},
    context::{CodegenContext, Lowered, Slot},
};

#[derive(Debug, Clone, Copy, PartialEq)]
enum ArithmeticOp {
    Add,
    Sub,
}

/// Lowers `expression` honoring its own flags.
///
/// Local failures are reported and come back as `Lowered::Poison`; the
/// `Err` case is reserved for the backend failing.
pub fn gen_expression<'a>(
    compiler: &mut Compiler<'a>,
    cx: &mut CodegenContext<'a>,
    expression: &Expression,
) -> Result<Lowered<'a>, Error> {
    let mut lowered = lower(compiler, cx, expression, expression.wants_pointer)?;

    if expression.force_load {
        lowered = coerce_scalar(compiler, expression, lowered)?;
    }

    cx.set_last_value(lowered);
    Ok(lowered)
}

/// Lowers `expression` for a consumer that needs a scalar.
///
/// Addresses are loaded unless they come from a `no_load` alloca. Anything
/// that is still not a scalar is a type mismatch.
pub fn gen_scalar<'a>(
    compiler: &mut Compiler<'a>,
    cx: &mut CodegenContext<'a>,
    expression: &Expression,
) -> Result<Lowered<'a>, Error> {
    let lowered = lower(compiler, cx, expression, expression.wants_pointer)?;
    let lowered = match coerce_scalar(compiler, expression, lowered)? {
        Lowered::Address(slot) => report(
            compiler,
            cx,
            ErrorImpl::TypeMismatch {
                expected: type_name(slot.ty),
                received: String::from("address"),
            },
        ),
        Lowered::Unit => report(
            compiler,
            cx,
            ErrorImpl::TypeMismatch {
                expected: String::from("scalar"),
                received: String::from("unit"),
            },
        ),
        lowered => lowered,
    };

    cx.set_last_value(lowered);
    Ok(lowered)
}

/// Lowers `expression` for a consumer that needs a storage address.
pub fn gen_address<'a>(
    compiler: &mut Compiler<'a>,
    cx: &mut CodegenContext<'a>,
    expression: &Expression,
) -> Result<Lowered<'a>, Error> {
    let lowered = match lower(compiler, cx, expression, true)? {
        Lowered::Value { value, .. } => report(
            compiler,
            cx,
            ErrorImpl::TypeMismatch {
                expected: String::from("address"),
                received: type_name(value.get_type()),
            },
        ),
        Lowered::Unit => report(
            compiler,
            cx,
            ErrorImpl::TypeMismatch {
                expected: String::from("address"),
                received: String::from("unit"),
            },
        ),
        lowered => lowered,
    };

    cx.set_last_value(lowered);
    Ok(lowered)
}

#[instrument(level = "trace", skip_all, fields(kind = expression.kind_name()))]
fn lower<'a>(
    compiler: &mut Compiler<'a>,
    cx: &mut CodegenContext<'a>,
    expression: &Expression,
    wants_pointer: bool,
) -> Result<Lowered<'a>, Error> {
    // Nothing may be emitted past a terminator, even from inside a nested node
    if cx.is_terminated() {
        return Ok(report_unreachable(compiler, cx));
    }

    match &expression.kind {
        ExprKind::Number(number) => Ok(gen_number(compiler, number, expression.is_unsigned)),
        ExprKind::Variable(variable) => gen_variable(compiler, cx, variable, wants_pointer),
        ExprKind::Call(call) => gen_call(compiler, cx, call),
        ExprKind::Alloca(alloca) => gen_alloca(compiler, cx, alloca),
        ExprKind::Load(load) => gen_load(compiler, cx, load),
        ExprKind::Store(store) => gen_store(compiler, cx, store),
        ExprKind::Add(operands) => gen_arithmetic(
            compiler,
            cx,
            operands,
            ArithmeticOp::Add,
            expression.is_unsigned,
        ),
        ExprKind::Sub(operands) => gen_arithmetic(
            compiler,
            cx,
            operands,
            ArithmeticOp::Sub,
            expression.is_unsigned,
        ),
        ExprKind::Link(link) => gen_link(compiler, cx, link),
        ExprKind::VerifyOne(target) => gen_verify_one(compiler, cx, target),
        ExprKind::Nothing => Ok(Lowered::Unit),
        ExprKind::Return(value) => gen_return(compiler, cx, value),
    }
}

fn report<'a>(compiler: &mut Compiler<'a>, cx: &CodegenContext<'a>, error: ErrorImpl) -> Lowered<'a> {
    compiler.report(error, Some(&cx.function_name))
}

fn report_unreachable<'a>(compiler: &mut Compiler<'a>, cx: &CodegenContext<'a>) -> Lowered<'a> {
    report(
        compiler,
        cx,
        ErrorImpl::UnreachableCode {
            function: cx.function_name.clone(),
        },
    )
}

/// Loads an address unless the node forbids it.
fn coerce_scalar<'a>(
    compiler: &mut Compiler<'a>,
    expression: &Expression,
    lowered: Lowered<'a>,
) -> Result<Lowered<'a>, Error> {
    let no_load = matches!(&expression.kind, ExprKind::Alloca(alloca) if alloca.no_load);

    match lowered {
        Lowered::Address(slot) if !no_load => load_slot(compiler, slot, "", slot.is_unsigned),
        lowered => Ok(lowered),
    }
}

fn load_slot<'a>(
    compiler: &mut Compiler<'a>,
    slot: Slot<'a>,
    name: &str,
    is_unsigned: bool,
) -> Result<Lowered<'a>, Error> {
    let value = compiler.builder.build_load(slot.ptr, name)?;
    Ok(Lowered::Value { value, is_unsigned })
}

fn const_integer<'a>(ty: IntType<'a>, value: u128, sign_extend: bool) -> IntValue<'a> {
    if ty.get_bit_width() <= 64 {
        ty.const_int(value as u64, sign_extend)
    } else {
        ty.const_int_arbitrary_precision(&[value as u64, (value >> 64) as u64])
    }
}

fn gen_number<'a>(compiler: &Compiler<'a>, number: &NumberExpr, is_unsigned: bool) -> Lowered<'a> {
    let int_type = || {
        let width = IntWidth::from_bits(number.bit).unwrap_or(IntWidth::I32);
        Type::new(width, is_unsigned).lower(compiler.context)
    };

    let value: BasicValueEnum<'a> = match number.value {
        NumberValue::Float(value) => compiler
            .context
            .f32_type()
            .const_float(f64::from(value))
            .into(),
        NumberValue::Double(value) => compiler.context.f64_type().const_float(value).into(),
        NumberValue::Int(value) => const_integer(int_type(), value as u128, true).into(),
        NumberValue::UInt(value) => const_integer(int_type(), value, false).into(),
    };

    Lowered::Value { value, is_unsigned }
}

fn gen_variable<'a>(
    compiler: &mut Compiler<'a>,
    cx: &mut CodegenContext<'a>,
    variable: &VariableExpr,
    wants_pointer: bool,
) -> Result<Lowered<'a>, Error> {
    cx.set_current_identifier(&variable.name);

    let Some(slot) = cx.lookup(&variable.name) else {
        return Ok(report(
            compiler,
            cx,
            ErrorImpl::UndefinedSymbol {
                symbol: variable.name.clone(),
            },
        ));
    };

    if wants_pointer {
        return Ok(Lowered::Address(slot));
    }

    load_slot(compiler, slot, &variable.name, slot.is_unsigned)
}

fn gen_alloca<'a>(
    compiler: &mut Compiler<'a>,
    cx: &mut CodegenContext<'a>,
    alloca: &AllocaExpr,
) -> Result<Lowered<'a>, Error> {
    cx.set_current_identifier(&alloca.name);

    let ty = alloca.ty.lower(compiler.context);
    let ptr = compiler.builder.build_alloca(ty, &alloca.name)?;
    let slot = Slot {
        ptr,
        ty: BasicTypeEnum::IntType(ty),
        is_unsigned: alloca.ty.is_unsigned,
    };

    if cx.bind(&alloca.name, slot).is_some() {
        debug!(name = %alloca.name, "alloca shadows an earlier binding");
    }

    Ok(Lowered::Address(slot))
}

fn gen_load<'a>(
    compiler: &mut Compiler<'a>,
    cx: &mut CodegenContext<'a>,
    load: &LoadExpr,
) -> Result<Lowered<'a>, Error> {
    let slot = match gen_address(compiler, cx, &load.target)? {
        Lowered::Address(slot) => slot,
        lowered => return Ok(lowered),
    };

    let expected = BasicTypeEnum::IntType(load.ty.lower(compiler.context));
    if slot.ty != expected {
        return Ok(report(
            compiler,
            cx,
            ErrorImpl::TypeMismatch {
                expected: type_name(expected),
                received: type_name(slot.ty),
            },
        ));
    }

    load_slot(compiler, slot, &load.name, load.ty.is_unsigned)
}

fn gen_store<'a>(
    compiler: &mut Compiler<'a>,
    cx: &mut CodegenContext<'a>,
    store: &StoreExpr,
) -> Result<Lowered<'a>, Error> {
    let value = gen_scalar(compiler, cx, &store.value)?;
    let Some(scalar) = value.value() else {
        return Ok(value);
    };

    let slot = match gen_address(compiler, cx, &store.target)? {
        Lowered::Address(slot) => slot,
        lowered => return Ok(lowered),
    };

    if slot.ty != scalar.get_type() {
        return Ok(report(
            compiler,
            cx,
            ErrorImpl::TypeMismatch {
                expected: type_name(slot.ty),
                received: type_name(scalar.get_type()),
            },
        ));
    }

    compiler.builder.build_store(slot.ptr, scalar)?;

    // The stored scalar, not the address, so stores can be chained
    Ok(value)
}

fn gen_arithmetic<'a>(
    compiler: &mut Compiler<'a>,
    cx: &mut CodegenContext<'a>,
    operands: &ArithmeticExpr,
    op: ArithmeticOp,
    is_unsigned: bool,
) -> Result<Lowered<'a>, Error> {
    let target = gen_scalar(compiler, cx, &operands.target)?;
    let value = gen_scalar(compiler, cx, &operands.value)?;

    let (Some(target), Some(value)) = (target.value(), value.value()) else {
        return Ok(Lowered::Poison);
    };

    let (BasicValueEnum::IntValue(lhs), BasicValueEnum::IntValue(rhs)) = (target, value) else {
        let received = if target.is_int_value() { value } else { target };
        return Ok(report(
            compiler,
            cx,
            ErrorImpl::TypeMismatch {
                expected: String::from("integer"),
                received: type_name(received.get_type()),
            },
        ));
    };

    if lhs.get_type() != rhs.get_type() {
        return Ok(report(
            compiler,
            cx,
            ErrorImpl::TypeMismatch {
                expected: type_name(target.get_type()),
                received: type_name(value.get_type()),
            },
        ));
    }

    // Signed arithmetic may not wrap past the signed range, unsigned past
    // the unsigned range. A result that would wrap is poison, not wrapped.
    let builder = &compiler.builder;
    let result = match (op, is_unsigned) {
        (ArithmeticOp::Add, false) => builder.build_int_nsw_add(lhs, rhs, "addtmp")?,
        (ArithmeticOp::Add, true) => builder.build_int_nuw_add(lhs, rhs, "addtmp")?,
        (ArithmeticOp::Sub, false) => builder.build_int_nsw_sub(lhs, rhs, "subtmp")?,
        (ArithmeticOp::Sub, true) => builder.build_int_nuw_sub(lhs, rhs, "subtmp")?,
    };

    Ok(Lowered::Value {
        value: result.into(),
        is_unsigned,
    })
}

fn gen_link<'a>(
    compiler: &mut Compiler<'a>,
    cx: &mut CodegenContext<'a>,
    link: &LinkExpr,
) -> Result<Lowered<'a>, Error> {
    let value = gen_scalar(compiler, cx, &link.value)?;
    let Some(scalar) = value.value() else {
        return Ok(value);
    };

    let slot = match gen_address(compiler, cx, &link.target)? {
        Lowered::Address(slot) => slot,
        lowered => return Ok(lowered),
    };

    let value_type = scalar.get_type();
    let name = link.target.binding_name();

    if slot.ty == value_type {
        compiler.builder.build_store(slot.ptr, scalar)?;

        if let Some(name) = name {
            cx.bind(
                name,
                Slot {
                    is_unsigned: value.is_unsigned(),
                    ..slot
                },
            );
        }

        return Ok(value);
    }

    let Some(name) = name else {
        return Ok(report(
            compiler,
            cx,
            ErrorImpl::TypeMismatch {
                expected: type_name(slot.ty),
                received: type_name(value_type),
            },
        ));
    };

    // The old slot cannot hold the new type; give the name a fresh one
    let ptr = compiler.builder.build_alloca(value_type, name)?;
    compiler.builder.build_store(ptr, scalar)?;
    cx.bind(
        name,
        Slot {
            ptr,
            ty: value_type,
            is_unsigned: value.is_unsigned(),
        },
    );

    debug!(
        binding = name,
        from = %type_name(slot.ty),
        to = %type_name(value_type),
        "link retyped binding"
    );

    Ok(value)
}

fn gen_verify_one<'a>(
    compiler: &mut Compiler<'a>,
    cx: &mut CodegenContext<'a>,
    target: &Expression,
) -> Result<Lowered<'a>, Error> {
    let lowered = gen_expression(compiler, cx, target)?;

    // Poison was already reported by the target
    if lowered.is_poison() || lowered.result_count() == 1 {
        return Ok(lowered);
    }

    Ok(report(
        compiler,
        cx,
        ErrorImpl::MultiplicityViolation {
            expected: 1,
            received: lowered.result_count(),
        },
    ))
}

fn gen_return<'a>(
    compiler: &mut Compiler<'a>,
    cx: &mut CodegenContext<'a>,
    value: &Expression,
) -> Result<Lowered<'a>, Error> {
    let lowered = gen_expression(compiler, cx, value)?;

    // The operand itself returned, as in `return return x`
    if cx.is_terminated() {
        return Ok(report_unreachable(compiler, cx));
    }

    let lowered = coerce_scalar(compiler, value, lowered)?;

    let result = match (lowered, cx.return_type) {
        (Lowered::Value { value, .. }, Some(return_type)) => {
            let expected = BasicTypeEnum::IntType(return_type.lower(compiler.context));
            if value.get_type() == expected {
                compiler.builder.build_return(Some(&value))?;
                cx.terminate();
                return Ok(Lowered::Unit);
            }

            report(
                compiler,
                cx,
                ErrorImpl::TypeMismatch {
                    expected: type_name(expected),
                    received: type_name(value.get_type()),
                },
            )
        }
        (Lowered::Value { value, .. }, None) => report(
            compiler,
            cx,
            ErrorImpl::TypeMismatch {
                expected: String::from("unit"),
                received: type_name(value.get_type()),
            },
        ),
        (Lowered::Address(slot), _) => report(
            compiler,
            cx,
            ErrorImpl::TypeMismatch {
                expected: String::from("scalar"),
                received: format!("address of {}", type_name(slot.ty)),
            },
        ),
        (Lowered::Unit, _) => Lowered::Unit,
        (Lowered::Poison, _) => Lowered::Poison,
    };

    // Unit return; also closes the block when the operand failed
    match cx.return_type {
        Some(return_type) => {
            let zero = return_type.lower(compiler.context).const_zero();
            compiler.builder.build_return(Some(&zero))?;
        }
        None => {
            compiler.builder.build_return(None)?;
        }
    }
    cx.terminate();

    Ok(result)
}

fn gen_call<'a>(
    compiler: &mut Compiler<'a>,
    cx: &mut CodegenContext<'a>,
    call: &CallExpr,
) -> Result<Lowered<'a>, Error> {
    cx.set_current_identifier(&call.callee);

    let proto = compiler.registry.get(&call.callee).cloned();
    let function = match &proto {
        Some(proto) => match compiler.declare_function(proto) {
            Ok(function) => function,
            Err(error) => return Ok(report(compiler, cx, error)),
        },
        None => match compiler.module.get_function(&call.callee) {
            Some(function) => function,
            None => {
                return Ok(report(
                    compiler,
                    cx,
                    ErrorImpl::UndefinedSymbol {
                        symbol: call.callee.clone(),
                    },
                ))
            }
        },
    };

    let param_types: Vec<BasicTypeEnum<'a>> = function
        .get_params()
        .iter()
        .map(|param| param.get_type())
        .collect();

    if param_types.len() != call.args.len() {
        return Ok(report(
            compiler,
            cx,
            ErrorImpl::ArityMismatch {
                callee: call.callee.clone(),
                expected: param_types.len(),
                received: call.args.len(),
            },
        ));
    }

    let mut args: Vec<BasicMetadataValueEnum<'a>> = Vec::with_capacity(call.args.len());
    let mut failed = false;

    for (arg, param_type) in call.args.iter().zip(param_types) {
        let lowered = gen_scalar(compiler, cx, arg)?;

        match lowered.value() {
            Some(value) if value.get_type() == param_type => args.push(value.into()),
            Some(value) => {
                report(
                    compiler,
                    cx,
                    ErrorImpl::TypeMismatch {
                        expected: type_name(param_type),
                        received: type_name(value.get_type()),
                    },
                );
                failed = true;
            }
            None => failed = true,
        }
    }

    if failed {
        return Ok(Lowered::Poison);
    }

    // Void values cannot be named
    let name = if function.get_type().get_return_type().is_some() {
        "calltmp"
    } else {
        ""
    };

    let call_site = compiler.builder.build_call(function, &args, name)?;
    let is_unsigned = proto
        .and_then(|proto| proto.return_type)
        .map_or(true, |return_type| return_type.is_unsigned);

    Ok(match call_site.try_as_basic_value().left() {
        Some(value) => Lowered::Value { value, is_unsigned },
        None => Lowered::Unit,
    })
}
