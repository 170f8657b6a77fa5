//! Prototype and function emission.

use inkwell::{types::BasicTypeEnum, values::FunctionValue};
use tracing::{debug, instrument, warn};

use crate::{
    ast::{
        ast::Expression,
        statements::{Function, Prototype},
    },
    errors::errors::{Error, ErrorImpl},
};

use super::{
    compiler::{backend_error, Compiler},
    context::{CodegenContext, Slot},
    expr::gen_expression,
};

/// Declares the backend function for `proto` and registers its signature.
///
/// Registration happens whether or not the declaration succeeds; the
/// registry always holds the latest signature seen for a name.
#[instrument(level = "debug", skip_all, fields(function = %proto.name))]
pub fn gen_prototype<'a>(compiler: &mut Compiler<'a>, proto: &Prototype) -> Option<FunctionValue<'a>> {
    compiler.registry.register(proto.clone());

    match compiler.declare_function(proto) {
        Ok(function) => Some(function),
        Err(error) => {
            compiler.report(error, Some(&proto.name));
            None
        }
    }
}

/// Emits the body of `function`.
///
/// Returns `Ok(None)` when the function could not be emitted. In that case
/// the diagnostics explain why, any partial body has been erased, and the
/// declaration stays in the module so callers still link.
#[instrument(level = "debug", skip_all, fields(function = %function.proto.name))]
pub fn gen_function<'a>(
    compiler: &mut Compiler<'a>,
    function: &Function,
) -> Result<Option<FunctionValue<'a>>, Error> {
    let proto = &function.proto;

    // Only a prototype the module has never seen is registered here
    let llvm_function = match compiler.module.get_function(&proto.name) {
        Some(existing) if existing.get_type() == compiler.function_type(proto) => existing,
        Some(_) => {
            // The conflict was reported when the prototype was declared
            debug!(function = %proto.name, "skipping body of a conflicting prototype");
            return Ok(None);
        }
        None => match gen_prototype(compiler, proto) {
            Some(function) => function,
            None => return Ok(None),
        },
    };

    if llvm_function.count_basic_blocks() > 0 {
        warn!(function = %proto.name, "function redefined");
        compiler.report(
            ErrorImpl::FunctionAlreadyDeclared {
                function: proto.name.clone(),
            },
            Some(&proto.name),
        );
        return Ok(None);
    }

    let errors_before = compiler.diagnostics.len();
    let previous_position = compiler.builder.get_insert_block();

    let entry = compiler.context.append_basic_block(llvm_function, "entry");
    compiler.builder.position_at_end(entry);

    let mut cx = CodegenContext::new(llvm_function, &proto.name, proto.return_type);

    // Parameters live in stack slots so they can be addressed like locals
    for (param, arg) in llvm_function.get_param_iter().zip(proto.args.iter()) {
        let ty = arg.ty.lower(compiler.context);
        let alloca = compiler.builder.build_alloca(ty, &arg.name)?;
        compiler.builder.build_store(alloca, param)?;
        cx.bind(
            &arg.name,
            Slot {
                ptr: alloca,
                ty: BasicTypeEnum::IntType(ty),
                is_unsigned: arg.ty.is_unsigned,
            },
        );
    }

    for expression in function.body.iter() {
        if cx.is_terminated() {
            warn!(function = %proto.name, "expression after return is never executed");
            compiler.report(
                ErrorImpl::UnreachableCode {
                    function: proto.name.clone(),
                },
                Some(&proto.name),
            );
            continue;
        }

        gen_expression(compiler, &mut cx, expression)?;
    }

    // Falling off the end (or an empty body) returns unit
    if !cx.is_terminated() {
        gen_expression(compiler, &mut cx, &Expression::ret(Expression::nothing()))?;
    }

    if let Some(position) = previous_position {
        compiler.builder.position_at_end(position);
    } else {
        compiler.builder.clear_insertion_position();
    }

    if compiler.diagnostics.len() > errors_before {
        debug!(function = %proto.name, "discarding body after lowering errors");
        erase_body(llvm_function)?;
        return Ok(None);
    }

    if compiler.options.verify && !llvm_function.verify(false) {
        return Err(backend_error(format!(
            "function `{}` failed verification",
            proto.name
        )));
    }

    compiler.functions.push(llvm_function);

    Ok(Some(llvm_function))
}

/// Deletes every block of `function`, leaving only its declaration.
fn erase_body(function: FunctionValue<'_>) -> Result<(), Error> {
    for block in function.get_basic_blocks() {
        // Safety: the builder was moved off this function and no value of
        // the erased body is referenced from outside it.
        let deleted = unsafe { block.delete() };
        deleted.map_err(|_| backend_error("unable to erase a basic block"))?;
    }

    Ok(())
}
