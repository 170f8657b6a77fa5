//! Main compiler module.
//!
//! This module contains the `Compiler` structure that owns the backend
//! handles (context, module, builder) together with the signature registry
//! and the diagnostics collected while lowering. It also provides the
//! `compile` entry point that lowers a list of function definitions into a
//! single verified module.

use std::path::Path;

use inkwell::{
    attributes::{Attribute, AttributeLoc},
    builder::Builder,
    context::Context,
    module::{Linkage, Module},
    targets::{CodeModel, InitializationConfig, RelocMode, Target, TargetMachine},
    types::{BasicMetadataTypeEnum, BasicTypeEnum, FunctionType},
    values::{BasicValueEnum, FunctionValue},
    OptimizationLevel,
};
use tracing::{debug, info};

use crate::{
    ast::statements::{Function, Prototype},
    errors::errors::{Diagnostics, Error, ErrorImpl},
};

use super::{
    context::Lowered,
    function::{gen_function, gen_prototype},
    registry::SignatureRegistry,
};

/// Settings for one compilation run.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Name given to the backend module.
    pub module_name: String,
    /// Run the backend verifier on every emitted function and on the module.
    pub verify: bool,
    /// Stamp the module with the host triple and data layout.
    pub host_target: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            module_name: String::from("main"),
            verify: true,
            host_target: false,
        }
    }
}

/// The state of a compilation run.
///
/// # Type Parameters
///
/// * `'a` - Lifetime of the LLVM context
pub struct Compiler<'a> {
    pub options: CompileOptions,

    /// Signatures of every prototype lowered so far
    pub registry: SignatureRegistry,
    /// Local failures reported while lowering
    pub diagnostics: Diagnostics,
    /// Function definitions emitted successfully, in emission order
    pub functions: Vec<FunctionValue<'a>>,

    /// Reference to the LLVM context
    pub context: &'a Context,
    /// The LLVM module being built
    pub module: Module<'a>,
    /// The LLVM IR builder
    pub builder: Builder<'a>,
}

impl<'a> Compiler<'a> {
    pub fn new(context: &'a Context, options: CompileOptions) -> Self {
        Compiler {
            module: context.create_module(&options.module_name),
            builder: context.create_builder(),
            context,
            options,
            registry: SignatureRegistry::new(),
            diagnostics: Diagnostics::new(),
            functions: vec![],
        }
    }

    /// Reports a local failure and returns the error sentinel.
    pub fn report(&mut self, error: ErrorImpl, function: Option<&str>) -> Lowered<'a> {
        self.diagnostics
            .report(Error::new(error, function.map(str::to_string)))
    }

    /// Initializes the native target and sets the module triple and data
    /// layout for the host platform.
    pub fn set_host_target(&self) -> Result<(), Error> {
        Target::initialize_native(&InitializationConfig::default())
            .map_err(|message| backend_error(message))?;

        let target_triple = TargetMachine::get_default_triple();
        let target =
            Target::from_triple(&target_triple).map_err(|e| backend_error(e.to_string()))?;
        let target_machine = target
            .create_target_machine(
                &target_triple,
                "generic",
                "",
                OptimizationLevel::Default,
                RelocMode::PIC,
                CodeModel::Default,
            )
            .ok_or_else(|| backend_error("unable to create a target machine for the host"))?;

        self.module.set_triple(&target_triple);
        self.module
            .set_data_layout(&target_machine.get_target_data().get_data_layout());

        Ok(())
    }

    /// The backend function type of a prototype.
    pub fn function_type(&self, proto: &Prototype) -> FunctionType<'a> {
        let params: Vec<BasicMetadataTypeEnum<'a>> = proto
            .args
            .iter()
            .map(|arg| arg.ty.lower(self.context).into())
            .collect();

        match proto.return_type {
            Some(return_type) => return_type.lower(self.context).fn_type(&params, false),
            None => self.context.void_type().fn_type(&params, false),
        }
    }

    /// Returns the module's function for `proto`, declaring it first if the
    /// module does not have one.
    ///
    /// An existing function with a different signature is a conflict: the
    /// backend cannot hold two functions under one name.
    pub fn declare_function(&self, proto: &Prototype) -> Result<FunctionValue<'a>, ErrorImpl> {
        let function_type = self.function_type(proto);

        if let Some(function) = self.module.get_function(&proto.name) {
            if function.get_type() == function_type {
                return Ok(function);
            }

            return Err(ErrorImpl::TypeMismatch {
                expected: function.get_type().print_to_string().to_string(),
                received: function_type.print_to_string().to_string(),
            });
        }

        let function = self
            .module
            .add_function(&proto.name, function_type, Some(Linkage::External));

        // Add function attributes
        let attributes = [
            self.context
                .create_enum_attribute(Attribute::get_named_enum_kind_id("uwtable"), 0),
            self.context
                .create_enum_attribute(Attribute::get_named_enum_kind_id("nounwind"), 0),
        ];

        for attribute in attributes.iter() {
            function.add_attribute(AttributeLoc::Function, *attribute);
        }

        for (param, arg) in function.get_param_iter().zip(proto.args.iter()) {
            if let BasicValueEnum::IntValue(param) = param {
                param.set_name(&arg.name);
            }
        }

        debug!(function = %proto.name, signature = %proto.type_as_string, "declared function");

        Ok(function)
    }

    /// Runs the backend verifier over the whole module.
    pub fn verify(&self) -> Result<(), Error> {
        self.module
            .verify()
            .map_err(|message| backend_error(message.to_string()))
    }

    /// Returns the textual IR of the module.
    pub fn print_ir(&self) -> String {
        self.module.print_to_string().to_string()
    }

    /// Saves the module's textual IR to a file.
    pub fn save_module_to_file(&self, output_file: impl AsRef<Path>) -> Result<(), Error> {
        self.module
            .print_to_file(output_file)
            .map_err(|message| backend_error(message.to_string()))
    }
}

pub(crate) fn backend_error(message: impl Into<String>) -> Error {
    Error::new(
        ErrorImpl::BackendError {
            message: message.into(),
        },
        None,
    )
}

/// Printable name of a backend type, used in diagnostics.
pub(crate) fn type_name(ty: BasicTypeEnum<'_>) -> String {
    ty.print_to_string().to_string()
}

/// Lowers every function definition into one module.
///
/// All prototypes are registered before any body is lowered, so calls
/// resolve regardless of the order definitions appear in. Local failures
/// end up in `Compiler::diagnostics`; only a backend inconsistency is
/// returned as an error.
pub fn compile<'a>(
    context: &'a Context,
    options: CompileOptions,
    functions: &[Function],
) -> Result<Compiler<'a>, Error> {
    let mut compiler = Compiler::new(context, options);

    if compiler.options.host_target {
        compiler.set_host_target()?;
    }

    for function in functions {
        gen_prototype(&mut compiler, &function.proto);
    }

    for function in functions {
        gen_function(&mut compiler, function)?;
    }

    if compiler.options.verify {
        compiler.verify()?;
    }

    info!(
        module = %compiler.options.module_name,
        emitted = compiler.functions.len(),
        errors = compiler.diagnostics.len(),
        "compiled module"
    );

    Ok(compiler)
}
