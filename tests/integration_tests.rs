//! Integration tests for end-to-end lowering.
//!
//! These tests build node trees by hand, lower them with `compile`, and then
//! check the diagnostics, the emitted module, and (through the JIT) the
//! behavior of the generated code.

use ast_lowering::{
    ast::{
        ast::Expression,
        statements::{Function, Prototype},
        types::Type,
    },
    compile, CompileOptions,
};
use inkwell::{
    context::Context,
    targets::{InitializationConfig, Target},
    OptimizationLevel,
};
use pretty_assertions::assert_eq;

type MainFn = unsafe extern "C" fn() -> i32;

fn num(text: &str) -> Expression {
    Expression::number(text, false).unwrap()
}

fn var(name: &str) -> Expression {
    Expression::variable(Type::i32(), name)
}

fn main_returning(body: Vec<Expression>) -> Function {
    Function::new(Prototype::with_params(Some(Type::i32()), "main", &[]), body)
}

/// Compiles `functions` and runs `main` through the JIT.
fn run_main(functions: &[Function]) -> i32 {
    Target::initialize_native(&InitializationConfig::default()).unwrap();

    let context = Context::create();
    let compiler = compile(&context, CompileOptions::default(), functions).unwrap();
    assert!(
        compiler.diagnostics.is_empty(),
        "{:?}",
        compiler.diagnostics.errors()
    );

    let engine = compiler
        .module
        .create_jit_execution_engine(OptimizationLevel::None)
        .unwrap();

    unsafe {
        let main = engine.get_function::<MainFn>("main").unwrap();
        main.call()
    }
}

#[test]
fn test_store_then_load() {
    let main = main_returning(vec![
        Expression::alloca(Type::i32(), "x"),
        Expression::store(var("x"), num("5")),
        Expression::ret(Expression::load("x", Type::i32(), var("x"))),
    ]);

    assert_eq!(run_main(&[main]), 5);
}

#[test]
fn test_signed_subtraction() {
    let main = main_returning(vec![
        Expression::alloca(Type::i32(), "x"),
        Expression::store(var("x"), num("3")),
        Expression::ret(Expression::sub(var("x"), num("10"))),
    ]);

    assert_eq!(run_main(&[main]), -7);
}

#[test]
fn test_call_defined_later() {
    let main = main_returning(vec![Expression::ret(Expression::call(
        "twice",
        vec![num("21")],
    ))]);
    let twice = Function::new(
        Prototype::with_params(Some(Type::i32()), "twice", &[("a", Type::i32())]),
        vec![Expression::ret(Expression::add(var("a"), var("a")))],
    );

    assert_eq!(run_main(&[main, twice]), 42);
}

#[test]
fn test_link_then_return_new_type() {
    let main = main_returning(vec![
        Expression::alloca(Type::i8(), "x"),
        Expression::link(var("x"), num("40")),
        Expression::ret(Expression::add(var("x"), num("2"))),
    ]);

    assert_eq!(run_main(&[main]), 42);
}

#[test]
fn test_mutual_references() {
    let ping = Function::new(
        Prototype::with_params(None, "ping", &[]),
        vec![Expression::call("pong", vec![])],
    );
    let pong = Function::new(
        Prototype::with_params(None, "pong", &[]),
        vec![Expression::call("ping", vec![])],
    );

    let context = Context::create();
    let compiler = compile(&context, CompileOptions::default(), &[ping, pong]).unwrap();

    assert!(compiler.diagnostics.is_empty());
    assert_eq!(compiler.functions.len(), 2);

    let ir = compiler.print_ir();
    assert!(ir.contains("call void @pong()"), "{}", ir);
    assert!(ir.contains("call void @ping()"), "{}", ir);
}

#[test]
fn test_errors_do_not_stop_siblings() {
    let pair = Function::new(
        Prototype::with_params(
            Some(Type::i32()),
            "pair",
            &[("a", Type::i32()), ("b", Type::i32())],
        ),
        vec![Expression::ret(Expression::add(var("a"), var("b")))],
    );
    let broken = Function::new(
        Prototype::with_params(None, "broken", &[]),
        vec![
            Expression::call("pair", vec![num("1")]),
            Expression::call("missing", vec![]),
        ],
    );
    let fine = Function::new(Prototype::with_params(None, "fine", &[]), vec![]);

    let context = Context::create();
    let compiler = compile(&context, CompileOptions::default(), &[pair, broken, fine]).unwrap();

    let names: Vec<&str> = compiler
        .diagnostics
        .errors()
        .iter()
        .map(|error| error.get_error_name())
        .collect();
    assert_eq!(names, vec!["ArityMismatch", "UndefinedSymbol"]);
    assert!(compiler
        .diagnostics
        .errors()
        .iter()
        .all(|error| error.get_function() == Some("broken")));

    let emitted: Vec<String> = compiler
        .functions
        .iter()
        .map(|function| function.get_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(emitted, vec!["pair", "fine"]);

    let broken = compiler.module.get_function("broken").unwrap();
    assert_eq!(broken.count_basic_blocks(), 0);
}

#[test]
fn test_empty_body() {
    let empty = Function::new(Prototype::with_params(None, "empty", &[]), vec![]);

    let context = Context::create();
    let compiler = compile(&context, CompileOptions::default(), &[empty]).unwrap();

    let ir = compiler.print_ir();
    assert!(ir.contains("define void @empty()"), "{}", ir);
    assert_eq!(ir.matches("ret void").count(), 1);
}

#[test]
fn test_empty_main_returns_zero() {
    assert_eq!(run_main(&[main_returning(vec![])]), 0);
}

#[test]
fn test_registry_holds_every_prototype() {
    let functions = vec![
        Function::new(Prototype::with_params(None, "b", &[]), vec![]),
        Function::new(Prototype::with_params(None, "a", &[]), vec![]),
    ];

    let context = Context::create();
    let compiler = compile(&context, CompileOptions::default(), &functions).unwrap();

    assert_eq!(compiler.registry.names(), vec!["a", "b"]);
    assert!(compiler.registry.contains("a"));
}

#[test]
fn test_host_target_and_output_file() {
    let options = CompileOptions {
        module_name: String::from("host"),
        host_target: true,
        ..CompileOptions::default()
    };
    let main = main_returning(vec![Expression::ret(num("1"))]);

    let context = Context::create();
    let compiler = compile(&context, options, &[main]).unwrap();

    let triple = compiler.module.get_triple();
    assert!(!triple.as_str().to_bytes().is_empty());

    let path = std::env::temp_dir().join("ast_lowering_host_target.ll");
    compiler.save_module_to_file(&path).unwrap();

    let saved = std::fs::read_to_string(&path).unwrap();
    assert!(saved.contains("define i32 @main()"));
    assert!(saved.contains("ModuleID = 'host'"));
}

#[test]
fn test_nested_return_stays_local() {
    let bad = main_returning(vec![Expression::ret(Expression::ret(num("1")))]);
    let fine = Function::new(Prototype::with_params(None, "fine", &[]), vec![]);

    let context = Context::create();
    let compiler = compile(&context, CompileOptions::default(), &[bad, fine]).unwrap();

    let names: Vec<&str> = compiler
        .diagnostics
        .errors()
        .iter()
        .map(|error| error.get_error_name())
        .collect();
    assert_eq!(names, vec!["UnreachableCode"]);

    assert_eq!(compiler.functions.len(), 1);
    assert_eq!(compiler.functions[0].get_name().to_str(), Ok("fine"));
    assert_eq!(
        compiler.module.get_function("main").unwrap().count_basic_blocks(),
        0
    );
}

#[test]
fn test_duplicate_prototypes_report_once() {
    let first = Function::new(
        Prototype::with_params(Some(Type::i32()), "f", &[]),
        vec![Expression::ret(num("1"))],
    );
    let second = Function::new(
        Prototype::with_params(None, "f", &[("a", Type::i32())]),
        vec![],
    );

    let context = Context::create();
    let compiler = compile(
        &context,
        CompileOptions::default(),
        &[first, second.clone()],
    )
    .unwrap();

    assert_eq!(compiler.diagnostics.len(), 1);
    assert_eq!(compiler.diagnostics.count("TypeMismatch"), 1);
    assert_eq!(compiler.registry.get("f"), Some(&second.proto));
    assert_eq!(compiler.functions.len(), 1);
}
