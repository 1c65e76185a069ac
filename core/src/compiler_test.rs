use super::*;
use crate::disassemble::disassemble_chunk;
use crate::object::ObjKind;
use crate::vm::Vm;

fn compile_ok(source: &str) -> *mut ObjFunction {
    let mut vm = Vm::new(false);
    compile(source, &mut vm).unwrap_or_else(|errors| panic!("expected success, got {errors:?}"))
}

fn compile_err(source: &str) -> Vec<CompileError> {
    let mut vm = Vm::new(false);
    match compile(source, &mut vm) {
        Ok(_) => panic!("expected a compile error"),
        Err(errors) => errors,
    }
}

fn dump(function: *mut ObjFunction) -> String {
    disassemble_chunk(unsafe { &(*function).chunk }, "test")
}

/// Finds the first nested `ObjFunction` stashed in `function`'s constant
/// pool (put there by `OP_CLOSURE`), so a test can inspect a function
/// body's own bytecode rather than just the chunk that builds its closure.
fn first_nested_function(function: *mut ObjFunction) -> *mut ObjFunction {
    unsafe { &*function }
        .chunk
        .constants()
        .iter()
        .find(|v| v.is_obj_kind(ObjKind::Function))
        .map(|v| v.as_obj() as *mut ObjFunction)
        .expect("expected a nested function constant")
}

#[test]
fn compiles_arithmetic_into_the_expected_opcodes() {
    let function = compile_ok("1 + 2 * 3;");
    let listing = dump(function);
    assert!(listing.contains("OP_MULTIPLY"));
    assert!(listing.contains("OP_ADD"));
    assert!(listing.contains("OP_POP"));
}

#[test]
fn undefined_global_reference_is_not_a_compile_error() {
    // Resolving a bare name that isn't a local or upvalue always falls
    // back to a global lookup; whether the global exists is a runtime
    // question, not a compile-time one.
    let function = compile_ok("print nope;");
    assert!(dump(function).contains("OP_GET_GLOBAL"));
}

#[test]
fn reading_a_local_in_its_own_initializer_is_an_error() {
    let errors = compile_err("{ var a = a; }");
    assert!(errors.iter().any(|e| e.message.contains("own initializer")));
}

#[test]
fn a_single_pass_reports_more_than_one_error() {
    let errors = compile_err("var 1 = 2; var 3 = 4;");
    assert!(errors.len() >= 2, "expected at least two errors, got {errors:?}");
}

#[test]
fn break_outside_a_loop_is_an_error() {
    let errors = compile_err("break;");
    assert!(errors.iter().any(|e| e.message.contains("'break'")));
}

#[test]
fn continue_outside_a_loop_is_an_error() {
    let errors = compile_err("continue;");
    assert!(errors.iter().any(|e| e.message.contains("'continue'")));
}

#[test]
fn this_outside_a_class_is_an_error() {
    let errors = compile_err("fun f() { return this; }");
    assert!(errors.iter().any(|e| e.message.contains("'this'")));
}

#[test]
fn super_outside_a_class_is_an_error() {
    let errors = compile_err("fun f() { super.foo(); }");
    assert!(errors.iter().any(|e| e.message.contains("'super'")));
}

#[test]
fn a_class_cannot_inherit_from_itself() {
    let errors = compile_err("class Oops < Oops {}");
    assert!(errors.iter().any(|e| e.message.contains("inherit from itself")));
}

#[test]
fn returning_a_value_from_an_initializer_is_an_error() {
    let errors = compile_err("class C { init() { return 1; } }");
    assert!(errors.iter().any(|e| e.message.contains("return a value from an initializer")));
}

#[test]
fn function_parameters_resolve_as_locals_not_globals() {
    let script = compile_ok("fun add(a, b) { return a + b; }");
    let add = first_nested_function(script);
    let listing = dump(add);
    assert!(!listing.contains("OP_GET_GLOBAL"));
    assert!(listing.contains("OP_GET_LOCAL"));
}

#[test]
fn a_nested_closure_captures_an_enclosing_local_as_an_upvalue() {
    let script = compile_ok(
        "fun outer() {\n  var x = 1;\n  fun inner() { return x; }\n  return inner;\n}",
    );
    let outer = first_nested_function(script);
    let listing = dump(outer);
    assert!(listing.contains("local 1"));
}

#[test]
fn for_loop_continue_jumps_to_the_increment_not_the_condition() {
    // Regression check for the increment-clause re-entry point: a loop
    // with an empty body and a visible side effect in the increment
    // should still compile (and, if run, terminate) rather than looping
    // straight back to the condition and skipping the increment forever.
    let function = compile_ok("for (var i = 0; i < 3; i = i + 1) { continue; }");
    assert!(dump(function).contains("OP_LOOP"));
}
