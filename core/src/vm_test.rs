use std::io::Write;
use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;

use super::*;

/// A `Write` sink that hands its bytes back as a `String`, so a test can
/// assert on exactly what a script's `print` statements produced.
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Captured {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

fn run_ok(source: &str) -> String {
    let captured = Captured::default();
    let mut vm = Vm::with_output(false, Box::new(captured.clone()));
    vm.interpret_source(source).unwrap_or_else(|e| panic!("expected success, got {e:?}"));
    captured.text()
}

fn run_err(source: &str) -> RuntimeErrorReport {
    let captured = Captured::default();
    let mut vm = Vm::with_output(false, Box::new(captured));
    match vm.interpret_source(source) {
        Ok(()) => panic!("expected a runtime error"),
        Err(InterpretError::Runtime(report)) => report,
        Err(other) => panic!("expected a runtime error, got {other:?}"),
    }
}

#[test]
fn closures_capture_locals_by_reference() {
    let out = run_ok(
        "fun make(){ var x=1; fun inc(){ x=x+1; print x; } return inc; }
         var f=make(); f(); f();",
    );
    assert_eq!(out, "2\n3\n");
}

#[test]
fn class_with_initializer_and_method() {
    let out = run_ok(
        "class A { init(n){ this.n=n; } dbl(){ return this.n*2; } }
         print A(21).dbl();",
    );
    assert_eq!(out, "42\n");
}

#[test]
fn super_call_resolves_to_parent_method_at_definition_time() {
    let out = run_ok(
        "class A { greet(){ print \"A\"; } }
         class B < A { greet(){ super.greet(); print \"B\"; } }
         B().greet();",
    );
    assert_eq!(out, "A\nB\n");
}

#[test]
fn break_exits_only_the_innermost_loop() {
    let out = run_ok(
        "for (var i=0; i<3; i=i+1){ for (var j=0; j<3; j=j+1){
             if (j==1) break; print i*10+j; } }",
    );
    assert_eq!(out, "0\n10\n20\n");
}

#[test]
fn continue_skips_to_the_increment_not_the_body_start() {
    let out = run_ok(
        "for (var i=0; i<5; i=i+1){ if (i==2) continue; print i; }",
    );
    assert_eq!(out, "0\n1\n3\n4\n");
}

#[test]
fn string_concatenation_and_number_addition_are_distinct() {
    let out = run_ok("print \"a\"+\"b\"; print 1+2;");
    assert_eq!(out, "ab\n3\n");
}

#[test]
fn adding_a_string_to_a_number_is_a_runtime_error() {
    let report = run_err("print \"a\"+1;");
    assert_eq!(report.error, RuntimeError::OperandsMustBeNumbersOrStrings);
}

#[test]
fn gc_does_not_free_a_closures_upvalue_after_its_frame_returns() {
    let captured = Captured::default();
    let mut vm = Vm::with_output(true, Box::new(captured.clone()));
    vm.interpret_source(
        "fun outer(){ var s=\"hi\"; fun inner(){ return s; } return inner; }
         var g=outer(); print g();",
    )
    .unwrap();
    assert_eq!(captured.text(), "hi\n");
}

#[test]
fn calling_a_closure_with_the_wrong_arity_is_a_runtime_error() {
    let report = run_err("fun f(a,b){ return a+b; } f(1);");
    assert_eq!(report.error, RuntimeError::ArityMismatch { expected: 2, got: 1 });
}

#[test]
fn calling_a_non_callable_value_is_a_runtime_error() {
    let report = run_err("var x = 1; x();");
    assert_eq!(report.error, RuntimeError::NotCallable);
}

#[test]
fn accessing_an_undefined_global_is_a_runtime_error() {
    let report = run_err("print nope;");
    assert_eq!(report.error, RuntimeError::UndefinedVariable("nope".to_string()));
}

#[test]
fn runtime_error_reports_a_frame_stack_trace() {
    let report = run_err(
        "fun a(){ b(); }
         fun b(){ c(); }
         fun c(){ print nope; }
         a();",
    );
    assert_eq!(report.trace.len(), 4);
    assert_eq!(report.trace[0].function_name.as_deref(), Some("c"));
    assert_eq!(report.trace[3].function_name, None);
}

#[test]
fn stack_and_open_upvalues_are_empty_after_a_successful_run() {
    let mut vm = Vm::new(false);
    vm.interpret_source("fun f(){ var x=1; fun g(){ return x; } return g(); } f();").unwrap();
    assert!(vm.stack_slice().is_empty());
    assert!(vm.open_upvalues_slice().is_empty());
}

#[test]
fn stack_is_reset_after_a_runtime_error() {
    let mut vm = Vm::new(false);
    assert!(vm.interpret_source("print 1 + \"a\";").is_err());
    assert!(vm.stack_slice().is_empty());
    assert!(vm.open_upvalues_slice().is_empty());
}

#[test]
fn a_class_instantiated_with_no_initializer_rejects_arguments() {
    let report = run_err("class A {} A(1);");
    assert_eq!(report.error, RuntimeError::ArityMismatch { expected: 0, got: 1 });
}

#[test]
fn division_by_zero_follows_ieee_754_and_does_not_error() {
    let out = run_ok("print 1/0; print -1/0; print 0/0;");
    assert_eq!(out, "inf\n-inf\nNaN\n");
}

#[test]
fn falsiness_matches_only_nil_and_false() {
    let out = run_ok("print !nil; print !false; print !0; print !\"\";");
    assert_eq!(out, "true\ntrue\nfalse\nfalse\n");
}

#[test]
fn clock_native_is_registered_and_callable() {
    let out = run_ok("print clock() >= 0;");
    assert_eq!(out, "true\n");
}

#[test]
fn an_instance_field_shadows_a_same_named_method_on_invoke() {
    let out = run_ok(
        "fun asField(){ print \"field\"; }
         class A { greet(){ print \"method\"; } }
         var a = A();
         a.greet = asField;
         a.greet();",
    );
    assert_eq!(out, "field\n");
}
