//! Black-box coverage of the interpreter's public surface: compiles and
//! runs whole scripts through `wisp_core::vm::Vm` exactly as an embedding
//! host would, asserting on the printed output or on the error a script
//! produces. Complements the `<module>_test.rs` unit tests, which exercise
//! internals the public API doesn't expose.

use std::io::Write;
use std::sync::{Arc, Mutex};

use wisp_core::vm::Vm;
use wisp_core::{InterpretError, RuntimeError};

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

fn run(source: &str) -> String {
    let captured = Captured::default();
    let mut vm = Vm::with_output(false, Box::new(captured.clone()));
    vm.interpret_source(source).unwrap_or_else(|e| panic!("expected success, got {e:?}"));
    captured.text()
}

#[test]
fn bound_methods_are_first_class_and_close_over_their_receiver() {
    let out = run(
        "class A { init(n){ this.n=n; } get(){ return this.n; } }
         var a=A(7); var m=a.get; print m();",
    );
    assert_eq!(out, "7\n");
}

#[test]
fn a_native_arity_error_is_an_ordinary_runtime_error_not_a_panic() {
    let captured = Captured::default();
    let mut vm = Vm::with_output(false, Box::new(captured));
    match vm.interpret_source("clock(1);") {
        Err(InterpretError::Runtime(report)) => {
            assert!(matches!(report.error, RuntimeError::ArityMismatch { expected: 0, got: 1 }))
        }
        other => panic!("expected a runtime error, got {other:?}"),
    }
}

#[test]
fn a_full_program_mixing_inheritance_closures_and_control_flow() {
    let out = run(
        "class Shape {
             area(){ return 0; }
             describe(){ print \"shape\"; print this.area(); }
         }
         class Square < Shape {
             init(side){ this.side=side; }
             area(){ return this.side*this.side; }
         }
         var shapes = Square(2);
         shapes.describe();

         fun counter(){
             var n=0;
             fun next(){ n=n+1; return n; }
             return next;
         }
         var c=counter();
         for (var i=0; i<3; i=i+1){
             var v=c();
             if (v==2) continue;
             print v;
         }",
    );
    assert_eq!(out, "shape\n4\n1\n3\n");
}

#[test]
fn compile_errors_are_collected_rather_than_aborting_on_the_first_one() {
    let captured = Captured::default();
    let mut vm = Vm::with_output(false, Box::new(captured));
    match vm.interpret_source("var;\nprint;") {
        Err(InterpretError::Compile(errors)) => assert!(errors.len() >= 2),
        other => panic!("expected a compile error, got {other:?}"),
    }
}
