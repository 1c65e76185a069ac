//! `wisp-core`: the compiler, virtual machine, and garbage-collected heap
//! for the Wisp scripting language. Everything outside this crate (file
//! I/O, a REPL, argument parsing) is a host concern — see `wisp-cli`.

pub mod chunk;
pub mod compiler;
pub mod diagnostics;
pub mod disassemble;
pub mod gc;
pub mod heap;
pub mod native;
pub mod object;
pub mod scanner;
pub mod table;
pub mod value;
pub mod vm;

use diagnostics::{InterpretError, InterpretResult};
use object::print_value;
use value::Value;
use vm::Vm;

/// Compiles and runs one top-level script against a fresh, throwaway `Vm`.
/// Embedding hosts that want a persistent `Vm` across multiple `interpret`
/// calls (a REPL evaluating one line at a time against the same globals)
/// should drive [`Vm::interpret_source`] directly instead.
pub fn interpret(source: &str) -> InterpretResult<()> {
    let mut vm = Vm::new(false);
    vm.interpret_source(source)
}

struct DisplayValue(Value);

impl core::fmt::Display for DisplayValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        print_value(f, self.0)
    }
}

/// Renders a `Value` the way `print` statements do, for hosts (e.g. a REPL
/// echoing the result of a bare expression) that need it outside a running
/// `Vm`.
pub fn display_value(value: Value) -> impl core::fmt::Display {
    DisplayValue(value)
}

pub use diagnostics::{CompileError, InterpretError, RuntimeError, RuntimeErrorReport};
