//! Native (host-implemented) functions exposed to scripts as ordinary
//! global callables. Grounded in `vm.c`'s `defineNative`/`clockNative`, with
//! one deliberate enrichment: natives here can fail (see
//! `crate::object::NativeFn`'s `Result` return, and
//! `crate::diagnostics::RuntimeError::Native`), where the reference
//! implementation's `NativeFn` has no way to report an error at all.

use std::sync::OnceLock;
use std::time::Instant;

use crate::diagnostics::RuntimeError;
use crate::object::Obj;
use crate::value::Value;
use crate::vm::Vm;

pub fn register(vm: &mut Vm) {
    define(vm, "clock", 0, clock);
}

fn define(vm: &mut Vm, name: &'static str, arity: u8, function: crate::object::NativeFn) {
    let interned = vm.heap_mut().intern(name.as_bytes());
    let native = vm.heap.alloc_native(name, arity, function);
    vm.globals.set(interned, Value::object(native as *mut Obj));
}

/// The instant `clock()` was first called, standing in for process start —
/// there is no portable "process start" timestamp in `std`, so the first
/// call lazily pins the origin the same way the reference implementation's
/// `clockNative` implicitly measures from whenever `clock()` last reset.
static START: OnceLock<Instant> = OnceLock::new();

/// Seconds elapsed since `START`, as a float — matching the reference
/// implementation's `clockNative` (`(double)clock() / CLOCKS_PER_SEC`),
/// which reports elapsed process time rather than wall-clock time.
fn clock(_args: &[Value]) -> Result<Value, RuntimeError> {
    let start = START.get_or_init(Instant::now);
    Ok(Value::number(start.elapsed().as_secs_f64()))
}
