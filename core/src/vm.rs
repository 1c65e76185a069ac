//! The bytecode interpreter: operand stack, call frames, and the opcode
//! dispatch loop. Grounded directly in `vm.c`'s `run`/`call`/`callValue`/
//! `invoke`/`bindMethod`/`captureUpvalue`/`closeUpvalues`.

use crate::chunk::OpCode;
use crate::diagnostics::{InterpretError, InterpretResult, RuntimeError, RuntimeErrorReport, TraceFrame};
use crate::gc;
use crate::heap::Heap;
use crate::object::{
    Obj, ObjBoundMethod, ObjClass, ObjClosure, ObjFunction, ObjInstance, ObjKind, ObjString,
    ObjUpvalue, UpvalueLocation, print_value,
};
use crate::table::Table;
use crate::value::Value;

use std::io::{self, Write};

const FRAMES_MAX: usize = 64;

/// One active function invocation. `slot_base` is an index into `Vm::stack`
/// rather than a raw pointer — see SPEC_FULL.md's design notes — so the
/// stack can grow (reallocating its backing `Vec`) without invalidating a
/// frame that's still on the Rust call stack of `run`.
struct CallFrame {
    pub(crate) closure: *mut ObjClosure,
    ip: usize,
    slot_base: usize,
}

pub struct Vm {
    pub(crate) heap: Heap,
    stack: Vec<Value>,
    frames: Vec<CallFrame>,
    pub(crate) globals: Table,
    /// Open upvalues, kept sorted by descending `slot_base` the way the
    /// reference VM's `openUpvalues` linked list is kept sorted by
    /// descending stack address — it's what lets `captureUpvalue` do a
    /// single linear scan to find-or-insert in the right place.
    open_upvalues: Vec<*mut ObjUpvalue>,
    init_string: *mut ObjString,
    /// Functions currently mid-compilation, pushed/popped by
    /// `crate::compiler` around each nested function it builds. A function
    /// object is otherwise unreachable from any root until the `OP_CLOSURE`
    /// that names it as a constant finishes compiling, so a collection
    /// triggered while compiling a deeply nested function needs this list to
    /// keep every enclosing function's still-incomplete chunk alive.
    compiling: Vec<*mut ObjFunction>,
    /// Where `OP_PRINT` writes. Defaults to the process's real stdout so an
    /// embedding host sees output the way the reference VM's `printf`
    /// would; tests and embedders that want to capture or redirect `print`
    /// output construct with [`Vm::with_output`] instead.
    output: Box<dyn Write>,
}

impl Vm {
    pub fn new(stress_gc: bool) -> Vm {
        Vm::with_output(stress_gc, Box::new(io::stdout()))
    }

    /// Like [`Vm::new`], but `print` statements write to `output` instead
    /// of the process's stdout. Used by tests asserting on a script's
    /// printed output, and by hosts (a REPL, an embedder capturing output
    /// into a buffer) that don't want `print` going straight to the
    /// process's real stdout.
    pub fn with_output(stress_gc: bool, output: Box<dyn Write>) -> Vm {
        let mut heap = Heap::new(stress_gc);
        let init_string = heap.intern(b"init");
        let mut vm = Vm {
            heap,
            stack: Vec::with_capacity(256),
            frames: Vec::with_capacity(FRAMES_MAX),
            globals: Table::new(),
            open_upvalues: Vec::new(),
            init_string,
            compiling: Vec::new(),
            output,
        };
        crate::native::register(&mut vm);
        vm
    }

    pub(crate) fn stack_slice(&self) -> &[Value] {
        &self.stack
    }

    pub(crate) fn globals_table(&self) -> &Table {
        &self.globals
    }

    pub(crate) fn init_string(&self) -> *mut ObjString {
        self.init_string
    }

    pub(crate) fn open_upvalues_slice(&self) -> &[*mut ObjUpvalue] {
        &self.open_upvalues
    }

    pub(crate) fn compiling_slice(&self) -> &[*mut ObjFunction] {
        &self.compiling
    }

    pub(crate) fn push_compiling(&mut self, function: *mut ObjFunction) {
        self.compiling.push(function);
    }

    pub(crate) fn pop_compiling(&mut self) {
        self.compiling.pop();
    }

    /// Roots a freshly allocated value on the VM stack for the duration of
    /// an operation that might itself allocate (and so might trigger a
    /// collection) before the value is reachable from anywhere else —
    /// e.g. while the compiler is inserting it into a chunk's constant pool.
    pub(crate) fn push_root(&mut self, value: Value) {
        self.push(value);
    }

    pub(crate) fn pop_root(&mut self) {
        self.pop();
    }

    pub(crate) fn collect_if_needed(&mut self) {
        self.maybe_collect();
    }

    fn frames_slice_raw(&self) -> &[CallFrame] {
        &self.frames
    }

    pub(crate) fn frames_slice(&self) -> FrameClosures<'_> {
        FrameClosures(&self.frames)
    }

    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    fn pop(&mut self) -> Value {
        self.stack.pop().expect("stack underflow")
    }

    fn peek(&self, distance: usize) -> Value {
        self.stack[self.stack.len() - 1 - distance]
    }

    fn maybe_collect(&mut self) {
        if self.heap.should_collect() {
            gc::collect_garbage(self);
        }
    }

    /// Compiles `source` and runs it to completion against this `Vm`. Hosts
    /// driving a persistent session (a REPL evaluating one line at a time
    /// against the same globals) call this once per line; `crate::interpret`
    /// is the throwaway-`Vm` convenience wrapper for one-shot scripts.
    pub fn interpret_source(&mut self, source: &str) -> InterpretResult<()> {
        let function = crate::compiler::compile(source, self).map_err(InterpretError::Compile)?;
        self.interpret_function(function).map_err(InterpretError::Runtime)
    }

    /// Runs a freshly compiled top-level script function to completion. On
    /// a runtime error, resets the stack, call frames, and open-upvalue
    /// list before returning so the `Vm` is ready for another
    /// `interpret_source` call with no leftover state from the failed run.
    fn interpret_function(&mut self, function: *mut ObjFunction) -> Result<(), RuntimeErrorReport> {
        self.push(Value::object(function as *mut Obj));
        let closure = self.heap.alloc_closure(function);
        self.pop();
        self.push(Value::object(closure as *mut Obj));
        if let Err(e) = self.call(closure, 0) {
            let report = self.report(e);
            self.reset_after_error();
            return Err(report);
        }
        match self.run() {
            Ok(()) => Ok(()),
            Err(e) => {
                let report = self.report(e);
                self.reset_after_error();
                Err(report)
            }
        }
    }

    fn reset_after_error(&mut self) {
        self.stack.clear();
        self.frames.clear();
        self.open_upvalues.clear();
    }

    fn report(&self, error: RuntimeError) -> RuntimeErrorReport {
        let mut trace = Vec::new();
        for frame in self.frames.iter().rev() {
            let function = unsafe { (*frame.closure).function };
            let instruction = frame.ip.saturating_sub(1);
            let line = unsafe { (*function).chunk.get_line(instruction) };
            let function_name = unsafe { (*function).name.map(|n| (*n).as_str().to_string()) };
            trace.push(TraceFrame { line, function_name });
        }
        RuntimeErrorReport { error, trace }
    }

    fn current_function(&self) -> *mut ObjFunction {
        unsafe { (*self.frames.last().unwrap().closure).function }
    }

    fn read_byte(&mut self) -> u8 {
        let frame = self.frames.last_mut().unwrap();
        let byte = unsafe { (*(*frame.closure).function).chunk.read_byte(frame.ip) };
        frame.ip += 1;
        byte
    }

    fn read_u16(&mut self) -> u16 {
        let frame = self.frames.last_mut().unwrap();
        let value = unsafe { (*(*frame.closure).function).chunk.read_u16(frame.ip) };
        frame.ip += 2;
        value
    }

    fn read_constant(&mut self) -> Value {
        let index = self.read_byte() as usize;
        unsafe { (*self.current_function()).chunk.constants()[index] }
    }

    fn read_string(&mut self) -> *mut ObjString {
        self.read_constant().as_obj() as *mut ObjString
    }

    fn run(&mut self) -> Result<(), RuntimeError> {
        loop {
            let op = OpCode::from_u8(self.read_byte());
            match op {
                OpCode::Constant => {
                    let value = self.read_constant();
                    self.push(value);
                }
                OpCode::Nil => self.push(Value::NIL),
                OpCode::True => self.push(Value::TRUE),
                OpCode::False => self.push(Value::FALSE),
                OpCode::Pop => {
                    self.pop();
                }
                OpCode::GetLocal => {
                    let slot = self.read_byte() as usize;
                    let base = self.frames.last().unwrap().slot_base;
                    self.push(self.stack[base + slot]);
                }
                OpCode::SetLocal => {
                    let slot = self.read_byte() as usize;
                    let base = self.frames.last().unwrap().slot_base;
                    self.stack[base + slot] = self.peek(0);
                }
                OpCode::GetGlobal => {
                    let name = self.read_string();
                    match self.globals.get(name) {
                        Some(value) => self.push(value),
                        None => {
                            let n = unsafe { (*name).as_str().to_string() };
                            return Err(RuntimeError::UndefinedVariable(n));
                        }
                    }
                }
                OpCode::DefineGlobal => {
                    let name = self.read_string();
                    self.globals.set(name, self.peek(0));
                    self.pop();
                }
                OpCode::SetGlobal => {
                    let name = self.read_string();
                    if self.globals.set(name, self.peek(0)) {
                        self.globals.delete(name);
                        let n = unsafe { (*name).as_str().to_string() };
                        return Err(RuntimeError::UndefinedVariable(n));
                    }
                }
                OpCode::GetUpvalue => {
                    let slot = self.read_byte() as usize;
                    let closure = self.frames.last().unwrap().closure;
                    let upvalue = unsafe { (*closure).upvalues[slot] };
                    self.push(self.read_upvalue(upvalue));
                }
                OpCode::SetUpvalue => {
                    let slot = self.read_byte() as usize;
                    let closure = self.frames.last().unwrap().closure;
                    let upvalue = unsafe { (*closure).upvalues[slot] };
                    let value = self.peek(0);
                    self.write_upvalue(upvalue, value);
                }
                OpCode::GetProperty => {
                    if !self.peek(0).is_obj_kind(ObjKind::Instance) {
                        return Err(RuntimeError::OnlyInstancesHaveProperties);
                    }
                    let instance = self.peek(0).as_obj() as *mut ObjInstance;
                    let name = self.read_string();
                    if let Some(value) = unsafe { (*instance).fields.get(name) } {
                        self.pop();
                        self.push(value);
                    } else {
                        self.bind_method(unsafe { (*instance).class }, name)?;
                    }
                }
                OpCode::SetProperty => {
                    if !self.peek(1).is_obj_kind(ObjKind::Instance) {
                        return Err(RuntimeError::OnlyInstancesHaveFields);
                    }
                    let instance = self.peek(1).as_obj() as *mut ObjInstance;
                    let name = self.read_string();
                    unsafe { (*instance).fields.set(name, self.peek(0)) };
                    let value = self.pop();
                    self.pop();
                    self.push(value);
                }
                OpCode::GetSuper => {
                    let name = self.read_string();
                    let superclass = self.pop().as_obj() as *mut ObjClass;
                    self.bind_method(superclass, name)?;
                }
                OpCode::Equal => {
                    let b = self.pop();
                    let a = self.pop();
                    self.push(Value::bool(a == b));
                }
                OpCode::NotEqual => {
                    let b = self.pop();
                    let a = self.pop();
                    self.push(Value::bool(a != b));
                }
                OpCode::Greater => self.binary_compare(|a, b| a > b)?,
                OpCode::GreaterEqual => self.binary_compare(|a, b| a >= b)?,
                OpCode::Less => self.binary_compare(|a, b| a < b)?,
                OpCode::LessEqual => self.binary_compare(|a, b| a <= b)?,
                OpCode::Add => self.add()?,
                OpCode::Subtract => self.binary_arith(|a, b| a - b)?,
                OpCode::Multiply => self.binary_arith(|a, b| a * b)?,
                OpCode::Divide => self.binary_arith(|a, b| a / b)?,
                OpCode::Not => {
                    let v = self.pop();
                    self.push(Value::bool(v.is_falsey()));
                }
                OpCode::Negate => {
                    if !self.peek(0).is_number() {
                        return Err(RuntimeError::OperandMustBeNumber);
                    }
                    let n = self.pop().as_number();
                    self.push(Value::number(-n));
                }
                OpCode::Print => {
                    let value = self.pop();
                    let _ = writeln!(self.output, "{}", Printable(value));
                }
                OpCode::Jump => {
                    let offset = self.read_u16();
                    self.frames.last_mut().unwrap().ip += offset as usize;
                }
                OpCode::JumpIfFalse => {
                    let offset = self.read_u16();
                    if self.peek(0).is_falsey() {
                        self.frames.last_mut().unwrap().ip += offset as usize;
                    }
                }
                OpCode::Loop => {
                    let offset = self.read_u16();
                    self.frames.last_mut().unwrap().ip -= offset as usize;
                }
                OpCode::Call => {
                    let arg_count = self.read_byte() as usize;
                    self.call_value(self.peek(arg_count), arg_count)?;
                }
                OpCode::Invoke => {
                    let method = self.read_string();
                    let arg_count = self.read_byte() as usize;
                    self.invoke(method, arg_count)?;
                }
                OpCode::SuperInvoke => {
                    let method = self.read_string();
                    let arg_count = self.read_byte() as usize;
                    let superclass = self.pop().as_obj() as *mut ObjClass;
                    self.invoke_from_class(superclass, method, arg_count)?;
                }
                OpCode::Closure => {
                    let function = self.read_constant().as_obj() as *mut ObjFunction;
                    let closure = self.heap.alloc_closure(function);
                    self.push(Value::object(closure as *mut Obj));
                    let upvalue_count = unsafe { (*function).upvalue_count };
                    for _ in 0..upvalue_count {
                        let is_local = self.read_byte();
                        let index = self.read_byte() as usize;
                        let upvalue = if is_local != 0 {
                            let base = self.frames.last().unwrap().slot_base;
                            self.capture_upvalue(base + index)
                        } else {
                            let enclosing = self.frames.last().unwrap().closure;
                            unsafe { (*enclosing).upvalues[index] }
                        };
                        unsafe { (*closure).upvalues.push(upvalue) };
                    }
                    self.maybe_collect();
                }
                OpCode::CloseUpvalue => {
                    let top = self.stack.len() - 1;
                    self.close_upvalues(top);
                    self.pop();
                }
                OpCode::Return => {
                    let result = self.pop();
                    let frame = self.frames.pop().unwrap();
                    self.close_upvalues(frame.slot_base);
                    if self.frames.is_empty() {
                        self.pop();
                        return Ok(());
                    }
                    self.stack.truncate(frame.slot_base);
                    self.push(result);
                }
                OpCode::Class => {
                    let name = self.read_string();
                    let class = self.heap.alloc_class(name);
                    self.push(Value::object(class as *mut Obj));
                    self.maybe_collect();
                }
                OpCode::Inherit => {
                    if !self.peek(1).is_obj_kind(ObjKind::Class) {
                        return Err(RuntimeError::SuperclassMustBeAClass);
                    }
                    let superclass = self.peek(1).as_obj() as *mut ObjClass;
                    let subclass = self.peek(0).as_obj() as *mut ObjClass;
                    let methods = unsafe { (*superclass).methods.iter().collect::<Vec<_>>() };
                    for (key, value) in methods {
                        unsafe { (*subclass).methods.set(key, value) };
                    }
                    self.pop();
                }
                OpCode::Method => {
                    let name = self.read_string();
                    self.define_method(name);
                }
                OpCode::Ternary => unreachable!("OP_TERNARY is never emitted"),
            }
        }
    }

    fn binary_arith(&mut self, op: fn(f64, f64) -> f64) -> Result<(), RuntimeError> {
        if !self.peek(0).is_number() || !self.peek(1).is_number() {
            return Err(RuntimeError::OperandsMustBeNumbers);
        }
        let b = self.pop().as_number();
        let a = self.pop().as_number();
        self.push(Value::number(op(a, b)));
        Ok(())
    }

    fn binary_compare(&mut self, op: fn(f64, f64) -> bool) -> Result<(), RuntimeError> {
        if !self.peek(0).is_number() || !self.peek(1).is_number() {
            return Err(RuntimeError::OperandsMustBeNumbers);
        }
        let b = self.pop().as_number();
        let a = self.pop().as_number();
        self.push(Value::bool(op(a, b)));
        Ok(())
    }

    fn add(&mut self) -> Result<(), RuntimeError> {
        if self.peek(0).is_obj_kind(ObjKind::String) && self.peek(1).is_obj_kind(ObjKind::String) {
            self.concatenate();
            Ok(())
        } else if self.peek(0).is_number() && self.peek(1).is_number() {
            let b = self.pop().as_number();
            let a = self.pop().as_number();
            self.push(Value::number(a + b));
            Ok(())
        } else {
            Err(RuntimeError::OperandsMustBeNumbersOrStrings)
        }
    }

    fn concatenate(&mut self) {
        let b = self.peek(0).as_obj() as *mut ObjString;
        let a = self.peek(1).as_obj() as *mut ObjString;
        let mut bytes = Vec::with_capacity(unsafe { (*a).bytes.len() + (*b).bytes.len() });
        unsafe {
            bytes.extend_from_slice(&(*a).bytes);
            bytes.extend_from_slice(&(*b).bytes);
        }
        let result = self.heap.intern(&bytes);
        self.pop();
        self.pop();
        self.push(Value::object(result as *mut Obj));
        self.maybe_collect();
    }

    fn call(&mut self, closure: *mut ObjClosure, arg_count: usize) -> Result<(), RuntimeError> {
        let function = unsafe { (*closure).function };
        let arity = unsafe { (*function).arity } as usize;
        if arg_count != arity {
            return Err(RuntimeError::ArityMismatch { expected: arity as u8, got: arg_count as u8 });
        }
        if self.frames.len() == FRAMES_MAX {
            return Err(RuntimeError::StackOverflow);
        }
        let slot_base = self.stack.len() - arg_count - 1;
        self.frames.push(CallFrame { closure, ip: 0, slot_base });
        Ok(())
    }

    fn call_value(&mut self, callee: Value, arg_count: usize) -> Result<(), RuntimeError> {
        if callee.is_obj() {
            let obj = callee.as_obj();
            match unsafe { (*obj).kind } {
                ObjKind::BoundMethod => {
                    let bound = obj as *mut ObjBoundMethod;
                    let idx = self.stack.len() - arg_count - 1;
                    self.stack[idx] = unsafe { (*bound).receiver };
                    return self.call(unsafe { (*bound).method }, arg_count);
                }
                ObjKind::Class => {
                    let class = obj as *mut ObjClass;
                    let instance = self.heap.alloc_instance(class);
                    let idx = self.stack.len() - arg_count - 1;
                    self.stack[idx] = Value::object(instance as *mut Obj);
                    self.maybe_collect();
                    // A Non-goal-scoped redesign: instantiation always
                    // completes the call here, whether or not an `init`
                    // exists, instead of falling through to treat the
                    // class object itself as a closure when arg_count is
                    // zero and no initializer is defined.
                    if let Some(initializer) = unsafe { (*class).methods.get(self.init_string) } {
                        return self.call(initializer.as_obj() as *mut ObjClosure, arg_count);
                    } else if arg_count != 0 {
                        return Err(RuntimeError::ArityMismatch { expected: 0, got: arg_count as u8 });
                    }
                    return Ok(());
                }
                ObjKind::Closure => return self.call(obj as *mut ObjClosure, arg_count),
                ObjKind::Native => {
                    let native = obj as *mut crate::object::ObjNative;
                    let start = self.stack.len() - arg_count;
                    let args: Vec<Value> = self.stack[start..].to_vec();
                    let expected = unsafe { (*native).arity };
                    if expected as usize != arg_count {
                        return Err(RuntimeError::ArityMismatch { expected, got: arg_count as u8 });
                    }
                    let result = (unsafe { (*native).function })(&args)?;
                    self.stack.truncate(self.stack.len() - arg_count - 1);
                    self.push(result);
                    return Ok(());
                }
                _ => {}
            }
        }
        Err(RuntimeError::NotCallable)
    }

    fn invoke_from_class(
        &mut self,
        class: *mut ObjClass,
        name: *mut ObjString,
        arg_count: usize,
    ) -> Result<(), RuntimeError> {
        let method = unsafe { (*class).methods.get(name) }.ok_or_else(|| {
            RuntimeError::UndefinedProperty(unsafe { (*name).as_str().to_string() })
        })?;
        self.call(method.as_obj() as *mut ObjClosure, arg_count)
    }

    fn invoke(&mut self, name: *mut ObjString, arg_count: usize) -> Result<(), RuntimeError> {
        let receiver = self.peek(arg_count);
        if !receiver.is_obj_kind(ObjKind::Instance) {
            return Err(RuntimeError::OnlyInstancesHaveMethods);
        }
        let instance = receiver.as_obj() as *mut ObjInstance;
        if let Some(value) = unsafe { (*instance).fields.get(name) } {
            let idx = self.stack.len() - arg_count - 1;
            self.stack[idx] = value;
            return self.call_value(value, arg_count);
        }
        self.invoke_from_class(unsafe { (*instance).class }, name, arg_count)
    }

    fn define_method(&mut self, name: *mut ObjString) {
        let method = self.peek(0);
        let class = self.peek(1).as_obj() as *mut ObjClass;
        unsafe { (*class).methods.set(name, method) };
        self.pop();
    }

    fn bind_method(&mut self, class: *mut ObjClass, name: *mut ObjString) -> Result<(), RuntimeError> {
        let method = unsafe { (*class).methods.get(name) }.ok_or_else(|| {
            RuntimeError::UndefinedProperty(unsafe { (*name).as_str().to_string() })
        })?;
        let bound = self.heap.alloc_bound_method(self.peek(0), method.as_obj() as *mut ObjClosure);
        self.pop();
        self.push(Value::object(bound as *mut Obj));
        self.maybe_collect();
        Ok(())
    }

    /// Finds-or-creates the upvalue for stack slot `index`, keeping
    /// `open_upvalues` sorted by descending index so a later binary-style
    /// scan always lands at the right insertion point, matching the
    /// reference's address-ordered linked list.
    fn capture_upvalue(&mut self, index: usize) -> *mut ObjUpvalue {
        let pos = self.open_upvalues.iter().position(|&uv| {
            let loc = unsafe { &*(*uv).location.as_ptr() };
            matches!(loc, UpvalueLocation::Open(i) if *i <= index)
        });
        if let Some(pos) = pos {
            let existing = self.open_upvalues[pos];
            let loc = unsafe { &*(*existing).location.as_ptr() };
            if matches!(loc, UpvalueLocation::Open(i) if *i == index) {
                return existing;
            }
            let created = self.heap.alloc_upvalue(index);
            self.open_upvalues.insert(pos, created);
            created
        } else {
            let created = self.heap.alloc_upvalue(index);
            self.open_upvalues.push(created);
            created
        }
    }

    /// Closes every open upvalue whose captured slot is `>= from`, copying
    /// the live stack value into the upvalue's own storage so it survives
    /// the frame that owned the slot returning.
    fn close_upvalues(&mut self, from: usize) {
        let stack = &self.stack;
        self.open_upvalues.retain(|&uv| {
            let index = match unsafe { &*(*uv).location.as_ptr() } {
                UpvalueLocation::Open(i) => *i,
                UpvalueLocation::Closed(_) => return true,
            };
            if index >= from {
                let value = stack[index];
                unsafe { (*uv).location.set(UpvalueLocation::Closed(value)) };
                false
            } else {
                true
            }
        });
    }

    fn read_upvalue(&self, upvalue: *mut ObjUpvalue) -> Value {
        match unsafe { &*(*upvalue).location.as_ptr() } {
            UpvalueLocation::Open(index) => self.stack[*index],
            UpvalueLocation::Closed(value) => *value,
        }
    }

    fn write_upvalue(&mut self, upvalue: *mut ObjUpvalue, value: Value) {
        let index = match unsafe { &*(*upvalue).location.as_ptr() } {
            UpvalueLocation::Open(index) => Some(*index),
            UpvalueLocation::Closed(_) => None,
        };
        match index {
            Some(index) => self.stack[index] = value,
            None => unsafe { (*upvalue).location.set(UpvalueLocation::Closed(value)) },
        }
    }
}

/// A thin window onto `Vm::frames` exposing only what the collector needs
/// (the owning closure), so `gc.rs` doesn't need `CallFrame` to be public.
pub(crate) struct FrameClosures<'a>(&'a [CallFrame]);

impl<'a> FrameClosures<'a> {
    pub(crate) fn iter(&self) -> impl Iterator<Item = &'a CallFrame> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for FrameClosures<'a> {
    type Item = &'a CallFrame;
    type IntoIter = core::slice::Iter<'a, CallFrame>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

struct Printable(Value);
impl core::fmt::Display for Printable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        print_value(f, self.0)
    }
}

#[cfg(test)]
mod vm_test;
