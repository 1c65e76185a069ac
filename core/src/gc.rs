//! Tri-color mark-and-sweep, run stop-the-world from a single entry point:
//! [`collect_garbage`]. Grounded directly in `markRoots` /
//! `traceReferences` / `blackenObject` / `sweep` of the reference
//! implementation; the only structural change is an explicit gray `Vec`
//! passed through the call chain instead of `vm.grayStack`/`vm.grayCount`
//! globals.

use tracing::debug;

use crate::object::{
    Obj, ObjBoundMethod, ObjClass, ObjClosure, ObjFunction, ObjInstance, ObjKind, ObjUpvalue,
    UpvalueLocation,
};
use crate::table::Table;
use crate::value::Value;
use crate::vm::Vm;

pub fn collect_garbage(vm: &mut Vm) {
    let before = vm.heap.bytes_allocated();
    debug!(bytes_before = before, "gc begin");

    let mut gray: Vec<*mut Obj> = Vec::new();
    mark_roots(vm, &mut gray);
    trace_references(&mut gray);
    vm.heap.strings_mut().remove_unmarked();
    vm.heap.sweep();
    vm.heap.set_next_gc_after_sweep();

    debug!(
        collected = before.saturating_sub(vm.heap.bytes_allocated()),
        bytes_after = vm.heap.bytes_allocated(),
        next_gc = vm.heap.next_gc(),
        "gc end"
    );
}

fn mark_roots(vm: &Vm, gray: &mut Vec<*mut Obj>) {
    for &value in vm.stack_slice() {
        mark_value(value, gray);
    }
    for frame in vm.frames_slice() {
        mark_object(frame.closure as *mut Obj, gray);
    }
    for &upvalue in vm.open_upvalues_slice() {
        mark_object(upvalue as *mut Obj, gray);
    }
    mark_table(vm.globals_table(), gray);
    mark_object(vm.init_string() as *mut Obj, gray);
    for &function in vm.compiling_slice() {
        mark_object(function as *mut Obj, gray);
    }
}

fn trace_references(gray: &mut Vec<*mut Obj>) {
    while let Some(obj) = gray.pop() {
        blacken_object(obj, gray);
    }
}

pub fn mark_value(value: Value, gray: &mut Vec<*mut Obj>) {
    if value.is_obj() {
        mark_object(value.as_obj(), gray);
    }
}

pub fn mark_object(obj: *mut Obj, gray: &mut Vec<*mut Obj>) {
    if obj.is_null() {
        return;
    }
    let marked = unsafe { &(*obj).marked };
    if marked.get() {
        return;
    }
    marked.set(true);
    gray.push(obj);
}

fn mark_table(table: &Table, gray: &mut Vec<*mut Obj>) {
    for (key, value) in table.iter() {
        mark_object(key as *mut Obj, gray);
        mark_value(value, gray);
    }
}

fn blacken_object(obj: *mut Obj, gray: &mut Vec<*mut Obj>) {
    unsafe {
        match (*obj).kind {
            ObjKind::BoundMethod => {
                let bound = &*(obj as *mut ObjBoundMethod);
                mark_value(bound.receiver, gray);
                mark_object(bound.method as *mut Obj, gray);
            }
            ObjKind::Instance => {
                let instance = &*(obj as *mut ObjInstance);
                mark_object(instance.class as *mut Obj, gray);
                mark_table(&instance.fields, gray);
            }
            ObjKind::Class => {
                let class = &*(obj as *mut ObjClass);
                mark_object(class.name as *mut Obj, gray);
                mark_table(&class.methods, gray);
            }
            ObjKind::Closure => {
                let closure = &*(obj as *mut ObjClosure);
                mark_object(closure.function as *mut Obj, gray);
                for &upvalue in &closure.upvalues {
                    mark_object(upvalue as *mut Obj, gray);
                }
            }
            ObjKind::Function => {
                let function = &*(obj as *mut ObjFunction);
                if let Some(name) = function.name {
                    mark_object(name as *mut Obj, gray);
                }
                for &constant in function.chunk.constants() {
                    mark_value(constant, gray);
                }
            }
            ObjKind::Upvalue => {
                let upvalue = &*(obj as *mut ObjUpvalue);
                // SAFETY: no other reference to this cell is live during GC.
                let location = &*upvalue.location.as_ptr();
                if let UpvalueLocation::Closed(value) = location {
                    mark_value(*value, gray);
                }
            }
            ObjKind::Native | ObjKind::String => {}
        }
    }
}
