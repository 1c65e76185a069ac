//! Object allocation and the intrusive list of every live heap object.
//!
//! Mirrors `reallocate`/`vm.objects`/`vm.bytesAllocated`/`vm.nextGC` from
//! the reference implementation, but delegates the actual bytes to Rust's
//! global allocator via `Box` instead of a hand-rolled TLSF pool — a
//! process-level memory pool is explicitly out of scope (see
//! `DESIGN.md`), and `Box`/`Vec` already give per-object free on drop,
//! which is all the collector needs.

use core::cell::Cell;

use tracing::trace;

use crate::object::{
    Obj, ObjBoundMethod, ObjClass, ObjClosure, ObjFunction, ObjInstance, ObjKind, ObjNative,
    ObjString, ObjUpvalue, hash_bytes,
};
use crate::table::Table;
use crate::value::Value;

const INITIAL_NEXT_GC: usize = 1024 * 1024;
const GC_HEAP_GROW_FACTOR: usize = 2;

pub struct Heap {
    objects: Cell<*mut Obj>,
    bytes_allocated: Cell<usize>,
    next_gc: Cell<usize>,
    strings: Table,
    /// When set, every allocation triggers a full collection instead of
    /// only when `bytes_allocated` crosses `next_gc` — the `stress_gc`
    /// feature's hook, exercised by tests that need the collector to run
    /// deterministically on every object birth.
    stress: bool,
}

impl Heap {
    pub fn new(stress: bool) -> Heap {
        Heap {
            objects: Cell::new(core::ptr::null_mut()),
            bytes_allocated: Cell::new(0),
            next_gc: Cell::new(INITIAL_NEXT_GC),
            strings: Table::new(),
            stress,
        }
    }

    pub fn bytes_allocated(&self) -> usize {
        self.bytes_allocated.get()
    }

    pub fn next_gc(&self) -> usize {
        self.next_gc.get()
    }

    pub fn set_next_gc_after_sweep(&self) {
        self.next_gc.set(self.bytes_allocated.get() * GC_HEAP_GROW_FACTOR);
    }

    pub fn should_collect(&self) -> bool {
        self.stress || self.bytes_allocated.get() > self.next_gc.get()
    }

    pub fn objects_head(&self) -> *mut Obj {
        self.objects.get()
    }

    pub fn strings(&self) -> &Table {
        &self.strings
    }

    pub fn strings_mut(&mut self) -> &mut Table {
        &mut self.strings
    }

    fn track<T>(&self, boxed: Box<T>) -> *mut T {
        self.bytes_allocated.set(self.bytes_allocated.get() + core::mem::size_of::<T>());
        let ptr = Box::into_raw(boxed);
        let obj_ptr = ptr as *mut Obj;
        unsafe {
            (*obj_ptr).next.set(self.objects.get());
        }
        self.objects.set(obj_ptr);
        ptr
    }

    /// Accounts a variable-length backing buffer that rides along with a
    /// fixed-size header `track`ed above (a string's bytes, a closure's
    /// upvalue vector) — `size_of::<T>()` alone only counts the header,
    /// not the separate heap buffer it owns.
    fn track_extra(&self, bytes: usize) {
        self.bytes_allocated.set(self.bytes_allocated.get() + bytes);
    }

    /// Interns `bytes`: returns the existing canonical `ObjString` if an
    /// equal one is already in the string table, otherwise allocates one
    /// and inserts it. Every string the VM ever produces — literals,
    /// concatenation results, identifier names — goes through here so
    /// string equality can always be pointer equality.
    pub fn intern(&mut self, bytes: &[u8]) -> *mut ObjString {
        let hash = hash_bytes(bytes);
        if let Some(existing) = self.strings.find_string(bytes, hash) {
            return existing;
        }
        let len = bytes.len();
        let obj = self.track(Box::new(ObjString::new(bytes.into(), hash)));
        self.track_extra(len);
        trace!(bytes = ?core::str::from_utf8(bytes).unwrap_or("<binary>"), "interning new string");
        self.strings.set(obj, Value::NIL);
        obj
    }

    pub fn alloc_function(&self) -> *mut ObjFunction {
        self.track(Box::new(ObjFunction::new()))
    }

    pub fn alloc_native(
        &self,
        name: &'static str,
        arity: u8,
        function: crate::object::NativeFn,
    ) -> *mut ObjNative {
        self.track(Box::new(ObjNative::new(name, arity, function)))
    }

    pub fn alloc_closure(&self, function: *mut ObjFunction) -> *mut ObjClosure {
        let closure = self.track(Box::new(ObjClosure::new(function)));
        let capacity = unsafe { (*closure).upvalues.capacity() };
        self.track_extra(capacity * core::mem::size_of::<*mut ObjUpvalue>());
        closure
    }

    pub fn alloc_upvalue(&self, stack_index: usize) -> *mut ObjUpvalue {
        self.track(Box::new(ObjUpvalue::new(stack_index)))
    }

    pub fn alloc_class(&self, name: *mut ObjString) -> *mut ObjClass {
        self.track(Box::new(ObjClass::new(name)))
    }

    pub fn alloc_instance(&self, class: *mut ObjClass) -> *mut ObjInstance {
        self.track(Box::new(ObjInstance::new(class)))
    }

    pub fn alloc_bound_method(&self, receiver: Value, method: *mut ObjClosure) -> *mut ObjBoundMethod {
        self.track(Box::new(ObjBoundMethod::new(receiver, method)))
    }

    /// Unlinks every unmarked object from the intrusive list and drops it,
    /// mirroring `sweep`'s singly-linked-list splice. Marks are cleared on
    /// survivors as they're walked, matching the reference sweep exactly.
    pub fn sweep(&mut self) {
        let mut previous: *mut Obj = core::ptr::null_mut();
        let mut current = self.objects.get();
        while !current.is_null() {
            let next = unsafe { (*current).next.get() };
            if unsafe { (*current).marked.get() } {
                unsafe { (*current).marked.set(false) };
                previous = current;
                current = next;
            } else {
                if previous.is_null() {
                    self.objects.set(next);
                } else {
                    unsafe { (*previous).next.set(next) };
                }
                free_object(current, &mut self.bytes_allocated);
                current = next;
            }
        }
    }
}

impl Drop for Heap {
    fn drop(&mut self) {
        let mut current = self.objects.get();
        while !current.is_null() {
            let next = unsafe { (*current).next.get() };
            free_object(current, &mut self.bytes_allocated);
            current = next;
        }
    }
}

fn free_object(obj: *mut Obj, bytes_allocated: &mut Cell<usize>) {
    let kind = unsafe { (*obj).kind };
    macro_rules! drop_as {
        ($ty:ty) => {{
            bytes_allocated.set(bytes_allocated.get().saturating_sub(core::mem::size_of::<$ty>()));
            drop(unsafe { Box::from_raw(obj as *mut $ty) });
        }};
    }
    match kind {
        ObjKind::BoundMethod => drop_as!(ObjBoundMethod),
        ObjKind::Instance => drop_as!(ObjInstance),
        ObjKind::Class => drop_as!(ObjClass),
        ObjKind::Closure => {
            let capacity = unsafe { (*(obj as *mut ObjClosure)).upvalues.capacity() };
            bytes_allocated.set(
                bytes_allocated.get().saturating_sub(capacity * core::mem::size_of::<*mut ObjUpvalue>()),
            );
            drop_as!(ObjClosure)
        }
        ObjKind::Upvalue => drop_as!(ObjUpvalue),
        ObjKind::Function => drop_as!(ObjFunction),
        ObjKind::Native => drop_as!(ObjNative),
        ObjKind::String => {
            let len = unsafe { (*(obj as *mut ObjString)).bytes.len() };
            bytes_allocated.set(bytes_allocated.get().saturating_sub(len));
            drop_as!(ObjString)
        }
    }
}

#[cfg(test)]
mod heap_test;
