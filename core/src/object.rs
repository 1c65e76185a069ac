//! Heap object header and the concrete object kinds built on top of it.
//!
//! Every heap value — string, function, closure, class, instance, bound
//! method, upvalue, native — is a separately `Box`-allocated Rust struct
//! whose first field is an [`Obj`] header, mirroring the reference VM's
//! `struct Obj obj;`-as-first-field convention. That shared prefix is what
//! lets [`Value::as_obj`](crate::value::Value::as_obj) hand back a single
//! `*mut Obj` regardless of kind, and lets the collector walk a single
//! intrusive linked list of every live object without knowing its concrete
//! type until it inspects `kind`.

use core::cell::Cell;
use core::fmt;

use crate::chunk::Chunk;
use crate::diagnostics::RuntimeError;
use crate::table::Table;
use crate::value::Value;

/// Discriminant stored in every object's header, checked by
/// [`Value::is_obj_kind`](crate::value::Value::is_obj_kind) before a caller
/// casts a `*mut Obj` down to a concrete type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjKind {
    BoundMethod,
    Instance,
    Class,
    Closure,
    Upvalue,
    Function,
    Native,
    String,
}

impl ObjKind {
    pub fn name(self) -> &'static str {
        match self {
            ObjKind::BoundMethod => "bound method",
            ObjKind::Instance => "instance",
            ObjKind::Class => "class",
            ObjKind::Closure => "closure",
            ObjKind::Upvalue => "upvalue",
            ObjKind::Function => "function",
            ObjKind::Native => "native function",
            ObjKind::String => "string",
        }
    }
}

/// Header shared by every heap object. `marked` and `next` are `Cell`s
/// rather than plain fields because the collector walks the object list and
/// flips marks through a shared `*mut Obj`, never through a unique
/// reference — there is no safe way to hand out `&mut` into a graph with
/// arbitrary back-edges (`Upvalue`s, `super`, closures over the same
/// function).
#[repr(C)]
pub struct Obj {
    pub kind: ObjKind,
    pub marked: Cell<bool>,
    pub next: Cell<*mut Obj>,
}

impl Obj {
    fn new(kind: ObjKind) -> Obj {
        Obj { kind, marked: Cell::new(false), next: Cell::new(core::ptr::null_mut()) }
    }
}

#[repr(C)]
pub struct ObjString {
    pub obj: Obj,
    pub hash: u32,
    pub bytes: Box<[u8]>,
}

impl ObjString {
    pub(crate) fn new(bytes: Box<[u8]>, hash: u32) -> ObjString {
        ObjString { obj: Obj::new(ObjKind::String), hash, bytes }
    }

    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.bytes).unwrap_or("<invalid utf-8>")
    }
}

/// FNV-1a, matching the reference implementation's `hashString` exactly so
/// the same source text always hashes to the same bucket regardless of
/// which side of the port produced it.
pub fn hash_bytes(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 2166136261;
    for &b in bytes {
        hash ^= b as u32;
        hash = hash.wrapping_mul(16777619);
    }
    hash
}

#[repr(C)]
pub struct ObjFunction {
    pub obj: Obj,
    pub arity: u8,
    pub upvalue_count: usize,
    pub chunk: Chunk,
    /// `None` for the implicit top-level script function.
    pub name: Option<*mut ObjString>,
}

impl ObjFunction {
    pub(crate) fn new() -> ObjFunction {
        ObjFunction {
            obj: Obj::new(ObjKind::Function),
            arity: 0,
            upvalue_count: 0,
            chunk: Chunk::new(),
            name: None,
        }
    }

    pub fn name_str(&self) -> &str {
        match self.name {
            Some(s) => unsafe { (*s).as_str() },
            None => "<script>",
        }
    }
}

pub type NativeFn = fn(&[Value]) -> Result<Value, RuntimeError>;

#[repr(C)]
pub struct ObjNative {
    pub obj: Obj,
    pub function: NativeFn,
    pub name: &'static str,
    pub arity: u8,
}

impl ObjNative {
    pub(crate) fn new(name: &'static str, arity: u8, function: NativeFn) -> ObjNative {
        ObjNative { obj: Obj::new(ObjKind::Native), function, name, arity }
    }
}

/// An upvalue's slot is identified by stack index while it is "open"
/// (still live on the VM stack) and switches to holding the value directly
/// once the frame that owned the slot returns. Indices rather than raw
/// pointers into the stack, because the stack is a growable `Vec<Value>`
/// that can reallocate and invalidate any pointer into it — see
/// SPEC_FULL.md's design notes on `CallFrame` addressing.
pub enum UpvalueLocation {
    Open(usize),
    Closed(Value),
}

#[repr(C)]
pub struct ObjUpvalue {
    pub obj: Obj,
    pub location: Cell<UpvalueLocation>,
}

impl ObjUpvalue {
    pub(crate) fn new(stack_index: usize) -> ObjUpvalue {
        ObjUpvalue { obj: Obj::new(ObjKind::Upvalue), location: Cell::new(UpvalueLocation::Open(stack_index)) }
    }
}

#[repr(C)]
pub struct ObjClosure {
    pub obj: Obj,
    pub function: *mut ObjFunction,
    pub upvalues: Vec<*mut ObjUpvalue>,
}

impl ObjClosure {
    pub(crate) fn new(function: *mut ObjFunction) -> ObjClosure {
        let upvalue_count = unsafe { (*function).upvalue_count };
        ObjClosure {
            obj: Obj::new(ObjKind::Closure),
            function,
            upvalues: Vec::with_capacity(upvalue_count),
        }
    }
}

#[repr(C)]
pub struct ObjClass {
    pub obj: Obj,
    pub name: *mut ObjString,
    pub methods: Table,
}

impl ObjClass {
    pub(crate) fn new(name: *mut ObjString) -> ObjClass {
        ObjClass { obj: Obj::new(ObjKind::Class), name, methods: Table::new() }
    }
}

#[repr(C)]
pub struct ObjInstance {
    pub obj: Obj,
    pub class: *mut ObjClass,
    pub fields: Table,
}

impl ObjInstance {
    pub(crate) fn new(class: *mut ObjClass) -> ObjInstance {
        ObjInstance { obj: Obj::new(ObjKind::Instance), class, fields: Table::new() }
    }
}

#[repr(C)]
pub struct ObjBoundMethod {
    pub obj: Obj,
    pub receiver: Value,
    pub method: *mut ObjClosure,
}

impl ObjBoundMethod {
    pub(crate) fn new(receiver: Value, method: *mut ObjClosure) -> ObjBoundMethod {
        ObjBoundMethod { obj: Obj::new(ObjKind::BoundMethod), receiver, method }
    }
}

/// Renders a value the way `print` statements and the REPL do. Lives here
/// rather than as a blanket `Display for Value` because printing an object
/// requires dispatching on `ObjKind` and casting the erased `*mut Obj`,
/// which only this module (and `heap`) are trusted to do.
pub fn print_value(f: &mut fmt::Formatter<'_>, value: Value) -> fmt::Result {
    if value.is_number() {
        let n = value.as_number();
        if n == n.trunc() && n.is_finite() && n.abs() < 1e15 {
            write!(f, "{}", n as i64)
        } else if !n.is_finite() {
            write!(f, "{n}")
        } else {
            write!(f, "{}", format_g(n))
        }
    } else if value.is_nil() {
        write!(f, "nil")
    } else if value.is_bool() {
        write!(f, "{}", value.as_bool())
    } else {
        print_object(f, value.as_obj())
    }
}

/// Formats a finite, non-integral number the way the reference
/// implementation's `printValue` does via C's `%g`: 6 significant digits,
/// switching to scientific notation outside `[1e-4, 1e6)`, with trailing
/// zeros (and a now-bare trailing decimal point) stripped.
fn format_g(n: f64) -> String {
    const SIG_DIGITS: i32 = 6;
    let exponent = n.abs().log10().floor() as i32;
    if exponent < -4 || exponent >= SIG_DIGITS {
        let formatted = format!("{:.*e}", (SIG_DIGITS - 1) as usize, n);
        let (mantissa, exp) = formatted.split_once('e').expect("Rust `{:e}` always contains 'e'");
        let exp: i32 = exp.parse().expect("Rust `{:e}` exponent is always an integer");
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_trailing_zeros(mantissa), exp.abs())
    } else {
        let decimals = (SIG_DIGITS - 1 - exponent).max(0) as usize;
        trim_trailing_zeros(&format!("{n:.decimals$}"))
    }
}

fn trim_trailing_zeros(s: &str) -> String {
    if !s.contains('.') {
        return s.to_string();
    }
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn print_object(f: &mut fmt::Formatter<'_>, obj: *mut Obj) -> fmt::Result {
    unsafe {
        match (*obj).kind {
            ObjKind::String => write!(f, "{}", (*(obj as *mut ObjString)).as_str()),
            ObjKind::Function => write!(f, "<fn {}>", (*(obj as *mut ObjFunction)).name_str()),
            ObjKind::Native => write!(f, "<native fn {}>", (*(obj as *mut ObjNative)).name),
            ObjKind::Closure => {
                write!(f, "<fn {}>", (*(*(obj as *mut ObjClosure)).function).name_str())
            }
            ObjKind::Upvalue => write!(f, "<upvalue>"),
            ObjKind::Class => {
                let class = &*(obj as *mut ObjClass);
                write!(f, "{}", (*class.name).as_str())
            }
            ObjKind::Instance => {
                let instance = &*(obj as *mut ObjInstance);
                write!(f, "{} instance", (*(*instance.class).name).as_str())
            }
            ObjKind::BoundMethod => {
                let bound = &*(obj as *mut ObjBoundMethod);
                let function = (*bound.method).function;
                write!(f, "<fn {}>", (*function).name_str())
            }
        }
    }
}
