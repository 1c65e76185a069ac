//! Structured error types for both pipeline stages. The reference
//! implementation reports errors by writing straight to `stderr` from deep
//! inside the compiler/VM; this crate instead collects them as typed values
//! (`thiserror`-derived, the way the teacher crate's active error path —
//! `evaluator::error` — is hand-rolled `Display` but still a single
//! enum-per-stage) so an embedding host or `miette`-based CLI can render
//! them however it likes.

use thiserror::Error;

/// One lexical/parse/semantic error discovered while compiling a chunk.
/// The compiler does not stop at the first one: like the reference
/// `synchronize()`, it keeps parsing after an error to report as many as
/// it can in one pass, then refuses to hand back a chunk if any occurred.
#[derive(Debug, Error, Clone, PartialEq)]
#[error(
    "[line {line} column {column}] Error{}: {message}",
    at.as_ref().map(|a| format!(" at {a}")).unwrap_or_default()
)]
pub struct CompileError {
    pub line: u32,
    pub column: u32,
    pub at: Option<String>,
    pub message: String,
}

/// Errors raised while executing already-compiled bytecode.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("Operands must be numbers.")]
    OperandsMustBeNumbers,

    #[error("Operand must be a number.")]
    OperandMustBeNumber,

    #[error("Operands must be two numbers or two strings.")]
    OperandsMustBeNumbersOrStrings,

    #[error("Undefined variable '{0}'.")]
    UndefinedVariable(String),

    #[error("Undefined property '{0}'.")]
    UndefinedProperty(String),

    #[error("Only instances have properties.")]
    OnlyInstancesHaveProperties,

    #[error("Only instances have fields.")]
    OnlyInstancesHaveFields,

    #[error("Only instances have methods.")]
    OnlyInstancesHaveMethods,

    #[error("Superclass must be a class.")]
    SuperclassMustBeAClass,

    #[error("Expected {expected} arguments but got {got}.")]
    ArityMismatch { expected: u8, got: u8 },

    #[error("Can only call functions and classes.")]
    NotCallable,

    #[error("Stack overflow.")]
    StackOverflow,

    /// Raised by a native function body (e.g. a bad argument type); see
    /// `crate::native`. Not present in the reference VM, which gives
    /// native functions no way to fail — added because a fallible native
    /// surface is unavoidable once natives do anything beyond `clock()`.
    #[error("{0}")]
    Native(String),
}

/// One entry of a runtime error's stack trace, rendered the way
/// `runtimeError`'s frame-walking loop in the reference VM prints each
/// active call: `[line N] in name()` (or `script` at the top level).
#[derive(Debug, Clone, PartialEq)]
pub struct TraceFrame {
    pub line: u32,
    pub function_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeErrorReport {
    pub error: RuntimeError,
    pub trace: Vec<TraceFrame>,
}

impl core::fmt::Display for RuntimeErrorReport {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "{}", self.error)?;
        for frame in &self.trace {
            match &frame.function_name {
                Some(name) => writeln!(f, "[line {}] in {name}()", frame.line)?,
                None => writeln!(f, "[line {}] in script", frame.line)?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum InterpretError {
    #[error("compile error")]
    Compile(Vec<CompileError>),
    #[error("runtime error")]
    Runtime(RuntimeErrorReport),
}

pub type InterpretResult<T> = Result<T, InterpretError>;
