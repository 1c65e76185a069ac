//! Single-pass compiler: scans tokens and emits bytecode directly, with no
//! intermediate AST. Grounded in the reference implementation's
//! `compiler.c` (`compiler`/`parsePrecedence`/the `rules[]` table) but
//! restructured so the chain of enclosing functions is an explicit `Vec`
//! (`Compiler::funcs`) rather than a linked list of stack-allocated C
//! structs threaded through `current`.

use crate::chunk::OpCode;
use crate::diagnostics::CompileError;
use crate::object::{Obj, ObjFunction};
use crate::scanner::{Scanner, Token, TokenKind};
use crate::value::Value;
use crate::vm::Vm;

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
enum Precedence {
    None,
    Assignment,
    Or,
    And,
    Equality,
    Comparison,
    Term,
    Factor,
    Unary,
    Call,
    Primary,
}

impl Precedence {
    /// The precedence one step higher, used when parsing a left-associative
    /// binary operator's right-hand operand.
    fn higher(self) -> Precedence {
        match self {
            Precedence::None => Precedence::Assignment,
            Precedence::Assignment => Precedence::Or,
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Equality,
            Precedence::Equality => Precedence::Comparison,
            Precedence::Comparison => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor => Precedence::Unary,
            Precedence::Unary => Precedence::Call,
            Precedence::Call => Precedence::Primary,
            Precedence::Primary => Precedence::Primary,
        }
    }
}

type ParseFn<'src, 'vm> = fn(&mut Compiler<'src, 'vm>, bool);

struct ParseRule<'src, 'vm> {
    prefix: Option<ParseFn<'src, 'vm>>,
    infix: Option<ParseFn<'src, 'vm>>,
    precedence: Precedence,
}

#[derive(Clone, Copy, PartialEq)]
enum FunctionType {
    Script,
    Function,
    Method,
    Initializer,
}

struct Local<'src> {
    name: &'src str,
    /// -1 while the variable's initializer is still being compiled, so a
    /// reference to it in its own initializer (`var a = a;`) is caught.
    depth: i32,
    is_captured: bool,
}

#[derive(Clone, Copy)]
struct UpvalueDesc {
    index: u8,
    is_local: bool,
}

struct LoopScope {
    loop_start: usize,
    /// Scope depth at the point the loop was entered — locals declared
    /// deeper than this need an explicit pop/close before a `break` or
    /// `continue` jumps past their scope.
    scope_depth: i32,
    break_jumps: Vec<usize>,
}

struct FuncState<'src> {
    function: *mut ObjFunction,
    function_type: FunctionType,
    locals: Vec<Local<'src>>,
    scope_depth: i32,
    upvalues: Vec<UpvalueDesc>,
    loops: Vec<LoopScope>,
}

impl<'src> FuncState<'src> {
    fn new(function: *mut ObjFunction, function_type: FunctionType) -> FuncState<'src> {
        // Slot 0 is reserved: the receiver in methods/initializers, an
        // unnamed placeholder everywhere else (the script or a plain
        // function can never refer to it by name).
        let slot0_name: &'src str = match function_type {
            FunctionType::Method | FunctionType::Initializer => "this",
            FunctionType::Function | FunctionType::Script => "",
        };
        FuncState {
            function,
            function_type,
            locals: vec![Local { name: slot0_name, depth: 0, is_captured: false }],
            scope_depth: 0,
            upvalues: Vec::new(),
            loops: Vec::new(),
        }
    }
}

struct ClassState {
    has_superclass: bool,
}

/// Drives the token stream one function body at a time. `funcs` models the
/// chain of enclosing compilers the reference implementation keeps as a
/// linked list of `Compiler` structs on the C stack: the last element is
/// always the function currently being compiled, and resolving a name walks
/// backward through it looking for locals, then upvalues.
struct Compiler<'src, 'vm> {
    vm: &'vm mut Vm,
    scanner: Scanner<'src>,
    previous: Token<'src>,
    current: Token<'src>,
    had_error: bool,
    panic_mode: bool,
    errors: Vec<CompileError>,
    funcs: Vec<FuncState<'src>>,
    classes: Vec<ClassState>,
}

/// Compiles `source` into a top-level script function. On success every
/// nested function it contains has already been compiled into its own
/// `ObjFunction` and wired up behind `OP_CLOSURE`; on failure, every error
/// encountered is returned (compilation keeps going past the first one, the
/// way `synchronize` does in the reference implementation, so a single pass
/// can report more than one mistake).
pub fn compile(source: &str, vm: &mut Vm) -> Result<*mut ObjFunction, Vec<CompileError>> {
    let mut compiler = Compiler::new(source, vm);
    compiler.advance();
    while !compiler.check(TokenKind::Eof) {
        compiler.declaration();
    }
    compiler.consume(TokenKind::Eof, "Expect end of expression.");
    let had_error = compiler.had_error;
    let errors = core::mem::take(&mut compiler.errors);
    let function = compiler.end_script();
    if had_error { Err(errors) } else { Ok(function) }
}

impl<'src, 'vm> Compiler<'src, 'vm> {
    fn new(source: &'src str, vm: &'vm mut Vm) -> Compiler<'src, 'vm> {
        let function = vm.heap.alloc_function();
        vm.push_compiling(function);
        let dummy = Token { kind: TokenKind::Eof, lexeme: "", line: 0, column: 0 };
        Compiler {
            vm,
            scanner: Scanner::new(source),
            previous: dummy,
            current: dummy,
            had_error: false,
            panic_mode: false,
            errors: Vec::new(),
            funcs: vec![FuncState::new(function, FunctionType::Script)],
            classes: Vec::new(),
        }
    }

    fn end_script(&mut self) -> *mut ObjFunction {
        self.emit_return();
        let state = self.funcs.pop().unwrap();
        self.vm.pop_compiling();
        state.function
    }

    // -- token stream -----------------------------------------------------

    fn advance(&mut self) {
        self.previous = self.current;
        loop {
            self.current = self.scanner.scan_token();
            if self.current.kind != TokenKind::Error {
                break;
            }
            let message = self.current.lexeme.to_string();
            self.error_at_current(&message);
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn match_token(&mut self, kind: TokenKind) -> bool {
        if !self.check(kind) {
            return false;
        }
        self.advance();
        true
    }

    fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.current.kind == kind {
            self.advance();
        } else {
            self.error_at_current(message);
        }
    }

    fn error(&mut self, message: &str) {
        let token = self.previous;
        self.error_at(token, message);
    }

    fn error_at_current(&mut self, message: &str) {
        let token = self.current;
        self.error_at(token, message);
    }

    /// Records one diagnostic, unless panic mode is already suppressing
    /// further errors from the same cascade — mirrors `errorAt`'s
    /// `panicMode` guard, which keeps one bad token from producing a wall
    /// of downstream noise.
    fn error_at(&mut self, token: Token<'src>, message: &str) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        self.had_error = true;
        let at = match token.kind {
            TokenKind::Eof => Some("end".to_string()),
            TokenKind::Error => None,
            _ => Some(format!("'{}'", token.lexeme)),
        };
        self.errors.push(CompileError { line: token.line, column: token.column, at, message: message.to_string() });
    }

    fn synchronize(&mut self) {
        self.panic_mode = false;
        while self.current.kind != TokenKind::Eof {
            if self.previous.kind == TokenKind::Semicolon {
                return;
            }
            match self.current.kind {
                TokenKind::Class
                | TokenKind::Fun
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return
                | TokenKind::Break
                | TokenKind::Continue => return,
                _ => {}
            }
            self.advance();
        }
    }

    // -- bytecode emission --------------------------------------------------

    fn current_chunk(&mut self) -> &mut crate::chunk::Chunk {
        let function = self.funcs.last().unwrap().function;
        unsafe { &mut (*function).chunk }
    }

    fn emit_byte(&mut self, byte: u8) {
        let line = self.previous.line;
        self.current_chunk().write(byte, line);
    }

    fn emit_bytes(&mut self, a: u8, b: u8) {
        self.emit_byte(a);
        self.emit_byte(b);
    }

    fn emit_jump(&mut self, op: OpCode) -> usize {
        self.emit_byte(op as u8);
        self.emit_byte(0xff);
        self.emit_byte(0xff);
        self.current_chunk().len() - 2
    }

    fn patch_jump(&mut self, offset: usize) {
        let jump = self.current_chunk().len() - offset - 2;
        if jump > u16::MAX as usize {
            self.error("Too much code to jump over.");
            return;
        }
        self.current_chunk().patch_u16(offset, jump as u16);
    }

    fn emit_loop(&mut self, loop_start: usize) {
        self.emit_byte(OpCode::Loop as u8);
        let offset = self.current_chunk().len() - loop_start + 2;
        if offset > u16::MAX as usize {
            self.error("Loop body too large.");
        }
        let bytes = (offset as u16).to_be_bytes();
        self.emit_byte(bytes[0]);
        self.emit_byte(bytes[1]);
    }

    fn emit_return(&mut self) {
        let idx = self.funcs.len() - 1;
        if self.funcs[idx].function_type == FunctionType::Initializer {
            self.emit_bytes(OpCode::GetLocal as u8, 0);
        } else {
            self.emit_byte(OpCode::Nil as u8);
        }
        self.emit_byte(OpCode::Return as u8);
    }

    /// Appends `value` to the current chunk's constant pool, rooting it on
    /// the VM stack for the duration in case inserting it (or a collection
    /// triggered nearby) would otherwise leave it unreachable for a moment.
    fn make_constant(&mut self, value: Value) -> u8 {
        self.vm.push_root(value);
        self.vm.collect_if_needed();
        let index = self.current_chunk().add_constant(value);
        self.vm.pop_root();
        if index > u8::MAX as usize {
            self.error("Too many constants in one chunk.");
            return 0;
        }
        index as u8
    }

    fn emit_constant(&mut self, value: Value) {
        let constant = self.make_constant(value);
        self.emit_bytes(OpCode::Constant as u8, constant);
    }

    fn identifier_constant(&mut self, name: &str) -> u8 {
        let interned = self.vm.heap_mut().intern(name.as_bytes());
        self.make_constant(Value::object(interned as *mut Obj))
    }

    // -- scopes and variables -----------------------------------------------

    fn begin_scope(&mut self) {
        let idx = self.funcs.len() - 1;
        self.funcs[idx].scope_depth += 1;
    }

    fn end_scope(&mut self) {
        let idx = self.funcs.len() - 1;
        self.funcs[idx].scope_depth -= 1;
        let depth = self.funcs[idx].scope_depth;
        loop {
            let should_pop = matches!(self.funcs[idx].locals.last(), Some(local) if local.depth > depth);
            if !should_pop {
                break;
            }
            let local = self.funcs[idx].locals.pop().unwrap();
            if local.is_captured {
                self.emit_byte(OpCode::CloseUpvalue as u8);
            } else {
                self.emit_byte(OpCode::Pop as u8);
            }
        }
    }

    fn declare_variable(&mut self) {
        let idx = self.funcs.len() - 1;
        if self.funcs[idx].scope_depth == 0 {
            return;
        }
        let name_token = self.previous;
        let scope_depth = self.funcs[idx].scope_depth;
        let mut duplicate = false;
        for local in self.funcs[idx].locals.iter().rev() {
            if local.depth != -1 && local.depth < scope_depth {
                break;
            }
            if local.name == name_token.lexeme {
                duplicate = true;
                break;
            }
        }
        if duplicate {
            self.error("Already a variable with this name in this scope.");
        }
        self.add_local(name_token.lexeme);
    }

    fn add_local(&mut self, name: &'src str) {
        let idx = self.funcs.len() - 1;
        if self.funcs[idx].locals.len() == 256 {
            self.error("Too many local variables in function.");
            return;
        }
        self.funcs[idx].locals.push(Local { name, depth: -1, is_captured: false });
    }

    /// Pushes a compiler-synthesized local (the `super` binding wrapping a
    /// subclass method body) directly, already initialized — it never goes
    /// through `declare_variable`'s shadowing check since no source token
    /// names it.
    fn add_synthetic_local(&mut self, name: &'static str) {
        let idx = self.funcs.len() - 1;
        let depth = self.funcs[idx].scope_depth;
        self.funcs[idx].locals.push(Local { name, depth, is_captured: false });
    }

    fn mark_initialized(&mut self) {
        let idx = self.funcs.len() - 1;
        if self.funcs[idx].scope_depth == 0 {
            return;
        }
        let depth = self.funcs[idx].scope_depth;
        if let Some(local) = self.funcs[idx].locals.last_mut() {
            local.depth = depth;
        }
    }

    fn parse_variable(&mut self, message: &str) -> u8 {
        self.consume(TokenKind::Identifier, message);
        let name_token = self.previous;
        self.declare_variable();
        let idx = self.funcs.len() - 1;
        if self.funcs[idx].scope_depth > 0 {
            return 0;
        }
        self.identifier_constant(name_token.lexeme)
    }

    fn define_variable(&mut self, global: u8) {
        let idx = self.funcs.len() - 1;
        if self.funcs[idx].scope_depth > 0 {
            self.mark_initialized();
            return;
        }
        self.emit_bytes(OpCode::DefineGlobal as u8, global);
    }

    fn resolve_local(&mut self, idx: usize, token: Token<'src>) -> Option<u8> {
        let mut found: Option<(usize, i32)> = None;
        for i in (0..self.funcs[idx].locals.len()).rev() {
            let local = &self.funcs[idx].locals[i];
            if local.name == token.lexeme {
                found = Some((i, local.depth));
                break;
            }
        }
        match found {
            Some((i, depth)) => {
                if depth == -1 {
                    self.error_at(token, "Can't read local variable in its own initializer.");
                }
                Some(i as u8)
            }
            None => None,
        }
    }

    fn resolve_upvalue(&mut self, idx: usize, token: Token<'src>) -> Option<u8> {
        if idx == 0 {
            return None;
        }
        let enclosing = idx - 1;
        if let Some(local) = self.resolve_local(enclosing, token) {
            self.funcs[enclosing].locals[local as usize].is_captured = true;
            return Some(self.add_upvalue(idx, local, true));
        }
        if let Some(upvalue) = self.resolve_upvalue(enclosing, token) {
            return Some(self.add_upvalue(idx, upvalue, false));
        }
        None
    }

    fn add_upvalue(&mut self, idx: usize, index: u8, is_local: bool) -> u8 {
        if let Some(pos) =
            self.funcs[idx].upvalues.iter().position(|u| u.index == index && u.is_local == is_local)
        {
            return pos as u8;
        }
        if self.funcs[idx].upvalues.len() == 256 {
            self.error("Too many closure variables in function.");
            return 0;
        }
        self.funcs[idx].upvalues.push(UpvalueDesc { index, is_local });
        let count = self.funcs[idx].upvalues.len();
        let function = self.funcs[idx].function;
        unsafe { (*function).upvalue_count = count };
        (count - 1) as u8
    }

    fn named_variable(&mut self, token: Token<'src>, can_assign: bool) {
        let idx = self.funcs.len() - 1;
        let (get_op, set_op, arg) = if let Some(slot) = self.resolve_local(idx, token) {
            (OpCode::GetLocal, OpCode::SetLocal, slot)
        } else if let Some(slot) = self.resolve_upvalue(idx, token) {
            (OpCode::GetUpvalue, OpCode::SetUpvalue, slot)
        } else {
            let slot = self.identifier_constant(token.lexeme);
            (OpCode::GetGlobal, OpCode::SetGlobal, slot)
        };
        if can_assign && self.match_token(TokenKind::Equal) {
            self.expression();
            self.emit_bytes(set_op as u8, arg);
        } else {
            self.emit_bytes(get_op as u8, arg);
        }
    }

    // -- loops: explicit scope stack for break/continue --------------------

    /// Pops/closes every local declared deeper than `depth_threshold`,
    /// without removing them from the compiler's own bookkeeping — a
    /// `break`/`continue` only affects the runtime stack along the jump's
    /// path, the locals themselves are still removed normally by the
    /// enclosing `end_scope` once compilation reaches it.
    fn emit_loop_exit_pops(&mut self, depth_threshold: i32) {
        let idx = self.funcs.len() - 1;
        let captured_flags: Vec<bool> = self.funcs[idx]
            .locals
            .iter()
            .rev()
            .take_while(|l| l.depth > depth_threshold)
            .map(|l| l.is_captured)
            .collect();
        for captured in captured_flags {
            if captured {
                self.emit_byte(OpCode::CloseUpvalue as u8);
            } else {
                self.emit_byte(OpCode::Pop as u8);
            }
        }
    }

    fn break_statement(&mut self) {
        self.consume(TokenKind::Semicolon, "Expect ';' after 'break'.");
        let idx = self.funcs.len() - 1;
        if self.funcs[idx].loops.is_empty() {
            self.error("Can't use 'break' outside of a loop.");
            return;
        }
        let depth = self.funcs[idx].loops.last().unwrap().scope_depth;
        self.emit_loop_exit_pops(depth);
        let jump = self.emit_jump(OpCode::Jump);
        self.funcs[idx].loops.last_mut().unwrap().break_jumps.push(jump);
    }

    fn continue_statement(&mut self) {
        self.consume(TokenKind::Semicolon, "Expect ';' after 'continue'.");
        let idx = self.funcs.len() - 1;
        if self.funcs[idx].loops.is_empty() {
            self.error("Can't use 'continue' outside of a loop.");
            return;
        }
        let loop_start = self.funcs[idx].loops.last().unwrap().loop_start;
        let depth = self.funcs[idx].loops.last().unwrap().scope_depth;
        self.emit_loop_exit_pops(depth);
        self.emit_loop(loop_start);
    }

    fn while_statement(&mut self) {
        let idx = self.funcs.len() - 1;
        let scope_depth = self.funcs[idx].scope_depth;
        let loop_start = self.current_chunk().len();
        self.funcs[idx].loops.push(LoopScope { loop_start, scope_depth, break_jumps: Vec::new() });

        self.consume(TokenKind::LeftParen, "Expect '(' after 'while'.");
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after condition.");

        let exit_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_byte(OpCode::Pop as u8);
        self.statement();
        self.emit_loop(loop_start);

        self.patch_jump(exit_jump);
        self.emit_byte(OpCode::Pop as u8);

        let loop_scope = self.funcs[idx].loops.pop().unwrap();
        for jump in loop_scope.break_jumps {
            self.patch_jump(jump);
        }
    }

    fn for_statement(&mut self) {
        self.begin_scope();
        self.consume(TokenKind::LeftParen, "Expect '(' after 'for'.");

        if self.match_token(TokenKind::Semicolon) {
            // no initializer clause
        } else if self.match_token(TokenKind::Var) {
            self.var_declaration();
        } else {
            self.expression_statement();
        }

        let idx = self.funcs.len() - 1;
        let scope_depth = self.funcs[idx].scope_depth;
        let mut loop_start = self.current_chunk().len();
        self.funcs[idx].loops.push(LoopScope { loop_start, scope_depth, break_jumps: Vec::new() });

        let mut exit_jump: Option<usize> = None;
        if !self.match_token(TokenKind::Semicolon) {
            self.expression();
            self.consume(TokenKind::Semicolon, "Expect ';' after loop condition.");
            exit_jump = Some(self.emit_jump(OpCode::JumpIfFalse));
            self.emit_byte(OpCode::Pop as u8);
        }

        if !self.match_token(TokenKind::RightParen) {
            let body_jump = self.emit_jump(OpCode::Jump);
            let increment_start = self.current_chunk().len();
            self.expression();
            self.emit_byte(OpCode::Pop as u8);
            self.consume(TokenKind::RightParen, "Expect ')' after for clauses.");

            self.emit_loop(loop_start);
            loop_start = increment_start;
            self.funcs[idx].loops.last_mut().unwrap().loop_start = loop_start;
            self.patch_jump(body_jump);
        }

        self.statement();
        self.emit_loop(loop_start);

        if let Some(exit_jump) = exit_jump {
            self.patch_jump(exit_jump);
            self.emit_byte(OpCode::Pop as u8);
        }

        let loop_scope = self.funcs[idx].loops.pop().unwrap();
        for jump in loop_scope.break_jumps {
            self.patch_jump(jump);
        }

        self.end_scope();
    }

    // -- statements ----------------------------------------------------------

    fn declaration(&mut self) {
        if self.match_token(TokenKind::Class) {
            self.class_declaration();
        } else if self.match_token(TokenKind::Fun) {
            self.fun_declaration();
        } else if self.match_token(TokenKind::Var) {
            self.var_declaration();
        } else {
            self.statement();
        }
        if self.panic_mode {
            self.synchronize();
        }
    }

    fn statement(&mut self) {
        if self.match_token(TokenKind::Print) {
            self.print_statement();
        } else if self.match_token(TokenKind::If) {
            self.if_statement();
        } else if self.match_token(TokenKind::Return) {
            self.return_statement();
        } else if self.match_token(TokenKind::While) {
            self.while_statement();
        } else if self.match_token(TokenKind::For) {
            self.for_statement();
        } else if self.match_token(TokenKind::Break) {
            self.break_statement();
        } else if self.match_token(TokenKind::Continue) {
            self.continue_statement();
        } else if self.match_token(TokenKind::LeftBrace) {
            self.begin_scope();
            self.block();
            self.end_scope();
        } else {
            self.expression_statement();
        }
    }

    fn block(&mut self) {
        while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Eof) {
            self.declaration();
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after block.");
    }

    fn print_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after value.");
        self.emit_byte(OpCode::Print as u8);
    }

    fn expression_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after expression.");
        self.emit_byte(OpCode::Pop as u8);
    }

    fn if_statement(&mut self) {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'if'.");
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after condition.");

        let then_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_byte(OpCode::Pop as u8);
        self.statement();

        let else_jump = self.emit_jump(OpCode::Jump);
        self.patch_jump(then_jump);
        self.emit_byte(OpCode::Pop as u8);

        if self.match_token(TokenKind::Else) {
            self.statement();
        }
        self.patch_jump(else_jump);
    }

    fn return_statement(&mut self) {
        let idx = self.funcs.len() - 1;
        if self.funcs[idx].function_type == FunctionType::Script {
            self.error("Can't return from top-level code.");
        }
        if self.match_token(TokenKind::Semicolon) {
            self.emit_return();
            return;
        }
        if self.funcs[idx].function_type == FunctionType::Initializer {
            self.error("Can't return a value from an initializer.");
        }
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after return value.");
        self.emit_byte(OpCode::Return as u8);
    }

    fn var_declaration(&mut self) {
        let global = self.parse_variable("Expect variable name.");
        if self.match_token(TokenKind::Equal) {
            self.expression();
        } else {
            self.emit_byte(OpCode::Nil as u8);
        }
        self.consume(TokenKind::Semicolon, "Expect ';' after variable declaration.");
        self.define_variable(global);
    }

    fn fun_declaration(&mut self) {
        let global = self.parse_variable("Expect function name.");
        self.mark_initialized();
        self.function(FunctionType::Function);
        self.define_variable(global);
    }

    /// Compiles one function body: its own `FuncState` (fresh locals,
    /// upvalues, loop stack) is pushed for the duration, so name resolution
    /// inside naturally starts over rather than inheriting the enclosing
    /// function's scopes.
    fn function(&mut self, ftype: FunctionType) {
        let name_str = self.previous.lexeme;
        let name_obj = self.vm.heap_mut().intern(name_str.as_bytes());
        let function_ptr = self.vm.heap.alloc_function();
        unsafe { (*function_ptr).name = Some(name_obj) };

        self.vm.push_compiling(function_ptr);
        self.funcs.push(FuncState::new(function_ptr, ftype));
        self.begin_scope();

        self.consume(TokenKind::LeftParen, "Expect '(' after function name.");
        let mut param_count: u32 = 0;
        if !self.check(TokenKind::RightParen) {
            loop {
                param_count += 1;
                if param_count > 255 {
                    self.error_at_current("Can't have more than 255 parameters.");
                }
                let constant = self.parse_variable("Expect parameter name.");
                self.define_variable(constant);
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }
        unsafe { (*function_ptr).arity = param_count.min(255) as u8 };
        self.consume(TokenKind::RightParen, "Expect ')' after parameters.");
        self.consume(TokenKind::LeftBrace, "Expect '{' before function body.");
        self.block();

        self.emit_return();
        let state = self.funcs.pop().unwrap();
        self.vm.pop_compiling();

        let constant = self.make_constant(Value::object(function_ptr as *mut Obj));
        self.emit_bytes(OpCode::Closure as u8, constant);
        for upvalue in state.upvalues {
            self.emit_byte(if upvalue.is_local { 1 } else { 0 });
            self.emit_byte(upvalue.index);
        }
    }

    fn class_declaration(&mut self) {
        self.consume(TokenKind::Identifier, "Expect class name.");
        let name_token = self.previous;
        let name_constant = self.identifier_constant(name_token.lexeme);
        self.declare_variable();
        self.emit_bytes(OpCode::Class as u8, name_constant);
        self.define_variable(name_constant);

        self.classes.push(ClassState { has_superclass: false });

        if self.match_token(TokenKind::Less) {
            self.consume(TokenKind::Identifier, "Expect superclass name.");
            let super_token = self.previous;
            self.variable(false);
            if super_token.lexeme == name_token.lexeme {
                self.error("A class can't inherit from itself.");
            }

            self.begin_scope();
            self.add_synthetic_local("super");

            self.named_variable(name_token, false);
            self.emit_byte(OpCode::Inherit as u8);
            self.classes.last_mut().unwrap().has_superclass = true;
        }

        self.named_variable(name_token, false);
        self.consume(TokenKind::LeftBrace, "Expect '{' before class body.");
        while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Eof) {
            self.method();
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after class body.");
        self.emit_byte(OpCode::Pop as u8);

        if self.classes.last().unwrap().has_superclass {
            self.end_scope();
        }
        self.classes.pop();
    }

    fn method(&mut self) {
        self.consume(TokenKind::Identifier, "Expect method name.");
        let name_token = self.previous;
        let constant = self.identifier_constant(name_token.lexeme);
        let ftype =
            if name_token.lexeme == "init" { FunctionType::Initializer } else { FunctionType::Method };
        self.function(ftype);
        self.emit_bytes(OpCode::Method as u8, constant);
    }

    // -- expressions -----------------------------------------------------

    fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    fn parse_precedence(&mut self, precedence: Precedence) {
        self.advance();
        let prefix_rule = match Self::get_rule(self.previous.kind).prefix {
            Some(rule) => rule,
            None => {
                self.error("Expect expression.");
                return;
            }
        };
        let can_assign = precedence <= Precedence::Assignment;
        prefix_rule(self, can_assign);

        while precedence <= Self::get_rule(self.current.kind).precedence {
            self.advance();
            let infix_rule = Self::get_rule(self.previous.kind).infix.unwrap();
            infix_rule(self, can_assign);
        }

        if can_assign && self.match_token(TokenKind::Equal) {
            self.error("Invalid assignment target.");
        }
    }

    fn number(&mut self, _can_assign: bool) {
        let value: f64 = self.previous.lexeme.parse().unwrap_or(0.0);
        self.emit_constant(Value::number(value));
    }

    fn string_literal(&mut self, _can_assign: bool) {
        let lexeme = self.previous.lexeme;
        let bytes = &lexeme.as_bytes()[1..lexeme.len() - 1];
        let interned = self.vm.heap_mut().intern(bytes);
        self.emit_constant(Value::object(interned as *mut Obj));
    }

    fn grouping(&mut self, _can_assign: bool) {
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after expression.");
    }

    fn unary(&mut self, _can_assign: bool) {
        let op_kind = self.previous.kind;
        self.parse_precedence(Precedence::Unary);
        match op_kind {
            TokenKind::Bang => self.emit_byte(OpCode::Not as u8),
            TokenKind::Minus => self.emit_byte(OpCode::Negate as u8),
            _ => unreachable!(),
        }
    }

    fn binary(&mut self, _can_assign: bool) {
        let op_kind = self.previous.kind;
        let rule_precedence = Self::get_rule(op_kind).precedence;
        self.parse_precedence(rule_precedence.higher());
        match op_kind {
            TokenKind::Plus => self.emit_byte(OpCode::Add as u8),
            TokenKind::Minus => self.emit_byte(OpCode::Subtract as u8),
            TokenKind::Star => self.emit_byte(OpCode::Multiply as u8),
            TokenKind::Slash => self.emit_byte(OpCode::Divide as u8),
            TokenKind::BangEqual => self.emit_byte(OpCode::NotEqual as u8),
            TokenKind::EqualEqual => self.emit_byte(OpCode::Equal as u8),
            TokenKind::Greater => self.emit_byte(OpCode::Greater as u8),
            TokenKind::GreaterEqual => self.emit_byte(OpCode::GreaterEqual as u8),
            TokenKind::Less => self.emit_byte(OpCode::Less as u8),
            TokenKind::LessEqual => self.emit_byte(OpCode::LessEqual as u8),
            _ => unreachable!(),
        }
    }

    fn literal(&mut self, _can_assign: bool) {
        match self.previous.kind {
            TokenKind::False => self.emit_byte(OpCode::False as u8),
            TokenKind::Nil => self.emit_byte(OpCode::Nil as u8),
            TokenKind::True => self.emit_byte(OpCode::True as u8),
            _ => unreachable!(),
        }
    }

    fn and_(&mut self, _can_assign: bool) {
        let end_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_byte(OpCode::Pop as u8);
        self.parse_precedence(Precedence::And);
        self.patch_jump(end_jump);
    }

    fn or_(&mut self, _can_assign: bool) {
        let else_jump = self.emit_jump(OpCode::JumpIfFalse);
        let end_jump = self.emit_jump(OpCode::Jump);
        self.patch_jump(else_jump);
        self.emit_byte(OpCode::Pop as u8);
        self.parse_precedence(Precedence::Or);
        self.patch_jump(end_jump);
    }

    fn call(&mut self, _can_assign: bool) {
        let arg_count = self.argument_list();
        self.emit_bytes(OpCode::Call as u8, arg_count);
    }

    fn argument_list(&mut self) -> u8 {
        let mut count: u32 = 0;
        if !self.check(TokenKind::RightParen) {
            loop {
                self.expression();
                if count == 255 {
                    self.error("Can't have more than 255 arguments.");
                }
                count += 1;
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after arguments.");
        count.min(255) as u8
    }

    fn dot(&mut self, can_assign: bool) {
        self.consume(TokenKind::Identifier, "Expect property name after '.'.");
        let name = self.identifier_constant(self.previous.lexeme);
        if can_assign && self.match_token(TokenKind::Equal) {
            self.expression();
            self.emit_bytes(OpCode::SetProperty as u8, name);
        } else if self.match_token(TokenKind::LeftParen) {
            let arg_count = self.argument_list();
            self.emit_bytes(OpCode::Invoke as u8, name);
            self.emit_byte(arg_count);
        } else {
            self.emit_bytes(OpCode::GetProperty as u8, name);
        }
    }

    fn variable(&mut self, can_assign: bool) {
        let token = self.previous;
        self.named_variable(token, can_assign);
    }

    fn this_(&mut self, _can_assign: bool) {
        if self.classes.is_empty() {
            self.error("Can't use 'this' outside of a class.");
            return;
        }
        let token = synthetic_token("this", self.previous);
        self.named_variable(token, false);
    }

    fn super_(&mut self, _can_assign: bool) {
        if self.classes.is_empty() {
            self.error("Can't use 'super' outside of a class.");
        } else if !self.classes.last().unwrap().has_superclass {
            self.error("Can't use 'super' in a class with no superclass.");
        }

        self.consume(TokenKind::Dot, "Expect '.' after 'super'.");
        self.consume(TokenKind::Identifier, "Expect superclass method name.");
        let name = self.identifier_constant(self.previous.lexeme);

        let this_token = synthetic_token("this", self.previous);
        let super_token = synthetic_token("super", self.previous);

        self.named_variable(this_token, false);
        if self.match_token(TokenKind::LeftParen) {
            let arg_count = self.argument_list();
            self.named_variable(super_token, false);
            self.emit_bytes(OpCode::SuperInvoke as u8, name);
            self.emit_byte(arg_count);
        } else {
            self.named_variable(super_token, false);
            self.emit_bytes(OpCode::GetSuper as u8, name);
        }
    }

    fn get_rule(kind: TokenKind) -> ParseRule<'src, 'vm> {
        use TokenKind::*;
        match kind {
            LeftParen => {
                ParseRule { prefix: Some(Self::grouping), infix: Some(Self::call), precedence: Precedence::Call }
            }
            Dot => ParseRule { prefix: None, infix: Some(Self::dot), precedence: Precedence::Call },
            Minus => {
                ParseRule { prefix: Some(Self::unary), infix: Some(Self::binary), precedence: Precedence::Term }
            }
            Plus => ParseRule { prefix: None, infix: Some(Self::binary), precedence: Precedence::Term },
            Slash => ParseRule { prefix: None, infix: Some(Self::binary), precedence: Precedence::Factor },
            Star => ParseRule { prefix: None, infix: Some(Self::binary), precedence: Precedence::Factor },
            Bang => ParseRule { prefix: Some(Self::unary), infix: None, precedence: Precedence::None },
            BangEqual => {
                ParseRule { prefix: None, infix: Some(Self::binary), precedence: Precedence::Equality }
            }
            EqualEqual => {
                ParseRule { prefix: None, infix: Some(Self::binary), precedence: Precedence::Equality }
            }
            Greater | GreaterEqual | Less | LessEqual => {
                ParseRule { prefix: None, infix: Some(Self::binary), precedence: Precedence::Comparison }
            }
            Identifier => ParseRule { prefix: Some(Self::variable), infix: None, precedence: Precedence::None },
            String => {
                ParseRule { prefix: Some(Self::string_literal), infix: None, precedence: Precedence::None }
            }
            Number => ParseRule { prefix: Some(Self::number), infix: None, precedence: Precedence::None },
            And => ParseRule { prefix: None, infix: Some(Self::and_), precedence: Precedence::And },
            Or => ParseRule { prefix: None, infix: Some(Self::or_), precedence: Precedence::Or },
            False | Nil | True => {
                ParseRule { prefix: Some(Self::literal), infix: None, precedence: Precedence::None }
            }
            Super => ParseRule { prefix: Some(Self::super_), infix: None, precedence: Precedence::None },
            This => ParseRule { prefix: Some(Self::this_), infix: None, precedence: Precedence::None },
            RightParen | LeftBrace | RightBrace | Comma | Semicolon | Equal | Class | Else | For | Fun
            | If | Print | Return | Var | While | Break | Continue | Error | Eof => {
                ParseRule { prefix: None, infix: None, precedence: Precedence::None }
            }
        }
    }
}

/// Builds a compiler-synthesized identifier token (`this`, `super`) carrying
/// the position of `near` so any diagnostic pointing at it still lands on a
/// real source location.
fn synthetic_token<'src>(lexeme: &'src str, near: Token<'src>) -> Token<'src> {
    Token { kind: TokenKind::Identifier, lexeme, line: near.line, column: near.column }
}

#[cfg(test)]
mod compiler_test;
