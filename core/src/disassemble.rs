//! Bytecode disassembler. A pure `Chunk -> String` function rather than a
//! direct-to-stdout printer (unlike the reference implementation's
//! `disassembleChunk`/`disassembleInstruction`), so it can be exercised in
//! tests and reused by a future `--disassemble` CLI flag without capturing
//! process output.

use core::fmt::Write as _;

use crate::chunk::{Chunk, OpCode};
use crate::object::{ObjFunction, print_value};

pub fn disassemble_chunk(chunk: &Chunk, name: &str) -> String {
    let mut out = String::new();
    writeln!(out, "== {name} ==").unwrap();
    let mut offset = 0;
    while offset < chunk.len() {
        offset = disassemble_instruction(chunk, offset, &mut out);
    }
    out
}

/// Disassembles a single instruction at `offset`, appending its rendering
/// to `out`, and returns the offset of the next instruction.
pub fn disassemble_instruction(chunk: &Chunk, offset: usize, out: &mut String) -> usize {
    write!(out, "{offset:04} ").unwrap();
    if offset > 0 && chunk.get_line(offset) == chunk.get_line(offset - 1) {
        write!(out, "   | ").unwrap();
    } else {
        write!(out, "{:4} ", chunk.get_line(offset)).unwrap();
    }

    let op = OpCode::from_u8(chunk.read_byte(offset));
    match op {
        OpCode::Constant => constant_instruction("OP_CONSTANT", chunk, offset, out),
        OpCode::Nil => simple_instruction("OP_NIL", offset, out),
        OpCode::True => simple_instruction("OP_TRUE", offset, out),
        OpCode::False => simple_instruction("OP_FALSE", offset, out),
        OpCode::Pop => simple_instruction("OP_POP", offset, out),
        OpCode::GetLocal => byte_instruction("OP_GET_LOCAL", chunk, offset, out),
        OpCode::SetLocal => byte_instruction("OP_SET_LOCAL", chunk, offset, out),
        OpCode::GetGlobal => constant_instruction("OP_GET_GLOBAL", chunk, offset, out),
        OpCode::DefineGlobal => constant_instruction("OP_DEFINE_GLOBAL", chunk, offset, out),
        OpCode::SetGlobal => constant_instruction("OP_SET_GLOBAL", chunk, offset, out),
        OpCode::GetUpvalue => byte_instruction("OP_GET_UPVALUE", chunk, offset, out),
        OpCode::SetUpvalue => byte_instruction("OP_SET_UPVALUE", chunk, offset, out),
        OpCode::GetProperty => constant_instruction("OP_GET_PROPERTY", chunk, offset, out),
        OpCode::SetProperty => constant_instruction("OP_SET_PROPERTY", chunk, offset, out),
        OpCode::GetSuper => constant_instruction("OP_GET_SUPER", chunk, offset, out),
        OpCode::Equal => simple_instruction("OP_EQUAL", offset, out),
        OpCode::NotEqual => simple_instruction("OP_NOT_EQUAL", offset, out),
        OpCode::Greater => simple_instruction("OP_GREATER", offset, out),
        OpCode::GreaterEqual => simple_instruction("OP_GREATER_EQUAL", offset, out),
        OpCode::Less => simple_instruction("OP_LESS", offset, out),
        OpCode::LessEqual => simple_instruction("OP_LESS_EQUAL", offset, out),
        OpCode::Ternary => simple_instruction("OP_TERNARY", offset, out),
        OpCode::Add => simple_instruction("OP_ADD", offset, out),
        OpCode::Subtract => simple_instruction("OP_SUBTRACT", offset, out),
        OpCode::Multiply => simple_instruction("OP_MULTIPLY", offset, out),
        OpCode::Divide => simple_instruction("OP_DIVIDE", offset, out),
        OpCode::Not => simple_instruction("OP_NOT", offset, out),
        OpCode::Negate => simple_instruction("OP_NEGATE", offset, out),
        OpCode::Print => simple_instruction("OP_PRINT", offset, out),
        OpCode::Jump => jump_instruction("OP_JUMP", 1, chunk, offset, out),
        OpCode::JumpIfFalse => jump_instruction("OP_JUMP_IF_FALSE", 1, chunk, offset, out),
        OpCode::Loop => jump_instruction("OP_LOOP", -1, chunk, offset, out),
        OpCode::Call => byte_instruction("OP_CALL", chunk, offset, out),
        OpCode::Invoke => invoke_instruction("OP_INVOKE", chunk, offset, out),
        OpCode::SuperInvoke => invoke_instruction("OP_SUPER_INVOKE", chunk, offset, out),
        OpCode::Closure => closure_instruction(chunk, offset, out),
        OpCode::CloseUpvalue => simple_instruction("OP_CLOSE_UPVALUE", offset, out),
        OpCode::Return => simple_instruction("OP_RETURN", offset, out),
        OpCode::Class => constant_instruction("OP_CLASS", chunk, offset, out),
        OpCode::Inherit => simple_instruction("OP_INHERIT", offset, out),
        OpCode::Method => constant_instruction("OP_METHOD", chunk, offset, out),
    }
}

fn simple_instruction(name: &str, offset: usize, out: &mut String) -> usize {
    writeln!(out, "{name}").unwrap();
    offset + 1
}

fn constant_instruction(name: &str, chunk: &Chunk, offset: usize, out: &mut String) -> usize {
    let index = chunk.read_byte(offset + 1) as usize;
    write!(out, "{name:<16} {index:4} '").unwrap();
    write_value(out, chunk.constants()[index]);
    writeln!(out, "'").unwrap();
    offset + 2
}

fn byte_instruction(name: &str, chunk: &Chunk, offset: usize, out: &mut String) -> usize {
    let slot = chunk.read_byte(offset + 1);
    writeln!(out, "{name:<16} {slot:4}").unwrap();
    offset + 2
}

fn jump_instruction(name: &str, sign: i32, chunk: &Chunk, offset: usize, out: &mut String) -> usize {
    let jump = chunk.read_u16(offset + 1) as i32;
    let target = offset as i32 + 3 + sign * jump;
    writeln!(out, "{name:<16} {offset:4} -> {target}").unwrap();
    offset + 3
}

fn invoke_instruction(name: &str, chunk: &Chunk, offset: usize, out: &mut String) -> usize {
    let constant = chunk.read_byte(offset + 1) as usize;
    let arg_count = chunk.read_byte(offset + 2);
    write!(out, "{name:<16} ({arg_count} args) {constant:4} '").unwrap();
    write_value(out, chunk.constants()[constant]);
    writeln!(out, "'").unwrap();
    offset + 3
}

fn closure_instruction(chunk: &Chunk, offset: usize, out: &mut String) -> usize {
    let mut offset = offset + 1;
    let constant_index = chunk.read_byte(offset) as usize;
    offset += 1;
    write!(out, "{:<16} {:4} ", "OP_CLOSURE", constant_index).unwrap();
    let value = chunk.constants()[constant_index];
    write_value(out, value);
    writeln!(out).unwrap();

    let function = unsafe { &*(value.as_obj() as *mut ObjFunction) };
    for _ in 0..function.upvalue_count {
        let is_local = chunk.read_byte(offset);
        let index = chunk.read_byte(offset + 1);
        writeln!(
            out,
            "{:04}      |                     {} {}",
            offset,
            if is_local != 0 { "local" } else { "upvalue" },
            index
        )
        .unwrap();
        offset += 2;
    }
    offset
}

fn write_value(out: &mut String, value: crate::value::Value) {
    struct Wrap(crate::value::Value);
    impl core::fmt::Display for Wrap {
        fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
            print_value(f, self.0)
        }
    }
    write!(out, "{}", Wrap(value)).unwrap();
}

#[cfg(test)]
mod disassemble_test;
