use super::*;
use crate::chunk::Chunk;
use crate::value::Value;

#[test]
fn disassembles_a_constant_and_a_return() {
    let mut chunk = Chunk::new();
    let index = chunk.add_constant(Value::number(1.2));
    chunk.write_op(OpCode::Constant, 123);
    chunk.write(index as u8, 123);
    chunk.write_op(OpCode::Return, 123);

    let out = disassemble_chunk(&chunk, "test chunk");
    assert!(out.contains("== test chunk =="));
    assert!(out.contains("OP_CONSTANT"));
    assert!(out.contains("1.2"));
    assert!(out.contains("OP_RETURN"));
}

#[test]
fn repeated_lines_print_a_continuation_marker() {
    let mut chunk = Chunk::new();
    chunk.write_op(OpCode::Nil, 1);
    chunk.write_op(OpCode::Pop, 1);

    let out = disassemble_chunk(&chunk, "lines");
    let lines: Vec<&str> = out.lines().collect();
    assert!(lines[1].trim_start().starts_with('1'));
    assert!(lines[2].contains("|"));
}

#[test]
fn jump_instruction_prints_its_target_offset() {
    let mut chunk = Chunk::new();
    chunk.write_op(OpCode::Jump, 1);
    chunk.write(0, 1);
    chunk.write(2, 1);
    chunk.write_op(OpCode::Nil, 2);

    let out = disassemble_chunk(&chunk, "jump");
    assert!(out.contains("OP_JUMP"));
    assert!(out.contains("-> 5"));
}
