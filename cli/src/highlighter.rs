//! Syntax highlighting for the REPL line editor.
//!
//! The teacher crate drives `tree-sitter` over a dedicated grammar package;
//! this language has no such grammar, so highlighting is driven directly
//! off `wisp_core::scanner::Scanner` instead — the same tokenizer the
//! compiler itself uses, so a line highlights exactly the way it will be
//! scanned.

use nu_ansi_term::{Color, Style};
use reedline::StyledText;
use wisp_core::scanner::{Scanner, TokenKind};

fn color_for(kind: TokenKind) -> Color {
    use TokenKind::*;
    match kind {
        And | Class | Else | For | Fun | If | Or | Print | Return | Super | This | Var | While
        | Break | Continue => Color::Magenta,
        Nil | True | False => Color::Cyan,
        Number => Color::Cyan,
        String => Color::Green,
        Identifier => Color::White,
        Error => Color::Red,
        _ => Color::DarkGray,
    }
}

/// Highlights a single line of REPL input by re-scanning it with the same
/// `Scanner` the compiler uses and coloring each token by kind.
pub struct Highlighter;

impl reedline::Highlighter for Highlighter {
    fn highlight(&self, line: &str, _cursor: usize) -> StyledText {
        let mut output = StyledText::new();
        let mut scanner = Scanner::new(line);
        let mut last_end = 0usize;

        loop {
            let token = scanner.scan_token();
            if token.kind == TokenKind::Eof {
                break;
            }
            let start = token.lexeme.as_ptr() as usize - line.as_ptr() as usize;
            let end = start + token.lexeme.len();
            if start > last_end {
                output.push((Style::default(), line[last_end..start].to_string()));
            }
            output.push((Style::new().fg(color_for(token.kind)), line[start..end].to_string()));
            last_end = end;
        }
        if last_end < line.len() {
            output.push((Style::default(), line[last_end..].to_string()));
        }
        output
    }
}
