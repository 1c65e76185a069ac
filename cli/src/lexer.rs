//! Multi-line input detection for the REPL: re-scans the buffer accumulated
//! so far with `wisp_core::scanner::Scanner` and reports whether every
//! brace/paren opened so far has been closed, so `main`'s read loop knows
//! whether to keep collecting lines before handing the buffer to the
//! compiler.

use wisp_core::scanner::{Scanner, TokenKind};

/// Returns the net nesting depth of `(`/`)` and `{`/`}` in `buffer`, or
/// `None` if the buffer ends mid-string (an unterminated string token),
/// which the teacher crate's equivalent treats the same way: abort and
/// wait for more input rather than guessing where the string ends.
pub fn calculate_depth(buffer: &str) -> Option<usize> {
    let mut depth: isize = 0;
    let mut scanner = Scanner::new(buffer);
    loop {
        let token = scanner.scan_token();
        match token.kind {
            TokenKind::LeftParen | TokenKind::LeftBrace => depth += 1,
            TokenKind::RightParen | TokenKind::RightBrace => depth -= 1,
            TokenKind::Error if token.lexeme == "Unterminated string." => return None,
            TokenKind::Eof => break,
            _ => {}
        }
    }
    Some(depth.max(0) as usize)
}
