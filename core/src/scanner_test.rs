use super::*;

fn kinds(source: &str) -> Vec<TokenKind> {
    let mut scanner = Scanner::new(source);
    let mut out = Vec::new();
    loop {
        let token = scanner.scan_token();
        let done = token.kind == TokenKind::Eof;
        out.push(token.kind);
        if done {
            break;
        }
    }
    out
}

#[test]
fn scans_punctuation_and_operators() {
    assert_eq!(
        kinds("(){};,.+-*/ ! != = == < <= > >="),
        vec![
            TokenKind::LeftParen,
            TokenKind::RightParen,
            TokenKind::LeftBrace,
            TokenKind::RightBrace,
            TokenKind::Semicolon,
            TokenKind::Comma,
            TokenKind::Dot,
            TokenKind::Plus,
            TokenKind::Minus,
            TokenKind::Star,
            TokenKind::Slash,
            TokenKind::Bang,
            TokenKind::BangEqual,
            TokenKind::Equal,
            TokenKind::EqualEqual,
            TokenKind::Less,
            TokenKind::LessEqual,
            TokenKind::Greater,
            TokenKind::GreaterEqual,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn scans_keywords_not_identifier_prefixes() {
    assert_eq!(kinds("classy"), vec![TokenKind::Identifier, TokenKind::Eof]);
    assert_eq!(kinds("class"), vec![TokenKind::Class, TokenKind::Eof]);
    assert_eq!(kinds("break continue"), vec![TokenKind::Break, TokenKind::Continue, TokenKind::Eof]);
}

#[test]
fn scans_number_literals() {
    let mut scanner = Scanner::new("3.14 42");
    let a = scanner.scan_token();
    assert_eq!(a.kind, TokenKind::Number);
    assert_eq!(a.lexeme, "3.14");
    let b = scanner.scan_token();
    assert_eq!(b.kind, TokenKind::Number);
    assert_eq!(b.lexeme, "42");
}

#[test]
fn tracks_line_and_column_across_newlines() {
    let mut scanner = Scanner::new("a\nb");
    let a = scanner.scan_token();
    assert_eq!((a.line, a.column), (1, 1));
    let b = scanner.scan_token();
    assert_eq!((b.line, b.column), (2, 1));
}

#[test]
fn unterminated_string_is_an_error_token() {
    let mut scanner = Scanner::new("\"abc");
    let token = scanner.scan_token();
    assert_eq!(token.kind, TokenKind::Error);
    assert_eq!(token.lexeme, "Unterminated string.");
}

#[test]
fn string_literal_spans_newlines() {
    let mut scanner = Scanner::new("\"a\nb\"");
    let token = scanner.scan_token();
    assert_eq!(token.kind, TokenKind::String);
    assert_eq!(token.lexeme, "\"a\nb\"");
}

#[test]
fn unexpected_character_is_an_error_token() {
    let mut scanner = Scanner::new("@");
    let token = scanner.scan_token();
    assert_eq!(token.kind, TokenKind::Error);
}
