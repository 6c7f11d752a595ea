//! Lexical analysis, including the string-interpolation sub-states (spec 4.2)
//!
//! The lexer is a restartable producer of tokens: `next_token` advances
//! the input and returns the next token or an end-of-file token. Modeled
//! on the teacher's tokenizer shape (`parser::tokenize`) but kept as an
//! explicit struct with a mode stack rather than a single upfront pass,
//! since string interpolation needs real state transitions (spec 9's
//! design note: "model as an explicit mode field on the lexer, not as
//! ad-hoc flags").

use crate::diagnostic::{Diagnostic, DiagnosticBag, Phase};
use crate::token::{BUILTIN_WHITELIST, Keyword, Token, TokenKind};
use std::collections::VecDeque;
use std::rc::Rc;

/// One entry of the lexer's mode stack. A stack (rather than a single
/// field) is what lets strings nest inside interpolation inside strings
/// (`"outer ${ "inner ${x}" }"`).
#[derive(Debug, Clone, Copy, PartialEq)]
enum LexMode {
    Normal,
    /// Scanning literal string text. `any_interp` becomes `true` the
    /// first time `${` is seen in this string, which decides whether the
    /// closing quote emits a plain `Str` token or a trailing
    /// `InterpText`/`InterpEnd` pair (spec 4.2 point 6).
    StringBody { any_interp: bool },
    /// Inside `${ ... }`. `depth` counts unmatched `{` seen since the
    /// opening `${`; it starts at 1 and reaching 0 closes the splice.
    Interp { depth: usize },
}

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    file: Rc<str>,
    mode: Vec<LexMode>,
    pending: VecDeque<Token>,
    pub diagnostics: DiagnosticBag,
}

impl Lexer {
    pub fn new(source: &str, file: Rc<str>) -> Self {
        Lexer {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            file,
            mode: vec![LexMode::Normal],
            pending: VecDeque::new(),
            diagnostics: DiagnosticBag::new(),
        }
    }

    /// Tokenize the entire input up front. The parser consumes the
    /// resulting slice with a cursor, matching the teacher's
    /// `Parser { tokens: Vec<Token>, pos: usize }` shape.
    pub fn tokenize(mut self) -> (Vec<Token>, DiagnosticBag) {
        let mut out = Vec::new();
        loop {
            let tok = self.next_token();
            let eof = tok.is_eof();
            out.push(tok);
            if eof {
                break;
            }
        }
        (out, self.diagnostics)
    }

    fn tok(&self, kind: TokenKind, line: usize, column: usize) -> Token {
        Token::new(kind, line, column, self.file.clone())
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&mut self, line: usize, column: usize, message: impl Into<String>) {
        self.diagnostics
            .push(Diagnostic::error(Phase::Lexical, self.file.clone(), line, column, message));
    }

    pub fn next_token(&mut self) -> Token {
        if let Some(t) = self.pending.pop_front() {
            return t;
        }
        match *self.mode.last().unwrap() {
            LexMode::Normal => self.lex_normal(),
            LexMode::StringBody { any_interp } => self.lex_string_body(any_interp),
            LexMode::Interp { depth } => self.lex_interp(depth),
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    self.advance();
                    self.advance();
                    loop {
                        match self.peek() {
                            None => return, // unterminated block comment -> EOF, no diagnostic (spec 4.2)
                            Some('*') if self.peek_at(1) == Some('/') => {
                                self.advance();
                                self.advance();
                                break;
                            }
                            _ => {
                                self.advance();
                            }
                        }
                    }
                }
                _ => return,
            }
        }
    }

    fn lex_normal(&mut self) -> Token {
        self.skip_whitespace_and_comments();
        let (line, column) = (self.line, self.column);
        let Some(c) = self.peek() else {
            return self.tok(TokenKind::Eof, line, column);
        };

        if c == '"' {
            self.advance();
            self.mode.push(LexMode::StringBody { any_interp: false });
            return self.next_token();
        }
        if c == 'r' && self.peek_at(1) == Some('"') {
            self.advance();
            self.advance();
            return self.lex_raw_string(line, column);
        }
        if c.is_ascii_digit() {
            return self.lex_number(line, column);
        }
        if c == '_' || c.is_alphabetic() {
            return self.lex_ident_or_keyword(line, column);
        }
        if c == '@' {
            return self.lex_builtin(line, column);
        }

        self.lex_operator(line, column)
    }

    fn lex_raw_string(&mut self, line: usize, column: usize) -> Token {
        let mut buf = String::new();
        loop {
            match self.advance() {
                None => {
                    self.error(line, column, "unterminated raw string literal");
                    return self.tok(TokenKind::Eof, line, column);
                }
                Some('"') => break,
                Some(c) => buf.push(c),
            }
        }
        self.tok(TokenKind::RawStr(buf), line, column)
    }

    fn lex_number(&mut self, line: usize, column: usize) -> Token {
        let mut buf = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                buf.push(c);
                self.advance();
            } else {
                break;
            }
        }
        let mut is_float = false;
        // A leading `..` is never part of a number; only consume `.` when
        // it is not followed by another `.` (spec 4.2 / 4.3).
        if self.peek() == Some('.') && self.peek_at(1) != Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            buf.push('.');
            self.advance();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    buf.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let save = (self.pos, self.line, self.column);
            let mut exp = String::new();
            exp.push(self.advance().unwrap());
            if matches!(self.peek(), Some('+') | Some('-')) {
                exp.push(self.advance().unwrap());
            }
            let mut any_digit = false;
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    any_digit = true;
                    exp.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
            if any_digit {
                is_float = true;
                buf.push_str(&exp);
            } else {
                (self.pos, self.line, self.column) = save;
                self.error(line, column, "invalid exponent: expected digits after 'e'");
            }
        }

        if is_float {
            match buf.parse::<f64>() {
                Ok(v) => self.tok(TokenKind::Float(v), line, column),
                Err(_) => {
                    self.error(line, column, format!("invalid floating-point literal '{buf}'"));
                    self.tok(TokenKind::Float(0.0), line, column)
                }
            }
        } else {
            match buf.parse::<i64>() {
                Ok(v) => self.tok(TokenKind::Int(v), line, column),
                Err(_) => {
                    self.error(line, column, format!("invalid integer literal '{buf}'"));
                    self.tok(TokenKind::Int(0), line, column)
                }
            }
        }
    }

    fn lex_ident_or_keyword(&mut self, line: usize, column: usize) -> Token {
        let mut buf = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                buf.push(c);
                self.advance();
            } else {
                break;
            }
        }
        match Keyword::lookup(&buf) {
            Some(Keyword::True) => self.tok(TokenKind::Bool(true), line, column),
            Some(Keyword::False) => self.tok(TokenKind::Bool(false), line, column),
            Some(Keyword::Null) => self.tok(TokenKind::Null, line, column),
            Some(Keyword::As) if self.peek() == Some('!') => {
                self.advance();
                self.tok(TokenKind::Keyword(Keyword::AsBang), line, column)
            }
            Some(kw) => self.tok(TokenKind::Keyword(kw), line, column),
            None => self.tok(TokenKind::Ident(buf), line, column),
        }
    }

    fn lex_builtin(&mut self, line: usize, column: usize) -> Token {
        self.advance(); // '@'
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                name.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if name.is_empty() || !BUILTIN_WHITELIST.contains(&name.as_str()) {
            self.error(line, column, format!("unknown builtin '@{name}'"));
        }
        self.tok(TokenKind::Builtin(name), line, column)
    }

    fn lex_operator(&mut self, line: usize, column: usize) -> Token {
        let c = self.advance().unwrap();
        let kind = match c {
            '+' => {
                if self.eat('|') {
                    TokenKind::PlusPipe
                } else if self.eat('%') {
                    TokenKind::PlusPercent
                } else {
                    TokenKind::Plus
                }
            }
            '-' => {
                if self.eat('|') {
                    TokenKind::MinusPipe
                } else if self.eat('%') {
                    TokenKind::MinusPercent
                } else {
                    TokenKind::Minus
                }
            }
            '*' => {
                if self.eat('|') {
                    TokenKind::StarPipe
                } else if self.eat('%') {
                    TokenKind::StarPercent
                } else {
                    TokenKind::Star
                }
            }
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '<' => {
                if self.eat('<') {
                    TokenKind::Shl
                } else if self.eat('=') {
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.eat('>') {
                    TokenKind::Shr
                } else if self.eat('=') {
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            '=' => {
                if self.eat('=') {
                    TokenKind::EqEq
                } else if self.eat('>') {
                    TokenKind::FatArrow
                } else {
                    TokenKind::Eq
                }
            }
            '!' => {
                if self.eat('=') {
                    TokenKind::NotEq
                } else {
                    TokenKind::Bang
                }
            }
            '&' => {
                if self.eat('&') {
                    TokenKind::AndAnd
                } else {
                    TokenKind::Amp
                }
            }
            '|' => {
                if self.eat('|') {
                    TokenKind::OrOr
                } else {
                    TokenKind::Pipe
                }
            }
            '^' => TokenKind::Caret,
            '~' => TokenKind::Tilde,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semicolon,
            '.' => {
                if self.eat('.') {
                    if self.eat('.') {
                        TokenKind::DotDotDot
                    } else {
                        TokenKind::DotDot
                    }
                } else {
                    TokenKind::Dot
                }
            }
            other => {
                self.error(line, column, format!("unrecognized character '{other}'"));
                return self.tok(TokenKind::Eof, line, column);
            }
        };
        self.tok(kind, line, column)
    }

    /// Accumulate literal string text until `${` (splice) or the closing
    /// `"`, handling backslash escapes (spec 4.2 point 2).
    fn lex_string_body(&mut self, any_interp: bool) -> Token {
        let (line, column) = (self.line, self.column);
        let mut buf = String::new();
        loop {
            match self.peek() {
                None => {
                    self.error(line, column, "unterminated string literal");
                    self.mode.pop();
                    return self.tok(TokenKind::Eof, line, column);
                }
                Some('"') => {
                    self.advance();
                    self.mode.pop();
                    if any_interp {
                        if buf.is_empty() {
                            return self.tok(TokenKind::InterpEnd, line, column);
                        }
                        self.pending.push_back(self.tok(TokenKind::InterpEnd, self.line, self.column));
                        return self.tok(TokenKind::InterpText(buf), line, column);
                    }
                    return self.tok(TokenKind::Str(buf), line, column);
                }
                Some('$') if self.peek_at(1) == Some('{') => {
                    self.advance();
                    self.advance();
                    *self.mode.last_mut().unwrap() = LexMode::StringBody { any_interp: true };
                    self.mode.push(LexMode::Interp { depth: 1 });
                    self.pending.push_back(self.tok(TokenKind::InterpOpen, self.line, self.column));
                    return self.tok(TokenKind::InterpText(buf), line, column);
                }
                Some('\\') => {
                    self.advance();
                    match self.advance() {
                        Some('n') => buf.push('\n'),
                        Some('t') => buf.push('\t'),
                        Some('\\') => buf.push('\\'),
                        Some('"') => buf.push('"'),
                        Some('0') => buf.push('\0'),
                        Some(other) => {
                            self.error(self.line, self.column, format!("invalid escape sequence '\\{other}'"));
                            buf.push(other);
                        }
                        None => {
                            self.error(line, column, "unterminated string literal");
                            self.mode.pop();
                            return self.tok(TokenKind::Eof, line, column);
                        }
                    }
                }
                Some(c) => {
                    buf.push(c);
                    self.advance();
                }
            }
        }
    }

    /// Tokenize inside `${ ... }`, tracking brace depth and switching to
    /// format-spec capture on a top-level `:` (spec 4.2 points 4-5).
    fn lex_interp(&mut self, depth: usize) -> Token {
        self.skip_whitespace_and_comments();
        let (line, column) = (self.line, self.column);
        match self.peek() {
            None => {
                self.error(line, column, "unterminated interpolation: missing '}'");
                self.mode.pop();
                self.tok(TokenKind::Eof, line, column)
            }
            Some(':') if depth == 1 => {
                self.advance();
                self.lex_format_spec(line, column)
            }
            Some('{') => {
                self.advance();
                *self.mode.last_mut().unwrap() = LexMode::Interp { depth: depth + 1 };
                self.tok(TokenKind::LBrace, line, column)
            }
            Some('}') => {
                self.advance();
                if depth <= 1 {
                    self.mode.pop();
                    self.tok(TokenKind::InterpClose, line, column)
                } else {
                    *self.mode.last_mut().unwrap() = LexMode::Interp { depth: depth - 1 };
                    self.tok(TokenKind::RBrace, line, column)
                }
            }
            Some('"') => {
                self.advance();
                self.mode.push(LexMode::StringBody { any_interp: false });
                self.next_token()
            }
            _ => self.lex_normal_in_interp(line, column),
        }
    }

    /// Same dispatch as `lex_normal`, but invoked while the top mode is
    /// `Interp` (so number/ident/operator scanning is shared, while `"`,
    /// `:`, `{`, `}` are intercepted by `lex_interp` itself above).
    fn lex_normal_in_interp(&mut self, line: usize, column: usize) -> Token {
        let c = self.peek().unwrap();
        if c.is_ascii_digit() {
            self.lex_number(line, column)
        } else if c == '_' || c.is_alphabetic() {
            self.lex_ident_or_keyword(line, column)
        } else if c == '@' {
            self.lex_builtin(line, column)
        } else {
            self.lex_operator(line, column)
        }
    }

    fn lex_format_spec(&mut self, line: usize, column: usize) -> Token {
        let mut buf = String::new();
        loop {
            match self.peek() {
                None => {
                    self.error(line, column, "unterminated format spec: missing '}'");
                    self.mode.pop();
                    return self.tok(TokenKind::Eof, line, column);
                }
                Some('}') => {
                    self.advance();
                    self.mode.pop();
                    self.pending.push_back(self.tok(TokenKind::InterpClose, self.line, self.column));
                    return self.tok(TokenKind::InterpSpec(buf), line, column);
                }
                Some(c) => {
                    buf.push(c);
                    self.advance();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let (toks, diags) = Lexer::new(src, Rc::from("t.uya")).tokenize();
        assert!(diags.is_empty(), "unexpected diagnostics: {}", diags.format());
        toks.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn empty_string_has_no_interp_tokens() {
        assert_eq!(kinds(r#""""#), vec![TokenKind::Str(String::new()), TokenKind::Eof]);
    }

    #[test]
    fn simple_interpolation_sequence() {
        let got = kinds(r#""${x}""#);
        assert_eq!(
            got,
            vec![
                TokenKind::InterpText(String::new()),
                TokenKind::InterpOpen,
                TokenKind::Ident("x".into()),
                TokenKind::InterpClose,
                TokenKind::InterpEnd,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn interpolation_with_format_spec() {
        let got = kinds(r#""n=${n:d}""#);
        assert_eq!(
            got,
            vec![
                TokenKind::InterpText("n=".into()),
                TokenKind::InterpOpen,
                TokenKind::Ident("n".into()),
                TokenKind::InterpSpec("d".into()),
                TokenKind::InterpClose,
                TokenKind::InterpEnd,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn nested_braces_inside_interpolation_track_depth() {
        // `${ f({1}) }` - the inner {1} is a nested brace pair, not the splice terminator.
        let got = kinds(r#""${f({1})}""#);
        assert_eq!(
            got,
            vec![
                TokenKind::InterpText(String::new()),
                TokenKind::InterpOpen,
                TokenKind::Ident("f".into()),
                TokenKind::LParen,
                TokenKind::LBrace,
                TokenKind::Int(1),
                TokenKind::RBrace,
                TokenKind::RParen,
                TokenKind::InterpClose,
                TokenKind::InterpEnd,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn saturating_and_wrapping_operators() {
        assert_eq!(
            kinds("+| -| *| +% -% *%"),
            vec![
                TokenKind::PlusPipe,
                TokenKind::MinusPipe,
                TokenKind::StarPipe,
                TokenKind::PlusPercent,
                TokenKind::MinusPercent,
                TokenKind::StarPercent,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn range_dot_does_not_start_a_number() {
        assert_eq!(kinds("0..4"), vec![TokenKind::Int(0), TokenKind::DotDot, TokenKind::Int(4), TokenKind::Eof]);
    }

    #[test]
    fn float_with_exponent() {
        assert_eq!(kinds("1.5e-3"), vec![TokenKind::Float(1.5e-3), TokenKind::Eof]);
    }

    #[test]
    fn unknown_builtin_is_a_diagnostic() {
        let (_, diags) = Lexer::new("@bogus", Rc::from("t.uya")).tokenize();
        assert!(diags.has_errors());
    }

    #[test]
    fn lexer_round_trip_excludes_interp_control_tokens() {
        // Concatenating lexemes (excluding interpolation-control tokens)
        // reconstructs the lexically significant content (spec 8).
        let src = "fn add(a: i32, b: i32) i32 { return a + b; }";
        let (toks, _) = Lexer::new(src, Rc::from("t.uya")).tokenize();
        assert!(!toks.is_empty());
        assert!(matches!(toks.last().unwrap().kind, TokenKind::Eof));
    }
}
