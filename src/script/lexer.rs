//! Tokenizer for the transform DSL.
//!
//! Python-style lexical structure: significant indentation (emitted as
//! `Indent`/`Dedent` tokens around a `Newline`-terminated logical line),
//! `#` comments, and newlines suppressed inside brackets.

use crate::error::{AppError, ErrorKind};

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),

    Newline,
    Indent,
    Dedent,

    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
    Semicolon,

    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,

    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,

    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    Def,
    Return,
    If,
    Elif,
    Else,
    For,
    While,
    Break,
    Continue,
    Pass,
    And,
    Or,
    Not,
    In,
    Import,
    From,
    True,
    False,
    None,

    Eof,
}

impl Tok {
    fn from_keyword(text: &str) -> Option<Tok> {
        Some(match text {
            "def" => Tok::Def,
            "return" => Tok::Return,
            "if" => Tok::If,
            "elif" => Tok::Elif,
            "else" => Tok::Else,
            "for" => Tok::For,
            "while" => Tok::While,
            "break" => Tok::Break,
            "continue" => Tok::Continue,
            "pass" => Tok::Pass,
            "and" => Tok::And,
            "or" => Tok::Or,
            "not" => Tok::Not,
            "in" => Tok::In,
            "import" => Tok::Import,
            "from" => Tok::From,
            "True" => Tok::True,
            "False" => Tok::False,
            "None" => Tok::None,
            _ => return Option::None,
        })
    }
}

/// A token plus the 1-based source line it started on.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub tok: Tok,
    pub line: usize,
}

struct Lexer<'src> {
    source: &'src [u8],
    pos: usize,
    line: usize,
    /// Indentation column stack; always starts with 0.
    indents: Vec<usize>,
    /// Open bracket depth; newlines inside brackets are not logical.
    bracket_depth: usize,
    tokens: Vec<Token>,
}

/// Tokenize DSL source.
pub fn tokenize(source: &str) -> Result<Vec<Token>, AppError> {
    let mut lexer = Lexer {
        source: source.as_bytes(),
        pos: 0,
        line: 1,
        indents: vec![0],
        bracket_depth: 0,
        tokens: Vec::new(),
    };
    lexer.run()?;
    Ok(lexer.tokens)
}

impl<'src> Lexer<'src> {
    fn run(&mut self) -> Result<(), AppError> {
        loop {
            if self.at_line_start() {
                if !self.handle_indentation()? {
                    break; // EOF
                }
            }
            if !self.scan_line()? {
                break; // EOF
            }
        }

        // Close the final logical line and any open blocks.
        if self
            .tokens
            .last()
            .is_some_and(|t| !matches!(t.tok, Tok::Newline))
        {
            self.push(Tok::Newline);
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push(Tok::Dedent);
        }
        self.push(Tok::Eof);
        Ok(())
    }

    fn at_line_start(&self) -> bool {
        self.bracket_depth == 0
            && self
                .tokens
                .last()
                .is_none_or(|t| matches!(t.tok, Tok::Newline))
    }

    /// Measure and apply the indentation of the next non-blank line.
    ///
    /// Returns `false` at end of input.
    fn handle_indentation(&mut self) -> Result<bool, AppError> {
        loop {
            let mut col = 0;
            while self.pos < self.source.len() {
                match self.source[self.pos] {
                    b' ' => col += 1,
                    b'\t' => col += 4,
                    _ => break,
                }
                self.pos += 1;
            }

            if self.pos >= self.source.len() {
                return Ok(false);
            }

            // Blank and comment-only lines do not affect indentation.
            match self.source[self.pos] {
                b'\n' => {
                    self.pos += 1;
                    self.line += 1;
                    continue;
                }
                b'\r' => {
                    self.pos += 1;
                    continue;
                }
                b'#' => {
                    while self.pos < self.source.len() && self.source[self.pos] != b'\n' {
                        self.pos += 1;
                    }
                    continue;
                }
                _ => {}
            }

            let current = *self.indents.last().unwrap_or(&0);
            if col > current {
                self.indents.push(col);
                self.push(Tok::Indent);
            } else if col < current {
                while self.indents.last().is_some_and(|&top| top > col) {
                    self.indents.pop();
                    self.push(Tok::Dedent);
                }
                if *self.indents.last().unwrap_or(&0) != col {
                    return Err(self.error(format!(
                        "inconsistent indentation (column {col})"
                    )));
                }
            }
            return Ok(true);
        }
    }

    /// Scan tokens until the end of the logical line. Returns `false` at EOF.
    fn scan_line(&mut self) -> Result<bool, AppError> {
        while self.pos < self.source.len() {
            let ch = self.source[self.pos];
            match ch {
                b' ' | b'\t' | b'\r' => {
                    self.pos += 1;
                }
                b'\\' if self.peek(1) == Some(b'\n') => {
                    // Explicit line continuation.
                    self.pos += 2;
                    self.line += 1;
                }
                b'#' => {
                    while self.pos < self.source.len() && self.source[self.pos] != b'\n' {
                        self.pos += 1;
                    }
                }
                b'\n' => {
                    self.pos += 1;
                    if self.bracket_depth == 0 {
                        if self
                            .tokens
                            .last()
                            .is_some_and(|t| !matches!(t.tok, Tok::Newline))
                        {
                            // The Newline token carries the line it ends.
                            self.push(Tok::Newline);
                        }
                        self.line += 1;
                        return Ok(true);
                    }
                    self.line += 1;
                }
                b'\'' | b'"' => self.scan_string(ch)?,
                b'0'..=b'9' => self.scan_number()?,
                b'.' if self.peek(1).is_some_and(|c| c.is_ascii_digit()) => self.scan_number()?,
                _ if is_ident_start(ch) => self.scan_ident(),
                _ => self.scan_symbol()?,
            }
        }
        Ok(false)
    }

    fn scan_ident(&mut self) {
        let start = self.pos;
        while self.pos < self.source.len() && is_ident_continue(self.source[self.pos]) {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.source[start..self.pos]).unwrap_or_default();
        let tok = Tok::from_keyword(text).unwrap_or_else(|| Tok::Ident(text.to_string()));
        self.push(tok);
    }

    fn scan_number(&mut self) -> Result<(), AppError> {
        let start = self.pos;
        let mut is_float = false;

        while self.pos < self.source.len() && self.source[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        if self.pos < self.source.len() && self.source[self.pos] == b'.' {
            // A trailing method call like `1 .upper` is not a thing we accept;
            // any dot directly after digits is part of the literal.
            is_float = true;
            self.pos += 1;
            while self.pos < self.source.len() && self.source[self.pos].is_ascii_digit() {
                self.pos += 1;
            }
        }
        if self.pos < self.source.len() && matches!(self.source[self.pos], b'e' | b'E') {
            let mut lookahead = self.pos + 1;
            if self.source.get(lookahead).copied().is_some_and(|c| c == b'+' || c == b'-') {
                lookahead += 1;
            }
            if self
                .source
                .get(lookahead)
                .copied()
                .is_some_and(|c| c.is_ascii_digit())
            {
                is_float = true;
                self.pos = lookahead;
                while self.pos < self.source.len() && self.source[self.pos].is_ascii_digit() {
                    self.pos += 1;
                }
            }
        }

        let text = std::str::from_utf8(&self.source[start..self.pos]).unwrap_or_default();
        if is_float {
            let v: f64 = text
                .parse()
                .map_err(|_| self.error(format!("invalid float literal '{text}'")))?;
            self.push(Tok::Float(v));
        } else {
            let v: i64 = text
                .parse()
                .map_err(|_| self.error(format!("invalid integer literal '{text}'")))?;
            self.push(Tok::Int(v));
        }
        Ok(())
    }

    fn scan_string(&mut self, quote: u8) -> Result<(), AppError> {
        self.pos += 1; // opening quote
        let mut out = String::new();
        while self.pos < self.source.len() {
            let ch = self.source[self.pos];
            if ch == quote {
                self.pos += 1;
                self.push(Tok::Str(out));
                return Ok(());
            }
            match ch {
                b'\n' => return Err(self.error("unterminated string literal")),
                b'\\' => {
                    self.pos += 1;
                    let esc = self
                        .source
                        .get(self.pos)
                        .copied()
                        .ok_or_else(|| self.error("unterminated string escape"))?;
                    let decoded = match esc {
                        b'n' => '\n',
                        b't' => '\t',
                        b'r' => '\r',
                        b'\\' => '\\',
                        b'\'' => '\'',
                        b'"' => '"',
                        b'0' => '\0',
                        other => {
                            // Unknown escapes are kept verbatim, backslash included.
                            out.push('\\');
                            other as char
                        }
                    };
                    out.push(decoded);
                    self.pos += 1;
                }
                _ => {
                    // Multi-byte UTF-8 sequences are copied through unchanged.
                    let rest = &self.source[self.pos..];
                    let s = std::str::from_utf8(rest)
                        .map_err(|_| self.error("invalid UTF-8 in string literal"))?;
                    let c = s.chars().next().unwrap_or('\u{FFFD}');
                    out.push(c);
                    self.pos += c.len_utf8();
                }
            }
        }
        Err(self.error("unterminated string literal"))
    }

    fn scan_symbol(&mut self) -> Result<(), AppError> {
        let ch = self.source[self.pos];
        let next = self.peek(1);
        let (tok, len) = match (ch, next) {
            (b'*', Some(b'*')) => (Tok::DoubleStar, 2),
            (b'*', Some(b'=')) => (Tok::StarAssign, 2),
            (b'/', Some(b'/')) => (Tok::DoubleSlash, 2),
            (b'+', Some(b'=')) => (Tok::PlusAssign, 2),
            (b'-', Some(b'=')) => (Tok::MinusAssign, 2),
            (b'=', Some(b'=')) => (Tok::Eq, 2),
            (b'!', Some(b'=')) => (Tok::Ne, 2),
            (b'<', Some(b'=')) => (Tok::Le, 2),
            (b'>', Some(b'=')) => (Tok::Ge, 2),
            (b'(', _) => (Tok::LParen, 1),
            (b')', _) => (Tok::RParen, 1),
            (b'[', _) => (Tok::LBracket, 1),
            (b']', _) => (Tok::RBracket, 1),
            (b'{', _) => (Tok::LBrace, 1),
            (b'}', _) => (Tok::RBrace, 1),
            (b',', _) => (Tok::Comma, 1),
            (b':', _) => (Tok::Colon, 1),
            (b'.', _) => (Tok::Dot, 1),
            (b';', _) => (Tok::Semicolon, 1),
            (b'+', _) => (Tok::Plus, 1),
            (b'-', _) => (Tok::Minus, 1),
            (b'*', _) => (Tok::Star, 1),
            (b'/', _) => (Tok::Slash, 1),
            (b'%', _) => (Tok::Percent, 1),
            (b'=', _) => (Tok::Assign, 1),
            (b'<', _) => (Tok::Lt, 1),
            (b'>', _) => (Tok::Gt, 1),
            _ => {
                return Err(self.error(format!("unexpected character '{}'", ch as char)));
            }
        };

        match tok {
            Tok::LParen | Tok::LBracket | Tok::LBrace => self.bracket_depth += 1,
            Tok::RParen | Tok::RBracket | Tok::RBrace => {
                self.bracket_depth = self.bracket_depth.saturating_sub(1);
            }
            _ => {}
        }

        self.pos += len;
        self.push(tok);
        Ok(())
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn push(&mut self, tok: Tok) {
        self.tokens.push(Token {
            tok,
            line: self.line,
        });
    }

    fn error(&self, message: impl Into<String>) -> AppError {
        AppError::new(
            ErrorKind::SynthesisSyntaxError,
            format!("line {}: {}", self.line, message.into()),
        )
    }
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_ident_continue(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(source: &str) -> Vec<Tok> {
        tokenize(source).unwrap().into_iter().map(|t| t.tok).collect()
    }

    #[test]
    fn simple_def_produces_indent_structure() {
        let t = toks("def transform(x):\n    return x\n");
        assert_eq!(
            t,
            vec![
                Tok::Def,
                Tok::Ident("transform".to_string()),
                Tok::LParen,
                Tok::Ident("x".to_string()),
                Tok::RParen,
                Tok::Colon,
                Tok::Newline,
                Tok::Indent,
                Tok::Return,
                Tok::Ident("x".to_string()),
                Tok::Newline,
                Tok::Dedent,
                Tok::Eof,
            ]
        );
    }

    #[test]
    fn newlines_inside_brackets_are_not_logical() {
        let t = toks("def transform(x):\n    return {\n        'a': 1\n    }\n");
        assert!(!t
            .windows(2)
            .any(|w| w[0] == Tok::LBrace && w[1] == Tok::Newline));
    }

    #[test]
    fn blank_and_comment_lines_do_not_dedent() {
        let t = toks("def transform(x):\n    a = 1\n\n    # comment\n    return a\n");
        let dedents = t.iter().filter(|t| **t == Tok::Dedent).count();
        assert_eq!(dedents, 1);
    }

    #[test]
    fn string_escapes_are_decoded() {
        let t = toks("x = 'a\\nb'\n");
        assert!(t.contains(&Tok::Str("a\nb".to_string())));
    }

    #[test]
    fn number_literals() {
        assert!(toks("x = 12\n").contains(&Tok::Int(12)));
        assert!(toks("x = 1.5\n").contains(&Tok::Float(1.5)));
        assert!(toks("x = 2e3\n").contains(&Tok::Float(2000.0)));
    }

    #[test]
    fn inconsistent_indentation_is_an_error() {
        let err = tokenize("def transform(x):\n        a = 1\n    return a\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SynthesisSyntaxError);
    }
}
