use crate::diagnostic::Diagnostic;
use crate::lexeme::Lexeme;
use crate::span::{Span, Spanned};

pub(crate) struct Lexer<'src> {
    source: &'src str,
    pos: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'src> Lexer<'src> {
    pub(crate) fn new(source: &'src str) -> Self {
        Self {
            source,
            pos: 0,
            diagnostics: Vec::new(),
        }
    }

    pub(crate) fn tokenize(mut self) -> (Vec<Spanned<Lexeme>>, Vec<Diagnostic>) {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token();
            let is_eof = tok.node == Lexeme::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        (tokens, self.diagnostics)
    }

    fn bytes(&self) -> &'src [u8] {
        self.source.as_bytes()
    }

    fn next_token(&mut self) -> Spanned<Lexeme> {
        loop {
            self.skip_whitespace_and_comments();

            if self.pos >= self.bytes().len() {
                return self.make_token(Lexeme::Eof, self.pos, self.pos);
            }

            let start = self.pos;
            let ch = self.bytes()[self.pos];

            if is_ident_start(ch) {
                return self.scan_ident_or_keyword();
            }

            if ch.is_ascii_digit()
                || (ch == b'-' && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()))
            {
                return self.scan_number();
            }

            if ch == b'"' {
                return self.scan_string();
            }

            if let Some(tok) = self.scan_symbol(start) {
                return tok;
            }
            // scan_symbol returned None → error was recorded, try again
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.pos < self.bytes().len() && self.bytes()[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }

            // Line comments
            if self.peek_at(0) == Some(b'/') && self.peek_at(1) == Some(b'/') {
                while self.pos < self.bytes().len() && self.bytes()[self.pos] != b'\n' {
                    self.pos += 1;
                }
                continue;
            }

            break;
        }
    }

    /// Identifiers may end in a single `!`, which marks the sentinel form
    /// of a head (`invoke!`).
    fn scan_ident_or_keyword(&mut self) -> Spanned<Lexeme> {
        let start = self.pos;
        while self.pos < self.bytes().len() && is_ident_continue(self.bytes()[self.pos]) {
            self.pos += 1;
        }
        if self.peek_at(0) == Some(b'!') {
            self.pos += 1;
        }
        let text = &self.source[start..self.pos];
        let token = Lexeme::from_keyword(text).unwrap_or_else(|| Lexeme::Ident(text.to_string()));
        self.make_token(token, start, self.pos)
    }

    fn scan_number(&mut self) -> Spanned<Lexeme> {
        let start = self.pos;
        if self.peek_at(0) == Some(b'-') {
            self.pos += 1;
        }
        self.skip_digits();

        let mut is_float = false;
        if self.peek_at(0) == Some(b'.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.pos += 1;
            self.skip_digits();
        }
        if matches!(self.peek_at(0), Some(b'e' | b'E')) {
            let sign = usize::from(matches!(self.peek_at(1), Some(b'-' | b'+')));
            if self.peek_at(1 + sign).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                self.pos += 1 + sign;
                self.skip_digits();
            }
        }

        let text = &self.source[start..self.pos];
        let span = Span::new(start as u32, self.pos as u32);
        if is_float {
            match text.parse::<f64>() {
                Ok(x) => self.make_token(Lexeme::Float(x), start, self.pos),
                Err(_) => {
                    self.diagnostics.push(Diagnostic::error(
                        format!("malformed float literal '{}'", text),
                        span,
                    ));
                    self.make_token(Lexeme::Float(0.0), start, self.pos)
                }
            }
        } else {
            match text.parse::<i64>() {
                Ok(n) => self.make_token(Lexeme::Integer(n), start, self.pos),
                Err(_) => {
                    self.diagnostics.push(
                        Diagnostic::error(format!("integer literal '{}' is out of range", text), span)
                            .with_help(format!(
                                "integers are 64-bit signed: {}..={}",
                                i64::MIN,
                                i64::MAX
                            )),
                    );
                    self.make_token(Lexeme::Integer(0), start, self.pos)
                }
            }
        }
    }

    fn skip_digits(&mut self) {
        while self.pos < self.bytes().len() && self.bytes()[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
    }

    fn scan_string(&mut self) -> Spanned<Lexeme> {
        let start = self.pos;
        self.pos += 1; // opening quote
        let mut text = String::new();
        let mut seg_start = self.pos;
        loop {
            let Some(ch) = self.peek_at(0) else {
                self.diagnostics.push(
                    Diagnostic::error(
                        "unterminated string literal".to_string(),
                        Span::new(start as u32, self.pos as u32),
                    )
                    .with_help("close the string with '\"'".to_string()),
                );
                text.push_str(&self.source[seg_start..self.pos]);
                break;
            };
            match ch {
                b'"' => {
                    text.push_str(&self.source[seg_start..self.pos]);
                    self.pos += 1;
                    break;
                }
                b'\\' => {
                    text.push_str(&self.source[seg_start..self.pos]);
                    let escaped = match self.peek_at(1) {
                        Some(b'n') => Some('\n'),
                        Some(b't') => Some('\t'),
                        Some(b'r') => Some('\r'),
                        Some(b'\\') => Some('\\'),
                        Some(b'"') => Some('"'),
                        _ => None,
                    };
                    match escaped {
                        Some(c) => {
                            text.push(c);
                            self.pos += 2;
                        }
                        None => {
                            self.diagnostics.push(
                                Diagnostic::error(
                                    "unknown escape sequence".to_string(),
                                    Span::new(self.pos as u32, self.pos as u32 + 1),
                                )
                                .with_help(
                                    "supported escapes: \\n \\t \\r \\\\ \\\"".to_string(),
                                ),
                            );
                            self.pos += 1;
                        }
                    }
                    seg_start = self.pos;
                }
                _ => self.pos += 1,
            }
        }
        self.make_token(Lexeme::Str(text), start, self.pos)
    }

    fn scan_symbol(&mut self, start: usize) -> Option<Spanned<Lexeme>> {
        let ch = self.bytes()[self.pos];
        self.pos += 1;

        let token = match ch {
            b'(' => Lexeme::LParen,
            b')' => Lexeme::RParen,
            b'{' => Lexeme::LBrace,
            b'}' => Lexeme::RBrace,
            b'[' => Lexeme::LBracket,
            b']' => Lexeme::RBracket,
            b',' => Lexeme::Comma,
            b'=' => Lexeme::Eq,
            b'<' => Lexeme::Lt,
            b'>' => Lexeme::Gt,
            b':' => {
                if self.peek_at(0) == Some(b':') {
                    self.pos += 1;
                    Lexeme::ColonColon
                } else {
                    Lexeme::Colon
                }
            }
            b'-' if self.peek_at(0) == Some(b'>') => {
                self.pos += 1;
                Lexeme::Arrow
            }
            _ => {
                // Skip the whole character so multi-byte input stays on a boundary.
                while self.pos < self.bytes().len() && !self.source.is_char_boundary(self.pos) {
                    self.pos += 1;
                }
                let found = &self.source[start..self.pos];
                self.diagnostics.push(
                    Diagnostic::error(
                        format!("unexpected character '{}'", found),
                        Span::new(start as u32, self.pos as u32),
                    )
                    .with_help("operators are written as words, e.g. `(add a b)`".to_string()),
                );
                return None;
            }
        };

        Some(self.make_token(token, start, self.pos))
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes().get(self.pos + offset).copied()
    }

    fn make_token(&self, token: Lexeme, start: usize, end: usize) -> Spanned<Lexeme> {
        Spanned::new(token, Span::new(start as u32, end as u32))
    }
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_ident_continue(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_'
}
