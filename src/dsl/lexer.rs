//! Lexer (tokenizer) for the block language.

use crate::error::{LogicSimError, Result};

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The token's text
    pub text: String,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
}

/// Token types in the block language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// An identifier (block kind, block name, point name, ...)
    Identifier,
    /// A number (integer or floating point, possibly with suffix)
    Number,
    /// A directive (starts with '.')
    Directive,
    /// Point separator ':'
    Colon,
    /// Inversion marker '!'
    Bang,
    /// Equals sign '='
    Equals,
    /// Newline
    Newline,
    /// End of file
    Eof,
}

/// Lexer for tokenizing block-language input.
pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input.
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn token(&self, kind: TokenKind, text: impl Into<String>, line: usize, column: usize) -> Token {
        Token {
            kind,
            text: text.into(),
            line,
            column,
        }
    }

    /// Get the next token.
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace_and_comments();

        let ch = match self.chars.peek().copied() {
            Some(ch) => ch,
            None => return Ok(self.token(TokenKind::Eof, "", self.line, self.column)),
        };

        let line = self.line;
        let column = self.column;

        let token = match ch {
            '\n' => {
                self.advance();
                self.token(TokenKind::Newline, "\n", line, column)
            }
            '.' => {
                self.advance();
                let text = self.read_identifier();
                if text.is_empty() {
                    return Err(LogicSimError::lexer(line, column, "empty directive"));
                }
                self.token(TokenKind::Directive, format!(".{}", text), line, column)
            }
            ':' => {
                self.advance();
                self.token(TokenKind::Colon, ":", line, column)
            }
            '!' => {
                self.advance();
                self.token(TokenKind::Bang, "!", line, column)
            }
            '=' => {
                self.advance();
                self.token(TokenKind::Equals, "=", line, column)
            }
            '-' | '+' | '0'..='9' => {
                let text = self.read_number();
                self.token(TokenKind::Number, text, line, column)
            }
            _ if ch.is_alphabetic() || ch == '_' => {
                let text = self.read_identifier();
                self.token(TokenKind::Identifier, text, line, column)
            }
            _ => {
                return Err(LogicSimError::lexer(
                    line,
                    column,
                    format!("unexpected character '{}'", ch),
                ));
            }
        };

        Ok(token)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(&ch) = self.chars.peek() {
            if ch == ' ' || ch == '\t' || ch == '\r' {
                self.advance();
            } else if ch == '#' || ch == ';' {
                while let Some(&c) = self.chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    // Block kinds such as TIMER-ON carry a dash.
    fn read_identifier(&mut self) -> String {
        let mut text = String::new();
        while let Some(&ch) = self.chars.peek() {
            if ch.is_alphanumeric() || ch == '_' || (ch == '-' && !text.is_empty()) {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        text
    }

    fn read_digits(&mut self, text: &mut String) {
        while let Some(&ch) = self.chars.peek() {
            if ch.is_ascii_digit() {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_number(&mut self) -> String {
        let mut text = String::new();

        if let Some(&ch) = self.chars.peek() {
            if ch == '-' || ch == '+' {
                text.push(ch);
                self.advance();
            }
        }

        self.read_digits(&mut text);

        if let Some(&'.') = self.chars.peek() {
            text.push('.');
            self.advance();
            self.read_digits(&mut text);
        }

        if let Some(&ch) = self.chars.peek() {
            if ch == 'e' || ch == 'E' {
                text.push(ch);
                self.advance();
                if let Some(&sign) = self.chars.peek() {
                    if sign == '-' || sign == '+' {
                        text.push(sign);
                        self.advance();
                    }
                }
                self.read_digits(&mut text);
            }
        }

        // Unit suffix: milli/micro/kilo, plus an optional trailing 's'
        if let Some(&ch) = self.chars.peek() {
            if matches!(ch, 'u' | 'm' | 'k' | 's') {
                text.push(ch);
                self.advance();
                if ch != 's' {
                    if let Some(&'s') = self.chars.peek() {
                        text.push('s');
                        self.advance();
                    }
                }
            }
        }

        text
    }
}

/// Parse a number string with optional unit suffix (`1.5`, `500m`, `500ms`, `2s`).
pub fn parse_value(text: &str) -> Option<f64> {
    let text = text.trim();
    let text = text.strip_suffix('s').unwrap_or(text);
    if text.is_empty() {
        return None;
    }

    let (num_str, multiplier) = match text.chars().last() {
        Some('u') => (&text[..text.len() - 1], 1e-6),
        Some('m') => (&text[..text.len() - 1], 1e-3),
        Some('k') => (&text[..text.len() - 1], 1e3),
        _ => (text, 1.0),
    };

    num_str.parse::<f64>().ok().map(|v| v * multiplier)
}
