//! Tokenizer and token cursor shared by the mesh and animation parsers.
//!
//! Tokens carry their 1-based source line. Records such as `vert`, `tri` or
//! a joint line must sit on a single line; the cursor enforces that while a
//! record is open so a missing field is reported on the line it belongs to
//! instead of silently consuming the next record.

use glam::{Vec2, Vec3};

use crate::error::{Error, Location, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenKind<'a> {
    /// Keyword or number, anything up to whitespace or a delimiter.
    Word(&'a str),
    /// Contents of a double-quoted string.
    Str(&'a str),
    LParen,
    RParen,
    LBrace,
    RBrace,
}

impl TokenKind<'_> {
    fn describe(&self) -> String {
        match self {
            TokenKind::Word(w) => format!("'{w}'"),
            TokenKind::Str(s) => format!("\"{s}\""),
            TokenKind::LParen => "'('".to_string(),
            TokenKind::RParen => "')'".to_string(),
            TokenKind::LBrace => "'{'".to_string(),
            TokenKind::RBrace => "'}'".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub line: usize,
}

/// Split `text` into tokens, dropping whitespace and `//` comments.
pub fn tokenize(text: &str) -> Result<Vec<Token<'_>>> {
    let mut tokens = Vec::new();

    for (line_idx, line) in text.lines().enumerate() {
        let line_no = line_idx + 1;
        let mut rest = line;

        loop {
            rest = rest.trim_start();
            let Some(c) = rest.chars().next() else {
                break;
            };

            let kind = match c {
                '(' => TokenKind::LParen,
                ')' => TokenKind::RParen,
                '{' => TokenKind::LBrace,
                '}' => TokenKind::RBrace,
                '/' if rest.starts_with("//") => break,
                '"' => {
                    let body = &rest[1..];
                    let end = body.find('"').ok_or_else(|| {
                        Error::malformed(Location::Line(line_no), "unterminated string")
                    })?;
                    tokens.push(Token {
                        kind: TokenKind::Str(&body[..end]),
                        line: line_no,
                    });
                    rest = &body[end + 1..];
                    continue;
                }
                _ => {
                    let end = rest
                        .find(|ch: char| ch.is_whitespace() || "(){}\"".contains(ch))
                        .unwrap_or(rest.len());
                    tokens.push(Token {
                        kind: TokenKind::Word(&rest[..end]),
                        line: line_no,
                    });
                    rest = &rest[end..];
                    continue;
                }
            };

            tokens.push(Token {
                kind,
                line: line_no,
            });
            rest = &rest[1..];
        }
    }

    Ok(tokens)
}

/// Forward-only reader over a token list.
pub struct Cursor<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
    record_line: Option<usize>,
}

impl<'a> Cursor<'a> {
    pub fn new(text: &'a str) -> Result<Self> {
        Ok(Self {
            tokens: tokenize(text)?,
            pos: 0,
            record_line: None,
        })
    }

    pub fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos)
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Location of the next token.
    pub fn location(&self) -> Location {
        self.peek()
            .map_or(Location::EndOfInput, |t| Location::Line(t.line))
    }

    /// Start a single-line record; returns its line.
    pub fn begin_record(&mut self) -> Location {
        let at = self.location();
        if let Location::Line(line) = at {
            self.record_line = Some(line);
        }
        at
    }

    /// Close the current record, rejecting trailing fields on the same line.
    pub fn end_record(&mut self) -> Result<()> {
        let Some(line) = self.record_line.take() else {
            return Ok(());
        };
        match self.peek() {
            Some(t) if t.line == line && t.kind != TokenKind::RBrace => Err(Error::malformed(
                Location::Line(line),
                format!("unexpected extra field {}", t.kind.describe()),
            )),
            _ => Ok(()),
        }
    }

    fn next_token(&mut self, what: &str) -> Result<Token<'a>> {
        let Some(token) = self.tokens.get(self.pos).copied() else {
            return Err(Error::malformed(
                Location::EndOfInput,
                format!("expected {what}"),
            ));
        };
        if let Some(line) = self.record_line {
            if token.line != line {
                return Err(Error::malformed(
                    Location::Line(line),
                    format!("record ends early, expected {what}"),
                ));
            }
        }
        self.pos += 1;
        Ok(token)
    }

    fn unexpected(token: Token<'_>, what: &str) -> Error {
        Error::malformed(
            Location::Line(token.line),
            format!("expected {what}, found {}", token.kind.describe()),
        )
    }

    /// Consume any bare word.
    pub fn expect_word(&mut self, what: &str) -> Result<&'a str> {
        let token = self.next_token(what)?;
        match token.kind {
            TokenKind::Word(w) => Ok(w),
            _ => Err(Self::unexpected(token, what)),
        }
    }

    pub fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        let what = format!("'{keyword}'");
        let token = self.next_token(&what)?;
        match token.kind {
            TokenKind::Word(w) if w == keyword => Ok(()),
            _ => Err(Self::unexpected(token, &what)),
        }
    }

    pub fn expect_string(&mut self, what: &str) -> Result<String> {
        let token = self.next_token(what)?;
        match token.kind {
            TokenKind::Str(s) => Ok(s.to_string()),
            _ => Err(Self::unexpected(token, what)),
        }
    }

    pub fn expect_int(&mut self, what: &str) -> Result<i64> {
        let token = self.next_token(what)?;
        match token.kind {
            TokenKind::Word(w) => w.parse::<i64>().map_err(|_| Self::unexpected(token, what)),
            _ => Err(Self::unexpected(token, what)),
        }
    }

    /// An integer that must be zero or positive.
    pub fn expect_count(&mut self, what: &str) -> Result<usize> {
        let at = self.location();
        let value = self.expect_int(what)?;
        usize::try_from(value)
            .map_err(|_| Error::malformed(at, format!("{what} must not be negative, got {value}")))
    }

    pub fn expect_f32(&mut self, what: &str) -> Result<f32> {
        let token = self.next_token(what)?;
        match token.kind {
            TokenKind::Word(w) => match w.parse::<f32>() {
                Ok(v) if v.is_finite() => Ok(v),
                _ => Err(Self::unexpected(token, what)),
            },
            _ => Err(Self::unexpected(token, what)),
        }
    }

    fn expect_kind(&mut self, kind: TokenKind<'static>, what: &str) -> Result<()> {
        let token = self.next_token(what)?;
        if token.kind == kind {
            Ok(())
        } else {
            Err(Self::unexpected(token, what))
        }
    }

    pub fn expect_open_brace(&mut self) -> Result<()> {
        self.expect_kind(TokenKind::LBrace, "'{'")
    }

    pub fn expect_close_brace(&mut self) -> Result<()> {
        self.expect_kind(TokenKind::RBrace, "'}'")
    }

    /// True when the next token closes the current block.
    pub fn at_close_brace(&self) -> bool {
        matches!(self.peek(), Some(t) if t.kind == TokenKind::RBrace)
    }

    /// `( x y )`
    pub fn expect_vec2(&mut self, what: &str) -> Result<Vec2> {
        self.expect_kind(TokenKind::LParen, "'('")?;
        let x = self.expect_f32(what)?;
        let y = self.expect_f32(what)?;
        self.expect_kind(TokenKind::RParen, "')'")?;
        Ok(Vec2::new(x, y))
    }

    /// `( x y z )`
    pub fn expect_vec3(&mut self, what: &str) -> Result<Vec3> {
        self.expect_kind(TokenKind::LParen, "'('")?;
        let x = self.expect_f32(what)?;
        let y = self.expect_f32(what)?;
        let z = self.expect_f32(what)?;
        self.expect_kind(TokenKind::RParen, "')'")?;
        Ok(Vec3::new(x, y, z))
    }
}
