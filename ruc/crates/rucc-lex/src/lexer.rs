//! Lexer / token stream (§4.9).
//!
//! Tokenizes the already-preprocessed text produced by
//! [`crate::preprocessor::preprocess`]. Lexical errors are resynchronized
//! at a safe point (the offending character, or the terminator of an
//! unterminated literal) so more than one lexical error can be reported
//! per run, which is explicitly carved out of the parser/semantic "no
//! error recovery" Non-goal (§4.9).

use rucc_util::{Span, Symbol};

use crate::cursor::Cursor;
use crate::error::LexError;
use crate::token::{Token, TokenKind};

pub struct Lexer<'a> {
    cursor: Cursor<'a>,
    errors: Vec<LexError>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            cursor: Cursor::new(source),
            errors: Vec::new(),
        }
    }

    /// Tokenizes the whole input, collecting as many lexical errors as
    /// possible rather than stopping at the first one.
    pub fn tokenize(mut self) -> (Vec<Token>, Vec<LexError>) {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.kind.is_eof();
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        (tokens, self.errors)
    }

    fn span_from(&self, start_pos: usize, start_line: u32, start_col: u32) -> Span {
        Span::new(start_pos, self.cursor.position(), start_line, start_col)
    }

    fn skip_trivia(&mut self) {
        loop {
            self.cursor.skip_whitespace();
            if self.cursor.current_char() == '/' && self.cursor.peek_char(1) == '/' {
                while !self.cursor.is_at_end() && self.cursor.current_char() != '\n' {
                    self.cursor.advance();
                }
                continue;
            }
            if self.cursor.current_char() == '/' && self.cursor.peek_char(1) == '*' {
                let start_line = self.cursor.line();
                let start_col = self.cursor.column();
                let start_pos = self.cursor.position();
                self.cursor.advance();
                self.cursor.advance();
                let mut closed = false;
                while !self.cursor.is_at_end() {
                    if self.cursor.current_char() == '*' && self.cursor.peek_char(1) == '/' {
                        self.cursor.advance();
                        self.cursor.advance();
                        closed = true;
                        break;
                    }
                    self.cursor.advance();
                }
                if !closed {
                    self.errors.push(LexError::UnterminatedComment);
                    let _ = (start_line, start_col, start_pos);
                }
                continue;
            }
            break;
        }
    }

    fn next_token(&mut self) -> Token {
        self.skip_trivia();

        let start_pos = self.cursor.position();
        let start_line = self.cursor.line();
        let start_col = self.cursor.column();

        if self.cursor.is_at_end() {
            return Token::new(TokenKind::Eof, self.span_from(start_pos, start_line, start_col));
        }

        let c = self.cursor.current_char();

        if is_ident_start(c) {
            return self.lex_ident(start_pos, start_line, start_col);
        }
        if c.is_ascii_digit() {
            return self.lex_number(start_pos, start_line, start_col);
        }
        if c == '"' {
            return self.lex_string(start_pos, start_line, start_col);
        }
        if c == '\'' {
            return self.lex_char(start_pos, start_line, start_col);
        }

        self.lex_operator(start_pos, start_line, start_col)
    }

    fn lex_ident(&mut self, start_pos: usize, start_line: u32, start_col: u32) -> Token {
        let mut text = String::new();
        while is_ident_continue(self.cursor.current_char()) {
            text.push(self.cursor.current_char());
            self.cursor.advance();
        }
        let symbol = Symbol::intern(&text);
        Token::new(
            TokenKind::Ident(symbol),
            self.span_from(start_pos, start_line, start_col),
        )
    }

    fn lex_number(&mut self, start_pos: usize, start_line: u32, start_col: u32) -> Token {
        let mut text = String::new();
        while self.cursor.current_char().is_ascii_digit() {
            text.push(self.cursor.current_char());
            self.cursor.advance();
        }
        let mut is_float = false;
        if self.cursor.current_char() == '.' && self.cursor.peek_char(1).is_ascii_digit() {
            is_float = true;
            text.push('.');
            self.cursor.advance();
            while self.cursor.current_char().is_ascii_digit() {
                text.push(self.cursor.current_char());
                self.cursor.advance();
            }
        }
        let span = self.span_from(start_pos, start_line, start_col);
        if is_float {
            match text.parse::<f64>() {
                Ok(v) => Token::new(TokenKind::FloatLiteral(v), span),
                Err(_) => {
                    self.errors.push(LexError::InvalidNumber(text));
                    Token::new(TokenKind::FloatLiteral(0.0), span)
                }
            }
        } else {
            match text.parse::<i64>() {
                Ok(v) => Token::new(TokenKind::IntLiteral(v), span),
                Err(_) => {
                    self.errors.push(LexError::InvalidNumber(text));
                    Token::new(TokenKind::IntLiteral(0), span)
                }
            }
        }
    }

    fn lex_string(&mut self, start_pos: usize, start_line: u32, start_col: u32) -> Token {
        self.cursor.advance(); // opening quote
        let mut text = String::new();
        let mut terminated = false;
        while !self.cursor.is_at_end() {
            match self.cursor.current_char() {
                '"' => {
                    self.cursor.advance();
                    terminated = true;
                    break;
                }
                '\\' => {
                    self.cursor.advance();
                    text.push(unescape(self.cursor.current_char()));
                    self.cursor.advance();
                }
                '\n' => break,
                c => {
                    text.push(c);
                    self.cursor.advance();
                }
            }
        }
        if !terminated {
            self.errors.push(LexError::UnterminatedString);
        }
        Token::new(
            TokenKind::StringLiteral(Symbol::intern(&text)),
            self.span_from(start_pos, start_line, start_col),
        )
    }

    fn lex_char(&mut self, start_pos: usize, start_line: u32, start_col: u32) -> Token {
        self.cursor.advance(); // opening quote
        let value = if self.cursor.current_char() == '\\' {
            self.cursor.advance();
            let c = unescape(self.cursor.current_char());
            self.cursor.advance();
            c
        } else {
            let c = self.cursor.current_char();
            self.cursor.advance();
            c
        };
        let span = self.span_from(start_pos, start_line, start_col);
        if self.cursor.current_char() == '\'' {
            self.cursor.advance();
        } else {
            self.errors.push(LexError::UnterminatedChar);
        }
        Token::new(TokenKind::CharLiteral(value), span)
    }

    fn lex_operator(&mut self, start_pos: usize, start_line: u32, start_col: u32) -> Token {
        let c = self.cursor.current_char();
        self.cursor.advance();
        let kind = match c {
            '+' => TokenKind::Plus,
            '-' => {
                if self.cursor.match_char('>') {
                    TokenKind::Arrow
                } else {
                    TokenKind::Minus
                }
            }
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '=' => {
                if self.cursor.match_char('=') {
                    TokenKind::Eq
                } else {
                    TokenKind::Assign
                }
            }
            '!' => {
                if self.cursor.match_char('=') {
                    TokenKind::Ne
                } else {
                    TokenKind::Not
                }
            }
            '<' => {
                if self.cursor.match_char('=') {
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.cursor.match_char('=') {
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            '&' => {
                if self.cursor.match_char('&') {
                    TokenKind::AndAnd
                } else {
                    TokenKind::Amp
                }
            }
            '|' => {
                if self.cursor.match_char('|') {
                    TokenKind::OrOr
                } else {
                    self.errors.push(LexError::UnexpectedChar('|'));
                    return self.next_token();
                }
            }
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semi,
            ':' => TokenKind::Colon,
            '.' => TokenKind::Dot,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '?' => TokenKind::Question,
            other => {
                self.errors.push(LexError::UnexpectedChar(other));
                return self.next_token();
            }
        };
        Token::new(kind, self.span_from(start_pos, start_line, start_col))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn unescape(c: char) -> char {
    match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '0' => '\0',
        '\\' => '\\',
        '\'' => '\'',
        '"' => '"',
        other => other,
    }
}
