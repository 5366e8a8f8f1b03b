//! Two-state scanner for the macro/template language
//!
//! Mirrors the source's `prepend`-driven design: there is no "include"
//! token, so identifier expansion works by pushing a symbol's value back
//! onto the input and rescanning it. Keeping a single mutable cursor
//! string (rather than a stack of `(source, offset)` frames) makes that
//! prepend a plain `insert_str(0, ..)`.

/// Which grammar the lexer is currently scanning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Gibberish,
    Expression,
}

/// A scanned token, carrying the exact text it matched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Eof,
    Gibberish(String),
    Identifier(String),
    BlockOpen,
    BlockClose,
    Number(String),
    String(String),
    ParenOpen,
    ParenClose,
    CompareOp(String),
    And,
    Or,
    /// a stray `$` in gibberish state, or any character expression state
    /// can't classify
    Unknown(String),
}

/// Scans `input`, one token at a time, switching between [`State::Gibberish`]
/// and [`State::Expression`] as directed by the parser
pub struct Lexer {
    input: String,
    state: State,
}

fn is_id_start(c: char) -> bool {
    c.is_ascii_alphabetic()
}

fn is_id_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

impl Lexer {
    pub fn new(input: impl Into<String>) -> Self {
        Lexer { input: input.into(), state: State::Gibberish }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Switches scanning state; any unread lookahead is implicitly
    /// reinterpreted under the new grammar on the next call
    pub fn set_state(&mut self, state: State) {
        self.state = state;
    }

    /// Pushes `s` back onto the front of the input, for recursive
    /// identifier expansion
    pub fn prepend(&mut self, s: &str) {
        self.input.insert_str(0, s);
    }

    /// Trims leading horizontal whitespace
    ///
    /// When `skip_unconditional` is false, only trims if the remaining
    /// text (after the run of spaces) starts with `$if`, `$elif`, or
    /// `$else`, used between block arms so generated code keeps
    /// intentional indentation elsewhere.
    pub fn delete_spaces(&mut self, skip_unconditional: bool) {
        let run: usize = self.input.chars().take_while(|&c| c == ' ' || c == '\t').count();
        if skip_unconditional {
            self.input.replace_range(..run, "");
            return;
        }
        let rest = &self.input[run..];
        if rest.starts_with("$if") || rest.starts_with("$elif") || rest.starts_with("$else") {
            self.input.replace_range(..run, "");
        }
    }

    fn eat(&mut self, n: usize) -> String {
        let out: String = self.input.chars().take(n).collect();
        let byte_len = out.len();
        self.input.replace_range(..byte_len, "");
        out
    }

    fn starts_with(&self, s: &str) -> bool {
        self.input.starts_with(s)
    }

    /// Returns the next token without consuming it
    pub fn peek(&mut self) -> Token {
        let saved_input = self.input.clone();
        let saved_state = self.state;
        let tok = self.advance(false);
        self.input = saved_input;
        self.state = saved_state;
        tok
    }

    /// Consumes and returns the next token
    ///
    /// `skip_nl`, when true, eats a single trailing `\n` immediately
    /// following the matched token (used after `BlockOpen`/`BlockClose`
    /// so templates can put the block delimiter on its own line).
    pub fn advance(&mut self, skip_nl: bool) -> Token {
        let tok = match self.state {
            State::Gibberish => self.parse_gibberish(),
            State::Expression => self.parse_expr(),
        };
        if skip_nl && self.input.starts_with('\n') {
            self.input.remove(0);
        }
        tok
    }

    fn parse_gibberish(&mut self) -> Token {
        if self.input.is_empty() {
            return Token::Eof;
        }
        if self.starts_with("$$") {
            self.eat(2);
            return Token::Gibberish("$".to_string());
        }
        if self.starts_with("{:") {
            self.eat(2);
            return Token::BlockOpen;
        }
        if self.starts_with(":}") {
            self.eat(2);
            return Token::BlockClose;
        }
        if self.starts_with("$") {
            let mut chars = self.input.chars();
            chars.next();
            if chars.next().map(is_id_start).unwrap_or(false) {
                self.eat(1);
                let mut name = String::new();
                while let Some(c) = self.input.chars().next() {
                    if is_id_continue(c) {
                        name.push(c);
                        self.eat(1);
                    } else {
                        break;
                    }
                }
                return Token::Identifier(name);
            }
            self.eat(1);
            return Token::Unknown("$".to_string());
        }

        let mut run = String::new();
        loop {
            match self.input.chars().next() {
                None => break,
                Some(c) => {
                    if c == '$' || self.starts_with("{:") || self.starts_with(":}") {
                        break;
                    }
                    run.push(c);
                    self.eat(1);
                }
            }
        }
        Token::Gibberish(run)
    }

    fn parse_expr(&mut self) -> Token {
        loop {
            match self.input.chars().next() {
                Some(' ') => {
                    self.eat(1);
                }
                _ => break,
            }
        }
        if self.input.is_empty() {
            return Token::Eof;
        }
        if self.starts_with("$") {
            let mut chars = self.input.chars();
            chars.next();
            if chars.next().map(is_id_start).unwrap_or(false) {
                self.eat(1);
                let mut name = String::new();
                while let Some(c) = self.input.chars().next() {
                    if is_id_continue(c) {
                        name.push(c);
                        self.eat(1);
                    } else {
                        break;
                    }
                }
                return Token::Identifier(name);
            }
        }
        if self.starts_with("0x") || self.starts_with("0X") {
            let prefix = self.eat(2);
            let mut digits = String::new();
            while let Some(c) = self.input.chars().next() {
                if c.is_ascii_hexdigit() {
                    digits.push(c);
                    self.eat(1);
                } else {
                    break;
                }
            }
            return Token::Number(format!("{}{}", prefix, digits));
        }
        if self.input.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false) {
            let mut digits = String::new();
            while let Some(c) = self.input.chars().next() {
                if c.is_ascii_digit() {
                    digits.push(c);
                    self.eat(1);
                } else {
                    break;
                }
            }
            return Token::Number(digits);
        }
        for op in ["<=", "==", "!=", ">=", "<", ">"] {
            if self.starts_with(op) {
                self.eat(op.chars().count());
                return Token::CompareOp(op.to_string());
            }
        }
        if self.starts_with("and ") {
            self.eat(3);
            return Token::And;
        }
        if self.starts_with("or ") {
            self.eat(2);
            return Token::Or;
        }
        if self.starts_with("(") {
            self.eat(1);
            return Token::ParenOpen;
        }
        if self.starts_with(")") {
            self.eat(1);
            return Token::ParenClose;
        }
        if self.starts_with("\"") {
            self.eat(1);
            let mut s = String::new();
            while let Some(c) = self.input.chars().next() {
                if c == '"' {
                    self.eat(1);
                    break;
                }
                s.push(c);
                self.eat(1);
            }
            return Token::String(s);
        }
        if self.input.chars().next().map(is_id_start).unwrap_or(false) {
            let mut s = String::new();
            while let Some(c) = self.input.chars().next() {
                if is_id_continue(c) {
                    s.push(c);
                    self.eat(1);
                } else {
                    break;
                }
            }
            return Token::String(s);
        }

        let c = self.eat(1);
        Token::Unknown(c)
    }
}
