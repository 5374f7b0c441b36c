//! SQL lexer for DDL dumps.

use std::iter::Peekable;
use std::str::Chars;

/// SQL token types.
///
/// Words that double as common column names (`comment`, `action`, `set`,
/// `unsigned`) stay identifiers; the parser matches them by text.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Keywords
    Create,
    Alter,
    Add,
    Table,
    Only,
    Primary,
    Key,
    Foreign,
    References,
    Not,
    Null,
    Unique,
    Default,
    On,
    Delete,
    Update,
    Cascade,
    Restrict,
    Constraint,
    Index,
    If,
    Exists,
    Auto,
    Increment,
    /// `SERIAL`, `BIGSERIAL` or `SMALLSERIAL`, upper-cased
    Serial(String),
    Check,

    // Identifiers and literals
    Ident(String),
    Str(String),
    Num(String),

    // Symbols
    LParen,
    RParen,
    Comma,
    Semicolon,
    Dot,
    Eq,

    Eof,
}

impl Token {
    /// Text of a token that may name a column when unquoted.
    ///
    /// Non-reserved keywords come back lower-cased, the way PostgreSQL folds
    /// unquoted names.
    pub fn column_word(&self) -> Option<String> {
        let word = match self {
            Token::Ident(name) => return Some(name.clone()),
            Token::Serial(name) => return Some(name.to_lowercase()),
            Token::Add => "add",
            Token::Only => "only",
            Token::Key => "key",
            Token::Index => "index",
            Token::Update => "update",
            Token::Delete => "delete",
            Token::Cascade => "cascade",
            Token::Restrict => "restrict",
            Token::Auto => "auto",
            Token::Increment => "increment",
            Token::Exists => "exists",
            Token::If => "if",
            _ => return None,
        };
        Some(word.to_string())
    }
}

pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    current_char: Option<char>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut chars = input.chars().peekable();
        let current_char = chars.next();
        Self { chars, current_char }
    }

    fn advance(&mut self) {
        self.current_char = self.chars.next();
    }

    fn peek(&mut self) -> Option<&char> {
        self.chars.peek()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.current_char {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.current_char {
            self.advance();
            if c == '\n' {
                break;
            }
        }
    }

    fn skip_block_comment(&mut self) {
        self.advance(); // skip *
        while let Some(c) = self.current_char {
            self.advance();
            if c == '*' && self.current_char == Some('/') {
                self.advance();
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut ident = String::new();
        while let Some(c) = self.current_char {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                ident.push(c);
                self.advance();
            } else {
                break;
            }
        }
        ident
    }

    /// Reads a quoted identifier or string literal, honouring doubled quotes.
    fn read_quoted(&mut self, quote: char, backslash_escapes: bool) -> String {
        self.advance(); // opening quote
        let mut s = String::new();
        while let Some(c) = self.current_char {
            if c == quote {
                if self.peek() == Some(&quote) {
                    s.push(c);
                    self.advance();
                    self.advance();
                } else {
                    self.advance();
                    break;
                }
            } else if backslash_escapes && c == '\\' {
                self.advance();
                if let Some(escaped) = self.current_char {
                    match escaped {
                        'n' => s.push('\n'),
                        't' => s.push('\t'),
                        'r' => s.push('\r'),
                        _ => s.push(escaped),
                    }
                    self.advance();
                }
            } else {
                s.push(c);
                self.advance();
            }
        }
        s
    }

    fn read_number(&mut self) -> String {
        let mut num = String::new();
        let mut has_dot = false;

        if self.current_char == Some('-') {
            num.push('-');
            self.advance();
        }

        while let Some(c) = self.current_char {
            if c.is_ascii_digit() {
                num.push(c);
                self.advance();
            } else if c == '.' && !has_dot {
                has_dot = true;
                num.push(c);
                self.advance();
            } else {
                break;
            }
        }
        num
    }

    fn keyword_or_ident(s: &str) -> Token {
        match s.to_uppercase().as_str() {
            "CREATE" => Token::Create,
            "ALTER" => Token::Alter,
            "ADD" => Token::Add,
            "TABLE" => Token::Table,
            "ONLY" => Token::Only,
            "PRIMARY" => Token::Primary,
            "KEY" => Token::Key,
            "FOREIGN" => Token::Foreign,
            "REFERENCES" => Token::References,
            "NOT" => Token::Not,
            "NULL" => Token::Null,
            "UNIQUE" => Token::Unique,
            "DEFAULT" => Token::Default,
            "ON" => Token::On,
            "DELETE" => Token::Delete,
            "UPDATE" => Token::Update,
            "CASCADE" => Token::Cascade,
            "RESTRICT" => Token::Restrict,
            "CONSTRAINT" => Token::Constraint,
            "INDEX" => Token::Index,
            "IF" => Token::If,
            "EXISTS" => Token::Exists,
            "AUTO_INCREMENT" | "AUTOINCREMENT" | "INCREMENT" => Token::Increment,
            "AUTO" => Token::Auto,
            upper @ ("SERIAL" | "BIGSERIAL" | "SMALLSERIAL") => Token::Serial(upper.to_string()),
            "CHECK" => Token::Check,
            _ => Token::Ident(s.to_string()),
        }
    }

    pub fn next_token(&mut self) -> Token {
        loop {
            self.skip_whitespace();

            match self.current_char {
                None => return Token::Eof,

                Some('-') => {
                    if self.peek() == Some(&'-') {
                        self.skip_line_comment();
                        continue;
                    } else if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                        return Token::Num(self.read_number());
                    }
                    self.advance();
                }

                Some('/') => {
                    self.advance();
                    if self.current_char == Some('*') {
                        self.skip_block_comment();
                    }
                }

                Some('#') => self.skip_line_comment(),

                Some('(') => {
                    self.advance();
                    return Token::LParen;
                }
                Some(')') => {
                    self.advance();
                    return Token::RParen;
                }
                Some(',') => {
                    self.advance();
                    return Token::Comma;
                }
                Some(';') => {
                    self.advance();
                    return Token::Semicolon;
                }
                Some('.') => {
                    self.advance();
                    return Token::Dot;
                }
                Some('=') => {
                    self.advance();
                    return Token::Eq;
                }

                Some(q @ ('"' | '`')) => return Token::Ident(self.read_quoted(q, false)),
                Some('[') => {
                    // SQL Server style [identifier]
                    self.advance();
                    let mut ident = String::new();
                    while let Some(c) = self.current_char {
                        self.advance();
                        if c == ']' {
                            break;
                        }
                        ident.push(c);
                    }
                    return Token::Ident(ident);
                }

                Some('\'') => return Token::Str(self.read_quoted('\'', true)),

                Some(c) if c.is_ascii_digit() => return Token::Num(self.read_number()),

                Some(c) if c.is_alphabetic() || c == '_' => {
                    let ident = self.read_identifier();
                    return Self::keyword_or_ident(&ident);
                }

                Some(_) => self.advance(),
            }
        }
    }

    /// Collect all tokens, ending with [`Token::Eof`].
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token == Token::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }
}
