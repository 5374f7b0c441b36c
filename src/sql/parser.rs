//! SQL parser for DDL statements.
//!
//! Understands `CREATE TABLE`, `CREATE [UNIQUE] INDEX` and the
//! `ALTER TABLE ... ADD` forms emitted by `pg_dump` and `mysqldump`. Anything
//! else in the dump is skipped statement by statement.

use super::dialect::Dialect;
use super::lexer::{Lexer, Token};
use super::types::canonical_type;
use crate::ast::{ColumnInfo, ForeignKeyInfo, IndexInfo, ReferentialAction, TableInfo};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlParseError {
    #[error("Expected {expected}, found {found:?}")]
    Expected { expected: &'static str, found: Token },
    #[error("Unexpected end of input in table `{0}`")]
    UnexpectedEof(String),
}

/// Words that end a column type and start its modifiers.
const TYPE_STOP_WORDS: [&str; 7] = [
    "UNSIGNED",
    "SIGNED",
    "ZEROFILL",
    "COMMENT",
    "COLLATE",
    "GENERATED",
    "AS",
];

/// Parse a SQL dump into table metadata, in declaration order.
pub fn parse_sql(input: &str, dialect: Dialect) -> Result<Vec<TableInfo>, SqlParseError> {
    let dialect = dialect.resolve(input);
    let tokens = Lexer::new(input).tokenize();
    let mut parser = Parser::new(tokens, dialect);
    parser.parse()
}

/// Statements that amend a table declared elsewhere in the dump.
enum Amendment {
    PrimaryKey(Vec<String>),
    ForeignKey(ForeignKeyInfo),
    Index(IndexInfo),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    dialect: Dialect,
}

impl Parser {
    fn new(tokens: Vec<Token>, dialect: Dialect) -> Self {
        Self {
            tokens,
            pos: 0,
            dialect,
        }
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens.get(self.pos + offset).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn is_word(&self, word: &str) -> bool {
        matches!(self.current(), Token::Ident(s) if s.eq_ignore_ascii_case(word))
    }

    fn skip_words(&mut self, words: &[&str]) {
        while words.iter().any(|w| self.is_word(w)) {
            self.advance();
        }
    }

    fn take_ident(&mut self) -> Option<String> {
        match self.current() {
            Token::Ident(name) => {
                let name = name.clone();
                self.advance();
                Some(name)
            }
            _ => None,
        }
    }

    /// Like [`Self::take_ident`], but also accepts non-reserved keywords.
    fn take_column_name(&mut self) -> Option<String> {
        let name = self.current().column_word()?;
        self.advance();
        Some(name)
    }

    /// At `KEY`/`INDEX` inside a table body: whether an index clause follows
    /// (`KEY (a)`, `KEY idx (a)`, `KEY idx USING BTREE (a)`) rather than a
    /// column named `key` or `index`.
    fn at_index_clause(&self) -> bool {
        match self.peek_at(1) {
            Token::LParen => true,
            Token::Ident(_) => match self.peek_at(2) {
                Token::LParen => !matches!(self.peek_at(3), Token::Num(_) | Token::Str(_)),
                Token::Ident(word) => word.eq_ignore_ascii_case("USING"),
                _ => false,
            },
            _ => false,
        }
    }

    fn skip_if_exists(&mut self) {
        if self.current() == &Token::If {
            self.advance();
            if self.current() == &Token::Not {
                self.advance();
            }
            if self.current() == &Token::Exists {
                self.advance();
            }
        }
    }

    fn parse(&mut self) -> Result<Vec<TableInfo>, SqlParseError> {
        let mut tables: Vec<TableInfo> = Vec::new();
        let mut amendments: Vec<(String, Amendment)> = Vec::new();

        while self.current() != &Token::Eof {
            match self.current() {
                Token::Create => {
                    self.advance();
                    self.skip_words(&["OR", "REPLACE", "TEMPORARY", "TEMP", "UNLOGGED"]);

                    match self.current() {
                        Token::Table => {
                            self.advance();
                            self.skip_if_exists();
                            if let Some(table) = self.parse_create_table()? {
                                tables.push(table);
                            }
                        }
                        Token::Unique | Token::Index => {
                            if let Some(amendment) = self.parse_create_index() {
                                amendments.push(amendment);
                            }
                        }
                        // Views, sequences, functions, types
                        _ => self.skip_statement(),
                    }
                }
                Token::Alter => {
                    let amended = self.parse_alter_table()?;
                    amendments.extend(amended);
                }
                _ => self.advance(),
            }
        }

        for (table_name, amendment) in amendments {
            let Some(table) = tables.iter_mut().find(|t| t.name == table_name) else {
                tracing::warn!(table = %table_name, "ALTER/INDEX statement for undeclared table ignored");
                continue;
            };
            match amendment {
                Amendment::PrimaryKey(cols) => {
                    mark_not_null(&mut table.columns, &cols);
                    table.primary_key = cols;
                }
                Amendment::ForeignKey(fk) => table.foreign_keys.push(fk),
                Amendment::Index(index) => table.indexes.push(index),
            }
        }

        Ok(tables)
    }

    /// Reads `name` or `schema.name`, returning the last part.
    fn parse_qualified_name(&mut self) -> Option<String> {
        let mut name = self.take_ident()?;
        while self.current() == &Token::Dot {
            self.advance();
            if let Some(part) = self.take_ident() {
                name = part;
            }
        }
        Some(name)
    }

    fn parse_create_table(&mut self) -> Result<Option<TableInfo>, SqlParseError> {
        let Some(table_name) = self.parse_qualified_name() else {
            self.skip_statement();
            return Ok(None);
        };

        // CREATE TABLE ... AS SELECT / LIKE
        if self.current() != &Token::LParen {
            self.skip_statement();
            return Ok(None);
        }
        self.advance();

        let mut table = TableInfo {
            name: table_name,
            columns: Vec::new(),
            primary_key: Vec::new(),
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
        };
        let mut constraint_name: Option<String> = None;

        loop {
            match self.current() {
                Token::RParen => {
                    self.advance();
                    break;
                }
                Token::Comma => {
                    self.advance();
                    constraint_name = None;
                }
                Token::Eof => return Err(SqlParseError::UnexpectedEof(table.name)),
                Token::Constraint => {
                    self.advance();
                    constraint_name = self.take_ident();
                }
                Token::Primary => {
                    self.advance();
                    if self.current() == &Token::Key {
                        self.advance();
                    }
                    table.primary_key = self.parse_column_list();
                    self.skip_until(&[Token::Comma, Token::RParen]);
                }
                Token::Foreign => {
                    if let Some(fk) = self.parse_foreign_key_constraint(constraint_name.take())? {
                        table.foreign_keys.push(fk);
                    }
                    self.skip_until(&[Token::Comma, Token::RParen]);
                }
                Token::Unique => {
                    self.advance();
                    if matches!(self.current(), Token::Key | Token::Index) {
                        self.advance();
                    }
                    let name = self.take_ident().or(constraint_name.take());
                    let columns = self.parse_column_list();
                    table.indexes.push(IndexInfo {
                        name,
                        columns,
                        unique: true,
                    });
                    self.skip_until(&[Token::Comma, Token::RParen]);
                }
                Token::Index | Token::Key if self.at_index_clause() => {
                    self.advance();
                    let name = self.take_ident();
                    let columns = self.parse_column_list();
                    table.indexes.push(IndexInfo {
                        name,
                        columns,
                        unique: false,
                    });
                    self.skip_until(&[Token::Comma, Token::RParen]);
                }
                Token::Check => {
                    self.advance();
                    self.skip_parenthesized();
                }
                Token::Ident(_)
                    if self.is_word("FULLTEXT")
                        || self.is_word("SPATIAL")
                        || self.is_word("EXCLUDE") =>
                {
                    self.skip_until(&[Token::Comma, Token::RParen]);
                }
                token if token.column_word().is_some() => {
                    if let Some(col) = self.parse_column(&mut table)? {
                        table.columns.push(col);
                    }
                }
                _ => self.advance(),
            }
        }

        // Table options (ENGINE=, CHARSET=, ...)
        self.skip_statement();

        let pk = table.primary_key.clone();
        mark_not_null(&mut table.columns, &pk);

        Ok(Some(table))
    }

    fn parse_column(&mut self, table: &mut TableInfo) -> Result<Option<ColumnInfo>, SqlParseError> {
        let Some(name) = self.take_column_name() else {
            return Ok(None);
        };

        let (raw_type, args) = self.parse_type();
        if raw_type.is_empty() {
            self.skip_until(&[Token::Comma, Token::RParen]);
            return Ok(None);
        }

        let mut column = ColumnInfo::new(name.clone(), raw_type);
        column.base_type = canonical_type(&column.raw_type, self.dialect);
        column.autoincrement = column.raw_type.to_uppercase().ends_with("SERIAL");

        let numeric_args: Vec<u32> = args.iter().filter_map(|a| a.parse().ok()).collect();
        match column.base_type.as_str() {
            "decimal" | "float" => {
                column.precision = numeric_args.first().copied();
                column.scale = numeric_args.get(1).copied();
            }
            "string" | "binary" | "varbinary" => column.length = numeric_args.first().copied(),
            _ => {}
        }

        let mut constraint_name: Option<String> = None;

        loop {
            match self.current() {
                Token::Comma | Token::RParen | Token::Eof => break,
                Token::Primary => {
                    self.advance();
                    if self.current() == &Token::Key {
                        self.advance();
                    }
                    column.not_null = true;
                    table.primary_key = vec![name.clone()];
                }
                Token::Not => {
                    self.advance();
                    if self.current() == &Token::Null {
                        self.advance();
                        column.not_null = true;
                    }
                }
                Token::Null => self.advance(),
                Token::Unique => {
                    self.advance();
                    if self.current() == &Token::Key {
                        self.advance();
                    }
                    table.indexes.push(IndexInfo {
                        name: constraint_name.take(),
                        columns: vec![name.clone()],
                        unique: true,
                    });
                }
                Token::Default => {
                    self.advance();
                    column.default = Some(self.parse_default_value());
                }
                Token::References => {
                    self.advance();
                    let (referenced_table, referenced_columns) = self.parse_reference()?;
                    let (on_update, on_delete) = self.parse_on_actions();
                    table.foreign_keys.push(ForeignKeyInfo {
                        name: constraint_name.take(),
                        local_columns: vec![name.clone()],
                        referenced_table,
                        referenced_columns,
                        on_update,
                        on_delete,
                    });
                }
                Token::Increment | Token::Auto => {
                    self.advance();
                    if self.current() == &Token::Increment {
                        self.advance();
                    }
                    column.autoincrement = true;
                }
                Token::Serial(_) => {
                    self.advance();
                    column.autoincrement = true;
                }
                Token::Check => {
                    self.advance();
                    self.skip_parenthesized();
                }
                Token::Constraint => {
                    self.advance();
                    constraint_name = self.take_ident();
                }
                Token::On => {
                    // ON UPDATE CURRENT_TIMESTAMP
                    self.advance();
                    if matches!(self.current(), Token::Update | Token::Delete) {
                        self.advance();
                    }
                    self.parse_default_value();
                }
                Token::LParen => self.skip_parenthesized(),
                Token::Ident(_) if self.is_word("COMMENT") => {
                    self.advance();
                    if self.current() == &Token::Eq {
                        self.advance();
                    }
                    if let Token::Str(text) = self.current() {
                        column.comment = Some(text.clone());
                        self.advance();
                    }
                }
                Token::Ident(_) if self.is_word("UNSIGNED") => {
                    self.advance();
                    column.unsigned = true;
                }
                Token::Ident(_) if self.is_word("GENERATED") => {
                    // GENERATED ... AS IDENTITY
                    self.advance();
                    while !matches!(
                        self.current(),
                        Token::Comma | Token::RParen | Token::Eof
                    ) {
                        if self.is_word("IDENTITY") {
                            column.autoincrement = true;
                        }
                        if self.current() == &Token::LParen {
                            self.skip_parenthesized();
                        } else {
                            self.advance();
                        }
                    }
                }
                _ => self.advance(),
            }
        }

        Ok(Some(column))
    }

    /// Reads a column type and its parenthesized arguments.
    ///
    /// Multi-word types (`double precision`, `timestamp with time zone`)
    /// are joined with single spaces.
    fn parse_type(&mut self) -> (String, Vec<String>) {
        let mut raw = String::new();
        let mut args: Vec<String> = Vec::new();

        loop {
            match self.current().clone() {
                Token::Ident(word) => {
                    let upper = word.to_uppercase();
                    if TYPE_STOP_WORDS.contains(&upper.as_str())
                        || (upper == "CHARACTER" && !raw.is_empty())
                    {
                        break;
                    }
                    if word.is_empty() {
                        // `text[]` lexes as `text` followed by an empty bracket identifier
                        raw.push_str("[]");
                    } else {
                        if !raw.is_empty() {
                            raw.push(' ');
                        }
                        raw.push_str(&word);
                    }
                    self.advance();
                }
                Token::Serial(word) if raw.is_empty() => {
                    raw.push_str(&word);
                    self.advance();
                }
                Token::LParen if !raw.is_empty() && args.is_empty() => {
                    self.advance();
                    loop {
                        match self.current().clone() {
                            Token::Num(n) => args.push(n),
                            Token::Str(s) | Token::Ident(s) => args.push(s),
                            Token::RParen => {
                                self.advance();
                                break;
                            }
                            Token::Eof => break,
                            _ => {}
                        }
                        self.advance();
                    }
                    raw.push('(');
                    raw.push_str(&args.join(","));
                    raw.push(')');
                }
                _ => break,
            }
        }

        (raw, args)
    }

    fn parse_default_value(&mut self) -> String {
        match self.current().clone() {
            // Postgres casts (`'draft'::character varying`) are skipped by the column loop
            Token::Str(s) | Token::Num(s) => {
                self.advance();
                s
            }
            Token::Null => {
                self.advance();
                "NULL".to_string()
            }
            Token::Ident(s) => {
                let mut val = s;
                self.advance();
                // Function calls like NOW() or nextval('seq')
                if self.current() == &Token::LParen {
                    self.advance();
                    val.push('(');
                    val.push_str(&self.collect_until_paren());
                    val.push(')');
                }
                val
            }
            Token::LParen => {
                self.advance();
                format!("({})", self.collect_until_paren())
            }
            _ => String::new(),
        }
    }

    fn collect_until_paren(&mut self) -> String {
        let mut parts = Vec::new();
        let mut depth = 1;

        loop {
            match self.current().clone() {
                Token::LParen => {
                    depth += 1;
                    parts.push("(".to_string());
                }
                Token::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        self.advance();
                        break;
                    }
                    parts.push(")".to_string());
                }
                Token::Ident(s) | Token::Num(s) => parts.push(s),
                Token::Str(s) => parts.push(format!("'{}'", s)),
                Token::Comma => parts.push(",".to_string()),
                Token::Eof => break,
                _ => {}
            }
            self.advance();
        }

        parts.join(" ")
    }

    /// Parses `table [(col, ...)]` after REFERENCES.
    ///
    /// An omitted column list means the referenced table's primary key and
    /// is returned empty.
    fn parse_reference(&mut self) -> Result<(String, Vec<String>), SqlParseError> {
        let Some(target) = self.parse_qualified_name() else {
            return Err(SqlParseError::Expected {
                expected: "referenced table name",
                found: self.current().clone(),
            });
        };
        let columns = self.parse_column_list();
        Ok((target, columns))
    }

    fn parse_foreign_key_constraint(
        &mut self,
        name: Option<String>,
    ) -> Result<Option<ForeignKeyInfo>, SqlParseError> {
        self.advance(); // FOREIGN
        if self.current() != &Token::Key {
            return Ok(None);
        }
        self.advance(); // KEY

        // MySQL allows an index name here
        let index_name = self.take_ident();
        let local_columns = self.parse_column_list();

        if self.current() != &Token::References {
            return Ok(None);
        }
        self.advance();

        let (referenced_table, referenced_columns) = self.parse_reference()?;
        let (on_update, on_delete) = self.parse_on_actions();

        Ok(Some(ForeignKeyInfo {
            name: name.or(index_name),
            local_columns,
            referenced_table,
            referenced_columns,
            on_update,
            on_delete,
        }))
    }

    /// Reads `(a, b DESC, c(10))`, keeping the leading identifier of each item.
    fn parse_column_list(&mut self) -> Vec<String> {
        let mut cols = Vec::new();

        if self.current() != &Token::LParen {
            return cols;
        }
        self.advance();

        let mut expect_name = true;
        loop {
            match self.current() {
                Token::Comma => {
                    expect_name = true;
                    self.advance();
                }
                Token::LParen => self.skip_parenthesized(),
                Token::RParen => {
                    self.advance();
                    break;
                }
                Token::Eof => break,
                token => {
                    if expect_name {
                        if let Some(name) = token.column_word() {
                            cols.push(name);
                            expect_name = false;
                        }
                    }
                    self.advance();
                }
            }
        }

        cols
    }

    /// Returns `(on_update, on_delete)`.
    fn parse_on_actions(&mut self) -> (ReferentialAction, ReferentialAction) {
        let mut on_update = ReferentialAction::NoAction;
        let mut on_delete = ReferentialAction::NoAction;

        while self.current() == &Token::On {
            self.advance();
            let is_delete = match self.current() {
                Token::Delete => true,
                Token::Update => false,
                _ => break,
            };
            self.advance();

            let action = match self.current() {
                Token::Cascade => {
                    self.advance();
                    ReferentialAction::Cascade
                }
                Token::Restrict => {
                    self.advance();
                    ReferentialAction::Restrict
                }
                Token::Ident(_) if self.is_word("SET") => {
                    self.advance();
                    let action = if self.current() == &Token::Default {
                        ReferentialAction::SetDefault
                    } else {
                        ReferentialAction::SetNull
                    };
                    self.advance();
                    action
                }
                Token::Ident(_) if self.is_word("NO") => {
                    self.advance();
                    if self.is_word("ACTION") {
                        self.advance();
                    }
                    ReferentialAction::NoAction
                }
                _ => ReferentialAction::NoAction,
            };

            if is_delete {
                on_delete = action;
            } else {
                on_update = action;
            }
        }

        (on_update, on_delete)
    }

    /// `CREATE [UNIQUE] INDEX [CONCURRENTLY] [IF NOT EXISTS] [name] ON table [USING m] (cols)`
    fn parse_create_index(&mut self) -> Option<(String, Amendment)> {
        let unique = self.current() == &Token::Unique;
        if unique {
            self.advance();
        }
        if self.current() != &Token::Index {
            self.skip_statement();
            return None;
        }
        self.advance();
        self.skip_words(&["CONCURRENTLY"]);
        self.skip_if_exists();

        let name = self.parse_qualified_name();
        if self.current() != &Token::On {
            self.skip_statement();
            return None;
        }
        self.advance();
        if self.current() == &Token::Only {
            self.advance();
        }

        let Some(table_name) = self.parse_qualified_name() else {
            self.skip_statement();
            return None;
        };
        if self.is_word("USING") {
            self.advance();
            self.advance();
        }
        let columns = self.parse_column_list();
        self.skip_statement();

        Some((
            table_name,
            Amendment::Index(IndexInfo {
                name,
                columns,
                unique,
            }),
        ))
    }

    /// `ALTER TABLE [ONLY] t ADD ..., ADD ...;`
    fn parse_alter_table(&mut self) -> Result<Vec<(String, Amendment)>, SqlParseError> {
        self.advance(); // ALTER

        if self.current() != &Token::Table {
            self.skip_statement();
            return Ok(Vec::new());
        }
        self.advance();
        self.skip_if_exists();
        if self.current() == &Token::Only {
            self.advance();
        }

        let Some(table_name) = self.parse_qualified_name() else {
            self.skip_statement();
            return Ok(Vec::new());
        };

        let mut amendments = Vec::new();

        loop {
            match self.current() {
                Token::Add => {
                    self.advance();
                    let mut name = None;
                    if self.current() == &Token::Constraint {
                        self.advance();
                        name = self.take_ident();
                    }

                    match self.current() {
                        Token::Foreign => {
                            if let Some(fk) = self.parse_foreign_key_constraint(name)? {
                                amendments.push((table_name.clone(), Amendment::ForeignKey(fk)));
                            }
                        }
                        Token::Primary => {
                            self.advance();
                            if self.current() == &Token::Key {
                                self.advance();
                            }
                            let cols = self.parse_column_list();
                            amendments.push((table_name.clone(), Amendment::PrimaryKey(cols)));
                        }
                        Token::Unique | Token::Index | Token::Key => {
                            let unique = self.current() == &Token::Unique;
                            self.advance();
                            if matches!(self.current(), Token::Key | Token::Index) {
                                self.advance();
                            }
                            let index_name = self.take_ident().or(name);
                            let columns = self.parse_column_list();
                            amendments.push((
                                table_name.clone(),
                                Amendment::Index(IndexInfo {
                                    name: index_name,
                                    columns,
                                    unique,
                                }),
                            ));
                        }
                        // ADD COLUMN and friends
                        _ => {}
                    }
                    self.skip_until(&[Token::Comma, Token::Semicolon]);
                }
                Token::Comma => self.advance(),
                Token::Semicolon => {
                    self.advance();
                    break;
                }
                Token::Eof => break,
                _ => self.skip_until(&[Token::Comma, Token::Semicolon]),
            }
        }

        Ok(amendments)
    }

    fn skip_parenthesized(&mut self) {
        if self.current() != &Token::LParen {
            self.advance();
            return;
        }
        self.advance();
        let mut depth = 1;
        while depth > 0 {
            match self.current() {
                Token::LParen => depth += 1,
                Token::RParen => depth -= 1,
                Token::Eof => break,
                _ => {}
            }
            self.advance();
        }
    }

    fn skip_statement(&mut self) {
        while !matches!(self.current(), Token::Semicolon | Token::Eof) {
            self.advance();
        }
        if self.current() == &Token::Semicolon {
            self.advance();
        }
    }

    fn skip_until(&mut self, tokens: &[Token]) {
        while !tokens.contains(self.current()) && self.current() != &Token::Eof {
            if self.current() == &Token::LParen {
                self.skip_parenthesized();
            } else {
                self.advance();
            }
        }
    }
}

fn mark_not_null(columns: &mut [ColumnInfo], names: &[String]) {
    for col in columns.iter_mut().filter(|c| names.contains(&c.name)) {
        col.not_null = true;
    }
}
