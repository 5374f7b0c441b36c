//! SQL dump introspection.
//!
//! Reads DDL the way a live catalog would report it, so a dump file can
//! stand in for a database connection.

mod dialect;
mod lexer;
mod parser;
mod types;

pub use dialect::Dialect;
pub use parser::{parse_sql, SqlParseError};
pub use types::{canonical_type, ColumnType, DEFAULT_TYPE_MAPPINGS};

use crate::ast::TableInfo;
use crate::schema::SchemaSource;

/// A SQL DDL dump acting as the schema source.
#[derive(Debug, Clone)]
pub struct SqlDump {
    source: String,
    dialect: Dialect,
}

impl SqlDump {
    pub fn new(source: impl Into<String>, dialect: Dialect) -> Self {
        Self {
            source: source.into(),
            dialect,
        }
    }

    /// The dialect the dump will be parsed with, after auto-detection.
    pub fn dialect(&self) -> Dialect {
        self.dialect.resolve(&self.source)
    }
}

impl SchemaSource for SqlDump {
    type Error = SqlParseError;

    fn list_tables(&self) -> Result<Vec<TableInfo>, Self::Error> {
        let tables = parse_sql(&self.source, self.dialect)?;
        tracing::debug!(
            dialect = %self.dialect(),
            tables = tables.len(),
            "parsed SQL dump"
        );
        Ok(tables)
    }
}
