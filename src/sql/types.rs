//! SQL type normalization.
//!
//! Column types go through two steps: the parser canonicalizes the
//! dialect-specific spelling (`int4`, `TINYINT(1)`, `timestamptz`) into a
//! catalog type name, and the field layer resolves that name, after
//! config overrides, into a [`ColumnType`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::Dialect;

/// Type-mapping overrides applied whatever the configuration says.
pub const DEFAULT_TYPE_MAPPINGS: [(&str, &str); 3] =
    [("enum", "string"), ("json", "text"), ("bit", "boolean")];

/// Normalized column type the field layer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    SmallInt,
    BigInt,
    Boolean,
    DateTime,
    DateTimeTz,
    Date,
    Time,
    Decimal,
    Float,
    Text,
    String,
}

impl FromStr for ColumnType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "integer" => Ok(Self::Integer),
            "smallint" => Ok(Self::SmallInt),
            "bigint" => Ok(Self::BigInt),
            "boolean" => Ok(Self::Boolean),
            "datetime" => Ok(Self::DateTime),
            "datetimetz" => Ok(Self::DateTimeTz),
            "date" => Ok(Self::Date),
            "time" => Ok(Self::Time),
            "decimal" => Ok(Self::Decimal),
            "float" => Ok(Self::Float),
            "text" => Ok(Self::Text),
            "string" => Ok(Self::String),
            other => Err(format!("unknown column type: {other}")),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Integer => "integer",
            Self::SmallInt => "smallint",
            Self::BigInt => "bigint",
            Self::Boolean => "boolean",
            Self::DateTime => "datetime",
            Self::DateTimeTz => "datetimetz",
            Self::Date => "date",
            Self::Time => "time",
            Self::Decimal => "decimal",
            Self::Float => "float",
            Self::Text => "text",
            Self::String => "string",
        };
        f.write_str(name)
    }
}

impl ColumnType {
    /// Resolve a canonical catalog type, consulting `mappings` first.
    ///
    /// Anything still unknown is treated as a string column.
    pub fn resolve(base_type: &str, mappings: &BTreeMap<String, String>) -> Self {
        let base = base_type.to_lowercase();
        let mapped = DEFAULT_TYPE_MAPPINGS
            .iter()
            .find(|(from, _)| *from == base)
            .map(|(_, to)| (*to).to_string())
            .or_else(|| mappings.get(&base).cloned());

        mapped
            .as_deref()
            .unwrap_or(&base)
            .parse()
            .unwrap_or(Self::String)
    }
}

/// Canonicalize a SQL column type to its catalog name.
pub fn canonical_type(sql_type: &str, dialect: Dialect) -> String {
    let lower = sql_type.to_lowercase();
    let base = lower.split('(').next().unwrap_or(&lower).trim();

    match dialect {
        Dialect::PostgreSQL => canonical_postgres(base),
        Dialect::MySQL => canonical_mysql(base, &lower),
        _ => canonical_generic(base),
    }
}

fn canonical_postgres(base: &str) -> String {
    match base {
        "int" | "int4" | "integer" | "serial" | "serial4" => "integer".to_string(),
        "bigint" | "int8" | "bigserial" | "serial8" => "bigint".to_string(),
        "smallint" | "int2" | "smallserial" | "serial2" => "smallint".to_string(),

        "real" | "float4" | "double precision" | "float8" => "float".to_string(),
        "decimal" | "numeric" | "money" => "decimal".to_string(),

        "varchar" | "character varying" | "char" | "character" | "citext" => {
            "string".to_string()
        }
        "text" => "text".to_string(),

        "timestamptz" | "timestamp with time zone" => "datetimetz".to_string(),
        "timestamp" | "timestamp without time zone" => "datetime".to_string(),
        "date" => "date".to_string(),
        "time" | "timetz" | "time without time zone" => "time".to_string(),

        "boolean" | "bool" => "boolean".to_string(),
        "json" | "jsonb" => "json".to_string(),

        t if t.ends_with("[]") => "text".to_string(),

        _ => base.to_string(),
    }
}

fn canonical_mysql(base: &str, full: &str) -> String {
    match base {
        "int" | "integer" | "mediumint" => "integer".to_string(),
        "bigint" => "bigint".to_string(),
        "smallint" => "smallint".to_string(),
        "tinyint" => {
            // TINYINT(1) is the conventional boolean
            if full.starts_with("tinyint(1)") {
                "boolean".to_string()
            } else {
                "smallint".to_string()
            }
        }

        "float" | "double" | "real" => "float".to_string(),
        "decimal" | "numeric" => "decimal".to_string(),

        "varchar" | "char" => "string".to_string(),
        "text" | "longtext" | "mediumtext" | "tinytext" => "text".to_string(),

        "datetime" | "timestamp" => "datetime".to_string(),
        "date" => "date".to_string(),
        "time" => "time".to_string(),
        "year" => "date".to_string(),

        "blob" | "longblob" | "mediumblob" | "tinyblob" => "blob".to_string(),
        "enum" | "set" => "enum".to_string(),

        _ => base.to_string(),
    }
}

fn canonical_generic(base: &str) -> String {
    match base {
        "int" | "integer" => "integer".to_string(),
        "bigint" => "bigint".to_string(),
        "smallint" | "tinyint" => "smallint".to_string(),
        "real" | "float" | "double" | "double precision" => "float".to_string(),
        "decimal" | "numeric" => "decimal".to_string(),
        "varchar" | "character varying" | "char" | "character" | "nvarchar" => {
            "string".to_string()
        }
        "text" | "clob" => "text".to_string(),
        "timestamp" | "datetime" => "datetime".to_string(),
        "date" => "date".to_string(),
        "time" => "time".to_string(),
        "boolean" | "bool" => "boolean".to_string(),
        _ => base.to_string(),
    }
}
