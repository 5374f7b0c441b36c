//! SQL dialect detection and handling.

use std::fmt;
use std::str::FromStr;

/// SQL dialect variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// Auto-detect from dump content
    #[default]
    Auto,
    Generic,
    PostgreSQL,
    MySQL,
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "generic" | "sqlite" => Ok(Self::Generic),
            "postgres" | "postgresql" | "pgsql" => Ok(Self::PostgreSQL),
            "mysql" | "mariadb" => Ok(Self::MySQL),
            other => Err(format!("unknown SQL dialect: {other}")),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Auto => "auto",
            Self::Generic => "generic",
            Self::PostgreSQL => "postgres",
            Self::MySQL => "mysql",
        };
        f.write_str(name)
    }
}

impl Dialect {
    /// Detect dialect from SQL content.
    pub fn detect(content: &str) -> Self {
        let lower = content.to_lowercase();

        // Header comments written by the dump tools
        if lower.contains("postgresql database dump")
            || lower.contains("pg_dump")
            || lower.contains("-- postgres")
        {
            return Self::PostgreSQL;
        }
        if lower.contains("mysql dump")
            || lower.contains("mysqldump")
            || lower.contains("mariadb dump")
            || lower.contains("-- mysql")
        {
            return Self::MySQL;
        }

        if lower.contains("serial")
            || lower.contains("timestamptz")
            || lower.contains("::")
            || lower.contains("alter table only")
        {
            return Self::PostgreSQL;
        }
        if lower.contains("auto_increment")
            || lower.contains("tinyint")
            || lower.contains("engine=")
            || lower.contains("unsigned")
            || lower.contains('`')
        {
            return Self::MySQL;
        }

        Self::Generic
    }

    /// Resolve Auto to a concrete dialect.
    pub fn resolve(self, content: &str) -> Self {
        match self {
            Self::Auto => Self::detect(content),
            other => other,
        }
    }
}
