//! Raw table metadata as reported by a schema source.
//!
//! These records mirror what a database catalog returns for one table and
//! carry no interpretation yet; [`crate::schema`] turns them into the
//! snapshot the inference engine works on.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
    /// Primary key columns in declaration order.
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<ForeignKeyInfo>,
    pub indexes: Vec<IndexInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    /// Type exactly as written in the source, e.g. `VARCHAR(255)`.
    pub raw_type: String,
    /// Dialect-normalized base type, e.g. `varchar`.
    pub base_type: String,
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub not_null: bool,
    pub autoincrement: bool,
    pub unsigned: bool,
    pub default: Option<String>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForeignKeyInfo {
    pub name: Option<String>,
    pub local_columns: Vec<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
    pub on_update: ReferentialAction,
    pub on_delete: ReferentialAction,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexInfo {
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub unique: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferentialAction {
    #[default]
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, raw_type: impl Into<String>) -> Self {
        let raw_type = raw_type.into();
        let base_type = raw_type
            .split('(')
            .next()
            .unwrap_or(&raw_type)
            .trim()
            .to_lowercase();
        Self {
            name: name.into(),
            raw_type,
            base_type,
            length: None,
            precision: None,
            scale: None,
            not_null: false,
            autoincrement: false,
            unsigned: false,
            default: None,
            comment: None,
        }
    }
}

impl TableInfo {
    /// Columns carrying a unique index of exactly one column.
    pub fn single_unique_columns(&self) -> Vec<String> {
        let mut cols: Vec<String> = Vec::new();
        for index in self.indexes.iter().filter(|i| i.unique) {
            if let [col] = index.columns.as_slice() {
                if !cols.contains(col) {
                    cols.push(col.clone());
                }
            }
        }
        cols
    }
}
