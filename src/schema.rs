//! Schema snapshot: every table of one database with its primary key and
//! foreign keys, built once per run from a [`SchemaSource`].

use std::collections::HashMap;
use std::error::Error as StdError;

use serde::Serialize;
use thiserror::Error;

use crate::ast::{ColumnInfo, ReferentialAction, TableInfo};
use crate::config::GeneratorConfig;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Schema introspection failed: {0}")]
    Introspection(#[source] Box<dyn StdError + Send + Sync>),
    #[error("Schema source contains no tables")]
    Empty,
}

/// Anything that can enumerate a database's tables the way a live catalog
/// connection does.
pub trait SchemaSource {
    type Error: StdError + Send + Sync + 'static;

    fn list_tables(&self) -> Result<Vec<TableInfo>, Self::Error>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKey {
    pub owner_table: String,
    /// Constraint name, synthesized as `<owner>_<column>_foreign` when the
    /// source has none.
    pub name: String,
    pub local_column: String,
    pub referenced_table: String,
    /// Empty when the referenced table is absent and no column was named.
    pub referenced_column: String,
    pub on_update: ReferentialAction,
    pub on_delete: ReferentialAction,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub name: String,
    /// First column of the declared key.
    pub primary_key: Option<String>,
    pub foreign_keys: Vec<ForeignKey>,
    pub columns: Vec<ColumnInfo>,
    /// Columns carrying a single-column unique constraint or index.
    pub unique_columns: Vec<String>,
}

impl Table {
    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_key.as_deref() == Some(column)
    }

    pub fn is_unique(&self, column: &str) -> bool {
        self.unique_columns.iter().any(|c| c == column)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c.name == column)
    }

    /// Foreign keys of this table pointing at `table`.
    pub fn references<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a ForeignKey> + 'a {
        self.foreign_keys
            .iter()
            .filter(move |fk| fk.referenced_table == table)
    }
}

/// Tables in introspection order, looked up by name.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchemaSnapshot {
    tables: Vec<Table>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl SchemaSnapshot {
    /// Introspect `source` and build the snapshot, dropping excluded tables.
    pub fn build<S: SchemaSource>(
        source: &S,
        config: &GeneratorConfig,
    ) -> Result<Self, SchemaError> {
        let tables = source
            .list_tables()
            .map_err(|e| SchemaError::Introspection(Box::new(e)))?;
        if tables.is_empty() {
            return Err(SchemaError::Empty);
        }
        Ok(Self::from_tables(tables, config))
    }

    pub fn from_tables(infos: Vec<TableInfo>, config: &GeneratorConfig) -> Self {
        let primary_keys: HashMap<String, Option<String>> = infos
            .iter()
            .map(|t| (t.name.clone(), t.primary_key.first().cloned()))
            .collect();

        let mut snapshot = Self::default();

        for info in infos {
            if config.excluded_tables.contains(&info.name) {
                tracing::debug!(table = %info.name, "table excluded by config");
                continue;
            }
            if info.primary_key.len() > 1 {
                tracing::warn!(
                    table = %info.name,
                    columns = ?info.primary_key,
                    "composite primary key reduced to its first column"
                );
            }

            let unique_columns = info.single_unique_columns();
            let foreign_keys = info
                .foreign_keys
                .iter()
                .filter_map(|fk| {
                    let local_column = fk.local_columns.first()?.clone();
                    if fk.local_columns.len() > 1 {
                        tracing::warn!(
                            table = %info.name,
                            columns = ?fk.local_columns,
                            "composite foreign key reduced to its first column"
                        );
                    }
                    let referenced_column = fk
                        .referenced_columns
                        .first()
                        .cloned()
                        .or_else(|| primary_keys.get(&fk.referenced_table).cloned().flatten())
                        .unwrap_or_default();

                    Some(ForeignKey {
                        owner_table: info.name.clone(),
                        name: fk
                            .name
                            .clone()
                            .unwrap_or_else(|| format!("{}_{}_foreign", info.name, local_column)),
                        local_column,
                        referenced_table: fk.referenced_table.clone(),
                        referenced_column,
                        on_update: fk.on_update,
                        on_delete: fk.on_delete,
                    })
                })
                .collect();

            snapshot.push(Table {
                primary_key: info.primary_key.first().cloned(),
                name: info.name,
                foreign_keys,
                columns: info.columns,
                unique_columns,
            });
        }

        snapshot
    }

    fn push(&mut self, table: Table) {
        // Later declarations of the same name replace earlier ones
        match self.index.get(&table.name) {
            Some(&i) => self.tables[i] = table,
            None => {
                self.index.insert(table.name.clone(), self.tables.len());
                self.tables.push(table);
            }
        }
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.index.get(name).map(|&i| &self.tables[i])
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
