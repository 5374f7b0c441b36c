//! Relationship inference from foreign keys.
//!
//! Given a target table, walks the snapshot and classifies every foreign
//! key touching it:
//!
//! - the target's own keys become many-to-one (`belongsTo`);
//! - a table with exactly two keys to primary keys, one of them to the
//!   target, is a pivot and becomes many-to-many (`belongsToMany`);
//! - any other key to the target becomes one-to-one when its column is the
//!   owner's primary key or uniquely indexed, one-to-many otherwise.

use thiserror::Error;

use crate::config::TimestampConfig;
use crate::naming::model_name_from_table;
use crate::relation::{KeyParam, MethodCall, RelationKind, Relationship};
use crate::schema::{ForeignKey, SchemaSnapshot, Table};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InferError {
    #[error("Table `{0}` not found in schema")]
    TableNotFound(String),
}

/// Infer the relationships of `target`, with default timestamp column names.
pub fn infer_relationships(
    snapshot: &SchemaSnapshot,
    target: &str,
) -> Result<Vec<Relationship>, InferError> {
    infer_relationships_with(snapshot, target, &TimestampConfig::default())
}

/// Infer the relationships of `target`.
///
/// Many-to-one relationships come first, then the relationships found on
/// every other table in snapshot order.
pub fn infer_relationships_with(
    snapshot: &SchemaSnapshot,
    target: &str,
    timestamps: &TimestampConfig,
) -> Result<Vec<Relationship>, InferError> {
    let model = snapshot
        .table(target)
        .ok_or_else(|| InferError::TableNotFound(target.to_string()))?;

    let mut relationships = many_to_one(snapshot, model);

    for table in snapshot.tables().iter().filter(|t| t.name != model.name) {
        if table.foreign_keys.len() == 2 {
            if let Some(rel) = many_to_many(snapshot, table, model, timestamps) {
                relationships.push(rel);
                continue;
            }
        }

        for fk in table.references(&model.name) {
            if model.primary_key.as_deref() != Some(fk.referenced_column.as_str()) {
                tracing::debug!(
                    table = %table.name,
                    column = %fk.local_column,
                    "foreign key does not reference the primary key, skipped"
                );
                continue;
            }

            let kind = if table.is_primary_key(&fk.local_column) || table.is_unique(&fk.local_column) {
                RelationKind::OneToOne
            } else {
                RelationKind::OneToMany
            };
            tracing::debug!(table = %table.name, column = %fk.local_column, kind = %kind, "classified foreign key");

            relationships.push(
                Relationship::new(kind, model_name_from_table(&table.name))
                    .with_param(KeyParam::ForeignKey, &fk.local_column)
                    .with_param(KeyParam::LocalKey, &fk.referenced_column)
                    .with_related_primary_key(table.primary_key.clone()),
            );
        }
    }

    tracing::info!(
        table = %model.name,
        relationships = relationships.len(),
        "inferred relationships"
    );
    Ok(relationships)
}

/// The target's own foreign keys, including self references.
fn many_to_one(snapshot: &SchemaSnapshot, model: &Table) -> Vec<Relationship> {
    let mut relationships = Vec::new();

    for fk in &model.foreign_keys {
        let Some(referenced) = snapshot.table(&fk.referenced_table) else {
            tracing::warn!(
                table = %model.name,
                constraint = %fk.name,
                referenced = %fk.referenced_table,
                "foreign key points outside the schema, ignored"
            );
            continue;
        };
        if !referenced.is_primary_key(&fk.referenced_column) {
            continue;
        }

        tracing::debug!(column = %fk.local_column, referenced = %referenced.name, "classified foreign key as mt1");
        relationships.push(
            Relationship::new(RelationKind::ManyToOne, model_name_from_table(&referenced.name))
                .with_param(KeyParam::ForeignKey, &fk.local_column)
                .with_param(KeyParam::OwnerKey, &fk.referenced_column)
                .with_related_primary_key(referenced.primary_key.clone()),
        );
    }

    relationships
}

/// Checks whether `pivot` joins `model` to another table.
///
/// When both keys reference `model` the relationship is self-referencing,
/// the first key pointing at the owner side.
fn many_to_many(
    snapshot: &SchemaSnapshot,
    pivot: &Table,
    model: &Table,
    timestamps: &TimestampConfig,
) -> Option<Relationship> {
    let [first, second] = pivot.foreign_keys.as_slice() else {
        return None;
    };

    let (owner_fk, related_fk) = if first.referenced_table == model.name {
        (first, second)
    } else if second.referenced_table == model.name {
        (second, first)
    } else {
        return None;
    };

    let related = snapshot.table(&related_fk.referenced_table)?;
    if !references_primary_key(owner_fk, model, pivot)
        || !references_primary_key(related_fk, related, pivot)
    {
        return None;
    }

    let mut relationship =
        Relationship::new(RelationKind::ManyToMany, model_name_from_table(&related.name))
            .with_input(&pivot.name)
            .with_param(KeyParam::ForeignPivotKey, &owner_fk.local_column)
            .with_param(KeyParam::RelatedPivotKey, &related_fk.local_column)
            .with_related_primary_key(related.primary_key.clone());

    let with_timestamps = timestamps.enabled
        && pivot.has_column(&timestamps.created_at)
        && pivot.has_column(&timestamps.updated_at);
    if with_timestamps {
        let defaults = TimestampConfig::default();
        let call = if timestamps.created_at == defaults.created_at
            && timestamps.updated_at == defaults.updated_at
        {
            MethodCall::new("withTimestamps")
        } else {
            MethodCall::with_args(
                "withTimestamps",
                vec![timestamps.created_at.clone(), timestamps.updated_at.clone()],
            )
        };
        relationship.method_calls.push(call);
    }

    let extra: Vec<String> = pivot
        .columns
        .iter()
        .map(|c| c.name.clone())
        .filter(|c| {
            *c != owner_fk.local_column
                && *c != related_fk.local_column
                && !pivot.is_primary_key(c)
                && !(with_timestamps && (*c == timestamps.created_at || *c == timestamps.updated_at))
        })
        .collect();
    if !extra.is_empty() {
        relationship
            .method_calls
            .push(MethodCall::with_args("withPivot", extra));
    }

    tracing::debug!(pivot = %pivot.name, related = %related.name, "classified table as mtm pivot");
    Some(relationship)
}

/// The key targets `table`'s primary key and is not the pivot's own identity.
fn references_primary_key(fk: &ForeignKey, table: &Table, pivot: &Table) -> bool {
    table.is_primary_key(&fk.referenced_column) && !pivot.is_primary_key(&fk.referenced_column)
}
