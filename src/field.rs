//! Field descriptors.
//!
//! A field comes from one of three places: an introspected column, a manual
//! `name dbType htmlType options` line, or an entry of a JSON fields file.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ast::ColumnInfo;
use crate::config::GeneratorConfig;
use crate::schema::Table;
use crate::sql::ColumnType;

#[derive(Debug, Error)]
pub enum FieldParseError {
    #[error("Field input `{0}` needs at least a name and a database type")]
    Incomplete(String),
    #[error("Fields file entry {index} is missing `{attribute}`")]
    MissingAttribute { index: usize, attribute: &'static str },
    #[error("Invalid fields file: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub name: String,
    /// Migration-style type descriptor, e.g. `string,255:nullable`.
    pub db_input: String,
    pub field_type: String,
    pub html_type: String,
    pub html_values: Vec<String>,
    pub length: Option<u32>,
    pub validations: String,
    pub description: Option<String>,
    pub is_primary: bool,
    pub is_unique: bool,
    pub is_not_null: bool,
    pub is_fillable: bool,
    pub is_searchable: bool,
    pub in_form: bool,
    pub in_index: bool,
    pub in_view: bool,
}

/// What a column needs to know about its table and the run's config.
#[derive(Debug, Clone, Copy)]
pub struct FieldContext<'a> {
    pub primary_key: Option<&'a str>,
    pub unique_columns: &'a [String],
    pub timestamps: &'a [&'a str],
    pub type_mappings: &'a BTreeMap<String, String>,
    pub searchable_default: bool,
}

impl Field {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            db_input: String::new(),
            field_type: String::new(),
            html_type: "text".to_string(),
            html_values: Vec::new(),
            length: None,
            validations: String::new(),
            description: None,
            is_primary: false,
            is_unique: false,
            is_not_null: false,
            is_fillable: true,
            is_searchable: true,
            in_form: true,
            in_index: true,
            in_view: true,
        }
    }

    pub fn from_column(column: &ColumnInfo, ctx: &FieldContext<'_>) -> Self {
        let column_type = ColumnType::resolve(&column.base_type, ctx.type_mappings);

        let mut field = Self::new(&column.name);
        field.is_searchable = ctx.searchable_default;

        match column_type {
            ColumnType::Integer => field.set_integer(column, "integer"),
            ColumnType::SmallInt => field.set_integer(column, "smallInteger"),
            ColumnType::BigInt => field.set_integer(column, "bigInteger"),
            ColumnType::Boolean => field.set_sized(column, "boolean", "checkbox,1"),
            ColumnType::DateTime => field.set_sized(column, "datetime", "date"),
            ColumnType::DateTimeTz => field.set_sized(column, "dateTimeTz", "date"),
            ColumnType::Date => field.set_sized(column, "date", "date"),
            ColumnType::Time => field.set_sized(column, "time", "text"),
            ColumnType::Decimal => field.set_number(column, "decimal"),
            ColumnType::Float => field.set_number(column, "float"),
            ColumnType::Text => field.set_sized(column, "text", "textarea"),
            ColumnType::String => field.set_sized(column, "string", "text"),
        }

        if ctx.primary_key == Some(column.name.as_str()) {
            field.is_primary = true;
            field.is_fillable = false;
            field.is_searchable = false;
            field.in_index = false;
            field.in_form = false;
        }

        let lower = column.name.to_lowercase();
        if lower == "password" {
            field.html_type = "password".to_string();
        } else if lower == "email" {
            field.html_type = "email".to_string();
        } else if ctx.timestamps.iter().any(|t| t.eq_ignore_ascii_case(&lower)) {
            field.disable_all();
        }

        field.is_not_null = column.not_null;
        field.is_unique = ctx.unique_columns.contains(&column.name);
        field.description = column.comment.clone();
        field
    }

    /// Parse a manual field line:
    /// `name dbType[,length][:modifier]* [htmlType[,values]] [options]`.
    ///
    /// Options name the flags to turn off (`searchable,fillable,inForm`);
    /// `primary` marks the primary key and turns all of them off.
    pub fn from_input(input: &str, validations: &str) -> Result<Self, FieldParseError> {
        let tokens: Vec<&str> = input.split_whitespace().collect();
        let [name, db_type, rest @ ..] = tokens.as_slice() else {
            return Err(FieldParseError::Incomplete(input.to_string()));
        };

        let mut field = Self::new(*name);
        field.set_db_input(db_type);
        if let Some(html) = rest.first() {
            field.set_html_input(html);
        }
        if let Some(options) = rest.get(1) {
            field.apply_options(options);
        }
        field.validations = validations.to_string();
        Ok(field)
    }

    fn from_entry(index: usize, entry: &FieldEntry) -> Result<Self, FieldParseError> {
        let name = entry
            .name
            .as_deref()
            .ok_or(FieldParseError::MissingAttribute { index, attribute: "name" })?;
        let db_type = entry
            .db_type
            .as_deref()
            .ok_or(FieldParseError::MissingAttribute { index, attribute: "dbType" })?;

        let mut field = Self::new(name);
        field.set_db_input(db_type);
        field.set_html_input(entry.html_type.as_deref().unwrap_or_default());
        field.validations = entry.validations.clone().unwrap_or_default();
        field.is_searchable = entry.searchable.unwrap_or(false);
        field.is_fillable = entry.fillable.unwrap_or(true);
        field.is_primary = entry.primary.unwrap_or(false);
        field.in_form = entry.in_form.unwrap_or(true);
        field.in_index = entry.in_index.unwrap_or(true);
        field.in_view = entry.in_view.unwrap_or(true);
        Ok(field)
    }

    fn set_integer(&mut self, column: &ColumnInfo, db_type: &str) {
        let mut input = format!("{db_type},{}", column.autoincrement);
        if column.unsigned {
            input.push_str(",true");
        }
        self.set_db_input(&input);
        self.html_type = "number".to_string();
    }

    fn set_number(&mut self, column: &ColumnInfo, db_type: &str) {
        let precision = column.precision.unwrap_or(10);
        let scale = column.scale.unwrap_or(0);
        self.set_db_input(&format!("{db_type},{precision},{scale}"));
        self.html_type = "number".to_string();
    }

    fn set_sized(&mut self, column: &ColumnInfo, db_type: &str, html: &str) {
        let mut input = db_type.to_string();
        if let Some(length) = column.length.filter(|l| *l > 0) {
            input.push_str(&format!(",{length}"));
        }
        if !column.not_null {
            input.push_str(":nullable");
        }
        self.set_db_input(&input);
        self.length = column.length.filter(|l| *l > 0);
        self.set_html_input(html);
    }

    fn set_db_input(&mut self, db_input: &str) {
        self.db_input = db_input.to_string();
        let mut modifiers = db_input.split(':');
        let mut params = modifiers.next().unwrap_or_default().split(',');
        self.field_type = params.next().unwrap_or_default().to_string();

        if self.length.is_none() && matches!(self.field_type.as_str(), "string" | "char") {
            self.length = params.next().and_then(|p| p.parse().ok());
        }
        self.is_not_null = !modifiers.any(|m| m == "nullable");
    }

    fn set_html_input(&mut self, html_input: &str) {
        let mut parts = html_input.split(',');
        self.html_type = match parts.next() {
            Some(kind) if !kind.is_empty() => kind.to_string(),
            _ => "text".to_string(),
        };
        self.html_values = parts.map(str::to_string).collect();
    }

    fn apply_options(&mut self, options: &str) {
        let options: Vec<String> = options.split(',').map(|o| o.to_lowercase()).collect();
        let has = |name: &str| options.iter().any(|o| o == name);

        self.is_searchable = !has("searchable");
        self.is_fillable = !has("fillable");
        self.in_form = !has("inform");
        self.in_index = !has("inindex");
        self.in_view = !has("inview");

        if has("primary") {
            self.is_primary = true;
            self.disable_all();
        }
    }

    fn disable_all(&mut self) {
        self.is_searchable = false;
        self.is_fillable = false;
        self.in_form = false;
        self.in_index = false;
        self.in_view = false;
    }
}

/// Build fields for every non-ignored column of `table`.
pub fn fields_for_table(table: &Table, config: &GeneratorConfig) -> Vec<Field> {
    let timestamps = config.timestamps.field_names();
    let ctx = FieldContext {
        primary_key: table.primary_key.as_deref(),
        unique_columns: &table.unique_columns,
        timestamps: &timestamps,
        type_mappings: &config.type_mappings,
        searchable_default: config.searchable_default,
    };

    table
        .columns
        .iter()
        .filter(|c| !config.is_ignored(&c.name))
        .map(|c| Field::from_column(c, &ctx))
        .collect()
}

/// One element of a JSON fields file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldEntry {
    #[serde(rename = "type")]
    kind: Option<String>,
    name: Option<String>,
    db_type: Option<String>,
    html_type: Option<String>,
    validations: Option<String>,
    searchable: Option<bool>,
    fillable: Option<bool>,
    primary: Option<bool>,
    in_form: Option<bool>,
    in_index: Option<bool>,
    in_view: Option<bool>,
    relation: Option<String>,
}

/// Fields and raw relation declarations read from a JSON fields file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldsFile {
    pub fields: Vec<Field>,
    /// Relation inputs such as `mt1,User,author_id`, unparsed.
    pub relations: Vec<String>,
}

impl FieldsFile {
    pub fn parse(json: &str) -> Result<Self, FieldParseError> {
        let entries: Vec<FieldEntry> = serde_json::from_str(json)?;
        let mut file = Self::default();

        for (index, entry) in entries.iter().enumerate() {
            let relation = entry.relation.as_deref().filter(|r| !r.trim().is_empty());
            if entry.kind.as_deref() == Some("relation") {
                if let Some(relation) = relation {
                    file.relations.push(relation.to_string());
                }
                continue;
            }

            file.fields.push(Field::from_entry(index, entry)?);
            if let Some(relation) = relation {
                file.relations.push(relation.to_string());
            }
        }

        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, base: &str) -> ColumnInfo {
        let mut col = ColumnInfo::new(name, base);
        col.base_type = base.to_string();
        col
    }

    fn ctx<'a>(
        unique: &'a [String],
        timestamps: &'a [&'a str],
        mappings: &'a BTreeMap<String, String>,
    ) -> FieldContext<'a> {
        FieldContext {
            primary_key: Some("id"),
            unique_columns: unique,
            timestamps,
            type_mappings: mappings,
            searchable_default: true,
        }
    }

    #[test]
    fn test_primary_key_column() {
        let mappings = BTreeMap::new();
        let mut id = column("id", "bigint");
        id.autoincrement = true;
        id.unsigned = true;
        id.not_null = true;

        let field = Field::from_column(&id, &ctx(&[], &[], &mappings));
        assert_eq!(field.db_input, "bigInteger,true,true");
        assert_eq!(field.field_type, "bigInteger");
        assert_eq!(field.html_type, "number");
        assert!(field.is_primary);
        assert!(!field.is_fillable && !field.is_searchable && !field.in_form && !field.in_index);
        assert!(field.in_view);
    }

    #[test]
    fn test_nullable_string_with_length() {
        let mappings = BTreeMap::new();
        let mut title = column("title", "string");
        title.length = Some(120);
        title.comment = Some("Post title".to_string());

        let field = Field::from_column(&title, &ctx(&[], &[], &mappings));
        assert_eq!(field.db_input, "string,120:nullable");
        assert_eq!(field.length, Some(120));
        assert_eq!(field.html_type, "text");
        assert!(!field.is_not_null);
        assert!(field.is_searchable);
        assert_eq!(field.description.as_deref(), Some("Post title"));
    }

    #[test]
    fn test_type_table() {
        let mappings = BTreeMap::new();
        let c = ctx(&[], &[], &mappings);

        let flag = Field::from_column(&column("active", "boolean"), &c);
        assert_eq!(flag.html_type, "checkbox");
        assert_eq!(flag.html_values, vec!["1".to_string()]);

        let mut price = column("price", "decimal");
        price.precision = Some(8);
        price.scale = Some(2);
        assert_eq!(Field::from_column(&price, &c).db_input, "decimal,8,2");

        assert_eq!(Field::from_column(&column("body", "text"), &c).html_type, "textarea");
        assert_eq!(Field::from_column(&column("at", "datetimetz"), &c).field_type, "dateTimeTz");
        assert_eq!(Field::from_column(&column("at", "time"), &c).html_type, "text");
        assert_eq!(Field::from_column(&column("meta", "json"), &c).field_type, "text");
        assert_eq!(Field::from_column(&column("uuid", "uuid"), &c).field_type, "string");
    }

    #[test]
    fn test_type_mapping_override() {
        let mut mappings = BTreeMap::new();
        mappings.insert("uuid".to_string(), "text".to_string());
        let field = Field::from_column(&column("token", "uuid"), &ctx(&[], &[], &mappings));
        assert_eq!(field.field_type, "text");
    }

    #[test]
    fn test_name_conventions() {
        let mappings = BTreeMap::new();
        let unique = vec!["email".to_string()];
        let timestamps = ["created_at", "updated_at", "deleted_at"];
        let c = ctx(&unique, &timestamps, &mappings);

        let email = Field::from_column(&column("email", "string"), &c);
        assert_eq!(email.html_type, "email");
        assert!(email.is_unique);

        let password = Field::from_column(&column("password", "string"), &c);
        assert_eq!(password.html_type, "password");

        let created = Field::from_column(&column("created_at", "datetime"), &c);
        assert!(!created.is_fillable && !created.is_searchable && !created.in_view);
    }

    #[test]
    fn test_manual_input() {
        let field = Field::from_input(
            "title string,20:nullable text inForm,Searchable",
            "required|max:20",
        )
        .unwrap();

        assert_eq!(field.name, "title");
        assert_eq!(field.field_type, "string");
        assert_eq!(field.length, Some(20));
        assert!(!field.is_not_null);
        assert_eq!(field.html_type, "text");
        assert!(!field.in_form);
        assert!(!field.is_searchable);
        assert!(field.is_fillable);
        assert_eq!(field.validations, "required|max:20");
    }

    #[test]
    fn test_manual_input_primary_option() {
        let field = Field::from_input("id increments number primary", "").unwrap();
        assert!(field.is_primary);
        assert!(!field.is_fillable && !field.in_view);
    }

    #[test]
    fn test_manual_input_without_type_is_incomplete() {
        let err = Field::from_input("title", "").unwrap_err();
        assert!(matches!(err, FieldParseError::Incomplete(input) if input == "title"));
    }

    #[test]
    fn test_fields_file() {
        let json = r#"[
            {"name": "id", "dbType": "increments", "htmlType": "number", "primary": true, "fillable": false},
            {"name": "status", "dbType": "string,20", "htmlType": "select,draft,published", "searchable": true},
            {"name": "author_id", "dbType": "integer:unsigned", "relation": "mt1,User,author_id"},
            {"type": "relation", "relation": "mtm,Tag,post_tag"}
        ]"#;

        let file = FieldsFile::parse(json).unwrap();
        assert_eq!(file.fields.len(), 3);
        assert_eq!(
            file.relations,
            vec!["mt1,User,author_id".to_string(), "mtm,Tag,post_tag".to_string()]
        );

        let status = &file.fields[1];
        assert_eq!(status.html_type, "select");
        assert_eq!(status.html_values, vec!["draft".to_string(), "published".to_string()]);
        assert!(status.is_searchable);
        assert!(!file.fields[2].is_searchable);
    }

    #[test]
    fn test_fields_file_missing_db_type() {
        let err = FieldsFile::parse(r#"[{"name": "title"}]"#).unwrap_err();
        assert!(matches!(
            err,
            FieldParseError::MissingAttribute { index: 0, attribute: "dbType" }
        ));
    }
}
