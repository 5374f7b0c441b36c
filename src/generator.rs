//! Generation runs: everything a model template needs for one model.

use serde::Serialize;
use thiserror::Error;

use crate::config::GeneratorConfig;
use crate::field::{fields_for_table, Field, FieldParseError, FieldsFile};
use crate::infer::{infer_relationships_with, InferError};
use crate::naming::{model_name_from_table, ModelNames, ResolvedRelation, Resolver};
use crate::relation::Relationship;
use crate::schema::{SchemaError, SchemaSnapshot, SchemaSource};

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Infer(#[from] InferError),
    #[error(transparent)]
    Fields(#[from] FieldParseError),
    #[error("Model name must not be empty")]
    EmptyModelName,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelDescriptor {
    pub model: ModelNames,
    pub table_name: String,
    pub primary_key: Option<String>,
    pub fields: Vec<Field>,
    pub relations: Vec<ResolvedRelation>,
    /// Problems that did not stop the run, e.g. dropped relation inputs.
    pub warnings: Vec<String>,
}

pub struct Generator;

impl Generator {
    /// Introspect `source` and describe the model for `table`.
    ///
    /// The model name defaults to the singular of the table name.
    pub fn from_table<S: SchemaSource>(
        source: &S,
        config: &GeneratorConfig,
        table: &str,
        model_name: Option<&str>,
    ) -> Result<ModelDescriptor, GenerateError> {
        let snapshot = SchemaSnapshot::build(source, config)?;
        let target = snapshot
            .table(table)
            .ok_or_else(|| InferError::TableNotFound(table.to_string()))?;

        let model = match model_name {
            Some(name) if name.trim().is_empty() => return Err(GenerateError::EmptyModelName),
            Some(name) => ModelNames::new(name),
            None => ModelNames::new(&model_name_from_table(table)),
        };

        let fields = fields_for_table(target, config);
        let relationships = infer_relationships_with(&snapshot, table, &config.timestamps)?;

        let primary_key = target.primary_key.clone();
        let mut resolver = Resolver::new(&model, primary_key.as_deref().unwrap_or("id"), &fields)
            .with_namespace(&config.model_namespace);
        let relations = resolver.resolve_all(&relationships);

        tracing::info!(
            model = %model.name,
            table = %table,
            fields = fields.len(),
            relations = relations.len(),
            "described model from table"
        );

        Ok(ModelDescriptor {
            model,
            table_name: table.to_string(),
            primary_key,
            fields,
            relations,
            warnings: Vec::new(),
        })
    }

    /// Describe a model from a JSON fields file.
    ///
    /// Relation inputs that do not parse are dropped and reported in
    /// [`ModelDescriptor::warnings`].
    pub fn from_fields_file(
        json: &str,
        model_name: &str,
        config: &GeneratorConfig,
    ) -> Result<ModelDescriptor, GenerateError> {
        if model_name.trim().is_empty() {
            return Err(GenerateError::EmptyModelName);
        }
        let model = ModelNames::new(model_name);
        let file = FieldsFile::parse(json)?;

        let mut warnings = Vec::new();
        let mut relationships = Vec::new();
        for input in &file.relations {
            match Relationship::parse(input) {
                Ok(rel) => relationships.push(rel),
                Err(e) => {
                    tracing::warn!(relation = %input, error = %e, "relation dropped");
                    warnings.push(format!("relation `{input}` dropped: {e}"));
                }
            }
        }

        let fields: Vec<Field> = file
            .fields
            .into_iter()
            .filter(|f| !config.is_ignored(&f.name))
            .collect();
        let primary_key = fields.iter().find(|f| f.is_primary).map(|f| f.name.clone());

        let mut resolver = Resolver::new(&model, primary_key.as_deref().unwrap_or("id"), &fields)
            .with_namespace(&config.model_namespace);
        let relations = resolver.resolve_all(&relationships);

        tracing::info!(
            model = %model.name,
            fields = fields.len(),
            relations = relations.len(),
            dropped = warnings.len(),
            "described model from fields file"
        );

        Ok(ModelDescriptor {
            table_name: model.snake_plural.clone(),
            model,
            primary_key,
            fields,
            relations,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::RelationKind;
    use crate::sql::{Dialect, SqlDump};

    const SCHEMA: &str = r#"
        CREATE TABLE users (
            id BIGINT PRIMARY KEY AUTO_INCREMENT,
            email VARCHAR(255) NOT NULL UNIQUE,
            password VARCHAR(255) NOT NULL,
            created_at TIMESTAMP,
            updated_at TIMESTAMP
        );
        CREATE TABLE posts (
            id BIGINT PRIMARY KEY AUTO_INCREMENT,
            user_id BIGINT NOT NULL,
            approver_id BIGINT,
            title VARCHAR(200) NOT NULL,
            CONSTRAINT posts_user_id_foreign FOREIGN KEY (user_id) REFERENCES users (id),
            CONSTRAINT posts_approver_id_foreign FOREIGN KEY (approver_id) REFERENCES users (id)
        );
        CREATE TABLE comments (
            id BIGINT PRIMARY KEY AUTO_INCREMENT,
            post_id BIGINT NOT NULL REFERENCES posts (id),
            body TEXT
        );
        CREATE TABLE roles (id BIGINT PRIMARY KEY, name VARCHAR(50));
        CREATE TABLE role_user (
            user_id BIGINT NOT NULL REFERENCES users (id),
            role_id BIGINT NOT NULL REFERENCES roles (id)
        );
        CREATE TABLE phones (
            user_id BIGINT PRIMARY KEY REFERENCES users (id),
            number VARCHAR(20)
        );
    "#;

    fn describe(table: &str) -> ModelDescriptor {
        let dump = SqlDump::new(SCHEMA, Dialect::Generic);
        Generator::from_table(&dump, &GeneratorConfig::default(), table, None).unwrap()
    }

    fn methods(descriptor: &ModelDescriptor) -> Vec<(RelationKind, &str, &str)> {
        descriptor
            .relations
            .iter()
            .map(|r| (r.kind, r.related_model.as_str(), r.method_name.as_str()))
            .collect()
    }

    #[test]
    fn test_posts_belong_to_user_and_have_comments() {
        let posts = describe("posts");
        assert_eq!(posts.model.name, "Post");
        assert_eq!(posts.primary_key.as_deref(), Some("id"));
        assert_eq!(
            methods(&posts),
            vec![
                (RelationKind::ManyToOne, "User", "user"),
                (RelationKind::ManyToOne, "User", "approver"),
                (RelationKind::OneToMany, "Comment", "comments"),
            ]
        );
        assert!(posts.relations.iter().all(|r| r.input_fields.is_empty()));
    }

    #[test]
    fn test_users_relationships() {
        let users = describe("users");
        assert_eq!(
            methods(&users),
            vec![
                (RelationKind::OneToMany, "Post", "posts"),
                (RelationKind::OneToMany, "Post", "posts_2"),
                (RelationKind::ManyToMany, "Role", "roles"),
                (RelationKind::OneToOne, "Phone", "phone"),
            ]
        );

        // approver_id does not follow `user_id`, so the key is spelled out
        assert_eq!(users.relations[0].input_fields, "");
        assert_eq!(users.relations[1].input_fields, ", 'approver_id'");
        assert_eq!(users.relations[2].input_fields, "");
        assert_eq!(
            users.relations[1].doc_type,
            "\\Illuminate\\Database\\Eloquent\\Collection posts_2"
        );
    }

    #[test]
    fn test_fields_from_columns() {
        let users = describe("users");
        let names: Vec<&str> = users.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "email", "password", "created_at", "updated_at"]);

        assert!(users.fields[0].is_primary);
        assert_eq!(users.fields[1].html_type, "email");
        assert!(users.fields[1].is_unique);
        assert_eq!(users.fields[2].html_type, "password");
        assert!(!users.fields[3].in_form);
    }

    #[test]
    fn test_ignored_fields_and_model_override() {
        let config = GeneratorConfig {
            ignored_fields: vec!["password".to_string()],
            ..GeneratorConfig::default()
        };
        let dump = SqlDump::new(SCHEMA, Dialect::Generic);
        let account = Generator::from_table(&dump, &config, "users", Some("Account")).unwrap();

        assert_eq!(account.model.name, "Account");
        assert_eq!(account.table_name, "users");
        assert!(account.fields.iter().all(|f| f.name != "password"));
        // users.id is referenced as user_id, not account_id
        assert_eq!(account.relations[0].input_fields, ", 'user_id'");
    }

    #[test]
    fn test_same_name_from_two_tables() {
        let sql = r#"
            CREATE TABLE orders (id INT PRIMARY KEY);
            CREATE TABLE items (id INT PRIMARY KEY, order_id INT UNIQUE REFERENCES orders (id));
            CREATE TABLE item (order_id INT PRIMARY KEY REFERENCES orders (id));
        "#;
        let dump = SqlDump::new(sql, Dialect::Generic);
        let order = Generator::from_table(&dump, &GeneratorConfig::default(), "orders", None).unwrap();
        let names: Vec<&str> = order.relations.iter().map(|r| r.method_name.as_str()).collect();
        assert_eq!(names, vec!["item", "item_2"]);
    }

    #[test]
    fn test_keyword_named_column_from_pg_dump() {
        let sql = r#"
            CREATE TABLE public.users (id bigint NOT NULL);
            CREATE TABLE public.settings (
                id bigint NOT NULL,
                key character varying(255) NOT NULL,
                user_id bigint NOT NULL,
                created_at timestamp(0) without time zone
            );
            ALTER TABLE ONLY public.users ADD CONSTRAINT users_pkey PRIMARY KEY (id);
            ALTER TABLE ONLY public.settings ADD CONSTRAINT settings_pkey PRIMARY KEY (id);
            ALTER TABLE ONLY public.settings
                ADD CONSTRAINT settings_user_id_foreign FOREIGN KEY (user_id) REFERENCES public.users(id);
        "#;
        let dump = SqlDump::new(sql, Dialect::PostgreSQL);
        let settings =
            Generator::from_table(&dump, &GeneratorConfig::default(), "settings", None).unwrap();

        let names: Vec<&str> = settings.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "key", "user_id", "created_at"]);
        assert_eq!(
            methods(&settings),
            vec![(RelationKind::ManyToOne, "User", "user")]
        );
    }

    #[test]
    fn test_missing_table() {
        let dump = SqlDump::new(SCHEMA, Dialect::Generic);
        let result = Generator::from_table(&dump, &GeneratorConfig::default(), "invoices", None);
        assert!(matches!(
            result,
            Err(GenerateError::Infer(InferError::TableNotFound(name))) if name == "invoices"
        ));
    }

    #[test]
    fn test_fields_file_run() {
        let json = r#"[
            {"name": "id", "dbType": "increments", "primary": true},
            {"name": "author_id", "dbType": "integer:unsigned", "relation": "mt1,User,author_id"},
            {"type": "relation", "relation": "mtm,Tag,post_tag"},
            {"type": "relation", "relation": "oneToMany,Comment"}
        ]"#;

        let post = Generator::from_fields_file(json, "Post", &GeneratorConfig::default()).unwrap();
        assert_eq!(post.table_name, "posts");
        assert_eq!(post.primary_key.as_deref(), Some("id"));
        assert_eq!(
            methods(&post),
            vec![
                (RelationKind::ManyToOne, "User", "author"),
                (RelationKind::ManyToMany, "Tag", "tags"),
            ]
        );
        assert_eq!(post.relations[0].input_fields, ", 'author_id'");
        assert_eq!(post.relations[1].input_fields, "");
        assert_eq!(post.warnings.len(), 1);
        assert!(post.warnings[0].contains("oneToMany"));
    }

    #[test]
    fn test_descriptor_serializes() {
        let posts = describe("posts");
        let json = serde_json::to_value(&posts).unwrap();
        assert_eq!(json["model"]["name"], "Post");
        assert_eq!(json["relations"][0]["kind"], "mt1");
        assert_eq!(json["fields"][0]["isPrimary"], true);
    }
}
