//! Model names and relationship method naming.
//!
//! [`Resolver`] turns inferred or declared [`Relationship`]s into the method
//! names, ORM calls and argument tails a model template needs. Method names
//! and doc annotations come out of the same pass, so their collision
//! suffixes always agree.

use std::collections::{BTreeMap, BTreeSet};

use heck::{ToKebabCase, ToLowerCamelCase, ToSnakeCase, ToTitleCase, ToUpperCamelCase};
use inflector::string::pluralize::to_plural;
use inflector::string::singularize::to_singular;
use serde::Serialize;

use crate::field::Field;
use crate::relation::{KeyParam, RelationKind, Relationship};

/// `blog_posts` → `BlogPost`.
pub fn model_name_from_table(table: &str) -> String {
    to_singular(table).to_upper_camel_case()
}

fn pluralize(word: &str) -> String {
    to_plural(&to_singular(word))
}

/// Every spelling of one model name that generated code needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelNames {
    pub name: String,
    pub plural: String,
    pub camel: String,
    pub camel_plural: String,
    pub snake: String,
    pub snake_plural: String,
    pub dashed: String,
    pub dashed_plural: String,
    pub human: String,
    pub human_plural: String,
}

impl ModelNames {
    pub fn new(model: &str) -> Self {
        let name = model.to_upper_camel_case();
        let snake = name.to_snake_case();
        let snake_plural = pluralize(&snake);

        Self {
            plural: snake_plural.to_upper_camel_case(),
            camel: name.to_lower_camel_case(),
            camel_plural: snake_plural.to_lower_camel_case(),
            dashed: snake.to_kebab_case(),
            dashed_plural: snake_plural.to_kebab_case(),
            human: snake.to_title_case(),
            human_plural: snake_plural.to_title_case(),
            snake,
            snake_plural,
            name,
        }
    }

    pub fn from_table(table: &str) -> Self {
        Self::new(&model_name_from_table(table))
    }

    /// Snake forms to strip from derived method names, longest first.
    fn snake_forms(&self) -> Vec<&str> {
        let mut forms = vec![self.snake_plural.as_str(), self.snake.as_str()];
        forms.sort_by_key(|f| std::cmp::Reverse(f.len()));
        forms.dedup();
        forms
    }
}

/// Hands out collision-free names for one model.
///
/// Each base name keeps its own counter, so a second `comment` becomes
/// `comment_2` and a third `comment_3` regardless of other names.
#[derive(Debug, Clone, Default)]
pub struct NameAllocator {
    taken: BTreeSet<String>,
    counters: BTreeMap<String, usize>,
}

impl NameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `name` as used without allocating it.
    pub fn reserve(&mut self, name: impl Into<String>) {
        self.taken.insert(name.into());
    }

    pub fn is_taken(&self, name: &str) -> bool {
        self.taken.contains(name)
    }

    pub fn allocate(&mut self, base: &str) -> String {
        if self.taken.insert(base.to_string()) {
            return base.to_string();
        }

        let counter = self.counters.entry(base.to_string()).or_insert(1);
        loop {
            *counter += 1;
            let candidate = format!("{base}_{counter}");
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

/// A relationship with its final name and rendered arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRelation {
    pub kind: RelationKind,
    pub method_name: String,
    /// ORM call, e.g. `hasMany`.
    pub relation: String,
    pub relation_class: String,
    pub related_model: String,
    /// Argument tail after the model class, e.g. `, 'role_user'`.
    pub input_fields: String,
    /// Chained pivot calls, e.g. `->withTimestamps()`.
    pub method_chain: String,
    /// Property annotation, e.g. `\App\Models\User author`.
    pub doc_type: String,
    /// Whether every key follows the ORM's naming convention.
    pub is_default_key_naming: bool,
}

impl ResolvedRelation {
    /// Placeholder substitutions for the relationship method template.
    pub fn template_vars(&self) -> Vec<(&'static str, String)> {
        vec![
            ("$RELATIONSHIP_CLASS$", self.relation_class.clone()),
            ("$FUNCTION_NAME$", self.method_name.clone()),
            ("$RELATION$", self.relation.clone()),
            ("$RELATION_MODEL_NAME$", self.related_model.clone()),
            ("$INPUT_FIELDS$", self.input_fields.clone()),
            ("$ADDITIONAL_METHOD_CALLS$", self.method_chain.clone()),
        ]
    }
}

/// Names the relationships of one owner model.
#[derive(Debug, Clone)]
pub struct Resolver {
    owner: ModelNames,
    owner_primary_key: String,
    field_names: Vec<String>,
    namespace: String,
    allocator: NameAllocator,
}

impl Resolver {
    pub fn new(owner: &ModelNames, owner_primary_key: &str, fields: &[Field]) -> Self {
        let mut allocator = NameAllocator::new();
        for field in fields {
            allocator.reserve(field.name.clone());
        }

        Self {
            owner: owner.clone(),
            owner_primary_key: owner_primary_key.to_string(),
            field_names: fields.iter().map(|f| f.name.to_lowercase()).collect(),
            namespace: "App\\Models".to_string(),
            allocator,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn resolve_all(&mut self, relationships: &[Relationship]) -> Vec<ResolvedRelation> {
        relationships.iter().map(|r| self.resolve(r)).collect()
    }

    pub fn resolve(&mut self, relationship: &Relationship) -> ResolvedRelation {
        let kind = relationship.kind;
        let related = ModelNames::new(relationship.related_model());

        let method_name = match relationship.custom_name.as_deref() {
            Some(custom) => {
                self.allocator.reserve(custom);
                custom.to_string()
            }
            None => {
                let base = self.base_name(relationship, &related);
                let base = if kind.is_plural() { pluralize(&base) } else { base };
                self.allocator.allocate(&base.to_lower_camel_case())
            }
        };

        let mut params = relationship.params.clone();
        let mut positional: Vec<String> = relationship.inputs.iter().skip(1).cloned().collect();
        let is_default_key_naming =
            self.strip_default_params(relationship, &related, &method_name, &mut params);

        if kind == RelationKind::ManyToMany && params.is_empty() {
            let mut segments = [related.snake.clone(), self.owner.snake.clone()];
            segments.sort();
            let conventional = segments.join("_");
            if positional.first().is_some_and(|p| p.to_lowercase() == conventional) {
                positional.remove(0);
            }
        }

        let mut args = positional;
        args.extend(params.into_values().filter(|v| !v.is_empty()));
        let input_fields: String = args
            .iter()
            .map(|a| format!(", '{a}'"))
            .collect::<String>()
            .to_lowercase();

        let method_chain: String = relationship
            .method_calls
            .iter()
            .map(ToString::to_string)
            .collect();

        let doc_type = if kind.is_plural() {
            format!("\\Illuminate\\Database\\Eloquent\\Collection {method_name}")
        } else {
            format!("\\{}\\{} {method_name}", self.namespace, related.name)
        };

        tracing::debug!(
            kind = %kind,
            related = %related.name,
            method = %method_name,
            args = %input_fields,
            "resolved relationship"
        );

        ResolvedRelation {
            kind,
            method_name,
            relation: kind.orm_call().to_string(),
            relation_class: kind.relation_class().to_string(),
            related_model: relationship.related_model().to_string(),
            input_fields,
            method_chain,
            doc_type,
            is_default_key_naming,
        }
    }

    /// Snake-case base for the method name, before pluralizing.
    fn base_name(&self, relationship: &Relationship, related: &ModelNames) -> String {
        match relationship.kind {
            RelationKind::ManyToMany => {
                let Some(pivot) = relationship.pivot_table() else {
                    return related.snake.clone();
                };
                let mut forms = self.owner.snake_forms();
                forms.extend(related.snake_forms());
                let rest = strip_segments(&pivot.to_snake_case(), &forms);
                if rest.is_empty() {
                    related.snake.clone()
                } else {
                    rest
                }
            }
            RelationKind::ManyToOne => match self.custom_key_name(relationship, related) {
                Some(name) => name,
                None => self.without_owner(&related.snake),
            },
            _ => self.without_owner(&related.snake),
        }
    }

    /// Name taken from a foreign key column that does not follow
    /// `<related>_<owner key>`, e.g. `approver_id` → `approver`.
    fn custom_key_name(&self, relationship: &Relationship, related: &ModelNames) -> Option<String> {
        let owner_key = relationship
            .param(KeyParam::OwnerKey)
            .or(relationship.related_primary_key.as_deref())
            .unwrap_or("id");

        let column = match relationship.inputs.get(1) {
            Some(explicit) => explicit.as_str(),
            None => {
                let fk = relationship.param(KeyParam::ForeignKey)?;
                if fk == format!("{}_{}", related.snake, owner_key) {
                    return None;
                }
                fk
            }
        };

        let stripped: Vec<&str> = column
            .split('_')
            .filter(|word| !word.eq_ignore_ascii_case(owner_key))
            .collect();
        let name = stripped.join("_").to_lowercase();
        if name.is_empty() {
            return None;
        }

        if self.field_names.contains(&name) {
            return Some(format!("{name}_{}", related.snake));
        }
        Some(name)
    }

    /// Drops owner-model segments (`user_profile` on `User` → `profile`).
    fn without_owner(&self, snake: &str) -> String {
        let rest = strip_segments(snake, &self.owner.snake_forms());
        if rest.is_empty() {
            snake.to_string()
        } else {
            rest
        }
    }

    /// Clears params that merely restate the ORM's defaults.
    ///
    /// Returns whether the foreign key followed the default convention.
    fn strip_default_params(
        &self,
        relationship: &Relationship,
        related: &ModelNames,
        method_name: &str,
        params: &mut BTreeMap<KeyParam, String>,
    ) -> bool {
        let related_pk = relationship.related_primary_key.as_deref().unwrap_or("id");

        let is_default = match relationship.kind {
            RelationKind::OneToOne | RelationKind::OneToMany => {
                let default_fk = format!("{}_{}", self.owner.snake, self.owner_primary_key);
                let is_default = params
                    .get(&KeyParam::ForeignKey)
                    .is_none_or(|fk| *fk == default_fk);
                if is_default {
                    params.clear();
                } else if params.get(&KeyParam::LocalKey) == Some(&self.owner_primary_key) {
                    params.remove(&KeyParam::LocalKey);
                }
                is_default
            }
            RelationKind::ManyToOne => {
                let owner_key = params
                    .get(&KeyParam::OwnerKey)
                    .cloned()
                    .unwrap_or_else(|| related_pk.to_string());
                let default_fk = format!("{}_{}", method_name.to_snake_case(), owner_key);
                let is_default = params
                    .get(&KeyParam::ForeignKey)
                    .is_none_or(|fk| *fk == default_fk);
                if is_default {
                    params.clear();
                } else if owner_key == related_pk {
                    params.remove(&KeyParam::OwnerKey);
                }
                is_default
            }
            RelationKind::ManyToMany => {
                let default_foreign = format!("{}_{}", self.owner.snake, self.owner_primary_key);
                let default_related = format!("{}_{}", related.snake, related_pk);
                let foreign_ok = params
                    .get(&KeyParam::ForeignPivotKey)
                    .is_none_or(|k| *k == default_foreign);
                let related_ok = params
                    .get(&KeyParam::RelatedPivotKey)
                    .is_none_or(|k| *k == default_related);
                params.remove(&KeyParam::PrimaryKey);
                if foreign_ok && related_ok {
                    params.clear();
                }
                foreign_ok && related_ok
            }
            RelationKind::HasManyThrough => params.is_empty(),
        };

        params.retain(|_, v| !v.is_empty());
        is_default
    }
}

/// Removes every whole-segment occurrence of `forms` from a snake name.
fn strip_segments(name: &str, forms: &[&str]) -> String {
    let mut words: Vec<&str> = name.split('_').filter(|w| !w.is_empty()).collect();

    for form in forms {
        let pattern: Vec<&str> = form.split('_').filter(|w| !w.is_empty()).collect();
        if pattern.is_empty() {
            continue;
        }
        let mut i = 0;
        while i + pattern.len() <= words.len() {
            if words[i..i + pattern.len()] == pattern[..] {
                words.drain(i..i + pattern.len());
            } else {
                i += 1;
            }
        }
    }

    words.join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(owner: &str) -> Resolver {
        Resolver::new(&ModelNames::new(owner), "id", &[])
    }

    fn field(name: &str) -> Field {
        Field::from_input(&format!("{name} string"), "").unwrap()
    }

    #[test]
    fn test_model_names() {
        let names = ModelNames::from_table("blog_posts");
        assert_eq!(names.name, "BlogPost");
        assert_eq!(names.plural, "BlogPosts");
        assert_eq!(names.camel, "blogPost");
        assert_eq!(names.camel_plural, "blogPosts");
        assert_eq!(names.snake, "blog_post");
        assert_eq!(names.snake_plural, "blog_posts");
        assert_eq!(names.dashed, "blog-post");
        assert_eq!(names.human, "Blog Post");
        assert_eq!(model_name_from_table("categories"), "Category");
    }

    #[test]
    fn test_allocator_suffixes_per_base() {
        let mut allocator = NameAllocator::new();
        assert_eq!(allocator.allocate("item"), "item");
        assert_eq!(allocator.allocate("tag"), "tag");
        assert_eq!(allocator.allocate("item"), "item_2");
        assert_eq!(allocator.allocate("item"), "item_3");
        assert_eq!(allocator.allocate("tag"), "tag_2");
    }

    #[test]
    fn test_allocator_skips_reserved_suffix() {
        let mut allocator = NameAllocator::new();
        allocator.reserve("note");
        allocator.reserve("note_2");
        assert_eq!(allocator.allocate("note"), "note_3");
        assert!(allocator.is_taken("note_3"));
    }

    #[test]
    fn test_strip_segments() {
        assert_eq!(strip_segments("role_user", &["users", "user"]), "role");
        assert_eq!(strip_segments("user_profile", &["user"]), "profile");
        assert_eq!(strip_segments("superuser_note", &["user"]), "superuser_note");
        assert_eq!(strip_segments("blog_post_tag", &["blog_post"]), "tag");
    }

    #[test]
    fn test_belongs_to_with_conventional_key() {
        let mut resolver = resolver("Post");
        let rel = Relationship::new(RelationKind::ManyToOne, "User")
            .with_param(KeyParam::ForeignKey, "user_id")
            .with_param(KeyParam::OwnerKey, "id")
            .with_related_primary_key(Some("id".to_string()));

        let resolved = resolver.resolve(&rel);
        assert_eq!(resolved.method_name, "user");
        assert_eq!(resolved.relation, "belongsTo");
        assert_eq!(resolved.relation_class, "BelongsTo");
        assert_eq!(resolved.input_fields, "");
        assert!(resolved.is_default_key_naming);
        assert_eq!(resolved.doc_type, "\\App\\Models\\User user");
    }

    #[test]
    fn test_belongs_to_named_from_column() {
        let mut resolver = resolver("Post");
        let rel = Relationship::new(RelationKind::ManyToOne, "User")
            .with_param(KeyParam::ForeignKey, "approver_id")
            .with_param(KeyParam::OwnerKey, "id")
            .with_related_primary_key(Some("id".to_string()));

        let resolved = resolver.resolve(&rel);
        assert_eq!(resolved.method_name, "approver");
        // belongsTo guesses `approver_id` from the method name
        assert!(resolved.is_default_key_naming);
        assert_eq!(resolved.input_fields, "");
    }

    #[test]
    fn test_belongs_to_name_colliding_with_field() {
        let fields = vec![field("approver"), field("approver_id")];
        let mut resolver = Resolver::new(&ModelNames::new("Post"), "id", &fields);
        let rel = Relationship::new(RelationKind::ManyToOne, "User")
            .with_param(KeyParam::ForeignKey, "approver_id")
            .with_param(KeyParam::OwnerKey, "id");

        let resolved = resolver.resolve(&rel);
        assert_eq!(resolved.method_name, "approverUser");
        assert!(!resolved.is_default_key_naming);
        assert_eq!(resolved.input_fields, ", 'approver_id'");
    }

    #[test]
    fn test_belongs_to_custom_owner_key() {
        let mut resolver = resolver("Order");
        let rel = Relationship::new(RelationKind::ManyToOne, "Country")
            .with_param(KeyParam::ForeignKey, "country_code")
            .with_param(KeyParam::OwnerKey, "code")
            .with_related_primary_key(Some("code".to_string()));

        let resolved = resolver.resolve(&rel);
        assert_eq!(resolved.method_name, "country");
        assert!(resolved.is_default_key_naming);
    }

    #[test]
    fn test_manual_belongs_to_with_explicit_column() {
        let mut resolver = resolver("Comment");
        let rel = Relationship::parse("mt1,Post,parent_post_id").unwrap();

        let resolved = resolver.resolve(&rel);
        assert_eq!(resolved.method_name, "parentPost");
        assert_eq!(resolved.input_fields, ", 'parent_post_id'");
    }

    #[test]
    fn test_custom_name_wins() {
        let mut resolver = resolver("Comment");
        let rel = Relationship::parse("mt1,Post:approver,approver_id").unwrap();
        let resolved = resolver.resolve(&rel);
        assert_eq!(resolved.method_name, "approver");
        assert_eq!(resolved.doc_type, "\\App\\Models\\Post approver");
    }

    #[test]
    fn test_has_many_default_params_are_omitted() {
        let mut resolver = resolver("Post");
        let rel = Relationship::new(RelationKind::OneToMany, "Comment")
            .with_param(KeyParam::ForeignKey, "post_id")
            .with_param(KeyParam::LocalKey, "id");

        let resolved = resolver.resolve(&rel);
        assert_eq!(resolved.method_name, "comments");
        assert_eq!(resolved.relation, "hasMany");
        assert_eq!(resolved.input_fields, "");
        assert!(resolved.is_default_key_naming);
        assert_eq!(
            resolved.doc_type,
            "\\Illuminate\\Database\\Eloquent\\Collection comments"
        );
    }

    #[test]
    fn test_has_many_custom_foreign_key_keeps_it() {
        let mut resolver = resolver("User");
        let rel = Relationship::new(RelationKind::OneToMany, "Post")
            .with_param(KeyParam::ForeignKey, "Author_ID")
            .with_param(KeyParam::LocalKey, "id");

        let resolved = resolver.resolve(&rel);
        assert_eq!(resolved.method_name, "posts");
        assert_eq!(resolved.input_fields, ", 'author_id'");
        assert!(!resolved.is_default_key_naming);
    }

    #[test]
    fn test_owner_segments_are_stripped() {
        let mut resolver = resolver("User");
        let rel = Relationship::new(RelationKind::OneToOne, "UserProfile");
        assert_eq!(resolver.resolve(&rel).method_name, "profile");
    }

    #[test]
    fn test_collision_appends_suffix() {
        let mut resolver = resolver("Post");
        let first = Relationship::new(RelationKind::OneToMany, "Comment")
            .with_param(KeyParam::ForeignKey, "post_id");
        let second = Relationship::new(RelationKind::OneToOne, "Comment")
            .with_param(KeyParam::ForeignKey, "post_id");
        let third = Relationship::new(RelationKind::OneToOne, "Comment")
            .with_param(KeyParam::ForeignKey, "pinned_post_id");

        let resolved = resolver.resolve_all(&[first, second, third]);
        let names: Vec<&str> = resolved.iter().map(|r| r.method_name.as_str()).collect();
        assert_eq!(names, vec!["comments", "comment", "comment_2"]);
        assert_eq!(resolved[2].doc_type, "\\App\\Models\\Comment comment_2");
    }

    #[test]
    fn test_field_names_are_reserved() {
        let fields = vec![field("items")];
        let mut resolver = Resolver::new(&ModelNames::new("Order"), "id", &fields);
        let rel = Relationship::new(RelationKind::OneToMany, "Item");
        assert_eq!(resolver.resolve(&rel).method_name, "items_2");
    }

    #[test]
    fn test_belongs_to_many_conventional_pivot_is_dropped() {
        let mut resolver = resolver("User");
        let rel = Relationship::new(RelationKind::ManyToMany, "Role")
            .with_input("role_user")
            .with_param(KeyParam::ForeignPivotKey, "user_id")
            .with_param(KeyParam::RelatedPivotKey, "role_id");

        let resolved = resolver.resolve(&rel);
        assert_eq!(resolved.method_name, "roles");
        assert_eq!(resolved.input_fields, "");
        assert!(resolved.is_default_key_naming);
    }

    #[test]
    fn test_belongs_to_many_custom_pivot() {
        let mut resolver = resolver("User");
        let rel = Relationship::new(RelationKind::ManyToMany, "Team")
            .with_input("team_memberships")
            .with_param(KeyParam::ForeignPivotKey, "member_id")
            .with_param(KeyParam::RelatedPivotKey, "team_id");

        let resolved = resolver.resolve(&rel);
        assert_eq!(resolved.method_name, "memberships");
        assert_eq!(
            resolved.input_fields,
            ", 'team_memberships', 'member_id', 'team_id'"
        );
        assert!(!resolved.is_default_key_naming);
    }

    #[test]
    fn test_belongs_to_many_keeps_unconventional_pivot_name() {
        let mut resolver = resolver("User");
        let rel = Relationship::new(RelationKind::ManyToMany, "Role")
            .with_input("user_roles")
            .with_param(KeyParam::ForeignPivotKey, "user_id")
            .with_param(KeyParam::RelatedPivotKey, "role_id");

        let resolved = resolver.resolve(&rel);
        assert_eq!(resolved.method_name, "roles");
        assert_eq!(resolved.input_fields, ", 'user_roles'");
    }

    #[test]
    fn test_template_vars() {
        let mut resolver = resolver("User");
        let mut rel = Relationship::new(RelationKind::ManyToMany, "Role").with_input("role_user");
        rel.method_calls.push(crate::relation::MethodCall::new("withTimestamps"));

        let vars = resolver.resolve(&rel).template_vars();
        assert_eq!(vars[0], ("$RELATIONSHIP_CLASS$", "BelongsToMany".to_string()));
        assert_eq!(vars[1], ("$FUNCTION_NAME$", "roles".to_string()));
        assert_eq!(vars[5], ("$ADDITIONAL_METHOD_CALLS$", "->withTimestamps()".to_string()));
    }
}
