//! Relationship descriptors and the manual `kind,Model[:name],...` syntax.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RelationParseError {
    #[error("Unsupported relationship type `{0}` (expected 1t1, 1tm, mt1, mtm or hmt)")]
    UnsupportedKind(String),
    #[error("Relationship `{0}` does not name a related model")]
    MissingModel(String),
}

/// Relationship cardinality, seen from the model that owns the method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RelationKind {
    #[serde(rename = "1t1")]
    OneToOne,
    #[serde(rename = "1tm")]
    OneToMany,
    #[serde(rename = "mt1")]
    ManyToOne,
    #[serde(rename = "mtm")]
    ManyToMany,
    #[serde(rename = "hmt")]
    HasManyThrough,
}

impl RelationKind {
    pub fn code(self) -> &'static str {
        match self {
            Self::OneToOne => "1t1",
            Self::OneToMany => "1tm",
            Self::ManyToOne => "mt1",
            Self::ManyToMany => "mtm",
            Self::HasManyThrough => "hmt",
        }
    }

    /// The ORM method building this relationship.
    pub fn orm_call(self) -> &'static str {
        match self {
            Self::OneToOne => "hasOne",
            Self::OneToMany => "hasMany",
            Self::ManyToOne => "belongsTo",
            Self::ManyToMany => "belongsToMany",
            Self::HasManyThrough => "hasManyThrough",
        }
    }

    /// The ORM relation class, e.g. `BelongsToMany`.
    pub fn relation_class(self) -> &'static str {
        match self {
            Self::OneToOne => "HasOne",
            Self::OneToMany => "HasMany",
            Self::ManyToOne => "BelongsTo",
            Self::ManyToMany => "BelongsToMany",
            Self::HasManyThrough => "HasManyThrough",
        }
    }

    pub fn is_plural(self) -> bool {
        matches!(
            self,
            Self::OneToMany | Self::ManyToMany | Self::HasManyThrough
        )
    }
}

impl FromStr for RelationKind {
    type Err = RelationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1t1" => Ok(Self::OneToOne),
            "1tm" => Ok(Self::OneToMany),
            "mt1" => Ok(Self::ManyToOne),
            "mtm" => Ok(Self::ManyToMany),
            "hmt" => Ok(Self::HasManyThrough),
            _ => Err(RelationParseError::UnsupportedKind(s.trim().to_string())),
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Explicit key-column arguments.
///
/// Variant order is the alphabetical order of the parameter names, which is
/// also the order the ORM takes them positionally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyParam {
    ForeignKey,
    ForeignPivotKey,
    LocalKey,
    OwnerKey,
    PrimaryKey,
    RelatedPivotKey,
}

impl KeyParam {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ForeignKey => "foreignKey",
            Self::ForeignPivotKey => "foreignPivotKey",
            Self::LocalKey => "localKey",
            Self::OwnerKey => "ownerKey",
            Self::PrimaryKey => "primaryKey",
            Self::RelatedPivotKey => "relatedPivotKey",
        }
    }
}

/// A method chained onto the relationship, e.g. `withTimestamps()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodCall {
    pub name: String,
    pub args: Vec<String>,
}

impl MethodCall {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

impl fmt::Display for MethodCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self.args.iter().map(|a| format!("'{a}'")).collect();
        write!(f, "->{}({})", self.name, args.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relationship {
    pub kind: RelationKind,
    /// Related model first, then positional extras (pivot table, key columns).
    pub inputs: Vec<String>,
    pub custom_name: Option<String>,
    pub params: BTreeMap<KeyParam, String>,
    /// Primary key of the related table, when known from the schema.
    pub related_primary_key: Option<String>,
    pub method_calls: Vec<MethodCall>,
}

impl Relationship {
    pub fn new(kind: RelationKind, related_model: impl Into<String>) -> Self {
        Self {
            kind,
            inputs: vec![related_model.into()],
            custom_name: None,
            params: BTreeMap::new(),
            related_primary_key: None,
            method_calls: Vec::new(),
        }
    }

    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.inputs.push(input.into());
        self
    }

    pub fn with_param(mut self, key: KeyParam, value: impl Into<String>) -> Self {
        self.params.insert(key, value.into());
        self
    }

    pub fn with_related_primary_key(mut self, key: Option<String>) -> Self {
        self.related_primary_key = key;
        self
    }

    pub fn related_model(&self) -> &str {
        self.inputs.first().map(String::as_str).unwrap_or_default()
    }

    /// The pivot table of a many-to-many relationship.
    pub fn pivot_table(&self) -> Option<&str> {
        match self.kind {
            RelationKind::ManyToMany => self.inputs.get(1).map(String::as_str),
            _ => None,
        }
    }

    pub fn param(&self, key: KeyParam) -> Option<&str> {
        self.params.get(&key).map(String::as_str)
    }

    /// Parse a manual relation declaration.
    ///
    /// ```text
    /// 1t1,Phone,user_id,id
    /// 1tm,Comment,post_id,id
    /// mt1,Post:approver,approver_id
    /// mtm,Role,user_roles,user_id,role_id
    /// ```
    pub fn parse(input: &str) -> Result<Self, RelationParseError> {
        let mut parts = input.split(',').map(str::trim);
        let kind: RelationKind = parts.next().unwrap_or_default().parse()?;

        let model_part = parts.next().unwrap_or_default();
        let (model, custom_name) = match model_part.split_once(':') {
            Some((model, name)) => (model, Some(name).filter(|n| !n.is_empty())),
            None => (model_part, None),
        };
        if model.is_empty() {
            return Err(RelationParseError::MissingModel(input.to_string()));
        }

        let mut relationship = Self::new(kind, model);
        relationship.custom_name = custom_name.map(str::to_string);
        relationship
            .inputs
            .extend(parts.filter(|p| !p.is_empty()).map(str::to_string));
        Ok(relationship)
    }
}

impl FromStr for Relationship {
    type Err = RelationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Writes the manual declaration form; params are not part of it.
impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.kind, self.related_model())?;
        if let Some(name) = &self.custom_name {
            write!(f, ":{name}")?;
        }
        for input in self.inputs.iter().skip(1) {
            write!(f, ",{input}")?;
        }
        Ok(())
    }
}
