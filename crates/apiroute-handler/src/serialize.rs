//! Response-field serialization.
//!
//! A [`ResponseField`] describes the shape a handler's return value must have.
//! [`serialize_response`] validates a value against it and rewrites it for the
//! wire: declared fields only, required fields checked, defaults filled in,
//! names rendered as aliases on request, and the route's inclusion and
//! exclusion sets applied.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::{Map, Value};

use apiroute_core::{ApiError, ApiResult, ErrorRecord};

/// The shape of a value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Any JSON value, passed through.
    Any,
    /// An object following a model schema.
    Model(Arc<ModelSchema>),
    /// An array whose items all have the inner shape.
    List(Box<FieldKind>),
}

/// One field of a [`ModelSchema`].
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaField {
    /// The declared name.
    pub name: String,
    /// The external name, used for output when serializing by alias.
    pub alias: Option<String>,
    pub kind: FieldKind,
    /// Missing required fields fail validation.
    pub required: bool,
    /// Used for a missing optional field; `null` when absent.
    pub default: Option<Value>,
}

impl SchemaField {
    pub fn required(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            alias: None,
            kind,
            required: true,
            default: None,
        }
    }

    pub fn optional(name: impl Into<String>, kind: FieldKind, default: Option<Value>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            kind,
            required: false,
            default,
        }
    }

    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    fn output_key(&self, by_alias: bool) -> &str {
        match (&self.alias, by_alias) {
            (Some(alias), true) => alias,
            _ => &self.name,
        }
    }
}

/// A named set of fields, in output order.
///
/// # Examples
///
/// ```
/// use apiroute_handler::serialize::{FieldKind, ModelSchema, SchemaField};
///
/// let user = ModelSchema::new("User")
///     .field(SchemaField::required("id", FieldKind::Any))
///     .field(SchemaField::required("full_name", FieldKind::Any).alias("fullName"));
/// assert_eq!(user.fields.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSchema {
    pub name: String,
    pub fields: Vec<SchemaField>,
}

impl ModelSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn field(mut self, field: SchemaField) -> Self {
        self.fields.push(field);
        self
    }
}

/// The declared response shape of a route.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseField {
    pub name: String,
    pub kind: FieldKind,
}

impl ResponseField {
    /// A response that is a single model.
    pub fn model(schema: ModelSchema) -> Self {
        Self {
            name: format!("Response_{}", schema.name),
            kind: FieldKind::Model(Arc::new(schema)),
        }
    }

    /// A response that is a list of models.
    pub fn list_of(schema: ModelSchema) -> Self {
        Self {
            name: format!("Response_List_{}", schema.name),
            kind: FieldKind::List(Box::new(FieldKind::Model(Arc::new(schema)))),
        }
    }
}

/// Validates and serializes `value` against `field`.
///
/// Without a field the value is returned unchanged. `include` and `exclude`
/// name declared fields of the top-level model (or of each model in a
/// top-level list); an empty `include` set keeps everything.
///
/// # Errors
///
/// [`ApiError::ResponseValidation`] listing every problem found.
pub fn serialize_response(
    field: Option<&ResponseField>,
    value: Value,
    include: Option<&HashSet<String>>,
    exclude: &HashSet<String>,
    by_alias: bool,
    exclude_unset: bool,
) -> ApiResult<Value> {
    let Some(field) = field else {
        return Ok(value);
    };

    let mut walker = Walker {
        by_alias,
        exclude_unset,
        errors: Vec::new(),
        loc: vec!["response".to_string()],
    };
    let filter = Filter {
        include: include.filter(|set| !set.is_empty()),
        exclude,
    };
    let serialized = walker.walk(&field.kind, value, Some(&filter));

    if walker.errors.is_empty() {
        Ok(serialized)
    } else {
        let message = walker
            .errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        tracing::error!(
            field = %field.name,
            errors = walker.errors.len(),
            "response value does not match the declared response field"
        );
        Err(ApiError::ResponseValidation(message))
    }
}

struct Filter<'a> {
    include: Option<&'a HashSet<String>>,
    exclude: &'a HashSet<String>,
}

impl Filter<'_> {
    fn keeps(&self, name: &str) -> bool {
        self.include.map_or(true, |set| set.contains(name)) && !self.exclude.contains(name)
    }
}

struct Walker {
    by_alias: bool,
    exclude_unset: bool,
    errors: Vec<ErrorRecord>,
    loc: Vec<String>,
}

impl Walker {
    fn error(&mut self, msg: &str, kind: &str) {
        self.errors
            .push(ErrorRecord::new(self.loc.clone(), msg, kind));
    }

    fn walk(&mut self, kind: &FieldKind, value: Value, filter: Option<&Filter<'_>>) -> Value {
        match kind {
            FieldKind::Any => value,
            FieldKind::List(item_kind) => {
                let Value::Array(items) = value else {
                    self.error("value is not a valid list", "type_error.list");
                    return Value::Null;
                };
                let items = items
                    .into_iter()
                    .enumerate()
                    .map(|(index, item)| {
                        self.loc.push(index.to_string());
                        let out = self.walk(item_kind, item, filter);
                        self.loc.pop();
                        out
                    })
                    .collect();
                Value::Array(items)
            }
            FieldKind::Model(schema) => {
                let Value::Object(input) = value else {
                    self.error("value is not a valid dict", "type_error.dict");
                    return Value::Null;
                };
                self.walk_model(schema, input, filter)
            }
        }
    }

    fn walk_model(
        &mut self,
        schema: &ModelSchema,
        mut input: Map<String, Value>,
        filter: Option<&Filter<'_>>,
    ) -> Value {
        let mut out = Map::new();
        for field in &schema.fields {
            if filter.is_some_and(|f| !f.keeps(&field.name)) {
                continue;
            }
            let taken = input
                .remove(&field.name)
                .or_else(|| field.alias.as_ref().and_then(|a| input.remove(a)));

            self.loc.push(field.name.clone());
            let value = match taken {
                Some(Value::Null) if field.required => {
                    self.error("none is not an allowed value", "type_error.none.not_allowed");
                    None
                }
                Some(Value::Null) => Some(Value::Null),
                Some(v) => Some(self.walk(&field.kind, v, None)),
                None if field.required => {
                    self.error("field required", "value_error.missing");
                    None
                }
                None if self.exclude_unset => None,
                None => Some(field.default.clone().unwrap_or(Value::Null)),
            };
            self.loc.pop();

            if let Some(value) = value {
                out.insert(field.output_key(self.by_alias).to_string(), value);
            }
        }
        Value::Object(out)
    }
}
