//! Structural schema descriptions and the generic checker that evaluates
//! them against raw JSON.
//!
//! A [`Schema`] is plain data: the checker walks it alongside a
//! [`serde_json::Value`] and records every mismatch as an [`Issue`] with
//! the path at which it occurred. Unknown object keys are ignored.

use std::fmt;

use serde_json::Value;

/// The JSON shape a [`Schema`] accepts.
#[derive(Debug, Clone)]
pub enum Kind {
    /// Any JSON string.
    String,
    /// Any JSON number.
    Number,
    /// A JSON number representable as `i64`.
    Integer,
    /// `true` or `false`.
    Boolean,
    /// A string drawn from a fixed set.
    Enum(&'static [&'static str]),
    /// An array whose elements all match the inner schema.
    Array(Box<Schema>),
    /// An object with the given fields.
    Object(Vec<Field>),
}

/// A structural description of an expected JSON value.
#[derive(Debug, Clone)]
pub struct Schema {
    kind: Kind,
    nullable: bool,
}

/// A named member of an object schema.
#[derive(Debug, Clone)]
pub struct Field {
    name: &'static str,
    schema: Schema,
    required: bool,
}

impl Field {
    /// A field that must be present.
    #[must_use]
    pub const fn required(name: &'static str, schema: Schema) -> Self {
        Self {
            name,
            schema,
            required: true,
        }
    }

    /// A field that may be absent. When present it must match `schema`
    /// (so `null` is only accepted if the schema is nullable).
    #[must_use]
    pub const fn optional(name: &'static str, schema: Schema) -> Self {
        Self {
            name,
            schema,
            required: false,
        }
    }
}

impl Schema {
    const fn of(kind: Kind) -> Self {
        Self {
            kind,
            nullable: false,
        }
    }

    /// Any string.
    #[must_use]
    pub const fn string() -> Self {
        Self::of(Kind::String)
    }

    /// Any number.
    #[must_use]
    pub const fn number() -> Self {
        Self::of(Kind::Number)
    }

    /// An integral number.
    #[must_use]
    pub const fn integer() -> Self {
        Self::of(Kind::Integer)
    }

    /// A boolean.
    #[must_use]
    pub const fn boolean() -> Self {
        Self::of(Kind::Boolean)
    }

    /// One of the given strings.
    #[must_use]
    pub const fn one_of(allowed: &'static [&'static str]) -> Self {
        Self::of(Kind::Enum(allowed))
    }

    /// An array of `items`.
    #[must_use]
    pub fn array_of(items: Self) -> Self {
        Self::of(Kind::Array(Box::new(items)))
    }

    /// An object with `fields`.
    #[must_use]
    pub const fn object(fields: Vec<Field>) -> Self {
        Self::of(Kind::Object(fields))
    }

    /// Also accepts `null`.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// The accepted shape.
    #[must_use]
    pub const fn kind(&self) -> &Kind {
        &self.kind
    }

    /// Checks `value` against this schema, returning every issue found.
    ///
    /// An empty result means the value conforms.
    #[must_use]
    pub fn check(&self, value: &Value) -> Vec<Issue> {
        let mut issues = Vec::new();
        self.check_at(value, "", &mut issues);
        issues
    }

    fn check_at(&self, value: &Value, path: &str, issues: &mut Vec<Issue>) {
        if value.is_null() && self.nullable {
            return;
        }

        match &self.kind {
            Kind::String => {
                if !value.is_string() {
                    issues.push(Issue::invalid_type(path, "string", value));
                }
            }
            Kind::Number => {
                if !value.is_number() {
                    issues.push(Issue::invalid_type(path, "number", value));
                }
            }
            Kind::Integer => {
                if value.as_i64().is_none() {
                    issues.push(Issue::invalid_type(path, "integer", value));
                }
            }
            Kind::Boolean => {
                if !value.is_boolean() {
                    issues.push(Issue::invalid_type(path, "boolean", value));
                }
            }
            Kind::Enum(allowed) => match value.as_str() {
                Some(s) if allowed.iter().any(|a| *a == s) => {}
                Some(s) => issues.push(Issue {
                    path: path.to_string(),
                    kind: IssueKind::InvalidEnum {
                        allowed: *allowed,
                        received: s.to_string(),
                    },
                }),
                None => issues.push(Issue::invalid_type(path, "string", value)),
            },
            Kind::Array(items) => match value.as_array() {
                Some(elements) => {
                    for (i, element) in elements.iter().enumerate() {
                        items.check_at(element, &format!("{path}[{i}]"), issues);
                    }
                }
                None => issues.push(Issue::invalid_type(path, "array", value)),
            },
            Kind::Object(fields) => match value.as_object() {
                Some(map) => {
                    for field in fields {
                        let child = if path.is_empty() {
                            field.name.to_string()
                        } else {
                            format!("{path}.{}", field.name)
                        };
                        match map.get(field.name) {
                            Some(v) => field.schema.check_at(v, &child, issues),
                            None if field.required => issues.push(Issue {
                                path: child,
                                kind: IssueKind::Required {
                                    expected: field.schema.expected(),
                                },
                            }),
                            None => {}
                        }
                    }
                }
                None => issues.push(Issue::invalid_type(path, "object", value)),
            },
        }
    }

    const fn expected(&self) -> &'static str {
        match self.kind {
            Kind::String => "string",
            Kind::Number => "number",
            Kind::Integer => "integer",
            Kind::Boolean => "boolean",
            Kind::Enum(_) => "enum",
            Kind::Array(_) => "array",
            Kind::Object(_) => "object",
        }
    }
}

/// What went wrong at an [`Issue`]'s path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    /// A required field is missing.
    Required {
        /// Shape the field should have had.
        expected: &'static str,
    },
    /// The value has the wrong JSON type.
    InvalidType {
        /// Shape the schema expects.
        expected: &'static str,
        /// JSON type actually found.
        received: &'static str,
    },
    /// A string outside an enum's allowed set.
    InvalidEnum {
        /// The allowed values.
        allowed: &'static [&'static str],
        /// The value found.
        received: String,
    },
    /// Free-form failure (e.g. a typed decode error after the structural
    /// check passed).
    Custom(String),
}

/// A single field-level violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    /// Dotted/indexed location, e.g. `queryCrimes[2].latitude`. Empty for
    /// the root value.
    pub path: String,
    /// The violation.
    pub kind: IssueKind,
}

impl Issue {
    fn invalid_type(path: &str, expected: &'static str, value: &Value) -> Self {
        Self {
            path: path.to_string(),
            kind: IssueKind::InvalidType {
                expected,
                received: json_type(value),
            },
        }
    }

    /// Creates a free-form issue at `path`.
    #[must_use]
    pub fn custom(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: IssueKind::Custom(message.into()),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() {
            "(root)"
        } else {
            &self.path
        };
        match &self.kind {
            IssueKind::Required { expected } => {
                write!(f, "{path}: Required ({expected})")
            }
            IssueKind::InvalidType { expected, received } => {
                write!(f, "{path}: Expected {expected}, received {received}")
            }
            IssueKind::InvalidEnum { allowed, received } => {
                let options = allowed
                    .iter()
                    .map(|a| format!("'{a}'"))
                    .collect::<Vec<_>>()
                    .join(" | ");
                write!(
                    f,
                    "{path}: Invalid enum value. Expected {options}, received '{received}'"
                )
            }
            IssueKind::Custom(message) => write!(f, "{path}: {message}"),
        }
    }
}

const fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
