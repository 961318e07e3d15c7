//! Dynamically-typed raw values as supplied by providers.
//!
//! Every source decodes into [`RawValue`] before coercion: environment
//! variables and flags yield strings, structured files and remote documents
//! yield whatever shape their decoder produced. Nested documents are
//! flattened into dotted keys with [`flatten`].

use std::fmt;

use indexmap::IndexMap;

/// A value of unknown shape, prior to coercion into an option's type.
#[derive(Clone, Debug, PartialEq)]
pub enum RawValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<RawValue>),
    Map(IndexMap<String, RawValue>),
}

impl RawValue {
    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }

    /// Short name of the value's shape, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            RawValue::Null => "null",
            RawValue::Bool(_) => "bool",
            RawValue::Int(_) => "integer",
            RawValue::Float(_) => "float",
            RawValue::String(_) => "string",
            RawValue::List(_) => "list",
            RawValue::Map(_) => "map",
        }
    }

    /// Render a scalar as plain text. Lists and maps yield `None`.
    pub fn as_scalar_string(&self) -> Option<String> {
        match self {
            RawValue::Null => Some(String::new()),
            RawValue::Bool(b) => Some(b.to_string()),
            RawValue::Int(i) => Some(i.to_string()),
            RawValue::Float(f) => Some(f.to_string()),
            RawValue::String(s) => Some(s.clone()),
            RawValue::List(_) | RawValue::Map(_) => None,
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Null => write!(f, "null"),
            RawValue::Bool(b) => write!(f, "{b}"),
            RawValue::Int(i) => write!(f, "{i}"),
            RawValue::Float(x) => write!(f, "{x}"),
            RawValue::String(s) => write!(f, "{s:?}"),
            RawValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            RawValue::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::String(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::String(s)
    }
}

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        RawValue::Bool(b)
    }
}

impl From<i64> for RawValue {
    fn from(i: i64) -> Self {
        RawValue::Int(i)
    }
}

impl From<f64> for RawValue {
    fn from(x: f64) -> Self {
        RawValue::Float(x)
    }
}

impl From<Vec<String>> for RawValue {
    fn from(items: Vec<String>) -> Self {
        RawValue::List(items.into_iter().map(RawValue::String).collect())
    }
}

impl From<serde_json::Value> for RawValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => RawValue::Null,
            Value::Bool(b) => RawValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => RawValue::Int(i),
                None => RawValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => RawValue::String(s),
            Value::Array(items) => RawValue::List(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => {
                RawValue::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<serde_yaml_ng::Value> for RawValue {
    fn from(value: serde_yaml_ng::Value) -> Self {
        use serde_yaml_ng::Value;
        match value {
            Value::Null => RawValue::Null,
            Value::Bool(b) => RawValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => RawValue::Int(i),
                None => RawValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => RawValue::String(s),
            Value::Sequence(items) => RawValue::List(items.into_iter().map(Into::into).collect()),
            Value::Mapping(mapping) => RawValue::Map(
                mapping
                    .into_iter()
                    .filter_map(|(k, v)| {
                        // Non-scalar mapping keys cannot address an option.
                        RawValue::from(k).as_scalar_string().map(|k| (k, v.into()))
                    })
                    .collect(),
            ),
            Value::Tagged(tagged) => tagged.value.into(),
        }
    }
}

impl From<toml::Value> for RawValue {
    fn from(value: toml::Value) -> Self {
        use toml::Value;
        match value {
            Value::String(s) => RawValue::String(s),
            Value::Integer(i) => RawValue::Int(i),
            Value::Float(x) => RawValue::Float(x),
            Value::Boolean(b) => RawValue::Bool(b),
            Value::Datetime(dt) => RawValue::String(dt.to_string()),
            Value::Array(items) => RawValue::List(items.into_iter().map(Into::into).collect()),
            Value::Table(table) => {
                RawValue::Map(table.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

/// Flatten a nested document into dotted keys.
///
/// ```text
/// root:
///   sub:
///     subone: val
/// ```
///
/// flattens to `{"root.sub.subone": "val"}`. Lists are leaves.
pub fn flatten(doc: IndexMap<String, RawValue>) -> IndexMap<String, RawValue> {
    let mut out = IndexMap::new();
    flatten_into(doc, "", &mut out);
    out
}

fn flatten_into(doc: IndexMap<String, RawValue>, prefix: &str, out: &mut IndexMap<String, RawValue>) {
    for (k, v) in doc {
        let path = if prefix.is_empty() {
            k
        } else {
            format!("{prefix}.{k}")
        };
        match v {
            RawValue::Map(inner) => flatten_into(inner, &path, out),
            leaf => {
                out.insert(path, leaf);
            }
        }
    }
}
