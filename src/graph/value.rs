//! Declared and resolved property values.
//!
//! A [`Value`] is what a resource declaration holds: a literal, a deferred
//! reference to another resource's output, or a structure built from those.
//! Resolution turns it into a [`ResolvedValue`], which is either plain JSON
//! or a [`Secret`] wrapping JSON. Secrecy is contagious: any composite with a
//! secret component resolves to a secret of the whole composite.

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::fmt;

use crate::error::GraphError;

use super::secret::{REDACTED, Secret};

/// Declared properties of a resource, in declaration order.
pub type Properties = IndexMap<String, Value>;

/// Resolved properties or outputs of a resource.
pub type PropertyMap = IndexMap<String, ResolvedValue>;

/// Handle to a declared resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceHandle {
    name: String,
}

/// Placeholder for "output `property` of resource `resource`".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DeferredValue {
    /// Logical name of the source resource.
    pub resource: String,
    /// Output property, optionally a dotted path into a nested object.
    pub property: String,
}

/// A property value as declared.
#[derive(Clone, PartialEq)]
pub enum Value {
    /// A value known at declaration time.
    Literal(JsonValue),
    /// An output of another resource.
    Deferred(DeferredValue),
    /// A value whose resolved form must be kept secret.
    Secret(Box<Value>),
    /// A list that may contain deferred values.
    List(Vec<Value>),
    /// An object that may contain deferred values.
    Map(IndexMap<String, Value>),
    /// String interpolation of `{0}`, `{1}`, ... with the resolved args.
    Format {
        /// Template containing positional placeholders.
        template: String,
        /// Values substituted into the template.
        args: Vec<Value>,
    },
}

/// A fully resolved value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ResolvedValue {
    /// Plain JSON.
    Plain(JsonValue),
    /// JSON that may only be read through an explicit unwrap.
    Secret(Secret<JsonValue>),
}

impl ResourceHandle {
    pub(crate) const fn new(name: String) -> Self {
        Self { name }
    }

    /// Logical name of the resource.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a deferred reference to one of this resource's outputs.
    #[must_use]
    pub fn output(&self, property: &str) -> DeferredValue {
        DeferredValue::new(self.name.clone(), property)
    }
}

impl DeferredValue {
    /// Creates a reference by resource name.
    #[must_use]
    pub fn new(resource: impl Into<String>, property: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            property: property.into(),
        }
    }
}

impl fmt::Display for DeferredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.resource, self.property)
    }
}

impl Value {
    /// Creates a literal value.
    #[must_use]
    pub fn literal(value: impl Into<JsonValue>) -> Self {
        Self::Literal(value.into())
    }

    /// Marks a value as secret.
    #[must_use]
    pub fn secret(value: impl Into<Self>) -> Self {
        Self::Secret(Box::new(value.into()))
    }

    /// Creates a list value.
    #[must_use]
    pub fn list(items: impl IntoIterator<Item = Self>) -> Self {
        Self::List(items.into_iter().collect())
    }

    /// Creates an object value.
    #[must_use]
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Self)>) -> Self {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Creates an interpolated string value.
    #[must_use]
    pub fn format(template: impl Into<String>, args: impl IntoIterator<Item = Self>) -> Self {
        Self::Format {
            template: template.into(),
            args: args.into_iter().collect(),
        }
    }

    /// Returns every deferred reference in this value, depth first.
    #[must_use]
    pub fn references(&self) -> Vec<&DeferredValue> {
        let mut refs = Vec::new();
        self.collect_references(&mut refs);
        refs
    }

    fn collect_references<'a>(&'a self, refs: &mut Vec<&'a DeferredValue>) {
        match self {
            Self::Literal(_) => {}
            Self::Deferred(d) => refs.push(d),
            Self::Secret(inner) => inner.collect_references(refs),
            Self::List(items) | Self::Format { args: items, .. } => {
                for item in items {
                    item.collect_references(refs);
                }
            }
            Self::Map(entries) => {
                for item in entries.values() {
                    item.collect_references(refs);
                }
            }
        }
    }

    /// Returns a JSON description safe for display and hashing.
    ///
    /// Deferred values render as `{"$ref": "resource.property"}`, secrets as
    /// `"[secret]"`, and format strings as `{"$format": ..., "args": [...]}`.
    #[must_use]
    pub fn describe(&self) -> JsonValue {
        match self {
            Self::Literal(v) => v.clone(),
            Self::Deferred(d) => serde_json::json!({ "$ref": d.to_string() }),
            Self::Secret(_) => JsonValue::String(REDACTED.to_string()),
            Self::List(items) => JsonValue::Array(items.iter().map(Self::describe).collect()),
            Self::Map(entries) => JsonValue::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.describe()))
                    .collect(),
            ),
            Self::Format { template, args } => serde_json::json!({
                "$format": template,
                "args": args.iter().map(Self::describe).collect::<Vec<_>>(),
            }),
        }
    }

    /// Resolves this value, looking up deferred references with `lookup`.
    ///
    /// # Errors
    ///
    /// Returns whatever `lookup` returns for a reference it cannot satisfy.
    pub fn resolve_with<F>(&self, lookup: &F) -> Result<ResolvedValue, GraphError>
    where
        F: Fn(&DeferredValue) -> Result<ResolvedValue, GraphError>,
    {
        let (value, secret) = self.resolve_parts(lookup)?;
        Ok(ResolvedValue::from_parts(value, secret))
    }

    fn resolve_parts<F>(&self, lookup: &F) -> Result<(JsonValue, bool), GraphError>
    where
        F: Fn(&DeferredValue) -> Result<ResolvedValue, GraphError>,
    {
        match self {
            Self::Literal(v) => Ok((v.clone(), false)),
            Self::Deferred(d) => Ok(lookup(d)?.into_parts()),
            Self::Secret(inner) => {
                let (value, _) = inner.resolve_parts(lookup)?;
                Ok((value, true))
            }
            Self::List(items) => {
                let mut secret = false;
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    let (value, item_secret) = item.resolve_parts(lookup)?;
                    secret |= item_secret;
                    out.push(value);
                }
                Ok((JsonValue::Array(out), secret))
            }
            Self::Map(entries) => {
                let mut secret = false;
                let mut out = JsonMap::new();
                for (key, item) in entries {
                    let (value, item_secret) = item.resolve_parts(lookup)?;
                    secret |= item_secret;
                    out.insert(key.clone(), value);
                }
                Ok((JsonValue::Object(out), secret))
            }
            Self::Format { template, args } => {
                let mut secret = false;
                let mut rendered = Vec::with_capacity(args.len());
                for arg in args {
                    let (value, arg_secret) = arg.resolve_parts(lookup)?;
                    secret |= arg_secret;
                    rendered.push(json_to_text(&value));
                }
                Ok((JsonValue::String(render_template(template, &rendered)), secret))
            }
        }
    }
}

// Secrets must never reach a Debug sink, so this mirrors `describe`.
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(v) => f.debug_tuple("Literal").field(v).finish(),
            Self::Deferred(d) => f.debug_tuple("Deferred").field(d).finish(),
            Self::Secret(_) => write!(f, "Secret({REDACTED})"),
            Self::List(items) => f.debug_tuple("List").field(items).finish(),
            Self::Map(entries) => f.debug_tuple("Map").field(entries).finish(),
            Self::Format { template, args } => f
                .debug_struct("Format")
                .field("template", template)
                .field("args", args)
                .finish(),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.describe().serialize(serializer)
    }
}

impl From<DeferredValue> for Value {
    fn from(value: DeferredValue) -> Self {
        Self::Deferred(value)
    }
}

impl From<Secret<String>> for Value {
    fn from(value: Secret<String>) -> Self {
        Self::secret(Self::Literal(JsonValue::String(value.into_inner())))
    }
}

impl From<JsonValue> for Value {
    fn from(value: JsonValue) -> Self {
        Self::Literal(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Literal(JsonValue::String(value.to_string()))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Literal(JsonValue::String(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Literal(JsonValue::Bool(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Literal(JsonValue::from(value))
    }
}

impl ResolvedValue {
    fn from_parts(value: JsonValue, secret: bool) -> Self {
        if secret {
            Self::Secret(Secret::new(value))
        } else {
            Self::Plain(value)
        }
    }

    fn into_parts(self) -> (JsonValue, bool) {
        match self {
            Self::Plain(v) => (v, false),
            Self::Secret(s) => (s.into_inner(), true),
        }
    }

    /// Returns true if the value is secret.
    #[must_use]
    pub const fn is_secret(&self) -> bool {
        matches!(self, Self::Secret(_))
    }

    /// Returns the value if it is not secret.
    #[must_use]
    pub const fn plain(&self) -> Option<&JsonValue> {
        match self {
            Self::Plain(v) => Some(v),
            Self::Secret(_) => None,
        }
    }

    /// Returns the plaintext, secret or not.
    #[must_use]
    pub const fn reveal(&self) -> &JsonValue {
        match self {
            Self::Plain(v) => v,
            Self::Secret(s) => s.expose(),
        }
    }

    /// Returns the string form if the value is a plain string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.plain().and_then(JsonValue::as_str)
    }

    /// Marks the value as secret.
    #[must_use]
    pub fn into_secret(self) -> Self {
        match self {
            Self::Plain(v) => Self::Secret(Secret::new(v)),
            secret @ Self::Secret(_) => secret,
        }
    }

    /// Returns the value with secrets replaced by a placeholder.
    #[must_use]
    pub fn redacted(&self) -> JsonValue {
        match self {
            Self::Plain(v) => v.clone(),
            Self::Secret(_) => JsonValue::String(REDACTED.to_string()),
        }
    }

    /// Follows a dotted path into nested objects.
    ///
    /// The result keeps the secrecy of `self`.
    #[must_use]
    pub fn pointer(&self, path: &str) -> Option<Self> {
        let mut current = self.reveal();
        for segment in path.split('.') {
            current = current.get(segment)?;
        }
        Some(Self::from_parts(current.clone(), self.is_secret()))
    }
}

impl From<JsonValue> for ResolvedValue {
    fn from(value: JsonValue) -> Self {
        Self::Plain(value)
    }
}

impl From<&str> for ResolvedValue {
    fn from(value: &str) -> Self {
        Self::Plain(JsonValue::String(value.to_string()))
    }
}

impl From<String> for ResolvedValue {
    fn from(value: String) -> Self {
        Self::Plain(JsonValue::String(value))
    }
}

impl fmt::Display for ResolvedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(v) => f.write_str(&json_to_text(v)),
            Self::Secret(_) => f.write_str(REDACTED),
        }
    }
}

/// Renders resolved properties for logging, with secrets redacted.
#[must_use]
pub fn describe_properties(properties: &PropertyMap) -> String {
    let fields: Vec<String> = properties
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect();
    format!("{{{}}}", fields.join(", "))
}

/// Strings render bare; everything else renders as JSON.
fn json_to_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Substitutes `{N}` placeholders in a single pass.
///
/// Placeholders with an out-of-range or non-numeric index are kept verbatim.
fn render_template(template: &str, args: &[String]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let substituted = after.find('}').and_then(|close| {
            after[..close]
                .parse::<usize>()
                .ok()
                .and_then(|idx| args.get(idx))
                .map(|arg| (arg, close))
        });

        match substituted {
            Some((arg, close)) => {
                out.push_str(arg);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lookup(d: &DeferredValue) -> Result<ResolvedValue, GraphError> {
        match (d.resource.as_str(), d.property.as_str()) {
            ("rg", "name") => Ok(ResolvedValue::from("rg-1234")),
            ("sql", "password") => Ok(ResolvedValue::from("p@ss").into_secret()),
            _ => Err(GraphError::MissingOutput {
                resource: d.resource.clone(),
                property: d.property.clone(),
            }),
        }
    }

    #[test]
    fn test_references_are_collected_depth_first() {
        let value = Value::map([
            ("group", Value::from(DeferredValue::new("rg", "name"))),
            (
                "nested",
                Value::list([
                    Value::from("x"),
                    Value::secret(DeferredValue::new("sql", "password")),
                ]),
            ),
        ]);

        let refs: Vec<String> = value.references().iter().map(ToString::to_string).collect();
        assert_eq!(refs, vec!["rg.name", "sql.password"]);
    }

    #[test]
    fn test_deferred_value_is_substituted() {
        let value = Value::from(DeferredValue::new("rg", "name"));
        let resolved = value.resolve_with(&lookup).expect("resolve");
        assert_eq!(resolved, ResolvedValue::from("rg-1234"));
    }

    #[test]
    fn test_secret_taints_composites() {
        let value = Value::map([
            ("plain", Value::from("a")),
            ("password", Value::from(DeferredValue::new("sql", "password"))),
        ]);
        let resolved = value.resolve_with(&lookup).expect("resolve");

        assert!(resolved.is_secret());
        assert_eq!(resolved.reveal()["password"], json!("p@ss"));
        assert_eq!(resolved.redacted(), json!(REDACTED));
    }

    #[test]
    fn test_format_renders_args() {
        let value = Value::format(
            "Server={0};Password={1};Keep={2}",
            [
                Value::from(DeferredValue::new("rg", "name")),
                Value::from(Secret::from("pw")),
            ],
        );
        let resolved = value.resolve_with(&lookup).expect("resolve");

        assert!(resolved.is_secret());
        assert_eq!(
            resolved.reveal(),
            &json!("Server=rg-1234;Password=pw;Keep={2}")
        );
    }

    #[test]
    fn test_render_template_is_single_pass() {
        let args = vec![String::from("{1}"), String::from("b")];
        assert_eq!(render_template("{0}-{1}", &args), "{1}-b");
        assert_eq!(render_template("{x}{", &args), "{x}{");
    }

    #[test]
    fn test_missing_reference_propagates() {
        let value = Value::list([Value::from(DeferredValue::new("vm", "id"))]);
        let err = value.resolve_with(&lookup).expect_err("should fail");
        assert!(matches!(err, GraphError::MissingOutput { .. }));
    }

    #[test]
    fn test_pointer_keeps_secrecy() {
        let value = ResolvedValue::from(json!({ "web": "https://site" }));
        assert_eq!(value.pointer("web"), Some(ResolvedValue::from("https://site")));
        assert_eq!(value.pointer("blob"), None);

        let secret = value.into_secret();
        assert!(secret.pointer("web").is_some_and(|v| v.is_secret()));
    }

    #[test]
    fn test_debug_hides_secret_literals() {
        let value = Value::map([("password", Value::from(Secret::from("hunter2")))]);
        assert!(!format!("{value:?}").contains("hunter2"));
        assert_eq!(value.describe(), json!({ "password": REDACTED }));
    }
}
