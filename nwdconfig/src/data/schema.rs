use serde_json::{Map, Value};

use crate::data::{types::CategoryTier, version::SystemdVersion};

/// Extension attribute naming the disclosure tier of a node.
pub const CATEGORY_ATTR: &str = "x-category";

/// Attributes carrying the systemd version a node was introduced in, by preference.
pub const SINCE_ATTRS: &[&str] = &["x-since", "since"];

const REF_PREFIXES: &[&str] = &["#/definitions/", "#/$defs/"];

/// Follow at most this many chained `$ref` hops when dereferencing a node.
const MAX_REF_HOPS: usize = 32;

/// Errors raised while compiling schemas or handling records.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The document cannot produce any section model.
    #[error("schema unusable: {reason}")]
    Unusable { reason: String },

    /// A record value does not have the expected shape.
    #[error("type mismatch at {path}: expected {expected}, found {actual}")]
    TypeMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    /// INI text is structurally malformed.
    #[error("INI syntax error on line {line}: {message}")]
    Ini { line: usize, message: String },

    /// A version string contains no version number.
    #[error("invalid systemd version: {0:?}")]
    InvalidVersion(String),

    /// Unknown configuration family name.
    #[error("unknown config family: {0:?}")]
    UnknownFamily(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SchemaError {
    pub(crate) fn unusable(reason: impl Into<String>) -> Self {
        SchemaError::Unusable {
            reason: reason.into(),
        }
    }

    pub(crate) fn ini(line: usize, message: impl Into<String>) -> Self {
        SchemaError::Ini {
            line,
            message: message.into(),
        }
    }
}

pub type Result<T, E = SchemaError> = std::result::Result<T, E>;

/// Name of the definition a pointer refers to, without its prefix.
pub fn ref_name(pointer: &str) -> &str {
    REF_PREFIXES
        .iter()
        .find_map(|prefix| pointer.strip_prefix(prefix))
        .unwrap_or(pointer)
}

/// The reference table of a schema document.
#[derive(Debug, Clone, Copy, Default)]
pub struct Definitions<'a> {
    table: Option<&'a Map<String, Value>>,
}

impl<'a> Definitions<'a> {
    /// Take `definitions`, falling back to `$defs`, from a document root.
    pub fn of(document: &'a Value) -> Self {
        let table = document
            .get("definitions")
            .or_else(|| document.get("$defs"))
            .and_then(Value::as_object);
        Self { table }
    }

    /// Wrap an already extracted table.
    pub fn from_table(table: &'a Map<String, Value>) -> Self {
        Self { table: Some(table) }
    }

    /// Look up the node a `$ref` pointer names.
    pub fn lookup(&self, pointer: &str) -> Option<&'a Value> {
        self.table?.get(ref_name(pointer))
    }

    /// Follow `$ref` hops until a node without a resolvable pointer is reached.
    pub fn deref(&self, mut node: &'a Value) -> &'a Value {
        for _ in 0..MAX_REF_HOPS {
            let Some(pointer) = node.get("$ref").and_then(Value::as_str) else {
                return node;
            };
            match self.lookup(pointer) {
                Some(target) => node = target,
                None => return node,
            }
        }
        warn!("reference chain too deep, stopping dereference");
        node
    }
}

/// Keys that are schema bookkeeping rather than INI keys or sections.
pub fn is_internal_key(key: &str) -> bool {
    key.starts_with('$') || key.starts_with('#') || key.starts_with('_') || key.starts_with("//")
}

/// The tier named by a node's `x-category` attribute.
pub fn tier_of(node: &Map<String, Value>) -> Option<CategoryTier> {
    node.get(CATEGORY_ATTR)
        .and_then(Value::as_str)
        .and_then(CategoryTier::from_attr)
}

/// The version a node was introduced in.
pub fn since_of(node: &Map<String, Value>) -> Option<SystemdVersion> {
    SINCE_ATTRS
        .iter()
        .find_map(|attr| node.get(*attr).and_then(SystemdVersion::from_value))
}

/// Arms of `oneOf`, `anyOf` and `allOf`, in that order.
pub fn union_arms(node: &Map<String, Value>) -> impl Iterator<Item = &Value> {
    ["oneOf", "anyOf", "allOf"]
        .into_iter()
        .filter_map(|key| node.get(key).and_then(Value::as_array))
        .flatten()
}

/// Whether a node declares an alternative-type union.
pub fn has_union(node: &Map<String, Value>) -> bool {
    union_arms(node).next().is_some()
}

/// Properties of an object node and of its union arms, first writer wins per key.
pub fn collect_properties<'a>(
    node: &'a Map<String, Value>,
    definitions: &Definitions<'a>,
) -> Vec<(&'a str, &'a Value)> {
    let mut out = Vec::new();
    gather_properties(node, definitions, &mut out, 0);
    out
}

fn gather_properties<'a>(
    node: &'a Map<String, Value>,
    definitions: &Definitions<'a>,
    out: &mut Vec<(&'a str, &'a Value)>,
    depth: usize,
) {
    if depth > MAX_REF_HOPS {
        return;
    }
    if let Some(props) = node.get("properties").and_then(Value::as_object) {
        for (key, value) in props {
            if !out.iter().any(|(k, _)| *k == key.as_str()) {
                out.push((key.as_str(), value));
            }
        }
    }
    for arm in union_arms(node) {
        if let Some(arm) = definitions.deref(arm).as_object() {
            gather_properties(arm, definitions, out, depth + 1);
        }
    }
}

/// Names listed in `required` arrays of a node and its union arms.
pub fn collect_required<'a>(
    node: &'a Map<String, Value>,
    definitions: &Definitions<'a>,
) -> Vec<&'a str> {
    let mut out: Vec<&str> = node
        .get("required")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .collect();
    for arm in union_arms(node) {
        if let Some(arm) = definitions.deref(arm).as_object() {
            out.extend(
                arm.get("required")
                    .and_then(Value::as_array)
                    .into_iter()
                    .flatten()
                    .filter_map(Value::as_str),
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ref_name_strips_known_prefixes() {
        assert_eq!(ref_name("#/definitions/mac_address"), "mac_address");
        assert_eq!(ref_name("#/$defs/seconds"), "seconds");
        assert_eq!(ref_name("plain"), "plain");
    }

    #[test]
    fn deref_follows_chains() {
        let doc = json!({
            "definitions": {
                "a": {"$ref": "#/definitions/b"},
                "b": {"type": "integer"}
            }
        });
        let defs = Definitions::of(&doc);
        let node = json!({"$ref": "#/definitions/a"});
        assert_eq!(defs.deref(&node), &json!({"type": "integer"}));
    }

    #[test]
    fn deref_stops_on_cycles() {
        let doc = json!({
            "definitions": {
                "a": {"$ref": "#/definitions/b"},
                "b": {"$ref": "#/definitions/a"}
            }
        });
        let defs = Definitions::of(&doc);
        let node = json!({"$ref": "#/definitions/a"});
        assert!(defs.deref(&node).get("$ref").is_some());
    }

    #[test]
    fn properties_merge_union_arms() {
        let doc = json!({
            "definitions": {"extra": {"properties": {"B": {}, "A": {"type": "string"}}}}
        });
        let defs = Definitions::of(&doc);
        let node = json!({
            "properties": {"A": {"type": "integer"}},
            "allOf": [{"$ref": "#/definitions/extra"}],
            "required": ["A"]
        });
        let obj = node.as_object().unwrap();
        let props = collect_properties(obj, &defs);
        let keys: Vec<_> = props.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, ["A", "B"]);
        assert_eq!(props[0].1, &json!({"type": "integer"}));
        assert_eq!(collect_required(obj, &defs), ["A"]);
    }

    #[test]
    fn internal_keys() {
        assert!(is_internal_key("$comment"));
        assert!(is_internal_key("//note"));
        assert!(is_internal_key("_meta"));
        assert!(!is_internal_key("DHCP"));
    }
}
