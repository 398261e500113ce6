use serde::Serialize;
use serde_json::{Map, Value};

use crate::data::{
    record::scalar_text,
    schema::{Definitions, ref_name, union_arms},
    types::{FieldType, ValidationConstraints, primary_type},
};

/// Definitions whose name alone refines the field type.
///
/// A reference to one of these contributes the listed type and its
/// constraints, without descending into the primitive it wraps.
pub const NAMED_DEFINITIONS: &[(&str, FieldType)] = &[
    ("mac_address", FieldType::Mac),
    ("ipv4_address", FieldType::Ipv4),
    ("ipv6_address", FieldType::Ipv6),
    ("ip_address", FieldType::Ip),
    ("seconds", FieldType::Duration),
    ("bytes", FieldType::Bytes),
    ("MTUBytes", FieldType::Bytes),
    ("MTUv6Bytes", FieldType::Bytes),
    ("ipv4_prefix", FieldType::Prefix),
    ("ipv6_prefix", FieldType::Prefix),
    ("ip_prefix", FieldType::Prefix),
];

/// Field type and constraints a schema node resolves to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedField {
    /// Every acceptable type, deduplicated, in discovery order.
    pub candidate_types: Vec<FieldType>,
    /// Designated primary type.
    pub primary_type: FieldType,
    /// Primary type of array items, when an array arm was seen.
    pub element_type: Option<FieldType>,
    /// Candidate types of array items.
    pub element_types: Vec<FieldType>,
    /// Literal values from `enum`/`const` arms.
    pub enum_values: Option<Vec<String>>,
    /// Merged constraints.
    pub constraints: ValidationConstraints,
    /// First `default` met during traversal.
    pub default: Option<Value>,
    /// First `description` met during traversal.
    pub description: Option<String>,
}

impl ResolvedField {
    /// The permissive fallback for nodes with no recognisable shape.
    pub fn fallback() -> Self {
        Self {
            candidate_types: vec![FieldType::String],
            primary_type: FieldType::String,
            element_type: None,
            element_types: Vec::new(),
            enum_values: None,
            constraints: ValidationConstraints::default(),
            default: None,
            description: None,
        }
    }
}

/// Resolve a field node against the document's definitions.
///
/// Never fails: a node contributing no type resolves to `string`.
pub fn resolve(node: &Value, definitions: &Definitions<'_>) -> ResolvedField {
    let mut acc = Accumulator::default();
    let mut stack = Vec::new();
    acc.collect(node, definitions, &mut stack);
    acc.finish()
}

#[derive(Default)]
struct Accumulator {
    types: Vec<FieldType>,
    enum_values: Vec<String>,
    has_enum: bool,
    element_types: Vec<FieldType>,
    constraints: ValidationConstraints,
    default: Option<Value>,
    description: Option<String>,
}

impl Accumulator {
    fn push(&mut self, ty: FieldType) {
        if !self.types.contains(&ty) {
            self.types.push(ty);
        }
    }

    fn push_enum<'v>(&mut self, values: impl IntoIterator<Item = &'v Value>) {
        self.has_enum = true;
        for value in values {
            let text = scalar_text(value);
            if !self.enum_values.contains(&text) {
                self.enum_values.push(text);
            }
        }
    }

    fn annotate(&mut self, obj: &Map<String, Value>) {
        self.constraints
            .merge(&ValidationConstraints::from_node(obj));
        if self.default.is_none() {
            self.default = obj.get("default").cloned();
        }
        if self.description.is_none() {
            self.description = obj
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string);
        }
    }

    fn collect<'a>(
        &mut self,
        node: &'a Value,
        definitions: &Definitions<'a>,
        stack: &mut Vec<&'a str>,
    ) {
        let Some(obj) = node.as_object() else {
            trace!("ignoring non-object schema node {node}");
            return;
        };
        self.annotate(obj);

        if let Some(pointer) = obj.get("$ref").and_then(Value::as_str) {
            self.collect_ref(pointer, definitions, stack);
            return;
        }

        if let Some(values) = obj.get("enum").and_then(Value::as_array) {
            self.push(FieldType::Select);
            self.push_enum(values);
            return;
        }
        if let Some(value) = obj.get("const") {
            self.push(FieldType::Select);
            self.push_enum([value]);
            return;
        }

        let mut typed = false;
        for name in json_types(obj) {
            typed = true;
            match name {
                "boolean" => self.push(FieldType::Boolean),
                "integer" | "number" => self.push(FieldType::Number),
                "string" => self.push(FieldType::String),
                "array" => {
                    self.push(FieldType::List);
                    if let Some(items) = obj.get("items") {
                        self.collect_items(items, definitions, stack);
                    }
                }
                _ => {}
            }
        }

        let mut arms = false;
        for arm in union_arms(obj) {
            arms = true;
            self.collect(arm, definitions, stack);
        }

        if !typed && !arms {
            // Untyped node: infer from the keywords it carries.
            if ["pattern", "minLength", "maxLength"]
                .iter()
                .any(|k| obj.contains_key(*k))
            {
                self.push(FieldType::String);
            } else if ["minimum", "maximum"].iter().any(|k| obj.contains_key(*k)) {
                self.push(FieldType::Number);
            }
        }
    }

    fn collect_ref<'a>(
        &mut self,
        pointer: &'a str,
        definitions: &Definitions<'a>,
        stack: &mut Vec<&'a str>,
    ) {
        let name = ref_name(pointer);
        let target = definitions.lookup(pointer);

        if let Some((_, ty)) = NAMED_DEFINITIONS.iter().find(|(n, _)| *n == name) {
            self.push(*ty);
            if let Some(def) = target.and_then(Value::as_object) {
                self.annotate(def);
            }
            return;
        }

        if stack.contains(&name) {
            debug!("cutting reference cycle at {pointer}");
            return;
        }

        match target {
            Some(def) => {
                stack.push(name);
                self.collect(def, definitions, stack);
                stack.pop();
            }
            None => warn!("dangling schema reference {pointer}"),
        }
    }

    fn collect_items<'a>(
        &mut self,
        items: &'a Value,
        definitions: &Definitions<'a>,
        stack: &mut Vec<&'a str>,
    ) {
        let mut inner = Accumulator::default();
        inner.collect(items, definitions, stack);

        for ty in inner.types {
            if !self.element_types.contains(&ty) {
                self.element_types.push(ty);
            }
        }
        if inner.has_enum {
            self.push_enum_strings(inner.enum_values);
        }
        self.constraints.merge(&inner.constraints);
    }

    fn push_enum_strings(&mut self, values: Vec<String>) {
        self.has_enum = true;
        for value in values {
            if !self.enum_values.contains(&value) {
                self.enum_values.push(value);
            }
        }
    }

    fn finish(self) -> ResolvedField {
        if self.types.is_empty() {
            return ResolvedField {
                default: self.default,
                description: self.description,
                ..ResolvedField::fallback()
            };
        }

        let element_type = if self.types.contains(&FieldType::List) {
            Some(if self.element_types.is_empty() {
                FieldType::String
            } else {
                primary_type(&self.element_types)
            })
        } else {
            None
        };

        ResolvedField {
            primary_type: primary_type(&self.types),
            candidate_types: self.types,
            element_type,
            element_types: self.element_types,
            enum_values: self.has_enum.then_some(self.enum_values),
            constraints: self.constraints,
            default: self.default,
            description: self.description,
        }
    }
}

fn json_types(obj: &Map<String, Value>) -> Vec<&str> {
    match obj.get("type") {
        Some(Value::String(s)) => vec![s.as_str()],
        Some(Value::Array(list)) => list.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> Value {
        json!({
            "definitions": {
                "mac_address": {"type": "string", "pattern": "^([0-9A-Fa-f]{2}:){5}[0-9A-Fa-f]{2}$"},
                "ip_address": {"type": "string"},
                "ip_prefix": {"type": "string"},
                "seconds": {"oneOf": [{"type": "integer"}, {"type": "string"}]},
                "boolean_or_enum": {"oneOf": [{"type": "boolean"}, {"enum": ["yes", "no", "ipv4", "ipv6"]}]},
                "port": {"type": "integer", "minimum": 0, "maximum": 65535},
                "loop_a": {"oneOf": [{"$ref": "#/definitions/loop_b"}, {"type": "integer"}]},
                "loop_b": {"$ref": "#/definitions/loop_a"}
            }
        })
    }

    fn resolve_in(node: Value) -> ResolvedField {
        let document = doc();
        let defs = Definitions::of(&document);
        resolve(&node, &defs)
    }

    #[test]
    fn primitive_types() {
        assert_eq!(resolve_in(json!({"type": "boolean"})).primary_type, FieldType::Boolean);
        assert_eq!(resolve_in(json!({"type": "integer"})).primary_type, FieldType::Number);
        assert_eq!(resolve_in(json!({"type": "string"})).primary_type, FieldType::String);
    }

    #[test]
    fn enum_union_prefers_select() {
        let field = resolve_in(json!({"$ref": "#/definitions/boolean_or_enum"}));
        assert_eq!(field.primary_type, FieldType::Select);
        assert_eq!(field.candidate_types, [FieldType::Boolean, FieldType::Select]);
        assert_eq!(
            field.enum_values.as_deref(),
            Some(&["yes".to_string(), "no".into(), "ipv4".into(), "ipv6".into()][..])
        );
    }

    #[test]
    fn named_definitions_refine_types() {
        let mac = resolve_in(json!({"$ref": "#/definitions/mac_address"}));
        assert_eq!(mac.candidate_types, [FieldType::Mac]);
        assert!(mac.constraints.pattern.is_some());

        let addr = resolve_in(json!({
            "oneOf": [{"$ref": "#/definitions/ip_address"}, {"$ref": "#/definitions/ip_prefix"}]
        }));
        assert_eq!(addr.candidate_types, [FieldType::Ip, FieldType::Prefix]);
        assert_eq!(addr.primary_type, FieldType::Ip);

        let timeout = resolve_in(json!({"$ref": "#/definitions/seconds"}));
        assert_eq!(timeout.primary_type, FieldType::Duration);
    }

    #[test]
    fn arrays_capture_element_type() {
        let dns = resolve_in(json!({
            "type": "array",
            "items": {"$ref": "#/definitions/ip_address"}
        }));
        assert_eq!(dns.primary_type, FieldType::List);
        assert_eq!(dns.element_type, Some(FieldType::Ip));
        assert_eq!(dns.element_types, [FieldType::Ip]);
    }

    #[test]
    fn constraints_merge_tightest() {
        let field = resolve_in(json!({
            "allOf": [
                {"$ref": "#/definitions/port"},
                {"type": "integer", "minimum": 10, "maximum": 100}
            ]
        }));
        assert_eq!(field.constraints.minimum, Some(10.0));
        assert_eq!(field.constraints.maximum, Some(100.0));

        let field = resolve_in(json!({
            "allOf": [
                {"type": "integer", "minimum": 0, "maximum": 100},
                {"minimum": 10, "maximum": 50}
            ]
        }));
        assert_eq!(field.constraints.minimum, Some(10.0));
        assert_eq!(field.constraints.maximum, Some(50.0));
    }

    #[test]
    fn unrecognised_nodes_fall_back_to_string() {
        let field = resolve_in(json!({"description": "free form", "x-custom": 1}));
        assert_eq!(field.primary_type, FieldType::String);
        assert_eq!(field.candidate_types, [FieldType::String]);
        assert!(field.constraints.is_empty());
        assert_eq!(field.description.as_deref(), Some("free form"));

        let field = resolve_in(json!(true));
        assert_eq!(field, ResolvedField::fallback());

        let field = resolve_in(json!({"$ref": "#/definitions/missing"}));
        assert_eq!(field.primary_type, FieldType::String);
    }

    #[test]
    fn reference_cycles_terminate() {
        let field = resolve_in(json!({"$ref": "#/definitions/loop_a"}));
        assert_eq!(field.candidate_types, [FieldType::Number]);
    }

    #[test]
    fn type_arrays_and_const() {
        let field = resolve_in(json!({"type": ["integer", "string"]}));
        assert_eq!(field.candidate_types, [FieldType::Number, FieldType::String]);
        assert_eq!(field.primary_type, FieldType::Number);

        let field = resolve_in(json!({"const": true}));
        assert_eq!(field.primary_type, FieldType::Select);
        assert_eq!(field.enum_values, Some(vec!["true".to_string()]));
    }

    #[test]
    fn default_and_description_come_from_outer_node_first() {
        let field = resolve_in(json!({
            "description": "outer",
            "default": 5,
            "oneOf": [{"type": "integer", "default": 1, "description": "inner"}]
        }));
        assert_eq!(field.default, Some(json!(5)));
        assert_eq!(field.description.as_deref(), Some("outer"));
    }
}
