//! Device kind → applicable section map for `.netdev` schemas.
//!
//! A netdev file always carries the universal `[NetDev]` section; which
//! further sections apply depends on its `Kind=`. Schemas encode that
//! dependency as conditionals whose condition is a negated constant on the
//! discriminator (`Kind` is *not* `bridge` ⇒ `[Bridge]` must be absent).
//! This module inverts those conditionals into a lookup table.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::data::{
    record::scalar_text,
    resolve::resolve,
    schema::{Definitions, collect_properties},
};

/// Section present in every netdev file.
pub const UNIVERSAL_SECTION: &str = "NetDev";

/// Key of the universal section that selects the device kind.
pub const KIND_KEY: &str = "Kind";

/// Kinds offered first in simplified pickers.
pub const COMMON_KINDS: &[&str] = &[
    "bridge", "bond", "vlan", "vxlan", "wireguard", "macvlan", "dummy", "tun", "tap", "veth",
];

/// Kind/section pairs the dependency graph does not express.
///
/// Tunnel-like kinds share one `[Tunnel]` section and are not encoded as
/// per-kind conditionals. Sections are only added when the document
/// declares them.
pub const SUPPLEMENTARY_KINDS: &[(&str, &[&str])] = &[
    ("ipip", &["Tunnel"]),
    ("sit", &["Tunnel"]),
    ("gre", &["Tunnel"]),
    ("gretap", &["Tunnel"]),
    ("ip6gre", &["Tunnel"]),
    ("ip6gretap", &["Tunnel"]),
    ("vti", &["Tunnel"]),
    ("vti6", &["Tunnel"]),
    ("ip6tnl", &["Tunnel"]),
    ("erspan", &["Tunnel"]),
    ("tun", &["Tun"]),
    ("tap", &["Tap"]),
    ("veth", &["Peer"]),
    ("wireguard", &["WireGuard", "WireGuardPeer"]),
    ("macvlan", &["MACVLAN"]),
    ("macvtap", &["MACVTAP"]),
    ("ipvlan", &["IPVLAN"]),
    ("ipvtap", &["IPVTAP"]),
];

/// Ordered map of kind value to the sections it uses.
///
/// Every list starts with the universal section.
#[derive(Debug, Clone, PartialEq)]
pub struct KindSectionMap {
    universal: String,
    entries: Vec<(String, Vec<String>)>,
}

impl KindSectionMap {
    /// Create an empty map for the given universal section.
    pub fn new(universal: impl Into<String>) -> Self {
        Self {
            universal: universal.into(),
            entries: Vec::new(),
        }
    }

    /// Name of the universal section.
    pub fn universal(&self) -> &str {
        &self.universal
    }

    /// Sections applicable to a kind.
    pub fn get(&self, kind: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(k, _)| k == kind)
            .map(|(_, sections)| sections.as_slice())
    }

    /// Whether the kind is known.
    pub fn contains(&self, kind: &str) -> bool {
        self.get(kind).is_some()
    }

    /// Known kinds, in discovery order.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Kind/section list pairs, in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(k, sections)| (k.as_str(), sections.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Register a kind with only the universal section, if not known yet.
    pub fn ensure_kind(&mut self, kind: &str) -> &mut Vec<String> {
        let idx = match self.entries.iter().position(|(k, _)| k == kind) {
            Some(idx) => idx,
            None => {
                self.entries
                    .push((kind.to_string(), vec![self.universal.clone()]));
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx].1
    }

    /// Record that `section` applies to `kind`.
    pub fn add(&mut self, kind: &str, section: &str) {
        let sections = self.ensure_kind(kind);
        if !sections.iter().any(|s| s == section) {
            sections.push(section.to_string());
        }
    }
}

impl Serialize for KindSectionMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(k, v)| (k, v)))
    }
}

/// Configurable extractor for kind dependency graphs.
#[derive(Debug, Clone)]
pub struct KindExtractor {
    universal: String,
    discriminator: String,
    supplement: Vec<(String, Vec<String>)>,
}

impl Default for KindExtractor {
    fn default() -> Self {
        Self::new(UNIVERSAL_SECTION, KIND_KEY).with_supplements(SUPPLEMENTARY_KINDS)
    }
}

impl KindExtractor {
    /// Extractor for a universal section and discriminator key, without supplements.
    pub fn new(universal: impl Into<String>, discriminator: impl Into<String>) -> Self {
        Self {
            universal: universal.into(),
            discriminator: discriminator.into(),
            supplement: Vec::new(),
        }
    }

    /// Add one supplementary kind entry.
    pub fn with_supplement(mut self, kind: &str, sections: &[&str]) -> Self {
        self.supplement.push((
            kind.to_string(),
            sections.iter().map(|s| s.to_string()).collect(),
        ));
        self
    }

    /// Add a table of supplementary kind entries.
    pub fn with_supplements(self, table: &[(&str, &[&str])]) -> Self {
        table
            .iter()
            .fold(self, |this, (kind, sections)| this.with_supplement(kind, sections))
    }

    /// Build the kind map of a schema document.
    ///
    /// Kinds come from the discriminator's `enum`, then from conditional
    /// entries in declaration order, then from the supplementary table.
    /// A supplementary kind is only added when the document declares one
    /// of its sections or the kind is already known.
    pub fn extract(&self, document: &Value) -> KindSectionMap {
        let mut map = KindSectionMap::new(self.universal.clone());
        let Some(root) = document.as_object() else {
            return map;
        };
        let definitions = Definitions::of(document);
        let declared = root.get("properties").and_then(Value::as_object);

        for kind in self.enumerated_kinds(declared, &definitions) {
            map.ensure_kind(&kind);
        }

        for arm in ["allOf", "anyOf", "oneOf"]
            .into_iter()
            .filter_map(|key| root.get(key).and_then(Value::as_array))
            .flatten()
        {
            let Some(arm) = definitions.deref(arm).as_object() else {
                continue;
            };
            let (Some(condition), Some(consequence)) = (arm.get("if"), arm.get("then")) else {
                continue;
            };
            let mut kinds = Vec::new();
            self.discriminator_values(condition, true, &mut kinds);
            let mut sections = Vec::new();
            excluded_sections(consequence, &mut sections);
            for kind in &kinds {
                for section in &sections {
                    map.add(kind, section);
                }
            }
        }

        for key in ["dependencies", "dependentSchemas"] {
            let Some(deps) = root.get(key).and_then(Value::as_object) else {
                continue;
            };
            for (section, schema) in deps {
                let mut kinds = Vec::new();
                self.discriminator_values(schema, false, &mut kinds);
                for kind in &kinds {
                    map.add(kind, section);
                }
            }
        }

        for (kind, sections) in &self.supplement {
            let present: Vec<&String> = sections
                .iter()
                .filter(|section| declared.is_some_and(|props| props.contains_key(section.as_str())))
                .collect();
            if present.is_empty() && !map.contains(kind) {
                continue;
            }
            map.ensure_kind(kind);
            for section in present {
                map.add(kind, section);
            }
        }

        map
    }

    fn enumerated_kinds(
        &self,
        declared: Option<&Map<String, Value>>,
        definitions: &Definitions<'_>,
    ) -> Vec<String> {
        let Some(universal) = declared
            .and_then(|props| props.get(&self.universal))
            .map(|node| definitions.deref(node))
            .and_then(Value::as_object)
        else {
            return Vec::new();
        };
        collect_properties(universal, definitions)
            .into_iter()
            .find(|(key, _)| *key == self.discriminator)
            .and_then(|(_, node)| resolve(node, definitions).enum_values)
            .unwrap_or_default()
    }

    /// Collect constants the discriminator is compared against below `node`.
    ///
    /// With `negated_only`, only `not: {const}` / `not: {enum}` comparisons count.
    fn discriminator_values(&self, node: &Value, negated_only: bool, out: &mut Vec<String>) {
        match node {
            Value::Object(obj) => {
                if let Some(target) = obj
                    .get("properties")
                    .and_then(|props| props.get(&self.discriminator))
                    .and_then(Value::as_object)
                {
                    if let Some(negated) = target.get("not").and_then(Value::as_object) {
                        push_constants(negated, out);
                    }
                    if !negated_only {
                        push_constants(target, out);
                    }
                }
                for child in obj.values() {
                    self.discriminator_values(child, negated_only, out);
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.discriminator_values(item, negated_only, out);
                }
            }
            _ => {}
        }
    }
}

fn push_constants(node: &Map<String, Value>, out: &mut Vec<String>) {
    let values = node
        .get("const")
        .into_iter()
        .chain(node.get("enum").and_then(Value::as_array).into_iter().flatten());
    for value in values {
        let text = scalar_text(value);
        if !out.contains(&text) {
            out.push(text);
        }
    }
}

/// Section names a consequence forbids: `not.required`, `not.anyOf[].required`
/// or `properties.<Section>: false`.
fn excluded_sections(node: &Value, out: &mut Vec<String>) {
    let Some(obj) = node.as_object() else {
        return;
    };
    let mut push = |name: &str| {
        if !out.iter().any(|s| s == name) {
            out.push(name.to_string());
        }
    };

    if let Some(negated) = obj.get("not").and_then(Value::as_object) {
        let required = negated.get("required").into_iter().chain(
            negated
                .get("anyOf")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .filter_map(|arm| arm.get("required")),
        );
        for name in required
            .filter_map(Value::as_array)
            .flatten()
            .filter_map(Value::as_str)
        {
            push(name);
        }
    }
    if let Some(props) = obj.get("properties").and_then(Value::as_object) {
        for (name, value) in props {
            if *value == Value::Bool(false) {
                push(name);
            }
        }
    }
    if let Some(arms) = obj.get("allOf").and_then(Value::as_array) {
        for arm in arms {
            excluded_sections(arm, out);
        }
    }
}

/// Kind map of a netdev schema with the default universal section,
/// discriminator and supplementary table.
pub fn extract_kind_map(document: &Value) -> KindSectionMap {
    KindExtractor::default().extract(document)
}

/// The common kinds present in a map, in [`COMMON_KINDS`] order.
pub fn common_kinds(map: &KindSectionMap) -> Vec<String> {
    COMMON_KINDS
        .iter()
        .filter(|kind| map.contains(kind))
        .map(|kind| kind.to_string())
        .collect()
}
