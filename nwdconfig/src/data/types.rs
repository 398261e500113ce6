use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Closed set of field types a schema node can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Free text.
    String,
    /// Integer or floating-point number.
    Number,
    /// systemd boolean (`yes`/`no`, `true`/`false`, ...).
    Boolean,
    /// One of a fixed set of literal values.
    Select,
    /// Repeated key, one `Key=Value` line per element.
    List,
    /// IPv4 address.
    Ipv4,
    /// IPv6 address.
    Ipv6,
    /// IPv4 or IPv6 address.
    Ip,
    /// Ethernet hardware address.
    Mac,
    /// systemd time span.
    Duration,
    /// Byte size with optional K/M/G/T suffix.
    Bytes,
    /// Address with prefix length (`10.0.0.0/8`).
    Prefix,
}

impl FieldType {
    /// Lowercase name used in serialized models.
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Select => "select",
            FieldType::List => "list",
            FieldType::Ipv4 => "ipv4",
            FieldType::Ipv6 => "ipv6",
            FieldType::Ip => "ip",
            FieldType::Mac => "mac",
            FieldType::Duration => "duration",
            FieldType::Bytes => "bytes",
            FieldType::Prefix => "prefix",
        }
    }

    /// Short label shown next to form fields and in validation messages.
    pub fn label(self) -> &'static str {
        match self {
            FieldType::String => "Text",
            FieldType::Number => "Num",
            FieldType::Boolean => "Y/N",
            FieldType::Select => "Choice",
            FieldType::List => "List",
            FieldType::Ipv4 => "IPv4",
            FieldType::Ipv6 => "IPv6",
            FieldType::Ip => "IP",
            FieldType::Mac => "MAC",
            FieldType::Duration => "Time",
            FieldType::Bytes => "Bytes",
            FieldType::Prefix => "Prefix",
        }
    }

    /// Whether the type belongs to the address family (`ipv4`, `ipv6`, `ip`, `prefix`).
    pub fn is_ip_family(self) -> bool {
        matches!(
            self,
            FieldType::Ipv4 | FieldType::Ipv6 | FieldType::Ip | FieldType::Prefix
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick the designated primary type out of a candidate set.
///
/// Priority: `select` > `boolean` > `list` > `mac` > address family >
/// `duration` > `bytes` > `number` > `string`. An address family with a
/// single member keeps that member, mixed members collapse to `ip`.
pub fn primary_type(candidates: &[FieldType]) -> FieldType {
    let has = |ty: FieldType| candidates.contains(&ty);

    if has(FieldType::Select) {
        return FieldType::Select;
    }
    if has(FieldType::Boolean) {
        return FieldType::Boolean;
    }
    if has(FieldType::List) {
        return FieldType::List;
    }
    if has(FieldType::Mac) {
        return FieldType::Mac;
    }

    let family: Vec<FieldType> = candidates
        .iter()
        .copied()
        .filter(|ty| ty.is_ip_family())
        .collect();
    match family.as_slice() {
        [] => {}
        [single] => return *single,
        _ => return FieldType::Ip,
    }

    if has(FieldType::Duration) {
        FieldType::Duration
    } else if has(FieldType::Bytes) {
        FieldType::Bytes
    } else if has(FieldType::Number) {
        FieldType::Number
    } else {
        FieldType::String
    }
}

/// Disclosure tier of a section or option.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum CategoryTier {
    /// Shown by default.
    Basic,
    /// Shown behind an "advanced" toggle.
    Advanced,
    /// Shown behind an "expert" toggle.
    #[default]
    Expert,
}

impl CategoryTier {
    /// Parse an `x-category` attribute value, case-insensitively.
    pub fn from_attr(attr: &str) -> Option<Self> {
        match attr.trim().to_ascii_lowercase().as_str() {
            "basic" => Some(CategoryTier::Basic),
            "advanced" => Some(CategoryTier::Advanced),
            "expert" => Some(CategoryTier::Expert),
            _ => None,
        }
    }

    /// Lowercase tier name.
    pub fn as_str(self) -> &'static str {
        match self {
            CategoryTier::Basic => "basic",
            CategoryTier::Advanced => "advanced",
            CategoryTier::Expert => "expert",
        }
    }
}

impl fmt::Display for CategoryTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation constraints merged from every schema node a field touches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationConstraints {
    /// Smallest accepted numeric value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    /// Largest accepted numeric value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    /// Minimum length in characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    /// Maximum length in characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    /// Regular expression the value must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Example values for placeholders.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<Value>,
}

impl ValidationConstraints {
    /// Read the constraint keywords carried directly by one schema node.
    pub fn from_node(node: &Map<String, Value>) -> Self {
        Self {
            minimum: node.get("minimum").and_then(Value::as_f64),
            maximum: node.get("maximum").and_then(Value::as_f64),
            min_length: node.get("minLength").and_then(Value::as_u64),
            max_length: node.get("maxLength").and_then(Value::as_u64),
            pattern: node
                .get("pattern")
                .and_then(Value::as_str)
                .map(str::to_string),
            examples: node
                .get("examples")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
        }
    }

    /// Whether no constraint is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Fold another node's constraints into this one.
    ///
    /// The largest minimum and the smallest maximum survive. Lengths,
    /// pattern and examples keep the first value seen.
    pub fn merge(&mut self, other: &ValidationConstraints) {
        self.minimum = match (self.minimum, other.minimum) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        self.maximum = match (self.maximum, other.maximum) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        if self.min_length.is_none() {
            self.min_length = other.min_length;
        }
        if self.max_length.is_none() {
            self.max_length = other.max_length;
        }
        if self.pattern.is_none() {
            self.pattern.clone_from(&other.pattern);
        }
        if self.examples.is_empty() {
            self.examples.clone_from(&other.examples);
        }
    }
}

/// One `Key=Value` line definition inside a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionDef {
    /// INI key, unique within the section.
    pub key: String,
    /// Display label.
    pub label: String,
    /// Help text from the schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Designated primary type.
    #[serde(rename = "type")]
    pub primary_type: FieldType,
    /// Every type the value may take.
    #[serde(rename = "types")]
    pub candidate_types: Vec<FieldType>,
    /// Primary type of list elements, for list fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_type: Option<FieldType>,
    /// Candidate types of list elements.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub element_types: Vec<FieldType>,
    /// Disclosure tier, inherited from the section unless overridden.
    #[serde(rename = "category")]
    pub tier: CategoryTier,
    /// Listed in the section's `required` array.
    #[serde(default)]
    pub required: bool,
    /// Schema default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Merged validation constraints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationConstraints>,
    /// Allowed literal values for `select` fields.
    #[serde(rename = "options", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    /// systemd version that introduced the option.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<u32>,
}

impl OptionDef {
    /// Whether values are written as repeated keys.
    pub fn is_list(&self) -> bool {
        self.primary_type == FieldType::List
    }

    /// Whether string values should be converted to numbers before persisting.
    pub fn is_numeric(&self) -> bool {
        self.primary_type == FieldType::Number || self.candidate_types.contains(&FieldType::Number)
    }

    /// Types a single scalar value (or list element) is checked against.
    pub fn value_types(&self) -> Vec<FieldType> {
        if self.is_list() && !self.element_types.is_empty() {
            return self.element_types.clone();
        }
        self.candidate_types
            .iter()
            .copied()
            .filter(|ty| *ty != FieldType::List)
            .collect()
    }
}

/// One INI `[Name]` block definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    /// Section name as written between brackets.
    pub name: String,
    /// Display label.
    pub label: String,
    /// Help text from the schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Link to the upstream documentation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_url: Option<String>,
    /// The section may appear zero or more times.
    pub multiple: bool,
    /// Disclosure tier.
    #[serde(rename = "category")]
    pub tier: CategoryTier,
    /// systemd version that introduced the section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<u32>,
    /// Options in declaration order.
    pub options: Vec<OptionDef>,
}

impl Section {
    /// Look up an option by key.
    pub fn option(&self, key: &str) -> Option<&OptionDef> {
        self.options.iter().find(|opt| opt.key == key)
    }

    /// Options of the given tier, in declaration order.
    pub fn options_in(&self, tier: CategoryTier) -> impl Iterator<Item = &OptionDef> {
        self.options.iter().filter(move |opt| opt.tier == tier)
    }
}

/// Ordered map of section name to section definition.
///
/// Iteration order is declaration order in the schema document, which is
/// also the order sections are written in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaMap {
    sections: Vec<Section>,
}

impl SchemaMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a section, replacing an existing one of the same name in place.
    pub fn insert(&mut self, section: Section) {
        match self.sections.iter_mut().find(|s| s.name == section.name) {
            Some(slot) => *slot = section,
            None => self.sections.push(section),
        }
    }

    /// Look up a section by name.
    pub fn get(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Whether a section of that name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Sections in declaration order.
    pub fn iter(&self) -> std::slice::Iter<'_, Section> {
        self.sections.iter()
    }

    /// Section names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.name.as_str())
    }

    /// Number of sections.
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Whether the map holds no section.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

impl<'a> IntoIterator for &'a SchemaMap {
    type Item = &'a Section;
    type IntoIter = std::slice::Iter<'a, Section>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<Section> for SchemaMap {
    fn from_iter<T: IntoIterator<Item = Section>>(iter: T) -> Self {
        let mut map = SchemaMap::new();
        for section in iter {
            map.insert(section);
        }
        map
    }
}

impl Serialize for SchemaMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.sections.iter().map(|s| (&s.name, s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_prefers_select_over_boolean() {
        let ty = primary_type(&[FieldType::Boolean, FieldType::Select]);
        assert_eq!(ty, FieldType::Select);
    }

    #[test]
    fn primary_follows_priority_order() {
        assert_eq!(
            primary_type(&[FieldType::String, FieldType::Number]),
            FieldType::Number
        );
        assert_eq!(
            primary_type(&[FieldType::Number, FieldType::Bytes]),
            FieldType::Bytes
        );
        assert_eq!(
            primary_type(&[FieldType::Duration, FieldType::Number]),
            FieldType::Duration
        );
        assert_eq!(
            primary_type(&[FieldType::Ip, FieldType::List]),
            FieldType::List
        );
        assert_eq!(
            primary_type(&[FieldType::Ipv4, FieldType::Mac]),
            FieldType::Mac
        );
        assert_eq!(primary_type(&[]), FieldType::String);
    }

    #[test]
    fn primary_address_family() {
        assert_eq!(primary_type(&[FieldType::Ipv4]), FieldType::Ipv4);
        assert_eq!(primary_type(&[FieldType::Prefix]), FieldType::Prefix);
        assert_eq!(
            primary_type(&[FieldType::Ipv4, FieldType::Ipv6]),
            FieldType::Ip
        );
        assert_eq!(
            primary_type(&[FieldType::Ip, FieldType::Prefix]),
            FieldType::Ip
        );
    }

    #[test]
    fn merge_keeps_tightest_bounds() {
        let mut c = ValidationConstraints {
            minimum: Some(0.0),
            maximum: Some(100.0),
            ..Default::default()
        };
        c.merge(&ValidationConstraints {
            minimum: Some(10.0),
            maximum: Some(50.0),
            ..Default::default()
        });
        assert_eq!(c.minimum, Some(10.0));
        assert_eq!(c.maximum, Some(50.0));
    }

    #[test]
    fn merge_first_writer_wins_for_pattern() {
        let mut c = ValidationConstraints {
            pattern: Some("^a$".into()),
            ..Default::default()
        };
        c.merge(&ValidationConstraints {
            pattern: Some("^b$".into()),
            min_length: Some(2),
            ..Default::default()
        });
        assert_eq!(c.pattern.as_deref(), Some("^a$"));
        assert_eq!(c.min_length, Some(2));
    }

    #[test]
    fn tier_ordering_and_parse() {
        assert!(CategoryTier::Basic < CategoryTier::Advanced);
        assert!(CategoryTier::Advanced < CategoryTier::Expert);
        assert_eq!(CategoryTier::from_attr("Advanced"), Some(CategoryTier::Advanced));
        assert_eq!(CategoryTier::from_attr("hidden"), None);
    }

    #[test]
    fn schema_map_insert_replaces_in_place() {
        let section = |name: &str, multiple| Section {
            name: name.into(),
            label: name.into(),
            description: None,
            doc_url: None,
            multiple,
            tier: CategoryTier::Basic,
            since: None,
            options: Vec::new(),
        };
        let mut map: SchemaMap = [section("Match", false), section("Network", false)]
            .into_iter()
            .collect();
        map.insert(section("Match", true));
        assert_eq!(map.names().collect::<Vec<_>>(), ["Match", "Network"]);
        assert!(map.get("Match").unwrap().multiple);
    }
}
