use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::data::{
    schema::{Result, SchemaError},
    types::{OptionDef, SchemaMap},
};

/// A value-record: option key to scalar or list of scalars.
pub type Fields = Map<String, Value>;

/// Concrete configuration values, keyed by section name.
///
/// A section maps either to one value-record or, for repeatable sections,
/// to a list of value-records in block order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigRecord(Map<String, Value>);

/// Borrowed view of one section's values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SectionValue<'a> {
    Single(&'a Fields),
    Repeated(&'a [Value]),
}

impl<'a> SectionValue<'a> {
    /// The value-records of this section, one per block.
    ///
    /// List elements that are not objects are skipped.
    pub fn instances(self) -> Vec<&'a Fields> {
        match self {
            SectionValue::Single(fields) => vec![fields],
            SectionValue::Repeated(items) => items.iter().filter_map(Value::as_object).collect(),
        }
    }
}

impl ConfigRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON object.
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(SchemaError::TypeMismatch {
                path: "$".into(),
                expected: "object".into(),
                actual: value_kind(&other).into(),
            }),
        }
    }

    /// Raw value stored for a section.
    pub fn get(&self, section: &str) -> Option<&Value> {
        self.0.get(section)
    }

    /// Store a raw section value, returning the previous one.
    pub fn insert(&mut self, section: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(section.into(), value)
    }

    pub fn remove(&mut self, section: &str) -> Option<Value> {
        self.0.remove(section)
    }

    /// Section names in insertion order.
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    /// Typed view of a section; `None` when absent.
    pub fn section(&self, name: &str) -> Result<Option<SectionValue<'_>>> {
        match self.0.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(fields)) => Ok(Some(SectionValue::Single(fields))),
            Some(Value::Array(items)) => {
                if let Some((idx, bad)) = items.iter().enumerate().find(|(_, v)| !v.is_object()) {
                    return Err(SchemaError::TypeMismatch {
                        path: format!("{name}[{idx}]"),
                        expected: "object".into(),
                        actual: value_kind(bad).into(),
                    });
                }
                Ok(Some(SectionValue::Repeated(items)))
            }
            Some(other) => Err(SchemaError::TypeMismatch {
                path: name.to_string(),
                expected: "object or list of objects".into(),
                actual: value_kind(other).into(),
            }),
        }
    }

    /// Set one option of a single-instance section, creating the section.
    pub fn set_field(&mut self, section: &str, key: &str, value: Value) -> Result<()> {
        let slot = self
            .0
            .entry(section.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if slot.is_null() {
            *slot = Value::Object(Map::new());
        }
        match slot {
            Value::Object(fields) => {
                fields.insert(key.to_string(), value);
                Ok(())
            }
            other => Err(SchemaError::TypeMismatch {
                path: section.to_string(),
                expected: "object".into(),
                actual: value_kind(other).into(),
            }),
        }
    }

    /// Set one option of the `index`-th block of a repeatable section.
    pub fn set_instance_field(
        &mut self,
        section: &str,
        index: usize,
        key: &str,
        value: Value,
    ) -> Result<()> {
        let path = format!("{section}[{index}]");
        let fields = self
            .0
            .get_mut(section)
            .and_then(Value::as_array_mut)
            .and_then(|items| items.get_mut(index))
            .and_then(Value::as_object_mut)
            .ok_or_else(|| SchemaError::TypeMismatch {
                path,
                expected: "object".into(),
                actual: "nothing".into(),
            })?;
        fields.insert(key.to_string(), value);
        Ok(())
    }

    /// Append a block to a repeatable section, returning its index.
    ///
    /// A section currently holding a single record is turned into a list.
    pub fn push_instance(&mut self, section: &str, fields: Fields) -> Result<usize> {
        let slot = self
            .0
            .entry(section.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        match slot {
            Value::Null => {
                *slot = Value::Array(vec![Value::Object(fields)]);
                Ok(0)
            }
            Value::Object(_) => {
                let first = std::mem::take(slot);
                *slot = Value::Array(vec![first, Value::Object(fields)]);
                Ok(1)
            }
            Value::Array(items) => {
                items.push(Value::Object(fields));
                Ok(items.len() - 1)
            }
            other => Err(SchemaError::TypeMismatch {
                path: section.to_string(),
                expected: "list of objects".into(),
                actual: value_kind(other).into(),
            }),
        }
    }

    /// Remove a block from a repeatable section.
    pub fn remove_instance(&mut self, section: &str, index: usize) -> Option<Fields> {
        let items = self.0.get_mut(section)?.as_array_mut()?;
        if index >= items.len() {
            return None;
        }
        match items.remove(index) {
            Value::Object(fields) => Some(fields),
            _ => None,
        }
    }
}

impl FromStr for ConfigRecord {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_json(serde_json::from_str(s)?)
    }
}

impl From<Map<String, Value>> for ConfigRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<ConfigRecord> for Value {
    fn from(record: ConfigRecord) -> Self {
        Value::Object(record.0)
    }
}

/// JSON kind name for error messages.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

/// Whether a value counts as unset.
///
/// Null, a blank string and a list without any non-empty element are empty.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.iter().all(is_empty_value),
        _ => false,
    }
}

/// INI text of a scalar value.
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Parse a decimal number the way form input is read.
///
/// Surrounding whitespace is ignored. Integral values become integers,
/// hex/inf/nan and any other text yield `None`.
pub fn parse_number(text: &str) -> Option<Number> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(n) = text.parse::<i64>() {
        return Some(n.into());
    }
    if let Ok(n) = text.parse::<u64>() {
        return Some(n.into());
    }
    if !text
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
    {
        return None;
    }
    let f = text.parse::<f64>().ok().filter(|f| f.is_finite())?;
    if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        return Some((f as i64).into());
    }
    Number::from_f64(f)
}

/// Convert string values of numeric options into numbers.
///
/// Returns a new record; the input is not touched. Unconvertible strings
/// and sections unknown to the model pass through unchanged.
pub fn coerce(record: &ConfigRecord, schema: &SchemaMap) -> ConfigRecord {
    let mut out = record.clone();
    for section in schema {
        let numeric: Vec<&OptionDef> = section.options.iter().filter(|o| o.is_numeric()).collect();
        if numeric.is_empty() {
            continue;
        }
        match out.0.get_mut(&section.name) {
            Some(Value::Object(fields)) => coerce_fields(fields, &numeric),
            Some(Value::Array(items)) => {
                for fields in items.iter_mut().filter_map(Value::as_object_mut) {
                    coerce_fields(fields, &numeric);
                }
            }
            _ => {}
        }
    }
    out
}

fn coerce_fields(fields: &mut Fields, numeric: &[&OptionDef]) {
    for option in numeric {
        let Some(value) = fields.get_mut(&option.key) else {
            continue;
        };
        if let Value::String(text) = value {
            if let Some(n) = parse_number(text) {
                *value = Value::Number(n);
            }
        }
    }
}
