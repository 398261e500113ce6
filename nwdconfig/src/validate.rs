//! Field validation for editing surfaces.
//!
//! Coercion and serialization never reject a record; this module is where
//! values are checked against their option definitions. Everything here
//! reports, nothing fails.

use std::{
    collections::HashMap,
    fmt,
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
};

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::data::{
    record::{ConfigRecord, Fields, SectionValue, is_empty_value, parse_number, scalar_text},
    types::{FieldType, OptionDef, SchemaMap, Section},
};

const BOOLEAN_WORDS: &[&str] = &["yes", "no", "true", "false", "1", "0", "on", "off"];

/// One problem found in a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub section: String,
    /// Block index for repeatable sections.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    pub key: String,
    pub value: String,
    pub message: String,
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.section)?;
        if let Some(index) = self.index {
            write!(f, "#{index}")?;
        }
        if self.key.is_empty() {
            write!(f, ": {}", self.message)
        } else if self.value.is_empty() {
            write!(f, " {}: {}", self.key, self.message)
        } else {
            write!(f, " {}={}: {}", self.key, self.value, self.message)
        }
    }
}

/// Check one scalar against an option definition.
///
/// The value is accepted when any of the option's value types accepts it,
/// then checked against enum values and merged constraints. Blank values
/// are always accepted.
pub fn validate_value(option: &OptionDef, value: &str) -> Result<(), String> {
    check_value(option, value, &mut PatternCache::default())
}

/// Compiled `pattern` constraints, one entry per distinct pattern.
///
/// Invalid patterns are stored as `None` and reported once.
#[derive(Default)]
struct PatternCache {
    compiled: HashMap<String, Option<Regex>>,
}

impl PatternCache {
    /// Whether `value` matches, `None` when the pattern does not compile.
    fn is_match(&mut self, option: &OptionDef, pattern: &str, value: &str) -> Option<bool> {
        if !self.compiled.contains_key(pattern) {
            let re = match Regex::new(pattern) {
                Ok(re) => Some(re),
                Err(err) => {
                    warn!("option {}: ignoring invalid pattern: {err}", option.key);
                    None
                }
            };
            self.compiled.insert(pattern.to_string(), re);
        }
        self.compiled
            .get(pattern)
            .and_then(Option::as_ref)
            .map(|re| re.is_match(value))
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.compiled.len()
    }
}

fn check_value(option: &OptionDef, value: &str, patterns: &mut PatternCache) -> Result<(), String> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(());
    }

    let types = option.value_types();
    if !types.is_empty() && !types.iter().any(|ty| accepts(*ty, option, value)) {
        if types == [FieldType::Select] {
            let choices = option.enum_values.as_deref().unwrap_or_default().join(", ");
            return Err(format!("expected one of: {choices}"));
        }
        let labels: Vec<&str> = types.iter().map(|ty| ty.label()).collect();
        return Err(format!("expected {}", labels.join(" or ")));
    }

    let Some(constraints) = &option.validation else {
        return Ok(());
    };
    if option.is_numeric() {
        if let Some(n) = parse_number(value).and_then(|n| n.as_f64()) {
            if let Some(min) = constraints.minimum.filter(|min| n < *min) {
                return Err(format!("must be at least {min}"));
            }
            if let Some(max) = constraints.maximum.filter(|max| n > *max) {
                return Err(format!("must be at most {max}"));
            }
        }
    }
    let len = value.chars().count() as u64;
    if let Some(min) = constraints.min_length.filter(|min| len < *min) {
        return Err(format!("must be at least {min} characters"));
    }
    if let Some(max) = constraints.max_length.filter(|max| len > *max) {
        return Err(format!("must be at most {max} characters"));
    }
    if let Some(pattern) = &constraints.pattern {
        if patterns.is_match(option, pattern, value) == Some(false) {
            return Err(format!("must match {pattern}"));
        }
    }
    Ok(())
}

/// Validate every option of every section instance in a record.
pub fn validate_record(record: &ConfigRecord, schema: &SchemaMap) -> Vec<FieldIssue> {
    let mut issues = Vec::new();
    let mut patterns = PatternCache::default();
    for section in schema {
        match record.section(&section.name) {
            Ok(None) => {}
            Ok(Some(SectionValue::Single(fields))) => {
                check_fields(section, None, fields, &mut patterns, &mut issues);
            }
            Ok(Some(SectionValue::Repeated(items))) => {
                for (idx, fields) in items.iter().filter_map(Value::as_object).enumerate() {
                    check_fields(section, Some(idx), fields, &mut patterns, &mut issues);
                }
            }
            Err(err) => issues.push(FieldIssue {
                section: section.name.clone(),
                index: None,
                key: String::new(),
                value: String::new(),
                message: err.to_string(),
            }),
        }
    }
    issues
}

fn check_fields(
    section: &Section,
    index: Option<usize>,
    fields: &Fields,
    patterns: &mut PatternCache,
    issues: &mut Vec<FieldIssue>,
) {
    let issue = |option: &OptionDef, value: String, message: String| FieldIssue {
        section: section.name.clone(),
        index,
        key: option.key.clone(),
        value,
        message,
    };

    for option in &section.options {
        let value = fields.get(&option.key);
        if value.is_none_or(is_empty_value) {
            if option.required {
                issues.push(issue(option, String::new(), "required".into()));
            }
            continue;
        }
        let scalars: Vec<&Value> = match value {
            Some(Value::Array(items)) => items.iter().filter(|v| !is_empty_value(v)).collect(),
            Some(other) => vec![other],
            None => Vec::new(),
        };
        for scalar in scalars {
            let text = scalar_text(scalar);
            if let Err(message) = check_value(option, &text, patterns) {
                issues.push(issue(option, text, message));
            }
        }
    }
}

fn accepts(ty: FieldType, option: &OptionDef, value: &str) -> bool {
    match ty {
        FieldType::String | FieldType::List => true,
        FieldType::Duration => !value.is_empty(),
        FieldType::Select => option
            .enum_values
            .as_ref()
            .is_none_or(|values| values.iter().any(|v| v == value)),
        FieldType::Boolean => BOOLEAN_WORDS.contains(&value.to_ascii_lowercase().as_str()),
        FieldType::Number => parse_number(value).is_some(),
        FieldType::Bytes => parse_number(value).is_some() || is_byte_size(value),
        FieldType::Ipv4 => parse_address(value, false).is_some_and(|ip| ip.is_ipv4()),
        FieldType::Ipv6 => parse_address(value, false).is_some_and(|ip| ip.is_ipv6()),
        FieldType::Ip => parse_address(value, false).is_some(),
        FieldType::Prefix => parse_address(value, true).is_some(),
        FieldType::Mac => is_mac(value),
    }
}

fn is_byte_size(value: &str) -> bool {
    let digits = value.strip_suffix(['K', 'M', 'G', 'T']).unwrap_or(value);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

/// Parse `addr` or `addr/len`, with `len` mandatory when `prefix` is set.
fn parse_address(value: &str, prefix: bool) -> Option<IpAddr> {
    let (addr, len) = match value.split_once('/') {
        Some((addr, len)) => (addr, Some(len)),
        None if prefix => return None,
        None => (value, None),
    };
    let ip = match addr.parse::<Ipv4Addr>() {
        Ok(v4) => IpAddr::V4(v4),
        Err(_) => IpAddr::V6(addr.parse::<Ipv6Addr>().ok()?),
    };
    if let Some(len) = len {
        let len: u8 = len.parse().ok()?;
        let max = if ip.is_ipv4() { 32 } else { 128 };
        if len > max {
            return None;
        }
    }
    Some(ip)
}

fn is_mac(value: &str) -> bool {
    let octets: Vec<&str> = value.split([':', '-']).collect();
    octets.len() == 6
        && octets
            .iter()
            .all(|o| o.len() == 2 && o.chars().all(|c| c.is_ascii_hexdigit()))
}
