use serde_json::{Map, Value};

use crate::data::{
    record::{ConfigRecord, Fields, parse_number},
    schema::{Result, SchemaError},
    types::{FieldType, OptionDef, SchemaMap},
};

/// Load INI text into a record.
///
/// Repeatable sections become a list with one record per block, other
/// sections merge repeated blocks into one record. List options collect one
/// element per line and `Key=` with no value clears them; scalar options
/// keep the last assignment unless they also accept a list, in which case
/// repeated lines collect into one. Numeric options get the same conversion as
/// [`coerce`](crate::data::record::coerce). Keys and sections the model does
/// not know are kept as text.
pub fn parse(text: &str, schema: &SchemaMap) -> Result<ConfigRecord> {
    let mut record = ConfigRecord::new();
    let mut current: Option<(String, Fields)> = None;

    for (line_no, line) in logical_lines(text) {
        if let Some(rest) = line.strip_prefix('[') {
            let name = rest
                .strip_suffix(']')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .ok_or_else(|| SchemaError::ini(line_no, format!("malformed section header {line:?}")))?;
            if let Some((name, fields)) = current.take() {
                commit(&mut record, schema, name, fields);
            }
            current = Some((name.to_string(), open_block(&record, schema, name)));
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(SchemaError::ini(line_no, format!("expected Key=Value, found {line:?}")));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(SchemaError::ini(line_no, "assignment without a key"));
        }
        let Some((section, fields)) = current.as_mut() else {
            return Err(SchemaError::ini(line_no, format!("{key}= outside of any section")));
        };
        let option = schema.get(section).and_then(|s| s.option(key));
        assign(fields, key, value.trim(), option);
    }

    if let Some((name, fields)) = current.take() {
        commit(&mut record, schema, name, fields);
    }
    Ok(record)
}

/// Non-blank, non-comment lines with continuation lines joined, numbered
/// from the line they start on.
fn logical_lines(text: &str) -> Vec<(usize, String)> {
    let mut out = Vec::new();
    let mut pending: Option<(usize, String)> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if pending.is_none() && (line.is_empty() || line.starts_with('#') || line.starts_with(';')) {
            continue;
        }
        let (continued, body) = match line.strip_suffix('\\') {
            Some(body) => (true, body.trim_end()),
            None => (false, line),
        };
        let entry = pending.get_or_insert_with(|| (idx + 1, String::new()));
        if !entry.1.is_empty() && !body.is_empty() {
            entry.1.push(' ');
        }
        entry.1.push_str(body);
        if !continued {
            out.extend(pending.take());
        }
    }
    out.extend(pending);
    out
}

/// Start the fields of a new block; single sections continue what an
/// earlier block of the same name collected.
fn open_block(record: &ConfigRecord, schema: &SchemaMap, name: &str) -> Fields {
    if is_multiple(schema, name) {
        return Map::new();
    }
    match record.get(name) {
        Some(Value::Object(fields)) => fields.clone(),
        _ => Map::new(),
    }
}

fn commit(record: &mut ConfigRecord, schema: &SchemaMap, name: String, fields: Fields) {
    if !is_multiple(schema, &name) {
        record.insert(name, Value::Object(fields));
        return;
    }
    match record.get(&name) {
        Some(Value::Array(_)) => {}
        _ => {
            record.insert(name.clone(), Value::Array(Vec::new()));
        }
    }
    if let Err(err) = record.push_instance(&name, fields) {
        debug!("[{name}]: {err}");
    }
}

fn is_multiple(schema: &SchemaMap, name: &str) -> bool {
    schema.get(name).is_some_and(|s| s.multiple)
}

fn assign(fields: &mut Fields, key: &str, value: &str, option: Option<&OptionDef>) {
    match option {
        Some(option) if option.is_list() => {
            if value.is_empty() {
                fields.insert(key.to_string(), Value::Array(Vec::new()));
                return;
            }
            let slot = fields
                .entry(key.to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            match slot {
                Value::Array(items) => items.push(Value::String(value.to_string())),
                other => *other = Value::Array(vec![Value::String(value.to_string())]),
            }
        }
        Some(option) => {
            if value.is_empty() {
                fields.remove(key);
                return;
            }
            let parsed = option
                .is_numeric()
                .then(|| parse_number(value))
                .flatten()
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(value.to_string()));
            // a repeated key of an option that also takes a list keeps every line
            let accepts_list = option.candidate_types.contains(&FieldType::List);
            match fields.get_mut(key) {
                Some(Value::Array(items)) if accepts_list => items.push(parsed),
                Some(previous) if accepts_list => {
                    let first = std::mem::take(previous);
                    *previous = Value::Array(vec![first, parsed]);
                }
                _ => {
                    fields.insert(key.to_string(), parsed);
                }
            }
        }
        None => {
            let text = Value::String(value.to_string());
            match fields.get_mut(key) {
                Some(Value::Array(items)) => items.push(text),
                Some(previous) => {
                    let first = std::mem::take(previous);
                    *previous = Value::Array(vec![first, text]);
                }
                None => {
                    fields.insert(key.to_string(), text);
                }
            }
        }
    }
}
