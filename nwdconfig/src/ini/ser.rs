use serde_json::Value;

use crate::data::{
    record::{ConfigRecord, Fields, is_empty_value, scalar_text},
    types::{SchemaMap, Section},
};

/// Render a record as INI text.
///
/// Sections are written in model order, options in section order, whatever
/// order the record holds them in. Sections and options without a value
/// are left out, repeatable sections get one block per instance, and list
/// values one line per element. Never fails: shapes the codec cannot
/// represent are skipped.
pub fn serialize(record: &ConfigRecord, schema: &SchemaMap) -> String {
    let mut writer = IniWriter::default();
    for section in schema {
        let Some(value) = record.get(&section.name) else {
            continue;
        };
        match value {
            Value::Object(fields) => writer.block(section, fields),
            Value::Array(items) => {
                for item in items {
                    match item.as_object() {
                        Some(fields) => writer.block(section, fields),
                        None => debug!("[{}]: skipping non-object instance", section.name),
                    }
                }
            }
            Value::Null => {}
            other => debug!("[{}]: cannot write {other} as a section", section.name),
        }
    }
    writer.finish()
}

#[derive(Default)]
struct IniWriter {
    out: String,
}

impl IniWriter {
    fn block(&mut self, section: &Section, fields: &Fields) {
        let has_data = section
            .options
            .iter()
            .any(|opt| fields.get(&opt.key).is_some_and(|v| !is_empty_value(v)));
        if !has_data {
            return;
        }

        if !self.out.is_empty() {
            self.out.push('\n');
        }
        self.out.push('[');
        self.out.push_str(&section.name);
        self.out.push_str("]\n");

        for option in &section.options {
            match fields.get(&option.key) {
                Some(Value::Array(items)) => {
                    for item in items.iter().filter(|v| !is_empty_value(v)) {
                        self.line(&option.key, item);
                    }
                }
                Some(value) if !is_empty_value(value) => self.line(&option.key, value),
                _ => {}
            }
        }
    }

    /// One `Key=Value` line; line breaks inside the value become spaces.
    fn line(&mut self, key: &str, value: &Value) {
        let text = scalar_text(value);
        let text = if text.contains(['\r', '\n']) {
            debug!("{key}: flattening line breaks in value");
            text.replace(['\r', '\n'], " ")
        } else {
            text
        };
        self.out.push_str(key);
        self.out.push('=');
        self.out.push_str(text.trim());
        self.out.push('\n');
    }

    fn finish(self) -> String {
        self.out.trim_end().to_string()
    }
}
