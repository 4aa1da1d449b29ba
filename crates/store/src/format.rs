//! Skill file document format.
//!
//! Current format, one object per skill:
//!
//! ```yaml
//! Swords:
//!   cap: 300
//!   bonusCap: 150
//!   relative: true
//!   useCustomGrowthCurve: false
//!   growthExponent: 1.5
//!   growthMultiplier: 0.5
//!   growthConstant: 0.5
//! ```
//!
//! Legacy format, a bare cap per skill:
//!
//! ```yaml
//! Swords: 300
//! ```

use crate::error::{Error, Result};
use serde_yml::{Mapping, Value};
use skillcap_core::{CONFIG_SCHEMA_VERSION, ConfigurationMap, SkillConfigEntry};
use tracing::warn;

/// Which layout a document was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Current,
    Legacy,
}

impl DocumentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Current => "current",
            DocumentFormat::Legacy => "legacy",
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A parsed document and the layout it used.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    pub entries: ConfigurationMap,
    pub format: DocumentFormat,
}

/// Parse skill file text, trying the current layout before the legacy one.
pub fn parse_document(text: &str) -> Result<ParsedDocument> {
    if text.trim().is_empty() {
        return Ok(ParsedDocument { entries: ConfigurationMap::new(), format: DocumentFormat::Current });
    }

    let mapping = match serde_yml::from_str::<Value>(text)? {
        Value::Null => Mapping::new(),
        Value::Mapping(mapping) => mapping,
        other => return Err(Error::format(format!("expected a mapping, found {}", kind(&other)))),
    };

    let fields = keyed_fields(&mapping);
    let current_err = match parse_current(&fields) {
        Ok(entries) => return Ok(ParsedDocument { entries, format: DocumentFormat::Current }),
        Err(e) => e,
    };

    match parse_legacy(&fields) {
        Ok(entries) => Ok(ParsedDocument { entries, format: DocumentFormat::Legacy }),
        Err(legacy_err) => Err(Error::format(format!(
            "not current format ({current_err}) nor legacy format ({legacy_err})"
        ))),
    }
}

/// Pair each value with its key text, dropping entries whose key has no text form.
fn keyed_fields(mapping: &Mapping) -> Vec<(String, &Value)> {
    mapping
        .iter()
        .filter_map(|(key, value)| match key_string(key) {
            Some(key) => Some((key, value)),
            None => {
                warn!("skipping skill entry with {} key", kind(key));
                None
            }
        })
        .collect()
}

fn parse_current(fields: &[(String, &Value)]) -> Result<ConfigurationMap> {
    fields
        .iter()
        .map(|(key, value)| {
            let key = key.clone();
            let entry = match value {
                Value::Null => SkillConfigEntry::default(),
                other => serde_yml::from_value::<SkillConfigEntry>(Value::clone(other))
                    .map_err(|e| Error::format(format!("entry '{key}': {e}")))?,
            };
            Ok((key, entry))
        })
        .collect()
}

fn parse_legacy(fields: &[(String, &Value)]) -> Result<ConfigurationMap> {
    fields
        .iter()
        .map(|(key, value)| {
            let key = key.clone();
            let cap = value
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .ok_or_else(|| Error::format(format!("entry '{key}' is not a 32-bit integer")))?;
            Ok((key, SkillConfigEntry::with_cap(cap)))
        })
        .collect()
}

/// Keys written as bare numbers (`1500:`) or booleans (`true:`) are accepted as their text.
fn key_string(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

/// Render entries in the current layout, keys in ordinal order.
pub fn render_document(entries: &ConfigurationMap) -> Result<String> {
    let body = if entries.is_empty() { "{}\n".to_string() } else { serde_yml::to_string(entries)? };
    Ok(format!(
        "# skillcap skill limits (schema {CONFIG_SCHEMA_VERSION}); keys are skill names or extension skill ids\n{body}"
    ))
}
