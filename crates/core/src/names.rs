//! Skill identifier to configuration key resolution.
//!
//! Built-in skills are addressed by their well-known names. Skills added by
//! third-party extensions arrive as opaque numeric identifiers above
//! [`RESERVED_ID_THRESHOLD`]; for those the resolver asks the host for a
//! display name and tries a fixed chain of spelling variants against the keys
//! an operator wrote in the file.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Identifiers at or below this value belong to the host's built-in set.
pub const RESERVED_ID_THRESHOLD: i64 = 999;

/// Prefixes commonly found on localisation tokens and type names.
pub const KNOWN_PREFIXES: &[&str] = &["$skilldesc_", "$skill_", "skilldesc_", "skill_"];

/// Suffixes commonly found on extension skill names.
pub const KNOWN_SUFFIXES: &[&str] = &["_Skill", "_skill", "Skill"];

static NON_ALPHANUMERIC: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9]").ok());

/// Host-supplied lookup from an extension skill identifier to its name.
pub trait NameLookup: Send + Sync {
    fn display_name(&self, id: i64) -> Option<String>;
}

/// Lookup for hosts that cannot name extension skills.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNames;

impl NameLookup for NoNames {
    fn display_name(&self, _id: i64) -> Option<String> {
        None
    }
}

/// Fixed identifier-to-name table.
#[derive(Debug, Clone, Default)]
pub struct NameTable(HashMap<i64, String>);

impl NameTable {
    pub fn insert(&mut self, id: i64, name: impl Into<String>) {
        self.0.insert(id, name.into());
    }
}

impl<S: Into<String>> FromIterator<(i64, S)> for NameTable {
    fn from_iter<I: IntoIterator<Item = (i64, S)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(id, name)| (id, name.into())).collect())
    }
}

impl NameLookup for NameTable {
    fn display_name(&self, id: i64) -> Option<String> {
        self.0.get(&id).cloned()
    }
}

impl<F> NameLookup for F
where
    F: Fn(i64) -> Option<String> + Send + Sync,
{
    fn display_name(&self, id: i64) -> Option<String> {
        self(id)
    }
}

/// Outcome of resolving one raw identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A key present in the map
    Found(String),
    /// Built-in identifier without an entry; caller uses defaults
    Builtin(String),
    /// Extension identifier no key matched; carries the numeric string
    Unresolved(String),
}

impl Resolution {
    pub fn key(&self) -> &str {
        match self {
            Resolution::Found(key) | Resolution::Builtin(key) | Resolution::Unresolved(key) => key,
        }
    }

    pub fn into_key(self) -> String {
        match self {
            Resolution::Found(key) | Resolution::Builtin(key) | Resolution::Unresolved(key) => key,
        }
    }
}

/// Parse an extension identifier. Built-in numbers and names return `None`.
pub fn extension_id(raw: &str) -> Option<i64> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > RESERVED_ID_THRESHOLD)
}

/// Spelling variants of a display name, in the order they are tried.
///
/// Duplicates are removed, keeping the first occurrence.
pub fn name_variants(name: &str) -> Vec<String> {
    let mut variants: Vec<String> = Vec::new();
    let mut push = |candidate: &str| {
        if !candidate.is_empty() && !variants.iter().any(|v| v == candidate) {
            variants.push(candidate.to_string());
        }
    };

    let name = name.trim();
    push(name);

    let undollared = name.trim_start_matches('$');
    push(undollared);

    let mut stripped = name.to_string();
    for prefix in KNOWN_PREFIXES {
        if let Some(rest) = name.strip_prefix(prefix) {
            push(rest);
            stripped = rest.to_string();
            break;
        }
    }

    for suffix in KNOWN_SUFFIXES {
        if let Some(rest) = stripped.strip_suffix(suffix) {
            push(rest);
            stripped = rest.to_string();
            break;
        }
    }

    let alphanumeric = match NON_ALPHANUMERIC.as_ref() {
        Some(re) => re.replace_all(&stripped, "").into_owned(),
        None => stripped.chars().filter(char::is_ascii_alphanumeric).collect(),
    };
    push(&alphanumeric);

    if alphanumeric.starts_with(|c: char| c.is_ascii_digit()) {
        push(&format!("_{alphanumeric}"));
    }

    variants
}

/// Resolve a raw identifier to a configuration key.
///
/// `contains` tests whether a key exists in the current map. The function is
/// pure; warning about [`Resolution::Unresolved`] is left to the caller.
pub fn resolve_key<F>(raw: &str, contains: F, names: &dyn NameLookup) -> Resolution
where
    F: Fn(&str) -> bool,
{
    if contains(raw) {
        return Resolution::Found(raw.to_string());
    }

    let Some(id) = extension_id(raw) else {
        return Resolution::Builtin(raw.to_string());
    };

    let numeric = id.to_string();
    if contains(&numeric) {
        return Resolution::Found(numeric);
    }

    if let Some(name) = names.display_name(id)
        && let Some(found) = name_variants(&name).into_iter().find(|v| contains(v))
    {
        return Resolution::Found(found);
    }

    Resolution::Unresolved(numeric)
}
