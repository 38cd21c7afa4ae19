use std::collections::BTreeMap;

use anyhow::{Context, Result};

/// Extra request headers kept in a JSON file.
///
/// Stored as a plain JSON object on disk:
/// ```json
/// {
///   "X-Api-Key": "abc123",
///   "Accept-Language": "pt-BR"
/// }
/// ```
pub struct HeaderFile {
    entries: BTreeMap<String, String>,
}

impl HeaderFile {
    /// Loads the headers from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read header file '{path}'"))?;
        let entries: BTreeMap<String, String> = serde_json::from_str(&content)
            .with_context(|| format!("header file '{path}' is not a JSON object of strings"))?;
        Ok(Self { entries })
    }

    /// Iterates over all `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
