//! Device label aliasing.

use std::collections::HashMap;

/// Built-in aliases: raw `make_model` label to a short name
const DEFAULT_ALIASES: &[(&str, &str)] = &[("Canon_Canon EOS 5D Mark IV", "5D4")];

/// Maps raw device labels to preferred short labels.
///
/// Labels without an entry pass through unchanged. The pipeline applies
/// this exactly once, after extraction and before path construction.
#[derive(Debug, Clone)]
pub struct DeviceAliases {
    aliases: HashMap<String, String>,
}

impl DeviceAliases {
    /// The built-in table
    pub fn new() -> Self {
        Self {
            aliases: DEFAULT_ALIASES
                .iter()
                .map(|(raw, short)| (raw.to_string(), short.to_string()))
                .collect(),
        }
    }

    /// An empty table
    pub fn empty() -> Self {
        Self {
            aliases: HashMap::new(),
        }
    }

    /// Add or replace an alias
    pub fn with_alias(mut self, raw: impl Into<String>, short: impl Into<String>) -> Self {
        self.aliases.insert(raw.into(), short.into());
        self
    }

    pub fn resolve<'a>(&'a self, raw: &'a str) -> &'a str {
        self.aliases.get(raw).map(String::as_str).unwrap_or(raw)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

impl Default for DeviceAliases {
    fn default() -> Self {
        Self::new()
    }
}
