//! Namespaced issue IDs via longest-prefix match.
//!
//! A cross-repo ID is `<prefix><local>`. The resolver carries the set of
//! known prefixes plus the current repo's prefix, and renders IDs
//! context-appropriately: foreign IDs always show the full namespaced form,
//! local IDs drop the prefix.

/// Parses and renders namespaced issue IDs.
#[derive(Debug, Clone)]
pub struct IdResolver {
    /// Known prefixes, longest first so the longest match wins.
    prefixes: Vec<String>,
    current: String,
}

impl IdResolver {
    /// Builds a resolver from the known prefixes and the current repo's
    /// prefix. The current prefix is always considered known.
    pub fn new(mut prefixes: Vec<String>, current: impl Into<String>) -> IdResolver {
        let current = current.into();
        if !current.is_empty() && !prefixes.contains(&current) {
            prefixes.push(current.clone());
        }
        prefixes.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        prefixes.dedup();
        IdResolver { prefixes, current }
    }

    /// Splits an ID into `(namespace, local)`. Unknown prefixes yield an
    /// empty namespace with the input intact.
    pub fn parse<'a>(&self, id: &'a str) -> (&str, &'a str) {
        for prefix in &self.prefixes {
            if let Some(local) = id.strip_prefix(prefix.as_str()) {
                return (prefix, local);
            }
        }
        ("", id)
    }

    /// The fully namespaced form: IDs without a known prefix are treated as
    /// local to the current repo.
    pub fn qualify(&self, id: &str) -> String {
        let (namespace, _) = self.parse(id);
        if namespace.is_empty() {
            format!("{}{id}", self.current)
        } else {
            id.to_string()
        }
    }

    /// Context-appropriate rendering: local IDs bare, foreign IDs full.
    pub fn display(&self, id: &str) -> String {
        let (namespace, local) = self.parse(id);
        if namespace == self.current {
            local.to_string()
        } else {
            id.to_string()
        }
    }

    /// Whether the ID belongs to the current repo (including bare IDs).
    pub fn is_local(&self, id: &str) -> bool {
        let (namespace, _) = self.parse(id);
        namespace.is_empty() || namespace == self.current
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn current_prefix(&self) -> &str {
        &self.current
    }
}
