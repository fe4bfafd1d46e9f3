//! Per-module import table.

use rustc_hash::FxHashMap as HashMap;

/// One imported local binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEntry {
    /// Local binding name.
    pub local: String,
    /// `import * as local`.
    pub is_namespace: bool,
    /// Name in the source module: `"default"`, a named export, or `"*"`.
    pub imported: String,
    /// Module specifier as written.
    pub specifier: String,
}

/// Imports of one module, keyed by local name.
#[derive(Debug, Clone, Default)]
pub struct ImportTable {
    entries: Vec<ImportEntry>,
    by_local: HashMap<String, usize>,
    /// Specifiers in first-seen order, including side-effect imports.
    specifiers: Vec<String>,
    /// `require("x")` specifiers, noted but never linked.
    require_calls: Vec<String>,
}

impl ImportTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an imported binding.
    pub fn add(&mut self, entry: ImportEntry) {
        self.add_specifier(&entry.specifier);
        self.by_local.insert(entry.local.clone(), self.entries.len());
        self.entries.push(entry);
    }

    /// Record a module specifier (side-effect imports have no entries).
    pub fn add_specifier(&mut self, specifier: &str) {
        if !self.specifiers.iter().any(|s| s == specifier) {
            self.specifiers.push(specifier.to_string());
        }
    }

    pub fn add_require(&mut self, specifier: &str) {
        self.require_calls.push(specifier.to_string());
    }

    #[must_use]
    pub fn get(&self, local: &str) -> Option<&ImportEntry> {
        self.by_local.get(local).map(|&i| &self.entries[i])
    }

    /// Keep the local-name index in step with a batch of binding renames.
    /// All pairs apply at once, so swaps are fine.
    pub fn rename_locals(&mut self, changes: &[(String, String)]) {
        let moved: Vec<(usize, &str)> = changes
            .iter()
            .filter_map(|(old, new)| self.by_local.remove(old.as_str()).map(|i| (i, new.as_str())))
            .collect();
        for (index, new) in moved {
            self.entries[index].local = new.to_string();
            self.by_local.insert(new.to_string(), index);
        }
    }

    /// Point the entry of `from` at `into` after the two bindings were
    /// merged. An existing entry for `into` keeps the index.
    pub fn merge_local(&mut self, from: &str, into: &str) {
        let Some(index) = self.by_local.remove(from) else {
            return;
        };
        self.entries[index].local = into.to_string();
        self.by_local.entry(into.to_string()).or_insert(index);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImportEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn specifiers(&self) -> &[String] {
        &self.specifiers
    }

    #[must_use]
    pub fn require_calls(&self) -> &[String] {
        &self.require_calls
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(local: &str, imported: &str, specifier: &str) -> ImportEntry {
        ImportEntry {
            local: local.to_string(),
            is_namespace: imported == "*",
            imported: imported.to_string(),
            specifier: specifier.to_string(),
        }
    }

    #[test]
    fn test_lookup_and_rename() {
        let mut table = ImportTable::new();
        table.add(entry("React", "default", "react"));
        table.add(entry("ns", "*", "./ns"));
        assert!(table.get("ns").unwrap().is_namespace);

        table.rename_locals(&[("React".to_string(), "Angular".to_string())]);
        assert!(table.get("React").is_none());
        assert_eq!(table.get("Angular").unwrap().imported, "default");
        assert_eq!(table.iter().count(), 2);
    }

    #[test]
    fn test_merge_local() {
        let mut table = ImportTable::new();
        table.add(entry("a", "x", "./x"));
        table.add(entry("b", "x", "./x"));
        table.add(entry("c", "y", "./y"));
        table.merge_local("b", "a");
        assert!(table.get("b").is_none());
        assert_eq!(table.get("a").unwrap().imported, "x");

        table.merge_local("c", "local");
        assert!(table.get("c").is_none());
        assert_eq!(table.get("local").unwrap().imported, "y");
        assert!(table.iter().all(|e| e.local != "b" && e.local != "c"));
    }

    #[test]
    fn test_specifiers_deduplicated() {
        let mut table = ImportTable::new();
        table.add(entry("a", "a", "./x"));
        table.add(entry("b", "b", "./x"));
        table.add_specifier("./side-effect");
        table.add_require("fs");
        assert_eq!(table.specifiers(), &["./x".to_string(), "./side-effect".to_string()]);
        assert_eq!(table.require_calls(), &["fs".to_string()]);
    }
}
