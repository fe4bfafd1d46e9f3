//! Per-module export table.
//!
//! Local exports are indexed both by export name (duplicate detection,
//! linking) and by local name (so renaming a binding can update every
//! alias that points at it). Re-exports are kept per source specifier and
//! resolved later, when the target module exists.

use rustc_hash::FxHashMap as HashMap;

/// One local export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportInfo {
    /// Public name.
    pub export_name: String,
    /// Local binding that holds the value.
    pub local_name: String,
    /// Created by `export default`.
    pub is_default_decl: bool,
}

/// Re-exports from one source module.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExternalExportInfo {
    pub specifier: String,
    /// `export * from "specifier"`.
    pub is_export_all: bool,
    /// `export { source_name as export_name } from "specifier"`.
    pub names: Vec<(String, String)>,
}

/// Export name declared twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateExport(pub String);

/// Exports of one module.
#[derive(Debug, Clone, Default)]
pub struct ExportTable {
    infos: Vec<ExportInfo>,
    by_export_name: HashMap<String, usize>,
    by_local_name: HashMap<String, Vec<usize>>,
    external: Vec<ExternalExportInfo>,
    /// Names exported through `export { .. } from`.
    reexported_names: HashMap<String, usize>,
}

impl ExportTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a local export.
    pub fn add(&mut self, info: ExportInfo) -> Result<(), DuplicateExport> {
        self.check_name(&info.export_name)?;
        let index = self.infos.len();
        self.by_export_name.insert(info.export_name.clone(), index);
        self.by_local_name.entry(info.local_name.clone()).or_default().push(index);
        self.infos.push(info);
        Ok(())
    }

    /// Record `export { source_name as export_name } from "specifier"`.
    pub fn add_reexport(&mut self, specifier: &str, source_name: &str, export_name: &str) -> Result<(), DuplicateExport> {
        self.check_name(export_name)?;
        let index = self.external_index(specifier);
        self.external[index]
            .names
            .push((source_name.to_string(), export_name.to_string()));
        self.reexported_names.insert(export_name.to_string(), index);
        Ok(())
    }

    /// Record `export * from "specifier"`.
    pub fn add_export_all(&mut self, specifier: &str) {
        let index = self.external_index(specifier);
        self.external[index].is_export_all = true;
    }

    fn check_name(&self, name: &str) -> Result<(), DuplicateExport> {
        if self.by_export_name.contains_key(name) || self.reexported_names.contains_key(name) {
            return Err(DuplicateExport(name.to_string()));
        }
        Ok(())
    }

    fn external_index(&mut self, specifier: &str) -> usize {
        if let Some(index) = self.external.iter().position(|e| e.specifier == specifier) {
            return index;
        }
        self.external.push(ExternalExportInfo {
            specifier: specifier.to_string(),
            ..Default::default()
        });
        self.external.len() - 1
    }

    #[must_use]
    pub fn by_export_name(&self, name: &str) -> Option<&ExportInfo> {
        self.by_export_name.get(name).map(|&i| &self.infos[i])
    }

    /// Every export whose local binding is `local`.
    pub fn by_local_name<'a>(&'a self, local: &str) -> impl Iterator<Item = &'a ExportInfo> + 'a {
        self.by_local_name
            .get(local)
            .into_iter()
            .flatten()
            .map(|&i| &self.infos[i])
    }

    /// The re-export entry declaring `export_name`, with its source name.
    #[must_use]
    pub fn reexport(&self, export_name: &str) -> Option<(&str, &str)> {
        let index = *self.reexported_names.get(export_name)?;
        let external = &self.external[index];
        external
            .names
            .iter()
            .find(|(_, exported)| exported == export_name)
            .map(|(source, _)| (external.specifier.as_str(), source.as_str()))
    }

    /// Keep local aliases in step with a batch of binding renames. All pairs
    /// apply at once, so swaps are fine.
    pub fn rename_locals(&mut self, changes: &[(String, String)]) {
        let moved: Vec<(Vec<usize>, &str)> = changes
            .iter()
            .filter_map(|(old, new)| self.by_local_name.remove(old.as_str()).map(|v| (v, new.as_str())))
            .collect();
        for (indices, new) in moved {
            for &index in &indices {
                self.infos[index].local_name = new.to_string();
            }
            self.by_local_name.entry(new.to_string()).or_default().extend(indices);
        }
    }

    /// Local exports in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &ExportInfo> {
        self.infos.iter()
    }

    #[must_use]
    pub fn external(&self) -> &[ExternalExportInfo] {
        &self.external
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty() && self.external.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(export_name: &str, local_name: &str) -> ExportInfo {
        ExportInfo {
            export_name: export_name.to_string(),
            local_name: local_name.to_string(),
            is_default_decl: false,
        }
    }

    #[test]
    fn test_duplicate_export_name() {
        let mut table = ExportTable::new();
        table.add(info("foo", "name")).unwrap();
        assert_eq!(table.add(info("foo", "other")), Err(DuplicateExport("foo".to_string())));
        assert_eq!(
            table.add_reexport("./x", "a", "foo"),
            Err(DuplicateExport("foo".to_string()))
        );
    }

    #[test]
    fn test_rename_keeps_aliases() {
        let mut table = ExportTable::new();
        table.add(info("foo", "name")).unwrap();
        table.add(info("bar", "name")).unwrap();
        table.rename_locals(&[("name".to_string(), "renamed".to_string())]);
        assert_eq!(table.by_export_name("foo").unwrap().local_name, "renamed");
        assert_eq!(table.by_local_name("renamed").count(), 2);
        assert_eq!(table.by_local_name("name").count(), 0);
    }

    #[test]
    fn test_swap_rename() {
        let mut table = ExportTable::new();
        table.add(info("x", "a")).unwrap();
        table.add(info("y", "b")).unwrap();
        table.rename_locals(&[("a".to_string(), "b".to_string()), ("b".to_string(), "a".to_string())]);
        assert_eq!(table.by_export_name("x").unwrap().local_name, "b");
        assert_eq!(table.by_export_name("y").unwrap().local_name, "a");
    }

    #[test]
    fn test_reexports_grouped_by_specifier() {
        let mut table = ExportTable::new();
        table.add_reexport("./a", "one", "uno").unwrap();
        table.add_reexport("./a", "two", "two").unwrap();
        table.add_export_all("./b");
        assert_eq!(table.external().len(), 2);
        assert_eq!(table.reexport("uno"), Some(("./a", "one")));
        assert!(table.external()[1].is_export_all);
    }
}
