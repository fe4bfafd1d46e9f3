//! Module content providers.
//!
//! The module graph never reads files itself. It asks each registered
//! provider (most recent first) whether it can resolve a specifier, and
//! then asks the provider that matched for the source text.
//!
//! ## Providers
//!
//! - `FileProvider`: files under a root directory, with `.js` / `.jsx` /
//!   `index.js` fallback.
//! - `MemoryProvider`: in-memory sources keyed by virtual path, used for
//!   bundling a single string and in tests.

use crate::error::BundleError;
use rustc_hash::FxHashMap as HashMap;
use std::path::{Component, Path, PathBuf};

/// Suffixes tried, in order, after the exact path.
const SUFFIXES: &[&str] = &[".js", ".jsx"];

/// Index file tried for directory imports.
const INDEX_FILE: &str = "index.js";

/// Source of module text.
pub trait ModuleProvider: Send + Sync {
    /// Resolve `specifier` as imported from the module at `from` (empty for
    /// the entry). Returns `None` when this provider has no such module.
    fn match_path(&self, from: &str, specifier: &str) -> Option<String>;

    /// Load the source of a path previously returned by `match_path`.
    fn resolve_or_fail(&self, from: &str, resolved: &str) -> Result<String, BundleError>;
}

/// Registered providers, consulted most recent first.
#[derive(Default)]
pub struct Providers {
    providers: Vec<Box<dyn ModuleProvider>>,
}

impl Providers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, provider: impl ModuleProvider + 'static) {
        self.providers.push(Box::new(provider));
    }

    /// First match, with the index of the provider that produced it.
    #[must_use]
    pub fn match_path(&self, from: &str, specifier: &str) -> Option<(usize, String)> {
        self.providers
            .iter()
            .enumerate()
            .rev()
            .find_map(|(index, provider)| provider.match_path(from, specifier).map(|path| (index, path)))
    }

    pub fn load(&self, provider: usize, from: &str, resolved: &str) -> Result<String, BundleError> {
        match self.providers.get(provider) {
            Some(provider) => provider.resolve_or_fail(from, resolved),
            None => Err(BundleError::ModuleResolutionFailed {
                path: from.to_string(),
                specifier: resolved.to_string(),
            }),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for Providers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Providers")
            .field("count", &self.providers.len())
            .finish()
    }
}

/// Bare specifiers (`react`, `@scope/pkg`) name packages, not files.
#[must_use]
pub fn is_bare(specifier: &str) -> bool {
    !(specifier.starts_with("./") || specifier.starts_with("../") || specifier.starts_with('/') || specifier == "." || specifier == "..")
}

/// Resolve `.` and `..` without touching the file system.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Directory-relative join of a specifier onto the importer's path.
#[must_use]
pub fn join_specifier(from: &str, specifier: &str) -> PathBuf {
    let spec = Path::new(specifier);
    if spec.is_absolute() || from.is_empty() {
        return normalize(spec);
    }
    let dir = Path::new(from).parent().unwrap_or_else(|| Path::new(""));
    normalize(&dir.join(spec))
}

/// Exact path, then suffixed, then the directory's index file.
fn candidates(base: &Path) -> Vec<PathBuf> {
    let mut out = vec![base.to_path_buf()];
    for suffix in SUFFIXES {
        let mut name = base.as_os_str().to_os_string();
        name.push(suffix);
        out.push(PathBuf::from(name));
    }
    out.push(base.join(INDEX_FILE));
    out
}

// =============================================================================
// File system
// =============================================================================

/// Modules on disk under `root`.
#[derive(Debug, Clone)]
pub struct FileProvider {
    root: PathBuf,
}

impl FileProvider {
    /// Provider rooted at `root` (canonicalized when it exists).
    #[must_use]
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let root = dunce::canonicalize(root).unwrap_or_else(|_| normalize(root));
        Self { root }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ModuleProvider for FileProvider {
    fn match_path(&self, from: &str, specifier: &str) -> Option<String> {
        let base = join_specifier(from, specifier);
        if !base.starts_with(&self.root) {
            return None;
        }
        candidates(&base)
            .into_iter()
            .find(|candidate| candidate.is_file())
            .map(|found| found.display().to_string())
    }

    fn resolve_or_fail(&self, _from: &str, resolved: &str) -> Result<String, BundleError> {
        std::fs::read_to_string(resolved).map_err(|source| BundleError::Io {
            path: resolved.to_string(),
            source,
        })
    }
}

// =============================================================================
// Memory
// =============================================================================

/// Modules held in memory, keyed by virtual path.
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    files: HashMap<String, String>,
}

impl MemoryProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a module.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<String>, source: impl Into<String>) -> Self {
        self.insert(path, source);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, source: impl Into<String>) {
        self.files.insert(path.into(), source.into());
    }
}

impl ModuleProvider for MemoryProvider {
    fn match_path(&self, from: &str, specifier: &str) -> Option<String> {
        if self.files.contains_key(specifier) {
            return Some(specifier.to_string());
        }
        if is_bare(specifier) {
            return None;
        }
        candidates(&join_specifier(from, specifier))
            .into_iter()
            .map(|candidate| candidate.display().to_string())
            .find(|candidate| self.files.contains_key(candidate))
    }

    fn resolve_or_fail(&self, _from: &str, resolved: &str) -> Result<String, BundleError> {
        self.files.get(resolved).cloned().ok_or_else(|| BundleError::Io {
            path: resolved.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such in-memory module"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_bare() {
        assert!(is_bare("react"));
        assert!(is_bare("@scope/pkg"));
        assert!(!is_bare("./a"));
        assert!(!is_bare("../a"));
        assert!(!is_bare("/abs/a"));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/src/./lib/../a.js")), PathBuf::from("/src/a.js"));
        assert_eq!(join_specifier("/src/lib/b.js", "../a"), PathBuf::from("/src/a"));
    }

    #[test]
    fn test_memory_suffix_fallback() {
        let provider = MemoryProvider::new()
            .with_file("/src/a.js", "export const a = 1;")
            .with_file("/src/ui/index.js", "")
            .with_file("/src/view.jsx", "");
        assert_eq!(provider.match_path("/src/main.js", "./a").as_deref(), Some("/src/a.js"));
        assert_eq!(provider.match_path("/src/main.js", "./ui").as_deref(), Some("/src/ui/index.js"));
        assert_eq!(provider.match_path("/src/main.js", "./view").as_deref(), Some("/src/view.jsx"));
        assert_eq!(provider.match_path("/src/main.js", "./missing"), None);
        assert!(provider.resolve_or_fail("", "/src/missing.js").is_err());
    }

    #[test]
    fn test_most_recent_provider_wins() {
        let mut providers = Providers::new();
        providers.push(MemoryProvider::new().with_file("/a.js", "old"));
        providers.push(MemoryProvider::new().with_file("/a.js", "new"));
        let (index, path) = providers.match_path("", "/a.js").unwrap();
        assert_eq!(index, 1);
        assert_eq!(providers.load(index, "", &path).unwrap(), "new");
    }

    #[test]
    fn test_file_provider() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("lib")).unwrap();
        std::fs::write(dir.path().join("main.js"), "import './lib';").unwrap();
        std::fs::write(dir.path().join("lib/index.js"), "export {};").unwrap();
        std::fs::write(dir.path().join("util.jsx"), "").unwrap();

        let provider = FileProvider::new(dir.path());
        let main = provider.root().join("main.js").display().to_string();
        let lib = provider.match_path(&main, "./lib").unwrap();
        assert!(lib.ends_with("index.js"));
        assert!(provider.match_path(&main, "./util").unwrap().ends_with("util.jsx"));
        assert_eq!(provider.resolve_or_fail(&main, &lib).unwrap(), "export {};");
        // Outside the root.
        assert_eq!(provider.match_path(&main, "../elsewhere"), None);
    }
}
