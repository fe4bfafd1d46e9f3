//! JavaScript bundler.
//!
//! Bundles an ES module graph into one scope-hoisted file: no runtime
//! module loader, every module-level binding renamed into one shared
//! namespace, imports wired straight to the bindings they name.
//!
//! ## Usage
//!
//! ```
//! use hoist_core::bundler::{bundle_source, BundleOptions};
//!
//! let result = bundle_source("const x = 1; export { x as y };", &BundleOptions::default()).unwrap();
//! assert_eq!(result.code, "const x = 1;\nexport { x as y };\n");
//! ```
//!
//! ## Architecture
//!
//! 1. **Graph** - Discover, parse and analyze every module (`graph`, `analyze`)
//! 2. **Link** - Tie each import to the binding that provides it (`link`)
//! 3. **Rename** - Nested scopes, then module scopes across the bundle (`rename`)
//! 4. **Erase** - Strip module syntax; collect external imports (`link`)
//! 5. **Emit** - Print, concatenate, build the source map (`emit`, `sourcemap`)

mod analyze;
pub mod codes;
mod emit;
mod exports;
mod graph;
mod imports;
mod link;
mod names;
mod provider;
mod rename;
mod scope;
mod sourcemap;

pub use analyze::analyze;
pub use emit::{emit, EmitOptions, Emitted};
pub use exports::{DuplicateExport, ExportInfo, ExportTable, ExternalExportInfo};
pub use graph::{Edge, ModuleGraph, ModuleId, ModuleRecord, ResolveOptions};
pub use imports::{ImportEntry, ImportTable};
pub use link::{erase, resolve_export, resolve_import, ImportTarget, Linkage, Wrapper};
pub use names::{is_reserved, MinifyNameGenerator, NamesExhausted, ReadableNameGenerator, UniqueNameGenerator};
pub use provider::{FileProvider, MemoryProvider, ModuleProvider, Providers};
pub use rename::{rename, Naming};
pub use scope::{Scope, ScopeError, ScopeId, ScopeKind, ScopeTree, UnresolvedNames, Variable, VariableId};
pub use sourcemap::{decode_mappings, encode_vlq, DecodeError, DecodedMapping, SourceMap, SourceMapBuilder};

use crate::error::BundleError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Virtual path of the module bundled by [`bundle_source`].
pub const MEMORY_ENTRY: &str = "memory0.js";

/// Bundle options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BundleOptions {
    /// Minify nested scopes and print compact output.
    pub minify: bool,
    /// Generate a source map.
    pub sourcemap: bool,
    /// Leave relative imports that escape `root` as imports.
    pub library: bool,
    /// Specifiers always left as imports.
    pub external: Vec<String>,
    /// Project root for library mode. Defaults to the entry's directory.
    pub root: Option<PathBuf>,
    /// Re-export the entry module's exports from the bundle.
    pub export_entry: bool,
    /// The source map's `file` field.
    pub file: Option<String>,
    /// Lower JSX elements to `React.createElement` calls.
    pub jsx: bool,
}

impl Default for BundleOptions {
    fn default() -> Self {
        Self {
            minify: false,
            sourcemap: false,
            library: false,
            external: Vec::new(),
            root: None,
            export_entry: true,
            file: None,
            jsx: true,
        }
    }
}

impl BundleOptions {
    /// Load options from a JSON file (`hoist.json`).
    pub fn from_file(path: &Path) -> Result<Self, BundleError> {
        let text = std::fs::read_to_string(path).map_err(|source| BundleError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| BundleError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Bundle result.
#[derive(Debug)]
pub struct BundleResult {
    /// Bundled code.
    pub code: String,
    /// Source map JSON (if enabled).
    pub map: Option<String>,
    /// Modules included in the bundle, in emission order.
    pub modules: Vec<String>,
}

/// The main bundler.
#[derive(Debug)]
pub struct Bundler {
    providers: Providers,
    options: BundleOptions,
}

impl Bundler {
    /// Create a bundler with no providers.
    #[must_use]
    pub fn new(options: BundleOptions) -> Self {
        Self {
            providers: Providers::new(),
            options,
        }
    }

    /// Register a provider. Later providers are consulted first.
    #[must_use]
    pub fn with_provider(mut self, provider: impl ModuleProvider + 'static) -> Self {
        self.providers.push(provider);
        self
    }

    #[must_use]
    pub fn options(&self) -> &BundleOptions {
        &self.options
    }

    /// Bundle from an entry specifier (a path some provider matches).
    pub fn bundle(&self, entry: &str) -> Result<BundleResult, BundleError> {
        let started = Instant::now();
        let options = &self.options;
        let resolve = ResolveOptions {
            external: options.external.clone(),
            library: options.library,
            root: options.root.clone().unwrap_or_else(|| entry_dir(Path::new(entry))),
            jsx: options.jsx,
        };

        // 1. Graph
        let unresolved = UnresolvedNames::new();
        let mut graph = ModuleGraph::build(&self.providers, &resolve, &unresolved, entry)?;

        // 2. Link
        let linkage = Linkage::resolve(&graph, options.export_entry)?;

        // 3. Rename
        let globals = unresolved.snapshot();
        let naming = rename(&mut graph, &linkage, &globals, options.minify)?;
        debug!(globals = globals.len(), minify = options.minify, "renamed bindings");

        // 4. Erase
        let order = graph.post_order();
        let wrapper = erase(&mut graph, &linkage, &naming, &order, options.export_entry);

        // 5. Emit
        let emitted = emit(
            &graph,
            &order,
            &wrapper,
            &EmitOptions {
                minify: options.minify,
                sourcemap: options.sourcemap,
                file: options.file.clone(),
            },
        );
        let map = emitted.map.map(|map| map.to_json());

        info!(
            modules = order.len(),
            bytes = emitted.code.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "bundled"
        );
        Ok(BundleResult {
            code: emitted.code,
            map,
            modules: order.iter().map(|&id| graph.module(id).path.clone()).collect(),
        })
    }
}

/// Directory containing `entry`.
fn entry_dir(entry: &Path) -> PathBuf {
    entry.parent().map(Path::to_path_buf).unwrap_or_default()
}

/// Bundle a file on disk.
///
/// Files are read through a [`FileProvider`] rooted at the library root in
/// library mode and at the file system root otherwise.
pub fn bundle_file(entry: &Path, options: &BundleOptions) -> Result<BundleResult, BundleError> {
    let entry = dunce::canonicalize(entry).map_err(|source| BundleError::Io {
        path: entry.display().to_string(),
        source,
    })?;
    let mut options = options.clone();
    let root = match (&options.root, options.library) {
        (Some(root), _) => dunce::canonicalize(root).unwrap_or_else(|_| root.clone()),
        (None, true) => entry_dir(&entry),
        (None, false) => entry.ancestors().last().map(Path::to_path_buf).unwrap_or_default(),
    };
    if options.library {
        options.root = Some(root.clone());
    }
    Bundler::new(options)
        .with_provider(FileProvider::new(root))
        .bundle(&entry.display().to_string())
}

/// Bundle one in-memory module. It cannot import other bundled modules;
/// bare imports stay external.
pub fn bundle_source(source: &str, options: &BundleOptions) -> Result<BundleResult, BundleError> {
    Bundler::new(options.clone())
        .with_provider(MemoryProvider::new().with_file(MEMORY_ENTRY, source))
        .bundle(MEMORY_ENTRY)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(files: &[(&str, &str)], options: &BundleOptions) -> BundleResult {
        let mut memory = MemoryProvider::new();
        for (path, source) in files {
            memory.insert(*path, *source);
        }
        Bundler::new(options.clone())
            .with_provider(memory)
            .bundle(files[0].0)
            .unwrap()
    }

    #[test]
    fn test_bundle_source_readable() {
        let result = bundle_source("var x = 3;", &BundleOptions::default()).unwrap();
        assert_eq!(result.code, "var x = 3;\n");
        assert_eq!(result.modules, vec![MEMORY_ENTRY.to_string()]);
        assert!(result.map.is_none());
    }

    #[test]
    fn test_two_modules_concatenate_in_dependency_order() {
        let result = bundle(
            &[
                ("/src/main.js", "import helper from './util';\nconsole.log(helper());"),
                ("/src/util.js", "const helper = () => 42;\nexport default helper;"),
            ],
            &BundleOptions::default(),
        );
        assert_eq!(result.code, "const helper = () => 42;\nconsole.log(helper());\n");
        assert_eq!(result.modules, vec!["/src/util.js".to_string(), "/src/main.js".to_string()]);
    }

    #[test]
    fn test_colliding_names_are_separated() {
        let result = bundle(
            &[
                ("/main.js", "import { a } from './a';\nconst value = 1;\nconsole.log(a, value);"),
                ("/a.js", "const value = 2;\nexport const a = value;"),
            ],
            &BundleOptions::default(),
        );
        assert_eq!(
            result.code,
            "const value = 2;\nconst a = value;\nconst value_1 = 1;\nconsole.log(a, value_1);\n"
        );
    }

    #[test]
    fn test_anonymous_default_and_entry_exports() {
        let result = bundle(
            &[
                ("/main.js", "import f from './f';\nexport default f(1);\nexport { f };"),
                ("/f.js", "export default function (n) {\n  return n + 1;\n}"),
            ],
            &BundleOptions::default(),
        );
        assert_eq!(
            result.code,
            "function _default(n) {\n  return n + 1;\n}\nvar _default_1 = _default(1);\nexport { _default as f, _default_1 as default };\n"
        );
    }

    #[test]
    fn test_namespace_import_becomes_object() {
        let result = bundle(
            &[
                ("/main.js", "import * as util from './util';\nutil.one;"),
                ("/util.js", "export const one = 1;"),
            ],
            &BundleOptions {
                export_entry: false,
                ..BundleOptions::default()
            },
        );
        assert!(result.code.starts_with("const one = 1;\nvar util = {"), "{}", result.code);
        assert!(result.code.contains("__proto__: null"));
        assert!(result.code.contains("get one()"));
        assert!(result.code.ends_with("util.one;\n"));
    }

    #[test]
    fn test_external_imports_hoisted_and_deduplicated() {
        let result = bundle(
            &[
                ("/main.js", "import React from 'react';\nimport './a';\nReact.render();"),
                ("/a.js", "import { useState } from 'react';\nimport R from 'react';\nuseState(R);"),
            ],
            &BundleOptions::default(),
        );
        assert_eq!(
            result.code,
            "import R, { useState } from 'react';\nuseState(R);\nR.render();\n"
        );
    }

    #[test]
    fn test_jsx_modules_lower_to_create_element() {
        let files = [
            (
                "/app.jsx",
                "import React from 'react';\nimport { Button } from './button';\nexport const app = <Button label=\"go\" />;",
            ),
            (
                "/button.jsx",
                "import React from 'react';\nexport const Button = (props) => <button>{props.label}</button>;",
            ),
        ];
        let result = bundle(&files, &BundleOptions::default());
        assert_eq!(
            result.code,
            "import React from 'react';\nconst Button = (props) => React.createElement(\"button\", null, props.label);\nconst app = React.createElement(Button, { label: \"go\" });\nexport { app };\n"
        );

        let mut memory = MemoryProvider::new();
        for (path, source) in files {
            memory.insert(path, source);
        }
        let options = BundleOptions {
            jsx: false,
            ..BundleOptions::default()
        };
        let err = Bundler::new(options).with_provider(memory).bundle("/app.jsx").unwrap_err();
        assert_eq!(err.code(), codes::BUNDLE_PARSE_ERROR);
    }

    #[test]
    fn test_minified_bundle_round_trips_source_map() {
        let options = BundleOptions {
            minify: true,
            sourcemap: true,
            file: Some("out.js".to_string()),
            ..BundleOptions::default()
        };
        let result = bundle(&[("/main.js", "function add(first, second) {\n  return first + second;\n}\nadd(1, 2);")], &options);
        assert!(!result.code.contains("first"));

        let map = SourceMap::from_json(result.map.as_deref().unwrap()).unwrap();
        assert_eq!(map.version, 3);
        assert_eq!(map.file.as_deref(), Some("out.js"));
        assert_eq!(map.sources, vec!["/main.js".to_string()]);
        assert!(map.names.contains(&"first".to_string()));

        let decoded = decode_mappings(&map.mappings).unwrap();
        let first = map.names.iter().position(|n| n == "first").unwrap() as u32;
        let named: Vec<&DecodedMapping> = decoded.iter().filter(|m| m.name == Some(first)).collect();
        // Parameter declaration, then its use on line 2.
        assert_eq!((named[0].orig_line, named[0].orig_col), (0, 13));
        assert_eq!((named[1].orig_line, named[1].orig_col), (1, 9));
    }

    #[test]
    fn test_minify_keeps_var_in_catch_on_the_catch_param() {
        let options = BundleOptions {
            minify: true,
            export_entry: false,
            ..BundleOptions::default()
        };
        let result = bundle(
            &[("/main.js", "function f() { try { throw 0; } catch (e) { var e = 1; } return e; }\nf();")],
            &options,
        );
        let code = &result.code;
        let start = code.find("catch(").unwrap() + "catch(".len();
        let param = &code[start..start + code[start..].find(')').unwrap()];
        assert!(code.contains(&format!("var {param}=1;")), "{code}");
        assert!(code.contains(&format!("return {param};")), "{code}");
    }

    #[test]
    fn test_library_mode_with_memory_provider() {
        let options = BundleOptions {
            library: true,
            root: Some(PathBuf::from("/project")),
            ..BundleOptions::default()
        };
        let result = bundle(
            &[
                ("/project/main.js", "import { y } from '../shared/y';\ny;"),
                ("/shared/y.js", "export const y = 2;"),
            ],
            &options,
        );
        assert_eq!(result.code, "import { y } from '../shared/y';\ny;\n");
        assert_eq!(result.modules, vec!["/project/main.js".to_string()]);
    }

    #[test]
    fn test_errors_abort_bundle() {
        let mut memory = MemoryProvider::new();
        memory.insert("/main.js", "import { missing } from './a';");
        memory.insert("/a.js", "export const present = 1;");
        let err = Bundler::new(BundleOptions::default())
            .with_provider(memory)
            .bundle("/main.js")
            .unwrap_err();
        assert_eq!(err.code(), codes::BUNDLE_MISSING_EXPORT);
    }

    #[test]
    fn test_options_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hoist.json");
        std::fs::write(&path, r#"{ "minify": true, "external": ["react"] }"#).unwrap();
        let options = BundleOptions::from_file(&path).unwrap();
        assert!(options.minify);
        assert!(options.export_entry);
        assert_eq!(options.external, vec!["react".to_string()]);

        std::fs::write(&path, "{ nope").unwrap();
        let err = BundleOptions::from_file(&path).unwrap_err();
        assert_eq!(err.code(), codes::BUNDLE_CONFIG_INVALID);
        let err = BundleOptions::from_file(&dir.path().join("missing.json")).unwrap_err();
        assert_eq!(err.code(), codes::BUNDLE_CONFIG_READ);
    }

    #[test]
    fn test_bundle_file_library_mode() {
        let dir = tempfile::tempdir().unwrap();
        let app = dir.path().join("app");
        std::fs::create_dir_all(&app).unwrap();
        std::fs::write(app.join("main.js"), "import { x } from './x';\nimport { y } from '../shared';\nx + y;").unwrap();
        std::fs::write(app.join("x.js"), "export const x = 1;").unwrap();
        std::fs::write(dir.path().join("shared.js"), "export const y = 2;").unwrap();

        let options = BundleOptions {
            library: true,
            ..BundleOptions::default()
        };
        let result = bundle_file(&app.join("main.js"), &options).unwrap();
        assert_eq!(result.code, "import { y } from '../shared';\nconst x = 1;\nx + y;\n");
        assert_eq!(result.modules.len(), 2);

        // Without library mode the shared module is bundled too.
        let result = bundle_file(&app.join("main.js"), &BundleOptions::default()).unwrap();
        assert_eq!(result.code, "const x = 1;\nconst y = 2;\nx + y;\n");
    }
}
