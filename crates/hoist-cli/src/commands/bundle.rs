//! `hoist bundle` command implementation.
//!
//! Bundles an entry module and everything it imports into one file.

use hoist_core::bundler::{bundle_file, BundleOptions};
use hoist_core::BundleError;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Options file picked up from the working directory.
const DEFAULT_CONFIG: &str = "hoist.json";

/// Bundle command action.
#[derive(Debug, Clone)]
pub struct BundleAction {
    /// Entry point file.
    pub entry: PathBuf,
    /// Working directory.
    pub cwd: PathBuf,
    /// Output file (if None, prints to stdout).
    pub outfile: Option<PathBuf>,
    /// Explicit options file.
    pub config: Option<PathBuf>,
    pub minify: bool,
    pub sourcemap: bool,
    pub library: bool,
    /// Specifiers kept as imports, added to the options file's list.
    pub external: Vec<String>,
}

/// JSON output for bundle command.
#[derive(Serialize)]
struct BundleResultJson {
    ok: bool,
    entry: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    outfile: Option<String>,
    modules: Vec<String>,
    size_bytes: usize,
    duration_ms: u64,
    /// Bundle text when no output file was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<BundleErrorJson>,
}

#[derive(Serialize)]
struct BundleErrorJson {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
}

impl From<&BundleError> for BundleErrorJson {
    fn from(err: &BundleError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
            path: err.path(),
        }
    }
}

/// Options file values with command-line flags applied on top.
fn load_options(action: &BundleAction) -> Result<BundleOptions, BundleError> {
    let file = match &action.config {
        Some(path) => Some(path.clone()),
        None => Some(action.cwd.join(DEFAULT_CONFIG)).filter(|path| path.is_file()),
    };
    let mut options = match file {
        Some(path) => BundleOptions::from_file(&path)?,
        None => BundleOptions::default(),
    };
    options.minify |= action.minify;
    options.sourcemap |= action.sourcemap;
    options.library |= action.library;
    for specifier in &action.external {
        if !options.external.contains(specifier) {
            options.external.push(specifier.clone());
        }
    }
    if let Some(name) = action.outfile.as_deref().and_then(Path::file_name) {
        options.file = Some(name.to_string_lossy().into_owned());
    }
    Ok(options)
}

/// `out.js` -> `out.js.map`.
fn map_path(outfile: &Path) -> PathBuf {
    let mut name = outfile.as_os_str().to_os_string();
    name.push(".map");
    PathBuf::from(name)
}

fn print_json(result: &BundleResultJson) {
    match serde_json::to_string(result) {
        Ok(line) => println!("{line}"),
        Err(err) => eprintln!("error: {err}"),
    }
}

fn fail(action: &BundleAction, err: &BundleError, json: bool, duration_ms: u64) -> ! {
    if json {
        print_json(&BundleResultJson {
            ok: false,
            entry: action.entry.display().to_string(),
            outfile: action.outfile.as_ref().map(|p| p.display().to_string()),
            modules: Vec::new(),
            size_bytes: 0,
            duration_ms,
            code: None,
            error: Some(err.into()),
        });
    } else {
        eprintln!("error[{}]: {err}", err.code());
        if let Some(path) = err.path() {
            eprintln!("  at {path}");
        }
    }
    std::process::exit(1);
}

/// Run the bundle command.
pub fn run(action: BundleAction, json: bool) -> Result<()> {
    let start = Instant::now();
    let elapsed = |start: Instant| start.elapsed().as_millis() as u64;

    let options = match load_options(&action) {
        Ok(options) => options,
        Err(err) => fail(&action, &err, json, elapsed(start)),
    };
    let result = match bundle_file(&action.entry, &options) {
        Ok(result) => result,
        Err(err) => fail(&action, &err, json, elapsed(start)),
    };
    let duration_ms = elapsed(start);

    let mut code = result.code;
    if let Some(outfile) = &action.outfile {
        if let Some(parent) = outfile.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).into_diagnostic()?;
            }
        }
        if let Some(map) = &result.map {
            let map_file = map_path(outfile);
            std::fs::write(&map_file, map).into_diagnostic()?;
            let name = map_file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            code.push_str(&format!("//# sourceMappingURL={name}\n"));
        }
        std::fs::write(outfile, &code).into_diagnostic()?;
    }

    if json {
        print_json(&BundleResultJson {
            ok: true,
            entry: action.entry.display().to_string(),
            outfile: action.outfile.as_ref().map(|p| p.display().to_string()),
            size_bytes: code.len(),
            modules: result.modules,
            duration_ms,
            code: action.outfile.is_none().then_some(code),
            error: None,
        });
    } else if let Some(outfile) = &action.outfile {
        println!(
            "  {} -> {} ({} modules, {:.1}KB, {}ms)",
            action.entry.display(),
            outfile.display(),
            result.modules.len(),
            code.len() as f64 / 1024.0,
            duration_ms
        );
    } else {
        print!("{code}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(cwd: &Path) -> BundleAction {
        BundleAction {
            entry: cwd.join("main.js"),
            cwd: cwd.to_path_buf(),
            outfile: None,
            config: None,
            minify: false,
            sourcemap: false,
            library: false,
            external: Vec::new(),
        }
    }

    #[test]
    fn test_flags_override_options_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(DEFAULT_CONFIG),
            r#"{ "sourcemap": true, "external": ["react"] }"#,
        )
        .unwrap();
        let mut action = action(dir.path());
        action.minify = true;
        action.external = vec!["react".to_string(), "vue".to_string()];
        action.outfile = Some(dir.path().join("dist/out.js"));

        let options = load_options(&action).unwrap();
        assert!(options.minify);
        assert!(options.sourcemap);
        assert_eq!(options.external, vec!["react".to_string(), "vue".to_string()]);
        assert_eq!(options.file.as_deref(), Some("out.js"));
    }

    #[test]
    fn test_missing_explicit_config_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut action = action(dir.path());
        action.config = Some(dir.path().join("nope.json"));
        assert_eq!(load_options(&action).unwrap_err().code(), "BUNDLE_CONFIG_READ");
    }

    #[test]
    fn test_map_path() {
        assert_eq!(map_path(Path::new("dist/out.js")), PathBuf::from("dist/out.js.map"));
    }
}
