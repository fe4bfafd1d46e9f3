use crate::bundler::codes;
use crate::bundler::NamesExhausted;
use std::path::PathBuf;
use thiserror::Error;

/// Error type for bundling.
///
/// Variants that point at source carry the module path and a 1-based
/// line and column.
#[derive(Error, Debug)]
pub enum BundleError {
    #[error("{path}:{line}:{column}: '{name}' has already been declared")]
    DuplicateBinding {
        path: String,
        name: String,
        line: u32,
        column: u32,
    },

    #[error("{path}:{line}:{column}: exported {what} declaration must have a name")]
    MissingIdentifier {
        path: String,
        what: &'static str,
        line: u32,
        column: u32,
    },

    #[error("{path}:{line}:{column}: export specifier '{name}' does not name a local binding")]
    UnknownExportSpecifier {
        path: String,
        name: String,
        line: u32,
        column: u32,
    },

    #[error("{path}:{line}:{column}: unsupported export form: {form}")]
    UnsupportedExportForm {
        path: String,
        form: String,
        line: u32,
        column: u32,
    },

    #[error("{path}:{line}:{column}: duplicate export '{name}'")]
    DuplicateExport {
        path: String,
        name: String,
        line: u32,
        column: u32,
    },

    #[error("Cannot resolve '{specifier}' from {path}")]
    ModuleResolutionFailed { path: String, specifier: String },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}:{column}: {message}")]
    Parse {
        path: String,
        message: String,
        line: u32,
        column: u32,
    },

    #[error("{path}: '{specifier}' does not export '{name}'")]
    MissingExport {
        path: String,
        specifier: String,
        name: String,
    },

    #[error("Name generator exhausted")]
    NamesExhausted,

    #[error("{}", join_messages(.0))]
    Multiple(Vec<BundleError>),

    #[error("Failed to read config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn join_messages(errors: &[BundleError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

impl BundleError {
    /// Stable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateBinding { .. } => codes::BUNDLE_DUPLICATE_BINDING,
            Self::MissingIdentifier { .. } => codes::BUNDLE_MISSING_IDENTIFIER,
            Self::UnknownExportSpecifier { .. } => codes::BUNDLE_UNKNOWN_EXPORT_SPECIFIER,
            Self::UnsupportedExportForm { .. } => codes::BUNDLE_UNSUPPORTED_EXPORT_FORM,
            Self::DuplicateExport { .. } => codes::BUNDLE_DUPLICATE_EXPORT,
            Self::ModuleResolutionFailed { .. } => codes::BUNDLE_RESOLVE_FAILED,
            Self::Io { .. } => codes::BUNDLE_IO_ERROR,
            Self::Parse { .. } => codes::BUNDLE_PARSE_ERROR,
            Self::MissingExport { .. } => codes::BUNDLE_MISSING_EXPORT,
            Self::NamesExhausted => codes::BUNDLE_NAMES_EXHAUSTED,
            Self::Multiple(_) => codes::BUNDLE_MULTIPLE_ERRORS,
            Self::ConfigRead { .. } => codes::BUNDLE_CONFIG_READ,
            Self::ConfigParse { .. } => codes::BUNDLE_CONFIG_INVALID,
        }
    }

    /// Path of the module (or config file) the error points at.
    #[must_use]
    pub fn path(&self) -> Option<String> {
        match self {
            Self::DuplicateBinding { path, .. }
            | Self::MissingIdentifier { path, .. }
            | Self::UnknownExportSpecifier { path, .. }
            | Self::UnsupportedExportForm { path, .. }
            | Self::DuplicateExport { path, .. }
            | Self::ModuleResolutionFailed { path, .. }
            | Self::Io { path, .. }
            | Self::Parse { path, .. }
            | Self::MissingExport { path, .. } => Some(path.clone()),
            Self::ConfigRead { path, .. } | Self::ConfigParse { path, .. } => Some(path.display().to_string()),
            Self::Multiple(errors) => errors.first().and_then(Self::path),
            Self::NamesExhausted => None,
        }
    }

    /// 1-based line and column, when the error points into source.
    #[must_use]
    pub fn location(&self) -> Option<(u32, u32)> {
        match self {
            Self::DuplicateBinding { line, column, .. }
            | Self::MissingIdentifier { line, column, .. }
            | Self::UnknownExportSpecifier { line, column, .. }
            | Self::UnsupportedExportForm { line, column, .. }
            | Self::DuplicateExport { line, column, .. }
            | Self::Parse { line, column, .. } => Some((*line, *column)),
            Self::Multiple(errors) => errors.first().and_then(Self::location),
            _ => None,
        }
    }

    /// Collapse a list of errors: one error stays as is, several become
    /// `Multiple`.
    #[must_use]
    pub fn from_many(mut errors: Vec<BundleError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Self::Multiple(errors)),
        }
    }
}

impl From<NamesExhausted> for BundleError {
    fn from(_: NamesExhausted) -> Self {
        Self::NamesExhausted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_locations() {
        let err = BundleError::DuplicateBinding {
            path: "/src/a.js".to_string(),
            name: "a".to_string(),
            line: 2,
            column: 5,
        };
        assert_eq!(err.code(), codes::BUNDLE_DUPLICATE_BINDING);
        assert_eq!(err.path().as_deref(), Some("/src/a.js"));
        assert_eq!(err.location(), Some((2, 5)));
        assert_eq!(err.to_string(), "/src/a.js:2:5: 'a' has already been declared");
    }

    #[test]
    fn test_from_many() {
        assert!(BundleError::from_many(Vec::new()).is_none());
        let one = BundleError::from_many(vec![BundleError::NamesExhausted]).unwrap();
        assert_eq!(one.code(), codes::BUNDLE_NAMES_EXHAUSTED);
        let many = BundleError::from_many(vec![BundleError::NamesExhausted, BundleError::NamesExhausted]).unwrap();
        assert_eq!(many.code(), codes::BUNDLE_MULTIPLE_ERRORS);
        assert_eq!(many.to_string().lines().count(), 2);
    }
}
