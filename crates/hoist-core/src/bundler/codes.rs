//! Stable error codes for the bundler.
//!
//! All codes are SCREAMING_SNAKE_CASE and stable across versions.

/// A non-`var` name declared twice in one scope.
pub const BUNDLE_DUPLICATE_BINDING: &str = "BUNDLE_DUPLICATE_BINDING";

/// Anonymous function or class where a named export needs a name.
pub const BUNDLE_MISSING_IDENTIFIER: &str = "BUNDLE_MISSING_IDENTIFIER";

/// Export specifier that does not name a local binding.
pub const BUNDLE_UNKNOWN_EXPORT_SPECIFIER: &str = "BUNDLE_UNKNOWN_EXPORT_SPECIFIER";

/// Export syntax the bundler cannot link.
pub const BUNDLE_UNSUPPORTED_EXPORT_FORM: &str = "BUNDLE_UNSUPPORTED_EXPORT_FORM";

/// The same export name declared twice in one module.
pub const BUNDLE_DUPLICATE_EXPORT: &str = "BUNDLE_DUPLICATE_EXPORT";

/// Import specifier matched no provider.
pub const BUNDLE_RESOLVE_FAILED: &str = "BUNDLE_RESOLVE_FAILED";

/// Provider failed to read a module.
pub const BUNDLE_IO_ERROR: &str = "BUNDLE_IO_ERROR";

/// Module source failed to parse.
pub const BUNDLE_PARSE_ERROR: &str = "BUNDLE_PARSE_ERROR";

/// Import names an export the target module does not provide.
pub const BUNDLE_MISSING_EXPORT: &str = "BUNDLE_MISSING_EXPORT";

/// Name generator ran out of names.
pub const BUNDLE_NAMES_EXHAUSTED: &str = "BUNDLE_NAMES_EXHAUSTED";

/// More than one error was reported for a module.
pub const BUNDLE_MULTIPLE_ERRORS: &str = "BUNDLE_MULTIPLE_ERRORS";

/// Config file could not be read.
pub const BUNDLE_CONFIG_READ: &str = "BUNDLE_CONFIG_READ";

/// Config file is not valid JSON for the bundle options.
pub const BUNDLE_CONFIG_INVALID: &str = "BUNDLE_CONFIG_INVALID";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_codes_are_screaming_snake_case() {
        let codes = [
            BUNDLE_DUPLICATE_BINDING,
            BUNDLE_MISSING_IDENTIFIER,
            BUNDLE_UNKNOWN_EXPORT_SPECIFIER,
            BUNDLE_UNSUPPORTED_EXPORT_FORM,
            BUNDLE_DUPLICATE_EXPORT,
            BUNDLE_RESOLVE_FAILED,
            BUNDLE_IO_ERROR,
            BUNDLE_PARSE_ERROR,
            BUNDLE_MISSING_EXPORT,
            BUNDLE_NAMES_EXHAUSTED,
            BUNDLE_MULTIPLE_ERRORS,
            BUNDLE_CONFIG_READ,
            BUNDLE_CONFIG_INVALID,
        ];

        for code in codes {
            assert!(
                code.chars().all(|c| c.is_uppercase() || c == '_'),
                "Code '{code}' should be SCREAMING_SNAKE_CASE"
            );
        }
    }
}
