//! Identifier generators for renaming.
//!
//! `MinifyNameGenerator` enumerates the shortest identifiers first
//! (`a`, `b`, ..., `$`, `aa`, `ba`, ...). `ReadableNameGenerator` keeps the
//! original name and falls back to `name_N`. Both skip reserved words,
//! names they already handed out, and anything the caller's `taken`
//! predicate rejects.

use rustc_hash::FxHashSet as HashSet;
use std::sync::OnceLock;

/// Keywords, future reserved words, and globals that must never be bound.
const RESERVED: &[&str] = &[
    // Keywords
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete", "do",
    "else", "export", "extends", "finally", "for", "function", "if", "import", "in", "instanceof",
    "new", "return", "super", "switch", "this", "throw", "try", "typeof", "var", "void", "while",
    "with", "yield",
    // Literals
    "null", "true", "false",
    // Future and strict-mode reserved words
    "enum", "await", "implements", "interface", "let", "package", "private", "protected", "public",
    "static",
    // Restricted globals
    "arguments", "eval", "undefined", "NaN", "Infinity",
];

/// First character of a generated name.
const FIRST_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_$";
/// Subsequent characters.
const REST_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789_$";

/// Whether `name` can never be used as a binding name.
#[must_use]
pub fn is_reserved(name: &str) -> bool {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| RESERVED.iter().copied().collect())
        .contains(name)
}

/// The generator ran out of names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamesExhausted;

impl std::fmt::Display for NamesExhausted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("name generator exhausted")
    }
}

impl std::error::Error for NamesExhausted {}

/// A source of unique identifiers.
pub trait UniqueNameGenerator {
    /// Produce a fresh name for a binding originally called `original`.
    fn next_name(&mut self, original: &str, taken: &dyn Fn(&str) -> bool) -> Result<String, NamesExhausted>;

    /// Mark a name as used so it is never produced.
    fn reserve(&mut self, name: &str);

    /// Whether `name` was produced or reserved.
    fn is_used(&self, name: &str) -> bool;
}

// =============================================================================
// Minify
// =============================================================================

/// Counter-based generator of short names.
#[derive(Debug, Clone, Default)]
pub struct MinifyNameGenerator {
    counter: u64,
    used: HashSet<String>,
}

impl MinifyNameGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Generator that never produces any of `names` (e.g. free globals).
    #[must_use]
    pub fn with_reserved<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut generator = Self::new();
        for name in names {
            generator.used.insert(name.to_string());
        }
        generator
    }

    /// Reset the counter. Names already handed out stay excluded.
    pub fn restart(&mut self) {
        self.counter = 0;
    }

    /// Combine with another generator: the larger counter and the union of
    /// used names.
    pub fn merge(&mut self, other: &MinifyNameGenerator) {
        self.counter = self.counter.max(other.counter);
        self.used.extend(other.used.iter().cloned());
    }

    /// Encode a counter value as an identifier.
    fn encode(mut n: u64) -> String {
        let mut name = String::new();
        name.push(FIRST_CHARS[(n % FIRST_CHARS.len() as u64) as usize] as char);
        n /= FIRST_CHARS.len() as u64;
        while n > 0 {
            n -= 1;
            name.push(REST_CHARS[(n % REST_CHARS.len() as u64) as usize] as char);
            n /= REST_CHARS.len() as u64;
        }
        name
    }
}

impl UniqueNameGenerator for MinifyNameGenerator {
    fn next_name(&mut self, _original: &str, taken: &dyn Fn(&str) -> bool) -> Result<String, NamesExhausted> {
        loop {
            if self.counter == u64::MAX {
                return Err(NamesExhausted);
            }
            let name = Self::encode(self.counter);
            self.counter += 1;
            if is_reserved(&name) || self.used.contains(&name) || taken(&name) {
                continue;
            }
            self.used.insert(name.clone());
            return Ok(name);
        }
    }

    fn reserve(&mut self, name: &str) {
        self.used.insert(name.to_string());
    }

    fn is_used(&self, name: &str) -> bool {
        self.used.contains(name)
    }
}

// =============================================================================
// Readable
// =============================================================================

/// Keeps original names, suffixing `_N` on collision.
#[derive(Debug, Clone, Default)]
pub struct ReadableNameGenerator {
    used: HashSet<String>,
    counter: u64,
}

impl ReadableNameGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_reserved<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut generator = Self::new();
        for name in names {
            generator.used.insert(name.to_string());
        }
        generator
    }

    fn is_free(&self, name: &str, taken: &dyn Fn(&str) -> bool) -> bool {
        !is_reserved(name) && !self.used.contains(name) && !taken(name)
    }
}

impl UniqueNameGenerator for ReadableNameGenerator {
    fn next_name(&mut self, original: &str, taken: &dyn Fn(&str) -> bool) -> Result<String, NamesExhausted> {
        if self.is_free(original, taken) {
            self.used.insert(original.to_string());
            return Ok(original.to_string());
        }
        loop {
            if self.counter == u64::MAX {
                return Err(NamesExhausted);
            }
            self.counter += 1;
            let candidate = format!("{original}_{}", self.counter);
            if self.is_free(&candidate, taken) {
                self.used.insert(candidate.clone());
                return Ok(candidate);
            }
        }
    }

    fn reserve(&mut self, name: &str) {
        self.used.insert(name.to_string());
    }

    fn is_used(&self, name: &str) -> bool {
        self.used.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn never(_: &str) -> bool {
        false
    }

    #[test]
    fn test_minify_sequence() {
        let mut generator = MinifyNameGenerator::new();
        let first: Vec<String> = (0..3).map(|_| generator.next_name("x", &never).unwrap()).collect();
        assert_eq!(first, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_ten_thousand_unique_names() {
        let mut generator = MinifyNameGenerator::new();
        let mut seen = HashSet::default();
        for _ in 0..10_000 {
            let name = generator.next_name("x", &never).unwrap();
            assert!(!is_reserved(&name), "generated reserved word {name}");
            assert!(name.as_bytes()[0].is_ascii_alphabetic() || name.starts_with(['_', '$']));
            assert!(seen.insert(name));
        }
        assert_eq!(seen.len(), 10_000);
    }

    #[test]
    fn test_skips_reserved_two_letter_words() {
        let mut generator = MinifyNameGenerator::new();
        let names: Vec<String> = (0..5_000).map(|_| generator.next_name("x", &never).unwrap()).collect();
        assert!(!names.iter().any(|n| n == "do" || n == "if" || n == "in"));
    }

    #[test]
    fn test_taken_predicate_and_reserved_globals() {
        let mut generator = MinifyNameGenerator::with_reserved(["a"]);
        let name = generator.next_name("x", &|n: &str| n == "b").unwrap();
        assert_eq!(name, "c");
    }

    #[test]
    fn test_merge_takes_max_counter_and_union() {
        let mut left = MinifyNameGenerator::new();
        left.next_name("x", &never).unwrap();
        let mut right = MinifyNameGenerator::new();
        for _ in 0..3 {
            right.next_name("x", &never).unwrap();
        }
        left.merge(&right);
        assert_eq!(left.next_name("x", &never).unwrap(), "d");
        left.restart();
        assert_eq!(left.next_name("x", &never).unwrap(), "e");
    }

    #[test]
    fn test_exhaustion() {
        let mut generator = MinifyNameGenerator {
            counter: u64::MAX,
            used: HashSet::default(),
        };
        assert_eq!(generator.next_name("x", &never), Err(NamesExhausted));
    }

    #[test]
    fn test_readable_keeps_free_names() {
        let mut generator = ReadableNameGenerator::with_reserved(["console"]);
        assert_eq!(generator.next_name("helper", &never).unwrap(), "helper");
        assert_eq!(generator.next_name("helper", &never).unwrap(), "helper_1");
        assert_eq!(generator.next_name("console", &never).unwrap(), "console_2");
        assert_eq!(generator.next_name("default", &never).unwrap(), "default_3");
    }
}
