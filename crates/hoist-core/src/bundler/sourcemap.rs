//! Source map v3 builder.
//!
//! Mappings arrive per module from the code generator, already shifted to
//! their line in the bundle. Source files and names get indexes the first
//! time a mapping refers to them, so `sources` and `names` list entries in
//! first-referenced order.

use super::graph::ModuleId;
use hoist_parser::SourceMapping;
use rustc_hash::FxHashMap as HashMap;
use serde::{Deserialize, Serialize};

const BASE64: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// VLQ-encode a signed integer and append it to `out`.
pub fn encode_vlq(value: i64, out: &mut String) {
    #[allow(clippy::cast_sign_loss)]
    let mut v = (if value < 0 { ((-value) << 1) | 1 } else { value << 1 }) as u64;
    loop {
        let mut digit = (v & 0x1f) as u8;
        v >>= 5;
        if v > 0 {
            digit |= 0x20;
        }
        out.push(BASE64[digit as usize] as char);
        if v == 0 {
            break;
        }
    }
}

/// Errors decoding a `mappings` string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid base64 character '{0}'")]
    InvalidChar(char),
    #[error("value ends in the middle of a VLQ sequence")]
    Truncated,
    #[error("segment with {0} fields")]
    BadSegment(usize),
    #[error("VLQ value does not fit in 60 bits")]
    Overflow,
}

/// Largest shift that still fits a 5-bit digit into 60 bits.
const MAX_SHIFT: u32 = 55;

fn base64_value(ch: char) -> Result<u64, DecodeError> {
    BASE64
        .iter()
        .position(|&b| char::from(b) == ch)
        .map(|index| index as u64)
        .ok_or(DecodeError::InvalidChar(ch))
}

/// Decode every VLQ value of one segment.
fn decode_segment(segment: &str) -> Result<Vec<i64>, DecodeError> {
    let mut values = Vec::new();
    let mut value = 0u64;
    let mut shift = 0u32;
    let mut pending = false;
    for ch in segment.chars() {
        let digit = base64_value(ch)?;
        if shift > MAX_SHIFT {
            return Err(DecodeError::Overflow);
        }
        value |= (digit & 0x1f) << shift;
        if digit & 0x20 == 0 {
            #[allow(clippy::cast_possible_wrap)]
            let magnitude = (value >> 1) as i64;
            values.push(if value & 1 == 1 { -magnitude } else { magnitude });
            value = 0;
            shift = 0;
            pending = false;
        } else {
            shift += 5;
            pending = true;
        }
    }
    if pending {
        return Err(DecodeError::Truncated);
    }
    Ok(values)
}

/// One decoded mapping, with absolute positions (all 0-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedMapping {
    pub gen_line: u32,
    pub gen_col: u32,
    pub source: u32,
    pub orig_line: u32,
    pub orig_col: u32,
    pub name: Option<u32>,
}

fn add(total: i64, delta: i64) -> Result<i64, DecodeError> {
    total.checked_add(delta).ok_or(DecodeError::Overflow)
}

/// Decode a `mappings` string. Segments without a source position are
/// skipped.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn decode_mappings(mappings: &str) -> Result<Vec<DecodedMapping>, DecodeError> {
    let mut out = Vec::new();
    let (mut source, mut orig_line, mut orig_col, mut name) = (0i64, 0i64, 0i64, 0i64);
    for (gen_line, line) in mappings.split(';').enumerate() {
        let mut gen_col = 0i64;
        for segment in line.split(',').filter(|s| !s.is_empty()) {
            let fields = decode_segment(segment)?;
            match fields.len() {
                1 => gen_col = add(gen_col, fields[0])?,
                4 | 5 => {
                    gen_col = add(gen_col, fields[0])?;
                    source = add(source, fields[1])?;
                    orig_line = add(orig_line, fields[2])?;
                    orig_col = add(orig_col, fields[3])?;
                    let name_index = if fields.len() == 5 {
                        name = add(name, fields[4])?;
                        Some(name as u32)
                    } else {
                        None
                    };
                    out.push(DecodedMapping {
                        gen_line: gen_line as u32,
                        gen_col: gen_col as u32,
                        source: source as u32,
                        orig_line: orig_line as u32,
                        orig_col: orig_col as u32,
                        name: name_index,
                    });
                }
                other => return Err(DecodeError::BadSegment(other)),
            }
        }
    }
    Ok(out)
}

/// A serialized v3 source map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub version: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default)]
    pub source_root: String,
    pub sources: Vec<String>,
    #[serde(default)]
    pub sources_content: Vec<Option<String>>,
    pub names: Vec<String>,
    pub mappings: String,
}

impl SourceMap {
    /// Serialize to JSON. Plain strings and lists cannot fail to serialize.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[derive(Debug, Clone, Copy)]
struct Item {
    gen_line: u32,
    gen_col: u32,
    source: u32,
    orig_line: u32,
    orig_col: u32,
    name: Option<u32>,
}

/// Collects mappings for one bundle.
#[derive(Debug, Default)]
pub struct SourceMapBuilder {
    file: Option<String>,
    sources: Vec<String>,
    sources_content: Vec<Option<String>>,
    file_index: HashMap<ModuleId, u32>,
    names: Vec<String>,
    name_index: HashMap<String, u32>,
    items: Vec<Item>,
}

impl SourceMapBuilder {
    #[must_use]
    pub fn new(file: Option<String>) -> Self {
        Self {
            file,
            ..Self::default()
        }
    }

    /// Index of `module` in `sources`, assigned on first use.
    pub fn source_index(&mut self, module: ModuleId, path: &str, content: &str) -> u32 {
        if let Some(&index) = self.file_index.get(&module) {
            return index;
        }
        let index = self.sources.len() as u32;
        self.sources.push(path.to_string());
        self.sources_content.push(Some(content.to_string()));
        self.file_index.insert(module, index);
        index
    }

    fn name_index(&mut self, name: &str) -> u32 {
        if let Some(&index) = self.name_index.get(name) {
            return index;
        }
        let index = self.names.len() as u32;
        self.names.push(name.to_string());
        self.name_index.insert(name.to_string(), index);
        index
    }

    /// Record one mapping of `module`, moved down by `line_offset` lines.
    pub fn add(&mut self, module: ModuleId, path: &str, content: &str, mapping: &SourceMapping, line_offset: u32) {
        let source = self.source_index(module, path, content);
        let name = mapping.name.as_deref().map(|name| self.name_index(name));
        self.items.push(Item {
            gen_line: mapping.gen_line + line_offset,
            gen_col: mapping.gen_col,
            source,
            orig_line: mapping.orig_line,
            orig_col: mapping.orig_col,
            name,
        });
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Encode the collected mappings.
    #[must_use]
    pub fn build(mut self) -> SourceMap {
        self.items.sort_by_key(|item| (item.gen_line, item.gen_col));

        let mut mappings = String::new();
        let mut line = 0u32;
        let mut first_in_line = true;
        let (mut gen_col, mut source, mut orig_line, mut orig_col, mut name) = (0i64, 0i64, 0i64, 0i64, 0i64);
        for item in &self.items {
            while line < item.gen_line {
                mappings.push(';');
                line += 1;
                gen_col = 0;
                first_in_line = true;
            }
            if !first_in_line {
                mappings.push(',');
            }
            first_in_line = false;

            encode_vlq(i64::from(item.gen_col) - gen_col, &mut mappings);
            encode_vlq(i64::from(item.source) - source, &mut mappings);
            encode_vlq(i64::from(item.orig_line) - orig_line, &mut mappings);
            encode_vlq(i64::from(item.orig_col) - orig_col, &mut mappings);
            if let Some(index) = item.name {
                encode_vlq(i64::from(index) - name, &mut mappings);
                name = i64::from(index);
            }
            gen_col = i64::from(item.gen_col);
            source = i64::from(item.source);
            orig_line = i64::from(item.orig_line);
            orig_col = i64::from(item.orig_col);
        }

        SourceMap {
            version: 3,
            file: self.file,
            source_root: String::new(),
            sources: self.sources,
            sources_content: self.sources_content,
            names: self.names,
            mappings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(gen_line: u32, gen_col: u32, orig_line: u32, orig_col: u32, name: Option<&str>) -> SourceMapping {
        SourceMapping {
            gen_line,
            gen_col,
            orig_line,
            orig_col,
            name: name.map(str::to_string),
        }
    }

    #[test]
    fn test_vlq_known_values() {
        let mut out = String::new();
        for value in [0, 1, -1, 15, 16, -16, 1000] {
            encode_vlq(value, &mut out);
            out.push(',');
        }
        assert_eq!(out, "A,C,D,e,gB,hB,w+B,");
        let decoded: Vec<i64> = out
            .split(',')
            .filter(|s| !s.is_empty())
            .flat_map(|s| decode_segment(s).unwrap())
            .collect();
        assert_eq!(decoded, vec![0, 1, -1, 15, 16, -16, 1000]);
    }

    #[test]
    fn test_round_trip_single_rename() {
        let mut builder = SourceMapBuilder::new(Some("out.js".to_string()));
        builder.add(0, "/src/a.js", "const longName = 1;", &mapping(0, 6, 0, 6, Some("longName")), 0);
        let map = builder.build();
        assert_eq!(map.names, vec!["longName".to_string()]);

        let decoded = decode_mappings(&map.mappings).unwrap();
        assert_eq!(
            decoded,
            vec![DecodedMapping {
                gen_line: 0,
                gen_col: 6,
                source: 0,
                orig_line: 0,
                orig_col: 6,
                name: Some(0),
            }]
        );
    }

    #[test]
    fn test_sources_in_first_reference_order() {
        let mut builder = SourceMapBuilder::new(None);
        builder.add(7, "/b.js", "", &mapping(0, 0, 0, 0, None), 0);
        builder.add(3, "/a.js", "", &mapping(0, 0, 0, 0, None), 2);
        builder.add(7, "/b.js", "", &mapping(1, 4, 1, 2, None), 0);
        let map = builder.build();
        assert_eq!(map.sources, vec!["/b.js".to_string(), "/a.js".to_string()]);

        let decoded = decode_mappings(&map.mappings).unwrap();
        let positions: Vec<(u32, u32, u32, u32)> = decoded
            .iter()
            .map(|m| (m.gen_line, m.gen_col, m.source, m.orig_line))
            .collect();
        assert_eq!(positions, vec![(0, 0, 0, 0), (1, 4, 0, 1), (2, 0, 1, 0)]);
        assert_eq!(map.mappings.matches(';').count(), 2);
    }

    #[test]
    fn test_json_shape() {
        let mut builder = SourceMapBuilder::new(Some("bundle.js".to_string()));
        builder.add(0, "/a.js", "x", &mapping(0, 0, 0, 0, None), 0);
        let json = builder.build().to_json();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["version"], 3);
        assert_eq!(value["file"], "bundle.js");
        assert_eq!(value["sourceRoot"], "");
        assert_eq!(value["sources"][0], "/a.js");
        assert_eq!(value["sourcesContent"][0], "x");
        assert_eq!(value["mappings"], "AAAA");
        assert_eq!(SourceMap::from_json(&json).unwrap().version, 3);
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(decode_mappings("A!"), Err(DecodeError::InvalidChar('!')));
        assert_eq!(decode_mappings("g"), Err(DecodeError::Truncated));
        assert_eq!(decode_mappings("AA"), Err(DecodeError::BadSegment(2)));
        assert_eq!(decode_mappings("gggggggggggggggggA"), Err(DecodeError::Overflow));
        assert_eq!(decode_mappings(";;gggggggggggggA,AAAA"), Err(DecodeError::Overflow));
        // Each segment adds 2^59 - 1 to the column; the sum leaves i64.
        let big = "+//////////f,".repeat(17);
        assert_eq!(decode_mappings(&big), Err(DecodeError::Overflow));
    }
}
