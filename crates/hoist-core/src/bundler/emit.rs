//! Bundle emission.
//!
//! Modules print in parallel, then concatenate in dependency order. Each
//! module starts on a fresh line, so its mappings only need their line
//! shifted by the number of lines already written.

use super::graph::{ModuleGraph, ModuleId};
use super::link::Wrapper;
use super::sourcemap::{SourceMap, SourceMapBuilder};
use hoist_parser::{Ast, Codegen, CodegenOptions, SourceMapping};
use rayon::prelude::*;
use tracing::trace;

/// Emitted bundle text and, when requested, its source map.
#[derive(Debug)]
pub struct Emitted {
    pub code: String,
    pub map: Option<SourceMap>,
}

/// Options for [`emit`].
#[derive(Debug, Clone, Default)]
pub struct EmitOptions {
    pub minify: bool,
    pub sourcemap: bool,
    /// The map's `file` field.
    pub file: Option<String>,
}

/// Print `order` between the wrapper's prelude and epilogue.
#[must_use]
pub fn emit(graph: &ModuleGraph, order: &[ModuleId], wrapper: &Wrapper, options: &EmitOptions) -> Emitted {
    let codegen = CodegenOptions {
        minify: options.minify,
        source_map: options.sourcemap,
    };
    let printed: Vec<(ModuleId, String, Vec<SourceMapping>)> = order
        .par_iter()
        .map(|&module| {
            let (code, mappings) = Codegen::new(&graph.module(module).ast, codegen.clone()).generate_with_source_map();
            (module, code, mappings)
        })
        .collect();

    let mut code = String::new();
    let mut lines = 0u32;
    let mut builder = options.sourcemap.then(|| SourceMapBuilder::new(options.file.clone()));

    append(&mut code, &mut lines, &print_wrapper(&wrapper.prelude, &codegen));
    for (module, text, mappings) in &printed {
        if let Some(builder) = builder.as_mut() {
            let record = graph.module(*module);
            for mapping in mappings {
                builder.add(*module, &record.path, &record.ast.source, mapping, lines);
            }
        }
        trace!(module, bytes = text.len(), "emitted module");
        append(&mut code, &mut lines, text);
    }
    append(&mut code, &mut lines, &print_wrapper(&wrapper.epilogue, &codegen));

    Emitted {
        code,
        map: builder.map(SourceMapBuilder::build),
    }
}

fn print_wrapper(ast: &Ast, codegen: &CodegenOptions) -> String {
    Codegen::new(
        ast,
        CodegenOptions {
            source_map: false,
            ..codegen.clone()
        },
    )
    .generate()
}

/// Append one chunk, ending it with a newline.
fn append(code: &mut String, lines: &mut u32, chunk: &str) {
    if chunk.is_empty() {
        return;
    }
    code.push_str(chunk);
    if !chunk.ends_with('\n') {
        code.push('\n');
    }
    *lines += chunk.lines().count() as u32;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_counts_lines() {
        let mut code = String::new();
        let mut lines = 0;
        append(&mut code, &mut lines, "a;\nb;\n");
        append(&mut code, &mut lines, "c;d;");
        append(&mut code, &mut lines, "");
        assert_eq!(code, "a;\nb;\nc;d;\n");
        assert_eq!(lines, 3);
    }
}
