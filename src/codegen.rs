//! Code Generator
//!
//! Serializes a (rewritten) program to compact source text with no comments
//! and no incidental whitespace, optionally with a JSON position map.

use oxc_ast::ast::Program;
use oxc_codegen::{Codegen, CodegenOptions};
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedCode {
    pub code: String,
    /// Source map JSON, when requested and produced
    pub position_map: Option<String>,
}

pub fn generate(program: &Program, map_source: Option<&Path>) -> GeneratedCode {
    let options = CodegenOptions {
        source_map_path: map_source.map(Path::to_path_buf),
        ..CodegenOptions::minify()
    };
    let ret = Codegen::new().with_options(options).build(program);
    GeneratedCode {
        code: ret.code,
        position_map: ret.map.map(|map| map.to_json_string()),
    }
}
