//! Parse Module
//!
//! Turns raw module text into an oxc `Program` for a given dialect.
//! Malformed input never yields a partial AST.

use oxc_allocator::Allocator;
use oxc_ast::ast::Program;
use oxc_parser::Parser;
use oxc_span::SourceType;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ParseError;

// ═══════════════════════════════════════════════════════════════════════════════
// DIALECT
// ═══════════════════════════════════════════════════════════════════════════════

/// Syntax flags a module is parsed (and re-parsed) under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dialect {
    /// ES module (`import`/`export`, strict) rather than a classic script
    pub module: bool,
    /// Embedded UI markup (JSX)
    pub jsx: bool,
    /// Static type annotations (TypeScript)
    pub typescript: bool,
}

impl Default for Dialect {
    fn default() -> Self {
        Self {
            module: true,
            jsx: true,
            typescript: false,
        }
    }
}

impl Dialect {
    pub fn script() -> Self {
        Self {
            module: false,
            ..Self::default()
        }
    }

    pub fn typescript() -> Self {
        Self {
            module: true,
            jsx: false,
            typescript: true,
        }
    }

    /// Infer the dialect from a file extension.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "cjs" => Self::script(),
            "ts" | "mts" | "cts" => Self::typescript(),
            "tsx" => Self {
                jsx: true,
                ..Self::typescript()
            },
            _ => Self::default(),
        }
    }

    pub fn source_type(&self) -> SourceType {
        SourceType::default()
            .with_module(self.module)
            .with_jsx(self.jsx)
            .with_typescript(self.typescript)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARSING
// ═══════════════════════════════════════════════════════════════════════════════

/// Parse `source` into a program allocated in `allocator`.
///
/// Any diagnostic (or a parser panic) rejects the whole module.
pub fn parse_program<'a>(
    allocator: &'a Allocator,
    source: &'a str,
    dialect: Dialect,
    file: &str,
) -> Result<Program<'a>, ParseError> {
    let ret = Parser::new(allocator, source, dialect.source_type()).parse();

    if ret.panicked || !ret.errors.is_empty() {
        let mut messages: Vec<String> = ret.errors.iter().map(|e| e.to_string()).collect();
        if messages.is_empty() {
            messages.push("parser aborted".to_string());
        }
        return Err(ParseError {
            file: file.to_string(),
            messages,
        });
    }

    Ok(ret.program)
}

/// Returns true if `source` parses cleanly under `dialect`.
pub fn is_well_formed(source: &str, dialect: Dialect) -> bool {
    let allocator = Allocator::default();
    parse_program(&allocator, source, dialect, "<check>").is_ok()
}
