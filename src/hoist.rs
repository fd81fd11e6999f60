//! Literal Hoister
//!
//! Builds the single declaration block for hoisted literals and places it at
//! the top of the module body (after directives, before every statement).

use oxc_allocator::Allocator;
use oxc_ast::ast::Program;
use oxc_ast::AstBuilder;
use std::cmp::Ordering;

use crate::collect::LiteralValue;
use crate::error::ParseError;
use crate::parse::{parse_program, Dialect};

/// `s10` sorts after `s9`.
pub fn compare_keys(a: &str, b: &str) -> Ordering {
    fn split(key: &str) -> (&str, Option<u64>) {
        let digits_at = key
            .char_indices()
            .rev()
            .take_while(|(_, c)| c.is_ascii_digit())
            .last()
            .map(|(i, _)| i)
            .unwrap_or(key.len());
        let (prefix, digits) = key.split_at(digits_at);
        (prefix, digits.parse().ok())
    }
    let (pa, na) = split(a);
    let (pb, nb) = split(b);
    pa.cmp(pb).then(na.cmp(&nb)).then(a.cmp(b))
}

/// Declaration text for `hoisted`, ascending by key.
///
/// Classic scripts get `var` so separate scripts sharing a key never clash on
/// a global lexical binding.
pub fn declaration_source(hoisted: &[(String, LiteralValue)], dialect: Dialect) -> Option<String> {
    if hoisted.is_empty() {
        return None;
    }
    let mut sorted: Vec<&(String, LiteralValue)> = hoisted.iter().collect();
    sorted.sort_by(|a, b| compare_keys(&a.0, &b.0));
    sorted.dedup_by(|a, b| a.0 == b.0);

    let bindings: Vec<String> = sorted
        .iter()
        .map(|(key, value)| format!("{}={}", key, value.source_text()))
        .collect();
    let keyword = if dialect.module { "const" } else { "var" };
    Some(format!("{} {};", keyword, bindings.join(",")))
}

/// Insert the hoisted declaration block at index 0 of `program.body`.
pub fn hoist_literals<'a>(
    allocator: &'a Allocator,
    program: &mut Program<'a>,
    hoisted: &[(String, LiteralValue)],
    dialect: Dialect,
) -> Result<(), ParseError> {
    let Some(source) = declaration_source(hoisted, dialect) else {
        return Ok(());
    };
    let source: &'a str = allocator.alloc_str(&source);
    let declaration = parse_program(allocator, source, dialect, "<hoisted literals>")?;

    let ast = AstBuilder::new(allocator);
    let mut body = ast.vec();
    for stmt in declaration.body.into_iter() {
        body.push(stmt);
    }
    let original = std::mem::replace(&mut program.body, ast.vec());
    for stmt in original.into_iter() {
        body.push(stmt);
    }
    program.body = body;
    Ok(())
}
