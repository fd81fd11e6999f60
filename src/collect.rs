//! Literal Collector
//!
//! First pass over a module: counts string and numeric literals in
//! expression position and decides which ones are worth hoisting.

use indexmap::IndexMap;
use oxc_ast::ast::*;
use oxc_ast_visit::{walk, Visit};
use serde::{Deserialize, Serialize};

use crate::profile::StrategyProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LiteralKind {
    String,
    Number,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    String(String),
    Number(f64),
}

impl LiteralValue {
    pub fn kind(&self) -> LiteralKind {
        match self {
            LiteralValue::String(_) => LiteralKind::String,
            LiteralValue::Number(_) => LiteralKind::Number,
        }
    }

    /// Run-wide identity of the value (kind-tagged so `"5"` and `5` differ).
    pub fn identity(&self) -> String {
        match self {
            LiteralValue::String(s) => format!("s:{}", s),
            LiteralValue::Number(n) => format!("n:{}", n),
        }
    }

    /// The value as it would be written in source.
    pub fn source_text(&self) -> String {
        match self {
            LiteralValue::String(s) => {
                serde_json::to_string(s).unwrap_or_else(|_| format!("{:?}", s))
            }
            LiteralValue::Number(n) => n.to_string(),
        }
    }

    /// Length used by the savings heuristic.
    pub fn len(&self) -> usize {
        match self {
            LiteralValue::String(s) => s.chars().count(),
            LiteralValue::Number(n) => n.to_string().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Occurrence statistics for one literal value within a module.
#[derive(Debug, Clone)]
pub struct LiteralEntry {
    pub value: LiteralValue,
    pub occurrences: usize,
    /// Span start of every occurrence
    pub sites: Vec<u32>,
    pub hoist: bool,
}

/// Literal entries keyed by [`LiteralValue::identity`], in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct LiteralTable {
    pub entries: IndexMap<String, LiteralEntry>,
}

impl LiteralTable {
    pub fn hoisted(&self) -> impl Iterator<Item = &LiteralEntry> {
        self.entries.values().filter(|e| e.hoist)
    }

    fn record(&mut self, value: LiteralValue, site: u32) {
        let entry = self
            .entries
            .entry(value.identity())
            .or_insert_with(|| LiteralEntry {
                value,
                occurrences: 0,
                sites: Vec::new(),
                hoist: false,
            });
        entry.occurrences += 1;
        entry.sites.push(site);
    }
}

/// Hoist when repeated often enough, or when the bytes saved by repeats
/// outweigh the declaration overhead.
pub fn should_hoist(entry: &LiteralEntry, profile: &StrategyProfile) -> bool {
    if entry.occurrences >= profile.min_literal_occurrences {
        return true;
    }
    let savings = entry
        .value
        .len()
        .saturating_sub(profile.literal_declaration_overhead)
        * entry.occurrences;
    savings > profile.literal_savings_threshold
}

/// Collect literal statistics and finalise hoist decisions.
pub fn collect_literals(program: &Program, profile: &StrategyProfile) -> LiteralTable {
    let mut collector = LiteralCollector {
        profile,
        table: LiteralTable::default(),
    };
    collector.visit_program(program);

    let mut table = collector.table;
    if profile.hoist_literals {
        for entry in table.entries.values_mut() {
            entry.hoist = should_hoist(entry, profile);
        }
    }
    table
}

struct LiteralCollector<'p> {
    profile: &'p StrategyProfile,
    table: LiteralTable,
}

impl<'a> Visit<'a> for LiteralCollector<'_> {
    fn visit_expression(&mut self, expr: &Expression<'a>) {
        match expr {
            Expression::StringLiteral(lit) => {
                if lit.value.chars().count() >= self.profile.min_string_length {
                    self.table
                        .record(LiteralValue::String(lit.value.to_string()), lit.span.start);
                }
            }
            Expression::NumericLiteral(lit) => {
                if lit.value.is_finite() && lit.value.abs() >= self.profile.min_number_magnitude {
                    self.table
                        .record(LiteralValue::Number(lit.value), lit.span.start);
                }
            }
            _ => {}
        }
        walk::walk_expression(self, expr);
    }

    // Keys are names, not values.
    fn visit_property_key(&mut self, _key: &PropertyKey<'a>) {}

    fn visit_ts_enum_member(&mut self, _member: &TSEnumMember<'a>) {}

    fn visit_import_expression(&mut self, _expr: &ImportExpression<'a>) {}

    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        if let Expression::Identifier(callee) = &call.callee {
            if callee.name == "require" {
                return;
            }
        }
        walk::walk_call_expression(self, call);
    }

    // A reference inside `with` could resolve to a property of the scope object.
    fn visit_with_statement(&mut self, stmt: &WithStatement<'a>) {
        self.visit_expression(&stmt.object);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{parse_program, Dialect};
    use oxc_allocator::Allocator;

    fn table_for(code: &str, profile: &StrategyProfile) -> LiteralTable {
        let allocator = Allocator::default();
        let program = parse_program(&allocator, code, Dialect::default(), "t.js").unwrap();
        collect_literals(&program, profile)
    }

    #[test]
    fn test_counts_and_sites() {
        let profile = StrategyProfile::balanced();
        let table = table_for(
            r#"show("loading-spinner"); hide("loading-spinner"); log("ok");"#,
            &profile,
        );
        let entry = &table.entries["s:loading-spinner"];
        assert_eq!(entry.occurrences, 2);
        assert_eq!(entry.sites.len(), 2);
        assert!(entry.hoist);
        // below the minimum string length
        assert!(!table.entries.contains_key("s:ok"));
    }

    #[test]
    fn test_excluded_contexts() {
        let profile = StrategyProfile::aggressive();
        let table = table_for(
            r#"
            import styles from "./styles.css";
            const lib = require("library-name");
            const lazy = import("./chunk-name.js");
            const obj = { "quoted-key": 1, [`tpl`]: 2 };
            const attr = <div className="card-body" />;
            "#,
            &profile,
        );
        for key in ["s:./styles.css", "s:library-name", "s:./chunk-name.js", "s:quoted-key", "s:card-body"] {
            assert!(!table.entries.contains_key(key), "{} should not be collected", key);
        }
    }

    #[test]
    fn test_number_magnitude_threshold() {
        let profile = StrategyProfile::balanced();
        let table = table_for("const a = 5242880, b = 42, c = -2000;", &profile);
        assert!(table.entries.contains_key("n:5242880"));
        assert!(table.entries.contains_key("n:2000"));
        assert!(!table.entries.contains_key("n:42"));
        assert!(!table.entries["n:5242880"].hoist);
    }

    #[test]
    fn test_savings_rule_hoists_long_single_literal() {
        let profile = StrategyProfile::balanced();
        let long = "x".repeat(60);
        let table = table_for(&format!("render(\"{}\");", long), &profile);
        let entry = &table.entries[&format!("s:{}", long)];
        assert_eq!(entry.occurrences, 1);
        assert!(entry.hoist);
    }

    #[test]
    fn test_hoisting_disabled() {
        let mut profile = StrategyProfile::balanced();
        profile.hoist_literals = false;
        let table = table_for(r#"a("repeated"); b("repeated");"#, &profile);
        assert_eq!(table.hoisted().count(), 0);
    }

    #[test]
    fn test_source_text() {
        assert_eq!(LiteralValue::String("say \"hi\"".into()).source_text(), r#""say \"hi\"""#);
        assert_eq!(LiteralValue::Number(5242880.0).source_text(), "5242880");
        assert_eq!(LiteralValue::Number(0.25).source_text(), "0.25");
    }
}
