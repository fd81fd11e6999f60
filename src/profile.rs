//! Strategy profiles.
//!
//! A profile is a bundle of numeric and set-valued knobs. The pipeline never
//! branches on which profile is active; `conservative`, `balanced` and
//! `aggressive` only differ in the values below.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::classify::SyntacticContext;
use crate::error::{MinifyError, Result};
use crate::scope::{is_builtin_protected, RESERVED_WORDS};

// ═══════════════════════════════════════════════════════════════════════════════
// CATEGORY RULES
// ═══════════════════════════════════════════════════════════════════════════════

/// One row of the ordered category table: pattern → category → prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRule {
    pub name: String,
    pub prefix: String,
    /// Regex matched against the original name
    pub pattern: String,
    /// Restrict the rule to these first-occurrence contexts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contexts: Option<Vec<SyntacticContext>>,
    /// Only names at least this long match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
}

impl CategoryRule {
    pub fn new(name: &str, prefix: &str, pattern: &str) -> Self {
        Self {
            name: name.to_string(),
            prefix: prefix.to_string(),
            pattern: pattern.to_string(),
            contexts: None,
            min_length: None,
        }
    }

    pub fn in_contexts(mut self, contexts: &[SyntacticContext]) -> Self {
        self.contexts = Some(contexts.to_vec());
        self
    }

    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.min_length = Some(min_length);
        self
    }
}

/// The default table: components, hooks, arguments, functions, utilities,
/// long names, then the catch-all variable category.
pub fn default_category_rules() -> Vec<CategoryRule> {
    vec![
        CategoryRule::new("component", "c", r"^[A-Z][A-Za-z0-9]*$"),
        CategoryRule::new("hook", "h", r"^use[A-Z][A-Za-z0-9_]*$"),
        CategoryRule::new("argument", "a", r".").in_contexts(&[SyntacticContext::Parameter]),
        CategoryRule::new(
            "function",
            "f",
            r"^(handle|on|get|fetch|load|render|create|update|toggle|compute|format|parse|validate|build|init)[A-Z0-9_]",
        ),
        CategoryRule::new(
            "utility",
            "u",
            r"^(is|has|can|should|to|from)[A-Z]|(Util|Utils|Helper|Helpers)$",
        ),
        CategoryRule::new("long", "l", r".").with_min_length(16),
        CategoryRule::new("variable", "v", r"."),
    ]
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROFILE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StrategyProfile {
    pub name: String,

    // Identifier renaming
    pub rename_identifiers: bool,
    pub min_identifier_length: usize,
    pub protected_names: Vec<String>,
    pub category_rules: Vec<CategoryRule>,

    // Literal hoisting
    pub hoist_literals: bool,
    pub min_string_length: usize,
    pub min_number_magnitude: f64,
    pub min_literal_occurrences: usize,
    /// Bytes a hoisted binding costs in the declaration block
    pub literal_declaration_overhead: usize,
    /// `(length - overhead) * occurrences` must exceed this to hoist
    pub literal_savings_threshold: usize,
    pub string_prefix: String,
    pub number_prefix: String,

    // Validation bounds
    pub max_reduction_percent: f64,
    pub low_reduction_warning_percent: f64,
    pub max_manifest_bytes: usize,
    pub critical_patterns: Vec<String>,
}

impl Default for StrategyProfile {
    fn default() -> Self {
        Self::balanced()
    }
}

impl StrategyProfile {
    pub fn balanced() -> Self {
        Self {
            name: "balanced".to_string(),
            rename_identifiers: true,
            min_identifier_length: 3,
            protected_names: Vec::new(),
            category_rules: default_category_rules(),
            hoist_literals: true,
            min_string_length: 5,
            min_number_magnitude: 1000.0,
            min_literal_occurrences: 2,
            literal_declaration_overhead: 6,
            literal_savings_threshold: 40,
            string_prefix: "s".to_string(),
            number_prefix: "n".to_string(),
            max_reduction_percent: 70.0,
            low_reduction_warning_percent: 1.0,
            max_manifest_bytes: 2 * 1024 * 1024,
            critical_patterns: Vec::new(),
        }
    }

    pub fn conservative() -> Self {
        Self {
            name: "conservative".to_string(),
            min_identifier_length: 4,
            min_string_length: 8,
            min_number_magnitude: 10_000.0,
            min_literal_occurrences: 3,
            literal_declaration_overhead: 8,
            literal_savings_threshold: 80,
            max_reduction_percent: 50.0,
            max_manifest_bytes: 1024 * 1024,
            ..Self::balanced()
        }
    }

    pub fn aggressive() -> Self {
        Self {
            name: "aggressive".to_string(),
            min_identifier_length: 2,
            min_string_length: 3,
            min_number_magnitude: 100.0,
            literal_declaration_overhead: 4,
            literal_savings_threshold: 20,
            max_reduction_percent: 85.0,
            max_manifest_bytes: 8 * 1024 * 1024,
            ..Self::balanced()
        }
    }

    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "conservative" => Some(Self::conservative()),
            "balanced" | "default" => Some(Self::balanced()),
            "aggressive" => Some(Self::aggressive()),
            _ => None,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| MinifyError::Profile(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|e| MinifyError::io(path, e))?;
        Self::from_json_str(&data)
    }

    /// Check the knobs and compile patterns once.
    pub fn compile(&self) -> Result<CompiledProfile> {
        if !(self.max_reduction_percent > 0.0 && self.max_reduction_percent <= 100.0) {
            return Err(MinifyError::Profile(format!(
                "maxReductionPercent must be in (0, 100], got {}",
                self.max_reduction_percent
            )));
        }
        if self.min_literal_occurrences == 0 {
            return Err(MinifyError::Profile(
                "minLiteralOccurrences must be at least 1".to_string(),
            ));
        }

        let mut prefixes = vec![self.string_prefix.as_str(), self.number_prefix.as_str()];
        prefixes.extend(self.category_rules.iter().map(|r| r.prefix.as_str()));
        for prefix in prefixes {
            if !is_valid_prefix(prefix) {
                return Err(MinifyError::Profile(format!(
                    "`{}` is not a usable short-name prefix",
                    prefix
                )));
            }
        }

        let mut rules = Vec::with_capacity(self.category_rules.len());
        for rule in &self.category_rules {
            let regex = Regex::new(&rule.pattern).map_err(|e| {
                MinifyError::Profile(format!("category `{}`: {}", rule.name, e))
            })?;
            rules.push(CompiledRule {
                rule: rule.clone(),
                regex,
            });
        }

        let mut critical_patterns = Vec::with_capacity(self.critical_patterns.len());
        for pattern in &self.critical_patterns {
            let regex = Regex::new(pattern)
                .map_err(|e| MinifyError::Profile(format!("critical pattern `{}`: {}", pattern, e)))?;
            critical_patterns.push(regex);
        }

        Ok(CompiledProfile {
            profile: self.clone(),
            rules,
            whitelist: self.protected_names.iter().cloned().collect(),
            critical_patterns,
        })
    }
}

fn is_valid_prefix(prefix: &str) -> bool {
    let mut chars = prefix.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        && !RESERVED_WORDS.contains(prefix)
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILED PROFILE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub rule: CategoryRule,
    pub regex: Regex,
}

impl CompiledRule {
    pub fn matches(&self, name: &str, context: SyntacticContext) -> bool {
        if let Some(contexts) = &self.rule.contexts {
            if !contexts.contains(&context) {
                return false;
            }
        }
        if let Some(min) = self.rule.min_length {
            if name.chars().count() < min {
                return false;
            }
        }
        self.regex.is_match(name)
    }
}

/// A validated profile with its regexes built.
#[derive(Debug, Clone)]
pub struct CompiledProfile {
    pub profile: StrategyProfile,
    pub rules: Vec<CompiledRule>,
    pub whitelist: HashSet<String>,
    pub critical_patterns: Vec<Regex>,
}

impl CompiledProfile {
    pub fn is_protected(&self, name: &str) -> bool {
        is_builtin_protected(name) || self.whitelist.contains(name)
    }

    /// First rule (in table order) that claims `name`.
    pub fn categorize(&self, name: &str, context: SyntacticContext) -> Option<&CompiledRule> {
        self.rules.iter().find(|r| r.matches(name, context))
    }
}
