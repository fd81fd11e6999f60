//! Manifest Builder
//!
//! The manifest is the reversal record of a run: every short key and what it
//! stood for, grouped by category (identifiers) or kind (literals), plus size
//! accounting. Keys keep their assignment order on disk.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::classify::IdentifierBinding;
use crate::collect::LiteralValue;
use crate::error::{MinifyError, Result};

pub const MANIFEST_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestStats {
    pub total_optimizations: usize,
    pub original_size: usize,
    pub optimized_size: usize,
    pub reduction_percent: f64,
}

/// Per-module accounting for directory runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleRecord {
    pub path: String,
    /// SHA-256 of the original text
    pub source_hash: String,
    pub original_size: usize,
    pub optimized_size: usize,
    pub substitutions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub version: String,
    pub timestamp: String,
    /// category → { short key → original name }
    pub categories: IndexMap<String, IndexMap<String, String>>,
    pub strings: IndexMap<String, String>,
    pub numbers: IndexMap<String, serde_json::Number>,
    pub stats: ManifestStats,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<ModuleRecord>,
}

/// Percentage of bytes removed, `0.0` for empty input.
pub fn reduction_percent(original_size: usize, optimized_size: usize) -> f64 {
    if original_size == 0 {
        return 0.0;
    }
    (original_size as f64 - optimized_size as f64) / original_size as f64 * 100.0
}

/// JSON number for a literal value; integral values stay integers.
pub fn json_number(value: f64) -> Option<serde_json::Number> {
    if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
        Some(serde_json::Number::from(value as i64))
    } else {
        serde_json::Number::from_f64(value)
    }
}

impl Manifest {
    pub fn new(timestamp: impl Into<String>) -> Self {
        Self {
            version: MANIFEST_VERSION.to_string(),
            timestamp: timestamp.into(),
            categories: IndexMap::new(),
            strings: IndexMap::new(),
            numbers: IndexMap::new(),
            stats: ManifestStats::default(),
            modules: Vec::new(),
        }
    }

    /// Number of recorded keys across all tables.
    pub fn entry_count(&self) -> usize {
        self.categories.values().map(IndexMap::len).sum::<usize>()
            + self.strings.len()
            + self.numbers.len()
    }

    /// Every `(key, original)` pair, in table order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, String)> + '_ {
        let identifiers = self
            .categories
            .values()
            .flat_map(|table| table.iter().map(|(k, v)| (k.as_str(), v.clone())));
        let strings = self.strings.iter().map(|(k, v)| (k.as_str(), v.clone()));
        let numbers = self.numbers.iter().map(|(k, v)| (k.as_str(), v.to_string()));
        identifiers.chain(strings).chain(numbers)
    }

    /// Fail if any key resolves to two different originals.
    ///
    /// Keys are checked across categories as well: reverse translation works
    /// on bare tokens and cannot tell categories apart.
    pub fn verify_invertible(&self) -> Result<()> {
        let mut seen: HashMap<&str, String> = HashMap::new();
        for (key, original) in self.entries() {
            if let Some(first) = seen.get(key) {
                if *first != original {
                    return Err(MinifyError::NonInvertible {
                        key: key.to_string(),
                        first: first.clone(),
                        second: original,
                    });
                }
                continue;
            }
            seen.insert(key, original);
        }
        Ok(())
    }

    /// Fold a module-level manifest into this run-level one.
    pub fn merge(&mut self, other: &Manifest) -> Result<()> {
        for (category, table) in &other.categories {
            let target = self.categories.entry(category.clone()).or_default();
            for (key, original) in table {
                insert_checked(target, key, original.clone())?;
            }
        }
        for (key, value) in &other.strings {
            insert_checked(&mut self.strings, key, value.clone())?;
        }
        for (key, value) in &other.numbers {
            insert_checked(&mut self.numbers, key, value.clone())?;
        }

        self.stats.total_optimizations += other.stats.total_optimizations;
        self.stats.original_size += other.stats.original_size;
        self.stats.optimized_size += other.stats.optimized_size;
        self.stats.reduction_percent =
            reduction_percent(self.stats.original_size, self.stats.optimized_size);
        self.modules.extend(other.modules.iter().cloned());

        self.verify_invertible()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|e| MinifyError::io(path, e))?;
        Self::from_json_str(&data)
    }

    /// Serialized size in bytes, as written to disk.
    pub fn byte_size(&self) -> Result<usize> {
        Ok(self.to_json()?.len())
    }
}

fn insert_checked<V: Clone + PartialEq + ToString>(
    table: &mut IndexMap<String, V>,
    key: &str,
    value: V,
) -> Result<()> {
    match table.get(key) {
        Some(existing) if *existing != value => Err(MinifyError::NonInvertible {
            key: key.to_string(),
            first: existing.to_string(),
            second: value.to_string(),
        }),
        Some(_) => Ok(()),
        None => {
            table.insert(key.to_string(), value);
            Ok(())
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BUILDER
// ═══════════════════════════════════════════════════════════════════════════════

/// Accumulates one module's substitutions.
pub struct ManifestBuilder {
    manifest: Manifest,
}

impl ManifestBuilder {
    pub fn new(timestamp: &str) -> Self {
        Self {
            manifest: Manifest::new(timestamp),
        }
    }

    pub fn record_binding(&mut self, binding: &IdentifierBinding) -> Result<()> {
        let table = self
            .manifest
            .categories
            .entry(binding.category.clone())
            .or_default();
        insert_checked(table, &binding.short_name, binding.original.clone())
    }

    pub fn record_literal(&mut self, key: &str, value: &LiteralValue) -> Result<()> {
        match value {
            LiteralValue::String(s) => insert_checked(&mut self.manifest.strings, key, s.clone()),
            LiteralValue::Number(n) => match json_number(*n) {
                Some(number) => insert_checked(&mut self.manifest.numbers, key, number),
                None => Ok(()),
            },
        }
    }

    pub fn record_module(&mut self, record: ModuleRecord) {
        self.manifest.modules.push(record);
    }

    pub fn finish(mut self, original_size: usize, optimized_size: usize, substitutions: usize) -> Manifest {
        self.manifest.stats = ManifestStats {
            total_optimizations: substitutions,
            original_size,
            optimized_size,
            reduction_percent: reduction_percent(original_size, optimized_size),
        };
        self.manifest
    }
}
