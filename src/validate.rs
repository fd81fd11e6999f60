//! Validator
//!
//! The gate between a rewrite and the disk. Issues reject the run; warnings
//! are reported but never block a commit.

use serde::{Deserialize, Serialize};

use crate::manifest::{reduction_percent, Manifest};
use crate::parse::{parse_program, Dialect};
use crate::profile::CompiledProfile;
use crate::scope::semantic_errors;
use oxc_allocator::Allocator;

// ═══════════════════════════════════════════════════════════════════════════════
// CHECK CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const VAL_REDUCTION_CEILING: &str = "VAL001";
pub const VAL_MANIFEST_SIZE: &str = "VAL002";
pub const VAL_CRITICAL_PATTERN: &str = "VAL003";
pub const VAL_REPARSE: &str = "VAL004";
pub const VAL_SEMANTIC: &str = "VAL005";
pub const VAL_NON_INVERTIBLE: &str = "VAL006";

pub const WARN_LOW_REDUCTION: &str = "WARN001";
pub const WARN_OUTPUT_GREW: &str = "WARN002";
pub const WARN_NO_SUBSTITUTIONS: &str = "WARN003";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
    pub reduction_percent: f64,
    pub original_size: usize,
    pub optimized_size: usize,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.issues.is_empty()
    }

    fn issue(&mut self, code: &str, message: String) {
        self.issues.push(format!("[{}] {}", code, message));
    }

    fn warn(&mut self, code: &str, message: String) {
        self.warnings.push(format!("[{}] {}", code, message));
    }

    /// Fold a module report into a run report, labelling its findings.
    pub fn absorb(&mut self, label: &str, other: ValidationReport) {
        self.issues
            .extend(other.issues.into_iter().map(|i| format!("{}: {}", label, i)));
        self.warnings
            .extend(other.warnings.into_iter().map(|w| format!("{}: {}", label, w)));
        self.original_size += other.original_size;
        self.optimized_size += other.optimized_size;
        self.reduction_percent = reduction_percent(self.original_size, self.optimized_size);
    }
}

pub struct Validator<'p> {
    profile: &'p CompiledProfile,
}

impl<'p> Validator<'p> {
    pub fn new(profile: &'p CompiledProfile) -> Self {
        Self { profile }
    }

    /// Check one module's rewrite.
    pub fn validate(
        &self,
        original: &str,
        optimized: &str,
        manifest: &Manifest,
        dialect: Dialect,
    ) -> ValidationReport {
        let knobs = &self.profile.profile;
        let mut report = ValidationReport {
            original_size: original.len(),
            optimized_size: optimized.len(),
            reduction_percent: reduction_percent(original.len(), optimized.len()),
            ..Default::default()
        };

        // 1. Reduction ceiling
        if report.reduction_percent > knobs.max_reduction_percent {
            report.issue(
                VAL_REDUCTION_CEILING,
                format!(
                    "Reduction of {:.1}% exceeds the ceiling of {:.1}%",
                    report.reduction_percent, knobs.max_reduction_percent
                ),
            );
        } else if report.reduction_percent < 0.0 {
            report.warn(
                WARN_OUTPUT_GREW,
                format!(
                    "Optimized output is larger than the original ({} > {} bytes)",
                    report.optimized_size, report.original_size
                ),
            );
        } else if report.reduction_percent < knobs.low_reduction_warning_percent {
            report.warn(
                WARN_LOW_REDUCTION,
                format!("Unusually low reduction of {:.2}%", report.reduction_percent),
            );
        }

        // 2. Manifest size
        match manifest.byte_size() {
            Ok(size) if size > knobs.max_manifest_bytes => report.issue(
                VAL_MANIFEST_SIZE,
                format!(
                    "Manifest size of {} bytes exceeds the ceiling of {} bytes",
                    size, knobs.max_manifest_bytes
                ),
            ),
            Ok(_) => {}
            Err(e) => report.issue(VAL_MANIFEST_SIZE, format!("Manifest could not be serialized: {}", e)),
        }
        if let Err(e) = manifest.verify_invertible() {
            report.issue(VAL_NON_INVERTIBLE, e.to_string());
        }

        // 3. Critical patterns
        for pattern in &self.profile.critical_patterns {
            if pattern.is_match(optimized) {
                continue;
            }
            let note = if pattern.is_match(original) {
                ""
            } else {
                " (the original does not match it either)"
            };
            report.issue(
                VAL_CRITICAL_PATTERN,
                format!("Critical pattern missing from optimized output: {}{}", pattern.as_str(), note),
            );
        }

        // 4. Re-parse under the same dialect
        let allocator = Allocator::default();
        match parse_program(&allocator, optimized, dialect, "<optimized>") {
            Ok(program) => {
                for error in semantic_errors(&program) {
                    report.issue(VAL_SEMANTIC, format!("Optimized output is semantically invalid: {}", error));
                }
            }
            Err(e) => report.issue(VAL_REPARSE, format!("Optimized output failed to re-parse: {}", e)),
        }

        report
    }

    /// Warning for a run that changed nothing.
    pub fn check_substitutions(&self, report: &mut ValidationReport, substitutions: usize) {
        if substitutions == 0 {
            report.warn(
                WARN_NO_SUBSTITUTIONS,
                "No identifiers or literals were substituted".to_string(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::StrategyProfile;

    fn validator_report(profile: StrategyProfile, original: &str, optimized: &str) -> ValidationReport {
        let compiled = profile.compile().unwrap();
        let validator = Validator::new(&compiled);
        validator.validate(original, optimized, &Manifest::new("t"), Dialect::default())
    }

    #[test]
    fn test_passing_report() {
        let report = validator_report(
            StrategyProfile::balanced(),
            "const someCounter = 1; log(someCounter);",
            "const v0=1;log(v0);",
        );
        assert!(report.passed(), "{:?}", report.issues);
        assert!(report.reduction_percent > 0.0);
    }

    #[test]
    fn test_reduction_ceiling() {
        let mut profile = StrategyProfile::balanced();
        profile.max_reduction_percent = 10.0;
        let report = validator_report(
            profile,
            "const someCounter = 1; log(someCounter);",
            "const v0=1;log(v0);",
        );
        assert!(!report.passed());
        assert!(report.issues[0].contains(VAL_REDUCTION_CEILING));
    }

    #[test]
    fn test_critical_pattern_missing() {
        let mut profile = StrategyProfile::balanced();
        profile.critical_patterns = vec![r"useState\(".to_string(), r"neverPresent".to_string()];
        let report = validator_report(
            profile,
            "const [value, setValue] = useState(0);",
            "const [v0,v1]=0;",
        );
        assert!(report
            .issues
            .iter()
            .any(|i| i.contains("Critical pattern missing") && i.contains("useState")));
        assert!(report
            .issues
            .iter()
            .any(|i| i.contains("neverPresent") && i.contains("does not match it either")));
    }

    #[test]
    fn test_required_pattern_absent_everywhere_rejects() {
        let mut profile = StrategyProfile::balanced();
        profile.critical_patterns = vec![r"createRoot\(".to_string()];
        let report = validator_report(profile, "let someValue = 1;", "let v0=1;");
        assert!(!report.passed());
        assert!(report.issues[0].contains(VAL_CRITICAL_PATTERN));
    }

    #[test]
    fn test_reparse_failure() {
        let report = validator_report(StrategyProfile::balanced(), "const value = 1;", "const =1;");
        assert!(report.issues.iter().any(|i| i.contains(VAL_REPARSE)));
    }

    #[test]
    fn test_semantic_failure() {
        let report = validator_report(
            StrategyProfile::balanced(),
            "let first = 1; let second = 2;",
            "let v0=1;let v0=2;",
        );
        assert!(!report.passed());
    }

    #[test]
    fn test_manifest_ceiling() {
        let mut profile = StrategyProfile::balanced();
        profile.max_manifest_bytes = 10;
        let report = validator_report(profile, "const value = 1;", "const value=1;");
        assert!(report.issues.iter().any(|i| i.contains(VAL_MANIFEST_SIZE)));
    }

    #[test]
    fn test_growth_is_a_warning() {
        let report = validator_report(StrategyProfile::balanced(), "let a=1;", "let a = 1 ;");
        assert!(report.passed());
        assert!(report.warnings.iter().any(|w| w.contains(WARN_OUTPUT_GREW)));
    }
}
