//! End-to-end scenarios for the optimization pipeline and reverse translation.

#[cfg(test)]
mod tests {
    use crate::manifest::Manifest;
    use crate::orchestrator::{OptimizationOutcome, Optimizer};
    use crate::parse::Dialect;
    use crate::profile::StrategyProfile;
    use crate::translate::ReverseTranslator;
    use crate::validate::Validator;

    const COMPONENT: &str = r#"
import { useState } from "react";

export default function UserProfile(props) {
  const [count, setCount] = useState(0);
  return (
    <div className="profile" onClick={() => setCount(count + 1)}>
      {props.name}: {count}
    </div>
  );
}
"#;

    fn run(source: &str, profile: StrategyProfile) -> OptimizationOutcome {
        Optimizer::new(profile)
            .with_timestamp("2026-01-01T00:00:00Z")
            .optimize_source("bundle.jsx", source, Dialect::default())
            .unwrap()
    }

    fn category<'m>(manifest: &'m Manifest, name: &str, key: &str) -> Option<&'m str> {
        manifest
            .categories
            .get(name)
            .and_then(|table| table.get(key))
            .map(String::as_str)
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Identifier renaming
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_component_props_and_locals_are_renamed() {
        let outcome = run(COMPONENT, StrategyProfile::balanced());
        assert!(outcome.is_optimized(), "{:?}", outcome.report());

        let manifest = outcome.manifest().unwrap();
        assert_eq!(category(manifest, "component", "c0"), Some("UserProfile"));
        assert_eq!(category(manifest, "argument", "a0"), Some("props"));
        assert_eq!(category(manifest, "variable", "v0"), Some("count"));
        assert_eq!(category(manifest, "variable", "v1"), Some("setCount"));

        let code = outcome.optimized_text().unwrap();
        assert!(code.contains("function c0(a0)"));
        assert!(code.contains("useState(0)"));
        assert!(code.contains("a0.name"));
        assert!(!code.contains("props"));
        assert!(!code.contains("setCount"));
    }

    #[test]
    fn test_protected_hook_never_enters_manifest() {
        let outcome = run(COMPONENT, StrategyProfile::balanced());
        let manifest = outcome.manifest().unwrap();
        assert!(manifest.entries().all(|(_, original)| original != "useState"));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Literal hoisting
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_repeated_string_is_hoisted() {
        let source = r#"
export function showSpinner(el) { el.classList.add("loading-spinner"); }
export function hideSpinner(el) { el.classList.remove("loading-spinner"); }
export const spinnerSelector = "." + "loading-spinner";
"#;
        let outcome = run(source, StrategyProfile::balanced());
        assert!(outcome.is_optimized(), "{:?}", outcome.report());

        let manifest = outcome.manifest().unwrap();
        assert_eq!(manifest.strings.get("s0").map(String::as_str), Some("loading-spinner"));

        let code = outcome.optimized_text().unwrap();
        assert_eq!(code.matches("loading-spinner").count(), 1);
        // one declaration plus three references
        assert_eq!(code.matches("s0").count(), 4);
        let decl = code.find("s0=").unwrap();
        let first_export = code.find("export").unwrap();
        assert!(decl < first_export);
    }

    #[test]
    fn test_single_large_number_stays_inline() {
        let source = "export const MAX_UPLOAD = 5242880;\n";
        let outcome = run(source, StrategyProfile::balanced());
        assert!(outcome.is_optimized(), "{:?}", outcome.report());

        let manifest = outcome.manifest().unwrap();
        assert!(manifest.numbers.is_empty());
        assert!(outcome.optimized_text().unwrap().contains("5242880"));
        // nothing substituted: reported, not rejected
        assert!(!outcome.report().warnings.is_empty());
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Validation
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_mutated_output_missing_critical_pattern_is_rejected() {
        let mut profile = StrategyProfile::balanced();
        profile.critical_patterns = vec![r"useState\(".to_string()];
        let outcome = run(COMPONENT, profile.clone());
        assert!(outcome.is_optimized(), "{:?}", outcome.report());

        let mutated = outcome.optimized_text().unwrap().replace("useState(", "useMemo(");
        let compiled = profile.compile().unwrap();
        let report = Validator::new(&compiled).validate(
            COMPONENT,
            &mutated,
            outcome.manifest().unwrap(),
            Dialect::default(),
        );
        assert!(!report.passed());
        assert!(report
            .issues
            .iter()
            .any(|issue| issue.contains("Critical pattern missing")));
    }

    #[test]
    fn test_renaming_away_a_critical_name_rejects_the_run() {
        let mut profile = StrategyProfile::balanced();
        profile.critical_patterns = vec![r"\bsessionToken\b".to_string()];
        let source = "let sessionToken = read(); send(sessionToken);";
        let outcome = run(source, profile);

        match &outcome {
            OptimizationOutcome::Rejected { originals, report } => {
                assert_eq!(originals[0].text, source);
                assert!(!report.success);
                assert!(report.issues.iter().any(|i| i.contains("Critical pattern missing")));
            }
            OptimizationOutcome::Optimized { .. } => panic!("run should have been rejected"),
        }
        assert_eq!(outcome.exit_code(), 1);
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Reverse translation
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_error_translation_with_suggestion() {
        let mut manifest = Manifest::new("t");
        manifest
            .categories
            .entry("argument".to_string())
            .or_default()
            .insert("a0".to_string(), "UserProfile".to_string());

        let translator = ReverseTranslator::from_manifest(&manifest);
        let result = translator.translate_error("a0 is not a function", None);

        assert_eq!(result.translated_message, "UserProfile is not a function");
        assert!(result
            .suggestions
            .iter()
            .any(|s| s.contains("function is missing or incorrectly defined")));
    }

    #[test]
    fn test_optimized_component_translates_back() {
        let outcome = run(COMPONENT, StrategyProfile::balanced());
        let translator = ReverseTranslator::from_manifest(outcome.manifest().unwrap());
        let restored = translator.translate_code(outcome.optimized_text().unwrap());
        assert!(restored.contains("function UserProfile(props)"));
        assert!(restored.contains("props.name"));
        assert!(restored.contains("setCount(count + 1)") || restored.contains("setCount(count+1)"));
    }
}
