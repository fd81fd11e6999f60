//! Run planning.
//!
//! Workers analyse modules independently; the planner then runs once, on one
//! thread, in module-path order, so short keys come from a single set of
//! counters for the whole run. The resulting [`ModulePlan`]s are plain data
//! and can be handed back to parallel workers for rewriting.

use std::collections::{HashMap, HashSet};

use crate::classify::{IdentifierBinding, IdentifierClassifier, ModuleFacts, ShortNames};
use crate::collect::{LiteralKind, LiteralTable, LiteralValue};
use crate::profile::CompiledProfile;

/// Owned analysis of one module, produced by a worker.
#[derive(Debug, Clone, Default)]
pub struct ModuleAnalysis {
    pub facts: ModuleFacts,
    pub literals: LiteralTable,
}

/// Everything the rewrite pass needs for one module.
#[derive(Debug, Clone, Default)]
pub struct ModulePlan {
    /// Original name → short name
    pub renames: HashMap<String, String>,
    /// Literal span start → short name
    pub literal_sites: HashMap<u32, String>,
    /// Declarations to hoist, `(short name, value)`
    pub hoisted: Vec<(String, LiteralValue)>,
    /// Bindings applied in this module, in assignment order
    pub bindings: Vec<IdentifierBinding>,
}

impl ModulePlan {
    pub fn is_empty(&self) -> bool {
        self.renames.is_empty() && self.literal_sites.is_empty()
    }
}

pub struct RunPlanner<'p> {
    profile: &'p CompiledProfile,
    classifier: IdentifierClassifier<'p>,
    short_names: ShortNames,
    literal_keys: HashMap<String, String>,
}

impl<'p> RunPlanner<'p> {
    /// `analyses` must cover every module of the run so generated names can
    /// avoid everything already spelled anywhere.
    pub fn new<'m>(
        profile: &'p CompiledProfile,
        analyses: impl IntoIterator<Item = &'m ModuleAnalysis>,
    ) -> Self {
        let mut in_use = HashSet::new();
        for analysis in analyses {
            in_use.extend(analysis.facts.names_in_use.iter().cloned());
        }
        Self {
            profile,
            classifier: IdentifierClassifier::new(profile),
            short_names: ShortNames::new(in_use),
            literal_keys: HashMap::new(),
        }
    }

    pub fn plan_module(&mut self, analysis: &ModuleAnalysis) -> ModulePlan {
        let mut plan = ModulePlan::default();

        for (name, context) in &analysis.facts.first_contexts {
            if let Some(binding) =
                self.classifier
                    .bind(name, *context, &analysis.facts, &mut self.short_names)
            {
                plan.renames
                    .insert(binding.original.clone(), binding.short_name.clone());
                plan.bindings.push(binding.clone());
            }
        }

        for entry in analysis.literals.hoisted() {
            let identity = entry.value.identity();
            let key = match self.literal_keys.get(&identity) {
                Some(key) => key.clone(),
                None => {
                    let prefix = match entry.value.kind() {
                        LiteralKind::String => &self.profile.profile.string_prefix,
                        LiteralKind::Number => &self.profile.profile.number_prefix,
                    };
                    let key = self.short_names.next(prefix);
                    self.literal_keys.insert(identity, key.clone());
                    key
                }
            };
            for site in &entry.sites {
                plan.literal_sites.insert(*site, key.clone());
            }
            plan.hoisted.push((key, entry.value.clone()));
        }

        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::scan_module;
    use crate::collect::collect_literals;
    use crate::parse::{parse_program, Dialect};
    use crate::profile::StrategyProfile;
    use oxc_allocator::Allocator;

    fn analyse(code: &str, profile: &StrategyProfile) -> ModuleAnalysis {
        let allocator = Allocator::default();
        let program = parse_program(&allocator, code, Dialect::default(), "t.js").unwrap();
        ModuleAnalysis {
            facts: scan_module(&program, Dialect::default()),
            literals: collect_literals(&program, profile),
        }
    }

    #[test]
    fn test_counters_are_shared_across_modules() {
        let profile = StrategyProfile::balanced();
        let compiled = profile.compile().unwrap();
        let first = analyse("let counter = 1; counter++;", &profile);
        let second = analyse("let message = 'hello there'; let other = message;", &profile);

        let mut planner = RunPlanner::new(&compiled, [&first, &second]);
        let p1 = planner.plan_module(&first);
        let p2 = planner.plan_module(&second);

        assert_eq!(p1.renames["counter"], "v0");
        assert_eq!(p2.renames["message"], "v1");
        assert_eq!(p2.renames["other"], "v2");
    }

    #[test]
    fn test_same_name_gets_same_key_in_every_module() {
        let profile = StrategyProfile::balanced();
        let compiled = profile.compile().unwrap();
        let first = analyse("let total = 1; log(total);", &profile);
        let second = analyse("function sum(total) { return total; }", &profile);

        let mut planner = RunPlanner::new(&compiled, [&first, &second]);
        let p1 = planner.plan_module(&first);
        let p2 = planner.plan_module(&second);
        assert_eq!(p1.renames["total"], p2.renames["total"]);
    }

    #[test]
    fn test_literal_keys_shared_per_value() {
        let profile = StrategyProfile::balanced();
        let compiled = profile.compile().unwrap();
        let first = analyse(r#"a("shared-value"); b("shared-value");"#, &profile);
        let second = analyse(r#"c("shared-value"); d("shared-value");"#, &profile);

        let mut planner = RunPlanner::new(&compiled, [&first, &second]);
        let p1 = planner.plan_module(&first);
        let p2 = planner.plan_module(&second);
        assert_eq!(p1.hoisted[0].0, "s0");
        assert_eq!(p2.hoisted[0].0, "s0");
        assert_eq!(p1.literal_sites.len(), 2);
    }

    #[test]
    fn test_generated_names_avoid_existing_spellings() {
        let profile = StrategyProfile::balanced();
        let compiled = profile.compile().unwrap();
        let module = analyse("let v0 = 1; let counter = v0 + 1; log(counter);", &profile);
        let mut planner = RunPlanner::new(&compiled, [&module]);
        let plan = planner.plan_module(&module);
        assert_eq!(plan.renames["counter"], "v1");
        assert!(!plan.renames.contains_key("v0"));
    }
}
