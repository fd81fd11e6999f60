//! Identifier Classifier
//!
//! Two halves:
//! - [`scan_module`] walks a parsed module once and records, for every name,
//!   the syntactic context of its **first** occurrence plus the module-wide
//!   facts that can veto renaming (pinned names, dynamic scope, markup tags).
//! - [`IdentifierClassifier`] turns those facts into eligibility verdicts and
//!   memoised [`IdentifierBinding`]s.
//!
//! Classification is total: every name either gets a binding or a
//! [`KeepReason`]. It never fails.

use indexmap::IndexMap;
use oxc_ast::ast::*;
use oxc_ast_visit::{walk, Visit};
use oxc_syntax::scope::ScopeFlags;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::parse::Dialect;
use crate::profile::{CompiledProfile, CompiledRule};
use crate::scope::{
    collect_binding_names, declared_names, is_builtin_protected, unresolved_references,
};

// ═══════════════════════════════════════════════════════════════════════════════
// SYNTACTIC CONTEXT
// ═══════════════════════════════════════════════════════════════════════════════

/// Where an identifier occurrence sits in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyntacticContext {
    /// Binding introduced by `let`/`const`/`var`/`function`/`class`/`catch`
    Declaration,
    /// Property side of `object.name`, object/type member keys, import/export names
    MemberProperty,
    /// Local binding of an `import`
    ImportBinding,
    /// Object or class method key
    MethodKey,
    /// Function or arrow parameter
    Parameter,
    /// Plain reference
    Other,
}

impl SyntacticContext {
    pub fn is_renamable(self) -> bool {
        match self {
            SyntacticContext::Declaration | SyntacticContext::Parameter | SyntacticContext::Other => {
                true
            }
            SyntacticContext::MemberProperty
            | SyntacticContext::ImportBinding
            | SyntacticContext::MethodKey => false,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MODULE FACTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Everything the classifier needs to know about one module.
#[derive(Debug, Clone, Default)]
pub struct ModuleFacts {
    /// Name → context of its first occurrence, in traversal order
    pub first_contexts: IndexMap<String, SyntacticContext>,
    /// Names visible outside the module (or from outside it) by spelling
    pub pinned: HashSet<String>,
    /// Every identifier-like token in the module; short names must avoid these
    pub names_in_use: HashSet<String>,
    /// Names used directly as markup element tags (`<Name />`)
    pub markup_tags: HashSet<String>,
    /// `eval(...)` or `with` present; renaming is unsound
    pub dynamic_scope: bool,
}

/// Scan a parsed module for first-occurrence contexts and safety facts.
pub fn scan_module(program: &Program, dialect: Dialect) -> ModuleFacts {
    let mut scanner = OccurrenceScanner {
        facts: ModuleFacts::default(),
        param_depth: 0,
    };
    scanner.visit_program(program);

    let mut facts = scanner.facts;

    // Free references resolve against the host global object.
    for name in unresolved_references(program) {
        facts.names_in_use.insert(name.clone());
        facts.pinned.insert(name);
    }

    // Top-level declarations of a classic script are globals.
    if !dialect.module {
        for stmt in &program.body {
            let mut names = Vec::new();
            match stmt {
                Statement::VariableDeclaration(var) => {
                    for d in &var.declarations {
                        collect_binding_names(&d.id, &mut names);
                    }
                }
                Statement::FunctionDeclaration(func) => {
                    if let Some(id) = &func.id {
                        names.push(id.name.to_string());
                    }
                }
                Statement::ClassDeclaration(class) => {
                    if let Some(id) = &class.id {
                        names.push(id.name.to_string());
                    }
                }
                _ => {}
            }
            facts.pinned.extend(names);
        }
    }

    facts
}

struct OccurrenceScanner {
    facts: ModuleFacts,
    param_depth: usize,
}

impl OccurrenceScanner {
    fn record(&mut self, name: &str, context: SyntacticContext) {
        if !self.facts.first_contexts.contains_key(name) {
            self.facts
                .first_contexts
                .insert(name.to_string(), context);
        }
        self.facts.names_in_use.insert(name.to_string());
    }

    fn pin(&mut self, name: &str, context: SyntacticContext) {
        self.record(name, context);
        self.facts.pinned.insert(name.to_string());
    }

    fn pin_pattern(&mut self, pattern: &BindingPattern) {
        let mut names = Vec::new();
        collect_binding_names(pattern, &mut names);
        for name in names {
            self.pin(&name, SyntacticContext::Declaration);
        }
    }

    fn record_key(&mut self, key: &PropertyKey, context: SyntacticContext) {
        if let PropertyKey::StaticIdentifier(id) = key {
            self.record(&id.name, context);
        }
    }
}

fn is_require_call(expr: &Expression) -> bool {
    if let Expression::CallExpression(call) = expr.without_parentheses() {
        if let Expression::Identifier(callee) = &call.callee {
            return callee.name == "require";
        }
    }
    false
}

fn export_name(name: &ModuleExportName) -> String {
    match name {
        ModuleExportName::IdentifierName(id) => id.name.to_string(),
        ModuleExportName::IdentifierReference(id) => id.name.to_string(),
        ModuleExportName::StringLiteral(s) => s.value.to_string(),
    }
}

impl<'a> Visit<'a> for OccurrenceScanner {
    fn visit_identifier_reference(&mut self, ident: &IdentifierReference<'a>) {
        self.record(&ident.name, SyntacticContext::Other);
    }

    fn visit_binding_identifier(&mut self, ident: &BindingIdentifier<'a>) {
        let context = if self.param_depth > 0 {
            SyntacticContext::Parameter
        } else {
            SyntacticContext::Declaration
        };
        self.record(&ident.name, context);
    }

    fn visit_identifier_name(&mut self, ident: &IdentifierName<'a>) {
        self.record(&ident.name, SyntacticContext::MemberProperty);
    }

    fn visit_jsx_identifier(&mut self, ident: &JSXIdentifier<'a>) {
        self.facts.names_in_use.insert(ident.name.to_string());
    }

    fn visit_jsx_element_name(&mut self, name: &JSXElementName<'a>) {
        if let JSXElementName::IdentifierReference(id) = name {
            self.facts.markup_tags.insert(id.name.to_string());
        }
        walk::walk_jsx_element_name(self, name);
    }

    fn visit_formal_parameter(&mut self, param: &FormalParameter<'a>) {
        walk::walk_formal_parameter(self, param);
        // `constructor(private api: Api)` also declares the field `this.api`
        if param.accessibility.is_some() || param.readonly || param.r#override {
            self.pin_pattern(&param.pattern);
        }
    }

    fn visit_formal_parameters(&mut self, params: &FormalParameters<'a>) {
        self.param_depth += 1;
        walk::walk_formal_parameters(self, params);
        self.param_depth -= 1;
    }

    fn visit_function_body(&mut self, body: &FunctionBody<'a>) {
        let saved = std::mem::replace(&mut self.param_depth, 0);
        walk::walk_function_body(self, body);
        self.param_depth = saved;
    }

    // --- Module boundary ---

    fn visit_import_declaration(&mut self, decl: &ImportDeclaration<'a>) {
        if let Some(specifiers) = &decl.specifiers {
            for specifier in specifiers {
                let local = match specifier {
                    ImportDeclarationSpecifier::ImportSpecifier(s) => &s.local,
                    ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => &s.local,
                    ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => &s.local,
                };
                self.pin(&local.name, SyntacticContext::ImportBinding);
            }
        }
    }

    fn visit_ts_import_equals_declaration(&mut self, decl: &TSImportEqualsDeclaration<'a>) {
        self.pin(&decl.id.name, SyntacticContext::ImportBinding);
        walk::walk_ts_import_equals_declaration(self, decl);
    }

    fn visit_export_specifier(&mut self, specifier: &ExportSpecifier<'a>) {
        self.pin(&export_name(&specifier.local), SyntacticContext::Other);
    }

    fn visit_export_named_declaration(&mut self, decl: &ExportNamedDeclaration<'a>) {
        if let Some(declaration) = &decl.declaration {
            let mut names = Vec::new();
            declared_names(declaration, &mut names);
            for name in names {
                self.pin(&name, SyntacticContext::Declaration);
            }
        }
        walk::walk_export_named_declaration(self, decl);
    }

    fn visit_variable_declaration(&mut self, decl: &VariableDeclaration<'a>) {
        if decl.declare {
            for d in &decl.declarations {
                self.pin_pattern(&d.id);
            }
        }
        walk::walk_variable_declaration(self, decl);
    }

    fn visit_variable_declarator(&mut self, decl: &VariableDeclarator<'a>) {
        if decl.init.as_ref().is_some_and(is_require_call) {
            self.pin_pattern(&decl.id);
        }
        walk::walk_variable_declarator(self, decl);
    }

    fn visit_function(&mut self, func: &Function<'a>, flags: ScopeFlags) {
        if func.declare {
            if let Some(id) = &func.id {
                self.pin(&id.name, SyntacticContext::Declaration);
            }
        }
        walk::walk_function(self, func, flags);
    }

    fn visit_class(&mut self, class: &Class<'a>) {
        if class.declare {
            if let Some(id) = &class.id {
                self.pin(&id.name, SyntacticContext::Declaration);
            }
        }
        walk::walk_class(self, class);
    }

    fn visit_ts_enum_member(&mut self, member: &TSEnumMember<'a>) {
        walk::walk_ts_enum_member(self, member);
        // Inside the enum body a bare member name refers to the member.
        if let TSEnumMemberName::Identifier(id) = &member.id {
            self.facts.pinned.insert(id.name.to_string());
        }
    }

    // --- Keys and properties ---

    fn visit_object_property(&mut self, prop: &ObjectProperty<'a>) {
        if prop.shorthand {
            // `{ count }`: the key follows the value binding
            self.visit_expression(&prop.value);
            return;
        }
        if prop.method || !matches!(prop.kind, PropertyKind::Init) {
            self.record_key(&prop.key, SyntacticContext::MethodKey);
        }
        walk::walk_object_property(self, prop);
    }

    fn visit_binding_property(&mut self, prop: &BindingProperty<'a>) {
        if prop.shorthand {
            self.visit_binding_pattern(&prop.value);
            return;
        }
        walk::walk_binding_property(self, prop);
    }

    fn visit_method_definition(&mut self, def: &MethodDefinition<'a>) {
        self.record_key(&def.key, SyntacticContext::MethodKey);
        walk::walk_method_definition(self, def);
    }

    fn visit_property_definition(&mut self, def: &PropertyDefinition<'a>) {
        self.record_key(&def.key, SyntacticContext::MethodKey);
        walk::walk_property_definition(self, def);
    }

    fn visit_assignment_target_property_identifier(
        &mut self,
        prop: &AssignmentTargetPropertyIdentifier<'a>,
    ) {
        // `({ count } = obj)` names a property and a binding at once
        self.pin(&prop.binding.name, SyntacticContext::Other);
        walk::walk_assignment_target_property_identifier(self, prop);
    }

    // --- Dynamic scope ---

    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        if let Expression::Identifier(callee) = &call.callee {
            if callee.name == "eval" {
                self.facts.dynamic_scope = true;
            }
        }
        walk::walk_call_expression(self, call);
    }

    fn visit_with_statement(&mut self, stmt: &WithStatement<'a>) {
        self.facts.dynamic_scope = true;
        walk::walk_with_statement(self, stmt);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SHORT NAMES
// ═══════════════════════════════════════════════════════════════════════════════

/// Allocates `{prefix}{counter}` keys for one run.
///
/// One counter per prefix, shared by every module in the run. Candidates
/// that collide with a name already in use anywhere in the run are skipped.
#[derive(Debug, Default)]
pub struct ShortNames {
    counters: HashMap<String, usize>,
    taken: HashSet<String>,
    in_use: HashSet<String>,
}

impl ShortNames {
    pub fn new(in_use: HashSet<String>) -> Self {
        Self {
            counters: HashMap::new(),
            taken: HashSet::new(),
            in_use,
        }
    }

    pub fn next(&mut self, prefix: &str) -> String {
        let counter = self.counters.entry(prefix.to_string()).or_insert(0);
        loop {
            let candidate = format!("{}{}", prefix, counter);
            *counter += 1;
            if !self.taken.contains(&candidate)
                && !self.in_use.contains(&candidate)
                && !is_builtin_protected(&candidate)
            {
                self.taken.insert(candidate.clone());
                return candidate;
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CLASSIFIER
// ═══════════════════════════════════════════════════════════════════════════════

/// The mapping from an original name to its short name for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifierBinding {
    pub original: String,
    pub context: SyntacticContext,
    pub category: String,
    pub short_name: String,
}

/// Why a name keeps its spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepReason {
    Protected,
    Pinned,
    Context(SyntacticContext),
    TooShort,
    NoCategory,
    /// Used as a bare markup tag and the category prefix is lowercase
    MarkupTag,
    DynamicScope,
    Disabled,
}

#[derive(Debug, Clone, Copy)]
pub enum Verdict<'p> {
    Rename(&'p CompiledRule),
    Keep(KeepReason),
}

pub struct IdentifierClassifier<'p> {
    profile: &'p CompiledProfile,
    bindings: IndexMap<String, IdentifierBinding>,
}

impl<'p> IdentifierClassifier<'p> {
    pub fn new(profile: &'p CompiledProfile) -> Self {
        Self {
            profile,
            bindings: IndexMap::new(),
        }
    }

    /// Eligibility, then category, for `name` as first seen in a module.
    pub fn verdict(&self, name: &str, context: SyntacticContext, facts: &ModuleFacts) -> Verdict<'p> {
        let profile: &'p CompiledProfile = self.profile;
        if !profile.profile.rename_identifiers {
            return Verdict::Keep(KeepReason::Disabled);
        }
        if facts.dynamic_scope {
            return Verdict::Keep(KeepReason::DynamicScope);
        }
        if profile.is_protected(name) {
            return Verdict::Keep(KeepReason::Protected);
        }
        if facts.pinned.contains(name) {
            return Verdict::Keep(KeepReason::Pinned);
        }
        if !context.is_renamable() {
            return Verdict::Keep(KeepReason::Context(context));
        }
        if name.chars().count() < profile.profile.min_identifier_length {
            return Verdict::Keep(KeepReason::TooShort);
        }

        // A rule matched in an earlier module fixes the category for the run.
        let rule = match self.bindings.get(name) {
            Some(existing) => profile
                .rules
                .iter()
                .find(|r| r.rule.name == existing.category),
            None => profile.categorize(name, context),
        };
        let Some(rule) = rule else {
            return Verdict::Keep(KeepReason::NoCategory);
        };

        if facts.markup_tags.contains(name)
            && !rule.rule.prefix.starts_with(|c: char| c.is_ascii_uppercase())
        {
            return Verdict::Keep(KeepReason::MarkupTag);
        }

        Verdict::Rename(rule)
    }

    /// Return the run-wide binding for `name`, creating it on first use.
    pub fn bind(
        &mut self,
        name: &str,
        context: SyntacticContext,
        facts: &ModuleFacts,
        short_names: &mut ShortNames,
    ) -> Option<&IdentifierBinding> {
        let rule = match self.verdict(name, context, facts) {
            Verdict::Rename(rule) => rule,
            Verdict::Keep(_) => return None,
        };

        if !self.bindings.contains_key(name) {
            let short_name = short_names.next(&rule.rule.prefix);
            self.bindings.insert(
                name.to_string(),
                IdentifierBinding {
                    original: name.to_string(),
                    context,
                    category: rule.rule.name.clone(),
                    short_name,
                },
            );
        }
        self.bindings.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_program;
    use crate::profile::StrategyProfile;
    use oxc_allocator::Allocator;

    fn facts_for(code: &str, dialect: Dialect) -> ModuleFacts {
        let allocator = Allocator::default();
        let program = parse_program(&allocator, code, dialect, "test.js").unwrap();
        scan_module(&program, dialect)
    }

    #[test]
    fn test_first_occurrence_contexts() {
        let facts = facts_for(
            "function UserProfile(props) { const label = props.label; return label; }",
            Dialect::default(),
        );
        assert_eq!(facts.first_contexts["UserProfile"], SyntacticContext::Declaration);
        assert_eq!(facts.first_contexts["props"], SyntacticContext::Parameter);
        assert_eq!(facts.first_contexts["label"], SyntacticContext::Declaration);
    }

    #[test]
    fn test_member_property_first_occurrence_is_recorded() {
        let facts = facts_for("config.timeout = 5; let timeout = 1;", Dialect::default());
        assert_eq!(facts.first_contexts["timeout"], SyntacticContext::MemberProperty);
    }

    #[test]
    fn test_method_keys() {
        let facts = facts_for(
            "const api = { refresh() {} }; class Store { reload() {} }",
            Dialect::default(),
        );
        assert_eq!(facts.first_contexts["refresh"], SyntacticContext::MethodKey);
        assert_eq!(facts.first_contexts["reload"], SyntacticContext::MethodKey);
    }

    #[test]
    fn test_module_boundary_names_are_pinned() {
        let facts = facts_for(
            r#"
            import React, { useMemo as memoized } from "react";
            const lodash = require("lodash");
            export const publicValue = 1;
            const internal = 2;
            export { internal };
            export default function Widget() { return missingGlobal; }
            "#,
            Dialect::default(),
        );
        for name in ["React", "memoized", "lodash", "publicValue", "internal", "missingGlobal"] {
            assert!(facts.pinned.contains(name), "{} should be pinned", name);
        }
        assert!(!facts.pinned.contains("Widget"));
        assert_eq!(facts.first_contexts["memoized"], SyntacticContext::ImportBinding);
    }

    #[test]
    fn test_script_top_level_is_pinned() {
        let facts = facts_for(
            "var sharedCounter = 0; function bumpCounter() { let local = 1; sharedCounter += local; }",
            Dialect::script(),
        );
        assert!(facts.pinned.contains("sharedCounter"));
        assert!(facts.pinned.contains("bumpCounter"));
        assert!(!facts.pinned.contains("local"));
    }

    #[test]
    fn test_parameter_properties_are_pinned() {
        let facts = facts_for(
            "class Store { constructor(private readonly service: Api, plain: number) {} }",
            Dialect::typescript(),
        );
        assert!(facts.pinned.contains("service"));
        assert!(!facts.pinned.contains("plain"));
    }

    #[test]
    fn test_enum_member_names_are_pinned() {
        let facts = facts_for(
            "const Light = 5; enum Mode { Light = 1, Dark = Light * 2 }",
            Dialect::typescript(),
        );
        assert!(facts.pinned.contains("Light"));
        assert!(facts.pinned.contains("Dark"));
        assert!(!facts.pinned.contains("Mode"));
    }

    #[test]
    fn test_dynamic_scope_detection() {
        assert!(facts_for("function run(code) { return eval(code); }", Dialect::default()).dynamic_scope);
        assert!(facts_for("with (scopeObj) { value; }", Dialect::script()).dynamic_scope);
        assert!(!facts_for("const evaluate = 1;", Dialect::default()).dynamic_scope);
    }

    #[test]
    fn test_markup_tags_recorded() {
        let facts = facts_for(
            "function Card() { return <div />; } const page = <Card />;",
            Dialect::default(),
        );
        assert!(facts.markup_tags.contains("Card"));
        assert!(!facts.markup_tags.contains("div"));
    }

    #[test]
    fn test_verdict_order() {
        let compiled = StrategyProfile::balanced().compile().unwrap();
        let classifier = IdentifierClassifier::new(&compiled);
        let mut facts = ModuleFacts::default();
        facts.pinned.insert("exported".to_string());

        let keep = |name, ctx| match classifier.verdict(name, ctx, &facts) {
            Verdict::Keep(reason) => Some(reason),
            Verdict::Rename(_) => None,
        };

        assert_eq!(keep("useState", SyntacticContext::Other), Some(KeepReason::Protected));
        assert_eq!(keep("exported", SyntacticContext::Declaration), Some(KeepReason::Pinned));
        assert_eq!(
            keep("title", SyntacticContext::MemberProperty),
            Some(KeepReason::Context(SyntacticContext::MemberProperty))
        );
        assert_eq!(keep("ab", SyntacticContext::Declaration), Some(KeepReason::TooShort));
        assert_eq!(keep("counter", SyntacticContext::Declaration), None);
    }

    #[test]
    fn test_bindings_are_memoised_and_counters_per_category() {
        let compiled = StrategyProfile::balanced().compile().unwrap();
        let mut classifier = IdentifierClassifier::new(&compiled);
        let facts = ModuleFacts::default();
        let mut names = ShortNames::default();

        let a = classifier
            .bind("count", SyntacticContext::Declaration, &facts, &mut names)
            .map(|b| b.short_name.clone());
        let b = classifier
            .bind("Header", SyntacticContext::Declaration, &facts, &mut names)
            .map(|b| b.short_name.clone());
        let c = classifier
            .bind("setCount", SyntacticContext::Declaration, &facts, &mut names)
            .map(|b| b.short_name.clone());
        let again = classifier
            .bind("count", SyntacticContext::Other, &facts, &mut names)
            .map(|b| b.short_name.clone());

        assert_eq!(a.as_deref(), Some("v0"));
        assert_eq!(b.as_deref(), Some("c0"));
        assert_eq!(c.as_deref(), Some("v1"));
        assert_eq!(again, a);
    }

    #[test]
    fn test_short_names_skip_names_in_use() {
        let mut in_use = HashSet::new();
        in_use.insert("v0".to_string());
        in_use.insert("v1".to_string());
        let mut names = ShortNames::new(in_use);
        assert_eq!(names.next("v"), "v2");
        assert_eq!(names.next("v"), "v3");
        assert_eq!(names.next("c"), "c0");
    }

    #[test]
    fn test_markup_tag_with_lowercase_prefix_is_kept() {
        let compiled = StrategyProfile::balanced().compile().unwrap();
        let classifier = IdentifierClassifier::new(&compiled);
        let mut facts = ModuleFacts::default();
        facts.markup_tags.insert("Card".to_string());
        assert!(matches!(
            classifier.verdict("Card", SyntacticContext::Declaration, &facts),
            Verdict::Keep(KeepReason::MarkupTag)
        ));
    }
}
