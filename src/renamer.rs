//! Renamer / Replacer
//!
//! Second pass. Applies a [`ModulePlan`] to the AST in place: every
//! identifier node with a binding gets its short name, and every hoisted
//! literal site becomes a reference to its key. No eligibility decisions are
//! made here.

use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_ast::AstBuilder;
use oxc_ast_visit::{walk_mut, VisitMut};
use oxc_span::SPAN;

use crate::plan::ModulePlan;

pub struct RenamerVisitor<'a, 'p> {
    ast: AstBuilder<'a>,
    plan: &'p ModulePlan,
    pub substitutions: usize,
}

impl<'a, 'p> RenamerVisitor<'a, 'p> {
    pub fn new(allocator: &'a Allocator, plan: &'p ModulePlan) -> Self {
        RenamerVisitor {
            ast: AstBuilder::new(allocator),
            plan,
            substitutions: 0,
        }
    }

    fn short_name(&self, name: &str) -> Option<&'a str> {
        let short = self.plan.renames.get(name)?;
        let arena_str: &'a str = self.ast.allocator.alloc_str(short);
        Some(arena_str)
    }
}

/// Apply `plan` to `program`; returns the number of substituted sites.
pub fn apply_plan<'a>(allocator: &'a Allocator, program: &mut Program<'a>, plan: &ModulePlan) -> usize {
    if plan.is_empty() {
        return 0;
    }
    let mut renamer = RenamerVisitor::new(allocator, plan);
    renamer.visit_program(program);
    renamer.substitutions
}

fn key_name<'b>(key: &'b PropertyKey) -> Option<&'b str> {
    match key {
        PropertyKey::StaticIdentifier(id) => Some(id.name.as_str()),
        _ => None,
    }
}

impl<'a> VisitMut<'a> for RenamerVisitor<'a, '_> {
    fn visit_identifier_reference(&mut self, ident: &mut IdentifierReference<'a>) {
        if let Some(new_name) = self.short_name(&ident.name) {
            ident.name = new_name.into();
            self.substitutions += 1;
        }
    }

    fn visit_binding_identifier(&mut self, ident: &mut BindingIdentifier<'a>) {
        if let Some(new_name) = self.short_name(&ident.name) {
            ident.name = new_name.into();
            self.substitutions += 1;
        }
    }

    fn visit_expression(&mut self, expr: &mut Expression<'a>) {
        let site = match expr {
            Expression::StringLiteral(lit) => Some(lit.span.start),
            Expression::NumericLiteral(lit) => Some(lit.span.start),
            _ => None,
        };
        if let Some(key) = site.and_then(|start| self.plan.literal_sites.get(&start)) {
            let key: &'a str = self.ast.allocator.alloc_str(key);
            *expr = self.ast.expression_identifier(SPAN, key);
            self.substitutions += 1;
            return;
        }
        walk_mut::walk_expression(self, expr);
    }

    fn visit_object_property(&mut self, prop: &mut ObjectProperty<'a>) {
        walk_mut::walk_object_property(self, prop);
        // `{ count }` → `{ count: v0 }`
        if prop.shorthand {
            if let Expression::Identifier(value) = &prop.value {
                if key_name(&prop.key) != Some(value.name.as_str()) {
                    prop.shorthand = false;
                }
            }
        }
    }

    fn visit_binding_property(&mut self, prop: &mut BindingProperty<'a>) {
        walk_mut::walk_binding_property(self, prop);
        if prop.shorthand {
            let bound = match &prop.value {
                BindingPattern::BindingIdentifier(id) => Some(id.name.as_str()),
                BindingPattern::AssignmentPattern(assign) => match &assign.left {
                    BindingPattern::BindingIdentifier(id) => Some(id.name.as_str()),
                    _ => None,
                },
                _ => None,
            };
            if bound.is_some() && key_name(&prop.key) != bound {
                prop.shorthand = false;
            }
        }
    }
}
