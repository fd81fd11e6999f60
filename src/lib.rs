//! # Minifier Native
//!
//! Semantic source-level minifier with reversible debugging.
//!
//! ## Pipeline
//!
//! 1. **Parse**: every module is parsed into a syntax tree; a module that does
//!    not parse is never rewritten.
//! 2. **Analyse** (parallel): identifier occurrences are scanned and literals
//!    counted per module.
//! 3. **Plan** (serial barrier): short keys are assigned with run-wide
//!    counters, so no key can mean two things across modules.
//! 4. **Rewrite** (parallel): identifiers and hoisted literals are substituted
//!    on the tree, then code is generated from it.
//! 5. **Validate**: the merged manifest and every module are checked; only an
//!    accepted run writes artifacts.
//!
//! ## Manifest Invariants
//!
//! - Every short key resolves to exactly one original, across categories.
//! - Protected names (runtime globals, framework APIs, the profile whitelist)
//!   never enter the manifest.
//! - Originals on disk are never modified.
//!
//! The [`ReverseTranslator`] reads a persisted manifest and maps optimized
//! code or runtime errors back to original names.

mod backup;
mod classify;
mod codegen;
mod collect;
mod discovery;
mod error;
mod hoist;
mod manifest;
mod orchestrator;
mod parse;
mod plan;
mod profile;
mod renamer;
mod scope;
mod translate;
mod validate;

#[cfg(feature = "napi")]
mod bindings;

#[cfg(test)]
mod scenario_tests;

pub use backup::{compute_hash, Backup};
pub use classify::{IdentifierBinding, KeepReason, SyntacticContext};
pub use collect::{LiteralKind, LiteralValue};
pub use discovery::{locate_modules, ArtifactMarkers, SUPPORTED_EXTENSIONS};
pub use error::{MinifyError, ParseError, Result};
pub use manifest::{Manifest, ManifestStats, ModuleRecord, MANIFEST_VERSION};
pub use orchestrator::{
    exit_code, optimize, FailedModule, ModuleOutput, OptimizationOutcome, Optimizer, OutputOptions,
    RunReport, SourceModule,
};
pub use parse::{is_well_formed, Dialect};
pub use profile::{default_category_rules, CategoryRule, CompiledProfile, StrategyProfile};
pub use translate::{ErrorTranslation, ReverseTranslator};
pub use validate::{ValidationReport, Validator};

#[cfg(feature = "napi")]
pub use bindings::{optimize_bundle_native, translate_code_native, translate_error_native};
