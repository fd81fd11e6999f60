//! Strategy Orchestrator
//!
//! Owns a run end to end: locate modules, back them up, analyse in parallel,
//! plan keys at a single barrier, rewrite in parallel, merge manifests,
//! validate, then either promote staged artifacts or leave everything as it
//! was found.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::backup::{compute_hash, Backup};
use crate::classify::scan_module;
use crate::codegen::generate;
use crate::collect::collect_literals;
use crate::discovery::{locate_modules, ArtifactMarkers};
use crate::error::{MinifyError, ParseError, Result};
use crate::hoist::hoist_literals;
use crate::manifest::{Manifest, ManifestBuilder, ModuleRecord};
use crate::parse::{parse_program, Dialect};
use crate::plan::{ModuleAnalysis, ModulePlan, RunPlanner};
use crate::profile::{CompiledProfile, StrategyProfile};
use crate::renamer::apply_plan;
use crate::validate::{ValidationReport, Validator, VAL_NON_INVERTIBLE};
use oxc_allocator::Allocator;

// ═══════════════════════════════════════════════════════════════════════════════
// TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// One module of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceModule {
    pub path: PathBuf,
    pub text: String,
    pub dialect: Dialect,
}

impl SourceModule {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let path = path.into();
        let dialect = Dialect::from_path(&path);
        Self {
            path,
            text: text.into(),
            dialect,
        }
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    fn label(&self) -> String {
        self.path.to_string_lossy().to_string()
    }
}

/// Artifact naming and persistence switches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutputOptions {
    /// `bundle.js` → `bundle{optimized_suffix}.js`
    pub optimized_suffix: String,
    /// `bundle.js` → `bundle{manifest_suffix}`
    pub manifest_suffix: String,
    /// Merged manifest written in the target directory of a directory run
    pub run_manifest_name: String,
    pub backup_suffix: String,
    pub emit_position_map: bool,
    pub keep_backup: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            optimized_suffix: ".optimized".to_string(),
            manifest_suffix: ".manifest.json".to_string(),
            run_manifest_name: "optimization.manifest.json".to_string(),
            backup_suffix: ".bak".to_string(),
            emit_position_map: false,
            keep_backup: false,
        }
    }
}

impl OutputOptions {
    fn split_name(module: &Path) -> (String, Option<String>) {
        let stem = module
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let ext = module.extension().map(|e| e.to_string_lossy().to_string());
        (stem, ext)
    }

    pub fn optimized_path(&self, module: &Path) -> PathBuf {
        let (stem, ext) = Self::split_name(module);
        let name = match ext {
            Some(ext) => format!("{}{}.{}", stem, self.optimized_suffix, ext),
            None => format!("{}{}", stem, self.optimized_suffix),
        };
        module.with_file_name(name)
    }

    pub fn manifest_path(&self, module: &Path) -> PathBuf {
        let (stem, _) = Self::split_name(module);
        module.with_file_name(format!("{}{}", stem, self.manifest_suffix))
    }

    pub fn position_map_path(&self, module: &Path) -> PathBuf {
        let mut name = self.optimized_path(module).into_os_string();
        name.push(".map");
        PathBuf::from(name)
    }

    fn markers(&self) -> ArtifactMarkers<'_> {
        ArtifactMarkers {
            optimized_suffix: &self.optimized_suffix,
            backup_suffix: &self.backup_suffix,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedModule {
    pub path: String,
    pub error: String,
    pub exit_code: i32,
}

/// What callers see of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub success: bool,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
    pub reduction: f64,
    pub original_size: usize,
    pub optimized_size: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_modules: Vec<FailedModule>,
}

impl RunReport {
    fn from_validation(report: ValidationReport, failed_modules: Vec<FailedModule>) -> Self {
        Self {
            success: report.passed(),
            issues: report.issues,
            warnings: report.warnings,
            reduction: report.reduction_percent,
            original_size: report.original_size,
            optimized_size: report.optimized_size,
            failed_modules,
        }
    }
}

/// A rewritten module.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleOutput {
    pub path: PathBuf,
    pub dialect: Dialect,
    pub original: String,
    pub optimized: String,
    pub position_map: Option<String>,
    pub substitutions: usize,
}

#[derive(Debug, Clone)]
pub enum OptimizationOutcome {
    Optimized {
        modules: Vec<ModuleOutput>,
        manifest: Manifest,
        report: RunReport,
    },
    Rejected {
        originals: Vec<SourceModule>,
        report: RunReport,
    },
}

impl OptimizationOutcome {
    pub fn report(&self) -> &RunReport {
        match self {
            OptimizationOutcome::Optimized { report, .. } => report,
            OptimizationOutcome::Rejected { report, .. } => report,
        }
    }

    pub fn is_optimized(&self) -> bool {
        matches!(self, OptimizationOutcome::Optimized { .. })
    }

    pub fn manifest(&self) -> Option<&Manifest> {
        match self {
            OptimizationOutcome::Optimized { manifest, .. } => Some(manifest),
            OptimizationOutcome::Rejected { .. } => None,
        }
    }

    /// Optimized text of the first module, if the run was accepted.
    pub fn optimized_text(&self) -> Option<&str> {
        match self {
            OptimizationOutcome::Optimized { modules, .. } => {
                modules.first().map(|m| m.optimized.as_str())
            }
            OptimizationOutcome::Rejected { .. } => None,
        }
    }

    /// 0 when accepted, 1 when validation rejected the run.
    pub fn exit_code(&self) -> i32 {
        match self {
            OptimizationOutcome::Optimized { .. } => 0,
            OptimizationOutcome::Rejected { .. } => 1,
        }
    }
}

/// Process status for any run result.
pub fn exit_code(result: &Result<OptimizationOutcome>) -> i32 {
    match result {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => e.exit_code(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OPTIMIZER
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default)]
pub struct Optimizer {
    profile: StrategyProfile,
    output: OutputOptions,
    timestamp: Option<String>,
}

/// Optimize a bundle file or directory with default output options.
pub fn optimize(bundle_path: &Path, profile: &StrategyProfile) -> Result<OptimizationOutcome> {
    Optimizer::new(profile.clone()).optimize(bundle_path)
}

impl Optimizer {
    pub fn new(profile: StrategyProfile) -> Self {
        Self {
            profile,
            output: OutputOptions::default(),
            timestamp: None,
        }
    }

    pub fn with_output(mut self, output: OutputOptions) -> Self {
        self.output = output;
        self
    }

    /// Pin the manifest timestamp (reproducible builds).
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    pub fn profile(&self) -> &StrategyProfile {
        &self.profile
    }

    fn timestamp(&self) -> String {
        self.timestamp.clone().unwrap_or_else(|| {
            chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
        })
    }

    /// Optimize `target` on disk.
    ///
    /// Artifacts are written next to each module only when the whole run
    /// validates. Originals are never modified.
    pub fn optimize(&self, target: &Path) -> Result<OptimizationOutcome> {
        let compiled = self.profile.compile()?;
        let paths = locate_modules(target, &self.output.markers())?;
        let directory_run = target.is_dir();
        tracing::info!(
            target = %target.display(),
            modules = paths.len(),
            profile = %self.profile.name,
            "starting optimization run"
        );

        let mut backups = Vec::new();
        let mut modules = Vec::new();
        let mut failed = Vec::new();
        for path in &paths {
            match self.load_module(path) {
                Ok((backup, module)) => {
                    backups.push(backup);
                    modules.push(module);
                }
                Err(e) if directory_run => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping module");
                    failed.push(FailedModule {
                        path: path.to_string_lossy().to_string(),
                        error: e.to_string(),
                        exit_code: e.exit_code(),
                    });
                }
                Err(e) => {
                    settle_backups(backups, self.output.keep_backup)?;
                    return Err(e);
                }
            }
        }

        let result = self.run(&compiled, modules, failed).and_then(|outcome| {
            if let OptimizationOutcome::Optimized { modules, manifest, .. } = &outcome {
                let run_manifest_path =
                    directory_run.then(|| target.join(&self.output.run_manifest_name));
                self.commit(modules, manifest, run_manifest_path)?;
            }
            Ok(outcome)
        });

        let settled = settle_backups(backups, self.output.keep_backup);
        let outcome = result?;
        settled?;

        match &outcome {
            OptimizationOutcome::Optimized { report, .. } => tracing::info!(
                reduction = report.reduction,
                original_size = report.original_size,
                optimized_size = report.optimized_size,
                "optimization committed"
            ),
            OptimizationOutcome::Rejected { report, .. } => tracing::warn!(
                issues = report.issues.len(),
                "optimization rejected, originals left untouched"
            ),
        }
        Ok(outcome)
    }

    /// Optimize one in-memory module. Nothing touches the filesystem.
    pub fn optimize_source(&self, path: &str, source: &str, dialect: Dialect) -> Result<OptimizationOutcome> {
        self.optimize_modules(vec![SourceModule::new(path, source).with_dialect(dialect)])
    }

    /// Optimize in-memory modules as one run.
    pub fn optimize_modules(&self, modules: Vec<SourceModule>) -> Result<OptimizationOutcome> {
        let compiled = self.profile.compile()?;
        self.run(&compiled, modules, Vec::new())
    }

    fn load_module(&self, path: &Path) -> Result<(Backup, SourceModule)> {
        let backup = Backup::create(path, &self.output.backup_suffix)?;
        match fs::read_to_string(path) {
            Ok(text) => Ok((backup, SourceModule::new(path, text))),
            Err(e) => {
                // The copy is useless without a readable original.
                if let Err(settle_err) = backup.settle(false) {
                    tracing::warn!(path = %path.display(), error = %settle_err, "failed to remove backup");
                }
                Err(MinifyError::io(path, e))
            }
        }
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Pipeline
    // ───────────────────────────────────────────────────────────────────────────

    fn run(
        &self,
        compiled: &CompiledProfile,
        mut modules: Vec<SourceModule>,
        failed: Vec<FailedModule>,
    ) -> Result<OptimizationOutcome> {
        modules.sort_by(|a, b| a.path.cmp(&b.path));
        let knobs = &compiled.profile;

        // Analysis, one worker per module.
        let analysed: Vec<std::result::Result<ModuleAnalysis, ParseError>> =
            modules.par_iter().map(|m| analyse_module(m, knobs)).collect();

        // Any parse failure aborts the run before a key is assigned.
        let mut accepted = Vec::with_capacity(modules.len());
        let mut analyses = Vec::with_capacity(modules.len());
        for (module, analysis) in modules.into_iter().zip(analysed) {
            match analysis {
                Ok(analysis) => {
                    accepted.push(module);
                    analyses.push(analysis);
                }
                Err(e) => {
                    tracing::warn!(path = %module.path.display(), error = %e, "module failed to parse, aborting run");
                    return Err(MinifyError::Parse(e));
                }
            }
        }
        if accepted.is_empty() {
            return Err(MinifyError::NoModules(PathBuf::new()));
        }

        // Barrier: keys are assigned serially, in path order.
        let mut planner = RunPlanner::new(compiled, analyses.iter());
        let plans: Vec<ModulePlan> = analyses.iter().map(|a| planner.plan_module(a)).collect();
        for (module, plan) in accepted.iter().zip(&plans) {
            tracing::debug!(
                path = %module.path.display(),
                renames = plan.renames.len(),
                hoisted = plan.hoisted.len(),
                "planned module"
            );
        }

        // Rewrite, one worker per module.
        let timestamp = self.timestamp();
        let emit_map = self.output.emit_position_map;
        let rewritten: Vec<Result<(ModuleOutput, Manifest)>> = accepted
            .par_iter()
            .zip(plans.par_iter())
            .map(|(module, plan)| rewrite_module(module, plan, &timestamp, emit_map))
            .collect();
        let mut outputs = Vec::with_capacity(rewritten.len());
        let mut module_manifests = Vec::with_capacity(rewritten.len());
        for result in rewritten {
            let (output, manifest) = result?;
            outputs.push(output);
            module_manifests.push(manifest);
        }

        // Merge at the barrier, then validate against the run manifest.
        let mut report = ValidationReport::default();
        let mut manifest = Manifest::new(timestamp);
        for module_manifest in &module_manifests {
            if let Err(e) = manifest.merge(module_manifest) {
                report.issues.push(format!("[{}] {}", VAL_NON_INVERTIBLE, e));
            }
        }
        if outputs.len() == 1 {
            manifest.modules.clear();
        }

        let validator = Validator::new(compiled);
        for output in &outputs {
            let module_report =
                validator.validate(&output.original, &output.optimized, &manifest, output.dialect);
            report.absorb(&output.path.to_string_lossy(), module_report);
        }
        validator.check_substitutions(&mut report, manifest.stats.total_optimizations);
        tracing::info!(
            passed = report.passed(),
            issues = report.issues.len(),
            warnings = report.warnings.len(),
            "validation finished"
        );

        let report = RunReport::from_validation(report, failed);
        if report.success {
            Ok(OptimizationOutcome::Optimized {
                modules: outputs,
                manifest,
                report,
            })
        } else {
            Ok(OptimizationOutcome::Rejected {
                originals: accepted,
                report,
            })
        }
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Persistence
    // ───────────────────────────────────────────────────────────────────────────

    /// Stage every artifact as a temp file, then promote them together.
    fn commit(&self, modules: &[ModuleOutput], manifest: &Manifest, run_manifest: Option<PathBuf>) -> Result<()> {
        let manifest_json = manifest.to_json()?;
        let mut staged = Vec::new();
        for module in modules {
            staged.push(stage(&self.output.optimized_path(&module.path), &module.optimized)?);
            if let Some(map) = &module.position_map {
                staged.push(stage(&self.output.position_map_path(&module.path), map)?);
            }
            if run_manifest.is_none() {
                staged.push(stage(&self.output.manifest_path(&module.path), &manifest_json)?);
            }
        }
        if let Some(path) = &run_manifest {
            staged.push(stage(path, &manifest_json)?);
        }

        let mut promoted: Vec<PathBuf> = Vec::new();
        for (file, dest) in staged {
            if let Err(e) = file.persist(&dest) {
                for path in &promoted {
                    if let Err(remove_err) = fs::remove_file(path) {
                        tracing::warn!(path = %path.display(), error = %remove_err, "failed to remove promoted artifact");
                    }
                }
                return Err(MinifyError::io(&dest, e.error));
            }
            tracing::debug!(path = %dest.display(), "wrote artifact");
            promoted.push(dest);
        }
        Ok(())
    }
}

fn stage(dest: &Path, contents: &str) -> Result<(NamedTempFile, PathBuf)> {
    let dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut file = NamedTempFile::new_in(&dir).map_err(|e| MinifyError::io(&dir, e))?;
    file.write_all(contents.as_bytes())
        .and_then(|_| file.flush())
        .map_err(|e| MinifyError::io(file.path(), e))?;
    Ok((file, dest.to_path_buf()))
}

fn settle_backups(backups: Vec<Backup>, keep: bool) -> Result<()> {
    let mut first_error = None;
    for backup in backups {
        if let Err(e) = backup.settle(keep) {
            first_error.get_or_insert(e);
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn analyse_module(module: &SourceModule, profile: &StrategyProfile) -> std::result::Result<ModuleAnalysis, ParseError> {
    let allocator = Allocator::default();
    let program = parse_program(&allocator, &module.text, module.dialect, &module.label())?;
    Ok(ModuleAnalysis {
        facts: scan_module(&program, module.dialect),
        literals: collect_literals(&program, profile),
    })
}

fn rewrite_module(
    module: &SourceModule,
    plan: &ModulePlan,
    timestamp: &str,
    emit_map: bool,
) -> Result<(ModuleOutput, Manifest)> {
    let allocator = Allocator::default();
    let mut program = parse_program(&allocator, &module.text, module.dialect, &module.label())?;

    let substitutions = apply_plan(&allocator, &mut program, plan);
    hoist_literals(&allocator, &mut program, &plan.hoisted, module.dialect)?;
    let generated = generate(&program, emit_map.then_some(module.path.as_path()));

    let mut builder = ManifestBuilder::new(timestamp);
    for binding in &plan.bindings {
        builder.record_binding(binding)?;
    }
    for (key, value) in &plan.hoisted {
        builder.record_literal(key, value)?;
    }
    builder.record_module(ModuleRecord {
        path: module.label(),
        source_hash: compute_hash(module.text.as_bytes()),
        original_size: module.text.len(),
        optimized_size: generated.code.len(),
        substitutions,
    });
    let manifest = builder.finish(module.text.len(), generated.code.len(), substitutions);

    Ok((
        ModuleOutput {
            path: module.path.clone(),
            dialect: module.dialect,
            original: module.text.clone(),
            optimized: generated.code,
            position_map: generated.position_map,
            substitutions,
        },
        manifest,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_paths() {
        let output = OutputOptions::default();
        let module = Path::new("dist/bundle.js");
        assert_eq!(output.optimized_path(module), Path::new("dist/bundle.optimized.js"));
        assert_eq!(output.manifest_path(module), Path::new("dist/bundle.manifest.json"));
        assert_eq!(
            output.position_map_path(module),
            Path::new("dist/bundle.optimized.js.map")
        );
    }

    #[test]
    fn test_in_memory_run_with_pinned_timestamp() {
        let optimizer = Optimizer::new(StrategyProfile::balanced()).with_timestamp("2026-01-01T00:00:00Z");
        let outcome = optimizer
            .optimize_source(
                "app.js",
                "let counter = 0; function increment(amount) { counter += amount; return counter; }",
                Dialect::default(),
            )
            .unwrap();
        assert!(outcome.is_optimized(), "{:?}", outcome.report());
        let manifest = outcome.manifest().unwrap();
        assert_eq!(manifest.timestamp, "2026-01-01T00:00:00Z");
        assert!(manifest.modules.is_empty());
        assert_eq!(outcome.exit_code(), 0);
    }

    #[test]
    fn test_parse_failure_is_an_error() {
        let optimizer = Optimizer::new(StrategyProfile::balanced());
        let result = optimizer.optimize_source("broken.js", "let = ;", Dialect::default());
        assert!(matches!(result, Err(MinifyError::Parse(_))));
        assert_eq!(exit_code(&result), 2);
    }

    #[test]
    fn test_one_unparsable_module_aborts_the_run() {
        let optimizer = Optimizer::new(StrategyProfile::balanced()).with_timestamp("t");
        let result = optimizer.optimize_modules(vec![
            SourceModule::new("a.js", "let counter = 0; counter++; log(counter);"),
            SourceModule::new("b.js", "let = ;"),
        ]);
        match &result {
            Err(MinifyError::Parse(e)) => assert_eq!(e.file, "b.js"),
            Err(e) => panic!("expected a parse error, got {}", e),
            Ok(outcome) => panic!("expected a parse error, got {:?}", outcome.report()),
        }
        assert_eq!(exit_code(&result), 2);
    }
}
