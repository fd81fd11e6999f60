//! Node bindings for the build glue and the debugging front end.

use napi_derive::napi;
use std::path::Path;

use crate::manifest::Manifest;
use crate::orchestrator::{OptimizationOutcome, Optimizer, OutputOptions};
use crate::profile::StrategyProfile;
use crate::translate::ReverseTranslator;

fn to_napi(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn resolve_profile(profile: Option<serde_json::Value>) -> napi::Result<StrategyProfile> {
    match profile {
        None => Ok(StrategyProfile::default()),
        Some(serde_json::Value::String(name)) => StrategyProfile::preset(&name)
            .ok_or_else(|| napi::Error::from_reason(format!("Unknown strategy profile `{}`", name))),
        Some(value) => serde_json::from_value(value).map_err(to_napi),
    }
}

/// Optimize a bundle file or directory. `profile` is a preset name or a
/// profile object; the result is the run report plus the exit code.
#[napi]
pub fn optimize_bundle_native(
    bundle_path: String,
    profile: Option<serde_json::Value>,
    output: Option<serde_json::Value>,
) -> napi::Result<serde_json::Value> {
    let profile = resolve_profile(profile)?;
    let output: OutputOptions = match output {
        Some(value) => serde_json::from_value(value).map_err(to_napi)?,
        None => OutputOptions::default(),
    };

    let outcome = Optimizer::new(profile)
        .with_output(output)
        .optimize(Path::new(&bundle_path))
        .map_err(to_napi)?;

    let manifest = match &outcome {
        OptimizationOutcome::Optimized { manifest, .. } => serde_json::to_value(manifest).map_err(to_napi)?,
        OptimizationOutcome::Rejected { .. } => serde_json::Value::Null,
    };
    Ok(serde_json::json!({
        "exitCode": outcome.exit_code(),
        "report": outcome.report(),
        "manifest": manifest,
    }))
}

#[napi]
pub fn translate_code_native(manifest_json: String, optimized: String) -> napi::Result<String> {
    let manifest = Manifest::from_json_str(&manifest_json).map_err(to_napi)?;
    Ok(ReverseTranslator::from_manifest(&manifest).translate_code(&optimized))
}

#[napi]
pub fn translate_error_native(
    manifest_json: String,
    message: String,
    stack: Option<String>,
) -> napi::Result<serde_json::Value> {
    let manifest = Manifest::from_json_str(&manifest_json).map_err(to_napi)?;
    let translation =
        ReverseTranslator::from_manifest(&manifest).translate_error(&message, stack.as_deref());
    serde_json::to_value(translation).map_err(to_napi)
}
