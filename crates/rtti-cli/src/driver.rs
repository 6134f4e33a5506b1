//! Check driver: module loading, type binding and per-value matching.

use crate::args::CliArgs;
use anyhow::{Context, Result, bail};
use rayon::prelude::*;
use rtti_core::{
    Descriptor, DescriptorModule, IntrinsicClass, MatchOptions, ReflectedType, Value,
    ValueMatcher, reflect,
};
use serde::Serialize;
use std::fmt::Write;
use std::path::Path;
use tracing::{debug, info};

const STACK_PER_HOP: usize = 16 * 1024;
const MIN_WORKER_STACK: usize = 8 * 1024 * 1024;

/// Result of checking one value file.
#[derive(Debug, Clone, Serialize)]
pub struct ValueReport {
    pub path: String,
    pub matched: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<String>,
}

/// Result of a whole run, in the order values were given.
#[derive(Debug, Clone, Serialize)]
pub struct CheckOutcome {
    #[serde(rename = "type")]
    pub type_name: String,
    pub results: Vec<ValueReport>,
}

impl CheckOutcome {
    pub fn all_matched(&self) -> bool {
        self.results.iter().all(|report| report.matched)
    }

    pub fn mismatch_count(&self) -> usize {
        self.results.iter().filter(|report| !report.matched).count()
    }
}

pub fn run(args: &CliArgs) -> Result<CheckOutcome> {
    let module = load_module(&args.types)?;
    let ty = bind_type(&module, &args.type_name, &args.type_args)?;
    info!(ty = %ty, values = args.values.len(), "rtti-check - checking");

    // Matching recurses once per hop, so worker stacks grow with the depth limit.
    let stack_size = (args.max_depth as usize)
        .saturating_mul(STACK_PER_HOP)
        .max(MIN_WORKER_STACK);
    let pool = rayon::ThreadPoolBuilder::new()
        .stack_size(stack_size)
        .build()
        .context("failed to start matcher threads")?;
    let results = pool.install(|| {
        args.values
            .par_iter()
            .map(|path| check_file(&ty, path, args))
            .collect::<Result<Vec<_>>>()
    })?;

    Ok(CheckOutcome {
        type_name: ty.to_string(),
        results,
    })
}

pub fn load_module(path: &Path) -> Result<DescriptorModule> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read descriptor module {}", path.display()))?;
    DescriptorModule::from_json(&text)
        .with_context(|| format!("failed to decode descriptor module {}", path.display()))
}

/// Look up `name` in `module` and apply `type_args` to it.
pub fn bind_type(
    module: &DescriptorModule,
    name: &str,
    type_args: &[String],
) -> Result<ReflectedType> {
    if !module.contains(name) {
        let known: Vec<&str> = module.names().collect();
        bail!("type `{name}` is not declared (known: {})", known.join(", "));
    }
    let desc = module
        .get(name)
        .with_context(|| format!("failed to decode declaration `{name}`"))?;
    let ty = reflect(&desc);
    if type_args.is_empty() {
        return Ok(ty);
    }

    let args = type_args
        .iter()
        .map(|arg| type_argument(module, arg))
        .collect::<Result<Vec<_>>>()?;
    debug!(ty = name, args = type_args.len(), "rtti-check - binding type arguments");
    ty.create_type(args)
        .with_context(|| format!("`{name}` does not take type arguments"))
}

fn type_argument(module: &DescriptorModule, name: &str) -> Result<Descriptor> {
    if module.contains(name) {
        return module
            .get(name)
            .with_context(|| format!("failed to decode type argument `{name}`"));
    }
    match name {
        "undefined" => Ok(Descriptor::undefined()),
        "null" => Ok(Descriptor::null()),
        "any" => Ok(Descriptor::any()),
        "unknown" => Ok(Descriptor::unknown()),
        "never" => Ok(Descriptor::never()),
        _ => IntrinsicClass::from_name(name)
            .map(Descriptor::intrinsic)
            .with_context(|| format!("unknown type argument `{name}`")),
    }
}

fn check_file(ty: &ReflectedType, path: &Path, args: &CliArgs) -> Result<ValueReport> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read value {}", path.display()))?;
    let json: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    let value = Value::from(json);

    let mut diagnostics = Vec::new();
    let matched = ValueMatcher::new(
        MatchOptions {
            max_diagnostics: args.max_diagnostics,
            ..MatchOptions::with_errors(&mut diagnostics)
        }
        .with_max_depth(args.max_depth),
    )
    .check(ty, &value)
    .with_context(|| format!("malformed descriptor while checking {}", path.display()))?;
    debug!(path = %path.display(), matched, "rtti-check - value checked");

    Ok(ValueReport {
        path: path.display().to_string(),
        matched,
        diagnostics: if matched { Vec::new() } else { diagnostics },
    })
}

/// Render an outcome for stdout.
pub fn render(outcome: &CheckOutcome, json: bool) -> Result<String> {
    if json {
        return serde_json::to_string_pretty(outcome).context("failed to serialize results");
    }
    let mut out = String::new();
    for report in &outcome.results {
        let status = if report.matched { "ok" } else { "mismatch" };
        writeln!(out, "{}: {status}", report.path)?;
        for diagnostic in &report.diagnostics {
            writeln!(out, "  {diagnostic}")?;
        }
    }
    if !outcome.all_matched() {
        writeln!(
            out,
            "{} of {} value(s) do not match {}",
            outcome.mismatch_count(),
            outcome.results.len(),
            outcome.type_name
        )?;
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../tests/driver_tests.rs"]
mod tests;
