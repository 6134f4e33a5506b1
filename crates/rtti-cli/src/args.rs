use clap::Parser;
use rtti_common::limits::{MAX_MATCH_DEPTH, MAX_MATCH_DIAGNOSTICS};
use std::path::PathBuf;

/// CLI arguments for the rtti-check binary.
#[derive(Parser, Debug)]
#[command(
    name = "rtti-check",
    version,
    about = "Check JSON values against runtime type descriptors"
)]
pub struct CliArgs {
    /// Descriptor module (`{"declarations": {...}}`).
    #[arg(long = "types", value_name = "MODULE")]
    pub types: PathBuf,

    /// Declaration to check values against.
    #[arg(long = "type", value_name = "NAME")]
    pub type_name: String,

    /// Type arguments for a generic declaration, by declaration name or
    /// builtin keyword (`string`, `number`, ...).
    #[arg(long = "args", alias = "arg", value_name = "NAME", num_args = 1.., value_delimiter = ',')]
    pub type_args: Vec<String>,

    /// Print results as JSON instead of text.
    #[arg(long)]
    pub json: bool,

    /// Stop reporting diagnostics for a value after this many.
    #[arg(long = "max-diagnostics", default_value_t = MAX_MATCH_DIAGNOSTICS)]
    pub max_diagnostics: usize,

    /// Nested alias and generic hops allowed on one path through a value.
    #[arg(long = "max-depth", default_value_t = MAX_MATCH_DEPTH)]
    pub max_depth: u32,

    /// JSON value files to check.
    #[arg(required = true, value_name = "VALUE")]
    pub values: Vec<PathBuf>,
}
