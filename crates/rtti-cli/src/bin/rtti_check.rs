use anyhow::Result;
use clap::Parser;
use rtti_cli::args::CliArgs;
use rtti_cli::driver;

/// Exit status when at least one value does not match.
const EXIT_MISMATCH: i32 = 1;

fn main() -> Result<()> {
    // Initialize tracing if RTTI_LOG or RUST_LOG is set (zero cost otherwise).
    rtti_common::init_tracing();

    let args = CliArgs::parse();
    let outcome = driver::run(&args)?;
    print!("{}", driver::render(&outcome, args.json)?);

    if !outcome.all_matched() {
        std::process::exit(EXIT_MISMATCH);
    }
    Ok(())
}
