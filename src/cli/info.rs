use anyhow::{Context, Result};
use std::path::PathBuf;

#[cfg(feature = "colorized_output")]
use console::style;

use mzscope::ingest::load_tsv;

/// Display summary information about a TSV peak list
pub fn run(input: PathBuf) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("File does not exist: {}", input.display());
    }

    let table = load_tsv(&input)
        .with_context(|| format!("Failed to load {}", input.display()))?;
    let summary = table.summary();

    print_header("mzScope Peak List Information");
    println!("File: {}", input.display());
    println!();
    println!("{}", summary);

    Ok(())
}

#[cfg(feature = "colorized_output")]
fn print_header(title: &str) {
    println!("{}", style(title).bold().cyan());
    println!("{}", style("=".repeat(title.len())).cyan());
}

#[cfg(not(feature = "colorized_output"))]
fn print_header(title: &str) {
    println!("{}", title);
    println!("{}", "=".repeat(title.len()));
}
