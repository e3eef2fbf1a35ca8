//! Example: Summarize a directory of yearly XBT files.
//!
//! Usage:
//!   cargo run --example summarize -- <directory> <start_year> <end_year>
//!
//! Example:
//!   RUST_LOG=xbt=debug cargo run --example summarize -- data/xbt 1966 2016

use std::env;
use std::process;

use tracing_subscriber::EnvFilter;
use xbt::XbtDataset;
use xbt::dataset::LABELLED_KEY;

fn main() -> xbt::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        eprintln!("Usage: cargo run --example summarize -- <directory> <start_year> <end_year>");
        process::exit(1);
    }

    let (Ok(start), Ok(end)) = (args[2].parse::<i32>(), args[3].parse::<i32>()) else {
        eprintln!("Error: years must be integers");
        process::exit(1);
    };

    let dataset = XbtDataset::load(&args[1], start..end)?;

    let separator = "=".repeat(80);
    println!("{}", separator);
    println!("XBT observations: {} ({}..{})", args[1], start, end);
    println!("{}", separator);
    println!();

    println!("## Sources");
    for source in dataset.sources() {
        println!("  {:16} rows={:<8} {}", source.file, source.row_count, source.hash);
    }
    println!();

    let (rows, cols) = dataset.shape();
    println!("## Table");
    println!("  Observations: {}", rows);
    println!("  Columns: {}", cols);
    println!("  Cruises: {}", dataset.cruises()?.len());
    println!("  Platforms: {}", dataset.platforms()?.len());
    println!("  Countries: {}", dataset.countries()?.len());
    println!();

    println!("## Labels");
    println!("  Models: {}", dataset.models()?.len());
    println!("  Manufacturers: {}", dataset.manufacturers()?.len());
    println!("  Unknown model: {}", dataset.num_unknown_model()?);
    println!("  Unknown manufacturer: {}", dataset.num_unknown_manufacturer()?);
    println!(
        "  Unlabelled (type unknown): {}",
        dataset.filter_obs(LABELLED_KEY, "unlabelled")?.num_obs()
    );
    println!();

    println!("## Top instruments");
    let mut instruments: Vec<_> = dataset.instrument_distribution()?.into_iter().collect();
    instruments.sort_by(|a, b| b.1.cmp(&a.1));
    for (instrument, count) in instruments.iter().take(10) {
        println!("  {:>8}  {}", count, instrument);
    }
    println!();

    let report = dataset.cruise_stats()?;
    println!("## Cruises");
    println!("  With an unknown model: {}", report.num_unknown_model);
    println!("  With no model data: {}", report.num_no_model_data);
    println!("  With an unknown manufacturer: {}", report.num_unknown_manufacturer);
    println!("  With no manufacturer data: {}", report.num_no_manufacturer_data);
    println!();

    println!("{}", separator);

    Ok(())
}
