//! Analyse a previously written record table
//!
//! Usage:
//!   cargo run --release --bin analyze_records -- results/quick_view/records.csv

use std::error::Error;
use std::path::PathBuf;

use aspiration_dynamics::analysis::{
    factorial_anova, group_mean_differences, print_anova, print_group_differences, run_trends,
    Factor, Metric,
};
use aspiration_dynamics::output::read_records_file;
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "analyze_records")]
#[command(about = "ANOVA and group differences for an experiment record CSV")]
struct Cli {
    /// records.csv written by the experiment binary
    records: PathBuf,

    /// Also print per-run means for each aspiration type
    #[arg(long)]
    trends: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let records = read_records_file(&cli.records)?;
    println!("Loaded {} records from {}\n", records.len(), cli.records.display());

    let mut anova = Vec::new();
    for metric in [Metric::Performance, Metric::Risk] {
        match factorial_anova(&records, metric) {
            Ok(rows) => anova.extend(rows),
            Err(e) => eprintln!("{metric} ANOVA not available: {e}"),
        }
    }
    if !anova.is_empty() {
        print_anova(&anova);
    }

    println!("\n=== Group mean differences from overall mean ===");
    for factor in Factor::ALL {
        print_group_differences(factor, &group_mean_differences(&records, factor));
    }

    if cli.trends {
        println!("\n=== Per-run means ===");
        println!("{:<12} {:>6} {:>12} {:>12}", "Aspiration", "Run", "Performance", "Risk");
        for trend in run_trends(&records) {
            println!(
                "{:<12} {:>6} {:>12.4} {:>12.4}",
                trend.aspiration.to_string(),
                trend.run_id,
                trend.performance,
                trend.risk
            );
        }
    }

    Ok(())
}
