//! Reference Strategy Comparison
//!
//! Runs the same design under the conservative, stepwise and ambitious
//! reference groups and prints the aspiration-type effects side by side,
//! one column block per strategy.
//!
//! Usage:
//!   cargo run --release --bin compare_strategies -- --quick --runs 20

use std::error::Error;

use aspiration_dynamics::analysis::{factorial_anova, group_mean_differences, Factor, Metric};
use aspiration_dynamics::cli::ConfigArgs;
use aspiration_dynamics::{run_experiment, PeerStrategy};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "compare_strategies")]
#[command(about = "Compare aspiration effects across peer reference strategies")]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let base = cli.config.load()?;

    println!("=== Reference Strategy Comparison ===\n");
    println!(
        "{} firms × {} periods × {} runs per cell, seed {}\n",
        base.experiment.n_firms, base.experiment.n_periods, base.experiment.n_runs, base.experiment.seed
    );

    let mut columns = Vec::new();
    for strategy in PeerStrategy::ALL {
        let mut config = base.clone();
        config.experiment.strategy = strategy.name().to_string();
        config.experiment.name = format!("{}_{}", base.experiment.name, strategy);

        let records = run_experiment(config)?;
        let groups = group_mean_differences(&records, Factor::Aspiration);
        let aspiration_f = match factorial_anova(&records, Metric::Performance) {
            Ok(anova) => anova
                .iter()
                .find(|row| row.source == "C(Aspiration)")
                .map(|row| row.f_value)
                .unwrap_or(f64::NAN),
            Err(e) => {
                log::warn!("{strategy}: {e}");
                f64::NAN
            }
        };
        columns.push((strategy, groups, aspiration_f));
    }

    print!("{:<12}", "Aspiration");
    for (strategy, _, _) in &columns {
        print!(" {:>13} {:>13}", format!("{strategy} perf"), format!("{strategy} risk"));
    }
    println!();

    let levels: Vec<String> = columns
        .first()
        .map(|(_, groups, _)| groups.iter().map(|g| g.level.clone()).collect())
        .unwrap_or_default();
    for level in &levels {
        print!("{:<12}", level);
        for (_, groups, _) in &columns {
            match groups.iter().find(|g| &g.level == level) {
                Some(g) => print!(" {:>13.3} {:>13.3}", g.perf_diff, g.risk_diff),
                None => print!(" {:>13} {:>13}", "-", "-"),
            }
        }
        println!();
    }

    println!("\nF value of the aspiration main effect on performance:");
    for (strategy, _, f_value) in &columns {
        println!("  {:<13} {:>10.2}", strategy.name(), f_value);
    }

    Ok(())
}
