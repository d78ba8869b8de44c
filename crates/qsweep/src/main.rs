use std::path::PathBuf;

use clap::{Parser, Subcommand};
use qsweep::{SweepFile, init_logging, run_file};

#[derive(Parser, Debug)]
#[command(name = "qsweep")]
#[command(about = "Parameter sweeps over the spectra of coupled oscillators")]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a sweep and write the results as JSON
    Run {
        /// YAML sweep file
        #[arg(short, long)]
        config: PathBuf,

        /// Output path for the JSON results
        #[arg(short, long, default_value = "sweep.json")]
        output: PathBuf,

        /// Worker count; overrides `num_cpus` in the sweep file
        #[arg(long)]
        cpus: Option<usize>,
    },
    /// Validate a sweep file without running it
    Check {
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    init_logging(args.log_file.as_deref(), &args.log_level)?;

    match args.command {
        Command::Run {
            config,
            output,
            cpus,
        } => {
            let result = run_file(&config, &output, cpus)?;
            println!(
                "wrote {} results over {} points to {}",
                result.record.data.len(),
                result.record.paramvals_by_name.total_points(),
                output.display()
            );
        }
        Command::Check { config } => {
            let file = SweepFile::from_yaml(&std::fs::read_to_string(&config)?)?;
            let parameters = file.parameters()?;
            println!(
                "{}: {} oscillators, {} axes, {} points",
                config.display(),
                file.oscillators.len(),
                parameters.len(),
                parameters.total_points()
            );
        }
    }
    Ok(())
}
