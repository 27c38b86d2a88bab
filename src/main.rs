//! Command-line interface for sample-gen
//!
//! # Usage Examples
//!
//! ```bash
//! # Generate the corpus of an add-on, one JSON event per line
//! sample-gen generate --addon-path ./Splunk_TA_example
//!
//! # Raw event text only, written to a file
//! sample-gen generate --addon-path ./Splunk_TA_example \
//!   --format raw --output events.log
//!
//! # Reproducible corpus with an explicit seed
//! sample-gen generate --addon-path ./Splunk_TA_example --seed 7
//! ```
//!
//! When `SAMPLE_GEN_RUN_ID` is set, generation goes through the
//! cross-process corpus store so concurrent workers of one run share a
//! single generated corpus.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use sample_gen::{GeneratorOpts, SampleGenerator, SampleXdistGenerator, WorkerContext};
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sample-gen")]
#[command(about = "Tokenize add-on sample files into a synthetic log event corpus")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the tokenized event corpus
    Generate {
        #[command(flatten)]
        opts: GeneratorOpts,

        /// Output file (stdout when omitted)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
}

#[derive(ValueEnum, Clone, Copy)]
enum OutputFormat {
    /// One JSON object per event, with metadata and key fields
    Json,
    /// Raw event text only
    Raw,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            opts,
            output,
            format,
        } => {
            let generator =
                SampleGenerator::new(&opts.addon_path, opts.config_path.clone(), opts.seed);
            let xdist = SampleXdistGenerator::new(generator, WorkerContext::from_env());
            let events = xdist.get_samples()?;

            let mut out: Box<dyn Write> = match &output {
                Some(path) => Box::new(
                    std::fs::File::create(path)
                        .with_context(|| format!("failed to create {}", path.display()))?,
                ),
                None => Box::new(std::io::stdout().lock()),
            };
            for event in &events {
                match format {
                    OutputFormat::Json => writeln!(out, "{}", serde_json::to_string(event)?)?,
                    OutputFormat::Raw => writeln!(out, "{}", event.event)?,
                }
            }
            tracing::info!("Wrote {} event(s)", events.len());
        }
    }

    Ok(())
}
