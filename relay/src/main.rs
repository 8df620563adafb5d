mod config;
mod telemetry;

use clap::{Args, Parser, ValueEnum};
use config::Config;
use pii::{PiiError, StateStrategy};
use std::path::PathBuf;
use std::process::ExitCode;

/// Purchase event relay for conversions APIs
#[derive(Parser)]
#[command(name = "relay", version)]
enum CliCommand {
    /// Serve events and health probes
    Run(ConfigArgs),
    /// Load and validate a config file, then exit
    CheckConfig(ConfigArgs),
    /// Print the normalized form and SHA-256 digest of one identity value
    Hash {
        #[arg(long, value_enum)]
        field: HashField,
        value: String,
    },
}

#[derive(Args)]
struct ConfigArgs {
    #[arg(long, short, default_value = "relay.yaml")]
    config: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum HashField {
    Phone,
    Zip,
    City,
    State,
}

fn normalize_field(field: HashField, value: &str) -> Result<String, PiiError> {
    match field {
        HashField::Phone => pii::normalize_phone(value),
        HashField::Zip => pii::normalize_zip(value),
        HashField::City => Ok(pii::normalize_city(value)),
        HashField::State => pii::normalize_state(value, StateStrategy::CodeList),
    }
}

fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let _guard = telemetry::init_logging(config.common.logging.as_ref());
    if let Some(metrics) = &config.common.metrics {
        telemetry::init_metrics(metrics)?;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(conversions::run(config.conversions))?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = CliCommand::parse();

    let result: Result<(), Box<dyn std::error::Error>> = match cli {
        CliCommand::Run(args) => Config::from_file(&args.config)
            .map_err(Into::into)
            .and_then(run),
        CliCommand::CheckConfig(args) => Config::from_file(&args.config)
            .map(|config| {
                println!(
                    "{}: ok ({} routes)",
                    args.config.display(),
                    config.conversions.routes.len()
                );
            })
            .map_err(Into::into),
        CliCommand::Hash { field, value } => normalize_field(field, &value)
            .map(|normalized| {
                println!("normalized: {normalized}");
                println!("sha256: {}", pii::hash(&normalized));
            })
            .map_err(Into::into),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
