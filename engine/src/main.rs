// Engine main entry point
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use shared::models::SourceKind;
use sheet_engine::config::EngineSettings;
use sheet_engine::services::reference_service::helpers::{describe_report, summary_line, write_hits};
use sheet_engine::services::reference_service::search_cleaned::run_search_prompt;
use sheet_engine::services::ReferenceService;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sheet-engine", version, about = "Normaliza planilhas de referência CATSER, SINAPI e CMED")]
struct Cli {
    /// JSON settings file; built-in defaults when absent.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Cleans every configured source into <output_dir>/<kind>_limpo.csv.
    Normalize {
        /// Restrict to these kinds (catser, sinapi, cmed).
        #[arg(long = "only")]
        only: Vec<SourceKind>,
    },
    /// Shows the detected header, column mapping and first records of a file.
    Inspect {
        file: PathBuf,
        #[arg(long)]
        kind: SourceKind,
        #[arg(long, default_value_t = 5)]
        rows: usize,
    },
    /// Searches the cleaned files of every kind. Without a term, prompts
    /// for terms until 'sair'.
    Search {
        term: Option<String>,
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Erro: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let settings = EngineSettings::load_or_default(cli.config.as_deref())
        .context("loading settings")?;
    let service = ReferenceService::new(settings);

    match cli.command {
        Command::Normalize { only } => {
            info!(sources = service.settings().sources.len(), "Starting normalization");
            let outcomes = service.normalize_all(&only);
            let mut failures = 0;
            for outcome in &outcomes {
                match &outcome.result {
                    Ok(summary) => println!("{}", summary_line(summary)),
                    Err(e) => {
                        failures += 1;
                        println!("{}: falhou: {}", outcome.kind.slug(), e);
                    }
                }
            }
            println!("{} fontes processadas, {} com erro", outcomes.len(), failures);
            Ok(if failures == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        Command::Inspect { file, kind, rows } => {
            let inspected = service
                .inspect(&file, kind, rows)
                .with_context(|| format!("inspecting {}", file.display()))?;
            println!("{} | aba '{}' | {} linhas", kind.label(), inspected.sheet, inspected.total_rows);
            println!("{}", describe_report(&inspected.report));
            for record in &inspected.preview {
                println!("{}", serde_json::to_string(record)?);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Search { term, limit } => {
            let stdout = io::stdout();
            match term {
                Some(term) => write_hits(&mut stdout.lock(), &term, &service.search(&term, limit)?)?,
                None => {
                    let index = service.search_index()?;
                    let searches = run_search_prompt(&index, limit, io::stdin().lock(), stdout.lock())?;
                    info!(searches, "Interactive search finished");
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
