// steep - config-driven sales spreadsheet reports

mod exit_codes;
mod report;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use steep_recon::ReportError;
use tracing_subscriber::EnvFilter;

use exit_codes::{report_exit_code, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "steep")]
#[command(about = "Generate Excel reports from sales spreadsheets and the catalog database")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one report and write its workbook
    #[command(after_help = "\
Examples:
  steep run --config restocking --input sales.xlsx --db teas.sqlite
  steep run --config sku_reconcile --input codes.xlsx --out-dir reports --json
  steep run --config-file my_report.toml --input sales.xlsx")]
    Run {
        /// Registered config name
        #[arg(long)]
        config: Option<String>,

        /// Register an extra config from a TOML file before running
        #[arg(long, value_name = "TOML")]
        config_file: Option<PathBuf>,

        /// Uploaded spreadsheet (.xlsx, .xlsm, .xls)
        #[arg(long)]
        input: PathBuf,

        /// SQLite catalog database
        #[arg(long, env = "STEEP_DB")]
        db: PathBuf,

        /// Directory the workbook is written to
        #[arg(long, env = "STEEP_OUT_DIR", default_value = ".")]
        out_dir: PathBuf,

        /// Print a JSON run summary to stdout
        #[arg(long)]
        json: bool,
    },

    /// List registered report configs
    Configs,

    /// Parse and validate a report config file without running it
    Validate {
        /// Path to the config TOML
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            config,
            config_file,
            input,
            db,
            out_dir,
            json,
        } => report::cmd_run(report::RunArgs {
            config,
            config_file,
            input,
            db,
            out_dir,
            json,
        }),
        Commands::Configs => report::cmd_configs(),
        Commands::Validate { config } => report::cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ReportError> for CliError {
    fn from(err: ReportError) -> Self {
        let hint = match &err {
            ReportError::Schema { source, .. } if source == "input" => {
                Some("check the header row of the first sheet".to_string())
            }
            ReportError::Input(_) => Some("upload the sheet as .xlsx, .xlsm or .xls".to_string()),
            _ => None,
        };
        Self {
            code: report_exit_code(&err),
            message: err.to_string(),
            hint,
        }
    }
}
