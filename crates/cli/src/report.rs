//! `steep run`, `steep configs` and `steep validate`.

use std::path::{Path, PathBuf};

use steep_io::{generate_report, SqliteSource};
use steep_recon::{ConfigRegistry, ReportConfig, ReportError, Strategy};
use tracing::warn;

use crate::exit_codes::EXIT_ERROR;
use crate::CliError;

pub struct RunArgs {
    pub config: Option<String>,
    pub config_file: Option<PathBuf>,
    pub input: PathBuf,
    pub db: PathBuf,
    pub out_dir: PathBuf,
    pub json: bool,
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let mut registry = ConfigRegistry::builtin()?;

    let file_config = match &args.config_file {
        Some(path) => {
            let config = load_config_file(path)?;
            let name = config.name.clone();
            registry.register(config)?;
            Some(name)
        }
        None => None,
    };

    let name = args.config.or(file_config).ok_or_else(|| {
        CliError::usage("no report selected").with_hint(format!(
            "pass --config <name> (one of: {}) or --config-file <toml>",
            registry.names().join(", ")
        ))
    })?;
    let config = registry.get(&name)?;

    let source = SqliteSource::new(args.db);
    let (path, book) = generate_report(&args.input, &args.out_dir, config, &source).map_err(|e| {
        let store_failed = matches!(e, ReportError::DataSource(_));
        let err = CliError::from(e);
        if store_failed {
            err.with_hint(format!("store is {} (set with --db or STEEP_DB)", source.path().display()))
        } else {
            err
        }
    })?;

    for warning in &book.warnings {
        warn!(%warning, "report warning");
    }

    if args.json {
        let summary = serde_json::to_string_pretty(&book.summary()).map_err(|e| CliError {
            code: EXIT_ERROR,
            message: format!("JSON serialization error: {e}"),
            hint: None,
        })?;
        println!("{summary}");
    } else {
        println!("{}", path.display());
    }

    let sheets: Vec<String> = book
        .sheets
        .iter()
        .map(|s| format!("{} ({} rows)", s.name, s.rows.len()))
        .collect();
    eprintln!("{}: wrote {} sheet(s): {}", book.meta.config_name, book.sheets.len(), sheets.join(", "));
    Ok(())
}

pub fn cmd_configs() -> Result<(), CliError> {
    let registry = ConfigRegistry::builtin()?;
    for name in registry.names() {
        let config = registry.get(name)?;
        println!("{name}\t{}\t{}.xlsx", config.strategy.label(), config.output_name);
    }
    Ok(())
}

pub fn cmd_validate(path: PathBuf) -> Result<(), CliError> {
    let config = load_config_file(&path)?;
    let detail = match &config.strategy {
        Strategy::JoinClassify(jc) => format!(
            "joins on '{}', sheets '{}' and '{}'",
            jc.join_key, jc.matched_sheet.name, jc.remainder_sheet.name
        ),
        Strategy::SetReconcile(sr) => format!("reconciles '{}' against {}.{}", sr.key_field, sr.table, sr.key_column),
    };
    eprintln!(
        "valid: {} '{}' with {} input column(s), {}",
        config.strategy.label(),
        config.name,
        config.input_columns.len(),
        detail,
    );
    Ok(())
}

fn load_config_file(path: &Path) -> Result<ReportConfig, CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::usage(format!("cannot read config {}: {e}", path.display())))?;
    Ok(ReportConfig::from_toml(&text)?)
}
