use anyhow::{Context, Result};
use autospec_core::office::SofficeLauncher;
use autospec_core::{AppConfig, InvoiceProcessor, Scenario, Silent, parse_ranges, reader};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::*;
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod formatter;
mod menu;

#[derive(Parser)]
#[command(name = "autospec")]
#[command(about = "Batch creation of invoice specification copies", long_about = None)]
#[command(version)]
struct Cli {
    /// Run one scenario and exit instead of showing the menu
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (JSON, default: config.json next to the executable)
    #[arg(short, long, global = true, value_name = "FILE", env = "AUTOSPEC_CONFIG")]
    config: Option<PathBuf>,

    /// Invoice directory for this run, overriding the configured one
    #[arg(long, global = true, value_name = "DIR")]
    base_dir: Option<PathBuf>,

    /// LibreOffice executable used for XLS conversion
    #[arg(long, global = true, value_name = "BIN", env = "AUTOSPEC_SOFFICE", default_value = "soffice")]
    soffice: PathBuf,

    /// Output format for subcommands
    #[arg(short, long, global = true, value_enum, default_value = "human")]
    format: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Create `Invoice N fcs.xlsx` copies showing only the Specification sheet
    Xlsx {
        /// Invoice numbers, e.g. "5,7-9,12"
        #[arg(short, long)]
        range: String,
    },
    /// Create `Invoice N fcs.xls` copies through LibreOffice
    Xls {
        /// Invoice numbers, e.g. "5,7-9,12"
        #[arg(short, long)]
        range: String,
    },
    /// Delete generated copies (all invoices unless a range is given)
    Clean {
        #[arg(short, long)]
        range: Option<String>,
    },
    /// Store the invoice directory in the configuration file
    SetDir {
        #[arg(value_name = "PATH", required_unless_present = "clear")]
        path: Option<String>,

        /// Forget the stored directory
        #[arg(long, conflicts_with = "path")]
        clear: bool,
    },
    /// List the worksheets of a workbook with their visibility
    Inspect {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON output for scripts
    Json,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_path);
    let launcher = SofficeLauncher::new(&cli.soffice);

    let command = match cli.command {
        Some(command) => command,
        None => return run_menu(config_path, cli.base_dir, launcher),
    };

    let (scenario, range) = match command {
        Command::Xlsx { range } => (Scenario::RedactXlsx, Some(range)),
        Command::Xls { range } => (Scenario::RedactXls, Some(range)),
        Command::Clean { range } => (Scenario::DeleteCopies, range),
        Command::SetDir { path, clear } => return set_dir(&config_path, path.as_deref(), clear),
        Command::Inspect { file } => return inspect(&file, cli.format),
    };

    let mut config = load_config(&config_path)?;
    if let Some(dir) = cli.base_dir {
        config.base_dir = Some(dir);
    }

    let wanted = range.as_deref().map(parse_ranges).transpose()?;
    let processor = InvoiceProcessor::from_config(&config, Box::new(launcher))?;

    let summary = match cli.format {
        OutputFormat::Human => {
            let mut stdout = io::stdout().lock();
            let summary = processor.run(scenario, wanted.as_ref(), &mut formatter::Progress::new(&mut stdout))?;
            formatter::write_summary(&mut stdout, &summary)?;
            summary
        }
        OutputFormat::Json => {
            let summary = processor.run(scenario, wanted.as_ref(), &mut Silent)?;
            formatter::print_json(&summary)?;
            summary
        }
    };

    // Any failed invoice makes the run fail
    let exit_code = if summary.is_success() { 0 } else { 1 };
    std::process::exit(exit_code);
}

fn load_config(path: &Path) -> Result<AppConfig> {
    AppConfig::load(path).with_context(|| format!("Failed to load config from {}", path.display()))
}

fn run_menu(config_path: PathBuf, base_dir: Option<PathBuf>, launcher: SofficeLauncher) -> Result<()> {
    let mut config = match AppConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            // The menu asks for the directory again instead of giving up
            eprintln!("{}", format!("Ignoring {}: {}", config_path.display(), e).red());
            AppConfig::default()
        }
    };
    if base_dir.is_some() {
        config.base_dir = base_dir;
    }

    let stdin = io::stdin();
    let mut menu = menu::Menu::new(stdin.lock(), io::stdout(), config, config_path, launcher);
    menu.run()
}

fn set_dir(config_path: &Path, path: Option<&str>, clear: bool) -> Result<()> {
    let mut config = load_config(config_path)?;

    match path {
        Some(raw) if !clear => {
            let dir = config.set_base_dir(raw)?.display().to_string();
            config
                .save(config_path)
                .with_context(|| format!("Failed to save config to {}", config_path.display()))?;
            println!("{}", format!("✓ Invoice directory set to {}", dir).green());
        }
        _ => {
            config.clear_base_dir();
            config
                .save(config_path)
                .with_context(|| format!("Failed to save config to {}", config_path.display()))?;
            println!("{}", "✓ Invoice directory cleared".green());
        }
    }

    Ok(())
}

fn inspect(file: &Path, format: OutputFormat) -> Result<()> {
    let sheets = reader::list_sheets(file)
        .with_context(|| format!("Failed to read workbook: {}", file.display()))?;

    match format {
        OutputFormat::Human => formatter::print_sheets_human(file, &sheets),
        OutputFormat::Json => formatter::print_sheets_json(file, &sheets)?,
    }

    Ok(())
}
