//! Interactive scenario menu

use crate::formatter::{self, Progress};
use anyhow::{Context, Result};
use autospec_core::office::SofficeLauncher;
use autospec_core::{AppConfig, AutoSpecError, InvoiceProcessor, Scenario, parse_ranges};
use colored::*;
use std::fmt::Display;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::warn;

pub struct Menu<R, W> {
    input: R,
    output: W,
    config: AppConfig,
    config_path: PathBuf,
    launcher: SofficeLauncher,
}

impl<R: BufRead, W: Write> Menu<R, W> {
    pub fn new(input: R, output: W, config: AppConfig, config_path: PathBuf, launcher: SofficeLauncher) -> Self {
        Self {
            input,
            output,
            config,
            config_path,
            launcher,
        }
    }

    /// Loop until the user picks 0 or input ends
    pub fn run(&mut self) -> Result<()> {
        loop {
            if let Some(problem) = self.config.base_dir().err() {
                if self.config.base_dir.is_some() {
                    self.error(problem)?;
                    self.config.clear_base_dir();
                }
                if !self.ask_base_dir()? {
                    break;
                }
            }

            self.print_menu()?;
            let Some(choice) = self.read_line()? else {
                break;
            };

            match choice.as_str() {
                "0" => break,
                "1" => self.run_scenario(Scenario::RedactXlsx)?,
                "2" => self.run_scenario(Scenario::RedactXls)?,
                "3" => self.config.clear_base_dir(),
                "4" => self.run_scenario(Scenario::DeleteCopies)?,
                _ => self.error("Invalid choice")?,
            }
        }

        writeln!(self.output, "\n{}", "Leaving AutoSpec".green())?;
        Ok(())
    }

    fn print_menu(&mut self) -> Result<()> {
        let current = self
            .config
            .base_dir
            .as_deref()
            .map(|dir| dir.display().to_string())
            .unwrap_or_else(|| "not set".to_string());

        writeln!(self.output, "\n{}", "Choose a scenario:".yellow())?;
        writeln!(
            self.output,
            "{}{}",
            "1) Create specification file XLS".yellow(),
            "X".green()
        )?;
        writeln!(self.output, "{}", "2) Create specification file XLS".yellow())?;
        writeln!(
            self.output,
            "{}",
            format!("3) Change invoice directory (current: {})", current).yellow()
        )?;
        writeln!(self.output, "{}", "4) Delete generated specification files".yellow())?;
        writeln!(self.output, "{}", "0) Exit".yellow())?;
        Ok(())
    }

    /// Prompt until a valid directory is entered; `false` when input ends
    fn ask_base_dir(&mut self) -> Result<bool> {
        loop {
            writeln!(self.output, "{}", "Enter the path to the invoice directory:".yellow())?;
            let Some(line) = self.read_line()? else {
                return Ok(false);
            };

            if let Err(e) = self.config.set_base_dir(&line).map(|_| ()) {
                self.error(e)?;
                continue;
            }

            if let Err(e) = self.config.save(&self.config_path) {
                warn!(path = %self.config_path.display(), error = %e, "could not save configuration");
                self.error(format!("Directory not saved: {}", e))?;
            }
            return Ok(true);
        }
    }

    fn run_scenario(&mut self, scenario: Scenario) -> Result<()> {
        let processor = match InvoiceProcessor::from_config(&self.config, Box::new(self.launcher.clone())) {
            Ok(processor) => processor,
            Err(e) => return self.error(e),
        };

        let prompt = match scenario {
            Scenario::DeleteCopies => "Enter the invoice number range (empty for all invoices):",
            _ => "Enter the invoice number range (empty to go back):",
        };

        loop {
            writeln!(self.output, "\n{}", prompt.yellow())?;
            let Some(line) = self.read_line()? else {
                return Ok(());
            };

            let wanted = if line.is_empty() {
                if scenario != Scenario::DeleteCopies {
                    return Ok(());
                }
                None
            } else {
                match parse_ranges(&line) {
                    Ok(set) => Some(set),
                    Err(e) => {
                        self.error(e)?;
                        continue;
                    }
                }
            };

            let invoices = match processor.select(wanted.as_ref()) {
                Ok(invoices) => invoices,
                Err(e @ AutoSpecError::NoMatch { .. }) => {
                    self.error(e)?;
                    continue;
                }
                // The directory itself is unusable; the main menu checks it again
                Err(e) => return self.error(e),
            };

            let summary = processor.run_selected(scenario, invoices, &mut Progress::new(&mut self.output));
            formatter::write_summary(&mut self.output, &summary)?;
            return Ok(());
        }
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        write!(self.output, "> ")?;
        self.output.flush()?;

        let mut line = String::new();
        let read = self.input.read_line(&mut line).context("Failed to read input")?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn error(&mut self, message: impl Display) -> Result<()> {
        writeln!(self.output, "{}", message.to_string().red())?;
        Ok(())
    }
}
