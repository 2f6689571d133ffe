//! tally CLI - compile a formula, print its tree, evaluate it

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{Level, LevelFilter, Log, Metadata, Record};
use tally_formula::{compile, EvaluationOptions, Sheet};

#[derive(Parser)]
#[command(name = "tally")]
#[command(author, version, about = "Compile and evaluate a spreadsheet formula")]
struct Cli {
    /// Formula to evaluate, e.g. 'SUM([A1:A3])*2'
    formula: String,

    /// Cell contents as REF=VALUE; VALUE may be a number, "text" or =formula
    #[arg(short, long = "cell", value_name = "REF=VALUE")]
    cells: Vec<String>,

    /// Deepest evaluation nesting allowed
    #[arg(long, default_value_t = EvaluationOptions::default().max_depth)]
    max_depth: usize,

    /// Print the result as JSON instead of the tree dumps
    #[arg(long)]
    json: bool,

    /// Log parser and evaluator diagnostics to stderr
    #[arg(short, long)]
    verbose: bool,
}

/// Writes log records to stderr
struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Trace
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        log::set_logger(&LOGGER)
            .map(|()| log::set_max_level(LevelFilter::Trace))
            .context("Failed to install logger")?;
    }

    let sheet = build_sheet(&cli.cells)?;
    let mut ast = compile(&cli.formula).context("Invalid expression")?;

    if !cli.json {
        println!("Before evaluation:");
        print!("{}", ast.dump());
    }

    let options = EvaluationOptions {
        max_depth: cli.max_depth,
    };
    ast.fold_with_options(&mut sheet.resolver_with_options(options), options)
        .context("Error during evaluation")?;

    if cli.json {
        let value = ast.as_constant().cloned().unwrap_or_default();
        let output = serde_json::json!({
            "formula": cli.formula,
            "result": value,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("After evaluation:");
        print!("{}", ast.dump());
    }

    Ok(())
}

fn build_sheet(cells: &[String]) -> Result<Sheet> {
    let mut sheet = Sheet::new();
    for entry in cells {
        let Some((reference, input)) = entry.split_once('=') else {
            bail!("Cell '{}' is not in REF=VALUE form", entry);
        };
        sheet
            .set_input(reference.trim(), input)
            .with_context(|| format!("Invalid cell reference '{}'", reference))?;
    }
    log::debug!("Loaded {} cells", sheet.len());
    Ok(sheet)
}
