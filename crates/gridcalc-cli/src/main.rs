//! gridcalc CLI - evaluate cell scripts and translate formulas between locales

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use gridcalc::prelude::*;
use gridcalc::{canonicalize_formula, localize_formula, quote_sheet_name};
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gridcalc")]
#[command(author, version, about = "Spreadsheet calculation engine")]
struct Cli {
    /// Locale of literals and formulas (en_US, en_GB, de_DE, fr_FR)
    #[arg(short, long, global = true, default_value = "en_US")]
    locale: String,

    /// Maximum number of evaluation passes
    #[arg(long, global = true, default_value = "10")]
    max_passes: usize,

    /// Log evaluation details
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a script of `[Sheet!]A1 content` lines and print every cell
    Eval {
        /// Script file, `-` for stdin
        script: PathBuf,
    },

    /// Translate a formula from one locale's notation to another's
    Translate {
        /// Locale the formula is written in
        #[arg(long, default_value = "en_US")]
        from: String,

        /// Locale to write the formula in
        #[arg(long, default_value = "en_US")]
        to: String,

        formula: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::Eval { script } => {
            let locale = locale(&cli.locale)?;
            let options = EngineOptions::default()
                .with_locale(locale)
                .with_max_passes(cli.max_passes);
            eval(&script, options)
        }
        Commands::Translate { from, to, formula } => {
            let (from, to) = (locale(&from)?, locale(&to)?);
            let canonical = canonicalize_formula(&formula, &from);
            println!("{}", localize_formula(&canonical, &to));
            Ok(())
        }
    }
}

fn locale(code: &str) -> Result<Locale> {
    Locale::from_code(code).with_context(|| format!("Unknown locale '{code}'"))
}

fn read_script(path: &PathBuf) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut script = String::new();
        io::stdin()
            .read_to_string(&mut script)
            .context("Failed to read the script from stdin")?;
        return Ok(script);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read '{}'", path.display()))
}

fn eval(path: &PathBuf, options: EngineOptions) -> Result<()> {
    let script = read_script(path)?;
    let locale = options.locale;
    let mut engine = Engine::new(options);

    for (number, line) in script.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (reference, content) = split_reference(line);
        ensure_sheet(&mut engine, reference)?;
        let position = engine
            .position(reference)
            .with_context(|| format!("line {}: invalid cell '{reference}'", number + 1))?;
        let content = if content.starts_with('=') {
            canonicalize_formula(content, &locale)
        } else {
            content.to_string()
        };
        debug!(cell = %reference, content = %content, "update");
        engine
            .set_cell_content(position, &content)
            .with_context(|| format!("line {}: cannot set '{reference}'", number + 1))?;
    }

    let summary = engine.evaluate_all();
    info!(
        formulas = summary.formula_count,
        passes = summary.passes,
        errors = summary.errors,
        "evaluated"
    );

    let positions: Vec<(String, CellPosition)> = engine
        .workbook()
        .sheets()
        .flat_map(|sheet| {
            let prefix = quote_sheet_name(sheet.name());
            let id = sheet.id();
            sheet
                .cells()
                .map(move |(row, col, _)| (prefix.clone(), CellPosition::new(id, row, col)))
        })
        .collect();

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for (prefix, position) in positions {
        let cell = engine.get_evaluated_cell(position);
        if cell.value_type == CellValueType::Empty {
            continue;
        }
        writeln!(out, "{prefix}!{}\t{}", position.address(), cell.formatted_value)?;
    }
    out.flush()?;
    Ok(())
}

/// Split a script line into its cell reference and the content after it.
/// Quoted sheet names may contain spaces.
fn split_reference(line: &str) -> (&str, &str) {
    let search_from = match line.strip_prefix('\'') {
        Some(rest) => rest.find("'!").map_or(0, |i| i + 3),
        None => 0,
    };
    match line[search_from..].find(char::is_whitespace) {
        Some(i) => {
            let (reference, content) = line.split_at(search_from + i);
            (reference, content.trim_start())
        }
        None => (line, ""),
    }
}

/// Create the sheet a reference names if the workbook lacks it.
fn ensure_sheet(engine: &mut Engine, reference: &str) -> Result<()> {
    let Some(index) = reference.rfind('!') else {
        return Ok(());
    };
    let name = reference[..index].trim_matches('\'').replace("''", "'");
    if name.is_empty() {
        bail!("Empty sheet name in '{reference}'");
    }
    if engine.workbook().sheet_id(&name).is_none() {
        engine
            .create_sheet(&name)
            .with_context(|| format!("Failed to create sheet '{name}'"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_reference() {
        assert_eq!(split_reference("A1 =1+2"), ("A1", "=1+2"));
        assert_eq!(split_reference("Data!B2   hello world"), ("Data!B2", "hello world"));
        assert_eq!(split_reference("'My sheet'!C3 42"), ("'My sheet'!C3", "42"));
        assert_eq!(split_reference("A1"), ("A1", ""));
    }

    #[test]
    fn test_ensure_sheet_creates_missing_sheets() {
        let mut engine = Engine::default();
        ensure_sheet(&mut engine, "'My sheet'!A1").unwrap();
        ensure_sheet(&mut engine, "my SHEET!B1").unwrap();
        ensure_sheet(&mut engine, "A1").unwrap();
        assert_eq!(engine.workbook().sheet_count(), 2);
    }
}
